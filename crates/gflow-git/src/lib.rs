//! # gflow-git
//!
//! Git operations abstraction layer for gflow, built on git2-rs.
//! Provides the repository capability the workflow engine drives:
//! ref listing, branch management, merging, tagging, transport and
//! history walks.

mod error;
mod repository;
mod traits;
mod types;

pub use error::{Error, Result};
pub use git2::Oid;
pub use repository::Repository;
pub use traits::GitOps;
pub use types::{
    BranchRef, CommitInfo, Locality, MergeStatus, MergeStrategy, RebaseStatus, WalkFilter,
    WorkingTreeStatus,
};
