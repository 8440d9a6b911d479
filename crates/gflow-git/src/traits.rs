//! Trait abstractions for git operations.
//!
//! This module defines the `GitOps` trait which abstracts every repository
//! operation the workflow engine performs, enabling dependency injection
//! and testability.

use git2::Oid;

use crate::{
    BranchRef, CommitInfo, MergeStatus, MergeStrategy, RebaseStatus, Repository, Result,
    WalkFilter, WorkingTreeStatus,
};

/// Trait for git repository operations.
///
/// This trait abstracts git operations, allowing for:
/// - Dependency injection in the workflow engine
/// - Mock implementations for testing
/// - Wrappers adding timeouts or dry-run behaviour around a real repository
///
/// All operations are synchronous; fetch and push block until the
/// transport completes.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps {
    // === Repository Info ===

    /// Get the current branch name.
    ///
    /// Returns an error if HEAD is detached or not on a branch.
    fn current_branch(&self) -> Result<String>;

    /// Check if a remote with this name is configured.
    fn has_remote(&self, name: &str) -> bool;

    /// Resolve a revision to a commit id, `None` if it does not exist.
    fn resolve_ref(&self, name: &str) -> Result<Option<Oid>>;

    // === Refs ===

    /// List all local branches.
    fn list_local_branches(&self) -> Result<Vec<BranchRef>>;

    /// List the remote-tracking branches of one remote.
    fn list_remote_branches(&self, remote: &str) -> Result<Vec<BranchRef>>;

    /// List all tag names.
    fn list_tags(&self) -> Result<Vec<String>>;

    // === Branch Operations ===

    /// Create a branch at `start_point` without checking it out.
    fn create_branch(&self, name: &str, start_point: &str) -> Result<Oid>;

    /// Create a local branch tracking `<remote>/<name>`.
    fn create_tracking_branch(&self, name: &str, remote: &str) -> Result<()>;

    /// Checkout a branch, optionally creating it from `start_point` (or HEAD).
    fn checkout(&self, branch: &str, create_if_missing: bool, start_point: Option<&str>)
    -> Result<()>;

    /// Delete a local branch. Without `force` an unmerged branch is refused.
    fn delete_local_branch(&self, name: &str, force: bool) -> Result<()>;

    // === Merge / Rebase ===

    /// Merge `source` into the checked-out branch.
    fn merge(&self, source: &str, strategy: MergeStrategy) -> Result<MergeStatus>;

    /// Throw away an in-progress conflicted merge.
    fn abort_merge(&self) -> Result<()>;

    /// Rebase the checked-out branch onto `onto`.
    fn rebase(&self, onto: &str) -> Result<RebaseStatus>;

    // === Tags ===

    /// Create an annotated tag at HEAD.
    fn create_tag(&self, name: &str, message: &str) -> Result<Oid>;

    // === Remote Operations ===

    /// Fetch a remote.
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Push one refspec to a remote.
    fn push(&self, remote: &str, refspec: &str) -> Result<()>;

    // === Working Directory ===

    /// Collect untracked and uncommitted paths.
    fn working_tree_status(&self) -> Result<WorkingTreeStatus>;

    // === History ===

    /// Walk the ancestry of `starts`, newest commit first.
    fn ancestry(&self, starts: &[Oid], filter: WalkFilter) -> Result<Vec<CommitInfo>>;

    // === Config ===

    /// Read a value from the repository config.
    fn config_value(&self, key: &str) -> Result<Option<String>>;

    /// Write a value to the repository-local config.
    fn set_config_value(&self, key: &str, value: &str) -> Result<()>;
}

impl GitOps for Repository {
    fn current_branch(&self) -> Result<String> {
        Self::current_branch(self)
    }

    fn has_remote(&self, name: &str) -> bool {
        Self::has_remote(self, name)
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<Oid>> {
        Self::resolve_ref(self, name)
    }

    fn list_local_branches(&self) -> Result<Vec<BranchRef>> {
        Self::list_local_branches(self)
    }

    fn list_remote_branches(&self, remote: &str) -> Result<Vec<BranchRef>> {
        Self::list_remote_branches(self, remote)
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        Self::list_tags(self)
    }

    fn create_branch(&self, name: &str, start_point: &str) -> Result<Oid> {
        Self::create_branch(self, name, start_point)
    }

    fn create_tracking_branch(&self, name: &str, remote: &str) -> Result<()> {
        Self::create_tracking_branch(self, name, remote)
    }

    fn checkout(
        &self,
        branch: &str,
        create_if_missing: bool,
        start_point: Option<&str>,
    ) -> Result<()> {
        Self::checkout(self, branch, create_if_missing, start_point)
    }

    fn delete_local_branch(&self, name: &str, force: bool) -> Result<()> {
        Self::delete_local_branch(self, name, force)
    }

    fn merge(&self, source: &str, strategy: MergeStrategy) -> Result<MergeStatus> {
        Self::merge(self, source, strategy)
    }

    fn abort_merge(&self) -> Result<()> {
        Self::abort_merge(self)
    }

    fn rebase(&self, onto: &str) -> Result<RebaseStatus> {
        Self::rebase(self, onto)
    }

    fn create_tag(&self, name: &str, message: &str) -> Result<Oid> {
        Self::create_tag(self, name, message)
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        Self::fetch(self, remote)
    }

    fn push(&self, remote: &str, refspec: &str) -> Result<()> {
        Self::push(self, remote, refspec)
    }

    fn working_tree_status(&self) -> Result<WorkingTreeStatus> {
        Self::working_tree_status(self)
    }

    fn ancestry(&self, starts: &[Oid], filter: WalkFilter) -> Result<Vec<CommitInfo>> {
        Self::ancestry(self, starts, filter)
    }

    fn config_value(&self, key: &str) -> Result<Option<String>> {
        Self::config_value(self, key)
    }

    fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        Self::set_config_value(self, key, value)
    }
}
