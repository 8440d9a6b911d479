//! # gflow-core
//!
//! Core library for gflow, a git-flow workflow engine.
//! Provides the requirement checks, the extension hook pipeline, the
//! per-invocation trace, the merge result model and the engine that
//! sequences feature, release and hotfix start/finish operations.

pub mod config;
pub mod engine;
pub mod error;
pub mod extension;
pub mod init;
pub mod merge_result;
pub mod naming;
pub mod pipeline;
pub mod reporter;
pub mod requirements;

#[cfg(test)]
#[allow(clippy::unwrap_used, dead_code)]
mod test_mocks;

pub use config::{FlowConfig, FlowConfigBuilder, Settings};
pub use engine::{
    FinishOptions, FlowEngine, Operation, ProductionFailurePolicy, StartOptions, StartReport,
    TopicKind,
};
pub use error::{Error, ErrorKind, Result};
pub use extension::{
    EmptyExtensionProvider, Extension, ExtensionProvider, FailStrategy, HookCommand, HookContext,
    HookError, HookPoint,
};
pub use init::{InitReport, initialize};
pub use merge_result::{MergeOutcome, MergeResult};
pub use naming::{BranchName, TagName};
pub use reporter::{Reporter, TraceEntry, TraceLevel};
pub use requirements::CleanStatus;
