//! Error types for gflow-core.

use std::path::PathBuf;

use crate::extension::{HookError, HookPoint};

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gflow-core operations.
///
/// Precondition variants are raised before any repository mutation of the
/// current operation. Merge conflicts are never errors; they are returned
/// as [`crate::MergeOutcome`] data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// git-flow has not been recorded in this repository.
    #[error("git-flow is not initialized in this repository - run `gflow init` first")]
    NotInitialized,

    /// Production and integration are configured to the same branch.
    #[error("production and integration branch are both '{0}'")]
    SameBranchConfigured(String),

    /// Invalid branch or tag name.
    #[error("invalid name '{name}': {reason}")]
    InvalidBranchName {
        /// The invalid name.
        name: String,
        /// Why the name is invalid.
        reason: String,
    },

    /// Local branch already exists.
    #[error("local branch '{0}' already exists")]
    LocalBranchExists(String),

    /// Local branch missing, and no remote branch to track it from.
    #[error("local branch '{0}' does not exist")]
    LocalBranchMissing(String),

    /// Remote branch already exists.
    #[error("remote branch '{0}' already exists")]
    RemoteBranchExists(String),

    /// Remote branch missing.
    #[error("remote branch '{0}' does not exist")]
    RemoteBranchMissing(String),

    /// Tag already exists.
    #[error("tag '{0}' already exists")]
    TagExists(String),

    /// Working tree has changes.
    #[error("working tree is not clean: {0}")]
    DirtyWorkingTree(String),

    /// Local branch is missing commits that its remote counterpart has.
    #[error("branch '{branch}' is behind '{remote}/{branch}' - pull first")]
    BranchOutOfDate {
        /// Local branch name.
        branch: String,
        /// Remote it was compared against.
        remote: String,
    },

    /// A topic branch with the same prefix is already in progress.
    #[error("a branch with prefix '{prefix}' already exists: {branch}")]
    BranchExists {
        /// Prefix that was checked.
        prefix: String,
        /// First conflicting branch.
        branch: String,
    },

    /// Commit is not part of the branch history.
    #[error("commit '{commit}' is not on branch '{branch}'")]
    CommitNotOnBranch {
        /// Commit that was looked up.
        commit: String,
        /// Branch whose history was searched.
        branch: String,
    },

    /// An Error-strategy hook failed.
    #[error("extension failed at {point}: {cause}")]
    ExtensionFailed {
        /// Hook point that was running.
        point: HookPoint,
        /// What the hook reported.
        #[source]
        cause: HookError,
    },

    /// Fetch or push failed.
    #[error("{operation} failed: {source}")]
    Transport {
        /// `fetch` or `push`.
        operation: &'static str,
        /// Underlying git error.
        #[source]
        source: gflow_git::Error,
    },

    /// A workflow step failed in the repository layer.
    #[error("step '{step}' failed: {source}")]
    Step {
        /// Workflow step that was running.
        step: String,
        /// Underlying git error.
        #[source]
        source: gflow_git::Error,
    },

    /// Settings file parsing error.
    #[error("failed to parse {file}: {message}")]
    SettingsParse { file: PathBuf, message: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Git operation error outside a workflow step.
    #[error("git error: {0}")]
    Git(#[from] gflow_git::Error),
}

/// Discriminant of [`Error`] for callers that branch on the failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotInitialized,
    SameBranchConfigured,
    InvalidBranchName,
    LocalBranchExists,
    LocalBranchMissing,
    RemoteBranchExists,
    RemoteBranchMissing,
    TagExists,
    DirtyWorkingTree,
    BranchOutOfDate,
    BranchExists,
    CommitNotOnBranch,
    ExtensionFailed,
    Transport,
    Repository,
    Io,
}

impl Error {
    /// The kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::SameBranchConfigured(_) => ErrorKind::SameBranchConfigured,
            Self::InvalidBranchName { .. } => ErrorKind::InvalidBranchName,
            Self::LocalBranchExists(_) => ErrorKind::LocalBranchExists,
            Self::LocalBranchMissing(_) => ErrorKind::LocalBranchMissing,
            Self::RemoteBranchExists(_) => ErrorKind::RemoteBranchExists,
            Self::RemoteBranchMissing(_) => ErrorKind::RemoteBranchMissing,
            Self::TagExists(_) => ErrorKind::TagExists,
            Self::DirtyWorkingTree(_) => ErrorKind::DirtyWorkingTree,
            Self::BranchOutOfDate { .. } => ErrorKind::BranchOutOfDate,
            Self::BranchExists { .. } => ErrorKind::BranchExists,
            Self::CommitNotOnBranch { .. } => ErrorKind::CommitNotOnBranch,
            Self::ExtensionFailed { .. } => ErrorKind::ExtensionFailed,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Step { .. } | Self::Git(_) => ErrorKind::Repository,
            Self::SettingsParse { .. } | Self::Io(_) | Self::Json(_) => ErrorKind::Io,
        }
    }

    /// Whether this is a precondition failure (reported before mutation).
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotInitialized
                | ErrorKind::SameBranchConfigured
                | ErrorKind::InvalidBranchName
                | ErrorKind::LocalBranchExists
                | ErrorKind::LocalBranchMissing
                | ErrorKind::RemoteBranchExists
                | ErrorKind::RemoteBranchMissing
                | ErrorKind::TagExists
                | ErrorKind::DirtyWorkingTree
                | ErrorKind::BranchOutOfDate
                | ErrorKind::BranchExists
                | ErrorKind::CommitNotOnBranch
        )
    }
}
