//! Error types for gflow-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// Branch not found.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Reference not found.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// A non-forced delete was refused because the branch is not merged into HEAD.
    #[error("branch '{0}' is not fully merged")]
    BranchNotMerged(String),

    /// A merge or rebase is already in progress.
    #[error("repository is in the middle of a merge or rebase")]
    OperationInProgress,

    /// Remote not found.
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// Push failed.
    #[error("push failed: {0}")]
    PushFailed(String),

    /// Fetch failed.
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}

impl Error {
    /// Whether this error came from talking to a remote.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed(_) | Self::PushFailed(_) | Self::RemoteNotFound(_)
        )
    }
}
