//! Value types exchanged with the repository layer.

use std::fmt;

use git2::Oid;

/// Where a branch ref lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locality {
    /// `refs/heads/*`.
    Local,
    /// `refs/remotes/<remote>/*`.
    Remote {
        /// Name of the remote, e.g. `origin`.
        remote: String,
    },
}

/// A branch as seen in one ref namespace, with the namespace prefix stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchRef {
    /// Simple name, e.g. `feature/login` (never `origin/feature/login`).
    pub name: String,
    /// Which namespace the ref was found in.
    pub locality: Locality,
}

impl BranchRef {
    /// A local branch ref.
    #[must_use]
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locality: Locality::Local,
        }
    }

    /// A remote-tracking branch ref.
    #[must_use]
    pub fn remote(remote: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locality: Locality::Remote {
                remote: remote.into(),
            },
        }
    }

    /// Whether this ref is a local branch.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self.locality, Locality::Local)
    }
}

impl fmt::Display for BranchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locality {
            Locality::Local => write!(f, "{}", self.name),
            Locality::Remote { remote } => write!(f, "{remote}/{}", self.name),
        }
    }
}

/// A commit as yielded by an ancestry walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit id.
    pub id: Oid,
    /// Parent ids, first parent first.
    pub parents: Vec<Oid>,
    /// Committer time, seconds since the epoch.
    pub time: i64,
    /// First line of the message.
    pub summary: String,
}

/// Which commits an ancestry walk yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkFilter {
    /// Every commit reachable from any start.
    All,
    /// Only commits reachable from every start; the first one is the merge base.
    MergeBase,
}

/// How a source branch is merged into the checked-out branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Fast-forward when possible, otherwise create a merge commit.
    #[default]
    Normal,
    /// Always create a merge commit.
    NoFastForward,
    /// Apply the combined changes as one single-parent commit.
    Squash,
    /// Only advance the ref; anything else is reported as [`MergeStatus::NotFastForward`].
    FastForwardOnly,
}

/// What a merge did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStatus {
    /// Nothing to merge.
    UpToDate,
    /// The target ref advanced to the given commit.
    FastForward(Oid),
    /// A merge commit was created.
    Merged(Oid),
    /// A squash commit was created.
    Squashed(Oid),
    /// The merge stopped with conflicts in these paths.
    Conflicted(Vec<String>),
    /// A fast-forward-only merge was not possible.
    NotFastForward,
}

impl MergeStatus {
    /// Whether the merge left the target containing the source changes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Conflicted(_) | Self::NotFastForward)
    }

    /// Paths reported as conflicting; empty unless [`MergeStatus::Conflicted`].
    #[must_use]
    pub fn conflicts(&self) -> &[String] {
        match self {
            Self::Conflicted(paths) => paths,
            _ => &[],
        }
    }
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate => write!(f, "already up to date"),
            Self::FastForward(id) => write!(f, "fast-forwarded to {}", short(*id)),
            Self::Merged(id) => write!(f, "merge commit {}", short(*id)),
            Self::Squashed(id) => write!(f, "squash commit {}", short(*id)),
            Self::Conflicted(paths) => write!(f, "conflicts in {} file(s)", paths.len()),
            Self::NotFastForward => write!(f, "not possible to fast-forward"),
        }
    }
}

/// What a rebase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseStatus {
    /// All commits were replayed.
    Done,
    /// The rebase hit conflicts in these paths and was aborted.
    Conflicted(Vec<String>),
}

/// Raw working tree state; ignored paths are never included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    /// Paths not tracked by the index.
    pub untracked: Vec<String>,
    /// Tracked paths with staged or unstaged modifications.
    pub uncommitted: Vec<String>,
}

fn short(id: Oid) -> String {
    let mut s = id.to_string();
    s.truncate(8);
    s
}
