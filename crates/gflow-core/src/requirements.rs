//! Precondition checks run before a workflow operation mutates anything.
//!
//! Every check is a free function over [`GitOps`] returning `Ok` or the
//! specific precondition [`Error`]. Only [`require_local_branch_exists`]
//! has a side effect: it creates a tracking branch when the branch exists
//! only on the remote.

use gflow_git::{GitOps, WalkFilter};

use crate::config::FlowConfig;
use crate::error::{Error, Result};
use crate::reporter::Reporter;

/// Working tree verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanStatus {
    /// Untracked paths count against the tree (they were not allowed).
    pub has_untracked: bool,
    /// Tracked paths have staged or unstaged changes.
    pub has_uncommitted: bool,
    /// Summary for the user.
    pub message: String,
}

impl CleanStatus {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.has_untracked && !self.has_uncommitted
    }
}

/// Fails with `NotInitialized` unless the branch model is recorded.
///
/// # Errors
/// `NotInitialized`, or a repository error reading the config.
pub fn require_initialized<G: GitOps + ?Sized>(repo: &G) -> Result<()> {
    if FlowConfig::is_recorded(repo)? {
        Ok(())
    } else {
        Err(Error::NotInitialized)
    }
}

fn local_exists<G: GitOps + ?Sized>(repo: &G, name: &str) -> Result<bool> {
    Ok(repo.list_local_branches()?.iter().any(|b| b.name == name))
}

fn remote_exists<G: GitOps + ?Sized>(repo: &G, remote: &str, name: &str) -> Result<bool> {
    Ok(repo
        .list_remote_branches(remote)?
        .iter()
        .any(|b| b.name == name))
}

/// # Errors
/// `LocalBranchExists` if `name` is a local branch.
pub fn require_local_branch_absent<G: GitOps + ?Sized>(repo: &G, name: &str) -> Result<()> {
    if local_exists(repo, name)? {
        return Err(Error::LocalBranchExists(name.to_string()));
    }
    Ok(())
}

/// Ensure `name` exists locally, tracking it from `remote` if only the
/// remote has it.
///
/// # Errors
/// `LocalBranchMissing` if neither side has the branch.
pub fn require_local_branch_exists<G: GitOps + ?Sized>(
    repo: &G,
    remote: &str,
    name: &str,
    reporter: &mut Reporter,
) -> Result<()> {
    if local_exists(repo, name)? {
        return Ok(());
    }

    if repo.has_remote(remote) && remote_exists(repo, remote, name)? {
        repo.create_tracking_branch(name, remote)?;
        reporter.info(format!("created local branch {name} tracking {remote}/{name}"));
        if local_exists(repo, name)? {
            return Ok(());
        }
    }

    Err(Error::LocalBranchMissing(name.to_string()))
}

/// # Errors
/// `RemoteBranchExists` if `remote` has `name`.
pub fn require_remote_branch_absent<G: GitOps + ?Sized>(
    repo: &G,
    remote: &str,
    name: &str,
) -> Result<()> {
    if remote_exists(repo, remote, name)? {
        return Err(Error::RemoteBranchExists(format!("{remote}/{name}")));
    }
    Ok(())
}

/// # Errors
/// `RemoteBranchMissing` unless `remote` has `name`.
pub fn require_remote_branch_exists<G: GitOps + ?Sized>(
    repo: &G,
    remote: &str,
    name: &str,
) -> Result<()> {
    if !remote_exists(repo, remote, name)? {
        return Err(Error::RemoteBranchMissing(format!("{remote}/{name}")));
    }
    Ok(())
}

/// # Errors
/// `TagExists` if a tag called `name` exists.
pub fn require_tag_absent<G: GitOps + ?Sized>(repo: &G, name: &str) -> Result<()> {
    if repo.list_tags()?.iter().any(|t| t == name) {
        return Err(Error::TagExists(name.to_string()));
    }
    Ok(())
}

/// Compute the working tree verdict without failing.
///
/// # Errors
/// Returns error if the status cannot be read.
pub fn clean_status<G: GitOps + ?Sized>(repo: &G, allow_untracked: bool) -> Result<CleanStatus> {
    let raw = repo.working_tree_status()?;
    let has_untracked = !allow_untracked && !raw.untracked.is_empty();
    let has_uncommitted = !raw.uncommitted.is_empty();

    let mut parts = Vec::new();
    if has_uncommitted {
        parts.push(format!("{} uncommitted change(s)", raw.uncommitted.len()));
    }
    if has_untracked {
        parts.push(format!("{} untracked file(s)", raw.untracked.len()));
    }
    let message = if parts.is_empty() {
        "working tree clean".to_string()
    } else {
        parts.join(", ")
    };

    Ok(CleanStatus {
        has_untracked,
        has_uncommitted,
        message,
    })
}

/// # Errors
/// `DirtyWorkingTree` carrying the status message.
pub fn require_clean_working_tree<G: GitOps + ?Sized>(
    repo: &G,
    allow_untracked: bool,
) -> Result<CleanStatus> {
    let status = clean_status(repo, allow_untracked)?;
    if !status.is_clean() {
        return Err(Error::DirtyWorkingTree(status.message));
    }
    Ok(status)
}

/// # Errors
/// `BranchExists` naming the first local branch that starts with `prefix`.
pub fn require_no_existing_topic_branch<G: GitOps + ?Sized>(repo: &G, prefix: &str) -> Result<()> {
    if let Some(existing) = repo
        .list_local_branches()?
        .into_iter()
        .find(|b| b.name.starts_with(prefix))
    {
        return Err(Error::BranchExists {
            prefix: prefix.to_string(),
            branch: existing.name,
        });
    }
    Ok(())
}

/// Fail if `<remote>/<name>` has commits the local branch lacks.
///
/// A local branch that is strictly ahead passes, as does a branch with no
/// remote counterpart.
///
/// # Errors
/// `BranchOutOfDate` when behind or diverged, `LocalBranchMissing` when
/// there is no local branch.
pub fn require_local_branch_not_behind_remote<G: GitOps + ?Sized>(
    repo: &G,
    remote: &str,
    name: &str,
) -> Result<()> {
    let Some(remote_tip) = repo.resolve_ref(&format!("{remote}/{name}"))? else {
        return Ok(());
    };
    let local_tip = repo
        .resolve_ref(name)?
        .ok_or_else(|| Error::LocalBranchMissing(name.to_string()))?;
    if local_tip == remote_tip {
        return Ok(());
    }

    let base = repo
        .ancestry(&[local_tip, remote_tip], WalkFilter::MergeBase)?
        .into_iter()
        .next()
        .map(|c| c.id);

    if base == Some(remote_tip) {
        return Ok(());
    }
    Err(Error::BranchOutOfDate {
        branch: name.to_string(),
        remote: remote.to_string(),
    })
}

/// Fail unless `commit` is in the history of `branch`.
///
/// # Errors
/// `CommitNotOnBranch` when the commit is unknown or not reachable,
/// `LocalBranchMissing` when the branch does not exist.
pub fn require_commit_on_branch<G: GitOps + ?Sized>(
    repo: &G,
    commit: &str,
    branch: &str,
) -> Result<()> {
    let not_on_branch = || Error::CommitNotOnBranch {
        commit: commit.to_string(),
        branch: branch.to_string(),
    };

    let id = repo.resolve_ref(commit)?.ok_or_else(not_on_branch)?;
    let tip = repo
        .resolve_ref(branch)?
        .ok_or_else(|| Error::LocalBranchMissing(branch.to_string()))?;

    let found = repo
        .ancestry(&[tip], WalkFilter::All)?
        .iter()
        .any(|c| c.id == id || c.parents.iter().skip(1).any(|p| *p == id));

    if found { Ok(()) } else { Err(not_on_branch()) }
}
