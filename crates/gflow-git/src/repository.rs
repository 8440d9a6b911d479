//! Repository wrapper providing high-level git operations.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{
    BranchType, ConfigLevel, Cred, CredentialType, ErrorCode, FetchOptions, ObjectType, Oid,
    PushOptions, RemoteCallbacks, RepositoryState, ResetType, Signature, Sort, StatusOptions,
};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{
    BranchRef, CommitInfo, MergeStatus, MergeStrategy, RebaseStatus, WalkFilter,
    WorkingTreeStatus,
};

/// High-level wrapper around a git repository.
pub struct Repository {
    inner: git2::Repository,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                Error::NotARepository
            } else {
                Error::Git2(e)
            }
        })?;
        Ok(Self { inner })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Get the path to the repository root (workdir).
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    /// Get the current repository state.
    #[must_use]
    pub fn state(&self) -> RepositoryState {
        self.inner.state()
    }

    // === Branch operations ===

    /// Get the name of the current branch.
    ///
    /// # Errors
    /// Returns error if HEAD is detached.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.inner.head()?;
        if !head.is_branch() {
            return Err(Error::DetachedHead);
        }

        head.shorthand()
            .map(String::from)
            .ok_or(Error::DetachedHead)
    }

    /// Check if a branch exists.
    #[must_use]
    pub fn branch_exists(&self, name: &str) -> bool {
        self.inner.find_branch(name, BranchType::Local).is_ok()
    }

    /// Get the commit SHA for a branch.
    ///
    /// # Errors
    /// Returns error if branch doesn't exist.
    pub fn branch_commit(&self, branch_name: &str) -> Result<Oid> {
        let branch = self
            .inner
            .find_branch(branch_name, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(branch_name.into()))?;

        branch
            .get()
            .target()
            .ok_or_else(|| Error::BranchNotFound(branch_name.into()))
    }

    /// Resolve any revision to the commit it names.
    ///
    /// # Errors
    /// Returns error if the revision exists but does not peel to a commit.
    pub fn resolve_ref(&self, name: &str) -> Result<Option<Oid>> {
        match self.inner.revparse_single(name) {
            Ok(object) => Ok(Some(object.peel_to_commit()?.id())),
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List all local branches, sorted by name.
    ///
    /// # Errors
    /// Returns error if branch listing fails.
    pub fn list_local_branches(&self) -> Result<Vec<BranchRef>> {
        let mut refs = Vec::new();
        for entry in self.inner.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                refs.push(BranchRef::local(name));
            }
        }

        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    /// List remote-tracking branches of `remote` with the `<remote>/` prefix stripped.
    ///
    /// # Errors
    /// Returns error if branch listing fails.
    pub fn list_remote_branches(&self, remote: &str) -> Result<Vec<BranchRef>> {
        let prefix = format!("{remote}/");
        let mut refs = Vec::new();
        for entry in self.inner.branches(Some(BranchType::Remote))? {
            let (branch, _) = entry?;
            let Some(full) = branch.name()? else {
                continue;
            };
            if let Some(name) = full.strip_prefix(&prefix) {
                if name != "HEAD" {
                    refs.push(BranchRef::remote(remote, name));
                }
            }
        }

        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    /// Create a new branch at `start_point`.
    ///
    /// # Errors
    /// Returns error if the start point is unknown or the branch exists.
    pub fn create_branch(&self, name: &str, start_point: &str) -> Result<Oid> {
        let commit = self
            .inner
            .revparse_single(start_point)
            .map_err(|_| Error::RefNotFound(start_point.into()))?
            .peel_to_commit()?;
        let branch = self.inner.branch(name, &commit, false)?;
        debug!(branch = name, start_point, "created branch");

        branch
            .get()
            .target()
            .ok_or_else(|| Error::BranchNotFound(name.into()))
    }

    /// Create a local branch from `<remote>/<name>` with upstream set.
    ///
    /// # Errors
    /// Returns error if the remote-tracking branch does not exist.
    pub fn create_tracking_branch(&self, name: &str, remote: &str) -> Result<()> {
        let upstream = format!("{remote}/{name}");
        let remote_branch = self
            .inner
            .find_branch(&upstream, BranchType::Remote)
            .map_err(|_| Error::BranchNotFound(upstream.clone()))?;
        let commit = remote_branch.get().peel_to_commit()?;

        let mut branch = self.inner.branch(name, &commit, false)?;
        branch.set_upstream(Some(&upstream))?;
        debug!(branch = name, upstream = %upstream, "created tracking branch");
        Ok(())
    }

    /// Checkout a branch, creating it first when asked to.
    ///
    /// # Errors
    /// Returns error if the branch is missing or local changes would be overwritten.
    pub fn checkout(
        &self,
        branch_name: &str,
        create_if_missing: bool,
        start_point: Option<&str>,
    ) -> Result<()> {
        if create_if_missing && !self.branch_exists(branch_name) {
            self.create_branch(branch_name, start_point.unwrap_or("HEAD"))?;
        }

        let branch = self
            .inner
            .find_branch(branch_name, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(branch_name.into()))?;

        let reference = branch.get();
        let object = reference.peel(ObjectType::Commit)?;

        self.inner
            .checkout_tree(&object, Some(CheckoutBuilder::new().safe()))?;
        self.inner
            .set_head(&format!("refs/heads/{branch_name}"))?;

        Ok(())
    }

    /// Delete a local branch.
    ///
    /// # Errors
    /// Returns `BranchNotMerged` when not forced and the tip is not reachable from HEAD.
    pub fn delete_local_branch(&self, name: &str, force: bool) -> Result<()> {
        let mut branch = self
            .inner
            .find_branch(name, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(name.into()))?;

        if !force {
            let tip = branch
                .get()
                .target()
                .ok_or_else(|| Error::BranchNotFound(name.into()))?;
            let head = self.inner.head()?.peel_to_commit()?.id();
            if tip != head && !self.inner.graph_descendant_of(head, tip)? {
                return Err(Error::BranchNotMerged(name.into()));
            }
        }

        branch.delete()?;
        debug!(branch = name, force, "deleted branch");
        Ok(())
    }

    // === Merge operations ===

    /// Merge a local branch into the checked-out branch.
    ///
    /// Conflicts are reported as [`MergeStatus::Conflicted`] and left in the
    /// index and working tree for manual resolution.
    ///
    /// # Errors
    /// Returns error if another operation is in progress or git fails.
    pub fn merge(&self, source: &str, strategy: MergeStrategy) -> Result<MergeStatus> {
        if self.inner.state() != RepositoryState::Clean {
            return Err(Error::OperationInProgress);
        }

        let target = self.current_branch()?;
        let source_ref = self
            .inner
            .find_branch(source, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(source.into()))?
            .into_reference();
        let their = self.inner.reference_to_annotated_commit(&source_ref)?;

        let (analysis, _) = self.inner.merge_analysis(&[&their])?;
        if analysis.is_up_to_date() {
            return Ok(MergeStatus::UpToDate);
        }

        let can_fast_forward = analysis.is_fast_forward();
        match strategy {
            MergeStrategy::FastForwardOnly if !can_fast_forward => {
                return Ok(MergeStatus::NotFastForward);
            }
            MergeStrategy::Normal | MergeStrategy::FastForwardOnly if can_fast_forward => {
                return self
                    .fast_forward(&target, their.id())
                    .map(MergeStatus::FastForward);
            }
            _ => {}
        }

        let mut checkout = CheckoutBuilder::new();
        checkout.safe().allow_conflicts(true).conflict_style_merge(true);
        self.inner.merge(&[&their], None, Some(&mut checkout))?;

        let mut index = self.inner.index()?;
        if index.has_conflicts() {
            let paths = conflict_paths(&index)?;
            if strategy == MergeStrategy::Squash {
                // squash merges never record MERGE_HEAD
                self.inner.cleanup_state()?;
            }
            debug!(source, target = %target, conflicts = paths.len(), "merge stopped");
            return Ok(MergeStatus::Conflicted(paths));
        }

        let tree = self.inner.find_tree(index.write_tree()?)?;
        let sig = self.signature()?;
        let head = self.inner.head()?.peel_to_commit()?;

        let status = if strategy == MergeStrategy::Squash {
            let message = format!("Squashed commit of branch '{source}'");
            let id = self
                .inner
                .commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&head])?;
            MergeStatus::Squashed(id)
        } else {
            let message = format!("Merge branch '{source}' into {target}");
            let theirs = self.inner.find_commit(their.id())?;
            let id = self
                .inner
                .commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&head, &theirs])?;
            MergeStatus::Merged(id)
        };

        self.inner.cleanup_state()?;
        debug!(source, target = %target, %status, "merge finished");
        Ok(status)
    }

    fn fast_forward(&self, target: &str, to: Oid) -> Result<Oid> {
        let commit = self.inner.find_commit(to)?;
        self.inner
            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))?;

        let mut reference = self.inner.find_reference(&format!("refs/heads/{target}"))?;
        reference.set_target(to, &format!("gflow: fast-forward {target}"))?;
        Ok(to)
    }

    /// Discard an in-progress merge, resetting to HEAD.
    ///
    /// # Errors
    /// Returns error if the reset fails.
    pub fn abort_merge(&self) -> Result<()> {
        let head = self.inner.head()?.peel_to_commit()?;
        self.inner
            .reset(head.as_object(), ResetType::Hard, None)?;
        self.inner.cleanup_state()?;
        Ok(())
    }

    /// Rebase the checked-out branch onto `onto`.
    ///
    /// A conflicting rebase is aborted and reported, leaving the branch untouched.
    ///
    /// # Errors
    /// Returns error if HEAD is detached or git fails.
    pub fn rebase(&self, onto: &str) -> Result<RebaseStatus> {
        let head = self.inner.head()?;
        if !head.is_branch() {
            return Err(Error::DetachedHead);
        }

        let onto_id = self
            .resolve_ref(onto)?
            .ok_or_else(|| Error::RefNotFound(onto.into()))?;
        let branch = self.inner.reference_to_annotated_commit(&head)?;
        let upstream = self.inner.find_annotated_commit(onto_id)?;
        let sig = self.signature()?;

        let mut rebase = self
            .inner
            .rebase(Some(&branch), Some(&upstream), None, None)?;
        while let Some(operation) = rebase.next() {
            operation?;

            let index = self.inner.index()?;
            if index.has_conflicts() {
                let paths = conflict_paths(&index)?;
                rebase.abort()?;
                return Ok(RebaseStatus::Conflicted(paths));
            }

            match rebase.commit(None, &sig, None) {
                // the patch was already upstream
                Err(e) if e.code() == ErrorCode::Applied => {}
                Err(e) => return Err(e.into()),
                Ok(_) => {}
            }
        }

        rebase.finish(Some(&sig))?;
        Ok(RebaseStatus::Done)
    }

    // === Tags ===

    /// List all tag names.
    ///
    /// # Errors
    /// Returns error if tags cannot be read.
    pub fn list_tags(&self) -> Result<Vec<String>> {
        let names = self.inner.tag_names(None)?;
        Ok(names.iter().flatten().map(String::from).collect())
    }

    /// Create an annotated tag pointing at HEAD.
    ///
    /// # Errors
    /// Returns error if the tag already exists.
    pub fn create_tag(&self, name: &str, message: &str) -> Result<Oid> {
        let target = self.inner.head()?.peel(ObjectType::Commit)?;
        let sig = self.signature()?;
        let id = self.inner.tag(name, &target, &sig, message, false)?;
        debug!(tag = name, "created tag");
        Ok(id)
    }

    // === Remote operations ===

    /// Check if a remote is configured.
    #[must_use]
    pub fn has_remote(&self, name: &str) -> bool {
        self.inner.find_remote(name).is_ok()
    }

    /// Fetch a remote using its configured refspecs.
    ///
    /// # Errors
    /// Returns `RemoteNotFound` or `FetchFailed`.
    pub fn fetch(&self, remote_name: &str) -> Result<()> {
        let mut remote = self
            .inner
            .find_remote(remote_name)
            .map_err(|_| Error::RemoteNotFound(remote_name.into()))?;

        let mut options = FetchOptions::new();
        options.remote_callbacks(self.remote_callbacks());
        remote
            .fetch(&[] as &[&str], Some(&mut options), None)
            .map_err(|e| Error::FetchFailed(e.message().to_string()))?;

        debug!(remote = remote_name, "fetched");
        Ok(())
    }

    /// Push a single refspec.
    ///
    /// # Errors
    /// Returns `RemoteNotFound`, or `PushFailed` if the transport fails or
    /// the remote rejects the update.
    pub fn push(&self, remote_name: &str, refspec: &str) -> Result<()> {
        let mut remote = self
            .inner
            .find_remote(remote_name)
            .map_err(|_| Error::RemoteNotFound(remote_name.into()))?;

        let mut rejected: Option<String> = None;
        {
            let mut callbacks = self.remote_callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    rejected = Some(format!("{refname}: {message}"));
                }
                Ok(())
            });

            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            remote
                .push(&[refspec], Some(&mut options))
                .map_err(|e| Error::PushFailed(e.message().to_string()))?;
        }

        if let Some(reason) = rejected {
            return Err(Error::PushFailed(reason));
        }

        debug!(remote = remote_name, refspec, "pushed");
        Ok(())
    }

    fn remote_callbacks<'cb>(&self) -> RemoteCallbacks<'cb> {
        let config = self.inner.config().ok();
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed| {
            if allowed.contains(CredentialType::SSH_KEY) {
                if let Some(user) = username {
                    return Cred::ssh_key_from_agent(user);
                }
            }
            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(config) = &config {
                    return Cred::credential_helper(config, url, username);
                }
            }
            Cred::default()
        });
        callbacks
    }

    // === Working directory state ===

    /// Collect untracked and uncommitted paths; ignored paths are skipped.
    ///
    /// # Errors
    /// Returns error if status check fails.
    pub fn working_tree_status(&self) -> Result<WorkingTreeStatus> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .exclude_submodules(true);

        let mut status = WorkingTreeStatus::default();
        for entry in self.inner.statuses(Some(&mut options))?.iter() {
            let Some(path) = entry.path() else {
                continue;
            };
            let flags = entry.status();
            if flags.is_ignored() {
                continue;
            }
            if flags == git2::Status::WT_NEW {
                status.untracked.push(path.to_string());
            } else {
                status.uncommitted.push(path.to_string());
            }
        }

        Ok(status)
    }

    /// Check if the working directory is clean, untracked files included.
    ///
    /// # Errors
    /// Returns error if status check fails.
    pub fn is_clean(&self) -> Result<bool> {
        let status = self.working_tree_status()?;
        Ok(status.untracked.is_empty() && status.uncommitted.is_empty())
    }

    // === Commit operations ===

    /// Walk the history reachable from `starts`, newest first.
    ///
    /// With [`WalkFilter::MergeBase`] only commits reachable from every start
    /// are yielded, so the first element is the merge base.
    ///
    /// # Errors
    /// Returns error if a start commit is unknown.
    pub fn ancestry(&self, starts: &[Oid], filter: WalkFilter) -> Result<Vec<CommitInfo>> {
        let ids = self.walk(starts)?;
        let ids: Vec<Oid> = match filter {
            WalkFilter::All => ids,
            WalkFilter::MergeBase => {
                let mut reachable = Vec::with_capacity(starts.len());
                for start in starts {
                    let set: HashSet<Oid> = self
                        .walk(std::slice::from_ref(start))?
                        .into_iter()
                        .collect();
                    reachable.push(set);
                }
                ids.into_iter()
                    .filter(|id| reachable.iter().all(|set| set.contains(id)))
                    .collect()
            }
        };

        ids.into_iter().map(|id| self.commit_info(id)).collect()
    }

    fn walk(&self, starts: &[Oid]) -> Result<Vec<Oid>> {
        let mut revwalk = self.inner.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        for start in starts {
            revwalk.push(*start)?;
        }

        revwalk.map(|id| id.map_err(Error::from)).collect()
    }

    fn commit_info(&self, id: Oid) -> Result<CommitInfo> {
        let commit = self.inner.find_commit(id)?;
        Ok(CommitInfo {
            id,
            parents: commit.parent_ids().collect(),
            time: commit.time().seconds(),
            summary: commit.summary().unwrap_or_default().to_string(),
        })
    }

    // === Config ===

    /// Read a string from the layered git config.
    ///
    /// # Errors
    /// Returns error if the config cannot be opened.
    pub fn config_value(&self, key: &str) -> Result<Option<String>> {
        let config = self.inner.config()?;
        match config.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a string to the repository-local config.
    ///
    /// # Errors
    /// Returns error if the config file cannot be written.
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.inner.config()?.open_level(ConfigLevel::Local)?;
        config.set_str(key, value)?;
        Ok(())
    }

    // === Signature ===

    /// Get the signature for commits and tags, falling back to a tool identity
    /// when user.name/user.email are not configured.
    ///
    /// # Errors
    /// Returns error if git config cannot be read.
    pub fn signature(&self) -> Result<Signature<'static>> {
        match self.inner.signature() {
            Ok(sig) => Ok(sig),
            Err(e) if e.code() == ErrorCode::NotFound => {
                Ok(Signature::now("gflow", "gflow@localhost")?)
            }
            Err(e) => Err(e.into()),
        }
    }

    // === Low-level access ===

    /// Get a reference to the underlying git2 repository.
    ///
    /// Use sparingly - prefer high-level methods.
    #[must_use]
    pub const fn inner(&self) -> &git2::Repository {
        &self.inner
    }
}

impl From<git2::Repository> for Repository {
    fn from(inner: git2::Repository) -> Self {
        Self { inner }
    }
}

fn conflict_paths(index: &git2::Index) -> Result<Vec<String>> {
    let mut paths = BTreeSet::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
        if let Some(entry) = entry {
            paths.insert(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    Ok(paths.into_iter().collect())
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .finish()
    }
}
