//! In-memory `GitOps` for unit tests.
//!
//! Branches, tags and config live in `RefCell` maps; every mutating call is
//! appended to `calls` so tests can assert on the exact step sequence.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use gflow_git::{
    BranchRef, CommitInfo, GitOps, MergeStatus, MergeStrategy, Oid, RebaseStatus,
    Result as GitResult, WalkFilter, WorkingTreeStatus,
};

pub const REMOTE: &str = "origin";

/// Deterministic commit id.
pub fn oid(n: u8) -> Oid {
    Oid::from_bytes(&[n; 20]).unwrap()
}

/// Mock implementation of `GitOps` for testing.
pub struct MockGitOps {
    pub current: RefCell<String>,
    pub local: RefCell<BTreeMap<String, Oid>>,
    pub remote: RefCell<BTreeMap<String, Oid>>,
    pub tags: RefCell<BTreeMap<String, Oid>>,
    pub commits: RefCell<HashMap<Oid, CommitInfo>>,
    pub config: RefCell<HashMap<String, String>>,
    pub status: RefCell<WorkingTreeStatus>,
    /// Merge result per target branch; targets without an entry fast-forward.
    pub merge_results: RefCell<HashMap<String, MergeStatus>>,
    pub rebase_result: RefCell<RebaseStatus>,
    pub fail_fetch: Cell<bool>,
    pub fail_push: Cell<bool>,
    pub calls: RefCell<Vec<String>>,
}

impl Default for MockGitOps {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGitOps {
    pub fn new() -> Self {
        Self {
            current: RefCell::new("master".to_string()),
            local: RefCell::new(BTreeMap::new()),
            remote: RefCell::new(BTreeMap::new()),
            tags: RefCell::new(BTreeMap::new()),
            commits: RefCell::new(HashMap::new()),
            config: RefCell::new(HashMap::new()),
            status: RefCell::new(WorkingTreeStatus::default()),
            merge_results: RefCell::new(HashMap::new()),
            rebase_result: RefCell::new(RebaseStatus::Done),
            fail_fetch: Cell::new(false),
            fail_push: Cell::new(false),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_commit(self, id: u8, parents: &[u8], time: i64) -> Self {
        let info = CommitInfo {
            id: oid(id),
            parents: parents.iter().copied().map(oid).collect(),
            time,
            summary: format!("commit {id}"),
        };
        self.commits.borrow_mut().insert(info.id, info);
        self
    }

    pub fn with_branch(self, name: &str, tip: u8) -> Self {
        self.local.borrow_mut().insert(name.to_string(), oid(tip));
        self
    }

    pub fn with_remote_branch(self, name: &str, tip: u8) -> Self {
        self.remote.borrow_mut().insert(name.to_string(), oid(tip));
        self
    }

    pub fn with_tag(self, name: &str, tip: u8) -> Self {
        self.tags.borrow_mut().insert(name.to_string(), oid(tip));
        self
    }

    pub fn with_current(self, name: &str) -> Self {
        *self.current.borrow_mut() = name.to_string();
        self
    }

    pub fn with_merge_result(self, target: &str, status: MergeStatus) -> Self {
        self.merge_results
            .borrow_mut()
            .insert(target.to_string(), status);
        self
    }

    pub fn with_untracked(self, path: &str) -> Self {
        self.status.borrow_mut().untracked.push(path.to_string());
        self
    }

    pub fn with_uncommitted(self, path: &str) -> Self {
        self.status.borrow_mut().uncommitted.push(path.to_string());
        self
    }

    /// Record the default git-flow model.
    pub fn initialized(self) -> Self {
        crate::FlowConfig::default().record(&self).unwrap();
        self.calls.borrow_mut().clear();
        self
    }

    /// A develop/master repository, both at commit 1, checked out on develop.
    pub fn flow_repo() -> Self {
        Self::new()
            .with_commit(1, &[], 100)
            .with_branch("master", 1)
            .with_branch("develop", 1)
            .with_current("develop")
            .initialized()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Whether a call starting with `prefix` was made.
    pub fn called(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(prefix))
    }

    fn log(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn tip(&self, name: &str) -> Option<Oid> {
        if let Some(id) = self.local.borrow().get(name) {
            return Some(*id);
        }
        if let Some(id) = name
            .strip_prefix("origin/")
            .and_then(|n| self.remote.borrow().get(n).copied())
        {
            return Some(id);
        }
        if let Some(id) = self.tags.borrow().get(name) {
            return Some(*id);
        }
        if name == "HEAD" {
            return self.local.borrow().get(self.current.borrow().as_str()).copied();
        }
        Oid::from_str(name)
            .ok()
            .filter(|id| self.commits.borrow().contains_key(id))
    }

    fn reachable(&self, start: Oid) -> BTreeSet<Oid> {
        let commits = self.commits.borrow();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(info) = commits.get(&id) {
                queue.extend(info.parents.iter().copied());
            }
        }
        seen
    }
}

impl GitOps for MockGitOps {
    fn current_branch(&self) -> GitResult<String> {
        Ok(self.current.borrow().clone())
    }

    fn has_remote(&self, name: &str) -> bool {
        name == REMOTE
    }

    fn resolve_ref(&self, name: &str) -> GitResult<Option<Oid>> {
        Ok(self.tip(name))
    }

    fn list_local_branches(&self) -> GitResult<Vec<BranchRef>> {
        Ok(self.local.borrow().keys().map(BranchRef::local).collect())
    }

    fn list_remote_branches(&self, remote: &str) -> GitResult<Vec<BranchRef>> {
        if remote != REMOTE {
            return Ok(Vec::new());
        }
        Ok(self
            .remote
            .borrow()
            .keys()
            .map(|name| BranchRef::remote(remote, name))
            .collect())
    }

    fn list_tags(&self) -> GitResult<Vec<String>> {
        Ok(self.tags.borrow().keys().cloned().collect())
    }

    fn create_branch(&self, name: &str, start_point: &str) -> GitResult<Oid> {
        let tip = self
            .tip(start_point)
            .ok_or_else(|| gflow_git::Error::RefNotFound(start_point.to_string()))?;
        self.log(format!("create_branch {name} {start_point}"));
        self.local.borrow_mut().insert(name.to_string(), tip);
        Ok(tip)
    }

    fn create_tracking_branch(&self, name: &str, remote: &str) -> GitResult<()> {
        let tip = self
            .remote
            .borrow()
            .get(name)
            .copied()
            .ok_or_else(|| gflow_git::Error::BranchNotFound(format!("{remote}/{name}")))?;
        self.log(format!("track {name}"));
        self.local.borrow_mut().insert(name.to_string(), tip);
        Ok(())
    }

    fn checkout(
        &self,
        branch: &str,
        create_if_missing: bool,
        start_point: Option<&str>,
    ) -> GitResult<()> {
        let exists = self.local.borrow().contains_key(branch);
        if !exists {
            if !create_if_missing {
                return Err(gflow_git::Error::BranchNotFound(branch.to_string()));
            }
            self.create_branch(branch, start_point.unwrap_or("HEAD"))?;
        }
        self.log(format!("checkout {branch}"));
        *self.current.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn delete_local_branch(&self, name: &str, force: bool) -> GitResult<()> {
        if self.local.borrow_mut().remove(name).is_none() {
            return Err(gflow_git::Error::BranchNotFound(name.to_string()));
        }
        self.log(format!("delete {name} force={force}"));
        Ok(())
    }

    fn merge(&self, source: &str, strategy: MergeStrategy) -> GitResult<MergeStatus> {
        let target = self.current.borrow().clone();
        self.log(format!("merge {source} into {target} {strategy:?}"));

        if let Some(status) = self.merge_results.borrow().get(&target) {
            return Ok(status.clone());
        }
        let tip = self
            .tip(source)
            .ok_or_else(|| gflow_git::Error::BranchNotFound(source.to_string()))?;
        self.local.borrow_mut().insert(target, tip);
        Ok(MergeStatus::FastForward(tip))
    }

    fn abort_merge(&self) -> GitResult<()> {
        self.log("abort_merge".to_string());
        Ok(())
    }

    fn rebase(&self, onto: &str) -> GitResult<RebaseStatus> {
        let current = self.current.borrow().clone();
        self.log(format!("rebase {current} onto {onto}"));
        Ok(self.rebase_result.borrow().clone())
    }

    fn create_tag(&self, name: &str, message: &str) -> GitResult<Oid> {
        let current = self.current.borrow().clone();
        let tip = self
            .tip(&current)
            .ok_or_else(|| gflow_git::Error::BranchNotFound(current.clone()))?;
        self.log(format!("tag {name} on {current}: {message}"));
        self.tags.borrow_mut().insert(name.to_string(), tip);
        Ok(tip)
    }

    fn fetch(&self, remote: &str) -> GitResult<()> {
        if self.fail_fetch.get() {
            return Err(gflow_git::Error::FetchFailed("connection refused".into()));
        }
        self.log(format!("fetch {remote}"));
        Ok(())
    }

    fn push(&self, remote: &str, refspec: &str) -> GitResult<()> {
        if self.fail_push.get() {
            return Err(gflow_git::Error::PushFailed("connection refused".into()));
        }
        self.log(format!("push {remote} {refspec}"));
        Ok(())
    }

    fn working_tree_status(&self) -> GitResult<WorkingTreeStatus> {
        Ok(self.status.borrow().clone())
    }

    fn ancestry(&self, starts: &[Oid], filter: WalkFilter) -> GitResult<Vec<CommitInfo>> {
        let sets: Vec<BTreeSet<Oid>> = starts.iter().map(|s| self.reachable(*s)).collect();
        let union: BTreeSet<Oid> = sets.iter().flatten().copied().collect();

        let commits = self.commits.borrow();
        let mut out: Vec<CommitInfo> = union
            .into_iter()
            .filter(|id| match filter {
                WalkFilter::All => true,
                WalkFilter::MergeBase => sets.iter().all(|s| s.contains(id)),
            })
            .filter_map(|id| commits.get(&id).cloned())
            .collect();
        out.sort_by(|a, b| b.time.cmp(&a.time));
        Ok(out)
    }

    fn config_value(&self, key: &str) -> GitResult<Option<String>> {
        Ok(self.config.borrow().get(key).cloned())
    }

    fn set_config_value(&self, key: &str, value: &str) -> GitResult<()> {
        self.log(format!("config {key}={value}"));
        self.config
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
