//! Per-target merge outcomes of finish operations.
//!
//! Conflicts are data, not errors: a finish operation returns the outcome of
//! each merge and the caller decides what to do about a failed target.

use std::collections::BTreeSet;
use std::fmt;

use gflow_git::{BranchRef, MergeStatus, RebaseStatus};

/// Outcome of merging a topic branch into one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Branch that was merged into.
    pub target: BranchRef,
    /// Whether the target now contains the topic changes.
    pub succeeded: bool,
    /// Paths left conflicting; empty on success.
    pub conflicting_paths: BTreeSet<String>,
    /// Human-readable status.
    pub status_detail: String,
}

impl MergeOutcome {
    /// Capture what a merge into `target` did.
    #[must_use]
    pub fn capture(target: &str, status: &MergeStatus) -> Self {
        Self {
            target: BranchRef::local(target),
            succeeded: status.is_success(),
            conflicting_paths: status.conflicts().iter().cloned().collect(),
            status_detail: status.to_string(),
        }
    }

    /// Capture a rebase that stopped before the merge into `target` could run.
    #[must_use]
    pub fn from_rebase(target: &str, status: &RebaseStatus) -> Self {
        match status {
            RebaseStatus::Done => Self {
                target: BranchRef::local(target),
                succeeded: true,
                conflicting_paths: BTreeSet::new(),
                status_detail: format!("rebased onto {target}"),
            },
            RebaseStatus::Conflicted(paths) => Self {
                target: BranchRef::local(target),
                succeeded: false,
                conflicting_paths: paths.iter().cloned().collect(),
                status_detail: format!("rebase onto {target} stopped with conflicts"),
            },
        }
    }

    /// A failed placeholder for a merge that was not attempted.
    #[must_use]
    pub fn skipped(target: &str, reason: impl Into<String>) -> Self {
        Self {
            target: BranchRef::local(target),
            succeeded: false,
            conflicting_paths: BTreeSet::new(),
            status_detail: reason.into(),
        }
    }

    /// Whether the merge stopped on conflicts (as opposed to being skipped).
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicting_paths.is_empty()
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.status_detail)?;
        if self.has_conflicts() {
            let paths: Vec<&str> = self.conflicting_paths.iter().map(String::as_str).collect();
            write!(f, " ({})", paths.join(", "))?;
        }
        Ok(())
    }
}

/// Outcomes of a dual-target finish (release or hotfix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    production: MergeOutcome,
    integration: MergeOutcome,
}

impl MergeResult {
    /// Combine both captures.
    #[must_use]
    pub const fn new(production: MergeOutcome, integration: MergeOutcome) -> Self {
        Self {
            production,
            integration,
        }
    }

    /// Outcome of the production merge.
    #[must_use]
    pub const fn production(&self) -> &MergeOutcome {
        &self.production
    }

    /// Outcome of the integration (or release) merge.
    #[must_use]
    pub const fn integration(&self) -> &MergeOutcome {
        &self.integration
    }

    /// True only if both merges succeeded.
    #[must_use]
    pub const fn was_successful(&self) -> bool {
        self.production.succeeded && self.integration.succeeded
    }

    /// Outcomes that need manual attention, production first.
    pub fn failures(&self) -> impl Iterator<Item = &MergeOutcome> {
        [&self.production, &self.integration]
            .into_iter()
            .filter(|o| !o.succeeded)
    }
}
