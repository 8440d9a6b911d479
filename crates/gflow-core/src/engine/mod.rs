//! Workflow command engine.
//!
//! One [`FlowEngine`] drives the six git-flow operations against a
//! repository. Each operation runs its requirement checks, then a fixed
//! linear step sequence with hook points around every mutating step.

mod finish;
mod start;

use std::fmt;

use gflow_git::GitOps;
use serde::{Deserialize, Serialize};

use crate::config::{FlowConfig, Settings};
use crate::error::{Error, Result};
use crate::extension::{Extension, FailStrategy, HookContext, HookPoint};
use crate::naming::{BranchName, TagName};
use crate::pipeline::run_hooks;
use crate::reporter::Reporter;

/// Kind of topic branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    Feature,
    Release,
    Hotfix,
}

impl TopicKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Release => "release",
            Self::Hotfix => "hotfix",
        }
    }

    /// Branch a topic of this kind starts from.
    #[must_use]
    pub fn base(self, config: &FlowConfig) -> &str {
        match self {
            Self::Feature | Self::Release => config.integration(),
            Self::Hotfix => config.production(),
        }
    }

    /// Whether finishing merges into production and tags it.
    #[must_use]
    pub const fn is_dual_target(self) -> bool {
        !matches!(self, Self::Feature)
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FeatureStart,
    FeatureFinish,
    ReleaseStart,
    ReleaseFinish,
    HotfixStart,
    HotfixFinish,
}

const START_POINTS: &[HookPoint] = &[
    HookPoint::Before,
    HookPoint::BeforeFetch,
    HookPoint::AfterFetch,
    HookPoint::BeforeCreateBranch,
    HookPoint::AfterCreateBranch,
    HookPoint::AfterPush,
    HookPoint::After,
];

const FEATURE_FINISH_POINTS: &[HookPoint] = &[
    HookPoint::Before,
    HookPoint::BeforeFetch,
    HookPoint::AfterFetch,
    HookPoint::AfterTopicCheckout,
    HookPoint::BeforeIntegrationCheckout,
    HookPoint::AfterIntegrationCheckout,
    HookPoint::BeforeIntegrationMerge,
    HookPoint::AfterIntegrationMerge,
    HookPoint::BeforeDeleteBranch,
    HookPoint::AfterDeleteBranch,
    HookPoint::AfterPush,
    HookPoint::After,
];

const DUAL_FINISH_POINTS: &[HookPoint] = &[
    HookPoint::Before,
    HookPoint::BeforeFetch,
    HookPoint::AfterFetch,
    HookPoint::AfterTopicCheckout,
    HookPoint::BeforeProductionCheckout,
    HookPoint::AfterProductionCheckout,
    HookPoint::BeforeProductionMerge,
    HookPoint::AfterProductionMerge,
    HookPoint::BeforeTag,
    HookPoint::AfterTag,
    HookPoint::BeforeIntegrationCheckout,
    HookPoint::AfterIntegrationCheckout,
    HookPoint::BeforeIntegrationMerge,
    HookPoint::AfterIntegrationMerge,
    HookPoint::BeforeDeleteBranch,
    HookPoint::AfterDeleteBranch,
    HookPoint::AfterPush,
    HookPoint::After,
];

impl Operation {
    /// Name used in traces, e.g. `release-finish`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FeatureStart => "feature-start",
            Self::FeatureFinish => "feature-finish",
            Self::ReleaseStart => "release-start",
            Self::ReleaseFinish => "release-finish",
            Self::HotfixStart => "hotfix-start",
            Self::HotfixFinish => "hotfix-finish",
        }
    }

    #[must_use]
    pub const fn kind(self) -> TopicKind {
        match self {
            Self::FeatureStart | Self::FeatureFinish => TopicKind::Feature,
            Self::ReleaseStart | Self::ReleaseFinish => TopicKind::Release,
            Self::HotfixStart | Self::HotfixFinish => TopicKind::Hotfix,
        }
    }

    #[must_use]
    pub const fn is_start(self) -> bool {
        matches!(
            self,
            Self::FeatureStart | Self::ReleaseStart | Self::HotfixStart
        )
    }

    /// Hook points this operation dispatches, in dispatch order.
    #[must_use]
    pub const fn hook_points(self) -> &'static [HookPoint] {
        match self {
            Self::FeatureStart | Self::ReleaseStart | Self::HotfixStart => START_POINTS,
            Self::FeatureFinish => FEATURE_FINISH_POINTS,
            Self::ReleaseFinish | Self::HotfixFinish => DUAL_FINISH_POINTS,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a dual-target finish does after the production merge failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductionFailurePolicy {
    /// Leave production conflicted and skip the integration merge.
    #[default]
    Halt,
    /// Abort the production merge and still merge into integration.
    Continue,
}

/// Options for start operations.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Fetch the remote first and check the base branch is up to date.
    pub fetch: bool,
    /// Push the new branch to the remote.
    pub push: bool,
    /// Commit to branch from instead of the base tip; must be on the base branch.
    pub start_point: Option<String>,
    /// Do not count untracked files as dirty.
    pub allow_untracked: bool,
}

/// Options for finish operations.
#[derive(Debug, Clone, Default)]
pub struct FinishOptions {
    /// Fetch the remote first and check every involved branch is up to date.
    pub fetch: bool,
    /// Push the targets (and tag) and delete the remote topic branch.
    pub push: bool,
    /// Keep the topic branch after finishing.
    pub keep_branch: bool,
    /// Delete the topic branch even if git considers it unmerged.
    pub force_delete: bool,
    /// Squash the topic into a single commit on each target.
    pub squash: bool,
    /// Rebase the feature onto integration, then fast-forward (features only).
    pub rebase: bool,
    /// Always create a merge commit.
    pub no_ff: bool,
    /// Skip tagging production.
    pub no_tag: bool,
    /// Tag message; defaults to `"<kind> <name>"`.
    pub tag_message: Option<String>,
    /// Do not count untracked files as dirty.
    pub allow_untracked: bool,
    /// Overrides the engine's production-failure policy.
    pub production_failure: Option<ProductionFailurePolicy>,
}

/// What a start operation created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    /// The new topic branch, e.g. `release/1.0`.
    pub branch: String,
    /// Branch or commit it was created from.
    pub base: String,
}

/// A validated topic branch of one operation.
#[derive(Debug, Clone)]
pub(crate) struct Topic {
    kind: TopicKind,
    name: String,
    branch: BranchName,
}

impl Topic {
    fn new(config: &FlowConfig, kind: TopicKind, name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidBranchName {
                name: name.to_string(),
                reason: "topic name cannot be empty".into(),
            });
        }
        let branch = BranchName::new(format!("{}{name}", config.prefix(kind)))?;
        Ok(Self {
            kind,
            name: name.to_string(),
            branch,
        })
    }

    fn tag(&self, config: &FlowConfig) -> Result<TagName> {
        TagName::new(format!("{}{}", config.tag_prefix(), self.name))
    }
}

/// Runs git-flow operations against a repository.
///
/// # Example
///
/// ```no_run
/// use gflow_core::{FlowConfig, FlowEngine, StartOptions};
/// use gflow_git::Repository;
///
/// let repo = Repository::open_current()?;
/// let config = FlowConfig::load(&repo)?;
/// let mut engine = FlowEngine::new(&repo, &config);
/// engine.feature_start("login", &StartOptions::default())?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct FlowEngine<'a, G: GitOps> {
    repo: &'a G,
    config: &'a FlowConfig,
    extension: Option<&'a Extension>,
    fail_policy: FailStrategy,
    production_failure: ProductionFailurePolicy,
    hotfix_into_release: bool,
    remote: String,
    reporter: Reporter,
}

impl<'a, G: GitOps> FlowEngine<'a, G> {
    /// Create an engine with default settings and no extension.
    #[must_use]
    pub fn new(repo: &'a G, config: &'a FlowConfig) -> Self {
        Self {
            repo,
            config,
            extension: None,
            fail_policy: FailStrategy::default(),
            production_failure: ProductionFailurePolicy::default(),
            hotfix_into_release: true,
            remote: "origin".into(),
            reporter: Reporter::new(),
        }
    }

    /// Attach hooks for the next operations.
    #[must_use]
    pub const fn with_extension(mut self, extension: &'a Extension) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Strategy for hooks registered without one.
    #[must_use]
    pub const fn with_fail_policy(mut self, policy: FailStrategy) -> Self {
        self.fail_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_production_failure(mut self, policy: ProductionFailurePolicy) -> Self {
        self.production_failure = policy;
        self
    }

    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Replace the reporter, e.g. with one that writes a trace log.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Apply the policies from a settings file.
    #[must_use]
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.remote.clone_from(&settings.general.remote);
        self.fail_policy = settings.extensions.fail_strategy;
        self.production_failure = settings.finish.production_failure;
        self.hotfix_into_release = settings.finish.hotfix_into_release;
        self
    }

    /// Trace of the last operation.
    #[must_use]
    pub const fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Reset the trace, run `body`, record how it ended and flush.
    fn run<T>(&mut self, op: Operation, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.reporter.begin(op.as_str());
        if let Some(extension) = self.extension {
            for point in extension.unused_points(op) {
                self.reporter
                    .warn(format!("hooks at {point} never run during {op}"));
            }
        }

        let result = body(self);
        match &result {
            Ok(_) => self.reporter.info(format!("end {op}")),
            Err(e) => self.reporter.error(format!("{op} aborted: {e}")),
        }

        if let Err(e) = self.reporter.flush() {
            tracing::warn!(error = %e, "could not write trace log");
        }
        result
    }

    /// Dispatch the hooks at `point`.
    fn fire(&mut self, op: Operation, point: HookPoint, topic: &Topic) -> Result<()> {
        let Some(extension) = self.extension else {
            return Ok(());
        };
        let ctx = HookContext {
            repo: self.repo,
            config: self.config,
            operation: op,
            point,
            branch: topic.branch.as_str(),
            name: &topic.name,
        };
        run_hooks(extension, &ctx, self.fail_policy, &mut self.reporter)
    }

    /// Run one repository step, naming it in the trace and in any error.
    fn step<T>(
        &mut self,
        step: impl Into<String>,
        f: impl FnOnce(&'a G) -> gflow_git::Result<T>,
    ) -> Result<T> {
        let step = step.into();
        self.reporter.debug(step.clone());
        f(self.repo).map_err(|source| Error::Step { step, source })
    }

    /// Run a fetch or push; every failure is a transport failure.
    fn remote_step(
        &mut self,
        operation: &'static str,
        detail: &str,
        f: impl FnOnce(&'a G) -> gflow_git::Result<()>,
    ) -> Result<()> {
        self.reporter.debug(format!("{operation} {detail}"));
        f(self.repo).map_err(|source| Error::Transport { operation, source })
    }

    /// `[beforeFetch -> fetch -> afterFetch]`, then the behind-checks.
    fn fetch_phase(&mut self, op: Operation, topic: &Topic, up_to_date: &[&str]) -> Result<()> {
        self.fire(op, HookPoint::BeforeFetch, topic)?;
        let remote = self.remote.clone();
        self.remote_step("fetch", &remote, |repo| repo.fetch(&remote))?;
        self.fire(op, HookPoint::AfterFetch, topic)?;

        for branch in up_to_date {
            crate::requirements::require_local_branch_not_behind_remote(
                self.repo,
                &self.remote,
                branch,
            )?;
        }
        Ok(())
    }

    fn push(&mut self, refspec: &str) -> Result<()> {
        let remote = self.remote.clone();
        self.remote_step("push", refspec, |repo| repo.push(&remote, refspec))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_and_kinds() {
        assert_eq!(Operation::ReleaseFinish.as_str(), "release-finish");
        assert_eq!(Operation::HotfixStart.to_string(), "hotfix-start");
        assert_eq!(Operation::FeatureFinish.kind(), TopicKind::Feature);
        assert!(Operation::ReleaseStart.is_start());
        assert!(!Operation::HotfixFinish.is_start());
    }

    #[test]
    fn test_hook_point_subsets() {
        let start = Operation::FeatureStart.hook_points();
        assert_eq!(start.first(), Some(&HookPoint::Before));
        assert_eq!(start.last(), Some(&HookPoint::After));
        assert!(!start.contains(&HookPoint::BeforeTag));

        let feature = Operation::FeatureFinish.hook_points();
        assert!(!feature.contains(&HookPoint::BeforeProductionMerge));
        assert!(feature.contains(&HookPoint::BeforeDeleteBranch));

        let release = Operation::ReleaseFinish.hook_points();
        let prod = release
            .iter()
            .position(|p| *p == HookPoint::BeforeProductionMerge)
            .unwrap();
        let integ = release
            .iter()
            .position(|p| *p == HookPoint::BeforeIntegrationMerge)
            .unwrap();
        assert!(prod < integ);
    }

    #[test]
    fn test_topic_validation() {
        let config = FlowConfig::default();
        let topic = Topic::new(&config, TopicKind::Release, "1.0").unwrap();
        assert_eq!(topic.branch.as_str(), "release/1.0");
        assert_eq!(topic.tag(&config).unwrap().as_str(), "1.0");

        assert!(Topic::new(&config, TopicKind::Feature, "").is_err());
        assert!(Topic::new(&config, TopicKind::Feature, "a..b").is_err());
    }

    #[test]
    fn test_base_branch() {
        let config = FlowConfig::default();
        assert_eq!(TopicKind::Feature.base(&config), "develop");
        assert_eq!(TopicKind::Release.base(&config), "develop");
        assert_eq!(TopicKind::Hotfix.base(&config), "master");
    }
}
