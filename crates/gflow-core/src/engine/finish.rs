//! feature/release/hotfix finish.

use gflow_git::{GitOps, MergeStrategy, RebaseStatus};

use super::{FinishOptions, FlowEngine, Operation, ProductionFailurePolicy, Topic, TopicKind};
use crate::error::Result;
use crate::extension::HookPoint;
use crate::merge_result::{MergeOutcome, MergeResult};
use crate::requirements;

const SKIPPED: &str = "skipped: production merge failed";

/// Strategy for merging the topic into a target.
const fn merge_strategy(options: &FinishOptions, kind: TopicKind) -> MergeStrategy {
    if options.squash {
        MergeStrategy::Squash
    } else if options.rebase && matches!(kind, TopicKind::Feature) {
        MergeStrategy::FastForwardOnly
    } else if options.no_ff {
        MergeStrategy::NoFastForward
    } else {
        MergeStrategy::Normal
    }
}

impl<G: GitOps> FlowEngine<'_, G> {
    /// Merge `feature/<name>` into the integration branch.
    ///
    /// A conflicting merge is returned as an unsuccessful outcome with the
    /// conflicts left in the working tree; the branch is then kept.
    ///
    /// # Errors
    /// Precondition, extension, transport or repository errors; see [`crate::Error`].
    pub fn feature_finish(&mut self, name: &str, options: &FinishOptions) -> Result<MergeOutcome> {
        self.run(Operation::FeatureFinish, |engine| {
            engine.finish_feature(name, options)
        })
    }

    /// Merge `release/<name>` into production and integration and tag it.
    ///
    /// # Errors
    /// Precondition, extension, transport or repository errors; see [`crate::Error`].
    pub fn release_finish(&mut self, name: &str, options: &FinishOptions) -> Result<MergeResult> {
        self.run(Operation::ReleaseFinish, |engine| {
            engine.finish_dual(Operation::ReleaseFinish, name, options)
        })
    }

    /// Merge `hotfix/<name>` into production and tag it, then into the open
    /// release branch if there is one, otherwise into integration.
    ///
    /// # Errors
    /// Precondition, extension, transport or repository errors; see [`crate::Error`].
    pub fn hotfix_finish(&mut self, name: &str, options: &FinishOptions) -> Result<MergeResult> {
        self.run(Operation::HotfixFinish, |engine| {
            engine.finish_dual(Operation::HotfixFinish, name, options)
        })
    }

    fn finish_feature(&mut self, name: &str, options: &FinishOptions) -> Result<MergeOutcome> {
        let op = Operation::FeatureFinish;
        let topic = Topic::new(self.config, TopicKind::Feature, name)?;
        let integration = self.config.integration().to_string();

        requirements::require_initialized(self.repo)?;
        requirements::require_clean_working_tree(self.repo, options.allow_untracked)?;
        self.require_branches(&[topic.branch.as_str(), integration.as_str()])?;

        self.fire(op, HookPoint::Before, &topic)?;
        if options.fetch {
            self.fetch_phase(op, &topic, &[topic.branch.as_str(), integration.as_str()])?;
        }
        self.checkout_topic(op, &topic)?;

        if options.rebase && !options.squash {
            let step = format!("rebase {} onto {integration}", topic.branch);
            let status = self.step(step, |repo| repo.rebase(&integration))?;
            if let RebaseStatus::Conflicted(_) = status {
                let outcome = MergeOutcome::from_rebase(&integration, &status);
                self.reporter.warn(format!("{outcome}"));
                return Ok(outcome);
            }
        }

        let strategy = merge_strategy(options, topic.kind);
        let outcome = self.merge_into(op, &topic, &integration, strategy)?;
        if !outcome.succeeded {
            self.reporter
                .warn(format!("{outcome}; resolve and commit on {integration}"));
            return Ok(outcome);
        }

        self.delete_phase(op, &topic, options)?;

        if options.push {
            self.push(&format!("refs/heads/{integration}:refs/heads/{integration}"))?;
            self.push_topic_deletion(&topic, options)?;
            self.fire(op, HookPoint::AfterPush, &topic)?;
        }

        self.fire(op, HookPoint::After, &topic)?;
        Ok(outcome)
    }

    fn finish_dual(
        &mut self,
        op: Operation,
        name: &str,
        options: &FinishOptions,
    ) -> Result<MergeResult> {
        let topic = Topic::new(self.config, op.kind(), name)?;
        let tag = topic.tag(self.config)?;
        let production = self.config.production().to_string();
        let integration = self.config.integration().to_string();

        requirements::require_initialized(self.repo)?;
        requirements::require_clean_working_tree(self.repo, options.allow_untracked)?;
        let second = self.second_target(&topic)?;
        let mut branches = vec![
            topic.branch.as_str(),
            production.as_str(),
            integration.as_str(),
        ];
        if second != integration {
            branches.push(second.as_str());
        }
        self.require_branches(&branches)?;
        if !options.no_tag {
            requirements::require_tag_absent(self.repo, &tag)?;
        }

        self.fire(op, HookPoint::Before, &topic)?;
        if options.fetch {
            self.fetch_phase(op, &topic, &branches)?;
        }
        self.checkout_topic(op, &topic)?;

        let strategy = merge_strategy(options, topic.kind);

        // production
        self.fire(op, HookPoint::BeforeProductionCheckout, &topic)?;
        self.step(format!("checkout {production}"), |repo| {
            repo.checkout(&production, false, None)
        })?;
        self.fire(op, HookPoint::AfterProductionCheckout, &topic)?;
        self.fire(op, HookPoint::BeforeProductionMerge, &topic)?;
        let prod_outcome = self.merge_step(&topic, &production, strategy)?;

        let mut tagged = false;
        let integ_outcome = if prod_outcome.succeeded {
            self.fire(op, HookPoint::AfterProductionMerge, &topic)?;
            if !options.no_tag {
                let message = options
                    .tag_message
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", topic.kind, topic.name));
                self.fire(op, HookPoint::BeforeTag, &topic)?;
                self.step(format!("tag {tag}"), |repo| repo.create_tag(&tag, &message))?;
                self.fire(op, HookPoint::AfterTag, &topic)?;
                tagged = true;
            }
            self.merge_into(op, &topic, &second, strategy)?
        } else {
            self.reporter.warn(format!("{prod_outcome}"));
            match options.production_failure.unwrap_or(self.production_failure) {
                ProductionFailurePolicy::Halt => MergeOutcome::skipped(&second, SKIPPED),
                ProductionFailurePolicy::Continue => {
                    if prod_outcome.has_conflicts() {
                        self.step(format!("abort merge into {production}"), |repo| {
                            repo.abort_merge()
                        })?;
                    }
                    self.merge_into(op, &topic, &second, strategy)?
                }
            }
        };

        let result = MergeResult::new(prod_outcome, integ_outcome);
        if !result.was_successful() {
            for failed in result.failures() {
                self.reporter
                    .warn(format!("{failed}; resolve and commit on {}", failed.target));
            }
            return Ok(result);
        }

        self.delete_phase(op, &topic, options)?;

        if options.push {
            self.push(&format!("refs/heads/{production}:refs/heads/{production}"))?;
            self.push(&format!("refs/heads/{second}:refs/heads/{second}"))?;
            if tagged {
                self.push(&format!("refs/tags/{tag}:refs/tags/{tag}"))?;
            }
            self.push_topic_deletion(&topic, options)?;
            self.fire(op, HookPoint::AfterPush, &topic)?;
        }

        self.fire(op, HookPoint::After, &topic)?;
        Ok(result)
    }

    fn require_branches(&mut self, branches: &[&str]) -> Result<()> {
        for branch in branches {
            requirements::require_local_branch_exists(
                self.repo,
                &self.remote,
                branch,
                &mut self.reporter,
            )?;
        }
        Ok(())
    }

    fn checkout_topic(&mut self, op: Operation, topic: &Topic) -> Result<()> {
        self.step(format!("checkout {}", topic.branch), |repo| {
            repo.checkout(&topic.branch, false, None)
        })?;
        self.fire(op, HookPoint::AfterTopicCheckout, topic)
    }

    /// Where a release or hotfix is merged besides production.
    fn second_target(&self, topic: &Topic) -> Result<String> {
        let integration = self.config.integration().to_string();
        if topic.kind != TopicKind::Hotfix || !self.hotfix_into_release {
            return Ok(integration);
        }

        let release_prefix = self.config.prefix(TopicKind::Release);
        let open_release = self
            .repo
            .list_local_branches()?
            .into_iter()
            .find(|b| b.name.starts_with(release_prefix));
        Ok(open_release.map_or(integration, |b| b.name))
    }

    /// `beforeIntegrationCheckout -> checkout -> ... -> afterIntegrationMerge`.
    fn merge_into(
        &mut self,
        op: Operation,
        topic: &Topic,
        target: &str,
        strategy: MergeStrategy,
    ) -> Result<MergeOutcome> {
        self.fire(op, HookPoint::BeforeIntegrationCheckout, topic)?;
        self.step(format!("checkout {target}"), |repo| {
            repo.checkout(target, false, None)
        })?;
        self.fire(op, HookPoint::AfterIntegrationCheckout, topic)?;
        self.fire(op, HookPoint::BeforeIntegrationMerge, topic)?;

        let outcome = self.merge_step(topic, target, strategy)?;
        if outcome.succeeded {
            self.fire(op, HookPoint::AfterIntegrationMerge, topic)?;
        }
        Ok(outcome)
    }

    fn merge_step(
        &mut self,
        topic: &Topic,
        target: &str,
        strategy: MergeStrategy,
    ) -> Result<MergeOutcome> {
        let status = self.step(
            format!("merge {} into {target} ({strategy:?})", topic.branch),
            |repo| repo.merge(&topic.branch, strategy),
        )?;
        let outcome = MergeOutcome::capture(target, &status);
        self.reporter.info(format!("{outcome}"));
        Ok(outcome)
    }

    /// The delete hooks always fire; the branch itself survives `keep_branch`.
    fn delete_phase(&mut self, op: Operation, topic: &Topic, options: &FinishOptions) -> Result<()> {
        self.fire(op, HookPoint::BeforeDeleteBranch, topic)?;
        if options.keep_branch {
            self.reporter.info(format!("keeping {}", topic.branch));
        } else {
            let force = options.force_delete || options.squash;
            self.step(format!("delete {}", topic.branch), |repo| {
                repo.delete_local_branch(&topic.branch, force)
            })?;
        }
        self.fire(op, HookPoint::AfterDeleteBranch, topic)
    }

    fn push_topic_deletion(&mut self, topic: &Topic, options: &FinishOptions) -> Result<()> {
        if options.keep_branch {
            return Ok(());
        }
        let on_remote = self
            .repo
            .list_remote_branches(&self.remote)?
            .iter()
            .any(|b| b.name == topic.branch.as_str());
        if on_remote {
            self.push(&format!(":refs/heads/{}", topic.branch))?;
        }
        Ok(())
    }
}
