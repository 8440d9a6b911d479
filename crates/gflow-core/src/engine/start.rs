//! feature/release/hotfix start.

use gflow_git::GitOps;

use super::{FlowEngine, Operation, StartOptions, StartReport, Topic, TopicKind};
use crate::error::Result;
use crate::extension::HookPoint;
use crate::requirements;

impl<G: GitOps> FlowEngine<'_, G> {
    /// Create `feature/<name>` from the integration branch and check it out.
    ///
    /// # Errors
    /// Precondition, extension, transport or repository errors; see [`crate::Error`].
    pub fn feature_start(&mut self, name: &str, options: &StartOptions) -> Result<StartReport> {
        self.run(Operation::FeatureStart, |engine| {
            engine.start(Operation::FeatureStart, name, options)
        })
    }

    /// Create `release/<name>` from the integration branch and check it out.
    ///
    /// Fails with `BranchExists` while another release branch is open.
    ///
    /// # Errors
    /// Precondition, extension, transport or repository errors; see [`crate::Error`].
    pub fn release_start(&mut self, name: &str, options: &StartOptions) -> Result<StartReport> {
        self.run(Operation::ReleaseStart, |engine| {
            engine.start(Operation::ReleaseStart, name, options)
        })
    }

    /// Create `hotfix/<name>` from the production branch and check it out.
    ///
    /// Fails with `BranchExists` while another hotfix branch is open.
    ///
    /// # Errors
    /// Precondition, extension, transport or repository errors; see [`crate::Error`].
    pub fn hotfix_start(&mut self, name: &str, options: &StartOptions) -> Result<StartReport> {
        self.run(Operation::HotfixStart, |engine| {
            engine.start(Operation::HotfixStart, name, options)
        })
    }

    fn start(&mut self, op: Operation, name: &str, options: &StartOptions) -> Result<StartReport> {
        let kind = op.kind();
        let topic = Topic::new(self.config, kind, name)?;
        let base = kind.base(self.config).to_string();

        // requirements
        requirements::require_initialized(self.repo)?;
        if kind != TopicKind::Feature {
            requirements::require_no_existing_topic_branch(self.repo, self.config.prefix(kind))?;
        }
        requirements::require_clean_working_tree(self.repo, options.allow_untracked)?;
        requirements::require_local_branch_absent(self.repo, &topic.branch)?;
        if kind.is_dual_target() {
            requirements::require_tag_absent(self.repo, &topic.tag(self.config)?)?;
        }
        requirements::require_local_branch_exists(
            self.repo,
            &self.remote,
            &base,
            &mut self.reporter,
        )?;
        if let Some(start_point) = &options.start_point {
            requirements::require_commit_on_branch(self.repo, start_point, &base)?;
        }

        self.fire(op, HookPoint::Before, &topic)?;

        if options.fetch {
            self.fetch_phase(op, &topic, &[base.as_str()])?;
            requirements::require_remote_branch_absent(self.repo, &self.remote, &topic.branch)?;
        }

        let from = options.start_point.clone().unwrap_or_else(|| base.clone());

        self.fire(op, HookPoint::BeforeCreateBranch, &topic)?;
        self.step(format!("create branch {}", topic.branch), |repo| {
            repo.create_branch(&topic.branch, &from)
        })?;
        self.step(format!("checkout {}", topic.branch), |repo| {
            repo.checkout(&topic.branch, false, None)
        })?;
        self.reporter
            .info(format!("created {} from {from}", topic.branch));
        self.fire(op, HookPoint::AfterCreateBranch, &topic)?;

        if options.push {
            self.push(&format!("refs/heads/{0}:refs/heads/{0}", topic.branch))?;
            self.fire(op, HookPoint::AfterPush, &topic)?;
        }

        self.fire(op, HookPoint::After, &topic)?;

        Ok(StartReport {
            branch: topic.branch.into_inner(),
            base: from,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::config::FlowConfig;
    use crate::engine::{FlowEngine, StartOptions};
    use crate::error::{Error, ErrorKind};
    use crate::extension::{Extension, FailStrategy, HookPoint, hook};
    use crate::test_mocks::{MockGitOps, oid};

    #[test]
    fn test_feature_start_creates_and_checks_out() {
        let repo = MockGitOps::flow_repo();
        let config = FlowConfig::default();
        let mut engine = FlowEngine::new(&repo, &config);

        let report = engine
            .feature_start("login", &StartOptions::default())
            .unwrap();

        assert_eq!(report.branch, "feature/login");
        assert_eq!(report.base, "develop");
        assert_eq!(*repo.current.borrow(), "feature/login");
        assert_eq!(
            repo.calls(),
            vec!["create_branch feature/login develop", "checkout feature/login"]
        );
        assert_eq!(engine.reporter().operation(), "feature-start");
    }

    #[test]
    fn test_exactly_one_new_branch() {
        let repo = MockGitOps::flow_repo();
        let config = FlowConfig::default();
        let before: Vec<String> = repo.local.borrow().keys().cloned().collect();

        FlowEngine::new(&repo, &config)
            .hotfix_start("1.0.1", &StartOptions::default())
            .unwrap();

        let after: Vec<String> = repo.local.borrow().keys().cloned().collect();
        let added: Vec<&String> = after.iter().filter(|b| !before.contains(b)).collect();
        assert_eq!(added, vec!["hotfix/1.0.1"]);
        assert_eq!(repo.local.borrow()["hotfix/1.0.1"], oid(1));
    }

    #[test]
    fn test_release_start_refuses_second_release() {
        let repo = MockGitOps::flow_repo().with_branch("release/0.9", 1);
        let config = FlowConfig::default();

        let err = FlowEngine::new(&repo, &config)
            .release_start("1.0", &StartOptions::default())
            .unwrap_err();

        assert!(matches!(
            err,
            Error::BranchExists { ref branch, .. } if branch == "release/0.9"
        ));
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn test_release_start_refuses_existing_tag() {
        let repo = MockGitOps::flow_repo().with_tag("1.0", 1);
        let config = FlowConfig::default();

        let err = FlowEngine::new(&repo, &config)
            .release_start("1.0", &StartOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TagExists);
    }

    #[test]
    fn test_requires_initialized() {
        let repo = MockGitOps::new().with_branch("develop", 1);
        let config = FlowConfig::default();

        let err = FlowEngine::new(&repo, &config)
            .feature_start("x", &StartOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }

    #[test]
    fn test_dirty_tree_blocks_start() {
        let repo = MockGitOps::flow_repo().with_uncommitted("README.md");
        let config = FlowConfig::default();

        let err = FlowEngine::new(&repo, &config)
            .feature_start("x", &StartOptions::default())
            .unwrap_err();
        assert!(err.is_precondition());
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn test_invalid_name_rejected() {
        let repo = MockGitOps::flow_repo();
        let config = FlowConfig::default();

        let err = FlowEngine::new(&repo, &config)
            .feature_start("bad name", &StartOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidBranchName { ref name, .. } if name == "feature/bad name"
        ));
    }

    #[test]
    fn test_start_point_must_be_on_base() {
        let repo = MockGitOps::flow_repo()
            .with_commit(2, &[1], 200)
            .with_commit(3, &[], 300)
            .with_branch("develop", 2);
        let config = FlowConfig::default();
        let mut engine = FlowEngine::new(&repo, &config);

        let options = StartOptions {
            start_point: Some(oid(1).to_string()),
            ..StartOptions::default()
        };
        let report = engine.feature_start("old", &options).unwrap();
        assert_eq!(report.base, oid(1).to_string());
        assert_eq!(repo.local.borrow()["feature/old"], oid(1));

        let options = StartOptions {
            start_point: Some(oid(3).to_string()),
            ..StartOptions::default()
        };
        let err = engine.feature_start("other", &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CommitNotOnBranch);
    }

    #[test]
    fn test_fetch_and_push() {
        let repo = MockGitOps::flow_repo().with_remote_branch("develop", 1);
        let config = FlowConfig::default();

        let options = StartOptions {
            fetch: true,
            push: true,
            ..StartOptions::default()
        };
        FlowEngine::new(&repo, &config)
            .feature_start("sync", &options)
            .unwrap();

        let calls = repo.calls();
        assert_eq!(calls[0], "fetch origin");
        assert_eq!(
            calls.last().unwrap(),
            "push origin refs/heads/feature/sync:refs/heads/feature/sync"
        );
    }

    #[test]
    fn test_behind_base_blocks_after_fetch() {
        let repo = MockGitOps::flow_repo()
            .with_commit(2, &[1], 200)
            .with_remote_branch("develop", 2);
        let config = FlowConfig::default();

        let options = StartOptions {
            fetch: true,
            ..StartOptions::default()
        };
        let err = FlowEngine::new(&repo, &config)
            .feature_start("late", &options)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BranchOutOfDate);
        assert_eq!(repo.calls(), vec!["fetch origin"]);
    }

    #[test]
    fn test_fetch_failure_is_transport() {
        let repo = MockGitOps::flow_repo();
        repo.fail_fetch.set(true);
        let config = FlowConfig::default();

        let options = StartOptions {
            fetch: true,
            ..StartOptions::default()
        };
        let err = FlowEngine::new(&repo, &config)
            .feature_start("offline", &options)
            .unwrap_err();
        assert!(matches!(err, Error::Transport { operation: "fetch", .. }));
        assert!(!repo.local.borrow().contains_key("feature/offline"));
    }

    #[test]
    fn test_hooks_fire_in_order() {
        let repo = MockGitOps::flow_repo();
        let config = FlowConfig::default();
        let seen: Rc<RefCell<Vec<HookPoint>>> = Rc::default();

        let mut ext = Extension::new("order");
        for point in crate::engine::Operation::FeatureStart.hook_points() {
            let seen = Rc::clone(&seen);
            ext.on(
                *point,
                point.as_str(),
                hook(move |ctx| {
                    seen.borrow_mut().push(ctx.point);
                    Ok(())
                }),
            );
        }

        FlowEngine::new(&repo, &config)
            .with_extension(&ext)
            .feature_start("hooks", &StartOptions::default())
            .unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                HookPoint::Before,
                HookPoint::BeforeCreateBranch,
                HookPoint::AfterCreateBranch,
                HookPoint::After
            ]
        );
    }

    #[test]
    fn test_failing_before_hook_prevents_mutation() {
        let repo = MockGitOps::flow_repo();
        let config = FlowConfig::default();
        let mut ext = Extension::new("guard");
        ext.on(HookPoint::BeforeCreateBranch, "veto", hook(|_| Err("no".into())));

        let err = FlowEngine::new(&repo, &config)
            .with_extension(&ext)
            .feature_start("vetoed", &StartOptions::default())
            .unwrap_err();

        assert!(matches!(
            err,
            Error::ExtensionFailed { point: HookPoint::BeforeCreateBranch, .. }
        ));
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn test_warn_policy_keeps_going() {
        let repo = MockGitOps::flow_repo();
        let config = FlowConfig::default();
        let mut ext = Extension::new("noisy");
        ext.on(HookPoint::Before, "complain", hook(|_| Err("meh".into())));

        let mut engine = FlowEngine::new(&repo, &config)
            .with_extension(&ext)
            .with_fail_policy(FailStrategy::Warn);
        engine
            .feature_start("tolerant", &StartOptions::default())
            .unwrap();

        assert!(
            engine
                .reporter()
                .entries()
                .iter()
                .any(|e| e.message.contains("meh"))
        );
    }
}
