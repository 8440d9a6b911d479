//! Hook dispatch.

use crate::error::{Error, Result};
use crate::extension::{Extension, FailStrategy, HookContext};
use crate::reporter::Reporter;

/// Run the hooks registered at `ctx.point`, in registration order.
///
/// An Error-strategy failure stops dispatch immediately and is returned as
/// [`Error::ExtensionFailed`]; a Warn-strategy failure is recorded in the
/// reporter and the next hook runs. `policy` is the strategy for entries
/// registered without one. Nothing is retried.
///
/// # Errors
/// Returns `ExtensionFailed` for the first Error-strategy failure.
pub fn run_hooks(
    extension: &Extension,
    ctx: &HookContext<'_>,
    policy: FailStrategy,
    reporter: &mut Reporter,
) -> Result<()> {
    let point = ctx.point;
    for entry in extension.hooks(point) {
        reporter.debug(format!("{point}: running '{}'", entry.label()));

        let Err(cause) = entry.execute(ctx) else {
            continue;
        };

        match entry.strategy().unwrap_or(policy) {
            FailStrategy::Error => {
                reporter.error(format!("{point}: '{}' failed: {cause}", entry.label()));
                return Err(Error::ExtensionFailed { point, cause });
            }
            FailStrategy::Warn => {
                reporter.warn(format!(
                    "{point}: '{}' failed, continuing: {cause}",
                    entry.label()
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::config::FlowConfig;
    use crate::engine::Operation;
    use crate::extension::{HookError, HookPoint, hook};
    use crate::reporter::TraceLevel;
    use crate::test_mocks::MockGitOps;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn recording(
        log: &Log,
        label: &'static str,
        fail: bool,
    ) -> impl Fn(&HookContext<'_>) -> std::result::Result<(), HookError> + 'static {
        let log = Rc::clone(log);
        hook(move |_ctx| {
            log.borrow_mut().push(label);
            if fail {
                Err(format!("{label} broke").into())
            } else {
                Ok(())
            }
        })
    }

    fn dispatch(
        ext: &Extension,
        point: HookPoint,
        policy: FailStrategy,
        reporter: &mut Reporter,
    ) -> Result<()> {
        let repo = MockGitOps::new();
        let config = FlowConfig::default();
        let ctx = HookContext {
            repo: &repo,
            config: &config,
            operation: Operation::ReleaseFinish,
            point,
            branch: "release/1.0",
            name: "1.0",
        };
        run_hooks(ext, &ctx, policy, reporter)
    }

    #[test]
    fn test_error_strategy_stops_dispatch() {
        let log: Log = Rc::default();
        let mut ext = Extension::new("test");
        ext.on(HookPoint::BeforeTag, "h1", recording(&log, "h1", false))
            .on_with_strategy(
                HookPoint::BeforeTag,
                "h2",
                FailStrategy::Error,
                recording(&log, "h2", true),
            )
            .on(HookPoint::BeforeTag, "h3", recording(&log, "h3", false));

        let mut reporter = Reporter::new();
        let err = dispatch(&ext, HookPoint::BeforeTag, FailStrategy::Warn, &mut reporter)
            .unwrap_err();

        assert_eq!(*log.borrow(), vec!["h1", "h2"]);
        match err {
            Error::ExtensionFailed { point, cause } => {
                assert_eq!(point, HookPoint::BeforeTag);
                assert_eq!(cause.to_string(), "h2 broke");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_warn_strategy_continues() {
        let log: Log = Rc::default();
        let mut ext = Extension::new("test");
        ext.on(HookPoint::BeforeTag, "h1", recording(&log, "h1", false))
            .on_with_strategy(
                HookPoint::BeforeTag,
                "h2",
                FailStrategy::Warn,
                recording(&log, "h2", true),
            )
            .on(HookPoint::BeforeTag, "h3", recording(&log, "h3", false));

        let mut reporter = Reporter::new();
        dispatch(&ext, HookPoint::BeforeTag, FailStrategy::Error, &mut reporter).unwrap();

        assert_eq!(*log.borrow(), vec!["h1", "h2", "h3"]);
        let warnings: Vec<_> = reporter.at_least(TraceLevel::Warn).collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("h2 broke"));
    }

    #[test]
    fn test_policy_applies_to_unspecified_entries() {
        let log: Log = Rc::default();
        let mut ext = Extension::new("test");
        ext.on(HookPoint::After, "h1", recording(&log, "h1", true))
            .on(HookPoint::After, "h2", recording(&log, "h2", false));

        let mut reporter = Reporter::new();
        dispatch(&ext, HookPoint::After, FailStrategy::Warn, &mut reporter).unwrap();
        assert_eq!(*log.borrow(), vec!["h1", "h2"]);

        log.borrow_mut().clear();
        assert!(dispatch(&ext, HookPoint::After, FailStrategy::Error, &mut reporter).is_err());
        assert_eq!(*log.borrow(), vec!["h1"]);
    }

    #[test]
    fn test_empty_point_is_noop() {
        let ext = Extension::new("empty");
        let mut reporter = Reporter::new();
        dispatch(&ext, HookPoint::Before, FailStrategy::Error, &mut reporter).unwrap();
        assert!(reporter.entries().is_empty());
    }

    #[test]
    fn test_hooks_only_run_at_their_point() {
        let log: Log = Rc::default();
        let mut ext = Extension::new("test");
        ext.on(HookPoint::AfterTag, "tagged", recording(&log, "tagged", false));

        let mut reporter = Reporter::new();
        dispatch(&ext, HookPoint::BeforeTag, FailStrategy::Error, &mut reporter).unwrap();
        assert!(log.borrow().is_empty());
    }
}
