//! Extensions: hook commands bound to named points of a workflow operation.
//!
//! An [`Extension`] is a flat map from [`HookPoint`] to an ordered list of
//! hook commands. There is no hierarchy of extension types; an operation
//! without customisation simply runs with an empty extension.

use std::collections::HashMap;
use std::fmt;

use gflow_git::GitOps;
use serde::{Deserialize, Serialize};

use crate::config::FlowConfig;
use crate::engine::Operation;

/// Error reported by a hook command.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Named slot in a workflow operation where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookPoint {
    Before,
    BeforeFetch,
    AfterFetch,
    BeforeCreateBranch,
    AfterCreateBranch,
    AfterTopicCheckout,
    BeforeProductionCheckout,
    AfterProductionCheckout,
    BeforeProductionMerge,
    AfterProductionMerge,
    BeforeTag,
    AfterTag,
    BeforeIntegrationCheckout,
    AfterIntegrationCheckout,
    BeforeIntegrationMerge,
    AfterIntegrationMerge,
    BeforeDeleteBranch,
    AfterDeleteBranch,
    AfterPush,
    After,
}

impl HookPoint {
    /// The camelCase name used in logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::BeforeFetch => "beforeFetch",
            Self::AfterFetch => "afterFetch",
            Self::BeforeCreateBranch => "beforeCreateBranch",
            Self::AfterCreateBranch => "afterCreateBranch",
            Self::AfterTopicCheckout => "afterTopicCheckout",
            Self::BeforeProductionCheckout => "beforeProductionCheckout",
            Self::AfterProductionCheckout => "afterProductionCheckout",
            Self::BeforeProductionMerge => "beforeProductionMerge",
            Self::AfterProductionMerge => "afterProductionMerge",
            Self::BeforeTag => "beforeTag",
            Self::AfterTag => "afterTag",
            Self::BeforeIntegrationCheckout => "beforeIntegrationCheckout",
            Self::AfterIntegrationCheckout => "afterIntegrationCheckout",
            Self::BeforeIntegrationMerge => "beforeIntegrationMerge",
            Self::AfterIntegrationMerge => "afterIntegrationMerge",
            Self::BeforeDeleteBranch => "beforeDeleteBranch",
            Self::AfterDeleteBranch => "afterDeleteBranch",
            Self::AfterPush => "afterPush",
            Self::After => "after",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook failure does to the running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailStrategy {
    /// Abort the operation with `ExtensionFailed`.
    #[default]
    Error,
    /// Record the failure in the trace and carry on.
    Warn,
}

/// What a hook can see while it runs.
pub struct HookContext<'a> {
    /// Repository the operation runs against.
    pub repo: &'a dyn GitOps,
    /// Branch model of the operation.
    pub config: &'a FlowConfig,
    /// Operation being run.
    pub operation: Operation,
    /// Point being dispatched.
    pub point: HookPoint,
    /// Full topic branch name, e.g. `release/1.0`.
    pub branch: &'a str,
    /// Topic name without prefix, e.g. `1.0`.
    pub name: &'a str,
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("operation", &self.operation)
            .field("point", &self.point)
            .field("branch", &self.branch)
            .finish_non_exhaustive()
    }
}

/// A unit of injected behaviour.
///
/// Implemented for any `Fn(&HookContext) -> Result<(), HookError>`, so most
/// hooks are plain closures.
pub trait HookCommand {
    /// Run the hook.
    ///
    /// # Errors
    /// Any error is a hook failure, handled per the entry's [`FailStrategy`].
    fn execute(&self, ctx: &HookContext<'_>) -> Result<(), HookError>;
}

impl<F> HookCommand for F
where
    F: Fn(&HookContext<'_>) -> Result<(), HookError>,
{
    fn execute(&self, ctx: &HookContext<'_>) -> Result<(), HookError> {
        self(ctx)
    }
}

/// Pin a closure to the hook signature so its argument type is inferred.
///
/// ```
/// use gflow_core::extension::{hook, Extension, HookPoint};
///
/// let mut ext = Extension::new("audit");
/// ext.on(
///     HookPoint::BeforeTag,
///     "announce",
///     hook(|ctx| {
///         println!("tagging {}", ctx.name);
///         Ok(())
///     }),
/// );
/// ```
pub fn hook<F>(f: F) -> F
where
    F: Fn(&HookContext<'_>) -> Result<(), HookError>,
{
    f
}

/// A registered hook command.
pub struct HookEntry {
    label: String,
    strategy: Option<FailStrategy>,
    command: Box<dyn HookCommand>,
}

impl HookEntry {
    /// Label used in trace messages.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Strategy set at registration; `None` defers to the engine's policy.
    #[must_use]
    pub const fn strategy(&self) -> Option<FailStrategy> {
        self.strategy
    }

    /// Run the wrapped command.
    ///
    /// # Errors
    /// Whatever the command reports.
    pub fn execute(&self, ctx: &HookContext<'_>) -> Result<(), HookError> {
        self.command.execute(ctx)
    }
}

impl fmt::Debug for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry")
            .field("label", &self.label)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Named collection of hook lists, keyed by point. Insertion order is kept
/// and duplicates are allowed.
#[derive(Debug, Default)]
pub struct Extension {
    name: String,
    hooks: HashMap<HookPoint, Vec<HookEntry>>,
}

impl Extension {
    /// Create an empty extension.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: HashMap::new(),
        }
    }

    /// Name of the extension.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a hook that fails according to the engine's policy.
    pub fn on(
        &mut self,
        point: HookPoint,
        label: impl Into<String>,
        command: impl HookCommand + 'static,
    ) -> &mut Self {
        self.push(point, label.into(), None, Box::new(command))
    }

    /// Register a hook with its own fail strategy.
    pub fn on_with_strategy(
        &mut self,
        point: HookPoint,
        label: impl Into<String>,
        strategy: FailStrategy,
        command: impl HookCommand + 'static,
    ) -> &mut Self {
        self.push(point, label.into(), Some(strategy), Box::new(command))
    }

    fn push(
        &mut self,
        point: HookPoint,
        label: String,
        strategy: Option<FailStrategy>,
        command: Box<dyn HookCommand>,
    ) -> &mut Self {
        self.hooks.entry(point).or_default().push(HookEntry {
            label,
            strategy,
            command,
        });
        self
    }

    /// Hooks registered at a point, in registration order.
    #[must_use]
    pub fn hooks(&self, point: HookPoint) -> &[HookEntry] {
        self.hooks.get(&point).map_or(&[], Vec::as_slice)
    }

    /// Whether no hook is registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }

    /// Points with hooks that `operation` never dispatches.
    #[must_use]
    pub fn unused_points(&self, operation: Operation) -> Vec<HookPoint> {
        let mut unused: Vec<HookPoint> = self
            .hooks
            .iter()
            .filter(|(point, entries)| {
                !entries.is_empty() && !operation.hook_points().contains(point)
            })
            .map(|(point, _)| *point)
            .collect();
        unused.sort();
        unused
    }
}

/// Supplies the extension for an operation.
///
/// Build tooling implements this to contribute default hooks (e.g. version
/// rewriting); the default methods return an empty extension.
pub trait ExtensionProvider {
    /// Extension for `operation`.
    fn extension(&self, operation: Operation) -> Extension {
        Extension::new(operation.as_str())
    }
}

/// Provider that contributes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyExtensionProvider;

impl ExtensionProvider for EmptyExtensionProvider {}
