//! `gflow feature|release|hotfix` commands - Start and finish topic branches.

use anyhow::{Result, bail};
use gflow_core::{
    EmptyExtensionProvider, ExtensionProvider, FinishOptions, FlowConfig, FlowEngine, MergeOutcome,
    MergeResult, Operation, ProductionFailurePolicy, Settings, StartOptions, TopicKind,
};
use gflow_git::Repository;

use super::utils;
use super::{FeatureCommand, FinishArgs, ReleaseCommand, StartArgs};
use crate::output;

/// Run `gflow feature ...`.
pub fn run_feature(command: FeatureCommand) -> Result<()> {
    match command {
        FeatureCommand::Start(args) => start(TopicKind::Feature, &args),
        FeatureCommand::Finish { common, rebase } => finish_feature(&common, rebase),
    }
}

/// Run `gflow release ...` or `gflow hotfix ...`.
pub fn run_dual(kind: TopicKind, command: ReleaseCommand) -> Result<()> {
    match command {
        ReleaseCommand::Start(args) => start(kind, &args),
        ReleaseCommand::Finish {
            common,
            no_tag,
            message,
            continue_on_failure,
        } => finish_dual(kind, &common, no_tag, message, continue_on_failure),
    }
}

fn start(kind: TopicKind, args: &StartArgs) -> Result<()> {
    let (repo, config, settings) = utils::open_flow_repo()?;
    let op = match kind {
        TopicKind::Feature => Operation::FeatureStart,
        TopicKind::Release => Operation::ReleaseStart,
        TopicKind::Hotfix => Operation::HotfixStart,
    };
    let extension = EmptyExtensionProvider.extension(op);
    let mut engine = build_engine(&repo, &config, &settings).with_extension(&extension);

    let options = StartOptions {
        fetch: args.fetch || settings.general.fetch,
        push: args.push || settings.general.push,
        start_point: args.from.clone(),
        allow_untracked: args.allow_untracked,
    };

    let result = match kind {
        TopicKind::Feature => engine.feature_start(&args.name, &options),
        TopicKind::Release => engine.release_start(&args.name, &options),
        TopicKind::Hotfix => engine.hotfix_start(&args.name, &options),
    };
    utils::print_warnings(engine.reporter(), &[]);
    let report = result?;

    output::success(&format!("Started {kind} {}", args.name));
    output::detail(&format!("  {} from {}", report.branch, report.base));
    if options.push {
        output::detail(&format!(
            "  pushed to {}/{}",
            settings.general.remote, report.branch
        ));
    }
    output::essential(&report.branch);
    Ok(())
}

fn finish_feature(common: &FinishArgs, rebase: bool) -> Result<()> {
    let (repo, config, settings) = utils::open_flow_repo()?;
    let extension = EmptyExtensionProvider.extension(Operation::FeatureFinish);
    let mut engine = build_engine(&repo, &config, &settings).with_extension(&extension);

    let mut options = finish_options(common, &settings);
    options.rebase = rebase;

    let result = engine.feature_finish(&common.name, &options);
    let shown: Vec<&MergeOutcome> = result.iter().collect();
    utils::print_warnings(engine.reporter(), &shown);
    let outcome = result?;

    output::detail(&output::merge_outcome(&outcome));
    if !outcome.succeeded {
        let branch = format!("{}{}", config.prefix(TopicKind::Feature), common.name);
        output::warn(&remediation(&outcome, &branch, config.production(), false));
        bail!("feature {} was not finished", common.name);
    }

    output::success(&format!(
        "Finished feature {} into {}",
        common.name,
        config.integration()
    ));
    Ok(())
}

fn finish_dual(
    kind: TopicKind,
    common: &FinishArgs,
    no_tag: bool,
    message: Option<String>,
    continue_on_failure: bool,
) -> Result<()> {
    let (repo, config, settings) = utils::open_flow_repo()?;
    let op = if kind == TopicKind::Hotfix {
        Operation::HotfixFinish
    } else {
        Operation::ReleaseFinish
    };
    let extension = EmptyExtensionProvider.extension(op);
    let mut engine = build_engine(&repo, &config, &settings).with_extension(&extension);

    let mut options = finish_options(common, &settings);
    options.no_tag = no_tag;
    options.tag_message = message;
    if continue_on_failure {
        options.production_failure = Some(ProductionFailurePolicy::Continue);
    }
    let policy = options
        .production_failure
        .unwrap_or(settings.finish.production_failure);

    let name = &common.name;
    let result = if kind == TopicKind::Hotfix {
        engine.hotfix_finish(name, &options)
    } else {
        engine.release_finish(name, &options)
    };
    let shown: Vec<&MergeOutcome> = result
        .iter()
        .flat_map(|r| [r.production(), r.integration()])
        .collect();
    utils::print_warnings(engine.reporter(), &shown);
    let result = result?;

    print_result(&result);
    if !result.was_successful() {
        let branch = format!("{}{name}", config.prefix(kind));
        // under Continue a conflicting production merge is rolled back
        let aborted = policy == ProductionFailurePolicy::Continue;
        for outcome in result.failures() {
            let is_production = outcome.target.name == config.production();
            output::warn(&remediation(
                outcome,
                &branch,
                config.production(),
                aborted && is_production,
            ));
        }
        bail!("{kind} {name} was not finished");
    }

    output::success(&format!("Finished {kind} {name}"));
    if !no_tag {
        output::essential(&format!("{}{name}", config.tag_prefix()));
    }
    Ok(())
}

fn print_result(result: &MergeResult) {
    output::detail(&output::merge_outcome(result.production()));
    output::detail(&output::merge_outcome(result.integration()));
}

/// What to do about a target the topic did not land on.
///
/// `rolled_back` marks a conflicting merge that was aborted, leaving nothing
/// to resolve in the working tree.
fn remediation(
    outcome: &MergeOutcome,
    branch: &str,
    production: &str,
    rolled_back: bool,
) -> String {
    let target = &outcome.target;
    if outcome.status_detail.starts_with("rebase") {
        format!(
            "{branch} could not be rebased onto {target}; rebase it by hand, then finish again"
        )
    } else if outcome.has_conflicts() && rolled_back {
        format!("Merging {branch} into {target} conflicts; merge it by hand")
    } else if outcome.has_conflicts() {
        format!("Resolve the conflicts on {target} and commit, then delete {branch}")
    } else if outcome.status_detail.starts_with("skipped") {
        format!("{target} was not merged; merge {branch} into it once {production} is fixed")
    } else {
        format!(
            "{branch} could not be merged into {target} ({})",
            outcome.status_detail
        )
    }
}

fn build_engine<'a>(
    repo: &'a Repository,
    config: &'a FlowConfig,
    settings: &Settings,
) -> FlowEngine<'a, Repository> {
    FlowEngine::new(repo, config)
        .with_settings(settings)
        .with_reporter(utils::reporter_for(repo, settings))
}

fn finish_options(common: &FinishArgs, settings: &Settings) -> FinishOptions {
    FinishOptions {
        fetch: common.fetch || settings.general.fetch,
        push: common.push || settings.general.push,
        keep_branch: common.keep,
        force_delete: common.force_delete,
        squash: common.squash,
        no_ff: common.no_ff,
        allow_untracked: common.allow_untracked,
        ..FinishOptions::default()
    }
}
