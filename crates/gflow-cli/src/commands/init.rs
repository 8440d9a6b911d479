//! `gflow init` command - Record the branch model in the current repository.

use anyhow::{Context, Result};
use gflow_core::{FlowConfig, Settings, TopicKind, initialize};

use super::InitArgs;
use super::utils;
use crate::output;

/// Run the init command.
pub fn run(args: &InitArgs) -> Result<()> {
    let repo = utils::open_repo()?;

    // Flags override whatever is recorded, which overrides the defaults.
    let current = if FlowConfig::is_recorded(&repo)? {
        FlowConfig::load(&repo)?
    } else {
        FlowConfig::default()
    };
    let config = build_config(args, &current)?;

    let settings_path = Settings::path_in(repo.git_dir());
    let settings = Settings::load(&settings_path).context("Failed to load gflow settings")?;

    let report = initialize(&repo, &config, &settings.general.remote, args.force)?;
    if report.already_initialized {
        output::warn("gflow is already initialized in this repository (use --force to redo)");
        return Ok(());
    }

    if !settings_path.exists() {
        settings.save(&settings_path)?;
    }

    for branch in &report.created {
        output::info(&format!("Created branch {branch}"));
    }
    for branch in &report.tracked {
        output::info(&format!(
            "Created branch {branch} tracking {}/{branch}",
            settings.general.remote
        ));
    }

    output::success(&format!(
        "Initialized gflow: production {}, integration {}",
        config.production(),
        config.integration()
    ));
    output::detail(&format!(
        "  prefixes: {} {} {}  tags: '{}'",
        config.prefix(TopicKind::Feature),
        config.prefix(TopicKind::Release),
        config.prefix(TopicKind::Hotfix),
        config.tag_prefix()
    ));
    output::detail(&format!("  settings: {}", settings_path.display()));

    Ok(())
}

fn build_config(args: &InitArgs, current: &FlowConfig) -> Result<FlowConfig> {
    let pick = |flag: &Option<String>, recorded: &str| {
        flag.clone().unwrap_or_else(|| recorded.to_string())
    };

    let config = FlowConfig::builder()
        .production(pick(&args.production, current.production()))
        .integration(pick(&args.integration, current.integration()))
        .feature_prefix(pick(&args.feature_prefix, current.prefix(TopicKind::Feature)))
        .release_prefix(pick(&args.release_prefix, current.prefix(TopicKind::Release)))
        .hotfix_prefix(pick(&args.hotfix_prefix, current.prefix(TopicKind::Hotfix)))
        .tag_prefix(pick(&args.tag_prefix, current.tag_prefix()))
        .build()?;
    Ok(config)
}
