use anyhow::{Context, Result, bail};
use gflow_core::config::TraceSettings;
use gflow_core::{FlowConfig, MergeOutcome, Reporter, Settings, TraceLevel};
use gflow_git::Repository;

use crate::output;

/// Open the current repository.
pub fn open_repo() -> Result<Repository> {
    let repo = Repository::open_current().context("Not inside a git repository")?;
    if repo.workdir().is_none() {
        bail!("Cannot run in bare repository");
    }
    Ok(repo)
}

/// Open the current repository with its recorded branch model and settings.
pub fn open_flow_repo() -> Result<(Repository, FlowConfig, Settings)> {
    let repo = open_repo()?;

    if !FlowConfig::is_recorded(&repo)? {
        bail!("gflow not initialized - run `gflow init` first");
    }
    let config = FlowConfig::load(&repo)?;
    let settings = Settings::load(Settings::path_in(repo.git_dir()))
        .context("Failed to load gflow settings")?;

    Ok((repo, config, settings))
}

/// A reporter that writes to the trace log when settings enable it.
pub fn reporter_for(repo: &Repository, settings: &Settings) -> Reporter {
    if settings.trace.enabled {
        Reporter::with_log_file(TraceSettings::log_path_in(repo.git_dir()))
    } else {
        Reporter::new()
    }
}

/// Surface the warnings an operation recorded, minus those that only
/// restate a merge outcome already printed.
pub fn print_warnings(reporter: &Reporter, shown: &[&MergeOutcome]) {
    for message in unshown_warnings(reporter, shown) {
        output::warn(message);
    }
}

fn unshown_warnings<'a>(reporter: &'a Reporter, shown: &[&MergeOutcome]) -> Vec<&'a str> {
    let shown: Vec<String> = shown.iter().map(ToString::to_string).collect();
    reporter
        .entries()
        .iter()
        .filter(|e| e.level == TraceLevel::Warn)
        .map(|e| e.message.as_str())
        .filter(|m| !shown.iter().any(|s| m.starts_with(s.as_str())))
        .collect()
}
