//! Recording the branch model in a repository.

use gflow_git::GitOps;

use crate::config::FlowConfig;
use crate::error::{Error, Result};

/// What [`initialize`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// The repository was already initialized and nothing changed.
    pub already_initialized: bool,
    /// Branches created from another local ref.
    pub created: Vec<String>,
    /// Branches created to track the remote.
    pub tracked: Vec<String>,
}

/// Make sure the production and integration branches exist and record
/// `config` in the repository config.
///
/// Production is tracked from `remote` when only the remote has it, or
/// created from HEAD otherwise. Integration is tracked from `remote` or
/// created from production. An initialized repository is left alone unless
/// `force` is set.
///
/// # Errors
/// Returns `LocalBranchMissing` if there is no commit to create production
/// from, or a repository error.
pub fn initialize<G: GitOps + ?Sized>(
    repo: &G,
    config: &FlowConfig,
    remote: &str,
    force: bool,
) -> Result<InitReport> {
    let mut report = InitReport::default();
    if !force && FlowConfig::is_recorded(repo)? {
        tracing::debug!("already initialized");
        report.already_initialized = true;
        return Ok(report);
    }

    let production = config.production();
    let integration = config.integration();

    ensure_branch(repo, remote, production, "HEAD", &mut report).map_err(|e| match e {
        Error::Step { .. } => Error::LocalBranchMissing(production.to_string()),
        other => other,
    })?;
    ensure_branch(repo, remote, integration, production, &mut report)?;

    config.record(repo)?;
    tracing::info!(production, integration, "recorded git-flow branch model");
    Ok(report)
}

fn ensure_branch<G: GitOps + ?Sized>(
    repo: &G,
    remote: &str,
    name: &str,
    from: &str,
    report: &mut InitReport,
) -> Result<()> {
    if repo.list_local_branches()?.iter().any(|b| b.name == name) {
        return Ok(());
    }

    let on_remote = repo.has_remote(remote)
        && repo
            .list_remote_branches(remote)?
            .iter()
            .any(|b| b.name == name);
    if on_remote {
        repo.create_tracking_branch(name, remote)?;
        report.tracked.push(name.to_string());
        return Ok(());
    }

    repo.create_branch(name, from)
        .map_err(|source| Error::Step {
            step: format!("create branch {name} from {from}"),
            source,
        })?;
    report.created.push(name.to_string());
    Ok(())
}
