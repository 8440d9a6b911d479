//! CLI command definitions and dispatch targets.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

pub mod completions;
pub mod flow;
pub mod init;
pub mod utils;

/// gflow - git-flow branching with extension hooks.
#[derive(Parser, Debug)]
#[command(name = "gflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Only print errors and essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record the branch model and create the long-lived branches
    Init(InitArgs),

    /// Start or finish a feature branch
    #[command(subcommand)]
    Feature(FeatureCommand),

    /// Start or finish a release branch
    #[command(subcommand)]
    Release(ReleaseCommand),

    /// Start or finish a hotfix branch
    #[command(subcommand)]
    Hotfix(ReleaseCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Re-record the branch model even if one exists
    #[arg(short, long)]
    pub force: bool,

    /// Production branch name
    #[arg(long)]
    pub production: Option<String>,

    /// Integration branch name
    #[arg(long)]
    pub integration: Option<String>,

    /// Prefix for feature branches
    #[arg(long)]
    pub feature_prefix: Option<String>,

    /// Prefix for release branches
    #[arg(long)]
    pub release_prefix: Option<String>,

    /// Prefix for hotfix branches
    #[arg(long)]
    pub hotfix_prefix: Option<String>,

    /// Prefix for release and hotfix tags
    #[arg(long)]
    pub tag_prefix: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum FeatureCommand {
    /// Branch off the integration branch
    Start(StartArgs),

    /// Merge back into the integration branch
    Finish {
        #[command(flatten)]
        common: FinishArgs,

        /// Rebase onto the integration branch first, then fast-forward
        #[arg(long, conflicts_with = "squash")]
        rebase: bool,
    },
}

/// Shared by `release` and `hotfix`.
#[derive(Subcommand, Debug)]
pub enum ReleaseCommand {
    /// Branch off the base branch
    Start(StartArgs),

    /// Merge into production and integration and tag
    Finish {
        #[command(flatten)]
        common: FinishArgs,

        /// Don't tag production
        #[arg(long)]
        no_tag: bool,

        /// Tag message
        #[arg(short, long)]
        message: Option<String>,

        /// Still merge into integration when the production merge fails
        #[arg(long)]
        continue_on_failure: bool,
    },
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Topic name, without prefix
    pub name: String,

    /// Fetch from the remote first
    #[arg(long)]
    pub fetch: bool,

    /// Push the new branch to the remote
    #[arg(long)]
    pub push: bool,

    /// Commit to branch from (must be on the base branch)
    #[arg(long, value_name = "REV")]
    pub from: Option<String>,

    /// Tolerate untracked files
    #[arg(long)]
    pub allow_untracked: bool,
}

#[derive(Args, Debug)]
pub struct FinishArgs {
    /// Topic name, without prefix
    pub name: String,

    /// Fetch from the remote first
    #[arg(long)]
    pub fetch: bool,

    /// Push the merged branches to the remote
    #[arg(long)]
    pub push: bool,

    /// Keep the topic branch
    #[arg(short, long)]
    pub keep: bool,

    /// Delete the topic branch even if unmerged
    #[arg(short = 'D', long)]
    pub force_delete: bool,

    /// Squash the topic into a single commit
    #[arg(long)]
    pub squash: bool,

    /// Always create a merge commit
    #[arg(long, conflicts_with = "squash")]
    pub no_ff: bool,

    /// Tolerate untracked files
    #[arg(long)]
    pub allow_untracked: bool,
}
