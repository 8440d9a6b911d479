//! gflow CLI - git-flow branching with extension hooks.

use clap::Parser;
use gflow_core::TopicKind;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod output;

use commands::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    output::set_quiet(cli.quiet);

    let result = match cli.command {
        Commands::Init(args) => commands::init::run(&args),
        Commands::Feature(command) => commands::flow::run_feature(command),
        Commands::Release(command) => commands::flow::run_dual(TopicKind::Release, command),
        Commands::Hotfix(command) => commands::flow::run_dual(TopicKind::Hotfix, command),
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
