//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use gflow_core::MergeOutcome;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
///
/// Use for indented detail lines that accompany info or warn messages.
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like branch names.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// One line per merge target, with conflicting paths listed below.
#[must_use]
pub fn merge_outcome(outcome: &MergeOutcome) -> String {
    let marker = if outcome.succeeded {
        "✓".green()
    } else if outcome.has_conflicts() {
        "✗".red()
    } else {
        "-".dimmed()
    };

    let mut line = format!(
        "{} {} {}",
        marker,
        outcome.target.to_string().bold(),
        outcome.status_detail
    );
    for path in &outcome.conflicting_paths {
        line.push_str(&format!("\n    {}", path.red()));
    }
    line
}
