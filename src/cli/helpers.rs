//! Shared helper functions for CLI commands.

use console::style;
use tracing::warn;

use scanflow::pipeline::{BatchSummary, ShutdownHandle};

/// Trigger `handle` on Ctrl-C. The current document is allowed to finish.
pub fn stop_on_interrupt(handle: ShutdownHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current document");
            handle.trigger();
        }
    });
}

pub fn print_summary(summary: &BatchSummary) {
    let failed = if summary.failed > 0 {
        style(summary.failed.to_string()).red()
    } else {
        style(summary.failed.to_string()).dim()
    };
    println!(
        "\n{} {} seen, {} succeeded, {} failed",
        style("Summary:").bold(),
        summary.seen,
        style(summary.succeeded).green(),
        failed
    );
}
