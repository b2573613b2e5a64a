//! Continuous monitoring command.

use std::sync::Arc;

use console::style;

use scanflow::config::Settings;
use scanflow::pipeline::{build_assembler, shutdown_channel, BatchDriver, Monitor};

use crate::cli::helpers::{print_summary, stop_on_interrupt};

/// Poll the pending directory until interrupted.
pub async fn cmd_monitor(settings: &Settings) -> anyhow::Result<()> {
    println!(
        "{} Monitoring {} every {}s",
        style("→").cyan(),
        settings.pending_dir.display(),
        settings.poll_interval_secs
    );
    println!("  Press Ctrl+C to stop");

    let (assembler, _capabilities) = build_assembler(settings);
    let (handle, signal) = shutdown_channel();
    stop_on_interrupt(handle);

    let driver = Arc::new(BatchDriver::new(assembler).with_shutdown(signal.clone()));
    let report = Monitor::new(driver, settings.poll_interval(), signal)
        .run()
        .await;

    println!(
        "{} Monitor stopped after {} batches",
        style("✓").green(),
        report.batches
    );
    print_summary(&report.totals);
    Ok(())
}
