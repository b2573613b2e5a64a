//! Single batch command.

use console::style;

use scanflow::config::Settings;
use scanflow::pipeline::{build_assembler, shutdown_channel, BatchDriver};

use crate::cli::helpers::{print_summary, stop_on_interrupt};

/// Process every pending document once.
///
/// Document failures are reported in the summary; they do not change the
/// exit status.
pub async fn cmd_process(settings: &Settings) -> anyhow::Result<()> {
    println!(
        "{} Processing documents in {}",
        style("→").cyan(),
        settings.pending_dir.display()
    );

    let (assembler, _capabilities) = build_assembler(settings);
    let (handle, signal) = shutdown_channel();
    stop_on_interrupt(handle);

    let driver = BatchDriver::new(assembler).with_shutdown(signal);
    let summary = tokio::task::spawn_blocking(move || driver.run_batch()).await??;

    print_summary(&summary);
    if summary.seen > 0 {
        println!(
            "  Text written to {}",
            style(settings.output_dir.display()).dim()
        );
    }
    Ok(())
}
