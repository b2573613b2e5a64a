//! Status command.

use console::style;

use scanflow::config::Settings;

/// Show document counts per directory.
pub fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let lifecycle = settings.lifecycle();
    let pending = lifecycle.pending_documents()?;
    let archived = lifecycle.archived_documents()?.len();
    let outputs = lifecycle.output_count()?;

    println!("\n{}", style("scanflow status").bold());
    println!("{}", "-".repeat(50));
    println!(
        "  {:<10} {:>5}  {}",
        "pending",
        pending.len(),
        style(settings.pending_dir.display()).dim()
    );
    println!(
        "  {:<10} {:>5}  {}",
        "archived",
        archived,
        style(settings.archive_dir.display()).dim()
    );
    println!(
        "  {:<10} {:>5}  {}",
        "output",
        outputs,
        style(settings.output_dir.display()).dim()
    );

    if !pending.is_empty() {
        println!("\n{}", style("Pending:").cyan());
        for document in &pending {
            println!("  {} {}", style("•").dim(), document.file_name);
        }
    }
    Ok(())
}
