//! External tool availability check command.

use console::style;

use scanflow::config::Settings;
use scanflow::pipeline::{probe_capabilities, ToolStatus};

/// Report which external tools are installed.
pub fn cmd_check(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let capabilities = probe_capabilities(settings);

    if json {
        println!("{}", serde_json::to_string_pretty(&capabilities)?);
        return Ok(());
    }

    println!("\n{}", style("OCR Tool Status").bold());
    println!("{}", "-".repeat(50));

    print_tool(&capabilities.rasterizer);
    print_tool(&capabilities.artifact_remover);
    print_slot("primary engine", capabilities.primary_engine.as_ref());
    print_slot("handwriting engine", capabilities.handwriting_engine.as_ref());

    println!();
    if !capabilities.rasterizer.available {
        println!(
            "{} Documents cannot be processed until pdftoppm is installed",
            style("!").yellow()
        );
    } else if !capabilities.has_primary_engine() && !capabilities.has_handwriting_engine() {
        println!(
            "{} No OCR engine available: output files will contain page headers only",
            style("!").yellow()
        );
    } else {
        println!("{} Ready to process documents", style("✓").green());
    }
    Ok(())
}

fn print_tool(tool: &ToolStatus) {
    let status = if tool.available {
        style("✓ available").green()
    } else if tool.optional {
        style("○ not installed (optional)").yellow()
    } else {
        style("✗ not found").red()
    };
    println!("  {:<20} {:<12} {}", tool.role, tool.name, status);
    if !tool.available {
        println!("  {:<20} {}", "", style(&tool.hint).dim());
    }
}

fn print_slot(role: &str, tool: Option<&ToolStatus>) {
    match tool {
        Some(tool) => print_tool(tool),
        None => println!("  {:<20} {:<12} {}", role, "none", style("disabled").dim()),
    }
}
