use anyhow::Result;
use serde_json::json;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::pipeline::GistReport;

pub mod formatters;

pub use formatters::*;

/// Render a report in the requested format
pub fn render(report: &GistReport, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => report.gist_text.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "gist": report.gist_text,
            "title": report.title,
            "publish_time": report.publish_time,
            "transcript": report.transcript,
            "audio_filename": report.mp3_name,
            "warnings": report.warnings,
            "metadata": debug_panel(&report.metadata),
        }))?,
    };

    Ok(content)
}

/// Save a gist to file
pub async fn save_to_file(report: &GistReport, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(report, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a gist to the console
pub fn print_to_console(report: &GistReport, format: &OutputFormat) -> Result<()> {
    println!("{}", render(report, format)?);
    Ok(())
}
