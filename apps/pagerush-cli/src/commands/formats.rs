//! Supported format listing

use anyhow::Result;
use colored::Colorize;
use pagerush_ingestion::FormatKind;
use serde::Serialize;

use crate::output::{self, OutputFormat};

#[derive(Serialize)]
struct FormatRow {
    format: FormatKind,
    label: &'static str,
    mime_type: &'static str,
    extension: &'static str,
}

pub fn run(format: OutputFormat) -> Result<()> {
    let rows: Vec<FormatRow> = FormatKind::ALL
        .iter()
        .map(|kind| FormatRow {
            format: *kind,
            label: kind.label(),
            mime_type: kind.mime_type(),
            extension: kind.extension(),
        })
        .collect();

    if let Some(rendered) = output::structured(&rows, format)? {
        println!("{}", rendered);
        return Ok(());
    }

    output::section("Supported formats");
    for row in &rows {
        println!(
            "  {} .{:<6} {}",
            format!("{:<16}", row.label).cyan(),
            row.extension,
            row.mime_type.dimmed()
        );
    }
    Ok(())
}
