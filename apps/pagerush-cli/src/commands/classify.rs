//! Format detection for files on disk

use anyhow::Result;
use colored::Colorize;
use pagerush_ingestion::{CandidateFile, FormatKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::output::{self, OutputFormat};

#[derive(Serialize)]
struct Classification {
    path: PathBuf,
    declared_type: Option<String>,
    byte_size: Option<u64>,
    /// `None` when unsupported or unreadable
    format: Option<FormatKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn classify_path(path: &Path) -> Classification {
    match CandidateFile::from_path(path).await {
        Ok(file) => Classification {
            path: path.to_path_buf(),
            format: file.format(),
            declared_type: Some(file.declared_type),
            byte_size: Some(file.byte_size),
            error: None,
        },
        Err(e) => Classification {
            path: path.to_path_buf(),
            declared_type: None,
            byte_size: None,
            format: None,
            error: Some(e.to_string()),
        },
    }
}

pub async fn run(paths: &[PathBuf], format: OutputFormat) -> Result<()> {
    let mut rows = Vec::with_capacity(paths.len());
    for path in paths {
        rows.push(classify_path(path).await);
    }

    if let Some(rendered) = output::structured(&rows, format)? {
        println!("{}", rendered);
        return Ok(());
    }

    for row in &rows {
        let path = row.path.display().to_string();
        match (&row.format, &row.error) {
            (_, Some(error)) => println!("{}: {}", path, error.red()),
            (Some(kind), None) => println!(
                "{}: {} ({})",
                path,
                kind.label().green(),
                output::format_size(row.byte_size.unwrap_or(0))
            ),
            (None, None) => println!("{}: {}", path, "unsupported".yellow()),
        }
    }
    Ok(())
}
