//! Batch text extraction

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pagerush_ingestion::format::supported_formats_hint;
use pagerush_ingestion::{
    combined_export, combined_export_file_name, unique_export_file_names, BatchConfig,
    BatchController, BatchObserver, BatchOutcome, BatchReport, CandidateFile, DocumentLibrary,
    ExportEntry, InMemoryLibrary, NewDocument, Progress, StoredDocument,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CliConfig;
use crate::output::{self, OutputFormat};

pub struct ExtractOptions {
    pub output_dir: Option<PathBuf>,
    pub combined: bool,
    pub search: Option<String>,
    pub owner: String,
    pub timeout_secs: Option<u64>,
}

/// Drives the progress bar and prints one line per file in text mode.
struct ConsoleObserver {
    bar: ProgressBar,
    echo: bool,
}

impl ConsoleObserver {
    fn new(total: u64, echo: bool) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar, echo }
    }

    fn print(&self, line: String) {
        if self.echo {
            self.bar.suspend(|| println!("{}", line));
        }
    }
}

impl BatchObserver for ConsoleObserver {
    fn on_progress(&self, progress: &Progress) {
        self.bar.set_position(progress.position as u64 - 1);
        self.bar.set_message(format!("Processing {}", progress));
    }

    fn on_extracted(&self, text: &str, source_name: &str) {
        self.bar.inc(1);
        self.print(output::success_line(&format!(
            "{} ({} characters)",
            source_name,
            text.chars().count()
        )));
    }

    fn on_failed(&self, source_name: &str, reason: &str) {
        self.bar.inc(1);
        self.print(output::failure_line(&format!("{}: {}", source_name, reason)));
    }
}

/// Structured output for `--format json|yaml`
#[derive(Serialize)]
struct ExtractReport<'a> {
    unreadable: Vec<String>,
    rejected_unsupported: usize,
    rejected_duplicate: usize,
    outcome: BatchOutcome,
    message: String,
    #[serde(flatten)]
    report: &'a BatchReport,
    exported: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<Vec<StoredDocument>>,
}

pub async fn run(paths: &[PathBuf], options: ExtractOptions, format: OutputFormat) -> Result<()> {
    let mut config = match CliConfig::batch_config_path() {
        Some(path) => BatchConfig::load_from_file(path),
        None => BatchConfig::load(),
    }
    .context("Failed to load batch configuration")?;
    if options.timeout_secs.is_some() {
        config.file_timeout_secs = options.timeout_secs;
    }
    let controller = BatchController::new(config);
    let text_mode = format == OutputFormat::Text;

    let mut candidates = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        match CandidateFile::from_path(path).await {
            Ok(file) => candidates.push(file),
            Err(e) => {
                if text_mode {
                    eprintln!("{}", output::failure_line(&format!("{}: {}", path.display(), e)));
                }
                unreadable.push(path.display().to_string());
            }
        }
    }

    let admission = controller.add_files(candidates).await;
    if text_mode {
        if admission.rejected_unsupported > 0 {
            output::warning(&format!(
                "Skipped {} unsupported file(s). {}",
                admission.rejected_unsupported,
                supported_formats_hint()
            ));
        }
        if admission.rejected_duplicate > 0 {
            output::warning(&format!(
                "Skipped {} duplicate file(s)",
                admission.rejected_duplicate
            ));
        }
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let observer = ConsoleObserver::new(controller.pending_count().await as u64, text_mode);
    let outcome = controller.process_all(&observer, &cancel).await;
    observer.bar.finish_and_clear();
    ctrl_c.abort();
    let report = outcome?;

    let exported = export(&controller, &report, &options).await?;
    let matches = match &options.search {
        Some(term) => Some(file_and_search(&report, &options.owner, term).await),
        None => None,
    };

    let summary = report.summary;
    let structured = ExtractReport {
        unreadable,
        rejected_unsupported: admission.rejected_unsupported,
        rejected_duplicate: admission.rejected_duplicate,
        outcome: summary.outcome(),
        message: summary.message(),
        report: &report,
        exported: exported.clone(),
        matches: matches.clone(),
    };

    match output::structured(&structured, format)? {
        Some(rendered) => println!("{}", rendered),
        None => {
            print_text_summary(&controller, &report, &exported, matches.as_deref()).await;
        }
    }

    if report.cancelled {
        anyhow::bail!(
            "Extraction cancelled; {} file(s) not processed",
            report.unattempted.len()
        );
    }
    if summary.outcome() == BatchOutcome::AllFailed {
        anyhow::bail!(summary.message());
    }
    Ok(())
}

async fn print_text_summary(
    controller: &BatchController,
    report: &BatchReport,
    exported: &[PathBuf],
    matches: Option<&[StoredDocument]>,
) {
    let summary = report.summary;
    output::section(summary.title());
    match summary.outcome() {
        BatchOutcome::Success => println!("{}", summary.message().green()),
        BatchOutcome::PartialSuccess => println!("{}", summary.message().yellow()),
        BatchOutcome::AllFailed => println!("{}", summary.message().red()),
    }

    for path in exported {
        output::key_value("Exported", &path.display().to_string());
    }

    let recent = controller.recent().await;
    if !recent.is_empty() {
        output::section("Recently processed");
        for file in recent {
            output::dimmed(&format!(
                "  {} ({})",
                file.name,
                file.extracted_at.format("%H:%M:%S")
            ));
        }
    }

    if let Some(matches) = matches {
        output::section("Search results");
        if matches.is_empty() {
            output::info("No documents matched");
        }
        for document in matches {
            println!(
                "  {} {}",
                document.title.cyan(),
                output::truncate(&document.content.replace('\n', " "), 60).dimmed()
            );
        }
    }
}

/// Write per-file and combined exports. Returns the paths written.
async fn export(
    controller: &BatchController,
    report: &BatchReport,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>> {
    if options.output_dir.is_none() && !options.combined {
        return Ok(Vec::new());
    }

    let dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    // The controller is fresh, so its log holds exactly this batch's successes.
    let entries: Vec<ExportEntry> = report
        .results
        .iter()
        .filter_map(|result| Some((result.source_name.clone(), result.text()?.to_string())))
        .zip(controller.processed_log().await)
        .map(|((file_name, text), processed)| ExportEntry {
            file_name,
            text,
            extracted_at: processed.extracted_at,
        })
        .collect();

    let mut written = Vec::new();
    if options.output_dir.is_some() {
        let names = unique_export_file_names(entries.iter().map(|e| e.file_name.as_str()));
        for (entry, name) in entries.iter().zip(names) {
            let path = dir.join(name);
            write_file(&path, &entry.text).await?;
            written.push(path);
        }
    }

    if options.combined && !entries.is_empty() {
        let path = dir.join(combined_export_file_name(Utc::now().date_naive()));
        write_file(&path, &combined_export(&entries)).await?;
        written.push(path);
    }

    Ok(written)
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "Export written");
    Ok(())
}

/// File successful results for `owner`, then search them for `term`.
async fn file_and_search(report: &BatchReport, owner: &str, term: &str) -> Vec<StoredDocument> {
    let library = InMemoryLibrary::new();
    for document in report.results.iter().filter_map(NewDocument::from_result) {
        library.create(owner, document).await;
    }
    library.search(owner, term).await
}
