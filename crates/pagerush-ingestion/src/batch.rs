//! Batch extraction controller
//!
//! Files are processed strictly one after another, in selection order. A file
//! that fails is reported and skipped; it never stops the files after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::extractors::ContentExtractor;
use crate::format::FormatKind;
use crate::selection::{Admission, CandidateFile, PendingFile, Selection};
use crate::{ExtractionError, ExtractionErrorKind, IngestionError, Result};

/// Marks which file is being worked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub file_name: String,
    /// 1-based position within the batch
    pub position: usize,
    pub total: usize,
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}/{})", self.file_name, self.position, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Success {
        text: String,
    },
    Failure {
        kind: ExtractionErrorKind,
        reason: String,
    },
}

/// Outcome of processing one file. Never changed once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub source_name: String,
    pub format: FormatKind,
    pub byte_size: u64,
    #[serde(flatten)]
    pub outcome: ExtractionOutcome,
}

impl ExtractionResult {
    fn new(file: &PendingFile, outcome: std::result::Result<String, ExtractionError>) -> Self {
        let outcome = match outcome {
            Ok(text) => ExtractionOutcome::Success { text },
            Err(err) => ExtractionOutcome::Failure {
                kind: err.kind,
                reason: err.detail,
            },
        };

        Self {
            source_name: file.name.clone(),
            format: file.format,
            byte_size: file.byte_size,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            ExtractionOutcome::Success { text } => Some(text),
            ExtractionOutcome::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            ExtractionOutcome::Success { .. } => None,
            ExtractionOutcome::Failure { reason, .. } => Some(reason),
        }
    }
}

/// Session log entry for a successfully extracted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub name: String,
    pub declared_type: String,
    pub extracted_at: DateTime<Utc>,
}

/// How a batch went overall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Success,
    PartialSuccess,
    AllFailed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn outcome(&self) -> BatchOutcome {
        match (self.succeeded, self.failed) {
            (s, 0) if s > 0 => BatchOutcome::Success,
            (s, f) if s > 0 && f > 0 => BatchOutcome::PartialSuccess,
            _ => BatchOutcome::AllFailed,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.outcome() {
            BatchOutcome::Success => "Success",
            BatchOutcome::PartialSuccess => "Partial Success",
            BatchOutcome::AllFailed => "Extraction Failed",
        }
    }

    /// User-facing summary line
    pub fn message(&self) -> String {
        match self.outcome() {
            BatchOutcome::Success => format!(
                "Text extracted successfully from {} document(s)",
                self.succeeded
            ),
            BatchOutcome::PartialSuccess => {
                format!("{} succeeded, {} failed", self.succeeded, self.failed)
            }
            BatchOutcome::AllFailed => {
                format!("Failed to extract text from {} document(s)", self.failed)
            }
        }
    }
}

/// Everything one batch produced
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    /// One entry per attempted file, in selection order
    pub results: Vec<ExtractionResult>,
    /// Files skipped because the batch was cancelled
    pub unattempted: Vec<String>,
    pub cancelled: bool,
}

/// Receives notifications while a batch runs.
pub trait BatchObserver: Send + Sync {
    fn on_progress(&self, _progress: &Progress) {}

    fn on_extracted(&self, _text: &str, _source_name: &str) {}

    fn on_failed(&self, _source_name: &str, _reason: &str) {}

    fn on_complete(&self, _summary: &BatchSummary) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Clears the processing flag when the batch ends, however it ends.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the pending selection and runs batches over it.
pub struct BatchController {
    config: BatchConfig,
    extractor: Arc<ContentExtractor>,
    selection: Mutex<Selection>,
    processed: RwLock<Vec<ProcessedFile>>,
    produced: RwLock<Vec<ExtractionResult>>,
    processing: AtomicBool,
}

impl BatchController {
    pub fn new(config: BatchConfig) -> Self {
        Self::with_extractor(config, ContentExtractor::new())
    }

    pub fn with_extractor(config: BatchConfig, extractor: ContentExtractor) -> Self {
        Self {
            config,
            extractor: Arc::new(extractor),
            selection: Mutex::new(Selection::new()),
            processed: RwLock::new(Vec::new()),
            produced: RwLock::new(Vec::new()),
            processing: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Validate candidates and add the accepted ones to the selection.
    pub async fn add_files<I>(&self, candidates: I) -> Admission
    where
        I: IntoIterator<Item = CandidateFile>,
    {
        let admission = self.selection.lock().await.add(candidates);

        debug!(
            admitted = admission.admitted_count(),
            unsupported = admission.rejected_unsupported,
            duplicate = admission.rejected_duplicate,
            "Files added to selection"
        );

        admission
    }

    pub async fn remove_file(&self, index: usize) -> Option<PendingFile> {
        self.selection.lock().await.remove(index)
    }

    pub async fn clear_selection(&self) {
        self.selection.lock().await.clear();
    }

    pub async fn pending(&self) -> Vec<PendingFile> {
        self.selection.lock().await.files().to_vec()
    }

    pub async fn pending_count(&self) -> usize {
        self.selection.lock().await.len()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Extract every pending file.
    ///
    /// The selection is handed over to the batch up front, so it is empty
    /// afterwards whatever the outcome. Fails with `EmptySelection` when
    /// nothing is pending and with `BatchInProgress` when another batch is
    /// still running; in both cases no batch starts.
    #[tracing::instrument(skip_all)]
    pub async fn process_all(
        &self,
        observer: &dyn BatchObserver,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let _guard = ProcessingGuard::acquire(&self.processing)
            .ok_or(IngestionError::BatchInProgress)?;

        let files = self.selection.lock().await.take();
        if files.is_empty() {
            return Err(IngestionError::EmptySelection);
        }

        let total = files.len();
        info!(files = total, "Batch extraction started");

        let mut summary = BatchSummary::default();
        let mut results = Vec::with_capacity(total);
        let mut unattempted = Vec::new();

        for (index, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                unattempted = files[index..].iter().map(|f| f.name.clone()).collect();
                info!(remaining = unattempted.len(), "Batch extraction cancelled");
                break;
            }

            let progress = Progress {
                file_name: file.name.clone(),
                position: index + 1,
                total,
            };
            debug!(%progress, "Processing file");
            observer.on_progress(&progress);

            let result = ExtractionResult::new(file, self.extract_one(file).await);

            match &result.outcome {
                ExtractionOutcome::Success { text } => {
                    self.processed.write().await.push(ProcessedFile {
                        name: file.name.clone(),
                        declared_type: file.declared_type.clone(),
                        extracted_at: Utc::now(),
                    });
                    observer.on_extracted(text, &file.name);
                    summary.succeeded += 1;
                }
                ExtractionOutcome::Failure { kind, reason } => {
                    warn!(file = %file.name, %kind, error = %reason, "Text extraction failed");
                    observer.on_failed(&file.name, reason);
                    summary.failed += 1;
                }
            }

            self.produced.write().await.push(result.clone());
            results.push(result);
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Batch extraction finished"
        );
        observer.on_complete(&summary);

        Ok(BatchReport {
            summary,
            results,
            cancelled: !unattempted.is_empty(),
            unattempted,
        })
    }

    async fn extract_one(&self, file: &PendingFile) -> std::result::Result<String, ExtractionError> {
        let bytes = file.read_bytes().await.map_err(|e| {
            ExtractionError::library_failure(format!("Failed to read {}: {e}", file.name))
        })?;

        let extractor = Arc::clone(&self.extractor);
        let format = file.format;
        let task = tokio::task::spawn_blocking(move || extractor.extract(&bytes, format));

        let joined = match self.config.file_timeout() {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                ExtractionError::library_failure(format!(
                    "Extraction timed out after {}s",
                    limit.as_secs()
                ))
            })?,
            None => task.await,
        };

        joined.map_err(|e| {
            ExtractionError::library_failure(format!("Extraction task failed: {e}"))
        })?
    }

    /// The most recently processed files, newest first
    pub async fn recent(&self) -> Vec<ProcessedFile> {
        self.processed
            .read()
            .await
            .iter()
            .rev()
            .take(self.config.recent_limit)
            .cloned()
            .collect()
    }

    /// The full processed-file log, oldest first
    pub async fn processed_log(&self) -> Vec<ProcessedFile> {
        self.processed.read().await.clone()
    }

    pub async fn clear_log(&self) {
        self.processed.write().await.clear();
    }

    /// Every result produced this session, oldest first
    pub async fn produced(&self) -> Vec<ExtractionResult> {
        self.produced.read().await.clone()
    }
}

impl Default for BatchController {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}
