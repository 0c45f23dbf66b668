//! Candidate files and the pending selection
//!
//! Files are validated once, when they are added. Anything that is not one of
//! the supported formats, or that is already selected, is counted and dropped
//! here so that it never reaches extraction.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::debug;

use crate::format::{classify, FormatKind};
use crate::Result;

/// Where a candidate's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Read lazily from disk when the file is processed
    Path(PathBuf),
    /// Already in memory
    Memory(Arc<[u8]>),
}

/// A file selected by the user but not yet processed.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateFile {
    pub name: String,
    pub byte_size: u64,
    /// Declared MIME type; may be empty
    pub declared_type: String,
    /// Modification stamp in milliseconds since the epoch
    pub last_modified: i64,
    #[serde(skip)]
    pub source: FileSource,
}

impl CandidateFile {
    /// Build a candidate from bytes already in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        last_modified: i64,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            byte_size: bytes.len() as u64,
            declared_type: declared_type.into(),
            last_modified,
            source: FileSource::Memory(bytes),
        }
    }

    /// Build a candidate from a file on disk. The declared type is guessed
    /// from the path the way a browser would label it.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let declared_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or_default()
            .to_string();

        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Ok(Self {
            name,
            byte_size: metadata.len(),
            declared_type,
            last_modified,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Format of this file, or `None` if unsupported.
    pub fn format(&self) -> Option<FormatKind> {
        if self.name.is_empty() {
            return None;
        }
        classify(&self.declared_type, &self.name)
    }

    /// Two candidates are the same file when name, size and stamp all match.
    pub fn is_duplicate_of(&self, other: &CandidateFile) -> bool {
        self.name == other.name
            && self.byte_size == other.byte_size
            && self.last_modified == other.last_modified
    }

    /// Read the file's full contents. In-memory sources hand out their
    /// shared buffer without copying.
    pub async fn read_bytes(&self) -> std::io::Result<Arc<[u8]>> {
        match &self.source {
            FileSource::Path(path) => Ok(tokio::fs::read(path).await?.into()),
            FileSource::Memory(bytes) => Ok(Arc::clone(bytes)),
        }
    }
}

/// A candidate that passed validation, together with its detected format.
#[derive(Debug, Clone, Serialize)]
pub struct PendingFile {
    #[serde(flatten)]
    pub file: CandidateFile,
    pub format: FormatKind,
}

impl std::ops::Deref for PendingFile {
    type Target = CandidateFile;

    fn deref(&self) -> &Self::Target {
        &self.file
    }
}

/// Outcome of validating a set of new candidates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Admission {
    /// Accepted files, in input order
    pub admitted: Vec<PendingFile>,
    pub rejected_unsupported: usize,
    pub rejected_duplicate: usize,
}

impl Admission {
    pub fn admitted_count(&self) -> usize {
        self.admitted.len()
    }
}

/// Validate `candidates` against each other and against `already_selected`.
///
/// Has no side effects; the caller merges `admitted` into its selection.
pub fn admit<I>(candidates: I, already_selected: &[PendingFile]) -> Admission
where
    I: IntoIterator<Item = CandidateFile>,
{
    let mut admission = Admission::default();

    for file in candidates {
        let Some(format) = file.format() else {
            debug!(name = %file.name, declared_type = %file.declared_type, "Unsupported file skipped");
            admission.rejected_unsupported += 1;
            continue;
        };

        let duplicate = already_selected
            .iter()
            .chain(admission.admitted.iter())
            .any(|existing| existing.file.is_duplicate_of(&file));

        if duplicate {
            debug!(name = %file.name, "Duplicate file skipped");
            admission.rejected_duplicate += 1;
            continue;
        }

        admission.admitted.push(PendingFile { file, format });
    }

    admission
}

/// Files waiting to be processed.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    files: Vec<PendingFile>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append new candidates. Returns the admission counts so
    /// the caller can tell the user what was skipped.
    pub fn add<I>(&mut self, candidates: I) -> Admission
    where
        I: IntoIterator<Item = CandidateFile>,
    {
        let admission = admit(candidates, &self.files);
        self.files.extend(admission.admitted.iter().cloned());
        admission
    }

    /// Remove the file at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<PendingFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Hand over every pending file, leaving the selection empty.
    pub fn take(&mut self) -> Vec<PendingFile> {
        std::mem::take(&mut self.files)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingFile> {
        self.files.iter()
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, declared_type: &str, size: usize, stamp: i64) -> CandidateFile {
        CandidateFile::from_bytes(name, declared_type, stamp, vec![b'x'; size])
    }

    #[test]
    fn test_admit_filters_unsupported() {
        let admission = admit(
            vec![
                file("a.pdf", "application/pdf", 10, 1),
                file("b.png", "image/png", 10, 1),
                file("c.md", "", 10, 1),
            ],
            &[],
        );

        assert_eq!(admission.admitted_count(), 2);
        assert_eq!(admission.rejected_unsupported, 1);
        assert_eq!(admission.rejected_duplicate, 0);
        assert_eq!(admission.admitted[0].name, "a.pdf");
        assert_eq!(admission.admitted[1].format, FormatKind::Markdown);
    }

    #[test]
    fn test_admit_rejects_duplicates_within_call() {
        let admission = admit(
            vec![file("a.txt", "text/plain", 5, 7), file("a.txt", "text/plain", 5, 7)],
            &[],
        );

        assert_eq!(admission.admitted_count(), 1);
        assert_eq!(admission.rejected_duplicate, 1);
    }

    #[test]
    fn test_admit_rejects_already_selected() {
        let existing = admit(vec![file("a.txt", "text/plain", 5, 7)], &[]).admitted;
        let admission = admit(vec![file("a.txt", "", 5, 7)], &existing);

        assert_eq!(admission.admitted_count(), 0);
        assert_eq!(admission.rejected_duplicate, 1);
    }

    #[test]
    fn test_same_name_different_stamp_is_not_duplicate() {
        let admission = admit(
            vec![file("a.txt", "text/plain", 5, 7), file("a.txt", "text/plain", 5, 8)],
            &[],
        );
        assert_eq!(admission.admitted_count(), 2);
    }

    #[test]
    fn test_empty_name_is_unsupported() {
        let admission = admit(vec![file("", "text/plain", 3, 1)], &[]);
        assert_eq!(admission.rejected_unsupported, 1);
    }

    #[test]
    fn test_selection_add_remove_take() {
        let mut selection = Selection::new();
        let admission = selection.add(vec![
            file("a.txt", "text/plain", 1, 1),
            file("b.md", "text/markdown", 1, 1),
        ]);
        assert_eq!(admission.admitted_count(), 2);
        assert_eq!(selection.len(), 2);

        let again = selection.add(vec![file("a.txt", "text/plain", 1, 1)]);
        assert_eq!(again.rejected_duplicate, 1);
        assert_eq!(selection.len(), 2);

        let removed = selection.remove(0).unwrap();
        assert_eq!(removed.name, "a.txt");
        assert!(selection.remove(5).is_none());

        let taken = selection.take();
        assert_eq!(taken.len(), 1);
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn test_candidate_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        tokio::fs::write(&path, "# Notes").await.unwrap();

        let candidate = CandidateFile::from_path(&path).await.unwrap();

        assert_eq!(candidate.name, "notes.md");
        assert_eq!(candidate.byte_size, 7);
        assert_eq!(candidate.format(), Some(FormatKind::Markdown));
        assert_eq!(&*candidate.read_bytes().await.unwrap(), b"# Notes");
    }

    #[tokio::test]
    async fn test_missing_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CandidateFile::from_path(dir.path().join("gone.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::IngestionError::Io(_)));
    }

    #[tokio::test]
    async fn test_memory_read_shares_buffer() {
        let candidate = file("shared.txt", "text/plain", 6, 1);
        let FileSource::Memory(original) = &candidate.source else {
            panic!("expected an in-memory source");
        };

        let first = candidate.read_bytes().await.unwrap();
        let second = candidate.read_bytes().await.unwrap();

        assert!(Arc::ptr_eq(&first, original));
        assert!(Arc::ptr_eq(&first, &second));
    }
}
