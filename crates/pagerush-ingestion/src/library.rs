//! Owner-scoped document library
//!
//! Extracted documents are filed per owner and can be listed, searched,
//! updated and deleted. Only the interface matters to the rest of the crate;
//! `InMemoryLibrary` backs tests and single-process use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::batch::ExtractionResult;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LibraryError {
    #[error("Document not found: {0}")]
    NotFound(Uuid),

    #[error("Not authorized to access document {0}")]
    NotAuthorized(Uuid),
}

/// A document to be filed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub filename: String,
    pub file_size: u64,
    pub mime_type: String,
    /// Extracted text
    pub content: String,
}

impl NewDocument {
    /// Build from a successful extraction; `None` for failures.
    pub fn from_result(result: &ExtractionResult) -> Option<Self> {
        let text = result.text()?;
        let title = result
            .source_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(result.source_name.as_str())
            .to_string();

        Some(Self {
            title,
            filename: result.source_name.clone(),
            file_size: result.byte_size,
            mime_type: result.format.mime_type().to_string(),
            content: text.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub filename: String,
    pub file_size: u64,
    pub mime_type: String,
    pub content: String,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub uploaded_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Fields that may change after filing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub summary: Option<String>,
}

#[async_trait]
pub trait DocumentLibrary: Send + Sync {
    async fn create(&self, owner: &str, document: NewDocument) -> Uuid;

    /// All documents of `owner`, newest upload first
    async fn list(&self, owner: &str) -> Vec<StoredDocument>;

    async fn get(&self, owner: &str, id: Uuid) -> Result<StoredDocument, LibraryError>;

    /// Case-insensitive match of `term` against document content
    async fn search(&self, owner: &str, term: &str) -> Vec<StoredDocument>;

    async fn update(&self, owner: &str, id: Uuid, patch: DocumentPatch)
        -> Result<(), LibraryError>;

    async fn delete(&self, owner: &str, id: Uuid) -> Result<(), LibraryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    documents: RwLock<HashMap<Uuid, StoredDocument>>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn owned<'a>(
        documents: &'a HashMap<Uuid, StoredDocument>,
        owner: &str,
        id: Uuid,
    ) -> Result<&'a StoredDocument, LibraryError> {
        let document = documents.get(&id).ok_or(LibraryError::NotFound(id))?;
        if document.owner != owner {
            return Err(LibraryError::NotAuthorized(id));
        }
        Ok(document)
    }

    fn newest_first(mut documents: Vec<StoredDocument>) -> Vec<StoredDocument> {
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        documents
    }
}

#[async_trait]
impl DocumentLibrary for InMemoryLibrary {
    async fn create(&self, owner: &str, document: NewDocument) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let stored = StoredDocument {
            id,
            owner: owner.to_string(),
            title: document.title,
            filename: document.filename,
            file_size: document.file_size,
            mime_type: document.mime_type,
            content: document.content,
            summary: None,
            tags: None,
            uploaded_at: now,
            last_modified: now,
        };

        self.documents.write().await.insert(id, stored);
        debug!(%id, owner, "Document filed");
        id
    }

    async fn list(&self, owner: &str) -> Vec<StoredDocument> {
        let documents = self.documents.read().await;
        Self::newest_first(
            documents
                .values()
                .filter(|d| d.owner == owner)
                .cloned()
                .collect(),
        )
    }

    async fn get(&self, owner: &str, id: Uuid) -> Result<StoredDocument, LibraryError> {
        let documents = self.documents.read().await;
        Self::owned(&documents, owner, id).cloned()
    }

    async fn search(&self, owner: &str, term: &str) -> Vec<StoredDocument> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        let documents = self.documents.read().await;
        Self::newest_first(
            documents
                .values()
                .filter(|d| d.owner == owner && d.content.to_lowercase().contains(&term))
                .cloned()
                .collect(),
        )
    }

    async fn update(
        &self,
        owner: &str,
        id: Uuid,
        patch: DocumentPatch,
    ) -> Result<(), LibraryError> {
        let mut documents = self.documents.write().await;
        Self::owned(&documents, owner, id)?;

        if let Some(document) = documents.get_mut(&id) {
            if let Some(title) = patch.title {
                document.title = title;
            }
            if let Some(tags) = patch.tags {
                document.tags = Some(tags);
            }
            if let Some(summary) = patch.summary {
                document.summary = Some(summary);
            }
            document.last_modified = Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, owner: &str, id: Uuid) -> Result<(), LibraryError> {
        let mut documents = self.documents.write().await;
        Self::owned(&documents, owner, id)?;
        documents.remove(&id);
        debug!(%id, owner, "Document deleted");
        Ok(())
    }
}
