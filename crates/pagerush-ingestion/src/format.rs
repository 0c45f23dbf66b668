//! Supported document formats and format detection.

use serde::{Deserialize, Serialize};

/// The closed set of formats text can be extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    Pdf,
    Docx,
    Markdown,
    PlainText,
}

impl FormatKind {
    pub const ALL: [FormatKind; 4] = [
        FormatKind::Pdf,
        FormatKind::Docx,
        FormatKind::Markdown,
        FormatKind::PlainText,
    ];

    /// Canonical MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            FormatKind::Pdf => "application/pdf",
            FormatKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FormatKind::Markdown => "text/markdown",
            FormatKind::PlainText => "text/plain",
        }
    }

    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            FormatKind::Pdf => "pdf",
            FormatKind::Docx => "docx",
            FormatKind::Markdown => "md",
            FormatKind::PlainText => "txt",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            FormatKind::Pdf => "PDF",
            FormatKind::Docx => "Word (.docx)",
            FormatKind::Markdown => "Markdown (.md)",
            FormatKind::PlainText => "Text (.txt)",
        }
    }

    /// Exact match against the declared MIME type.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.mime_type() == mime_type)
    }

    /// Case-insensitive match against the file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.extension() == ext)
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Detect the format of a file from its declared MIME type, falling back to
/// its extension. `None` means the file is unsupported.
pub fn classify(declared_type: &str, name: &str) -> Option<FormatKind> {
    FormatKind::from_mime(declared_type).or_else(|| FormatKind::from_file_name(name))
}

/// Message shown when files are skipped for their type.
pub fn supported_formats_hint() -> String {
    let labels: Vec<&str> = FormatKind::ALL.iter().map(|k| k.label()).collect();
    format!("Only {} files are allowed.", labels.join(", "))
}
