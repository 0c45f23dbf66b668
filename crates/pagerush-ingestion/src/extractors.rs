//! Document Text Extractors
//!
//! One extractor per supported format. PDF and DOCX parsing is delegated to
//! backend traits so the parser crate can be swapped (or faked in tests)
//! without touching the extraction rules.

use std::sync::Arc;
use tracing::debug;

use crate::format::FormatKind;
use crate::ExtractionError;

/// An opened PDF document.
#[cfg_attr(test, mockall::automock)]
pub trait PdfPages {
    /// Number of pages in the document
    fn page_count(&self) -> u32;

    /// Text of the 1-based page `page`
    fn page_text(&mut self, page: u32) -> anyhow::Result<String>;
}

/// PDF parsing library.
#[cfg_attr(test, mockall::automock)]
pub trait PdfBackend: Send + Sync {
    fn open(&self, content: &[u8]) -> anyhow::Result<Box<dyn PdfPages>>;
}

/// DOCX-to-text converter. Conversion warnings are not part of the contract.
#[cfg_attr(test, mockall::automock)]
pub trait DocxBackend: Send + Sync {
    fn extract_raw_text(&self, content: &[u8]) -> anyhow::Result<String>;
}

/// PDF backend built on `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

struct LopdfPages {
    document: lopdf::Document,
    page_count: u32,
}

impl PdfPages for LopdfPages {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    /// lopdf ends every page with its own line break; it is dropped here so
    /// the extractor alone decides how pages are separated.
    fn page_text(&mut self, page: u32) -> anyhow::Result<String> {
        let text = self.document.extract_text(&[page])?;
        Ok(text.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl PdfBackend for LopdfBackend {
    fn open(&self, content: &[u8]) -> anyhow::Result<Box<dyn PdfPages>> {
        let document = lopdf::Document::load_mem(content)?;
        let page_count = document.get_pages().len() as u32;
        Ok(Box::new(LopdfPages {
            document,
            page_count,
        }))
    }
}

/// DOCX backend built on `docx-rs`
///
/// Emits each paragraph followed by a blank line, including paragraphs
/// nested in table cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxRsBackend;

impl DocxRsBackend {
    fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
        use docx_rs::{ParagraphChild, RunChild};

        let mut text = String::new();
        for child in &paragraph.children {
            if let ParagraphChild::Run(run) = child {
                for run_child in &run.children {
                    match run_child {
                        RunChild::Text(t) => text.push_str(&t.text),
                        RunChild::Tab(_) => text.push('\t'),
                        RunChild::Break(_) => text.push('\n'),
                        _ => {}
                    }
                }
            }
        }
        text
    }

    fn push_paragraph(out: &mut String, paragraph: &docx_rs::Paragraph) {
        out.push_str(&Self::paragraph_text(paragraph));
        out.push_str("\n\n");
    }

    fn push_table(out: &mut String, table: &docx_rs::Table) {
        use docx_rs::{TableCellContent, TableChild, TableRowChild};

        for row in &table.rows {
            #[allow(irrefutable_let_patterns)]
            let TableChild::TableRow(row) = row else { continue };
            for cell in &row.cells {
                #[allow(irrefutable_let_patterns)]
                let TableRowChild::TableCell(cell) = cell else { continue };
                for content in &cell.children {
                    if let TableCellContent::Paragraph(p) = content {
                        Self::push_paragraph(out, p);
                    }
                }
            }
        }
    }
}

impl DocxBackend for DocxRsBackend {
    fn extract_raw_text(&self, content: &[u8]) -> anyhow::Result<String> {
        use docx_rs::DocumentChild;

        let docx = docx_rs::read_docx(content).map_err(|e| anyhow::anyhow!("{e}"))?;

        let mut text = String::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => Self::push_paragraph(&mut text, p),
                DocumentChild::Table(t) => Self::push_table(&mut text, t),
                _ => {}
            }
        }
        Ok(text)
    }
}

/// Trait for document text extractors
pub trait TextExtractor: Send + Sync {
    /// Extract text from document content
    fn extract(&self, content: &[u8]) -> Result<String, ExtractionError>;

    /// Format handled by this extractor
    fn format(&self) -> FormatKind;

    /// Get extractor name
    fn name(&self) -> &'static str;
}

/// PDF extractor: pages in ascending order, separated by a blank line.
pub struct PdfExtractor {
    backend: Arc<dyn PdfBackend>,
}

impl PdfExtractor {
    pub fn new(backend: Arc<dyn PdfBackend>) -> Self {
        Self { backend }
    }

    fn failure(e: impl std::fmt::Display) -> ExtractionError {
        ExtractionError::library_failure(format!("Failed to extract PDF content: {e}"))
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(Arc::new(LopdfBackend))
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, content: &[u8]) -> Result<String, ExtractionError> {
        let mut document = self.backend.open(content).map_err(Self::failure)?;
        let page_count = document.page_count();

        let mut full_text = String::new();
        for page in 1..=page_count {
            let page_text = document.page_text(page).map_err(Self::failure)?;
            full_text.push_str(&page_text);
            full_text.push_str("\n\n");
        }

        let trimmed = full_text.trim();
        if trimmed.is_empty() {
            return Err(ExtractionError::empty_content(
                "No text content found in the PDF file",
            ));
        }

        debug!(page_count, chars = trimmed.len(), "Extracted PDF text");
        Ok(trimmed.to_string())
    }

    fn format(&self) -> FormatKind {
        FormatKind::Pdf
    }

    fn name(&self) -> &'static str {
        "pdf"
    }
}

/// DOCX extractor: raw text, returned verbatim.
pub struct DocxExtractor {
    backend: Arc<dyn DocxBackend>,
}

impl DocxExtractor {
    pub fn new(backend: Arc<dyn DocxBackend>) -> Self {
        Self { backend }
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new(Arc::new(DocxRsBackend))
    }
}

impl TextExtractor for DocxExtractor {
    fn extract(&self, content: &[u8]) -> Result<String, ExtractionError> {
        let text = self.backend.extract_raw_text(content).map_err(|e| {
            ExtractionError::library_failure(format!("Failed to extract DOCX content: {e}"))
        })?;

        if text.trim().is_empty() {
            return Err(ExtractionError::empty_content(
                "No text content found in the DOCX file",
            ));
        }

        debug!(chars = text.len(), "Extracted DOCX text");
        Ok(text)
    }

    fn format(&self) -> FormatKind {
        FormatKind::Docx
    }

    fn name(&self) -> &'static str {
        "docx"
    }
}

/// Decode bytes as UTF-8 (dropping a BOM), falling back to Windows-1252.
///
/// The fallback is intentional: legacy text files still decode instead of
/// failing, and valid UTF-8 is never affected by it.
fn decode_text(content: &[u8]) -> String {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);

    match std::str::from_utf8(content) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(content);
            decoded.into_owned()
        }
    }
}

/// Markdown extractor. The raw source is the extracted text; nothing is
/// rendered or stripped.
#[derive(Debug, Default)]
pub struct MarkdownExtractor;

impl TextExtractor for MarkdownExtractor {
    fn extract(&self, content: &[u8]) -> Result<String, ExtractionError> {
        let text = decode_text(content);
        if text.trim().is_empty() {
            return Err(ExtractionError::empty_content(
                "No content found in the markdown file",
            ));
        }
        Ok(text)
    }

    fn format(&self) -> FormatKind {
        FormatKind::Markdown
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}

/// Plain text extractor
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, content: &[u8]) -> Result<String, ExtractionError> {
        let text = decode_text(content);
        if text.trim().is_empty() {
            return Err(ExtractionError::empty_content(
                "No content found in the text file",
            ));
        }
        Ok(text)
    }

    fn format(&self) -> FormatKind {
        FormatKind::PlainText
    }

    fn name(&self) -> &'static str {
        "plain_text"
    }
}

/// Dispatches to the extractor for a format.
///
/// Pure with respect to its input: the same bytes and format always give the
/// same text or the same error.
pub struct ContentExtractor {
    pdf: PdfExtractor,
    docx: DocxExtractor,
    markdown: MarkdownExtractor,
    plain_text: PlainTextExtractor,
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self {
            pdf: PdfExtractor::default(),
            docx: DocxExtractor::default(),
            markdown: MarkdownExtractor,
            plain_text: PlainTextExtractor,
        }
    }

    pub fn with_pdf_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdf = PdfExtractor::new(backend);
        self
    }

    pub fn with_docx_backend(mut self, backend: Arc<dyn DocxBackend>) -> Self {
        self.docx = DocxExtractor::new(backend);
        self
    }

    /// Extractor responsible for `format`
    pub fn extractor_for(&self, format: FormatKind) -> &dyn TextExtractor {
        match format {
            FormatKind::Pdf => &self.pdf,
            FormatKind::Docx => &self.docx,
            FormatKind::Markdown => &self.markdown,
            FormatKind::PlainText => &self.plain_text,
        }
    }

    pub fn extract(&self, content: &[u8], format: FormatKind) -> Result<String, ExtractionError> {
        let extractor = self.extractor_for(format);
        debug!(extractor = extractor.name(), size = content.len(), "Extracting text");
        extractor.extract(content)
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractionErrorKind;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn pages(texts: &'static [&'static str]) -> Box<dyn PdfPages> {
        let mut doc = MockPdfPages::new();
        doc.expect_page_count().return_const(texts.len() as u32);
        for (i, text) in texts.iter().enumerate() {
            doc.expect_page_text()
                .with(eq(i as u32 + 1))
                .times(1)
                .returning(move |_| Ok(text.to_string()));
        }
        Box::new(doc)
    }

    fn pdf_with(texts: &'static [&'static str]) -> PdfExtractor {
        let mut backend = MockPdfBackend::new();
        backend.expect_open().returning(move |_| Ok(pages(texts)));
        PdfExtractor::new(Arc::new(backend))
    }

    #[test]
    fn test_pdf_pages_joined_with_blank_line() {
        let extractor = pdf_with(&["Page 1", "Page 2", "Page 3"]);
        let text = extractor.extract(b"%PDF").unwrap();
        assert_eq!(text, "Page 1\n\nPage 2\n\nPage 3");
    }

    #[test]
    fn test_pdf_without_text_is_empty_content() {
        let extractor = pdf_with(&["  ", "\n"]);
        let err = extractor.extract(b"%PDF").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::EmptyContent);

        let extractor = pdf_with(&[]);
        let err = extractor.extract(b"%PDF").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::EmptyContent);
    }

    #[test]
    fn test_pdf_open_failure_is_library_failure() {
        let mut backend = MockPdfBackend::new();
        backend
            .expect_open()
            .returning(|_| Err(anyhow::anyhow!("Invalid PDF structure")));

        let err = PdfExtractor::new(Arc::new(backend)).extract(b"junk").unwrap_err();

        assert_eq!(err.kind, ExtractionErrorKind::LibraryFailure);
        assert!(err.detail.contains("Invalid PDF structure"));
    }

    #[test]
    fn test_pdf_page_failure_is_library_failure() {
        let mut backend = MockPdfBackend::new();
        backend.expect_open().returning(|_| {
            let mut doc = MockPdfPages::new();
            doc.expect_page_count().return_const(2u32);
            doc.expect_page_text()
                .with(eq(1))
                .returning(|_| Ok("first".to_string()));
            doc.expect_page_text()
                .with(eq(2))
                .returning(|_| Err(anyhow::anyhow!("bad content stream")));
            Ok(Box::new(doc))
        });

        let err = PdfExtractor::new(Arc::new(backend)).extract(b"%PDF").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::LibraryFailure);
        assert!(!err.detail.is_empty());
    }

    /// A PDF with one "Page N" text line per page, written by lopdf itself.
    fn lopdf_document(page_count: u32) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for n in 1..=page_count {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("Page {n}"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_lopdf_three_pages_separated_by_one_blank_line() {
        let text = ContentExtractor::new()
            .extract(&lopdf_document(3), FormatKind::Pdf)
            .unwrap();
        assert_eq!(text, "Page 1\n\nPage 2\n\nPage 3");
    }

    #[test]
    fn test_lopdf_page_text_has_no_trailing_line_break() {
        let mut pages = LopdfBackend.open(&lopdf_document(1)).unwrap();
        assert_eq!(pages.page_count(), 1);
        assert_eq!(pages.page_text(1).unwrap(), "Page 1");
    }

    #[test]
    fn test_lopdf_rejects_garbage() {
        let err = PdfExtractor::default().extract(b"not a pdf at all").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::LibraryFailure);
    }

    #[test]
    fn test_docx_text_is_returned_verbatim() {
        let mut backend = MockDocxBackend::new();
        backend
            .expect_extract_raw_text()
            .returning(|_| Ok("  Title\n\nBody\n\n".to_string()));

        let text = DocxExtractor::new(Arc::new(backend)).extract(b"PK").unwrap();
        assert_eq!(text, "  Title\n\nBody\n\n");
    }

    #[test]
    fn test_docx_whitespace_only_is_empty_content() {
        let mut backend = MockDocxBackend::new();
        backend
            .expect_extract_raw_text()
            .returning(|_| Ok(" \n\t ".to_string()));

        let err = DocxExtractor::new(Arc::new(backend)).extract(b"PK").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::EmptyContent);
    }

    #[test]
    fn test_docx_rs_rejects_garbage() {
        let err = DocxExtractor::default().extract(b"definitely not a zip").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::LibraryFailure);
        assert!(err.detail.starts_with("Failed to extract DOCX content"));
    }

    #[test]
    fn test_docx_rs_reads_paragraphs() {
        use docx_rs::{Docx, Paragraph, Run};

        let mut buffer = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Hello")))
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("World")))
            .build()
            .pack(&mut buffer)
            .unwrap();

        let text = DocxRsBackend.extract_raw_text(buffer.get_ref()).unwrap();
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
    }

    #[test]
    fn test_plain_text_keeps_interior_content() {
        let text = PlainTextExtractor.extract(b"hello world").unwrap();
        assert_eq!(text, "hello world");

        let text = PlainTextExtractor.extract(b"\n  indented\n").unwrap();
        assert_eq!(text, "\n  indented\n");
    }

    #[test]
    fn test_plain_text_empty() {
        let err = PlainTextExtractor.extract(b"").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::EmptyContent);

        let err = PlainTextExtractor.extract(b"   \n\t").unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::EmptyContent);
    }

    #[test]
    fn test_plain_text_non_utf8_fallback() {
        // "café" in Windows-1252
        let text = PlainTextExtractor.extract(b"caf\xE9").unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_utf8_bom_dropped() {
        let text = PlainTextExtractor.extract(b"\xEF\xBB\xBFhi").unwrap();
        assert_eq!(text, "hi");
    }

    #[test]
    fn test_markdown_is_not_rendered() {
        let source = "# Title\n\n**bold** [link](http://example.com)";
        let text = MarkdownExtractor.extract(source.as_bytes()).unwrap();
        assert_eq!(text, source);
    }

    #[test]
    fn test_content_extractor_dispatch() {
        let extractor = ContentExtractor::new();
        for format in FormatKind::ALL {
            assert_eq!(extractor.extractor_for(format).format(), format);
        }

        assert_eq!(
            extractor.extract(b"plain", FormatKind::PlainText).unwrap(),
            "plain"
        );
    }

    #[test]
    fn test_extract_is_deterministic() {
        let extractor = ContentExtractor::new();
        let content = b"same input";
        let first = extractor.extract(content, FormatKind::Markdown);
        let second = extractor.extract(content, FormatKind::Markdown);
        assert_eq!(first, second);

        let first = extractor.extract(b"", FormatKind::PlainText);
        let second = extractor.extract(b"", FormatKind::PlainText);
        assert_eq!(first, second);
    }
}
