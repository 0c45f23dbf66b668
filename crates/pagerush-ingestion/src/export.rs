//! Plain-text export of extracted documents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// One extracted document ready to be written out
#[derive(Debug, Clone, Serialize)]
pub struct ExportEntry {
    pub file_name: String,
    pub text: String,
    pub extracted_at: DateTime<Utc>,
}

/// `lecture.notes.pdf` becomes `lecture.notes_extracted.txt`.
pub fn export_file_name(source_name: &str) -> String {
    let stem = match source_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && !ext.contains('/') => stem,
        _ => source_name,
    };
    format!("{stem}_extracted.txt")
}

/// Export names for a batch, in order. A name already used earlier in the
/// batch gets `_2`, `_3`, ... so no export overwrites another.
pub fn unique_export_file_names<'a, I>(source_names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken = HashSet::new();
    source_names
        .into_iter()
        .map(|name| {
            let base = export_file_name(name);
            let stem = base.strip_suffix(".txt").unwrap_or(&base);
            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{stem}_{n}.txt");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Concatenate entries under a header naming each source file.
pub fn combined_export(entries: &[ExportEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "=== {} ({}) ===\n\n{}\n\n",
                entry.file_name,
                entry.extracted_at.format("%Y-%m-%d %H:%M:%S UTC"),
                entry.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn combined_export_file_name(date: NaiveDate) -> String {
    format!("all_extracted_texts_{}.txt", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("notes.pdf"), "notes_extracted.txt");
        assert_eq!(export_file_name("a.b.docx"), "a.b_extracted.txt");
        assert_eq!(export_file_name("README"), "README_extracted.txt");
        assert_eq!(export_file_name("trailing."), "trailing._extracted.txt");
    }

    #[test]
    fn test_unique_export_file_names() {
        let names = unique_export_file_names(["notes.txt", "notes.txt", "notes.md", "essay.pdf"]);
        assert_eq!(
            names,
            vec![
                "notes_extracted.txt",
                "notes_extracted_2.txt",
                "notes_extracted_3.txt",
                "essay_extracted.txt",
            ]
        );
    }

    #[test]
    fn test_combined_export() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let entries = vec![
            ExportEntry {
                file_name: "a.txt".to_string(),
                text: "alpha".to_string(),
                extracted_at: at,
            },
            ExportEntry {
                file_name: "b.md".to_string(),
                text: "# beta".to_string(),
                extracted_at: at,
            },
        ];

        assert_eq!(
            combined_export(&entries),
            "=== a.txt (2024-03-01 09:30:00 UTC) ===\n\nalpha\n\n\n\
             === b.md (2024-03-01 09:30:00 UTC) ===\n\n# beta\n\n"
        );
        assert_eq!(combined_export(&[]), "");
    }

    #[test]
    fn test_combined_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(combined_export_file_name(date), "all_extracted_texts_2024-03-01.txt");
    }
}
