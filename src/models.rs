//! Data models for paper metadata.
//!
//! - [`DocumentReference`]: a pointer to a not-yet-processed paper page,
//!   yielded by the index walker and never persisted.
//! - [`PaperRecord`]: one paper's metadata as appended to both stores.
//! - [`AnnotatedPaperRecord`]: a record plus the category assigned by the
//!   classifier, written to a separate output.
//!
//! Field order on the record structs matches the CSV header
//! `year,title,authors,abstract,pdf_url[,category]`.

use serde::{Deserialize, Serialize};

/// Placeholder recorded when a paper page carries no PDF link.
pub const PDF_UNAVAILABLE: &str = "Unavailable";
/// Placeholder for a missing Authors section.
pub const AUTHORS_UNAVAILABLE: &str = "Authors not available";
/// Placeholder for a missing Abstract section.
pub const ABSTRACT_UNAVAILABLE: &str = "Abstract not available";
/// Label used when classification fails or yields nothing usable.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A lightweight pointer to a paper page found on a yearly index.
#[derive(Debug, Clone)]
pub struct DocumentReference {
    /// Link text as it appears on the index page.
    pub title: String,
    /// Absolute URL of the paper page.
    pub source_url: String,
    /// The proceedings year the reference was found under.
    pub year: u16,
}

/// One paper's metadata. `title` is the dedup key and doubles as the
/// filename stem of the downloaded PDF, so it is always cleaned before a
/// record is built. Records are append-only and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub year: u16,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub pdf_url: String,
}

/// A [`PaperRecord`] with the classifier's category label appended.
///
/// Kept flat rather than nesting the record because the CSV serializer
/// does not traverse nested structs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedPaperRecord {
    pub year: u16,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub pdf_url: String,
    pub category: String,
}

impl AnnotatedPaperRecord {
    pub fn new(record: PaperRecord, category: String) -> Self {
        Self {
            year: record.year,
            title: record.title,
            authors: record.authors,
            abstract_text: record.abstract_text,
            pdf_url: record.pdf_url,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PaperRecord {
        PaperRecord {
            year: 2021,
            title: "Attention Is Not All You Need".into(),
            authors: "A. Author, B. Author".into(),
            abstract_text: "We revisit attention.".into(),
            pdf_url: PDF_UNAVAILABLE.into(),
        }
    }

    #[test]
    fn record_serializes_with_renamed_abstract() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"abstract\":\"We revisit attention.\""));
        assert!(!json.contains("abstract_text"));
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = sample();
        let json = serde_json::to_string(&record).unwrap();
        let back: PaperRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn annotation_preserves_record_fields() {
        let annotated = AnnotatedPaperRecord::new(sample(), "Deep Learning".into());
        assert_eq!(annotated.year, 2021);
        assert_eq!(annotated.title, "Attention Is Not All You Need");
        assert_eq!(annotated.category, "Deep Learning");
    }
}
