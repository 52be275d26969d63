//! Source file, segment, chunk and index record types

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// File format tag reported by the classifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Comma-separated values
    Csv,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Regular file with an extension no extractor handles
    Unknown,
    /// Path is missing or is not a regular file
    NotAFile,
}

impl FileType {
    /// Formats that have an extractor
    pub const SUPPORTED: [FileType; 5] = [
        FileType::Csv,
        FileType::Xlsx,
        FileType::Pdf,
        FileType::Docx,
        FileType::Txt,
    ];

    /// Detect file type from extension (case-insensitive, without the dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "csv" => Self::Csv,
            "xlsx" => Self::Xlsx,
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" => Self::Txt,
            _ => Self::Unknown,
        }
    }

    /// Check if this is one of the supported formats
    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }

    /// Short tag, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Unknown => "unknown",
            Self::NotAFile => "not_a_file",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Xlsx => "Excel Spreadsheet (.xlsx)",
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Txt => "Text File",
            Self::Unknown => "Unknown",
            Self::NotAFile => "Not a file",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file handed to the pipeline, with its detected format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFile {
    /// Location on disk
    pub path: PathBuf,
    /// Format tag from the classifier
    pub file_type: FileType,
}

impl SourceFile {
    /// Path rendered for logs and metadata
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// Where a segment came from inside its file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentSource {
    /// Page number (1-indexed, for PDF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Sheet name (for Excel)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    /// Record number (1-indexed, for CSV)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
}

/// A unit of raw text produced by an extractor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedSegment {
    /// Text content
    pub content: String,
    /// Positional information
    #[serde(default)]
    pub source: SegmentSource,
}

impl ExtractedSegment {
    /// Segment without positional information
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: SegmentSource::default(),
        }
    }

    /// Segment for one PDF page
    pub fn page(content: impl Into<String>, page_number: u32) -> Self {
        Self {
            content: content.into(),
            source: SegmentSource {
                page_number: Some(page_number),
                ..Default::default()
            },
        }
    }

    /// Segment for one spreadsheet
    pub fn sheet(content: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: SegmentSource {
                sheet_name: Some(sheet_name.into()),
                ..Default::default()
            },
        }
    }

    /// Segment for one CSV record
    pub fn row(content: impl Into<String>, row: u64) -> Self {
        Self {
            content: content.into(),
            source: SegmentSource {
                row: Some(row),
                ..Default::default()
            },
        }
    }

    /// Concatenate segments in document order into the document text
    pub fn concat(segments: &[ExtractedSegment]) -> String {
        let capacity = segments.iter().map(|s| s.content.len()).sum();
        segments
            .iter()
            .fold(String::with_capacity(capacity), |mut text, segment| {
                text.push_str(&segment.content);
                text
            })
    }
}

/// A contiguous span of document text chosen by the chunker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the emitted sequence
    pub index: u32,
    /// Text content, an exact slice of the document text
    pub content: String,
    /// Byte offsets into the document text
    pub byte_start: usize,
    pub byte_end: usize,
}

impl Chunk {
    /// SHA-256 of the chunk text, hex encoded
    pub fn content_hash(&self) -> String {
        hash_content(&self.content)
    }
}

/// The persisted unit: chunk text, its vector, namespace and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Record ID in the vector index
    pub id: Uuid,
    /// Chunk text
    pub text: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Namespace (None = default partition)
    pub namespace: Option<String>,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl IndexRecord {
    /// Build the record for an embedded chunk
    pub fn from_chunk(
        chunk: &Chunk,
        source: &SourceFile,
        embedding: Vec<f32>,
        embedding_model: &str,
        namespace: Option<&str>,
    ) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), serde_json::json!(source.display_path()));
        metadata.insert("file_type".to_string(), serde_json::json!(source.file_type));
        metadata.insert("chunk_index".to_string(), serde_json::json!(chunk.index));
        metadata.insert("byte_start".to_string(), serde_json::json!(chunk.byte_start));
        metadata.insert("byte_end".to_string(), serde_json::json!(chunk.byte_end));
        metadata.insert("content_hash".to_string(), serde_json::json!(chunk.content_hash()));
        metadata.insert("embedding_model".to_string(), serde_json::json!(embedding_model));

        Self {
            id: Uuid::new_v4(),
            text: chunk.content.clone(),
            embedding,
            namespace: namespace.map(str::to_string),
            metadata,
        }
    }

    /// Embedding model recorded in the metadata, if any
    pub fn embedding_model(&self) -> Option<&str> {
        self.metadata.get("embedding_model").and_then(|v| v.as_str())
    }
}

/// Hash content for record metadata
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension_is_case_insensitive() {
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("Docx"), FileType::Docx);
        assert_eq!(FileType::from_extension("xlsx"), FileType::Xlsx);
        assert_eq!(FileType::from_extension("json"), FileType::Unknown);
        assert_eq!(FileType::from_extension(""), FileType::Unknown);
    }

    #[test]
    fn test_supported_formats() {
        for file_type in FileType::SUPPORTED {
            assert!(file_type.is_supported());
        }
        assert!(!FileType::Unknown.is_supported());
        assert!(!FileType::NotAFile.is_supported());
    }

    #[test]
    fn test_serialized_tags() {
        assert_eq!(serde_json::to_string(&FileType::Csv).unwrap(), "\"csv\"");
        assert_eq!(serde_json::to_string(&FileType::NotAFile).unwrap(), "\"not_a_file\"");
        assert_eq!(FileType::NotAFile.to_string(), "not_a_file");
    }

    #[test]
    fn test_concat_keeps_document_order() {
        let segments = vec![
            ExtractedSegment::page("first page\n", 1),
            ExtractedSegment::page("second page\n", 2),
        ];
        assert_eq!(ExtractedSegment::concat(&segments), "first page\nsecond page\n");
        assert_eq!(ExtractedSegment::concat(&[]), "");
    }

    #[test]
    fn test_record_metadata() {
        let chunk = Chunk {
            index: 3,
            content: "Cats purr.".to_string(),
            byte_start: 10,
            byte_end: 20,
        };
        let source = SourceFile {
            path: PathBuf::from("/data/pets.txt"),
            file_type: FileType::Txt,
        };
        let record = IndexRecord::from_chunk(&chunk, &source, vec![0.1, 0.2], "test-model", Some("pets"));

        assert_eq!(record.text, "Cats purr.");
        assert_eq!(record.namespace.as_deref(), Some("pets"));
        assert_eq!(record.embedding_model(), Some("test-model"));
        assert_eq!(record.metadata["chunk_index"], serde_json::json!(3));
        assert_eq!(record.metadata["byte_start"], serde_json::json!(10));
        assert_eq!(record.metadata["byte_end"], serde_json::json!(20));
        assert!(!record.metadata.contains_key("char_start"));
        assert_eq!(record.metadata["file_type"], serde_json::json!("txt"));
        assert_eq!(record.metadata["source"], serde_json::json!("/data/pets.txt"));
        assert_eq!(
            record.metadata["content_hash"],
            serde_json::json!(hash_content("Cats purr."))
        );
    }
}
