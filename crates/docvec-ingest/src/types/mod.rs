//! Core types for the ingestion service

pub mod document;
pub mod request;
pub mod response;

pub use document::{Chunk, ExtractedSegment, FileType, IndexRecord, SegmentSource, SourceFile};
pub use request::IngestRequest;
pub use response::{IngestReceipt, IngestResponse, WriteReceipt};
