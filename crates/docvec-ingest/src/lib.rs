//! docvec-ingest: document ingestion into a vector index
//!
//! A file is classified by extension, its text is extracted by a
//! format-specific extractor, split into semantically coherent chunks,
//! embedded, and written to a vector index under an optional namespace.
//! The pipeline is usable as a library or behind the bundled axum server.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod providers;
pub mod server;
pub mod types;

pub use config::IngestConfig;
pub use error::{Error, Result};
pub use ingestion::{IngestPipeline, IngestStage, StageFailure};
pub use types::{Chunk, FileType, IngestReceipt, IngestRequest, IndexRecord};
