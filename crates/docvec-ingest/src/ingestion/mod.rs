//! Document ingestion: file classification, text extraction, semantic
//! chunking and the pipeline that ties them to the providers

mod chunker;
mod classifier;
pub mod extractor;
mod pipeline;

pub use chunker::SemanticChunker;
pub use classifier::classify;
pub use extractor::{Extractor, ExtractorRegistry};
pub use pipeline::{IngestPipeline, IngestStage, PipelineState, StageFailure};
