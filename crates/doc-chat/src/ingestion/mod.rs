//! Document ingestion pipeline

mod chunker;
pub mod parser;
mod processor;

pub use chunker::TextChunker;
pub use parser::{FileKind, FileParser};
pub use processor::IngestPipeline;
