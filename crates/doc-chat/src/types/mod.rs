//! Core types for the document chat service

pub mod document;
pub mod query;
pub mod response;

pub use document::{upload_file_name, ChunkMetadata, Document, EmbeddingStatus, ScoredChunk};
pub use query::ChatRequest;
pub use response::{ChatResponse, MessageResponse};
