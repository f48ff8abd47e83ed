//! doc-chat: question answering over uploaded documents
//!
//! Uploaded files are split into overlapping chunks, embedded locally with an
//! ONNX sentence-transformers model and stored in one vector partition per
//! document. Questions are embedded the same way, matched against the
//! partitions of the selected documents and answered by a chat model that is
//! only given the retrieved passages.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{ChunkMetadata, Document, EmbeddingStatus, ScoredChunk},
    query::ChatRequest,
    response::ChatResponse,
};
