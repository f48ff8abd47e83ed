//! Provider abstractions for embeddings, LLM, vector storage, and document storage
//!
//! Trait-based seams let the server switch between the local in-process
//! backends and external services (OpenAI, Ollama, Qdrant).

pub mod embedding;
pub mod llm;
pub mod vector_store;
pub mod document_store;
pub mod local;
pub mod ollama;
pub mod openai;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use embedding::EmbeddingProvider;
pub use llm::{ChatMessage, CompletionRequest, LlmProvider, Role};
pub use vector_store::VectorStoreProvider;
pub use document_store::DocumentStoreProvider;
pub use local::{LocalDocumentStore, LocalVectorStore};
pub use ollama::OllamaLlm;
pub use openai::OpenAiLlm;
