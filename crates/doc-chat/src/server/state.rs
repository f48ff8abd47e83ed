//! Application state for the document chat server

use serde::Serialize;
use std::sync::Arc;

use crate::config::{LlmBackend, RagConfig, VectorBackend};
use crate::embeddings::OnnxEmbedder;
use crate::error::{Error, Result};
use crate::generation::{AnswerGenerator, GenerationSettings};
use crate::ingestion::{IngestPipeline, TextChunker};
use crate::providers::{
    DocumentStoreProvider, EmbeddingProvider, LlmProvider, LocalDocumentStore, LocalVectorStore,
    OllamaLlm, OpenAiLlm, VectorStoreProvider,
};
use crate::retrieval::{QueryPipeline, RetrievalStore};
use crate::storage::DocumentRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Document registry (persisted to disk)
    registry: Arc<DocumentRegistry>,
    /// Embedding provider, kept for health reporting
    embedder: Arc<dyn EmbeddingProvider>,
    /// Generation backend, kept for health reporting
    llm: Arc<dyn LlmProvider>,
    /// Uploaded file bytes
    document_store: Arc<dyn DocumentStoreProvider>,
    /// Per-document vector partitions
    retrieval: RetrievalStore,
    /// extract -> chunk -> embed -> insert
    ingest: IngestPipeline,
    /// embed -> search -> generate
    query: QueryPipeline,
}

/// Health of one provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    /// Provider role: embedder, llm, vector_store or document_store
    pub role: &'static str,
    /// Provider name
    pub name: String,
    /// Whether its health check passed
    pub healthy: bool,
}

/// Externally built components, for wiring custom or mock providers
pub struct Components {
    /// Embedding provider
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Generation backend
    pub llm: Arc<dyn LlmProvider>,
    /// Vector store backend
    pub vector_store: Arc<dyn VectorStoreProvider>,
    /// Raw file storage
    pub document_store: Arc<dyn DocumentStoreProvider>,
    /// Document registry
    pub registry: DocumentRegistry,
}

impl AppState {
    /// Create new application state from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing document chat state...");

        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OnnxEmbedder::new(&config.embeddings).await?);
        tracing::info!(
            "Embedding provider: {} ({} dimensions)",
            embedder.name(),
            embedder.dimensions()
        );

        let llm: Arc<dyn LlmProvider> = match config.llm.backend {
            LlmBackend::OpenAi => Arc::new(OpenAiLlm::new(&config.llm)?),
            LlmBackend::Ollama => Arc::new(OllamaLlm::new(&config.llm)?),
        };
        tracing::info!(
            "LLM provider: {} (primary: {}, fallback: {})",
            llm.name(),
            config.llm.primary_model,
            config.llm.fallback_model
        );

        let vector_store: Arc<dyn VectorStoreProvider> = match config.retrieval.backend {
            VectorBackend::Local => Arc::new(LocalVectorStore::new(config.embeddings.dimensions)),
            VectorBackend::Qdrant => {
                #[cfg(feature = "qdrant")]
                {
                    Arc::new(crate::providers::qdrant::QdrantVectorStore::new(
                        &config.retrieval.qdrant_url,
                        config.embeddings.dimensions,
                    )?)
                }
                #[cfg(not(feature = "qdrant"))]
                {
                    return Err(Error::Config(
                        "Qdrant backend selected but the qdrant feature is not enabled. \
                         Rebuild with --features qdrant"
                            .to_string(),
                    ));
                }
            }
        };
        tracing::info!("Vector store: {}", vector_store.name());

        let document_store: Arc<dyn DocumentStoreProvider> =
            Arc::new(LocalDocumentStore::new(config.storage.uploads_dir.clone())?);
        let registry = DocumentRegistry::open(config.storage.registry_path.clone())?;

        Self::from_components(
            config,
            Components {
                embedder,
                llm,
                vector_store,
                document_store,
                registry,
            },
        )
    }

    /// Assemble state from already-built components
    pub fn from_components(config: RagConfig, components: Components) -> Result<Self> {
        let Components {
            embedder,
            llm,
            vector_store,
            document_store,
            registry,
        } = components;

        if embedder.dimensions() != vector_store.dimensions() {
            return Err(Error::Config(format!(
                "Embedding dimension ({}) does not match vector store dimension ({})",
                embedder.dimensions(),
                vector_store.dimensions()
            )));
        }

        let retrieval = RetrievalStore::new(vector_store);
        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap);
        let ingest = IngestPipeline::new(chunker, Arc::clone(&embedder), retrieval.clone());
        let generator = Arc::new(AnswerGenerator::new(
            Arc::clone(&llm),
            GenerationSettings::from(&config.llm),
        ));
        let query = QueryPipeline::new(
            Arc::clone(&embedder),
            retrieval.clone(),
            generator,
            config.retrieval.top_k,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                registry: Arc::new(registry),
                embedder,
                llm,
                document_store,
                retrieval,
                ingest,
                query,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get document registry
    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.inner.registry
    }

    /// Get raw document store
    pub fn document_store(&self) -> &Arc<dyn DocumentStoreProvider> {
        &self.inner.document_store
    }

    /// Get retrieval store
    pub fn retrieval(&self) -> &RetrievalStore {
        &self.inner.retrieval
    }

    /// Get ingestion pipeline
    pub fn ingest(&self) -> &IngestPipeline {
        &self.inner.ingest
    }

    /// Get query pipeline
    pub fn query(&self) -> &QueryPipeline {
        &self.inner.query
    }

    /// Run every provider's health check
    ///
    /// A check that errors counts as unhealthy.
    pub async fn provider_health(&self) -> Vec<ProviderHealth> {
        let inner = &self.inner;
        let vector_store = inner.retrieval.backend();
        let (embedder, llm, vectors, documents) = tokio::join!(
            inner.embedder.health_check(),
            inner.llm.health_check(),
            vector_store.health_check(),
            inner.document_store.health_check(),
        );

        [
            ("embedder", inner.embedder.name(), embedder),
            ("llm", inner.llm.name(), llm),
            ("vector_store", vector_store.name(), vectors),
            ("document_store", inner.document_store.name(), documents),
        ]
        .into_iter()
        .map(|(role, name, result)| {
            let healthy = match result {
                Ok(healthy) => healthy,
                Err(e) => {
                    tracing::warn!("Health check for {} ({}) failed: {}", role, name, e);
                    false
                }
            };
            ProviderHealth {
                role,
                name: name.to_string(),
                healthy,
            }
        })
        .collect()
    }

}
