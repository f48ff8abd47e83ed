//! Ingestion pipeline orchestration

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::retrieval::RetrievalStore;
use crate::types::{ChunkMetadata, Document};

use super::chunker::TextChunker;
use super::parser::FileParser;

/// extract -> chunk -> embed -> insert
pub struct IngestPipeline {
    /// Text chunker
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: RetrievalStore,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: RetrievalStore,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Extract and chunk a file without embedding it
    pub async fn extract_chunks(&self, document: &Document, data: Vec<u8>) -> Result<Vec<String>> {
        let filename = document.name.clone();
        let content_type = document.content_type.clone();
        let chunker = self.chunker.clone();

        // PDF and DOCX parsing are CPU-bound
        tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let text = FileParser::extract_text(&filename, &content_type, &data)?;
            Ok(chunker.chunk_text(&text))
        })
        .await
        .map_err(|e| Error::file_parse(&document.name, format!("extraction task failed: {}", e)))?
    }

    /// Full ingestion; returns the number of stored chunks
    ///
    /// Nothing is written to the retrieval store unless every step before the
    /// insert succeeds.
    pub async fn ingest(&self, document: &Document, data: Vec<u8>) -> Result<usize> {
        let chunks = self.extract_chunks(document, data).await?;
        tracing::info!("Split {} into {} chunks", document.name, chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            tracing::debug!("Chunk {} of {}: {} chars", i, document.name, chunk.chars().count());
        }

        if chunks.is_empty() {
            return Ok(0);
        }

        let vectors = self.embedder.embed_batch(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let count = chunks.len();
        let metadata = chunks
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| ChunkMetadata {
                chunk_index,
                filename: document.name.clone(),
                file_path: document.file_path.clone(),
                content,
            })
            .collect();

        self.store.insert(&document.id, vectors, metadata).await?;
        tracing::info!("Stored {} chunks for document {}", count, document.id);

        Ok(count)
    }
}
