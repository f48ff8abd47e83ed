//! Multi-document similarity search over per-document partitions

use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::VectorStoreProvider;
use crate::types::{ChunkMetadata, ScoredChunk};

/// Stable partition name for a document: `doc_` + 32 hex chars
///
/// The first 16 bytes of SHA-256 over the document ID, so any ID maps to a
/// fixed-length name that is valid as a collection name.
pub fn partition_key(document_id: &str) -> String {
    let digest = Sha256::digest(document_id.as_bytes());
    format!("doc_{}", hex::encode(&digest[..16]))
}

/// Retrieval store: per-document storage plus merged multi-document search
#[derive(Clone)]
pub struct RetrievalStore {
    backend: Arc<dyn VectorStoreProvider>,
}

impl RetrievalStore {
    /// Wrap a vector store backend
    pub fn new(backend: Arc<dyn VectorStoreProvider>) -> Self {
        Self { backend }
    }

    /// Underlying backend
    pub fn backend(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.backend
    }

    /// Store a document's chunk vectors
    pub async fn insert(
        &self,
        document_id: &str,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
    ) -> Result<()> {
        self.backend.insert(document_id, vectors, metadata).await
    }

    /// Drop a document's partition
    pub async fn delete(&self, document_id: &str) -> Result<()> {
        self.backend.delete(document_id).await
    }

    /// Search each requested document and merge into one ranked list
    ///
    /// Documents are searched in caller order. A document without a partition
    /// is skipped; a document whose search fails is skipped with a warning.
    /// The merged list is sorted by descending score (ties keep their search
    /// order) and truncated to `limit` overall.
    pub async fn search(
        &self,
        query: &[f32],
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let mut results = Vec::new();

        for document_id in document_ids {
            match self.backend.search_partition(document_id, query, limit).await {
                Ok(hits) => results.extend(hits),
                Err(Error::PartitionUnavailable(_)) => {
                    tracing::debug!("No partition for document {}, skipping", document_id);
                }
                Err(e) => {
                    tracing::warn!("Search failed for document {}: {}", document_id, e);
                }
            }
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);
        Ok(results)
    }
}
