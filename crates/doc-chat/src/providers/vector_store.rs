//! Vector store provider trait: one partition per document

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{ChunkMetadata, ScoredChunk};

/// Trait for per-document vector storage and similarity search
///
/// Every operation is addressed by document ID; implementations map the ID to
/// a partition (see [`crate::retrieval::partition_key`]) holding only that
/// document's vectors.
///
/// Implementations:
/// - `LocalVectorStore`: in-process partitions
/// - `QdrantVectorStore`: one Qdrant collection per document (feature `qdrant`)
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Create the document's partition if it does not exist
    async fn ensure_partition(&self, document_id: &str) -> Result<()>;

    /// Store vectors with their metadata under point IDs `0..n`
    ///
    /// `vectors` and `metadata` must have equal length. Point IDs restart at
    /// zero on every call, so a second insert for the same document
    /// overwrites the points it collides with.
    async fn insert(
        &self,
        document_id: &str,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
    ) -> Result<()>;

    /// Drop the document's partition; an absent partition is not an error
    async fn delete(&self, document_id: &str) -> Result<()>;

    /// Top-`limit` cosine search inside one document's partition
    ///
    /// Returns `Error::PartitionUnavailable` when the partition does not exist.
    async fn search_partition(
        &self,
        document_id: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Vector dimension accepted by this store
    fn dimensions(&self) -> usize;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
