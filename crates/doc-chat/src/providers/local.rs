//! Local provider implementations: in-process vector partitions and filesystem
//! document storage

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::retrieval::partition_key;
use crate::types::{ChunkMetadata, ScoredChunk};

use super::document_store::DocumentStoreProvider;
use super::vector_store::VectorStoreProvider;

/// A stored vector with its metadata
#[derive(Debug, Clone)]
struct StoredPoint {
    vector: Vec<f32>,
    metadata: ChunkMetadata,
}

/// One document's vectors, keyed by point ID
#[derive(Debug, Default)]
struct Partition {
    document_id: String,
    points: BTreeMap<u64, StoredPoint>,
}

/// In-process vector store with one partition per document
pub struct LocalVectorStore {
    partitions: Arc<DashMap<String, Partition>>,
    dimensions: usize,
}

impl LocalVectorStore {
    /// Create an empty store for vectors of the given dimension
    pub fn new(dimensions: usize) -> Self {
        Self {
            partitions: Arc::new(DashMap::new()),
            dimensions,
        }
    }

    /// Number of partitions
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Number of points in a document's partition, if it exists
    pub fn point_count(&self, document_id: &str) -> Option<usize> {
        self.partitions
            .get(&partition_key(document_id))
            .map(|p| p.points.len())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::vector_db(format!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(())
    }
}

/// Cosine similarity; zero vectors score 0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn ensure_partition(&self, document_id: &str) -> Result<()> {
        self.partitions
            .entry(partition_key(document_id))
            .or_insert_with(|| {
                tracing::debug!("Creating partition for document {}", document_id);
                Partition {
                    document_id: document_id.to_string(),
                    points: BTreeMap::new(),
                }
            });
        Ok(())
    }

    async fn insert(
        &self,
        document_id: &str,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
    ) -> Result<()> {
        if vectors.len() != metadata.len() {
            return Err(Error::vector_db(format!(
                "Vectors and metadata must have the same length ({} != {})",
                vectors.len(),
                metadata.len()
            )));
        }
        if vectors.is_empty() {
            return Ok(());
        }
        for vector in &vectors {
            self.check_dimension(vector)?;
        }

        self.ensure_partition(document_id).await?;

        let mut partition = self
            .partitions
            .get_mut(&partition_key(document_id))
            .ok_or_else(|| Error::PartitionUnavailable(document_id.to_string()))?;

        let count = vectors.len();
        for (id, (vector, metadata)) in vectors.into_iter().zip(metadata).enumerate() {
            partition
                .points
                .insert(id as u64, StoredPoint { vector, metadata });
        }

        tracing::debug!("Stored {} points for document {}", count, document_id);
        Ok(())
    }

    async fn delete(&self, document_id: &str) -> Result<()> {
        if self.partitions.remove(&partition_key(document_id)).is_some() {
            tracing::debug!("Dropped partition for document {}", document_id);
        }
        Ok(())
    }

    async fn search_partition(
        &self,
        document_id: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        self.check_dimension(query)?;

        let key = partition_key(document_id);
        if !self.partitions.contains_key(&key) {
            return Err(Error::PartitionUnavailable(document_id.to_string()));
        }

        let partitions = self.partitions.clone();
        let query = query.to_vec();
        let document_id = document_id.to_string();

        // Brute-force scan is sync, run it off the async workers
        tokio::task::spawn_blocking(move || -> Result<Vec<ScoredChunk>> {
            let partition = partitions
                .get(&key)
                .ok_or_else(|| Error::PartitionUnavailable(document_id.clone()))?;

            let mut results: Vec<ScoredChunk> = partition
                .points
                .values()
                .map(|point| ScoredChunk {
                    score: cosine_similarity(&query, &point.vector),
                    metadata: point.metadata.clone(),
                    document_id: partition.document_id.clone(),
                })
                .collect();

            results.sort_by(|a, b| b.score.total_cmp(&a.score));
            results.truncate(limit);
            Ok(results)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        // Local store is always healthy if it exists
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-partitions"
    }
}

/// Local document store using filesystem
pub struct LocalDocumentStore {
    /// Directory to store documents
    storage_dir: PathBuf,
}

impl LocalDocumentStore {
    /// Create a new local document store
    pub fn new(storage_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    /// Resolve a stored name inside the storage directory
    ///
    /// Only the final path component is used, so names cannot escape the
    /// directory.
    fn doc_path(&self, stored_name: &str) -> Result<PathBuf> {
        let file_name = std::path::Path::new(stored_name)
            .file_name()
            .ok_or_else(|| Error::internal(format!("Invalid stored name: {}", stored_name)))?;
        Ok(self.storage_dir.join(file_name))
    }
}

#[async_trait]
impl DocumentStoreProvider for LocalDocumentStore {
    async fn store_document(&self, stored_name: &str, data: &[u8]) -> Result<String> {
        let doc_path = self.doc_path(stored_name)?;
        tokio::fs::write(&doc_path, data).await?;
        Ok(doc_path.to_string_lossy().to_string())
    }

    async fn get_document(&self, stored_name: &str) -> Result<Vec<u8>> {
        let doc_path = self.doc_path(stored_name)?;
        tokio::fs::read(&doc_path)
            .await
            .map_err(|e| Error::Internal(format!("Failed to read document {}: {}", stored_name, e)))
    }

    async fn delete_document(&self, stored_name: &str) -> Result<()> {
        let doc_path = self.doc_path(stored_name)?;
        match tokio::fs::remove_file(&doc_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.storage_dir.exists())
    }

    fn name(&self) -> &str {
        "local-filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(index: usize, content: &str) -> ChunkMetadata {
        ChunkMetadata {
            chunk_index: index,
            filename: "doc.txt".to_string(),
            file_path: "/uploads/x_doc.txt".to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_search() {
        let store = LocalVectorStore::new(2);
        store
            .insert(
                "doc-a",
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
                vec![meta(0, "x"), meta(1, "y"), meta(2, "xy")],
            )
            .await
            .unwrap();

        let results = store.search_partition("doc-a", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.content, "x");
        assert_eq!(results[1].metadata.content, "xy");
        assert_eq!(results[0].document_id, "doc-a");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_length_mismatch_leaves_store_untouched() {
        let store = LocalVectorStore::new(2);
        let err = store
            .insert("doc-a", vec![vec![1.0, 0.0]], vec![meta(0, "a"), meta(1, "b")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorDb(_)));
        assert_eq!(store.partition_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let store = LocalVectorStore::new(3);
        let err = store
            .insert("doc-a", vec![vec![1.0, 0.0]], vec![meta(0, "a")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorDb(_)));
    }

    #[tokio::test]
    async fn test_reinsert_overwrites_colliding_ids() {
        let store = LocalVectorStore::new(2);
        store
            .insert("doc-a", vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![meta(0, "a"), meta(1, "b")])
            .await
            .unwrap();
        store
            .insert("doc-a", vec![vec![1.0, 0.0]], vec![meta(0, "c")])
            .await
            .unwrap();

        assert_eq!(store.point_count("doc-a"), Some(2));
        let results = store.search_partition("doc-a", &[1.0, 0.0], 5).await.unwrap();
        let contents: Vec<_> = results.iter().map(|r| r.metadata.content.as_str()).collect();
        assert!(contents.contains(&"c"));
        assert!(!contents.contains(&"a"));
    }

    #[tokio::test]
    async fn test_missing_partition_and_delete() {
        let store = LocalVectorStore::new(2);
        let err = store.search_partition("nope", &[1.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, Error::PartitionUnavailable(_)));

        // Deleting an absent partition is fine
        store.delete("nope").await.unwrap();

        store.insert("doc-a", vec![vec![1.0, 0.0]], vec![meta(0, "a")]).await.unwrap();
        store.delete("doc-a").await.unwrap();
        assert!(store.point_count("doc-a").is_none());
    }

    #[tokio::test]
    async fn test_ensure_partition_idempotent() {
        let store = LocalVectorStore::new(2);
        store.ensure_partition("doc-a").await.unwrap();
        store.insert("doc-a", vec![vec![1.0, 0.0]], vec![meta(0, "a")]).await.unwrap();
        store.ensure_partition("doc-a").await.unwrap();
        assert_eq!(store.partition_count(), 1);
        assert_eq!(store.point_count("doc-a"), Some(1));
    }

    #[tokio::test]
    async fn test_document_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::new(dir.path().join("uploads")).unwrap();

        store.store_document("abc_notes.txt", b"hello").await.unwrap();
        assert_eq!(store.get_document("abc_notes.txt").await.unwrap(), b"hello");
        assert!(dir.path().join("uploads").join("abc_notes.txt").exists());

        store.delete_document("abc_notes.txt").await.unwrap();
        store.delete_document("abc_notes.txt").await.unwrap();
        assert!(store.get_document("abc_notes.txt").await.is_err());
    }
}
