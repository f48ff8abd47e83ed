//! Qdrant vector store backend
//!
//! Each document gets its own Qdrant collection named by its partition key,
//! with cosine distance. Chunk metadata is stored as point payload.

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::retrieval::partition_key;
use crate::types::{ChunkMetadata, ScoredChunk};

use super::vector_store::VectorStoreProvider;

/// A [`VectorStoreProvider`] backed by Qdrant
pub struct QdrantVectorStore {
    client: Qdrant,
    dimensions: usize,
}

impl QdrantVectorStore {
    /// Connect to the Qdrant server at `url`
    pub fn new(url: &str, dimensions: usize) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client, dimensions })
    }

    fn map_err(e: qdrant_client::QdrantError) -> Error {
        Error::vector_db(format!("qdrant: {}", e))
    }

    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn extract_index(value: &QdrantValue) -> Option<usize> {
        match &value.kind {
            Some(Kind::IntegerValue(i)) => usize::try_from(*i).ok(),
            Some(Kind::DoubleValue(d)) => Some(*d as usize),
            _ => None,
        }
    }

    fn metadata_from_payload(payload: &HashMap<String, QdrantValue>) -> ChunkMetadata {
        let string = |key: &str| payload.get(key).and_then(Self::extract_string).unwrap_or_default();
        ChunkMetadata {
            chunk_index: payload
                .get("chunk_index")
                .and_then(Self::extract_index)
                .unwrap_or_default(),
            filename: string("filename"),
            file_path: string("file_path"),
            content: string("content"),
        }
    }
}

#[async_trait]
impl VectorStoreProvider for QdrantVectorStore {
    async fn ensure_partition(&self, document_id: &str) -> Result<()> {
        let name = partition_key(document_id);
        if self.client.collection_exists(name.as_str()).await.map_err(Self::map_err)? {
            return Ok(());
        }

        let created = self
            .client
            .create_collection(
                CreateCollectionBuilder::new(name.as_str()).vectors_config(VectorParamsBuilder::new(
                    self.dimensions as u64,
                    Distance::Cosine,
                )),
            )
            .await;

        match created {
            Ok(_) => {
                tracing::debug!("Created qdrant collection {} for document {}", name, document_id);
                Ok(())
            }
            // Lost a creation race with a concurrent insert
            Err(e) if self.client.collection_exists(name.as_str()).await.unwrap_or(false) => {
                tracing::debug!("Collection {} already created: {}", name, e);
                Ok(())
            }
            Err(e) => Err(Self::map_err(e)),
        }
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
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(Error::vector_db(format!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimensions,
                bad.len()
            )));
        }

        self.ensure_partition(document_id).await?;

        let mut points = Vec::with_capacity(vectors.len());
        for (id, (vector, meta)) in vectors.into_iter().zip(metadata).enumerate() {
            let payload = Payload::try_from(serde_json::to_value(&meta)?)
                .map_err(|e| Error::vector_db(format!("Invalid payload: {}", e)))?;
            points.push(PointStruct::new(id as u64, vector, payload));
        }

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(partition_key(document_id), points).wait(true))
            .await
            .map_err(Self::map_err)?;

        tracing::debug!("Upserted {} points for document {}", count, document_id);
        Ok(())
    }

    async fn delete(&self, document_id: &str) -> Result<()> {
        let name = partition_key(document_id);
        if !self.client.collection_exists(name.as_str()).await.map_err(Self::map_err)? {
            return Ok(());
        }
        self.client.delete_collection(name.as_str()).await.map_err(Self::map_err)?;
        tracing::debug!("Deleted qdrant collection {}", name);
        Ok(())
    }

    async fn search_partition(
        &self,
        document_id: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let name = partition_key(document_id);
        if !self.client.collection_exists(name.as_str()).await.map_err(Self::map_err)? {
            return Err(Error::PartitionUnavailable(document_id.to_string()));
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(name.as_str(), query.to_vec(), limit as u64).with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        Ok(response
            .result
            .into_iter()
            .map(|scored| ScoredChunk {
                score: scored.score,
                metadata: Self::metadata_from_payload(&scored.payload),
                document_id: document_id.to_string(),
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.client.health_check().await.is_ok())
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
