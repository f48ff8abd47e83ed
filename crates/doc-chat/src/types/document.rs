//! Document records and the metadata stored alongside each chunk vector

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Embedding lifecycle of an uploaded document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingStatus {
    /// Registered, ingestion not finished
    Pending,
    /// All chunks embedded and stored
    Completed,
    /// Ingestion failed
    Failed,
}

/// An uploaded document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique document ID
    pub id: String,
    /// Original filename as uploaded by user
    pub name: String,
    /// Public path of the stored bytes
    pub file_path: String,
    /// Declared or guessed MIME type
    pub content_type: String,
    /// File size in bytes
    pub size: u64,
    /// Embedding status
    pub embedding_status: EmbeddingStatus,
    /// Number of chunks stored for this document
    #[serde(default)]
    pub chunk_count: usize,
    /// Upload timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a pending document with a fresh ID
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, size: u64) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, content_type, size)
    }

    /// Create a pending document with a caller-chosen ID
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Self {
        let id = id.into();
        let name = name.into();
        Self {
            file_path: format!("/uploads/{}", stored_file_name(&id, &name)),
            id,
            name,
            content_type: content_type.into(),
            size,
            embedding_status: EmbeddingStatus::Pending,
            chunk_count: 0,
            created_at: chrono::Utc::now(),
        }
    }

    /// Name of the stored file inside the uploads directory
    pub fn stored_name(&self) -> String {
        stored_file_name(&self.id, &self.name)
    }
}

/// Reduce a client-supplied filename to its last path component
///
/// Browsers and folder uploads may send `dir/name.txt` or `dir\name.txt`.
/// Returns `None` when nothing usable remains.
pub fn upload_file_name(raw: &str) -> Option<&str> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// `{id}_{filename}`
pub fn stored_file_name(id: &str, filename: &str) -> String {
    format!("{}_{}", id, filename)
}

/// Metadata stored with every chunk vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Position of the chunk within its document
    pub chunk_index: usize,
    /// Source filename
    pub filename: String,
    /// Public path of the source file
    pub file_path: String,
    /// Chunk text
    pub content: String,
}

/// A chunk returned from similarity search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// Cosine similarity to the query
    pub score: f32,
    /// Stored chunk metadata
    pub metadata: ChunkMetadata,
    /// Document the chunk belongs to
    pub document_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_is_pending() {
        let doc = Document::new("report.pdf", "application/pdf", 2048);
        assert_eq!(doc.embedding_status, EmbeddingStatus::Pending);
        assert_eq!(doc.chunk_count, 0);
        assert!(Uuid::parse_str(&doc.id).is_ok());
        assert_eq!(doc.file_path, format!("/uploads/{}_report.pdf", doc.id));
    }

    #[test]
    fn test_upload_file_name_keeps_last_component() {
        assert_eq!(upload_file_name("notes.txt"), Some("notes.txt"));
        assert_eq!(upload_file_name("dirA/notes.txt"), Some("notes.txt"));
        assert_eq!(upload_file_name("C:\\docs\\report.pdf"), Some("report.pdf"));
        assert_eq!(upload_file_name("dirA/"), None);
        assert_eq!(upload_file_name("../.."), None);
        assert_eq!(upload_file_name("  "), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&EmbeddingStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let status: EmbeddingStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, EmbeddingStatus::Failed);
    }
}
