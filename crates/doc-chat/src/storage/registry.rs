//! Document registry persisted as a JSON array

use parking_lot::Mutex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::Document;

/// Ordered list of document records backed by a JSON file
///
/// Every mutation holds one lock for its whole read-modify-write cycle and
/// replaces the file through a temp file + rename. The in-memory list only
/// changes after the new file is in place, so a failed write leaves both
/// unchanged.
pub struct DocumentRegistry {
    path: PathBuf,
    documents: Mutex<Vec<Document>>,
}

impl DocumentRegistry {
    /// Open the registry, loading existing records if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let documents = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<Vec<Document>>(&content).map_err(|e| {
                    Error::Config(format!("Corrupt registry {}: {}", path.display(), e))
                })?
            }
        } else {
            Vec::new()
        };

        tracing::info!("Loaded {} documents from registry", documents.len());

        Ok(Self {
            path,
            documents: Mutex::new(documents),
        })
    }

    /// All documents in insertion order
    pub fn list(&self) -> Vec<Document> {
        self.documents.lock().clone()
    }

    /// Look up a document
    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.lock().iter().find(|d| d.id == id).cloned()
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a document
    pub fn add(&self, document: Document) -> Result<()> {
        let mut documents = self.documents.lock();
        let mut next = documents.clone();
        next.push(document);
        self.persist(&next)?;
        *documents = next;
        Ok(())
    }

    /// Modify a document in place, returning the updated record
    pub fn update<F>(&self, id: &str, f: F) -> Result<Document>
    where
        F: FnOnce(&mut Document),
    {
        let mut documents = self.documents.lock();
        let mut next = documents.clone();
        let document = next
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
        f(document);
        let updated = document.clone();

        self.persist(&next)?;
        *documents = next;
        Ok(updated)
    }

    /// Remove a document, returning the removed record
    pub fn remove(&self, id: &str) -> Result<Document> {
        let mut documents = self.documents.lock();
        let position = documents
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

        let mut next = documents.clone();
        let removed = next.remove(position);
        self.persist(&next)?;
        *documents = next;
        Ok(removed)
    }

    /// Run a registry operation on the blocking pool
    ///
    /// Mutations write and fsync the registry file under the lock, so async
    /// callers go through here instead of calling them directly.
    pub async fn blocking<T, F>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&DocumentRegistry) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let registry = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&registry))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    /// Write the full list beside the registry file, then rename over it
    fn persist(&self, documents: &[Document]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let content = serde_json::to_string_pretty(documents)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmbeddingStatus;

    #[test]
    fn test_add_update_remove_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        let registry = DocumentRegistry::open(&path).unwrap();
        assert!(registry.is_empty());

        let doc = Document::new("a.txt", "text/plain", 10);
        let id = doc.id.clone();
        registry.add(doc).unwrap();
        registry.add(Document::new("b.txt", "text/plain", 20)).unwrap();

        let updated = registry
            .update(&id, |d| {
                d.embedding_status = EmbeddingStatus::Completed;
                d.chunk_count = 3;
            })
            .unwrap();
        assert_eq!(updated.chunk_count, 3);

        // Reopen from disk
        let reopened = DocumentRegistry::open(&path).unwrap();
        let docs = reopened.list();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "a.txt");
        assert_eq!(docs[0].embedding_status, EmbeddingStatus::Completed);
        assert_eq!(docs[1].name, "b.txt");

        let removed = reopened.remove(&id).unwrap();
        assert_eq!(removed.name, "a.txt");
        assert_eq!(DocumentRegistry::open(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let registry = DocumentRegistry::open(dir.path().join("documents.json")).unwrap();
        assert!(matches!(registry.remove("nope"), Err(Error::DocumentNotFound(_))));
        assert!(matches!(registry.update("nope", |_| {}), Err(Error::DocumentNotFound(_))));
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(DocumentRegistry::open(&path).is_err());
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("registry");
        let registry = DocumentRegistry::open(sub.join("documents.json")).unwrap();
        registry.add(Document::new("a.txt", "text/plain", 1)).unwrap();

        // Remove the directory so the temp file cannot be created
        std::fs::remove_dir_all(&sub).unwrap();
        assert!(registry.add(Document::new("b.txt", "text/plain", 1)).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        let registry = Arc::new(DocumentRegistry::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for j in 0..5 {
                        registry
                            .add(Document::new(format!("{}-{}.txt", i, j), "text/plain", 1))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 40);
        assert_eq!(DocumentRegistry::open(&path).unwrap().len(), 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_mutations_from_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        let registry = Arc::new(DocumentRegistry::open(&path).unwrap());

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    for j in 0..5 {
                        let doc = Document::new(format!("{}-{}.txt", i, j), "text/plain", 1);
                        registry.blocking(move |r| r.add(doc)).await.unwrap();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(DocumentRegistry::open(&path).unwrap().len(), 40);

        let id = registry.list()[0].id.clone();
        let updated = registry
            .blocking(move |r| r.update(&id, |d| d.chunk_count = 7))
            .await
            .unwrap();
        assert_eq!(updated.chunk_count, 7);

        let err = registry.blocking(|r| r.remove("nope")).await.unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }
}
