//! Document store provider trait for storing raw uploaded files

use async_trait::async_trait;
use crate::error::Result;

/// Trait for raw document storage
///
/// Files are addressed by their stored name, `{id}_{filename}`.
///
/// Implementations:
/// - `LocalDocumentStore`: Local filesystem
#[async_trait]
pub trait DocumentStoreProvider: Send + Sync {
    /// Store a document, returning the storage path
    async fn store_document(&self, stored_name: &str, data: &[u8]) -> Result<String>;

    /// Retrieve document data
    async fn get_document(&self, stored_name: &str) -> Result<Vec<u8>>;

    /// Delete a document; a missing file is not an error
    async fn delete_document(&self, stored_name: &str) -> Result<()>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
