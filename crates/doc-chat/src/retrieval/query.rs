//! Question answering over selected documents

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::generation::{build_context_blocks, AnswerGenerator};
use crate::providers::EmbeddingProvider;

use super::search::RetrievalStore;

/// embed(question) -> search -> context -> generate
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: RetrievalStore,
    generator: Arc<AnswerGenerator>,
    top_k: usize,
}

impl QueryPipeline {
    /// Create a new query pipeline
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: RetrievalStore,
        generator: Arc<AnswerGenerator>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            top_k,
        }
    }

    /// Answer a question from the given documents
    pub async fn answer(&self, question: &str, document_ids: &[String]) -> Result<String> {
        if document_ids.is_empty() {
            return Err(Error::NoDocumentsSpecified);
        }

        tracing::info!(
            "Answering question over {} document(s): {}",
            document_ids.len(),
            question
        );

        let query = self.embedder.embed(question).await?;
        let results = self.store.search(&query, document_ids, self.top_k).await?;
        tracing::debug!("Retrieved {} chunk(s)", results.len());

        let context = build_context_blocks(&results);
        self.generator.generate(&context, question).await
    }
}
