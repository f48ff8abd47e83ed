//! Chat request types

use serde::{Deserialize, Serialize};

/// Question asked against a set of documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub text: String,

    /// Documents to search; missing or empty is rejected
    #[serde(default)]
    pub document_ids: Option<Vec<String>>,
}

impl ChatRequest {
    /// Create a new chat request
    pub fn new(text: impl Into<String>, document_ids: Vec<String>) -> Self {
        Self {
            text: text.into(),
            document_ids: Some(document_ids),
        }
    }

    /// Requested document IDs, empty when none were given
    pub fn document_ids(&self) -> &[String] {
        self.document_ids.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_document_ids() {
        let req: ChatRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert!(req.document_ids.is_none());
        assert!(req.document_ids().is_empty());
    }
}
