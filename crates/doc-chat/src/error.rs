//! Error types for the document chat service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for doc-chat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Document chat errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text extraction failed for a supported content type
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// No extractor exists for the declared content type
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The embedding model could not embed the batch
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector database error
    #[error("Vector database error: {0}")]
    VectorDb(String),

    /// A document's partition is missing
    #[error("Partition unavailable for document: {0}")]
    PartitionUnavailable(String),

    /// Generation quota is exhausted
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Generation service is rate limiting requests
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Any other generation failure
    #[error("Generation failed: {0}")]
    Generation(String),

    /// An uploaded file has no usable name
    #[error("Invalid upload filename: {0:?}")]
    InvalidFilename(String),

    /// A chat request named no documents
    #[error("No documents specified for chat")]
    NoDocumentsSpecified,

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NoDocumentsSpecified | Error::InvalidFilename(_) => StatusCode::BAD_REQUEST,
            Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable error type
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::FileParse { .. } => "parse_error",
            Error::UnsupportedContentType(_) => "unsupported_type",
            Error::Embedding(_) => "embedding_error",
            Error::VectorDb(_) => "vector_db_error",
            Error::PartitionUnavailable(_) => "partition_unavailable",
            Error::QuotaExceeded(_) => "quota_exceeded",
            Error::RateLimited(_) => "rate_limited",
            Error::Generation(_) => "generation_error",
            Error::InvalidFilename(_) => "invalid_filename",
            Error::NoDocumentsSpecified => "no_documents",
            Error::DocumentNotFound(_) => "not_found",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NoDocumentsSpecified.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::DocumentNotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::UnsupportedContentType("image/png".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::QuotaExceeded("all models".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_carries_underlying_detail() {
        let err = Error::file_parse("notes.txt", "invalid utf-8 sequence");
        assert_eq!(
            err.to_string(),
            "Failed to parse file 'notes.txt': invalid utf-8 sequence"
        );
    }
}
