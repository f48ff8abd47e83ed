//! API routes for the document chat server

pub mod chat;
pub mod documents;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(info))
        // Document management
        .route("/documents", get(documents::list_documents))
        .route(
            "/documents/upload",
            post(documents::upload_documents).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/documents/:id", delete(documents::delete_document))
        // Question answering
        .route("/chat", post(chat::chat))
}

/// API banner
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "message": "Document Chat API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /documents": "List all documents",
            "POST /documents/upload": "Upload and embed documents",
            "DELETE /documents/:id": "Delete a document",
            "POST /chat": "Ask a question about selected documents",
            "GET /uploads/:file": "Download an uploaded file",
            "GET /health": "Health check"
        }
    }))
}
