//! Chat endpoint

use axum::{extract::State, Json};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

/// POST /chat - Answer a question from the selected documents
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let document_ids = request.document_ids();
    if document_ids.is_empty() {
        return Err(Error::NoDocumentsSpecified);
    }

    let response = state.query().answer(&request.text, document_ids).await?;
    Ok(Json(ChatResponse { response }))
}
