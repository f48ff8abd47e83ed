//! Document management endpoints

use axum::{
    extract::{Multipart, Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{upload_file_name, Document, EmbeddingStatus, MessageResponse};

/// GET /documents - List all documents
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<Document>> {
    Json(state.registry().list())
}

/// POST /documents/upload - Store, register and ingest uploaded files
///
/// Files are processed in order. The first failure marks that document as
/// failed and aborts the request.
pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<Document>>> {
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Internal(format!("Failed to read multipart field: {}", e)))?
    {
        // Only file parts are documents
        let Some(raw_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let filename = upload_file_name(&raw_name)
            .ok_or_else(|| Error::InvalidFilename(raw_name.clone()))?
            .to_string();

        let declared_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Internal(format!("Failed to read file {}: {}", filename, e)))?;

        let content_type = mime_guess::from_path(&filename)
            .first()
            .map(|m| m.essence_str().to_string())
            .or(declared_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        tracing::info!(
            "Processing upload: {} ({} bytes, {})",
            filename,
            data.len(),
            content_type
        );

        let document = Document::new(filename, content_type, data.len() as u64);
        documents.push(process_upload(&state, document, data.to_vec()).await?);
    }

    Ok(Json(documents))
}

async fn process_upload(state: &AppState, document: Document, data: Vec<u8>) -> Result<Document> {
    state
        .document_store()
        .store_document(&document.stored_name(), &data)
        .await?;
    let record = document.clone();
    state.registry().blocking(move |r| r.add(record)).await?;

    let id = document.id.clone();
    match state.ingest().ingest(&document, data).await {
        Ok(chunk_count) => {
            state
                .registry()
                .blocking(move |r| {
                    r.update(&id, |d| {
                        d.embedding_status = EmbeddingStatus::Completed;
                        d.chunk_count = chunk_count;
                    })
                })
                .await
        }
        Err(e) => {
            tracing::error!("Ingestion failed for {}: {}", document.name, e);
            let marked = state
                .registry()
                .blocking(move |r| r.update(&id, |d| d.embedding_status = EmbeddingStatus::Failed))
                .await;
            if let Err(mark_err) = marked {
                tracing::error!("Failed to mark {} as failed: {}", document.id, mark_err);
            }
            Err(e)
        }
    }
}

/// DELETE /documents/:id - Delete a document, its vectors and its stored file
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let document = state
        .registry()
        .get(&id)
        .ok_or_else(|| Error::DocumentNotFound(id.clone()))?;

    state.retrieval().delete(&id).await?;
    state
        .document_store()
        .delete_document(&document.stored_name())
        .await?;
    let removed_id = id.clone();
    state.registry().blocking(move |r| r.remove(&removed_id)).await?;

    tracing::info!("Deleted document '{}' ({})", document.name, id);

    Ok(Json(MessageResponse {
        message: "Document deleted successfully".to_string(),
    }))
}
