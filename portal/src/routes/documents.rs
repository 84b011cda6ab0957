use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    routing::{get, post},
};
use tracing::info;

use crate::{
    AppState,
    error::ApiError,
    pipeline::{CatalogError, DocumentSummary, IngestError, OcrError},
};

use super::types::{DocumentContentResponse, UploadResponse};

pub fn document_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload/", post(upload_document))
        .route("/documents/", get(list_documents))
        .route("/documents/combined", get(combined_documents))
        .route("/document/{document_id}", get(get_document))
}

async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::UnsupportedFormat(format!("invalid multipart payload: {err}")))?
    {
        if field.name() == Some("file") {
            original_filename = field.file_name().map(|name| name.to_string());
            let data = field.bytes().await.map_err(|err| {
                ApiError::UnsupportedFormat(format!("failed to read upload field: {err}"))
            })?;
            file_bytes = Some(data.to_vec());
            break;
        }
    }

    let file_bytes = file_bytes.ok_or_else(|| {
        ApiError::UnsupportedFormat("missing file field in multipart payload".to_string())
    })?;
    let original_filename = original_filename
        .ok_or_else(|| ApiError::UnsupportedFormat("uploaded file missing filename".to_string()))?;

    let document = state
        .pipeline
        .ingest(file_bytes, &original_filename)
        .await
        .map_err(ingest_error_to_api)?;

    info!(filename = %document.filename, "file uploaded and processed");

    Ok(Json(UploadResponse {
        message: "File uploaded and processed successfully".to_string(),
        filename: document.filename,
        file_path: document.file_path,
        text_filename: document.text_filename,
        text_path: document.text_path,
    }))
}

fn ingest_error_to_api(err: IngestError) -> ApiError {
    match err {
        IngestError::InvalidFilename(message) => ApiError::UnsupportedFormat(message),
        IngestError::Ocr(ocr) => match ocr {
            OcrError::UnsupportedFormat(message) => ApiError::UnsupportedFormat(message),
            // server-side problems, not the caller's payload
            OcrError::EngineUnavailable(_) | OcrError::Io(_) => {
                ApiError::Internal(anyhow::anyhow!(ocr))
            }
            other => ApiError::Extraction(other.to_string()),
        },
        IngestError::Internal(err) => ApiError::Internal(err),
    }
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    let documents = state.catalog.list().await.map_err(ApiError::Internal)?;
    Ok(Json(documents))
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<DocumentContentResponse>, ApiError> {
    let content = state
        .catalog
        .get(&document_id)
        .await
        .map_err(|err| match err {
            CatalogError::NotFound => ApiError::NotFound("Document not found".to_string()),
            CatalogError::Internal(err) => ApiError::Internal(err),
        })?;
    Ok(Json(DocumentContentResponse { content }))
}

async fn combined_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentContentResponse>, ApiError> {
    let content = state.catalog.combine().await.map_err(ApiError::Internal)?;
    Ok(Json(DocumentContentResponse { content }))
}
