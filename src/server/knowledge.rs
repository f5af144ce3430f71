//! Knowledge-base file management routes.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::knowledge::files::clean_filename;
use crate::knowledge::{FileFilter, FileMetadata, FileUpload, KnowledgeError, upload_batch};

use super::state::AppState;

/// Largest accepted upload request.
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

type ApiError = (StatusCode, Json<Value>);

/// Routes under `/support/vector-store/files`.
pub fn knowledge_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/support/vector-store/files", get(list_files).post(upload_file))
        .route("/support/vector-store/files/batch", post(upload_files_batch))
        .route("/support/vector-store/files/{file_id}", delete(delete_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

fn detail(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "detail": message.into() })))
}

fn knowledge_error(err: &KnowledgeError) -> ApiError {
    match err {
        KnowledgeError::TooManyFiles { .. } => detail(StatusCode::BAD_REQUEST, err.to_string()),
        _ => {
            tracing::error!(error = %err, "knowledge-base request failed");
            detail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

#[derive(Default)]
struct UploadForm {
    files: Vec<FileUpload>,
    metadata: FileMetadata,
    folder_name: Option<String>,
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let invalid = |err: axum::extract::multipart::MultipartError| detail(StatusCode::BAD_REQUEST, err.body_text());
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "files" => {
                let filename = field.file_name().unwrap_or("unknown").to_string();
                let content = field.bytes().await.map_err(invalid)?;
                form.files.push(FileUpload {
                    filename,
                    content: content.to_vec(),
                });
            }
            "immatriculation" => form.metadata.immatriculation = non_empty(field.text().await.map_err(invalid)?),
            "client" => form.metadata.client = non_empty(field.text().await.map_err(invalid)?),
            "folder_name" => form.folder_name = non_empty(field.text().await.map_err(invalid)?),
            other => tracing::debug!(field = %other, "ignoring unknown form field"),
        }
    }
    Ok(form)
}

/// List the vector store's files, optionally filtered by metadata.
async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<FileFilter>,
) -> Result<Json<Value>, ApiError> {
    let files = state
        .knowledge
        .list_files()
        .await
        .map_err(|e| knowledge_error(&e))?;
    Ok(Json(json!({ "files": filter.apply(files) })))
}

/// Upload one file with optional metadata.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = read_form(multipart).await?;
    let Some(upload) = form.files.into_iter().next() else {
        return Err(detail(StatusCode::BAD_REQUEST, "No file provided."));
    };
    let upload = FileUpload {
        filename: clean_filename(&upload.filename),
        content: upload.content,
    };

    let file = state
        .knowledge
        .upload_file(upload, form.metadata)
        .await
        .map_err(|e| knowledge_error(&e))?;
    Ok(Json(json!({ "file": file })))
}

/// Upload a folder's files; the plate may come from the folder name.
async fn upload_files_batch(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = read_form(multipart).await?;
    let outcome = upload_batch(
        state.knowledge.as_ref(),
        form.files,
        form.metadata,
        form.folder_name.as_deref(),
    )
    .await
    .map_err(|e| knowledge_error(&e))?;
    Ok(Json(json!(outcome)))
}

/// Delete a file from the vector store and file storage.
async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = state
        .knowledge
        .delete_file(&file_id)
        .await
        .map_err(|e| knowledge_error(&e))?;
    Ok(Json(result))
}
