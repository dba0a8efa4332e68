//! Import file handlers
//!
//! Every successful write kicks off a background detection run so the stored
//! patterns follow the data.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::{get_actor, AppError, AppState, SuccessResponse, MAX_UPLOAD_SIZE};
use cadence_core::{models::ImportFile, parse_csv};

/// Fields of an upload form
struct Upload {
    data: Vec<u8>,
    /// Explicit `name` field, else the uploaded file's name
    name: Option<String>,
}

/// Read a multipart form with a required `file` field and an optional `name`
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;

                if bytes.len() > MAX_UPLOAD_SIZE {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} MB",
                        MAX_UPLOAD_SIZE / 1024 / 1024
                    )));
                }

                file_data = Some(bytes.to_vec());
            }
            "name" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read name"))?;
                let value = value.trim();
                if !value.is_empty() {
                    name = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    let data = file_data.ok_or_else(|| AppError::bad_request("Missing file field"))?;

    Ok(Upload {
        data,
        name: name.or(file_name),
    })
}

/// Import response
#[derive(Serialize)]
pub struct ImportResponse {
    pub file: ImportFile,
    pub imported: usize,
    /// Rows dropped because their amount could not be read
    pub skipped_rows: usize,
    /// Whether a background detection run was started
    pub detection_started: bool,
}

/// GET /api/files - List import files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ImportFile>>, AppError> {
    Ok(Json(state.db.list_files()?))
}

/// GET /api/files/:id - Get one import file
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ImportFile>, AppError> {
    let file = state
        .db
        .get_file(id)?
        .ok_or_else(|| AppError::not_found(&format!("File {} not found", id)))?;

    Ok(Json(file))
}

/// POST /api/files - Import a spreadsheet export
///
/// Expects multipart form with:
/// - file: CSV file (required, max 10MB)
/// - name: display name (optional, defaults to the uploaded file name)
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImportResponse>), AppError> {
    let actor = get_actor(&headers);
    let upload = read_upload(multipart).await?;

    let parsed = parse_csv(upload.data.as_slice()).map_err(AppError::from_core)?;
    let name = upload.name.unwrap_or_else(|| "upload.csv".to_string());

    let file_id = state.db.import_file(&name, &parsed.transactions)?;
    let file = state
        .db
        .get_file(file_id)?
        .ok_or_else(|| AppError::internal("Imported file disappeared"))?;

    info!(
        actor = %actor,
        file_id,
        imported = parsed.transactions.len(),
        skipped = parsed.skipped_rows,
        "Imported file"
    );

    let detection_started = state.detection.trigger_async();

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            file,
            imported: parsed.transactions.len(),
            skipped_rows: parsed.skipped_rows,
            detection_started,
        }),
    ))
}

/// PUT /api/files/:id - Replace a file's transactions with a new upload
pub async fn reimport_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let actor = get_actor(&headers);
    let upload = read_upload(multipart).await?;

    let parsed = parse_csv(upload.data.as_slice()).map_err(AppError::from_core)?;

    let imported = state
        .db
        .reimport_file(id, upload.name.as_deref(), &parsed.transactions)
        .map_err(AppError::from_core)?;
    let file = state
        .db
        .get_file(id)?
        .ok_or_else(|| AppError::not_found(&format!("File {} not found", id)))?;

    info!(
        actor = %actor,
        file_id = id,
        imported,
        skipped = parsed.skipped_rows,
        "Reimported file"
    );

    let detection_started = state.detection.trigger_async();

    Ok(Json(ImportResponse {
        file,
        imported,
        skipped_rows: parsed.skipped_rows,
        detection_started,
    }))
}

/// DELETE /api/files/:id - Delete a file and its transactions
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let actor = get_actor(&headers);

    if !state.db.delete_file(id)? {
        return Err(AppError::not_found(&format!("File {} not found", id)));
    }

    info!(actor = %actor, file_id = id, "Deleted file");

    state.detection.trigger_async();

    Ok(Json(SuccessResponse { success: true }))
}
