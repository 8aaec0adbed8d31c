use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::error::{ApiResult, AppError};
use crate::services::backup_service::{BackupInfo, BackupResult, is_safe_filename};
use crate::state::AppState;

fn check_filename(filename: &str) -> Result<(), AppError> {
    if !is_safe_filename(filename) {
        return Err(AppError::Validation(format!("Invalid backup filename: {}", filename)));
    }
    Ok(())
}

pub async fn list_backups(State(state): State<AppState>) -> Json<Vec<BackupInfo>> {
    Json(state.backups.list().await)
}

pub async fn create_backup(State(state): State<AppState>) -> Json<BackupResult> {
    Json(state.backups.create().await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    pub filename: String,
    #[serde(default)]
    pub clear_existing: bool,
}

pub async fn restore_backup(
    State(state): State<AppState>,
    Json(body): Json<RestoreRequest>,
) -> ApiResult<Json<BackupResult>> {
    check_filename(&body.filename)?;
    Ok(Json(state.backups.restore(&body.filename, body.clear_existing).await))
}

pub async fn delete_backup(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<BackupResult>> {
    check_filename(&filename)?;
    Ok(Json(state.backups.delete(&filename).await))
}

pub async fn download_backup(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let file = state
        .backups
        .open(&filename)
        .await?
        .ok_or_else(|| AppError::NotFound("Backup not found".to_string()))?;

    let body = Body::from_stream(ReaderStream::new(file));
    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
    ];
    Ok((headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_names_fail_validation() {
        assert!(check_filename("backup_2024-01-01T00-00-00-000Z.sql.gz").is_ok());
        assert!(matches!(check_filename("../etc/passwd"), Err(AppError::Validation(_))));
        assert!(check_filename("a/b.sql").is_err());
    }
}
