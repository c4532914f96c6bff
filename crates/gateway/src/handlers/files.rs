//! File registration handler

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use dispatch_common::{
    db::NewDispatchFile,
    errors::{AppError, Result},
    outcome::FileType,
};

/// Metadata of an object already uploaded to storage
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFileRequest {
    pub user_id: Uuid,

    #[validate(length(min = 1, max = 512))]
    pub file_name: String,

    #[validate(url)]
    pub file_url: String,

    #[validate(range(min = 0))]
    pub file_size: i64,

    pub file_type: String,

    #[validate(length(min = 1, max = 32))]
    pub zone_code: Option<String>,

    /// `YYYY-MM` or `YYYY-MM-DD`
    pub month_reference: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub created_at: String,
}

fn is_month_reference(value: &str) -> bool {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").is_ok()
}

/// Register an uploaded file so the processor can pick it up
pub async fn register_file(
    State(state): State<AppState>,
    Json(request): Json<RegisterFileRequest>,
) -> Result<(StatusCode, Json<FileResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let file_type: FileType = request.file_type.parse().map_err(|message| AppError::Validation {
        message,
        field: Some("fileType".to_string()),
    })?;

    if let Some(month) = request.month_reference.as_deref() {
        if !is_month_reference(month) {
            return Err(AppError::Validation {
                message: format!("invalid month reference: {}", month),
                field: Some("monthReference".to_string()),
            });
        }
    }

    let file = state
        .store
        .create_file(NewDispatchFile {
            user_id: request.user_id,
            file_name: request.file_name,
            file_url: request.file_url,
            file_size: request.file_size,
            file_type: file_type.as_str().to_string(),
            zone_code: request.zone_code,
            month_reference: request.month_reference.map(|m| m.trim().to_string()),
        })
        .await?;

    tracing::info!(
        file_id = %file.id,
        file_type = %file_type,
        size_mb = file.size_mb(),
        "Dispatch file registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(FileResponse {
            id: file.id,
            file_name: file.file_name,
            file_type,
            file_size: file.file_size,
            created_at: file.created_at.to_rfc3339(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{json_body, post_json, send, state};
    use dispatch_common::db::DispatchStore;
    use dispatch_common::testing::{MemoryStore, StaticBlobs};
    use std::sync::Arc;

    fn body(file_type: &str, month: &str) -> String {
        serde_json::json!({
            "userId": Uuid::new_v4(),
            "fileName": "anagrafica_nord.csv",
            "fileUrl": "https://project.example.co/storage/v1/object/public/dispatch/anagrafica_nord.csv",
            "fileSize": 2048,
            "fileType": file_type,
            "zoneCode": "NORD",
            "monthReference": month,
        })
        .to_string()
    }

    #[test]
    fn test_month_reference() {
        assert!(is_month_reference("2024-11"));
        assert!(is_month_reference("2024-11-30"));
        assert!(!is_month_reference("2024-13"));
        assert!(!is_month_reference("novembre"));
    }

    #[tokio::test]
    async fn test_register_file() {
        let store = Arc::new(MemoryStore::new());
        let response = send(
            state(store.clone(), StaticBlobs::new()),
            post_json("/v1/files", &body("anagrafica", "2024-11")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["fileType"], "ANAGRAFICA");

        let id: Uuid = serde_json::from_value(json["id"].clone()).unwrap();
        let stored = store.find_file(id).await.unwrap().unwrap();
        assert_eq!(stored.file_type, "ANAGRAFICA");
        assert_eq!(stored.month_number(), Some(11));
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_type() {
        let store = Arc::new(MemoryStore::new());
        let response = send(
            state(store, StaticBlobs::new()),
            post_json("/v1/files", &body("READINGS", "2024-11")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["details"]["field"], "fileType");
    }

    #[tokio::test]
    async fn test_register_rejects_bad_month() {
        let store = Arc::new(MemoryStore::new());
        let response = send(
            state(store, StaticBlobs::new()),
            post_json("/v1/files", &body("LETTURE", "11/2024")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
