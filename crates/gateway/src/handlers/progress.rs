//! Per-file progress handler

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use dispatch_common::errors::{AppError, Result};
use dispatch_processor::{merge_outcomes, MergedOutcome};

/// Cursor state plus the merged view of every chunk row
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub job_id: Uuid,
    pub file_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub next_chunk_index: Option<u32>,
    pub total_chunks: Option<u32>,
    pub completed: bool,
    #[serde(flatten)]
    pub merged: MergedOutcome,
}

/// Progress of one file within one job
pub async fn file_progress(
    State(state): State<AppState>,
    Path((job_id, file_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ProgressResponse>> {
    let file = state
        .store
        .find_file(file_id)
        .await?
        .ok_or_else(|| AppError::FileNotFound {
            id: file_id.to_string(),
        })?;

    let cursor = state.store.find_cursor(job_id, file_id).await?;
    let rows = state.store.chunk_results(job_id, file_id).await?;

    Ok(Json(ProgressResponse {
        job_id,
        file_id,
        file_name: file.file_name,
        file_type: file.file_type,
        next_chunk_index: cursor.as_ref().map(|c| c.next_chunk_index.max(0) as u32),
        total_chunks: cursor.as_ref().map(|c| c.total_chunks.max(0) as u32),
        completed: cursor.map(|c| c.completed).unwrap_or(false),
        merged: merge_outcomes(&rows),
    }))
}
