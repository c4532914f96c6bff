//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::db::models::*;
use crate::db::store::{CursorUpdate, DispatchStore, NewDispatchFile};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, Set, Statement,
};
use uuid::Uuid;

/// Upsert keyed on the idempotency constraint. The `WHERE` clause keeps a
/// clean completed row: in that case nothing is returned. A write without a
/// payload (failed download) keeps the stored status and payload, so PODs of
/// a partial row survive it.
const UPSERT_CHUNK_RESULT: &str = r#"
    INSERT INTO dispatch_intermediate_results (
        id, job_id, user_id, file_id, chunk_index, result_type, zone_code,
        status, data, error_message, processing_time_ms, created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
    ON CONFLICT (job_id, file_id, chunk_index) DO UPDATE SET
        result_type = EXCLUDED.result_type,
        zone_code = EXCLUDED.zone_code,
        status = CASE WHEN EXCLUDED.data = 'null'::jsonb
            THEN dispatch_intermediate_results.status ELSE EXCLUDED.status END,
        data = CASE WHEN EXCLUDED.data = 'null'::jsonb
            THEN dispatch_intermediate_results.data ELSE EXCLUDED.data END,
        error_message = EXCLUDED.error_message,
        processing_time_ms = EXCLUDED.processing_time_ms,
        updated_at = NOW()
    WHERE dispatch_intermediate_results.status <> 'completed'
       OR COALESCE((dispatch_intermediate_results.data->>'timed_out')::boolean, false)
    RETURNING *
"#;

/// Cursor columns only move forward; `completed` follows the merged values
const CURSOR_NEXT: &str =
    "GREATEST(dispatch_cursors.next_chunk_index, EXCLUDED.next_chunk_index)";
const CURSOR_TOTAL: &str = "GREATEST(dispatch_cursors.total_chunks, EXCLUDED.total_chunks)";

fn column_i32(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| AppError::Validation {
        message: format!("{} {} out of range", field, value),
        field: Some(field.to_string()),
    })
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Chunk Result Operations
    // ========================================================================

    /// Find the row for one chunk, reading from the primary
    async fn find_chunk_result(
        &self,
        job_id: Uuid,
        file_id: Uuid,
        chunk_index: i32,
    ) -> Result<Option<IntermediateResult>> {
        IntermediateResultEntity::find()
            .filter(IntermediateResultColumn::JobId.eq(job_id))
            .filter(IntermediateResultColumn::FileId.eq(file_id))
            .filter(IntermediateResultColumn::ChunkIndex.eq(chunk_index))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl DispatchStore for Repository {
    // ========================================================================
    // Health Check
    // ========================================================================

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // File Operations
    // ========================================================================

    async fn create_file(&self, file: NewDispatchFile) -> Result<DispatchFile> {
        let model = DispatchFileActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(file.user_id),
            file_name: Set(file.file_name),
            file_url: Set(file.file_url),
            file_size: Set(file.file_size),
            file_type: Set(file.file_type),
            zone_code: Set(file.zone_code),
            month_reference: Set(file.month_reference),
            created_at: Set(chrono::Utc::now().into()),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn find_file(&self, id: Uuid) -> Result<Option<DispatchFile>> {
        DispatchFileEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Chunk Result Operations
    // ========================================================================

    async fn chunk_results(&self, job_id: Uuid, file_id: Uuid) -> Result<Vec<IntermediateResult>> {
        // Continuation reads must see rows written moments ago, so use the primary
        IntermediateResultEntity::find()
            .filter(IntermediateResultColumn::JobId.eq(job_id))
            .filter(IntermediateResultColumn::FileId.eq(file_id))
            .order_by_asc(IntermediateResultColumn::ChunkIndex)
            .all(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn save_chunk_result(&self, result: NewChunkResult) -> Result<IntermediateResult> {
        let chunk_index = column_i32(result.chunk_index, "chunkIndex")?;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            UPSERT_CHUNK_RESULT,
            vec![
                Uuid::new_v4().into(),
                result.job_id.into(),
                result.user_id.into(),
                result.file_id.into(),
                chunk_index.into(),
                result.result_type.clone().into(),
                result.zone_code.clone().into(),
                String::from(result.status.clone()).into(),
                result.data().into(),
                result.error_message.clone().into(),
                result.processing_time_ms.into(),
            ],
        );

        let written = IntermediateResultEntity::find()
            .from_raw_sql(stmt)
            .one(self.write_conn())
            .await?;

        match written {
            Some(row) => Ok(row),
            None => {
                tracing::info!(
                    job_id = %result.job_id,
                    file_id = %result.file_id,
                    chunk_index,
                    "Chunk already completed, keeping existing row"
                );
                self.find_chunk_result(result.job_id, result.file_id, chunk_index)
                    .await?
                    .ok_or_else(|| AppError::Internal {
                        message: "chunk result vanished during upsert".to_string(),
                    })
            }
        }
    }

    // ========================================================================
    // Cursor Operations
    // ========================================================================

    async fn find_cursor(&self, job_id: Uuid, file_id: Uuid) -> Result<Option<ProcessingCursor>> {
        ProcessingCursorEntity::find_by_id((job_id, file_id))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn advance_cursor(&self, update: CursorUpdate) -> Result<ProcessingCursor> {
        let cursor = ProcessingCursorActiveModel {
            job_id: Set(update.job_id),
            file_id: Set(update.file_id),
            next_chunk_index: Set(column_i32(update.next_chunk_index, "nextChunkIndex")?),
            total_chunks: Set(column_i32(update.total_chunks, "totalChunks")?),
            completed: Set(update.completed),
            updated_at: Set(chrono::Utc::now().into()),
        };

        ProcessingCursorEntity::insert(cursor)
            .on_conflict(
                OnConflict::columns([
                    ProcessingCursorColumn::JobId,
                    ProcessingCursorColumn::FileId,
                ])
                .value(ProcessingCursorColumn::NextChunkIndex, Expr::cust(CURSOR_NEXT))
                .value(ProcessingCursorColumn::TotalChunks, Expr::cust(CURSOR_TOTAL))
                .value(
                    ProcessingCursorColumn::Completed,
                    Expr::cust(format!("{} >= {}", CURSOR_NEXT, CURSOR_TOTAL)),
                )
                .update_column(ProcessingCursorColumn::UpdatedAt)
                .to_owned(),
            )
            .exec_without_returning(self.write_conn())
            .await?;

        self.find_cursor(update.job_id, update.file_id)
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!(
                    "cursor for job {} file {} missing after upsert",
                    update.job_id, update.file_id
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_i32_rejects_overflow() {
        assert_eq!(column_i32(7, "chunkIndex").unwrap(), 7);
        assert!(matches!(
            column_i32(i32::MAX as u32 + 1, "chunkIndex"),
            Err(AppError::Validation { field: Some(ref f), .. }) if f == "chunkIndex"
        ));
    }

    #[test]
    fn test_upsert_keeps_payload_on_empty_write() {
        assert!(UPSERT_CHUNK_RESULT.contains(
            "THEN dispatch_intermediate_results.data ELSE EXCLUDED.data END"
        ));
        assert!(UPSERT_CHUNK_RESULT.contains(
            "THEN dispatch_intermediate_results.status ELSE EXCLUDED.status END"
        ));
    }

    #[test]
    fn test_cursor_update_is_monotonic() {
        assert!(CURSOR_NEXT.starts_with("GREATEST(dispatch_cursors.next_chunk_index"));
        assert!(CURSOR_TOTAL.starts_with("GREATEST(dispatch_cursors.total_chunks"));
    }
}
