//! Storage seam used by the processor
//!
//! `Repository` implements it against Postgres; `testing::MemoryStore`
//! implements it in memory.

use crate::db::models::{
    DispatchFile, IntermediateResult, NewChunkResult, ProcessingCursor,
};
use crate::errors::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// New state for a `(job, file)` continuation cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorUpdate {
    pub job_id: Uuid,
    pub file_id: Uuid,
    pub next_chunk_index: u32,
    pub total_chunks: u32,
    pub completed: bool,
}

/// Metadata for registering an uploaded file
#[derive(Debug, Clone)]
pub struct NewDispatchFile {
    pub user_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub zone_code: Option<String>,
    pub month_reference: Option<String>,
}

#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    /// Register an uploaded file
    async fn create_file(&self, file: NewDispatchFile) -> Result<DispatchFile>;

    async fn find_file(&self, id: Uuid) -> Result<Option<DispatchFile>>;

    /// Every chunk row of one file within one job, ordered by chunk index
    async fn chunk_results(&self, job_id: Uuid, file_id: Uuid) -> Result<Vec<IntermediateResult>>;

    /// Insert a chunk row, replacing an existing failed or partial row for the
    /// same `(job, file, chunk)`. A clean completed row is left untouched and
    /// returned instead.
    async fn save_chunk_result(&self, result: NewChunkResult) -> Result<IntermediateResult>;

    async fn find_cursor(&self, job_id: Uuid, file_id: Uuid) -> Result<Option<ProcessingCursor>>;

    async fn advance_cursor(&self, update: CursorUpdate) -> Result<ProcessingCursor>;
}
