//! In-memory doubles for the storage seams
//!
//! Enabled for tests of this crate and, through the `testing` feature, for
//! dependent crates.

use crate::db::models::{DispatchFile, IntermediateResult, NewChunkResult, ProcessingCursor};
use crate::db::{CursorUpdate, DispatchStore, NewDispatchFile};
use crate::errors::{AppError, Result};
use crate::storage::BlobFetcher;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// `DispatchStore` backed by vectors behind a mutex
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<Vec<DispatchFile>>,
    results: Mutex<Vec<IntermediateResult>>,
    cursors: Mutex<Vec<ProcessingCursor>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file and return it
    pub fn insert_file(&self, file: NewDispatchFile) -> DispatchFile {
        let model = DispatchFile {
            id: Uuid::new_v4(),
            user_id: file.user_id,
            file_name: file.file_name,
            file_url: file.file_url,
            file_size: file.file_size,
            file_type: file.file_type,
            zone_code: file.zone_code,
            month_reference: file.month_reference,
            created_at: chrono::Utc::now().into(),
        };
        self.files.lock().unwrap().push(model.clone());
        model
    }

    /// Every stored chunk row, in insertion order
    pub fn results(&self) -> Vec<IntermediateResult> {
        self.results.lock().unwrap().clone()
    }
}

fn column_i32(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| AppError::Validation {
        message: format!("{} {} out of range", field, value),
        field: Some(field.to_string()),
    })
}

#[async_trait]
impl DispatchStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_file(&self, file: NewDispatchFile) -> Result<DispatchFile> {
        Ok(self.insert_file(file))
    }

    async fn find_file(&self, id: Uuid) -> Result<Option<DispatchFile>> {
        Ok(self.files.lock().unwrap().iter().find(|f| f.id == id).cloned())
    }

    async fn chunk_results(&self, job_id: Uuid, file_id: Uuid) -> Result<Vec<IntermediateResult>> {
        let mut rows: Vec<_> = self
            .results
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.job_id == job_id && r.file_id == file_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.chunk_index);
        Ok(rows)
    }

    async fn save_chunk_result(&self, result: NewChunkResult) -> Result<IntermediateResult> {
        let now = chrono::Utc::now();
        let chunk_index = column_i32(result.chunk_index, "chunkIndex")?;
        let mut rows = self.results.lock().unwrap();

        let existing = rows.iter().position(|r| {
            r.job_id == result.job_id && r.file_id == result.file_id && r.chunk_index == chunk_index
        });

        if let Some(pos) = existing {
            if rows[pos].is_clean_completion() {
                return Ok(rows[pos].clone());
            }
        }

        // Without a payload the stored status and payload are kept
        let kept = existing
            .filter(|_| result.outcome.is_none())
            .map(|pos| (rows[pos].status.clone(), rows[pos].data.clone()));
        let (status, data) =
            kept.unwrap_or_else(|| (String::from(result.status.clone()), result.data()));

        let row = IntermediateResult {
            id: existing.map(|pos| rows[pos].id).unwrap_or_else(Uuid::new_v4),
            job_id: result.job_id,
            user_id: result.user_id,
            file_id: result.file_id,
            chunk_index,
            result_type: result.result_type.clone(),
            zone_code: result.zone_code.clone(),
            status,
            data,
            error_message: result.error_message.clone(),
            processing_time_ms: result.processing_time_ms,
            created_at: existing
                .map(|pos| rows[pos].created_at)
                .unwrap_or_else(|| now.into()),
            updated_at: now.into(),
        };

        match existing {
            Some(pos) => rows[pos] = row.clone(),
            None => rows.push(row.clone()),
        }

        Ok(row)
    }

    async fn find_cursor(&self, job_id: Uuid, file_id: Uuid) -> Result<Option<ProcessingCursor>> {
        Ok(self
            .cursors
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.job_id == job_id && c.file_id == file_id)
            .cloned())
    }

    async fn advance_cursor(&self, update: CursorUpdate) -> Result<ProcessingCursor> {
        let mut next_chunk_index = column_i32(update.next_chunk_index, "nextChunkIndex")?;
        let mut total_chunks = column_i32(update.total_chunks, "totalChunks")?;

        let mut cursors = self.cursors.lock().unwrap();
        if let Some(pos) = cursors
            .iter()
            .position(|c| c.job_id == update.job_id && c.file_id == update.file_id)
        {
            let stored = cursors.remove(pos);
            next_chunk_index = next_chunk_index.max(stored.next_chunk_index);
            total_chunks = total_chunks.max(stored.total_chunks);
        }

        let cursor = ProcessingCursor {
            job_id: update.job_id,
            file_id: update.file_id,
            next_chunk_index,
            total_chunks,
            completed: next_chunk_index >= total_chunks,
            updated_at: chrono::Utc::now().into(),
        };
        cursors.push(cursor.clone());
        Ok(cursor)
    }
}

/// `BlobFetcher` serving fixed bytes per URL and counting calls
#[derive(Default)]
pub struct StaticBlobs {
    blobs: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
}

impl StaticBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.blobs.insert(url.to_string(), bytes);
        self
    }

    /// Number of `fetch` calls so far, including misses
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobFetcher for StaticBlobs {
    async fn fetch(&self, file_url: &str) -> Option<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.blobs.get(file_url).cloned()
    }
}
