//! Continuation state across invocations for one `(job, file)`
//!
//! Progress comes from the explicit cursor row plus the stored chunk rows,
//! matched on their integer `chunk_index`.

use dispatch_common::db::models::{IntermediateResult, ProcessingCursor, ResultStatus};
use dispatch_common::db::{CursorUpdate, DispatchStore};
use dispatch_common::errors::Result;
use dispatch_common::outcome::FileOutcome;
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

/// What earlier invocations already did for a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Continuation {
    /// PODs of completed chunks other than the requested one, partial rows included
    pub previous_pods: BTreeSet<String>,
    pub total_chunks: Option<u32>,
    /// Digest of the source as seen by earlier chunks
    pub source_sha256: Option<String>,
    /// Stored outcome of the requested chunk, if it already completed cleanly
    pub replay: Option<FileOutcome>,
}

impl Continuation {
    /// Read the cursor and every chunk row of `(job_id, file_id)`
    pub async fn load(
        store: &dyn DispatchStore,
        job_id: Uuid,
        file_id: Uuid,
        chunk_index: u32,
    ) -> Result<Self> {
        let cursor = store.find_cursor(job_id, file_id).await?;
        let rows = store.chunk_results(job_id, file_id).await?;
        Ok(Self::from_rows(cursor.as_ref(), &rows, chunk_index))
    }

    pub fn from_rows(
        cursor: Option<&ProcessingCursor>,
        rows: &[IntermediateResult],
        chunk_index: u32,
    ) -> Self {
        let mut state = Continuation::default();
        let mut row_total: Option<u32> = None;

        for (index, outcome) in completed_outcomes(rows) {
            if let FileOutcome::Letture(batch) = &outcome {
                row_total = row_total.max(Some(batch.total_chunks_needed));
            }
            if state.source_sha256.is_none() {
                state.source_sha256 = outcome.source_sha256().map(str::to_string);
            }

            if index != chunk_index {
                state.previous_pods.extend(outcome.pod_codes());
            } else if !outcome.is_partial() {
                state.replay = Some(outcome);
            }
        }

        state.total_chunks = cursor
            .map(|c| c.total_chunks.max(0) as u32)
            .or(row_total);
        state
    }

    /// Warning when the source bytes differ from those earlier chunks saw
    pub fn digest_warning(&self, digest: &str) -> Option<String> {
        match &self.source_sha256 {
            Some(previous) if previous != digest => Some(format!(
                "Source file changed since earlier chunks (sha256 {} -> {}); results may be inconsistent",
                short(previous),
                short(digest)
            )),
            _ => None,
        }
    }
}

/// `(chunk_index, outcome)` of every row stored as completed, partial or not
fn completed_outcomes(rows: &[IntermediateResult]) -> impl Iterator<Item = (u32, FileOutcome)> + '_ {
    rows.iter()
        .filter(|r| r.result_status() == ResultStatus::Completed)
        .filter_map(|r| r.outcome().map(|o| (r.chunk_index.max(0) as u32, o)))
}

/// Cursor for `(job_id, file_id)` derived from all of its stored rows.
///
/// Built after the current chunk is saved, so rows written by concurrent
/// invocations are taken into account.
pub fn cursor_from_rows(job_id: Uuid, file_id: Uuid, rows: &[IntermediateResult]) -> CursorUpdate {
    let mut done = BTreeSet::new();
    let mut total_chunks = 1;

    for (index, outcome) in completed_outcomes(rows) {
        if let FileOutcome::Letture(batch) = &outcome {
            total_chunks = total_chunks.max(batch.total_chunks_needed);
        }
        if !outcome.is_partial() {
            done.insert(index);
        }
    }

    let next_chunk_index = (0..total_chunks)
        .find(|i| !done.contains(i))
        .unwrap_or(total_chunks);

    CursorUpdate {
        job_id,
        file_id,
        next_chunk_index,
        total_chunks,
        completed: next_chunk_index >= total_chunks,
    }
}

fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

/// Read-only merge of every chunk row stored for one file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedOutcome {
    pub pod_codes: Vec<String>,
    pub total_pods: usize,
    pub completed_chunks: Vec<u32>,
    pub partial_chunks: Vec<u32>,
    pub failed_chunks: Vec<u32>,
    pub warnings: Vec<String>,
}

/// Deduplicate PODs across completed chunk rows; partial rows count too
pub fn merge_outcomes(rows: &[IntermediateResult]) -> MergedOutcome {
    let mut merged = MergedOutcome::default();
    let mut pods = BTreeSet::new();

    for row in rows {
        let index = row.chunk_index.max(0) as u32;
        if row.result_status() == ResultStatus::Failed {
            merged.failed_chunks.push(index);
            continue;
        }
        let Some(outcome) = row.outcome() else {
            merged.failed_chunks.push(index);
            continue;
        };

        if outcome.is_partial() {
            merged.partial_chunks.push(index);
        } else {
            merged.completed_chunks.push(index);
        }
        pods.extend(outcome.pod_codes());
        merged.warnings.extend(outcome.warnings().iter().cloned());
    }

    merged.pod_codes = pods.into_iter().collect();
    merged.total_pods = merged.pod_codes.len();
    merged
}
