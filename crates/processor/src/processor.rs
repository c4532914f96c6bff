//! Dispatch file processor
//!
//! One call handles one invocation of the processing contract: look up the
//! file, resume from stored progress, download, extract one chunk on the
//! blocking pool, persist the chunk row and advance the cursor.

use crate::continuation::{cursor_from_rows, Continuation};
use crate::deadline::Deadline;
use crate::errors::ProcessorError;
use crate::extract::{extract, is_single_chunk, past_last_chunk, size_limited, ExtractJob};
use crate::scheduler::DEFAULT_BATCH_SIZE;
use dispatch_common::config::ProcessingConfig;
use dispatch_common::db::models::{DispatchFile, NewChunkResult, ResultStatus};
use dispatch_common::db::DispatchStore;
use dispatch_common::metrics::{
    record_chunk, record_download_failure, record_replay, record_size_gate_skip, ChunkReport,
};
use dispatch_common::outcome::{FileOutcome, FileType};
use dispatch_common::storage::BlobFetcher;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// The only action this processor understands
pub const PROCESS_ACTION: &str = "process";

/// Error reported when the source cannot be fetched from storage
pub const DOWNLOAD_FAILED: &str = "Could not download file";

/// Invocation body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessFileRequest {
    pub file_id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub chunk_index: Option<u32>,
    /// Caller's view of the chunk count, informational only
    #[serde(default)]
    pub total_chunks: Option<u32>,
}

/// Invocation result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessFileResponse {
    pub success: bool,
    pub file_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub chunk_index: u32,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<FileOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tunables taken from the `processing` config section
#[derive(Debug, Clone, Copy)]
pub struct ProcessingSettings {
    pub batch_size: usize,
    pub max_processing_time: Duration,
    pub max_file_mb: u64,
}

impl ProcessingSettings {
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_mb * 1024 * 1024
    }
}

impl From<&ProcessingConfig> for ProcessingSettings {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_processing_time: config.max_processing_time(),
            max_file_mb: config.max_downloadable_file_mb,
        }
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            ..Self::from(&ProcessingConfig::default())
        }
    }
}

fn check_action(action: Option<&str>) -> Result<(), ProcessorError> {
    match action.map(str::trim) {
        None | Some("") => Ok(()),
        Some(a) if a.eq_ignore_ascii_case(PROCESS_ACTION) => Ok(()),
        Some(other) => Err(ProcessorError::UnsupportedAction(other.to_string())),
    }
}

/// Processes dispatch files one chunk per call
pub struct DispatchProcessor {
    store: Arc<dyn DispatchStore>,
    blobs: Arc<dyn BlobFetcher>,
    settings: ProcessingSettings,
}

impl DispatchProcessor {
    pub fn new(
        store: Arc<dyn DispatchStore>,
        blobs: Arc<dyn BlobFetcher>,
        settings: ProcessingSettings,
    ) -> Self {
        Self {
            store,
            blobs,
            settings,
        }
    }

    /// Handle one invocation.
    ///
    /// Soft failures (download, corrupt entries, deadline) are reported in
    /// the response; only lookup and persistence failures are errors.
    #[instrument(
        skip(self, request),
        fields(job_id = %request.job_id, file_id = %request.file_id, chunk_index = tracing::field::Empty)
    )]
    pub async fn process(
        &self,
        request: ProcessFileRequest,
    ) -> Result<ProcessFileResponse, ProcessorError> {
        let deadline = Deadline::starting_now(self.settings.max_processing_time);
        check_action(request.action.as_deref())?;

        let chunk_index = request.chunk_index.unwrap_or(0);
        if i32::try_from(chunk_index).is_err() {
            return Err(ProcessorError::ChunkIndexOutOfRange(chunk_index));
        }
        tracing::Span::current().record("chunk_index", chunk_index);

        let file = self
            .store
            .find_file(request.file_id)
            .await?
            .ok_or(ProcessorError::FileNotFound(request.file_id))?;
        let file_type = file.kind().map_err(|_| ProcessorError::UnknownFileType {
            file_id: file.id,
            file_type: file.file_type.clone(),
        })?;

        let continuation =
            Continuation::load(self.store.as_ref(), request.job_id, file.id, chunk_index).await?;

        if let Some(outcome) = continuation.replay.clone() {
            info!("Chunk already completed, replaying stored outcome");
            record_replay(file_type.as_str());
            return Ok(respond(&file, file_type, chunk_index, deadline, Some(outcome), None));
        }

        if let (Some(requested), Some(known)) = (request.total_chunks, continuation.total_chunks) {
            if requested != known {
                debug!(requested, known, "Caller's chunk count differs from stored progress");
            }
        }

        let over_size_gate = file.file_size.max(0) as u64 > self.settings.max_file_bytes();
        let known_total = if is_single_chunk(file_type, &file.file_name, over_size_gate) {
            Some(1)
        } else {
            continuation.total_chunks
        };
        if let Some(total) = known_total.filter(|total| chunk_index >= (*total).max(1)) {
            warn!(total, "Chunk index past the last chunk, nothing to do");
            let outcome = past_last_chunk(file_type, &file.file_name, chunk_index, total);
            return Ok(respond(&file, file_type, chunk_index, deadline, Some(outcome), None));
        }

        let outcome = if over_size_gate {
            warn!(
                size_mb = file.size_mb(),
                limit_mb = self.settings.max_file_mb,
                "File over the size gate, not downloading"
            );
            record_size_gate_skip(file_type.as_str());
            size_limited(
                file_type,
                &file.file_name,
                file.size_mb(),
                self.settings.max_file_mb,
                chunk_index,
            )
        } else {
            let Some(bytes) = self.blobs.fetch(&file.file_url).await else {
                return self
                    .download_failed(&request, &file, file_type, chunk_index, deadline)
                    .await;
            };

            let digest = hex::encode(Sha256::digest(&bytes));
            let job = ExtractJob {
                file_type,
                file_name: file.file_name.clone(),
                month: file.month_number(),
                chunk_index,
                batch_size: self.settings.batch_size,
                deadline,
                bytes,
            };

            let mut outcome = tokio::task::spawn_blocking(move || extract(job)).await?;
            if let Some(warning) = continuation.digest_warning(&digest) {
                warn!("{}", warning);
                outcome.warnings_mut().push(warning);
            }
            outcome.set_source_sha256(digest);
            outcome
        };

        let outcome = match outcome {
            FileOutcome::Letture(mut batch) => {
                batch.previous_pods = continuation.previous_pods.len();
                FileOutcome::Letture(batch)
            }
            other => other,
        };

        let stored = self
            .store
            .save_chunk_result(NewChunkResult {
                job_id: request.job_id,
                user_id: request.user_id,
                file_id: file.id,
                chunk_index,
                result_type: file_type.chunk_result_type(chunk_index),
                zone_code: file.zone_code.clone(),
                status: ResultStatus::Completed,
                outcome: Some(outcome.clone()),
                error_message: None,
                processing_time_ms: deadline.elapsed().as_millis() as i64,
            })
            .await?;

        // A concurrent invocation may have completed the chunk first
        let outcome = stored.outcome().unwrap_or(outcome);

        let rows = self.store.chunk_results(request.job_id, file.id).await?;
        let cursor = self
            .store
            .advance_cursor(cursor_from_rows(request.job_id, file.id, &rows))
            .await?;

        let entries_skipped = match &outcome {
            FileOutcome::Letture(batch) => batch.files_skipped,
            _ => 0,
        };
        record_chunk(ChunkReport {
            file_type: file_type.as_str(),
            status: "completed",
            duration_secs: deadline.elapsed().as_secs_f64(),
            pods: outcome.pod_codes().len(),
            entries_skipped,
            timed_out: outcome.is_partial(),
        });

        info!(
            pods = outcome.pod_codes().len(),
            previous_pods = continuation.previous_pods.len(),
            more_chunks_needed = outcome.more_chunks_needed(),
            timed_out = outcome.is_partial(),
            next_chunk_index = cursor.next_chunk_index,
            "Chunk processed"
        );

        Ok(respond(&file, file_type, chunk_index, deadline, Some(outcome), None))
    }

    async fn download_failed(
        &self,
        request: &ProcessFileRequest,
        file: &DispatchFile,
        file_type: FileType,
        chunk_index: u32,
        deadline: Deadline,
    ) -> Result<ProcessFileResponse, ProcessorError> {
        warn!(file_url = %file.file_url, "Download failed");
        record_download_failure(file_type.as_str());

        self.store
            .save_chunk_result(NewChunkResult {
                job_id: request.job_id,
                user_id: request.user_id,
                file_id: file.id,
                chunk_index,
                result_type: file_type.chunk_result_type(chunk_index),
                zone_code: file.zone_code.clone(),
                status: ResultStatus::Failed,
                outcome: None,
                error_message: Some(DOWNLOAD_FAILED.to_string()),
                processing_time_ms: deadline.elapsed().as_millis() as i64,
            })
            .await?;

        record_chunk(ChunkReport {
            file_type: file_type.as_str(),
            status: "failed",
            duration_secs: deadline.elapsed().as_secs_f64(),
            pods: 0,
            entries_skipped: 0,
            timed_out: false,
        });

        Ok(respond(
            file,
            file_type,
            chunk_index,
            deadline,
            None,
            Some(DOWNLOAD_FAILED.to_string()),
        ))
    }
}

fn respond(
    file: &DispatchFile,
    file_type: FileType,
    chunk_index: u32,
    deadline: Deadline,
    result: Option<FileOutcome>,
    error: Option<String>,
) -> ProcessFileResponse {
    ProcessFileResponse {
        success: error.is_none(),
        file_id: file.id,
        file_name: file.file_name.clone(),
        file_type,
        chunk_index,
        processing_time_ms: deadline.elapsed().as_millis() as u64,
        result,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::outer_with_nested;
    use dispatch_common::db::NewDispatchFile;
    use dispatch_common::testing::{MemoryStore, StaticBlobs};

    const URL: &str = "https://project.example.co/storage/v1/object/public/dispatch/u/letture.zip";

    struct Harness {
        store: Arc<MemoryStore>,
        blobs: Arc<StaticBlobs>,
        file: DispatchFile,
    }

    impl Harness {
        fn new(file_type: &str, file_name: &str, file_size: i64, bytes: Option<Vec<u8>>) -> Self {
            let store = Arc::new(MemoryStore::new());
            let blobs = match bytes {
                Some(bytes) => StaticBlobs::new().with(URL, bytes),
                None => StaticBlobs::new(),
            };
            let file = store.insert_file(NewDispatchFile {
                user_id: Uuid::new_v4(),
                file_name: file_name.into(),
                file_url: URL.into(),
                file_size,
                file_type: file_type.into(),
                zone_code: Some("NORD".into()),
                month_reference: Some("2024-11".into()),
            });
            Self {
                store,
                blobs: Arc::new(blobs),
                file,
            }
        }

        fn processor(&self, settings: ProcessingSettings) -> DispatchProcessor {
            DispatchProcessor::new(self.store.clone(), self.blobs.clone(), settings)
        }

        fn request(&self, job_id: Uuid, chunk_index: Option<u32>) -> ProcessFileRequest {
            ProcessFileRequest {
                file_id: self.file.id,
                job_id,
                user_id: self.file.user_id,
                action: Some("process".into()),
                chunk_index,
                total_chunks: None,
            }
        }
    }

    fn batch(response: &ProcessFileResponse) -> &dispatch_common::outcome::PodBatch {
        match response.result.as_ref() {
            Some(FileOutcome::Letture(batch)) => batch,
            other => panic!("expected LETTURE result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chunks_of_nested_archive() {
        let h = Harness::new("LETTURE", "letture.zip", 10 * 1024 * 1024, Some(outer_with_nested(250)));
        let processor = h.processor(ProcessingSettings::default());
        let job = Uuid::new_v4();

        let first = processor.process(h.request(job, Some(0))).await.unwrap();
        assert!(first.success);
        let b = batch(&first);
        assert_eq!(b.total_pods, 100);
        assert!(b.more_chunks_needed);
        assert_eq!(b.next_chunk_index, Some(1));
        assert_eq!(b.total_chunks_needed, 3);
        assert!(b.source_sha256.is_some());

        let last = processor.process(h.request(job, Some(2))).await.unwrap();
        let b = batch(&last);
        assert_eq!(b.total_pods, 50);
        assert!(!b.more_chunks_needed);
        assert_eq!(b.previous_pods, 100);

        let rows = h.store.results();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].result_type, "letture_chunk_2");

        let cursor = h.store.find_cursor(job, h.file.id).await.unwrap().unwrap();
        assert_eq!(cursor.next_chunk_index, 1);
        assert!(!cursor.completed);
    }

    #[tokio::test]
    async fn test_size_gate_skips_download() {
        let h = Harness::new("LETTURE", "letture_IT001E12345678.zip", 60 * 1024 * 1024, None);
        let response = h
            .processor(ProcessingSettings::default())
            .process(h.request(Uuid::new_v4(), None))
            .await
            .unwrap();

        let b = batch(&response);
        assert_eq!(b.pod_codes, vec!["IT001E12345678"]);
        assert!(b.skipped_due_to_size);
        assert!(b.source_sha256.is_none());
        assert_eq!(h.blobs.fetch_count(), 0);
        assert_eq!(h.store.results()[0].status, "completed");
    }

    #[tokio::test]
    async fn test_clean_chunk_is_replayed() {
        let h = Harness::new("LETTURE", "letture.zip", 1024, Some(outer_with_nested(3)));
        let processor = h.processor(ProcessingSettings::default());
        let job = Uuid::new_v4();

        let first = processor.process(h.request(job, Some(0))).await.unwrap();
        let again = processor.process(h.request(job, Some(0))).await.unwrap();

        assert_eq!(first.result, again.result);
        assert_eq!(h.blobs.fetch_count(), 1);
        assert_eq!(h.store.results().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_chunk_is_reprocessed() {
        let h = Harness::new("LETTURE", "letture.zip", 1024, Some(outer_with_nested(3)));
        let job = Uuid::new_v4();

        let rushed = ProcessingSettings {
            max_processing_time: Duration::ZERO,
            ..Default::default()
        };
        let partial = h.processor(rushed).process(h.request(job, Some(0))).await.unwrap();
        assert!(batch(&partial).timed_out);
        assert!(partial.success);

        let full = h
            .processor(ProcessingSettings::default())
            .process(h.request(job, Some(0)))
            .await
            .unwrap();
        assert!(!batch(&full).timed_out);
        assert_eq!(batch(&full).total_pods, 3);

        let rows = h.store.results();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_clean_completion());
        assert_eq!(h.blobs.fetch_count(), 2);
    }

    async fn seed_partial(h: &Harness, job_id: Uuid, chunk_index: u32, pods: &[&str]) {
        let outcome = FileOutcome::Letture(dispatch_common::outcome::PodBatch {
            success: true,
            pod_codes: pods.iter().map(|p| p.to_string()).collect(),
            total_pods: pods.len(),
            chunk_index,
            total_chunks_needed: 3,
            more_chunks_needed: true,
            timed_out: true,
            ..Default::default()
        });
        h.store
            .save_chunk_result(NewChunkResult {
                job_id,
                user_id: h.file.user_id,
                file_id: h.file.id,
                chunk_index,
                result_type: FileType::Letture.chunk_result_type(chunk_index),
                zone_code: None,
                status: ResultStatus::Completed,
                outcome: Some(outcome),
                error_message: None,
                processing_time_ms: 1,
            })
            .await
            .unwrap();
    }

    fn one_per_chunk() -> ProcessingSettings {
        ProcessingSettings {
            batch_size: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_single_chunk_file_ignores_later_chunks() {
        let csv = b"POD;TRATTAMENTO_11\nIT001E00000001;O\n".to_vec();
        let h = Harness::new("ANAGRAFICA", "anagrafica.csv", 1024, Some(csv));
        let processor = h.processor(ProcessingSettings::default());
        let job = Uuid::new_v4();

        processor.process(h.request(job, Some(0))).await.unwrap();
        let later = processor.process(h.request(job, Some(3))).await.unwrap();

        assert!(later.success);
        match later.result {
            Some(FileOutcome::Anagrafica(registry)) => {
                assert!(registry.pods_o.is_empty());
                assert!(registry.warnings[0].contains("nothing to do for chunk 3"));
            }
            other => panic!("expected ANAGRAFICA result, got {:?}", other),
        }
        assert_eq!(h.store.results().len(), 1);
        assert_eq!(h.blobs.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_size_gated_file_has_one_chunk() {
        let h = Harness::new("LETTURE", "letture_IT001E12345678.zip", 60 * 1024 * 1024, None);
        let processor = h.processor(ProcessingSettings::default());
        let job = Uuid::new_v4();

        let first = processor.process(h.request(job, Some(0))).await.unwrap();
        assert_eq!(batch(&first).pod_codes, vec!["IT001E12345678"]);

        let later = processor.process(h.request(job, Some(5))).await.unwrap();
        let b = batch(&later);
        assert!(b.pod_codes.is_empty());
        assert_eq!(b.chunk_index, 5);
        assert!(!b.more_chunks_needed);

        assert_eq!(h.store.results().len(), 1);
        assert_eq!(h.blobs.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_chunk_past_known_total_is_not_fetched() {
        let h = Harness::new("LETTURE", "letture.zip", 1024, Some(outer_with_nested(3)));
        let processor = h.processor(one_per_chunk());
        let job = Uuid::new_v4();

        processor.process(h.request(job, Some(0))).await.unwrap();
        let past = processor.process(h.request(job, Some(3))).await.unwrap();

        assert!(past.success);
        assert!(batch(&past).pod_codes.is_empty());
        assert_eq!(batch(&past).total_chunks_needed, 3);
        assert_eq!(h.blobs.fetch_count(), 1);
        assert_eq!(h.store.results().len(), 1);
    }

    #[tokio::test]
    async fn test_chunk_index_out_of_range() {
        let h = Harness::new("LETTURE", "letture.zip", 1024, Some(outer_with_nested(3)));
        let result = h
            .processor(ProcessingSettings::default())
            .process(h.request(Uuid::new_v4(), Some(u32::MAX)))
            .await;

        assert!(matches!(result, Err(ProcessorError::ChunkIndexOutOfRange(u32::MAX))));
        assert_eq!(h.blobs.fetch_count(), 0);
        assert!(h.store.results().is_empty());
    }

    #[tokio::test]
    async fn test_previous_pods_count_partial_chunks() {
        let h = Harness::new("LETTURE", "letture.zip", 1024, Some(outer_with_nested(3)));
        let job = Uuid::new_v4();
        seed_partial(&h, job, 0, &["IT001E00000000"]).await;

        let response = h.processor(one_per_chunk()).process(h.request(job, Some(1))).await.unwrap();
        let b = batch(&response);
        assert_eq!(b.pod_codes, vec!["IT001E00000001"]);
        assert_eq!(b.previous_pods, 1);
    }

    #[tokio::test]
    async fn test_concurrent_chunks_keep_cursor_moving_forward() {
        let h = Harness::new("LETTURE", "letture.zip", 1024, Some(outer_with_nested(3)));
        let processor = h.processor(one_per_chunk());
        let job = Uuid::new_v4();

        let (first, second) = tokio::join!(
            processor.process(h.request(job, Some(0))),
            processor.process(h.request(job, Some(1))),
        );
        assert!(first.unwrap().success && second.unwrap().success);

        let cursor = h.store.find_cursor(job, h.file.id).await.unwrap().unwrap();
        assert_eq!((cursor.next_chunk_index, cursor.total_chunks), (2, 3));
        assert!(!cursor.completed);

        processor.process(h.request(job, Some(2))).await.unwrap();
        let cursor = h.store.find_cursor(job, h.file.id).await.unwrap().unwrap();
        assert_eq!(cursor.next_chunk_index, 3);
        assert!(cursor.completed);
    }

    #[tokio::test]
    async fn test_download_failure_keeps_partial_row() {
        let h = Harness::new("LETTURE", "letture.zip", 1024, None);
        let job = Uuid::new_v4();
        seed_partial(&h, job, 0, &["IT001E00000000"]).await;

        let response = h
            .processor(ProcessingSettings::default())
            .process(h.request(job, Some(0)))
            .await
            .unwrap();
        assert!(!response.success);

        let rows = h.store.results();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "completed");
        let kept = rows[0].outcome().unwrap();
        assert_eq!(kept.pod_codes(), vec!["IT001E00000000".to_string()]);
        assert!(kept.is_partial());
    }

    #[tokio::test]
    async fn test_download_failure_is_soft() {
        let h = Harness::new("ANAGRAFICA", "anagrafica.csv", 1024, None);
        let response = h
            .processor(ProcessingSettings::default())
            .process(h.request(Uuid::new_v4(), None))
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some(DOWNLOAD_FAILED));
        assert!(response.result.is_none());

        let rows = h.store.results();
        assert_eq!(rows[0].status, "failed");
        assert_eq!(rows[0].error_message.as_deref(), Some(DOWNLOAD_FAILED));
        assert_eq!(rows[0].result_type, "anagrafica_chunk_0");
    }

    #[tokio::test]
    async fn test_registry_uses_month_reference() {
        let csv = b"POD;TRATTAMENTO_10;TRATTAMENTO_11\nIT001E00000001;LP;O\n".to_vec();
        let h = Harness::new("ANAGRAFICA", "anagrafica.csv", 1024, Some(csv));
        let response = h
            .processor(ProcessingSettings::default())
            .process(h.request(Uuid::new_v4(), None))
            .await
            .unwrap();

        match response.result {
            Some(FileOutcome::Anagrafica(registry)) => {
                assert_eq!(registry.pods_o, vec!["IT001E00000001"]);
                assert!(registry.pods_lp.is_empty());
            }
            other => panic!("expected ANAGRAFICA result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejects_unknown_action_and_file() {
        let h = Harness::new("LETTURE", "letture.zip", 1024, None);
        let processor = h.processor(ProcessingSettings::default());

        let mut request = h.request(Uuid::new_v4(), None);
        request.action = Some("delete".into());
        assert!(matches!(
            processor.process(request).await,
            Err(ProcessorError::UnsupportedAction(ref a)) if a == "delete"
        ));

        let mut request = h.request(Uuid::new_v4(), None);
        request.file_id = Uuid::new_v4();
        assert!(matches!(
            processor.process(request).await,
            Err(ProcessorError::FileNotFound(_))
        ));
        assert_eq!(h.blobs.fetch_count(), 0);
    }

    #[test]
    fn test_check_action() {
        assert!(check_action(None).is_ok());
        assert!(check_action(Some("Process")).is_ok());
        assert!(check_action(Some("purge")).is_err());
    }

    #[test]
    fn test_wire_shapes() {
        let request: ProcessFileRequest = serde_json::from_value(serde_json::json!({
            "fileId": Uuid::nil(),
            "jobId": Uuid::nil(),
            "userId": Uuid::nil(),
            "action": "process",
            "chunkIndex": 2,
        }))
        .unwrap();
        assert_eq!(request.chunk_index, Some(2));
        assert_eq!(request.total_chunks, None);

        let response = ProcessFileResponse {
            success: true,
            file_id: Uuid::nil(),
            file_name: "a.zip".into(),
            file_type: FileType::AggrIp,
            chunk_index: 0,
            processing_time_ms: 12,
            result: None,
            error: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["fileType"], "AGGR_IP");
        assert_eq!(json["processingTimeMs"], 12);
        assert!(json.get("error").is_none());
    }
}
