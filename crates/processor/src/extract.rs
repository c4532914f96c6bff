//! Per-file-type extraction
//!
//! Synchronous and CPU-bound; the processor runs it on the blocking pool.

use crate::archive::{self, EntryKind};
use crate::deadline::Deadline;
use crate::parsers::{
    decode_text, parse_metering_csv, parse_registry_csv, pods_from_filename, CurveAccumulator,
    RegistryRows,
};
use crate::scheduler::scan_letture;
use dispatch_common::outcome::{CurveSummary, FileOutcome, FileType, PodBatch, PodList, Registry};
use std::collections::BTreeSet;
use tracing::warn;

/// Everything one extraction needs, owned so it can move to another thread
#[derive(Debug, Clone)]
pub struct ExtractJob {
    pub file_type: FileType,
    pub file_name: String,
    pub month: Option<u32>,
    pub chunk_index: u32,
    pub batch_size: usize,
    pub deadline: Deadline,
    pub bytes: Vec<u8>,
}

/// Run the extractor for the job's file type
pub fn extract(job: ExtractJob) -> FileOutcome {
    match job.file_type {
        FileType::Letture => FileOutcome::Letture(scan_letture(
            &job.bytes,
            &job.file_name,
            job.chunk_index,
            job.batch_size,
            job.deadline,
        )),
        FileType::Anagrafica => FileOutcome::Anagrafica(extract_registry(&job)),
        FileType::AggrIp => FileOutcome::AggrIp(extract_curve(&job)),
        FileType::IpDetail => FileOutcome::IpDetail(extract_pod_list(&job)),
    }
}

/// Outcome for a file over the size gate, built without downloading it
pub fn size_limited(file_type: FileType, file_name: &str, size_mb: f64, limit_mb: u64, chunk_index: u32) -> FileOutcome {
    let mut warnings = vec![format!(
        "File troppo grande ({:.1} MB, limite {} MB): elaborazione saltata. \
         Caricare file più piccoli, ad esempio suddividendo l'archivio.",
        size_mb, limit_mb
    )];
    let pods = pods_from_filename(file_name);

    match file_type {
        FileType::Letture | FileType::IpDetail if pods.is_empty() => {
            warnings.push(format!("Nessun codice POD riconosciuto nel nome del file {}", file_name));
        }
        _ => {}
    }

    match file_type {
        FileType::Letture => FileOutcome::Letture(PodBatch {
            success: true,
            warnings,
            total_pods: pods.len(),
            pod_codes: pods,
            chunk_index,
            total_chunks_needed: 1,
            skipped_due_to_size: true,
            ..Default::default()
        }),
        FileType::IpDetail => FileOutcome::IpDetail(PodList {
            success: true,
            warnings,
            total_pods: pods.len(),
            pod_codes: pods,
            skipped_due_to_size: true,
            ..Default::default()
        }),
        FileType::Anagrafica => FileOutcome::Anagrafica(Registry {
            success: true,
            warnings,
            skipped_due_to_size: true,
            ..Default::default()
        }),
        FileType::AggrIp => FileOutcome::AggrIp(CurveSummary {
            warnings,
            skipped_due_to_size: true,
            ..Default::default()
        }),
    }
}

/// Whether a file is handled in one chunk whatever the chunk index.
///
/// Only LETTURE ZIP archives under the size gate are split into chunks.
pub fn is_single_chunk(file_type: FileType, file_name: &str, over_size_gate: bool) -> bool {
    over_size_gate || file_type != FileType::Letture || EntryKind::of(file_name) != EntryKind::Zip
}

/// Empty successful outcome for a chunk index past the end of the file
pub fn past_last_chunk(file_type: FileType, file_name: &str, chunk_index: u32, total_chunks: u32) -> FileOutcome {
    let warnings = vec![format!(
        "{} has {} chunk(s), nothing to do for chunk {}",
        file_name, total_chunks, chunk_index
    )];

    match file_type {
        FileType::Letture => FileOutcome::Letture(PodBatch {
            success: true,
            warnings,
            chunk_index,
            total_chunks_needed: total_chunks,
            ..Default::default()
        }),
        FileType::IpDetail => FileOutcome::IpDetail(PodList {
            success: true,
            warnings,
            ..Default::default()
        }),
        FileType::Anagrafica => FileOutcome::Anagrafica(Registry {
            success: true,
            warnings,
            ..Default::default()
        }),
        FileType::AggrIp => FileOutcome::AggrIp(CurveSummary {
            warnings,
            ..Default::default()
        }),
    }
}

/// Decoded CSV texts of a bare CSV or of every CSV entry in a ZIP
fn csv_sources(job: &ExtractJob, warnings: &mut Vec<String>) -> Vec<(String, String)> {
    if EntryKind::of(&job.file_name) != EntryKind::Zip {
        return vec![(job.file_name.clone(), decode_text(&job.bytes))];
    }

    let mut zip = match archive::open(&job.bytes, &job.file_name) {
        Ok(zip) => zip,
        Err(e) => {
            warn!(error = %e, "Unreadable archive");
            warnings.push(format!("{} could not be opened as a ZIP archive", job.file_name));
            return Vec::new();
        }
    };

    let index = archive::index_entries(&zip);
    if index.csv.is_empty() {
        warnings.push(format!("{} contains no CSV files", job.file_name));
    }

    let mut sources = Vec::with_capacity(index.csv.len());
    for name in &index.csv {
        match archive::read_entry(&mut zip, name) {
            Ok(bytes) => sources.push((name.clone(), decode_text(&bytes))),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                warnings.push(format!("{}: could not be read", name));
            }
        }
    }
    sources
}

fn deadline_hit(job: &ExtractJob, remaining: usize, warnings: &mut Vec<String>) -> bool {
    if !job.deadline.expired() {
        return false;
    }
    warnings.push(format!(
        "Processing time limit reached: {} files left unprocessed",
        remaining
    ));
    true
}

fn extract_registry(job: &ExtractJob) -> Registry {
    let mut warnings = Vec::new();
    let sources = csv_sources(job, &mut warnings);
    let mut rows = RegistryRows::default();

    for (done, (name, text)) in sources.iter().enumerate() {
        if deadline_hit(job, sources.len() - done, &mut warnings) {
            break;
        }
        rows.merge(parse_registry_csv(text, job.month, name));
    }

    if job.month.is_none() {
        warnings.push("No month reference on the file; using the generic treatment column".into());
    }
    warnings.extend(rows.warnings);

    let pods_o: Vec<String> = rows.pods_o.into_iter().collect();
    let pods_lp: Vec<String> = rows.pods_lp.into_iter().collect();
    let total_pods = pods_o
        .iter()
        .chain(pods_lp.iter())
        .collect::<BTreeSet<_>>()
        .len();

    Registry {
        success: true,
        warnings,
        pods_o,
        pods_lp,
        total_pods,
        unclassified_rows: rows.unclassified_rows,
        rows_read: rows.rows_read,
        treatment_column: rows.treatment_column,
        ..Default::default()
    }
}

fn extract_curve(job: &ExtractJob) -> CurveSummary {
    let mut warnings = Vec::new();
    let sources = csv_sources(job, &mut warnings);
    let mut acc = CurveAccumulator::new();

    for (done, (name, text)) in sources.iter().enumerate() {
        if deadline_hit(job, sources.len() - done, &mut warnings) {
            break;
        }
        acc.add_csv(text, name);
    }

    if acc.valid_days() == 0 {
        warnings.push("No valid daily curve found; the typical-day curve is all zeros".into());
    }

    let mut summary = acc.finish();
    warnings.append(&mut summary.warnings);
    summary.warnings = warnings;
    summary
}

fn extract_pod_list(job: &ExtractJob) -> PodList {
    let mut warnings = Vec::new();
    let sources = csv_sources(job, &mut warnings);
    let mut pods = BTreeSet::new();
    let mut files_processed = 0;

    for (done, (name, text)) in sources.iter().enumerate() {
        if deadline_hit(job, sources.len() - done, &mut warnings) {
            break;
        }
        let parsed = parse_metering_csv(text, name);
        pods.extend(parsed.pods);
        warnings.extend(parsed.warnings);
        files_processed += 1;
    }

    let pod_codes: Vec<String> = pods.into_iter().collect();
    PodList {
        success: true,
        warnings,
        total_pods: pod_codes.len(),
        pod_codes,
        files_processed,
        ..Default::default()
    }
}
