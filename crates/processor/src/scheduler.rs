//! Time-boxed batch scheduling of LETTURE archives
//!
//! Each invocation handles one window of nested archives. Top-level CSV/XML
//! entries belong to chunk 0. The deadline is checked before every unit of
//! work, nested entries included; when it expires the batch is returned as
//! is, flagged `timed_out`.

use crate::archive::{self, EntryKind};
use crate::deadline::Deadline;
use crate::parsers::{decode_text, parse_metering_csv, parse_xml_pods, pods_from_filename};
use dispatch_common::outcome::PodBatch;
use std::collections::BTreeSet;
use std::io::{Read, Seek};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Nested archives per invocation
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Slice `[start, end)` of the nested archives handled by one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    pub chunk_index: u32,
    pub batch_size: usize,
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl BatchWindow {
    pub fn new(chunk_index: u32, batch_size: usize, total: usize) -> Self {
        let batch_size = batch_size.max(1);
        let start = (chunk_index as usize).saturating_mul(batch_size).min(total);
        let end = start.saturating_add(batch_size).min(total);

        Self {
            chunk_index,
            batch_size,
            start,
            end,
            total,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// A chunk past the last window of a non-empty archive
    pub fn is_beyond_end(&self) -> bool {
        self.chunk_index > 0 && self.start >= self.total
    }

    pub fn more_chunks_needed(&self) -> bool {
        self.end < self.total
    }

    pub fn next_chunk_index(&self) -> Option<u32> {
        self.more_chunks_needed().then(|| self.chunk_index + 1)
    }

    /// `ceil(total / batch_size)`, at least one
    pub fn total_chunks(&self) -> u32 {
        self.total.div_ceil(self.batch_size).max(1) as u32
    }
}

/// Whether a scan ran to completion or stopped at the deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Deadline,
}

/// Accumulates PODs and counters for one batch
struct BatchState {
    pods: BTreeSet<String>,
    warnings: Vec<String>,
    files_processed: usize,
    files_skipped: usize,
    timed_out: bool,
}

impl BatchState {
    fn new() -> Self {
        Self {
            pods: BTreeSet::new(),
            warnings: Vec::new(),
            files_processed: 0,
            files_skipped: 0,
            timed_out: false,
        }
    }

    fn parse_entry(&mut self, name: &str, bytes: &[u8]) {
        match EntryKind::of(name) {
            EntryKind::Csv => {
                let parsed = parse_metering_csv(&decode_text(bytes), name);
                self.pods.extend(parsed.pods);
                self.warnings.extend(parsed.warnings);
            }
            EntryKind::Xml => self.pods.extend(parse_xml_pods(&decode_text(bytes))),
            EntryKind::Zip | EntryKind::Other => self.pods.extend(pods_from_filename(name)),
        }
        self.files_processed += 1;
    }

    fn stop(&mut self, remaining: usize, what: &str) {
        self.timed_out = true;
        self.warnings.push(format!(
            "Processing time limit reached: {} {} left unprocessed in this chunk",
            remaining, what
        ));
    }

    fn into_batch(self, window: &BatchWindow) -> PodBatch {
        let pod_codes: Vec<String> = self.pods.into_iter().collect();

        PodBatch {
            success: true,
            warnings: self.warnings,
            total_pods: pod_codes.len(),
            pod_codes,
            files_processed: self.files_processed,
            files_skipped: self.files_skipped,
            chunk_index: window.chunk_index,
            total_chunks_needed: window.total_chunks(),
            more_chunks_needed: window.more_chunks_needed(),
            next_chunk_index: window.next_chunk_index(),
            timed_out: self.timed_out,
            ..Default::default()
        }
    }
}

/// Extract PODs for one chunk of a LETTURE source.
///
/// Never fails: unreadable archives and entries become warnings and skip
/// counts.
pub fn scan_letture(
    bytes: &[u8],
    file_name: &str,
    chunk_index: u32,
    batch_size: usize,
    deadline: Deadline,
) -> PodBatch {
    scan_letture_until(bytes, file_name, chunk_index, batch_size, || deadline.expired())
}

/// [`scan_letture`] stopping as soon as `expired` returns true
pub(crate) fn scan_letture_until(
    bytes: &[u8],
    file_name: &str,
    chunk_index: u32,
    batch_size: usize,
    mut expired: impl FnMut() -> bool,
) -> PodBatch {
    let mut state = BatchState::new();

    if EntryKind::of(file_name) != EntryKind::Zip {
        let window = BatchWindow::new(chunk_index, batch_size, 0);
        if chunk_index == 0 {
            state.parse_entry(file_name, bytes);
        } else {
            state.warnings.push(format!(
                "{} is a single-chunk file, nothing to do for chunk {}",
                file_name, chunk_index
            ));
        }
        return state.into_batch(&window);
    }

    let mut outer = match archive::open(bytes, file_name) {
        Ok(outer) => outer,
        Err(e) => {
            warn!(error = %e, "Unreadable LETTURE archive, falling back to the file name");
            let window = BatchWindow::new(chunk_index, batch_size, 0);
            state.files_skipped += 1;
            state.warnings.push(format!(
                "{} could not be opened as a ZIP archive; PODs taken from the file name",
                file_name
            ));
            if chunk_index == 0 {
                state.pods.extend(pods_from_filename(file_name));
            }
            return state.into_batch(&window);
        }
    };

    let index = archive::index_entries(&outer);
    let window = BatchWindow::new(chunk_index, batch_size, index.nested.len());
    debug!(
        flat = index.flat_len(),
        nested = index.nested.len(),
        start = window.start,
        end = window.end,
        "Archive indexed"
    );

    if chunk_index == 0 {
        for (done, name) in index.flat().enumerate() {
            if expired() {
                state.stop(index.flat_len() - done, "top-level files");
                break;
            }
            match archive::read_entry(&mut outer, name) {
                Ok(entry) => state.parse_entry(name, &entry),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    state.files_skipped += 1;
                }
            }
        }
    }

    if window.is_beyond_end() {
        state.warnings.push(format!(
            "Chunk {} is beyond the last chunk ({} nested archives, {} chunks)",
            chunk_index,
            window.total,
            window.total_chunks()
        ));
    }

    if !state.timed_out {
        for (done, name) in index.nested[window.start..window.end].iter().enumerate() {
            if expired() {
                state.stop(window.len() - done, "nested archives");
                break;
            }
            match scan_nested(&mut outer, name, &mut state, &mut expired) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Deadline) => {
                    state.stop(window.len() - done, "nested archives");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, nested = %name, "Skipping corrupt nested archive");
                    state.files_skipped += 1;
                }
            }
        }
    }

    if !index.other.is_empty() {
        debug!(count = index.other.len(), "Ignored entries with unknown extensions");
    }

    state.into_batch(&window)
}

/// Parse the CSV/XML entries of one nested archive
fn scan_nested<R: Read + Seek>(
    outer: &mut ZipArchive<R>,
    name: &str,
    state: &mut BatchState,
    expired: &mut impl FnMut() -> bool,
) -> Result<Flow, crate::errors::ProcessorError> {
    let bytes = archive::read_entry(outer, name)?;
    let mut inner = archive::open(&bytes, name)?;
    let index = archive::index_entries(&inner);

    for entry in index.flat() {
        if expired() {
            return Ok(Flow::Deadline);
        }
        match archive::read_entry(&mut inner, entry) {
            Ok(data) => state.parse_entry(entry, &data),
            Err(e) => {
                debug!(error = %e, nested = %name, "Skipping unreadable nested entry");
                state.files_skipped += 1;
            }
        }
    }

    Ok(Flow::Continue)
}
