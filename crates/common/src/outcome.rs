//! Typed processing outcomes
//!
//! One variant per dispatch file type. The same value is persisted in
//! `dispatch_intermediate_results.data` and returned to the caller, so the
//! JSON shape here is the wire contract for both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of quarter-hour slots in one day
pub const QUARTER_HOURS: usize = 96;

/// Kind of uploaded dispatch file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    /// Interval metering readings, usually nested ZIP archives
    Letture,
    /// POD registry with treatment type per month
    Anagrafica,
    /// Aggregated public-lighting quarter-hour curves
    AggrIp,
    /// Detailed public-lighting POD lists
    IpDetail,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Letture => "LETTURE",
            FileType::Anagrafica => "ANAGRAFICA",
            FileType::AggrIp => "AGGR_IP",
            FileType::IpDetail => "IP_DETAIL",
        }
    }

    /// `result_type` value for one chunk row, e.g. `letture_chunk_3`
    pub fn chunk_result_type(&self, chunk_index: u32) -> String {
        format!("{}_chunk_{}", self.as_str().to_ascii_lowercase(), chunk_index)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LETTURE" => Ok(FileType::Letture),
            "ANAGRAFICA" => Ok(FileType::Anagrafica),
            "AGGR_IP" => Ok(FileType::AggrIp),
            "IP_DETAIL" => Ok(FileType::IpDetail),
            other => Err(format!("unknown file type: {}", other)),
        }
    }
}

/// Result of one processor invocation, tagged by file type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "file_type")]
pub enum FileOutcome {
    #[serde(rename = "LETTURE")]
    Letture(PodBatch),
    #[serde(rename = "ANAGRAFICA")]
    Anagrafica(Registry),
    #[serde(rename = "AGGR_IP")]
    AggrIp(CurveSummary),
    #[serde(rename = "IP_DETAIL")]
    IpDetail(PodList),
}

impl FileOutcome {
    pub fn file_type(&self) -> FileType {
        match self {
            FileOutcome::Letture(_) => FileType::Letture,
            FileOutcome::Anagrafica(_) => FileType::Anagrafica,
            FileOutcome::AggrIp(_) => FileType::AggrIp,
            FileOutcome::IpDetail(_) => FileType::IpDetail,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            FileOutcome::Letture(b) => &b.warnings,
            FileOutcome::Anagrafica(r) => &r.warnings,
            FileOutcome::AggrIp(c) => &c.warnings,
            FileOutcome::IpDetail(p) => &p.warnings,
        }
    }

    pub fn warnings_mut(&mut self) -> &mut Vec<String> {
        match self {
            FileOutcome::Letture(b) => &mut b.warnings,
            FileOutcome::Anagrafica(r) => &mut r.warnings,
            FileOutcome::AggrIp(c) => &mut c.warnings,
            FileOutcome::IpDetail(p) => &mut p.warnings,
        }
    }

    /// Every POD code the outcome carries, regardless of classification
    pub fn pod_codes(&self) -> Vec<String> {
        match self {
            FileOutcome::Letture(b) => b.pod_codes.clone(),
            FileOutcome::Anagrafica(r) => {
                r.pods_o.iter().chain(r.pods_lp.iter()).cloned().collect()
            }
            FileOutcome::AggrIp(_) => Vec::new(),
            FileOutcome::IpDetail(p) => p.pod_codes.clone(),
        }
    }

    pub fn source_sha256(&self) -> Option<&str> {
        match self {
            FileOutcome::Letture(b) => b.source_sha256.as_deref(),
            FileOutcome::Anagrafica(r) => r.source_sha256.as_deref(),
            FileOutcome::AggrIp(c) => c.source_sha256.as_deref(),
            FileOutcome::IpDetail(p) => p.source_sha256.as_deref(),
        }
    }

    pub fn set_source_sha256(&mut self, digest: String) {
        let slot = match self {
            FileOutcome::Letture(b) => &mut b.source_sha256,
            FileOutcome::Anagrafica(r) => &mut r.source_sha256,
            FileOutcome::AggrIp(c) => &mut c.source_sha256,
            FileOutcome::IpDetail(p) => &mut p.source_sha256,
        };
        *slot = Some(digest);
    }

    /// True when the invocation stopped at the deadline before finishing its slice
    pub fn is_partial(&self) -> bool {
        matches!(self, FileOutcome::Letture(b) if b.timed_out)
    }

    /// Whether the caller has to invoke again with `next_chunk_index`
    pub fn more_chunks_needed(&self) -> bool {
        matches!(self, FileOutcome::Letture(b) if b.more_chunks_needed)
    }
}

/// PODs collected from one slice of a LETTURE file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodBatch {
    pub success: bool,
    pub warnings: Vec<String>,
    pub pod_codes: Vec<String>,
    pub total_pods: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub chunk_index: u32,
    pub total_chunks_needed: u32,
    pub more_chunks_needed: bool,
    pub next_chunk_index: Option<u32>,
    #[serde(default)]
    pub skipped_due_to_size: bool,
    #[serde(default)]
    pub timed_out: bool,
    /// PODs already recorded by earlier completed chunks of the same file
    #[serde(default)]
    pub previous_pods: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
}

/// Registry PODs split by metering treatment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    pub success: bool,
    pub warnings: Vec<String>,
    /// Hourly-metered PODs
    pub pods_o: Vec<String>,
    /// Load-profile PODs
    pub pods_lp: Vec<String>,
    pub total_pods: usize,
    pub unclassified_rows: usize,
    pub rows_read: usize,
    pub treatment_column: Option<String>,
    #[serde(default)]
    pub skipped_due_to_size: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
}

/// Typical-day curve averaged over every valid day in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSummary {
    pub success: bool,
    pub warnings: Vec<String>,
    pub curve: Vec<f64>,
    pub valid_days: usize,
    pub discarded_rows: usize,
    #[serde(default)]
    pub skipped_due_to_size: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
}

impl Default for CurveSummary {
    fn default() -> Self {
        Self {
            success: true,
            warnings: Vec::new(),
            curve: vec![0.0; QUARTER_HOURS],
            valid_days: 0,
            discarded_rows: 0,
            skipped_due_to_size: false,
            source_sha256: None,
        }
    }
}

/// Flat POD list from a public-lighting detail file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodList {
    pub success: bool,
    pub warnings: Vec<String>,
    pub pod_codes: Vec<String>,
    pub total_pods: usize,
    pub files_processed: usize,
    #[serde(default)]
    pub skipped_due_to_size: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
}
