//! POD extraction from metering CSV files

use super::pod::{is_valid_pod, POD_PREFIX};
use super::{detect_separator, read_records};
use std::collections::BTreeSet;

/// Header spellings that identify the POD column, matched exactly
pub const POD_HEADERS: &[&str] = &[
    "POD",
    "Pod",
    "pod",
    "CODICE_POD",
    "CODICE POD",
    "COD_POD",
    "CodicePOD",
    "CodPod",
    "POD_CODE",
    "PUNTO_PRELIEVO",
];

/// PODs found in one CSV source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvPods {
    pub pods: BTreeSet<String>,
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub warnings: Vec<String>,
}

/// Position of the POD column by header name
pub(crate) fn pod_column_by_header(header: &[String]) -> Option<usize> {
    header.iter().position(|cell| POD_HEADERS.contains(&cell.as_str()))
}

/// Extract one POD candidate per data row of a metering CSV.
///
/// The POD column is found by header name; failing that, by the first data
/// cell starting with `IT`.
pub fn parse_metering_csv(text: &str, source: &str) -> CsvPods {
    let mut parsed = CsvPods::default();

    let header_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let records = read_records(text, detect_separator(header_line));

    let Some((header, rows)) = records.split_first() else {
        parsed.warnings.push(format!("{}: file is empty", source));
        return parsed;
    };

    let column = pod_column_by_header(header).or_else(|| {
        rows.iter()
            .find_map(|row| row.iter().position(|cell| cell.starts_with(POD_PREFIX)))
    });

    let Some(column) = column else {
        parsed.warnings.push(format!("{}: no POD column found", source));
        return parsed;
    };

    for row in rows {
        parsed.rows_read += 1;
        match row.get(column) {
            Some(value) if is_valid_pod(value) => {
                parsed.pods.insert(value.clone());
            }
            _ => parsed.rows_rejected += 1,
        }
    }

    if parsed.rows_rejected > 0 {
        parsed.warnings.push(format!(
            "{}: {} rows without a valid POD skipped",
            source, parsed.rows_rejected
        ));
    }

    parsed
}
