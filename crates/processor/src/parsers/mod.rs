//! Format parsers for dispatch files
//!
//! Every parser is lenient: unreadable rows are skipped and reported as
//! warnings, never as errors.

pub mod curve;
pub mod metering;
pub mod pod;
pub mod registry;
pub mod xml;

pub use curve::CurveAccumulator;
pub use metering::parse_metering_csv;
pub use pod::{is_valid_pod, pods_from_filename};
pub use registry::{parse_registry_csv, RegistryRows, Treatment};
pub use xml::parse_xml_pods;

/// Decode file bytes as text, tolerating invalid UTF-8 and a leading BOM
pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.trim_start_matches('\u{FEFF}').to_string()
}

/// Column separator of a delimited header row: `;` wins over `,`
pub fn detect_separator(header: &str) -> u8 {
    if header.contains(';') {
        b';'
    } else {
        b','
    }
}

/// Split delimited text into trimmed records, keeping ragged rows
pub(crate) fn read_records(text: &str, separator: u8) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    reader
        .records()
        .filter_map(|record| record.ok())
        .filter(|record| record.iter().any(|cell| !cell.is_empty()))
        .map(|record| record.iter().map(clean_cell).collect())
        .collect()
}

/// Strip stray quotes and whitespace left around a cell value
pub(crate) fn clean_cell(raw: &str) -> String {
    raw.trim().trim_matches('"').trim_matches('\'').trim().to_string()
}
