//! Registry (anagrafica) CSV parsing with treatment classification

use super::metering::POD_HEADERS;
use super::pod::is_valid_pod;
use super::{detect_separator, read_records};
use std::collections::BTreeSet;

/// Keywords expected somewhere in a real header row
const HEADER_KEYWORDS: &[&str] = &["POD", "TRATTAMENTO"];

/// Treatment columns tried when no month-specific column exists
const GENERIC_TREATMENT_HEADERS: &[&str] = &["TRATTAMENTO", "TIPO_TRATTAMENTO", "TRATT"];

/// Metering treatment of a registry row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
    /// Hourly metered ("O")
    Hourly,
    /// Load profile ("LP")
    LoadProfile,
}

impl Treatment {
    /// Classify a raw treatment code; unknown codes yield `None`
    pub fn classify(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "O" | "ORARIO" | "1" | "TM" | "TMO" => Some(Treatment::Hourly),
            "F" | "LP" | "NM" => Some(Treatment::LoadProfile),
            _ => None,
        }
    }
}

/// Classified PODs from one registry CSV
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryRows {
    pub pods_o: BTreeSet<String>,
    pub pods_lp: BTreeSet<String>,
    pub unclassified_rows: usize,
    pub rows_read: usize,
    pub treatment_column: Option<String>,
    pub warnings: Vec<String>,
}

impl RegistryRows {
    /// Fold another source's rows into this one
    pub fn merge(&mut self, other: RegistryRows) {
        self.pods_o.extend(other.pods_o);
        self.pods_lp.extend(other.pods_lp);
        self.unclassified_rows += other.unclassified_rows;
        self.rows_read += other.rows_read;
        if self.treatment_column.is_none() {
            self.treatment_column = other.treatment_column;
        }
        self.warnings.extend(other.warnings);
    }
}

fn is_header_row(row: &[String]) -> bool {
    row.iter().any(|cell| {
        let upper = cell.to_ascii_uppercase();
        HEADER_KEYWORDS.iter().any(|kw| upper.contains(kw))
    })
}

fn treatment_column(header: &[String], month: Option<u32>) -> Option<usize> {
    let upper: Vec<String> = header.iter().map(|h| h.to_ascii_uppercase()).collect();
    let find = |name: &str| upper.iter().position(|h| h == name);

    month
        .and_then(|m| find(&format!("TRATTAMENTO_{}", m)).or_else(|| find(&format!("TRATTAMENTO_{:02}", m))))
        .or_else(|| GENERIC_TREATMENT_HEADERS.iter().find_map(|name| find(name)))
}

/// Parse a registry CSV, classifying each POD by the treatment of `month`.
///
/// A leading metadata line (no header keyword) is skipped.
pub fn parse_registry_csv(text: &str, month: Option<u32>, source: &str) -> RegistryRows {
    let mut parsed = RegistryRows::default();

    let sample: String = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join("\n");
    let records = read_records(text, detect_separator(&sample));

    let header_idx = match records.first() {
        None => {
            parsed.warnings.push(format!("{}: file is empty", source));
            return parsed;
        }
        Some(first) if is_header_row(first) => 0,
        Some(_) => 1,
    };

    let Some(header) = records.get(header_idx) else {
        parsed.warnings.push(format!("{}: no header row", source));
        return parsed;
    };

    let pod_col = header.iter().position(|h| {
        POD_HEADERS.iter().any(|known| known.eq_ignore_ascii_case(h))
    });
    let Some(pod_col) = pod_col else {
        parsed.warnings.push(format!("{}: no POD column found", source));
        return parsed;
    };

    let treat_col = treatment_column(header, month);
    match treat_col {
        Some(col) => parsed.treatment_column = header.get(col).cloned(),
        None => parsed.warnings.push(format!(
            "{}: no treatment column found, PODs left unclassified",
            source
        )),
    }

    for row in &records[header_idx + 1..] {
        parsed.rows_read += 1;

        let Some(pod) = row.get(pod_col).filter(|v| is_valid_pod(v)) else {
            continue;
        };

        let treatment = treat_col
            .and_then(|col| row.get(col))
            .and_then(|code| Treatment::classify(code));

        match treatment {
            Some(Treatment::Hourly) => {
                parsed.pods_o.insert(pod.clone());
            }
            Some(Treatment::LoadProfile) => {
                parsed.pods_lp.insert(pod.clone());
            }
            None => parsed.unclassified_rows += 1,
        }
    }

    if parsed.unclassified_rows > 0 {
        parsed.warnings.push(format!(
            "{}: {} rows with an unknown treatment code",
            source, parsed.unclassified_rows
        ));
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        for code in ["O", "orario", "1", "TM", " tmo "] {
            assert_eq!(Treatment::classify(code), Some(Treatment::Hourly), "{code}");
        }
        for code in ["F", "lp", "NM"] {
            assert_eq!(Treatment::classify(code), Some(Treatment::LoadProfile), "{code}");
        }
        for code in ["", "X", "2", "ORA"] {
            assert_eq!(Treatment::classify(code), None, "{code}");
        }
    }

    #[test]
    fn test_month_specific_column() {
        let csv = "POD;TRATTAMENTO_10;TRATTAMENTO_11\n\
                   IT001E00000001;LP;O\n\
                   IT001E00000002;O;F\n\
                   IT001E00000003;O;X\n";
        let rows = parse_registry_csv(csv, Some(11), "reg.csv");

        assert_eq!(rows.treatment_column.as_deref(), Some("TRATTAMENTO_11"));
        assert_eq!(rows.pods_o.iter().collect::<Vec<_>>(), vec!["IT001E00000001"]);
        assert_eq!(rows.pods_lp.iter().collect::<Vec<_>>(), vec!["IT001E00000002"]);
        assert_eq!(rows.unclassified_rows, 1);
        assert_eq!(rows.rows_read, 3);
    }

    #[test]
    fn test_zero_padded_month_and_metadata_row() {
        let csv = "Estrazione anagrafica del 2024-03-02\n\
                   CODICE_POD,TRATTAMENTO_03\n\
                   IT001E00000001,TMO\n";
        let rows = parse_registry_csv(csv, Some(3), "reg.csv");

        assert_eq!(rows.treatment_column.as_deref(), Some("TRATTAMENTO_03"));
        assert_eq!(rows.pods_o.len(), 1);
    }

    #[test]
    fn test_generic_fallback_column() {
        let csv = "pod;tipo_trattamento\nIT001E00000001;nm\n";
        let rows = parse_registry_csv(csv, Some(7), "reg.csv");

        assert_eq!(rows.treatment_column.as_deref(), Some("tipo_trattamento"));
        assert_eq!(rows.pods_lp.len(), 1);
    }

    #[test]
    fn test_missing_treatment_column() {
        let csv = "POD;ZONA\nIT001E00000001;NORD\n";
        let rows = parse_registry_csv(csv, None, "reg.csv");

        assert!(rows.pods_o.is_empty() && rows.pods_lp.is_empty());
        assert_eq!(rows.unclassified_rows, 1);
        assert_eq!(rows.warnings.len(), 2);
    }

    #[test]
    fn test_merge() {
        let mut a = parse_registry_csv("POD;TRATTAMENTO\nIT001E00000001;O\n", None, "a.csv");
        let b = parse_registry_csv("POD;TRATTAMENTO\nIT001E00000001;O\nIT001E00000002;F\n", None, "b.csv");
        a.merge(b);

        assert_eq!(a.pods_o.len(), 1);
        assert_eq!(a.pods_lp.len(), 1);
        assert_eq!(a.rows_read, 3);
    }
}
