//! Quarter-hour curve averaging for aggregated public-lighting files

use super::{detect_separator, read_records};
use dispatch_common::outcome::{CurveSummary, QUARTER_HOURS};

/// First quarter-hour column when the header does not name them
pub const QH_FIXED_OFFSET: usize = 8;

/// Parse a decimal written with either `,` or `.` as separator.
///
/// When both appear the dot is taken as a thousands separator. Empty cells
/// read as zero.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let value = raw.trim();
    if value.is_empty() {
        return Some(0.0);
    }

    let normalized = if value.contains(',') && value.contains('.') {
        value.replace('.', "").replace(',', ".")
    } else {
        value.replace(',', ".")
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Running per-slot sum over every valid day seen so far
#[derive(Debug, Clone)]
pub struct CurveAccumulator {
    sums: [f64; QUARTER_HOURS],
    valid_days: usize,
    discarded_rows: usize,
    warnings: Vec<String>,
}

impl Default for CurveAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl CurveAccumulator {
    pub fn new() -> Self {
        Self {
            sums: [0.0; QUARTER_HOURS],
            valid_days: 0,
            discarded_rows: 0,
            warnings: Vec::new(),
        }
    }

    /// Add every data row of one CSV source
    pub fn add_csv(&mut self, text: &str, source: &str) {
        let header_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let records = read_records(text, detect_separator(header_line));

        let Some((header, rows)) = records.split_first() else {
            self.warnings.push(format!("{}: file is empty", source));
            return;
        };

        let columns = qh_columns(header);
        let needed = columns.iter().copied().max().unwrap_or(0) + 1;
        let mut short = 0usize;
        let mut unreadable = 0usize;

        for row in rows {
            if row.len() < needed {
                short += 1;
                self.discarded_rows += 1;
                continue;
            }

            let values: Option<Vec<f64>> =
                columns.iter().map(|&col| parse_decimal(&row[col])).collect();

            match values {
                None => {
                    unreadable += 1;
                    self.discarded_rows += 1;
                }
                Some(values) if values.iter().all(|v| *v == 0.0) => {
                    self.discarded_rows += 1;
                }
                Some(values) => {
                    for (slot, value) in self.sums.iter_mut().zip(values) {
                        *slot += value;
                    }
                    self.valid_days += 1;
                }
            }
        }

        if short > 0 {
            self.warnings.push(format!(
                "{}: {} rows with fewer than {} columns skipped",
                source, short, needed
            ));
        }
        if unreadable > 0 {
            self.warnings.push(format!(
                "{}: {} rows with non-numeric values skipped",
                source, unreadable
            ));
        }
    }

    pub fn valid_days(&self) -> usize {
        self.valid_days
    }

    /// Typical-day curve: per-slot mean, all zeros without valid days
    pub fn finish(self) -> CurveSummary {
        let curve = if self.valid_days == 0 {
            vec![0.0; QUARTER_HOURS]
        } else {
            let days = self.valid_days as f64;
            self.sums.iter().map(|sum| sum / days).collect()
        };

        CurveSummary {
            success: true,
            warnings: self.warnings,
            curve,
            valid_days: self.valid_days,
            discarded_rows: self.discarded_rows,
            ..Default::default()
        }
    }
}

/// Column index of each quarter hour, by `QH<n>` name or the fixed offset
fn qh_columns(header: &[String]) -> Vec<usize> {
    let named: Option<Vec<usize>> = (1..=QUARTER_HOURS)
        .map(|qh| {
            let name = format!("QH{}", qh);
            header.iter().position(|h| h.eq_ignore_ascii_case(&name))
        })
        .collect();

    named.unwrap_or_else(|| (QH_FIXED_OFFSET..QH_FIXED_OFFSET + QUARTER_HOURS).collect())
}
