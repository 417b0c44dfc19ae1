use serde::Serialize;

use crate::domain::Record;
use crate::error::EtlError;

/// Why a row was left out of clustering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IssueReason {
    Missing,
    Unparsable(String),
}

/// A feature value that keeps its row out of clustering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureIssue {
    pub row_id: i64,
    pub field: String,
    pub reason: IssueReason,
}

impl From<FeatureIssue> for EtlError {
    fn from(issue: FeatureIssue) -> Self {
        let reason = match issue.reason {
            IssueReason::Missing => "missing value".to_string(),
            IssueReason::Unparsable(value) => format!("cannot parse '{}' as a number", value),
        };
        EtlError::Validation {
            row_id: issue.row_id,
            field: issue.field,
            reason,
        }
    }
}

/// Numeric features of the rows that had all of them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub row_ids: Vec<i64>,
    /// One vector per entry of `row_ids`, one value per entry of `columns`
    pub rows: Vec<Vec<f64>>,
    /// Rows excluded from the table, first offending field only
    pub issues: Vec<FeatureIssue>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

fn parse_feature(record: &Record, field: &str) -> Result<f64, FeatureIssue> {
    let issue = |reason| FeatureIssue {
        row_id: record.id,
        field: field.to_string(),
        reason,
    };
    let raw = record
        .nutrition
        .get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| issue(IssueReason::Missing))?;
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(issue(IssueReason::Unparsable(raw.to_string()))),
    }
}

/// Collect `feature_names` from every record; rows with a missing or
/// unparsable value are reported as issues instead of failing.
pub fn select_features(records: &[Record], feature_names: &[String]) -> FeatureTable {
    let mut table = FeatureTable {
        columns: feature_names.to_vec(),
        ..Default::default()
    };

    for record in records {
        let parsed: Result<Vec<f64>, FeatureIssue> = feature_names
            .iter()
            .map(|field| parse_feature(record, field))
            .collect();
        match parsed {
            Ok(values) => {
                table.row_ids.push(record.id);
                table.rows.push(values);
            }
            Err(issue) => table.issues.push(issue),
        }
    }

    table
}

/// Per-column zero-mean / unit-variance transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardized {
    pub rows: Vec<Vec<f64>>,
    pub means: Vec<f64>,
    /// Population standard deviation, or 1.0 for constant columns
    pub scales: Vec<f64>,
}

/// Standardize each column with the table's own mean and population
/// standard deviation. Constant columns are only centered.
pub fn standardize(rows: &[Vec<f64>]) -> Standardized {
    let width = rows.first().map_or(0, Vec::len);
    let n = rows.len() as f64;

    let mut means = vec![0.0; width];
    for row in rows {
        for (sum, value) in means.iter_mut().zip(row) {
            *sum += value;
        }
    }
    for mean in &mut means {
        *mean /= n;
    }

    let mut scales = vec![0.0; width];
    for row in rows {
        for ((acc, value), mean) in scales.iter_mut().zip(row).zip(&means) {
            *acc += (value - mean).powi(2);
        }
    }
    for scale in &mut scales {
        let std = (*scale / n).sqrt();
        *scale = if std > f64::EPSILON { std } else { 1.0 };
    }

    let standardized = rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&means)
                .zip(&scales)
                .map(|((value, mean), scale)| (value - mean) / scale)
                .collect()
        })
        .collect();

    Standardized {
        rows: standardized,
        means,
        scales,
    }
}
