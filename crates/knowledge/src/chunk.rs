//! Chunk builder.
//!
//! Turns source tables into one text summary per municipality. Chunk text is
//! a pure function of the table rows, so rebuilding from the same files
//! yields identical chunks in identical order.

use crate::dataset::{DatasetKind, Datasets, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of crime types listed in a chunk's "Top crimes" clause.
pub const TOP_CRIME_TYPES: usize = 5;

/// Risk values counted as high risk (compared case-insensitively).
const HIGH_RISK_VALUES: &[&str] = &["high", "alto"];

/// Chunking limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum distinct groups per table
    #[serde(default = "default_max_groups")]
    pub max_groups: usize,

    /// Maximum raw rows attached to each chunk
    #[serde(default = "default_max_sample_records")]
    pub max_sample_records: usize,
}

fn default_max_groups() -> usize {
    10
}

fn default_max_sample_records() -> usize {
    100
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_groups: default_max_groups(),
            max_sample_records: default_max_sample_records(),
        }
    }
}

/// A searchable summary of one municipality in one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub group_key: String,
    pub kind: DatasetKind,
    pub sample_records: Vec<serde_json::Value>,
}

/// Build chunks for every present table, historical first.
pub fn build_chunks(datasets: &Datasets, config: &ChunkConfig) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = datasets
        .tables()
        .flat_map(|(kind, table)| chunks_for_table(kind, table, config))
        .collect();

    tracing::info!("Built {} chunks", chunks.len());
    chunks
}

fn chunks_for_table(kind: DatasetKind, table: &Table, config: &ChunkConfig) -> Vec<Chunk> {
    let Some(group_col) = table.schema().group_column else {
        tracing::warn!(
            "{} table has no municipality column, no chunks built",
            kind.as_str()
        );
        return Vec::new();
    };

    group_rows(table, group_col, config.max_groups)
        .into_iter()
        .map(|(group_key, rows)| Chunk {
            text: chunk_text(kind, table, &group_key, &rows),
            sample_records: rows
                .iter()
                .take(config.max_sample_records)
                .map(|&row| table.record(row))
                .collect(),
            group_key,
            kind,
        })
        .collect()
}

/// Distinct non-empty group values in first-seen order, capped at `limit`,
/// each with its row indices in table order.
fn group_rows(table: &Table, col: usize, limit: usize) -> Vec<(String, Vec<usize>)> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();

    for row in 0..table.len() {
        let key = table.cell(row, col);
        if key.is_empty() {
            continue;
        }
        match position.get(key) {
            Some(&i) => groups[i].1.push(row),
            None if groups.len() < limit => {
                position.insert(key, groups.len());
                groups.push((key.to_string(), vec![row]));
            }
            None => {}
        }
    }

    groups
}

fn chunk_text(kind: DatasetKind, table: &Table, group_key: &str, rows: &[usize]) -> String {
    let schema = table.schema();
    let mut text = match kind {
        DatasetKind::Historical => format!(
            "Municipality: {}. Total records: {}.",
            group_key,
            rows.len()
        ),
        DatasetKind::Prediction => format!(
            "Predictions for {}. Total: {} predictions.",
            group_key,
            rows.len()
        ),
    };

    if let Some(col) = schema.crime_type_column {
        let top: Vec<String> = table
            .value_counts(col, rows)
            .into_iter()
            .take(TOP_CRIME_TYPES)
            .map(|(value, count)| format!("{}: {}", value, count))
            .collect();
        if !top.is_empty() {
            text.push_str(&format!(" Top crimes: {}.", top.join(", ")));
        }
    }

    if kind == DatasetKind::Prediction {
        if let Some(col) = schema.risk_level_column {
            let high = rows
                .iter()
                .filter(|&&row| is_high_risk(table.cell(row, col)))
                .count();
            text.push_str(&format!(" High-risk zones: {}.", high));
        }
    }

    text
}

fn is_high_risk(value: &str) -> bool {
    let value = value.trim();
    HIGH_RISK_VALUES
        .iter()
        .any(|high| value.eq_ignore_ascii_case(high))
}
