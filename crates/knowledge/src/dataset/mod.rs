//! Source table loading.
//!
//! Reads the historical and prediction CSV tables from the data directory.
//! Missing files are normal control flow (`None`), parse failures are
//! `AppError::Data`.

pub mod schema;

pub use schema::TableSchema;

use chrono::{NaiveDate, NaiveDateTime};
use crimestat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Which of the two source tables a row or chunk comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Historical,
    Prediction,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Historical => "historical",
            DatasetKind::Prediction => "prediction",
        }
    }
}

/// Inferred type of a column, decided from its non-empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Categorical,
}

/// File names of the two tables inside the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFiles {
    #[serde(default = "default_historical_file")]
    pub historical: String,

    #[serde(default = "default_predictions_file")]
    pub predictions: String,
}

fn default_historical_file() -> String {
    "historicos.csv".to_string()
}

fn default_predictions_file() -> String {
    "predicciones.csv".to_string()
}

impl Default for DatasetFiles {
    fn default() -> Self {
        Self {
            historical: default_historical_file(),
            predictions: default_predictions_file(),
        }
    }
}

/// An in-memory table: raw string cells plus per-column kinds and the schema probe.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    kinds: Vec<ColumnKind>,
    schema: TableSchema,
}

impl Table {
    /// Build a table from headers and rows. Every row must have `headers.len()` cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> AppResult<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != headers.len())
        {
            return Err(AppError::Data(format!(
                "Row {} has {} fields, expected {}",
                i + 1,
                row.len(),
                headers.len()
            )));
        }

        let kinds = (0..headers.len())
            .map(|col| infer_kind(rows.iter().map(|r| r[col].as_str())))
            .collect::<Vec<_>>();
        let schema = TableSchema::probe(&headers, &kinds);

        Ok(Self {
            headers,
            rows,
            kinds,
            schema,
        })
    }

    /// Parse CSV content with a header row.
    pub fn from_reader<R: Read>(reader: R) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::Data(format!("Failed to read header row: {}", e)))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| AppError::Data(format!("Malformed CSV: {}", e)))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::new(headers, rows)
    }

    /// Parse a CSV file.
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| AppError::Data(format!("Failed to open {:?}: {}", path, e)))?;
        Self::from_reader(file).map_err(|e| match e {
            AppError::Data(msg) => AppError::Data(format!("{:?}: {}", path, msg)),
            other => other,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn column_kind(&self, col: usize) -> Option<ColumnKind> {
        self.kinds.get(col).copied()
    }

    /// Cell text; empty string when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Non-empty values of a column, in row order.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .filter_map(move |r| r.get(col))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Number of distinct non-empty values in a column.
    pub fn distinct_count(&self, col: usize) -> usize {
        self.column_values(col).collect::<HashSet<_>>().len()
    }

    /// Value frequencies over the given rows, most frequent first.
    ///
    /// Empty cells are not counted. Equal counts keep first-encountered order.
    pub fn value_counts(&self, col: usize, rows: &[usize]) -> Vec<(String, usize)> {
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(String, usize)> = Vec::new();

        for &row in rows {
            let value = self.cell(row, col);
            if value.is_empty() {
                continue;
            }
            match position.get(value) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    position.insert(value, counts.len());
                    counts.push((value.to_string(), 1));
                }
            }
        }

        // Stable sort keeps first-seen order among ties
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Snapshot of a row as a JSON object keyed by header.
    ///
    /// Numeric cells become numbers and empty cells become `null`.
    pub fn record(&self, row: usize) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (col, header) in self.headers.iter().enumerate() {
            let raw = self.cell(row, col);
            let value = if raw.is_empty() {
                serde_json::Value::Null
            } else if self.kinds[col] == ColumnKind::Numeric {
                numeric_value(raw)
            } else {
                serde_json::Value::String(raw.to_string())
            };
            object.insert(header.clone(), value);
        }
        serde_json::Value::Object(object)
    }
}

/// The two optional source tables.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub historical: Option<Table>,
    pub predictions: Option<Table>,
}

impl Datasets {
    /// No tables loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Present tables, historical first.
    pub fn tables(&self) -> impl Iterator<Item = (DatasetKind, &Table)> + '_ {
        self.historical
            .iter()
            .map(|t| (DatasetKind::Historical, t))
            .chain(
                self.predictions
                    .iter()
                    .map(|t| (DatasetKind::Prediction, t)),
            )
    }

    pub fn is_empty(&self) -> bool {
        self.historical.is_none() && self.predictions.is_none()
    }
}

/// Load both tables from `dir`.
///
/// A missing directory or file leaves that table as `None`. Any parse
/// failure aborts the whole load with `AppError::Data`.
pub fn load_datasets(dir: &Path, files: &DatasetFiles) -> AppResult<Datasets> {
    if !dir.is_dir() {
        tracing::warn!("Data directory {:?} not found, no tables loaded", dir);
        return Ok(Datasets::empty());
    }

    let historical = load_table(&dir.join(&files.historical))?;
    if let Some(ref table) = historical {
        tracing::info!("Historical table: {} records", table.len());
    }

    let predictions = load_table(&dir.join(&files.predictions))?;
    if let Some(ref table) = predictions {
        tracing::info!("Predictions table: {} records", table.len());
    }

    Ok(Datasets {
        historical,
        predictions,
    })
}

fn load_table(path: &Path) -> AppResult<Option<Table>> {
    if !path.is_file() {
        tracing::info!("Table {:?} not found, skipping", path);
        return Ok(None);
    }

    let table = Table::from_path(path)?;
    tracing::debug!(
        "Loaded {:?}: {} rows, columns {:?}, schema {:?}",
        path,
        table.len(),
        table.headers(),
        table.schema()
    );
    Ok(Some(table))
}

/// Parse a date or datetime cell in the formats the source tables use.
pub fn parse_temporal(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

    let value = value.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut seen = false;
    let mut numeric = true;
    let mut temporal = true;

    for value in values.filter(|v| !v.is_empty()) {
        seen = true;
        numeric = numeric && value.parse::<f64>().map(f64::is_finite).unwrap_or(false);
        temporal = temporal && parse_temporal(value).is_some();
        if !numeric && !temporal {
            break;
        }
    }

    match (seen, numeric, temporal) {
        (true, true, _) => ColumnKind::Numeric,
        (true, false, true) => ColumnKind::Temporal,
        _ => ColumnKind::Categorical,
    }
}

fn numeric_value(raw: &str) -> serde_json::Value {
    if let Ok(int) = raw.parse::<i64>() {
        return serde_json::Value::from(int);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HISTORICAL: &str = "\
municipio,tipo_delito,fecha,cantidad
Bucaramanga,hurto,2024-01-03,2
Bucaramanga,lesiones,2024-02-10,1
Giron,hurto,2024-03-15,
Bucaramanga,hurto,2024-03-20,4
";

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_column_kind_inference() {
        let t = table(HISTORICAL);
        assert_eq!(t.column_kind(0), Some(ColumnKind::Categorical));
        assert_eq!(t.column_kind(2), Some(ColumnKind::Temporal));
        assert_eq!(t.column_kind(3), Some(ColumnKind::Numeric));
    }

    #[test]
    fn test_value_counts_order() {
        let t = table(HISTORICAL);
        let rows: Vec<usize> = (0..t.len()).collect();
        let counts = t.value_counts(1, &rows);
        assert_eq!(
            counts,
            vec![("hurto".to_string(), 3), ("lesiones".to_string(), 1)]
        );
    }

    #[test]
    fn test_value_counts_tie_keeps_first_seen() {
        let t = table("municipio,tipo_delito\nA,robo\nA,estafa\nA,estafa\nA,robo\nA,amenazas\n");
        let counts = t.value_counts(1, &[0, 1, 2, 3, 4]);
        let names: Vec<&str> = counts.iter().map(|(v, _)| v.as_str()).collect();
        assert_eq!(names, vec!["robo", "estafa", "amenazas"]);
    }

    #[test]
    fn test_record_snapshot_types() {
        let t = table(HISTORICAL);
        let record = t.record(2);
        assert_eq!(record["municipio"], "Giron");
        assert!(record["cantidad"].is_null());

        let record = t.record(0);
        assert_eq!(record["cantidad"], 2);
        assert_eq!(record["fecha"], "2024-01-03");
    }

    #[test]
    fn test_distinct_count() {
        let t = table(HISTORICAL);
        assert_eq!(t.distinct_count(0), 2);
    }

    #[test]
    fn test_ragged_row_is_data_error() {
        let result = Table::from_reader("municipio,tipo_delito\nA,robo,extra\n".as_bytes());
        assert!(matches!(result, Err(AppError::Data(_))));
    }

    #[test]
    fn test_bom_stripped_from_header() {
        let t = table("\u{feff}municipio,riesgo\nA,alto\n");
        assert_eq!(t.headers()[0], "municipio");
        assert!(t.schema().has_group_key());
    }

    #[test]
    fn test_load_missing_directory() {
        let temp = TempDir::new().unwrap();
        let datasets =
            load_datasets(&temp.path().join("nope"), &DatasetFiles::default()).unwrap();
        assert!(datasets.is_empty());
    }

    #[test]
    fn test_load_empty_directory() {
        let temp = TempDir::new().unwrap();
        let datasets = load_datasets(temp.path(), &DatasetFiles::default()).unwrap();
        assert!(datasets.historical.is_none());
        assert!(datasets.predictions.is_none());
        assert!(datasets.is_empty());
    }

    #[test]
    fn test_load_partial() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("historicos.csv"), HISTORICAL).unwrap();

        let datasets = load_datasets(temp.path(), &DatasetFiles::default()).unwrap();
        assert_eq!(datasets.historical.as_ref().map(Table::len), Some(4));
        assert!(datasets.predictions.is_none());
        assert_eq!(datasets.tables().count(), 1);
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("historicos.csv"), HISTORICAL).unwrap();
        std::fs::write(
            temp.path().join("predicciones.csv"),
            "municipio,riesgo\nA,alto,extra\n",
        )
        .unwrap();

        let result = load_datasets(temp.path(), &DatasetFiles::default());
        assert!(matches!(result, Err(AppError::Data(_))));
    }

    #[test]
    fn test_parse_temporal_formats() {
        assert!(parse_temporal("2024-05-01").is_some());
        assert!(parse_temporal("01/05/2024").is_some());
        assert!(parse_temporal("2024-05-01 13:45:00").is_some());
        assert!(parse_temporal("Bucaramanga").is_none());
    }
}
