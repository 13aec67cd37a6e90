//! Human-readable reports on the loaded data.
//!
//! `render_summary` is the short status block shown to users;
//! `DatasetOverview` is the detailed per-table profile.

use crate::dataset::{parse_temporal, ColumnKind, DatasetKind, Datasets, Table};
use chrono::NaiveDate;
use serde::Serialize;

const MAX_NUMERIC_COLUMNS: usize = 5;
const MAX_CATEGORICAL_COLUMNS: usize = 3;
const TOP_VALUES: usize = 5;

/// Record counts captured when the snapshot was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub historical_records: Option<usize>,
    pub municipalities: Option<usize>,
    pub prediction_records: Option<usize>,
}

impl DatasetStats {
    pub fn from_datasets(datasets: &Datasets) -> Self {
        let historical = datasets.historical.as_ref();
        Self {
            historical_records: historical.map(Table::len),
            municipalities: historical.and_then(|t| {
                t.schema()
                    .group_column
                    .map(|col| t.distinct_count(col))
            }),
            prediction_records: datasets.predictions.as_ref().map(Table::len),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.historical_records.is_none() && self.prediction_records.is_none()
    }
}

/// Render the status block.
pub fn render_summary(stats: &DatasetStats, chunk_count: usize, index_ready: bool) -> String {
    let mut lines = vec!["DATA SUMMARY:".to_string(), String::new()];

    if stats.is_empty() {
        lines.push("No data loaded.".to_string());
    } else {
        if let Some(n) = stats.historical_records {
            lines.push(format!("• Historical data: {} records", format_thousands(n)));
        }
        if let Some(n) = stats.municipalities {
            lines.push(format!("• Municipalities with data: {}", format_thousands(n)));
        }
        if let Some(n) = stats.prediction_records {
            lines.push(format!("• Predictions: {} records", format_thousands(n)));
        }
    }

    lines.push(String::new());
    lines.push(format!("• Indexed chunks: {}", format_thousands(chunk_count)));
    lines.push(format!(
        "• Retrieval index: {}",
        if index_ready { "Ready" } else { "Not ready" }
    ));

    lines.join("\n")
}

/// Format an integer with comma thousands separators.
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// First and last date found in a table's date column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub column: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopValues {
    pub column: String,
    pub values: Vec<(String, usize)>,
}

/// Detailed profile of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetOverview {
    pub kind: DatasetKind,
    pub records: usize,
    pub columns: Vec<String>,
    pub date_range: Option<DateRange>,
    pub numeric_stats: Vec<NumericStats>,
    pub top_values: Vec<TopValues>,
}

impl DatasetOverview {
    pub fn from_table(kind: DatasetKind, table: &Table) -> Self {
        let headers = table.headers();
        let columns_of = |wanted: ColumnKind| {
            (0..headers.len()).filter(move |&col| table.column_kind(col) == Some(wanted))
        };

        let numeric_stats = columns_of(ColumnKind::Numeric)
            .take(MAX_NUMERIC_COLUMNS)
            .filter_map(|col| numeric_stats(table, col))
            .collect();

        let all_rows: Vec<usize> = (0..table.len()).collect();
        let top_values = columns_of(ColumnKind::Categorical)
            .take(MAX_CATEGORICAL_COLUMNS)
            .map(|col| TopValues {
                column: headers[col].clone(),
                values: table
                    .value_counts(col, &all_rows)
                    .into_iter()
                    .take(TOP_VALUES)
                    .collect(),
            })
            .collect();

        Self {
            kind,
            records: table.len(),
            columns: headers.to_vec(),
            date_range: table
                .schema()
                .date_column
                .and_then(|col| date_range(table, col)),
            numeric_stats,
            top_values,
        }
    }
}

/// Profiles of every present table, historical first.
pub fn build_overview(datasets: &Datasets) -> Vec<DatasetOverview> {
    datasets
        .tables()
        .map(|(kind, table)| DatasetOverview::from_table(kind, table))
        .collect()
}

fn date_range(table: &Table, col: usize) -> Option<DateRange> {
    let mut dates = table
        .column_values(col)
        .filter_map(parse_temporal)
        .map(|dt| dt.date());
    let first = dates.next()?;
    let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateRange { start, end })
}

fn numeric_stats(table: &Table, col: usize) -> Option<NumericStats> {
    let values: Vec<f64> = table
        .column_values(col)
        .filter_map(|v| v.parse::<f64>().ok())
        .collect();
    if values.is_empty() {
        return None;
    }

    let sum: f64 = values.iter().sum();
    Some(NumericStats {
        column: table.headers()[col].clone(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean: sum / values.len() as f64,
        sum,
    })
}

/// Render overviews as plain text.
pub fn render_overview(overviews: &[DatasetOverview]) -> String {
    if overviews.is_empty() {
        return "No data loaded.".to_string();
    }

    let mut sections = Vec::new();
    for overview in overviews {
        let title = match overview.kind {
            DatasetKind::Historical => "HISTORICAL DATA",
            DatasetKind::Prediction => "PREDICTIONS",
        };
        let mut lines = vec![
            format!("{}:", title),
            format!("• Records: {}", format_thousands(overview.records)),
            format!("• Columns: {}", overview.columns.join(", ")),
        ];

        if let Some(range) = &overview.date_range {
            lines.push(format!("• Date range: {} to {}", range.start, range.end));
        }
        for stats in &overview.numeric_stats {
            lines.push(format!(
                "• {}: min {}, max {}, mean {}, sum {}",
                stats.column,
                format_number(stats.min),
                format_number(stats.max),
                format_number(stats.mean),
                format_number(stats.sum)
            ));
        }
        for top in &overview.top_values {
            let values: Vec<String> = top
                .values
                .iter()
                .map(|(v, c)| format!("{} ({})", v, c))
                .collect();
            lines.push(format!("• Top {}: {}", top.column, values.join(", ")));
        }

        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datasets() -> Datasets {
        let historical = "\
municipio,tipo_delito,fecha,cantidad
Bucaramanga,hurto,2024-03-01,2
Giron,hurto,2024-01-15,1
Bucaramanga,lesiones,2024-02-10,3
";
        let predictions = "municipio,riesgo\nGiron,alto\n";
        Datasets {
            historical: Some(Table::from_reader(historical.as_bytes()).unwrap()),
            predictions: Some(Table::from_reader(predictions.as_bytes()).unwrap()),
        }
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1234), "1,234");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_render_summary() {
        let stats = DatasetStats {
            historical_records: Some(1234),
            municipalities: Some(12),
            prediction_records: Some(56),
        };

        assert_eq!(
            render_summary(&stats, 14, true),
            "DATA SUMMARY:\n\n\
             • Historical data: 1,234 records\n\
             • Municipalities with data: 12\n\
             • Predictions: 56 records\n\n\
             • Indexed chunks: 14\n\
             • Retrieval index: Ready"
        );
    }

    #[test]
    fn test_render_summary_no_data() {
        let summary = render_summary(&DatasetStats::default(), 0, false);
        assert!(summary.contains("No data loaded."));
        assert!(summary.contains("• Indexed chunks: 0"));
        assert!(summary.contains("• Retrieval index: Not ready"));
        assert!(!summary.contains("Historical data"));
    }

    #[test]
    fn test_stats_from_datasets() {
        let stats = DatasetStats::from_datasets(&datasets());
        assert_eq!(stats.historical_records, Some(3));
        assert_eq!(stats.municipalities, Some(2));
        assert_eq!(stats.prediction_records, Some(1));
    }

    #[test]
    fn test_overview() {
        let overviews = build_overview(&datasets());
        assert_eq!(overviews.len(), 2);

        let historical = &overviews[0];
        assert_eq!(historical.kind, DatasetKind::Historical);
        assert_eq!(historical.records, 3);
        assert_eq!(
            historical.date_range,
            Some(DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            })
        );

        let cantidad = &historical.numeric_stats[0];
        assert_eq!(cantidad.column, "cantidad");
        assert_eq!(cantidad.min, 1.0);
        assert_eq!(cantidad.max, 3.0);
        assert_eq!(cantidad.sum, 6.0);
        assert_eq!(cantidad.mean, 2.0);

        // fecha is temporal, so only municipio and tipo_delito are profiled
        assert_eq!(historical.top_values.len(), 2);
        assert_eq!(
            historical.top_values[0].values[0],
            ("Bucaramanga".to_string(), 2)
        );
    }

    #[test]
    fn test_render_overview() {
        let text = render_overview(&build_overview(&datasets()));
        assert!(text.starts_with("HISTORICAL DATA:\n• Records: 3"));
        assert!(text.contains("• Date range: 2024-01-15 to 2024-03-01"));
        assert!(text.contains("• cantidad: min 1, max 3, mean 2, sum 6"));
        assert!(text.contains("• Top municipio: Bucaramanga (2), Giron (1)"));
        assert!(text.contains("PREDICTIONS:\n• Records: 1"));
    }

    #[test]
    fn test_render_overview_empty() {
        assert_eq!(render_overview(&[]), "No data loaded.");
    }
}
