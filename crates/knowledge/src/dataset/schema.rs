//! Column capability probe.
//!
//! Resolves the semantic columns (group key, crime type, risk level, date)
//! from a table's headers once at load time. Downstream code asks the schema
//! instead of looking columns up by name.

use super::ColumnKind;
use serde::Serialize;

const GROUP_ALIASES: &[&str] = &["municipio", "municipality"];
const CRIME_TYPE_ALIASES: &[&str] = &["tipo_delito", "crime_type", "delito"];
const RISK_LEVEL_ALIASES: &[&str] = &["riesgo", "risk_level", "risk"];
const DATE_ALIASES: &[&str] = &["fecha", "date", "fecha_hecho"];

/// Positions of the semantic columns in a table, if present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub group_column: Option<usize>,
    pub crime_type_column: Option<usize>,
    pub risk_level_column: Option<usize>,
    pub date_column: Option<usize>,
}

impl TableSchema {
    /// Probe headers for the known aliases.
    ///
    /// Matching ignores case, surrounding whitespace and space/underscore
    /// differences. If no date alias is found, the first temporal column is used.
    pub fn probe(headers: &[String], kinds: &[ColumnKind]) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let find = |aliases: &[&str]| {
            normalized
                .iter()
                .position(|h| aliases.contains(&h.as_str()))
        };

        let date_column = find(DATE_ALIASES).or_else(|| {
            kinds
                .iter()
                .position(|kind| *kind == ColumnKind::Temporal)
        });

        Self {
            group_column: find(GROUP_ALIASES),
            crime_type_column: find(CRIME_TYPE_ALIASES),
            risk_level_column: find(RISK_LEVEL_ALIASES),
            date_column,
        }
    }

    pub fn has_group_key(&self) -> bool {
        self.group_column.is_some()
    }

    pub fn has_crime_type(&self) -> bool {
        self.crime_type_column.is_some()
    }

    pub fn has_risk_level(&self) -> bool {
        self.risk_level_column.is_some()
    }

    pub fn has_date(&self) -> bool {
        self.date_column.is_some()
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_probe_spanish_headers() {
        let h = headers(&["municipio", "tipo_delito", "riesgo", "fecha"]);
        let kinds = vec![ColumnKind::Categorical; 4];
        let schema = TableSchema::probe(&h, &kinds);

        assert_eq!(schema.group_column, Some(0));
        assert_eq!(schema.crime_type_column, Some(1));
        assert_eq!(schema.risk_level_column, Some(2));
        assert_eq!(schema.date_column, Some(3));
    }

    #[test]
    fn test_probe_english_aliases_case_insensitive() {
        let h = headers(&["Crime Type", "Municipality", "RISK_LEVEL"]);
        let kinds = vec![ColumnKind::Categorical; 3];
        let schema = TableSchema::probe(&h, &kinds);

        assert_eq!(schema.group_column, Some(1));
        assert_eq!(schema.crime_type_column, Some(0));
        assert_eq!(schema.risk_level_column, Some(2));
        assert!(!schema.has_date());
    }

    #[test]
    fn test_date_falls_back_to_temporal_column() {
        let h = headers(&["municipio", "reported_at"]);
        let kinds = vec![ColumnKind::Categorical, ColumnKind::Temporal];
        let schema = TableSchema::probe(&h, &kinds);
        assert_eq!(schema.date_column, Some(1));
    }

    #[test]
    fn test_missing_group_column() {
        let h = headers(&["departamento", "total"]);
        let kinds = vec![ColumnKind::Categorical, ColumnKind::Numeric];
        let schema = TableSchema::probe(&h, &kinds);
        assert!(!schema.has_group_key());
        assert!(!schema.has_crime_type());
        assert!(!schema.has_risk_level());
    }
}
