//! Typed Table - In-memory tabular data with a native type tag per column
//!
//! Tables are produced by the file readers in [`reader`] and consumed by the
//! materialization layer. Columns are position-aligned: every column holds
//! exactly `row_count` values, any of which may be [`CellValue::Null`].

pub mod reader;

pub use reader::{read_table, SourceFormat};

use crate::error::{LoadError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a column's values before any target mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeType {
    Integer,
    Float,
    Boolean,
    Temporal,
    Text,
    Composite,
}

impl NativeType {
    pub const ALL: [NativeType; 6] = [
        NativeType::Integer,
        NativeType::Float,
        NativeType::Boolean,
        NativeType::Temporal,
        NativeType::Text,
        NativeType::Composite,
    ];
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeType::Integer => "integer",
            NativeType::Float => "float",
            NativeType::Boolean => "boolean",
            NativeType::Temporal => "temporal",
            NativeType::Text => "text",
            NativeType::Composite => "composite",
        };
        f.write_str(name)
    }
}

/// A single cell. Values normally match their column's tag, but readers may
/// hand over anything; the encoder copes with mismatches.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Temporal(NaiveDateTime),
    Text(String),
    /// Nested sequences and mappings
    Composite(serde_json::Value),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Boolean(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(v: NaiveDateTime) -> Self {
        CellValue::Temporal(v)
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => CellValue::Null,
            other => CellValue::Composite(other),
        }
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}

/// A named column with its native type tag and values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub native_type: NativeType,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, native_type: NativeType, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            native_type,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered columns sharing one row count
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedTable {
    columns: Vec<Column>,
    row_count: usize,
}

impl TypedTable {
    /// Build a table, rejecting columns of unequal length
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(LoadError::InvalidTable(format!(
                "column '{}' has {} values, expected {}",
                bad.name,
                bad.len(),
                row_count
            )));
        }
        Ok(Self { columns, row_count })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Cells of one row in column order, paired with their column's tag.
    ///
    /// Panics if `row` is out of range.
    pub fn cells(&self, row: usize) -> impl Iterator<Item = (&CellValue, NativeType)> + '_ {
        assert!(row < self.row_count, "row {} out of range", row);
        self.columns
            .iter()
            .map(move |c| (&c.values[row], c.native_type))
    }
}

/// Parse the date and date-time spellings found in exported data
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Canonical `YYYY-MM-DD HH:MM:SS[.ffffff]` rendering
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ragged_columns() {
        let err = TypedTable::new(vec![
            Column::new("a", NativeType::Integer, vec![1i64.into(), 2i64.into()]),
            Column::new("b", NativeType::Text, vec!["x".into()]),
        ])
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidTable(_)));
    }

    #[test]
    fn test_cells_follow_column_order() {
        let table = TypedTable::new(vec![
            Column::new("id", NativeType::Integer, vec![7i64.into()]),
            Column::new("name", NativeType::Text, vec![CellValue::Null]),
        ])
        .unwrap();

        let cells: Vec<_> = table.cells(0).collect();
        assert_eq!(cells[0], (&CellValue::Integer(7), NativeType::Integer));
        assert_eq!(cells[1], (&CellValue::Null, NativeType::Text));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_empty_table_has_no_rows() {
        let table = TypedTable::new(vec![]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-09 14:05:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09T14:05:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09T14:05:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09T16:05:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-09"),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("next tuesday"), None);
    }

    #[test]
    fn test_format_timestamp_keeps_micros_only_when_present() {
        let whole = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(format_timestamp(&whole), "2023-01-02 03:04:05");

        let fractional = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_micro_opt(3, 4, 5, 120)
            .unwrap();
        assert_eq!(format_timestamp(&fractional), "2023-01-02 03:04:05.000120");
    }
}
