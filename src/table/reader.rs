//! File Reader - Loads staged files into a [`TypedTable`] through Polars
//!
//! Supported inputs:
//! - `.parquet` columnar snapshots
//! - `.json` files holding a single array of records
//! - `.jsonl` / `.ndjson` line-delimited records
//! - `.csv` delimited text with a header row

use super::{parse_timestamp, CellValue, Column, NativeType, TypedTable};
use crate::error::{LoadError, Result};
use chrono::DateTime;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// File formats the reader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Parquet,
    Json,
    JsonLines,
    Csv,
}

impl SourceFormat {
    /// Detect the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "parquet" => Some(SourceFormat::Parquet),
            "json" => Some(SourceFormat::Json),
            "jsonl" | "ndjson" => Some(SourceFormat::JsonLines),
            "csv" => Some(SourceFormat::Csv),
            _ => None,
        }
    }
}

/// Read a staged file into a typed table
pub fn read_table(path: &Path) -> Result<TypedTable> {
    let format = SourceFormat::from_path(path)
        .ok_or_else(|| LoadError::UnsupportedFormat(path.display().to_string()))?;
    let frame = read_frame(path, format)?;
    debug!(
        "Read {} ({:?}): {} rows x {} columns",
        path.display(),
        format,
        frame.height(),
        frame.width()
    );

    let mut table = frame_to_table(&frame)?;
    if matches!(format, SourceFormat::Json | SourceFormat::JsonLines) {
        table = promote_date_like_columns(table);
    }
    Ok(table)
}

fn read_frame(path: &Path, format: SourceFormat) -> Result<DataFrame> {
    let frame = match format {
        SourceFormat::Parquet => ParquetReader::new(File::open(path)?).finish()?,
        SourceFormat::Json => JsonReader::new(File::open(path)?).finish()?,
        SourceFormat::JsonLines => LazyJsonLineReader::new(path).finish()?.collect()?,
        SourceFormat::Csv => LazyCsvReader::new(path)
            .with_has_header(true)
            .with_try_parse_dates(true)
            .finish()?
            .collect()?,
    };
    Ok(frame)
}

/// Convert every Polars series into a tagged column
pub fn frame_to_table(frame: &DataFrame) -> Result<TypedTable> {
    let columns = frame
        .get_columns()
        .iter()
        .map(series_to_column)
        .collect::<Result<Vec<_>>>()?;
    TypedTable::new(columns)
}

/// Native tag for a Polars dtype. Anything unfamiliar is text.
pub fn native_type_of(dtype: &DataType) -> NativeType {
    match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => NativeType::Integer,
        DataType::Float32 | DataType::Float64 => NativeType::Float,
        DataType::Boolean => NativeType::Boolean,
        DataType::Date | DataType::Datetime(_, _) => NativeType::Temporal,
        DataType::List(_) | DataType::Struct(_) => NativeType::Composite,
        _ => NativeType::Text,
    }
}

fn series_to_column(series: &Series) -> Result<Column> {
    let declared = native_type_of(series.dtype());
    let mut native_type = declared;
    let values = match declared {
        // Unsigned values past i64::MAX keep their digits as text
        NativeType::Integer => match series.strict_cast(&DataType::Int64) {
            Ok(ints) => ints
                .i64()?
                .into_iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::Integer))
                .collect(),
            Err(_) => {
                debug!(
                    "Column '{}' ({}) does not fit BIGINT, loading as text",
                    series.name(),
                    series.dtype()
                );
                native_type = NativeType::Text;
                text_values(series)?
            }
        },
        NativeType::Float if series.dtype() == &DataType::Float32 => float32_values(series)?,
        NativeType::Float => {
            let floats = series.cast(&DataType::Float64)?;
            floats
                .f64()?
                .into_iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::Float))
                .collect()
        }
        NativeType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(CellValue::Null, CellValue::Boolean))
            .collect(),
        NativeType::Temporal => temporal_values(series)?,
        NativeType::Composite => composite_values(series)?,
        NativeType::Text => text_values(series)?,
    };
    Ok(Column::new(series.name(), native_type, values))
}

/// Widened through the f32's shortest decimal form, so 0.1f32 stays 0.1
/// rather than 0.10000000149011612.
fn float32_values(series: &Series) -> Result<Vec<CellValue>> {
    let values = series
        .f32()?
        .into_iter()
        .map(|v| {
            v.map_or(CellValue::Null, |f| {
                CellValue::Float(f.to_string().parse::<f64>().unwrap_or(f as f64))
            })
        })
        .collect();
    Ok(values)
}

fn temporal_values(series: &Series) -> Result<Vec<CellValue>> {
    let micros = series
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        .cast(&DataType::Int64)?;
    let values = micros
        .i64()?
        .into_iter()
        .map(|v| {
            v.and_then(DateTime::from_timestamp_micros)
                .map(|dt| CellValue::Temporal(dt.naive_utc()))
                .unwrap_or(CellValue::Null)
        })
        .collect();
    Ok(values)
}

/// Nested values go through Polars' own JSON writer, one line per row,
/// so lists and structs keep their shape.
fn composite_values(series: &Series) -> Result<Vec<CellValue>> {
    let name = series.name().to_string();
    let mut frame = DataFrame::new(vec![series.clone()])?;
    let mut buffer = Vec::new();
    JsonWriter::new(&mut buffer)
        .with_json_format(JsonFormat::JsonLines)
        .finish(&mut frame)?;

    let text = String::from_utf8_lossy(&buffer);
    let mut values = Vec::with_capacity(series.len());
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let mut record: serde_json::Value = serde_json::from_str(line)?;
        let cell = record
            .get_mut(&name)
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);
        values.push(CellValue::from(cell));
    }

    if values.len() != series.len() {
        return Err(LoadError::InvalidTable(format!(
            "column '{}' serialized {} of {} rows",
            name,
            values.len(),
            series.len()
        )));
    }
    Ok(values)
}

fn text_values(series: &Series) -> Result<Vec<CellValue>> {
    if let Ok(strings) = series.cast(&DataType::String) {
        if let Ok(ca) = strings.str() {
            return Ok(ca
                .into_iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::from))
                .collect());
        }
    }

    // Dtypes without a string cast fall back to their display form
    (0..series.len())
        .map(|i| {
            let value = series.get(i)?;
            Ok(match value {
                AnyValue::Null => CellValue::Null,
                other => CellValue::Text(other.to_string()),
            })
        })
        .collect()
}

fn is_date_like_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with("_at")
        || lower.ends_with("_time")
        || lower.starts_with("timestamp")
        || lower == "modified"
        || lower == "date"
}

/// JSON has no date type, so text columns named like timestamps are
/// promoted when every present value parses.
fn promote_date_like_columns(table: TypedTable) -> TypedTable {
    let columns: Vec<Column> = table
        .columns()
        .iter()
        .cloned()
        .map(|column| {
            if column.native_type != NativeType::Text || !is_date_like_name(&column.name) {
                return column;
            }
            let parsed: Option<Vec<CellValue>> = column
                .values
                .iter()
                .map(|v| match v {
                    CellValue::Null => Some(CellValue::Null),
                    CellValue::Text(s) => parse_timestamp(s).map(CellValue::Temporal),
                    _ => None,
                })
                .collect();
            match parsed {
                Some(values) => {
                    debug!("Promoting date-like column '{}' to temporal", column.name);
                    Column::new(column.name, NativeType::Temporal, values)
                }
                None => column,
            }
        })
        .collect();
    // Lengths are unchanged, so this cannot fail
    TypedTable::new(columns).unwrap_or(table)
}
