//! Catalog - Target table names and discovery of source files
//!
//! Target names are dotted identifiers written into DDL/DML unquoted, so
//! they are validated once here and carried as [`TableTarget`] afterwards.

use crate::error::{LoadError, Result};
use crate::table::SourceFormat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

fn target_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .unwrap_or_else(|e| panic!("invalid target pattern: {}", e))
    })
}

/// Fully qualified name of a table in the remote engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableTarget(String);

impl TableTarget {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if target_pattern().is_match(&name) {
            Ok(Self(name))
        } else {
            Err(LoadError::InvalidTarget(name))
        }
    }

    /// `{namespace}.{table}`
    pub fn in_namespace(namespace: &str, table: &str) -> Result<Self> {
        Self::new(format!("{}.{}", namespace.trim_end_matches('.'), table))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last dotted segment
    pub fn table_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TableTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TableTarget {
    type Error = LoadError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TableTarget> for String {
    fn from(target: TableTarget) -> Self {
        target.0
    }
}

/// A readable file in the data folder and the table it loads into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub target: TableTarget,
}

impl SourceFile {
    /// File name without extension
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

/// Lower-case, with every character outside `[a-z0-9_]` replaced by `_`.
/// A leading digit gets a `_` prefix so the result is a valid identifier.
pub fn sanitize_table_name(stem: &str) -> String {
    let mut name: String = stem
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// List supported files directly under `dir`, sorted by path
pub fn discover_sources(dir: &Path, namespace: &str) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            debug!("Skipping directory {}", path.display());
            continue;
        }

        let Some(format) = SourceFormat::from_path(&path) else {
            warn!("Skipping {}: unsupported file type", path.display());
            continue;
        };

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(sanitize_table_name)
            .unwrap_or_default();
        if stem.is_empty() {
            warn!("Skipping {}: no usable table name", path.display());
            continue;
        }

        let target = TableTarget::in_namespace(namespace, &stem)?;
        sources.push(SourceFile {
            path,
            format,
            target,
        });
    }

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_target_validation() {
        assert!(TableTarget::new("catalog.bronze.orders").is_ok());
        assert!(TableTarget::new("_t").is_ok());
        assert!(TableTarget::new("catalog..orders").is_err());
        assert!(TableTarget::new("orders; DROP TABLE x").is_err());
        assert!(TableTarget::new("1orders").is_err());
        assert!(TableTarget::new("").is_err());

        let target = TableTarget::in_namespace("catalog.bronze.", "orders").unwrap();
        assert_eq!(target.as_str(), "catalog.bronze.orders");
        assert_eq!(target.table_name(), "orders");
    }

    #[test]
    fn test_sanitize_table_name() {
        assert_eq!(sanitize_table_name("Sales Orders-2024"), "sales_orders_2024");
        assert_eq!(sanitize_table_name("2024_events"), "_2024_events");
        assert_eq!(sanitize_table_name("users"), "users");
    }

    #[test]
    fn test_discover_sources_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("users.json"), "[]").unwrap();
        fs::write(dir.path().join("Orders.parquet"), b"").unwrap();
        fs::write(dir.path().join("events.jsonl"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let sources = discover_sources(dir.path(), "catalog.bronze").unwrap();
        let targets: Vec<&str> = sources.iter().map(|s| s.target.as_str()).collect();

        assert_eq!(
            targets,
            vec![
                "catalog.bronze.orders",
                "catalog.bronze.events",
                "catalog.bronze.users"
            ]
        );
        assert_eq!(sources[0].format, SourceFormat::Parquet);
        assert_eq!(sources[1].stem(), "events");
    }
}
