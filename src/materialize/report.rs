//! Materialization results handed back to the scheduler

use serde::{Deserialize, Serialize};
use std::ops::Range;
use uuid::Uuid;

/// Failure text kept in logs and reports is capped at this many characters
pub const MAX_REASON_CHARS: usize = 300;

pub fn truncate_reason(reason: &str) -> String {
    match reason.char_indices().nth(MAX_REASON_CHARS) {
        Some((cut, _)) => reason[..cut].to_string(),
        None => reason.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    /// CREATE TABLE succeeded; batch outcomes are reported separately
    Created,
    Failed,
}

/// A batch whose INSERT job did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub index: usize,
    pub rows: Range<usize>,
    pub reason: String,
}

/// Outcome of one table in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMaterialization {
    pub table_name: String,
    pub status: TableStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub rows_attempted: u64,
    pub rows_inserted: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_batches: Vec<BatchFailure>,
}

impl TableMaterialization {
    pub fn created(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            status: TableStatus::Created,
            reason: None,
            rows_attempted: 0,
            rows_inserted: 0,
            failed_batches: Vec::new(),
        }
    }

    pub fn failed(table_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            status: TableStatus::Failed,
            reason: Some(reason.into()),
            rows_attempted: 0,
            rows_inserted: 0,
            failed_batches: Vec::new(),
        }
    }

    pub fn is_created(&self) -> bool {
        self.status == TableStatus::Created
    }

    /// Every attempted row was confirmed by the engine
    pub fn is_complete(&self) -> bool {
        self.is_created() && self.rows_inserted == self.rows_attempted
    }
}

/// All table results of one run, in processing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub tables: Vec<TableMaterialization>,
}

impl RunReport {
    pub fn new(tables: Vec<TableMaterialization>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            tables,
        }
    }

    /// Names of the tables whose CREATE succeeded
    pub fn created(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.is_created())
            .map(|t| t.table_name.as_str())
            .collect()
    }

    /// `"name: reason"` for every failed table
    pub fn failed(&self) -> Vec<String> {
        self.tables
            .iter()
            .filter(|t| !t.is_created())
            .map(|t| format!("{}: {}", t.table_name, t.reason.as_deref().unwrap_or("unknown")))
            .collect()
    }

    pub fn rows_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_inserted).sum()
    }

    pub fn rows_attempted(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_attempted).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_summaries() {
        let mut ok = TableMaterialization::created("catalog.bronze.orders");
        ok.rows_attempted = 10;
        ok.rows_inserted = 8;
        let report = RunReport::new(vec![
            ok,
            TableMaterialization::failed("catalog.bronze.users", "CREATE TABLE failed: boom"),
        ]);

        assert_eq!(report.created(), vec!["catalog.bronze.orders"]);
        assert_eq!(
            report.failed(),
            vec!["catalog.bronze.users: CREATE TABLE failed: boom".to_string()]
        );
        assert_eq!(report.rows_inserted(), 8);
        assert_eq!(report.rows_attempted(), 10);
        assert!(!report.tables[0].is_complete());
    }

    #[test]
    fn test_serialized_shape() {
        let report = RunReport::new(vec![TableMaterialization::failed("t", "read failed: x")]);
        let json = serde_json::to_value(&report).unwrap();
        let table = &json["tables"][0];

        assert!(json["runId"].is_string());
        assert_eq!(table["tableName"], "t");
        assert_eq!(table["status"], "failed");
        assert_eq!(table["reason"], "read failed: x");
        assert_eq!(table["rowsAttempted"], 0);
        assert!(table.get("failedBatches").is_none());
    }

    #[test]
    fn test_truncate_reason_counts_chars() {
        let long = "é".repeat(400);
        assert_eq!(truncate_reason(&long).chars().count(), MAX_REASON_CHARS);
        assert_eq!(truncate_reason("short"), "short");
    }
}
