//! Materialization Orchestrator - Drop, create and fill one remote table per task
//!
//! A run authenticates once and then processes its tasks in order. Each
//! table goes through the same steps:
//! 1. `DROP TABLE IF EXISTS` (failure is logged, never fatal)
//! 2. `CREATE TABLE` from the inferred schema (failure ends this table only)
//! 3. One `INSERT` job per batch; each batch succeeds or fails on its own
//!
//! Only an authentication failure leaves [`Materializer::run`] as an error;
//! everything else ends up in the [`RunReport`].

use crate::catalog::{SourceFile, TableTarget};
use crate::error::{LoadError, Result};
use crate::materialize::batch::plan;
use crate::materialize::report::{
    truncate_reason, BatchFailure, RunReport, TableMaterialization,
};
use crate::materialize::type_mapper::TargetSchema;
use crate::remote::{Credentials, JobClient, JobOutcome, PollPolicy, Session, SqlTransport};
use crate::table::{read_table, TypedTable};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Batch size and poll policy for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub batch_size: NonZeroUsize,
    pub poll: PollPolicy,
}

impl LoadOptions {
    pub fn new(batch_size: NonZeroUsize, poll: PollPolicy) -> Self {
        Self { batch_size, poll }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(crate::config::DEFAULT_BATCH_SIZE)
                .unwrap_or(NonZeroUsize::MIN),
            poll: PollPolicy::default(),
        }
    }
}

/// Where a task's rows come from
#[derive(Debug, Clone)]
pub enum TableSource {
    /// Read when the task is reached, so only one table is in memory at a time
    File(PathBuf),
    Loaded(TypedTable),
}

/// One table to materialize
#[derive(Debug, Clone)]
pub struct MaterializationTask {
    pub target: TableTarget,
    pub source: TableSource,
}

impl MaterializationTask {
    pub fn from_file(target: TableTarget, path: impl Into<PathBuf>) -> Self {
        Self {
            target,
            source: TableSource::File(path.into()),
        }
    }

    pub fn loaded(target: TableTarget, table: TypedTable) -> Self {
        Self {
            target,
            source: TableSource::Loaded(table),
        }
    }

    fn load(self) -> Result<(TableTarget, TypedTable)> {
        let table = match self.source {
            TableSource::File(path) => read_table(&path)?,
            TableSource::Loaded(table) => table,
        };
        Ok((self.target, table))
    }
}

impl From<SourceFile> for MaterializationTask {
    fn from(source: SourceFile) -> Self {
        Self::from_file(source.target, source.path)
    }
}

pub fn drop_statement(target: &TableTarget) -> String {
    format!("DROP TABLE IF EXISTS {}", target)
}

const NO_COLUMNS: &str = "source has no columns";

/// A table without columns cannot be created, so it is never dropped either
fn ensure_columns(table: &TypedTable) -> Result<()> {
    if table.column_count() == 0 {
        return Err(LoadError::InvalidTable(NO_COLUMNS.to_string()));
    }
    Ok(())
}

/// Every statement a run would submit for one table, in order, without
/// submitting anything
pub fn plan_statements(
    target: &TableTarget,
    table: &TypedTable,
    batch_size: NonZeroUsize,
) -> Result<Vec<String>> {
    ensure_columns(table)?;
    let mut statements = vec![
        drop_statement(target),
        TargetSchema::from_table(table).create_statement(target.as_str()),
    ];
    statements.extend(plan(table, batch_size).map(|b| b.insert_statement(target.as_str())));
    Ok(statements)
}

fn outcome_reason(outcome: &JobOutcome) -> String {
    match outcome {
        JobOutcome::Failed { reason } => reason.clone(),
        other => other.to_string(),
    }
}

pub struct Materializer<T> {
    client: JobClient<T>,
    options: LoadOptions,
}

impl<T: SqlTransport> Materializer<T> {
    pub fn new(client: JobClient<T>, options: LoadOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &JobClient<T> {
        &self.client
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Authenticate once and materialize every task in order
    pub async fn run(
        &self,
        credentials: &Credentials,
        tasks: Vec<MaterializationTask>,
    ) -> Result<RunReport> {
        let session = self.client.authenticate(credentials).await.map_err(|e| {
            error!("Aborting run: {}", e);
            e
        })?;

        let total = tasks.len();
        let mut results = Vec::with_capacity(total);

        for (i, task) in tasks.into_iter().enumerate() {
            let name = task.target.clone();
            info!("Table {}/{}: {}", i + 1, total, name);

            let result = match task.load() {
                Ok((target, table)) => self.materialize_table(&session, &target, &table).await,
                Err(e) => {
                    let reason = truncate_reason(&format!("read failed: {}", e));
                    error!("{}: {}", name, reason);
                    TableMaterialization::failed(name.as_str(), reason)
                }
            };
            results.push(result);
        }

        let report = RunReport::new(results);
        info!(
            "Run {} finished: {} created, {} failed, {} rows inserted",
            report.run_id,
            report.created().len(),
            report.failed().len(),
            report.rows_inserted()
        );
        Ok(report)
    }

    /// Drop, create and fill one table. Never fails; failures are in the result.
    pub async fn materialize_table(
        &self,
        session: &Session,
        target: &TableTarget,
        table: &TypedTable,
    ) -> TableMaterialization {
        let poll = &self.options.poll;

        if ensure_columns(table).is_err() {
            warn!("{}: {}, nothing to create", target, NO_COLUMNS);
            return TableMaterialization::failed(target.as_str(), NO_COLUMNS);
        }

        let drop_sql = drop_statement(target);
        match self.client.execute(session, &drop_sql, poll).await {
            Ok(outcome) if outcome.is_completed() => debug!("Dropped {}", target),
            Ok(outcome) => warn!("DROP TABLE {} did not complete: {}", target, outcome),
            Err(e) => warn!("DROP TABLE {} failed: {}", target, e),
        }

        let create_sql = TargetSchema::from_table(table).create_statement(target.as_str());
        let create_failure = match self.client.execute(session, &create_sql, poll).await {
            Ok(outcome) if outcome.is_completed() => None,
            Ok(outcome) => Some(outcome_reason(&outcome)),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = create_failure {
            let reason = truncate_reason(&format!("CREATE TABLE failed: {}", reason));
            error!("{}: {}", target, reason);
            return TableMaterialization::failed(target.as_str(), reason);
        }
        info!("Created {} ({} columns)", target, table.column_count());

        let mut result = TableMaterialization::created(target.as_str());
        let batches = plan(table, self.options.batch_size);
        let batch_count = batches.batch_count();

        for batch in batches {
            let rows = batch.row_count() as u64;
            result.rows_attempted += rows;

            let sql = batch.insert_statement(target.as_str());
            let failure = match self.client.execute(session, &sql, poll).await {
                Ok(outcome) if outcome.is_completed() => None,
                Ok(outcome) => Some(outcome_reason(&outcome)),
                Err(e) => Some(e.to_string()),
            };

            match failure {
                None => {
                    result.rows_inserted += rows;
                    debug!(
                        "{}: batch {}/{} inserted {} rows",
                        target,
                        batch.index + 1,
                        batch_count,
                        rows
                    );
                }
                Some(reason) => {
                    let reason = truncate_reason(&reason);
                    warn!(
                        "{}: batch {} (rows {}..{}) failed: {}",
                        target, batch.index, batch.rows.start, batch.rows.end, reason
                    );
                    result.failed_batches.push(BatchFailure {
                        index: batch.index,
                        rows: batch.rows.clone(),
                        reason,
                    });
                }
            }
        }

        if result.is_complete() {
            info!("{}: {} rows inserted", target, result.rows_inserted);
        } else {
            warn!(
                "{}: {} of {} rows inserted, {} batches failed",
                target,
                result.rows_inserted,
                result.rows_attempted,
                result.failed_batches.len()
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, Column, NativeType};

    fn target() -> TableTarget {
        TableTarget::new("catalog.bronze.items").unwrap()
    }

    #[test]
    fn test_plan_statements_order() {
        let table = TypedTable::new(vec![Column::new(
            "id",
            NativeType::Integer,
            (1..=5).map(CellValue::Integer).collect(),
        )])
        .unwrap();

        let statements =
            plan_statements(&target(), &table, NonZeroUsize::new(2).unwrap()).unwrap();
        assert_eq!(
            statements,
            vec![
                "DROP TABLE IF EXISTS catalog.bronze.items".to_string(),
                "CREATE TABLE catalog.bronze.items (\"id\" BIGINT)".to_string(),
                "INSERT INTO catalog.bronze.items VALUES (1), (2)".to_string(),
                "INSERT INTO catalog.bronze.items VALUES (3), (4)".to_string(),
                "INSERT INTO catalog.bronze.items VALUES (5)".to_string(),
            ]
        );
    }

    #[test]
    fn test_plan_statements_refuses_columnless_table() {
        let table = TypedTable::new(vec![]).unwrap();
        let err = plan_statements(&target(), &table, NonZeroUsize::new(2).unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidTable(ref msg) if msg == "source has no columns"));
    }

    #[test]
    fn test_outcome_reason() {
        assert_eq!(
            outcome_reason(&JobOutcome::Failed {
                reason: "syntax".to_string()
            }),
            "syntax"
        );
        assert_eq!(
            outcome_reason(&JobOutcome::TimedOut { attempts: 60 }),
            "timeout after 60 polls"
        );
    }
}
