pub mod catalog;
pub mod config;
pub mod error;
pub mod materialize;
pub mod remote;
pub mod table;

pub use catalog::{discover_sources, SourceFile, TableTarget};
pub use config::{EngineConfig, LoaderConfig};
pub use error::{LoadError, Result};
pub use materialize::{
    plan_statements, LoadOptions, MaterializationTask, Materializer, RunReport,
    TableMaterialization, TableStatus,
};
pub use remote::{Credentials, HttpTransport, JobClient, JobOutcome, PollPolicy, Session};
pub use table::{read_table, CellValue, Column, NativeType, TypedTable};
