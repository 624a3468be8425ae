//! Materialize Module - Turns typed tables into remote tables
//!
//! Schema inference, literal encoding and batch planning are pure; only the
//! orchestrator talks to the engine.

pub mod batch;
pub mod encoder;
pub mod orchestrator;
pub mod report;
pub mod type_mapper;

pub use batch::{plan, Batch, Batches};
pub use encoder::{encode, quote_identifier};
pub use orchestrator::{
    plan_statements, LoadOptions, MaterializationTask, Materializer, TableSource,
};
pub use report::{BatchFailure, RunReport, TableMaterialization, TableStatus};
pub use type_mapper::{infer_target_type, TargetSchema, TargetType};
