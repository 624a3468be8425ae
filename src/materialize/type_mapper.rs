//! Type Mapper - Native column tags to target SQL column types

use crate::materialize::encoder::quote_identifier;
use crate::table::{NativeType, TypedTable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capacity of the catch-all text type, wide enough that long values are
/// never truncated by the target.
pub const TEXT_CAPACITY: u32 = 65535;

/// Column type used in generated CREATE TABLE statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    BigInt,
    Double,
    Timestamp,
    Varchar(u32),
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::BigInt => f.write_str("BIGINT"),
            TargetType::Double => f.write_str("DOUBLE"),
            TargetType::Timestamp => f.write_str("TIMESTAMP"),
            TargetType::Varchar(n) => write!(f, "VARCHAR({})", n),
        }
    }
}

/// Total mapping: every tag has exactly one target type
pub fn infer_target_type(native: NativeType) -> TargetType {
    match native {
        NativeType::Integer => TargetType::BigInt,
        NativeType::Float => TargetType::Double,
        NativeType::Temporal => TargetType::Timestamp,
        NativeType::Boolean | NativeType::Text | NativeType::Composite => {
            TargetType::Varchar(TEXT_CAPACITY)
        }
    }
}

/// Ordered (column name, target type) pairs, one per source column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSchema {
    pub columns: Vec<(String, TargetType)>,
}

impl TargetSchema {
    pub fn from_table(table: &TypedTable) -> Self {
        Self {
            columns: table
                .columns()
                .iter()
                .map(|c| (c.name.clone(), infer_target_type(c.native_type)))
                .collect(),
        }
    }

    /// Column list as it appears inside CREATE TABLE parentheses
    pub fn column_definitions(&self) -> String {
        self.columns
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_identifier(name), ty))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn create_statement(&self, target: &str) -> String {
        format!("CREATE TABLE {} ({})", target, self.column_definitions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, Column};

    #[test]
    fn test_mapping_rules() {
        assert_eq!(infer_target_type(NativeType::Integer), TargetType::BigInt);
        assert_eq!(infer_target_type(NativeType::Float), TargetType::Double);
        assert_eq!(infer_target_type(NativeType::Temporal), TargetType::Timestamp);
        assert_eq!(
            infer_target_type(NativeType::Boolean),
            TargetType::Varchar(TEXT_CAPACITY)
        );
        assert_eq!(
            infer_target_type(NativeType::Composite),
            TargetType::Varchar(TEXT_CAPACITY)
        );
    }

    #[test]
    fn test_mapping_is_deterministic_for_every_tag() {
        for tag in NativeType::ALL {
            assert_eq!(infer_target_type(tag), infer_target_type(tag));
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(TargetType::BigInt.to_string(), "BIGINT");
        assert_eq!(TargetType::Varchar(TEXT_CAPACITY).to_string(), "VARCHAR(65535)");
    }

    #[test]
    fn test_create_statement_keeps_column_order() {
        let table = TypedTable::new(vec![
            Column::new("id", NativeType::Integer, vec![CellValue::Integer(1)]),
            Column::new("rating", NativeType::Float, vec![CellValue::Float(4.5)]),
            Column::new("seen", NativeType::Temporal, vec![CellValue::Null]),
            Column::new("is \"new\"", NativeType::Boolean, vec![CellValue::Boolean(true)]),
        ])
        .unwrap();

        let schema = TargetSchema::from_table(&table);
        assert_eq!(
            schema.create_statement("catalog.bronze.ecoride_reviews"),
            "CREATE TABLE catalog.bronze.ecoride_reviews (\"id\" BIGINT, \"rating\" DOUBLE, \
             \"seen\" TIMESTAMP, \"is \"\"new\"\"\" VARCHAR(65535))"
        );
    }
}
