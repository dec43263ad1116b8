//! Table schemas as seen by the binder

use crate::catalog::ColumnId;
use crate::parser::StoredExpression;
use crate::types::{LogicalType, Value};

/// Column information
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    /// Column name
    pub name: String,
    /// Column type
    pub data_type: LogicalType,
    /// Whether NULL is accepted
    pub nullable: bool,
    /// Column id, assigned when the table is created
    pub id: ColumnId,
    /// Stored default expression
    pub default: Option<StoredExpression>,
}

impl ColumnSchema {
    pub fn new(name: &str, data_type: LogicalType) -> Self {
        Self {
            name: name.to_lowercase(),
            data_type,
            nullable: true,
            id: ColumnId::INVALID,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(StoredExpression::constant(value));
        self
    }

    pub fn with_default_expression(mut self, default: StoredExpression) -> Self {
        self.default = Some(default);
        self
    }
}

/// Ordered column list of a table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSchema {
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    /// Find a column by (lower-case) name
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
