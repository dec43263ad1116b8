//! INSERT, UPDATE and DELETE binding

use super::{Binder, ScopeTable, TableSource};
use crate::catalog::{ColumnSchema, TableSchema};
use crate::common::error::BindResult;
use crate::parser::{
    BaseTableRef, DeleteStatement, ExprId, ExprKind, InsertSource, InsertStatement,
    UpdateStatement,
};
use crate::{bind_err, internal_err};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

impl Binder<'_> {
    pub(super) fn bind_insert(&mut self, insert: &mut InsertStatement) -> BindResult<()> {
        let schema = self.bind_target_table(&mut insert.table)?;
        let table_name = insert.table.name.name.clone();

        let mut seen = HashSet::new();
        for column in insert.columns.iter_mut() {
            *column = column.to_lowercase();
            if !schema.has_column(column) {
                return Err(bind_err!(
                    UndefinedColumn,
                    "column \"{}\" of relation \"{}\" does not exist",
                    column,
                    table_name
                ));
            }
            if !seen.insert(column.clone()) {
                return Err(bind_err!(
                    DuplicateObject,
                    "column \"{}\" specified more than once",
                    column
                ));
            }
        }

        match &mut insert.source {
            InsertSource::Values(rows) => {
                for row in rows.iter_mut() {
                    self.validate_insert_row(row, &insert.columns, &schema)?;
                }
            }
            InsertSource::Select(select) => {
                self.bind_select(select)?;
                self.validate_insert_row(&mut select.select_list, &insert.columns, &schema)?;
            }
        }

        insert.columns = schema.column_names().map(String::from).collect();
        Ok(())
    }

    /// Reorder one row of values into schema order, filling the columns the
    /// statement leaves out and converting every value to its column's type
    fn validate_insert_row(
        &mut self,
        values: &mut Vec<ExprId>,
        columns: &[String],
        schema: &TableSchema,
    ) -> BindResult<()> {
        let expected = if columns.is_empty() {
            schema.len()
        } else {
            columns.len()
        };
        if values.len() != expected {
            return Err(bind_err!(
                SyntaxError,
                "mismatch in number of insert columns ({}) and insert values ({})",
                expected,
                values.len()
            ));
        }

        let mut row = Vec::with_capacity(schema.len());
        for (i, column) in schema.columns.iter().enumerate() {
            let position = if columns.is_empty() {
                Some(i)
            } else {
                columns.iter().position(|c| *c == column.name)
            };
            let value = match position {
                Some(position) => values[position],
                None => self.column_default(column)?,
            };
            row.push(self.coerce_to_column(value, column)?);
        }
        *values = row;
        Ok(())
    }

    /// Fresh copy of the column's default, a typed NULL, or an error for a
    /// NOT NULL column without default
    fn column_default(&mut self, column: &ColumnSchema) -> BindResult<ExprId> {
        match &column.default {
            Some(stored) => self.exprs.import(&stored.arena, stored.root),
            None if column.nullable => Ok(self.exprs.typed_null(column.data_type)),
            None => Err(bind_err!(
                SyntaxError,
                "null value in column \"{}\" violates not-null constraint",
                column.name
            )),
        }
    }

    /// Bind `value` as the new content of `column`. An explicit cast must name
    /// the column type and is dropped.
    fn coerce_to_column(&mut self, value: ExprId, column: &ColumnSchema) -> BindResult<ExprId> {
        let mut value = value;
        if matches!(self.exprs[value].kind, ExprKind::Default) {
            value = self.column_default(column)?;
        }
        if let ExprKind::Cast { target, child } = self.exprs[value].kind {
            if target != column.data_type {
                return Err(bind_err!(
                    NumericValueOutOfRange,
                    "cast to {} does not match column \"{}\" of type {}",
                    target,
                    column.name,
                    column.data_type
                ));
            }
            value = child;
        }
        self.sherpa.set_desired(value, column.data_type);
        self.bind_expr(value)?;
        self.finish_expr(value);
        Ok(value)
    }

    pub(super) fn bind_update(&mut self, update: &mut UpdateStatement) -> BindResult<()> {
        let schema = self.bind_target_table(&mut update.table)?;
        if let Some(predicate) = update.where_clause {
            self.bind_predicate(predicate, "WHERE")?;
        }

        for clause in update.clauses.iter_mut() {
            clause.column = clause.column.to_lowercase();
            let column = schema.column(&clause.column).ok_or_else(|| {
                bind_err!(
                    UndefinedColumn,
                    "column \"{}\" of relation \"{}\" does not exist",
                    clause.column,
                    update.table.name.name
                )
            })?;
            clause.value = self.coerce_to_column(clause.value, column)?;
        }
        Ok(())
    }

    pub(super) fn bind_delete(&mut self, delete: &mut DeleteStatement) -> BindResult<()> {
        self.bind_target_table(&mut delete.table)?;
        if let Some(predicate) = delete.where_clause {
            self.bind_predicate(predicate, "WHERE")?;
        }
        Ok(())
    }

    /// Register the table a DML statement writes to and return its schema
    fn bind_target_table(&mut self, table: &mut BaseTableRef) -> BindResult<Arc<TableSchema>> {
        self.bind_base_table(table, false)?;
        trace!(table = %table.name, alias = %table.alias, "bound target table");
        match self.scopes.current()?.table(&table.alias.name) {
            Some(ScopeTable {
                source: TableSource::Regular(binding),
                ..
            }) => Ok(Arc::clone(&binding.schema)),
            _ => Err(internal_err!("target table {} is not a base table", table.name)),
        }
    }
}
