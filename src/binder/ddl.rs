//! CREATE, DROP and ANALYZE binding

use super::{normalize_name, Binder, DerivedColumn, TableBinding};
use crate::common::constants::{TRIGGER_NEW_ALIAS, TRIGGER_OLD_ALIAS};
use crate::common::error::BindResult;
use crate::parser::{
    Alias, AnalyzeStatement, BaseTableRef, ColumnDefinition, CreateKind, CreateStatement,
    DropKind, DropStatement, ExprId, ForeignKeyDefinition, IndexAttribute, TableName,
};
use crate::types::LogicalType;
use crate::bind_err;
use std::collections::HashSet;
use tracing::trace;

impl Binder<'_> {
    pub(super) fn bind_create(&mut self, create: &mut CreateStatement) -> BindResult<()> {
        match &mut create.kind {
            CreateKind::Database { name } => {
                *name = name.to_lowercase();
                if self.accessor.database_id(name).is_some() {
                    return Err(bind_err!(DuplicateObject, "database \"{}\" already exists", name));
                }
                Ok(())
            }
            CreateKind::Schema { name } => {
                *name = name.to_lowercase();
                if self.accessor.namespace_id(name).is_some() {
                    return Err(bind_err!(DuplicateObject, "schema \"{}\" already exists", name));
                }
                Ok(())
            }
            CreateKind::Table {
                name,
                columns,
                foreign_keys,
            } => self.bind_create_table(name, columns, foreign_keys),
            CreateKind::Index {
                name,
                table,
                attributes,
                ..
            } => self.bind_create_index(name, table, attributes),
            CreateKind::Trigger {
                name, table, when, ..
            } => self.bind_create_trigger(name, table, *when),
            CreateKind::View { name, query } => {
                normalize_name(name);
                self.validate_database(name.database.as_deref())?;
                self.ensure_relation_free(name)?;
                self.bind_select(query)
            }
        }
    }

    /// No table or view may already use `name`
    fn ensure_relation_free(&self, name: &TableName) -> BindResult<()> {
        if self.accessor.table_id(name).is_some() || self.accessor.view_id(name).is_some() {
            return Err(bind_err!(
                DuplicateObject,
                "relation \"{}\" already exists",
                name.name
            ));
        }
        Ok(())
    }

    fn bind_create_table(
        &mut self,
        name: &mut TableName,
        columns: &mut [ColumnDefinition],
        foreign_keys: &mut [ForeignKeyDefinition],
    ) -> BindResult<()> {
        normalize_name(name);
        self.validate_database(name.database.as_deref())?;
        self.ensure_relation_free(name)?;

        let mut seen = HashSet::new();
        for column in columns.iter_mut() {
            column.name = column.name.to_lowercase();
            if !seen.insert(column.name.clone()) {
                return Err(bind_err!(
                    DuplicateObject,
                    "column \"{}\" specified more than once",
                    column.name
                ));
            }
        }

        // The new table is visible to its own CHECK constraints
        let mut alias = Alias::new(name.name.clone());
        self.set_unique_alias(&mut alias)?;
        let derived: Vec<DerivedColumn> = columns
            .iter()
            .map(|c| DerivedColumn {
                alias: Alias::with_serial(c.name.clone(), self.sherpa.next_alias_serial()),
                data_type: c.data_type,
            })
            .collect();
        self.scopes.current_mut()?.add_derived_table(alias, derived)?;

        for column in columns.iter() {
            if let Some(default) = column.default {
                self.sherpa.set_desired(default, column.data_type);
                self.bind_expr(default)?;
                self.finish_expr(default);
            }
            if let Some(check) = column.check {
                self.bind_boolean(check, "CHECK")?;
            }
        }

        for fk in foreign_keys.iter_mut() {
            self.bind_foreign_key(fk, columns)?;
        }
        trace!(table = %name, columns = columns.len(), "bound CREATE TABLE");
        Ok(())
    }

    fn bind_boolean(&mut self, id: ExprId, clause: &str) -> BindResult<()> {
        if self.exprs[id].is_literal() {
            self.sherpa.set_desired(id, LogicalType::Boolean);
        }
        self.bind_expr(id)?;
        let ty = self.exprs[id].return_type;
        if ty.is_valid() && ty != LogicalType::Boolean {
            return Err(bind_err!(
                DatatypeMismatch,
                "argument of {} must be type boolean, not type {}",
                clause,
                ty
            ));
        }
        self.finish_expr(id);
        Ok(())
    }

    fn bind_foreign_key(
        &mut self,
        fk: &mut ForeignKeyDefinition,
        columns: &[ColumnDefinition],
    ) -> BindResult<()> {
        normalize_name(&mut fk.referenced_table);
        let referenced = self.table_binding(&fk.referenced_table)?;
        if fk.columns.len() != fk.referenced_columns.len() {
            return Err(bind_err!(
                InvalidForeignKey,
                "number of referencing and referenced columns for foreign key disagree"
            ));
        }

        for (source, target) in fk.columns.iter_mut().zip(fk.referenced_columns.iter_mut()) {
            *source = source.to_lowercase();
            *target = target.to_lowercase();
            let source_column = columns.iter().find(|c| c.name == *source).ok_or_else(|| {
                bind_err!(
                    InvalidForeignKey,
                    "column \"{}\" referenced in foreign key constraint does not exist",
                    source
                )
            })?;
            let target_column = referenced.schema.column(target).ok_or_else(|| {
                bind_err!(
                    InvalidForeignKey,
                    "column \"{}\" referenced in foreign key constraint does not exist",
                    target
                )
            })?;
            if source_column.data_type != target_column.data_type {
                return Err(bind_err!(
                    InvalidForeignKey,
                    "foreign key constraint cannot be implemented: key columns \"{}\" and \"{}\" are of incompatible types: {} and {}",
                    source,
                    target,
                    source_column.data_type,
                    target_column.data_type
                ));
            }
        }
        Ok(())
    }

    fn bind_create_index(
        &mut self,
        name: &mut String,
        table: &mut TableName,
        attributes: &mut [IndexAttribute],
    ) -> BindResult<()> {
        *name = name.to_lowercase();
        let mut target = BaseTableRef::new(table.clone());
        self.bind_base_table(&mut target, false)?;
        *table = target.name.clone();

        let index_name = TableName {
            database: table.database.clone(),
            namespace: table.namespace.clone(),
            name: name.clone(),
        };
        if self.accessor.index_id(&index_name).is_some() {
            return Err(bind_err!(DuplicateObject, "relation \"{}\" already exists", name));
        }

        let schema = self.table_binding(table)?.schema;
        for attribute in attributes.iter_mut() {
            match attribute {
                IndexAttribute::Column(column) => {
                    *column = column.to_lowercase();
                    if !schema.has_column(column) {
                        return Err(bind_err!(
                            UndefinedColumn,
                            "column \"{}\" does not exist",
                            column
                        ));
                    }
                }
                IndexAttribute::Expression(expr) => {
                    self.bind_expr(*expr)?;
                    self.finish_expr(*expr);
                }
            }
        }
        Ok(())
    }

    fn bind_create_trigger(
        &mut self,
        name: &mut String,
        table: &mut TableName,
        when: Option<ExprId>,
    ) -> BindResult<()> {
        *name = name.to_lowercase();
        let mut target = BaseTableRef::new(table.clone());
        self.bind_base_table(&mut target, false)?;
        *table = target.name.clone();

        let trigger_name = TableName {
            database: table.database.clone(),
            namespace: table.namespace.clone(),
            name: name.clone(),
        };
        if self.accessor.trigger_id(&trigger_name).is_some() {
            return Err(bind_err!(
                DuplicateObject,
                "trigger \"{}\" for relation \"{}\" already exists",
                name,
                table.name
            ));
        }

        // WHEN may refer to the affected row as OLD and NEW
        let binding: TableBinding = self.table_binding(table)?;
        for pseudo in [TRIGGER_OLD_ALIAS, TRIGGER_NEW_ALIAS] {
            let mut alias = Alias::new(pseudo);
            self.set_unique_alias(&mut alias)?;
            self.scopes
                .current_mut()?
                .add_regular_table(alias, binding.clone())?;
        }
        if let Some(when) = when {
            self.bind_boolean(when, "WHEN")?;
        }
        Ok(())
    }

    pub(super) fn bind_drop(&mut self, drop: &mut DropStatement) -> BindResult<()> {
        normalize_name(&mut drop.target);
        let target = &drop.target;
        let exists = match drop.kind {
            DropKind::Database => self.accessor.database_id(&target.name).is_some(),
            DropKind::Schema => self.accessor.namespace_id(&target.name).is_some(),
            DropKind::Table => {
                self.validate_database(target.database.as_deref())?;
                self.accessor.table_id(target).is_some()
            }
            DropKind::Index => self.accessor.index_id(target).is_some(),
            DropKind::Trigger => self.accessor.trigger_id(target).is_some(),
            DropKind::View => self.accessor.view_id(target).is_some(),
        };
        if exists {
            return Ok(());
        }

        let kind = match drop.kind {
            DropKind::Database => "database",
            DropKind::Schema => "schema",
            DropKind::Table => "table",
            DropKind::Index => "index",
            DropKind::Trigger => "trigger",
            DropKind::View => "view",
        };
        match drop.kind {
            DropKind::Table => Err(bind_err!(
                UndefinedTable,
                "{} \"{}\" does not exist",
                kind,
                target.name
            )),
            _ => Err(bind_err!(
                UndefinedObject,
                "{} \"{}\" does not exist",
                kind,
                target.name
            )),
        }
    }

    pub(super) fn bind_analyze(&mut self, analyze: &mut AnalyzeStatement) -> BindResult<()> {
        let table = analyze
            .table
            .as_mut()
            .ok_or_else(|| bind_err!(SyntaxError, "ANALYZE requires a table"))?;
        normalize_name(table);
        self.validate_database(table.database.as_deref())?;
        let binding = self.table_binding(table)?;

        let mut column_ids = Vec::new();
        if analyze.columns.is_empty() {
            column_ids.extend(binding.schema.columns.iter().map(|c| c.id));
        } else {
            for column in analyze.columns.iter_mut() {
                *column = column.to_lowercase();
                let found = binding.schema.column(column).ok_or_else(|| {
                    bind_err!(
                        UndefinedColumn,
                        "column \"{}\" of relation \"{}\" does not exist",
                        column,
                        table.name
                    )
                })?;
                column_ids.push(found.id);
            }
        }

        analyze.database_id = binding.database_id;
        analyze.table_id = binding.table_id;
        analyze.column_ids = column_ids;
        Ok(())
    }
}
