//! Statement Binder
//!
//! Resolves names in a parsed statement against the catalog, annotates every
//! expression with its type and scope depth, and validates the statement.
//! Binding rewrites the statement in place; on failure the statement is
//! discarded.

pub mod ddl;
pub mod dml;
pub mod expression;
pub mod scope;
pub mod sherpa;

pub use scope::*;
pub use sherpa::*;

use crate::catalog::CatalogAccessor;
use crate::common::error::{BindError, BindResult};
use crate::parser::{
    Alias, AliasSerial, BaseTableRef, ColumnRef, CommonTableExpression, ExprArena, ExprId, ExprKind,
    OrderByDescription, ParseResult, SelectStatement, Statement, TableName, TableReference,
};
use crate::types::{LogicalType, Value};
use crate::{bind_err, internal_err};
use tracing::{debug, trace};

/// A statement whose names are resolved and whose expressions are typed
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub statement: Statement,
    pub exprs: ExprArena,
    /// Type inferred for each placeholder, `Invalid` when nothing constrained it
    pub parameter_types: Vec<LogicalType>,
}

impl From<BoundStatement> for ParseResult {
    fn from(bound: BoundStatement) -> Self {
        ParseResult::new(bound.statement, bound.exprs)
    }
}

/// Binds exactly one top-level statement
pub struct Binder<'a> {
    accessor: &'a dyn CatalogAccessor,
    exprs: ExprArena,
    sherpa: TypeSherpa,
    scopes: ScopeStack,
    parameters: Vec<Value>,
}

impl<'a> Binder<'a> {
    pub fn new(accessor: &'a dyn CatalogAccessor) -> Self {
        Self {
            accessor,
            exprs: ExprArena::new(),
            sherpa: TypeSherpa::new(0),
            scopes: ScopeStack::new(),
            parameters: Vec::new(),
        }
    }

    /// Bind `parse` and promote `parameters` in place to the types the
    /// statement infers for them. `parameters` is left untouched on failure.
    pub fn bind(
        mut self,
        parse: ParseResult,
        parameters: &mut [Value],
    ) -> BindResult<BoundStatement> {
        let ParseResult {
            mut statement,
            exprs,
        } = parse;
        self.exprs = exprs;
        self.parameters = parameters.to_vec();
        self.sherpa = TypeSherpa::new(parameters.len());

        debug!(
            kind = statement.kind_name(),
            parameters = parameters.len(),
            "binding statement"
        );
        if let Err(e) = self.bind_statement(&mut statement) {
            debug!(kind = statement.kind_name(), error = %e, "binding failed");
            return Err(e);
        }

        parameters.clone_from_slice(&self.parameters);
        Ok(BoundStatement {
            statement,
            exprs: self.exprs,
            parameter_types: self.sherpa.into_parameter_types(),
        })
    }

    fn bind_statement(&mut self, statement: &mut Statement) -> BindResult<()> {
        match statement {
            Statement::Select(select) => self.bind_select(select),
            Statement::Insert(insert) => self.in_root_scope(|b| b.bind_insert(insert)),
            Statement::Update(update) => self.in_root_scope(|b| b.bind_update(update)),
            Statement::Delete(delete) => self.in_root_scope(|b| b.bind_delete(delete)),
            Statement::Create(create) => self.in_root_scope(|b| b.bind_create(create)),
            Statement::Drop(drop) => self.in_root_scope(|b| b.bind_drop(drop)),
            Statement::Analyze(analyze) => self.in_root_scope(|b| b.bind_analyze(analyze)),
            Statement::Explain(explain) => {
                let explainable = matches!(
                    explain.statement.as_ref(),
                    Statement::Select(_)
                        | Statement::Insert(_)
                        | Statement::Update(_)
                        | Statement::Delete(_)
                        | Statement::Analyze(_)
                );
                if !explainable {
                    return Err(bind_err!(
                        SyntaxError,
                        "EXPLAIN is not supported for {} statements",
                        explain.statement.kind_name()
                    ));
                }
                self.bind_statement(&mut explain.statement)
            }
        }
    }

    fn in_root_scope(
        &mut self,
        f: impl FnOnce(&mut Self) -> BindResult<()>,
    ) -> BindResult<()> {
        self.scopes.push();
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Bind a query block in a new child scope
    fn bind_select(&mut self, select: &mut SelectStatement) -> BindResult<()> {
        let depth = self.scopes.push();
        trace!(depth, "binding select");
        let result = self.bind_select_body(select, depth);
        self.scopes.pop();
        result
    }

    fn bind_select_body(&mut self, select: &mut SelectStatement, depth: usize) -> BindResult<()> {
        for cte in select.with.iter_mut() {
            self.bind_cte(cte)?;
        }

        if let Some(from) = select.from.as_mut() {
            self.bind_table_ref(from)?;
        }

        if let Some(predicate) = select.where_clause {
            self.bind_predicate(predicate, "WHERE")?;
        }

        if let Some(limit) = &select.limit {
            if limit.limit.is_some_and(|n| n < 0) {
                return Err(bind_err!(SyntaxError, "LIMIT must not be negative"));
            }
            if limit.offset.is_some_and(|n| n < 0) {
                return Err(bind_err!(SyntaxError, "OFFSET must not be negative"));
            }
        }

        if let Some(group_by) = select.group_by.as_mut() {
            for &column in &group_by.columns {
                self.bind_expr(column)?;
                self.finish_expr(column);
            }
            if let Some(having) = group_by.having {
                if self.exprs[having].is_literal() {
                    self.sherpa.set_desired(having, LogicalType::Boolean);
                }
                self.bind_expr(having)?;
                self.finish_expr(having);
            }
        }

        let has_from = select.from.is_some();
        let mut select_list = Vec::with_capacity(select.select_list.len());
        for &column in &select.select_list {
            if matches!(
                self.exprs[column].kind,
                ExprKind::Star | ExprKind::TableStar { .. }
            ) {
                if !has_from {
                    return Err(bind_err!(
                        SyntaxError,
                        "SELECT * with no tables specified is not valid"
                    ));
                }
                select_list.extend(self.expand_star(column)?);
                continue;
            }
            if self.exprs[column].is_null_constant() && !self.sherpa.get_desired(column).is_valid()
            {
                self.sherpa.set_desired(column, LogicalType::Varchar);
            }
            self.bind_expr(column)?;
            self.finish_expr(column);
            select_list.push(column);
        }
        select.select_list = select_list;

        if let Some(right) = select.union.as_mut() {
            // The right side is a sibling of this block, not a child, and
            // shares its WITH list
            let scope = self
                .scopes
                .pop()
                .ok_or_else(|| internal_err!("no scope for UNION"))?;
            self.scopes.restore(scope.sibling());
            let result = self.bind_select_body(right, depth);
            self.scopes.pop();
            self.scopes.restore(scope);
            result?;
            self.check_union(&select.select_list, &right.select_list)?;
        }

        select.depth = Some(depth);

        if let Some(order_by) = select.order_by.as_mut() {
            self.unify_order_by(&select.select_list, order_by)?;
            for item in &order_by.items {
                self.bind_expr(item.expr)?;
                self.finish_expr(item.expr);
            }
        }
        Ok(())
    }

    /// Cache depth, subquery flag and output name on a bound expression
    fn finish_expr(&mut self, id: ExprId) {
        self.exprs.derive_depth(id);
        self.exprs.derive_subquery_flag(id);
        self.exprs.derive_name(id);
    }

    /// Bind a boolean clause (WHERE, join condition)
    fn bind_predicate(&mut self, predicate: ExprId, clause: &str) -> BindResult<()> {
        if self.exprs[predicate].is_literal() {
            self.sherpa.set_desired(predicate, LogicalType::Boolean);
        }
        self.bind_expr(predicate)?;
        if self.exprs.contains_aggregate(predicate) {
            return Err(bind_err!(
                SyntaxError,
                "aggregate functions are not allowed in {}",
                clause
            ));
        }
        let ty = self.exprs[predicate].return_type;
        if ty.is_valid() && ty != LogicalType::Boolean {
            return Err(bind_err!(
                DatatypeMismatch,
                "argument of {} must be type boolean, not type {}",
                clause,
                ty
            ));
        }
        self.finish_expr(predicate);
        Ok(())
    }

    fn check_union(&self, left: &[ExprId], right: &[ExprId]) -> BindResult<()> {
        if left.len() != right.len() {
            return Err(bind_err!(
                DatatypeMismatch,
                "each UNION query must have the same number of columns"
            ));
        }
        for (&l, &r) in left.iter().zip(right) {
            let (lt, rt) = (self.exprs[l].return_type, self.exprs[r].return_type);
            if lt != rt {
                return Err(bind_err!(
                    DatatypeMismatch,
                    "UNION types {} and {} cannot be matched",
                    lt,
                    rt
                ));
            }
        }
        Ok(())
    }

    /// Replace ORDER BY ordinals and output-name references with select-list entries
    fn unify_order_by(
        &self,
        select_list: &[ExprId],
        order_by: &mut OrderByDescription,
    ) -> BindResult<()> {
        for item in order_by.items.iter_mut() {
            match &self.exprs[item.expr].kind {
                ExprKind::Constant(value) => {
                    let position = match value {
                        Value::Double(f) => Some(f.0.trunc() as i64),
                        other => other.as_i64(),
                    }
                    .ok_or_else(|| {
                        bind_err!(
                            UndefinedColumn,
                            "non-integer constant {} in ORDER BY",
                            value
                        )
                    })?;
                    if position < 1 || position as usize > select_list.len() {
                        return Err(bind_err!(
                            UndefinedColumn,
                            "ORDER BY position {} is not in select list",
                            position
                        ));
                    }
                    item.expr = select_list[position as usize - 1];
                }
                ExprKind::Column(col) if col.table_alias.is_none() && !col.is_resolved() => {
                    let name = col.column_name.to_lowercase();
                    if let Some(&target) = select_list
                        .iter()
                        .find(|&&id| self.exprs.output_name(id) == name)
                    {
                        item.expr = target;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Column nodes for `*` or `t.*`, in FROM order and schema order
    fn expand_star(&mut self, star: ExprId) -> BindResult<Vec<ExprId>> {
        let scope = self.scopes.current()?;
        if !scope.has_any_table() {
            return Err(bind_err!(
                SyntaxError,
                "SELECT * with no tables specified is not valid"
            ));
        }
        let depth = scope.depth();
        let tables: Vec<ScopeTable> = match &self.exprs[star].kind {
            ExprKind::TableStar { table } => {
                let name = table.to_lowercase();
                let found = scope.table(&name).ok_or_else(|| {
                    bind_err!(
                        UndefinedTable,
                        "missing FROM-clause entry for table \"{}\"",
                        name
                    )
                })?;
                vec![found.clone()]
            }
            _ => scope.tables().cloned().collect(),
        };

        let mut columns = Vec::new();
        for table in tables {
            match &table.source {
                TableSource::Regular(binding) => {
                    for col in &binding.schema.columns {
                        let mut column = ColumnRef::new(
                            Some(table.alias.clone()),
                            col.name.clone(),
                        );
                        column.database_id = binding.database_id;
                        column.table_id = binding.table_id;
                        column.column_id = col.id;
                        columns.push(self.star_column(column, col.data_type, depth));
                    }
                }
                TableSource::Derived(derived) => {
                    for col in derived {
                        let mut column = ColumnRef::new(
                            Some(table.alias.clone()),
                            col.alias.name.clone(),
                        );
                        column.column_id = col.column_id();
                        columns.push(self.star_column(column, col.data_type, depth));
                    }
                }
            }
        }
        Ok(columns)
    }

    fn star_column(
        &mut self,
        column: ColumnRef,
        data_type: LogicalType,
        depth: usize,
    ) -> ExprId {
        let id = self.exprs.add(ExprKind::Column(column));
        let node = &mut self.exprs[id];
        node.return_type = data_type;
        node.depth = Some(depth);
        self.exprs.derive_name(id);
        id
    }

    fn bind_cte(&mut self, cte: &mut CommonTableExpression) -> BindResult<()> {
        cte.name = cte.name.to_lowercase();
        trace!(cte = %cte.name, recursive = cte.recursive, "binding CTE");
        if cte.is_inductive() {
            // The base case alone fixes the column types the recursive part sees
            let union = cte.select.union.take();
            let base = self.bind_select(&mut cte.select);
            cte.select.union = union;
            base?;
            let columns = self.cte_columns(cte)?;
            self.scopes.current_mut()?.add_cte(&cte.name, columns)?;
            self.bind_select(&mut cte.select)
        } else {
            self.bind_select(&mut cte.select)?;
            let columns = self.cte_columns(cte)?;
            self.scopes.current_mut()?.add_cte(&cte.name, columns)
        }
    }

    /// Assign one serial-carrying alias per output column of a CTE
    fn cte_columns(&mut self, cte: &mut CommonTableExpression) -> BindResult<Vec<DerivedColumn>> {
        let select_list = &cte.select.select_list;
        if cte.column_aliases.len() > select_list.len() {
            return Err(bind_err!(
                SchemaMismatch,
                "WITH query {} has {} columns available but {} columns specified",
                cte.name,
                select_list.len(),
                cte.column_aliases.len()
            ));
        }

        let mut columns = Vec::with_capacity(select_list.len());
        for (i, &column) in select_list.iter().enumerate() {
            let given = cte.column_aliases.get(i);
            let name = match given {
                Some(alias) if !alias.is_empty() => alias.name.to_lowercase(),
                _ => self.exprs.output_name(column),
            };
            let serial = given
                .and_then(|alias| alias.serial)
                .unwrap_or_else(|| AliasSerial(self.accessor.new_temp_id()));
            let alias = Alias::with_serial(name, serial);
            self.exprs[column].alias = Some(alias.clone());
            self.exprs.derive_name(column);
            columns.push(DerivedColumn {
                alias,
                data_type: self.exprs[column].return_type,
            });
        }
        cte.column_aliases = columns.iter().map(|c| c.alias.clone()).collect();
        Ok(columns)
    }

    fn bind_table_ref(&mut self, table_ref: &mut TableReference) -> BindResult<()> {
        match table_ref {
            TableReference::Table(base) => self.bind_base_table(base, true),
            TableReference::Derived { select, alias } => {
                if alias.is_empty() {
                    return Err(bind_err!(
                        UndefinedTable,
                        "alias not found for query derived table"
                    ));
                }
                self.set_unique_alias(alias)?;
                self.bind_select(select)?;
                let columns = self.derived_columns(&select.select_list);
                self.scopes
                    .current_mut()?
                    .add_derived_table(alias.clone(), columns)
            }
            TableReference::Join(join) => {
                self.bind_table_ref(&mut join.left)?;
                self.bind_table_ref(&mut join.right)?;
                if let Some(condition) = join.condition {
                    self.bind_predicate(condition, "JOIN/ON")?;
                }
                Ok(())
            }
            TableReference::List(list) => list
                .iter_mut()
                .try_for_each(|table| self.bind_table_ref(table)),
        }
    }

    /// Output columns of a derived table; the alias serial doubles as column id
    fn derived_columns(&mut self, select_list: &[ExprId]) -> Vec<DerivedColumn> {
        let mut columns = Vec::with_capacity(select_list.len());
        for &id in select_list {
            let name = self.exprs.output_name(id);
            let serial = match &self.exprs[id].alias {
                Some(Alias {
                    serial: Some(serial),
                    ..
                }) => *serial,
                _ => self.sherpa.next_alias_serial(),
            };
            let alias = Alias::with_serial(name, serial);
            self.exprs[id].alias = Some(alias.clone());
            columns.push(DerivedColumn {
                alias,
                data_type: self.exprs[id].return_type,
            });
        }
        columns
    }

    /// Register a base table in the current scope. With `allow_cte`, a name
    /// matching a visible CTE binds to the CTE instead of the catalog.
    fn bind_base_table(&mut self, base: &mut BaseTableRef, allow_cte: bool) -> BindResult<()> {
        normalize_name(&mut base.name);
        self.validate_database(base.name.database.as_deref())?;
        self.set_unique_alias(&mut base.alias)?;

        if allow_cte && base.name.namespace.is_none() {
            if let Some(columns) = self.scopes.find_cte(&base.name.name) {
                let columns = columns.to_vec();
                trace!(cte = %base.name.name, alias = %base.alias, "aliasing CTE");
                return self
                    .scopes
                    .current_mut()?
                    .add_derived_table(base.alias.clone(), columns);
            }
        }

        let binding = self.table_binding(&base.name)?;
        self.scopes
            .current_mut()?
            .add_regular_table(base.alias.clone(), binding)
    }

    fn table_binding(&self, name: &TableName) -> BindResult<TableBinding> {
        let table_id = self.accessor.table_id(name).ok_or_else(|| {
            bind_err!(UndefinedTable, "relation \"{}\" does not exist", name.name)
        })?;
        let schema = self
            .accessor
            .schema(table_id)
            .ok_or_else(|| internal_err!("no schema for table {}", table_id))?;
        Ok(TableBinding {
            database_id: self.accessor.database(),
            table_id,
            schema,
        })
    }

    fn set_unique_alias(&mut self, alias: &mut Alias) -> BindResult<()> {
        alias.name = alias.name.to_lowercase();
        if alias.serial.is_none() {
            alias.serial = Some(self.sherpa.next_alias_serial());
        }
        self.scopes.current_mut()?.register_alias(alias.clone());
        Ok(())
    }

    /// A database qualifier must name the accessor's own database
    fn validate_database(&self, database: Option<&str>) -> BindResult<()> {
        let Some(name) = database else {
            return Ok(());
        };
        let id = self
            .accessor
            .database_id(name)
            .ok_or_else(|| bind_err!(UndefinedObject, "database \"{}\" does not exist", name))?;
        if id != self.accessor.database() {
            return Err(bind_err!(
                FeatureNotSupported,
                "cross-database references are not implemented: \"{}\"",
                name
            ));
        }
        Ok(())
    }
}

pub(crate) fn normalize_name(name: &mut TableName) {
    name.name = name.name.to_lowercase();
    if let Some(ns) = name.namespace.as_mut() {
        *ns = ns.to_lowercase();
    }
    if let Some(db) = name.database.as_mut() {
        *db = db.to_lowercase();
    }
}

/// Re-execution fast path: convert fresh parameter values to the types
/// inferred when the statement was first bound, without re-binding it.
pub fn promote_parameters(values: &mut [Value], cached_types: &[LogicalType]) -> BindResult<()> {
    if values.len() != cached_types.len() {
        return Err(BindError::UndefinedParameter(format!(
            "statement expects {} parameters but {} were supplied",
            cached_types.len(),
            values.len()
        )));
    }
    for (value, ty) in values.iter_mut().zip(cached_types) {
        *value = value.try_promote(ty)?;
    }
    Ok(())
}
