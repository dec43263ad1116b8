//! Logical plan construction
//!
//! [`PlanBuilder`] lowers a [`BoundStatement`] into a [`LogicalPlan`]. Names,
//! types and ids are already resolved by the binder, so this pass only decides
//! operator shape: join trees, predicate lists, aggregation, CTE placement and
//! subquery decorrelation.

use super::logical_plan::*;
use super::predicate::{column_depths, extract_predicates, has_bare_column, split_conjuncts};
use crate::binder::{BoundStatement, DerivedColumn};
use crate::catalog::{
    CatalogAccessor, ColumnId, ColumnSchema, NamespaceId, TableId, TableSchema,
};
use crate::common::error::{BindError, BindResult};
use crate::parser::{
    Alias, AnalyzeStatement, BaseTableRef, ColumnRef, CommonTableExpression, ComparisonOp,
    CreateKind, CreateStatement, DeleteStatement, DropKind, DropStatement, ExprArena, ExprId,
    ExprKind, IndexAttribute, InsertSource, InsertStatement, JoinType, OperatorKind,
    SelectStatement, Statement, TableName, TableReference, UpdateStatement,
};
use crate::{bind_err, internal_err, not_implemented_err};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// A CTE visible while lowering one query block
#[derive(Debug, Clone)]
struct CteInfo {
    name: String,
    columns: Vec<DerivedColumn>,
    table_id: TableId,
    expressions: Vec<Vec<ExprId>>,
    is_recursive: bool,
}

/// State threaded through one `transform` call
struct BuildState<'s> {
    exprs: &'s mut ExprArena,
    /// Innermost CTE last; truncated when a query block is left
    ctes: Vec<CteInfo>,
}

impl BuildState<'_> {
    fn find_cte(&self, name: &str) -> Option<&CteInfo> {
        self.ctes.iter().rev().find(|cte| cte.name == name)
    }
}

/// Builds a logical operator tree from a bound statement
pub struct PlanBuilder<'a> {
    accessor: &'a dyn CatalogAccessor,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(accessor: &'a dyn CatalogAccessor) -> Self {
        Self { accessor }
    }

    /// Lower `bound` into a logical plan. Subquery predicates are rewritten
    /// in place, so the statement reflects the plan afterwards.
    pub fn transform(&self, bound: &mut BoundStatement) -> BindResult<LogicalPlan> {
        let BoundStatement {
            statement, exprs, ..
        } = bound;
        let mut state = BuildState {
            exprs,
            ctes: Vec::new(),
        };
        let plan = self.build_statement(&mut state, statement)?;
        debug!(kind = statement.kind_name(), "built logical plan");
        Ok(plan)
    }

    fn build_statement(
        &self,
        state: &mut BuildState<'_>,
        statement: &Statement,
    ) -> BindResult<LogicalPlan> {
        match statement {
            Statement::Select(select) => self.build_select(state, select),
            Statement::Insert(insert) => self.build_insert(state, insert),
            Statement::Update(update) => self.build_update(state, update),
            Statement::Delete(delete) => self.build_delete(state, delete),
            Statement::Create(create) => self.build_create(state, create),
            Statement::Drop(drop) => self.build_drop(drop),
            Statement::Analyze(analyze) => self.build_analyze(analyze),
            Statement::Explain(explain) => Ok(LogicalPlan::Explain(LogicalExplain {
                input: Box::new(self.build_statement(state, &explain.statement)?),
            })),
        }
    }

    fn build_select(
        &self,
        state: &mut BuildState<'_>,
        select: &SelectStatement,
    ) -> BindResult<LogicalPlan> {
        let visible = state.ctes.len();
        let result = self.build_query(state, select);
        state.ctes.truncate(visible);
        result
    }

    /// WITH list, query block and UNION branches. Every branch sees the CTEs.
    fn build_query(
        &self,
        state: &mut BuildState<'_>,
        select: &SelectStatement,
    ) -> BindResult<LogicalPlan> {
        let mut cte_plans = Vec::with_capacity(select.with.len());
        for cte in &select.with {
            cte_plans.push((cte.name.clone(), self.build_cte(state, cte)?));
        }

        let mut plan = self.build_select_body(state, select)?;
        if let Some(right) = &select.union {
            plan = LogicalPlan::Union(LogicalUnion {
                left: Box::new(plan),
                right: Box::new(self.build_select(state, right)?),
            });
        }

        // Later CTEs first, so a CTE used only inside another CTE finds its scan
        for (name, subtree) in cte_plans.into_iter().rev() {
            if plan.attach_cte(&name, subtree).is_some() {
                trace!(cte = %name, "CTE is never referenced");
            }
        }
        Ok(plan)
    }

    fn build_select_body(
        &self,
        state: &mut BuildState<'_>,
        select: &SelectStatement,
    ) -> BindResult<LogicalPlan> {
        let depth = select
            .depth
            .ok_or_else(|| internal_err!("query block was not bound"))?;

        let mut plan = match &select.from {
            Some(from) => self.build_table_ref(state, from)?,
            None => LogicalPlan::Get(LogicalGet::empty()),
        };

        if let Some(predicate) = select.where_clause {
            let (input, predicates) = self.collect_predicates(state, predicate, plan)?;
            plan = LogicalPlan::Filter(LogicalFilter::new(input, predicates));
        }

        let exprs = &*state.exprs;
        let has_aggregate = select
            .select_list
            .iter()
            .any(|&id| exprs.contains_aggregate(id));
        if has_aggregate && select.group_by.is_none() {
            let mixed = select
                .select_list
                .iter()
                .any(|&id| has_bare_column(exprs, id, depth));
            if mixed {
                return Err(bind_err!(
                    SyntaxError,
                    "mixing aggregate and non-aggregate columns without GROUP BY"
                ));
            }
        }

        if let Some(group_by) = &select.group_by {
            plan = LogicalPlan::Aggregate(LogicalAggregate::new(plan, group_by.columns.clone()));
            if let Some(having) = group_by.having {
                if state.exprs[having].has_subquery {
                    return Err(not_implemented_err!("subqueries in HAVING are not supported"));
                }
                let predicates = extract_predicates(state.exprs, having);
                plan = LogicalPlan::Filter(LogicalFilter::new(plan, predicates));
            }
        } else if has_aggregate {
            plan = LogicalPlan::Aggregate(LogicalAggregate::new(plan, Vec::new()));
        } else if select.distinct {
            plan = LogicalPlan::Aggregate(LogicalAggregate::new(plan, select.select_list.clone()));
        }

        if select.order_by.is_some() || select.limit.is_some() {
            plan = LogicalPlan::Limit(limit_node(plan, select)?);
        }
        Ok(plan)
    }

    /// Register a CTE and build its defining subtree. A recursive CTE is
    /// visible to its own body.
    fn build_cte(
        &self,
        state: &mut BuildState<'_>,
        cte: &CommonTableExpression,
    ) -> BindResult<LogicalPlan> {
        let mut expressions = vec![cte.select.select_list.clone()];
        if let Some(inductive) = cte.select.union.as_ref().filter(|_| cte.recursive) {
            expressions.push(inductive.select_list.clone());
        }
        let columns = cte
            .column_aliases
            .iter()
            .zip(&cte.select.select_list)
            .map(|(alias, &id)| DerivedColumn {
                alias: alias.clone(),
                data_type: state.exprs[id].return_type,
            })
            .collect();
        let info = CteInfo {
            name: cte.name.clone(),
            columns,
            table_id: TableId::temp(self.accessor.new_temp_id()),
            expressions,
            is_recursive: cte.recursive,
        };
        trace!(cte = %info.name, table = %info.table_id, recursive = info.is_recursive, "registering CTE");

        if cte.recursive {
            state.ctes.push(info);
            self.build_select(state, &cte.select)
        } else {
            let plan = self.build_select(state, &cte.select)?;
            state.ctes.push(info);
            Ok(plan)
        }
    }

    fn build_table_ref(
        &self,
        state: &mut BuildState<'_>,
        table_ref: &TableReference,
    ) -> BindResult<LogicalPlan> {
        match table_ref {
            TableReference::Table(base) => self.build_base_table(state, base),
            TableReference::Derived { select, alias } => {
                let input = self.build_select(state, select)?;
                let alias_to_expr: IndexMap<String, ExprId> = select
                    .select_list
                    .iter()
                    .map(|&id| (state.exprs.output_name(id), id))
                    .collect();
                Ok(LogicalPlan::QueryDerivedGet(LogicalQueryDerivedGet {
                    input: Box::new(input),
                    table_alias: alias.clone(),
                    alias_to_expr,
                }))
            }
            TableReference::Join(join) => {
                let left = self.build_table_ref(state, &join.left)?;
                let right = self.build_table_ref(state, &join.right)?;
                let predicates = match join.condition {
                    Some(condition) if state.exprs[condition].has_subquery => {
                        return Err(not_implemented_err!(
                            "subqueries in join conditions are not supported"
                        ))
                    }
                    Some(condition) => extract_predicates(state.exprs, condition),
                    None => Vec::new(),
                };
                let join_type = match join.join_type {
                    JoinType::Inner => LogicalJoinType::Inner,
                    JoinType::Outer => LogicalJoinType::Outer,
                    JoinType::Left => LogicalJoinType::Left,
                    JoinType::Right => LogicalJoinType::Right,
                    JoinType::Semi => LogicalJoinType::Semi,
                };
                Ok(LogicalPlan::Join(LogicalJoin::new(
                    join_type, left, right, predicates,
                )))
            }
            TableReference::List(tables) => {
                let mut tables = tables.iter();
                let first = tables
                    .next()
                    .ok_or_else(|| internal_err!("empty FROM list"))?;
                let mut plan = self.build_table_ref(state, first)?;
                for table in tables {
                    let right = self.build_table_ref(state, table)?;
                    plan = LogicalPlan::Join(LogicalJoin::new(
                        LogicalJoinType::Inner,
                        plan,
                        right,
                        Vec::new(),
                    ));
                }
                Ok(plan)
            }
        }
    }

    fn build_base_table(
        &self,
        state: &BuildState<'_>,
        base: &BaseTableRef,
    ) -> BindResult<LogicalPlan> {
        if base.name.namespace.is_none() {
            if let Some(cte) = state.find_cte(&base.name.name) {
                return Ok(LogicalPlan::CteScan(LogicalCteScan {
                    table_alias: base.alias.clone(),
                    cte_name: cte.name.clone(),
                    table_id: cte.table_id,
                    columns: cte.columns.clone(),
                    expressions: cte.expressions.clone(),
                    is_recursive: cte.is_recursive,
                    input: None,
                }));
            }
        }
        Ok(LogicalPlan::Get(LogicalGet::new(
            self.accessor.database(),
            self.namespace_of(&base.name)?,
            self.table_id(&base.name)?,
            base.alias.clone(),
        )))
    }

    /// Rewrite subquery conjuncts of `root` into joins above `plan` and return
    /// the joined input with the predicate list for the Filter on top
    fn collect_predicates(
        &self,
        state: &mut BuildState<'_>,
        root: ExprId,
        plan: LogicalPlan,
    ) -> BindResult<(LogicalPlan, Vec<AnnotatedExpression>)> {
        let mut plan = plan;
        for conjunct in split_conjuncts(state.exprs, root) {
            if state.exprs[conjunct].has_subquery {
                plan = self.decorrelate(state, conjunct, plan)?;
            }
        }
        Ok((plan, extract_predicates(state.exprs, root)))
    }

    /// Turn one predicate with a subquery operand into a Mark or Single join
    fn decorrelate(
        &self,
        state: &mut BuildState<'_>,
        predicate: ExprId,
        plan: LogicalPlan,
    ) -> BindResult<LogicalPlan> {
        let exprs = &*state.exprs;
        // Comparisons, IN included, take exactly one subquery column; EXISTS takes any
        let (join_type, subquery, single_column) = match &exprs[predicate].kind {
            ExprKind::Comparison { op, left, right } => {
                let subquery = match (exprs[*left].is_subquery(), exprs[*right].is_subquery()) {
                    (true, true) => {
                        return Err(bind_err!(
                            FeatureNotSupported,
                            "comparison between two subqueries is not supported"
                        ))
                    }
                    (false, true) => *right,
                    (true, false) => *left,
                    (false, false) => return Err(unsupported_subquery_predicate()),
                };
                let join_type = match op {
                    ComparisonOp::In => LogicalJoinType::Mark,
                    _ => LogicalJoinType::Single,
                };
                (join_type, subquery, true)
            }
            ExprKind::Operator {
                op: OperatorKind::Exists,
                children,
            } => match children.as_slice() {
                [child] if exprs[*child].is_subquery() => {
                    (LogicalJoinType::Mark, *child, false)
                }
                _ => return Err(unsupported_subquery_predicate()),
            },
            _ => return Err(unsupported_subquery_predicate()),
        };

        let select = state.exprs.take_subquery(subquery)?;
        let built = self.build_subquery(state, &select, single_column);
        let first = select.select_list.first().copied();
        state.exprs.restore_subquery(subquery, select);
        let right = built?;
        let first = first.ok_or_else(|| internal_err!("subquery without output columns"))?;

        if let ExprKind::Operator { op, children } = &mut state.exprs[predicate].kind {
            *op = OperatorKind::IsNotNull;
            *children = vec![first];
        } else {
            if let ExprKind::Comparison { op, .. } = &mut state.exprs[predicate].kind {
                if *op == ComparisonOp::In {
                    *op = ComparisonOp::Equal;
                }
            }
            state.exprs.replace_child(predicate, subquery, first);
        }
        debug!(join = ?join_type, "rewrote subquery predicate");
        Ok(LogicalPlan::Join(LogicalJoin::new(
            join_type,
            plan,
            right,
            Vec::new(),
        )))
    }

    fn build_subquery(
        &self,
        state: &mut BuildState<'_>,
        select: &SelectStatement,
        single_column: bool,
    ) -> BindResult<LogicalPlan> {
        if single_column && select.select_list.len() != 1 {
            return Err(not_implemented_err!("array in predicates not supported"));
        }
        self.is_supported_subselect(state.exprs, select)?;
        self.build_select(state, select)
    }

    /// A subquery may reference only its immediately enclosing query. When it
    /// aggregates, each correlated conjunct must be `outer_column = inner_expr`.
    fn is_supported_subselect(
        &self,
        exprs: &ExprArena,
        select: &SelectStatement,
    ) -> BindResult<()> {
        let depth = select
            .depth
            .ok_or_else(|| internal_err!("subquery was not bound"))?;

        let reaches_too_far = select
            .select_list
            .iter()
            .chain(select.where_clause.iter())
            .flat_map(|&id| column_depths(exprs, id))
            .any(|d| d + 1 < depth);
        if reaches_too_far {
            return Err(not_implemented_err!(
                "correlated subquery referencing a query more than one level out"
            ));
        }

        let aggregating = select.group_by.is_some()
            || select
                .select_list
                .iter()
                .any(|&id| exprs.contains_aggregate(id));
        let Some(where_clause) = select.where_clause.filter(|_| aggregating) else {
            return Ok(());
        };

        for conjunct in split_conjuncts(exprs, where_clause) {
            if !exprs[conjunct].depth.is_some_and(|d| d < depth) {
                continue;
            }
            let supported = match &exprs[conjunct].kind {
                ExprKind::Comparison {
                    op: ComparisonOp::Equal,
                    left,
                    right,
                } => {
                    let outer = |id: ExprId| {
                        exprs[id].column().is_some() && exprs[id].depth.is_some_and(|d| d < depth)
                    };
                    let inner = |id: ExprId| exprs[id].depth == Some(depth);
                    (outer(*left) && inner(*right)) || (outer(*right) && inner(*left))
                }
                _ => false,
            };
            if !supported {
                return Err(not_implemented_err!(
                    "correlated predicate {} in an aggregating subquery",
                    exprs.display(conjunct)
                ));
            }
        }
        Ok(())
    }

    fn build_insert(
        &self,
        state: &mut BuildState<'_>,
        insert: &InsertStatement,
    ) -> BindResult<LogicalPlan> {
        let table = &insert.table.name;
        let namespace_id = self.namespace_of(table)?;
        let table_id = self.table_id(table)?;
        let schema = self.schema(table_id)?;

        let columns = insert
            .columns
            .iter()
            .map(|name| {
                schema.column(name).ok_or_else(|| {
                    bind_err!(
                        UndefinedColumn,
                        "column \"{}\" of relation \"{}\" does not exist",
                        name,
                        table.name
                    )
                })
            })
            .collect::<BindResult<Vec<_>>>()?;

        match &insert.source {
            InsertSource::Values(rows) => {
                for row in rows {
                    check_insert_row(state.exprs, row, &columns)?;
                }
                Ok(LogicalPlan::Insert(LogicalInsert {
                    database_id: self.accessor.database(),
                    namespace_id,
                    table_id,
                    columns: columns.iter().map(|c| c.id).collect(),
                    values: rows.clone(),
                }))
            }
            InsertSource::Select(select) => {
                check_insert_row(state.exprs, &select.select_list, &columns)?;
                Ok(LogicalPlan::InsertSelect(LogicalInsertSelect {
                    input: Box::new(self.build_select(state, select)?),
                    database_id: self.accessor.database(),
                    namespace_id,
                    table_id,
                }))
            }
        }
    }

    fn build_update(
        &self,
        state: &mut BuildState<'_>,
        update: &UpdateStatement,
    ) -> BindResult<LogicalPlan> {
        let get = self.target_get(state, &update.table, update.where_clause, "UPDATE")?;
        let schema = self.schema(get.table_id)?;
        let updates = update
            .clauses
            .iter()
            .map(|clause| {
                schema
                    .column(&clause.column)
                    .map(|column| (column.id, clause.value))
                    .ok_or_else(|| {
                        bind_err!(UndefinedColumn, "column \"{}\" does not exist", clause.column)
                    })
            })
            .collect::<BindResult<Vec<_>>>()?;

        Ok(LogicalPlan::Update(LogicalUpdate {
            database_id: get.database_id,
            namespace_id: get.namespace_id,
            table_id: get.table_id,
            table_alias: get.table_alias.clone(),
            input: Box::new(LogicalPlan::Get(get)),
            updates,
        }))
    }

    fn build_delete(
        &self,
        state: &mut BuildState<'_>,
        delete: &DeleteStatement,
    ) -> BindResult<LogicalPlan> {
        let get = self.target_get(state, &delete.table, delete.where_clause, "DELETE")?;
        Ok(LogicalPlan::Delete(LogicalDelete {
            database_id: get.database_id,
            namespace_id: get.namespace_id,
            table_id: get.table_id,
            table_alias: get.table_alias.clone(),
            input: Box::new(LogicalPlan::Get(get)),
        }))
    }

    /// Get for the table an UPDATE or DELETE modifies, carrying its WHERE
    fn target_get(
        &self,
        state: &BuildState<'_>,
        table: &BaseTableRef,
        where_clause: Option<ExprId>,
        statement: &str,
    ) -> BindResult<LogicalGet> {
        let mut get = LogicalGet::new(
            self.accessor.database(),
            self.namespace_of(&table.name)?,
            self.table_id(&table.name)?,
            table.alias.clone(),
        );
        get.is_for_update = true;
        if let Some(predicate) = where_clause {
            if state.exprs[predicate].has_subquery {
                return Err(not_implemented_err!(
                    "subqueries in {} WHERE clauses are not supported",
                    statement
                ));
            }
            get.predicates = extract_predicates(state.exprs, predicate);
        }
        Ok(get)
    }

    fn build_create(
        &self,
        state: &mut BuildState<'_>,
        create: &CreateStatement,
    ) -> BindResult<LogicalPlan> {
        match &create.kind {
            CreateKind::Database { name } => {
                Ok(LogicalPlan::CreateDatabase(LogicalCreateDatabase { name: name.clone() }))
            }
            CreateKind::Schema { name } => {
                Ok(LogicalPlan::CreateNamespace(LogicalCreateNamespace { name: name.clone() }))
            }
            CreateKind::Table {
                name,
                columns,
                foreign_keys,
            } => Ok(LogicalPlan::CreateTable(LogicalCreateTable {
                namespace_id: self.namespace_of(name)?,
                table_name: name.name.clone(),
                columns: columns.clone(),
                foreign_keys: foreign_keys.clone(),
            })),
            CreateKind::Index {
                name,
                table,
                attributes,
                unique,
            } => {
                let table_id = self.table_id(table)?;
                let schema = self.schema(table_id)?;
                let attributes = attributes
                    .iter()
                    .map(|attribute| match attribute {
                        IndexAttribute::Expression(expr) => Ok(*expr),
                        IndexAttribute::Column(column) => {
                            self.index_column(state.exprs, table, table_id, &schema, column)
                        }
                    })
                    .collect::<BindResult<Vec<_>>>()?;
                Ok(LogicalPlan::CreateIndex(LogicalCreateIndex {
                    namespace_id: self.namespace_of(table)?,
                    table_id,
                    index_name: name.clone(),
                    unique: *unique,
                    attributes,
                }))
            }
            CreateKind::Trigger {
                name,
                table,
                when,
                function,
                args,
                columns,
                timing,
                events,
            } => {
                let table_id = self.table_id(table)?;
                let schema = self.schema(table_id)?;
                let columns = columns
                    .iter()
                    .map(|column| {
                        let column = column.to_lowercase();
                        schema.column(&column).map(|c| c.id).ok_or_else(|| {
                            bind_err!(
                                UndefinedColumn,
                                "column \"{}\" of relation \"{}\" does not exist",
                                column,
                                table.name
                            )
                        })
                    })
                    .collect::<BindResult<Vec<ColumnId>>>()?;
                Ok(LogicalPlan::CreateTrigger(LogicalCreateTrigger {
                    namespace_id: self.namespace_of(table)?,
                    table_id,
                    trigger_name: name.clone(),
                    when: *when,
                    function: function.clone(),
                    args: args.clone(),
                    columns,
                    timing: *timing,
                    events: events.clone(),
                }))
            }
            CreateKind::View { name, query } => Ok(LogicalPlan::CreateView(LogicalCreateView {
                namespace_id: self.namespace_of(name)?,
                view_name: name.name.clone(),
                query: query.clone(),
            })),
        }
    }

    /// Resolved column reference for a plain-name index attribute
    fn index_column(
        &self,
        exprs: &mut ExprArena,
        table: &TableName,
        table_id: TableId,
        schema: &TableSchema,
        column: &str,
    ) -> BindResult<ExprId> {
        let found = schema
            .column(column)
            .ok_or_else(|| bind_err!(UndefinedColumn, "column \"{}\" does not exist", column))?;
        let mut column_ref = ColumnRef::new(Some(Alias::new(table.name.clone())), found.name.clone());
        column_ref.database_id = self.accessor.database();
        column_ref.table_id = table_id;
        column_ref.column_id = found.id;

        let id = exprs.add(ExprKind::Column(column_ref));
        exprs[id].return_type = found.data_type;
        exprs[id].depth = Some(0);
        exprs.derive_name(id);
        Ok(id)
    }

    fn build_drop(&self, drop: &DropStatement) -> BindResult<LogicalPlan> {
        let name = &drop.target;
        let missing = |kind: &str| bind_err!(UndefinedObject, "{} \"{}\" does not exist", kind, name.name);
        let target = match drop.kind {
            DropKind::Database => DropTarget::Database(
                self.accessor
                    .database_id(&name.name)
                    .ok_or_else(|| missing("database"))?,
            ),
            DropKind::Schema => DropTarget::Namespace(
                self.accessor
                    .namespace_id(&name.name)
                    .ok_or_else(|| missing("schema"))?,
            ),
            DropKind::Table => DropTarget::Table(self.accessor.table_id(name).ok_or_else(|| {
                bind_err!(UndefinedTable, "table \"{}\" does not exist", name.name)
            })?),
            DropKind::Index => {
                DropTarget::Index(self.accessor.index_id(name).ok_or_else(|| missing("index"))?)
            }
            DropKind::Trigger => DropTarget::Trigger(
                self.accessor
                    .trigger_id(name)
                    .ok_or_else(|| missing("trigger"))?,
            ),
            DropKind::View => {
                DropTarget::View(self.accessor.view_id(name).ok_or_else(|| missing("view"))?)
            }
        };
        Ok(LogicalPlan::Drop(LogicalDrop {
            target,
            if_exists: drop.if_exists,
        }))
    }

    fn build_analyze(&self, analyze: &AnalyzeStatement) -> BindResult<LogicalPlan> {
        let table = analyze
            .table
            .as_ref()
            .ok_or_else(|| bind_err!(SyntaxError, "ANALYZE requires a table"))?;
        let get = LogicalGet::new(
            analyze.database_id,
            self.namespace_of(table)?,
            analyze.table_id,
            Alias::new(table.name.clone()),
        );
        let scan = LogicalPlan::Aggregate(LogicalAggregate::new(LogicalPlan::Get(get), Vec::new()));
        Ok(LogicalPlan::Analyze(LogicalAnalyze {
            input: Box::new(scan),
            database_id: analyze.database_id,
            table_id: analyze.table_id,
            column_ids: analyze.column_ids.clone(),
        }))
    }

    fn namespace_of(&self, name: &TableName) -> BindResult<NamespaceId> {
        match &name.namespace {
            None => Ok(self.accessor.default_namespace()),
            Some(namespace) => self.accessor.namespace_id(namespace).ok_or_else(|| {
                bind_err!(UndefinedObject, "schema \"{}\" does not exist", namespace)
            }),
        }
    }

    fn table_id(&self, name: &TableName) -> BindResult<TableId> {
        self.accessor
            .table_id(name)
            .ok_or_else(|| bind_err!(UndefinedTable, "relation \"{}\" does not exist", name.name))
    }

    fn schema(&self, table_id: TableId) -> BindResult<Arc<TableSchema>> {
        self.accessor
            .schema(table_id)
            .ok_or_else(|| internal_err!("no schema for table {}", table_id))
    }
}

fn unsupported_subquery_predicate() -> BindError {
    not_implemented_err!("subquery in this predicate position is not supported")
}

fn limit_node(input: LogicalPlan, select: &SelectStatement) -> BindResult<LogicalLimit> {
    let to_count = |n: i64| {
        u64::try_from(n).map_err(|_| bind_err!(SyntaxError, "LIMIT and OFFSET must not be negative"))
    };
    let (limit, offset) = match &select.limit {
        Some(desc) => (
            desc.limit.map(to_count).transpose()?,
            desc.offset.map(to_count).transpose()?.unwrap_or(0),
        ),
        None => (None, 0),
    };
    let items = select
        .order_by
        .as_ref()
        .map(|order_by| order_by.items.as_slice())
        .unwrap_or_default();
    Ok(LogicalLimit {
        input: Box::new(input),
        limit,
        offset,
        sort_exprs: items.iter().map(|item| item.expr).collect(),
        sort_directions: items.iter().map(|item| item.direction).collect(),
    })
}

/// Row width must match the target columns and NULL may not go into a NOT NULL column
fn check_insert_row(
    exprs: &ExprArena,
    row: &[ExprId],
    columns: &[&ColumnSchema],
) -> BindResult<()> {
    if row.len() > columns.len() {
        return Err(bind_err!(
            SyntaxError,
            "INSERT has more expressions than target columns"
        ));
    }
    if row.len() < columns.len() {
        return Err(bind_err!(
            SyntaxError,
            "INSERT has more target columns than expressions"
        ));
    }
    for (&value, column) in row.iter().zip(columns) {
        if !column.nullable && exprs[value].is_null_constant() {
            return Err(bind_err!(
                SyntaxError,
                "null value in column \"{}\" violates not-null constraint",
                column.name
            ));
        }
    }
    Ok(())
}
