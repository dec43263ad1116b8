//! Logical Plan Representation
//!
//! Operator tree handed to the cost-based optimizer. Nodes reference bound
//! expressions by [`ExprId`] in the statement's arena and carry the resolved
//! catalog ids the physical planner needs.

use crate::binder::DerivedColumn;
use crate::catalog::{
    ColumnId, DatabaseId, IndexId, NamespaceId, TableId, TriggerId, ViewId,
};
use crate::parser::{
    Alias, ColumnDefinition, ExprId, ForeignKeyDefinition, OrderDirection, SelectStatement,
    TriggerEvent, TriggerTiming,
};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

/// A predicate plus the table aliases it references
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedExpression {
    pub expr: ExprId,
    pub table_aliases: HashSet<Alias>,
}

impl AnnotatedExpression {
    pub fn new(expr: ExprId, table_aliases: HashSet<Alias>) -> Self {
        Self {
            expr,
            table_aliases,
        }
    }
}

/// Logical plan node types
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    /// Scan a base table, or produce one empty row when there is no FROM
    Get(LogicalGet),
    /// Rows of a derived table in FROM
    QueryDerivedGet(LogicalQueryDerivedGet),
    /// Reference to a CTE
    CteScan(LogicalCteScan),
    Filter(LogicalFilter),
    Join(LogicalJoin),
    Aggregate(LogicalAggregate),
    /// Sort keys plus optional LIMIT/OFFSET
    Limit(LogicalLimit),
    Union(LogicalUnion),
    Insert(LogicalInsert),
    InsertSelect(LogicalInsertSelect),
    Update(LogicalUpdate),
    Delete(LogicalDelete),
    CreateDatabase(LogicalCreateDatabase),
    CreateNamespace(LogicalCreateNamespace),
    CreateTable(LogicalCreateTable),
    CreateIndex(LogicalCreateIndex),
    CreateTrigger(LogicalCreateTrigger),
    CreateView(LogicalCreateView),
    Drop(LogicalDrop),
    Analyze(LogicalAnalyze),
    Explain(LogicalExplain),
}

impl LogicalPlan {
    /// Get all child plans of this plan node
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::QueryDerivedGet(get) => vec![&get.input],
            LogicalPlan::CteScan(scan) => scan.input.iter().map(|p| p.as_ref()).collect(),
            LogicalPlan::Filter(filter) => vec![&filter.input],
            LogicalPlan::Join(join) => vec![&join.left, &join.right],
            LogicalPlan::Aggregate(agg) => vec![&agg.input],
            LogicalPlan::Limit(limit) => vec![&limit.input],
            LogicalPlan::Union(union) => vec![&union.left, &union.right],
            LogicalPlan::InsertSelect(insert) => vec![&insert.input],
            LogicalPlan::Update(update) => vec![&update.input],
            LogicalPlan::Delete(delete) => vec![&delete.input],
            LogicalPlan::Analyze(analyze) => vec![&analyze.input],
            LogicalPlan::Explain(explain) => vec![&explain.input],
            LogicalPlan::Get(_)
            | LogicalPlan::Insert(_)
            | LogicalPlan::CreateDatabase(_)
            | LogicalPlan::CreateNamespace(_)
            | LogicalPlan::CreateTable(_)
            | LogicalPlan::CreateIndex(_)
            | LogicalPlan::CreateTrigger(_)
            | LogicalPlan::CreateView(_)
            | LogicalPlan::Drop(_) => vec![],
        }
    }

    /// Get mutable references to child plans
    pub fn children_mut(&mut self) -> Vec<&mut LogicalPlan> {
        match self {
            LogicalPlan::QueryDerivedGet(get) => vec![&mut get.input],
            LogicalPlan::CteScan(scan) => scan.input.iter_mut().map(|p| p.as_mut()).collect(),
            LogicalPlan::Filter(filter) => vec![&mut filter.input],
            LogicalPlan::Join(join) => vec![&mut join.left, &mut join.right],
            LogicalPlan::Aggregate(agg) => vec![&mut agg.input],
            LogicalPlan::Limit(limit) => vec![&mut limit.input],
            LogicalPlan::Union(union) => vec![&mut union.left, &mut union.right],
            LogicalPlan::InsertSelect(insert) => vec![&mut insert.input],
            LogicalPlan::Update(update) => vec![&mut update.input],
            LogicalPlan::Delete(delete) => vec![&mut delete.input],
            LogicalPlan::Analyze(analyze) => vec![&mut analyze.input],
            LogicalPlan::Explain(explain) => vec![&mut explain.input],
            LogicalPlan::Get(_)
            | LogicalPlan::Insert(_)
            | LogicalPlan::CreateDatabase(_)
            | LogicalPlan::CreateNamespace(_)
            | LogicalPlan::CreateTable(_)
            | LogicalPlan::CreateIndex(_)
            | LogicalPlan::CreateTrigger(_)
            | LogicalPlan::CreateView(_)
            | LogicalPlan::Drop(_) => vec![],
        }
    }

    /// Attach `subtree` under the first CTE placeholder named `cte_name`
    /// (depth-first, leftmost). Gives the subtree back when no placeholder
    /// is found.
    pub fn attach_cte(&mut self, cte_name: &str, subtree: LogicalPlan) -> Option<LogicalPlan> {
        if let LogicalPlan::CteScan(scan) = self {
            if scan.cte_name == cte_name && scan.input.is_none() {
                scan.input = Some(Box::new(subtree));
                return None;
            }
        }
        let mut subtree = subtree;
        for child in self.children_mut() {
            match child.attach_cte(cte_name, subtree) {
                None => return None,
                Some(unused) => subtree = unused,
            }
        }
        Some(subtree)
    }

    fn label(&self) -> String {
        match self {
            LogicalPlan::Get(get) if !get.table_id.is_valid() => "Get (no table)".to_string(),
            LogicalPlan::Get(get) => format!(
                "Get {} table={}{}{}",
                get.table_alias,
                get.table_id,
                predicate_count(&get.predicates),
                if get.is_for_update { " for update" } else { "" }
            ),
            LogicalPlan::QueryDerivedGet(get) => format!(
                "QueryDerivedGet {} columns=[{}]",
                get.table_alias,
                get.alias_to_expr.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
            LogicalPlan::CteScan(scan) => format!(
                "CteScan {} cte={} table={}{}",
                scan.table_alias,
                scan.cte_name,
                scan.table_id,
                if scan.is_recursive { " recursive" } else { "" }
            ),
            LogicalPlan::Filter(filter) => {
                format!("Filter{}", predicate_count(&filter.predicates))
            }
            LogicalPlan::Join(join) => {
                format!("{:?}Join{}", join.join_type, predicate_count(&join.predicates))
            }
            LogicalPlan::Aggregate(agg) => format!("Aggregate group_by={}", agg.group_by.len()),
            LogicalPlan::Limit(limit) => format!(
                "Limit limit={} offset={} sort_keys={}",
                limit
                    .limit
                    .map_or_else(|| "all".to_string(), |n| n.to_string()),
                limit.offset,
                limit.sort_exprs.len()
            ),
            LogicalPlan::Union(_) => "Union".to_string(),
            LogicalPlan::Insert(insert) => format!(
                "Insert table={} rows={}",
                insert.table_id,
                insert.values.len()
            ),
            LogicalPlan::InsertSelect(insert) => format!("InsertSelect table={}", insert.table_id),
            LogicalPlan::Update(update) => format!(
                "Update table={} set={}",
                update.table_id,
                update.updates.len()
            ),
            LogicalPlan::Delete(delete) => format!("Delete table={}", delete.table_id),
            LogicalPlan::CreateDatabase(create) => format!("CreateDatabase {}", create.name),
            LogicalPlan::CreateNamespace(create) => format!("CreateNamespace {}", create.name),
            LogicalPlan::CreateTable(create) => format!(
                "CreateTable {} namespace={} columns={}",
                create.table_name,
                create.namespace_id,
                create.columns.len()
            ),
            LogicalPlan::CreateIndex(create) => format!(
                "CreateIndex {} table={}{}",
                create.index_name,
                create.table_id,
                if create.unique { " unique" } else { "" }
            ),
            LogicalPlan::CreateTrigger(create) => format!(
                "CreateTrigger {} table={}",
                create.trigger_name, create.table_id
            ),
            LogicalPlan::CreateView(create) => format!(
                "CreateView {} namespace={}",
                create.view_name, create.namespace_id
            ),
            LogicalPlan::Drop(drop) => format!("Drop {:?}", drop.target),
            LogicalPlan::Analyze(analyze) => format!(
                "Analyze table={} columns={}",
                analyze.table_id,
                analyze.column_ids.len()
            ),
            LogicalPlan::Explain(_) => "Explain".to_string(),
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        writeln!(f, "{}{}", "  ".repeat(indent), self.label())?;
        for child in self.children() {
            child.fmt_tree(f, indent + 1)?;
        }
        Ok(())
    }
}

fn predicate_count(predicates: &[AnnotatedExpression]) -> String {
    match predicates.len() {
        0 => String::new(),
        n => format!(" predicates={}", n),
    }
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

/// Table scan operation
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalGet {
    pub database_id: DatabaseId,
    pub namespace_id: NamespaceId,
    pub table_id: TableId,
    pub table_alias: Alias,
    /// Pushed down predicates
    pub predicates: Vec<AnnotatedExpression>,
    pub is_for_update: bool,
}

impl LogicalGet {
    pub fn new(
        database_id: DatabaseId,
        namespace_id: NamespaceId,
        table_id: TableId,
        table_alias: Alias,
    ) -> Self {
        Self {
            database_id,
            namespace_id,
            table_id,
            table_alias,
            predicates: Vec::new(),
            is_for_update: false,
        }
    }

    /// Placeholder for a SELECT without FROM
    pub fn empty() -> Self {
        Self::new(
            DatabaseId::INVALID,
            NamespaceId::INVALID,
            TableId::INVALID,
            Alias::default(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalQueryDerivedGet {
    pub input: Box<LogicalPlan>,
    pub table_alias: Alias,
    /// Output column name to the select-list expression producing it
    pub alias_to_expr: IndexMap<String, ExprId>,
}

/// CTE scan; `input` is the CTE's defining subtree once attached
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCteScan {
    pub table_alias: Alias,
    pub cte_name: String,
    pub table_id: TableId,
    pub columns: Vec<DerivedColumn>,
    /// Base-case select list, then the inductive one for recursive CTEs
    pub expressions: Vec<Vec<ExprId>>,
    pub is_recursive: bool,
    pub input: Option<Box<LogicalPlan>>,
}

/// Filter operation
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalFilter {
    pub input: Box<LogicalPlan>,
    pub predicates: Vec<AnnotatedExpression>,
}

impl LogicalFilter {
    pub fn new(input: LogicalPlan, predicates: Vec<AnnotatedExpression>) -> Self {
        Self {
            input: Box::new(input),
            predicates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalJoinType {
    Inner,
    Left,
    Right,
    Outer,
    Semi,
    /// Emits a boolean marker column (EXISTS / IN)
    Mark,
    /// Emits at most one right row per left row (scalar subquery)
    Single,
}

/// Join operation
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalJoin {
    pub left: Box<LogicalPlan>,
    pub right: Box<LogicalPlan>,
    pub join_type: LogicalJoinType,
    pub predicates: Vec<AnnotatedExpression>,
}

impl LogicalJoin {
    pub fn new(
        join_type: LogicalJoinType,
        left: LogicalPlan,
        right: LogicalPlan,
        predicates: Vec<AnnotatedExpression>,
    ) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
            join_type,
            predicates,
        }
    }
}

/// Aggregate operation; HAVING becomes a Filter above it
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalAggregate {
    pub input: Box<LogicalPlan>,
    pub group_by: Vec<ExprId>,
}

impl LogicalAggregate {
    pub fn new(input: LogicalPlan, group_by: Vec<ExprId>) -> Self {
        Self {
            input: Box::new(input),
            group_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLimit {
    pub input: Box<LogicalPlan>,
    /// `None` keeps every row
    pub limit: Option<u64>,
    pub offset: u64,
    pub sort_exprs: Vec<ExprId>,
    pub sort_directions: Vec<OrderDirection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalUnion {
    pub left: Box<LogicalPlan>,
    pub right: Box<LogicalPlan>,
}

/// INSERT ... VALUES
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalInsert {
    pub database_id: DatabaseId,
    pub namespace_id: NamespaceId,
    pub table_id: TableId,
    pub columns: Vec<ColumnId>,
    pub values: Vec<Vec<ExprId>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalInsertSelect {
    pub input: Box<LogicalPlan>,
    pub database_id: DatabaseId,
    pub namespace_id: NamespaceId,
    pub table_id: TableId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalUpdate {
    pub input: Box<LogicalPlan>,
    pub database_id: DatabaseId,
    pub namespace_id: NamespaceId,
    pub table_id: TableId,
    pub table_alias: Alias,
    pub updates: Vec<(ColumnId, ExprId)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalDelete {
    pub input: Box<LogicalPlan>,
    pub database_id: DatabaseId,
    pub namespace_id: NamespaceId,
    pub table_id: TableId,
    pub table_alias: Alias,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCreateDatabase {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCreateNamespace {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCreateTable {
    pub namespace_id: NamespaceId,
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
    pub foreign_keys: Vec<ForeignKeyDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCreateIndex {
    pub namespace_id: NamespaceId,
    pub table_id: TableId,
    pub index_name: String,
    pub unique: bool,
    /// One bound expression per key attribute
    pub attributes: Vec<ExprId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCreateTrigger {
    pub namespace_id: NamespaceId,
    pub table_id: TableId,
    pub trigger_name: String,
    pub when: Option<ExprId>,
    pub function: String,
    pub args: Vec<String>,
    pub columns: Vec<ColumnId>,
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCreateView {
    pub namespace_id: NamespaceId,
    pub view_name: String,
    pub query: Box<SelectStatement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Database(DatabaseId),
    Namespace(NamespaceId),
    Table(TableId),
    Index(IndexId),
    Trigger(TriggerId),
    View(ViewId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalDrop {
    pub target: DropTarget,
    pub if_exists: bool,
}

/// ANALYZE over an Aggregate-over-Get pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalAnalyze {
    pub input: Box<LogicalPlan>,
    pub database_id: DatabaseId,
    pub table_id: TableId,
    pub column_ids: Vec<ColumnId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExplain {
    pub input: Box<LogicalPlan>,
}
