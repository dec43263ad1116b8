//! Abstract Syntax Tree (AST) for SQL statements
//!
//! Statements own their clauses; expressions are [`ExprId`]s into the
//! statement's [`ExprArena`]. The binder mutates the tree in place.

use crate::catalog::{ColumnId, DatabaseId, TableId};
use crate::parser::expression::{ExprArena, ExprId};
use crate::types::LogicalType;
use std::fmt;

/// Serial number distinguishing table references that share a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AliasSerial(pub u32);

/// Name of a table reference, plus the serial assigned while binding.
///
/// Two aliases denote the same binding only when their serials match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Alias {
    pub name: String,
    pub serial: Option<AliasSerial>,
}

impl Alias {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serial: None,
        }
    }

    pub fn with_serial(name: impl Into<String>, serial: AliasSerial) -> Self {
        Self {
            name: name.into(),
            serial: Some(serial),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.serial {
            Some(serial) => write!(f, "{}#{}", self.name, serial.0),
            None => write!(f, "{}", self.name),
        }
    }
}

/// SQL statement types
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<SelectStatement>),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Create(CreateStatement),
    Drop(DropStatement),
    Analyze(AnalyzeStatement),
    Explain(ExplainStatement),
}

impl Statement {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::Create(_) => "CREATE",
            Statement::Drop(_) => "DROP",
            Statement::Analyze(_) => "ANALYZE",
            Statement::Explain(_) => "EXPLAIN",
        }
    }

    pub fn is_ddl(&self) -> bool {
        matches!(self, Statement::Create(_) | Statement::Drop(_))
    }
}

/// Possibly qualified object name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TableName {
    pub database: Option<String>,
    pub namespace: Option<String>,
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            database: None,
            namespace: None,
            name: name.into(),
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(db) = &self.database {
            write!(f, "{}.", db)?;
        }
        if let Some(ns) = &self.namespace {
            write!(f, "{}.", ns)?;
        }
        write!(f, "{}", self.name)
    }
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub with: Vec<CommonTableExpression>,
    pub distinct: bool,
    pub select_list: Vec<ExprId>,
    pub from: Option<TableReference>,
    pub where_clause: Option<ExprId>,
    pub group_by: Option<GroupByDescription>,
    pub order_by: Option<OrderByDescription>,
    pub limit: Option<LimitDescription>,
    /// Right-hand side of `UNION ALL`
    pub union: Option<Box<SelectStatement>>,
    /// Scope depth, set by the binder
    pub depth: Option<usize>,
}

impl SelectStatement {
    pub fn new(select_list: Vec<ExprId>) -> Self {
        Self {
            select_list,
            ..Default::default()
        }
    }

    pub fn from(mut self, table: TableReference) -> Self {
        self.from = Some(table);
        self
    }

    pub fn filter(mut self, predicate: ExprId) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    pub fn with_cte(mut self, cte: CommonTableExpression) -> Self {
        self.with.push(cte);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn group_by(mut self, columns: Vec<ExprId>, having: Option<ExprId>) -> Self {
        self.group_by = Some(GroupByDescription { columns, having });
        self
    }

    pub fn order_by(mut self, items: Vec<OrderByItem>) -> Self {
        self.order_by = Some(OrderByDescription { items });
        self
    }

    pub fn limit(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = Some(LimitDescription { limit, offset });
        self
    }

    pub fn union_all(mut self, right: SelectStatement) -> Self {
        self.union = Some(Box::new(right));
        self
    }
}

/// Common Table Expression (CTE)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommonTableExpression {
    pub name: String,
    /// Column aliases as written; completed by the binder
    pub column_aliases: Vec<Alias>,
    pub select: Box<SelectStatement>,
    pub recursive: bool,
}

impl CommonTableExpression {
    pub fn new(name: impl Into<String>, column_aliases: &[&str], select: SelectStatement) -> Self {
        Self {
            name: name.into(),
            column_aliases: column_aliases.iter().map(|a| Alias::new(*a)).collect(),
            select: Box::new(select),
            recursive: false,
        }
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Recursive CTE written as `base UNION ALL inductive`
    pub fn is_inductive(&self) -> bool {
        self.recursive && self.select.union.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupByDescription {
    pub columns: Vec<ExprId>,
    pub having: Option<ExprId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: ExprId,
    pub direction: OrderDirection,
}

impl OrderByItem {
    pub fn asc(expr: ExprId) -> Self {
        Self {
            expr,
            direction: OrderDirection::Ascending,
        }
    }

    pub fn desc(expr: ExprId) -> Self {
        Self {
            expr,
            direction: OrderDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByDescription {
    pub items: Vec<OrderByItem>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitDescription {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Base table named in FROM or targeted by DML
#[derive(Debug, Clone, PartialEq)]
pub struct BaseTableRef {
    pub name: TableName,
    pub alias: Alias,
}

impl BaseTableRef {
    pub fn new(name: TableName) -> Self {
        let alias = Alias::new(name.name.clone());
        Self { name, alias }
    }
}

/// Table reference
#[derive(Debug, Clone, PartialEq)]
pub enum TableReference {
    Table(BaseTableRef),
    Derived {
        select: Box<SelectStatement>,
        alias: Alias,
    },
    Join(Box<JoinDefinition>),
    /// Comma-separated FROM list
    List(Vec<TableReference>),
}

impl TableReference {
    pub fn table(name: &str) -> Self {
        TableReference::Table(BaseTableRef::new(TableName::new(name)))
    }

    pub fn aliased(name: &str, alias: &str) -> Self {
        TableReference::Table(BaseTableRef {
            name: TableName::new(name),
            alias: Alias::new(alias),
        })
    }

    pub fn derived(select: SelectStatement, alias: &str) -> Self {
        TableReference::Derived {
            select: Box::new(select),
            alias: Alias::new(alias),
        }
    }

    pub fn join(
        join_type: JoinType,
        left: TableReference,
        right: TableReference,
        condition: Option<ExprId>,
    ) -> Self {
        TableReference::Join(Box::new(JoinDefinition {
            join_type,
            left,
            right,
            condition,
        }))
    }
}

/// Join types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Outer,
    Left,
    Right,
    Semi,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinDefinition {
    pub join_type: JoinType,
    pub left: TableReference,
    pub right: TableReference,
    pub condition: Option<ExprId>,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: BaseTableRef,
    /// Target columns; rewritten to the full schema order by the binder
    pub columns: Vec<String>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<ExprId>>),
    Select(Box<SelectStatement>),
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: BaseTableRef,
    pub clauses: Vec<UpdateClause>,
    pub where_clause: Option<ExprId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateClause {
    pub column: String,
    pub value: ExprId,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: BaseTableRef,
    pub where_clause: Option<ExprId>,
}

/// CREATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateStatement {
    pub if_not_exists: bool,
    pub kind: CreateKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateKind {
    Database {
        name: String,
    },
    Schema {
        name: String,
    },
    Table {
        name: TableName,
        columns: Vec<ColumnDefinition>,
        foreign_keys: Vec<ForeignKeyDefinition>,
    },
    Index {
        name: String,
        table: TableName,
        attributes: Vec<IndexAttribute>,
        unique: bool,
    },
    Trigger {
        name: String,
        table: TableName,
        when: Option<ExprId>,
        function: String,
        args: Vec<String>,
        columns: Vec<String>,
        timing: TriggerTiming,
        events: Vec<TriggerEvent>,
    },
    View {
        name: TableName,
        query: Box<SelectStatement>,
    },
}

/// Column of a CREATE TABLE
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: LogicalType,
    pub nullable: bool,
    pub default: Option<ExprId>,
    pub check: Option<ExprId>,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: LogicalType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable: true,
            default: None,
            check: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: ExprId) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_check(mut self, check: ExprId) -> Self {
        self.check = Some(check);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDefinition {
    pub columns: Vec<String>,
    pub referenced_table: TableName,
    pub referenced_columns: Vec<String>,
}

/// Index key: a plain column name or an expression
#[derive(Debug, Clone, PartialEq)]
pub enum IndexAttribute {
    Column(String),
    Expression(ExprId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

/// DROP statement
#[derive(Debug, Clone, PartialEq)]
pub struct DropStatement {
    pub kind: DropKind,
    /// Object name; database and schema drops use only `name`
    pub target: TableName,
    pub if_exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    Database,
    Schema,
    Table,
    Index,
    Trigger,
    View,
}

/// ANALYZE statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyzeStatement {
    pub table: Option<TableName>,
    /// Columns as written; empty means every column
    pub columns: Vec<String>,
    pub database_id: DatabaseId,
    pub table_id: TableId,
    /// Resolved by the binder
    pub column_ids: Vec<ColumnId>,
}

/// EXPLAIN statement
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainStatement {
    pub statement: Box<Statement>,
}

/// Output of the parser: one statement and the pool holding its expressions
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub statement: Statement,
    pub exprs: ExprArena,
}

impl ParseResult {
    pub fn new(statement: Statement, exprs: ExprArena) -> Self {
        Self { statement, exprs }
    }

    pub fn select(select: SelectStatement, exprs: ExprArena) -> Self {
        Self::new(Statement::Select(Box::new(select)), exprs)
    }
}
