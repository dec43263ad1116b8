//! Expression nodes and the per-statement node pool
//!
//! Every expression of a statement lives in one [`ExprArena`]. Nodes refer to
//! their children by [`ExprId`], the index assigned when the node was added.
//! The id never changes for the lifetime of the statement, which makes it the
//! key for per-node side tables kept while binding.

use crate::catalog::{ColumnId, DatabaseId, ProcId, TableId};
use crate::common::constants::PLACEHOLDER_COLUMN_NAME;
use crate::common::error::{BindError, BindResult};
use crate::parser::ast::{Alias, SelectStatement};
use crate::types::{LogicalType, Value};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Stable index of an expression node inside its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    Like,
    NotLike,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "<>",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqual => ">=",
            ComparisonOp::In => "IN",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::NotLike => "NOT LIKE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConjunctionOp {
    And,
    Or,
}

/// Non-comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Not,
    IsNull,
    IsNotNull,
    Exists,
    Negate,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

impl OperatorKind {
    /// Operators whose result is always BOOLEAN
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            OperatorKind::Not | OperatorKind::IsNull | OperatorKind::IsNotNull | OperatorKind::Exists
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            OperatorKind::Not => "NOT",
            OperatorKind::IsNull => "IS NULL",
            OperatorKind::IsNotNull => "IS NOT NULL",
            OperatorKind::Exists => "EXISTS",
            OperatorKind::Negate => "-",
            OperatorKind::Plus => "+",
            OperatorKind::Minus => "-",
            OperatorKind::Multiply => "*",
            OperatorKind::Divide => "/",
            OperatorKind::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Count,
    CountStar,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count | AggregateKind::CountStar => "count",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
        }
    }
}

/// Reference to a column, resolved in place by the binder
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Qualifying table alias as written, canonicalized while binding
    pub table_alias: Option<Alias>,
    pub column_name: String,
    pub database_id: DatabaseId,
    /// `INVALID` for columns of derived tables and CTEs
    pub table_id: TableId,
    pub column_id: ColumnId,
}

impl ColumnRef {
    pub fn new(table_alias: Option<Alias>, column_name: impl Into<String>) -> Self {
        Self {
            table_alias,
            column_name: column_name.into(),
            database_id: DatabaseId::INVALID,
            table_id: TableId::INVALID,
            column_id: ColumnId::INVALID,
        }
    }

    /// Set once the binder has attached the column to a table in scope
    pub fn is_resolved(&self) -> bool {
        self.column_id.is_valid()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub condition: ExprId,
    pub then: ExprId,
}

/// Expression variants
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Constant(Value),
    /// Prepared-statement placeholder, 0-based
    Parameter {
        index: usize,
    },
    Column(ColumnRef),
    Star,
    TableStar {
        table: String,
    },
    Comparison {
        op: ComparisonOp,
        left: ExprId,
        right: ExprId,
    },
    Conjunction {
        op: ConjunctionOp,
        children: Vec<ExprId>,
    },
    Operator {
        op: OperatorKind,
        children: Vec<ExprId>,
    },
    Function {
        name: String,
        args: Vec<ExprId>,
        proc_id: ProcId,
    },
    Aggregate {
        kind: AggregateKind,
        arg: Option<ExprId>,
        distinct: bool,
    },
    Cast {
        target: LogicalType,
        child: ExprId,
    },
    Case {
        when_clauses: Vec<WhenClause>,
        default: Option<ExprId>,
    },
    Subquery(Box<SelectStatement>),
    /// `DEFAULT` marker inside INSERT VALUES
    Default,
}

/// One expression node plus the attributes derived while binding
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub return_type: LogicalType,
    /// Output alias (`expr AS name`)
    pub alias: Option<Alias>,
    /// Scope depth of the outermost column the expression depends on
    pub depth: Option<usize>,
    pub has_subquery: bool,
    /// Natural output name
    pub name: String,
}

impl ExprNode {
    pub fn new(kind: ExprKind) -> Self {
        let return_type = match &kind {
            ExprKind::Constant(value) => value.logical_type(),
            ExprKind::Cast { target, .. } => *target,
            ExprKind::Comparison { .. } | ExprKind::Conjunction { .. } => LogicalType::Boolean,
            ExprKind::Operator { op, .. } if op.is_predicate() => LogicalType::Boolean,
            _ => LogicalType::Invalid,
        };
        Self {
            kind,
            return_type,
            alias: None,
            depth: None,
            has_subquery: false,
            name: String::new(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ExprKind::Constant(_))
    }

    /// Constants and placeholders: nodes whose value can be coerced at bind time
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Constant(_) | ExprKind::Parameter { .. })
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(self.kind, ExprKind::Constant(Value::Null))
    }

    pub fn column(&self) -> Option<&ColumnRef> {
        match &self.kind {
            ExprKind::Column(col) => Some(col),
            _ => None,
        }
    }

    pub fn is_subquery(&self) -> bool {
        matches!(self.kind, ExprKind::Subquery(_))
    }

    /// Direct children in evaluation order; subquery bodies are not children
    pub fn children(&self) -> Vec<ExprId> {
        match &self.kind {
            ExprKind::Comparison { left, right, .. } => vec![*left, *right],
            ExprKind::Conjunction { children, .. } | ExprKind::Operator { children, .. } => {
                children.clone()
            }
            ExprKind::Function { args, .. } => args.clone(),
            ExprKind::Aggregate { arg, .. } => arg.iter().copied().collect(),
            ExprKind::Cast { child, .. } => vec![*child],
            ExprKind::Case {
                when_clauses,
                default,
            } => when_clauses
                .iter()
                .flat_map(|w| [w.condition, w.then])
                .chain(default.iter().copied())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Pool owning every expression node of one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
}

impl Index<ExprId> for ExprArena {
    type Output = ExprNode;

    fn index(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.0]
    }
}

impl IndexMut<ExprId> for ExprArena {
    fn index_mut(&mut self, id: ExprId) -> &mut ExprNode {
        &mut self.nodes[id.0]
    }
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ExprId) -> Option<&ExprNode> {
        self.nodes.get(id.0)
    }

    pub fn add(&mut self, kind: ExprKind) -> ExprId {
        self.add_node(ExprNode::new(kind))
    }

    pub fn add_node(&mut self, node: ExprNode) -> ExprId {
        self.nodes.push(node);
        ExprId(self.nodes.len() - 1)
    }

    pub fn constant(&mut self, value: Value) -> ExprId {
        self.add(ExprKind::Constant(value))
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.constant(Value::integer(value))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.constant(Value::varchar(value))
    }

    pub fn null(&mut self) -> ExprId {
        self.constant(Value::Null)
    }

    /// NULL already carrying a type
    pub fn typed_null(&mut self, ty: LogicalType) -> ExprId {
        let id = self.null();
        self[id].return_type = ty;
        id
    }

    pub fn parameter(&mut self, index: usize) -> ExprId {
        self.add(ExprKind::Parameter { index })
    }

    pub fn column(&mut self, name: &str) -> ExprId {
        self.add(ExprKind::Column(ColumnRef::new(None, name)))
    }

    pub fn qualified_column(&mut self, table: &str, name: &str) -> ExprId {
        self.add(ExprKind::Column(ColumnRef::new(Some(Alias::new(table)), name)))
    }

    pub fn star(&mut self) -> ExprId {
        self.add(ExprKind::Star)
    }

    pub fn table_star(&mut self, table: &str) -> ExprId {
        self.add(ExprKind::TableStar {
            table: table.to_string(),
        })
    }

    pub fn compare(&mut self, op: ComparisonOp, left: ExprId, right: ExprId) -> ExprId {
        self.add(ExprKind::Comparison { op, left, right })
    }

    pub fn equal(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.compare(ComparisonOp::Equal, left, right)
    }

    pub fn and(&mut self, children: Vec<ExprId>) -> ExprId {
        self.add(ExprKind::Conjunction {
            op: ConjunctionOp::And,
            children,
        })
    }

    pub fn or(&mut self, children: Vec<ExprId>) -> ExprId {
        self.add(ExprKind::Conjunction {
            op: ConjunctionOp::Or,
            children,
        })
    }

    pub fn operator(&mut self, op: OperatorKind, children: Vec<ExprId>) -> ExprId {
        self.add(ExprKind::Operator { op, children })
    }

    pub fn exists(&mut self, subquery: SelectStatement) -> ExprId {
        let sub = self.subquery(subquery);
        self.operator(OperatorKind::Exists, vec![sub])
    }

    pub fn function(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        self.add(ExprKind::Function {
            name: name.to_string(),
            args,
            proc_id: ProcId::INVALID,
        })
    }

    pub fn aggregate(&mut self, kind: AggregateKind, arg: Option<ExprId>, distinct: bool) -> ExprId {
        self.add(ExprKind::Aggregate {
            kind,
            arg,
            distinct,
        })
    }

    pub fn count_star(&mut self) -> ExprId {
        self.aggregate(AggregateKind::CountStar, None, false)
    }

    pub fn cast(&mut self, child: ExprId, target: LogicalType) -> ExprId {
        self.add(ExprKind::Cast { target, child })
    }

    pub fn case(&mut self, when_clauses: Vec<WhenClause>, default: Option<ExprId>) -> ExprId {
        self.add(ExprKind::Case {
            when_clauses,
            default,
        })
    }

    pub fn subquery(&mut self, select: SelectStatement) -> ExprId {
        self.add(ExprKind::Subquery(Box::new(select)))
    }

    pub fn default_marker(&mut self) -> ExprId {
        self.add(ExprKind::Default)
    }

    /// Attach an output alias (`expr AS name`)
    pub fn aliased(&mut self, id: ExprId, name: &str) -> ExprId {
        self[id].alias = Some(Alias::new(name));
        id
    }

    /// Swap `old` for `new` among the direct children of `parent`
    pub fn replace_child(&mut self, parent: ExprId, old: ExprId, new: ExprId) {
        let swap = |slot: &mut ExprId| {
            if *slot == old {
                *slot = new;
            }
        };
        match &mut self[parent].kind {
            ExprKind::Comparison { left, right, .. } => {
                swap(left);
                swap(right);
            }
            ExprKind::Conjunction { children, .. }
            | ExprKind::Operator { children, .. }
            | ExprKind::Function { args: children, .. } => children.iter_mut().for_each(swap),
            ExprKind::Aggregate { arg: Some(arg), .. } => swap(arg),
            ExprKind::Cast { child, .. } => swap(child),
            ExprKind::Case {
                when_clauses,
                default,
            } => {
                for clause in when_clauses.iter_mut() {
                    swap(&mut clause.condition);
                    swap(&mut clause.then);
                }
                if let Some(d) = default {
                    swap(d);
                }
            }
            _ => {}
        }
    }

    /// Deep-copy the tree rooted at `root` of `other` into this arena
    pub fn import(&mut self, other: &ExprArena, root: ExprId) -> BindResult<ExprId> {
        let mut node = other[root].clone();
        match &mut node.kind {
            ExprKind::Subquery(_) => {
                return Err(BindError::FeatureNotSupported(
                    "cannot copy a subquery out of a stored expression".to_string(),
                ))
            }
            ExprKind::Comparison { left, right, .. } => {
                *left = self.import(other, *left)?;
                *right = self.import(other, *right)?;
            }
            ExprKind::Conjunction { children, .. }
            | ExprKind::Operator { children, .. }
            | ExprKind::Function { args: children, .. } => {
                for child in children.iter_mut() {
                    *child = self.import(other, *child)?;
                }
            }
            ExprKind::Aggregate { arg: Some(arg), .. } => *arg = self.import(other, *arg)?,
            ExprKind::Cast { child, .. } => *child = self.import(other, *child)?,
            ExprKind::Case {
                when_clauses,
                default,
            } => {
                for clause in when_clauses.iter_mut() {
                    clause.condition = self.import(other, clause.condition)?;
                    clause.then = self.import(other, clause.then)?;
                }
                if let Some(d) = default {
                    *d = self.import(other, *d)?;
                }
            }
            _ => {}
        }
        Ok(self.add_node(node))
    }

    /// Move the select out of a subquery node, leaving an empty select behind
    pub fn take_subquery(&mut self, id: ExprId) -> BindResult<SelectStatement> {
        match &mut self[id].kind {
            ExprKind::Subquery(select) => Ok(std::mem::take(select.as_mut())),
            other => Err(BindError::Internal(format!(
                "expected subquery at {}, found {:?}",
                id, other
            ))),
        }
    }

    pub fn restore_subquery(&mut self, id: ExprId, select: SelectStatement) {
        if let ExprKind::Subquery(slot) = &mut self[id].kind {
            **slot = select;
        }
    }

    pub fn subquery_select(&self, id: ExprId) -> Option<&SelectStatement> {
        match &self[id].kind {
            ExprKind::Subquery(select) => Some(select),
            _ => None,
        }
    }

    /// Depth of the outermost scope referenced by the tree, cached on each node.
    ///
    /// Columns carry the depth recorded when they were resolved; constants
    /// have none; a subquery takes the smallest depth among its select list
    /// and WHERE clause; anything else the smallest depth among its children.
    pub fn derive_depth(&mut self, id: ExprId) -> Option<usize> {
        if let Some(depth) = self[id].depth {
            return Some(depth);
        }
        let inputs = match &self[id].kind {
            ExprKind::Column(_) => return None,
            ExprKind::Subquery(select) => select
                .select_list
                .iter()
                .chain(select.where_clause.iter())
                .copied()
                .collect::<Vec<_>>(),
            _ => self[id].children(),
        };
        let depth = inputs
            .into_iter()
            .filter_map(|child| self.derive_depth(child))
            .min();
        self[id].depth = depth;
        depth
    }

    /// Whether the tree contains a subquery, cached on each node
    pub fn derive_subquery_flag(&mut self, id: ExprId) -> bool {
        let mut flag = self[id].is_subquery();
        for child in self[id].children() {
            flag |= self.derive_subquery_flag(child);
        }
        self[id].has_subquery = flag;
        flag
    }

    /// Natural output name of the tree, cached on each node
    pub fn derive_name(&mut self, id: ExprId) -> String {
        let name = if let Some(alias) = &self[id].alias {
            alias.name.clone()
        } else {
            match &self[id].kind {
                ExprKind::Column(col) => col.column_name.clone(),
                ExprKind::Function { name, .. } => name.clone(),
                ExprKind::Aggregate { kind, .. } => kind.name().to_string(),
                ExprKind::Cast { child, .. } => {
                    let child = *child;
                    self.derive_name(child)
                }
                ExprKind::Subquery(select) => match select.select_list.first() {
                    Some(first) => {
                        let first = *first;
                        self.derive_name(first)
                    }
                    None => String::new(),
                },
                _ => String::new(),
            }
        };
        self[id].name = name.clone();
        name
    }

    /// Output name used for select-list positions, falling back to the placeholder
    pub fn output_name(&self, id: ExprId) -> String {
        let node = &self[id];
        match &node.alias {
            Some(alias) => alias.name.clone(),
            None if !node.name.is_empty() => node.name.clone(),
            None => PLACEHOLDER_COLUMN_NAME.to_string(),
        }
    }

    /// Whether the tree contains an aggregate (not looking into subqueries)
    pub fn contains_aggregate(&self, id: ExprId) -> bool {
        matches!(self[id].kind, ExprKind::Aggregate { .. })
            || self[id]
                .children()
                .into_iter()
                .any(|child| self.contains_aggregate(child))
    }

    /// Render the tree as SQL-like text
    pub fn display(&self, id: ExprId) -> String {
        let node = &self[id];
        match &node.kind {
            ExprKind::Constant(v) => v.to_string(),
            ExprKind::Parameter { index } => format!("${}", index + 1),
            ExprKind::Column(col) => match &col.table_alias {
                Some(alias) => format!("{}.{}", alias.name, col.column_name),
                None => col.column_name.clone(),
            },
            ExprKind::Star => "*".to_string(),
            ExprKind::TableStar { table } => format!("{}.*", table),
            ExprKind::Comparison { op, left, right } => format!(
                "({} {} {})",
                self.display(*left),
                op.symbol(),
                self.display(*right)
            ),
            ExprKind::Conjunction { op, children } => {
                let sep = match op {
                    ConjunctionOp::And => " AND ",
                    ConjunctionOp::Or => " OR ",
                };
                let parts: Vec<String> = children.iter().map(|c| self.display(*c)).collect();
                format!("({})", parts.join(sep))
            }
            ExprKind::Operator { op, children } => match (op, children.as_slice()) {
                (OperatorKind::IsNull | OperatorKind::IsNotNull, [child]) => {
                    format!("({} {})", self.display(*child), op.symbol())
                }
                (_, [child]) => format!("({} {})", op.symbol(), self.display(*child)),
                (_, [l, r]) => format!("({} {} {})", self.display(*l), op.symbol(), self.display(*r)),
                _ => op.symbol().to_string(),
            },
            ExprKind::Function { name, args, .. } => {
                let parts: Vec<String> = args.iter().map(|a| self.display(*a)).collect();
                format!("{}({})", name, parts.join(", "))
            }
            ExprKind::Aggregate {
                kind,
                arg,
                distinct,
            } => match (kind, arg) {
                (AggregateKind::CountStar, _) => "count(*)".to_string(),
                (_, Some(arg)) if *distinct => {
                    format!("{}(DISTINCT {})", kind.name(), self.display(*arg))
                }
                (_, Some(arg)) => format!("{}({})", kind.name(), self.display(*arg)),
                (_, None) => format!("{}()", kind.name()),
            },
            ExprKind::Cast { target, child } => {
                format!("CAST({} AS {})", self.display(*child), target)
            }
            ExprKind::Case {
                when_clauses,
                default,
            } => {
                let mut text = "CASE".to_string();
                for clause in when_clauses {
                    text.push_str(&format!(
                        " WHEN {} THEN {}",
                        self.display(clause.condition),
                        self.display(clause.then)
                    ));
                }
                if let Some(d) = default {
                    text.push_str(&format!(" ELSE {}", self.display(*d)));
                }
                text.push_str(" END");
                text
            }
            ExprKind::Subquery(_) => "(subquery)".to_string(),
            ExprKind::Default => "DEFAULT".to_string(),
        }
    }
}

/// Expression kept in the catalog (column defaults), detached from any statement
#[derive(Debug, Clone, PartialEq)]
pub struct StoredExpression {
    pub arena: ExprArena,
    pub root: ExprId,
}

impl StoredExpression {
    pub fn constant(value: Value) -> Self {
        let mut arena = ExprArena::new();
        let root = arena.constant(value);
        Self { arena, root }
    }

    pub fn new(arena: ExprArena, root: ExprId) -> Self {
        Self { arena, root }
    }
}
