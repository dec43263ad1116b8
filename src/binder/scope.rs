//! Scope chain used for name resolution
//!
//! Each query block owns one [`BindScope`]; nested blocks push a new scope on
//! the [`ScopeStack`]. The depth of a scope is its index in the stack.

use crate::catalog::{ColumnId, DatabaseId, TableId, TableSchema};
use crate::common::error::{BindError, BindResult};
use crate::parser::{Alias, AliasSerial};
use crate::types::LogicalType;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved identity of a base table reference
#[derive(Debug, Clone)]
pub struct TableBinding {
    pub database_id: DatabaseId,
    pub table_id: TableId,
    pub schema: Arc<TableSchema>,
}

/// Output column of a derived table or CTE
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColumn {
    pub alias: Alias,
    pub data_type: LogicalType,
}

impl DerivedColumn {
    /// Statement-local column id derived from the alias serial
    pub fn column_id(&self) -> ColumnId {
        match self.alias.serial {
            Some(AliasSerial(serial)) => ColumnId::temp(serial),
            None => ColumnId::INVALID,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TableSource {
    Regular(TableBinding),
    Derived(Vec<DerivedColumn>),
}

/// One table visible in a scope
#[derive(Debug, Clone)]
pub struct ScopeTable {
    pub alias: Alias,
    pub source: TableSource,
}

/// Where a resolved column comes from
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    pub alias: Alias,
    pub column_name: String,
    pub database_id: DatabaseId,
    pub table_id: TableId,
    pub column_id: ColumnId,
    pub data_type: LogicalType,
    pub depth: usize,
}

impl ScopeTable {
    fn column(&self, name: &str, depth: usize) -> Option<ResolvedColumn> {
        match &self.source {
            TableSource::Regular(binding) => {
                binding.schema.column(name).map(|col| ResolvedColumn {
                    alias: self.alias.clone(),
                    column_name: col.name.clone(),
                    database_id: binding.database_id,
                    table_id: binding.table_id,
                    column_id: col.id,
                    data_type: col.data_type,
                    depth,
                })
            }
            TableSource::Derived(columns) => columns
                .iter()
                .find(|col| col.alias.name == name)
                .map(|col| ResolvedColumn {
                    alias: self.alias.clone(),
                    column_name: col.alias.name.clone(),
                    database_id: DatabaseId::INVALID,
                    table_id: TableId::INVALID,
                    column_id: col.column_id(),
                    data_type: col.data_type,
                    depth,
                }),
        }
    }

    fn is_regular(&self) -> bool {
        matches!(self.source, TableSource::Regular(_))
    }

    /// Names of the columns this table exposes, in order
    pub fn column_names(&self) -> Vec<String> {
        match &self.source {
            TableSource::Regular(binding) => binding.schema.column_names().map(String::from).collect(),
            TableSource::Derived(columns) => columns.iter().map(|c| c.alias.name.clone()).collect(),
        }
    }
}

/// Tables, CTEs and aliases visible at one nesting level
#[derive(Debug, Clone)]
pub struct BindScope {
    depth: usize,
    tables: IndexMap<String, ScopeTable>,
    ctes: HashMap<String, Vec<DerivedColumn>>,
    /// WITH list of the left UNION branch, shared by the branches after it
    inherited_ctes: HashMap<String, Vec<DerivedColumn>>,
    aliases: HashMap<String, Alias>,
}

impl BindScope {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            tables: IndexMap::new(),
            ctes: HashMap::new(),
            inherited_ctes: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Empty scope at the same depth that still sees this block's CTEs
    pub fn sibling(&self) -> BindScope {
        let mut scope = BindScope::new(self.depth);
        scope.inherited_ctes = self
            .inherited_ctes
            .iter()
            .chain(&self.ctes)
            .map(|(name, columns)| (name.clone(), columns.clone()))
            .collect();
        scope
    }

    fn cte(&self, name: &str) -> Option<&Vec<DerivedColumn>> {
        self.ctes
            .get(name)
            .or_else(|| self.inherited_ctes.get(name))
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn add_table(&mut self, alias: Alias, source: TableSource) -> BindResult<()> {
        if self.tables.contains_key(&alias.name) {
            return Err(BindError::DuplicateAlias(format!(
                "table name \"{}\" specified more than once",
                alias.name
            )));
        }
        self.tables
            .insert(alias.name.clone(), ScopeTable { alias, source });
        Ok(())
    }

    pub fn add_regular_table(&mut self, alias: Alias, binding: TableBinding) -> BindResult<()> {
        self.add_table(alias, TableSource::Regular(binding))
    }

    pub fn add_derived_table(&mut self, alias: Alias, columns: Vec<DerivedColumn>) -> BindResult<()> {
        self.add_table(alias, TableSource::Derived(columns))
    }

    /// Register a CTE definition so later references can alias it
    pub fn add_cte(&mut self, name: &str, columns: Vec<DerivedColumn>) -> BindResult<()> {
        if self.ctes.contains_key(name) {
            return Err(BindError::DuplicateAlias(format!(
                "WITH query name \"{}\" specified more than once",
                name
            )));
        }
        self.ctes.insert(name.to_string(), columns);
        Ok(())
    }

    /// Record the canonical alias for a table reference
    pub fn register_alias(&mut self, alias: Alias) {
        self.aliases.insert(alias.name.clone(), alias);
    }

    /// Unqualified lookup: regular tables first, then derived tables, both in
    /// insertion order. Finding the column in two tables is an error.
    pub fn resolve_unqualified(&self, column_name: &str) -> BindResult<Option<ResolvedColumn>> {
        let regular = self.tables.values().filter(|t| t.is_regular());
        let derived = self.tables.values().filter(|t| !t.is_regular());
        let mut found: Option<ResolvedColumn> = None;
        for table in regular.chain(derived) {
            if let Some(column) = table.column(column_name, self.depth) {
                if found.is_some() {
                    return Err(BindError::AmbiguousColumn(format!(
                        "column reference \"{}\" is ambiguous",
                        column_name
                    )));
                }
                found = Some(column);
            }
        }
        Ok(found)
    }

    /// Qualified lookup in this scope only. `Ok(None)` when the alias is unknown here.
    pub fn resolve_qualified(
        &self,
        alias: &str,
        column_name: &str,
    ) -> BindResult<Option<ResolvedColumn>> {
        let Some(table) = self.tables.get(alias) else {
            return Ok(None);
        };
        table.column(column_name, self.depth).map(Some).ok_or_else(|| {
            BindError::UndefinedColumn(format!(
                "column {}.{} does not exist",
                alias, column_name
            ))
        })
    }

    pub fn table(&self, alias: &str) -> Option<&ScopeTable> {
        self.tables.get(alias)
    }

    /// Tables in FROM order
    pub fn tables(&self) -> impl Iterator<Item = &ScopeTable> {
        self.tables.values()
    }

    pub fn has_any_table(&self) -> bool {
        !self.tables.is_empty()
    }
}

/// Stack of scopes; the last element is the current scope
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<BindScope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a child scope and return its depth
    pub fn push(&mut self) -> usize {
        let depth = self.scopes.len();
        self.scopes.push(BindScope::new(depth));
        depth
    }

    pub fn pop(&mut self) -> Option<BindScope> {
        self.scopes.pop()
    }

    /// Reinstate a scope taken off with [`ScopeStack::pop`]
    pub fn restore(&mut self, scope: BindScope) {
        self.scopes.push(scope);
    }

    pub fn depth(&self) -> Option<usize> {
        self.scopes.len().checked_sub(1)
    }

    pub fn current(&self) -> BindResult<&BindScope> {
        self.scopes
            .last()
            .ok_or_else(|| BindError::Internal("no active bind scope".to_string()))
    }

    pub fn current_mut(&mut self) -> BindResult<&mut BindScope> {
        self.scopes
            .last_mut()
            .ok_or_else(|| BindError::Internal("no active bind scope".to_string()))
    }

    /// Unqualified lookup from the current scope outwards; the innermost hit wins
    pub fn resolve_unqualified(&self, column_name: &str) -> BindResult<Option<ResolvedColumn>> {
        for scope in self.scopes.iter().rev() {
            if let Some(column) = scope.resolve_unqualified(column_name)? {
                return Ok(Some(column));
            }
        }
        Ok(None)
    }

    /// Qualified lookup from the current scope outwards
    pub fn resolve_qualified(
        &self,
        alias: &str,
        column_name: &str,
    ) -> BindResult<Option<ResolvedColumn>> {
        for scope in self.scopes.iter().rev() {
            if let Some(column) = scope.resolve_qualified(alias, column_name)? {
                return Ok(Some(column));
            }
        }
        Ok(None)
    }

    /// Canonical alias registered for `name`, or a fresh serial-less alias
    pub fn resolve_alias_upward(&self, name: &str) -> Alias {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.aliases.get(name))
            .cloned()
            .unwrap_or_else(|| Alias::new(name))
    }

    /// Columns of the innermost visible CTE called `name`
    pub fn find_cte(&self, name: &str) -> Option<&[DerivedColumn]> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.cte(name))
            .map(Vec::as_slice)
    }

    /// Every column name visible from the current scope
    pub fn visible_column_names(&self) -> Vec<String> {
        self.scopes
            .iter()
            .flat_map(|scope| scope.tables())
            .flat_map(|table| table.column_names())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnSchema;
    use crate::common::error::ErrorCode;

    fn binding(table: u32, columns: &[(&str, LogicalType)]) -> TableBinding {
        let columns = columns
            .iter()
            .enumerate()
            .map(|(i, (name, ty))| {
                let mut col = ColumnSchema::new(name, *ty);
                col.id = ColumnId(i as u32 + 1);
                col
            })
            .collect();
        TableBinding {
            database_id: DatabaseId(1),
            table_id: TableId(table),
            schema: Arc::new(TableSchema::new(columns)),
        }
    }

    #[test]
    fn test_duplicate_alias() {
        let mut scope = BindScope::new(0);
        scope
            .add_regular_table(Alias::new("t"), binding(10, &[("a", LogicalType::Integer)]))
            .unwrap();
        let err = scope
            .add_derived_table(Alias::new("t"), vec![])
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateAlias);
    }

    #[test]
    fn test_unqualified_resolution_and_ambiguity() {
        let mut scope = BindScope::new(0);
        scope
            .add_regular_table(
                Alias::new("t"),
                binding(10, &[("a", LogicalType::Integer), ("b", LogicalType::Varchar)]),
            )
            .unwrap();
        scope
            .add_derived_table(
                Alias::new("d"),
                vec![DerivedColumn {
                    alias: Alias::with_serial("b", AliasSerial(4)),
                    data_type: LogicalType::Double,
                }],
            )
            .unwrap();

        let a = scope.resolve_unqualified("a").unwrap().unwrap();
        assert_eq!(a.table_id, TableId(10));
        assert_eq!(a.column_id, ColumnId(1));
        assert!(scope.resolve_unqualified("zzz").unwrap().is_none());

        let err = scope.resolve_unqualified("b").unwrap_err();
        assert_eq!(err.code(), ErrorCode::AmbiguousColumn);

        let b = scope.resolve_qualified("d", "b").unwrap().unwrap();
        assert_eq!(b.column_id, ColumnId::temp(4));
        assert_eq!(b.data_type, LogicalType::Double);

        let err = scope.resolve_qualified("t", "zzz").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UndefinedColumn);
        assert!(scope.resolve_qualified("x", "a").unwrap().is_none());
    }

    #[test]
    fn test_stack_walks_outward() {
        let mut stack = ScopeStack::new();
        assert_eq!(stack.push(), 0);
        stack
            .current_mut()
            .unwrap()
            .add_regular_table(Alias::new("t"), binding(10, &[("a", LogicalType::Integer)]))
            .unwrap();
        stack
            .current_mut()
            .unwrap()
            .register_alias(Alias::with_serial("t", AliasSerial(1)));
        assert_eq!(stack.push(), 1);
        assert!(!stack.current().unwrap().has_any_table());

        let outer = stack.resolve_unqualified("a").unwrap().unwrap();
        assert_eq!(outer.depth, 0);
        assert_eq!(
            stack.resolve_alias_upward("t"),
            Alias::with_serial("t", AliasSerial(1))
        );
        assert_eq!(stack.resolve_alias_upward("u"), Alias::new("u"));

        stack.pop();
        assert_eq!(stack.depth(), Some(0));
    }

    #[test]
    fn test_sibling_scope_shares_ctes() {
        let mut stack = ScopeStack::new();
        stack.push();
        let column = DerivedColumn {
            alias: Alias::with_serial("a", AliasSerial(7)),
            data_type: LogicalType::Integer,
        };
        stack
            .current_mut()
            .unwrap()
            .add_cte("c", vec![column])
            .unwrap();
        stack
            .current_mut()
            .unwrap()
            .add_regular_table(Alias::new("t"), binding(10, &[("a", LogicalType::Integer)]))
            .unwrap();

        let left = stack.pop().unwrap();
        stack.restore(left.sibling());
        assert_eq!(stack.depth(), Some(0));
        assert!(!stack.current().unwrap().has_any_table());
        assert_eq!(stack.find_cte("c").map(<[_]>::len), Some(1));

        // A branch after the second one still sees the first WITH list
        let middle = stack.pop().unwrap();
        stack.restore(middle.sibling());
        assert!(stack.find_cte("c").is_some());
        assert!(stack.find_cte("d").is_none());
    }
}
