//! Catalog System
//!
//! The binder reads metadata through the [`CatalogAccessor`] trait, one accessor
//! per open transaction. [`Catalog`] is the in-memory implementation used by
//! embedders, benchmarks and tests.

pub mod function;
pub mod ids;
pub mod table;
pub mod transaction;

pub use function::*;
pub use ids::*;
pub use table::*;
pub use transaction::*;

use crate::common::constants::{DEFAULT_DATABASE_NAME, DEFAULT_NAMESPACE_NAME};
use crate::common::error::{BindError, BindResult};
use crate::parser::TableName;
use crate::types::LogicalType;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Read access to catalog metadata under one transaction.
///
/// Name lookups return `None` when the object does not exist. Names are
/// expected in lower case.
pub trait CatalogAccessor {
    /// Database the accessor is bound to
    fn database(&self) -> DatabaseId;

    fn database_id(&self, name: &str) -> Option<DatabaseId>;

    fn namespace_id(&self, name: &str) -> Option<NamespaceId>;

    /// Namespace used for unqualified names
    fn default_namespace(&self) -> NamespaceId;

    fn table_id(&self, name: &TableName) -> Option<TableId>;

    fn index_id(&self, name: &TableName) -> Option<IndexId>;

    fn view_id(&self, name: &TableName) -> Option<ViewId>;

    fn trigger_id(&self, name: &TableName) -> Option<TriggerId>;

    fn schema(&self, table: TableId) -> Option<Arc<TableSchema>>;

    /// Overload resolution by name and argument types
    fn resolve_function(&self, name: &str, args: &[LogicalType]) -> Option<FunctionInfo>;

    /// Process-unique serial for statement-local objects
    fn new_temp_id(&self) -> u32;

    fn transaction(&self) -> &Arc<TransactionContext>;
}

#[derive(Debug, Default)]
struct CatalogState {
    databases: HashMap<String, DatabaseId>,
    namespaces: HashMap<(DatabaseId, String), NamespaceId>,
    tables: HashMap<(NamespaceId, String), TableId>,
    schemas: HashMap<TableId, Arc<TableSchema>>,
    indexes: HashMap<(NamespaceId, String), IndexId>,
    views: HashMap<(NamespaceId, String), ViewId>,
    triggers: HashMap<(NamespaceId, String), TriggerId>,
}

/// Main catalog that manages all database metadata
#[derive(Debug)]
pub struct Catalog {
    state: RwLock<CatalogState>,
    functions: RwLock<FunctionRegistry>,
    next_oid: AtomicU32,
    next_temp_oid: AtomicU32,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create a catalog holding the default database and namespace plus built-in functions
    pub fn new() -> Self {
        let catalog = Self {
            state: RwLock::new(CatalogState::default()),
            functions: RwLock::new(FunctionRegistry::with_builtins()),
            next_oid: AtomicU32::new(1),
            next_temp_oid: AtomicU32::new(1),
        };
        {
            let mut state = catalog.state.write();
            let db = DatabaseId(catalog.next_oid());
            state.databases.insert(DEFAULT_DATABASE_NAME.to_string(), db);
            let ns = NamespaceId(catalog.next_oid());
            state
                .namespaces
                .insert((db, DEFAULT_NAMESPACE_NAME.to_string()), ns);
        }
        catalog
    }

    fn next_oid(&self) -> u32 {
        self.next_oid.fetch_add(1, Ordering::SeqCst)
    }

    pub fn database_id(&self, name: &str) -> Option<DatabaseId> {
        self.state.read().databases.get(name).copied()
    }

    fn resolve_namespace(&self, database: DatabaseId, name: &TableName) -> BindResult<NamespaceId> {
        let namespace = name.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE_NAME);
        self.state
            .read()
            .namespaces
            .get(&(database, namespace.to_string()))
            .copied()
            .ok_or_else(|| {
                BindError::UndefinedObject(format!("schema \"{}\" does not exist", namespace))
            })
    }

    /// Create a database with its default namespace
    pub fn create_database(
        self: &Arc<Self>,
        txn: &TransactionContext,
        name: &str,
    ) -> BindResult<DatabaseId> {
        let db = {
            let mut state = self.state.write();
            if state.databases.contains_key(name) {
                return Err(BindError::DuplicateObject(format!(
                    "database \"{}\" already exists",
                    name
                )));
            }
            let db = DatabaseId(self.next_oid());
            state.databases.insert(name.to_string(), db);
            db
        };
        self.create_namespace(txn, db, DEFAULT_NAMESPACE_NAME)?;

        let catalog = Arc::clone(self);
        let key = name.to_string();
        txn.register_abort_action(move || {
            let mut state = catalog.state.write();
            state.databases.remove(&key);
            state.namespaces.retain(|(owner, _), _| *owner != db);
        });
        Ok(db)
    }

    pub fn create_namespace(
        self: &Arc<Self>,
        txn: &TransactionContext,
        database: DatabaseId,
        name: &str,
    ) -> BindResult<NamespaceId> {
        let key = (database, name.to_string());
        let ns = {
            let mut state = self.state.write();
            if state.namespaces.contains_key(&key) {
                return Err(BindError::DuplicateObject(format!(
                    "schema \"{}\" already exists",
                    name
                )));
            }
            let ns = NamespaceId(self.next_oid());
            state.namespaces.insert(key.clone(), ns);
            ns
        };
        let catalog = Arc::clone(self);
        txn.register_abort_action(move || {
            catalog.state.write().namespaces.remove(&key);
        });
        Ok(ns)
    }

    /// Create a table; column ids are assigned in declaration order starting at 1
    pub fn create_table(
        self: &Arc<Self>,
        txn: &TransactionContext,
        database: DatabaseId,
        name: &TableName,
        columns: Vec<ColumnSchema>,
    ) -> BindResult<TableId> {
        let ns = self.resolve_namespace(database, name)?;
        let key = (ns, name.name.to_lowercase());
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, mut col)| {
                col.id = ColumnId(i as u32 + 1);
                col
            })
            .collect();

        let table = {
            let mut state = self.state.write();
            if state.tables.contains_key(&key) {
                return Err(BindError::DuplicateObject(format!(
                    "relation \"{}\" already exists",
                    name.name
                )));
            }
            let table = TableId(self.next_oid());
            state.tables.insert(key.clone(), table);
            state
                .schemas
                .insert(table, Arc::new(TableSchema::new(columns)));
            table
        };
        trace!(table = %name, id = %table, "created table");

        let catalog = Arc::clone(self);
        txn.register_abort_action(move || {
            let mut state = catalog.state.write();
            state.tables.remove(&key);
            state.schemas.remove(&table);
        });
        Ok(table)
    }

    pub fn create_index(
        self: &Arc<Self>,
        txn: &TransactionContext,
        database: DatabaseId,
        name: &TableName,
    ) -> BindResult<IndexId> {
        let ns = self.resolve_namespace(database, name)?;
        let key = (ns, name.name.to_lowercase());
        let index = {
            let mut state = self.state.write();
            if state.indexes.contains_key(&key) {
                return Err(BindError::DuplicateObject(format!(
                    "relation \"{}\" already exists",
                    name.name
                )));
            }
            let index = IndexId(self.next_oid());
            state.indexes.insert(key.clone(), index);
            index
        };
        let catalog = Arc::clone(self);
        txn.register_abort_action(move || {
            catalog.state.write().indexes.remove(&key);
        });
        Ok(index)
    }

    pub fn create_view(
        self: &Arc<Self>,
        txn: &TransactionContext,
        database: DatabaseId,
        name: &TableName,
    ) -> BindResult<ViewId> {
        let ns = self.resolve_namespace(database, name)?;
        let key = (ns, name.name.to_lowercase());
        let view = {
            let mut state = self.state.write();
            if state.views.contains_key(&key) || state.tables.contains_key(&key) {
                return Err(BindError::DuplicateObject(format!(
                    "relation \"{}\" already exists",
                    name.name
                )));
            }
            let view = ViewId(self.next_oid());
            state.views.insert(key.clone(), view);
            view
        };
        let catalog = Arc::clone(self);
        txn.register_abort_action(move || {
            catalog.state.write().views.remove(&key);
        });
        Ok(view)
    }

    pub fn create_trigger(
        self: &Arc<Self>,
        txn: &TransactionContext,
        database: DatabaseId,
        name: &TableName,
    ) -> BindResult<TriggerId> {
        let ns = self.resolve_namespace(database, name)?;
        let key = (ns, name.name.to_lowercase());
        let trigger = {
            let mut state = self.state.write();
            if state.triggers.contains_key(&key) {
                return Err(BindError::DuplicateObject(format!(
                    "trigger \"{}\" already exists",
                    name.name
                )));
            }
            let trigger = TriggerId(self.next_oid());
            state.triggers.insert(key.clone(), trigger);
            trigger
        };
        let catalog = Arc::clone(self);
        txn.register_abort_action(move || {
            catalog.state.write().triggers.remove(&key);
        });
        Ok(trigger)
    }

    /// Register an additional scalar function overload
    pub fn register_function(
        &self,
        name: &str,
        argument_types: Vec<LogicalType>,
        return_type: LogicalType,
    ) -> ProcId {
        self.functions
            .write()
            .register(name, argument_types, return_type)
    }

    /// Accessor bound to `database`/`namespace` under `txn`
    pub fn accessor(
        self: &Arc<Self>,
        database: &str,
        namespace: &str,
        txn: Arc<TransactionContext>,
    ) -> BindResult<CatalogReader> {
        let database_id = self.database_id(database).ok_or_else(|| {
            BindError::UndefinedObject(format!("database \"{}\" does not exist", database))
        })?;
        let namespace_id = self
            .state
            .read()
            .namespaces
            .get(&(database_id, namespace.to_string()))
            .copied()
            .ok_or_else(|| {
                BindError::UndefinedObject(format!("schema \"{}\" does not exist", namespace))
            })?;
        Ok(CatalogReader {
            catalog: Arc::clone(self),
            database_id,
            namespace_id,
            txn,
        })
    }
}

/// [`CatalogAccessor`] over the in-memory [`Catalog`]
#[derive(Debug, Clone)]
pub struct CatalogReader {
    catalog: Arc<Catalog>,
    database_id: DatabaseId,
    namespace_id: NamespaceId,
    txn: Arc<TransactionContext>,
}

impl CatalogReader {
    fn namespace_of(&self, name: &TableName) -> Option<NamespaceId> {
        match &name.namespace {
            Some(ns) => self.namespace_id(ns),
            None => Some(self.namespace_id),
        }
    }

    fn lookup<T: Copy>(
        &self,
        name: &TableName,
        pick: impl Fn(&CatalogState) -> &HashMap<(NamespaceId, String), T>,
    ) -> Option<T> {
        let ns = self.namespace_of(name)?;
        let state = self.catalog.state.read();
        pick(&state).get(&(ns, name.name.to_lowercase())).copied()
    }
}

impl CatalogAccessor for CatalogReader {
    fn database(&self) -> DatabaseId {
        self.database_id
    }

    fn database_id(&self, name: &str) -> Option<DatabaseId> {
        self.catalog.database_id(name)
    }

    fn namespace_id(&self, name: &str) -> Option<NamespaceId> {
        self.catalog
            .state
            .read()
            .namespaces
            .get(&(self.database_id, name.to_string()))
            .copied()
    }

    fn default_namespace(&self) -> NamespaceId {
        self.namespace_id
    }

    fn table_id(&self, name: &TableName) -> Option<TableId> {
        self.lookup(name, |s| &s.tables)
    }

    fn index_id(&self, name: &TableName) -> Option<IndexId> {
        self.lookup(name, |s| &s.indexes)
    }

    fn view_id(&self, name: &TableName) -> Option<ViewId> {
        self.lookup(name, |s| &s.views)
    }

    fn trigger_id(&self, name: &TableName) -> Option<TriggerId> {
        self.lookup(name, |s| &s.triggers)
    }

    fn schema(&self, table: TableId) -> Option<Arc<TableSchema>> {
        self.catalog.state.read().schemas.get(&table).cloned()
    }

    fn resolve_function(&self, name: &str, args: &[LogicalType]) -> Option<FunctionInfo> {
        self.catalog.functions.read().resolve(name, args).cloned()
    }

    fn new_temp_id(&self) -> u32 {
        self.catalog.next_temp_oid.fetch_add(1, Ordering::SeqCst)
    }

    fn transaction(&self) -> &Arc<TransactionContext> {
        &self.txn
    }
}
