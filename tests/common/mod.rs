//! Shared fixtures for the integration tests

#![allow(dead_code)]

use prism_frontend::catalog::ColumnSchema;
use prism_frontend::common::{DEFAULT_DATABASE_NAME, DEFAULT_NAMESPACE_NAME};
use prism_frontend::parser::{OperatorKind, SelectStatement, StoredExpression, TableName};
use prism_frontend::{
    BindError, BindResult, Binder, BoundStatement, Catalog, CatalogReader, ExprArena, LogicalType,
    ParseResult, Statement, TransactionContext, Value,
};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();
    });
}

pub struct TestCatalog {
    pub catalog: Arc<Catalog>,
    pub txn: Arc<TransactionContext>,
    pub reader: CatalogReader,
}

/// Catalog holding:
///
/// - `t(a INTEGER, b VARCHAR)`
/// - `s(b INTEGER, c INTEGER)`
/// - `n(id INTEGER, w INTEGER NOT NULL)`
/// - `small(x SMALLINT, d DATE)`
/// - `stamped(id INTEGER, qty INTEGER NOT NULL DEFAULT 2 * 3)`
pub fn create_test_catalog() -> BindResult<TestCatalog> {
    init_tracing();
    let catalog = Arc::new(Catalog::new());
    let setup = TransactionContext::new();
    let db = catalog
        .database_id(DEFAULT_DATABASE_NAME)
        .ok_or_else(|| BindError::Internal("default database missing".into()))?;

    let tables = [
        (
            "t",
            vec![
                ColumnSchema::new("a", LogicalType::Integer),
                ColumnSchema::new("b", LogicalType::Varchar),
            ],
        ),
        (
            "s",
            vec![
                ColumnSchema::new("b", LogicalType::Integer),
                ColumnSchema::new("c", LogicalType::Integer),
            ],
        ),
        (
            "n",
            vec![
                ColumnSchema::new("id", LogicalType::Integer),
                ColumnSchema::new("w", LogicalType::Integer).not_null(),
            ],
        ),
        (
            "small",
            vec![
                ColumnSchema::new("x", LogicalType::SmallInt),
                ColumnSchema::new("d", LogicalType::Date),
            ],
        ),
    ];
    for (name, columns) in tables {
        catalog.create_table(&setup, db, &TableName::new(name), columns)?;
    }

    let mut default = ExprArena::new();
    let two = default.int(2);
    let three = default.int(3);
    let product = default.operator(OperatorKind::Multiply, vec![two, three]);
    catalog.create_table(
        &setup,
        db,
        &TableName::new("stamped"),
        vec![
            ColumnSchema::new("id", LogicalType::Integer),
            ColumnSchema::new("qty", LogicalType::Integer)
                .not_null()
                .with_default_expression(StoredExpression::new(default, product)),
        ],
    )?;
    setup.commit()?;

    let txn = Arc::new(TransactionContext::new());
    let reader = catalog.accessor(DEFAULT_DATABASE_NAME, DEFAULT_NAMESPACE_NAME, Arc::clone(&txn))?;
    Ok(TestCatalog {
        catalog,
        txn,
        reader,
    })
}

impl TestCatalog {
    pub fn bind(&self, statement: Statement, exprs: ExprArena) -> BindResult<BoundStatement> {
        Binder::new(&self.reader).bind(ParseResult::new(statement, exprs), &mut [])
    }

    pub fn bind_select(&self, select: SelectStatement, exprs: ExprArena) -> BindResult<BoundStatement> {
        self.bind(Statement::Select(Box::new(select)), exprs)
    }

    pub fn bind_with_params(
        &self,
        select: SelectStatement,
        exprs: ExprArena,
        params: &mut [Value],
    ) -> BindResult<BoundStatement> {
        Binder::new(&self.reader).bind(ParseResult::select(select, exprs), params)
    }

    /// Bind an already bound statement again
    pub fn rebind(&self, bound: BoundStatement) -> BindResult<BoundStatement> {
        Binder::new(&self.reader).bind(bound.into(), &mut [])
    }
}

pub fn select_of(bound: &BoundStatement) -> &SelectStatement {
    match &bound.statement {
        Statement::Select(select) => select,
        other => panic!("Expected SELECT, found {}", other.kind_name()),
    }
}
