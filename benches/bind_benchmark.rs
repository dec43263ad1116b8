//! Binding and plan building throughput
//!
//! Each iteration binds a fresh syntax tree and lowers it to a logical plan.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use prism_frontend::catalog::ColumnSchema;
use prism_frontend::common::{DEFAULT_DATABASE_NAME, DEFAULT_NAMESPACE_NAME};
use prism_frontend::parser::*;
use prism_frontend::{
    BindResult, Binder, Catalog, CatalogReader, LogicalType, PlanBuilder, TransactionContext,
};
use std::sync::Arc;

fn setup_catalog() -> BindResult<CatalogReader> {
    let catalog = Arc::new(Catalog::new());
    let setup = TransactionContext::new();
    if let Some(db) = catalog.database_id(DEFAULT_DATABASE_NAME) {
        catalog.create_table(
            &setup,
            db,
            &TableName::new("orders"),
            vec![
                ColumnSchema::new("id", LogicalType::BigInt),
                ColumnSchema::new("customer", LogicalType::Integer),
                ColumnSchema::new("total", LogicalType::Double),
            ],
        )?;
        catalog.create_table(
            &setup,
            db,
            &TableName::new("customers"),
            vec![
                ColumnSchema::new("id", LogicalType::Integer),
                ColumnSchema::new("name", LogicalType::Varchar),
            ],
        )?;
    }
    setup.commit()?;
    catalog.accessor(
        DEFAULT_DATABASE_NAME,
        DEFAULT_NAMESPACE_NAME,
        Arc::new(TransactionContext::new()),
    )
}

/// SELECT c.name, o.total FROM orders o JOIN customers c ON o.customer = c.id
/// WHERE o.total > 100 AND c.name = 'acme' ORDER BY 2 DESC LIMIT 10
fn join_query() -> ParseResult {
    let mut arena = ExprArena::new();
    let name = arena.qualified_column("c", "name");
    let total = arena.qualified_column("o", "total");
    let customer = arena.qualified_column("o", "customer");
    let id = arena.qualified_column("c", "id");
    let on = arena.equal(customer, id);
    let total2 = arena.qualified_column("o", "total");
    let hundred = arena.int(100);
    let big = arena.compare(ComparisonOp::GreaterThan, total2, hundred);
    let name2 = arena.qualified_column("c", "name");
    let acme = arena.string("acme");
    let is_acme = arena.equal(name2, acme);
    let predicate = arena.and(vec![big, is_acme]);
    let position = arena.int(2);

    let select = SelectStatement::new(vec![name, total])
        .from(TableReference::join(
            JoinType::Inner,
            TableReference::aliased("orders", "o"),
            TableReference::aliased("customers", "c"),
            Some(on),
        ))
        .filter(predicate)
        .order_by(vec![OrderByItem::desc(position)])
        .limit(Some(10), None);
    ParseResult::select(select, arena)
}

fn bench_bind_join(c: &mut Criterion) {
    let reader = setup_catalog().expect("catalog setup");
    let parse = join_query();

    c.bench_function("bind_join", |b| {
        b.iter(|| {
            let bound = Binder::new(&reader)
                .bind(black_box(parse.clone()), &mut [])
                .expect("bind");
            black_box(bound)
        })
    });

    c.bench_function("bind_and_plan_join", |b| {
        b.iter(|| {
            let mut bound = Binder::new(&reader)
                .bind(black_box(parse.clone()), &mut [])
                .expect("bind");
            let plan = PlanBuilder::new(&reader)
                .transform(&mut bound)
                .expect("plan");
            black_box(plan)
        })
    });
}

criterion_group!(benches, bench_bind_join);
criterion_main!(benches);
