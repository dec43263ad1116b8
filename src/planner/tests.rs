//! Tests for plan building and the planner pipeline

use crate::binder::{Binder, BoundStatement};
use crate::catalog::{
    Catalog, CatalogAccessor, CatalogReader, ColumnId, ColumnSchema, TransactionContext,
};
use crate::common::config::PlannerConfig;
use crate::common::constants::{DEFAULT_DATABASE_NAME, DEFAULT_NAMESPACE_NAME};
use crate::common::error::{BindError, BindResult};
use crate::parser::*;
use crate::planner::*;
use crate::types::LogicalType;
use std::sync::Arc;

struct Fixture {
    reader: CatalogReader,
    txn: Arc<TransactionContext>,
}

/// t(a INTEGER, b VARCHAR), s(b INTEGER, c INTEGER), n(id INTEGER NOT NULL, v VARCHAR)
fn fixture() -> BindResult<Fixture> {
    let catalog = Arc::new(Catalog::new());
    let setup = TransactionContext::new();
    let db = catalog
        .database_id(DEFAULT_DATABASE_NAME)
        .ok_or_else(|| BindError::Internal("no default database".into()))?;
    catalog.create_table(
        &setup,
        db,
        &TableName::new("t"),
        vec![
            ColumnSchema::new("a", LogicalType::Integer),
            ColumnSchema::new("b", LogicalType::Varchar),
        ],
    )?;
    catalog.create_table(
        &setup,
        db,
        &TableName::new("s"),
        vec![
            ColumnSchema::new("b", LogicalType::Integer),
            ColumnSchema::new("c", LogicalType::Integer),
        ],
    )?;
    catalog.create_table(
        &setup,
        db,
        &TableName::new("n"),
        vec![
            ColumnSchema::new("id", LogicalType::Integer).not_null(),
            ColumnSchema::new("v", LogicalType::Varchar),
        ],
    )?;
    setup.commit()?;

    let txn = Arc::new(TransactionContext::new());
    let reader = catalog.accessor(DEFAULT_DATABASE_NAME, DEFAULT_NAMESPACE_NAME, Arc::clone(&txn))?;
    Ok(Fixture { reader, txn })
}

impl Fixture {
    fn plan(&self, statement: Statement, exprs: ExprArena) -> BindResult<(BoundStatement, LogicalPlan)> {
        let mut bound = Binder::new(&self.reader).bind(ParseResult::new(statement, exprs), &mut [])?;
        let plan = PlanBuilder::new(&self.reader).transform(&mut bound)?;
        Ok((bound, plan))
    }

    fn plan_select(
        &self,
        select: SelectStatement,
        exprs: ExprArena,
    ) -> BindResult<(BoundStatement, LogicalPlan)> {
        self.plan(Statement::Select(Box::new(select)), exprs)
    }
}

fn get_name(plan: &LogicalPlan) -> &str {
    match plan {
        LogicalPlan::Get(get) => &get.table_alias.name,
        other => panic!("Expected Get, found {:?}", other),
    }
}

#[test]
fn test_select_without_from_uses_empty_get() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let one = arena.int(1);
    let (_, plan) = f.plan_select(SelectStatement::new(vec![one]), arena)?;

    match plan {
        LogicalPlan::Get(get) => {
            assert!(!get.table_id.is_valid());
            assert!(get.table_alias.is_empty());
        }
        _ => panic!("Expected Get as root plan node"),
    }
    Ok(())
}

#[test]
fn test_where_clause_becomes_filter() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let a2 = arena.column("a");
    let one = arena.int(1);
    let b = arena.column("b");
    let x = arena.string("x");
    let gt = arena.compare(ComparisonOp::GreaterThan, a2, one);
    let eq = arena.equal(b, x);
    let predicate = arena.and(vec![gt, eq]);
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(predicate);

    let (_, plan) = f.plan_select(select, arena)?;
    match plan {
        LogicalPlan::Filter(filter) => {
            assert_eq!(filter.predicates.len(), 2);
            assert_eq!(filter.predicates[0].expr, gt);
            let aliases: Vec<_> = filter.predicates[1]
                .table_aliases
                .iter()
                .map(|alias| alias.name.as_str())
                .collect();
            assert_eq!(aliases, vec!["t"]);
            assert_eq!(get_name(&filter.input), "t");
        }
        _ => panic!("Expected Filter as root plan node"),
    }
    Ok(())
}

#[test]
fn test_from_list_builds_left_deep_inner_joins() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let star = arena.star();
    let select = SelectStatement::new(vec![star]).from(TableReference::List(vec![
        TableReference::table("t"),
        TableReference::table("s"),
        TableReference::aliased("t", "u"),
    ]));

    let (_, plan) = f.plan_select(select, arena)?;
    let LogicalPlan::Join(outer) = plan else {
        panic!("Expected Join as root plan node");
    };
    assert_eq!(outer.join_type, LogicalJoinType::Inner);
    assert_eq!(get_name(&outer.right), "u");
    match *outer.left {
        LogicalPlan::Join(inner) => {
            assert_eq!(get_name(&inner.left), "t");
            assert_eq!(get_name(&inner.right), "s");
        }
        _ => panic!("Expected Join as left input"),
    }
    Ok(())
}

#[test]
fn test_explicit_join_carries_condition() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.qualified_column("t", "a");
    let ta = arena.qualified_column("t", "a");
    let sb = arena.qualified_column("s", "b");
    let on = arena.equal(ta, sb);
    let select = SelectStatement::new(vec![a]).from(TableReference::join(
        JoinType::Left,
        TableReference::table("t"),
        TableReference::table("s"),
        Some(on),
    ));

    let (_, plan) = f.plan_select(select, arena)?;
    match plan {
        LogicalPlan::Join(join) => {
            assert_eq!(join.join_type, LogicalJoinType::Left);
            assert_eq!(join.predicates.len(), 1);
            assert_eq!(join.predicates[0].table_aliases.len(), 2);
        }
        _ => panic!("Expected Join as root plan node"),
    }
    Ok(())
}

#[test]
fn test_scalar_subquery_becomes_single_join() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let a2 = arena.column("a");
    let b = arena.column("b");
    let sub = arena.subquery(SelectStatement::new(vec![b]).from(TableReference::table("s")));
    let eq = arena.equal(a2, sub);
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(eq);

    let (bound, plan) = f.plan_select(select, arena)?;
    let LogicalPlan::Filter(filter) = plan else {
        panic!("Expected Filter as root plan node");
    };
    match filter.input.as_ref() {
        LogicalPlan::Join(join) => {
            assert_eq!(join.join_type, LogicalJoinType::Single);
            assert_eq!(get_name(&join.left), "t");
            assert_eq!(get_name(&join.right), "s");
        }
        _ => panic!("Expected Join below Filter"),
    }

    let ExprKind::Comparison { right, .. } = &bound.exprs[eq].kind else {
        panic!("Expected comparison");
    };
    assert_eq!(*right, b);
    let column = bound.exprs[b].column().expect("column");
    assert_eq!(column.column_name, "b");
    assert_eq!(column.table_alias.as_ref().map(|a| a.name.as_str()), Some("s"));
    assert_eq!(filter.predicates[0].table_aliases.len(), 2);
    Ok(())
}

#[test]
fn test_exists_becomes_mark_join() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let c = arena.column("c");
    let sc = arena.qualified_column("s", "c");
    let ta = arena.qualified_column("t", "a");
    let correlated = arena.equal(sc, ta);
    let exists = arena.exists(
        SelectStatement::new(vec![c])
            .from(TableReference::table("s"))
            .filter(correlated),
    );
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(exists);

    let (bound, plan) = f.plan_select(select, arena)?;
    match plan {
        LogicalPlan::Filter(filter) => match filter.input.as_ref() {
            LogicalPlan::Join(join) => {
                assert_eq!(join.join_type, LogicalJoinType::Mark);
                assert!(matches!(join.right.as_ref(), LogicalPlan::Filter(_)));
            }
            _ => panic!("Expected Join below Filter"),
        },
        _ => panic!("Expected Filter as root plan node"),
    }
    assert_eq!(
        bound.exprs[exists].kind,
        ExprKind::Operator {
            op: OperatorKind::IsNotNull,
            children: vec![c],
        }
    );
    Ok(())
}

#[test]
fn test_in_subquery_becomes_mark_join_equality() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let a2 = arena.column("a");
    let b = arena.column("b");
    let sub = arena.subquery(SelectStatement::new(vec![b]).from(TableReference::table("s")));
    let in_list = arena.compare(ComparisonOp::In, a2, sub);
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(in_list);

    let (bound, plan) = f.plan_select(select, arena)?;
    let LogicalPlan::Filter(filter) = plan else {
        panic!("Expected Filter as root plan node");
    };
    assert!(matches!(
        filter.input.as_ref(),
        LogicalPlan::Join(join) if join.join_type == LogicalJoinType::Mark
    ));
    assert_eq!(
        bound.exprs[in_list].kind,
        ExprKind::Comparison {
            op: ComparisonOp::Equal,
            left: a2,
            right: b,
        }
    );
    Ok(())
}

#[test]
fn test_subquery_on_both_sides_is_rejected() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let b1 = arena.column("b");
    let b2 = arena.column("b");
    let left = arena.subquery(SelectStatement::new(vec![b1]).from(TableReference::table("s")));
    let right = arena.subquery(SelectStatement::new(vec![b2]).from(TableReference::table("s")));
    let eq = arena.equal(left, right);
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(eq);

    let err = f.plan_select(select, arena).unwrap_err();
    assert!(matches!(err, BindError::FeatureNotSupported(_)));
    Ok(())
}

#[test]
fn test_multi_column_scalar_subquery_is_rejected() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let a2 = arena.column("a");
    let b = arena.column("b");
    let c = arena.column("c");
    let sub = arena.subquery(SelectStatement::new(vec![b, c]).from(TableReference::table("s")));
    let eq = arena.equal(a2, sub);
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(eq);

    let err = f.plan_select(select, arena).unwrap_err();
    assert_eq!(err, BindError::NotImplemented("array in predicates not supported".into()));
    Ok(())
}

#[test]
fn test_multi_column_in_subquery_is_rejected() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let a2 = arena.column("a");
    let b = arena.column("b");
    let c = arena.column("c");
    let sub = arena.subquery(SelectStatement::new(vec![b, c]).from(TableReference::table("s")));
    let in_list = arena.compare(ComparisonOp::In, a2, sub);
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(in_list);

    let err = f.plan_select(select, arena).unwrap_err();
    assert_eq!(err, BindError::NotImplemented("array in predicates not supported".into()));
    Ok(())
}

#[test]
fn test_exists_accepts_any_number_of_columns() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let b = arena.column("b");
    let c = arena.column("c");
    let exists = arena.exists(SelectStatement::new(vec![b, c]).from(TableReference::table("s")));
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(exists);

    let (_, plan) = f.plan_select(select, arena)?;
    let LogicalPlan::Filter(filter) = plan else {
        panic!("Expected Filter as root plan node");
    };
    assert!(matches!(
        filter.input.as_ref(),
        LogicalPlan::Join(join) if join.join_type == LogicalJoinType::Mark
    ));
    Ok(())
}

fn aggregating_subquery(op: ComparisonOp) -> (SelectStatement, ExprArena) {
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let a2 = arena.column("a");
    let b = arena.column("b");
    let max = arena.aggregate(AggregateKind::Max, Some(b), false);
    let sc = arena.qualified_column("s", "c");
    let ta = arena.qualified_column("t", "a");
    let correlated = arena.compare(op, sc, ta);
    let sub = arena.subquery(
        SelectStatement::new(vec![max])
            .from(TableReference::table("s"))
            .filter(correlated),
    );
    let eq = arena.equal(a2, sub);
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(eq);
    (select, arena)
}

#[test]
fn test_aggregating_subquery_with_equality_correlation() -> BindResult<()> {
    let f = fixture()?;
    let (select, arena) = aggregating_subquery(ComparisonOp::Equal);
    let (_, plan) = f.plan_select(select, arena)?;

    let LogicalPlan::Filter(filter) = plan else {
        panic!("Expected Filter as root plan node");
    };
    match filter.input.as_ref() {
        LogicalPlan::Join(join) => match join.right.as_ref() {
            LogicalPlan::Aggregate(agg) => {
                assert!(agg.group_by.is_empty());
                assert!(matches!(agg.input.as_ref(), LogicalPlan::Filter(_)));
            }
            _ => panic!("Expected Aggregate as subquery plan"),
        },
        _ => panic!("Expected Join below Filter"),
    }
    Ok(())
}

#[test]
fn test_aggregating_subquery_with_inequality_correlation() -> BindResult<()> {
    let f = fixture()?;
    let (select, arena) = aggregating_subquery(ComparisonOp::GreaterThan);
    let err = f.plan_select(select, arena).unwrap_err();
    assert!(matches!(err, BindError::NotImplemented(_)));
    Ok(())
}

#[test]
fn test_correlation_two_levels_out_is_rejected() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let c_out = arena.column("c");
    let c_inner = arena.column("c");
    let ta = arena.qualified_column("t", "a");
    let innermost_pred = arena.equal(c_inner, ta);
    let innermost = arena.exists(
        SelectStatement::new(vec![c_out])
            .from(TableReference::aliased("s", "s2"))
            .filter(innermost_pred),
    );
    let b = arena.column("b");
    let middle = arena.exists(
        SelectStatement::new(vec![b])
            .from(TableReference::table("s"))
            .filter(innermost),
    );
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .filter(middle);

    let err = f.plan_select(select, arena).unwrap_err();
    assert!(matches!(err, BindError::NotImplemented(_)));
    Ok(())
}

#[test]
fn test_mixing_aggregates_without_group_by() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let count = arena.count_star();
    let select = SelectStatement::new(vec![a, count]).from(TableReference::table("t"));

    let err = f.plan_select(select, arena).unwrap_err();
    assert_eq!(
        err,
        BindError::SyntaxError("mixing aggregate and non-aggregate columns without GROUP BY".into())
    );
    Ok(())
}

#[test]
fn test_group_by_with_having() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let count = arena.count_star();
    let group = arena.column("a");
    let having_count = arena.count_star();
    let one = arena.int(1);
    let having = arena.compare(ComparisonOp::GreaterThan, having_count, one);
    let select = SelectStatement::new(vec![a, count])
        .from(TableReference::table("t"))
        .group_by(vec![group], Some(having));

    let (_, plan) = f.plan_select(select, arena)?;
    match plan {
        LogicalPlan::Filter(filter) => match *filter.input {
            LogicalPlan::Aggregate(agg) => {
                assert_eq!(agg.group_by, vec![group]);
                assert_eq!(get_name(&agg.input), "t");
            }
            _ => panic!("Expected Aggregate below HAVING Filter"),
        },
        _ => panic!("Expected Filter as root plan node"),
    }
    Ok(())
}

#[test]
fn test_distinct_groups_by_select_list() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let b = arena.column("b");
    let select = SelectStatement::new(vec![b])
        .from(TableReference::table("t"))
        .distinct();

    let (_, plan) = f.plan_select(select, arena)?;
    match plan {
        LogicalPlan::Aggregate(agg) => assert_eq!(agg.group_by, vec![b]),
        _ => panic!("Expected Aggregate as root plan node"),
    }
    Ok(())
}

#[test]
fn test_distinct_with_group_by_adds_no_second_aggregate() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let group = arena.column("a");
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .group_by(vec![group], None)
        .distinct();

    let (_, plan) = f.plan_select(select, arena)?;
    let LogicalPlan::Aggregate(agg) = plan else {
        panic!("Expected Aggregate as root plan node");
    };
    assert_eq!(agg.group_by, vec![group]);
    assert_eq!(get_name(&agg.input), "t");
    Ok(())
}

#[test]
fn test_order_by_and_limit() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let key = arena.column("a");
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .order_by(vec![OrderByItem::desc(key)])
        .limit(Some(5), Some(10));

    let (_, plan) = f.plan_select(select, arena)?;
    match plan {
        LogicalPlan::Limit(limit) => {
            assert_eq!(limit.limit, Some(5));
            assert_eq!(limit.offset, 10);
            assert_eq!(limit.sort_exprs, vec![a]);
            assert_eq!(limit.sort_directions, vec![OrderDirection::Descending]);
        }
        _ => panic!("Expected Limit as root plan node"),
    }
    Ok(())
}

#[test]
fn test_cte_subtree_is_attached_to_its_scan() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let x = arena.column("x");
    let select = SelectStatement::new(vec![x])
        .from(TableReference::table("c"))
        .with_cte(CommonTableExpression::new(
            "c",
            &["x"],
            SelectStatement::new(vec![a]).from(TableReference::table("t")),
        ));

    let (_, plan) = f.plan_select(select, arena)?;
    match plan {
        LogicalPlan::CteScan(scan) => {
            assert_eq!(scan.cte_name, "c");
            assert!(scan.table_id.is_temp());
            assert!(!scan.is_recursive);
            assert_eq!(scan.columns.len(), 1);
            assert_eq!(scan.columns[0].alias.name, "x");
            assert_eq!(scan.expressions, vec![vec![a]]);
            assert_eq!(get_name(scan.input.as_deref().expect("attached")), "t");
        }
        _ => panic!("Expected CteScan as root plan node"),
    }
    Ok(())
}

#[test]
fn test_cte_used_only_by_later_cte() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a1 = arena.column("a");
    let a2 = arena.column("a");
    let a3 = arena.column("a");
    let select = SelectStatement::new(vec![a3])
        .from(TableReference::table("c2"))
        .with_cte(CommonTableExpression::new(
            "c1",
            &[],
            SelectStatement::new(vec![a1]).from(TableReference::table("t")),
        ))
        .with_cte(CommonTableExpression::new(
            "c2",
            &[],
            SelectStatement::new(vec![a2]).from(TableReference::table("c1")),
        ));

    let (_, plan) = f.plan_select(select, arena)?;
    let LogicalPlan::CteScan(c2) = plan else {
        panic!("Expected CteScan as root plan node");
    };
    assert_eq!(c2.cte_name, "c2");
    match c2.input.as_deref() {
        Some(LogicalPlan::CteScan(c1)) => {
            assert_eq!(c1.cte_name, "c1");
            assert_eq!(get_name(c1.input.as_deref().expect("attached")), "t");
        }
        _ => panic!("Expected CteScan of c1 inside c2"),
    }
    Ok(())
}

#[test]
fn test_union_all() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let c = arena.column("c");
    let select = SelectStatement::new(vec![a])
        .from(TableReference::table("t"))
        .union_all(SelectStatement::new(vec![c]).from(TableReference::table("s")));

    let (_, plan) = f.plan_select(select, arena)?;
    match plan {
        LogicalPlan::Union(union) => {
            assert_eq!(get_name(&union.left), "t");
            assert_eq!(get_name(&union.right), "s");
        }
        _ => panic!("Expected Union as root plan node"),
    }
    Ok(())
}

#[test]
fn test_cte_is_visible_to_every_union_branch() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let left = arena.column("a");
    let right = arena.column("a");
    let select = SelectStatement::new(vec![left])
        .with_cte(CommonTableExpression::new(
            "c",
            &[],
            SelectStatement::new(vec![a]).from(TableReference::table("t")),
        ))
        .from(TableReference::table("c"))
        .union_all(SelectStatement::new(vec![right]).from(TableReference::table("c")));

    let (_, plan) = f.plan_select(select, arena)?;
    let LogicalPlan::Union(union) = plan else {
        panic!("Expected Union as root plan node");
    };
    match (union.left.as_ref(), union.right.as_ref()) {
        (LogicalPlan::CteScan(l), LogicalPlan::CteScan(r)) => {
            assert_eq!(l.cte_name, "c");
            assert_eq!(r.cte_name, "c");
            assert_eq!(l.table_id, r.table_id);
            assert_eq!(get_name(l.input.as_deref().expect("attached")), "t");
            assert!(r.input.is_none());
        }
        other => panic!("Expected CteScan on both sides, found {:?}", other),
    }
    Ok(())
}

#[test]
fn test_insert_values() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let one = arena.int(1);
    let x = arena.string("x");
    let insert = InsertStatement {
        table: BaseTableRef::new(TableName::new("t")),
        columns: vec![],
        source: InsertSource::Values(vec![vec![one, x]]),
    };

    let (_, plan) = f.plan(Statement::Insert(insert), arena)?;
    match plan {
        LogicalPlan::Insert(insert) => {
            assert_eq!(insert.columns, vec![ColumnId(1), ColumnId(2)]);
            assert_eq!(insert.values, vec![vec![one, x]]);
        }
        _ => panic!("Expected Insert as root plan node"),
    }
    Ok(())
}

#[test]
fn test_insert_null_into_not_null_column() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let null = arena.null();
    let v = arena.string("v");
    let insert = InsertStatement {
        table: BaseTableRef::new(TableName::new("n")),
        columns: vec![],
        source: InsertSource::Values(vec![vec![null, v]]),
    };

    let err = f.plan(Statement::Insert(insert), arena).unwrap_err();
    assert_eq!(
        err,
        BindError::SyntaxError("null value in column \"id\" violates not-null constraint".into())
    );
    Ok(())
}

#[test]
fn test_update_scans_for_update() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let y = arena.string("y");
    let a = arena.column("a");
    let one = arena.int(1);
    let predicate = arena.equal(a, one);
    let update = UpdateStatement {
        table: BaseTableRef::new(TableName::new("t")),
        clauses: vec![UpdateClause {
            column: "B".into(),
            value: y,
        }],
        where_clause: Some(predicate),
    };

    let (_, plan) = f.plan(Statement::Update(update), arena)?;
    match plan {
        LogicalPlan::Update(update) => {
            assert_eq!(update.updates, vec![(ColumnId(2), y)]);
            match *update.input {
                LogicalPlan::Get(get) => {
                    assert!(get.is_for_update);
                    assert_eq!(get.predicates.len(), 1);
                }
                _ => panic!("Expected Get below Update"),
            }
        }
        _ => panic!("Expected Update as root plan node"),
    }
    Ok(())
}

#[test]
fn test_delete_with_subquery_is_not_implemented() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let b = arena.column("b");
    let sub = arena.subquery(SelectStatement::new(vec![b]).from(TableReference::table("s")));
    let predicate = arena.equal(a, sub);
    let delete = DeleteStatement {
        table: BaseTableRef::new(TableName::new("t")),
        where_clause: Some(predicate),
    };

    let err = f.plan(Statement::Delete(delete), arena).unwrap_err();
    assert!(matches!(err, BindError::NotImplemented(_)));
    Ok(())
}

#[test]
fn test_create_index_synthesizes_column_reference() -> BindResult<()> {
    let f = fixture()?;
    let create = CreateStatement {
        if_not_exists: false,
        kind: CreateKind::Index {
            name: "T_A".into(),
            table: TableName::new("t"),
            attributes: vec![IndexAttribute::Column("A".into())],
            unique: true,
        },
    };

    let (bound, plan) = f.plan(Statement::Create(create), ExprArena::new())?;
    match plan {
        LogicalPlan::CreateIndex(index) => {
            assert_eq!(index.index_name, "t_a");
            assert!(index.unique);
            assert_eq!(index.attributes.len(), 1);
            let node = &bound.exprs[index.attributes[0]];
            assert_eq!(node.return_type, LogicalType::Integer);
            assert_eq!(node.column().map(|c| c.column_id), Some(ColumnId(1)));
        }
        _ => panic!("Expected CreateIndex as root plan node"),
    }
    Ok(())
}

#[test]
fn test_drop_table_resolves_id() -> BindResult<()> {
    let f = fixture()?;
    let drop = DropStatement {
        kind: DropKind::Table,
        target: TableName::new("S"),
        if_exists: false,
    };
    let expected = f.reader.table_id(&TableName::new("s"));

    let (_, plan) = f.plan(Statement::Drop(drop), ExprArena::new())?;
    match plan {
        LogicalPlan::Drop(drop) => {
            assert_eq!(Some(drop.target), expected.map(DropTarget::Table));
        }
        _ => panic!("Expected Drop as root plan node"),
    }
    Ok(())
}

#[test]
fn test_analyze_wraps_aggregate_over_get() -> BindResult<()> {
    let f = fixture()?;
    let analyze = AnalyzeStatement {
        table: Some(TableName::new("t")),
        ..Default::default()
    };

    let (_, plan) = f.plan(Statement::Analyze(analyze), ExprArena::new())?;
    match plan {
        LogicalPlan::Analyze(analyze) => {
            assert_eq!(analyze.column_ids, vec![ColumnId(1), ColumnId(2)]);
            match *analyze.input {
                LogicalPlan::Aggregate(agg) => assert_eq!(get_name(&agg.input), "t"),
                _ => panic!("Expected Aggregate below Analyze"),
            }
        }
        _ => panic!("Expected Analyze as root plan node"),
    }
    Ok(())
}

#[test]
fn test_explain_wraps_plan() -> BindResult<()> {
    let f = fixture()?;
    let mut arena = ExprArena::new();
    let a = arena.column("a");
    let inner = Statement::Select(Box::new(
        SelectStatement::new(vec![a]).from(TableReference::table("t")),
    ));
    let explain = ExplainStatement {
        statement: Box::new(inner),
    };

    let (_, plan) = f.plan(Statement::Explain(explain), arena)?;
    assert_eq!(plan.to_string(), "Explain\n  Get t#1 table=3\n");
    Ok(())
}

#[test]
fn test_planner_downgrades_drop_if_exists() -> BindResult<()> {
    let f = fixture()?;
    let planner = QueryPlanner::new(PlannerConfig::default());
    let drop = DropStatement {
        kind: DropKind::Index,
        target: TableName::new("nope"),
        if_exists: true,
    };

    let outcome = planner.plan(
        &f.reader,
        ParseResult::new(Statement::Drop(drop), ExprArena::new()),
        &mut [],
    )?;
    assert_eq!(
        outcome,
        PlanOutcome::Notice("index \"nope\" does not exist, skipping".into())
    );
    assert!(!f.txn.must_abort());
    Ok(())
}

#[test]
fn test_planner_marks_failed_ddl_must_abort() -> BindResult<()> {
    let f = fixture()?;
    let planner = QueryPlanner::default();
    let create = CreateStatement {
        if_not_exists: false,
        kind: CreateKind::Table {
            name: TableName::new("t"),
            columns: vec![ColumnDefinition::new("a", LogicalType::Integer)],
            foreign_keys: vec![],
        },
    };

    let err = planner
        .plan(
            &f.reader,
            ParseResult::new(Statement::Create(create), ExprArena::new()),
            &mut [],
        )
        .unwrap_err();
    assert!(matches!(err, BindError::DuplicateObject(_)));
    assert!(f.txn.must_abort());
    Ok(())
}
