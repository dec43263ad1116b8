//! Predicate utilities shared by the plan builder

use super::AnnotatedExpression;
use crate::parser::{Alias, ConjunctionOp, ExprArena, ExprId, ExprKind};
use std::collections::HashSet;

/// Flatten nested AND nodes into their conjuncts, left to right
pub fn split_conjuncts(exprs: &ExprArena, root: ExprId) -> Vec<ExprId> {
    let mut conjuncts = Vec::new();
    collect_conjuncts(exprs, root, &mut conjuncts);
    conjuncts
}

fn collect_conjuncts(exprs: &ExprArena, id: ExprId, out: &mut Vec<ExprId>) {
    match &exprs[id].kind {
        ExprKind::Conjunction {
            op: ConjunctionOp::And,
            children,
        } => {
            for &child in children {
                collect_conjuncts(exprs, child, out);
            }
        }
        _ => out.push(id),
    }
}

/// Aliases of every table whose columns appear in the tree. Subquery bodies
/// are not searched.
pub fn table_aliases(exprs: &ExprArena, root: ExprId) -> HashSet<Alias> {
    let mut aliases = HashSet::new();
    collect_aliases(exprs, root, &mut aliases);
    aliases
}

fn collect_aliases(exprs: &ExprArena, id: ExprId, out: &mut HashSet<Alias>) {
    if let Some(alias) = exprs[id].column().and_then(|c| c.table_alias.clone()) {
        out.insert(alias);
        return;
    }
    for child in exprs[id].children() {
        collect_aliases(exprs, child, out);
    }
}

/// Split `root` into conjuncts annotated with the aliases they reference
pub fn extract_predicates(exprs: &ExprArena, root: ExprId) -> Vec<AnnotatedExpression> {
    split_conjuncts(exprs, root)
        .into_iter()
        .map(|conjunct| AnnotatedExpression::new(conjunct, table_aliases(exprs, conjunct)))
        .collect()
}

/// Scope depth of every column in the tree, not looking into subqueries
pub(crate) fn column_depths(exprs: &ExprArena, root: ExprId) -> Vec<usize> {
    let mut depths = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let node = &exprs[id];
        if node.column().is_some() {
            depths.extend(node.depth);
        } else {
            stack.extend(node.children());
        }
    }
    depths
}

/// Whether a column at `depth` appears outside every aggregate in the tree
pub(crate) fn has_bare_column(exprs: &ExprArena, id: ExprId, depth: usize) -> bool {
    let node = &exprs[id];
    match &node.kind {
        ExprKind::Aggregate { .. } => false,
        ExprKind::Column(_) => node.depth == Some(depth),
        _ => node
            .children()
            .into_iter()
            .any(|child| has_bare_column(exprs, child, depth)),
    }
}
