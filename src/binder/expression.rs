//! Expression binding
//!
//! Every node is bound bottom-up first. A parent that needs a particular type
//! from a child records it with the [`TypeSherpa`](super::TypeSherpa) and binds
//! the child again, which converts literals and placeholders in place.

use super::Binder;
use crate::common::error::{BindError, BindResult};
use crate::parser::{AggregateKind, ColumnRef, ExprId, ExprKind, OperatorKind, WhenClause};
use crate::types::{LogicalType, TypeUtils};
use crate::{bind_err, internal_err};
use tracing::trace;

impl Binder<'_> {
    pub(super) fn bind_expr(&mut self, id: ExprId) -> BindResult<()> {
        match &self.exprs[id].kind {
            ExprKind::Constant(_) => self.bind_constant(id),
            ExprKind::Parameter { index } => {
                let index = *index;
                self.bind_parameter(id, index)
            }
            ExprKind::Column(_) => self.bind_column(id),
            ExprKind::Star | ExprKind::TableStar { .. } => {
                if self.scopes.current()?.has_any_table() {
                    Ok(())
                } else {
                    Err(bind_err!(
                        SyntaxError,
                        "SELECT * with no tables specified is not valid"
                    ))
                }
            }
            ExprKind::Comparison { left, right, .. } => {
                let (left, right) = (*left, *right);
                self.bind_comparison(id, left, right)
            }
            ExprKind::Conjunction { children, .. } => {
                let children = children.clone();
                self.bind_conjunction(id, &children)
            }
            ExprKind::Operator { op, children } => {
                let (op, children) = (*op, children.clone());
                self.bind_operator(id, op, &children)
            }
            ExprKind::Function { name, args, .. } => {
                let (name, args) = (name.to_lowercase(), args.clone());
                self.bind_function(id, &name, &args)
            }
            ExprKind::Aggregate { kind, arg, .. } => {
                let (kind, arg) = (*kind, *arg);
                self.bind_aggregate(id, kind, arg)
            }
            ExprKind::Cast { target, child } => {
                let (target, child) = (*target, *child);
                self.bind_cast(id, target, child)
            }
            ExprKind::Case {
                when_clauses,
                default,
            } => {
                let (when_clauses, default) = (when_clauses.clone(), *default);
                self.bind_case(id, &when_clauses, default)
            }
            ExprKind::Subquery(_) => self.bind_subquery(id),
            ExprKind::Default => Err(bind_err!(
                SyntaxError,
                "DEFAULT is not allowed in this context"
            )),
        }
    }

    /// Convert the literal to its desired type, if any
    fn bind_constant(&mut self, id: ExprId) -> BindResult<()> {
        let desired = self.sherpa.get_desired(id);
        let node = &mut self.exprs[id];
        if let ExprKind::Constant(value) = &mut node.kind {
            if desired.is_valid() {
                *value = value.try_promote(&desired)?;
                node.return_type = desired;
            } else if !value.is_null() {
                node.return_type = value.logical_type();
            }
        }
        Ok(())
    }

    /// Convert the supplied value in place and record the placeholder's type
    fn bind_parameter(&mut self, id: ExprId, index: usize) -> BindResult<()> {
        let value = self.parameters.get(index).ok_or_else(|| {
            bind_err!(UndefinedParameter, "there is no parameter ${}", index + 1)
        })?;
        let desired = self.sherpa.get_desired(id);
        let promoted = value.try_promote(&desired)?;
        let ty = if desired.is_valid() {
            desired
        } else {
            promoted.logical_type()
        };
        self.parameters[index] = promoted;
        self.exprs[id].return_type = ty;
        self.sherpa.set_param_type(index, ty);
        Ok(())
    }

    fn bind_column(&mut self, id: ExprId) -> BindResult<()> {
        let column = self.exprs[id]
            .column()
            .cloned()
            .ok_or_else(|| internal_err!("expected column at {}", id))?;

        if !column.is_resolved() {
            let column_name = column.column_name.to_lowercase();
            let resolved = match &column.table_alias {
                None => self
                    .scopes
                    .resolve_unqualified(&column_name)?
                    .ok_or_else(|| self.undefined_column(&column_name))?,
                Some(alias) => {
                    let alias = self.scopes.resolve_alias_upward(&alias.name.to_lowercase());
                    self.scopes
                        .resolve_qualified(&alias.name, &column_name)?
                        .ok_or_else(|| {
                            bind_err!(
                                UndefinedTable,
                                "missing FROM-clause entry for table \"{}\"",
                                alias.name
                            )
                        })?
                }
            };
            trace!(
                column = %column_name,
                table = %resolved.alias,
                depth = resolved.depth,
                "resolved column"
            );

            let node = &mut self.exprs[id];
            node.kind = ExprKind::Column(ColumnRef {
                table_alias: Some(resolved.alias),
                column_name: resolved.column_name,
                database_id: resolved.database_id,
                table_id: resolved.table_id,
                column_id: resolved.column_id,
            });
            node.return_type = resolved.data_type;
            node.depth = Some(resolved.depth);
        }

        if !self.sherpa.get_desired(id).is_valid() {
            self.sherpa.set_desired(id, self.exprs[id].return_type);
        }
        self.sherpa.check_desired(&self.exprs, id)
    }

    fn undefined_column(&self, name: &str) -> BindError {
        let hint = self
            .scopes
            .visible_column_names()
            .into_iter()
            .map(|candidate| (strsim::levenshtein(name, &candidate), candidate))
            .filter(|(distance, _)| *distance <= 2)
            .min_by_key(|(distance, _)| *distance);
        match hint {
            Some((_, candidate)) => bind_err!(
                UndefinedColumn,
                "column \"{}\" does not exist, did you mean \"{}\"?",
                name,
                candidate
            ),
            None => bind_err!(UndefinedColumn, "column \"{}\" does not exist", name),
        }
    }

    fn bind_comparison(&mut self, id: ExprId, left: ExprId, right: ExprId) -> BindResult<()> {
        self.bind_expr(left)?;
        self.bind_expr(right)?;
        self.exprs[id].return_type = LogicalType::Boolean;
        self.sherpa.check_desired(&self.exprs, id)?;

        self.sherpa.set_desired_pair(&self.exprs, left, right)?;
        self.bind_expr(left)?;
        self.bind_expr(right)?;

        // A cast around a literal has done its job once the literal is converted
        for child in [left, right] {
            if let ExprKind::Cast { child: inner, .. } = self.exprs[child].kind {
                if self.exprs[inner].is_literal() {
                    self.exprs.replace_child(id, child, inner);
                }
            }
        }
        Ok(())
    }

    fn bind_conjunction(&mut self, id: ExprId, children: &[ExprId]) -> BindResult<()> {
        for &child in children {
            self.bind_expr(child)?;
        }
        self.exprs[id].return_type = LogicalType::Boolean;
        self.sherpa.check_desired(&self.exprs, id)?;
        for &child in children {
            self.sherpa.set_desired(child, LogicalType::Boolean);
            self.bind_expr(child)?;
        }
        Ok(())
    }

    fn bind_operator(&mut self, id: ExprId, op: OperatorKind, children: &[ExprId]) -> BindResult<()> {
        for &child in children {
            self.bind_expr(child)?;
        }

        let return_type = match op {
            OperatorKind::Not => {
                let child = single_child(op, children)?;
                self.sherpa.set_desired(child, LogicalType::Boolean);
                self.bind_expr(child)?;
                LogicalType::Boolean
            }
            OperatorKind::IsNull | OperatorKind::IsNotNull | OperatorKind::Exists => {
                LogicalType::Boolean
            }
            OperatorKind::Negate => {
                let child = single_child(op, children)?;
                let ty = self.exprs[child].return_type;
                if ty.is_valid() && !ty.is_numeric() {
                    return Err(bind_err!(
                        UndefinedFunction,
                        "operator does not exist: - {}",
                        ty
                    ));
                }
                ty
            }
            OperatorKind::Plus
            | OperatorKind::Minus
            | OperatorKind::Multiply
            | OperatorKind::Divide
            | OperatorKind::Modulo => {
                let [left, right] = children else {
                    return Err(internal_err!("operator {} expects two operands", op.symbol()));
                };
                self.bind_arithmetic(op, *left, *right)?
            }
        };

        self.exprs[id].return_type = return_type;
        self.sherpa.check_desired(&self.exprs, id)
    }

    /// Result type of a binary arithmetic operator; literal operands are
    /// converted to it
    fn bind_arithmetic(
        &mut self,
        op: OperatorKind,
        left: ExprId,
        right: ExprId,
    ) -> BindResult<LogicalType> {
        let (lt, rt) = (self.exprs[left].return_type, self.exprs[right].return_type);
        let mismatch = || {
            bind_err!(
                UndefinedFunction,
                "operator does not exist: {} {} {}",
                lt,
                op.symbol(),
                rt
            )
        };
        let result = TypeUtils::get_max_type(&lt, &rt).map_err(|_| mismatch())?;
        if result.is_valid() && !result.is_numeric() {
            return Err(mismatch());
        }
        for child in [left, right] {
            if self.exprs[child].is_literal() && self.exprs[child].return_type != result {
                self.sherpa.set_desired(child, result);
                self.bind_expr(child)?;
            }
        }
        Ok(result)
    }

    fn bind_function(&mut self, id: ExprId, name: &str, args: &[ExprId]) -> BindResult<()> {
        for &arg in args {
            self.bind_expr(arg)?;
        }
        let arg_types: Vec<LogicalType> = args.iter().map(|&a| self.exprs[a].return_type).collect();
        let info = self.accessor.resolve_function(name, &arg_types).ok_or_else(|| {
            let rendered: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
            bind_err!(
                UndefinedFunction,
                "function {}({}) does not exist",
                name,
                rendered.join(", ")
            )
        })?;

        for (&arg, &param) in args.iter().zip(&info.argument_types) {
            if self.exprs[arg].is_literal() && self.exprs[arg].return_type != param {
                self.sherpa.set_desired(arg, param);
                self.bind_expr(arg)?;
            }
        }

        let node = &mut self.exprs[id];
        if let ExprKind::Function { proc_id, .. } = &mut node.kind {
            *proc_id = info.proc_id;
        }
        node.return_type = info.return_type;
        self.sherpa.check_desired(&self.exprs, id)
    }

    fn bind_aggregate(
        &mut self,
        id: ExprId,
        kind: AggregateKind,
        arg: Option<ExprId>,
    ) -> BindResult<()> {
        let arg_type = match arg {
            Some(arg) => {
                self.bind_expr(arg)?;
                if self.exprs.contains_aggregate(arg) {
                    return Err(bind_err!(
                        SyntaxError,
                        "aggregate function calls cannot be nested"
                    ));
                }
                self.exprs[arg].return_type
            }
            None if kind == AggregateKind::CountStar => LogicalType::Invalid,
            None => {
                return Err(bind_err!(
                    SyntaxError,
                    "{} requires an argument",
                    kind.name()
                ))
            }
        };

        let undefined = || {
            bind_err!(
                UndefinedFunction,
                "function {}({}) does not exist",
                kind.name(),
                arg_type
            )
        };
        let return_type = match kind {
            AggregateKind::Count | AggregateKind::CountStar => LogicalType::BigInt,
            AggregateKind::Min | AggregateKind::Max => arg_type,
            AggregateKind::Sum => match arg_type {
                t if t.is_integral() => LogicalType::BigInt,
                t @ (LogicalType::Decimal { .. } | LogicalType::Double | LogicalType::Invalid) => t,
                _ => return Err(undefined()),
            },
            AggregateKind::Avg => match arg_type {
                t if t.is_integral() => LogicalType::Double,
                t @ (LogicalType::Decimal { .. } | LogicalType::Double | LogicalType::Invalid) => t,
                _ => return Err(undefined()),
            },
        };
        self.exprs[id].return_type = return_type;
        self.sherpa.check_desired(&self.exprs, id)
    }

    /// A cast pushes its target type into a literal child; anything else must
    /// be explicitly castable
    fn bind_cast(&mut self, id: ExprId, target: LogicalType, child: ExprId) -> BindResult<()> {
        if self.exprs[child].is_literal() {
            self.sherpa.set_desired(child, target);
            self.bind_expr(child)?;
        } else {
            self.bind_expr(child)?;
            let child_type = self.exprs[child].return_type;
            if !child_type.can_cast_to(&target) {
                return Err(bind_err!(
                    DatatypeMismatch,
                    "cannot cast type {} to {}",
                    child_type,
                    target
                ));
            }
        }
        self.exprs[id].return_type = target;
        self.sherpa.check_desired(&self.exprs, id)
    }

    fn bind_case(
        &mut self,
        id: ExprId,
        when_clauses: &[WhenClause],
        default: Option<ExprId>,
    ) -> BindResult<()> {
        for clause in when_clauses {
            if self.exprs[clause.condition].is_literal() {
                self.sherpa.set_desired(clause.condition, LogicalType::Boolean);
            }
            self.bind_expr(clause.condition)?;
            let ty = self.exprs[clause.condition].return_type;
            if ty.is_valid() && ty != LogicalType::Boolean {
                return Err(bind_err!(
                    DatatypeMismatch,
                    "argument of CASE/WHEN must be type boolean, not type {}",
                    ty
                ));
            }
            self.bind_expr(clause.then)?;
        }
        if let Some(default) = default {
            self.bind_expr(default)?;
        }

        let results: Vec<ExprId> = when_clauses
            .iter()
            .map(|c| c.then)
            .chain(default)
            .collect();
        let mut result_type = LogicalType::Invalid;
        for &result in &results {
            let ty = self.exprs[result].return_type;
            result_type = TypeUtils::get_max_type(&result_type, &ty).map_err(|_| {
                bind_err!(
                    DatatypeMismatch,
                    "CASE types {} and {} cannot be matched",
                    result_type,
                    ty
                )
            })?;
        }
        for &result in &results {
            if self.exprs[result].is_literal() && self.exprs[result].return_type != result_type {
                self.sherpa.set_desired(result, result_type);
                self.bind_expr(result)?;
            }
        }

        self.exprs[id].return_type = result_type;
        self.sherpa.check_desired(&self.exprs, id)
    }

    /// Bind the nested select once; its type is that of its first column
    fn bind_subquery(&mut self, id: ExprId) -> BindResult<()> {
        let already_bound = self
            .exprs
            .subquery_select(id)
            .is_some_and(|select| select.depth.is_some());
        if !already_bound {
            let mut select = self.exprs.take_subquery(id)?;
            let result = self.bind_select(&mut select);
            self.exprs.restore_subquery(id, select);
            result?;
        }

        let first = self
            .exprs
            .subquery_select(id)
            .and_then(|select| select.select_list.first().copied());
        let node_type = first.map_or(LogicalType::Invalid, |c| self.exprs[c].return_type);
        let node = &mut self.exprs[id];
        node.return_type = node_type;
        node.has_subquery = true;
        self.sherpa.check_desired(&self.exprs, id)
    }
}

fn single_child(op: OperatorKind, children: &[ExprId]) -> BindResult<ExprId> {
    match children {
        [child] => Ok(*child),
        _ => Err(internal_err!("operator {} expects one operand", op.symbol())),
    }
}
