//! Desired-type tracking for the two-pass expression binding protocol.
//!
//! A node is first bound bottom-up to learn its natural type. Parents then
//! record the type they want for a child here, and the child is bound a second
//! time so that literals and placeholders can be converted.

use crate::common::error::{BindError, BindResult};
use crate::parser::{AliasSerial, ExprArena, ExprId};
use crate::types::{LogicalType, TypeUtils};
use std::collections::HashMap;

/// Per-statement side table of desired types and parameter types
#[derive(Debug, Default)]
pub struct TypeSherpa {
    desired: HashMap<ExprId, LogicalType>,
    parameter_types: Vec<LogicalType>,
    next_alias_serial: u32,
}

impl TypeSherpa {
    pub fn new(num_parameters: usize) -> Self {
        Self {
            desired: HashMap::new(),
            parameter_types: vec![LogicalType::Invalid; num_parameters],
            next_alias_serial: 1,
        }
    }

    pub fn set_desired(&mut self, id: ExprId, ty: LogicalType) {
        self.desired.insert(id, ty);
    }

    /// Desired type of `id`, `Invalid` when no parent asked for one
    pub fn get_desired(&self, id: ExprId) -> LogicalType {
        self.desired
            .get(&id)
            .copied()
            .unwrap_or(LogicalType::Invalid)
    }

    /// Give both sides of a comparison one common type.
    ///
    /// A literal facing a non-literal adopts the other side's type; otherwise
    /// the wider of the two types is used.
    pub fn set_desired_pair(
        &mut self,
        exprs: &ExprArena,
        left: ExprId,
        right: ExprId,
    ) -> BindResult<()> {
        let effective = |id: ExprId| match self.get_desired(id) {
            LogicalType::Invalid => exprs[id].return_type,
            desired => desired,
        };
        let (left_type, right_type) = (effective(left), effective(right));
        let (left_literal, right_literal) = (exprs[left].is_literal(), exprs[right].is_literal());

        let common = if left_type == right_type {
            left_type
        } else if left_literal && !right_literal && right_type.is_valid() {
            right_type
        } else if right_literal && !left_literal && left_type.is_valid() {
            left_type
        } else {
            TypeUtils::get_max_type(&left_type, &right_type).map_err(|_| {
                BindError::DatatypeMismatch(format!(
                    "cannot compare {} ({}) with {} ({})",
                    exprs.display(left),
                    left_type,
                    exprs.display(right),
                    right_type
                ))
            })?
        };

        self.set_desired(left, common);
        self.set_desired(right, common);
        Ok(())
    }

    /// Fail when `id` resolved to a type its desired type cannot accept
    pub fn check_desired(&self, exprs: &ExprArena, id: ExprId) -> BindResult<()> {
        let desired = self.get_desired(id);
        let actual = exprs[id].return_type;
        if !desired.is_valid() || actual.can_implicitly_cast_to(&desired) {
            return Ok(());
        }
        Err(BindError::DatatypeMismatch(format!(
            "expression {} is of type {} but {} was expected",
            exprs.display(id),
            actual,
            desired
        )))
    }

    pub fn set_param_type(&mut self, index: usize, ty: LogicalType) {
        if index >= self.parameter_types.len() {
            self.parameter_types.resize(index + 1, LogicalType::Invalid);
        }
        self.parameter_types[index] = ty;
    }

    pub fn parameter_types(&self) -> &[LogicalType] {
        &self.parameter_types
    }

    pub fn into_parameter_types(self) -> Vec<LogicalType> {
        self.parameter_types
    }

    /// Fresh serial for a table reference
    pub fn next_alias_serial(&mut self) -> AliasSerial {
        let serial = AliasSerial(self.next_alias_serial);
        self.next_alias_serial += 1;
        serial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ErrorCode;

    #[test]
    fn test_literal_adopts_column_type() {
        let mut arena = ExprArena::new();
        let col = arena.column("d");
        arena[col].return_type = LogicalType::Date;
        let lit = arena.string("2020-01-01");

        let mut sherpa = TypeSherpa::new(0);
        sherpa.set_desired_pair(&arena, col, lit).unwrap();
        assert_eq!(sherpa.get_desired(col), LogicalType::Date);
        assert_eq!(sherpa.get_desired(lit), LogicalType::Date);
    }

    #[test]
    fn test_columns_widen() {
        let mut arena = ExprArena::new();
        let a = arena.column("a");
        arena[a].return_type = LogicalType::Integer;
        let b = arena.column("b");
        arena[b].return_type = LogicalType::BigInt;

        let mut sherpa = TypeSherpa::new(0);
        sherpa.set_desired_pair(&arena, a, b).unwrap();
        assert_eq!(sherpa.get_desired(a), LogicalType::BigInt);
        sherpa.check_desired(&arena, a).unwrap();

        let s = arena.column("s");
        arena[s].return_type = LogicalType::Varchar;
        let err = sherpa.set_desired_pair(&arena, a, s).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DatatypeMismatch);
    }

    #[test]
    fn test_check_desired() {
        let mut arena = ExprArena::new();
        let a = arena.column("a");
        arena[a].return_type = LogicalType::Integer;
        let mut sherpa = TypeSherpa::new(0);
        assert_eq!(sherpa.get_desired(a), LogicalType::Invalid);
        sherpa.check_desired(&arena, a).unwrap();

        sherpa.set_desired(a, LogicalType::Boolean);
        let err = sherpa.check_desired(&arena, a).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DatatypeMismatch);
    }

    #[test]
    fn test_parameter_table() {
        let mut sherpa = TypeSherpa::new(1);
        sherpa.set_param_type(2, LogicalType::Date);
        assert_eq!(
            sherpa.parameter_types(),
            &[LogicalType::Invalid, LogicalType::Invalid, LogicalType::Date]
        );
        assert_eq!(sherpa.next_alias_serial(), AliasSerial(1));
        assert_eq!(sherpa.next_alias_serial(), AliasSerial(2));
    }
}
