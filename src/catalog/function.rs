//! Function Management
//!
//! Built-in scalar function overloads and overload resolution.

use crate::catalog::ProcId;
use crate::types::LogicalType;
use std::collections::HashMap;

/// Function information
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    /// Resolved overload id
    pub proc_id: ProcId,
    /// Function name
    pub function_name: String,
    /// Argument types
    pub argument_types: Vec<LogicalType>,
    /// Return type
    pub return_type: LogicalType,
}

/// Overloads grouped by lower-case name
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Vec<FunctionInfo>>,
    next_proc_id: u32,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            next_proc_id: 1,
        }
    }

    /// Registry preloaded with the built-in scalar functions
    pub fn with_builtins() -> Self {
        use LogicalType::*;

        let mut registry = Self::new();
        registry.register("lower", vec![Varchar], Varchar);
        registry.register("upper", vec![Varchar], Varchar);
        registry.register("length", vec![Varchar], Integer);
        registry.register("substr", vec![Varchar, Integer, Integer], Varchar);
        registry.register("concat", vec![Varchar, Varchar], Varchar);
        registry.register("abs", vec![Integer], Integer);
        registry.register("abs", vec![BigInt], BigInt);
        registry.register("abs", vec![Double], Double);
        registry.register("round", vec![Double], Double);
        registry.register("sqrt", vec![Double], Double);
        registry.register("now", vec![], Timestamp);
        registry.register("date_trunc", vec![Varchar, Timestamp], Timestamp);
        registry
    }

    /// Register an overload and return its id
    pub fn register(
        &mut self,
        name: &str,
        argument_types: Vec<LogicalType>,
        return_type: LogicalType,
    ) -> ProcId {
        let proc_id = ProcId(self.next_proc_id);
        self.next_proc_id += 1;
        let name = name.to_lowercase();
        self.functions
            .entry(name.clone())
            .or_default()
            .push(FunctionInfo {
                proc_id,
                function_name: name,
                argument_types,
                return_type,
            });
        proc_id
    }

    /// Pick the overload for `name(args)`: an exact match first, otherwise the
    /// first overload every argument implicitly casts to
    pub fn resolve(&self, name: &str, args: &[LogicalType]) -> Option<&FunctionInfo> {
        let candidates = self.functions.get(&name.to_lowercase())?;
        let arity_matches = |f: &&FunctionInfo| f.argument_types.len() == args.len();

        candidates
            .iter()
            .filter(arity_matches)
            .find(|f| f.argument_types.as_slice() == args)
            .or_else(|| {
                candidates.iter().filter(arity_matches).find(|f| {
                    args.iter()
                        .zip(&f.argument_types)
                        .all(|(arg, param)| arg.can_implicitly_cast_to(param))
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_resolution() {
        let registry = FunctionRegistry::with_builtins();

        let exact = registry.resolve("ABS", &[LogicalType::BigInt]).unwrap();
        assert_eq!(exact.return_type, LogicalType::BigInt);

        let widened = registry.resolve("abs", &[LogicalType::SmallInt]).unwrap();
        assert_eq!(widened.return_type, LogicalType::Integer);

        let untyped_null = registry.resolve("lower", &[LogicalType::Invalid]).unwrap();
        assert_eq!(untyped_null.return_type, LogicalType::Varchar);

        assert!(registry.resolve("abs", &[LogicalType::Date]).is_none());
        assert!(registry.resolve("lower", &[]).is_none());
        assert!(registry.resolve("no_such_fn", &[]).is_none());
    }
}
