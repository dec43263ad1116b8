//! Prism Frontend - SQL semantic analysis and logical planning
//!
//! Takes one parsed statement, resolves every name against the catalog, types
//! every expression, and lowers the result into a logical operator tree for
//! the cost-based optimizer.
//!
pub mod binder;
pub mod catalog;
pub mod common;
pub mod parser;
pub mod planner;
pub mod types;

// Re-export catalog system for convenience
pub use catalog::{Catalog, CatalogAccessor, CatalogReader, TransactionContext};

// Re-export common types for convenience
pub use common::{BindError, BindResult, ErrorCode, PlannerConfig};

// Re-export type system for convenience
pub use types::{LogicalType, Value};

// Re-export syntax tree entry points
pub use parser::{ExprArena, ExprId, ParseResult, Statement};

// Re-export binder and planner for convenience
pub use binder::{promote_parameters, Binder, BoundStatement};
pub use planner::{
    LogicalPlan, PlanBuilder, PlanOutcome, PlannedStatement, QueryPlanner,
};
