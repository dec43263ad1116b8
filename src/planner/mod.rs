//! Logical planning
//!
//! This module turns bound statements into logical operator trees:
//!
//! 1. **Plan building**: lowers the bound statement into relational operators
//! 2. **Predicate extraction**: splits conjunctions and records the tables each predicate touches
//! 3. **Decorrelation**: rewrites subquery predicates into mark and single joins
//!
//! [`QueryPlanner`] runs binding and plan building for one statement.

pub mod logical_plan;
pub mod plan_builder;
pub mod planner;
pub mod predicate;

#[cfg(test)]
mod tests;

pub use logical_plan::*;
pub use plan_builder::*;
pub use planner::*;
pub use predicate::{extract_predicates, split_conjuncts, table_aliases};
