//! Type system module
//!
//! - LogicalType: SQL-level types and their cast/common-type rules
//! - Value: literal values carried by constants and parameters, with promotion

pub mod logical_type;
pub mod value;

pub use logical_type::{LogicalType, TypeUtils};
pub use value::Value;
