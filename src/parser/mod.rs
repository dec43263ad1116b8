//! Syntax tree consumed by the binder
//!
//! Statements are produced by an external SQL parser or built programmatically
//! through the arena helpers; this module owns only the data model.

pub mod ast;
pub mod expression;

pub use ast::*;
pub use expression::*;
