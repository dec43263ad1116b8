//! Error handling for the binder and plan builder

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised while binding a statement or lowering it into a logical plan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("{0}")]
    UndefinedTable(String),

    #[error("{0}")]
    UndefinedColumn(String),

    #[error("{0}")]
    UndefinedFunction(String),

    #[error("{0}")]
    UndefinedObject(String),

    #[error("{0}")]
    UndefinedParameter(String),

    #[error("{0}")]
    DuplicateAlias(String),

    #[error("{0}")]
    DuplicateObject(String),

    #[error("{0}")]
    AmbiguousColumn(String),

    #[error("{0}")]
    DatatypeMismatch(String),

    #[error("{0}")]
    NumericValueOutOfRange(String),

    #[error("{0}")]
    SchemaMismatch(String),

    #[error("{0}")]
    InvalidForeignKey(String),

    #[error("{0}")]
    SyntaxError(String),

    #[error("{0}")]
    FeatureNotSupported(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable classification of a [`BindError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    UndefinedTable,
    UndefinedColumn,
    UndefinedFunction,
    UndefinedObject,
    UndefinedParameter,
    DuplicateAlias,
    DuplicateObject,
    AmbiguousColumn,
    DatatypeMismatch,
    NumericValueOutOfRange,
    SchemaMismatch,
    InvalidForeignKey,
    SyntaxError,
    FeatureNotSupported,
    NotImplemented,
    Internal,
}

impl ErrorCode {
    /// SQLSTATE reported to clients
    pub fn sqlstate(&self) -> &'static str {
        match self {
            ErrorCode::UndefinedTable => "42P01",
            ErrorCode::UndefinedColumn => "42703",
            ErrorCode::UndefinedFunction => "42883",
            ErrorCode::UndefinedObject => "42704",
            ErrorCode::UndefinedParameter => "42P02",
            ErrorCode::DuplicateAlias => "42712",
            ErrorCode::DuplicateObject => "42710",
            ErrorCode::AmbiguousColumn => "42702",
            ErrorCode::DatatypeMismatch => "42804",
            ErrorCode::NumericValueOutOfRange => "22003",
            ErrorCode::SchemaMismatch => "42P18",
            ErrorCode::InvalidForeignKey => "42830",
            ErrorCode::SyntaxError => "42601",
            ErrorCode::FeatureNotSupported => "0A000",
            ErrorCode::NotImplemented | ErrorCode::Internal => "XX000",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.sqlstate())
    }
}

impl BindError {
    /// Classification of this error
    pub fn code(&self) -> ErrorCode {
        match self {
            BindError::UndefinedTable(_) => ErrorCode::UndefinedTable,
            BindError::UndefinedColumn(_) => ErrorCode::UndefinedColumn,
            BindError::UndefinedFunction(_) => ErrorCode::UndefinedFunction,
            BindError::UndefinedObject(_) => ErrorCode::UndefinedObject,
            BindError::UndefinedParameter(_) => ErrorCode::UndefinedParameter,
            BindError::DuplicateAlias(_) => ErrorCode::DuplicateAlias,
            BindError::DuplicateObject(_) => ErrorCode::DuplicateObject,
            BindError::AmbiguousColumn(_) => ErrorCode::AmbiguousColumn,
            BindError::DatatypeMismatch(_) => ErrorCode::DatatypeMismatch,
            BindError::NumericValueOutOfRange(_) => ErrorCode::NumericValueOutOfRange,
            BindError::SchemaMismatch(_) => ErrorCode::SchemaMismatch,
            BindError::InvalidForeignKey(_) => ErrorCode::InvalidForeignKey,
            BindError::SyntaxError(_) => ErrorCode::SyntaxError,
            BindError::FeatureNotSupported(_) => ErrorCode::FeatureNotSupported,
            BindError::NotImplemented(_) => ErrorCode::NotImplemented,
            BindError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Human readable message without the classification prefix
    pub fn message(&self) -> &str {
        match self {
            BindError::UndefinedTable(m)
            | BindError::UndefinedColumn(m)
            | BindError::UndefinedFunction(m)
            | BindError::UndefinedObject(m)
            | BindError::UndefinedParameter(m)
            | BindError::DuplicateAlias(m)
            | BindError::DuplicateObject(m)
            | BindError::AmbiguousColumn(m)
            | BindError::DatatypeMismatch(m)
            | BindError::NumericValueOutOfRange(m)
            | BindError::SchemaMismatch(m)
            | BindError::InvalidForeignKey(m)
            | BindError::SyntaxError(m)
            | BindError::FeatureNotSupported(m)
            | BindError::NotImplemented(m)
            | BindError::Internal(m) => m,
        }
    }

    /// True for errors reporting that a referenced object is missing
    pub fn is_undefined_object(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::UndefinedTable | ErrorCode::UndefinedObject
        )
    }
}

/// Result type alias for binder and planner operations
pub type BindResult<T> = std::result::Result<T, BindError>;

/// Macro for creating a typed bind error
#[macro_export]
macro_rules! bind_err {
    ($kind:ident, $msg:expr) => {
        $crate::common::error::BindError::$kind($msg.to_string())
    };
    ($kind:ident, $fmt:expr, $($arg:tt)*) => {
        $crate::common::error::BindError::$kind(format!($fmt, $($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_err {
    ($msg:expr) => {
        $crate::common::error::BindError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::BindError::Internal(format!($fmt, $($arg)*))
    };
}

/// Macro for creating not implemented errors
#[macro_export]
macro_rules! not_implemented_err {
    ($msg:expr) => {
        $crate::common::error::BindError::NotImplemented($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::BindError::NotImplemented(format!($fmt, $($arg)*))
    };
}
