//! Constants used throughout the binder and planner

/// Sentinel value for an unresolved catalog identifier
pub const INVALID_OID: u32 = 0;

/// High bit marking identifiers minted for temporary objects (CTE tables and columns)
pub const TEMP_OID_MASK: u32 = 1 << 31;

/// Output name used for select-list entries that have no natural name
pub const PLACEHOLDER_COLUMN_NAME: &str = "?column?";

/// Database every session binds against unless configured otherwise
pub const DEFAULT_DATABASE_NAME: &str = "prism";

/// Namespace searched for unqualified object names
pub const DEFAULT_NAMESPACE_NAME: &str = "public";

/// Row alias exposing the pre-image inside a trigger WHEN clause
pub const TRIGGER_OLD_ALIAS: &str = "old";

/// Row alias exposing the post-image inside a trigger WHEN clause
pub const TRIGGER_NEW_ALIAS: &str = "new";

/// Maximum precision of a DECIMAL value
pub const MAX_DECIMAL_PRECISION: u8 = 28;
