//! Catalog object identifiers
//!
//! Every identifier is an opaque `u32`. `INVALID_OID` marks an unresolved id and
//! ids carrying `TEMP_OID_MASK` belong to objects that only live for one statement.

use crate::common::constants::{INVALID_OID, TEMP_OID_MASK};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_oid {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            pub const INVALID: $name = $name(INVALID_OID);

            pub fn is_valid(&self) -> bool {
                self.0 != INVALID_OID
            }

            /// Id for a statement-local object derived from a temporary serial
            pub fn temp(serial: u32) -> Self {
                $name(serial | TEMP_OID_MASK)
            }

            pub fn is_temp(&self) -> bool {
                self.0 & TEMP_OID_MASK != 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_oid!(DatabaseId);
define_oid!(NamespaceId);
define_oid!(TableId);
define_oid!(ColumnId);
define_oid!(IndexId);
define_oid!(ViewId);
define_oid!(TriggerId);
define_oid!(
    /// Identifier of a resolved function overload
    ProcId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_ids() {
        let id = TableId::temp(7);
        assert!(id.is_valid());
        assert!(id.is_temp());
        assert!(!TableId(7).is_temp());
        assert!(!ColumnId::default().is_valid());
    }
}
