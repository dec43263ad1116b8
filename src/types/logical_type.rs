use crate::common::constants::MAX_DECIMAL_PRECISION;
use crate::common::error::{BindError, BindResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical types represent the SQL-level types that users interact with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// Unknown type: untyped NULL literals, unbound nodes and "no desire"
    Invalid,
    /// Boolean type (TRUE/FALSE)
    Boolean,
    /// 8-bit signed integer
    TinyInt,
    /// 16-bit signed integer
    SmallInt,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInt,
    /// 64-bit double precision
    Double,
    /// Decimal with precision and scale
    Decimal { precision: u8, scale: u8 },
    /// Variable length string
    Varchar,
    /// Calendar date
    Date,
    /// Date and time of day without time zone
    Timestamp,
}

impl LogicalType {
    pub fn is_valid(&self) -> bool {
        !matches!(self, LogicalType::Invalid)
    }

    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LogicalType::TinyInt
                | LogicalType::SmallInt
                | LogicalType::Integer
                | LogicalType::BigInt
                | LogicalType::Double
                | LogicalType::Decimal { .. }
        )
    }

    /// Check if this type is integral (no fractional part)
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            LogicalType::TinyInt | LogicalType::SmallInt | LogicalType::Integer | LogicalType::BigInt
        )
    }

    /// Check if this type is temporal (date/time related)
    pub fn is_temporal(&self) -> bool {
        matches!(self, LogicalType::Date | LogicalType::Timestamp)
    }

    /// Position in the numeric widening order; `None` for non-numeric types
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            LogicalType::TinyInt => Some(0),
            LogicalType::SmallInt => Some(1),
            LogicalType::Integer => Some(2),
            LogicalType::BigInt => Some(3),
            LogicalType::Decimal { .. } => Some(4),
            LogicalType::Double => Some(5),
            _ => None,
        }
    }

    /// Create a decimal type with validation
    pub fn decimal(precision: u8, scale: u8) -> BindResult<LogicalType> {
        if precision == 0 || precision > MAX_DECIMAL_PRECISION {
            return Err(BindError::NumericValueOutOfRange(format!(
                "DECIMAL precision {} must be between 1 and {}",
                precision, MAX_DECIMAL_PRECISION
            )));
        }
        if scale > precision {
            return Err(BindError::NumericValueOutOfRange(format!(
                "DECIMAL scale {} must not exceed precision {}",
                scale, precision
            )));
        }
        Ok(LogicalType::Decimal { precision, scale })
    }

    /// Check if this type can be implicitly cast to another type
    pub fn can_implicitly_cast_to(&self, target: &LogicalType) -> bool {
        use LogicalType::*;

        match (self, target) {
            (a, b) if a == b => true,
            // Untyped NULL fits anywhere
            (Invalid, _) => true,

            // Numeric promotions
            (TinyInt, SmallInt | Integer | BigInt | Double | Decimal { .. }) => true,
            (SmallInt, Integer | BigInt | Double | Decimal { .. }) => true,
            (Integer, BigInt | Double | Decimal { .. }) => true,
            (BigInt, Double | Decimal { .. }) => true,
            (Decimal { .. }, Double | Decimal { .. }) => true,

            // Date/Time to timestamp
            (Date, Timestamp) => true,

            // Any scalar to string
            (_, Varchar) => true,

            _ => false,
        }
    }

    /// Check if an explicit CAST from this type to `target` is possible
    pub fn can_cast_to(&self, target: &LogicalType) -> bool {
        use LogicalType::*;

        if self.can_implicitly_cast_to(target) {
            return true;
        }
        match (self, target) {
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (Boolean, Integer) | (Integer, Boolean) => true,
            (Timestamp, Date) => true,
            (Varchar, _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Invalid => write!(f, "INVALID"),
            LogicalType::Boolean => write!(f, "BOOLEAN"),
            LogicalType::TinyInt => write!(f, "TINYINT"),
            LogicalType::SmallInt => write!(f, "SMALLINT"),
            LogicalType::Integer => write!(f, "INTEGER"),
            LogicalType::BigInt => write!(f, "BIGINT"),
            LogicalType::Double => write!(f, "DOUBLE"),
            LogicalType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({},{})", precision, scale)
            }
            LogicalType::Varchar => write!(f, "VARCHAR"),
            LogicalType::Date => write!(f, "DATE"),
            LogicalType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

/// Type utilities for common operations
pub struct TypeUtils;

impl TypeUtils {
    /// Get the smallest type both sides of a binary operation can be compared or combined in
    pub fn get_max_type(type1: &LogicalType, type2: &LogicalType) -> BindResult<LogicalType> {
        use LogicalType::*;

        if type1 == type2 {
            return Ok(*type1);
        }

        match (type1, type2) {
            (Invalid, other) | (other, Invalid) => Ok(*other),
            (
                Decimal {
                    precision: p1,
                    scale: s1,
                },
                Decimal {
                    precision: p2,
                    scale: s2,
                },
            ) => Ok(Decimal {
                precision: (*p1).max(*p2),
                scale: (*s1).max(*s2),
            }),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (ra, rb) = (a.numeric_rank(), b.numeric_rank());
                Ok(if ra >= rb { *a } else { *b })
            }
            (Date, Timestamp) | (Timestamp, Date) => Ok(Timestamp),
            // String literals are parsed into the temporal side
            (Varchar, t) | (t, Varchar) if t.is_temporal() => Ok(*t),
            _ => Err(BindError::DatatypeMismatch(format!(
                "operator does not exist: {} = {}",
                type1, type2
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_validation() {
        assert!(LogicalType::decimal(10, 2).is_ok());
        assert!(LogicalType::decimal(0, 0).is_err());
        assert!(LogicalType::decimal(5, 6).is_err());
    }

    #[test]
    fn test_implicit_casting() {
        let int_type = LogicalType::Integer;
        let double_type = LogicalType::Double;

        assert!(int_type.can_implicitly_cast_to(&double_type));
        assert!(!double_type.can_implicitly_cast_to(&int_type));
        assert!(int_type.can_implicitly_cast_to(&LogicalType::Varchar));
        assert!(!LogicalType::Varchar.can_implicitly_cast_to(&LogicalType::Date));
        assert!(LogicalType::Varchar.can_cast_to(&LogicalType::Date));
        assert!(!LogicalType::Date.can_cast_to(&LogicalType::Boolean));
    }

    #[test]
    fn test_type_promotion() {
        use LogicalType::*;
        assert_eq!(TypeUtils::get_max_type(&SmallInt, &TinyInt).unwrap(), SmallInt);
        assert_eq!(TypeUtils::get_max_type(&Integer, &BigInt).unwrap(), BigInt);
        assert_eq!(TypeUtils::get_max_type(&BigInt, &Double).unwrap(), Double);
        assert_eq!(TypeUtils::get_max_type(&Varchar, &Date).unwrap(), Date);
        assert_eq!(TypeUtils::get_max_type(&Invalid, &Boolean).unwrap(), Boolean);
        assert_eq!(
            TypeUtils::get_max_type(
                &Decimal {
                    precision: 10,
                    scale: 2
                },
                &Decimal {
                    precision: 8,
                    scale: 4
                }
            )
            .unwrap(),
            Decimal {
                precision: 10,
                scale: 4
            }
        );
        assert!(TypeUtils::get_max_type(&Varchar, &Integer).is_err());
    }
}
