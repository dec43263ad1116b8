use crate::common::constants::MAX_DECIMAL_PRECISION;
use crate::common::error::{BindError, BindResult};
use crate::types::logical_type::LogicalType;
use chrono::{NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// A literal value carried by constant and parameter nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Null value (type is stored on the owning node)
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Double(OrderedFloat<f64>),
    Decimal(Decimal),
    Varchar(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Natural type of this value; NULL has none
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Value::Null => LogicalType::Invalid,
            Value::Boolean(_) => LogicalType::Boolean,
            Value::TinyInt(_) => LogicalType::TinyInt,
            Value::SmallInt(_) => LogicalType::SmallInt,
            Value::Integer(_) => LogicalType::Integer,
            Value::BigInt(_) => LogicalType::BigInt,
            Value::Double(_) => LogicalType::Double,
            Value::Decimal(d) => {
                let scale = d.scale().min(u8::MAX as u32) as u8;
                LogicalType::Decimal {
                    precision: digit_count(d).max(scale).max(1),
                    scale,
                }
            }
            Value::Varchar(_) => LogicalType::Varchar,
            Value::Date(_) => LogicalType::Date,
            Value::Timestamp(_) => LogicalType::Timestamp,
        }
    }

    /// Integer literal sized to the narrowest of INTEGER/BIGINT
    pub fn integer(v: i64) -> Self {
        match i32::try_from(v) {
            Ok(small) => Value::Integer(small),
            Err(_) => Value::BigInt(v),
        }
    }

    pub fn double(v: f64) -> Self {
        Value::Double(OrderedFloat(v))
    }

    pub fn varchar(s: impl Into<String>) -> Self {
        Value::Varchar(s.into())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(*v as i64),
            Value::SmallInt(v) => Some(*v as i64),
            Value::Integer(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert this literal into `target`, parsing strings and widening numbers.
    ///
    /// An `Invalid` target leaves the value untouched. NULL converts to anything.
    pub fn try_promote(&self, target: &LogicalType) -> BindResult<Value> {
        if !target.is_valid() || self.is_null() {
            return Ok(self.clone());
        }
        if self.logical_type() == *target {
            return Ok(self.clone());
        }

        if let Some(n) = self.as_i64() {
            return integral_to(n, target).ok_or_else(|| self.mismatch(target))?;
        }

        match (self, target) {
            (Value::Double(f), LogicalType::Decimal { precision, scale }) => {
                let d = Decimal::try_from(f.0).map_err(|_| out_of_range(self, target))?;
                fit_decimal(d, *precision, *scale).ok_or_else(|| out_of_range(self, target))
            }
            (Value::Decimal(d), LogicalType::Double) => d
                .to_f64()
                .map(Value::double)
                .ok_or_else(|| out_of_range(self, target)),
            (Value::Decimal(d), LogicalType::Decimal { precision, scale }) => {
                fit_decimal(*d, *precision, *scale).ok_or_else(|| out_of_range(self, target))
            }
            (Value::Date(d), LogicalType::Timestamp) => d
                .and_hms_opt(0, 0, 0)
                .map(Value::Timestamp)
                .ok_or_else(|| self.mismatch(target)),
            (Value::Varchar(s), _) => parse_string(s, target),
            _ => Err(self.mismatch(target)),
        }
    }

    fn mismatch(&self, target: &LogicalType) -> BindError {
        BindError::DatatypeMismatch(format!(
            "cannot convert {} value {} to {}",
            self.logical_type(),
            self,
            target
        ))
    }
}

fn out_of_range(value: &Value, target: &LogicalType) -> BindError {
    BindError::NumericValueOutOfRange(format!("value {} is out of range for type {}", value, target))
}

fn digit_count(d: &Decimal) -> u8 {
    let digits = d.mantissa().unsigned_abs().to_string().len();
    digits.min(u8::MAX as usize) as u8
}

fn fit_decimal(d: Decimal, precision: u8, scale: u8) -> Option<Value> {
    let rounded = d.round_dp(scale as u32);
    let integer_digits = precision.saturating_sub(scale);
    if integer_digits < MAX_DECIMAL_PRECISION {
        let limit = Decimal::from_i128_with_scale(10i128.pow(integer_digits as u32), 0);
        if rounded.trunc().abs() >= limit {
            return None;
        }
    }
    Some(Value::Decimal(rounded))
}

fn integral_to(n: i64, target: &LogicalType) -> Option<BindResult<Value>> {
    let out_of_range = || {
        BindError::NumericValueOutOfRange(format!("value {} is out of range for type {}", n, target))
    };
    let converted = match target {
        LogicalType::TinyInt => i8::try_from(n).map(Value::TinyInt).map_err(|_| out_of_range()),
        LogicalType::SmallInt => i16::try_from(n).map(Value::SmallInt).map_err(|_| out_of_range()),
        LogicalType::Integer => i32::try_from(n).map(Value::Integer).map_err(|_| out_of_range()),
        LogicalType::BigInt => Ok(Value::BigInt(n)),
        LogicalType::Double => Ok(Value::double(n as f64)),
        LogicalType::Decimal { precision, scale } => {
            fit_decimal(Decimal::from(n), *precision, *scale).ok_or_else(out_of_range)
        }
        LogicalType::Varchar => Ok(Value::Varchar(n.to_string())),
        _ => return None,
    };
    Some(converted)
}

fn parse_string(s: &str, target: &LogicalType) -> BindResult<Value> {
    let trimmed = s.trim();
    let invalid = || {
        BindError::DatatypeMismatch(format!(
            "invalid input syntax for type {}: \"{}\"",
            target, s
        ))
    };
    match target {
        LogicalType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| invalid()),
        LogicalType::Timestamp => {
            for format in TIMESTAMP_FORMATS {
                if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
                    return Ok(Value::Timestamp(ts));
                }
            }
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(Value::Timestamp)
                .ok_or_else(invalid)
        }
        LogicalType::Decimal { precision, scale } => {
            let d = Decimal::from_str(trimmed).map_err(|_| invalid())?;
            fit_decimal(d, *precision, *scale).ok_or_else(|| {
                BindError::NumericValueOutOfRange(format!(
                    "value {} is out of range for type {}",
                    s, target
                ))
            })
        }
        LogicalType::Double => trimmed
            .parse::<f64>()
            .map(Value::double)
            .map_err(|_| invalid()),
        t if t.is_integral() => {
            let n = trimmed.parse::<i64>().map_err(|_| invalid())?;
            integral_to(n, t).ok_or_else(invalid)?
        }
        LogicalType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "t" | "true" | "yes" | "on" | "1" => Ok(Value::Boolean(true)),
            "f" | "false" | "no" | "off" | "0" => Ok(Value::Boolean(false)),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::TinyInt(v) => write!(f, "{}", v),
            Value::SmallInt(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Varchar(s) => write!(f, "'{}'", s),
            Value::Date(d) => write!(f, "'{}'", d),
            Value::Timestamp(ts) => write!(f, "'{}'", ts),
        }
    }
}
