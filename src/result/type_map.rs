//! Mapping from engine type names to in-memory value types.

use crate::error::{Result, TrinoError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default precision of `timestamp` and `time` without an explicit one.
const DEFAULT_TEMPORAL_PRECISION: u8 = 3;

/// Default decimal precision when the engine omits it.
const DEFAULT_DECIMAL_PRECISION: u8 = 38;

/// Resolution of temporal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TimeUnit {
    /// Smallest unit that holds the given fractional-second precision.
    pub fn from_precision(precision: u8) -> Self {
        match precision {
            0 => Self::Second,
            1..=3 => Self::Millisecond,
            4..=6 => Self::Microsecond,
            _ => Self::Nanosecond,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Millisecond => "ms",
            Self::Microsecond => "us",
            Self::Nanosecond => "ns",
        }
    }
}

/// In-memory value type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal { precision: u8, scale: u8 },
    Utf8,
    Binary,
    Date,
    Time(TimeUnit),
    Timestamp { unit: TimeUnit, with_time_zone: bool },
    List(Box<ValueType>),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("bool"),
            Self::Int8 => f.write_str("int8"),
            Self::Int16 => f.write_str("int16"),
            Self::Int32 => f.write_str("int32"),
            Self::Int64 => f.write_str("int64"),
            Self::Float32 => f.write_str("float"),
            Self::Float64 => f.write_str("double"),
            Self::Decimal { precision, scale } => write!(f, "decimal128({precision}, {scale})"),
            Self::Utf8 => f.write_str("string"),
            Self::Binary => f.write_str("binary"),
            Self::Date => f.write_str("date32"),
            Self::Time(unit) => write!(f, "time64[{}]", unit.suffix()),
            Self::Timestamp {
                unit,
                with_time_zone,
            } => {
                if *with_time_zone {
                    write!(f, "timestamp[{}, tz=UTC]", unit.suffix())
                } else {
                    write!(f, "timestamp[{}]", unit.suffix())
                }
            }
            Self::List(inner) => write!(f, "list<{inner}>"),
        }
    }
}

/// Maps an engine type name such as `timestamp(3) with time zone` to its value type.
///
/// Matching ignores case and surrounding whitespace. Names without a mapping
/// fail with [`TrinoError::UnsupportedType`].
pub fn trino_type_to_value_type(type_name: &str) -> Result<ValueType> {
    let normalized = type_name.trim().to_ascii_lowercase();
    let (base, args) = split_type(&normalized)
        .ok_or_else(|| TrinoError::unsupported_type(type_name))?;

    let value_type = match base {
        "boolean" => ValueType::Boolean,
        "tinyint" => ValueType::Int8,
        "smallint" => ValueType::Int16,
        "integer" | "int" => ValueType::Int32,
        "bigint" => ValueType::Int64,
        "real" => ValueType::Float32,
        "double" => ValueType::Float64,
        "decimal" => {
            let mut params = parse_u8_args(args, type_name)?.into_iter();
            ValueType::Decimal {
                precision: params.next().unwrap_or(DEFAULT_DECIMAL_PRECISION),
                scale: params.next().unwrap_or(0),
            }
        }
        "varchar" | "char" | "json" | "uuid" | "ipaddress" => ValueType::Utf8,
        "interval day to second" | "interval year to month" => ValueType::Utf8,
        "varbinary" => ValueType::Binary,
        "date" => ValueType::Date,
        "time" | "time with time zone" => {
            ValueType::Time(TimeUnit::from_precision(single_precision(args, type_name)?))
        }
        "timestamp" | "timestamp with time zone" => ValueType::Timestamp {
            unit: TimeUnit::from_precision(single_precision(args, type_name)?),
            with_time_zone: base.ends_with("with time zone"),
        },
        "array" => {
            let inner = args.ok_or_else(|| TrinoError::unsupported_type(type_name))?;
            ValueType::List(Box::new(trino_type_to_value_type(inner)?))
        }
        _ => return Err(TrinoError::unsupported_type(type_name)),
    };

    Ok(value_type)
}

/// Splits `timestamp(3) with time zone` into (`timestamp with time zone`, `Some("3")`).
fn split_type(normalized: &str) -> Option<(&'static str, Option<&str>)> {
    let (head, args, tail) = match normalized.find('(') {
        Some(open) => {
            let close = normalized.rfind(')')?;
            if close < open {
                return None;
            }
            (
                normalized[..open].trim(),
                Some(normalized[open + 1..close].trim()),
                normalized[close + 1..].trim(),
            )
        }
        None => (normalized, None, ""),
    };

    let base = match (head, tail) {
        ("timestamp", "with time zone") => "timestamp with time zone",
        ("time", "with time zone") => "time with time zone",
        (_, "") => KNOWN_BASES.iter().copied().find(|b| *b == head)?,
        _ => return None,
    };
    Some((base, args))
}

const KNOWN_BASES: &[&str] = &[
    "boolean",
    "tinyint",
    "smallint",
    "integer",
    "int",
    "bigint",
    "real",
    "double",
    "decimal",
    "varchar",
    "char",
    "json",
    "uuid",
    "ipaddress",
    "interval day to second",
    "interval year to month",
    "varbinary",
    "date",
    "time",
    "time with time zone",
    "timestamp",
    "timestamp with time zone",
    "array",
];

fn parse_u8_args(args: Option<&str>, type_name: &str) -> Result<Vec<u8>> {
    args.map(|a| {
        a.split(',')
            .map(|p| {
                p.trim()
                    .parse::<u8>()
                    .map_err(|_| TrinoError::unsupported_type(type_name))
            })
            .collect()
    })
    .unwrap_or_else(|| Ok(Vec::new()))
}

fn single_precision(args: Option<&str>, type_name: &str) -> Result<u8> {
    match parse_u8_args(args, type_name)?.as_slice() {
        [] => Ok(DEFAULT_TEMPORAL_PRECISION),
        [p] => Ok(*p),
        _ => Err(TrinoError::unsupported_type(type_name)),
    }
}
