//! Closed set of bindable scalar kinds
//!
//! Every type a request value can be bound into maps to exactly one
//! [`ScalarKind`] through [`BindScalar`]. A setter over any other type does
//! not compile, so there is no runtime fallback for unsupported fields.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Kind of scalar a raw request string is converted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Bool,
    String,
    Uuid,
}

/// A converted request value
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    Usize(usize),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Uuid(Uuid),
}

/// Why a raw value could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {kind}: {reason}")]
pub struct ParseScalarError {
    pub kind: ScalarKind,
    pub reason: String,
}

fn parse_as<T>(kind: ScalarKind, raw: &str) -> Result<T, ParseScalarError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ParseScalarError {
        kind,
        reason: e.to_string(),
    })
}

/// Accepts the usual spellings: `1 t T true TRUE True` and their negatives
fn parse_bool(raw: &str) -> Result<bool, ParseScalarError> {
    match raw.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(ParseScalarError {
            kind: ScalarKind::Bool,
            reason: format!("'{}' is not a boolean", other),
        }),
    }
}

impl ScalarKind {
    /// Convert a raw request string into a value of this kind
    ///
    /// ```rust
    /// use labrack::binder::{ScalarKind, ScalarValue};
    ///
    /// assert_eq!(ScalarKind::U16.parse("8080"), Ok(ScalarValue::U16(8080)));
    /// assert!(ScalarKind::I8.parse("300").is_err());
    /// ```
    pub fn parse(self, raw: &str) -> Result<ScalarValue, ParseScalarError> {
        Ok(match self {
            Self::I8 => ScalarValue::I8(parse_as(self, raw)?),
            Self::I16 => ScalarValue::I16(parse_as(self, raw)?),
            Self::I32 => ScalarValue::I32(parse_as(self, raw)?),
            Self::I64 => ScalarValue::I64(parse_as(self, raw)?),
            Self::I128 => ScalarValue::I128(parse_as(self, raw)?),
            Self::Isize => ScalarValue::Isize(parse_as(self, raw)?),
            Self::U8 => ScalarValue::U8(parse_as(self, raw)?),
            Self::U16 => ScalarValue::U16(parse_as(self, raw)?),
            Self::U32 => ScalarValue::U32(parse_as(self, raw)?),
            Self::U64 => ScalarValue::U64(parse_as(self, raw)?),
            Self::U128 => ScalarValue::U128(parse_as(self, raw)?),
            Self::Usize => ScalarValue::Usize(parse_as(self, raw)?),
            Self::F32 => ScalarValue::F32(parse_as(self, raw)?),
            Self::F64 => ScalarValue::F64(parse_as(self, raw)?),
            Self::Bool => ScalarValue::Bool(parse_bool(raw)?),
            Self::String => ScalarValue::String(raw.to_string()),
            Self::Uuid => ScalarValue::Uuid(parse_as(self, raw)?),
        })
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Uuid => "uuid",
        };
        f.write_str(name)
    }
}

/// A Rust type that request values can be bound into
pub trait BindScalar: Sized + Send + 'static {
    const KIND: ScalarKind;

    /// Extract `Self` from a value of [`Self::KIND`]
    fn from_value(value: ScalarValue) -> Option<Self>;
}

macro_rules! bind_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl BindScalar for $ty {
                const KIND: ScalarKind = ScalarKind::$variant;

                fn from_value(value: ScalarValue) -> Option<Self> {
                    match value {
                        ScalarValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

bind_scalar! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => String,
    Uuid => Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round<T: BindScalar>(raw: &str) -> Option<T> {
        T::KIND.parse(raw).ok().and_then(T::from_value)
    }

    #[test]
    fn test_every_integer_width_respects_its_range() {
        assert_eq!(round::<i8>("-128"), Some(-128));
        assert_eq!(round::<i8>("128"), None);
        assert_eq!(round::<i16>("-32768"), Some(i16::MIN));
        assert_eq!(round::<i32>("2147483647"), Some(i32::MAX));
        assert_eq!(round::<i64>("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(round::<i128>("170141183460469231731687303715884105727"), Some(i128::MAX));
        assert_eq!(round::<isize>("-1"), Some(-1));
        assert_eq!(round::<u8>("255"), Some(255));
        assert_eq!(round::<u8>("-1"), None);
        assert_eq!(round::<u16>("65535"), Some(u16::MAX));
        assert_eq!(round::<u32>("4294967296"), None);
        assert_eq!(round::<u64>("18446744073709551615"), Some(u64::MAX));
        assert_eq!(round::<u128>("0"), Some(0));
        assert_eq!(round::<usize>("42"), Some(42));
    }

    #[test]
    fn test_floats_bools_strings_and_uuids() {
        assert_eq!(round::<f32>("1.5"), Some(1.5));
        assert_eq!(round::<f64>("-0.25"), Some(-0.25));
        assert_eq!(round::<f64>("abc"), None);
        assert_eq!(round::<bool>("TRUE"), Some(true));
        assert_eq!(round::<bool>("0"), Some(false));
        assert_eq!(round::<bool>("yes"), None);
        assert_eq!(round::<String>(" keep spaces "), Some(" keep spaces ".to_string()));
        let id = Uuid::new_v4();
        assert_eq!(round::<Uuid>(&id.to_string()), Some(id));
        assert_eq!(round::<Uuid>("not-a-uuid"), None);
    }

    #[test]
    fn test_numbers_tolerate_surrounding_whitespace() {
        assert_eq!(round::<i32>(" 7 "), Some(7));
    }

    #[test]
    fn test_value_of_another_kind_is_rejected() {
        assert_eq!(u8::from_value(ScalarValue::I8(1)), None);
    }

    #[test]
    fn test_parse_error_names_the_kind() {
        let error = ScalarKind::I32.parse("abc").unwrap_err();
        assert_eq!(error.kind, ScalarKind::I32);
        assert!(error.to_string().starts_with("expected i32"));
    }
}
