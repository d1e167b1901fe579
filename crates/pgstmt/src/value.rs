//! Dynamically typed scalar values.
//!
//! [`Value`] is what field sets hold and what rows are decoded into. It binds
//! as a `tokio-postgres` parameter and adapts to the parameter type the server
//! infers: an `Int` bound to an `int4` column is narrowed (with a range check),
//! `Text` bound to a `uuid` or `numeric` column is parsed, and `Null` binds to
//! anything.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// A dynamically typed SQL scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert a JSON value, mapping scalars onto their native variants.
    ///
    /// Arrays and objects stay as [`Value::Json`].
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Json(other),
        }
    }

    /// JSON representation. Timestamps use RFC 3339, bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::from(b.clone()),
            Value::Json(j) => j.clone(),
            Value::Uuid(u) => serde_json::Value::String(u.to_string()),
            Value::Date(d) => serde_json::Value::String(d.to_string()),
            Value::Timestamp(ts) => serde_json::Value::String(ts.and_utc().to_rfc3339()),
            Value::TimestampTz(ts) => serde_json::Value::String(ts.to_rfc3339()),
        }
    }

    /// Text form used when the server expects a string-like parameter.
    fn to_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::Bytes(_) => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Json(j) => Some(j.to_string()),
            Value::Uuid(u) => Some(u.to_string()),
            Value::Date(d) => Some(d.to_string()),
            Value::Timestamp(ts) => Some(ts.to_string()),
            Value::TimestampTz(ts) => Some(ts.to_rfc3339()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            other => f.write_str(&other.to_text().unwrap_or_default()),
        }
    }
}

// ==================== Binding ====================

fn accepts_text(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty)
}

fn is_json(ty: &Type) -> bool {
    *ty == Type::JSON || *ty == Type::JSONB
}

fn wrong_type(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {} value to a parameter of type {}", value.kind(), ty).into()
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(v) => int_to_sql(*v, ty, out),
            Value::Float(v) => float_to_sql(*v, ty, out),
            Value::Text(v) => text_to_sql(v, ty, out),
            Value::Bool(v) if *ty == Type::BOOL => v.to_sql(ty, out),
            Value::Bytes(v) if *ty == Type::BYTEA => v.to_sql(ty, out),
            Value::Json(v) if is_json(ty) => v.to_sql(ty, out),
            Value::Uuid(v) if *ty == Type::UUID => v.to_sql(ty, out),
            Value::Date(v) if *ty == Type::DATE => v.to_sql(ty, out),
            Value::Timestamp(v) if *ty == Type::TIMESTAMP => v.to_sql(ty, out),
            Value::Timestamp(v) if *ty == Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
            Value::TimestampTz(v) if *ty == Type::TIMESTAMPTZ => v.to_sql(ty, out),
            Value::TimestampTz(v) if *ty == Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
            other if accepts_text(ty) => match other.to_text() {
                Some(text) => text.as_str().to_sql(ty, out),
                None => Err(wrong_type(other, ty)),
            },
            other if is_json(ty) => other.to_json().to_sql(ty, out),
            other => Err(wrong_type(other, ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        _ if accepts_text(ty) => v.to_string().as_str().to_sql(ty, out),
        _ if is_json(ty) => serde_json::Value::from(v).to_sql(ty, out),
        _ => Err(wrong_type(&Value::Int(v), ty)),
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::NUMERIC => parse_decimal(&v.to_string())?.to_sql(ty, out),
        _ if accepts_text(ty) => v.to_string().as_str().to_sql(ty, out),
        _ if is_json(ty) => serde_json::Value::from(v).to_sql(ty, out),
        _ => Err(wrong_type(&Value::Float(v), ty)),
    }
}

fn text_to_sql(v: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if accepts_text(ty) {
        return v.to_sql(ty, out);
    }
    match *ty {
        Type::UUID => Uuid::parse_str(v)?.to_sql(ty, out),
        Type::DATE => v.parse::<NaiveDate>()?.to_sql(ty, out),
        Type::TIMESTAMP => parse_naive_timestamp(v)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(v)?
            .with_timezone(&Utc)
            .to_sql(ty, out),
        Type::INT2 => v.trim().parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => v.trim().parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => v.trim().parse::<i64>()?.to_sql(ty, out),
        Type::FLOAT4 => v.trim().parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => v.trim().parse::<f64>()?.to_sql(ty, out),
        Type::NUMERIC => parse_decimal(v)?.to_sql(ty, out),
        Type::BOOL => parse_bool(v)?.to_sql(ty, out),
        _ if is_json(ty) => serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out),
        _ if matches!(ty.kind(), Kind::Enum(_)) => {
            // Enum labels travel as their text in the binary protocol.
            out.extend_from_slice(v.as_bytes());
            Ok(IsNull::No)
        }
        _ => Err(wrong_type(&Value::Text(v.to_string()), ty)),
    }
}

fn parse_naive_timestamp(v: &str) -> Result<NaiveDateTime, BoxError> {
    v.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(Into::into)
}

fn parse_bool(v: &str) -> Result<bool, BoxError> {
    match v.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("invalid boolean literal: {other:?}").into()),
    }
}

/// Plain (`-12.340`) or scientific (`1.5e3`) decimal text.
fn parse_decimal(v: &str) -> Result<Decimal, BoxError> {
    let v = v.trim();
    Decimal::from_str(v)
        .or_else(|_| Decimal::from_scientific(v))
        .map_err(|e| format!("invalid numeric literal {v:?}: {e}").into())
}

// ==================== Conversions into Value ====================

macro_rules! impl_from_for_value {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => |v| Value::Bool(v),
    i16 => |v| Value::Int(i64::from(v)),
    i32 => |v| Value::Int(i64::from(v)),
    i64 => |v| Value::Int(v),
    u32 => |v| Value::Int(i64::from(v)),
    f32 => |v| Value::Float(f64::from(v)),
    f64 => |v| Value::Float(v),
    String => |v| Value::Text(v),
    &str => |v| Value::Text(v.to_string()),
    &String => |v| Value::Text(v.clone()),
    Vec<u8> => |v| Value::Bytes(v),
    serde_json::Value => |v| Value::Json(v),
    Uuid => |v| Value::Uuid(v),
    NaiveDate => |v| Value::Date(v),
    NaiveDateTime => |v| Value::Timestamp(v),
    DateTime<Utc> => |v| Value::TimestampTz(v),
    Decimal => |v| Value::Text(v.to_string()),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// ==================== Conversions out of Value ====================

/// Why a [`Value`] could not be converted into a Rust type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: &'static str,
    pub detail: Option<String>,
}

impl ConversionError {
    fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            found: value.kind(),
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl Error for ConversionError {}

/// Conversion from a row [`Value`] into a typed record field.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ConversionError>;

    /// Value to use when the column is absent from the row.
    ///
    /// `None` means the column is required.
    fn missing() -> Option<Self> {
        None
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn missing() -> Option<Self> {
        Some(None)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(ConversionError::new("bool", other)),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i)
                            .map_err(|e| ConversionError::new(stringify!($ty), value).with_detail(e)),
                        other => Err(ConversionError::new(stringify!($ty), other)),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, i64, u32);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::Text(s) => s
                .parse()
                .map_err(|e| ConversionError::new("f64", value).with_detail(e)),
            other => Err(ConversionError::new("f64", other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        f64::from_value(value)
            .map(|f| f as f32)
            .map_err(|e| ConversionError { expected: "f32", ..e })
    }
}

/// Numeric columns are read as text; integers convert exactly.
impl FromValue for Decimal {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => {
                parse_decimal(s).map_err(|e| ConversionError::new("Decimal", value).with_detail(e))
            }
            Value::Int(i) => Ok(Decimal::from(*i)),
            other => Err(ConversionError::new("Decimal", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => Err(ConversionError::new("String", other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(ConversionError::new("Vec<u8>", other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.to_json())
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => {
                Uuid::parse_str(s).map_err(|e| ConversionError::new("Uuid", value).with_detail(e))
            }
            other => Err(ConversionError::new("Uuid", other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Date(d) => Ok(*d),
            other => Err(ConversionError::new("NaiveDate", other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::TimestampTz(ts) => Ok(ts.naive_utc()),
            other => Err(ConversionError::new("NaiveDateTime", other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::TimestampTz(ts) => Ok(*ts),
            Value::Timestamp(ts) => Ok(ts.and_utc()),
            other => Err(ConversionError::new("DateTime<Utc>", other)),
        }
    }
}
