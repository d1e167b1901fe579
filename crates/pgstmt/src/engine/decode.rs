//! Result column decoding by PostgreSQL type.
//!
//! Numeric columns go through `rust_decimal` and are returned as text with
//! their scale (`1.0000`); NaN and the infinities are returned as text too.
//! One-dimensional arrays of any supported element type become JSON arrays.
//! Types without a decoder here (interval, inet, money, ranges, geometric
//! types, multi-dimensional arrays) are rejected; cast them to text in the
//! query.

use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use tokio_postgres::types::{FromSql, Kind, Type};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decoder {
    Int2,
    Int4,
    Int8,
    Oid,
    Float4,
    Float8,
    Bool,
    Char,
    Numeric,
    Json,
    Bytea,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Text,
    EnumLabel,
    Array,
}

pub(crate) fn decoder_for(ty: &Type) -> Option<Decoder> {
    let decoder = match *ty {
        Type::INT2 => Decoder::Int2,
        Type::INT4 => Decoder::Int4,
        Type::INT8 => Decoder::Int8,
        Type::OID => Decoder::Oid,
        Type::FLOAT4 => Decoder::Float4,
        Type::FLOAT8 => Decoder::Float8,
        Type::BOOL => Decoder::Bool,
        Type::CHAR => Decoder::Char,
        Type::NUMERIC => Decoder::Numeric,
        Type::JSON | Type::JSONB => Decoder::Json,
        Type::BYTEA => Decoder::Bytea,
        Type::UUID => Decoder::Uuid,
        Type::DATE => Decoder::Date,
        Type::TIME => Decoder::Time,
        Type::TIMESTAMP => Decoder::Timestamp,
        Type::TIMESTAMPTZ => Decoder::TimestampTz,
        _ => match ty.kind() {
            Kind::Enum(_) => Decoder::EnumLabel,
            Kind::Array(member) => {
                decoder_for(member)?;
                Decoder::Array
            }
            _ if <String as FromSql>::accepts(ty) => Decoder::Text,
            _ => return None,
        },
    };
    Some(decoder)
}

/// One column value, decoded according to its type.
pub(crate) struct Decoded(pub(crate) Value);

impl<'a> FromSql<'a> for Decoded {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let Some(decoder) = decoder_for(ty) else {
            return Err(format!("unsupported column type {ty}").into());
        };
        let value = match decoder {
            Decoder::Int2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Decoder::Int4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Decoder::Int8 => Value::Int(i64::from_sql(ty, raw)?),
            Decoder::Oid => Value::Int(u32::from_sql(ty, raw)?.into()),
            Decoder::Float4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            Decoder::Float8 => Value::Float(f64::from_sql(ty, raw)?),
            Decoder::Bool => Value::Bool(bool::from_sql(ty, raw)?),
            Decoder::Char => Value::Text(char::from(i8::from_sql(ty, raw)? as u8).to_string()),
            Decoder::Numeric => Value::Text(numeric_text(ty, raw)?),
            Decoder::Json => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            Decoder::Bytea => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
            Decoder::Uuid => Value::Uuid(Uuid::from_sql(ty, raw)?),
            Decoder::Date => Value::Date(NaiveDate::from_sql(ty, raw)?),
            Decoder::Time => Value::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
            Decoder::Timestamp => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Decoder::TimestampTz => Value::TimestampTz(DateTime::<Utc>::from_sql(ty, raw)?),
            Decoder::Text => Value::Text(String::from_sql(ty, raw)?),
            // Enum labels travel as their text in the binary protocol.
            Decoder::EnumLabel => Value::Text(std::str::from_utf8(raw)?.to_string()),
            Decoder::Array => {
                let items = Vec::<Decoded>::from_sql(ty, raw)?;
                Value::Json(items.into_iter().map(|item| item.0.to_json()).collect())
            }
        };
        Ok(Decoded(value))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Decoded(Value::Null))
    }

    fn accepts(ty: &Type) -> bool {
        decoder_for(ty).is_some()
    }
}

fn numeric_text(ty: &Type, raw: &[u8]) -> Result<String, BoxError> {
    let sign = raw.get(4..6).map(|b| u16::from_be_bytes([b[0], b[1]]));
    let text = match sign {
        Some(NUMERIC_NAN) => "NaN".to_string(),
        Some(NUMERIC_PINF) => "Infinity".to_string(),
        Some(NUMERIC_NINF) => "-Infinity".to_string(),
        _ => Decimal::from_sql(ty, raw)?.to_string(),
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use std::str::FromStr;
    use tokio_postgres::types::ToSql;

    fn wire<T: ToSql>(value: T, ty: &Type) -> Vec<u8> {
        let mut out = BytesMut::new();
        value.to_sql(ty, &mut out).unwrap();
        out.to_vec()
    }

    fn decode(ty: &Type, raw: &[u8]) -> Value {
        Decoded::from_sql(ty, raw).unwrap().0
    }

    #[test]
    fn dispatch_by_type() {
        assert_eq!(decoder_for(&Type::INT4), Some(Decoder::Int4));
        assert_eq!(decoder_for(&Type::VARCHAR), Some(Decoder::Text));
        assert_eq!(decoder_for(&Type::NAME), Some(Decoder::Text));
        assert_eq!(decoder_for(&Type::TIME), Some(Decoder::Time));
        assert_eq!(decoder_for(&Type::NUMERIC), Some(Decoder::Numeric));
        assert_eq!(decoder_for(&Type::TEXT_ARRAY), Some(Decoder::Array));
        assert_eq!(decoder_for(&Type::INT4_ARRAY), Some(Decoder::Array));
        assert_eq!(decoder_for(&Type::INTERVAL), None);
        assert_eq!(decoder_for(&Type::INTERVAL_ARRAY), None);
        assert!(!<Decoded as FromSql>::accepts(&Type::INET));
    }

    #[test]
    fn scalars_decode_to_native_variants() {
        assert_eq!(decode(&Type::INT2, &wire(7i16, &Type::INT2)), Value::Int(7));
        assert_eq!(decode(&Type::FLOAT4, &wire(1.5f32, &Type::FLOAT4)), Value::Float(1.5));
        assert_eq!(decode(&Type::TEXT, b"EEE"), Value::from("EEE"));
        assert_eq!(decode(&Type::CHAR, b"a"), Value::from("a"));
        let nine_thirty = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(
            decode(&Type::TIME, &wire(nine_thirty, &Type::TIME)),
            Value::from("09:30:00")
        );
    }

    #[test]
    fn numeric_keeps_scale() {
        let rate = Decimal::from_str("1.0000").unwrap();
        assert_eq!(
            decode(&Type::NUMERIC, &wire(rate, &Type::NUMERIC)),
            Value::from("1.0000")
        );
        let small = Decimal::from_str("-0.05").unwrap();
        assert_eq!(
            decode(&Type::NUMERIC, &wire(small, &Type::NUMERIC)),
            Value::from("-0.05")
        );
    }

    #[test]
    fn numeric_special_values_are_text() {
        let nan = [0, 0, 0, 0, 0xC0, 0, 0, 0];
        assert_eq!(decode(&Type::NUMERIC, &nan), Value::from("NaN"));
        let neg_inf = [0, 0, 0, 0, 0xF0, 0, 0, 0];
        assert_eq!(decode(&Type::NUMERIC, &neg_inf), Value::from("-Infinity"));
    }

    #[test]
    fn arrays_become_json() {
        let raw = wire(vec![Some("a"), None, Some("b")], &Type::TEXT_ARRAY);
        assert_eq!(
            decode(&Type::TEXT_ARRAY, &raw),
            Value::Json(serde_json::json!(["a", null, "b"]))
        );
        let raw = wire(vec![1i32, 2, 3], &Type::INT4_ARRAY);
        assert_eq!(
            decode(&Type::INT4_ARRAY, &raw),
            Value::Json(serde_json::json!([1, 2, 3]))
        );
    }

    #[test]
    fn null_decodes_to_null() {
        let decoded = Decoded::from_sql_nullable(&Type::INT4, None).unwrap();
        assert_eq!(decoded.0, Value::Null);
    }
}
