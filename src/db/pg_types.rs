//! Type adaptation between `Value` and Postgres wire types
//!
//! Parameters are encoded for whatever type the server inferred for the
//! placeholder (the stored function's declared argument type). Columns are
//! decoded by their reported type.

use std::error::Error;
use std::fmt::Write;
use std::str::FromStr;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use tokio_postgres::Row as PgRow;
use uuid::Uuid;

use super::errors::{DbError, DbResult};
use crate::value::Value;

type BoxError = Box<dyn Error + Sync + Send>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Postgres' own output form, space separated
const TIMESTAMP_SPACED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const TIMESTAMPTZ_SPACED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%#z";

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    ) || matches!(ty.kind(), Kind::Enum(_))
}

fn is_json(ty: &Type) -> bool {
    matches!(*ty, Type::JSON | Type::JSONB)
}

fn bind_error(value: &Value, ty: &Type) -> BoxError {
    Box::new(DbError::Bind(format!(
        "{} value for parameter of type {}",
        value.kind(),
        ty
    )))
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        // Every encoding failure surfaces as `DbError::Bind`.
        self.encode_for(ty, out).map_err(|e| match e.downcast::<DbError>() {
            Ok(db) => db as BoxError,
            Err(other) => Box::new(DbError::Bind(format!(
                "{} value for parameter of type {}: {}",
                self.kind(),
                ty,
                other
            ))),
        })
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl Value {
    fn encode_for(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ if is_text(ty) => b.to_string().as_str().to_sql(ty, out),
                _ if is_json(ty) => serde_json::Value::Bool(*b).to_sql(ty, out),
                _ => Err(bind_error(self, ty)),
            },
            Value::Int(i) => int_to_sql(*i, ty, out).unwrap_or_else(|| Err(bind_error(self, ty))),
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*f)?.to_sql(ty, out),
                _ if is_text(ty) => f.to_string().as_str().to_sql(ty, out),
                _ if is_json(ty) => serde_json::Value::from(*f).to_sql(ty, out),
                _ => Err(bind_error(self, ty)),
            },
            Value::Text(s) => text_to_sql(s, ty, out).unwrap_or_else(|| Err(bind_error(self, ty))),
            Value::Array(items) => match *ty {
                _ if is_json(ty) => serde_json::Value::from(self.clone()).to_sql(ty, out),
                Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => {
                    let texts: Vec<Option<String>> = items.iter().map(Value::to_text).collect();
                    texts.to_sql(ty, out)
                }
                Type::INT4_ARRAY => {
                    let ints = items
                        .iter()
                        .map(|v| match v {
                            Value::Null => Ok(None),
                            Value::Int(i) => Ok(Some(i32::try_from(*i)?)),
                            other => Err(bind_error(other, &Type::INT4)),
                        })
                        .collect::<Result<Vec<Option<i32>>, BoxError>>()?;
                    ints.to_sql(ty, out)
                }
                Type::INT8_ARRAY => {
                    let ints = items
                        .iter()
                        .map(|v| match v {
                            Value::Null => Ok(None),
                            Value::Int(i) => Ok(Some(*i)),
                            other => Err(bind_error(other, &Type::INT8)),
                        })
                        .collect::<Result<Vec<Option<i64>>, BoxError>>()?;
                    ints.to_sql(ty, out)
                }
                _ if is_text(ty) => self.to_text().unwrap_or_default().as_str().to_sql(ty, out),
                _ => Err(bind_error(self, ty)),
            },
            Value::Object(_) => match *ty {
                _ if is_json(ty) => serde_json::Value::from(self.clone()).to_sql(ty, out),
                _ if is_text(ty) => self.to_text().unwrap_or_default().as_str().to_sql(ty, out),
                _ => Err(bind_error(self, ty)),
            },
        }
    }
}

fn int_to_sql(i: i64, ty: &Type, out: &mut BytesMut) -> Option<Result<IsNull, BoxError>> {
    let encoded = match *ty {
        Type::INT2 => i16::try_from(i).map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::INT4 => i32::try_from(i).map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::INT8 => i.to_sql(ty, out),
        Type::OID => u32::try_from(i).map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::FLOAT4 => (i as f32).to_sql(ty, out),
        Type::FLOAT8 => (i as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(i).to_sql(ty, out),
        _ if is_text(ty) => i.to_string().as_str().to_sql(ty, out),
        _ if is_json(ty) => serde_json::Value::from(i).to_sql(ty, out),
        _ => return None,
    };
    Some(encoded)
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Option<Result<IsNull, BoxError>> {
    let encoded = match *ty {
        _ if is_text(ty) => s.to_sql(ty, out),
        Type::BOOL => parse_bool(s).and_then(|b| b.to_sql(ty, out)),
        Type::INT2 => s.trim().parse::<i16>().map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::INT4 => s.trim().parse::<i32>().map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::INT8 => s.trim().parse::<i64>().map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::FLOAT4 => s.trim().parse::<f32>().map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::FLOAT8 => s.trim().parse::<f64>().map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::NUMERIC => Decimal::from_str(s.trim()).map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::UUID => Uuid::parse_str(s.trim()).map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::DATE => NaiveDate::from_str(s.trim()).map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::TIME => NaiveTime::from_str(s.trim()).map_err(Into::into).and_then(|v| v.to_sql(ty, out)),
        Type::TIMESTAMP => parse_timestamp(s.trim()).and_then(|v| v.to_sql(ty, out)),
        Type::TIMESTAMPTZ => parse_timestamptz(s.trim()).and_then(|v| v.to_sql(ty, out)),
        // Text for a json parameter is taken as a JSON document when it parses.
        _ if is_json(ty) => serde_json::from_str::<serde_json::Value>(s)
            .unwrap_or_else(|_| serde_json::Value::String(s.to_string()))
            .to_sql(ty, out),
        _ => return None,
    };
    Some(encoded)
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, TIMESTAMP_SPACED_FORMAT))
        .map_err(Into::into)
}

fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, BoxError> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, TIMESTAMPTZ_SPACED_FORMAT))
        .map(|t| t.with_timezone(&Utc))
        .map_err(Into::into)
}

fn parse_bool(s: &str) -> Result<bool, BoxError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        other => Err(Box::new(DbError::Bind(format!("invalid boolean: {}", other)))),
    }
}

/// A column value decoded by its reported type
///
/// Arrays decode element-wise through the same dispatch, so any array of
/// a supported element type is supported. Domains decode as their base type.
struct Decoded(Value);

impl<'a> FromSql<'a> for Decoded {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)? as i64),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)? as i64),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int(u32::from_sql(ty, raw)? as i64),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)? as f64),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::NUMERIC => Value::Text(Decimal::from_sql(ty, raw)?.to_string()),
            Type::JSON | Type::JSONB => Value::from(serde_json::Value::from_sql(ty, raw)?),
            Type::UUID => Value::Text(Uuid::from_sql(ty, raw)?.to_string()),
            Type::DATE => Value::Text(NaiveDate::from_sql(ty, raw)?.to_string()),
            Type::TIME => Value::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMP => Value::Text(
                NaiveDateTime::from_sql(ty, raw)?
                    .format(TIMESTAMP_FORMAT)
                    .to_string(),
            ),
            Type::TIMESTAMPTZ => Value::Text(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339()),
            Type::INTERVAL => Value::Text(interval_text(raw)?),
            Type::BYTEA => Value::Text(bytea_text(raw)),
            _ if is_text(ty) => Value::Text(String::from_sql(&Type::TEXT, raw)?),
            _ => match ty.kind() {
                Kind::Array(_) => Value::Array(
                    Vec::<Option<Decoded>>::from_sql(ty, raw)?
                        .into_iter()
                        .map(|item| item.map_or(Value::Null, |d| d.0))
                        .collect(),
                ),
                Kind::Domain(base) => Decoded::from_sql(base, raw)?.0,
                _ => return Err(format!("unsupported type {}", ty).into()),
            },
        };
        Ok(Decoded(value))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Hex form of a `bytea`, as Postgres prints it
fn bytea_text(raw: &[u8]) -> String {
    let mut text = String::with_capacity(2 + raw.len() * 2);
    text.push_str("\\x");
    for byte in raw {
        let _ = write!(text, "{:02x}", byte);
    }
    text
}

/// Text form of an `interval` in the default `postgres` output style
///
/// Wire layout: microseconds (i64), days (i32), months (i32).
fn interval_text(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 16 {
        return Err(format!("invalid interval length {}", raw.len()).into());
    }
    let micros = i64::from_be_bytes(raw[..8].try_into()?);
    let days = i32::from_be_bytes(raw[8..12].try_into()?);
    let months = i32::from_be_bytes(raw[12..].try_into()?);

    let mut parts = Vec::new();
    for (amount, unit) in [(months / 12, "year"), (months % 12, "mon"), (days, "day")] {
        if amount != 0 {
            let plural = if amount == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", amount, unit, plural));
        }
    }

    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let secs = total / 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        let fraction = total % 1_000_000;
        if fraction != 0 {
            let digits = format!("{:06}", fraction);
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    Ok(parts.join(" "))
}

/// Decode one column into a `Value`; SQL NULL becomes `Value::Null`
pub fn decode_column(row: &PgRow, idx: usize) -> DbResult<Value> {
    row.try_get::<_, Option<Decoded>>(idx)
        .map(|decoded| decoded.map_or(Value::Null, |d| d.0))
        .map_err(|e| {
            let detail = e
                .source()
                .map(ToString::to_string)
                .unwrap_or_else(|| e.to_string());
            DbError::Decode(format!("column {}: {}", row.columns()[idx].name(), detail))
        })
}

/// Decode all columns of a row in select-list order
pub fn decode_row(row: &PgRow) -> DbResult<Vec<Value>> {
    (0..row.len()).map(|idx| decode_column(row, idx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value, ty: &Type) -> Result<(bool, Vec<u8>), BoxError> {
        let mut buf = BytesMut::new();
        let is_null = value.to_sql(ty, &mut buf)?;
        Ok((matches!(is_null, IsNull::Yes), buf.to_vec()))
    }

    #[test]
    fn test_null_is_sql_null() {
        let (is_null, bytes) = encode(&Value::Null, &Type::INT4).unwrap();
        assert!(is_null);
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_int_adapts_to_declared_width() {
        let (_, bytes) = encode(&Value::Int(7), &Type::INT4).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 7]);

        let (_, bytes) = encode(&Value::Int(7), &Type::INT8).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0, 7]);

        let (_, bytes) = encode(&Value::Int(7), &Type::INT2).unwrap();
        assert_eq!(bytes, vec![0, 7]);
    }

    #[test]
    fn test_int_overflow_is_rejected() {
        assert!(encode(&Value::Int(i64::MAX), &Type::INT4).is_err());
    }

    #[test]
    fn test_text_parses_into_numeric_types() {
        let (_, bytes) = encode(&Value::Text("12".into()), &Type::INT4).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 12]);

        assert!(encode(&Value::Text("twelve".into()), &Type::INT4).is_err());
    }

    #[test]
    fn test_text_to_bool() {
        let (_, bytes) = encode(&Value::Text("yes".into()), &Type::BOOL).unwrap();
        assert_eq!(bytes, vec![1]);
    }

    #[test]
    fn test_scalars_render_as_text() {
        let (_, bytes) = encode(&Value::Bool(true), &Type::TEXT).unwrap();
        assert_eq!(bytes, b"true".to_vec());

        let (_, bytes) = encode(&Value::Int(42), &Type::VARCHAR).unwrap();
        assert_eq!(bytes, b"42".to_vec());
    }

    #[test]
    fn test_object_to_jsonb() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("a".to_string(), Value::Int(1));
        let (_, bytes) = encode(&Value::Object(map), &Type::JSONB).unwrap();
        // jsonb binary format: version byte followed by the document text
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..], br#"{"a":1}"#);
    }

    #[test]
    fn test_object_to_int_is_bind_error() {
        let err = encode(&Value::Object(Default::default()), &Type::INT4).unwrap_err();
        assert!(err.to_string().contains("object value for parameter of type int4"));
    }

    #[test]
    fn test_uuid_from_text() {
        let id = Uuid::new_v4();
        let (_, bytes) = encode(&Value::Text(id.to_string()), &Type::UUID).unwrap();
        assert_eq!(bytes, id.as_bytes().to_vec());
    }

    #[test]
    fn test_timestamp_accepts_space_separator() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let mut want = BytesMut::new();
        expected.to_sql(&Type::TIMESTAMP, &mut want).unwrap();

        for text in ["2024-01-01T10:00:00", "2024-01-01 10:00:00"] {
            let (_, bytes) = encode(&Value::Text(text.into()), &Type::TIMESTAMP).unwrap();
            assert_eq!(bytes, want.to_vec(), "{}", text);
        }

        assert!(encode(&Value::Text("2024-01-01 10:00:00+02".into()), &Type::TIMESTAMPTZ).is_ok());
    }

    #[test]
    fn test_unparseable_text_is_bind_error() {
        let err = encode(&Value::Text("noon".into()), &Type::DATE).unwrap_err();
        let db = err.downcast_ref::<DbError>().unwrap();
        assert!(matches!(db, DbError::Bind(m) if m.contains("parameter of type date")));
        assert_eq!(db.status_code(), 400);

        let err = encode(&Value::Text("twelve".into()), &Type::INT4).unwrap_err();
        assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::Bind(_))));
    }

    fn decode(ty: &Type, raw: &[u8]) -> Value {
        Decoded::from_sql(ty, raw).unwrap().0
    }

    #[test]
    fn test_decode_time_and_bytea() {
        let mut buf = BytesMut::new();
        NaiveTime::from_hms_opt(9, 30, 0)
            .unwrap()
            .to_sql(&Type::TIME, &mut buf)
            .unwrap();
        assert_eq!(decode(&Type::TIME, &buf), Value::from("09:30:00"));

        assert_eq!(decode(&Type::BYTEA, &[0x01, 0xab]), Value::from("\\x01ab"));
    }

    fn interval_raw(micros: i64, days: i32, months: i32) -> Vec<u8> {
        let mut raw = micros.to_be_bytes().to_vec();
        raw.extend_from_slice(&days.to_be_bytes());
        raw.extend_from_slice(&months.to_be_bytes());
        raw
    }

    #[test]
    fn test_decode_interval() {
        let raw = interval_raw(3_723_500_000, 1, 14);
        assert_eq!(
            decode(&Type::INTERVAL, &raw),
            Value::from("1 year 2 mons 1 day 01:02:03.5")
        );
        assert_eq!(decode(&Type::INTERVAL, &interval_raw(0, 0, 0)), Value::from("00:00:00"));
        assert_eq!(
            decode(&Type::INTERVAL, &interval_raw(-5_000_000, 3, 0)),
            Value::from("3 days -00:00:05")
        );
        assert!(Decoded::from_sql(&Type::INTERVAL, &[0; 4]).is_err());
    }

    #[test]
    fn test_decode_arrays_by_element_type() {
        let mut buf = BytesMut::new();
        vec![Some(1.5f64), None]
            .to_sql(&Type::FLOAT8_ARRAY, &mut buf)
            .unwrap();
        assert_eq!(
            decode(&Type::FLOAT8_ARRAY, &buf),
            Value::Array(vec![Value::Float(1.5), Value::Null])
        );

        let id = Uuid::new_v4();
        let mut buf = BytesMut::new();
        vec![id].to_sql(&Type::UUID_ARRAY, &mut buf).unwrap();
        assert_eq!(
            decode(&Type::UUID_ARRAY, &buf),
            Value::Array(vec![Value::Text(id.to_string())])
        );

        let mut buf = BytesMut::new();
        vec![true, false].to_sql(&Type::BOOL_ARRAY, &mut buf).unwrap();
        assert_eq!(
            decode(&Type::BOOL_ARRAY, &buf),
            Value::Array(vec![Value::Bool(true), Value::Bool(false)])
        );
    }

    #[test]
    fn test_decode_unsupported_type() {
        let err = Decoded::from_sql(&Type::POINT, &[0; 16]).err().unwrap();
        assert!(err.to_string().contains("unsupported type point"));
    }
}
