//! Dynamically typed column values.
//!
//! # Responsibility
//! - Carry one column value between a driver and a model.
//! - Bind values as statement parameters for every supported driver.
//!
//! # Invariants
//! - SQLite has no boolean storage class; booleans bind as `0`/`1` and
//!   decode back from integers.

use super::{MapError, MapResult};
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// One column value.
///
/// Untagged for serde, so a JSON object such as `{"name": "x", "age": 3}`
/// deserializes directly into an update mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Short type name used in mismatch diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Decodes this value into a concrete Rust type.
    pub fn decode<T: FromValue>(self) -> MapResult<T> {
        T::from_value(self)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
            Self::Blob(value) => write!(f, "<{} bytes>", value.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Typed decoding out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> MapResult<Self>;
}

fn mismatch<T>(expected: &'static str, found: &Value) -> MapResult<T> {
    Err(MapError::TypeMismatch {
        expected,
        found: found.kind_name(),
    })
}

impl FromValue for Value {
    fn from_value(value: Value) -> MapResult<Self> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Integer(v) => Ok(v),
            Value::Boolean(v) => Ok(i64::from(v)),
            other => mismatch("integer", &other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> MapResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| MapError::TypeMismatch {
            expected: "32-bit integer",
            found: "out-of-range integer",
        })
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Real(v) => Ok(v),
            // Lossless for the magnitudes SQLite hands back for REAL affinity.
            Value::Integer(v) => Ok(v as f64),
            other => mismatch("real", &other),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => mismatch("boolean", &other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => mismatch("text", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Blob(v) => Ok(v),
            other => mismatch("blob", &other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Text(text) => Uuid::parse_str(&text).map_err(|_| MapError::TypeMismatch {
                expected: "uuid",
                found: "non-uuid text",
            }),
            Value::Blob(bytes) => Uuid::from_slice(&bytes).map_err(|_| MapError::TypeMismatch {
                expected: "uuid",
                found: "blob of wrong length",
            }),
            other => mismatch("uuid", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> MapResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Self::Boolean(value) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*value))),
            Self::Integer(value) => ToSqlOutput::Borrowed(ValueRef::Integer(*value)),
            Self::Real(value) => ToSqlOutput::Borrowed(ValueRef::Real(*value)),
            Self::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            Self::Blob(value) => ToSqlOutput::Borrowed(ValueRef::Blob(value.as_slice())),
        })
    }
}

impl From<SqliteValue> for Value {
    fn from(value: SqliteValue) -> Self {
        match value {
            SqliteValue::Null => Self::Null,
            SqliteValue::Integer(v) => Self::Integer(v),
            SqliteValue::Real(v) => Self::Real(v),
            SqliteValue::Text(v) => Self::Text(v),
            SqliteValue::Blob(v) => Self::Blob(v),
        }
    }
}

#[cfg(feature = "postgres")]
mod pg {
    use super::Value;
    use bytes::BytesMut;
    use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
    use std::error::Error;

    type BoxError = Box<dyn Error + Sync + Send>;

    impl ToSql for Value {
        fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
            match self {
                Self::Null => Ok(IsNull::Yes),
                Self::Boolean(value) => value.to_sql(ty, out),
                Self::Integer(value) => match *ty {
                    Type::INT2 => i16::try_from(*value)?.to_sql(ty, out),
                    Type::INT4 => i32::try_from(*value)?.to_sql(ty, out),
                    Type::BOOL => (*value != 0).to_sql(ty, out),
                    Type::FLOAT8 => (*value as f64).to_sql(ty, out),
                    _ => value.to_sql(ty, out),
                },
                Self::Real(value) => match *ty {
                    Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                    _ => value.to_sql(ty, out),
                },
                Self::Text(value) => value.to_sql(ty, out),
                Self::Blob(value) => value.to_sql(ty, out),
            }
        }

        fn accepts(_ty: &Type) -> bool {
            true
        }

        to_sql_checked!();
    }
}
