//! Records - Typed rows decoded from one CSV line

use crate::config::CoercionPolicy;
use crate::ingestion::schema::ColumnKind;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value that should have been an integer but did not parse as one
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("column '{column}': '{raw}' is not an integer")]
pub struct CoercionError {
    pub column: String,
    pub raw: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    /// Integer column whose raw text failed to parse; persisted as NULL
    Malformed(CoercionError),
}

impl FieldValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, FieldValue::Malformed(_))
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            FieldValue::Text(s) => ToSqlOutput::from(s.as_str()),
            FieldValue::Malformed(_) => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}

/// Parse one raw cell as a base-10 integer
pub fn parse_integer(column: &str, raw: &str) -> std::result::Result<i64, CoercionError> {
    raw.trim().parse::<i64>().map_err(|_| CoercionError {
        column: column.to_string(),
        raw: raw.to_string(),
    })
}

/// Convert a raw cell to the column's storage class.
///
/// Only integer columns can fail, and only under [`CoercionPolicy::Reject`].
pub fn coerce_field(
    column: &str,
    kind: ColumnKind,
    raw: &str,
    policy: CoercionPolicy,
) -> std::result::Result<FieldValue, CoercionError> {
    match kind {
        ColumnKind::Text | ColumnKind::DateTime => Ok(FieldValue::Text(raw.to_string())),
        ColumnKind::Integer => match parse_integer(column, raw) {
            Ok(i) => Ok(FieldValue::Integer(i)),
            Err(err) => match policy {
                CoercionPolicy::Forward => Ok(FieldValue::Malformed(err)),
                CoercionPolicy::Zero => Ok(FieldValue::Integer(0)),
                CoercionPolicy::Reject => Err(err),
            },
        },
    }
}

/// One decoded row, values in the schema's column order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// 1-based line number in the source file (header is line 1)
    pub line: u64,
    pub values: Vec<FieldValue>,
}

impl Record {
    pub fn new(line: u64, values: Vec<FieldValue>) -> Self {
        Self { line, values }
    }

    pub fn malformed_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_malformed()).count()
    }
}
