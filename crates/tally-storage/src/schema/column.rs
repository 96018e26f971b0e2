//! Column declarations: type, nullability, default.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean,
    Timestamp,
}

impl ColumnType {
    /// The type name written into DDL and reported back by `PRAGMA table_info`.
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Default value of a column, or the sentinel of a backfill.
///
/// In TOML a default is written as a plain value (`0`, `18.0`, `"walk-in"`,
/// `true`); the strings `"current_timestamp"` and `"null"` are keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDefault", into = "RawDefault")]
pub enum DefaultValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    CurrentTimestamp,
}

impl DefaultValue {
    /// Render as an SQL literal.
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(v) => v.to_string(),
            Self::Real(v) => format!("{v:?}"),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }

    /// SQLite only accepts constant defaults in `ALTER TABLE ... ADD COLUMN`.
    pub fn is_constant(&self) -> bool {
        !matches!(self, Self::CurrentTimestamp)
    }

    pub(crate) fn is_finite(&self) -> bool {
        match self {
            Self::Real(v) => v.is_finite(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDefault {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<RawDefault> for DefaultValue {
    fn from(raw: RawDefault) -> Self {
        match raw {
            RawDefault::Bool(b) => Self::Bool(b),
            RawDefault::Integer(v) => Self::Integer(v),
            RawDefault::Real(v) => Self::Real(v),
            RawDefault::Text(s) if s.eq_ignore_ascii_case("current_timestamp") => {
                Self::CurrentTimestamp
            }
            RawDefault::Text(s) if s.eq_ignore_ascii_case("null") => Self::Null,
            RawDefault::Text(s) => Self::Text(s),
        }
    }
}

impl From<DefaultValue> for RawDefault {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::Null => Self::Text("null".to_string()),
            DefaultValue::Integer(v) => Self::Integer(v),
            DefaultValue::Real(v) => Self::Real(v),
            DefaultValue::Text(s) => Self::Text(s),
            DefaultValue::Bool(b) => Self::Bool(b),
            DefaultValue::CurrentTimestamp => Self::Text("current_timestamp".to_string()),
        }
    }
}

/// One desired column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            default: None,
            primary_key: false,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Real)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Timestamp)
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Case-insensitive name comparison, matching SQLite identifier rules.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}
