//! Dialect-independent column vocabulary.
//!
//! These types describe what a column *is* without committing to any SQL
//! dialect. The extractor produces them and the dialects render them.

use serde::{Deserialize, Serialize};

/// The fixed vocabulary of abstract column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbstractType {
    /// Unbounded text.
    Text,
    /// Variable-length string with optional maximum length.
    Varchar,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Bigint,
    /// 16-bit integer.
    Smallint,
    /// Single precision float.
    Real,
    /// Double precision float.
    DoublePrecision,
    /// Exact numeric with optional precision and scale.
    Numeric,
    /// Boolean.
    Boolean,
    /// Date and time.
    Timestamp,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// JSON document.
    Json,
    /// Binary JSON document.
    Jsonb,
    /// Binary large object.
    Blob,
}

impl AbstractType {
    /// Returns the vocabulary name of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Varchar => "varchar",
            Self::Integer => "integer",
            Self::Bigint => "bigint",
            Self::Smallint => "smallint",
            Self::Real => "real",
            Self::DoublePrecision => "doublePrecision",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Time => "time",
            Self::Json => "json",
            Self::Jsonb => "jsonb",
            Self::Blob => "blob",
        }
    }

    /// Whether a maximum length is meaningful for this type.
    #[must_use]
    pub fn accepts_length(self) -> bool {
        matches!(self, Self::Varchar)
    }

    /// Whether precision and scale are meaningful for this type.
    #[must_use]
    pub fn accepts_precision(self) -> bool {
        matches!(self, Self::Numeric)
    }

    /// Whether the type can carry an enum value list.
    #[must_use]
    pub fn accepts_enum(self) -> bool {
        matches!(self, Self::Text | Self::Varchar)
    }
}

impl std::fmt::Display for AbstractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type options attached to a column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOptions {
    /// Maximum length (varchar).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Total number of digits (numeric).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Digits after the decimal point (numeric).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Allowed values, enforced with a CHECK constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

/// A constant value usable as a column default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    /// NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// Float.
    Float(f64),
    /// String.
    Text(String),
}

/// One piece of a SQL default expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SqlFragment {
    /// Verbatim SQL text.
    Raw(String),
    /// An identifier, quoted by the dialect.
    Identifier(String),
    /// A literal, rendered by the dialect.
    Literal(LiteralValue),
    /// The dialect's "now" expression.
    CurrentTimestamp,
}

/// How a column obtains a value when none is supplied.
///
/// Decided once at extraction time and never re-inspected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefaultValue {
    /// No default.
    #[default]
    None,
    /// A constant stored by the database.
    Literal(LiteralValue),
    /// A SQL expression evaluated by the database.
    SqlExpression(Vec<SqlFragment>),
    /// A value produced by the application at insert time. Never
    /// appears in generated SQL.
    ApplicationGenerated,
}

impl DefaultValue {
    /// Whether the database itself supplies the default.
    #[must_use]
    pub fn is_database_default(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::SqlExpression(_))
    }

    /// Whether the default renders as a bare literal rather than an
    /// expression.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Literal(_) => true,
            Self::SqlExpression(fragments) => {
                matches!(fragments.as_slice(), [SqlFragment::Literal(_)])
            }
            Self::None | Self::ApplicationGenerated => false,
        }
    }
}

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForeignKeyAction {
    /// No action (error if referenced row is deleted/updated).
    NoAction,
    /// Restrict (same as NoAction but checked immediately).
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub fn to_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}
