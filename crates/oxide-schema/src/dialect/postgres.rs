//! Postgres dialect.

use crate::types::{AbstractType, ColumnOptions};

use super::Dialect;

/// Postgres-like dialect with native `ALTER COLUMN` support.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new Postgres dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn render_type(&self, column_type: AbstractType, options: &ColumnOptions) -> String {
        match column_type {
            AbstractType::Text => "TEXT".to_string(),
            AbstractType::Varchar => match options.length {
                Some(n) => format!("VARCHAR({n})"),
                None => "VARCHAR".to_string(),
            },
            AbstractType::Integer => "INTEGER".to_string(),
            AbstractType::Bigint => "BIGINT".to_string(),
            AbstractType::Smallint => "SMALLINT".to_string(),
            AbstractType::Real => "REAL".to_string(),
            AbstractType::DoublePrecision => "DOUBLE PRECISION".to_string(),
            AbstractType::Numeric => match (options.precision, options.scale) {
                (Some(p), Some(s)) => format!("NUMERIC({p}, {s})"),
                (Some(p), None) => format!("NUMERIC({p})"),
                _ => "NUMERIC".to_string(),
            },
            AbstractType::Boolean => "BOOLEAN".to_string(),
            AbstractType::Timestamp => "TIMESTAMP".to_string(),
            AbstractType::Date => "DATE".to_string(),
            AbstractType::Time => "TIME".to_string(),
            AbstractType::Json => "JSON".to_string(),
            AbstractType::Jsonb => "JSONB".to_string(),
            AbstractType::Blob => "BYTEA".to_string(),
        }
    }

    fn current_timestamp_default(&self, column_type: AbstractType) -> &'static str {
        match column_type {
            AbstractType::Date => "CURRENT_DATE",
            AbstractType::Time => "CURRENT_TIME",
            _ => "CURRENT_TIMESTAMP",
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn supports_alter_column(&self) -> bool {
        true
    }

    fn supports_add_constraint(&self) -> bool {
        true
    }
}
