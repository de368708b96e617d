//! SQLite dialect.
//!
//! SQLite has limited ALTER TABLE support: columns cannot be altered and
//! constraints cannot be added to an existing table. The generator falls
//! back to the "table recreation" strategy for those changes: create a new
//! table, copy data, drop the old table, rename the new table.

use crate::types::{AbstractType, ColumnOptions};

use super::Dialect;

/// SQLite-like dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn render_type(&self, column_type: AbstractType, options: &ColumnOptions) -> String {
        match column_type {
            AbstractType::Varchar => match options.length {
                Some(n) => format!("VARCHAR({n})"),
                None => "TEXT".to_string(),
            },
            AbstractType::Integer | AbstractType::Bigint | AbstractType::Smallint => {
                "INTEGER".to_string()
            }
            // Booleans are 0/1, timestamps are epoch seconds.
            AbstractType::Boolean | AbstractType::Timestamp => "INTEGER".to_string(),
            AbstractType::Real | AbstractType::DoublePrecision => "REAL".to_string(),
            AbstractType::Numeric => "NUMERIC".to_string(),
            AbstractType::Text
            | AbstractType::Date
            | AbstractType::Time
            | AbstractType::Json
            | AbstractType::Jsonb => "TEXT".to_string(),
            AbstractType::Blob => "BLOB".to_string(),
        }
    }

    fn current_timestamp_default(&self, column_type: AbstractType) -> &'static str {
        match column_type {
            AbstractType::Date => "CURRENT_DATE",
            AbstractType::Time => "CURRENT_TIME",
            _ => "(strftime('%s', 'now'))",
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn supports_alter_column(&self) -> bool {
        false
    }

    fn supports_add_constraint(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DefaultValue, LiteralValue, SqlFragment};

    fn dialect() -> SqliteDialect {
        SqliteDialect::new()
    }

    #[test]
    fn test_type_names() {
        let d = dialect();
        let none = ColumnOptions::default();
        assert_eq!(d.render_type(AbstractType::Bigint, &none), "INTEGER");
        assert_eq!(d.render_type(AbstractType::Boolean, &none), "INTEGER");
        assert_eq!(d.render_type(AbstractType::Timestamp, &none), "INTEGER");
        assert_eq!(d.render_type(AbstractType::Json, &none), "TEXT");
        assert_eq!(d.render_type(AbstractType::Jsonb, &none), "TEXT");
        assert_eq!(d.render_type(AbstractType::Blob, &none), "BLOB");
        assert_eq!(d.render_type(AbstractType::DoublePrecision, &none), "REAL");

        let sized = ColumnOptions {
            length: Some(64),
            ..ColumnOptions::default()
        };
        assert_eq!(d.render_type(AbstractType::Varchar, &sized), "VARCHAR(64)");
    }

    #[test]
    fn test_defaults() {
        let d = dialect();
        let now = DefaultValue::SqlExpression(vec![SqlFragment::CurrentTimestamp]);
        assert_eq!(
            d.extract_default_value(&now, AbstractType::Timestamp).as_deref(),
            Some("(strftime('%s', 'now'))")
        );
        assert_eq!(
            d.extract_default_value(&DefaultValue::Literal(LiteralValue::Bool(false)), AbstractType::Boolean)
                .as_deref(),
            Some("0")
        );
        assert!(!d.supports_alter_column());
    }
}
