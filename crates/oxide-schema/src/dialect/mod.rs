//! SQL dialect implementations.
//!
//! A dialect renders abstract column types and defaults into its own SQL
//! vocabulary and knows the shape of every DDL statement the generator
//! emits. Two families are supported: [`PostgresDialect`], which can
//! alter columns in place, and [`SqliteDialect`], which cannot.

mod postgres;
mod sqlite;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::metadata::IndexMetadata;
use crate::types::{AbstractType, ColumnOptions, DefaultValue, LiteralValue, SqlFragment};

/// The supported dialect families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    /// Postgres-like: native `ALTER COLUMN`.
    Postgres,
    /// SQLite-like: restricted `ALTER TABLE`, table recreation.
    Sqlite,
}

impl DialectKind {
    /// Returns the dialect implementation for this family.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &PostgresDialect,
            Self::Sqlite => &SqliteDialect,
        }
    }

    /// Returns the dialect name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for DialectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

/// Trait for dialect-specific type mapping and DDL rendering.
///
/// Statement methods return SQL without the trailing `;`; the generator
/// terminates every statement itself.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Renders an abstract type with its options into a SQL type string.
    ///
    /// Enum values are never part of the type; they are enforced with a
    /// separate CHECK constraint.
    fn render_type(&self, column_type: AbstractType, options: &ColumnOptions) -> String;

    /// The dialect's "now" expression for a column of the given type.
    fn current_timestamp_default(&self, column_type: AbstractType) -> &'static str;

    /// Renders a boolean literal.
    fn bool_literal(&self, value: bool) -> &'static str;

    /// Returns whether this dialect supports `ALTER COLUMN`.
    fn supports_alter_column(&self) -> bool;

    /// Returns whether constraints can be added to an existing table.
    fn supports_add_constraint(&self) -> bool;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Renders a literal value.
    fn render_literal(&self, value: &LiteralValue) -> String {
        match value {
            LiteralValue::Null => "NULL".to_string(),
            LiteralValue::Bool(b) => self.bool_literal(*b).to_string(),
            LiteralValue::Integer(i) => i.to_string(),
            LiteralValue::Float(f) => f.to_string(),
            LiteralValue::Text(s) => quote_string(s),
        }
    }

    /// Whether the default is supplied by the database.
    ///
    /// Application-generated defaults are the caller's responsibility and
    /// never appear in SQL.
    fn is_database_default(&self, default: &DefaultValue) -> bool {
        default.is_database_default()
    }

    /// Renders the SQL text of a database default, if there is one.
    fn extract_default_value(
        &self,
        default: &DefaultValue,
        column_type: AbstractType,
    ) -> Option<String> {
        match default {
            DefaultValue::Literal(value) => Some(self.render_literal(value)),
            DefaultValue::SqlExpression(fragments) => {
                let sql: String = fragments
                    .iter()
                    .map(|fragment| match fragment {
                        SqlFragment::Raw(sql) => sql.clone(),
                        SqlFragment::Identifier(name) => self.quote_identifier(name),
                        SqlFragment::Literal(value) => self.render_literal(value),
                        SqlFragment::CurrentTimestamp => {
                            self.current_timestamp_default(column_type).to_string()
                        }
                    })
                    .collect();
                // Column DEFAULT only takes a bare literal, a keyword or `(expr)`.
                match fragments.as_slice() {
                    [SqlFragment::Literal(_) | SqlFragment::CurrentTimestamp] => Some(sql),
                    _ => Some(format!("({sql})")),
                }
            }
            DefaultValue::None | DefaultValue::ApplicationGenerated => None,
        }
    }

    /// Generates SQL for dropping a table.
    fn drop_table_sql(&self, name: &str, if_exists: bool) -> String {
        let mut sql = String::from("DROP TABLE ");
        if if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.quote_identifier(name));
        sql
    }

    /// Generates SQL for renaming a table.
    fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }

    /// Generates SQL for adding a column from its rendered definition.
    fn add_column_sql(&self, table: &str, column_definition: &str) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            column_definition
        )
    }

    /// Generates SQL for dropping a column.
    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// Generates SQL for changing a column's type.
    fn alter_column_type_sql(&self, table: &str, column: &str, sql_type: &str) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            sql_type
        )
    }

    /// Generates SQL for setting or dropping NOT NULL.
    fn alter_column_nullable_sql(&self, table: &str, column: &str, nullable: bool) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
            self.quote_identifier(table),
            self.quote_identifier(column),
            if nullable { "DROP" } else { "SET" }
        )
    }

    /// Generates SQL for setting or dropping a column default.
    fn alter_column_default_sql(&self, table: &str, column: &str, default: Option<&str>) -> String {
        let action = match default {
            Some(value) => format!("SET DEFAULT {value}"),
            None => "DROP DEFAULT".to_string(),
        };
        format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            action
        )
    }

    /// Generates SQL for adding a named constraint from its rendered body.
    fn add_constraint_sql(&self, table: &str, name: &str, body: &str) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {}",
            self.quote_identifier(table),
            self.quote_identifier(name),
            body
        )
    }

    /// Generates SQL for dropping a named constraint.
    fn drop_constraint_sql(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )
    }

    /// Generates SQL for creating an index.
    fn create_index_sql(&self, table: &str, index: &IndexMetadata) -> String {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            columns.join(", ")
        )
    }

    /// Generates SQL for dropping an index.
    fn drop_index_sql(&self, name: &str) -> String {
        format!("DROP INDEX IF EXISTS {}", self.quote_identifier(name))
    }
}

/// Quotes a string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_kind_parse() {
        assert_eq!("postgres".parse::<DialectKind>(), Ok(DialectKind::Postgres));
        assert_eq!("SQLite".parse::<DialectKind>(), Ok(DialectKind::Sqlite));
        assert!("mysql".parse::<DialectKind>().is_err());
        assert_eq!(DialectKind::Sqlite.dialect().name(), "sqlite");
    }

    #[test]
    fn test_quote_string_escapes() {
        assert_eq!(quote_string("it's"), "'it''s'");
    }

    #[test]
    fn test_sql_expression_default() {
        let dialect = PostgresDialect;
        let default = DefaultValue::SqlExpression(vec![
            SqlFragment::Raw("lower(".to_string()),
            SqlFragment::Literal(LiteralValue::Text("A".to_string())),
            SqlFragment::Raw(")".to_string()),
        ]);
        assert_eq!(
            dialect.extract_default_value(&default, AbstractType::Text),
            Some("(lower('A'))".to_string())
        );
        assert_eq!(
            dialect.extract_default_value(&DefaultValue::ApplicationGenerated, AbstractType::Text),
            None
        );
    }

    #[test]
    fn test_statement_vocabulary() {
        let dialect = PostgresDialect;
        assert_eq!(
            dialect.drop_table_sql("users", true),
            "DROP TABLE IF EXISTS \"users\""
        );
        assert_eq!(dialect.drop_table_sql("users", false), "DROP TABLE \"users\"");
        assert_eq!(
            dialect.alter_column_nullable_sql("users", "name", false),
            "ALTER TABLE \"users\" ALTER COLUMN \"name\" SET NOT NULL"
        );
        assert_eq!(
            dialect.alter_column_default_sql("users", "name", None),
            "ALTER TABLE \"users\" ALTER COLUMN \"name\" DROP DEFAULT"
        );
        let index = IndexMetadata {
            name: "users_name_idx".to_string(),
            columns: vec!["name".to_string()],
            unique: true,
        };
        assert_eq!(
            dialect.create_index_sql("users", &index),
            "CREATE UNIQUE INDEX \"users_name_idx\" ON \"users\" (\"name\")"
        );
    }
}
