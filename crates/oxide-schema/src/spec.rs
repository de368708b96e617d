//! Table definitions as handed over by the schema-building layer.
//!
//! A [`ColumnSpec`] is a plain value: its type tag plus the modifiers the
//! user declared, set directly rather than replayed from a builder log.
//! Foreign keys name their target by `(table, column)` identity; the
//! extractor resolves that identity against the whole schema.

use serde::{Deserialize, Serialize};

use crate::types::{AbstractType, ColumnOptions, ForeignKeyAction, LiteralValue, SqlFragment};

/// Stable identity of a column within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

impl ColumnRef {
    /// Creates a column identity.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Default modifier as declared on a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefaultSpec {
    /// A concrete value.
    Value(LiteralValue),
    /// The "current time" marker.
    Now,
    /// A SQL expression.
    Sql(Vec<SqlFragment>),
    /// A function run by the application on insert, described by name.
    Generated(String),
}

/// Foreign key modifier as declared on a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSpec {
    /// The referenced column.
    pub target: ColumnRef,
    /// ON UPDATE action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ForeignKeyAction>,
    /// ON DELETE action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ForeignKeyAction>,
}

/// A column as declared by the schema author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Abstract type tag.
    #[serde(rename = "type")]
    pub column_type: AbstractType,
    /// Length / precision / scale / enum options.
    #[serde(default)]
    pub options: ColumnOptions,
    /// Primary key modifier.
    #[serde(default)]
    pub primary_key: bool,
    /// Not-null modifier.
    #[serde(default)]
    pub not_null: bool,
    /// Unique modifier.
    #[serde(default)]
    pub unique: bool,
    /// Default modifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultSpec>,
    /// Foreign key modifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ReferenceSpec>,
}

impl ColumnSpec {
    /// Creates a nullable column with no modifiers.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: AbstractType) -> Self {
        Self {
            name: name.into(),
            column_type,
            options: ColumnOptions::default(),
            primary_key: false,
            not_null: false,
            unique: false,
            default: None,
            references: None,
        }
    }

    /// Shorthand for a `varchar(length)` column.
    #[must_use]
    pub fn varchar(name: impl Into<String>, length: u32) -> Self {
        Self::new(name, AbstractType::Varchar).length(length)
    }

    /// Shorthand for a `numeric(precision, scale)` column.
    #[must_use]
    pub fn numeric(name: impl Into<String>, precision: u32, scale: u32) -> Self {
        let mut spec = Self::new(name, AbstractType::Numeric);
        spec.options.precision = Some(precision);
        spec.options.scale = Some(scale);
        spec
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.options.length = Some(length);
        self
    }

    /// Restricts the column to a fixed set of values.
    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Marks the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column as UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default modifier.
    #[must_use]
    pub fn default(mut self, default: DefaultSpec) -> Self {
        self.default = Some(default);
        self
    }

    /// Adds a foreign key to `table.column`.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ReferenceSpec {
            target: ColumnRef::new(table, column),
            on_update: None,
            on_delete: None,
        });
        self
    }

    /// Sets the ON DELETE action of the foreign key, if any.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        if let Some(reference) = self.references.as_mut() {
            reference.on_delete = Some(action);
        }
        self
    }

    /// Sets the ON UPDATE action of the foreign key, if any.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        if let Some(reference) = self.references.as_mut() {
            reference.on_update = Some(action);
        }
        self
    }
}

/// Table-level constraint declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TableConstraintSpec {
    /// Composite primary key.
    PrimaryKey {
        /// Column names.
        columns: Vec<String>,
    },
    /// Unique constraint over one or more columns.
    Unique {
        /// Optional constraint name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Column names.
        columns: Vec<String>,
    },
    /// Secondary index.
    Index {
        /// Index name.
        name: String,
        /// Column names.
        columns: Vec<String>,
        /// Whether the index is UNIQUE.
        #[serde(default)]
        unique: bool,
    },
}

/// A table as declared by the schema author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSpec>,
    /// Table-level constraints.
    #[serde(default)]
    pub constraints: Vec<TableConstraintSpec>,
}

impl TableSpec {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Declares a composite primary key.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.push(TableConstraintSpec::PrimaryKey {
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declares a unique constraint.
    #[must_use]
    pub fn unique<I, S>(mut self, name: Option<&str>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.push(TableConstraintSpec::Unique {
            name: name.map(str::to_string),
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declares an index.
    #[must_use]
    pub fn index<I, S>(mut self, name: impl Into<String>, columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.push(TableConstraintSpec::Index {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_spec_builder() {
        let col = ColumnSpec::varchar("email", 255)
            .not_null()
            .unique()
            .references("accounts", "email")
            .on_delete(ForeignKeyAction::Cascade);

        assert_eq!(col.options.length, Some(255));
        assert!(col.not_null);
        assert!(col.unique);
        let reference = col.references.unwrap();
        assert_eq!(reference.target, ColumnRef::new("accounts", "email"));
        assert_eq!(reference.on_delete, Some(ForeignKeyAction::Cascade));
        assert_eq!(reference.on_update, None);
    }

    #[test]
    fn test_table_spec_from_json() {
        let json = r#"{
            "name": "posts",
            "columns": [
                {"name": "id", "type": "bigint", "primaryKey": true},
                {"name": "status", "type": "text", "options": {"enumValues": ["draft", "live"]},
                 "default": {"value": "draft"}},
                {"name": "author_id", "type": "bigint", "notNull": true,
                 "references": {"target": {"table": "users", "column": "id"}, "onDelete": "cascade"}}
            ],
            "constraints": [
                {"kind": "index", "name": "posts_author_idx", "columns": ["author_id"]}
            ]
        }"#;

        let table: TableSpec = serde_json::from_str(json).unwrap();
        assert_eq!(table.name, "posts");
        assert_eq!(table.columns.len(), 3);
        assert!(table.columns[0].primary_key);
        assert_eq!(
            table.columns[1].default,
            Some(DefaultSpec::Value(LiteralValue::Text("draft".to_string())))
        );
        assert_eq!(
            table.columns[2].references.as_ref().unwrap().on_delete,
            Some(ForeignKeyAction::Cascade)
        );
        assert!(matches!(
            table.constraints[0],
            TableConstraintSpec::Index { unique: false, .. }
        ));
    }
}
