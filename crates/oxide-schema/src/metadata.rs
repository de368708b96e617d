//! Dialect-specific schema metadata.
//!
//! [`map_table`] is the type mapper's driver: it runs every abstract column
//! through a [`Dialect`] and keeps the abstract options alongside the
//! rendered type so later diffs can compare them directly.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::extract::{AbstractColumn, AbstractTable};
use crate::types::{DefaultValue, ForeignKeyAction};

/// A column rendered for one dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    /// Column name.
    pub name: String,
    /// Rendered SQL type.
    #[serde(rename = "type")]
    pub sql_type: String,
    /// Maximum length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Numeric precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Numeric scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Allowed values, enforced by a CHECK constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether the database supplies a default.
    pub has_default: bool,
    /// Rendered default SQL, present only when `has_default`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Whether the default is a plain literal, not an expression.
    #[serde(default)]
    pub constant_default: bool,
    /// Whether the application supplies the value on insert.
    #[serde(default)]
    pub application_default: bool,
}

impl ColumnMetadata {
    /// Creates a nullable column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            length: None,
            precision: None,
            scale: None,
            enum_values: None,
            nullable: true,
            has_default: false,
            default_value: None,
            constant_default: false,
            application_default: false,
        }
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets a literal database default.
    #[must_use]
    pub fn default_value(mut self, sql: impl Into<String>) -> Self {
        self.has_default = true;
        self.default_value = Some(sql.into());
        self.constant_default = true;
        self.application_default = false;
        self
    }

    /// Sets a database default computed by an SQL expression.
    #[must_use]
    pub fn default_expression(mut self, sql: impl Into<String>) -> Self {
        self = self.default_value(sql);
        self.constant_default = false;
        self
    }

    /// Marks the default as application-generated.
    #[must_use]
    pub fn application_default(mut self) -> Self {
        self.has_default = false;
        self.default_value = None;
        self.constant_default = false;
        self.application_default = true;
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the enum value list.
    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyMetadata {
    /// Constraint name; derived as `<table>_<cols>_fkey` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub ref_table: String,
    /// Referenced columns, positionally matching `columns`.
    pub ref_columns: Vec<String>,
    /// ON UPDATE action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ForeignKeyAction>,
    /// ON DELETE action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ForeignKeyAction>,
}

impl ForeignKeyMetadata {
    /// Column pairs sorted by referencing column, ignoring the name.
    pub(crate) fn canonical(
        &self,
    ) -> (
        Vec<(&str, &str)>,
        &str,
        Option<ForeignKeyAction>,
        Option<ForeignKeyAction>,
    ) {
        let mut pairs: Vec<(&str, &str)> = self
            .columns
            .iter()
            .map(String::as_str)
            .zip(self.ref_columns.iter().map(String::as_str))
            .collect();
        pairs.sort_unstable();
        (pairs, &self.ref_table, self.on_update, self.on_delete)
    }
}

/// A unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraintMetadata {
    /// Constraint name; derived as `<table>_<cols>_key` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Column names.
    pub columns: Vec<String>,
}

impl UniqueConstraintMetadata {
    /// The column set, sorted.
    pub(crate) fn canonical(&self) -> Vec<&str> {
        sorted_columns(&self.columns)
    }
}

/// A secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Index name.
    pub name: String,
    /// Column names.
    pub columns: Vec<String>,
    /// Whether the index is UNIQUE.
    #[serde(default)]
    pub unique: bool,
}

impl IndexMetadata {
    pub(crate) fn canonical(&self) -> (&str, Vec<&str>, bool) {
        (&self.name, sorted_columns(&self.columns), self.unique)
    }
}

fn sorted_columns(columns: &[String]) -> Vec<&str> {
    let mut sorted: Vec<&str> = columns.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted
}

/// A table rendered for one dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: IndexMap<String, ColumnMetadata>,
    /// Primary key column names, sorted.
    #[serde(default)]
    pub primary_keys: Vec<String>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyMetadata>,
    /// Unique constraints.
    #[serde(default)]
    pub unique_constraints: Vec<UniqueConstraintMetadata>,
    /// Secondary indexes.
    #[serde(default)]
    pub indexes: Vec<IndexMetadata>,
}

impl TableMetadata {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnMetadata) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    /// Sets the primary key; the columns become NOT NULL.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = columns.into_iter().map(Into::into).collect();
        keys.sort();
        for key in &keys {
            if let Some(column) = self.columns.get_mut(key) {
                column.nullable = false;
            }
        }
        self.primary_keys = keys;
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeyMetadata) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique<I, S>(mut self, name: Option<&str>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_constraints.push(UniqueConstraintMetadata {
            name: name.map(str::to_string),
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index<I, S>(mut self, name: impl Into<String>, columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes.push(IndexMetadata {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique,
        });
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.get(name)
    }

    /// Names of the tables this table references, excluding itself.
    pub fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.ref_table.as_str())
            .filter(move |t| *t != self.name)
    }
}

/// Maps one abstract column through a dialect.
#[must_use]
pub fn map_column(column: &AbstractColumn, dialect: &dyn Dialect) -> ColumnMetadata {
    let has_default = dialect.is_database_default(&column.default);
    let default_value = if has_default {
        dialect.extract_default_value(&column.default, column.column_type)
    } else {
        None
    };
    ColumnMetadata {
        name: column.name.clone(),
        sql_type: dialect.render_type(column.column_type, &column.options),
        length: column.options.length,
        precision: column.options.precision,
        scale: column.options.scale,
        enum_values: column.options.enum_values.clone(),
        nullable: column.nullable,
        has_default,
        default_value,
        constant_default: has_default && column.default.is_constant(),
        application_default: matches!(column.default, DefaultValue::ApplicationGenerated),
    }
}

/// Maps an abstract table through a dialect.
#[must_use]
pub fn map_table(table: &AbstractTable, dialect: &dyn Dialect) -> TableMetadata {
    let columns = table
        .columns
        .iter()
        .map(|c| (c.name.clone(), map_column(c, dialect)))
        .collect();

    let foreign_keys = table
        .columns
        .iter()
        .filter_map(|c| {
            c.references.as_ref().map(|r| ForeignKeyMetadata {
                name: None,
                columns: vec![c.name.clone()],
                ref_table: r.table.clone(),
                ref_columns: vec![r.column.clone()],
                on_update: r.on_update,
                on_delete: r.on_delete,
            })
        })
        .collect();

    TableMetadata {
        name: table.name.clone(),
        columns,
        primary_keys: table.primary_key.clone(),
        foreign_keys,
        unique_constraints: table.unique_constraints.clone(),
        indexes: table.indexes.clone(),
    }
}

/// Maps every table, keyed by name.
#[must_use]
pub fn map_schema(tables: &[AbstractTable], dialect: &dyn Dialect) -> BTreeMap<String, TableMetadata> {
    tables
        .iter()
        .map(|t| (t.name.clone(), map_table(t, dialect)))
        .collect()
}
