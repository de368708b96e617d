//! Abstract schema extraction.
//!
//! Turns [`TableSpec`]s into dialect-agnostic [`AbstractTable`]s. Foreign
//! keys are resolved in two passes: every column of every table is first
//! registered under its `(table, column)` identity, then each reference
//! is looked up by that identity. A reference that matches nothing is an
//! error naming the referencing column; no table name is ever guessed.

use std::collections::{BTreeSet, HashSet};

use crate::error::{Result, SchemaError};
use crate::metadata::{IndexMetadata, UniqueConstraintMetadata};
use crate::spec::{ColumnRef, ColumnSpec, DefaultSpec, TableConstraintSpec, TableSpec};
use crate::types::{
    AbstractType, ColumnOptions, DefaultValue, ForeignKeyAction, LiteralValue, SqlFragment,
};

/// A resolved foreign key reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReference {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
    /// ON UPDATE action.
    pub on_update: Option<ForeignKeyAction>,
    /// ON DELETE action.
    pub on_delete: Option<ForeignKeyAction>,
}

/// A column after extraction: no SQL, no dialect knowledge.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractColumn {
    /// Column name.
    pub name: String,
    /// Abstract type tag.
    pub column_type: AbstractType,
    /// Type options.
    pub options: ColumnOptions,
    /// Derived nullability.
    pub nullable: bool,
    /// Classified default.
    pub default: DefaultValue,
    /// Resolved foreign key, if any.
    pub references: Option<ColumnReference>,
}

/// A table after extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractTable {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<AbstractColumn>,
    /// Primary key column names, sorted.
    pub primary_key: Vec<String>,
    /// Unique constraints.
    pub unique_constraints: Vec<UniqueConstraintMetadata>,
    /// Secondary indexes.
    pub indexes: Vec<IndexMetadata>,
}

impl AbstractTable {
    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&AbstractColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Every column identity declared by a schema.
#[derive(Debug, Clone, Default)]
pub struct ColumnIdentities {
    columns: HashSet<ColumnRef>,
}

impl ColumnIdentities {
    /// Registers every column of every table.
    ///
    /// Fails on duplicate table names or duplicate column names within a
    /// table.
    pub fn from_tables(tables: &[TableSpec]) -> Result<Self> {
        let mut seen_tables = HashSet::new();
        let mut columns = HashSet::new();
        for table in tables {
            if !seen_tables.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
            for column in &table.columns {
                if !columns.insert(ColumnRef::new(&table.name, &column.name)) {
                    return Err(SchemaError::DuplicateColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }
        Ok(Self { columns })
    }

    /// Whether the identity belongs to a declared column.
    #[must_use]
    pub fn contains(&self, column: &ColumnRef) -> bool {
        self.columns.contains(column)
    }
}

/// Extracts one table, resolving its references against `tables`.
pub fn extract_table(table: &TableSpec, tables: &[TableSpec]) -> Result<AbstractTable> {
    let identities = ColumnIdentities::from_tables(tables)?;
    extract_table_with(table, &identities)
}

/// Extracts every table of a schema, preserving input order.
pub fn extract_schema(tables: &[TableSpec]) -> Result<Vec<AbstractTable>> {
    let identities = ColumnIdentities::from_tables(tables)?;
    tables
        .iter()
        .map(|table| extract_table_with(table, &identities))
        .collect()
}

/// Extracts one table against already-registered identities.
pub fn extract_table_with(table: &TableSpec, identities: &ColumnIdentities) -> Result<AbstractTable> {
    let mut names = HashSet::new();
    for column in &table.columns {
        if !names.insert(column.name.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }
    }

    let mut primary_key: BTreeSet<String> = table
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();

    let mut unique_constraints = Vec::new();
    let mut indexes = Vec::new();
    for constraint in &table.constraints {
        match constraint {
            TableConstraintSpec::PrimaryKey { columns } => {
                check_constraint_columns(table, columns, "primary key")?;
                primary_key.extend(columns.iter().cloned());
            }
            TableConstraintSpec::Unique { name, columns } => {
                check_constraint_columns(table, columns, "unique constraint")?;
                unique_constraints.push(UniqueConstraintMetadata {
                    name: name.clone(),
                    columns: columns.clone(),
                });
            }
            TableConstraintSpec::Index {
                name,
                columns,
                unique,
            } => {
                check_constraint_columns(table, columns, "index")?;
                indexes.push(IndexMetadata {
                    name: name.clone(),
                    columns: columns.clone(),
                    unique: *unique,
                });
            }
        }
    }

    let mut columns = Vec::with_capacity(table.columns.len());
    for spec in &table.columns {
        let in_primary_key = primary_key.contains(&spec.name);
        let column = extract_column(&table.name, spec, in_primary_key, identities)?;

        // A lone primary key column is already unique.
        let redundant = in_primary_key && primary_key.len() == 1;
        if spec.unique && !redundant {
            unique_constraints.push(UniqueConstraintMetadata {
                name: None,
                columns: vec![spec.name.clone()],
            });
        }
        columns.push(column);
    }

    Ok(AbstractTable {
        name: table.name.clone(),
        columns,
        primary_key: primary_key.into_iter().collect(),
        unique_constraints,
        indexes,
    })
}

fn check_constraint_columns(table: &TableSpec, columns: &[String], what: &str) -> Result<()> {
    if columns.is_empty() {
        return Err(SchemaError::malformed(
            &table.name,
            "",
            format!("{what} declares no columns"),
        ));
    }
    for column in columns {
        if !table.columns.iter().any(|c| &c.name == column) {
            return Err(SchemaError::UnknownConstraintColumn {
                table: table.name.clone(),
                column: column.clone(),
            });
        }
    }
    Ok(())
}

fn extract_column(
    table: &str,
    spec: &ColumnSpec,
    in_primary_key: bool,
    identities: &ColumnIdentities,
) -> Result<AbstractColumn> {
    validate_options(table, spec)?;

    let nullable = !(in_primary_key || spec.not_null);
    let default = classify_default(table, spec, nullable)?;

    let references = match &spec.references {
        Some(reference) => {
            if !identities.contains(&reference.target) {
                return Err(SchemaError::UnresolvedReference {
                    table: table.to_string(),
                    column: spec.name.clone(),
                    target: reference.target.to_string(),
                });
            }
            Some(ColumnReference {
                table: reference.target.table.clone(),
                column: reference.target.column.clone(),
                on_update: reference.on_update,
                on_delete: reference.on_delete,
            })
        }
        None => None,
    };

    Ok(AbstractColumn {
        name: spec.name.clone(),
        column_type: spec.column_type,
        options: spec.options.clone(),
        nullable,
        default,
        references,
    })
}

fn validate_options(table: &str, spec: &ColumnSpec) -> Result<()> {
    let ty = spec.column_type;
    let options = &spec.options;
    let fail = |reason: String| Err(SchemaError::malformed(table, &spec.name, reason));

    if let Some(length) = options.length {
        if !ty.accepts_length() {
            return fail(format!("length is not valid for type {ty}"));
        }
        if length == 0 {
            return fail("length must be positive".to_string());
        }
    }

    if options.precision.is_some() || options.scale.is_some() {
        if !ty.accepts_precision() {
            return fail(format!("precision/scale are not valid for type {ty}"));
        }
        match (options.precision, options.scale) {
            (None, Some(_)) => return fail("scale requires a precision".to_string()),
            (Some(0), _) => return fail("precision must be positive".to_string()),
            (Some(p), Some(s)) if s > p => {
                return fail(format!("scale {s} exceeds precision {p}"));
            }
            _ => {}
        }
    }

    if let Some(values) = &options.enum_values {
        if !ty.accepts_enum() {
            return fail(format!("enum values are not valid for type {ty}"));
        }
        if values.is_empty() {
            return fail("enum value list is empty".to_string());
        }
        let distinct: HashSet<&String> = values.iter().collect();
        if distinct.len() != values.len() {
            return fail("enum value list contains duplicates".to_string());
        }
    }
    Ok(())
}

fn classify_default(table: &str, spec: &ColumnSpec, nullable: bool) -> Result<DefaultValue> {
    let Some(default) = &spec.default else {
        return Ok(DefaultValue::None);
    };
    let fail = |reason: &str| Err(SchemaError::malformed(table, &spec.name, reason));

    match default {
        DefaultSpec::Value(LiteralValue::Null) if !nullable => {
            fail("NULL default on a NOT NULL column")
        }
        DefaultSpec::Value(value) => {
            if let (Some(allowed), LiteralValue::Text(text)) = (&spec.options.enum_values, value) {
                if !allowed.contains(text) {
                    return fail("default is not one of the enum values");
                }
            }
            Ok(DefaultValue::Literal(value.clone()))
        }
        DefaultSpec::Now => {
            if !matches!(
                spec.column_type,
                AbstractType::Timestamp | AbstractType::Date | AbstractType::Time
            ) {
                return fail("current time default requires a temporal type");
            }
            Ok(DefaultValue::SqlExpression(vec![SqlFragment::CurrentTimestamp]))
        }
        DefaultSpec::Sql(fragments) => {
            if fragments.is_empty() {
                return fail("SQL default expression is empty");
            }
            Ok(DefaultValue::SqlExpression(fragments.clone()))
        }
        DefaultSpec::Generated(_) => Ok(DefaultValue::ApplicationGenerated),
    }
}
