//! Constraint naming and generation-time validation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::{quote_string, Dialect};
use crate::error::{Result, SchemaError};
use crate::metadata::{ForeignKeyMetadata, TableMetadata, UniqueConstraintMetadata};

// Literal pattern, cannot fail to compile.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_$]+$").expect("identifier pattern is valid"));

/// Rejects constraint and index names outside `[A-Za-z0-9_$]+`.
///
/// Names are never sanitized: a bad name is an error.
pub fn validate_identifier(kind: &'static str, name: &str) -> Result<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

/// `<table>_<column>_check`
pub(crate) fn check_name(table: &str, column: &str) -> Result<String> {
    let name = format!("{table}_{column}_check");
    validate_identifier("check constraint", &name)?;
    Ok(name)
}

/// `<table>_pkey`
pub(crate) fn primary_key_name(table: &str) -> Result<String> {
    let name = format!("{table}_pkey");
    validate_identifier("primary key", &name)?;
    Ok(name)
}

/// The declared name, or `<table>_<cols>_key`.
pub(crate) fn unique_name(table: &str, unique: &UniqueConstraintMetadata) -> Result<String> {
    let name = unique
        .name
        .clone()
        .unwrap_or_else(|| format!("{table}_{}_key", unique.columns.join("_")));
    validate_identifier("unique constraint", &name)?;
    Ok(name)
}

/// The declared name, or `<table>_<cols>_fkey`.
pub(crate) fn foreign_key_name(table: &str, fk: &ForeignKeyMetadata) -> Result<String> {
    let name = fk
        .name
        .clone()
        .unwrap_or_else(|| format!("{table}_{}_fkey", fk.columns.join("_")));
    validate_identifier("foreign key", &name)?;
    Ok(name)
}

/// `CHECK ("col" IN ('a','b'))`
pub(crate) fn check_clause(dialect: &dyn Dialect, column: &str, values: &[String]) -> String {
    let values: Vec<String> = values.iter().map(|v| quote_string(v)).collect();
    format!(
        "CHECK ({} IN ({}))",
        dialect.quote_identifier(column),
        values.join(",")
    )
}

pub(crate) fn quoted_list(dialect: &dyn Dialect, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| dialect.quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `FOREIGN KEY (...) REFERENCES ... [ON UPDATE ..] [ON DELETE ..]`
pub(crate) fn foreign_key_clause(dialect: &dyn Dialect, fk: &ForeignKeyMetadata) -> String {
    let mut sql = format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        quoted_list(dialect, &fk.columns),
        dialect.quote_identifier(&fk.ref_table),
        quoted_list(dialect, &fk.ref_columns)
    );
    if let Some(action) = fk.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.to_sql());
    }
    if let Some(action) = fk.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.to_sql());
    }
    sql
}

/// Checks that a foreign key targets the primary key or a unique
/// constraint of its referenced table.
pub fn validate_foreign_key(
    table: &str,
    fk: &ForeignKeyMetadata,
    schema: &BTreeMap<String, TableMetadata>,
) -> Result<()> {
    let invalid = || SchemaError::InvalidForeignKey {
        table: table.to_string(),
        columns: fk.columns.join(", "),
        references_table: fk.ref_table.clone(),
        references_columns: fk.ref_columns.join(", "),
    };

    if fk.columns.is_empty() || fk.columns.len() != fk.ref_columns.len() {
        return Err(invalid());
    }
    let target = schema
        .get(&fk.ref_table)
        .ok_or_else(|| SchemaError::UnknownTable(fk.ref_table.clone()))?;

    let referenced: BTreeSet<&String> = fk.ref_columns.iter().collect();
    let primary_key: BTreeSet<&String> = target.primary_keys.iter().collect();
    let matches_primary_key = !primary_key.is_empty() && referenced == primary_key;
    let matches_unique = target
        .unique_constraints
        .iter()
        .any(|u| u.columns.iter().collect::<BTreeSet<_>>() == referenced);

    if matches_primary_key || matches_unique {
        Ok(())
    } else {
        Err(invalid())
    }
}
