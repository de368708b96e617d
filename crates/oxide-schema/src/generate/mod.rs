//! DDL generation.
//!
//! Turns a [`SchemaDiff`] (or a whole [`Snapshot`]) into SQL statements
//! for one dialect. Statements come out in this order:
//!
//! 1. drops of foreign keys that disappear from surviving tables, then of
//!    their unique constraints, indexes and primary keys;
//! 2. `DROP TABLE IF EXISTS` for removed tables, dependents first;
//! 3. per modified table, either in-place `ALTER` statements or the
//!    shadow-table recreation sequence;
//! 4. `CREATE TABLE` for added tables in dependency order, then their
//!    indexes;
//! 5. foreign keys added to tables altered in place.
//!
//! Every foreign key of the target schema is validated before anything is
//! emitted. Any error aborts generation; no partial statement list is
//! returned.

mod constraints;
mod create;
mod recreate;

pub use constraints::{validate_foreign_key, validate_identifier};
pub use create::{generate_create_script, generate_create_table};

use crate::dialect::Dialect;
use crate::diff::{ColumnChange, ColumnDiff, DefaultState, SchemaDiff, TableDiff};
use crate::error::{Result, SchemaError};
use crate::metadata::TableMetadata;
use crate::observer::{MigrationObserver, NoopObserver};
use crate::snapshot::Snapshot;
use crate::sorter::sort_tables;

use constraints::{
    check_clause, check_name, foreign_key_clause, foreign_key_name, primary_key_name,
    quoted_list, unique_name,
};
use create::{column_definition, create_table_sql, index_statements};
use recreate::{recreate_table, recreation_reason};

/// An ordered list of SQL statements, each terminated by `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Migration {
    /// The statements, in execution order.
    pub statements: Vec<String>,
}

impl Migration {
    /// Whether there is nothing to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// The statements joined by newlines.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.statements.join("\n")
    }
}

impl std::fmt::Display for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Statement accumulator that terminates every statement.
#[derive(Debug, Default)]
pub(crate) struct Statements(Vec<String>);

impl Statements {
    pub(crate) fn push(&mut self, sql: impl Into<String>) {
        let mut sql = sql.into();
        if !sql.ends_with(';') {
            sql.push(';');
        }
        self.0.push(sql);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_migration(self) -> Migration {
        Migration { statements: self.0 }
    }
}

struct TablePlan<'a> {
    diff: &'a TableDiff,
    table: &'a TableMetadata,
    old_table: Option<&'a TableMetadata>,
    recreate: Option<String>,
}

/// Generates the statements that take a database from `old` to `new`.
///
/// `old` is optional: without it, shadow-table copies only carry the
/// columns the diff leaves untouched and removed tables are dropped in
/// reverse name order.
pub fn generate_migration(
    diff: &SchemaDiff,
    new: &Snapshot,
    dialect: &dyn Dialect,
    old: Option<&Snapshot>,
) -> Result<Migration> {
    generate_migration_with(diff, new, dialect, old, &NoopObserver)
}

/// Same as [`generate_migration`], reporting to `observer`.
pub fn generate_migration_with(
    diff: &SchemaDiff,
    new: &Snapshot,
    dialect: &dyn Dialect,
    old: Option<&Snapshot>,
    observer: &dyn MigrationObserver,
) -> Result<Migration> {
    // Also rejects foreign-key cycles anywhere in the target schema.
    let creation_order = sort_tables(new.tables.values())?;
    // Unchanged foreign keys can lose their target key in this migration.
    for table in new.tables.values() {
        for fk in &table.foreign_keys {
            validate_foreign_key(&table.name, fk, &new.tables)?;
        }
    }

    let plans = diff
        .modified_tables
        .iter()
        .map(|table_diff| {
            let table = new
                .table(&table_diff.table_name)
                .ok_or_else(|| SchemaError::UnknownTable(table_diff.table_name.clone()))?;
            let old_table = old.and_then(|o| o.table(&table_diff.table_name));
            reject_unsupported(table_diff)?;
            Ok(TablePlan {
                diff: table_diff,
                table,
                old_table,
                recreate: recreation_reason(dialect, table_diff, old_table),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut statements = Statements::default();

    // Foreign keys go first so no referenced key is dropped under them.
    for plan in plans.iter().filter(|p| p.recreate.is_none()) {
        drop_foreign_keys(dialect, &mut statements, plan)?;
    }
    for plan in plans.iter().filter(|p| p.recreate.is_none()) {
        drop_constraints(dialect, &mut statements, plan)?;
    }

    for name in removal_order(&diff.removed_tables, old)? {
        statements.push(dialect.drop_table_sql(&name, true));
    }

    for plan in &plans {
        match &plan.recreate {
            Some(reason) => {
                observer.table_recreated(&plan.table.name, reason);
                recreate_table(dialect, &mut statements, plan.table, plan.diff, plan.old_table)?;
            }
            None => alter_table(dialect, &mut statements, plan)?,
        }
    }

    let added: Vec<&TableMetadata> = creation_order
        .iter()
        .filter_map(|name| diff.added_tables.iter().find(|t| &t.name == name))
        .collect();
    let mut added_indexes = Vec::new();
    for table in &added {
        statements.push(create_table_sql(dialect, &table.name, table, false)?);
        added_indexes.extend(index_statements(dialect, table)?);
    }
    for index in added_indexes {
        statements.push(index);
    }

    for plan in plans.iter().filter(|p| p.recreate.is_none()) {
        for fk in &plan.diff.added_foreign_keys {
            let name = foreign_key_name(&plan.table.name, fk)?;
            statements.push(dialect.add_constraint_sql(
                &plan.table.name,
                &name,
                &foreign_key_clause(dialect, fk),
            ));
        }
    }

    if !diff.is_empty() && statements.is_empty() {
        return Err(SchemaError::EmptyMigration {
            tables: diff.table_count(),
        });
    }

    let migration = statements.into_migration();
    observer.statements_generated(dialect.name(), migration.len());
    Ok(migration)
}

fn reject_unsupported(diff: &TableDiff) -> Result<()> {
    for column in &diff.modified_columns {
        for change in &column.changes {
            if let ColumnChange::Other { .. } = change {
                return Err(SchemaError::UnsupportedChange {
                    table: diff.table_name.clone(),
                    column: column.column_name.clone(),
                    change: change.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Removed tables, referencing tables before the tables they reference.
fn removal_order(removed: &[String], old: Option<&Snapshot>) -> Result<Vec<String>> {
    let mut order: Vec<String> = match old {
        Some(old) => sort_tables(old.tables.values())?
            .into_iter()
            .filter(|name| removed.contains(name))
            .collect(),
        None => {
            let mut names = removed.to_vec();
            names.sort();
            names
        }
    };
    // Tables missing from the old snapshot still have to be dropped.
    for name in removed {
        if !order.contains(name) {
            order.insert(0, name.clone());
        }
    }
    order.reverse();
    Ok(order)
}

fn drop_foreign_keys(dialect: &dyn Dialect, statements: &mut Statements, plan: &TablePlan<'_>) -> Result<()> {
    let table = &plan.table.name;
    for fk in &plan.diff.removed_foreign_keys {
        statements.push(dialect.drop_constraint_sql(table, &foreign_key_name(table, fk)?));
    }
    Ok(())
}

fn drop_constraints(dialect: &dyn Dialect, statements: &mut Statements, plan: &TablePlan<'_>) -> Result<()> {
    let table = &plan.table.name;
    for unique in &plan.diff.removed_unique_constraints {
        statements.push(dialect.drop_constraint_sql(table, &unique_name(table, unique)?));
    }
    for index in &plan.diff.removed_indexes {
        validate_identifier("index", &index.name)?;
        statements.push(dialect.drop_index_sql(&index.name));
    }
    if let Some(change) = &plan.diff.primary_key {
        if !change.from.is_empty() {
            statements.push(dialect.drop_constraint_sql(table, &primary_key_name(table)?));
        }
    }
    Ok(())
}

fn alter_table(dialect: &dyn Dialect, statements: &mut Statements, plan: &TablePlan<'_>) -> Result<()> {
    let table = &plan.table.name;

    for column in &plan.diff.added_columns {
        statements.push(dialect.add_column_sql(table, &column_definition(dialect, column, false, false)));
        if let Some(values) = &column.enum_values {
            let name = check_name(table, &column.name)?;
            statements.push(dialect.add_constraint_sql(
                table,
                &name,
                &check_clause(dialect, &column.name, values),
            ));
        }
    }

    for column in &plan.diff.modified_columns {
        alter_column(dialect, statements, plan.table, column)?;
    }

    for name in &plan.diff.removed_columns {
        statements.push(dialect.drop_column_sql(table, name));
    }

    if let Some(change) = &plan.diff.primary_key {
        if !change.to.is_empty() {
            statements.push(dialect.add_constraint_sql(
                table,
                &primary_key_name(table)?,
                &format!("PRIMARY KEY ({})", quoted_list(dialect, &change.to)),
            ));
        }
    }

    for unique in &plan.diff.added_unique_constraints {
        statements.push(dialect.add_constraint_sql(
            table,
            &unique_name(table, unique)?,
            &format!("UNIQUE ({})", quoted_list(dialect, &unique.columns)),
        ));
    }

    for index in &plan.diff.added_indexes {
        validate_identifier("index", &index.name)?;
        statements.push(dialect.create_index_sql(table, index));
    }
    Ok(())
}

/// In-place column alteration. Every type-affecting change collapses into
/// one `ALTER COLUMN ... TYPE`.
fn alter_column(
    dialect: &dyn Dialect,
    statements: &mut Statements,
    table: &TableMetadata,
    diff: &ColumnDiff,
) -> Result<()> {
    let column = table
        .get_column(&diff.column_name)
        .ok_or_else(|| SchemaError::UnsupportedChange {
            table: table.name.clone(),
            column: diff.column_name.clone(),
            change: "column is missing from the target table".to_string(),
        })?;

    if diff.changes.iter().any(ColumnChange::is_type_change) {
        statements.push(dialect.alter_column_type_sql(&table.name, &column.name, &column.sql_type));
    }

    if diff
        .changes
        .iter()
        .any(|c| matches!(c, ColumnChange::EnumValues { .. }))
    {
        let name = check_name(&table.name, &column.name)?;
        statements.push(dialect.drop_constraint_sql(&table.name, &name));
        if let Some(values) = &column.enum_values {
            statements.push(dialect.add_constraint_sql(
                &table.name,
                &name,
                &check_clause(dialect, &column.name, values),
            ));
        }
    }

    for change in &diff.changes {
        match change {
            ColumnChange::Type { .. }
            | ColumnChange::Length { .. }
            | ColumnChange::Precision { .. }
            | ColumnChange::Scale { .. }
            | ColumnChange::EnumValues { .. } => {}
            ColumnChange::Nullable { to, .. } => {
                statements.push(dialect.alter_column_nullable_sql(&table.name, &column.name, *to));
            }
            ColumnChange::Default { to, .. } => {
                let default = match to {
                    DefaultState::Database(sql) => Some(sql.as_str()),
                    DefaultState::None | DefaultState::Application => None,
                };
                statements.push(dialect.alter_column_default_sql(&table.name, &column.name, default));
            }
            ColumnChange::Other { .. } => {
                return Err(SchemaError::UnsupportedChange {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    change: change.to_string(),
                });
            }
        }
    }
    Ok(())
}
