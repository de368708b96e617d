//! Shadow-table recreation for dialects without `ALTER COLUMN`.
//!
//! The table is rebuilt under `<table>_new`, the surviving columns are
//! copied over, the original is dropped and the shadow renamed into its
//! place. Dropping the original also drops its indexes, so every index of
//! the new definition is created again afterwards.

use crate::dialect::Dialect;
use crate::diff::TableDiff;
use crate::error::Result;
use crate::metadata::TableMetadata;

use super::constraints::quoted_list;
use super::create::{create_table_sql, index_statements};
use super::Statements;

/// Why a table has to be recreated, or `None` if it can be altered in
/// place.
pub(crate) fn recreation_reason(
    dialect: &dyn Dialect,
    diff: &TableDiff,
    old_table: Option<&TableMetadata>,
) -> Option<String> {
    if !dialect.supports_alter_column() {
        if let Some(column) = diff.modified_columns.first() {
            return Some(format!("column '{}' changed", column.column_name));
        }
        for column in &diff.added_columns {
            if column.enum_values.is_some() {
                return Some(format!("added column '{}' needs a CHECK constraint", column.name));
            }
            let constant_default = column.has_default && column.constant_default;
            if column.has_default && !constant_default {
                return Some(format!(
                    "added column '{}' has a non-constant default",
                    column.name
                ));
            }
            if !column.nullable && !constant_default {
                return Some(format!(
                    "added column '{}' is NOT NULL without a default",
                    column.name
                ));
            }
        }
        if let Some(old_table) = old_table {
            for name in &diff.removed_columns {
                let checked = old_table
                    .get_column(name)
                    .is_some_and(|c| c.enum_values.is_some());
                if checked {
                    return Some(format!("removed column '{name}' has a CHECK constraint"));
                }
            }
        }
    }

    if !dialect.supports_add_constraint() {
        if diff.primary_key.is_some() {
            return Some("primary key changed".to_string());
        }
        if !diff.added_foreign_keys.is_empty() || !diff.removed_foreign_keys.is_empty() {
            return Some("foreign keys changed".to_string());
        }
        if !diff.added_unique_constraints.is_empty() || !diff.removed_unique_constraints.is_empty()
        {
            return Some("unique constraints changed".to_string());
        }
    }
    None
}

/// Columns copied from the old table into the shadow table.
///
/// With the old definition known, that is every column present in both.
/// Without it, only the columns this diff does not touch.
pub(crate) fn copied_columns(
    table: &TableMetadata,
    diff: &TableDiff,
    old_table: Option<&TableMetadata>,
) -> Vec<String> {
    table
        .columns
        .keys()
        .filter(|name| match old_table {
            Some(old) => old.columns.contains_key(*name),
            None => !diff.touches_column(name),
        })
        .cloned()
        .collect()
}

/// Appends the recreation sequence for `table`.
pub(crate) fn recreate_table(
    dialect: &dyn Dialect,
    statements: &mut Statements,
    table: &TableMetadata,
    diff: &TableDiff,
    old_table: Option<&TableMetadata>,
) -> Result<()> {
    let shadow = format!("{}_new", table.name);
    let original = dialect.quote_identifier(&table.name);

    statements.push(create_table_sql(dialect, &shadow, table, false)?);

    let columns = copied_columns(table, diff, old_table);
    if !columns.is_empty() {
        let list = quoted_list(dialect, &columns);
        statements.push(format!(
            "INSERT INTO {} ({list}) SELECT {list} FROM {original}",
            dialect.quote_identifier(&shadow)
        ));
    }

    statements.push(dialect.drop_table_sql(&table.name, false));
    statements.push(dialect.rename_table_sql(&shadow, &table.name));
    for index in index_statements(dialect, table)? {
        statements.push(index);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};
    use crate::diff::compare_tables;
    use crate::metadata::ColumnMetadata;
    use pretty_assertions::assert_eq;

    fn users() -> TableMetadata {
        TableMetadata::new("users")
            .column(ColumnMetadata::new("id", "TEXT"))
            .column(ColumnMetadata::new("name", "TEXT").not_null())
            .column(ColumnMetadata::new("age", "TEXT"))
            .primary_key(["id"])
    }

    #[test]
    fn test_reasons() {
        let nullable = users().column(ColumnMetadata::new("bio", "TEXT"));
        let diff = compare_tables(&users(), &nullable).unwrap();
        assert_eq!(recreation_reason(&SqliteDialect, &diff, None), None);

        let required = users().column(ColumnMetadata::new("bio", "TEXT").not_null());
        let diff = compare_tables(&users(), &required).unwrap();
        assert_eq!(
            recreation_reason(&SqliteDialect, &diff, None).as_deref(),
            Some("added column 'bio' is NOT NULL without a default")
        );
        assert_eq!(recreation_reason(&PostgresDialect, &diff, None), None);

        let defaulted =
            users().column(ColumnMetadata::new("bio", "TEXT").not_null().default_value("''"));
        let diff = compare_tables(&users(), &defaulted).unwrap();
        assert_eq!(recreation_reason(&SqliteDialect, &diff, None), None);

        let concatenated = users()
            .column(ColumnMetadata::new("bio", "TEXT").default_expression("('a' || 'b')"));
        let diff = compare_tables(&users(), &concatenated).unwrap();
        assert_eq!(
            recreation_reason(&SqliteDialect, &diff, None).as_deref(),
            Some("added column 'bio' has a non-constant default")
        );
        assert_eq!(recreation_reason(&PostgresDialect, &diff, None), None);
    }

    #[test]
    fn test_copied_columns() {
        let mut new = users();
        new.columns.shift_remove("name");
        new = new.column(ColumnMetadata::new("email", "TEXT"));
        if let Some(age) = new.columns.get_mut("age") {
            age.sql_type = "INTEGER".to_string();
        }
        let diff = compare_tables(&users(), &new).unwrap();

        assert_eq!(copied_columns(&new, &diff, Some(&users())), vec!["id", "age"]);
        assert_eq!(copied_columns(&new, &diff, None), vec!["id"]);
    }
}
