//! CREATE TABLE rendering.

use std::collections::BTreeMap;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::metadata::{ColumnMetadata, TableMetadata};
use crate::snapshot::Snapshot;
use crate::sorter::sort_tables;

use super::constraints::{
    check_clause, check_name, foreign_key_clause, quoted_list, validate_foreign_key,
    validate_identifier,
};
use super::{Migration, Statements};

/// Generates column definition SQL.
///
/// `inline_primary_key` and `inline_unique` render the single-column
/// constraints on the column itself.
pub(crate) fn column_definition(
    dialect: &dyn Dialect,
    column: &ColumnMetadata,
    inline_primary_key: bool,
    inline_unique: bool,
) -> String {
    let mut parts = vec![dialect.quote_identifier(&column.name), column.sql_type.clone()];

    if inline_primary_key {
        parts.push("PRIMARY KEY".to_string());
    }

    if !column.nullable && !inline_primary_key {
        parts.push("NOT NULL".to_string());
    }

    if inline_unique && !inline_primary_key {
        parts.push("UNIQUE".to_string());
    }

    if let (true, Some(default_sql)) = (column.has_default, &column.default_value) {
        parts.push(format!("DEFAULT {default_sql}"));
    }

    parts.join(" ")
}

/// Renders `CREATE TABLE <name>` for `table`'s definition.
///
/// `name` may differ from `table.name` (shadow tables); derived
/// constraint names always use `table.name`.
pub(crate) fn create_table_sql(
    dialect: &dyn Dialect,
    name: &str,
    table: &TableMetadata,
    if_not_exists: bool,
) -> Result<String> {
    let single_primary_key = match table.primary_keys.as_slice() {
        [column] => Some(column.as_str()),
        _ => None,
    };
    let inline_unique = |column: &str| {
        table
            .unique_constraints
            .iter()
            .any(|u| u.name.is_none() && u.columns.len() == 1 && u.columns[0] == column)
    };

    let mut lines: Vec<String> = table
        .columns
        .values()
        .map(|c| {
            column_definition(
                dialect,
                c,
                single_primary_key == Some(c.name.as_str()),
                inline_unique(&c.name),
            )
        })
        .collect();

    if table.primary_keys.len() > 1 {
        lines.push(format!(
            "PRIMARY KEY ({})",
            quoted_list(dialect, &table.primary_keys)
        ));
    }

    for unique in &table.unique_constraints {
        match &unique.name {
            Some(constraint) => {
                validate_identifier("unique constraint", constraint)?;
                lines.push(format!(
                    "CONSTRAINT {} UNIQUE ({})",
                    dialect.quote_identifier(constraint),
                    quoted_list(dialect, &unique.columns)
                ));
            }
            None if unique.columns.len() == 1 => {}
            None => lines.push(format!("UNIQUE ({})", quoted_list(dialect, &unique.columns))),
        }
    }

    for fk in &table.foreign_keys {
        let clause = foreign_key_clause(dialect, fk);
        match &fk.name {
            Some(constraint) => {
                validate_identifier("foreign key", constraint)?;
                lines.push(format!(
                    "CONSTRAINT {} {clause}",
                    dialect.quote_identifier(constraint)
                ));
            }
            None => lines.push(clause),
        }
    }

    for column in table.columns.values() {
        if let Some(values) = &column.enum_values {
            let constraint = check_name(&table.name, &column.name)?;
            lines.push(format!(
                "CONSTRAINT {} {}",
                dialect.quote_identifier(&constraint),
                check_clause(dialect, &column.name, values)
            ));
        }
    }

    let mut sql = String::from("CREATE TABLE ");
    if if_not_exists {
        sql.push_str("IF NOT EXISTS ");
    }
    sql.push_str(&dialect.quote_identifier(name));
    sql.push_str(" (\n  ");
    sql.push_str(&lines.join(",\n  "));
    sql.push_str("\n)");
    Ok(sql)
}

/// `CREATE INDEX` statements for every index of the table.
pub(crate) fn index_statements(dialect: &dyn Dialect, table: &TableMetadata) -> Result<Vec<String>> {
    table
        .indexes
        .iter()
        .map(|index| {
            validate_identifier("index", &index.name)?;
            Ok(dialect.create_index_sql(&table.name, index))
        })
        .collect()
}

/// Generates one `CREATE TABLE` statement, terminated by `;`.
///
/// Every foreign key is checked against `schema` first; a key that does
/// not target a primary key or unique column set fails the call.
pub fn generate_create_table(
    table: &TableMetadata,
    schema: &BTreeMap<String, TableMetadata>,
    dialect: &dyn Dialect,
    if_not_exists: bool,
) -> Result<String> {
    for fk in &table.foreign_keys {
        validate_foreign_key(&table.name, fk, schema)?;
    }
    let sql = create_table_sql(dialect, &table.name, table, if_not_exists)?;
    Ok(format!("{sql};"))
}

/// Generates the full script for a snapshot: every table in dependency
/// order, then every table's indexes.
pub fn generate_create_script(
    snapshot: &Snapshot,
    dialect: &dyn Dialect,
    if_not_exists: bool,
) -> Result<Migration> {
    let order = sort_tables(snapshot.tables.values())?;
    let mut statements = Statements::default();
    let mut indexes = Vec::new();

    for name in &order {
        let Some(table) = snapshot.table(name) else {
            continue;
        };
        for fk in &table.foreign_keys {
            validate_foreign_key(&table.name, fk, &snapshot.tables)?;
        }
        statements.push(create_table_sql(dialect, name, table, if_not_exists)?);
        indexes.extend(index_statements(dialect, table)?);
    }
    for index in indexes {
        statements.push(index);
    }
    Ok(statements.into_migration())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};
    use crate::error::SchemaError;
    use crate::metadata::ForeignKeyMetadata;
    use crate::snapshot::create_snapshot_at;
    use crate::types::ForeignKeyAction;
    use pretty_assertions::assert_eq;

    fn users() -> TableMetadata {
        TableMetadata::new("users")
            .column(ColumnMetadata::new("id", "TEXT"))
            .column(ColumnMetadata::new("email", "TEXT").not_null())
            .column(
                ColumnMetadata::new("status", "TEXT")
                    .not_null()
                    .default_value("'active'")
                    .enum_values(["active", "banned"]),
            )
            .primary_key(["id"])
            .unique(None, ["email"])
            .index("users_status_idx", ["status"], false)
    }

    fn posts() -> TableMetadata {
        TableMetadata::new("posts")
            .column(ColumnMetadata::new("id", "BIGINT"))
            .column(ColumnMetadata::new("author_id", "TEXT").not_null())
            .primary_key(["id"])
            .foreign_key(ForeignKeyMetadata {
                name: None,
                columns: vec!["author_id".to_string()],
                ref_table: "users".to_string(),
                ref_columns: vec!["id".to_string()],
                on_update: None,
                on_delete: Some(ForeignKeyAction::Cascade),
            })
    }

    fn schema() -> BTreeMap<String, TableMetadata> {
        [("users".to_string(), users()), ("posts".to_string(), posts())].into()
    }

    #[test]
    fn test_create_table() {
        let sql = generate_create_table(&users(), &schema(), &PostgresDialect, false).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"users\" (\n  \
             \"id\" TEXT PRIMARY KEY,\n  \
             \"email\" TEXT NOT NULL UNIQUE,\n  \
             \"status\" TEXT NOT NULL DEFAULT 'active',\n  \
             CONSTRAINT \"users_status_check\" CHECK (\"status\" IN ('active','banned'))\n);"
        );
    }

    #[test]
    fn test_create_table_with_foreign_key() {
        let sql = generate_create_table(&posts(), &schema(), &SqliteDialect, true).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"posts\" (\n  \
             \"id\" BIGINT PRIMARY KEY,\n  \
             \"author_id\" TEXT NOT NULL,\n  \
             FOREIGN KEY (\"author_id\") REFERENCES \"users\" (\"id\") ON DELETE CASCADE\n);"
        );
    }

    #[test]
    fn test_composite_primary_key_and_named_unique() {
        let table = TableMetadata::new("memberships")
            .column(ColumnMetadata::new("user_id", "TEXT"))
            .column(ColumnMetadata::new("group_id", "TEXT"))
            .primary_key(["user_id", "group_id"])
            .unique(Some("memberships_pair_key"), ["group_id", "user_id"]);
        let sql = create_table_sql(&PostgresDialect, "memberships", &table, false).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"memberships\" (\n  \
             \"user_id\" TEXT NOT NULL,\n  \
             \"group_id\" TEXT NOT NULL,\n  \
             PRIMARY KEY (\"group_id\", \"user_id\"),\n  \
             CONSTRAINT \"memberships_pair_key\" UNIQUE (\"group_id\", \"user_id\")\n)"
        );
    }

    #[test]
    fn test_invalid_foreign_key_target_fails() {
        let mut bad = posts();
        bad.foreign_keys[0].ref_columns = vec!["status".to_string()];
        let err = generate_create_table(&bad, &schema(), &PostgresDialect, false).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidForeignKey { .. }));
    }

    #[test]
    fn test_invalid_index_name_fails() {
        let table = users().index("bad name", ["email"], false);
        assert!(matches!(
            index_statements(&PostgresDialect, &table),
            Err(SchemaError::InvalidIdentifier { kind: "index", .. })
        ));
    }

    #[test]
    fn test_create_script_orders_and_indexes() {
        let snapshot = create_snapshot_at([posts(), users()], "init", 0).unwrap();
        let script = generate_create_script(&snapshot, &PostgresDialect, false).unwrap();
        assert_eq!(script.statements.len(), 3);
        assert!(script.statements[0].starts_with("CREATE TABLE \"users\""));
        assert!(script.statements[1].starts_with("CREATE TABLE \"posts\""));
        assert_eq!(
            script.statements[2],
            "CREATE INDEX \"users_status_idx\" ON \"users\" (\"status\");"
        );
    }
}
