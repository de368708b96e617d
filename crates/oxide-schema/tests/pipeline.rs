//! Pipeline-wide properties: idempotence, hashing, ordering, determinism.

use oxide_schema::prelude::*;
use oxide_schema::snapshot::create_snapshot_at;
use pretty_assertions::assert_eq;

fn blog() -> Vec<TableSpec> {
    vec![
        TableSpec::new("comments")
            .column(ColumnSpec::new("id", AbstractType::Bigint).primary_key())
            .column(
                ColumnSpec::new("post_id", AbstractType::Bigint)
                    .not_null()
                    .references("posts", "id")
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .column(ColumnSpec::new("body", AbstractType::Text).not_null())
            .index("comments_post_idx", ["post_id"], false),
        TableSpec::new("posts")
            .column(ColumnSpec::new("id", AbstractType::Bigint).primary_key())
            .column(ColumnSpec::new("author_id", AbstractType::Text).references("users", "id"))
            .column(ColumnSpec::varchar("title", 200).not_null())
            .column(
                ColumnSpec::new("state", AbstractType::Text)
                    .not_null()
                    .enum_values(["draft", "published"])
                    .default(DefaultSpec::Value(LiteralValue::Text("draft".to_string()))),
            )
            .column(
                ColumnSpec::new("published", AbstractType::Boolean)
                    .not_null()
                    .default(DefaultSpec::Value(LiteralValue::Bool(false))),
            )
            .column(ColumnSpec::new("created_at", AbstractType::Timestamp).default(DefaultSpec::Now)),
        TableSpec::new("users")
            .column(ColumnSpec::new("id", AbstractType::Text).primary_key())
            .column(ColumnSpec::varchar("email", 255).not_null().unique())
            .column(ColumnSpec::numeric("balance", 12, 2)),
    ]
}

fn snapshot(tables: &[TableSpec], dialect: &dyn Dialect) -> Snapshot {
    Pipeline::new(dialect)
        .observer(&NoopObserver)
        .snapshot(tables, "test")
        .unwrap()
}

#[test]
fn self_diff_is_empty() {
    for kind in [DialectKind::Postgres, DialectKind::Sqlite] {
        let dialect = kind.dialect();
        let snapshot = snapshot(&blog(), dialect);
        let diff = diff_snapshots(&snapshot, &snapshot);
        assert!(diff.is_empty());
        let migration = generate_migration(&diff, &snapshot, dialect, Some(&snapshot)).unwrap();
        assert!(migration.is_empty());
    }
}

#[test]
fn hash_ignores_table_order() {
    let mut reversed = blog();
    reversed.reverse();
    let forward = snapshot(&blog(), &PostgresDialect);
    let backward = snapshot(&reversed, &PostgresDialect);
    assert_eq!(forward.schema_hash, backward.schema_hash);

    let tables: Vec<TableMetadata> = forward.tables.values().cloned().collect();
    let mut shuffled = tables.clone();
    shuffled.rotate_left(1);
    let a = create_snapshot_at(tables, "a", 1).unwrap();
    let b = create_snapshot_at(shuffled, "b", 2).unwrap();
    assert_eq!(a.schema_hash, b.schema_hash);
    assert_eq!(a.schema_hash.len(), 64);
}

#[test]
fn hash_tracks_dialect_rendering() {
    let pg = snapshot(&blog(), &PostgresDialect);
    let lite = snapshot(&blog(), &SqliteDialect);
    assert_ne!(pg.schema_hash, lite.schema_hash);
}

#[test]
fn generation_is_deterministic() {
    let old = snapshot(&blog()[2..], &SqliteDialect);
    let first = plan_migration(&blog(), &SqliteDialect, Some(&old), &PlanOptions::default()).unwrap();
    let second = plan_migration(&blog(), &SqliteDialect, Some(&old), &PlanOptions::default()).unwrap();
    assert_eq!(first.sql(), second.sql());
    assert_eq!(first.snapshot.schema_hash, second.snapshot.schema_hash);
}

#[test]
fn referenced_tables_created_first() {
    let plan = plan_migration(&blog(), &PostgresDialect, None, &PlanOptions::default()).unwrap();
    let position = |table: &str| {
        let prefix = format!("CREATE TABLE \"{table}\"");
        plan.migration
            .statements
            .iter()
            .position(|s| s.starts_with(&prefix))
            .unwrap()
    };
    assert!(position("users") < position("posts"));
    assert!(position("posts") < position("comments"));
    assert_eq!(
        plan.migration.statements.last().unwrap(),
        "CREATE INDEX \"comments_post_idx\" ON \"comments\" (\"post_id\");"
    );
}

#[test]
fn dialects_render_defaults_differently() {
    let pg = plan_migration(&blog(), &PostgresDialect, None, &PlanOptions::default()).unwrap();
    let lite = plan_migration(&blog(), &SqliteDialect, None, &PlanOptions::default()).unwrap();

    let pg_sql = pg.sql();
    assert!(pg_sql.contains("\"published\" BOOLEAN NOT NULL DEFAULT FALSE"));
    assert!(pg_sql.contains("\"created_at\" TIMESTAMP DEFAULT CURRENT_TIMESTAMP"));
    assert!(pg_sql.contains("\"balance\" NUMERIC(12, 2)"));

    let lite_sql = lite.sql();
    assert!(lite_sql.contains("\"published\" INTEGER NOT NULL DEFAULT 0"));
    assert!(lite_sql.contains("\"created_at\" INTEGER DEFAULT (strftime('%s', 'now'))"));
    assert!(lite_sql.contains("\"balance\" NUMERIC"));

    for sql in [&pg_sql, &lite_sql] {
        assert!(sql.contains("\"title\" VARCHAR(200) NOT NULL"));
        assert!(sql.contains("CONSTRAINT \"posts_state_check\" CHECK (\"state\" IN ('draft','published'))"));
    }
}

#[test]
fn dialects_generate_in_parallel() {
    let tables = blog();
    let sequential: Vec<String> = [DialectKind::Postgres, DialectKind::Sqlite]
        .into_iter()
        .map(|kind| {
            plan_migration(&tables, kind.dialect(), None, &PlanOptions::default())
                .unwrap()
                .sql()
        })
        .collect();

    let parallel: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = [DialectKind::Postgres, DialectKind::Sqlite]
            .into_iter()
            .map(|kind| {
                let tables = &tables;
                scope.spawn(move || {
                    plan_migration(tables, kind.dialect(), None, &PlanOptions::default())
                        .unwrap()
                        .sql()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
}

#[test]
fn snapshot_survives_json() {
    let original = snapshot(&blog(), &SqliteDialect);
    let loaded = Snapshot::from_json(&original.to_json().unwrap()).unwrap();
    assert_eq!(loaded, original);

    let plan = plan_migration(&blog(), &SqliteDialect, Some(&loaded), &PlanOptions::default()).unwrap();
    assert!(plan.unchanged);
    assert_eq!(plan.sql(), "");
}

#[test]
fn tampered_snapshot_rejected() {
    let original = snapshot(&blog(), &PostgresDialect);
    let json = original.to_json().unwrap().replace("VARCHAR(200)", "VARCHAR(100)");
    let err = Snapshot::from_json(&json).unwrap_err();
    assert!(matches!(err, SchemaError::HashMismatch { .. }));
}

#[test]
fn tables_from_json() {
    let json = r#"[
        {"name": "sessions", "columns": [
            {"name": "id", "type": "text", "primaryKey": true},
            {"name": "user_id", "type": "text", "notNull": true,
             "references": {"target": {"table": "users", "column": "id"}, "onDelete": "cascade"}},
            {"name": "expires_at", "type": "timestamp", "notNull": true}
        ]},
        {"name": "users", "columns": [
            {"name": "id", "type": "text", "primaryKey": true},
            {"name": "active", "type": "boolean", "notNull": true, "default": {"value": true}}
        ]}
    ]"#;
    let tables: Vec<TableSpec> = serde_json::from_str(json).unwrap();

    let plan = plan_migration(&tables, &SqliteDialect, None, &PlanOptions::default()).unwrap();
    assert_eq!(
        plan.migration.statements,
        vec![
            "CREATE TABLE \"users\" (\n  \
             \"id\" TEXT PRIMARY KEY,\n  \
             \"active\" INTEGER NOT NULL DEFAULT 1\n);",
            "CREATE TABLE \"sessions\" (\n  \
             \"id\" TEXT PRIMARY KEY,\n  \
             \"user_id\" TEXT NOT NULL,\n  \
             \"expires_at\" INTEGER NOT NULL,\n  \
             FOREIGN KEY (\"user_id\") REFERENCES \"users\" (\"id\") ON DELETE CASCADE\n);",
        ]
    );
}
