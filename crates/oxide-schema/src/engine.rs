//! End-to-end migration planning.
//!
//! Runs the whole pipeline for one dialect: extract the table specs, map
//! them through the dialect, snapshot the result, compare against the
//! previous snapshot and generate SQL. When the previous snapshot has the
//! same hash the run stops right after snapshotting with an empty diff.

use crate::dialect::Dialect;
use crate::diff::{diff_snapshots, SchemaDiff};
use crate::error::Result;
use crate::extract::{extract_table_with, ColumnIdentities};
use crate::generate::{generate_create_script, generate_migration_with, Migration};
use crate::metadata::map_schema;
use crate::observer::{MigrationObserver, TracingObserver};
use crate::snapshot::{create_snapshot, schema_hash, Snapshot};
use crate::spec::TableSpec;
use crate::validate::{validate_migration, SqlValidator, StructuralValidator};

/// Options for one planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    /// Name recorded in the new snapshot.
    pub migration_name: String,
    /// Emit `CREATE TABLE IF NOT EXISTS` in initial scripts.
    pub if_not_exists: bool,
    /// Run the syntax validator over the generated SQL.
    pub validate_syntax: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            migration_name: "migration".to_string(),
            if_not_exists: false,
            validate_syntax: true,
        }
    }
}

impl PlanOptions {
    /// Sets the migration name.
    #[must_use]
    pub fn migration_name(mut self, name: impl Into<String>) -> Self {
        self.migration_name = name.into();
        self
    }

    /// Sets `IF NOT EXISTS` for initial scripts.
    #[must_use]
    pub fn if_not_exists(mut self, if_not_exists: bool) -> Self {
        self.if_not_exists = if_not_exists;
        self
    }

    /// Enables or disables syntax validation.
    #[must_use]
    pub fn validate_syntax(mut self, validate: bool) -> Self {
        self.validate_syntax = validate;
        self
    }
}

/// Result of a planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Snapshot of the new schema; persist it once the SQL is applied.
    pub snapshot: Snapshot,
    /// Structural diff against the previous snapshot.
    pub diff: SchemaDiff,
    /// Statements to run.
    pub migration: Migration,
    /// Whether the hash matched and diffing was skipped.
    pub unchanged: bool,
}

impl MigrationPlan {
    /// The SQL, one statement per line.
    #[must_use]
    pub fn sql(&self) -> String {
        self.migration.to_sql()
    }
}

/// Migration pipeline for one dialect.
pub struct Pipeline<'a> {
    dialect: &'a dyn Dialect,
    observer: &'a dyn MigrationObserver,
    validator: &'a dyn SqlValidator,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline reporting to `tracing` and validating with
    /// [`StructuralValidator`].
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            observer: &TracingObserver,
            validator: &StructuralValidator,
        }
    }

    /// Replaces the observer.
    #[must_use]
    pub fn observer(mut self, observer: &'a dyn MigrationObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the syntax validator.
    #[must_use]
    pub fn validator(mut self, validator: &'a dyn SqlValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Extracts, maps and snapshots `tables`.
    pub fn snapshot(&self, tables: &[TableSpec], migration_name: &str) -> Result<Snapshot> {
        let identities = ColumnIdentities::from_tables(tables)?;
        let mut extracted = Vec::with_capacity(tables.len());
        for spec in tables {
            let table = extract_table_with(spec, &identities)?;
            self.observer.table_extracted(&table);
            extracted.push(table);
        }

        let mapped = map_schema(&extracted, self.dialect);
        self.observer.schema_mapped(self.dialect.name(), mapped.len());
        create_snapshot(mapped.into_values(), migration_name)
    }

    /// Plans the migration from `previous` to `tables`.
    ///
    /// Without a previous snapshot the migration is the full create
    /// script.
    pub fn plan(
        &self,
        tables: &[TableSpec],
        previous: Option<&Snapshot>,
        options: &PlanOptions,
    ) -> Result<MigrationPlan> {
        let snapshot = self.snapshot(tables, &options.migration_name)?;

        if let Some(previous) = previous {
            // The stored hash may be stale; only the tables are trusted.
            if schema_hash(&previous.tables)? == snapshot.schema_hash {
                self.observer.hash_short_circuit(&snapshot.schema_hash);
                return Ok(MigrationPlan {
                    snapshot,
                    diff: SchemaDiff::default(),
                    migration: Migration::default(),
                    unchanged: true,
                });
            }
        }

        let (diff, migration) = match previous {
            Some(previous) => {
                let diff = diff_snapshots(previous, &snapshot);
                self.observer.diff_computed(&diff);
                let migration = generate_migration_with(
                    &diff,
                    &snapshot,
                    self.dialect,
                    Some(previous),
                    self.observer,
                )?;
                (diff, migration)
            }
            None => {
                let diff = SchemaDiff {
                    added_tables: snapshot.tables.values().cloned().collect(),
                    ..SchemaDiff::default()
                };
                self.observer.diff_computed(&diff);
                let migration =
                    generate_create_script(&snapshot, self.dialect, options.if_not_exists)?;
                self.observer
                    .statements_generated(self.dialect.name(), migration.len());
                (diff, migration)
            }
        };

        if options.validate_syntax {
            validate_migration(self.validator, self.dialect.name(), &migration)?;
        }

        Ok(MigrationPlan {
            snapshot,
            diff,
            migration,
            unchanged: false,
        })
    }
}

/// Plans a migration with the default observer and validator.
pub fn plan_migration(
    tables: &[TableSpec],
    dialect: &dyn Dialect,
    previous: Option<&Snapshot>,
    options: &PlanOptions,
) -> Result<MigrationPlan> {
    Pipeline::new(dialect).plan(tables, previous, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};
    use crate::error::SchemaError;
    use crate::observer::NoopObserver;
    use crate::spec::ColumnSpec;
    use crate::types::AbstractType;

    fn users() -> TableSpec {
        TableSpec::new("users")
            .column(ColumnSpec::new("id", AbstractType::Text).primary_key())
            .column(ColumnSpec::new("name", AbstractType::Text).not_null())
    }

    struct RejectAll;

    impl SqlValidator for RejectAll {
        fn validate(&self, _dialect: &str, _statement: &str) -> std::result::Result<(), String> {
            Err("parser unavailable".to_string())
        }
    }

    #[test]
    fn test_initial_plan_is_create_script() {
        let plan = plan_migration(&[users()], &PostgresDialect, None, &PlanOptions::default()).unwrap();
        assert!(!plan.unchanged);
        assert_eq!(plan.diff.added_tables.len(), 1);
        assert_eq!(
            plan.sql(),
            "CREATE TABLE \"users\" (\n  \"id\" TEXT PRIMARY KEY,\n  \"name\" TEXT NOT NULL\n);"
        );
    }

    #[test]
    fn test_same_hash_short_circuits() {
        let pipeline = Pipeline::new(&SqliteDialect).observer(&NoopObserver);
        let first = pipeline.plan(&[users()], None, &PlanOptions::default()).unwrap();
        let second = pipeline
            .plan(&[users()], Some(&first.snapshot), &PlanOptions::default())
            .unwrap();
        assert!(second.unchanged);
        assert!(second.diff.is_empty());
        assert!(second.migration.is_empty());
    }

    #[test]
    fn test_stale_previous_hash_still_diffs() {
        let pipeline = Pipeline::new(&PostgresDialect).observer(&NoopObserver);
        let with_bio = users().column(ColumnSpec::new("bio", AbstractType::Text));
        let target = pipeline.snapshot(&[with_bio.clone()], "target").unwrap();

        let mut previous = pipeline.snapshot(&[users()], "previous").unwrap();
        previous.schema_hash = target.schema_hash;

        let plan = pipeline
            .plan(&[with_bio], Some(&previous), &PlanOptions::default())
            .unwrap();
        assert!(!plan.unchanged);
        assert_eq!(plan.sql(), "ALTER TABLE \"users\" ADD COLUMN \"bio\" TEXT;");
    }

    #[test]
    fn test_validation_failure_is_fatal() {
        let pipeline = Pipeline::new(&PostgresDialect)
            .observer(&NoopObserver)
            .validator(&RejectAll);
        let err = pipeline
            .plan(&[users()], None, &PlanOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::SyntaxValidation { .. }));

        let skipped = pipeline
            .plan(&[users()], None, &PlanOptions::default().validate_syntax(false))
            .unwrap();
        assert_eq!(skipped.migration.len(), 1);
    }

    #[test]
    fn test_snapshot_name_recorded() {
        let options = PlanOptions::default().migration_name("0001_initial");
        let plan = plan_migration(&[users()], &PostgresDialect, None, &options).unwrap();
        assert_eq!(plan.snapshot.migration_name, "0001_initial");
        assert_eq!(plan.snapshot.version, crate::snapshot::SNAPSHOT_VERSION);
    }
}
