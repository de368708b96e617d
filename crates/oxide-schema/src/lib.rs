//! Dialect-aware schema diffing and DDL migration generation.
//!
//! `oxide-schema` turns an abstract description of a set of tables into
//! ordered DDL for a Postgres-like or a SQLite-like database:
//! - Table definitions are extracted into dialect-agnostic metadata
//! - Metadata is rendered per dialect and snapshotted with a content hash
//! - Snapshots are diffed structurally, column dimension by dimension
//! - Diffs are rendered into SQL, recreating tables where SQLite cannot
//!   alter them in place
//!
//! # Architecture
//!
//! - **Spec** - Input contract: `TableSpec`, `ColumnSpec`
//! - **Extract** - Two-pass extraction with `(table, column)` identities
//! - **Dialect** - Type, default and statement rendering
//! - **Metadata** - Dialect-specific value objects and the type mapper
//! - **Snapshot** - Versioned, SHA-256 hashed schema states
//! - **Diff** - Structural comparison of two snapshots
//! - **Sorter** - Foreign-key dependency ordering with cycle detection
//! - **Generate** - DDL rendering, including shadow-table recreation
//! - **Engine** - The whole pipeline behind one call
//!
//! # Example
//!
//! ```rust
//! use oxide_schema::prelude::*;
//!
//! let users = TableSpec::new("users")
//!     .column(ColumnSpec::new("id", AbstractType::Text).primary_key())
//!     .column(ColumnSpec::new("name", AbstractType::Text).not_null());
//!
//! let plan = plan_migration(&[users], &PostgresDialect, None, &PlanOptions::default())?;
//! assert_eq!(
//!     plan.sql(),
//!     "CREATE TABLE \"users\" (\n  \"id\" TEXT PRIMARY KEY,\n  \"name\" TEXT NOT NULL\n);"
//! );
//! # Ok::<(), oxide_schema::error::SchemaError>(())
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Full create script for a schema
//! oxide-schema --dialect sqlite create-script --schema tables.json
//!
//! # Migration from a stored snapshot, writing the new snapshot
//! oxide-schema --dialect postgres generate --schema tables.json \
//!     --previous snapshot.json --snapshot-out snapshot.json --name 0002_add_email
//! ```

pub mod dialect;
pub mod diff;
pub mod engine;
pub mod error;
pub mod extract;
pub mod generate;
pub mod metadata;
pub mod observer;
pub mod snapshot;
pub mod sorter;
pub mod spec;
pub mod types;
pub mod validate;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{Dialect, DialectKind, PostgresDialect, SqliteDialect};
    pub use crate::diff::{
        compare_tables, diff_schemas, diff_snapshots, ColumnChange, ColumnDiff, SchemaDiff,
        TableDiff,
    };
    pub use crate::engine::{plan_migration, MigrationPlan, PlanOptions, Pipeline};
    pub use crate::error::{ErrorKind, Result, SchemaError};
    pub use crate::extract::{extract_schema, extract_table, AbstractColumn, AbstractTable};
    pub use crate::generate::{
        generate_create_script, generate_create_table, generate_migration, Migration,
    };
    pub use crate::metadata::{
        map_schema, map_table, ColumnMetadata, ForeignKeyMetadata, IndexMetadata,
        TableMetadata, UniqueConstraintMetadata,
    };
    pub use crate::observer::{MigrationObserver, NoopObserver, TracingObserver};
    pub use crate::snapshot::{create_snapshot, Snapshot, SNAPSHOT_VERSION};
    pub use crate::sorter::{sort_tables, DependencyGraph};
    pub use crate::spec::{ColumnRef, ColumnSpec, DefaultSpec, TableConstraintSpec, TableSpec};
    pub use crate::types::{
        AbstractType, ColumnOptions, DefaultValue, ForeignKeyAction, LiteralValue, SqlFragment,
    };
    pub use crate::validate::{SqlValidator, StructuralValidator};
}
