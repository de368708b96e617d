//! Pipeline diagnostics.
//!
//! The pipeline itself never logs. It reports progress to a
//! [`MigrationObserver`], and [`TracingObserver`] forwards those reports
//! to `tracing`.

use tracing::{debug, info, warn};

use crate::diff::SchemaDiff;
use crate::extract::AbstractTable;

/// Receives progress reports from the migration pipeline.
///
/// Every method has an empty default, so implementors only override what
/// they care about.
pub trait MigrationObserver: Send + Sync {
    /// A table was extracted.
    fn table_extracted(&self, _table: &AbstractTable) {}

    /// The schema was mapped through a dialect.
    fn schema_mapped(&self, _dialect: &str, _tables: usize) {}

    /// The previous snapshot had the same hash; diffing was skipped.
    fn hash_short_circuit(&self, _hash: &str) {}

    /// A diff was computed.
    fn diff_computed(&self, _diff: &SchemaDiff) {}

    /// A table is rebuilt through a shadow table.
    fn table_recreated(&self, _table: &str, _reason: &str) {}

    /// Statements were generated.
    fn statements_generated(&self, _dialect: &str, _count: usize) {}
}

/// Ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MigrationObserver for NoopObserver {}

/// Forwards reports to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn table_extracted(&self, table: &AbstractTable) {
        debug!(
            table = %table.name,
            columns = table.columns.len(),
            "Extracted table"
        );
    }

    fn schema_mapped(&self, dialect: &str, tables: usize) {
        debug!(dialect, tables, "Mapped schema");
    }

    fn hash_short_circuit(&self, hash: &str) {
        info!(hash, "Schema unchanged, skipping diff");
    }

    fn diff_computed(&self, diff: &SchemaDiff) {
        info!(
            added = diff.added_tables.len(),
            removed = diff.removed_tables.len(),
            modified = diff.modified_tables.len(),
            "Computed schema diff"
        );
    }

    fn table_recreated(&self, table: &str, reason: &str) {
        warn!(table, reason, "Recreating table through a shadow copy");
    }

    fn statements_generated(&self, dialect: &str, count: usize) {
        info!(dialect, count, "Generated migration statements");
    }
}
