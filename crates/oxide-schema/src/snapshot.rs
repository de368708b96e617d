//! Hashed, versioned schema snapshots.
//!
//! A snapshot records the dialect-specific metadata of every table at one
//! point in time. Its `schemaHash` is the SHA-256 of a canonical form of
//! the table map: tables, columns and every constraint list are sorted,
//! so the hash does not depend on declaration or iteration order.
//! Loading and saving the JSON is the caller's business; this module only
//! converts between values and strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, SchemaError};
use crate::metadata::TableMetadata;

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A persisted schema state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    /// Name of the migration that produced this state.
    pub migration_name: String,
    /// Tables keyed by name.
    pub tables: BTreeMap<String, TableMetadata>,
    /// Lower-hex SHA-256 of the canonical table map.
    pub schema_hash: String,
}

impl Snapshot {
    /// Parses a snapshot and checks its version and hash.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SchemaError::UnsupportedSnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        snapshot.verify_hash()?;
        Ok(snapshot)
    }

    /// Serializes the snapshot as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that the stored hash matches the table content.
    pub fn verify_hash(&self) -> Result<()> {
        let computed = schema_hash(&self.tables)?;
        if computed != self.schema_hash {
            return Err(SchemaError::HashMismatch {
                migration: self.migration_name.clone(),
                stored: self.schema_hash.clone(),
                computed,
            });
        }
        Ok(())
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.get(name)
    }
}

/// Creates a snapshot stamped with the current time.
pub fn create_snapshot<I>(tables: I, migration_name: &str) -> Result<Snapshot>
where
    I: IntoIterator<Item = TableMetadata>,
{
    create_snapshot_at(tables, migration_name, chrono::Utc::now().timestamp_millis())
}

/// Creates a snapshot with an explicit timestamp.
pub fn create_snapshot_at<I>(tables: I, migration_name: &str, timestamp: i64) -> Result<Snapshot>
where
    I: IntoIterator<Item = TableMetadata>,
{
    let tables: BTreeMap<String, TableMetadata> =
        tables.into_iter().map(|t| (t.name.clone(), t)).collect();
    let schema_hash = schema_hash(&tables)?;
    Ok(Snapshot {
        version: SNAPSHOT_VERSION,
        timestamp,
        migration_name: migration_name.to_string(),
        tables,
        schema_hash,
    })
}

/// Computes the content hash of a table map.
pub fn schema_hash(tables: &BTreeMap<String, TableMetadata>) -> Result<String> {
    let canonical: BTreeMap<&String, TableMetadata> = tables
        .iter()
        .map(|(name, table)| (name, canonicalize(table)))
        .collect();
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

fn canonicalize(table: &TableMetadata) -> TableMetadata {
    let mut table = table.clone();
    table.columns.sort_keys();
    for column in table.columns.values_mut() {
        if let Some(values) = column.enum_values.as_mut() {
            values.sort();
        }
    }
    table.primary_keys.sort();
    for fk in &mut table.foreign_keys {
        let mut pairs: Vec<(String, String)> = fk
            .columns
            .drain(..)
            .zip(fk.ref_columns.drain(..))
            .collect();
        pairs.sort();
        let (columns, ref_columns): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
        fk.columns = columns;
        fk.ref_columns = ref_columns;
    }
    table
        .foreign_keys
        .sort_by(|a, b| (&a.columns, &a.ref_table).cmp(&(&b.columns, &b.ref_table)));
    for unique in &mut table.unique_constraints {
        unique.columns.sort();
    }
    table
        .unique_constraints
        .sort_by(|a, b| (&a.columns, &a.name).cmp(&(&b.columns, &b.name)));
    table.indexes.sort_by(|a, b| a.name.cmp(&b.name));
    table
}
