//! Error types for schema extraction, diffing and DDL generation.
//!
//! Every error is fatal to the generation call that raised it: no partial
//! or best-effort SQL is ever returned alongside an error.

/// Broad classification of a [`SchemaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The table definitions could not be turned into abstract metadata.
    Extraction,
    /// The metadata or diff describes something that cannot be emitted.
    Validation,
    /// The generator broke one of its own guarantees.
    GenerationInvariant,
    /// The generated SQL was rejected by a dialect syntax validator.
    SyntaxValidation,
    /// A snapshot could not be read or written.
    Serialization,
}

/// Errors that can occur while producing a migration.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A foreign key points at a column no table in the schema declares.
    #[error("Unresolved reference on '{table}.{column}': no table declares column '{target}'")]
    UnresolvedReference {
        /// Table holding the reference.
        table: String,
        /// Column holding the reference.
        column: String,
        /// The referenced column identity, as `table.column`.
        target: String,
    },

    /// A column specification carries options that do not fit its type.
    #[error("Malformed column '{table}.{column}': {reason}")]
    MalformedColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// What is wrong with the specification.
        reason: String,
    },

    /// Two tables in one schema share a name.
    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),

    /// Two columns in one table share a name.
    #[error("Column '{column}' is declared more than once in table '{table}'")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A table-level constraint names a column the table does not have.
    #[error("Constraint on table '{table}' references unknown column '{column}'")]
    UnknownConstraintColumn {
        /// Table name.
        table: String,
        /// The missing column.
        column: String,
    },

    /// A constraint or index name contains characters outside `[A-Za-z0-9_$]`.
    #[error("Invalid {kind} name '{name}': only [A-Za-z0-9_$] are allowed")]
    InvalidIdentifier {
        /// What the identifier names ("index", "constraint", ...).
        kind: &'static str,
        /// The rejected identifier.
        name: String,
    },

    /// A foreign key does not target a primary key or unique column set.
    #[error(
        "Foreign key {table}({columns}) -> {references_table}({references_columns}) \
         must target the primary key or a unique constraint of '{references_table}'"
    )]
    InvalidForeignKey {
        /// Referencing table.
        table: String,
        /// Referencing columns, comma separated.
        columns: String,
        /// Referenced table.
        references_table: String,
        /// Referenced columns, comma separated.
        references_columns: String,
    },

    /// Generation needed a table that is not part of the snapshot.
    #[error("Table '{0}' is not present in the target snapshot")]
    UnknownTable(String),

    /// A column change cannot be rendered by the generator.
    #[error("Unsupported change '{change}' on column '{table}.{column}'")]
    UnsupportedChange {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Description of the change.
        change: String,
    },

    /// The foreign-key graph contains a cycle.
    #[error("Circular foreign key dependency detected involving table '{table}' ({})", .path.join(" -> "))]
    CircularDependency {
        /// A table that participates in the cycle.
        table: String,
        /// The cycle, starting and ending at `table`.
        path: Vec<String>,
    },

    /// A non-empty diff produced no statements.
    #[error("Diff for {tables} table(s) is not empty but produced no SQL statements")]
    EmptyMigration {
        /// Number of tables touched by the diff.
        tables: usize,
    },

    /// The generated SQL was rejected by the dialect's validator.
    #[error("Generated {dialect} SQL failed validation: {message}")]
    SyntaxValidation {
        /// Dialect name the validator was keyed by.
        dialect: String,
        /// Validator message.
        message: String,
    },

    /// A persisted snapshot has a version this crate cannot read.
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshotVersion {
        /// Version found in the snapshot.
        found: u32,
        /// Version this crate writes.
        expected: u32,
    },

    /// A persisted snapshot's hash does not match its content.
    #[error("Snapshot '{migration}' hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch {
        /// Migration name recorded in the snapshot.
        migration: String,
        /// Hash stored in the snapshot.
        stored: String,
        /// Hash computed from the tables.
        computed: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SchemaError {
    /// Returns the taxonomy bucket this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnresolvedReference { .. }
            | Self::MalformedColumn { .. }
            | Self::DuplicateTable(_)
            | Self::DuplicateColumn { .. }
            | Self::UnknownConstraintColumn { .. } => ErrorKind::Extraction,
            Self::InvalidIdentifier { .. }
            | Self::InvalidForeignKey { .. }
            | Self::UnknownTable(_)
            | Self::UnsupportedChange { .. }
            | Self::CircularDependency { .. } => ErrorKind::Validation,
            Self::EmptyMigration { .. } => ErrorKind::GenerationInvariant,
            Self::SyntaxValidation { .. } => ErrorKind::SyntaxValidation,
            Self::UnsupportedSnapshotVersion { .. }
            | Self::HashMismatch { .. }
            | Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    pub(crate) fn malformed(
        table: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedColumn {
            table: table.into(),
            column: column.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_path() {
        let err = SchemaError::CircularDependency {
            table: "a".to_string(),
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Circular foreign key dependency detected involving table 'a' (a -> b -> a)"
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            SchemaError::malformed("t", "c", "bad").kind(),
            ErrorKind::Extraction
        );
        assert_eq!(
            SchemaError::EmptyMigration { tables: 1 }.kind(),
            ErrorKind::GenerationInvariant
        );
        assert_eq!(
            SchemaError::SyntaxValidation {
                dialect: "sqlite".to_string(),
                message: "x".to_string()
            }
            .kind(),
            ErrorKind::SyntaxValidation
        );
    }
}
