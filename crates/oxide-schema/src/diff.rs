//! Structural schema comparison.
//!
//! [`compare_tables`] reports every dimension of a column change on its
//! own, so the generator can decide how to combine them. Constraint lists
//! are compared by canonical form, which makes the comparison independent
//! of declaration order.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::Hash;

use serde::Serialize;

use crate::metadata::{
    ColumnMetadata, ForeignKeyMetadata, IndexMetadata, TableMetadata, UniqueConstraintMetadata,
};
use crate::snapshot::Snapshot;

/// How a column obtains a value when none is supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "sql")]
pub enum DefaultState {
    /// No default.
    None,
    /// A database default with its rendered SQL.
    Database(String),
    /// Supplied by the application.
    Application,
}

impl DefaultState {
    /// Reads the default state of a column.
    #[must_use]
    pub fn of(column: &ColumnMetadata) -> Self {
        if column.application_default {
            Self::Application
        } else if column.has_default {
            Self::Database(column.default_value.clone().unwrap_or_default())
        } else {
            Self::None
        }
    }
}

/// One independently reported dimension of a column change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ColumnChange {
    /// The type family changed.
    Type {
        /// Old SQL type.
        from: String,
        /// New SQL type.
        to: String,
    },
    /// The maximum length changed.
    Length {
        /// Old length.
        from: Option<u32>,
        /// New length.
        to: Option<u32>,
    },
    /// The numeric precision changed.
    Precision {
        /// Old precision.
        from: Option<u32>,
        /// New precision.
        to: Option<u32>,
    },
    /// The numeric scale changed.
    Scale {
        /// Old scale.
        from: Option<u32>,
        /// New scale.
        to: Option<u32>,
    },
    /// The enum value set changed.
    EnumValues {
        /// Old values, sorted.
        from: Option<Vec<String>>,
        /// New values, sorted.
        to: Option<Vec<String>>,
    },
    /// Nullability changed.
    Nullable {
        /// Old nullability.
        from: bool,
        /// New nullability.
        to: bool,
    },
    /// The default changed.
    Default {
        /// Old default.
        from: DefaultState,
        /// New default.
        to: DefaultState,
    },
    /// A change the generator has no rendering for.
    Other {
        /// Change category.
        category: String,
        /// Human-readable description.
        description: String,
    },
}

impl ColumnChange {
    /// Whether the change affects the column's SQL type.
    #[must_use]
    pub fn is_type_change(&self) -> bool {
        matches!(
            self,
            Self::Type { .. }
                | Self::Length { .. }
                | Self::Precision { .. }
                | Self::Scale { .. }
                | Self::EnumValues { .. }
        )
    }

    /// The category name of this change.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::Type { .. } => "type",
            Self::Length { .. } => "length",
            Self::Precision { .. } => "precision",
            Self::Scale { .. } => "scale",
            Self::EnumValues { .. } => "enum",
            Self::Nullable { .. } => "nullable",
            Self::Default { .. } => "default",
            Self::Other { category, .. } => category.as_str(),
        }
    }
}

impl std::fmt::Display for ColumnChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn opt(value: Option<u32>) -> String {
            value.map_or_else(|| "none".to_string(), |v| v.to_string())
        }
        match self {
            Self::Type { from, to } => write!(f, "type {from} -> {to}"),
            Self::Length { from, to } => write!(f, "length {} -> {}", opt(*from), opt(*to)),
            Self::Precision { from, to } => write!(f, "precision {} -> {}", opt(*from), opt(*to)),
            Self::Scale { from, to } => write!(f, "scale {} -> {}", opt(*from), opt(*to)),
            Self::EnumValues { from, to } => {
                let show = |v: &Option<Vec<String>>| {
                    v.as_ref()
                        .map_or_else(|| "none".to_string(), |v| format!("[{}]", v.join(", ")))
                };
                write!(f, "enum {} -> {}", show(from), show(to))
            }
            Self::Nullable { from, to } => write!(f, "nullable {from} -> {to}"),
            Self::Default { from, to } => write!(f, "default {from:?} -> {to:?}"),
            Self::Other { description, .. } => f.write_str(description),
        }
    }
}

/// All changes to one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDiff {
    /// Column name.
    pub column_name: String,
    /// Changes, at least one.
    pub changes: Vec<ColumnChange>,
}

/// A primary key change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimaryKeyChange {
    /// Old key columns, sorted.
    pub from: Vec<String>,
    /// New key columns, sorted.
    pub to: Vec<String>,
}

/// Differences between two versions of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDiff {
    /// Table name.
    pub table_name: String,
    /// Columns only in the new table, in declaration order.
    pub added_columns: Vec<ColumnMetadata>,
    /// Columns only in the old table.
    pub removed_columns: Vec<String>,
    /// Columns present in both with at least one change.
    pub modified_columns: Vec<ColumnDiff>,
    /// Foreign keys only in the new table.
    pub added_foreign_keys: Vec<ForeignKeyMetadata>,
    /// Foreign keys only in the old table.
    pub removed_foreign_keys: Vec<ForeignKeyMetadata>,
    /// Unique constraints only in the new table.
    pub added_unique_constraints: Vec<UniqueConstraintMetadata>,
    /// Unique constraints only in the old table.
    pub removed_unique_constraints: Vec<UniqueConstraintMetadata>,
    /// Indexes only in the new table.
    pub added_indexes: Vec<IndexMetadata>,
    /// Indexes only in the old table.
    pub removed_indexes: Vec<IndexMetadata>,
    /// Primary key change, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKeyChange>,
}

impl TableDiff {
    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.added_foreign_keys.is_empty()
            && self.removed_foreign_keys.is_empty()
            && self.added_unique_constraints.is_empty()
            && self.removed_unique_constraints.is_empty()
            && self.added_indexes.is_empty()
            && self.removed_indexes.is_empty()
            && self.primary_key.is_none()
    }

    /// Whether the column is added or modified by this diff.
    #[must_use]
    pub fn touches_column(&self, name: &str) -> bool {
        self.added_columns.iter().any(|c| c.name == name)
            || self.modified_columns.iter().any(|c| c.column_name == name)
    }
}

/// Differences between two schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDiff {
    /// Tables only in the new schema, sorted by name.
    pub added_tables: Vec<TableMetadata>,
    /// Tables only in the old schema, sorted by name.
    pub removed_tables: Vec<String>,
    /// Tables in both with at least one change, sorted by name.
    pub modified_tables: Vec<TableDiff>,
}

impl SchemaDiff {
    /// Whether the schemas are equal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.modified_tables.is_empty()
    }

    /// Number of tables touched.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.added_tables.len() + self.removed_tables.len() + self.modified_tables.len()
    }
}

/// Compares two schemas.
#[must_use]
pub fn diff_schemas(
    old: &BTreeMap<String, TableMetadata>,
    new: &BTreeMap<String, TableMetadata>,
) -> SchemaDiff {
    let added_tables = new
        .iter()
        .filter(|(name, _)| !old.contains_key(*name))
        .map(|(_, table)| table.clone())
        .collect();
    let removed_tables = old
        .keys()
        .filter(|name| !new.contains_key(*name))
        .cloned()
        .collect();
    let modified_tables = new
        .iter()
        .filter_map(|(name, table)| old.get(name).and_then(|previous| compare_tables(previous, table)))
        .collect();

    SchemaDiff {
        added_tables,
        removed_tables,
        modified_tables,
    }
}

/// Compares the tables of two snapshots.
#[must_use]
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> SchemaDiff {
    diff_schemas(&old.tables, &new.tables)
}

/// Compares two versions of a table; `None` when nothing changed.
#[must_use]
pub fn compare_tables(old: &TableMetadata, new: &TableMetadata) -> Option<TableDiff> {
    let added_columns = new
        .columns
        .values()
        .filter(|c| !old.columns.contains_key(&c.name))
        .cloned()
        .collect();
    let removed_columns = old
        .columns
        .keys()
        .filter(|name| !new.columns.contains_key(*name))
        .cloned()
        .collect();
    let modified_columns = new
        .columns
        .values()
        .filter_map(|column| {
            let previous = old.columns.get(&column.name)?;
            let changes = compare_columns(previous, column);
            (!changes.is_empty()).then(|| ColumnDiff {
                column_name: column.name.clone(),
                changes,
            })
        })
        .collect();

    let (added_foreign_keys, removed_foreign_keys) =
        set_difference(&old.foreign_keys, &new.foreign_keys, ForeignKeyMetadata::canonical);
    let (added_unique_constraints, removed_unique_constraints) = set_difference(
        &old.unique_constraints,
        &new.unique_constraints,
        UniqueConstraintMetadata::canonical,
    );
    let (added_indexes, removed_indexes) =
        set_difference(&old.indexes, &new.indexes, IndexMetadata::canonical);

    let old_pk: BTreeSet<&String> = old.primary_keys.iter().collect();
    let new_pk: BTreeSet<&String> = new.primary_keys.iter().collect();
    let primary_key = (old_pk != new_pk).then(|| PrimaryKeyChange {
        from: old_pk.into_iter().cloned().collect(),
        to: new_pk.into_iter().cloned().collect(),
    });

    let diff = TableDiff {
        table_name: new.name.clone(),
        added_columns,
        removed_columns,
        modified_columns,
        added_foreign_keys,
        removed_foreign_keys,
        added_unique_constraints,
        removed_unique_constraints,
        added_indexes,
        removed_indexes,
        primary_key,
    };
    (!diff.is_empty()).then_some(diff)
}

/// Returns `(added, removed)` by canonical form.
fn set_difference<'a, T, K, F>(old: &'a [T], new: &'a [T], key: F) -> (Vec<T>, Vec<T>)
where
    T: Clone,
    K: Eq + Hash + 'a,
    F: Fn(&'a T) -> K,
{
    let old_keys: HashSet<K> = old.iter().map(&key).collect();
    let new_keys: HashSet<K> = new.iter().map(&key).collect();
    let added = new
        .iter()
        .filter(|item| !old_keys.contains(&key(*item)))
        .cloned()
        .collect();
    let removed = old
        .iter()
        .filter(|item| !new_keys.contains(&key(*item)))
        .cloned()
        .collect();
    (added, removed)
}

/// Compares two versions of a column, one entry per changed dimension.
#[must_use]
pub fn compare_columns(old: &ColumnMetadata, new: &ColumnMetadata) -> Vec<ColumnChange> {
    let mut changes = Vec::new();
    let old_type = NormalizedType::of(old);
    let new_type = NormalizedType::of(new);

    if old_type.family == new_type.family {
        if old_type.family == "string" {
            // Only compared when both sides declare a length.
            if let (Some(from), Some(to)) = (old_type.length, new_type.length) {
                if from != to {
                    changes.push(ColumnChange::Length {
                        from: Some(from),
                        to: Some(to),
                    });
                }
            }
        } else if old_type.family == "numeric" {
            if old_type.precision != new_type.precision {
                changes.push(ColumnChange::Precision {
                    from: old_type.precision,
                    to: new_type.precision,
                });
            }
            if old_type.scale != new_type.scale {
                changes.push(ColumnChange::Scale {
                    from: old_type.scale,
                    to: new_type.scale,
                });
            }
        }
    } else {
        changes.push(ColumnChange::Type {
            from: old.sql_type.clone(),
            to: new.sql_type.clone(),
        });
    }

    let old_enum = sorted_enum(old);
    let new_enum = sorted_enum(new);
    if old_enum != new_enum {
        changes.push(ColumnChange::EnumValues {
            from: old_enum,
            to: new_enum,
        });
    }

    if old.nullable != new.nullable {
        changes.push(ColumnChange::Nullable {
            from: old.nullable,
            to: new.nullable,
        });
    }

    let old_default = DefaultState::of(old);
    let new_default = DefaultState::of(new);
    if old_default != new_default {
        changes.push(ColumnChange::Default {
            from: old_default,
            to: new_default,
        });
    }

    changes
}

fn sorted_enum(column: &ColumnMetadata) -> Option<Vec<String>> {
    column.enum_values.as_ref().map(|values| {
        let mut sorted = values.clone();
        sorted.sort();
        sorted.dedup();
        sorted
    })
}

/// A SQL type reduced to its family and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedType {
    /// Type family.
    pub family: String,
    /// Declared length.
    pub length: Option<u32>,
    /// Declared precision.
    pub precision: Option<u32>,
    /// Declared scale.
    pub scale: Option<u32>,
}

impl NormalizedType {
    /// Normalizes a column's type, preferring the retained options over
    /// parameters parsed from the type string.
    #[must_use]
    pub fn of(column: &ColumnMetadata) -> Self {
        let parsed = Self::parse(&column.sql_type);
        Self {
            length: column.length.or(parsed.length),
            precision: column.precision.or(parsed.precision),
            scale: column.scale.or(parsed.scale),
            family: parsed.family,
        }
    }

    /// Normalizes a bare SQL type string.
    #[must_use]
    pub fn parse(sql_type: &str) -> Self {
        let lowered = sql_type.trim().to_ascii_lowercase().replace('"', "");
        let unprefixed = lowered.strip_prefix("pg_catalog.").unwrap_or(&lowered);

        let (base, params) = match unprefixed.split_once('(') {
            Some((base, rest)) => {
                let inner = rest.split(')').next().unwrap_or_default();
                let params: Vec<u32> = inner
                    .split(',')
                    .filter_map(|p| p.trim().parse().ok())
                    .collect();
                (base.trim(), params)
            }
            None => (unprefixed.trim(), Vec::new()),
        };

        let family = type_family(base);
        let (length, precision, scale) = match family {
            "string" => (params.first().copied(), None, None),
            "numeric" => (None, params.first().copied(), params.get(1).copied()),
            _ => (None, None, None),
        };
        Self {
            family: family.to_string(),
            length,
            precision,
            scale,
        }
    }
}

fn type_family(base: &str) -> &str {
    match base {
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar"
        | "nvarchar" | "string" | "citext" => "string",
        "int" | "integer" | "int4" | "serial" | "serial4" => "int4",
        "bigint" | "int8" | "bigserial" | "serial8" => "int8",
        "smallint" | "int2" | "smallserial" => "int2",
        "real" | "float4" => "float4",
        "double precision" | "double" | "float8" | "float" => "float8",
        "numeric" | "decimal" => "numeric",
        "boolean" | "bool" => "bool",
        "timestamp" | "timestamp without time zone" | "datetime" => "timestamp",
        "timestamptz" | "timestamp with time zone" => "timestamptz",
        "time" | "time without time zone" => "time",
        "bytea" | "blob" | "binary" => "binary",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn users() -> TableMetadata {
        TableMetadata::new("users")
            .column(ColumnMetadata::new("id", "TEXT"))
            .column(ColumnMetadata::new("name", "TEXT").not_null())
            .primary_key(["id"])
    }

    #[test]
    fn test_identical_tables_have_no_diff() {
        assert_eq!(compare_tables(&users(), &users()), None);
    }

    #[test]
    fn test_added_and_removed_columns() {
        let new = TableMetadata::new("users")
            .column(ColumnMetadata::new("id", "TEXT"))
            .column(ColumnMetadata::new("email", "TEXT"))
            .primary_key(["id"]);
        let diff = compare_tables(&users(), &new).unwrap();
        assert_eq!(diff.added_columns[0].name, "email");
        assert_eq!(diff.removed_columns, vec!["name"]);
        assert!(diff.modified_columns.is_empty());
    }

    #[test]
    fn test_type_family_equivalence() {
        let text = ColumnMetadata::new("c", "TEXT");
        let varchar = ColumnMetadata::new("c", "character varying");
        assert!(compare_columns(&text, &varchar).is_empty());

        let pg_int = ColumnMetadata::new("c", "pg_catalog.int4");
        let int = ColumnMetadata::new("c", "INTEGER");
        assert!(compare_columns(&pg_int, &int).is_empty());

        let big = ColumnMetadata::new("c", "BIGINT");
        assert_eq!(
            compare_columns(&int, &big),
            vec![ColumnChange::Type {
                from: "INTEGER".to_string(),
                to: "BIGINT".to_string()
            }]
        );
    }

    #[test]
    fn test_length_compared_only_when_both_declared() {
        let short = ColumnMetadata::new("c", "VARCHAR(50)").length(50);
        let long = ColumnMetadata::new("c", "VARCHAR(100)").length(100);
        let text = ColumnMetadata::new("c", "TEXT");

        assert_eq!(
            compare_columns(&short, &long),
            vec![ColumnChange::Length {
                from: Some(50),
                to: Some(100)
            }]
        );
        assert!(compare_columns(&text, &long).is_empty());
    }

    #[test]
    fn test_numeric_precision_parsed_from_type() {
        let a = ColumnMetadata::new("c", "NUMERIC(10, 2)");
        let b = ColumnMetadata::new("c", "numeric(12,2)");
        assert_eq!(
            compare_columns(&a, &b),
            vec![ColumnChange::Precision {
                from: Some(10),
                to: Some(12)
            }]
        );
    }

    #[test]
    fn test_enum_compared_as_sorted_set() {
        let a = ColumnMetadata::new("s", "TEXT").enum_values(["b", "a"]);
        let b = ColumnMetadata::new("s", "TEXT").enum_values(["a", "b"]);
        assert!(compare_columns(&a, &b).is_empty());

        let c = ColumnMetadata::new("s", "TEXT").enum_values(["a", "b", "c"]);
        let changes = compare_columns(&a, &c);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], ColumnChange::EnumValues { .. }));
    }

    #[test]
    fn test_application_defaults_always_equal() {
        let a = ColumnMetadata::new("id", "TEXT").application_default();
        let b = ColumnMetadata::new("id", "TEXT").application_default();
        assert!(compare_columns(&a, &b).is_empty());

        let none = ColumnMetadata::new("id", "TEXT");
        assert_eq!(
            compare_columns(&a, &none),
            vec![ColumnChange::Default {
                from: DefaultState::Application,
                to: DefaultState::None
            }]
        );
    }

    #[test]
    fn test_each_dimension_reported() {
        let old = ColumnMetadata::new("age", "TEXT");
        let new = ColumnMetadata::new("age", "INTEGER").not_null().default_value("0");
        let changes = compare_columns(&old, &new);
        let categories: Vec<&str> = changes.iter().map(ColumnChange::category).collect();
        assert_eq!(categories, vec!["type", "nullable", "default"]);
        assert!(matches!(changes[0], ColumnChange::Type { .. }));
        assert!(matches!(changes[1], ColumnChange::Nullable { from: true, to: false }));
        assert!(matches!(changes[2], ColumnChange::Default { .. }));
    }

    #[test]
    fn test_constraints_order_independent() {
        let a = users()
            .unique(None, ["id", "name"])
            .index("users_name_idx", ["name"], false);
        let b = users()
            .index("users_name_idx", ["name"], false)
            .unique(None, ["name", "id"]);
        assert_eq!(compare_tables(&a, &b), None);

        let c = users().unique(Some("users_name_key"), ["name"]);
        let diff = compare_tables(&a, &c).unwrap();
        assert_eq!(diff.added_unique_constraints.len(), 1);
        assert_eq!(diff.removed_unique_constraints.len(), 1);
        assert_eq!(diff.removed_indexes.len(), 1);
    }

    #[test]
    fn test_primary_key_change() {
        let new = users().primary_key(["id", "name"]);
        let diff = compare_tables(&users(), &new).unwrap();
        assert_eq!(
            diff.primary_key,
            Some(PrimaryKeyChange {
                from: vec!["id".to_string()],
                to: vec!["id".to_string(), "name".to_string()],
            })
        );
    }

    #[test]
    fn test_diff_schemas() {
        let posts = TableMetadata::new("posts").column(ColumnMetadata::new("id", "TEXT"));
        let tags = TableMetadata::new("tags").column(ColumnMetadata::new("id", "TEXT"));
        let old: BTreeMap<String, TableMetadata> =
            [("users".to_string(), users()), ("tags".to_string(), tags)].into();
        let changed_users = users().column(ColumnMetadata::new("email", "TEXT"));
        let new: BTreeMap<String, TableMetadata> =
            [("users".to_string(), changed_users), ("posts".to_string(), posts)].into();

        let diff = diff_schemas(&old, &new);
        assert_eq!(diff.added_tables[0].name, "posts");
        assert_eq!(diff.removed_tables, vec!["tags"]);
        assert_eq!(diff.modified_tables[0].table_name, "users");
        assert_eq!(diff.table_count(), 3);
        assert!(diff_schemas(&new, &new).is_empty());
    }
}
