//! Foreign-key dependency ordering.
//!
//! An edge runs from table A to table B whenever A has a foreign key
//! referencing B. Tables are emitted depth first so every referenced table
//! comes before the tables that reference it. Iteration is over name
//! ordered maps, so the result is the same on every run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{Result, SchemaError};
use crate::metadata::TableMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Foreign-key graph over a set of tables.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Builds the graph for the given tables.
    ///
    /// References to tables outside the set and self-references are not
    /// edges: neither constrains the creation order.
    pub fn new<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = &'a TableMetadata>,
    {
        let tables: Vec<&TableMetadata> = tables.into_iter().collect();
        let names: BTreeSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

        let edges = tables
            .iter()
            .map(|table| {
                let targets = table
                    .referenced_tables()
                    .filter(|target| names.contains(target))
                    .map(str::to_string)
                    .collect();
                (table.name.clone(), targets)
            })
            .collect();
        Self { edges }
    }

    /// Tables directly referenced by `table`.
    pub fn dependencies(&self, table: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(table)
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }

    /// Returns the tables in dependency order.
    ///
    /// Fails with [`SchemaError::CircularDependency`] on the first cycle
    /// found.
    pub fn sort(&self) -> Result<Vec<String>> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.edges.len());
        let mut order = Vec::with_capacity(self.edges.len());
        let mut path = Vec::new();

        for table in self.edges.keys() {
            self.visit(table, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        table: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        match marks.get(table) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|t| *t == table).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|t| (*t).to_string()).collect();
                cycle.push(table.to_string());
                return Err(SchemaError::CircularDependency {
                    table: table.to_string(),
                    path: cycle,
                });
            }
            None => {}
        }

        marks.insert(table, Mark::InProgress);
        path.push(table);
        for dependency in self.dependencies(table) {
            self.visit(dependency, marks, path, order)?;
        }
        path.pop();
        marks.insert(table, Mark::Done);
        order.push(table.to_string());
        Ok(())
    }
}

/// Orders tables so that referenced tables come first.
pub fn sort_tables<'a, I>(tables: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a TableMetadata>,
{
    DependencyGraph::new(tables).sort()
}
