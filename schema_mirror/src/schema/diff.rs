//! Schema difference calculator
//!
//! This module compares a source schema against a target schema and records
//! what the target must gain, lose, or redefine to match the source.

use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::Result;
use crate::schema::types::{Column, ForeignKey, Index, Schema, Table};

/// Options for [`SchemaDiff::generate`]
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Tables skipped on both sides
    pub ignore_tables: BTreeSet<String>,
}

impl DiffOptions {
    pub fn ignoring<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignore_tables: tables.into_iter().map(Into::into).collect(),
        }
    }
}

/// Where an added or redefined column lands in the final column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPlacement {
    First,
    After(String),
}

/// A column tagged with its placement in the source table
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedColumn {
    pub column: Column,
    pub after: ColumnPlacement,
}

/// Changes needed to bring one shared table in line with the source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDiff {
    pub add_columns: IndexMap<String, PlacedColumn>,
    pub modify_columns: IndexMap<String, PlacedColumn>,
    pub drop_columns: IndexMap<String, Column>,
    pub add_indexes: IndexMap<String, Index>,
    pub drop_indexes: IndexMap<String, Index>,
    pub add_foreign_keys: IndexMap<String, ForeignKey>,
    pub drop_foreign_keys: IndexMap<String, ForeignKey>,
}

impl TableDiff {
    /// Compare the two definitions of a table present on both sides
    pub fn generate(source: &Table, target: &Table) -> Self {
        let mut diff = TableDiff::default();

        let mut previous = ColumnPlacement::First;
        for column in source.columns_in_order() {
            let placed = PlacedColumn {
                column: column.clone(),
                after: previous.clone(),
            };

            match target.columns.get(&column.name) {
                None => {
                    diff.add_columns.insert(column.name.clone(), placed);
                }
                Some(existing) if column.differs_from(existing) => {
                    diff.modify_columns.insert(column.name.clone(), placed);
                }
                Some(_) => {}
            }

            previous = ColumnPlacement::After(column.name.clone());
        }

        diff.drop_columns = target
            .columns
            .iter()
            .filter(|(name, _)| !source.columns.contains_key(*name))
            .map(|(name, column)| (name.clone(), column.clone()))
            .collect();

        for (name, index) in &source.indexes {
            match target.indexes.get(name) {
                None => {
                    diff.add_indexes.insert(name.clone(), index.clone());
                }
                Some(existing) if index.differs_from(existing) => {
                    diff.drop_indexes.insert(name.clone(), existing.clone());
                    diff.add_indexes.insert(name.clone(), index.clone());
                }
                Some(_) => {}
            }
        }
        for (name, index) in &target.indexes {
            if !source.indexes.contains_key(name) {
                diff.drop_indexes.insert(name.clone(), index.clone());
            }
        }

        for (name, fk) in &source.foreign_keys {
            match target.foreign_keys.get(name) {
                None => {
                    diff.add_foreign_keys.insert(name.clone(), fk.clone());
                }
                Some(existing) if fk.differs_from(existing) => {
                    diff.drop_foreign_keys.insert(name.clone(), existing.clone());
                    diff.add_foreign_keys.insert(name.clone(), fk.clone());
                }
                Some(_) => {}
            }
        }
        for (name, fk) in &target.foreign_keys {
            if !source.foreign_keys.contains_key(name) {
                diff.drop_foreign_keys.insert(name.clone(), fk.clone());
            }
        }

        diff
    }

    /// Check if the table needs no changes
    pub fn is_empty(&self) -> bool {
        self.add_columns.is_empty()
            && self.modify_columns.is_empty()
            && self.drop_columns.is_empty()
            && self.add_indexes.is_empty()
            && self.drop_indexes.is_empty()
            && self.add_foreign_keys.is_empty()
            && self.drop_foreign_keys.is_empty()
    }
}

/// Represents changes needed to make the target schema match the source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    /// Present in source, absent in target
    pub missing_tables: BTreeMap<String, Table>,
    /// Present in target, absent in source
    pub extra_tables: BTreeSet<String>,
    /// Present in both but changed
    pub table_differences: BTreeMap<String, TableDiff>,
}

impl SchemaDiff {
    /// Generate a schema diff between a source and a target schema
    pub fn generate(source: &Schema, target: &Schema, options: &DiffOptions) -> Result<Self> {
        source.validate()?;
        target.validate()?;

        let ignored = |name: &str| options.ignore_tables.contains(name);
        let mut diff = SchemaDiff::default();

        for (name, table) in &source.tables {
            if ignored(name.as_str()) {
                continue;
            }
            match target.tables.get(name) {
                None => {
                    diff.missing_tables.insert(name.clone(), table.clone());
                }
                Some(existing) => {
                    let table_diff = TableDiff::generate(table, existing);
                    if table_diff.is_empty() {
                        tracing::trace!(table = %name, "Table unchanged");
                    } else {
                        tracing::debug!(table = %name, "Table differs");
                        diff.table_differences.insert(name.clone(), table_diff);
                    }
                }
            }
        }

        diff.extra_tables = target
            .tables
            .keys()
            .filter(|name| !ignored(name.as_str()) && !source.tables.contains_key(name.as_str()))
            .cloned()
            .collect();

        tracing::debug!(summary = %diff.summary(), "Schema diff generated");
        Ok(diff)
    }

    /// Check if the diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.missing_tables.is_empty()
            && self.extra_tables.is_empty()
            && self.table_differences.is_empty()
    }

    /// Per-category change counts
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary {
            tables_to_create: self.missing_tables.len(),
            tables_to_drop: self.extra_tables.len(),
            tables_to_alter: self.table_differences.len(),
            ..DiffSummary::default()
        };
        for table in self.table_differences.values() {
            summary.columns_added += table.add_columns.len();
            summary.columns_modified += table.modify_columns.len();
            summary.columns_dropped += table.drop_columns.len();
            summary.indexes_added += table.add_indexes.len();
            summary.indexes_dropped += table.drop_indexes.len();
            summary.foreign_keys_added += table.add_foreign_keys.len();
            summary.foreign_keys_dropped += table.drop_foreign_keys.len();
        }
        summary
    }
}

/// Change counts for logging and CLI output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub tables_to_create: usize,
    pub tables_to_drop: usize,
    pub tables_to_alter: usize,
    pub columns_added: usize,
    pub columns_modified: usize,
    pub columns_dropped: usize,
    pub indexes_added: usize,
    pub indexes_dropped: usize,
    pub foreign_keys_added: usize,
    pub foreign_keys_dropped: usize,
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to drop, {} to alter \
             (columns +{} ~{} -{}, indexes +{} -{}, foreign keys +{} -{})",
            self.tables_to_create,
            self.tables_to_drop,
            self.tables_to_alter,
            self.columns_added,
            self.columns_modified,
            self.columns_dropped,
            self.indexes_added,
            self.indexes_dropped,
            self.foreign_keys_added,
            self.foreign_keys_dropped,
        )
    }
}

/// Diff two schemas with no tables ignored
pub fn compare(source: &Schema, target: &Schema) -> Result<SchemaDiff> {
    SchemaDiff::generate(source, target, &DiffOptions::default())
}
