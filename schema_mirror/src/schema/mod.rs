//! Schema module for SchemaMirror
//!
//! This module handles schema introspection, comparison, and DDL generation.

pub mod analyzer;
pub mod diff;
pub mod generator;
pub mod types;

// Re-export key types
pub use analyzer::{introspector_for, Introspector, MySqlIntrospector, SnapshotFile};
pub use diff::{compare, ColumnPlacement, DiffOptions, DiffSummary, PlacedColumn, SchemaDiff, TableDiff};
pub use generator::{synthesize, DdlGenerator, GeneratorOptions};
pub use types::{Column, ColumnDefault, ForeignKey, Index, ReferentialAction, Schema, Table};
