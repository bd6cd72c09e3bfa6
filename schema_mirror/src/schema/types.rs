//! Type definitions for database schema objects

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default prefixes the server evaluates at insert time rather than storing verbatim
/// The catalog spelling of a NULL default
const NULL_KEYWORD: &str = "NULL";

const EXPRESSION_PREFIXES: [&str; 3] = ["CURRENT_TIMESTAMP", "UUID()", "NULL"];

/// A point-in-time snapshot of a database's base tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: IndexMap<String, Table>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the schema, keyed by its name
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Builder form of [`Schema::add_table`]
    pub fn with_table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }

    /// Check every table against the structural invariants
    pub fn validate(&self) -> Result<()> {
        for (key, table) in &self.tables {
            if key != &table.name {
                return Err(Error::malformed(format!(
                    "table keyed as `{}` is named `{}`",
                    key, table.name
                )));
            }
            table.validate()?;
        }
        Ok(())
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: IndexMap<String, Column>,
    #[serde(default)]
    pub indexes: IndexMap<String, Index>,
    #[serde(default)]
    pub foreign_keys: IndexMap<String, ForeignKey>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
            foreign_keys: IndexMap::new(),
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Add an index to the table
    pub fn add_index(&mut self, index: Index) {
        self.indexes.insert(index.name.clone(), index);
    }

    /// Add a foreign key to the table
    pub fn add_foreign_key(&mut self, fk: ForeignKey) {
        self.foreign_keys.insert(fk.name.clone(), fk);
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.add_index(index);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.add_foreign_key(fk);
        self
    }

    /// Columns sorted by declared position
    pub fn columns_in_order(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.values().collect();
        columns.sort_by_key(|column| column.position);
        columns
    }

    /// The primary index, if the table has one
    pub fn primary_index(&self) -> Option<&Index> {
        self.indexes.values().find(|index| index.primary)
    }

    /// Check the table against the structural invariants
    pub fn validate(&self) -> Result<()> {
        let mut positions = HashSet::new();
        for (key, column) in &self.columns {
            if key != &column.name {
                return Err(Error::malformed(format!(
                    "column keyed as `{}` in table `{}` is named `{}`",
                    key, self.name, column.name
                )));
            }
            if !positions.insert(column.position) {
                return Err(Error::malformed(format!(
                    "duplicate column position {} in table `{}`",
                    column.position, self.name
                )));
            }
        }

        let mut primary = None;
        for (key, index) in &self.indexes {
            if key != &index.name {
                return Err(Error::malformed(format!(
                    "index keyed as `{}` in table `{}` is named `{}`",
                    key, self.name, index.name
                )));
            }
            index.validate(&self.name)?;
            if index.primary {
                if let Some(existing) = primary.replace(&index.name) {
                    return Err(Error::malformed(format!(
                        "table `{}` has two primary indexes: `{}` and `{}`",
                        self.name, existing, index.name
                    )));
                }
            }
        }

        for (key, fk) in &self.foreign_keys {
            if key != &fk.name {
                return Err(Error::malformed(format!(
                    "foreign key keyed as `{}` in table `{}` is named `{}`",
                    key, self.name, fk.name
                )));
            }
            fk.validate(&self.name)?;
        }

        Ok(())
    }
}

/// A column default, resolved once at introspection time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnDefault {
    /// No default declared
    #[default]
    None,
    /// `DEFAULT NULL`
    Null,
    /// A value stored verbatim and rendered as a quoted string
    Literal(String),
    /// A value evaluated by the server, rendered unquoted
    Expression(String),
}

impl ColumnDefault {
    /// Resolve a raw catalog default into its typed form.
    ///
    /// `None` is how the catalog reports a NULL default.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None => ColumnDefault::Null,
            Some(NULL_KEYWORD) => ColumnDefault::Null,
            Some(value) if is_expression(value) => ColumnDefault::Expression(value.to_string()),
            Some(value) => ColumnDefault::Literal(value.to_string()),
        }
    }

    /// Form used for equality checks.
    ///
    /// No default, the NULL marker and the exact `NULL` keyword all collapse to
    /// `Null`; every other value compares raw.
    pub fn normalized(&self) -> NormalizedDefault<'_> {
        match self {
            ColumnDefault::None | ColumnDefault::Null => NormalizedDefault::Null,
            ColumnDefault::Literal(value) | ColumnDefault::Expression(value) => {
                if value == NULL_KEYWORD {
                    NormalizedDefault::Null
                } else {
                    NormalizedDefault::Value(value)
                }
            }
        }
    }
}

/// Comparison key for [`ColumnDefault`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedDefault<'a> {
    Null,
    Value(&'a str),
}

/// Case-insensitive prefix match against the known expression defaults
pub fn is_expression(value: &str) -> bool {
    EXPRESSION_PREFIXES.iter().any(|prefix| {
        value
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub default: ColumnDefault,
    #[serde(default)]
    pub extra: String,
    #[serde(default)]
    pub comment: String,
    pub position: u32,
}

impl Column {
    /// Create a new non-null column with the given name, type and ordinal position
    pub fn new(name: &str, data_type: &str, position: u32) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: false,
            default: ColumnDefault::None,
            extra: String::new(),
            comment: String::new(),
            position,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set a default value for the column
    pub fn default(mut self, default: ColumnDefault) -> Self {
        self.default = default;
        self
    }

    pub fn extra(mut self, extra: &str) -> Self {
        self.extra = extra.to_string();
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    /// True when any attribute other than position differs
    pub fn differs_from(&self, other: &Column) -> bool {
        self.data_type != other.data_type
            || self.nullable != other.nullable
            || self.default.normalized() != other.default.normalized()
            || self.extra != other.extra
            || self.comment != other.comment
    }
}

/// Represents an index; `columns` order is the key order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub primary: bool,
    pub unique: bool,
    pub columns: Vec<String>,
}

impl Index {
    /// Name the catalog gives the primary key
    pub const PRIMARY_NAME: &'static str = "PRIMARY";

    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            primary: false,
            unique: false,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn unique(name: &str, columns: &[&str]) -> Self {
        Self {
            unique: true,
            ..Self::new(name, columns)
        }
    }

    pub fn primary(columns: &[&str]) -> Self {
        Self {
            primary: true,
            unique: true,
            ..Self::new(Self::PRIMARY_NAME, columns)
        }
    }

    /// Unchanged only if kind and ordered columns all match
    pub fn differs_from(&self, other: &Index) -> bool {
        self.primary != other.primary || self.unique != other.unique || self.columns != other.columns
    }

    pub(crate) fn validate(&self, table: &str) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::malformed(format!(
                "index `{}` on table `{}` has no columns",
                self.name, table
            )));
        }
        Ok(())
    }
}

/// Engine behaviour when a referenced row is updated or deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    NoAction,
}

impl ReferentialAction {
    /// The action the dialect applies when none is stated
    pub const IMPLICIT: ReferentialAction = ReferentialAction::Restrict;

    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for ReferentialAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('_', " ").to_ascii_uppercase();
        match normalized.as_str() {
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "SET NULL" => Ok(ReferentialAction::SetNull),
            "SET DEFAULT" => Ok(ReferentialAction::SetDefault),
            "NO ACTION" => Ok(ReferentialAction::NoAction),
            _ => Err(Error::malformed(format!("unknown referential action: {}", s))),
        }
    }
}

/// Represents a foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_update: Option<ReferentialAction>,
    pub on_delete: Option<ReferentialAction>,
}

impl ForeignKey {
    pub fn new(name: &str, columns: &[&str], referenced_table: &str, referenced_columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_table: referenced_table.to_string(),
            referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
            on_update: None,
            on_delete: None,
        }
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn differs_from(&self, other: &ForeignKey) -> bool {
        self.columns != other.columns
            || self.referenced_table != other.referenced_table
            || self.referenced_columns != other.referenced_columns
            || self.on_update != other.on_update
            || self.on_delete != other.on_delete
    }

    pub(crate) fn validate(&self, table: &str) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::malformed(format!(
                "foreign key `{}` on table `{}` has no columns",
                self.name, table
            )));
        }
        if self.columns.len() != self.referenced_columns.len() {
            return Err(Error::malformed(format!(
                "foreign key `{}` on table `{}` maps {} columns onto {} referenced columns",
                self.name,
                table,
                self.columns.len(),
                self.referenced_columns.len()
            )));
        }
        Ok(())
    }
}
