//! DDL generator
//!
//! This module turns a [`SchemaDiff`] into ordered MySQL DDL statements.
//! Statements carry no trailing terminator.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::diff::{ColumnPlacement, PlacedColumn, SchemaDiff, TableDiff};
use crate::schema::types::{Column, ColumnDefault, ForeignKey, Index, ReferentialAction, Table};

/// A bare function call such as `now()` or `gen_random_uuid()`
static FUNCTION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\s*\(.*\)$").expect("valid regex"));

/// Rendering options for [`DdlGenerator`]
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Fail on function-like literal defaults instead of quoting them
    pub strict_defaults: bool,
    /// Storage engine appended to CREATE TABLE
    pub engine: String,
    /// Put each clause on its own indented line
    pub pretty: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            strict_defaults: false,
            engine: "InnoDB".to_string(),
            pretty: false,
        }
    }
}

/// Migration SQL generator
#[derive(Debug, Clone, Default)]
pub struct DdlGenerator {
    options: GeneratorOptions,
}

impl DdlGenerator {
    /// Create a new DDL generator
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    /// Generate DDL statements from a schema diff.
    ///
    /// Order: CREATE TABLE by name, DROP TABLE by name, then one ALTER TABLE
    /// per changed table by name.
    pub fn generate(&self, diff: &SchemaDiff) -> Result<Vec<String>> {
        validate_diff(diff)?;

        let mut statements = Vec::new();

        for table in diff.missing_tables.values() {
            statements.push(self.create_table_sql(table)?);
        }

        for table_name in &diff.extra_tables {
            statements.push(format!("DROP TABLE {}", quote_identifier(table_name)));
        }

        for (table_name, changes) in &diff.table_differences {
            if let Some(statement) = self.alter_table_sql(table_name, changes)? {
                statements.push(statement);
            }
        }

        tracing::debug!(statements = statements.len(), "DDL generated");
        Ok(statements)
    }

    /// Generate a CREATE TABLE statement for a table missing from the target
    pub fn create_table_sql(&self, table: &Table) -> Result<String> {
        let mut lines = Vec::new();
        for column in table.columns_in_order() {
            lines.push(self.column_definition(column)?);
        }

        if let Some(primary) = table.primary_index() {
            lines.push(format!("PRIMARY KEY ({})", wrap_columns(&primary.columns)));
        }

        let mut unique_keys = Vec::new();
        let mut plain_keys = Vec::new();
        for index in table.indexes.values().filter(|index| !index.primary) {
            if index.unique {
                unique_keys.push(format!(
                    "UNIQUE KEY {} ({})",
                    quote_identifier(&index.name),
                    wrap_columns(&index.columns)
                ));
            } else {
                plain_keys.push(format!(
                    "KEY {} ({})",
                    quote_identifier(&index.name),
                    wrap_columns(&index.columns)
                ));
            }
        }
        lines.extend(unique_keys);
        lines.extend(plain_keys);
        lines.extend(table.foreign_keys.values().map(foreign_key_definition));

        let (open, separator, close) = if self.options.pretty {
            ("\n    ", ",\n    ", "\n")
        } else {
            ("", ", ", "")
        };

        Ok(format!(
            "CREATE TABLE {} ({}{}{}) ENGINE={}",
            quote_identifier(&table.name),
            open,
            lines.join(separator),
            close,
            self.options.engine
        ))
    }

    /// Generate the composite ALTER TABLE for one changed table.
    ///
    /// Returns `None` when no clause is produced.
    pub fn alter_table_sql(&self, table_name: &str, changes: &TableDiff) -> Result<Option<String>> {
        let mut actions = Vec::new();

        for fk in changes.drop_foreign_keys.values() {
            actions.push(format!("DROP FOREIGN KEY {}", quote_identifier(&fk.name)));
        }

        for index in changes.drop_indexes.values() {
            if index.primary {
                actions.push("DROP PRIMARY KEY".to_string());
            } else {
                actions.push(format!("DROP INDEX {}", quote_identifier(&index.name)));
            }
        }

        for column in changes.drop_columns.values() {
            actions.push(format!("DROP COLUMN {}", quote_identifier(&column.name)));
        }

        // Each clause names only its predecessor, so adds must run in source order
        let mut additions: Vec<&PlacedColumn> = changes.add_columns.values().collect();
        additions.sort_by_key(|placed| placed.column.position);
        for placed in additions {
            actions.push(self.placed_column_clause("ADD COLUMN", placed)?);
        }

        for placed in changes.modify_columns.values() {
            actions.push(self.placed_column_clause("MODIFY COLUMN", placed)?);
        }

        for index in changes.add_indexes.values() {
            actions.push(add_index_clause(index));
        }

        for fk in changes.add_foreign_keys.values() {
            actions.push(format!("ADD {}", foreign_key_definition(fk)));
        }

        if actions.is_empty() {
            return Ok(None);
        }

        let separator = if self.options.pretty { ",\n    " } else { ", " };
        let lead = if self.options.pretty { "\n    " } else { " " };
        Ok(Some(format!(
            "ALTER TABLE {}{}{}",
            quote_identifier(table_name),
            lead,
            actions.join(separator)
        )))
    }

    fn placed_column_clause(&self, verb: &str, placed: &PlacedColumn) -> Result<String> {
        let placement = match &placed.after {
            ColumnPlacement::First => "FIRST".to_string(),
            ColumnPlacement::After(previous) => format!("AFTER {}", quote_identifier(previous)),
        };
        Ok(format!(
            "{} {} {}",
            verb,
            self.column_definition(&placed.column)?,
            placement
        ))
    }

    /// Render a column definition shared by CREATE, ADD and MODIFY
    pub fn column_definition(&self, column: &Column) -> Result<String> {
        let mut sql = format!("{} {}", quote_identifier(&column.name), column.data_type);

        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });

        if let Some(default) = self.default_clause(column)? {
            sql.push(' ');
            sql.push_str(&default);
        }

        let extra = column.extra.trim();
        if !extra.is_empty() {
            sql.push(' ');
            sql.push_str(&extra.to_uppercase());
        }

        if !column.comment.is_empty() {
            sql.push_str(" COMMENT ");
            sql.push_str(&quote_literal(&column.comment));
        }

        Ok(sql)
    }

    fn default_clause(&self, column: &Column) -> Result<Option<String>> {
        match &column.default {
            ColumnDefault::None => Ok(None),
            // NOT NULL DEFAULT NULL is rejected by the server
            ColumnDefault::Null if column.nullable => Ok(Some("DEFAULT NULL".to_string())),
            ColumnDefault::Null => Ok(None),
            ColumnDefault::Expression(expression) => Ok(Some(format!("DEFAULT {}", expression))),
            ColumnDefault::Literal(value) => {
                if FUNCTION_CALL.is_match(value.trim()) {
                    if self.options.strict_defaults {
                        return Err(Error::UnsupportedDefaultExpression {
                            column: column.name.clone(),
                            value: value.clone(),
                        });
                    }
                    tracing::warn!(
                        column = %column.name,
                        default = %value,
                        "Default looks like an expression but is not recognised; quoting as a literal"
                    );
                }
                Ok(Some(format!("DEFAULT {}", quote_literal(value))))
            }
        }
    }
}

/// Generate DDL with default options
pub fn synthesize(diff: &SchemaDiff) -> Result<Vec<String>> {
    DdlGenerator::default().generate(diff)
}

fn validate_diff(diff: &SchemaDiff) -> Result<()> {
    for table in diff.missing_tables.values() {
        table.validate()?;
    }
    for (table_name, changes) in &diff.table_differences {
        for index in changes.add_indexes.values() {
            index.validate(table_name)?;
        }
        if changes.add_indexes.values().filter(|index| index.primary).count() > 1 {
            return Err(Error::malformed(format!(
                "table `{}` would gain two primary indexes",
                table_name
            )));
        }
        for fk in changes.add_foreign_keys.values() {
            fk.validate(table_name)?;
        }
    }
    Ok(())
}

fn add_index_clause(index: &Index) -> String {
    if index.primary {
        format!("ADD PRIMARY KEY ({})", wrap_columns(&index.columns))
    } else if index.unique {
        format!(
            "ADD UNIQUE KEY {} ({})",
            quote_identifier(&index.name),
            wrap_columns(&index.columns)
        )
    } else {
        format!(
            "ADD INDEX {} ({})",
            quote_identifier(&index.name),
            wrap_columns(&index.columns)
        )
    }
}

fn foreign_key_definition(fk: &ForeignKey) -> String {
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_identifier(&fk.name),
        wrap_columns(&fk.columns),
        quote_identifier(&fk.referenced_table),
        wrap_columns(&fk.referenced_columns)
    );

    if let Some(action) = explicit_action(fk.on_delete) {
        sql.push_str(&format!(" ON DELETE {}", action));
    }
    if let Some(action) = explicit_action(fk.on_update) {
        sql.push_str(&format!(" ON UPDATE {}", action));
    }

    sql
}

fn explicit_action(action: Option<ReferentialAction>) -> Option<ReferentialAction> {
    action.filter(|action| *action != ReferentialAction::IMPLICIT)
}

fn wrap_columns(columns: &[String]) -> String {
    columns
        .iter()
        .map(|column| quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Backtick-quote an identifier
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Single-quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_call_pattern() {
        assert!(FUNCTION_CALL.is_match("now()"));
        assert!(FUNCTION_CALL.is_match("gen_random_uuid ()"));
        assert!(!FUNCTION_CALL.is_match("hello world"));
        assert!(!FUNCTION_CALL.is_match("(1)"));
    }

    #[test]
    fn implicit_action_is_omitted() {
        assert_eq!(explicit_action(Some(ReferentialAction::Restrict)), None);
        assert_eq!(
            explicit_action(Some(ReferentialAction::NoAction)),
            Some(ReferentialAction::NoAction)
        );
        assert_eq!(explicit_action(None), None);
    }

    #[test]
    fn identifiers_escape_backticks() {
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
