//! Database schema analyzer
//!
//! This module reads a schema snapshot out of a live MySQL database or a JSON
//! snapshot file.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ConnectionConfig;
use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::schema::types::{Column, ColumnDefault, ForeignKey, Index, ReferentialAction, Schema, Table};

/// Marker MySQL 8 adds to `EXTRA` for expression defaults; not valid in DDL
const DEFAULT_GENERATED: &str = "DEFAULT_GENERATED";

/// Anything that can produce a schema snapshot
#[async_trait]
pub trait Introspector: Send + Sync {
    /// Read the schema, skipping the named tables
    async fn introspect(&self, ignore_tables: &BTreeSet<String>) -> Result<Schema>;
}

/// Build the introspector a connection entry describes
pub async fn introspector_for(config: &ConnectionConfig) -> Result<Box<dyn Introspector>> {
    match (&config.url, &config.snapshot) {
        (Some(_), None) => {
            let connection = DatabaseConnection::connect(config).await?;
            Ok(Box::new(MySqlIntrospector::new(connection)))
        }
        (None, Some(path)) => Ok(Box::new(SnapshotFile::new(path))),
        (Some(_), Some(_)) => Err(Error::ConfigError(
            "Connection sets both url and snapshot".to_string(),
        )),
        (None, None) => Err(Error::ConfigError(
            "Connection needs either url or snapshot".to_string(),
        )),
    }
}

// Row types for INFORMATION_SCHEMA queries
#[derive(FromRow)]
struct TableRow {
    table_name: String,
}

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    column_type: String,
    is_nullable: String,
    column_default: Option<String>,
    extra: String,
    column_comment: String,
    ordinal_position: u64,
}

#[derive(FromRow)]
struct IndexRow {
    index_name: String,
    non_unique: i64,
    column_name: Option<String>,
}

#[derive(FromRow)]
struct ForeignKeyRow {
    constraint_name: String,
    column_name: String,
    referenced_table_name: String,
    referenced_column_name: String,
    update_rule: String,
    delete_rule: String,
}

/// MySQL schema analyzer reading `INFORMATION_SCHEMA`
pub struct MySqlIntrospector {
    connection: DatabaseConnection,
}

impl MySqlIntrospector {
    /// Create a new schema analyzer
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    async fn analyze_table(&self, database: &str, table_name: &str) -> Result<Table> {
        let mut table = Table::new(table_name);

        for column in self.analyze_columns(database, table_name).await? {
            table.add_column(column);
        }
        for index in self.analyze_indexes(database, table_name).await? {
            table.add_index(index);
        }
        for fk in self.analyze_foreign_keys(database, table_name).await? {
            table.add_foreign_key(fk);
        }

        Ok(table)
    }

    async fn analyze_columns(&self, database: &str, table_name: &str) -> Result<Vec<Column>> {
        let sql = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(COLUMN_TYPE AS CHAR) AS column_type,
                CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                CAST(EXTRA AS CHAR) AS extra,
                CAST(COLUMN_COMMENT AS CHAR) AS column_comment,
                CAST(ORDINAL_POSITION AS UNSIGNED) AS ordinal_position
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(database)
            .bind(table_name)
            .fetch_all(self.connection.pool())
            .await?;

        rows.into_iter()
            .map(|row| {
                let position = u32::try_from(row.ordinal_position).map_err(|_| {
                    Error::malformed(format!(
                        "column `{}`.`{}` has out of range position {}",
                        table_name, row.column_name, row.ordinal_position
                    ))
                })?;

                Ok(Column {
                    default: ColumnDefault::from_raw(row.column_default.as_deref()),
                    extra: normalize_extra(&row.extra),
                    nullable: row.is_nullable == "YES",
                    name: row.column_name,
                    data_type: row.column_type,
                    comment: row.column_comment,
                    position,
                })
            })
            .collect()
    }

    async fn analyze_indexes(&self, database: &str, table_name: &str) -> Result<Vec<Index>> {
        let sql = r#"
            SELECT
                CAST(INDEX_NAME AS CHAR) AS index_name,
                CAST(NON_UNIQUE AS SIGNED) AS non_unique,
                CAST(COLUMN_NAME AS CHAR) AS column_name
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;

        let rows = sqlx::query_as::<_, IndexRow>(sql)
            .bind(database)
            .bind(table_name)
            .fetch_all(self.connection.pool())
            .await?;

        let mut indexes: IndexMap<String, Index> = IndexMap::new();
        let mut functional = BTreeSet::new();
        for row in rows {
            let Some(column_name) = row.column_name else {
                functional.insert(row.index_name);
                continue;
            };
            indexes
                .entry(row.index_name.clone())
                .or_insert_with(|| Index {
                    primary: row.index_name == Index::PRIMARY_NAME,
                    unique: row.non_unique == 0,
                    name: row.index_name.clone(),
                    columns: Vec::new(),
                })
                .columns
                .push(column_name);
        }

        for name in &functional {
            tracing::warn!(table = %table_name, index = %name, "Skipping functional index");
            indexes.shift_remove(name);
        }

        Ok(indexes.into_values().collect())
    }

    async fn analyze_foreign_keys(&self, database: &str, table_name: &str) -> Result<Vec<ForeignKey>> {
        let sql = r#"
            SELECT
                CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
                CAST(k.COLUMN_NAME AS CHAR) AS column_name,
                CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS referenced_table_name,
                CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column_name,
                CAST(c.UPDATE_RULE AS CHAR) AS update_rule,
                CAST(c.DELETE_RULE AS CHAR) AS delete_rule
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE k
            JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS c
              ON k.CONSTRAINT_NAME = c.CONSTRAINT_NAME
             AND k.CONSTRAINT_SCHEMA = c.CONSTRAINT_SCHEMA
            WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ?
              AND k.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
        "#;

        let rows = sqlx::query_as::<_, ForeignKeyRow>(sql)
            .bind(database)
            .bind(table_name)
            .fetch_all(self.connection.pool())
            .await?;

        let mut foreign_keys: IndexMap<String, ForeignKey> = IndexMap::new();
        for row in rows {
            let fk = match foreign_keys.entry(row.constraint_name.clone()) {
                indexmap::map::Entry::Occupied(entry) => entry.into_mut(),
                indexmap::map::Entry::Vacant(entry) => entry.insert(ForeignKey {
                    name: row.constraint_name,
                    columns: Vec::new(),
                    referenced_table: row.referenced_table_name,
                    referenced_columns: Vec::new(),
                    on_update: Some(row.update_rule.parse::<ReferentialAction>()?),
                    on_delete: Some(row.delete_rule.parse::<ReferentialAction>()?),
                }),
            };
            fk.columns.push(row.column_name);
            fk.referenced_columns.push(row.referenced_column_name);
        }

        Ok(foreign_keys.into_values().collect())
    }
}

#[async_trait]
impl Introspector for MySqlIntrospector {
    async fn introspect(&self, ignore_tables: &BTreeSet<String>) -> Result<Schema> {
        let database = self.connection.database_name().await?;

        let sql = r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let table_rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(&database)
            .fetch_all(self.connection.pool())
            .await?;

        let mut schema = Schema::new();
        for row in table_rows {
            if ignore_tables.contains(&row.table_name) {
                tracing::debug!(table = %row.table_name, "Ignoring table");
                continue;
            }
            schema.add_table(self.analyze_table(&database, &row.table_name).await?);
        }

        tracing::info!(database = %database, tables = schema.tables.len(), "Schema analyzed");
        schema.validate()?;
        Ok(schema)
    }
}

/// Reads a schema from a JSON snapshot on disk
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the snapshot without filtering
    pub fn load(&self) -> Result<Schema> {
        let contents = fs::read_to_string(&self.path)?;
        let schema: Schema = serde_json::from_str(&contents)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Write a schema as pretty JSON, creating parent directories
    pub fn save(&self, schema: &Schema) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(schema)?)?;
        Ok(())
    }
}

#[async_trait]
impl Introspector for SnapshotFile {
    async fn introspect(&self, ignore_tables: &BTreeSet<String>) -> Result<Schema> {
        let mut schema = self.load()?;
        schema.tables.retain(|name, _| !ignore_tables.contains(name));
        tracing::info!(path = %self.path.display(), tables = schema.tables.len(), "Snapshot loaded");
        Ok(schema)
    }
}

/// Strip the catalog-only `DEFAULT_GENERATED` marker from `EXTRA`
fn normalize_extra(extra: &str) -> String {
    extra
        .split_whitespace()
        .filter(|word| !word.eq_ignore_ascii_case(DEFAULT_GENERATED))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::normalize_extra;

    #[test]
    fn default_generated_is_stripped() {
        assert_eq!(
            normalize_extra("DEFAULT_GENERATED on update CURRENT_TIMESTAMP"),
            "on update CURRENT_TIMESTAMP"
        );
        assert_eq!(normalize_extra("DEFAULT_GENERATED"), "");
        assert_eq!(normalize_extra("auto_increment"), "auto_increment");
    }
}
