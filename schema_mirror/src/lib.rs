//! SchemaMirror: compare two MySQL schemas and generate the DDL that makes the
//! target match the source
//!
//! The core is two pure steps: [`compare`] computes a typed [`SchemaDiff`] from
//! two [`Schema`] snapshots, and [`synthesize`] renders that diff as ordered
//! `CREATE`/`DROP`/`ALTER TABLE` statements. Introspection, configuration and
//! output sinks sit around that core.

pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod schema;
pub mod utils;

use std::collections::BTreeSet;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use error::{Error, Result};
pub use schema::analyzer::{Introspector, MySqlIntrospector, SnapshotFile};
pub use schema::diff::{compare, DiffOptions, SchemaDiff, TableDiff};
pub use schema::generator::{synthesize, DdlGenerator, GeneratorOptions};
pub use schema::types::Schema;

/// Initialize SchemaMirror with the specified configuration file
pub fn init(config_path: &str) -> Result<SchemaMirrorClient> {
    let config = config::load_from_file(config_path)?;
    Ok(SchemaMirrorClient::new(config))
}

/// Result of comparing two named connections
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub diff: SchemaDiff,
    pub statements: Vec<String>,
}

impl SyncPlan {
    /// True when the target already matches the source
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// The statements as a `;`-terminated script
    pub fn script(&self) -> String {
        output::render_script(&self.statements)
    }
}

/// The main client for interacting with SchemaMirror
pub struct SchemaMirrorClient {
    config: Config,
}

impl SchemaMirrorClient {
    /// Create a new SchemaMirror client from configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generator configured from the `[sync]` section
    pub fn generator(&self) -> DdlGenerator {
        DdlGenerator::new(GeneratorOptions {
            strict_defaults: self.config.sync.strict_defaults,
            engine: self.config.sync.engine.clone(),
            pretty: self.config.sync.pretty,
        })
    }

    /// Introspect one named connection
    pub async fn introspect(&self, connection: &str, ignore_tables: &BTreeSet<String>) -> Result<Schema> {
        let introspector = schema::analyzer::introspector_for(self.config.connection(connection)?).await?;
        introspector.introspect(ignore_tables).await
    }

    /// Introspect both connections concurrently, diff them and render DDL
    pub async fn plan(&self, source: &str, target: &str, extra_ignore: &[String]) -> Result<SyncPlan> {
        let ignore_tables = self.config.resolve_ignore_tables(extra_ignore);
        tracing::info!(
            source = %source,
            target = %target,
            ignored = ignore_tables.len(),
            "Comparing schemas"
        );

        let (source_schema, target_schema) = futures::try_join!(
            self.introspect(source, &ignore_tables),
            self.introspect(target, &ignore_tables)
        )?;

        let options = DiffOptions { ignore_tables };
        let diff = SchemaDiff::generate(&source_schema, &target_schema, &options)?;
        let statements = self.generator().generate(&diff)?;

        tracing::info!(summary = %diff.summary(), statements = statements.len(), "Sync plan ready");
        Ok(SyncPlan { diff, statements })
    }

    /// Introspect a connection and save it as a JSON snapshot
    pub async fn snapshot(&self, connection: &str, path: &str) -> Result<Schema> {
        let ignore_tables = self.config.resolve_ignore_tables(Vec::<String>::new());
        let schema = self.introspect(connection, &ignore_tables).await?;
        SnapshotFile::new(path).save(&schema)?;
        Ok(schema)
    }
}
