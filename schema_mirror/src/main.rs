//! schema_mirror CLI
//!
//! Compares two configured databases and prints the DDL that brings the
//! target in line with the source.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use schema_mirror::config::{self, Config, DEFAULT_CONFIG_PATH};
use schema_mirror::utils::logging::init_logging;
use schema_mirror::{output, SchemaMirrorClient};

/// Compare two database schemas and generate SQL to synchronise them.
#[derive(Parser)]
#[command(name = "schema_mirror")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL that makes <target> match <source>.
    Sync {
        /// Source connection name.
        source: String,

        /// Target connection name.
        target: String,

        /// Comma separated list of tables to ignore.
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,

        /// Write SQL output to a timestamped file.
        #[arg(long)]
        output: bool,

        /// Write a versioned migration file with the statements.
        #[arg(long)]
        migration: bool,
    },

    /// Save a connection's schema as a JSON snapshot.
    Snapshot {
        /// Connection name.
        connection: String,

        /// Snapshot file to write.
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config: Config = config::load_from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config))?;
    init_logging(&config.logging, cli.verbose).context("initialising logging")?;

    let client = SchemaMirrorClient::new(config);

    match cli.command {
        Commands::Sync {
            source,
            target,
            ignore,
            output: write_output,
            migration,
        } => {
            let plan = client
                .plan(&source, &target, &ignore)
                .await
                .with_context(|| format!("comparing {} with {}", source, target))?;

            if plan.is_empty() {
                println!("Schemas are already in sync.");
                return Ok(());
            }

            let sql = plan.script();
            println!("{}", sql);

            let sync = &client.config().sync;
            if write_output {
                let path = output::write_sql_file(&sync.output_path, &source, &target, &sql)
                    .context("writing SQL file")?;
                eprintln!("SQL written to {}", path.display());
            }

            if migration {
                let path = output::write_migration(&sync.migrations_path, &sql)
                    .context("writing migration")?;
                eprintln!("Migration written to {}", path.display());
            }
        }
        Commands::Snapshot { connection, file } => {
            let schema = client
                .snapshot(&connection, &file)
                .await
                .with_context(|| format!("snapshotting {}", connection))?;
            eprintln!("Saved {} tables to {}", schema.tables.len(), file);
        }
    }

    Ok(())
}
