//! oxide-schema CLI
//!
//! Command-line tool for generating DDL migrations from table definitions.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_schema::prelude::*;

/// Dialect-aware schema diffing and DDL generation.
#[derive(Parser)]
#[command(name = "oxide-schema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target SQL dialect.
    #[arg(short, long, env = "OXIDE_SCHEMA_DIALECT", value_enum, default_value_t = DialectArg::Postgres)]
    dialect: DialectArg,

    /// Write SQL to this file instead of stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DialectArg {
    Postgres,
    Sqlite,
}

impl From<DialectArg> for DialectKind {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Self::Postgres,
            DialectArg::Sqlite => Self::Sqlite,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a migration from the previous snapshot to the schema.
    Generate {
        /// Table definitions (JSON array of tables).
        #[arg(short, long)]
        schema: PathBuf,

        /// Previous snapshot; omit for an initial migration.
        #[arg(short, long)]
        previous: Option<PathBuf>,

        /// Migration name recorded in the new snapshot.
        #[arg(short, long, default_value = "migration")]
        name: String,

        /// Write the new snapshot to this file.
        #[arg(long)]
        snapshot_out: Option<PathBuf>,

        /// Skip syntax validation of the generated SQL.
        #[arg(long)]
        no_validate: bool,
    },

    /// Print the full create script for a schema or a stored snapshot.
    CreateScript {
        /// Table definitions (JSON array of tables).
        #[arg(short, long, conflicts_with = "snapshot", required_unless_present = "snapshot")]
        schema: Option<PathBuf>,

        /// Stored snapshot.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Emit CREATE TABLE IF NOT EXISTS.
        #[arg(long)]
        if_not_exists: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    run(&cli)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let dialect = DialectKind::from(cli.dialect).dialect();

    let sql = match &cli.command {
        Commands::Generate {
            schema,
            previous,
            name,
            snapshot_out,
            no_validate,
        } => {
            let tables = read_tables(schema)?;
            let previous = previous.as_deref().map(read_snapshot).transpose()?;
            let options = PlanOptions::default()
                .migration_name(name.clone())
                .validate_syntax(!no_validate);

            let plan = plan_migration(&tables, dialect, previous.as_ref(), &options)?;
            if plan.unchanged {
                info!("No changes detected.");
            }
            if let Some(path) = snapshot_out {
                std::fs::write(path, plan.snapshot.to_json()?)
                    .with_context(|| format!("writing snapshot {}", path.display()))?;
                info!("Wrote snapshot: {}", path.display());
            }
            plan.sql()
        }

        Commands::CreateScript {
            schema,
            snapshot,
            if_not_exists,
        } => {
            let snapshot = match (schema, snapshot) {
                (_, Some(path)) => read_snapshot(path)?,
                (Some(path), None) => {
                    let tables = read_tables(path)?;
                    Pipeline::new(dialect).snapshot(&tables, "create_script")?
                }
                (None, None) => anyhow::bail!("either --schema or --snapshot is required"),
            };
            generate_create_script(&snapshot, dialect, *if_not_exists)?.to_sql()
        }
    };

    match &cli.out {
        Some(path) => {
            std::fs::write(path, format!("{sql}\n"))
                .with_context(|| format!("writing SQL {}", path.display()))?;
            info!("Wrote SQL: {}", path.display());
        }
        None => println!("{sql}"),
    }
    Ok(())
}

fn read_tables(path: &Path) -> anyhow::Result<Vec<TableSpec>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing schema {}", path.display()))
}

fn read_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    Snapshot::from_json(&json).with_context(|| format!("loading snapshot {}", path.display()))
}
