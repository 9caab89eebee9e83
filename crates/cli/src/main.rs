mod commands;
mod context;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{db, migrate};
use context::AppContext;
use logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Versioned, batch-tracked SQL migrations across named database connections")]
#[command(version)]
struct Cli {
    /// Project configuration file (defaults to config/database.yaml, then the environment)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every statement that is executed
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply, revert and create change-sets
    Migrate {
        #[command(subcommand)]
        migrate_command: MigrateCommands,
    },

    /// Inspect configured database connections
    Db {
        #[command(subcommand)]
        db_command: DbCommands,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Apply a single change-set
    Run {
        /// Change-set name, with or without the .sql extension
        #[arg(long)]
        file: String,

        /// Connection name (defaults to the configured default)
        #[arg(long, short)]
        connection: Option<String>,
    },

    /// Apply every pending change-set as one batch
    All {
        #[arg(long, short)]
        connection: Option<String>,
    },

    /// Revert a single change-set
    Rollback {
        /// Change-set name, with or without the .sql extension
        #[arg(long)]
        file: String,

        #[arg(long, short)]
        connection: Option<String>,
    },

    /// Revert one batch (the last one when omitted or 0)
    RollbackBatch {
        #[arg(long, short)]
        batch: Option<i64>,

        #[arg(long, short)]
        connection: Option<String>,
    },

    /// Revert every batch, newest first
    RollbackAll {
        #[arg(long, short)]
        connection: Option<String>,
    },

    /// Clear the ledger and apply every change-set again
    Fresh {
        #[arg(long, short)]
        connection: Option<String>,
    },

    /// Show which change-sets are applied, pending or missing
    Status {
        #[arg(long, short)]
        connection: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new change-set file
    Create {
        /// Descriptive name, e.g. create_users_table
        name: String,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// List configured connections
    Connections,

    /// Connect to a database and report its health
    Status {
        #[arg(long, short)]
        connection: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging(LoggingConfig::from_flags(cli.verbose, cli.log_json))?;

    let context = AppContext::load(cli.config.as_deref())?;
    let result = dispatch(cli.command, &context).await;

    context.registry.teardown().await;
    result
}

async fn dispatch(command: Commands, context: &AppContext) -> anyhow::Result<()> {
    match command {
        Commands::Migrate { migrate_command } => match migrate_command {
            MigrateCommands::Run { file, connection } => {
                migrate::run(context, &file, connection.as_deref()).await?;
            }
            MigrateCommands::All { connection } => {
                migrate::all(context, connection.as_deref()).await?;
            }
            MigrateCommands::Rollback { file, connection } => {
                migrate::rollback(context, &file, connection.as_deref()).await?;
            }
            MigrateCommands::RollbackBatch { batch, connection } => {
                migrate::rollback_batch(context, batch, connection.as_deref()).await?;
            }
            MigrateCommands::RollbackAll { connection } => {
                migrate::rollback_all(context, connection.as_deref()).await?;
            }
            MigrateCommands::Fresh { connection } => {
                migrate::fresh(context, connection.as_deref()).await?;
            }
            MigrateCommands::Status { connection, json } => {
                migrate::status(context, connection.as_deref(), json).await?;
            }
            MigrateCommands::Create { name } => {
                migrate::create(context, &name)?;
            }
        },
        Commands::Db { db_command } => match db_command {
            DbCommands::Connections => {
                db::connections(context);
            }
            DbCommands::Status { connection } => {
                db::status(context, connection.as_deref()).await?;
            }
        },
    }

    Ok(())
}
