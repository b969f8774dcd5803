//! stockroom CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use stockroom::{
    commands::{
        cmd_ingest, cmd_init, cmd_report, cmd_runs, cmd_serve, print_ingest_result,
        print_init_summary, print_report_output, print_runs, InitOptions,
    },
    config::Config,
    db::Db,
    error::{Error, Result},
    progress::LogWriterFactory,
};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(version, about = "Bookstore inventory ingestion and reporting", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "STOCKROOM_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize stockroom configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP API
    Serve {
        /// Address to listen on (overrides server.bind_addr)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Ingest an inventory CSV file
    Ingest {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// Render a store's PDF inventory report
    Report {
        /// Store ID (UUID)
        store_id: String,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List recent ingestion runs
    Runs {
        /// Maximum number of runs
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool, log_json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(LogWriterFactory))
            .with(filter)
            .init();
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    // Handle init command specially (doesn't need existing config)
    if let Commands::Init { force } = cli.command {
        let config_path = cli.config.unwrap_or_else(Config::default_config_path);
        let summary = cmd_init(InitOptions { config_path, force }).await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_init_summary(&summary);
        }
        return Ok(());
    }

    // Handle completions command (doesn't need config/db)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "stockroom", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    if !config.is_initialized() {
        return Err(Error::NotInitialized);
    }
    let db = Db::connect(&config).await?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Serve { bind } => {
            cmd_serve(config, db, bind).await?;
        }

        Commands::Ingest { file } => {
            let result = cmd_ingest(&config, &db, &file, !cli.json).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_ingest_result(&result);
            }
        }

        Commands::Report { store_id, output } => {
            let output = cmd_report(&config, &db, &store_id, output).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_report_output(&output);
            }
        }

        Commands::Runs { limit } => {
            let runs = cmd_runs(&db, limit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else {
                print_runs(&runs);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}
