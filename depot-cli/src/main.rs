mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use depot::{DepotConfig, EngineError, LoggingConfig, StorageEngine};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "depot")]
#[command(about = "depot - read and write objects across named storage backends")]
#[command(version)]
struct Cli {
    /// Configuration file path (default: ~/.depot/config.toml)
    #[arg(short, long, env = "DEPOT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured backends
    Backends,

    /// Show which backend and path an identifier resolves to
    Resolve {
        /// Identifier, e.g. docs:reports/q1.pdf
        identifier: String,
    },

    /// Print an object to stdout
    Cat { identifier: String },

    /// Write an object from a file, a string or stdin
    Put {
        identifier: String,

        /// Read contents from this file
        #[arg(short, long, conflicts_with = "data")]
        file: Option<PathBuf>,

        /// Use this string as contents
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Delete an object
    Rm { identifier: String },

    /// Check whether an object exists
    Exists { identifier: String },

    /// Show object metadata
    Stat { identifier: String },

    /// List objects under a path
    Ls {
        identifier: String,

        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Move an object, across backends if needed
    Mv { from: String, to: String },

    /// Copy an object, across backends if needed
    Cp { from: String, to: String },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone()),
    );
    let json = logging.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<DepotConfig> {
    let path = match path {
        Some(path) => path,
        None => DepotConfig::default_path()?,
    };
    DepotConfig::load_or_default(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))
}

async fn run(cli: Cli, engine: &StorageEngine) -> Result<()> {
    match cli.command {
        Commands::Backends => commands::backends(engine),
        Commands::Resolve { identifier } => commands::resolve(engine, &identifier),
        Commands::Cat { identifier } => commands::cat(engine, &identifier).await,
        Commands::Put {
            identifier,
            file,
            data,
        } => commands::put(engine, &identifier, file, data).await,
        Commands::Rm { identifier } => commands::rm(engine, &identifier).await,
        Commands::Exists { identifier } => commands::exists(engine, &identifier).await,
        Commands::Stat { identifier } => commands::stat(engine, &identifier).await,
        Commands::Ls { identifier, limit } => commands::ls(engine, &identifier, limit).await,
        Commands::Mv { from, to } => commands::mv(engine, &from, &to).await,
        Commands::Cp { from, to } => commands::cp(engine, &from, &to).await,
    }
}

/// Exit code for a failed command: 2 for bad identifiers, 3 for missing
/// backends or objects, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<EngineError>() {
        Some(e) if e.is_bad_request() => 2,
        Some(e) if e.is_not_found() => 3,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.clone())?;
    init_tracing(&config.logging);

    let engine = StorageEngine::from_config(&config).context("Invalid backend configuration")?;
    tracing::debug!(backends = ?engine.backend_names(), "Engine ready");

    match run(cli, &engine).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            let code = exit_code(&err);
            match err.downcast_ref::<EngineError>() {
                Some(e) if e.is_traversal() => {
                    eprintln!("error: path escapes the backend root: {:#}", err)
                }
                Some(e) if e.is_bad_request() => eprintln!("error: bad request: {:#}", err),
                Some(e) if e.is_not_found() => eprintln!("error: not found: {:#}", err),
                _ => eprintln!("error: {:#}", err),
            }
            Ok(ExitCode::from(code))
        }
    }
}
