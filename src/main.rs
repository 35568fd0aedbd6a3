use clap::{Args, Parser, Subcommand};
use nem12_import::cli::run::ImportOptions;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nem12-import")]
#[command(about = "Import NEM12 interval meter data into DuckDB", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a NEM12 file
    Import(ImportArgs),
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct ImportArgs {
    /// NEM12 file to import
    #[arg(long)]
    file: PathBuf,

    /// IANA time zone of the file's dates, e.g. Australia/Sydney
    #[arg(long)]
    timezone: Option<String>,

    /// DuckDB database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Write failed lines to this file as JSON lines
    #[arg(long)]
    failures: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config file
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let debug = matches!(&cli.command, Commands::Import(args) if args.debug);
    let default_filter = if debug {
        "nem12_import=debug"
    } else {
        "nem12_import=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Import(args) => {
            let options = ImportOptions {
                file: args.file,
                timezone: args.timezone,
                database: args.database,
                failures: args.failures,
            };
            nem12_import::cli::run::run(cli.config.as_deref(), options).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => {
                nem12_import::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}
