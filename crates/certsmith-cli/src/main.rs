mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "certsmith",
    version,
    about = "Issue and inspect X.509 certificate bundles"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a certificate bundle and write it as a ZIP archive
    Issue {
        /// Path to settings YAML file
        settings: PathBuf,
        /// Output directory, or a path ending in .zip
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Describe a certificate (PEM chain or DER)
    Inspect {
        /// Certificate file
        cert: PathBuf,
        /// Private key to match against the certificate chain
        #[arg(long)]
        key: Option<PathBuf>,
        /// Use this Wasm module instead of the native backend
        #[arg(long)]
        wasm: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a settings file without issuing anything
    Check {
        /// Path to settings YAML file
        settings: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Issue { settings, output } => {
            commands::issue::execute(&settings, output.as_deref()).await
        }
        Commands::Inspect {
            cert,
            key,
            wasm,
            json,
        } => commands::inspect::execute(&cert, key.as_deref(), wasm, json).await,
        Commands::Check { settings } => commands::check::execute(&settings),
    }
}
