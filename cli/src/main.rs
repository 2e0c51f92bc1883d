/// Stickerpull - Main Entry Point
///
/// Command-line front end that downloads Telegram sticker packs through the
/// Bot API and converts them into shareable GIF/WebP bundles.
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use commands::Command;

#[derive(Parser, Debug)]
#[command(name = "stickerpull", version, about = "Download and convert Telegram sticker packs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory history file (default: <config dir>/stickerpull/dirs.txt)
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stickerpull_cli=info,stickerpull_downloader=info,stickerpull_shared=info".into()
            }),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    info!("stickerpull {} starting", env!("CARGO_PKG_VERSION"));

    match commands::handle_command(cli.command, cli.history_file).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
