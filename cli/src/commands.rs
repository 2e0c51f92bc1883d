/// Command handlers for the stickerpull CLI.
///
/// Handles download, convert and the recent-directory subcommands.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use stickerpull_downloader::{convert_directory, Encoder, HttpBotApi, StickerFetcher};
use stickerpull_shared::config::{ClientConfig, FetchOptions, DEFAULT_CONCURRENCY};
use stickerpull_shared::dir_history::{open_in_file_manager, DirHistory};
use stickerpull_shared::errors::StickerError;
use stickerpull_shared::models::FetchReport;
use stickerpull_shared::pack_name::normalize_pack_name;

/// Fallback download root when no directory has been used yet.
pub const DEFAULT_DOWNLOAD_ROOT: &str = "stickers";

/// CLI command definitions.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every sticker of a pack
    Download {
        /// Pack name or t.me/addstickers link
        pack: String,
        /// Download root (the pack gets its own sub-folder); remembered for next time
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Maximum parallel downloads
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Attempts per sticker download
        #[arg(long)]
        attempts: Option<u32>,
        /// Give up on the whole batch after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },
    /// Convert a downloaded pack to GIF/WebP and zip the result
    Convert {
        /// Pack name or t.me/addstickers link
        pack: String,
        /// Download root the pack was saved under
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Manage recently used download directories
    Dirs {
        #[command(subcommand)]
        action: DirsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum DirsAction {
    /// List directories, most recent first
    List,
    /// Remember a directory
    Add { path: PathBuf },
    /// Make a remembered directory the current one
    Use { path: PathBuf },
    /// Open a directory (default: the current one) in the file manager
    Open { path: Option<PathBuf> },
}

/// Handle a parsed command. Returns whether everything succeeded.
pub async fn handle_command(cmd: Command, history_file: Option<PathBuf>) -> Result<bool> {
    let mut history = load_history(history_file).await;

    match cmd {
        Command::Download {
            pack,
            dir,
            concurrency,
            attempts,
            deadline_secs,
        } => {
            let mut options = FetchOptions::default().with_concurrency(concurrency);
            if let Some(attempts) = attempts {
                options = options.with_fetch_attempts(attempts);
            }
            if let Some(secs) = deadline_secs {
                options = options.with_deadline(std::time::Duration::from_secs(secs));
            }
            cmd_download(&pack, dir, options, &mut history).await
        }
        Command::Convert { pack, dir } => cmd_convert(&pack, dir, &mut history).await,
        Command::Dirs { action } => cmd_dirs(action, &mut history).await,
    }
}

async fn load_history(history_file: Option<PathBuf>) -> Option<DirHistory> {
    let loaded = match history_file {
        Some(path) => DirHistory::load(path).await,
        None => DirHistory::load_default().await,
    };
    match loaded {
        Ok(history) => Some(history),
        Err(e) => {
            warn!("Directory history unavailable: {:#}", e);
            None
        }
    }
}

/// Pick the download root: explicit flag, else most recent directory, else `stickers`.
/// An explicit directory is remembered and promoted.
async fn resolve_root(dir: Option<PathBuf>, history: &mut Option<DirHistory>) -> PathBuf {
    match dir {
        Some(dir) => {
            if let Some(history) = history.as_mut() {
                let key = dir.to_string_lossy().to_string();
                if let Err(e) = remember(history, &key).await {
                    warn!("Could not update directory history: {:#}", e);
                }
            }
            dir
        }
        None => history
            .as_ref()
            .and_then(|h| h.current())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_ROOT)),
    }
}

async fn remember(history: &mut DirHistory, dir: &str) -> Result<()> {
    history.add_directory(dir).await?;
    history.promote_directory(dir).await?;
    Ok(())
}

async fn cmd_download(
    pack: &str,
    dir: Option<PathBuf>,
    options: FetchOptions,
    history: &mut Option<DirHistory>,
) -> Result<bool> {
    let pack = normalize_pack_name(pack)?;
    let target = resolve_root(dir, history).await.join(&pack);

    let config = ClientConfig::from_env()?;
    let api = HttpBotApi::new(config).context("Failed to build HTTP client")?;
    let fetcher = StickerFetcher::new(&api, options);

    let cancel = CancellationToken::new();
    let ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining downloads");
            ctrlc.cancel();
        }
    });

    match fetcher.fetch_all(&pack, &target, &cancel).await {
        Ok(report) => {
            print_fetch_summary(&report);
            Ok(report.is_complete())
        }
        Err(StickerError::PackNotFound { pack, description }) => {
            error!(
                "Sticker set '{}' was not found ({}). Check the name or the t.me/addstickers link.",
                pack, description
            );
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_fetch_summary(report: &FetchReport) {
    println!(
        "Sticker pack \"{}\": {} of {} downloaded to {} in {:.1}s",
        report.pack,
        report.success_count(),
        report.outcomes.len(),
        report.directory().display(),
        report.elapsed().num_milliseconds() as f64 / 1000.0
    );
    for (asset_id, failure) in report.failed() {
        println!("  [{}] {}: {}", failure.code(), asset_id, failure);
    }
}

async fn cmd_convert(pack: &str, dir: Option<PathBuf>, history: &mut Option<DirHistory>) -> Result<bool> {
    let pack = normalize_pack_name(pack)?;
    let target = resolve_root(dir, history).await.join(&pack);

    let encoder = Encoder::discover();
    let report = convert_directory(&target, &encoder).await?;

    println!(
        "Converted {} animated stickers ({} already done), copied {} static stickers",
        report.converted.len(),
        report.skipped.len(),
        report.copied.len()
    );
    for (input, reason) in &report.failed {
        println!("  [FAILED] {}: {}", input.display(), reason);
    }
    if let Some(archive) = &report.archive {
        println!("Archive: {}", archive.display());
    }
    Ok(report.failed.is_empty())
}

async fn cmd_dirs(action: DirsAction, history: &mut Option<DirHistory>) -> Result<bool> {
    let history = history
        .as_mut()
        .context("Directory history could not be loaded")?;

    match action {
        DirsAction::List => {
            if history.list_directories().is_empty() {
                println!("No directories yet. Add one with `stickerpull dirs add <PATH>`.");
            }
            for (i, dir) in history.list_directories().iter().enumerate() {
                let marker = if i == 0 { "*" } else { " " };
                println!("{} {}", marker, dir);
            }
        }
        DirsAction::Add { path } => {
            let key = path.to_string_lossy().to_string();
            if history.add_directory(&key).await? {
                info!("Remembered {}", key);
            } else {
                println!("{} is already known", key);
            }
        }
        DirsAction::Use { path } => {
            let key = path.to_string_lossy().to_string();
            if !history.promote_directory(&key).await? && history.current() != Some(key.as_str()) {
                println!("{} is not a remembered directory; add it first", key);
                return Ok(false);
            }
        }
        DirsAction::Open { path } => {
            let dir = match path {
                Some(p) => p,
                None => PathBuf::from(history.current().unwrap_or(DEFAULT_DOWNLOAD_ROOT)),
            };
            open_in_file_manager(&dir).await?;
        }
    }
    Ok(true)
}
