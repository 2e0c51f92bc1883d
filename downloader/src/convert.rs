/// Sticker conversion through an external encoder.
///
/// Animated stickers (`*.mp4`) are encoded to looping GIFs under `gif/`,
/// static stickers (`*.webp`) are copied under `img/`, and both folders are
/// bundled into `converted_files.zip`. One encoder process per input, run
/// sequentially.
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{debug, info, warn};
use zip::write::FileOptions;

use stickerpull_shared::errors::{StickerError, StickerResult};

pub const GIF_DIR: &str = "gif";
pub const IMG_DIR: &str = "img";
pub const ARCHIVE_NAME: &str = "converted_files.zip";

/// Locate the ffmpeg binary.
/// Checks FFMPEG_PATH first, then common install locations, then falls back to PATH lookup.
fn discover_ffmpeg() -> PathBuf {
    let exe = if cfg!(target_os = "windows") { "ffmpeg.exe" } else { "ffmpeg" };

    // FFMPEG_PATH may name the binary itself or its directory
    if let Ok(configured) = std::env::var("FFMPEG_PATH") {
        let p = PathBuf::from(&configured);
        if p.is_file() {
            return p;
        }
        if p.join(exe).is_file() {
            return p.join(exe);
        }
        warn!("FFMPEG_PATH={} does not contain {}", configured, exe);
    }

    let common: &[&str] = if cfg!(target_os = "windows") {
        &[r"C:\ffmpeg\bin", r"C:\Program Files\ffmpeg\bin"]
    } else {
        &[
            "/usr/bin",
            "/usr/local/bin",
            "/snap/bin",
            "/opt/homebrew/bin",
            "/home/linuxbrew/.linuxbrew/bin",
        ]
    };

    for dir in common {
        let candidate = PathBuf::from(dir).join(exe);
        if candidate.is_file() {
            return candidate;
        }
    }

    // Let the OS resolve it from PATH at spawn time
    PathBuf::from(exe)
}

/// External encoder invocation.
#[derive(Debug, Clone)]
pub struct Encoder {
    program: PathBuf,
}

impl Encoder {
    /// Find ffmpeg on this machine.
    pub fn discover() -> Self {
        let program = discover_ffmpeg();
        debug!("Using encoder {:?}", program);
        Self { program }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for a looping, lanczos-scaled GIF at the source size and frame rate.
    pub fn gif_args(input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-vf".into(),
            "scale=iw:ih:flags=lanczos".into(),
            "-loop".into(),
            "0".into(),
            output.as_os_str().to_owned(),
        ]
    }

    /// Encode one animated sticker to GIF.
    pub async fn encode_gif(&self, input: &Path, output: &Path) -> StickerResult<()> {
        let result = tokio::process::Command::new(&self.program)
            .args(Self::gif_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                StickerError::Conversion(format!("failed to run {:?}: {}", self.program, e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            return Err(StickerError::Conversion(format!(
                "encoder exited with {} for {:?}: {}",
                result.status, input, tail
            )));
        }
        Ok(())
    }
}

/// Work derived from the contents of a sticker directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    /// `(input.mp4, gif/<stem>.gif)` pairs to encode.
    pub encode: Vec<(PathBuf, PathBuf)>,
    /// Inputs whose rendition already exists.
    pub skipped: Vec<PathBuf>,
    /// `(input.webp, img/<name>.webp)` pairs to copy.
    pub copy: Vec<(PathBuf, PathBuf)>,
}

/// What a conversion run produced.
#[derive(Debug, Default, Clone)]
pub struct ConversionReport {
    pub converted: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub copied: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub archive: Option<PathBuf>,
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Scan `dir` (non-recursively) and decide what to encode, skip and copy.
pub async fn plan_conversion(dir: &Path) -> StickerResult<ConversionPlan> {
    let gif_dir = dir.join(GIF_DIR);
    let img_dir = dir.join(IMG_DIR);

    let mut inputs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            inputs.push(entry.path());
        }
    }
    inputs.sort();

    let mut plan = ConversionPlan::default();
    for input in inputs {
        let (Some(stem), Some(name)) = (input.file_stem(), input.file_name()) else {
            continue;
        };
        let stem = stem.to_string_lossy().to_string();

        if has_extension(&input, "mp4") {
            let gif = gif_dir.join(format!("{}.gif", stem));
            let png = img_dir.join(format!("{}.png", stem));
            if gif.exists() || png.exists() {
                plan.skipped.push(input);
            } else {
                plan.encode.push((input, gif));
            }
        } else if has_extension(&input, "webp") {
            let target = img_dir.join(name);
            plan.copy.push((input, target));
        }
    }
    Ok(plan)
}

/// Convert every sticker in `dir` and bundle the results into an archive.
///
/// A failed encode is recorded in the report and the rest of the batch continues.
pub async fn convert_directory(dir: &Path, encoder: &Encoder) -> StickerResult<ConversionReport> {
    if !dir.is_dir() {
        return Err(StickerError::InvalidInput(format!(
            "{:?} is not a directory; download the pack first",
            dir
        )));
    }

    tokio::fs::create_dir_all(dir.join(GIF_DIR)).await?;
    tokio::fs::create_dir_all(dir.join(IMG_DIR)).await?;

    let plan = plan_conversion(dir).await?;
    info!(
        "Converting {:?}: {} to encode, {} already done, {} to copy",
        dir,
        plan.encode.len(),
        plan.skipped.len(),
        plan.copy.len()
    );

    let mut report = ConversionReport {
        skipped: plan.skipped,
        ..Default::default()
    };

    for skipped in &report.skipped {
        debug!("{:?} already converted, skipping", skipped);
    }

    for (input, output) in plan.encode {
        match encoder.encode_gif(&input, &output).await {
            Ok(()) => {
                info!("Converted {:?} to {:?}", input, output);
                report.converted.push(output);
            }
            Err(e) => {
                warn!("Conversion of {:?} failed: {}", input, e);
                let _ = tokio::fs::remove_file(&output).await;
                report.failed.push((input, e.to_string()));
            }
        }
    }

    for (input, output) in plan.copy {
        tokio::fs::copy(&input, &output).await?;
        report.copied.push(output);
    }

    let archive = dir.join(ARCHIVE_NAME);
    let base = dir.to_path_buf();
    let archive_path = archive.clone();
    let entries = tokio::task::spawn_blocking(move || {
        bundle_archive(&base, &[GIF_DIR, IMG_DIR], &archive_path)
    })
    .await
    .map_err(|e| StickerError::Archive(format!("archive task failed: {}", e)))??;

    info!("Zipped {} files into {:?}", entries, archive);
    report.archive = Some(archive);
    Ok(report)
}

/// Zip the given sub-folders of `base` into `archive`, with entry names relative to `base`.
/// Returns the number of files written.
pub fn bundle_archive(base: &Path, folders: &[&str], archive: &Path) -> StickerResult<usize> {
    let mut files = Vec::new();
    for folder in folders {
        let root = base.join(folder);
        if root.is_dir() {
            collect_files(&root, &mut files)?;
        }
    }
    files.sort();

    let file = std::fs::File::create(archive)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for path in &files {
        let relative = path
            .strip_prefix(base)
            .map_err(|e| StickerError::Archive(e.to_string()))?;
        // Zip entry names always use forward slashes
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(name, options)
            .map_err(|e| StickerError::Archive(e.to_string()))?;
        zip.write_all(&std::fs::read(path)?)?;
    }

    zip.finish().map_err(|e| StickerError::Archive(e.to_string()))?;
    Ok(files.len())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
