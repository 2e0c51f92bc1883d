/// Recently used download directories.
///
/// Stored as a newline-delimited UTF-8 file, most recent first, unique by path.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

pub const HISTORY_FILE_NAME: &str = "dirs.txt";
const APP_DIR_NAME: &str = "stickerpull";

/// Default location: `<config dir>/stickerpull/dirs.txt`.
pub fn default_history_path() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(dirs::home_dir)
        .context("Could not determine a per-user config directory")?;
    Ok(base.join(APP_DIR_NAME).join(HISTORY_FILE_NAME))
}

/// Ordered directory list backed by a flat file.
#[derive(Debug, Clone)]
pub struct DirHistory {
    path: PathBuf,
    entries: Vec<String>,
}

impl DirHistory {
    /// Load the list from `path`. A missing file is an empty list.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => parse_entries(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No directory history at {:?}", path);
                Vec::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {:?}", path));
            }
        };

        Ok(Self { path, entries })
    }

    /// Load from the default per-user location.
    pub async fn load_default() -> Result<Self> {
        Self::load(default_history_path()?).await
    }

    /// Write the list back to disk, creating the parent directory.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        tokio::fs::write(&self.path, self.entries.join("\n"))
            .await
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        Ok(())
    }

    /// Append a directory if it is new. Returns whether the list changed.
    pub async fn add_directory(&mut self, dir: &str) -> Result<bool> {
        let dir = dir.trim();
        if dir.is_empty() || self.entries.iter().any(|d| d == dir) {
            return Ok(false);
        }
        self.entries.push(dir.to_string());
        self.save().await?;
        info!("Added download directory {}", dir);
        Ok(true)
    }

    /// Move a known directory to the front. Unknown paths are ignored.
    pub async fn promote_directory(&mut self, dir: &str) -> Result<bool> {
        let dir = dir.trim();
        let Some(pos) = self.entries.iter().position(|d| d == dir) else {
            warn!("Directory {} is not in the history", dir);
            return Ok(false);
        };
        if pos == 0 {
            return Ok(false);
        }
        let entry = self.entries.remove(pos);
        self.entries.insert(0, entry);
        self.save().await?;
        Ok(true)
    }

    pub fn list_directories(&self) -> &[String] {
        &self.entries
    }

    /// The most recently used directory.
    pub fn current(&self) -> Option<&str> {
        self.entries.first().map(String::as_str)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_entries(contents: &str) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if !line.is_empty() && !entries.iter().any(|e| e == line) {
            entries.push(line.to_string());
        }
    }
    entries
}

/// Open a directory in the platform file manager.
pub async fn open_in_file_manager(dir: &Path) -> Result<()> {
    if !dir.exists() {
        anyhow::bail!("Directory {:?} does not exist", dir);
    }

    let opener = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };

    tokio::process::Command::new(opener)
        .arg(dir)
        .spawn()
        .with_context(|| format!("Failed to launch {}", opener))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let history = DirHistory::load(tmp.path().join("nope").join("dirs.txt")).await.unwrap();
        assert!(history.list_directories().is_empty());
        assert_eq!(history.current(), None);
    }

    #[tokio::test]
    async fn test_add_is_unique_and_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("cfg").join("dirs.txt");

        let mut history = DirHistory::load(&file).await.unwrap();
        assert!(history.add_directory("/data/a").await.unwrap());
        assert!(history.add_directory("/data/b").await.unwrap());
        assert!(!history.add_directory("/data/a").await.unwrap());
        assert!(!history.add_directory("  ").await.unwrap());

        let reloaded = DirHistory::load(&file).await.unwrap();
        assert_eq!(reloaded.list_directories(), &["/data/a", "/data/b"]);
    }

    #[tokio::test]
    async fn test_promote_moves_to_front() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("dirs.txt");

        let mut history = DirHistory::load(&file).await.unwrap();
        history.add_directory("/a").await.unwrap();
        history.add_directory("/b").await.unwrap();
        history.add_directory("/c").await.unwrap();

        assert!(history.promote_directory("/c").await.unwrap());
        assert_eq!(history.list_directories(), &["/c", "/a", "/b"]);
        assert_eq!(history.current(), Some("/c"));

        assert!(!history.promote_directory("/missing").await.unwrap());
        assert!(!history.promote_directory("/c").await.unwrap());

        let reloaded = DirHistory::load(&file).await.unwrap();
        assert_eq!(reloaded.list_directories(), &["/c", "/a", "/b"]);
    }

    #[tokio::test]
    async fn test_blank_and_duplicate_lines_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("dirs.txt");
        tokio::fs::write(&file, "/a\n\n/b\r\n/a\n").await.unwrap();

        let history = DirHistory::load(&file).await.unwrap();
        assert_eq!(history.list_directories(), &["/a", "/b"]);
    }
}
