/// Data model shared across all Stickerpull crates.
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AssetFailure;

/// One sticker inside a pack listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHandle {
    pub id: String,
    pub is_animated: bool,
    pub is_video: bool,
}

impl AssetHandle {
    pub fn new(id: impl Into<String>, is_animated: bool, is_video: bool) -> Self {
        Self {
            id: id.into(),
            is_animated,
            is_video,
        }
    }

    /// Storage format of the downloaded payload.
    pub fn kind(&self) -> AssetKind {
        if self.is_animated || self.is_video {
            AssetKind::Motion
        } else {
            AssetKind::Still
        }
    }

    /// Output file name, a pure function of id and flags.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.kind().extension())
    }
}

/// File format an asset is saved under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Animated or video sticker, saved as `.mp4`.
    Motion,
    /// Static sticker, saved as `.webp`.
    Still,
}

impl AssetKind {
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Motion => "mp4",
            AssetKind::Still => "webp",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Motion => write!(f, "motion"),
            AssetKind::Still => write!(f, "still"),
        }
    }
}

/// Server-side relative path of an asset's binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPath(pub String);

impl AssetPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ordered sticker handles of one pack, as the server reported them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackListing {
    pub name: String,
    pub title: Option<String>,
    pub assets: Vec<AssetHandle>,
}

impl PackListing {
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Binary payload returned by a file download.
#[derive(Debug, Clone)]
pub struct BinaryPayload {
    pub status: u16,
    pub bytes: Vec<u8>,
}

/// A fully written asset on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub kind: AssetKind,
}

/// Terminal state of one asset's pipeline.
#[derive(Debug, Clone)]
pub struct AssetOutcome {
    pub asset_id: String,
    pub result: Result<DownloadedFile, AssetFailure>,
}

impl AssetOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a batch fetch produced, in listing order.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub pack: String,
    pub directory: PathBuf,
    pub outcomes: Vec<AssetOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl FetchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &DownloadedFile> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Failed assets as `(asset_id, cause)` pairs.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &AssetFailure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.asset_id.as_str(), e)))
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// True when every asset of the listing was written.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(AssetOutcome::is_success)
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}
