/// Bounded concurrent sticker pack fetcher.
///
/// Looks up a pack, then runs one resolve -> download -> write pipeline per
/// sticker, at most `concurrency` at a time. A failing sticker is recorded in
/// the report and never stops its siblings.
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Utc;
use futures_util::future::join_all;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use stickerpull_shared::config::FetchOptions;
use stickerpull_shared::errors::{
    is_retriable_status, ApiError, AssetFailure, StickerError, StickerResult,
};
use stickerpull_shared::models::{
    AssetHandle, AssetOutcome, AssetPath, DownloadedFile, FetchReport,
};
use stickerpull_shared::task_queue::FetchQueue;

use crate::api::BotApi;

/// Cancellation token plus optional deadline, shared by every pipeline of a batch.
#[derive(Clone)]
struct Interrupt {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Interrupt {
    fn check(&self) -> Result<(), AssetFailure> {
        if self.token.is_cancelled() {
            return Err(AssetFailure::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Err(AssetFailure::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    async fn fired(&self) -> AssetFailure {
        match self.deadline {
            Some(at) => tokio::select! {
                _ = self.token.cancelled() => AssetFailure::Cancelled,
                _ = tokio::time::sleep_until(at) => AssetFailure::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                AssetFailure::Cancelled
            }
        }
    }

    /// Run `fut` unless the batch is interrupted first.
    async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, AssetFailure> {
        tokio::select! {
            biased;
            failure = self.fired() => Err(failure),
            value = fut => Ok(value),
        }
    }
}

/// Fetches whole sticker packs through a [`BotApi`].
pub struct StickerFetcher<'a, A: BotApi> {
    api: &'a A,
    options: FetchOptions,
}

impl<'a, A: BotApi> StickerFetcher<'a, A> {
    pub fn new(api: &'a A, options: FetchOptions) -> Self {
        Self { api, options }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Download every sticker of `pack_name` into `target_dir`.
    ///
    /// Fails as a whole only on invalid input or when the pack lookup fails,
    /// in which case nothing is written. Otherwise every sticker gets an
    /// outcome in the report, in listing order. `Ok` means every write was
    /// attempted; check [`FetchReport::is_complete`] for "all succeeded".
    pub async fn fetch_all(
        &self,
        pack_name: &str,
        target_dir: &Path,
        cancel: &CancellationToken,
    ) -> StickerResult<FetchReport> {
        self.options.validate()?;
        if pack_name.trim().is_empty() {
            return Err(StickerError::InvalidInput(
                "sticker pack name must not be empty".to_string(),
            ));
        }

        let started_at = Utc::now();
        let deadline = self.options.deadline.map(|d| Instant::now() + d);

        let listing = match self.api.sticker_set(pack_name).await {
            Ok(listing) => listing,
            Err(ApiError::Rejected { description, .. }) => {
                error!("Failed to get sticker set {}: {}", pack_name, description);
                return Err(StickerError::PackNotFound {
                    pack: pack_name.to_string(),
                    description,
                });
            }
            Err(e) => {
                error!("Sticker set lookup for {} failed: {}", pack_name, e);
                return Err(e.into());
            }
        };

        tokio::fs::create_dir_all(target_dir).await?;
        let swept = sweep_partial_files(target_dir).await?;
        if swept > 0 {
            info!("Removed {} stale partial files from {:?}", swept, target_dir);
        }
        info!(
            "Fetching {} stickers of {} into {:?} ({} at a time)",
            listing.len(),
            listing.name,
            target_dir,
            self.options.concurrency
        );

        let queue = FetchQueue::new(self.options.concurrency);
        for asset in &listing.assets {
            queue.enqueue(&asset.id).await;
        }

        let interrupt = Interrupt {
            token: cancel.child_token(),
            deadline,
        };

        // Every unit waits on the queue; its semaphore is the only concurrency bound
        let units = join_all(
            listing
                .assets
                .iter()
                .map(|asset| self.run_unit(asset, target_dir, &queue, &interrupt)),
        );
        tokio::pin!(units);

        let outcomes = tokio::select! {
            outcomes = &mut units => outcomes,
            failure = interrupt.fired() => {
                warn!("Pack {} interrupted ({}), no new downloads will start", pack_name, failure);
                queue.close();
                units.await
            }
        };

        let report = FetchReport {
            pack: pack_name.to_string(),
            directory: target_dir.to_path_buf(),
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };

        let stats = queue.stats().await;
        info!(
            "Pack {} finished: {} written, {} failed, peak concurrency {}/{}",
            pack_name,
            report.success_count(),
            report.failure_count(),
            stats.peak_running,
            stats.max_concurrent
        );
        Ok(report)
    }

    /// One sticker, from waiting for a slot to a terminal state.
    async fn run_unit(
        &self,
        asset: &AssetHandle,
        target_dir: &Path,
        queue: &FetchQueue,
        interrupt: &Interrupt,
    ) -> AssetOutcome {
        let result = match queue.acquire(&asset.id).await {
            // Closed queue: the batch was interrupted while this unit waited
            None => Err(interrupt.check().err().unwrap_or(AssetFailure::Cancelled)),
            Some(_slot) => self.pipeline(asset, target_dir, interrupt).await,
        };

        match &result {
            Ok(file) => {
                queue.complete(&asset.id).await;
                info!("Downloaded {:?} ({} bytes)", file.path, file.size_bytes);
            }
            Err(failure) if failure.is_interruption() => {
                queue.mark_cancelled(&asset.id).await;
                debug!("Skipped {}: {}", asset.id, failure);
            }
            Err(failure) => {
                queue.fail(&asset.id).await;
                warn!("Failed to download {}: {}", asset.id, failure);
            }
        }

        AssetOutcome {
            asset_id: asset.id.clone(),
            result,
        }
    }

    /// Resolve, download and write, strictly in that order.
    async fn pipeline(
        &self,
        asset: &AssetHandle,
        target_dir: &Path,
        interrupt: &Interrupt,
    ) -> Result<DownloadedFile, AssetFailure> {
        interrupt.check()?;
        let path = interrupt
            .guard(self.api.file_path(&asset.id))
            .await?
            .map_err(|e| AssetFailure::MetadataLookup(e.to_string()))?;

        interrupt.check()?;
        let bytes = self.download(asset, &path, interrupt).await?;

        // Past this point the write runs to completion; the rename keeps it all-or-nothing
        interrupt.check()?;
        let file_name = asset.file_name();
        let written = write_atomically(target_dir, &file_name, &bytes)
            .await
            .map_err(|e| AssetFailure::Write(e.to_string()))?;

        Ok(DownloadedFile {
            path: written,
            size_bytes: bytes.len() as u64,
            kind: asset.kind(),
        })
    }

    /// Binary download with bounded retry on transient failures.
    async fn download(
        &self,
        asset: &AssetHandle,
        path: &AssetPath,
        interrupt: &Interrupt,
    ) -> Result<Vec<u8>, AssetFailure> {
        let attempts = self.options.fetch_attempts;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let failure = match interrupt.guard(self.api.fetch_binary(path)).await? {
                Ok(payload) if payload.status == 200 => return Ok(payload.bytes),
                Ok(payload) => {
                    let failure = AssetFailure::HttpStatus(payload.status);
                    if !is_retriable_status(payload.status) {
                        return Err(failure);
                    }
                    failure
                }
                Err(ApiError::Status(status)) => {
                    let failure = AssetFailure::HttpStatus(status);
                    if !is_retriable_status(status) {
                        return Err(failure);
                    }
                    failure
                }
                Err(e) => {
                    let retriable = e.is_retriable();
                    let failure = AssetFailure::Network(e.to_string());
                    if !retriable {
                        return Err(failure);
                    }
                    failure
                }
            };

            if attempt >= attempts {
                return Err(failure);
            }

            let wait = self.options.retry_backoff * attempt;
            warn!(
                "Download of {} failed ({}), retrying in {:?} ({}/{})",
                asset.id, failure, wait, attempt, attempts
            );
            interrupt.guard(tokio::time::sleep(wait)).await?;
        }
    }
}

/// Write `bytes` to `<dir>/<file_name>` through a temporary file and a rename.
///
/// Readers never observe a partially written file under the final name.
pub async fn write_atomically(
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> std::io::Result<PathBuf> {
    if !is_safe_file_name(file_name) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("refusing to write unsafe file name {:?}", file_name),
        ));
    }

    let final_path = dir.join(file_name);
    let temp_path = dir.join(format!(
        ".{}.{}.part",
        file_name,
        uuid::Uuid::new_v4().simple()
    ));

    let result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, &final_path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(final_path)
}

/// Remove `.<name>.<uuid>.part` leftovers of an earlier run that died mid-write.
pub async fn sweep_partial_files(dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with('.') && name.ends_with(".part")) {
            continue;
        }
        if !entry.file_type().await?.is_file() {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!("Removed stale {}", name);
                removed += 1;
            }
            Err(e) => warn!("Could not remove stale {}: {}", name, e),
        }
    }
    Ok(removed)
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use stickerpull_shared::models::{BinaryPayload, PackListing};

    /// In-memory Bot API with failure injection and an in-flight counter.
    #[derive(Default)]
    struct FakeApi {
        packs: HashMap<String, Vec<AssetHandle>>,
        /// file id -> scripted statuses for successive downloads (last one repeats)
        statuses: HashMap<String, Vec<u16>>,
        unresolvable: HashSet<String>,
        download_delay: Duration,
        cancel_on_download: Option<CancellationToken>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        download_calls: Mutex<HashMap<String, usize>>,
    }

    impl FakeApi {
        fn with_pack(mut self, name: &str, assets: Vec<AssetHandle>) -> Self {
            self.packs.insert(name.to_string(), assets);
            self
        }

        fn with_statuses(mut self, id: &str, statuses: &[u16]) -> Self {
            self.statuses.insert(id.to_string(), statuses.to_vec());
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.download_delay = delay;
            self
        }

        fn calls_for(&self, id: &str) -> usize {
            self.download_calls.lock().unwrap().get(id).copied().unwrap_or(0)
        }
    }

    impl BotApi for FakeApi {
        async fn sticker_set(&self, name: &str) -> Result<PackListing, ApiError> {
            match self.packs.get(name) {
                Some(assets) => Ok(PackListing {
                    name: name.to_string(),
                    title: None,
                    assets: assets.clone(),
                }),
                None => Err(ApiError::Rejected {
                    method: "getStickerSet".into(),
                    code: Some(400),
                    description: "Bad Request: STICKERSET_INVALID".into(),
                }),
            }
        }

        async fn file_path(&self, file_id: &str) -> Result<AssetPath, ApiError> {
            if self.unresolvable.contains(file_id) {
                return Err(ApiError::Rejected {
                    method: "getFile".into(),
                    code: Some(400),
                    description: "Bad Request: invalid file_id".into(),
                });
            }
            Ok(AssetPath(format!("stickers/{}", file_id)))
        }

        async fn fetch_binary(&self, path: &AssetPath) -> Result<BinaryPayload, ApiError> {
            let id = path.as_str().trim_start_matches("stickers/").to_string();
            let call = {
                let mut calls = self.download_calls.lock().unwrap();
                let n = calls.entry(id.clone()).or_insert(0);
                *n += 1;
                *n
            };

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if let Some(token) = &self.cancel_on_download {
                token.cancel();
            }
            if !self.download_delay.is_zero() {
                tokio::time::sleep(self.download_delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let status = match self.statuses.get(&id) {
                Some(script) => script[(call - 1).min(script.len() - 1)],
                None => 200,
            };
            Ok(BinaryPayload {
                status,
                bytes: if status == 200 { format!("bytes of {}", id).into_bytes() } else { Vec::new() },
            })
        }
    }

    fn cats() -> Vec<AssetHandle> {
        vec![
            AssetHandle::new("a1", true, false),
            AssetHandle::new("a2", false, false),
            AssetHandle::new("a3", false, true),
        ]
    }

    fn many(n: usize) -> Vec<AssetHandle> {
        (0..n).map(|i| AssetHandle::new(format!("s{}", i), i % 2 == 0, false)).collect()
    }

    fn fast_options() -> FetchOptions {
        FetchOptions::default().with_retry_backoff(Duration::from_millis(1))
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_cats_pack_names_by_flags() {
        let api = FakeApi::default().with_pack("cats", cats());
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("stickers").join("cats");

        let fetcher = StickerFetcher::new(&api, fast_options());
        let report = fetcher.fetch_all("cats", &dir, &CancellationToken::new()).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(file_names(&dir), vec!["a1.mp4", "a2.webp", "a3.mp4"]);
        assert_eq!(
            std::fs::read(dir.join("a2.webp")).unwrap(),
            b"bytes of a2".to_vec()
        );
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
    }

    #[tokio::test]
    async fn test_unknown_pack_writes_nothing() {
        let api = FakeApi::default().with_pack("cats", cats());
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doesnotexist");

        let fetcher = StickerFetcher::new(&api, fast_options());
        let err = fetcher
            .fetch_all("doesnotexist", &dir, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StickerError::PackNotFound { ref pack, .. } if pack == "doesnotexist"));
        assert!(!dir.exists());
        assert_eq!(api.calls_for("a1"), 0);
    }

    #[tokio::test]
    async fn test_single_failure_is_isolated() {
        let api = FakeApi::default()
            .with_pack("cats", cats())
            .with_statuses("a2", &[404]);
        let tmp = tempfile::tempdir().unwrap();

        let fetcher = StickerFetcher::new(&api, fast_options());
        let report = fetcher
            .fetch_all("cats", tmp.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(file_names(tmp.path()), vec!["a1.mp4", "a3.mp4"]);
        assert_eq!(report.success_count(), 2);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed, vec![("a2", &AssetFailure::HttpStatus(404))]);
        // 404 is final, no retry
        assert_eq!(api.calls_for("a2"), 1);
    }

    #[tokio::test]
    async fn test_metadata_lookup_failure_is_isolated() {
        let mut api = FakeApi::default().with_pack("cats", cats());
        api.unresolvable.insert("a1".to_string());
        let tmp = tempfile::tempdir().unwrap();

        let fetcher = StickerFetcher::new(&api, fast_options());
        let report = fetcher
            .fetch_all("cats", tmp.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(file_names(tmp.path()), vec!["a2.webp", "a3.mp4"]);
        assert!(matches!(
            report.outcomes[0].result,
            Err(AssetFailure::MetadataLookup(_))
        ));
    }

    #[tokio::test]
    async fn test_transient_status_is_retried() {
        let api = FakeApi::default()
            .with_pack("cats", cats())
            .with_statuses("a3", &[503, 200]);
        let tmp = tempfile::tempdir().unwrap();

        let fetcher = StickerFetcher::new(&api, fast_options());
        let report = fetcher
            .fetch_all("cats", tmp.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(api.calls_for("a3"), 2);
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let api = FakeApi::default()
            .with_pack("cats", cats())
            .with_statuses("a1", &[502]);
        let tmp = tempfile::tempdir().unwrap();

        let fetcher = StickerFetcher::new(&api, fast_options().with_fetch_attempts(3));
        let report = fetcher
            .fetch_all("cats", tmp.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(api.calls_for("a1"), 3);
        assert!(matches!(report.outcomes[0].result, Err(AssetFailure::HttpStatus(502))));
        assert_eq!(report.success_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let api = FakeApi::default()
            .with_pack("big", many(20))
            .with_delay(Duration::from_millis(10));
        let tmp = tempfile::tempdir().unwrap();

        let fetcher = StickerFetcher::new(&api, fast_options().with_concurrency(3));
        let report = fetcher
            .fetch_all("big", tmp.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.success_count(), 20);
        // Downloads overlap up to the bound and never beyond it
        assert_eq!(api.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrency_of_one_is_sequential() {
        let api = FakeApi::default()
            .with_pack("big", many(5))
            .with_delay(Duration::from_millis(2));
        let tmp = tempfile::tempdir().unwrap();

        let fetcher = StickerFetcher::new(&api, fast_options().with_concurrency(1));
        fetcher
            .fetch_all("big", tmp.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(api.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_run_overwrites() {
        let api = FakeApi::default().with_pack("cats", cats());
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = StickerFetcher::new(&api, fast_options());

        fetcher.fetch_all("cats", tmp.path(), &CancellationToken::new()).await.unwrap();
        let first = file_names(tmp.path());
        fetcher.fetch_all("cats", tmp.path(), &CancellationToken::new()).await.unwrap();

        assert_eq!(first, file_names(tmp.path()));
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_lookup() {
        let api = FakeApi::default().with_pack("cats", cats());
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("out");

        let zero = StickerFetcher::new(&api, fast_options().with_concurrency(0));
        assert!(matches!(
            zero.fetch_all("cats", &dir, &CancellationToken::new()).await,
            Err(StickerError::InvalidInput(_))
        ));

        let fetcher = StickerFetcher::new(&api, fast_options());
        assert!(matches!(
            fetcher.fetch_all("  ", &dir, &CancellationToken::new()).await,
            Err(StickerError::InvalidInput(_))
        ));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_cancelled_batch_leaves_no_files() {
        let token = CancellationToken::new();
        let mut api = FakeApi::default().with_pack("cats", cats());
        api.cancel_on_download = Some(token.clone());
        let tmp = tempfile::tempdir().unwrap();

        let fetcher = StickerFetcher::new(&api, fast_options().with_concurrency(1));
        let report = fetcher.fetch_all("cats", tmp.path(), &token).await.unwrap();

        assert!(file_names(tmp.path()).is_empty());
        assert!(report
            .outcomes
            .iter()
            .all(|o| matches!(o.result, Err(AssetFailure::Cancelled))));
        // Units queued behind the first one never started a download
        assert_eq!(api.calls_for("a2") + api.calls_for("a3"), 0);
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_and_waiting_units() {
        let token = CancellationToken::new();
        let mut api = FakeApi::default()
            .with_pack("big", many(6))
            .with_delay(Duration::from_secs(5));
        api.cancel_on_download = Some(token.clone());
        let tmp = tempfile::tempdir().unwrap();

        let fetcher = StickerFetcher::new(&api, fast_options().with_concurrency(2));
        let report = tokio::time::timeout(
            Duration::from_secs(2),
            fetcher.fetch_all("big", tmp.path(), &token),
        )
        .await
        .expect("cancellation should not wait for slow downloads")
        .unwrap();

        assert_eq!(report.outcomes.len(), 6);
        assert!(report
            .outcomes
            .iter()
            .all(|o| matches!(o.result, Err(AssetFailure::Cancelled))));
        assert!(file_names(tmp.path()).is_empty());
        let started: usize = (0..6).map(|i| api.calls_for(&format!("s{}", i))).sum();
        assert!(started <= 2, "{} downloads started after cancel", started);
    }

    #[tokio::test]
    async fn test_deadline_stops_slow_batch() {
        let api = FakeApi::default()
            .with_pack("cats", cats())
            .with_delay(Duration::from_secs(5));
        let tmp = tempfile::tempdir().unwrap();

        let fetcher = StickerFetcher::new(
            &api,
            fast_options().with_deadline(Duration::from_millis(50)),
        );
        let report = fetcher
            .fetch_all("cats", tmp.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(file_names(tmp.path()).is_empty());
        assert!(report
            .outcomes
            .iter()
            .all(|o| matches!(o.result, Err(AssetFailure::DeadlineExceeded))));
    }

    #[tokio::test]
    async fn test_stale_partial_files_are_swept() {
        let api = FakeApi::default().with_pack("cats", cats());
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(".a1.mp4.0123abcd.part"), b"half").unwrap();
        std::fs::write(tmp.path().join("notes.part"), b"mine").unwrap();

        let fetcher = StickerFetcher::new(&api, fast_options());
        fetcher.fetch_all("cats", tmp.path(), &CancellationToken::new()).await.unwrap();

        assert_eq!(
            file_names(tmp.path()),
            vec!["a1.mp4", "a2.webp", "a3.mp4", "notes.part"]
        );
    }

    #[tokio::test]
    async fn test_sweep_on_clean_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a2.webp"), b"done").unwrap();
        assert_eq!(sweep_partial_files(tmp.path()).await.unwrap(), 0);
        assert_eq!(file_names(tmp.path()), vec!["a2.webp"]);
    }

    #[tokio::test]
    async fn test_write_atomically_replaces_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        write_atomically(tmp.path(), "x.webp", b"one").await.unwrap();
        let path = write_atomically(tmp.path(), "x.webp", b"two").await.unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"two".to_vec());
        assert_eq!(file_names(tmp.path()), vec!["x.webp"]);
    }

    #[tokio::test]
    async fn test_write_atomically_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(write_atomically(tmp.path(), "../evil.mp4", b"x").await.is_err());
        assert!(write_atomically(tmp.path(), ".hidden", b"x").await.is_err());
        assert!(file_names(tmp.path()).is_empty());
    }
}
