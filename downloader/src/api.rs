/// Remote operations the fetcher depends on.
use stickerpull_shared::errors::ApiError;
use stickerpull_shared::models::{AssetPath, BinaryPayload, PackListing};

/// The three Bot API capabilities a batch fetch needs.
///
/// Implemented over HTTP by [`crate::http::HttpBotApi`]; tests swap in
/// in-memory fakes.
#[allow(async_fn_in_trait)]
pub trait BotApi {
    /// `getStickerSet`. An `ok: false` answer is [`ApiError::Rejected`].
    async fn sticker_set(&self, name: &str) -> Result<PackListing, ApiError>;

    /// `getFile`, resolving a sticker's file id to its server-side path.
    async fn file_path(&self, file_id: &str) -> Result<AssetPath, ApiError>;

    /// Download the binary behind a resolved path. Any HTTP status is returned
    /// as data; only transport failures are errors.
    async fn fetch_binary(&self, path: &AssetPath) -> Result<BinaryPayload, ApiError>;
}
