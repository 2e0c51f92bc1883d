//! Stickerpull download engine.
//!
//! Fetches whole Telegram sticker packs with bounded concurrency, isolated
//! per-sticker failures and atomic writes, and converts the result with an
//! external encoder.
pub mod api;
pub mod convert;
pub mod fetcher;
pub mod http;

pub use api::BotApi;
pub use convert::{convert_directory, ConversionReport, Encoder};
pub use fetcher::StickerFetcher;
pub use http::HttpBotApi;
