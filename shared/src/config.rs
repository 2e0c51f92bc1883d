/// Client and fetch configuration.
use std::time::Duration;

use crate::errors::{StickerError, StickerResult};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable Bot API credentials and endpoint, built once and passed by reference.
#[derive(Clone)]
pub struct ClientConfig {
    token: String,
    api_url: String,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read `TELEGRAM_BOT_TOKEN` (or `TELOXIDE_TOKEN`) and optional `TELEGRAM_API_URL`.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> StickerResult<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .or_else(|_| std::env::var("TELOXIDE_TOKEN"))
            .map_err(|_| {
                StickerError::Config("TELEGRAM_BOT_TOKEN or TELOXIDE_TOKEN must be set".to_string())
            })?;
        if token.trim().is_empty() {
            return Err(StickerError::Config("bot token is empty".to_string()));
        }

        let mut config = Self::new(token.trim());
        if let Ok(url) = std::env::var("TELEGRAM_API_URL") {
            if !url.trim().is_empty() {
                config = config.with_api_url(url.trim());
            }
        }
        Ok(config)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// `<api_url>/bot<token>/<method>`
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// `<api_url>/file/bot<token>/<file_path>`
    pub fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.api_url,
            self.token,
            file_path.trim_start_matches('/')
        )
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Knobs for one batch fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum number of asset pipelines running at once.
    pub concurrency: usize,
    /// Attempts for the binary download step (1 = no retry).
    pub fetch_attempts: u32,
    /// Base delay between download attempts, multiplied by the attempt number.
    pub retry_backoff: Duration,
    /// Overall deadline for the batch.
    pub deadline: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            deadline: None,
        }
    }
}

impl FetchOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_fetch_attempts(mut self, attempts: u32) -> Self {
        self.fetch_attempts = attempts;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Reject settings that would schedule nothing.
    pub fn validate(&self) -> StickerResult<()> {
        if self.concurrency == 0 {
            return Err(StickerError::InvalidInput(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.fetch_attempts == 0 {
            return Err(StickerError::InvalidInput(
                "fetch attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
