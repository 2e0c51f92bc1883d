/// Bot API transport over reqwest.
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use stickerpull_shared::bot_api::{parse_envelope, BotMethod, FilePayload, StickerSetPayload};
use stickerpull_shared::config::ClientConfig;
use stickerpull_shared::errors::ApiError;
use stickerpull_shared::models::{AssetPath, BinaryPayload, PackListing};

use crate::api::BotApi;

pub struct HttpBotApi {
    client: Client,
    config: ClientConfig,
}

impl HttpBotApi {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("stickerpull/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call a Bot API method and unwrap its envelope.
    async fn call<T>(&self, method: BotMethod, params: &[(&str, &str)]) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        debug!("Calling {} {:?}", method, params);

        let response = self
            .client
            .get(self.config.method_url(method.as_str()))
            .query(params)
            .send()
            .await
            .map_err(redact)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(redact)?;
        decode_reply(method, status, &body)
    }
}

/// Map a method reply to its result. Error answers (400, 404, 429...) still
/// carry a JSON envelope; only a body that isn't one falls back to the status.
fn decode_reply<T>(method: BotMethod, status: u16, body: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    match parse_envelope::<T>(body) {
        Ok(envelope) => envelope.into_result(method),
        Err(_) if !(200..300).contains(&status) => Err(ApiError::Status(status)),
        Err(e) => Err(e),
    }
}

/// reqwest errors embed the request URL, which carries the bot token.
fn redact(e: reqwest::Error) -> ApiError {
    ApiError::Http(e.without_url())
}

impl BotApi for HttpBotApi {
    async fn sticker_set(&self, name: &str) -> Result<PackListing, ApiError> {
        let set: StickerSetPayload = self
            .call(BotMethod::GetStickerSet, &[("name", name)])
            .await?;
        Ok(set.into())
    }

    async fn file_path(&self, file_id: &str) -> Result<AssetPath, ApiError> {
        let file: FilePayload = self.call(BotMethod::GetFile, &[("file_id", file_id)]).await?;
        file.into_asset_path()
    }

    async fn fetch_binary(&self, path: &AssetPath) -> Result<BinaryPayload, ApiError> {
        debug!("Downloading {}", path.as_str());

        let response = self
            .client
            .get(self.config.file_url(path.as_str()))
            .send()
            .await
            .map_err(redact)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(BinaryPayload {
                status,
                bytes: Vec::new(),
            });
        }

        let bytes = response.bytes().await.map_err(redact)?;
        Ok(BinaryPayload {
            status,
            bytes: bytes.to_vec(),
        })
    }
}
