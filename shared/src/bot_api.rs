/// Wire types for the Telegram Bot API calls Stickerpull makes.
///
/// Every method answers with the same envelope: `{"ok": bool, "result": ..., "description": ...}`.
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::models::{AssetHandle, AssetPath, PackListing};

// ====== METHODS ======

/// Bot API methods used by the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMethod {
    GetStickerSet,
    GetFile,
}

impl BotMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotMethod::GetStickerSet => "getStickerSet",
            BotMethod::GetFile => "getFile",
        }
    }
}

impl std::fmt::Display for BotMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ====== ENVELOPE ======

/// Response envelope shared by all Bot API methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the envelope, mapping `ok: false` to [`ApiError::Rejected`].
    pub fn into_result(self, method: BotMethod) -> Result<T, ApiError> {
        if !self.ok {
            return Err(ApiError::Rejected {
                method: method.to_string(),
                code: self.error_code,
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        self.result
            .ok_or_else(|| ApiError::Decode(format!("{} returned ok without result", method)))
    }
}

// ====== PAYLOADS ======

/// `getStickerSet` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickerSetPayload {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub stickers: Vec<StickerPayload>,
}

/// One sticker inside a `getStickerSet` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickerPayload {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: Option<String>,
    #[serde(default)]
    pub is_animated: bool,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub emoji: Option<String>,
}

/// `getFile` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePayload {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl From<StickerPayload> for AssetHandle {
    fn from(s: StickerPayload) -> Self {
        AssetHandle::new(s.file_id, s.is_animated, s.is_video)
    }
}

impl From<StickerSetPayload> for PackListing {
    fn from(set: StickerSetPayload) -> Self {
        PackListing {
            name: set.name,
            title: set.title,
            assets: set.stickers.into_iter().map(AssetHandle::from).collect(),
        }
    }
}

impl FilePayload {
    /// The download path; files larger than the Bot API limit come back without one.
    pub fn into_asset_path(self) -> Result<AssetPath, ApiError> {
        match self.file_path {
            Some(p) if !p.is_empty() => Ok(AssetPath(p)),
            _ => Err(ApiError::Decode(format!(
                "getFile for {} returned no file_path",
                self.file_id
            ))),
        }
    }
}

/// Parse a raw response body into an envelope.
pub fn parse_envelope<T>(body: &str) -> Result<ApiResponse<T>, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sticker_set_deserialization() {
        let json = r#"{"ok":true,"result":{"name":"cats","title":"Cats","sticker_type":"regular","stickers":[
            {"file_id":"a1","file_unique_id":"u1","is_animated":true,"is_video":false,"emoji":"😺"},
            {"file_id":"a2","file_unique_id":"u2","is_animated":false,"is_video":false},
            {"file_id":"a3","file_unique_id":"u3","is_animated":false,"is_video":true}
        ]}}"#;
        let resp: ApiResponse<StickerSetPayload> = parse_envelope(json).unwrap();
        let listing: PackListing = resp.into_result(BotMethod::GetStickerSet).unwrap().into();

        assert_eq!(listing.name, "cats");
        assert_eq!(listing.len(), 3);
        assert_eq!(listing.assets[0].file_name(), "a1.mp4");
        assert_eq!(listing.assets[1].file_name(), "a2.webp");
        assert_eq!(listing.assets[2].file_name(), "a3.mp4");
    }

    #[test]
    fn test_rejected_envelope() {
        let json = r#"{"ok":false,"error_code":400,"description":"Bad Request: STICKERSET_INVALID"}"#;
        let resp: ApiResponse<StickerSetPayload> = parse_envelope(json).unwrap();
        match resp.into_result(BotMethod::GetStickerSet) {
            Err(ApiError::Rejected { method, code, description }) => {
                assert_eq!(method, "getStickerSet");
                assert_eq!(code, Some(400));
                assert!(description.contains("STICKERSET_INVALID"));
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_file_without_path() {
        let json = r#"{"ok":true,"result":{"file_id":"big","file_size":30000000}}"#;
        let resp: ApiResponse<FilePayload> = parse_envelope(json).unwrap();
        let file = resp.into_result(BotMethod::GetFile).unwrap();
        assert!(matches!(file.into_asset_path(), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_file_with_path() {
        let json = r#"{"ok":true,"result":{"file_id":"a1","file_path":"stickers/file_7.webm"}}"#;
        let resp: ApiResponse<FilePayload> = parse_envelope(json).unwrap();
        let path = resp.into_result(BotMethod::GetFile).unwrap().into_asset_path().unwrap();
        assert_eq!(path.as_str(), "stickers/file_7.webm");
    }

    #[test]
    fn test_ok_without_result() {
        let resp: ApiResponse<StickerSetPayload> = parse_envelope(r#"{"ok":true}"#).unwrap();
        assert!(resp.result.is_none());
        assert!(matches!(
            resp.into_result(BotMethod::GetStickerSet),
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn test_garbage_body() {
        let resp: Result<ApiResponse<FilePayload>, _> = parse_envelope("<html>502</html>");
        assert!(matches!(resp, Err(ApiError::Decode(_))));
    }
}
