//! HTTP client for the prompt backend's REST API.

use async_trait::async_trait;
use promptlift_core::PromptRecord;
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ClientConfig;

/// Every failure surfaces as one message; the variants only record where it
/// came from.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-success HTTP status. `message` is the backend's `detail` or a
    /// per-operation fallback.
    #[error("{message}")]
    Remote { status: u16, message: String },
    #[error("could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from the server: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Operations the workflow needs from the backend.
#[async_trait]
pub trait PromptApi: Send + Sync {
    async fn improve(&self, prompt: &str, credential: &str) -> Result<Improvement, ApiError>;
    /// Returns the new share id.
    async fn create_share(&self, original: &str, improved: &str) -> Result<String, ApiError>;
    async fn publish(&self, share_id: &str) -> Result<(), ApiError>;
    async fn fetch_shared(&self, share_id: &str) -> Result<PromptRecord, ApiError>;
    /// Published records in backend order.
    async fn list_gallery(&self) -> Result<Vec<PromptRecord>, ApiError>;
}

// ── Wire types ──

#[derive(Serialize)]
struct ImproveBody<'a> {
    prompt: &'a str,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
}

/// Successful improve-prompt response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Improvement {
    pub improved_prompt: String,
    /// Echo of the submitted prompt, when the backend includes it.
    #[serde(default)]
    pub original_prompt: Option<String>,
}

#[derive(Serialize)]
struct ShareBody<'a> {
    original_prompt: &'a str,
    improved_prompt: &'a str,
}

#[derive(Deserialize)]
struct ShareResponse {
    share_id: String,
}

#[derive(Deserialize)]
struct GalleryResponse {
    prompts: Vec<PromptRecord>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

const IMPROVE_FALLBACK: &str = "An unknown error occurred.";
const SHARE_FALLBACK: &str = "Failed to create share link.";
const PUBLISH_FALLBACK: &str = "Failed to publish.";
const FETCH_FALLBACK: &str = "Prompt not found.";
const GALLERY_FALLBACK: &str = "Failed to fetch gallery.";
const HEALTH_FALLBACK: &str = "API is not responding.";

/// Client for the prompt backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// `config.api_url` is like `http://localhost:8000/api`; a trailing slash
    /// is ignored.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.api_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.api_url)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.api_url));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Improve a prompt with the user's credential.
    pub async fn improve(&self, prompt: &str, credential: &str) -> Result<Improvement, ApiError> {
        let url = self.endpoint(&["improve-prompt"])?;
        info!(url = %url, prompt_chars = prompt.chars().count(), "requesting prompt improvement");
        let body = ImproveBody {
            prompt,
            api_key: credential,
        };
        let resp = self.client.post(url).json(&body).send().await?;
        let improvement: Improvement = decode(check(resp, IMPROVE_FALLBACK).await?).await?;
        info!(
            improved_chars = improvement.improved_prompt.chars().count(),
            "prompt improved"
        );
        Ok(improvement)
    }

    /// Store an original/improved pair and return its share id.
    pub async fn create_share(&self, original: &str, improved: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["prompts"])?;
        info!(url = %url, "creating share record");
        let body = ShareBody {
            original_prompt: original,
            improved_prompt: improved,
        };
        let resp = self.client.post(url).json(&body).send().await?;
        let share: ShareResponse = decode(check(resp, SHARE_FALLBACK).await?).await?;
        info!(share_id = %share.share_id, "share record created");
        Ok(share.share_id)
    }

    /// Publish a share record to the gallery. The backend answers 204.
    pub async fn publish(&self, share_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["prompts", share_id, "publish"])?;
        info!(url = %url, "publishing share record");
        let resp = self.client.post(url).send().await?;
        check(resp, PUBLISH_FALLBACK).await?;
        info!(share_id, "published");
        Ok(())
    }

    pub async fn fetch_shared(&self, share_id: &str) -> Result<PromptRecord, ApiError> {
        let url = self.endpoint(&["prompts", share_id])?;
        info!(url = %url, "fetching shared prompt");
        let resp = self.client.get(url).send().await?;
        let mut record: PromptRecord = decode(check(resp, FETCH_FALLBACK).await?).await?;
        if record.id.is_empty() {
            record.id = share_id.to_string();
        }
        Ok(record)
    }

    pub async fn list_gallery(&self) -> Result<Vec<PromptRecord>, ApiError> {
        let url = self.endpoint(&["gallery"])?;
        info!(url = %url, "fetching gallery");
        let resp = self.client.get(url).send().await?;
        let gallery: GalleryResponse = decode(check(resp, GALLERY_FALLBACK).await?).await?;
        let records: Vec<PromptRecord> = gallery
            .prompts
            .into_iter()
            .map(|r| PromptRecord {
                published: true,
                ..r
            })
            .collect();
        info!(count = records.len(), "fetched gallery");
        Ok(records)
    }

    /// Probe the server root, returning its status string.
    pub async fn health(&self) -> Result<String, ApiError> {
        let url = self
            .base
            .join("/")
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        let resp = self.client.get(url).send().await?;
        let health: HealthResponse = decode(check(resp, HEALTH_FALLBACK).await?).await?;
        Ok(health.status)
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl PromptApi for ApiClient {
    async fn improve(&self, prompt: &str, credential: &str) -> Result<Improvement, ApiError> {
        ApiClient::improve(self, prompt, credential).await
    }

    async fn create_share(&self, original: &str, improved: &str) -> Result<String, ApiError> {
        ApiClient::create_share(self, original, improved).await
    }

    async fn publish(&self, share_id: &str) -> Result<(), ApiError> {
        ApiClient::publish(self, share_id).await
    }

    async fn fetch_shared(&self, share_id: &str) -> Result<PromptRecord, ApiError> {
        ApiClient::fetch_shared(self, share_id).await
    }

    async fn list_gallery(&self) -> Result<Vec<PromptRecord>, ApiError> {
        ApiClient::list_gallery(self).await
    }
}

// ── Response handling ──

/// Pass successful responses through; turn anything else into
/// [`ApiError::Remote`] with the best message available.
async fn check(resp: Response, fallback: &str) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body, fallback);
    warn!(status = status.as_u16(), message = %message, "backend returned an error");
    Err(ApiError::Remote {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Extract `detail` from an error body.
///
/// A string detail is used as is; a validation-error array contributes its
/// first `msg`. Anything else yields `fallback`.
fn error_message(body: &str, fallback: &str) -> String {
    let Ok(ErrorBody {
        detail: Some(detail),
    }) = serde_json::from_str::<ErrorBody>(body)
    else {
        return fallback.to_string();
    };
    match detail {
        Value::String(s) if !s.is_empty() => s,
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("msg"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string()),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> ApiClient {
        ApiClient::new(ClientConfig::new(url)).unwrap()
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let c = client("http://localhost:8000/api/");
        assert_eq!(
            c.endpoint(&["improve-prompt"]).unwrap().as_str(),
            "http://localhost:8000/api/improve-prompt"
        );
        let c = client("http://localhost:8000/api");
        assert_eq!(
            c.endpoint(&["prompts", "abc", "publish"]).unwrap().as_str(),
            "http://localhost:8000/api/prompts/abc/publish"
        );
    }

    #[test]
    fn endpoint_encodes_ids() {
        let c = client("http://localhost:8000/api");
        assert_eq!(
            c.endpoint(&["prompts", "a b/c"]).unwrap().as_str(),
            "http://localhost:8000/api/prompts/a%20b%2Fc"
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(
            ApiClient::new(ClientConfig::new("not a url")),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            ApiClient::new(ClientConfig::new("mailto:someone@example.org")),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn detail_string_is_the_message() {
        assert_eq!(
            error_message(r#"{"detail": "Invalid OpenAI API key."}"#, "fallback"),
            "Invalid OpenAI API key."
        );
    }

    #[test]
    fn validation_detail_uses_first_msg() {
        let body = r#"{"detail": [{"loc": ["body", "apiKey"], "msg": "field required", "type": "value_error.missing"}]}"#;
        assert_eq!(error_message(body, "fallback"), "field required");
    }

    #[test]
    fn unparseable_body_falls_back() {
        assert_eq!(error_message("Internal Server Error", "Failed to publish."), "Failed to publish.");
        assert_eq!(error_message("", "Failed to publish."), "Failed to publish.");
        assert_eq!(error_message(r#"{"detail": null}"#, "x"), "x");
        assert_eq!(error_message(r#"{"detail": ""}"#, "x"), "x");
        assert_eq!(error_message(r#"{"error": "nope"}"#, "x"), "x");
    }

    #[test]
    fn remote_error_displays_message_only() {
        let err = ApiError::Remote {
            status: 404,
            message: "Prompt not found.".into(),
        };
        assert_eq!(err.to_string(), "Prompt not found.");
        assert!(err.is_not_found());
    }

    #[test]
    fn improve_body_uses_camel_case_key() {
        let body = ImproveBody {
            prompt: "p",
            api_key: "k",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"prompt": "p", "apiKey": "k"}));
    }

    #[test]
    fn improvement_without_echo() {
        let parsed: Improvement = serde_json::from_str(r#"{"improved_prompt": "Better."}"#).unwrap();
        assert_eq!(parsed.improved_prompt, "Better.");
        assert!(parsed.original_prompt.is_none());
    }
}
