use reqwest::{Client, StatusCode};
use tracing::debug;

use super::error::InfrastructureError;
use crate::domain::caption_request::GeneratePayload;
use crate::domain::caption_upstream_trait::{Attempt, CaptionUpstream, ResponseMode};
use crate::domain::event_stream::GenerateResponse;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Google Generative Language API (`generateContent` / `streamGenerateContent`).
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn endpoint(&self, mode: ResponseMode) -> String {
        let method = match mode {
            ResponseMode::Streaming => "streamGenerateContent",
            ResponseMode::Buffered => "generateContent",
        };
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }
}

impl CaptionUpstream for GeminiClient {
    type Response = reqwest::Response;

    async fn attempt(
        &self,
        api_key: &str,
        payload: &GeneratePayload,
        mode: ResponseMode,
    ) -> Attempt<reqwest::Response> {
        let mut request = self
            .http
            .post(self.endpoint(mode))
            .query(&[("key", api_key)]);
        if mode == ResponseMode::Streaming {
            request = request.query(&[("alt", "sse")]);
        }

        // URL にキーが含まれるので、エラー文字列からは URL を外す
        let response = match request.json(payload).send().await {
            Ok(response) => response,
            Err(err) => return Attempt::Network(err.without_url().to_string()),
        };

        let status = response.status();
        debug!(status = status.as_u16(), ?mode, "upstream answered");
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::RateLimited;
        }
        if status.is_success() {
            return Attempt::Success(response);
        }
        let body = response.text().await.unwrap_or_default();
        Attempt::Rejected {
            status: status.as_u16(),
            body,
        }
    }

    async fn read_caption(&self, response: reqwest::Response) -> Result<String, InfrastructureError> {
        let body: GenerateResponse = response.json().await.map_err(|e| e.without_url())?;
        Ok(body.caption_text().trim().to_string())
    }
}
