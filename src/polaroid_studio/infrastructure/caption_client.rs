use reqwest::Client;
use tracing::debug;

use super::error::InfrastructureError;
use crate::domain::caption_request::CaptionRequest;
use crate::domain::caption_source_trait::CaptionSource;
use crate::domain::event_stream::{event_text, LineDecoder};

pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3300/api/generate-caption";

/// Client side of the caption proxy: posts the request and reads the event stream.
pub struct ProxyCaptionClient {
    http: Client,
    endpoint: String,
}

impl ProxyCaptionClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl CaptionSource for ProxyCaptionClient {
    async fn stream_caption<F>(
        &self,
        request: &CaptionRequest,
        mut on_text: F,
    ) -> Result<(), InfrastructureError>
    where
        F: FnMut(&str),
    {
        let mut response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InfrastructureError::ProxyStatus(status.as_u16()));
        }

        let mut decoder = LineDecoder::new();
        while let Some(chunk) = response.chunk().await? {
            debug!(bytes = chunk.len(), "caption chunk");
            for line in decoder.feed(&chunk) {
                if let Some(text) = event_text(&line) {
                    on_text(&text);
                }
            }
        }
        if let Some(text) = decoder.finish().as_deref().and_then(event_text) {
            on_text(&text);
        }
        Ok(())
    }
}
