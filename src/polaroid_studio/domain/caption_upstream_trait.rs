use std::future::Future;

use crate::domain::caption_request::GeneratePayload;
use crate::infrastructure::error::InfrastructureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Relay the upstream event stream as is.
    Streaming,
    /// Wait for the whole upstream body and extract the caption.
    Buffered,
}

/// Outcome of one upstream call with one key.
#[derive(Debug)]
pub enum Attempt<R> {
    Success(R),
    /// HTTP 429. The only status that moves on to the next key.
    RateLimited,
    /// Any other non-success status.
    Rejected { status: u16, body: String },
    /// No HTTP response at all (connect, TLS, timeout ...).
    Network(String),
}

pub trait CaptionUpstream: Send + Sync {
    type Response: Send;

    fn attempt(
        &self,
        api_key: &str,
        payload: &GeneratePayload,
        mode: ResponseMode,
    ) -> impl Future<Output = Attempt<Self::Response>> + Send;

    /// Extracts the caption text from a successful buffered response.
    fn read_caption(
        &self,
        response: Self::Response,
    ) -> impl Future<Output = Result<String, InfrastructureError>> + Send;
}
