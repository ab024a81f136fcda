use tracing::{error, info, warn};

use super::error::ApplicationError;
use crate::domain::caption_request::{CaptionRequest, GeneratePayload};
use crate::domain::caption_upstream_trait::{Attempt, CaptionUpstream, ResponseMode};

/// Last four characters of a key, for logs. Full keys are never logged.
pub fn key_suffix(key: &str) -> &str {
    let start = key
        .char_indices()
        .rev()
        .nth(3)
        .map(|(index, _)| index)
        .unwrap_or(0);
    &key[start..]
}

/// Normalises configured keys: trimmed, empty entries dropped, order kept.
pub fn parse_api_keys<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .flat_map(|entry| {
            entry
                .as_ref()
                .split(',')
                .map(|key| key.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|key| !key.is_empty())
        .collect()
}

pub struct CaptionService<U> {
    upstream: U,
    api_keys: Vec<String>,
}

impl<U: CaptionUpstream> CaptionService<U> {
    pub fn new(upstream: U, api_keys: Vec<String>) -> Self {
        Self { upstream, api_keys }
    }

    pub fn key_count(&self) -> usize {
        self.api_keys.len()
    }

    /// Tries each key in order. Only a rate limit or a network fault moves on
    /// to the next key; any other upstream failure ends the whole call.
    /// Callers check for an empty key list first.
    async fn rotate(
        &self,
        payload: &GeneratePayload,
        mode: ResponseMode,
    ) -> Result<U::Response, ApplicationError> {
        for key in &self.api_keys {
            let suffix = key_suffix(key);
            match self.upstream.attempt(key, payload, mode).await {
                Attempt::Success(response) => {
                    info!("Successfully connected with API key ending in ...{}", suffix);
                    return Ok(response);
                }
                Attempt::RateLimited => {
                    warn!("API key ending with ...{} is rate-limited. Trying next key.", suffix);
                }
                Attempt::Network(reason) => {
                    warn!("Fetch error with key ...{}: {}", suffix, reason);
                }
                Attempt::Rejected { status, body } => {
                    error!("API error from key ...{} (status {}): {}", suffix, status, body);
                    return Err(ApplicationError::UpstreamHardFailure { status });
                }
            }
        }

        error!("All {} API keys are rate-limited or unreachable", self.api_keys.len());
        Err(ApplicationError::AllKeysExhausted)
    }

    /// Streaming mode. The successful upstream response is returned untouched for relaying.
    pub async fn stream_caption(&self, request: CaptionRequest) -> Result<U::Response, ApplicationError> {
        if self.api_keys.is_empty() {
            return Err(ApplicationError::ConfigurationMissing);
        }
        let request = request.validate_lenient()?;
        let payload = GeneratePayload::for_request(&request);
        self.rotate(&payload, ResponseMode::Streaming).await
    }

    /// Buffered mode: waits for the whole answer and returns the caption text.
    pub async fn caption(&self, request: CaptionRequest) -> Result<String, ApplicationError> {
        if self.api_keys.is_empty() {
            return Err(ApplicationError::ConfigurationMissing);
        }
        let request = request.validate_strict()?;
        let payload = GeneratePayload::for_request(&request);
        let response = self.rotate(&payload, ResponseMode::Buffered).await?;
        Ok(self.upstream.read_caption(response).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::infrastructure::error::InfrastructureError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Outcome {
        Ok(&'static str),
        RateLimited,
        Rejected(u16),
        Network,
    }

    // 手動モック: キーごとに結果を決めておく
    struct ScriptedUpstream {
        script: HashMap<&'static str, Outcome>,
        calls: Mutex<Vec<String>>,
        modes: Mutex<Vec<ResponseMode>>,
    }

    impl ScriptedUpstream {
        fn new(script: &[(&'static str, Outcome)]) -> Self {
            Self {
                script: script.iter().cloned().collect(),
                calls: Mutex::new(Vec::new()),
                modes: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CaptionUpstream for ScriptedUpstream {
        type Response = String;

        async fn attempt(&self, api_key: &str, _payload: &GeneratePayload, mode: ResponseMode) -> Attempt<String> {
            self.calls.lock().unwrap().push(api_key.to_string());
            self.modes.lock().unwrap().push(mode);
            match self.script.get(api_key).cloned().unwrap_or(Outcome::Network) {
                Outcome::Ok(body) => Attempt::Success(body.to_string()),
                Outcome::RateLimited => Attempt::RateLimited,
                Outcome::Rejected(status) => Attempt::Rejected {
                    status,
                    body: "{\"error\":{\"message\":\"API key not valid\"}}".to_string(),
                },
                Outcome::Network => Attempt::Network("connection refused".to_string()),
            }
        }

        async fn read_caption(&self, response: String) -> Result<String, InfrastructureError> {
            Ok(response)
        }
    }

    fn request() -> CaptionRequest {
        CaptionRequest {
            image_data: Some("aGk=".to_string()),
            mime_type: Some("image/jpeg".to_string()),
            language: Some("en".to_string()),
        }
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_rate_limited_key_falls_through_to_next() {
        let upstream = ScriptedUpstream::new(&[
            ("key-A", Outcome::RateLimited),
            ("key-B", Outcome::Ok("from B")),
            ("key-C", Outcome::Ok("from C")),
        ]);
        let service = CaptionService::new(upstream, keys(&["key-A", "key-B", "key-C"]));

        let response = service.stream_caption(request()).await.unwrap();
        assert_eq!(response, "from B");
        assert_eq!(service.upstream.calls(), vec!["key-A", "key-B"]);
        assert_eq!(*service.upstream.modes.lock().unwrap(), vec![ResponseMode::Streaming; 2]);
    }

    #[tokio::test]
    async fn test_hard_failure_aborts_rotation() {
        let upstream = ScriptedUpstream::new(&[
            ("key-A", Outcome::Rejected(400)),
            ("key-B", Outcome::Ok("from B")),
        ]);
        let service = CaptionService::new(upstream, keys(&["key-A", "key-B"]));

        let result = service.stream_caption(request()).await;
        assert!(matches!(result, Err(ApplicationError::UpstreamHardFailure { status: 400 })));
        assert_eq!(service.upstream.calls(), vec!["key-A"]);
    }

    #[tokio::test]
    async fn test_network_fault_is_soft() {
        let upstream = ScriptedUpstream::new(&[
            ("key-A", Outcome::Network),
            ("key-B", Outcome::Ok("from B")),
        ]);
        let service = CaptionService::new(upstream, keys(&["key-A", "key-B"]));

        assert_eq!(service.stream_caption(request()).await.unwrap(), "from B");
        assert_eq!(service.upstream.calls(), vec!["key-A", "key-B"]);
    }

    #[tokio::test]
    async fn test_all_rate_limited_is_exhaustion_not_rate_limit() {
        let upstream = ScriptedUpstream::new(&[
            ("key-A", Outcome::RateLimited),
            ("key-B", Outcome::RateLimited),
        ]);
        let service = CaptionService::new(upstream, keys(&["key-A", "key-B"]));

        let err = service.stream_caption(request()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::AllKeysExhausted));
        assert_eq!(service.upstream.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_configuration_skips_upstream() {
        let service = CaptionService::new(ScriptedUpstream::new(&[]), Vec::new());
        let err = service.caption(request()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::ConfigurationMissing));
        assert!(service.upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_buffered_mode_is_strict_and_returns_caption() {
        let upstream = ScriptedUpstream::new(&[("key-A", Outcome::Ok("Sunlit memories"))]);
        let service = CaptionService::new(upstream, keys(&["key-A"]));

        let mut missing_language = request();
        missing_language.language = None;
        let err = service.caption(missing_language).await.unwrap_err();
        assert!(matches!(err, ApplicationError::DomainError(DomainError::Validation(_))));
        assert!(service.upstream.calls().is_empty());

        assert_eq!(service.caption(request()).await.unwrap(), "Sunlit memories");
        assert_eq!(*service.upstream.modes.lock().unwrap(), vec![ResponseMode::Buffered]);
    }

    #[test]
    fn test_key_suffix_and_parsing() {
        assert_eq!(key_suffix("AIzaSyExample1234"), "1234");
        assert_eq!(key_suffix("abc"), "abc");
        assert_eq!(key_suffix(""), "");
        assert_eq!(
            parse_api_keys([" one, two ,,three", "four"]),
            vec!["one", "two", "three", "four"]
        );
        assert!(parse_api_keys(Vec::<String>::new()).is_empty());
    }
}
