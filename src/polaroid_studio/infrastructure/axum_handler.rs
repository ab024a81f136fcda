use std::path::Path;
use std::sync::Arc;

use axum::{
    body::StreamBody,
    extract::{rejection::JsonRejection, Json, State},
    http::{header, header::HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::gemini_client::GeminiClient;
use crate::application::caption_service::CaptionService;
use crate::application::error::ApplicationError;
use crate::domain::caption_request::CaptionRequest;
use crate::domain::error::DomainError;

pub const EVENT_STREAM: &str = "text/event-stream";

pub struct AppState {
    pub caption_service: CaptionService<GeminiClient>,
}

fn parse_body(payload: Result<Json<CaptionRequest>, JsonRejection>) -> Result<CaptionRequest, ApplicationError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| DomainError::Validation(rejection.body_text()).into())
}

/// Streaming mode: the upstream event stream is relayed byte for byte.
pub async fn generate_caption_stream_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CaptionRequest>, JsonRejection>,
) -> Result<Response, ApplicationError> {
    let request = parse_body(payload)?;
    let upstream = state.caption_service.stream_caption(request).await?;
    Ok((
        [(header::CONTENT_TYPE, EVENT_STREAM)],
        StreamBody::new(upstream.bytes_stream()),
    )
        .into_response())
}

/// Buffered mode: `{ "caption": "..." }`.
pub async fn generate_caption_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CaptionRequest>, JsonRejection>,
) -> Result<Response, ApplicationError> {
    let request = parse_body(payload)?;
    let caption = state.caption_service.caption(request).await?;
    Ok(Json(json!({ "caption": caption })).into_response())
}

async fn method_not_allowed_handler() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method Not Allowed" })),
    )
}

async fn health_handler() -> &'static str {
    "ok"
}

pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(vec![HeaderName::from_static("content-type")]);

    let mut app = Router::new()
        .route(
            "/api/generate-caption",
            post(generate_caption_stream_handler).fallback(method_not_allowed_handler),
        )
        .route(
            "/api/caption",
            post(generate_caption_handler).fallback(method_not_allowed_handler),
        )
        .route("/healthz", get(health_handler))
        .with_state(state);

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http()).layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::GENERIC_FAILURE_MESSAGE;
    use crate::domain::caption_source_trait::CaptionSource;
    use crate::infrastructure::caption_client::ProxyCaptionClient;
    use axum::body::{Body, HttpBody};
    use axum::extract::{Path as UrlPath, Query};
    use axum::http::Request;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tower::ServiceExt;

    const SSE_BODY: &str = concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Golden \"}]}}]}\r\n\r\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"hour\"}]}}]}\r\n\r\n"
    );

    #[derive(Clone, Default)]
    struct FakeGemini {
        seen: Arc<Mutex<Vec<(String, String)>>>,
    }

    // Gemini の代わり: キーの接頭辞で挙動を変える
    async fn fake_generate(
        State(fake): State<FakeGemini>,
        UrlPath(target): UrlPath<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Response {
        let key = query.get("key").cloned().unwrap_or_default();
        fake.seen.lock().unwrap().push((key.clone(), target.clone()));

        if key.starts_with("rate") {
            return (StatusCode::TOO_MANY_REQUESTS, "{\"error\":{\"code\":429}}").into_response();
        }
        if key.starts_with("bad") {
            return (StatusCode::FORBIDDEN, "{\"error\":{\"message\":\"secret upstream detail\"}}").into_response();
        }
        if target.ends_with(":streamGenerateContent") && query.get("alt").map(String::as_str) == Some("sse") {
            return ([(header::CONTENT_TYPE, EVENT_STREAM)], SSE_BODY).into_response();
        }
        Json(json!({"candidates":[{"content":{"parts":[{"text":" Golden hour \n"}]}}]})).into_response()
    }

    async fn spawn(app: Router) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(app.into_make_service())
                .await
                .unwrap();
        });
        format!("http://{addr}")
    }

    async fn spawn_fake_gemini() -> (String, FakeGemini) {
        let fake = FakeGemini::default();
        let app = Router::new()
            .route("/v1beta/models/:target", post(fake_generate))
            .with_state(fake.clone());
        (spawn(app).await, fake)
    }

    async fn proxy(keys: &[&str]) -> (Router, FakeGemini) {
        let (base_url, fake) = spawn_fake_gemini().await;
        let service = CaptionService::new(
            GeminiClient::new(base_url, "gemini-test"),
            keys.iter().map(|k| k.to_string()).collect(),
        );
        let state = Arc::new(AppState { caption_service: service });
        (build_router(state, None), fake)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn caption_body() -> serde_json::Value {
        json!({ "imageData": "aGk=", "mimeType": "image/jpeg", "language": "en" })
    }

    async fn body_string(response: Response) -> String {
        let mut body = response.into_body();
        let mut bytes = Vec::new();
        while let Some(chunk) = body.data().await {
            bytes.extend_from_slice(&chunk.unwrap());
        }
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_stream_relays_upstream_bytes_after_rotation() {
        let (app, fake) = proxy(&["rate-0001", "good-0002", "good-0003"]).await;

        let response = app.oneshot(post_json("/api/generate-caption", caption_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], EVENT_STREAM);
        assert_eq!(body_string(response).await, SSE_BODY);

        let seen = fake.seen.lock().unwrap().clone();
        let keys: Vec<&str> = seen.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["rate-0001", "good-0002"]);
        assert_eq!(seen[0].1, "gemini-test:streamGenerateContent");
    }

    #[tokio::test]
    async fn test_hard_failure_is_generic_and_stops_rotation() {
        let (app, fake) = proxy(&["bad-0001", "good-0002"]).await;

        let response = app.oneshot(post_json("/api/generate-caption", caption_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains(GENERIC_FAILURE_MESSAGE));
        assert!(!body.contains("secret upstream detail"));
        assert_eq!(fake.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_rate_limited_is_generic_failure() {
        let (app, _) = proxy(&["rate-0001", "rate-0002"]).await;

        let response = app.oneshot(post_json("/api/caption", caption_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], GENERIC_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_buffered_caption_is_extracted_and_trimmed() {
        let (app, fake) = proxy(&["good-0001"]).await;

        let response = app.oneshot(post_json("/api/caption", caption_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body, json!({ "caption": "Golden hour" }));
        assert_eq!(fake.seen.lock().unwrap()[0].1, "gemini-test:generateContent");
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected_before_upstream() {
        let (app, fake) = proxy(&["good-0001"]).await;

        let response = app
            .oneshot(post_json("/api/caption", json!({ "imageData": "aGk=" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(body["error"].as_str().unwrap().contains("mimeType"));
        assert!(fake.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (app, _) = proxy(&["good-0001"]).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate-caption")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_no_keys_is_configuration_failure() {
        let (app, fake) = proxy(&[]).await;

        let response = app.oneshot(post_json("/api/generate-caption", caption_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(fake.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_is_method_not_allowed() {
        let (app, _) = proxy(&["good-0001"]).await;
        let request = Request::builder()
            .uri("/api/generate-caption")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], "Method Not Allowed");
    }

    #[tokio::test]
    async fn test_healthz() {
        let (app, _) = proxy(&[]).await;
        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_client_reads_caption_through_proxy() {
        let (app, _) = proxy(&["rate-0001", "good-0002"]).await;
        let base = spawn(app).await;
        let client = ProxyCaptionClient::new(format!("{base}/api/generate-caption"));

        let mut caption = String::new();
        let request = serde_json::from_value::<CaptionRequest>(caption_body()).unwrap();
        client
            .stream_caption(&request, |text| caption.push_str(text))
            .await
            .unwrap();
        assert_eq!(caption, "Golden hour");
    }
}
