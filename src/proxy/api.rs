//! HTTP API server for the B-wiize frontend.
//!
//! Routes:
//! - `POST /api/tts`: relay text to the hosted TTS model, stream audio back
//! - `GET /api/videos/{id}`: resolve a lesson video to a stream URL
//! - `GET /health`: liveness probe

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::tts::{SynthesisRequest, TtsClient};
use super::video::{VideoResolver, VideoSource};
use crate::error::ProxyError;

#[derive(Clone)]
pub struct ProxyState {
    pub tts: Arc<TtsClient>,
    /// `None` when video lookup is disabled in config.
    pub video: Option<Arc<VideoResolver>>,
}

/// Build the axum router.
pub fn router(state: ProxyState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/tts", post(handle_tts))
        .route("/api/videos/{id}", get(handle_video))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {o:?}: {e}");
                None
            }
        })
        .collect();

    let origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(app: Router, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("B-wiize proxy listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// --- Handlers ---

async fn handle_health(State(state): State<ProxyState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "video_enabled": state.video.is_some(),
    }))
}

async fn handle_tts(
    State(state): State<ProxyState>,
    payload: Result<Json<SynthesisRequest>, JsonRejection>,
) -> Result<Response, ProxyError> {
    let Json(req) = payload?;
    let preview: String = req.text.chars().take(60).collect();
    info!(
        "HTTP /api/tts: \"{}{}\" ({} chars)",
        preview.replace('\n', " "),
        if req.text.chars().count() > 60 { "..." } else { "" },
        req.text.chars().count(),
    );

    let upstream = state.tts.synthesize(&req.text).await?;
    let body = Body::from_stream(upstream.bytes_stream());

    Ok(([(CONTENT_TYPE, state.tts.content_type().to_string())], body).into_response())
}

async fn handle_video(
    State(state): State<ProxyState>,
    Path(id): Path<String>,
) -> Result<Json<VideoSource>, ProxyError> {
    let resolver = state.video.as_ref().ok_or(ProxyError::VideoDisabled)?;
    Ok(Json(resolver.resolve(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TtsConfig, VideoConfig};
    use axum::body::to_bytes;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state(tts_endpoint: String, video_base: Option<String>) -> ProxyState {
        let tts = TtsClient::new(&TtsConfig {
            endpoint: tts_endpoint,
            api_token: "hf_test".into(),
            ..TtsConfig::default()
        })
        .unwrap();
        let video = video_base.map(|api_base| {
            Arc::new(
                VideoResolver::new(&VideoConfig {
                    api_base,
                    ..VideoConfig::default()
                })
                .unwrap(),
            )
        });
        ProxyState {
            tts: Arc::new(tts),
            video,
        }
    }

    fn tts_request(body: &str) -> Request<Body> {
        Request::post("/api/tts")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_tts_relays_audio_with_fixed_content_type() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/model"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/octet-stream")
                    .set_body_bytes(b"fLaC-audio".to_vec()),
            )
            .mount(&upstream)
            .await;

        let app = router(state(format!("{}/model", upstream.uri()), None), &[]);
        let resp = app.oneshot(tts_request(r#"{"text":"Hello class"}"#)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "audio/flac");
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"fLaC-audio");
    }

    #[tokio::test]
    async fn test_tts_transport_failure_is_generic_500() {
        let app = router(state("http://127.0.0.1:9/model".into(), None), &[]);
        let resp = app.oneshot(tts_request(r#"{"text":"Hello"}"#)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["code"], "internal");
    }

    #[tokio::test]
    async fn test_tts_upstream_status_is_502() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&upstream)
            .await;

        let app = router(state(upstream.uri(), None), &[]);
        let resp = app.oneshot(tts_request(r#"{"text":"Hello"}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_tts_empty_text_is_400() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let app = router(state(upstream.uri(), None), &[]);
        let resp = app.oneshot(tts_request(r#"{"text":"   "}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["code"], "invalid_request");
    }

    #[tokio::test]
    async fn test_tts_over_max_chars_is_400() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let long_text = "a".repeat(TtsConfig::default().max_chars + 1);
        let body = json!({ "text": long_text }).to_string();
        let app = router(state(upstream.uri(), None), &[]);
        let resp = app.oneshot(tts_request(&body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["code"], "invalid_request");
    }

    #[tokio::test]
    async fn test_tts_missing_text_field_is_json_400() {
        let app = router(state("http://127.0.0.1:9".into(), None), &[]);
        let resp = app.oneshot(tts_request(r#"{"txt":"hi"}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["code"], "invalid_request");
        assert!(body["error"].as_str().unwrap().contains("text"));
    }

    #[tokio::test]
    async fn test_tts_non_json_body_is_json_400() {
        let app = router(state("http://127.0.0.1:9".into(), None), &[]);
        let resp = app.oneshot(tts_request("say hello")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["code"], "invalid_request");
    }

    #[tokio::test]
    async fn test_tts_without_content_type_is_json_400() {
        let app = router(state("http://127.0.0.1:9".into(), None), &[]);
        let req = Request::post("/api/tts")
            .body(Body::from(r#"{"text":"hi"}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["code"], "invalid_request");
    }

    #[tokio::test]
    async fn test_video_lookup() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos/lesson1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "assets": { "mp4": "https://cdn.example/lesson1.mp4" }
            })))
            .mount(&upstream)
            .await;

        let app = router(state("http://127.0.0.1:9".into(), Some(upstream.uri())), &[]);
        let resp = app
            .oneshot(Request::get("/api/videos/lesson1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["video_id"], "lesson1");
        assert_eq!(body["stream_url"], "https://cdn.example/lesson1.mp4");
    }

    #[tokio::test]
    async fn test_video_upstream_404_is_404() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos/removed"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&upstream)
            .await;

        let app = router(state("http://127.0.0.1:9".into(), Some(upstream.uri())), &[]);
        let resp = app
            .oneshot(Request::get("/api/videos/removed").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["code"], "not_found");
    }

    #[tokio::test]
    async fn test_video_disabled_is_503() {
        let app = router(state("http://127.0.0.1:9".into(), None), &[]);
        let resp = app
            .oneshot(Request::get("/api/videos/lesson1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(state("http://127.0.0.1:9".into(), None), &[]);
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["video_enabled"], false);
    }

    #[tokio::test]
    async fn test_cors_restricts_to_configured_origin() {
        let app = router(
            state("http://127.0.0.1:9".into(), None),
            &["http://localhost:3000".to_string()],
        );
        let resp = app
            .oneshot(
                Request::get("/health")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_cors_defaults_to_any_origin() {
        let app = router(state("http://127.0.0.1:9".into(), None), &[]);
        let resp = app
            .oneshot(
                Request::get("/health")
                    .header("origin", "http://lessons.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    }
}
