//! HTTP surface for the recorder UI and the scrub player.
//!
//! Control routes drive the session controller; `/hls/{file}` serves the
//! encoder's output straight from the workspace.

use crate::controller::{SessionController, StopOutcome};
use crate::supervisor::EncoderHealth;
use crate::timeline::{epoch_seconds, HistoryEntry, ScoreAction, ScoreBoard};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self {
            controller,
            start_time: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_root))
        .route("/health", get(health))
        .route("/start_recording", post(start_recording))
        .route("/stop_recording", post(stop_recording))
        .route("/update_score", post(update_score))
        .route("/reset_scores", post(reset_scores))
        .route("/api/status", get(status))
        .route("/api/history", get(history))
        .route("/hls/{file}", get(serve_artifact))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StartResponse {
    status: &'static str,
    start_time: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct StopResponse {
    status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    pub player: String,
    pub action: ScoreAction,
}

#[derive(Debug, Serialize)]
struct ScoresResponse {
    scores: ScoreBoard,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    recording: bool,
    start_time: f64,
    current_scores: ScoreBoard,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    start_time: f64,
    events: Vec<HistoryEntry>,
}

/// `0` stands in for "no session yet".
fn start_time(started_at: Option<DateTime<Utc>>) -> f64 {
    started_at.map(epoch_seconds).unwrap_or(0.0)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: "error",
            message: message.into(),
        }),
    )
        .into_response()
}

/// Serve root discovery endpoint
async fn serve_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Breakshot",
        "version": env!("CARGO_PKG_VERSION"),
        "links": {
            "health": "/health",
            "status": "/api/status",
            "history": "/api/history",
            "manifest": "/hls/stream.m3u8",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    // One observation feeds both fields so they cannot disagree mid-stop.
    let health = state.controller.health();
    let encoder = match health {
        EncoderHealth::Idle => serde_json::json!({ "state": "idle" }),
        EncoderHealth::Running => serde_json::json!({ "state": "running" }),
        EncoderHealth::Exited(code) => serde_json::json!({ "state": "exited", "code": code }),
    };

    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "recording": health != EncoderHealth::Idle,
        "encoder": encoder,
    }))
}

#[tracing::instrument(skip(state))]
async fn start_recording(State(state): State<AppState>) -> Response {
    match state.controller.start().await {
        Ok(info) => Json(StartResponse {
            status: "started",
            start_time: epoch_seconds(info.started_at),
        })
        .into_response(),
        Err(e) => {
            tracing::warn!("Start refused: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[tracing::instrument(skip(state))]
async fn stop_recording(State(state): State<AppState>) -> Json<StopResponse> {
    if let StopOutcome::Stopped { termination, .. } = state.controller.stop().await {
        tracing::debug!(?termination, "encoder stopped");
    }
    Json(StopResponse { status: "stopped" })
}

#[tracing::instrument(skip(state))]
async fn update_score(
    State(state): State<AppState>,
    Json(req): Json<UpdateScoreRequest>,
) -> Response {
    if req.player.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "player must not be empty");
    }
    let scores = state.controller.record_event(&req.player, req.action);
    Json(ScoresResponse { scores }).into_response()
}

#[tracing::instrument(skip(state))]
async fn reset_scores(State(state): State<AppState>) -> Json<ScoresResponse> {
    Json(ScoresResponse {
        scores: state.controller.reset_scores(),
    })
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.controller.status();
    Json(StatusResponse {
        recording: snapshot.recording,
        start_time: start_time(snapshot.started_at),
        current_scores: snapshot.scores,
    })
}

async fn history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let snapshot = state.controller.history();
    Json(HistoryResponse {
        start_time: start_time(snapshot.started_at),
        events: snapshot.history,
    })
}

#[tracing::instrument(skip(state))]
async fn serve_artifact(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let Some((path, kind)) = state.controller.workspace().artifact_path(&file) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let handle = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            tracing::warn!("Failed to open {}: {}", path.display(), e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body = Body::from_stream(ReaderStream::new(handle));
    (
        [
            (header::CONTENT_TYPE, kind.content_type()),
            (header::CACHE_CONTROL, kind.cache_control()),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use breakconf::BreakConfig;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn setup_test_state() -> (AppState, TempDir) {
        setup_with_encoder(None)
    }

    fn setup_with_encoder(program: Option<&str>) -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let workspace = temp_dir.path().join("hls");
        std::fs::create_dir_all(&workspace).unwrap();

        let mut config = BreakConfig::default();
        config.paths.workspace_dir = workspace;
        config.paths.encoder_log = temp_dir.path().join("ffmpeg.log");
        config.capture.program = match program {
            Some(program) => program.into(),
            None => temp_dir.path().join("no-such-encoder"),
        };

        let controller = Arc::new(SessionController::new(&config));
        (AppState::new(controller), temp_dir)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_status_before_first_session() {
        let (state, _temp_dir) = setup_test_state();
        let app = router(state);

        let response = app.oneshot(empty("GET", "/api/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["recording"], false);
        assert_eq!(json["start_time"].as_f64().unwrap(), 0.0);
        assert!(json["current_scores"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_score_and_history() {
        let (state, _temp_dir) = setup_test_state();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/update_score",
                serde_json::json!({"player": "Alice", "action": "add"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["scores"]["Alice"], 1);

        let response = app.oneshot(empty("GET", "/api/history")).await.unwrap();
        let json = body_json(response).await;
        let events = json["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0]["timestamp"].as_f64().unwrap() > 0.0);
        assert_eq!(events[0]["scores"]["Alice"], 1);
    }

    #[tokio::test]
    async fn test_update_score_rejects_unknown_action() {
        let (state, _temp_dir) = setup_test_state();
        let controller = state.controller.clone();
        let app = router(state);

        let response = app
            .oneshot(post_json(
                "/update_score",
                serde_json::json!({"player": "Alice", "action": "double"}),
            ))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert!(controller.status().scores.is_empty(), "no player created");
    }

    #[tokio::test]
    async fn test_update_score_rejects_empty_player() {
        let (state, _temp_dir) = setup_test_state();
        let app = router(state);

        let response = app
            .oneshot(post_json(
                "/update_score",
                serde_json::json!({"player": " ", "action": "add"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["status"], "error");
    }

    #[tokio::test]
    async fn test_reset_scores() {
        let (state, _temp_dir) = setup_test_state();
        state.controller.record_event("Bob", ScoreAction::Add);
        let app = router(state);

        let response = app.oneshot(empty("POST", "/reset_scores")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["scores"]["Bob"], 0);
    }

    #[tokio::test]
    async fn test_start_failure_is_500() {
        let (state, _temp_dir) = setup_test_state();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(empty("POST", "/start_recording"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert!(json["message"].as_str().unwrap().contains("no-such-encoder"));

        let response = app.oneshot(empty("GET", "/api/status")).await.unwrap();
        assert_eq!(body_json(response).await["recording"], false);
    }

    #[tokio::test]
    async fn test_stop_when_idle() {
        let (state, _temp_dir) = setup_test_state();
        let app = router(state);

        let response = app.oneshot(empty("POST", "/stop_recording")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "stopped");
    }

    #[tokio::test]
    async fn test_serve_manifest_headers() {
        let (state, _temp_dir) = setup_test_state();
        let manifest = state.controller.workspace().manifest_path();
        std::fs::write(&manifest, "#EXTM3U\n").unwrap();
        let app = router(state);

        let response = app
            .oneshot(empty("GET", "/hls/stream.m3u8"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.apple.mpegurl"
        );
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"#EXTM3U\n");
    }

    #[tokio::test]
    async fn test_serve_segment_headers() {
        let (state, _temp_dir) = setup_test_state();
        let segment = state.controller.workspace().dir().join("segment_000.ts");
        std::fs::write(&segment, [0x47u8; 188]).unwrap();
        let app = router(state);

        let response = app
            .oneshot(empty("GET", "/hls/segment_000.ts"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp2t");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=60");
    }

    #[tokio::test]
    async fn test_serve_missing_and_escaping_files() {
        let (state, temp_dir) = setup_test_state();
        std::fs::write(temp_dir.path().join("secret.ts"), b"nope").unwrap();
        let app = router(state);

        for uri in [
            "/hls/segment_404.ts",
            "/hls/..%2Fsecret.ts",
            "/hls/ffmpeg.log",
        ] {
            let response = app.clone().oneshot(empty("GET", uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_cors_headers_present() {
        let (state, _temp_dir) = setup_test_state();
        let app = router(state);

        let request = Request::builder()
            .uri("/api/status")
            .header(header::ORIGIN, "http://player.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (state, _temp_dir) = setup_test_state();
        let app = router(state);

        let response = app.clone().oneshot(empty("GET", "/")).await.unwrap();
        assert_eq!(body_json(response).await["name"], "Breakshot");

        let response = app.oneshot(empty("GET", "/health")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["recording"], false);
        assert_eq!(json["encoder"]["state"], "idle");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_health_reports_exited_encoder_as_recording() {
        // `true` ignores the encoder arguments and exits straight away.
        let (state, _temp_dir) = setup_with_encoder(Some("true"));
        let controller = state.controller.clone();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(empty("POST", "/start_recording"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        while controller.health() == EncoderHealth::Running && Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        let response = app.clone().oneshot(empty("GET", "/health")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["encoder"]["state"], "exited");
        assert_eq!(json["recording"], true);

        app.clone()
            .oneshot(empty("POST", "/stop_recording"))
            .await
            .unwrap();
        let response = app.oneshot(empty("GET", "/health")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["encoder"]["state"], "idle");
        assert_eq!(json["recording"], false);
    }
}
