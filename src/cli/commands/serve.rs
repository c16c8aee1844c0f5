//! HTTP API server.
//!
//! Exposes ingestion, listing and streaming question answering. Answers are
//! streamed as Server-Sent Events; errors that happen before the stream
//! starts are plain JSON responses with a matching status code.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::{ErrorKind, TubeqaError};
use crate::orchestrator::Orchestrator;
use crate::rag::StreamEvent;
use crate::vector_store::{QuestionAnswer, Video};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};

/// Events buffered between the exchange task and the SSE response.
const EVENT_BUFFER: usize = 32;

/// Shared application state.
struct AppState {
    orchestrator: Arc<Orchestrator>,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let cors = cors_layer(settings.server.frontend_url.as_deref())?;

    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    let app = router(orchestrator).layer(cors);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("tubeqa API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Add video", "POST /api/add-video");
    Output::kv("List videos", "GET  /api/list-videos");
    Output::kv("Get video", "GET  /api/get-video/{videoId}");
    Output::kv("Conversation", "GET  /api/list-conversation/{videoId}");
    Output::kv("Chunk count", "GET  /api/chunk-count/{videoId}");
    Output::kv("Ask (SSE)", "POST /api/ask-question");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = Arc::new(AppState { orchestrator });

    Router::new()
        .route("/health", get(health))
        .route("/api/add-video", post(add_video))
        .route("/api/list-videos", get(list_videos))
        .route("/api/get-video/{video_id}", get(get_video))
        .route("/api/list-conversation/{video_id}", get(list_conversation))
        .route("/api/chunk-count/{video_id}", get(chunk_count))
        .route("/api/ask-question", post(ask_question))
        .with_state(state)
}

fn cors_layer(frontend_url: Option<&str>) -> crate::Result<CorsLayer> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match frontend_url {
        Some(origin) => {
            let origin = origin.parse::<HeaderValue>().map_err(|e| {
                TubeqaError::Config(format!("Invalid server.frontend_url '{}': {}", origin, e))
            })?;
            Ok(cors.allow_origin(origin))
        }
        None => Ok(cors.allow_origin(Any)),
    }
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AddVideoRequest {
    url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AskQuestionRequest {
    question: Option<String>,
    video_id: Option<VideoIdInput>,
}

/// A video id sent either as a JSON number or as a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum VideoIdInput {
    Number(i64),
    Text(String),
}

impl VideoIdInput {
    fn resolve(self) -> Result<i64, ApiError> {
        match self {
            VideoIdInput::Number(id) => Ok(id),
            VideoIdInput::Text(raw) => parse_video_id(raw.trim()),
        }
    }
}

#[derive(Serialize)]
struct VideoResponse {
    message: &'static str,
    data: Video,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkCountResponse {
    video_id: i64,
    chunk_count: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// A library error rendered as a JSON response.
struct ApiError(TubeqaError);

impl From<TubeqaError> for ApiError {
    fn from(err: TubeqaError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(TubeqaError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected: {}", self.0);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.public_message(),
            }),
        )
            .into_response()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Duplicate => StatusCode::CONFLICT,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
        ErrorKind::Ingestion | ErrorKind::Persistence | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn parse_video_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError(TubeqaError::Validation(format!("Invalid videoId: {}", raw))))
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn add_video(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddVideoRequest>, JsonRejection>,
) -> Result<Json<VideoResponse>, ApiError> {
    let Json(req) = payload?;
    let url = req
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| TubeqaError::Validation("URL is required".to_string()))?;

    let video = state.orchestrator.ingest_video(&url).await?;
    Ok(Json(VideoResponse {
        message: "Video added",
        data: video,
    }))
}

async fn list_videos(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(state.orchestrator.list_videos().await?))
}

async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResponse>, ApiError> {
    let video = state.orchestrator.get_video(parse_video_id(&video_id)?).await?;
    Ok(Json(VideoResponse {
        message: "Video fetched successfully",
        data: video,
    }))
}

async fn list_conversation(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<Vec<QuestionAnswer>>, ApiError> {
    let history = state
        .orchestrator
        .conversation_history(parse_video_id(&video_id)?)
        .await?;
    Ok(Json(history))
}

async fn chunk_count(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<ChunkCountResponse>, ApiError> {
    let video_id = parse_video_id(&video_id)?;
    let chunk_count = state.orchestrator.chunk_count(video_id).await?;
    Ok(Json(ChunkCountResponse {
        video_id,
        chunk_count,
    }))
}

async fn ask_question(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskQuestionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let (question, video_id) = match (req.question, req.video_id) {
        (Some(question), Some(video_id)) => (question, video_id.resolve()?),
        _ => {
            return Err(ApiError(TubeqaError::Validation(
                "Question and videoId are required".to_string(),
            )))
        }
    };

    let exchange = state.orchestrator.prepare_question(video_id, &question).await?;

    let (tx, rx) = mpsc::channel::<StreamEvent>(EVENT_BUFFER);
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        let mut tx = tx;
        if let Err(e) = orchestrator.complete_question(exchange, &mut tx).await {
            debug!("Exchange ended without an answer: {}", e);
        }
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Event::default().event(event.name()).json_data(&event), rx))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEmbeddingModel, FakeGenerationModel, FakeMetadataSource, FakeTranscriptSource};
    use crate::transcript::TranscriptEntry;
    use crate::vector_store::MemoryVectorStore;

    async fn spawn_server(generation: FakeGenerationModel) -> String {
        let mut settings = Settings::default();
        settings.embedding.dimensions = 3;
        let entries = (0..16)
            .map(|i| TranscriptEntry::new(format!("line {}", i), i as f64, 1.0))
            .collect();

        let orchestrator = Orchestrator::with_components(
            settings,
            Arc::new(MemoryVectorStore::new(3)),
            Arc::new(FakeEmbeddingModel::constant(vec![1.0, 0.0, 0.0])),
            Arc::new(generation),
            Arc::new(FakeMetadataSource),
            Arc::new(FakeTranscriptSource { entries }),
        )
        .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(orchestrator)).layer(cors_layer(None).unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Duplicate), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Upstream), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::Cancelled).as_u16(), 499);
        assert_eq!(status_for(ErrorKind::Persistence), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_frontend_url_is_config_error() {
        tokio_test::assert_ok!(cors_layer(Some("http://localhost:5173")));
        tokio_test::assert_ok!(cors_layer(None));
        let err = tokio_test::assert_err!(cors_layer(Some("bad\norigin")));
        assert!(matches!(err, TubeqaError::Config(_)));
    }

    #[tokio::test]
    async fn test_add_video_then_ask_streams_events() {
        let base = spawn_server(FakeGenerationModel::new(["Hel", "lo"])).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/api/add-video", base))
            .json(&serde_json::json!({ "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Video added");
        assert_eq!(body["data"]["externalId"], "dQw4w9WgXcQ");
        let video_id = body["data"]["id"].as_i64().unwrap();

        let duplicate = client
            .post(format!("{}/api/add-video", base))
            .json(&serde_json::json!({ "url": "dQw4w9WgXcQ" }))
            .send()
            .await
            .unwrap();
        assert_eq!(duplicate.status(), 409);

        let count: serde_json::Value = client
            .get(format!("{}/api/chunk-count/{}", base, video_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(count["chunkCount"], 2);

        let stream = client
            .post(format!("{}/api/ask-question", base))
            .json(&serde_json::json!({ "question": "Greeting?", "videoId": video_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(stream.status(), 200);
        let text = stream.text().await.unwrap();

        let hel = text.find("\"text\":\"Hel\"").unwrap();
        let lo = text.find("\"text\":\"lo\"").unwrap();
        let done = text.find("event: done").unwrap();
        assert!(hel < lo && lo < done);

        let history: Vec<serde_json::Value> = client
            .get(format!("{}/api/list-conversation/{}", base, video_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["answer"], "Hello");
        assert_eq!(history[0]["question"], "Greeting?");
    }

    #[tokio::test]
    async fn test_pre_stream_errors_are_json() {
        let base = spawn_server(FakeGenerationModel::new(["unused"])).await;
        let client = reqwest::Client::new();

        let missing = client
            .post(format!("{}/api/ask-question", base))
            .json(&serde_json::json!({ "question": "Anything?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 400);

        let unknown = client
            .post(format!("{}/api/ask-question", base))
            .json(&serde_json::json!({ "question": "Anything?", "videoId": 999 }))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown.status(), 404);
        let body: serde_json::Value = unknown.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("999"));

        let bad_id = client
            .get(format!("{}/api/get-video/abc", base))
            .send()
            .await
            .unwrap();
        assert_eq!(bad_id.status(), 400);
    }

    #[tokio::test]
    async fn test_string_video_id_and_malformed_bodies() {
        let base = spawn_server(FakeGenerationModel::new(["Yes"])).await;
        let client = reqwest::Client::new();

        let body: serde_json::Value = client
            .post(format!("{}/api/add-video", base))
            .json(&serde_json::json!({ "url": "dQw4w9WgXcQ" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let video_id = body["data"]["id"].as_i64().unwrap();

        let text = client
            .post(format!("{}/api/ask-question", base))
            .json(&serde_json::json!({ "question": "q?", "videoId": video_id.to_string() }))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(text.contains("event: done"));

        let bodies = [
            serde_json::json!({ "question": "q?", "videoId": "abc" }),
            serde_json::json!({ "question": "q?", "videoId": true }),
        ];
        for body in bodies {
            let response = client
                .post(format!("{}/api/ask-question", base))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 400);
            let error: serde_json::Value = response.json().await.unwrap();
            assert!(error["error"].is_string());
        }

        let routes = ["/api/ask-question", "/api/add-video"];
        for route in routes {
            let response = client
                .post(format!("{}{}", base, route))
                .header("content-type", "application/json")
                .body("{not json")
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 400);
            assert!(response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("application/json"));
            let error: serde_json::Value = response.json().await.unwrap();
            assert!(error["error"].as_str().unwrap().contains("Invalid request body"));
        }
    }

    #[tokio::test]
    async fn test_mid_stream_failure_sends_error_event() {
        let base = spawn_server(FakeGenerationModel::new(["Hel", "lo"]).fail_after(1)).await;
        let client = reqwest::Client::new();

        let body: serde_json::Value = client
            .post(format!("{}/api/add-video", base))
            .json(&serde_json::json!({ "url": "dQw4w9WgXcQ" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let video_id = body["data"]["id"].as_i64().unwrap();

        let text = client
            .post(format!("{}/api/ask-question", base))
            .json(&serde_json::json!({ "question": "Greeting?", "videoId": video_id }))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert!(text.contains("\"text\":\"Hel\""));
        assert!(text.contains("event: error"));
        assert!(!text.contains("event: done"));

        let history: Vec<serde_json::Value> = client
            .get(format!("{}/api/list-conversation/{}", base, video_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(history.is_empty());
    }
}
