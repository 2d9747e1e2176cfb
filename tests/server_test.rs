mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use helpers::{pipeline_with, test_pipeline, FailingEmbeddings, FailingGenerator, RecordingGenerator};
use serde_json::Value;
use std::sync::Arc;
use tarot::config::TarotConfig;
use tarot::generation::AnswerGenerator;
use tarot::server::{self, router::router, state::AppState};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(state: Arc<AppState>) -> Router {
    router(state, &["http://localhost:3000".to_string()])
}

async fn ready_state(dir: &std::path::Path, generator: Arc<dyn AnswerGenerator>) -> Arc<AppState> {
    let state = Arc::new(AppState::new());
    state.mark_ready(Arc::new(test_pipeline(dir, generator).await));
    state
}

fn post_tarot(body: &str) -> Request<Body> {
    Request::post("/api/tarot")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn root_describes_the_service() {
    let (status, body) = send(
        app(Arc::new(AppState::new())),
        Request::get("/").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
    assert_eq!(body["message"], "🔮 塔羅 API 運作中");
    assert_eq!(body["endpoints"]["今日運勢"], "POST /api/tarot");
    assert_eq!(body["endpoints"]["健康檢查"], "GET /health");
}

#[tokio::test]
async fn health_reports_readiness() {
    let state = Arc::new(AppState::new());
    let (status, body) = send(
        app(Arc::clone(&state)),
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["phase"], "starting");

    let tmp = TempDir::new().unwrap();
    let ready = ready_state(tmp.path(), Arc::new(RecordingGenerator::default())).await;
    let (_, body) = send(
        app(ready),
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["phase"], "ready");
}

#[tokio::test]
async fn tarot_is_unavailable_until_ready() {
    let state = Arc::new(AppState::new());

    for body in [r#"{"card": "愚者", "orientation": "upright"}"#, "not json at all"] {
        let (status, json) = send(app(Arc::clone(&state)), post_tarot(body)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["detail"], "模型尚未載入完成，請稍後再試");
    }

    state.mark_failed("index missing".into());
    let (status, _) = send(
        app(state),
        post_tarot(r#"{"card": "愚者", "orientation": "upright"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn tarot_returns_a_reading() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::default());
    let state = ready_state(tmp.path(), generator.clone()).await;

    let (status, body) = send(
        app(state),
        post_tarot(r#"{"card": "愚者", "orientation": "upright"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["card"], "愚者");
    assert_eq!(body["orientation"], "upright");
    assert!(!body["analysis"].as_str().unwrap().is_empty());
    assert!(generator.prompts()[0].contains("愚者 正位"));
}

#[tokio::test]
async fn malformed_draws_are_unprocessable() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::default());
    let state = ready_state(tmp.path(), generator.clone()).await;

    for body in [
        r#"{"card": "愚者"}"#,
        r#"{"orientation": "upright"}"#,
        r#"{"card": "愚者", "orientation": "sideways"}"#,
        r#"{"card": "愚者", "orientation": "正位"}"#,
    ] {
        let (status, json) = send(app(Arc::clone(&state)), post_tarot(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body: {body}");
        assert!(json["detail"].is_string());
    }
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn generation_failure_is_a_server_error() {
    let tmp = TempDir::new().unwrap();
    let state = ready_state(tmp.path(), Arc::new(FailingGenerator)).await;

    let (status, body) = send(
        app(state),
        post_tarot(r#"{"card": "魔術師", "orientation": "reversed"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("生成運勢時發生錯誤："));
    assert!(detail.contains("quota exceeded"));
}

#[tokio::test]
async fn embedding_failure_is_a_server_error() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::default());
    let state = Arc::new(AppState::new());
    state.mark_ready(Arc::new(
        pipeline_with(tmp.path(), Arc::new(FailingEmbeddings), generator.clone()).await,
    ));

    let (status, body) = send(
        app(state),
        post_tarot(r#"{"card": "愚者", "orientation": "upright"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("生成運勢時發生錯誤："));
    assert!(detail.contains("failed to embed query"));
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn allowed_origin_gets_cors_headers() {
    let response = app(Arc::new(AppState::new()))
        .oneshot(
            Request::get("/")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );

    let response = app(Arc::new(AppState::new()))
        .oneshot(
            Request::get("/")
                .header(header::ORIGIN, "https://elsewhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn serve_exits_when_the_index_is_missing() {
    let tmp = TempDir::new().unwrap();
    let mut config = TarotConfig::default();
    config.server.port = 0;
    config.index.path = tmp.path().join("missing.db").to_string_lossy().into_owned();
    // Self-hosted endpoints need no key; nothing is contacted before the index opens.
    config.embedding.provider = "openai".into();
    config.embedding.model = "text-embedding-3-small".into();
    config.embedding.base_url = Some("http://127.0.0.1:9/v1".into());
    config.generation.provider = "openai".into();
    config.generation.model = "gpt-4o-mini".into();
    config.generation.base_url = Some("http://127.0.0.1:9/v1".into());

    let result = tokio::time::timeout(std::time::Duration::from_secs(10), server::serve(config))
        .await
        .expect("serve should stop on its own");
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("tarot build-index"));
}
