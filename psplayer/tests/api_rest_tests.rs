//! HTTP surface of the player and intent APIs

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use psplayer::api_rest::{create_intent_router, create_player_router};
use psplayer::{
    HeadlessFactory, NativePlayer, PendingIntent, PlayerFactory, PlayerSignal, PlayerState,
    SessionRegistry, SessionResources, SignalSender,
};
use psyoutube::RequestDecorator;
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Lecteur immédiatement prêt, sans effet
struct SilentPlayer;

impl NativePlayer for SilentPlayer {
    fn set_source(&mut self, _: &str, _: &HeaderMap) {}
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn stop(&mut self) {}
    fn seek(&mut self, _: u64) {}
    fn set_volume(&mut self, _: f32) {}
    fn set_skip_silence(&mut self, _: bool) {}
    fn position_ms(&self) -> u64 {
        0
    }
    fn release(&mut self) {}
}

struct SilentFactory;

impl PlayerFactory for SilentFactory {
    fn create(&self, _: &str, signals: SignalSender) -> psplayer::Result<SessionResources> {
        let _ = signals.send(PlayerSignal::Ready { duration_ms: None });
        Ok(SessionResources::new(Box::new(SilentPlayer), None))
    }
}

fn player_state(factory: Arc<dyn PlayerFactory>) -> PlayerState {
    PlayerState {
        registry: Arc::new(SessionRegistry::new(factory, RequestDecorator::new(None))),
        intent: Arc::new(PendingIntent::new()),
    }
}

async fn call(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_session_commands() {
    let router = create_player_router(player_state(Arc::new(SilentFactory)));

    let (status, body) = call(router.clone(), "POST", "/p1/initialize", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], "p1");
    assert_eq!(body["state"], "ready");
    assert_eq!(body["volume"], 1.0);

    let (status, body) = call(
        router.clone(),
        "POST",
        "/p1/source",
        Some(json!({"url": "https://media.example/a.m4a", "headers": {"X-Test": "1"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "buffering");

    let (status, body) = call(router.clone(), "POST", "/p1/seek", Some(json!({"positionMs": 5000}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["positionMs"], 5000);

    let (_, body) = call(router.clone(), "POST", "/p1/volume", Some(json!({"volume": 3.0}))).await;
    assert_eq!(body["volume"], 1.0);

    let (status, body) = call(
        router.clone(),
        "POST",
        "/p1/engine-config",
        Some(json!({"gapless": false, "bitDepth": 24, "sampleRate": 96000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["engine"], json!({"gapless": false, "bitDepth": 24, "sampleRate": 96000}));

    let (status, body) = call(router.clone(), "POST", "/p1/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["positionMs"], 0);

    let (status, body) = call(router.clone(), "POST", "/p1/play", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let (status, body) = call(router.clone(), "GET", "/p1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
}

#[tokio::test]
async fn test_errors_and_dispose() {
    let router = create_player_router(player_state(Arc::new(SilentFactory)));

    let (status, body) = call(router.clone(), "POST", "/ghost/play", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["message"], "Player not initialized: ghost");

    call(router.clone(), "POST", "/p1/initialize", None).await;
    let (status, body) = call(
        router.clone(),
        "POST",
        "/p1/source",
        Some(json!({"url": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = call(router.clone(), "DELETE", "/p1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(router.clone(), "DELETE", "/p1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(router, "GET", "/p1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_stream() {
    let state = player_state(Arc::new(SilentFactory));
    let router = create_player_router(state.clone());

    let response = router
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");

    state.registry.initialize("p1").unwrap();

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    let data = text
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap();
    assert_eq!(
        serde_json::from_str::<Value>(data).unwrap(),
        json!({"sessionId": "p1", "type": "state", "state": "initializing"})
    );
}

#[tokio::test]
async fn test_headless_backend_reaches_error_on_dead_source() {
    let media = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&media)
        .await;

    let state = player_state(Arc::new(HeadlessFactory::default()));
    let mut events = state.registry.subscribe();
    let router = create_player_router(state.clone());

    call(router.clone(), "POST", "/p1/initialize", None).await;
    let (status, _) = call(
        router.clone(),
        "POST",
        "/p1/source",
        Some(json!({"url": format!("{}/gone.mp3", media.uri())})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    loop {
        let event = events.recv().await.unwrap();
        if event.payload.kind() == "error" {
            break;
        }
    }

    let (_, body) = call(router.clone(), "GET", "/p1", None).await;
    assert_eq!(body["state"], "error");
    let (status, _) = call(router, "POST", "/p1/play", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_pending_intent() {
    let router = create_intent_router(player_state(Arc::new(SilentFactory)));

    let (status, body) = call(router.clone(), "GET", "/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"uri": null}));

    let (status, _) = call(
        router.clone(),
        "POST",
        "/",
        Some(json!({"uri": "content://media/external/audio/42"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call(router.clone(), "GET", "/pending", None).await;
    assert_eq!(body["uri"], "content://media/external/audio/42");
    let (_, body) = call(router.clone(), "GET", "/pending", None).await;
    assert!(body["uri"].is_null());

    let (status, body) = call(router, "POST", "/", Some(json!({"uri": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
