//! Session registry driven by a scripted native player

use psplayer::{
    EngineConfig, EventPayload, EventSubscription, NativePlayer, PlaybackState, PlayerError,
    PlayerFactory, PlayerSignal, SessionRegistry, SessionResources, SignalSender,
};
use psyoutube::RequestDecorator;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Trace partagée des appels faits aux lecteurs simulés
#[derive(Default)]
struct Spy {
    calls: Mutex<Vec<String>>,
    last_headers: Mutex<Option<HeaderMap>>,
    position_ms: AtomicU64,
    creates: AtomicUsize,
    releases: AtomicUsize,
    signals: Mutex<Option<SignalSender>>,
}

impl Spy {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn signal(&self, signal: PlayerSignal) {
        self.signals
            .lock()
            .unwrap()
            .as_ref()
            .unwrap()
            .send(signal)
            .unwrap();
    }
}

struct MockPlayer(Arc<Spy>);

impl NativePlayer for MockPlayer {
    fn set_source(&mut self, url: &str, headers: &HeaderMap) {
        self.0.record(format!("source:{}", url));
        *self.0.last_headers.lock().unwrap() = Some(headers.clone());
    }
    fn play(&mut self) {
        self.0.record("play");
    }
    fn pause(&mut self) {
        self.0.record("pause");
    }
    fn stop(&mut self) {
        self.0.record("stop");
        self.0.position_ms.store(0, Ordering::SeqCst);
    }
    fn seek(&mut self, position_ms: u64) {
        self.0.record(format!("seek:{}", position_ms));
        self.0.position_ms.store(position_ms, Ordering::SeqCst);
    }
    fn set_volume(&mut self, volume: f32) {
        self.0.record(format!("volume:{}", volume));
    }
    fn set_skip_silence(&mut self, enabled: bool) {
        self.0.record(format!("skip_silence:{}", enabled));
    }
    fn position_ms(&self) -> u64 {
        self.0.position_ms.load(Ordering::SeqCst)
    }
    fn release(&mut self) {
        self.0.releases.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockFactory {
    spy: Arc<Spy>,
    ready_on_create: bool,
    fail: bool,
}

impl PlayerFactory for MockFactory {
    fn create(&self, _session_id: &str, signals: SignalSender) -> psplayer::Result<SessionResources> {
        if self.fail {
            return Err(PlayerError::Backend("no audio device".to_string()));
        }
        self.spy.creates.fetch_add(1, Ordering::SeqCst);
        if self.ready_on_create {
            signals.send(PlayerSignal::Ready { duration_ms: None }).unwrap();
        }
        *self.spy.signals.lock().unwrap() = Some(signals);
        Ok(SessionResources::new(Box::new(MockPlayer(self.spy.clone())), None))
    }
}

fn registry_with(decorator: RequestDecorator, ready_on_create: bool) -> (SessionRegistry, Arc<Spy>) {
    let spy = Arc::new(Spy::default());
    let factory = MockFactory {
        spy: spy.clone(),
        ready_on_create,
        fail: false,
    };
    (SessionRegistry::new(Arc::new(factory), decorator), spy)
}

fn registry() -> (SessionRegistry, Arc<Spy>) {
    registry_with(RequestDecorator::new(None), true)
}

fn drain(sub: &mut EventSubscription) -> Vec<EventPayload> {
    let mut events = Vec::new();
    while let Some(event) = sub.try_recv() {
        events.push(event.payload);
    }
    events
}

fn state(state: PlaybackState) -> EventPayload {
    EventPayload::State { state }
}

/// Session en `Ready` avec une source de 180 s
async fn loaded(registry: &SessionRegistry, spy: &Spy, sub: &mut EventSubscription) {
    registry.initialize("p1").unwrap();
    registry
        .set_source("p1", "https://media.example/a.m4a", &HashMap::new())
        .unwrap();
    spy.signal(PlayerSignal::Ready {
        duration_ms: Some(180_000),
    });
    while let Some(event) = sub.recv().await {
        if event.payload == state(PlaybackState::Ready) && registry.snapshot("p1").unwrap().duration_ms > 0 {
            break;
        }
    }
    drain(sub);
}

#[tokio::test(start_paused = true)]
async fn test_full_lifecycle_events() {
    let (registry, spy) = registry();
    let mut sub = registry.subscribe();

    let snapshot = registry.initialize("p1").unwrap();
    assert_eq!(snapshot.state, PlaybackState::Ready);
    assert_eq!(
        drain(&mut sub),
        vec![state(PlaybackState::Initializing), state(PlaybackState::Ready)]
    );

    registry
        .set_source("p1", "https://media.example/a.m4a", &HashMap::new())
        .unwrap();
    assert_eq!(drain(&mut sub), vec![state(PlaybackState::Buffering)]);

    spy.signal(PlayerSignal::Ready {
        duration_ms: Some(180_000),
    });
    assert_eq!(
        sub.recv().await.unwrap().payload,
        EventPayload::Duration { duration_ms: 180_000 }
    );
    assert_eq!(sub.recv().await.unwrap().payload, state(PlaybackState::Ready));

    registry.play("p1").unwrap();
    assert_eq!(
        drain(&mut sub),
        vec![
            state(PlaybackState::Playing),
            EventPayload::IsPlaying { is_playing: true }
        ]
    );

    spy.position_ms.store(1_500, Ordering::SeqCst);
    let event = sub.recv().await.unwrap();
    assert_eq!(event.session_id, "p1");
    assert_eq!(
        event.payload,
        EventPayload::Progress {
            position_ms: 1_500,
            duration_ms: 180_000
        }
    );

    registry.pause("p1").unwrap();
    assert_eq!(
        drain(&mut sub),
        vec![
            state(PlaybackState::Paused),
            EventPayload::IsPlaying { is_playing: false }
        ]
    );
    assert_eq!(registry.snapshot("p1").unwrap().position_ms, 1_500);

    registry.stop("p1").unwrap();
    assert_eq!(drain(&mut sub), vec![state(PlaybackState::Idle)]);
    let snapshot = registry.snapshot("p1").unwrap();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert_eq!(snapshot.position_ms, 0);

    assert_eq!(
        spy.calls(),
        vec!["source:https://media.example/a.m4a", "play", "pause", "stop"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_progress_only_while_playing() {
    let (registry, spy) = registry();
    let mut sub = registry.subscribe();
    loaded(&registry, &spy, &mut sub).await;

    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    assert!(drain(&mut sub).is_empty());

    registry.play("p1").unwrap();
    drain(&mut sub);
    for expected in [1_000u64, 2_000, 3_000] {
        spy.position_ms.store(expected, Ordering::SeqCst);
        match sub.recv().await.unwrap().payload {
            EventPayload::Progress { position_ms, .. } => assert_eq!(position_ms, expected),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    registry.pause("p1").unwrap();
    drain(&mut sub);
    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    assert!(drain(&mut sub).is_empty());

    // pas de progression après un seek hors lecture
    registry.seek("p1", 42_000).unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;
    assert!(drain(&mut sub).is_empty());
    assert_eq!(registry.snapshot("p1").unwrap().position_ms, 42_000);
}

#[tokio::test(start_paused = true)]
async fn test_ended_stops_ticker() {
    let (registry, spy) = registry();
    let mut sub = registry.subscribe();
    loaded(&registry, &spy, &mut sub).await;

    registry.play("p1").unwrap();
    drain(&mut sub);

    spy.signal(PlayerSignal::Ended);
    assert_eq!(sub.recv().await.unwrap().payload, state(PlaybackState::Ended));
    assert_eq!(
        sub.recv().await.unwrap().payload,
        EventPayload::IsPlaying { is_playing: false }
    );
    assert_eq!(registry.snapshot("p1").unwrap().position_ms, 180_000);

    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    assert!(drain(&mut sub).is_empty());

    // relecture depuis le début
    registry.play("p1").unwrap();
    assert_eq!(registry.snapshot("p1").unwrap().state, PlaybackState::Playing);
    assert!(spy.calls().contains(&"seek:0".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_native_error_while_playing_stops_progress() {
    let (registry, spy) = registry();
    let mut sub = registry.subscribe();
    loaded(&registry, &spy, &mut sub).await;

    registry.play("p1").unwrap();
    drain(&mut sub);

    spy.signal(PlayerSignal::Error {
        code: "SOURCE_UNAVAILABLE".to_string(),
        message: "connection reset".to_string(),
    });
    assert_eq!(sub.recv().await.unwrap().payload, state(PlaybackState::Error));

    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    let events = drain(&mut sub);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, EventPayload::Progress { .. })),
        "unexpected progress after error: {events:?}"
    );
    assert_eq!(registry.snapshot("p1").unwrap().state, PlaybackState::Error);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_while_playing_stops_progress() {
    let (registry, spy) = registry();
    let mut sub = registry.subscribe();
    loaded(&registry, &spy, &mut sub).await;

    registry.play("p1").unwrap();
    drain(&mut sub);

    registry.dispose("p1");
    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    let events = drain(&mut sub);
    assert!(events.contains(&state(PlaybackState::Disposed)));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, EventPayload::Progress { .. })),
        "unexpected progress after dispose: {events:?}"
    );
    assert_eq!(spy.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_play_while_buffering_waits_for_ready() {
    let (registry, spy) = registry();
    let mut sub = registry.subscribe();

    registry.initialize("p1").unwrap();
    registry
        .set_source("p1", "https://media.example/a.m4a", &HashMap::new())
        .unwrap();
    registry.play("p1").unwrap();

    let snapshot = registry.snapshot("p1").unwrap();
    assert_eq!(snapshot.state, PlaybackState::Buffering);
    assert!(snapshot.play_when_ready);
    drain(&mut sub);

    spy.signal(PlayerSignal::Ready { duration_ms: None });
    assert_eq!(sub.recv().await.unwrap().payload, state(PlaybackState::Ready));
    assert_eq!(sub.recv().await.unwrap().payload, state(PlaybackState::Playing));
    assert_eq!(
        sub.recv().await.unwrap().payload,
        EventPayload::IsPlaying { is_playing: true }
    );
}

#[tokio::test]
async fn test_initialize_waits_for_native_ready() {
    let (registry, spy) = registry_with(RequestDecorator::new(None), false);
    let mut sub = registry.subscribe();

    let snapshot = registry.initialize("p1").unwrap();
    assert_eq!(snapshot.state, PlaybackState::Initializing);
    assert!(matches!(
        registry.play("p1"),
        Err(PlayerError::InvalidState { operation: "play", .. })
    ));
    assert!(matches!(
        registry.seek("p1", 10),
        Err(PlayerError::InvalidState { .. })
    ));

    spy.signal(PlayerSignal::Ready { duration_ms: None });
    assert_eq!(
        sub.recv().await.unwrap().payload,
        state(PlaybackState::Initializing)
    );
    assert_eq!(sub.recv().await.unwrap().payload, state(PlaybackState::Ready));
}

#[tokio::test]
async fn test_native_error_blocks_transport_until_stop_or_reinitialize() {
    let (registry, spy) = registry();
    let mut sub = registry.subscribe();
    loaded(&registry, &spy, &mut sub).await;
    registry.seek("p1", 5_000).unwrap();

    spy.signal(PlayerSignal::Error {
        code: "SOURCE_UNAVAILABLE".to_string(),
        message: "HTTP 403".to_string(),
    });
    assert_eq!(sub.recv().await.unwrap().payload, state(PlaybackState::Error));
    assert_eq!(
        sub.recv().await.unwrap().payload,
        EventPayload::Error {
            code: "SOURCE_UNAVAILABLE".to_string(),
            message: "HTTP 403".to_string()
        }
    );

    for result in [
        registry.play("p1"),
        registry.pause("p1"),
        registry.seek("p1", 0),
        registry.set_source("p1", "https://media.example/b.m4a", &HashMap::new()),
    ] {
        assert!(matches!(result, Err(PlayerError::InvalidState { .. })));
    }
    // le volume reste réglable
    registry.set_volume("p1", 0.5).unwrap();
    drain(&mut sub);
    assert_eq!(registry.snapshot("p1").unwrap().position_ms, 5_000);

    // stop sort de l'erreur
    registry.stop("p1").unwrap();
    let snapshot = registry.snapshot("p1").unwrap();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(drain(&mut sub), vec![state(PlaybackState::Idle)]);
    assert!(spy.calls().contains(&"stop".to_string()));

    registry.initialize("p1").unwrap();
    assert_eq!(registry.snapshot("p1").unwrap().state, PlaybackState::Ready);
    assert_eq!(spy.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dispose_then_not_found() {
    let (registry, spy) = registry();
    let mut sub = registry.subscribe();

    registry.initialize("p1").unwrap();
    drain(&mut sub);

    registry.dispose("p1");
    assert_eq!(drain(&mut sub), vec![state(PlaybackState::Disposed)]);
    assert_eq!(spy.releases.load(Ordering::SeqCst), 1);

    registry.dispose("p1");
    registry.dispose("never-created");
    assert_eq!(spy.releases.load(Ordering::SeqCst), 1);
    assert!(!registry.contains("p1"));

    assert!(matches!(registry.play("p1"), Err(PlayerError::NotFound(_))));
    assert!(matches!(registry.stop("p1"), Err(PlayerError::NotFound(_))));
    assert!(matches!(registry.snapshot("p1"), Err(PlayerError::NotFound(_))));
    assert!(matches!(
        registry.set_source("p1", "https://media.example/a.m4a", &HashMap::new()),
        Err(PlayerError::NotFound(_))
    ));

    registry.initialize("p1").unwrap();
    assert_eq!(spy.creates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_reinitialize_releases_previous_once() {
    let (registry, spy) = registry();

    registry.initialize("p1").unwrap();
    registry.initialize("p1").unwrap();
    registry.initialize("p2").unwrap();

    assert_eq!(spy.creates.load(Ordering::SeqCst), 3);
    assert_eq!(spy.releases.load(Ordering::SeqCst), 1);
    assert_eq!(registry.session_ids(), vec!["p1", "p2"]);

    registry.dispose_all();
    assert_eq!(spy.releases.load(Ordering::SeqCst), 3);
    assert!(registry.session_ids().is_empty());
}

#[tokio::test]
async fn test_factory_failure() {
    let factory = MockFactory {
        spy: Arc::new(Spy::default()),
        ready_on_create: true,
        fail: true,
    };
    let registry = SessionRegistry::new(Arc::new(factory), RequestDecorator::new(None));

    assert!(matches!(registry.initialize("p1"), Err(PlayerError::Backend(_))));
    assert!(!registry.contains("p1"));
    assert!(matches!(
        registry.initialize("  "),
        Err(PlayerError::Validation(_))
    ));
}

#[tokio::test]
async fn test_source_headers_are_decorated_and_caller_wins() {
    let (registry, spy) = registry_with(
        RequestDecorator::new(Some("origin-token".to_string())).with_cookie(Some("SID=1".to_string())),
        true,
    );
    registry.initialize("p1").unwrap();

    let mut headers = HashMap::new();
    headers.insert("User-Agent".to_string(), "PowerSmart/1.0".to_string());
    registry
        .set_source("p1", "https://rr1---sn-abc.googlevideo.com/videoplayback?id=1", &headers)
        .unwrap();

    let sent = spy.last_headers.lock().unwrap().clone().unwrap();
    assert_eq!(sent["user-agent"], "PowerSmart/1.0");
    assert_eq!(sent["x-youtube-po-token"], "origin-token");
    assert_eq!(sent["origin"], "https://www.youtube.com");
    assert_eq!(sent["cookie"], "SID=1");
    assert!(sent.contains_key("accept-language"));

    registry
        .set_source("p1", "https://cdn.example.org/a.mp3", &HashMap::new())
        .unwrap();
    let sent = spy.last_headers.lock().unwrap().clone().unwrap();
    assert!(!sent.contains_key("x-youtube-po-token"));

    assert!(matches!(
        registry.set_source("p1", "  ", &HashMap::new()),
        Err(PlayerError::Validation(_))
    ));
    assert!(matches!(
        registry.set_source("p1", "not a url", &HashMap::new()),
        Err(PlayerError::Validation(_))
    ));
}

#[tokio::test]
async fn test_volume_and_engine_config() {
    let (registry, spy) = registry();
    registry.initialize("p1").unwrap();

    registry.set_volume("p1", 1.7).unwrap();
    assert_eq!(registry.snapshot("p1").unwrap().volume, 1.0);
    registry.set_volume("p1", -0.3).unwrap();
    assert_eq!(registry.snapshot("p1").unwrap().volume, 0.0);
    assert!(matches!(
        registry.set_volume("p1", f32::NAN),
        Err(PlayerError::Validation(_))
    ));

    registry
        .set_engine_config(
            "p1",
            &EngineConfig {
                gapless: Some(false),
                bit_depth: Some(24),
                sample_rate: Some(96_000),
                volume: Some(0.25),
            },
        )
        .unwrap();

    let snapshot = registry.snapshot("p1").unwrap();
    assert_eq!(snapshot.volume, 0.25);
    assert!(!snapshot.engine.gapless);
    assert_eq!(snapshot.engine.bit_depth, Some(24));
    assert_eq!(snapshot.engine.sample_rate, Some(96_000));

    let calls = spy.calls();
    assert!(calls.contains(&"skip_silence:true".to_string()));
    assert!(calls.contains(&"volume:0.25".to_string()));
}

#[tokio::test]
async fn test_late_subscriber_sees_only_future_events() {
    let (registry, _spy) = registry();
    let mut first = registry.subscribe();
    registry.initialize("p1").unwrap();

    let mut second = registry.subscribe();
    assert!(drain(&mut second).is_empty());
    assert_eq!(drain(&mut first).len(), 2);

    registry.stop("p1").unwrap();
    assert_eq!(drain(&mut second), vec![state(PlaybackState::Idle)]);
    assert!(first.recv().await.is_none());
}
