//! Lecteur natif sans sortie audio
//!
//! `HeadlessPlayer` tient l'horloge de lecture et vérifie que la source est
//! joignable (requête `Range: bytes=0-0` avec les en-têtes décorés) sans
//! décoder le flux. Il sert de backend par défaut au binaire et de référence
//! pour les lecteurs réels.

use crate::backend::{
    NativePlayer, PlayerFactory, PlayerSignal, RenderTarget, SessionResources, SignalSender,
};
use crate::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, RANGE};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Source introuvable ou refusée par l'hôte
pub const SOURCE_UNAVAILABLE: &str = "SOURCE_UNAVAILABLE";
/// Hôte injoignable
pub const SOURCE_UNREACHABLE: &str = "SOURCE_UNREACHABLE";

pub struct HeadlessPlayer {
    client: reqwest::Client,
    signals: SignalSender,
    check: Option<JoinHandle<()>>,
    base_position_ms: u64,
    started_at: Option<Instant>,
    volume: f32,
    skip_silence: bool,
}

impl HeadlessPlayer {
    pub fn new(client: reqwest::Client, signals: SignalSender) -> Self {
        Self {
            client,
            signals,
            check: None,
            base_position_ms: 0,
            started_at: None,
            volume: 1.0,
            skip_silence: false,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn skip_silence(&self) -> bool {
        self.skip_silence
    }

    fn cancel_check(&mut self) {
        if let Some(check) = self.check.take() {
            check.abort();
        }
    }

    fn freeze_clock(&mut self) {
        self.base_position_ms = self.position_ms();
        self.started_at = None;
    }

    fn send(&self, signal: PlayerSignal) {
        // récepteur fermé : la session a été libérée
        let _ = self.signals.send(signal);
    }
}

async fn check_source(
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    signals: SignalSender,
) {
    let signal = match Url::parse(&url) {
        Ok(parsed) if parsed.scheme() == "file" => check_file(&parsed).await,
        Ok(_) => check_http(&client, &url, headers).await,
        Err(e) => PlayerSignal::Error {
            code: SOURCE_UNAVAILABLE.to_string(),
            message: format!("Invalid source URL: {}", e),
        },
    };

    if let PlayerSignal::Error { code, message } = &signal {
        warn!(url = %url, code = %code, "Source check failed: {}", message);
    } else {
        debug!(url = %url, "Source check succeeded");
    }
    let _ = signals.send(signal);
}

async fn check_http(client: &reqwest::Client, url: &str, mut headers: HeaderMap) -> PlayerSignal {
    headers.insert(RANGE, HeaderValue::from_static("bytes=0-0"));

    match client.get(url).headers(headers).send().await {
        Ok(response) if response.status().is_success() => PlayerSignal::Ready { duration_ms: None },
        Ok(response) => PlayerSignal::Error {
            code: SOURCE_UNAVAILABLE.to_string(),
            message: format!("Source host returned HTTP {}", response.status().as_u16()),
        },
        Err(e) => PlayerSignal::Error {
            code: SOURCE_UNREACHABLE.to_string(),
            message: e.to_string(),
        },
    }
}

async fn check_file(url: &Url) -> PlayerSignal {
    let unavailable = |message: String| PlayerSignal::Error {
        code: SOURCE_UNAVAILABLE.to_string(),
        message,
    };

    let Ok(path) = url.to_file_path() else {
        return unavailable(format!("Not a local path: {}", url));
    };
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => PlayerSignal::Ready { duration_ms: None },
        Ok(_) => unavailable(format!("Not a file: {}", path.display())),
        Err(e) => unavailable(format!("{}: {}", path.display(), e)),
    }
}

impl NativePlayer for HeadlessPlayer {
    fn set_source(&mut self, url: &str, headers: &HeaderMap) {
        self.cancel_check();
        self.base_position_ms = 0;
        self.started_at = None;
        self.send(PlayerSignal::Buffering);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                self.check = Some(runtime.spawn(check_source(
                    self.client.clone(),
                    url.to_string(),
                    headers.clone(),
                    self.signals.clone(),
                )));
            }
            Err(e) => self.send(PlayerSignal::Error {
                code: SOURCE_UNREACHABLE.to_string(),
                message: format!("No async runtime to open the source: {}", e),
            }),
        }
    }

    fn play(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.freeze_clock();
    }

    fn stop(&mut self) {
        self.cancel_check();
        self.base_position_ms = 0;
        self.started_at = None;
    }

    fn seek(&mut self, position_ms: u64) {
        self.base_position_ms = position_ms;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_skip_silence(&mut self, enabled: bool) {
        self.skip_silence = enabled;
    }

    fn position_ms(&self) -> u64 {
        let elapsed = self
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.base_position_ms + elapsed
    }

    fn release(&mut self) {
        self.cancel_check();
        self.started_at = None;
    }
}

/// Emplacement de surface vidéo
pub struct SurfaceSlot {
    id: u64,
}

impl RenderTarget for SurfaceSlot {
    fn id(&self) -> u64 {
        self.id
    }

    fn release(&mut self) {
        debug!(surface_id = self.id, "Render target released");
    }
}

/// Fabrique de [`HeadlessPlayer`]
pub struct HeadlessFactory {
    client: reqwest::Client,
    video_surfaces: bool,
    next_surface_id: AtomicU64,
}

impl HeadlessFactory {
    pub fn new(client: reqwest::Client, video_surfaces: bool) -> Self {
        Self {
            client,
            video_surfaces,
            next_surface_id: AtomicU64::new(1),
        }
    }
}

impl Default for HeadlessFactory {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), false)
    }
}

impl PlayerFactory for HeadlessFactory {
    fn create(&self, session_id: &str, signals: SignalSender) -> Result<SessionResources> {
        let player = HeadlessPlayer::new(self.client.clone(), signals);
        // pas de préparation : prêt dès la création
        player.send(PlayerSignal::Ready { duration_ms: None });

        let surface: Option<Box<dyn RenderTarget>> = if self.video_surfaces {
            let id = self.next_surface_id.fetch_add(1, Ordering::Relaxed);
            Some(Box::new(SurfaceSlot { id }))
        } else {
            None
        };

        debug!(session_id, video = self.video_surfaces, "Headless player created");
        Ok(SessionResources::new(Box::new(player), surface))
    }
}
