//! Session de lecture : machine à états au-dessus d'un lecteur natif
//!
//! Chaque session possède deux tâches tokio :
//!
//! - la pompe, qui applique les signaux du lecteur natif ;
//! - le ticker, qui émet `progress` tant que la session est en `Playing`.
//!
//! Les deux ne tiennent qu'une référence faible sur la session et sont
//! annulées à l'arrêt, la pause, la fin, l'erreur et la libération.

use crate::backend::{PlayerSignal, SessionResources, SignalReceiver};
use crate::error::{PlayerError, Result};
use crate::events::{EventHub, EventPayload};
use crate::state::PlaybackState;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub type SharedSession = Arc<Mutex<Session>>;

pub(crate) fn lock_session(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}

/// Réglages moteur ; les champs absents sont laissés tels quels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// `true` désactive le saut des silences
    pub gapless: Option<bool>,
    pub bit_depth: Option<u32>,
    pub sample_rate: Option<u32>,
    pub volume: Option<f32>,
}

/// Réglages moteur appliqués à une session
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    pub gapless: bool,
    pub bit_depth: Option<u32>,
    pub sample_rate: Option<u32>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            gapless: true,
            bit_depth: None,
            sample_rate: None,
        }
    }
}

/// Photographie d'une session
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: PlaybackState,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub volume: f32,
    pub play_when_ready: bool,
    pub render_target_id: Option<u64>,
    pub engine: EngineSettings,
}

pub struct Session {
    id: String,
    state: PlaybackState,
    position_ms: u64,
    duration_ms: u64,
    volume: f32,
    play_when_ready: bool,
    engine: EngineSettings,
    resources: SessionResources,
    events: EventHub,
    progress_interval: Duration,
    this: Weak<Mutex<Session>>,
    pump: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl Session {
    /// Crée la session en `Initializing` et démarre la pompe de signaux
    ///
    /// Les signaux déjà émis par la fabrique sont appliqués avant le retour.
    pub(crate) fn start(
        id: &str,
        resources: SessionResources,
        mut signals: SignalReceiver,
        events: EventHub,
        progress_interval: Duration,
    ) -> SharedSession {
        let session = Arc::new_cyclic(|this| {
            Mutex::new(Session {
                id: id.to_string(),
                state: PlaybackState::Initializing,
                position_ms: 0,
                duration_ms: 0,
                volume: 1.0,
                play_when_ready: false,
                engine: EngineSettings::default(),
                resources,
                events,
                progress_interval,
                this: this.clone(),
                pump: None,
                ticker: None,
            })
        });

        {
            let mut guard = lock_session(&session);
            guard.emit(EventPayload::State {
                state: PlaybackState::Initializing,
            });
            while let Ok(signal) = signals.try_recv() {
                guard.handle_signal(signal);
            }
            guard.pump = Some(tokio::spawn(pump(Arc::downgrade(&session), signals)));
        }

        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    fn emit(&self, payload: EventPayload) {
        self.events.emit_payload(&self.id, payload);
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state == next {
            return;
        }
        debug!(session_id = %self.id, from = %self.state, to = %next, "State transition");
        self.state = next;
        self.emit(EventPayload::State { state: next });
    }

    fn invalid(&self, operation: &'static str) -> PlayerError {
        PlayerError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn ensure_live(&self, operation: &'static str) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.invalid(operation));
        }
        Ok(())
    }

    fn current_position(&self) -> u64 {
        let position = if self.state == PlaybackState::Playing {
            self.resources.player().position_ms()
        } else {
            self.position_ms
        };
        if self.duration_ms > 0 {
            position.min(self.duration_ms)
        } else {
            position
        }
    }

    fn start_ticker(&mut self) {
        self.cancel_ticker();
        self.ticker = Some(tokio::spawn(tick(self.this.clone(), self.progress_interval)));
    }

    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn start_playback(&mut self) {
        self.play_when_ready = true;
        self.resources.player_mut().play();
        self.transition(PlaybackState::Playing);
        self.emit(EventPayload::IsPlaying { is_playing: true });
        self.start_ticker();
    }

    /// Quitte `Playing` (ticker annulé, position figée) vers `next`
    fn leave_playback(&mut self, next: PlaybackState) {
        let was_playing = self.state == PlaybackState::Playing;
        self.cancel_ticker();
        self.position_ms = self.current_position();
        self.play_when_ready = false;
        self.transition(next);
        if was_playing {
            self.emit(EventPayload::IsPlaying { is_playing: false });
        }
    }

    fn report_progress(&mut self) {
        self.position_ms = self.current_position();
        self.emit(EventPayload::Progress {
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
        });
    }

    pub(crate) fn handle_signal(&mut self, signal: PlayerSignal) {
        debug!(session_id = %self.id, signal = ?signal, "Native signal");
        match signal {
            PlayerSignal::Buffering => {
                if self.state == PlaybackState::Ready {
                    self.transition(PlaybackState::Buffering);
                }
            }
            PlayerSignal::Ready { duration_ms } => {
                if self.state.is_terminal() {
                    return;
                }
                if let Some(duration) = duration_ms.filter(|d| *d != self.duration_ms) {
                    self.duration_ms = duration;
                    self.emit(EventPayload::Duration {
                        duration_ms: duration,
                    });
                }
                if matches!(
                    self.state,
                    PlaybackState::Initializing | PlaybackState::Buffering
                ) {
                    self.transition(PlaybackState::Ready);
                    if self.play_when_ready {
                        self.start_playback();
                    }
                }
            }
            PlayerSignal::Ended => {
                if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
                    self.leave_playback(PlaybackState::Ended);
                    if self.duration_ms > 0 {
                        self.position_ms = self.duration_ms;
                    }
                }
            }
            PlayerSignal::Error { code, message } => {
                if self.state.is_terminal() {
                    return;
                }
                warn!(session_id = %self.id, code = %code, "Native player error: {}", message);
                self.leave_playback(PlaybackState::Error);
                self.emit(EventPayload::Error { code, message });
            }
        }
    }

    /// Charge une source ; `headers` est déjà décoré
    pub fn set_source(&mut self, url: &str, headers: &HeaderMap) -> Result<()> {
        self.ensure_live("set source")?;
        self.leave_playback(self.state);
        self.position_ms = 0;
        self.duration_ms = 0;
        self.resources.player_mut().set_source(url, headers);
        self.transition(PlaybackState::Buffering);
        info!(session_id = %self.id, url, "Source set");
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Buffering => {
                self.play_when_ready = true;
                Ok(())
            }
            PlaybackState::Ready | PlaybackState::Paused => {
                self.start_playback();
                Ok(())
            }
            PlaybackState::Ended => {
                self.resources.player_mut().seek(0);
                self.position_ms = 0;
                self.start_playback();
                Ok(())
            }
            PlaybackState::Idle
            | PlaybackState::Initializing
            | PlaybackState::Error
            | PlaybackState::Disposed => Err(self.invalid("play")),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_live("pause")?;
        if self.state == PlaybackState::Playing {
            self.resources.player_mut().pause();
            self.leave_playback(PlaybackState::Paused);
        } else {
            self.play_when_ready = false;
        }
        Ok(())
    }

    /// Retour en `Idle` depuis tout état sauf `Disposed`, `Error` compris :
    /// position à 0, source déchargée
    pub fn stop(&mut self) -> Result<()> {
        if self.state == PlaybackState::Disposed {
            return Err(self.invalid("stop"));
        }
        self.resources.player_mut().stop();
        self.leave_playback(PlaybackState::Idle);
        self.position_ms = 0;
        self.duration_ms = 0;
        Ok(())
    }

    pub fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.ensure_live("seek")?;
        if !self.state.has_source() {
            return Err(self.invalid("seek"));
        }

        let target = if self.duration_ms > 0 {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        };
        self.resources.player_mut().seek(target);
        self.position_ms = target;
        if self.state == PlaybackState::Ended {
            self.transition(PlaybackState::Ready);
        }
        Ok(())
    }

    /// Volume ramené dans `[0, 1]` ; NaN refusé
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if volume.is_nan() {
            return Err(PlayerError::validation("Volume must be a number"));
        }
        let volume = volume.clamp(0.0, 1.0);
        self.resources.player_mut().set_volume(volume);
        self.volume = volume;
        Ok(())
    }

    pub fn set_engine_config(&mut self, config: &EngineConfig) -> Result<()> {
        if let Some(volume) = config.volume {
            self.set_volume(volume)?;
        }
        if let Some(gapless) = config.gapless {
            self.resources.player_mut().set_skip_silence(!gapless);
            self.engine.gapless = gapless;
        }
        if config.bit_depth.is_some() {
            self.engine.bit_depth = config.bit_depth;
        }
        if config.sample_rate.is_some() {
            self.engine.sample_rate = config.sample_rate;
        }
        info!(
            session_id = %self.id,
            gapless = self.engine.gapless,
            bit_depth = ?self.engine.bit_depth,
            sample_rate = ?self.engine.sample_rate,
            "Engine config applied"
        );
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            state: self.state,
            position_ms: self.current_position(),
            duration_ms: self.duration_ms,
            volume: self.volume,
            play_when_ready: self.play_when_ready,
            render_target_id: self.resources.render_target_id(),
            engine: self.engine.clone(),
        }
    }

    /// Annule les tâches et libère les ressources natives, sans événement
    pub(crate) fn shutdown(&mut self) {
        self.cancel_ticker();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.resources.release();
    }

    pub(crate) fn dispose(&mut self) {
        self.shutdown();
        self.play_when_ready = false;
        self.transition(PlaybackState::Disposed);
        info!(session_id = %self.id, "Session disposed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn pump(session: Weak<Mutex<Session>>, mut signals: SignalReceiver) {
    while let Some(signal) = signals.recv().await {
        let Some(session) = session.upgrade() else {
            break;
        };
        lock_session(&session).handle_signal(signal);
    }
}

async fn tick(session: Weak<Mutex<Session>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // le premier tick est immédiat
    interval.tick().await;

    loop {
        interval.tick().await;
        let Some(session) = session.upgrade() else {
            break;
        };
        let mut session = lock_session(&session);
        if session.state != PlaybackState::Playing {
            break;
        }
        session.report_progress();
    }
}
