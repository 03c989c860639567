//! Flux d'événements des sessions de lecture
//!
//! Un seul abonné actif : un nouvel abonnement remplace le précédent (dont le
//! flux se termine) et ne reçoit que les événements postérieurs.

use crate::state::PlaybackState;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Événement `{sessionId, type, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct PlayerEvent {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl PlayerEvent {
    pub fn new(session_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            session_id: session_id.into(),
            payload,
        }
    }
}

/// Contenu d'un événement, discriminé par `type`
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventPayload {
    State {
        state: PlaybackState,
    },
    IsPlaying {
        #[serde(rename = "isPlaying")]
        is_playing: bool,
    },
    Progress {
        #[serde(rename = "positionMs")]
        position_ms: u64,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    Error {
        code: String,
        message: String,
    },
    Duration {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::State { .. } => "state",
            EventPayload::IsPlaying { .. } => "isPlaying",
            EventPayload::Progress { .. } => "progress",
            EventPayload::Error { .. } => "error",
            EventPayload::Duration { .. } => "duration",
        }
    }
}

type Sink = (u64, mpsc::UnboundedSender<PlayerEvent>);

/// Point de diffusion vers l'abonné unique
#[derive(Clone, Default)]
pub struct EventHub {
    sink: Arc<Mutex<Option<Sink>>>,
    next_id: Arc<Mutex<u64>>,
}

/// Réception des événements d'un abonnement
pub struct EventSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<PlayerEvent>,
}

impl EventSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Prochain événement, `None` quand l'abonnement a été remplacé
    pub async fn recv(&mut self) -> Option<PlayerEvent> {
        self.rx.recv().await
    }

    /// Événement déjà en attente, sans bloquer
    pub fn try_recv(&mut self) -> Option<PlayerEvent> {
        self.rx.try_recv().ok()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ouvre un abonnement et ferme le précédent
    pub fn subscribe(&self) -> EventSubscription {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        let (tx, rx) = mpsc::unbounded_channel();

        let previous = self
            .sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace((id, tx));
        if let Some((old_id, _)) = previous {
            debug!(old_id, new_id = id, "Event subscriber replaced");
        }

        EventSubscription { id, rx }
    }

    /// Ferme l'abonnement `id` s'il est encore actif
    pub fn unsubscribe(&self, id: u64) {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        if sink.as_ref().is_some_and(|(current, _)| *current == id) {
            *sink = None;
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|(_, tx)| !tx.is_closed())
    }

    /// Envoie à l'abonné courant ; sans abonné l'événement est perdu
    pub fn emit(&self, event: PlayerEvent) {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, tx)) = sink.as_ref() {
            if tx.send(event).is_err() {
                *sink = None;
            }
        }
    }

    pub fn emit_payload(&self, session_id: &str, payload: EventPayload) {
        self.emit(PlayerEvent::new(session_id, payload));
    }
}
