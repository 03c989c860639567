//! Registre des sessions de lecture
//!
//! Une session est insérée par `initialize` et retirée par `dispose` ; une
//! recherche ne crée jamais de session. Toute autre commande sur un
//! identifiant inconnu échoue avec [`PlayerError::NotFound`].

use crate::backend::PlayerFactory;
use crate::error::{PlayerError, Result};
use crate::events::{EventHub, EventSubscription};
use crate::session::{EngineConfig, Session, SessionSnapshot, SharedSession, lock_session};
use psyoutube::RequestDecorator;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use url::Url;

/// Période par défaut des événements `progress`
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(1000);

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SharedSession>>,
    events: EventHub,
    factory: Arc<dyn PlayerFactory>,
    decorator: RequestDecorator,
    progress_interval: Duration,
}

impl SessionRegistry {
    pub fn new(factory: Arc<dyn PlayerFactory>, decorator: RequestDecorator) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            events: EventHub::new(),
            factory,
            decorator,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Remplace l'abonné courant du flux d'événements
    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SharedSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn session(&self, id: &str) -> Result<SharedSession> {
        self.sessions()
            .get(id)
            .cloned()
            .ok_or_else(|| PlayerError::NotFound(id.to_string()))
    }

    fn with_session<T>(&self, id: &str, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let session = self.session(id)?;
        let mut guard = lock_session(&session);
        f(&mut *guard)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions().contains_key(id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Crée la session `id`, ou remplace ses ressources si elle existe déjà
    ///
    /// Les anciennes ressources sont libérées avant la création des
    /// nouvelles ; si la fabrique échoue, l'identifiant n'est plus enregistré.
    pub fn initialize(&self, id: &str) -> Result<SessionSnapshot> {
        let id = id.trim();
        if id.is_empty() {
            return Err(PlayerError::validation("Session id must not be empty"));
        }

        let mut sessions = self.sessions();
        if let Some(previous) = sessions.remove(id) {
            info!(session_id = id, "Re-initializing session, releasing previous player");
            lock_session(&previous).shutdown();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let resources = self
            .factory
            .create(id, tx)
            .inspect_err(|e| error!(session_id = id, "Failed to create player: {}", e))?;

        let session = Session::start(
            id,
            resources,
            rx,
            self.events.clone(),
            self.progress_interval,
        );
        let snapshot = lock_session(&session).snapshot();
        sessions.insert(id.to_string(), session);

        info!(session_id = id, "Session initialized");
        Ok(snapshot)
    }

    /// Charge `url` ; les en-têtes de l'appelant sont décorés puis gagnent
    pub fn set_source(&self, id: &str, url: &str, headers: &HashMap<String, String>) -> Result<()> {
        let session = self.session(id)?;

        let url = url.trim();
        if url.is_empty() {
            return Err(PlayerError::validation("Source URL must not be empty"));
        }
        let parsed = Url::parse(url)
            .map_err(|e| PlayerError::validation(format!("Invalid source URL: {}", e)))?;
        let caller = caller_headers(headers)?;
        let decorated = self.decorator.headers_for(&parsed, &caller);

        lock_session(&session).set_source(url, &decorated)
    }

    pub fn play(&self, id: &str) -> Result<()> {
        self.with_session(id, Session::play)
    }

    pub fn pause(&self, id: &str) -> Result<()> {
        self.with_session(id, Session::pause)
    }

    pub fn stop(&self, id: &str) -> Result<()> {
        self.with_session(id, Session::stop)
    }

    pub fn seek(&self, id: &str, position_ms: u64) -> Result<()> {
        self.with_session(id, |s| s.seek(position_ms))
    }

    pub fn set_volume(&self, id: &str, volume: f32) -> Result<()> {
        self.with_session(id, |s| s.set_volume(volume))
    }

    pub fn set_engine_config(&self, id: &str, config: &EngineConfig) -> Result<()> {
        self.with_session(id, |s| s.set_engine_config(config))
    }

    pub fn snapshot(&self, id: &str) -> Result<SessionSnapshot> {
        self.with_session(id, |s| Ok(s.snapshot()))
    }

    /// Libère la session ; sans effet si elle n'existe pas
    pub fn dispose(&self, id: &str) {
        let removed = self.sessions().remove(id);
        if let Some(session) = removed {
            lock_session(&session).dispose();
        }
    }

    /// Libère toutes les sessions (arrêt du serveur)
    pub fn dispose_all(&self) {
        let drained: Vec<SharedSession> = self.sessions().drain().map(|(_, s)| s).collect();
        for session in drained {
            lock_session(&session).dispose();
        }
    }
}

fn caller_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| PlayerError::validation(format!("Invalid header name: {}", name)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| PlayerError::validation(format!("Invalid value for header {}", name)))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
