//! Abstraction du lecteur natif
//!
//! La session ne connaît le décodeur qu'au travers de [`NativePlayer`] et de
//! [`RenderTarget`]. Les commandes sont synchrones et ne retournent pas
//! d'erreur : le lecteur signale la préparation, la fin de lecture et ses
//! erreurs de manière asynchrone via un [`SignalSender`].

use crate::error::Result;
use reqwest::header::HeaderMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Signal émis par un lecteur natif
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerSignal {
    /// Le lecteur attend des données
    Buffering,
    /// Le lecteur peut démarrer ; durée connue ou non
    Ready { duration_ms: Option<u64> },
    /// Fin du média
    Ended,
    /// Erreur de lecture (réseau, décodage, source)
    Error { code: String, message: String },
}

pub type SignalSender = mpsc::UnboundedSender<PlayerSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<PlayerSignal>;

/// Commandes du lecteur natif
pub trait NativePlayer: Send {
    /// Charge une source ; `headers` est déjà décoré
    fn set_source(&mut self, url: &str, headers: &HeaderMap);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position_ms: u64);
    /// Volume dans `[0, 1]`
    fn set_volume(&mut self, volume: f32);
    fn set_skip_silence(&mut self, enabled: bool);
    fn position_ms(&self) -> u64;
    /// Libère les ressources natives, appelé une seule fois
    fn release(&mut self);
}

/// Surface de rendu vidéo associée à un lecteur
pub trait RenderTarget: Send {
    fn id(&self) -> u64;
    /// Appelé une seule fois
    fn release(&mut self);
}

/// Lecteur et surface d'une session, libérés ensemble une seule fois
pub struct SessionResources {
    player: Box<dyn NativePlayer>,
    render_target: Option<Box<dyn RenderTarget>>,
    released: bool,
}

impl SessionResources {
    pub fn new(player: Box<dyn NativePlayer>, render_target: Option<Box<dyn RenderTarget>>) -> Self {
        Self {
            player,
            render_target,
            released: false,
        }
    }

    pub fn player(&self) -> &dyn NativePlayer {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> &mut dyn NativePlayer {
        self.player.as_mut()
    }

    pub fn render_target_id(&self) -> Option<u64> {
        self.render_target.as_ref().map(|t| t.id())
    }

    /// Libère lecteur et surface ; les appels suivants sont sans effet
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.player.release();
        if let Some(target) = self.render_target.as_mut() {
            target.release();
        }
        debug!("Native player resources released");
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        self.release();
    }
}

/// Crée les ressources natives d'une session
pub trait PlayerFactory: Send + Sync {
    fn create(&self, session_id: &str, signals: SignalSender) -> Result<SessionResources>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    impl NativePlayer for Counting {
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
        fn release(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl RenderTarget for Counting {
        fn id(&self) -> u64 {
            7
        }
        fn release(&mut self) {
            self.0.fetch_add(10, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut resources = SessionResources::new(
            Box::new(Counting(count.clone())),
            Some(Box::new(Counting(count.clone()))),
        );
        assert_eq!(resources.render_target_id(), Some(7));

        resources.release();
        resources.release();
        drop(resources);
        assert_eq!(count.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_drop_releases() {
        let count = Arc::new(AtomicUsize::new(0));
        drop(SessionResources::new(Box::new(Counting(count.clone())), None));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
