//! États d'une session de lecture

use serde::{Deserialize, Serialize};
use std::fmt;

/// État d'une session de lecture
///
/// ```text
/// Idle ─initialize─▶ Initializing ─ready─▶ Ready ─play─▶ Playing ─pause─▶ Paused
///                        setSource ─▶ Buffering ─ready─▶ Ready
/// (sauf Disposed) ─stop─▶ Idle    erreur native ─▶ Error      dispose ─▶ Disposed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Initializing,
    Buffering,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
    Disposed,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Initializing => "initializing",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
            PlaybackState::Error => "error",
            PlaybackState::Disposed => "disposed",
        }
    }

    /// Une source est chargée ou en cours de chargement
    pub fn has_source(&self) -> bool {
        matches!(
            self,
            PlaybackState::Buffering
                | PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Ended
        )
    }

    /// `Error` et `Disposed` n'acceptent plus de commande de transport
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Error | PlaybackState::Disposed)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&PlaybackState::Playing).unwrap(), "\"playing\"");
        assert_eq!(
            serde_json::to_string(&PlaybackState::Initializing).unwrap(),
            "\"initializing\""
        );
        for state in [PlaybackState::Idle, PlaybackState::Ended, PlaybackState::Disposed] {
            assert_eq!(
                serde_json::to_value(state).unwrap(),
                serde_json::Value::String(state.to_string())
            );
        }
    }

    #[test]
    fn test_predicates() {
        assert!(PlaybackState::Paused.has_source());
        assert!(!PlaybackState::Idle.has_source());
        assert!(!PlaybackState::Initializing.has_source());
        assert!(PlaybackState::Error.is_terminal());
        assert!(!PlaybackState::Ended.is_terminal());
    }
}
