//! Fichier à ouvrir transmis par le système
//!
//! Un seul URI en attente : le dernier reçu remplace le précédent, et la
//! lecture le consomme.

use crate::error::{PlayerError, Result};
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Default)]
pub struct PendingIntent {
    uri: Mutex<Option<String>>,
}

impl PendingIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Met `uri` en attente
    pub fn offer(&self, uri: &str) -> Result<()> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(PlayerError::validation("Intent URI must not be empty"));
        }
        info!(uri, "Received file intent");
        *self.uri.lock().unwrap_or_else(|e| e.into_inner()) = Some(uri.to_string());
        Ok(())
    }

    /// Rend l'URI en attente et le retire
    pub fn take(&self) -> Option<String> {
        self.uri.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn is_pending(&self) -> bool {
        self.uri.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_once() {
        let intent = PendingIntent::new();
        assert!(intent.take().is_none());

        intent.offer("content://media/1").unwrap();
        intent.offer(" file:///sdcard/Music/b.flac ").unwrap();
        assert!(intent.is_pending());

        assert_eq!(intent.take().as_deref(), Some("file:///sdcard/Music/b.flac"));
        assert!(intent.take().is_none());
    }

    #[test]
    fn test_empty_rejected() {
        let intent = PendingIntent::new();
        assert!(matches!(intent.offer("  "), Err(PlayerError::Validation(_))));
        assert!(!intent.is_pending());
    }
}
