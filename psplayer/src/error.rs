//! Erreurs des commandes de lecture

use crate::state::PlaybackState;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Échec d'une commande de lecture
///
/// Les erreurs du lecteur natif ne passent jamais par ce type : elles
/// arrivent sur le flux d'événements et font passer la session en `Error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlayerError {
    /// Aucune session pour cet identifiant
    #[error("Player not initialized: {0}")]
    NotFound(String),

    /// Argument invalide (URL vide, volume NaN, en-tête invalide...)
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// Commande impossible dans l'état courant
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: PlaybackState,
    },

    /// Le lecteur natif n'a pas pu être créé
    #[error("Native player error: {0}")]
    Backend(String),
}

impl PlayerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            PlayerError::NotFound(_) => "NOT_FOUND",
            PlayerError::Validation(_) => "VALIDATION_ERROR",
            PlayerError::InvalidState { .. } => "INVALID_STATE",
            PlayerError::Backend(_) => "BACKEND_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PlayerError::NotFound(_) => StatusCode::NOT_FOUND,
            PlayerError::Validation(_) => StatusCode::BAD_REQUEST,
            PlayerError::InvalidState { .. } => StatusCode::CONFLICT,
            PlayerError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Corps d'erreur `{code, message}`
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&PlayerError> for ErrorResponse {
    fn from(err: &PlayerError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for PlayerError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::from(&self))).into_response()
    }
}
