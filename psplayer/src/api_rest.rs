//! Endpoints API REST du lecteur
//!
//! Montés sous `/api/player` :
//!
//! - `POST /{session_id}/initialize` - crée (ou recrée) la session
//! - `POST /{session_id}/source` - `{url, headers}`
//! - `POST /{session_id}/play|pause|stop`
//! - `POST /{session_id}/seek` - `{positionMs}`
//! - `POST /{session_id}/volume` - `{volume}`
//! - `POST /{session_id}/engine-config` - `{gapless?, bitDepth?, sampleRate?, volume?}`
//! - `GET /{session_id}` - état courant
//! - `DELETE /{session_id}` - libère la session
//! - `GET /events` - flux SSE `{sessionId, type, ...}` (un seul abonné)
//!
//! et sous `/api/intent` :
//!
//! - `POST /` - `{uri}` met un fichier en attente
//! - `GET /pending` - rend le fichier en attente et le retire

use crate::error::{ErrorResponse, PlayerError};
use crate::events::PlayerEvent;
use crate::intent::PendingIntent;
use crate::registry::SessionRegistry;
use crate::session::{EngineConfig, SessionSnapshot};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::{OpenApi, ToSchema};

/// État partagé des handlers du lecteur
#[derive(Clone)]
pub struct PlayerState {
    pub registry: Arc<SessionRegistry>,
    pub intent: Arc<PendingIntent>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SourceRequest {
    pub url: String,
    /// En-têtes ajoutés aux requêtes du lecteur (prioritaires)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeekRequest {
    pub position_ms: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VolumeRequest {
    pub volume: f32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IntentRequest {
    pub uri: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingIntentResponse {
    /// `null` quand aucun fichier n'est en attente
    pub uri: Option<String>,
}

type ApiResult<T> = Result<Json<T>, PlayerError>;

/// Crée le router de l'API lecteur
pub fn create_player_router(state: PlayerState) -> Router {
    Router::new()
        .route("/events", get(events))
        .route("/{session_id}", get(snapshot).delete(dispose))
        .route("/{session_id}/initialize", post(initialize))
        .route("/{session_id}/source", post(set_source))
        .route("/{session_id}/play", post(play))
        .route("/{session_id}/pause", post(pause))
        .route("/{session_id}/stop", post(stop))
        .route("/{session_id}/seek", post(seek))
        .route("/{session_id}/volume", post(set_volume))
        .route("/{session_id}/engine-config", post(set_engine_config))
        .with_state(state)
}

/// Crée le router de l'API des fichiers en attente
pub fn create_intent_router(state: PlayerState) -> Router {
    Router::new()
        .route("/", post(offer_intent))
        .route("/pending", get(pending_intent))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/{session_id}/initialize",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    responses(
        (status = 200, description = "Session créée", body = SessionSnapshot),
        (status = 400, description = "Identifiant invalide", body = ErrorResponse),
        (status = 500, description = "Lecteur natif indisponible", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn initialize(
    State(state): State<PlayerState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.registry.initialize(&session_id)?))
}

#[utoipa::path(
    post,
    path = "/{session_id}/source",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    request_body = SourceRequest,
    responses(
        (status = 200, description = "Source en chargement", body = SessionSnapshot),
        (status = 400, description = "URL ou en-tête invalide", body = ErrorResponse),
        (status = 404, description = "Session inconnue", body = ErrorResponse),
        (status = 409, description = "Session en erreur", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn set_source(
    State(state): State<PlayerState>,
    Path(session_id): Path<String>,
    Json(req): Json<SourceRequest>,
) -> ApiResult<SessionSnapshot> {
    state
        .registry
        .set_source(&session_id, &req.url, &req.headers)?;
    Ok(Json(state.registry.snapshot(&session_id)?))
}

#[utoipa::path(
    post,
    path = "/{session_id}/play",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    responses(
        (status = 200, description = "Lecture lancée", body = SessionSnapshot),
        (status = 404, description = "Session inconnue", body = ErrorResponse),
        (status = 409, description = "Aucune source prête", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn play(
    State(state): State<PlayerState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    state.registry.play(&session_id)?;
    Ok(Json(state.registry.snapshot(&session_id)?))
}

#[utoipa::path(
    post,
    path = "/{session_id}/pause",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    responses(
        (status = 200, description = "Lecture en pause", body = SessionSnapshot),
        (status = 404, description = "Session inconnue", body = ErrorResponse),
        (status = 409, description = "Session en erreur", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn pause(
    State(state): State<PlayerState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    state.registry.pause(&session_id)?;
    Ok(Json(state.registry.snapshot(&session_id)?))
}

#[utoipa::path(
    post,
    path = "/{session_id}/stop",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    responses(
        (status = 200, description = "Session arrêtée", body = SessionSnapshot),
        (status = 404, description = "Session inconnue", body = ErrorResponse),
        (status = 409, description = "Session en erreur", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn stop(
    State(state): State<PlayerState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    state.registry.stop(&session_id)?;
    Ok(Json(state.registry.snapshot(&session_id)?))
}

#[utoipa::path(
    post,
    path = "/{session_id}/seek",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    request_body = SeekRequest,
    responses(
        (status = 200, description = "Position modifiée", body = SessionSnapshot),
        (status = 404, description = "Session inconnue", body = ErrorResponse),
        (status = 409, description = "Aucune source chargée", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn seek(
    State(state): State<PlayerState>,
    Path(session_id): Path<String>,
    Json(req): Json<SeekRequest>,
) -> ApiResult<SessionSnapshot> {
    state.registry.seek(&session_id, req.position_ms)?;
    Ok(Json(state.registry.snapshot(&session_id)?))
}

#[utoipa::path(
    post,
    path = "/{session_id}/volume",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    request_body = VolumeRequest,
    responses(
        (status = 200, description = "Volume appliqué (borné à [0, 1])", body = SessionSnapshot),
        (status = 400, description = "Volume invalide", body = ErrorResponse),
        (status = 404, description = "Session inconnue", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn set_volume(
    State(state): State<PlayerState>,
    Path(session_id): Path<String>,
    Json(req): Json<VolumeRequest>,
) -> ApiResult<SessionSnapshot> {
    state.registry.set_volume(&session_id, req.volume)?;
    Ok(Json(state.registry.snapshot(&session_id)?))
}

#[utoipa::path(
    post,
    path = "/{session_id}/engine-config",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    request_body = EngineConfig,
    responses(
        (status = 200, description = "Réglages appliqués", body = SessionSnapshot),
        (status = 400, description = "Volume invalide", body = ErrorResponse),
        (status = 404, description = "Session inconnue", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn set_engine_config(
    State(state): State<PlayerState>,
    Path(session_id): Path<String>,
    Json(config): Json<EngineConfig>,
) -> ApiResult<SessionSnapshot> {
    state.registry.set_engine_config(&session_id, &config)?;
    Ok(Json(state.registry.snapshot(&session_id)?))
}

#[utoipa::path(
    get,
    path = "/{session_id}",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    responses(
        (status = 200, description = "État de la session", body = SessionSnapshot),
        (status = 404, description = "Session inconnue", body = ErrorResponse)
    ),
    tag = "player"
)]
async fn snapshot(
    State(state): State<PlayerState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.registry.snapshot(&session_id)?))
}

#[utoipa::path(
    delete,
    path = "/{session_id}",
    params(("session_id" = String, Path, description = "Identifiant de session")),
    responses((status = 204, description = "Session libérée (toujours)")),
    tag = "player"
)]
async fn dispose(State(state): State<PlayerState>, Path(session_id): Path<String>) -> StatusCode {
    state.registry.dispose(&session_id);
    StatusCode::NO_CONTENT
}

fn sse_event(event: &PlayerEvent) -> Option<Event> {
    match Event::default().json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            warn!(kind = event.payload.kind(), "Failed to encode player event: {}", e);
            None
        }
    }
}

/// Handler SSE : remplace l'abonné courant, événements futurs uniquement
#[utoipa::path(
    get,
    path = "/events",
    responses((status = 200, description = "Flux SSE d'événements", body = PlayerEvent, content_type = "text/event-stream")),
    tag = "player"
)]
async fn events(State(state): State<PlayerState>) -> impl IntoResponse {
    let mut subscription = state.registry.subscribe();
    debug!(subscriber = subscription.id(), "Player event subscriber connected");

    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            if let Some(sse) = sse_event(&event) {
                yield Ok::<_, axum::Error>(sse);
            }
        }
        debug!(subscriber = subscription.id(), "Player event subscription replaced");
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[utoipa::path(
    post,
    path = "/",
    request_body = IntentRequest,
    responses(
        (status = 204, description = "Fichier mis en attente"),
        (status = 400, description = "URI vide", body = ErrorResponse)
    ),
    tag = "intent"
)]
async fn offer_intent(
    State(state): State<PlayerState>,
    Json(req): Json<IntentRequest>,
) -> Result<StatusCode, PlayerError> {
    state.intent.offer(&req.uri)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/pending",
    responses((status = 200, description = "Fichier en attente, retiré après lecture", body = PendingIntentResponse)),
    tag = "intent"
)]
async fn pending_intent(State(state): State<PlayerState>) -> Json<PendingIntentResponse> {
    Json(PendingIntentResponse {
        uri: state.intent.take(),
    })
}

/// Documentation OpenAPI de l'API lecteur
#[derive(OpenApi)]
#[openapi(
    paths(
        initialize,
        set_source,
        play,
        pause,
        stop,
        seek,
        set_volume,
        set_engine_config,
        snapshot,
        dispose,
        events
    ),
    components(schemas(
        SessionSnapshot,
        SourceRequest,
        SeekRequest,
        VolumeRequest,
        EngineConfig,
        PlayerEvent,
        ErrorResponse
    )),
    tags((name = "player", description = "Sessions de lecture et flux d'événements"))
)]
pub struct PlayerApiDoc;

/// Documentation OpenAPI de l'API des fichiers en attente
#[derive(OpenApi)]
#[openapi(
    paths(offer_intent, pending_intent),
    components(schemas(IntentRequest, PendingIntentResponse, ErrorResponse)),
    tags((name = "intent", description = "Fichiers ouverts depuis le système"))
)]
pub struct IntentApiDoc;
