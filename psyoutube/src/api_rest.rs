//! Endpoints API REST pour YouTube
//!
//! Routes montées à la racine du serveur :
//!
//! - `GET /` - test de vie
//! - `GET /search?q=` - recherche de vidéos
//! - `GET /resolve?id=&poToken=&cookies=` - URL de flux + métadonnées
//! - `GET /audio?id=` - URL de flux seule
//! - `GET /audio/stream?id=` - proxy du flux audio
//!
//! Sur `/audio` et `/audio/stream`, tout échec autre que « aucun flux »
//! répond 500, y compris une extraction refusée que `/resolve` rend en 502.

use crate::decorator::MOBILE_USER_AGENT;
use crate::error::{Error, ErrorBody};
use crate::models::{ResolveResponse, SearchResult, watch_url};
use crate::resolver::ResolveOptions;
use crate::server_ext::YoutubeState;
use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{
            ACCEPT_ENCODING, ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE,
            CONTENT_TYPE, RANGE,
        },
    },
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{error, info};
use url::Url;
use utoipa::{IntoParams, OpenApi};

/// Texte du test de vie
pub const HEALTH_MESSAGE: &str = "Power Smart Audio Server is Running";

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Texte recherché
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ResolveQuery {
    /// Identifiant de la vidéo
    pub id: Option<String>,
    /// Jeton d'origine à utiliser pour cet appel
    pub po_token: Option<String>,
    /// Cookie de session (remplace le cookie courant)
    pub cookies: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AudioQuery {
    /// Identifiant de la vidéo
    pub id: Option<String>,
}

/// Crée le router de l'API YouTube
pub fn create_router(state: YoutubeState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/search", get(search))
        .route("/resolve", get(resolve))
        .route("/audio", get(audio))
        .route("/audio/stream", get(audio_stream))
        .with_state(state)
}

fn required_id(id: Option<String>) -> Result<String, Error> {
    id.map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(Error::MissingParameter("id"))
}

fn not_implemented(id: &str) -> Response {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(serde_json::json!({
            "error": "Audio extraction is not supported on this deployment",
            "videoUrl": watch_url(id),
        })),
    )
        .into_response()
}

fn log_failure(route: &str, err: &Error) {
    if !err.is_validation() {
        error!(route, code = err.code(), "{}", err);
    }
}

/// Réponse d'échec commune à `/audio` et `/audio/stream`
fn resolution_failure(route: &str, err: Error) -> Response {
    log_failure(route, &err);
    match err {
        Error::NoStreams(_) => err.into_response(),
        _ if err.is_validation() => err.into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::from(&err))).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Le serveur répond", body = String)),
    tag = "youtube"
)]
async fn health() -> &'static str {
    HEALTH_MESSAGE
}

#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Résultats (10 au plus)", body = Vec<SearchResult>),
        (status = 400, description = "Paramètre q manquant", body = ErrorBody),
        (status = 500, description = "Erreur du fournisseur", body = ErrorBody)
    ),
    tag = "youtube"
)]
async fn search(
    State(state): State<YoutubeState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, Error> {
    let query = params.q.unwrap_or_default();
    let results = state
        .search
        .search(&query)
        .await
        .inspect_err(|e| log_failure("/search", e))?;
    Ok(Json(results))
}

#[utoipa::path(
    get,
    path = "/resolve",
    params(ResolveQuery),
    responses(
        (status = 200, description = "Flux résolu", body = ResolveResponse),
        (status = 400, description = "Identifiant manquant", body = ErrorBody),
        (status = 404, description = "Aucun flux lisible (NO_STREAMS)", body = ErrorBody),
        (status = 502, description = "Échec d'extraction (EXTRACTION_EXCEPTION)", body = ErrorBody)
    ),
    tag = "youtube"
)]
async fn resolve(
    State(state): State<YoutubeState>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, Error> {
    let id = required_id(params.id)?;
    let options = ResolveOptions {
        po_token: params.po_token,
        cookies: params.cookies,
    };

    let stream = state
        .resolver
        .resolve_with(&id, options)
        .await
        .inspect_err(|e| log_failure("/resolve", e))?;
    Ok(Json(ResolveResponse::new(stream, MOBILE_USER_AGENT)))
}

#[utoipa::path(
    get,
    path = "/audio",
    params(AudioQuery),
    responses(
        (status = 200, description = "URL du flux audio"),
        (status = 400, description = "Identifiant manquant", body = ErrorBody),
        (status = 404, description = "Aucun flux audio", body = ErrorBody),
        (status = 500, description = "Échec de résolution", body = ErrorBody),
        (status = 501, description = "Résolution désactivée sur ce déploiement")
    ),
    tag = "youtube"
)]
async fn audio(State(state): State<YoutubeState>, Query(params): Query<AudioQuery>) -> Response {
    let id = match required_id(params.id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    if !state.audio_enabled {
        return not_implemented(&id);
    }

    match state.resolver.resolve(&id).await {
        Ok(stream) => Json(serde_json::json!({ "url": stream.final_url })).into_response(),
        Err(e) => resolution_failure("/audio", e),
    }
}

#[utoipa::path(
    get,
    path = "/audio/stream",
    params(AudioQuery),
    responses(
        (status = 200, description = "Flux audio binaire"),
        (status = 206, description = "Plage du flux audio"),
        (status = 400, description = "Identifiant manquant", body = ErrorBody),
        (status = 404, description = "Aucun flux audio", body = ErrorBody),
        (status = 500, description = "Échec de résolution ou hôte du flux en erreur", body = ErrorBody),
        (status = 501, description = "Résolution désactivée sur ce déploiement")
    ),
    tag = "youtube"
)]
async fn audio_stream(
    State(state): State<YoutubeState>,
    Query(params): Query<AudioQuery>,
    request_headers: HeaderMap,
) -> Result<Response, Error> {
    let id = required_id(params.id)?;
    if !state.audio_enabled {
        return Ok(not_implemented(&id));
    }

    let stream = match state.resolver.resolve(&id).await {
        Ok(stream) => stream,
        Err(e) => return Ok(resolution_failure("/audio/stream", e)),
    };
    let url = Url::parse(&stream.final_url)?;

    let mut caller = HeaderMap::new();
    caller.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    if let Some(range) = request_headers.get(RANGE) {
        caller.insert(RANGE, range.clone());
    }
    let headers = state.resolver.decorator().headers_for(&url, &caller);

    info!(content_id = %id, "Proxying audio stream");
    let upstream = state
        .http
        .get(url)
        .headers(headers)
        .send()
        .await
        .map_err(|e| Error::upstream(format!("Failed to connect: {}", e)))?;

    let status = upstream.status();
    if !status.is_success() {
        return Err(Error::upstream(format!(
            "Stream host returned HTTP {}",
            status.as_u16()
        )));
    }

    let mut response_headers = HeaderMap::new();
    for name in [CONTENT_TYPE, CONTENT_LENGTH, CONTENT_RANGE, ACCEPT_RANGES] {
        if let Some(value) = upstream.headers().get(&name) {
            response_headers.insert(name, value.clone());
        }
    }
    if !response_headers.contains_key(CONTENT_TYPE) {
        response_headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
    }
    response_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let body = Body::from_stream(upstream.bytes_stream());
    Ok((status, response_headers, body).into_response())
}

/// Documentation OpenAPI de l'API YouTube
#[derive(OpenApi)]
#[openapi(
    paths(health, search, resolve, audio, audio_stream),
    components(schemas(SearchResult, ResolveResponse, ErrorBody)),
    tags((name = "youtube", description = "Recherche et résolution de flux YouTube"))
)]
pub struct YoutubeApiDoc;
