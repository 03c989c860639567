//! Extension psserver pour YouTube
//!
//! `psyoutube` ajoute ses routes à `psserver::Server` via le trait
//! [`YoutubeExt`], sans que `psserver` dépende de `psyoutube`.
//!
//! ```rust,no_run
//! use psyoutube::YoutubeExt;
//! use psserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new_configured().build();
//!     let youtube = server.init_youtube().await?;
//!     println!("cookie: {:?}", youtube.resolver.decorator().cookie());
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

use crate::api_rest::{YoutubeApiDoc, create_router};
use crate::config_ext::YoutubeConfigExt;
use crate::decorator::RequestDecorator;
use crate::provider::InnerTubeExtractor;
use crate::resolver::Resolver;
use crate::search::SearchClient;
use anyhow::Result;
use psconfig::Config;
use psserver::Server;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use utoipa::OpenApi;

/// État partagé des handlers YouTube
#[derive(Clone)]
pub struct YoutubeState {
    pub resolver: Arc<Resolver>,
    pub search: Arc<SearchClient>,
    /// Client HTTP du proxy de flux (sans timeout global)
    pub http: reqwest::Client,
    /// `false` : `/audio` répond 501
    pub audio_enabled: bool,
}

impl YoutubeState {
    pub fn new(resolver: Resolver, search: SearchClient, audio_enabled: bool) -> Self {
        Self {
            resolver: Arc::new(resolver),
            search: Arc::new(search),
            http: reqwest::Client::new(),
            audio_enabled,
        }
    }

    /// Construit le résolveur et le client de recherche depuis `youtube.*`
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.get_youtube_request_timeout_secs()?);
        let (client_name, client_version) = config.get_youtube_innertube_client()?;

        let po_token = config.get_youtube_po_token()?;
        if po_token.is_none() {
            warn!("youtube.po_token is not set, resolved URLs will carry no pot parameter");
        }
        let decorator = RequestDecorator::new(po_token).with_cookie(config.get_youtube_cookies()?);

        let extractor = InnerTubeExtractor::builder()
            .client_name(client_name)
            .client_version(client_version)
            .timeout(timeout)
            .build()?;

        let api_key = config.get_youtube_api_key()?;
        if api_key.is_none() {
            warn!("youtube.api_key is not set, /search will fail");
        }
        let search = SearchClient::builder()
            .api_key(api_key)
            .max_results(config.get_youtube_search_max_results()?)
            .timeout(timeout)
            .build()?;

        Ok(Self::new(
            Resolver::new(Arc::new(extractor), decorator),
            search,
            config.get_youtube_audio_enabled()?,
        ))
    }
}

/// Trait pour étendre psserver avec la recherche et la résolution YouTube
pub trait YoutubeExt {
    /// Initialise l'extension depuis la configuration globale
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /`, `/search`, `/resolve`, `/audio`, `/audio/stream`
    /// - documentation sous `/swagger-ui/youtube`
    async fn init_youtube(&mut self) -> Result<Arc<YoutubeState>>;

    /// Initialise l'extension avec un état déjà construit
    async fn init_youtube_with_state(&mut self, state: YoutubeState) -> Arc<YoutubeState>;
}

impl YoutubeExt for Server {
    async fn init_youtube(&mut self) -> Result<Arc<YoutubeState>> {
        info!("Initializing YouTube API...");
        let state = YoutubeState::from_config(&psconfig::get_config())?;
        Ok(self.init_youtube_with_state(state).await)
    }

    async fn init_youtube_with_state(&mut self, state: YoutubeState) -> Arc<YoutubeState> {
        self.add_router("/", create_router(state.clone())).await;
        self.add_openapi_docs(YoutubeApiDoc::openapi(), "youtube").await;

        info!(
            audio_enabled = state.audio_enabled,
            "YouTube API initialized: /search, /resolve, /audio"
        );
        Arc::new(state)
    }
}
