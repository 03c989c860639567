//! Extension psserver pour le lecteur
//!
//! ```rust,no_run
//! use psplayer::PlayerExt;
//! use psserver::ServerBuilder;
//! use psyoutube::YoutubeExt;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new_configured().build();
//!     let youtube = server.init_youtube().await?;
//!     server
//!         .init_player(youtube.resolver.decorator().clone())
//!         .await?;
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

use crate::api_rest::{
    IntentApiDoc, PlayerApiDoc, PlayerState, create_intent_router, create_player_router,
};
use crate::config_ext::PlayerConfigExt;
use crate::headless::HeadlessFactory;
use crate::intent::PendingIntent;
use crate::registry::SessionRegistry;
use anyhow::Result;
use psserver::Server;
use psyoutube::RequestDecorator;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

/// Trait pour étendre psserver avec les sessions de lecture
pub trait PlayerExt {
    /// Initialise le lecteur sans sortie audio depuis la configuration
    ///
    /// `decorator` est partagé avec le résolveur : le cookie de session mis
    /// à jour par `/resolve` vaut aussi pour les sources du lecteur.
    ///
    /// # Routes enregistrées
    ///
    /// - `/api/player/...` et `/api/player/events`
    /// - `/api/intent` et `/api/intent/pending`
    /// - documentation sous `/swagger-ui/player` et `/swagger-ui/intent`
    async fn init_player(&mut self, decorator: RequestDecorator) -> Result<PlayerState>;

    /// Initialise le lecteur avec un registre déjà construit
    async fn init_player_with_registry(&mut self, registry: SessionRegistry) -> PlayerState;
}

impl PlayerExt for Server {
    async fn init_player(&mut self, decorator: RequestDecorator) -> Result<PlayerState> {
        info!("Initializing player API...");
        let config = psconfig::get_config();

        let factory = HeadlessFactory::new(reqwest::Client::new(), config.get_player_video_surfaces()?);
        let registry = SessionRegistry::new(Arc::new(factory), decorator)
            .with_progress_interval(config.get_player_progress_interval()?);

        Ok(self.init_player_with_registry(registry).await)
    }

    async fn init_player_with_registry(&mut self, registry: SessionRegistry) -> PlayerState {
        let state = PlayerState {
            registry: Arc::new(registry),
            intent: Arc::new(PendingIntent::new()),
        };

        self.add_openapi(create_player_router(state.clone()), PlayerApiDoc::openapi(), "player")
            .await;
        self.add_openapi(create_intent_router(state.clone()), IntentApiDoc::openapi(), "intent")
            .await;

        info!("Player API initialized: /api/player, /api/intent");
        state
    }
}
