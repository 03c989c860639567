//! # psplayer - Sessions de lecture PowerSmart
//!
//! Registre de sessions identifiées par une chaîne, chacune pilotant un
//! lecteur natif au travers d'une machine à états :
//!
//! ```text
//! initialize ─▶ Initializing ─▶ Ready ─play─▶ Playing ⇄ Paused
//!                  setSource ─▶ Buffering ─▶ Ready
//! ```
//!
//! Les transitions, la progression et les erreurs du lecteur sont publiées
//! sur un flux d'événements à abonné unique ([`EventHub`]).
//!
//! Le lecteur natif est abstrait par [`NativePlayer`] et [`PlayerFactory`] ;
//! [`HeadlessPlayer`] fournit une implémentation sans sortie audio.

pub mod api_rest;
pub mod backend;
pub mod config_ext;
pub mod error;
pub mod events;
pub mod headless;
pub mod intent;
pub mod registry;
pub mod server_ext;
pub mod session;
pub mod state;

pub use api_rest::PlayerState;
pub use backend::{
    NativePlayer, PlayerFactory, PlayerSignal, RenderTarget, SessionResources, SignalSender,
};
pub use config_ext::PlayerConfigExt;
pub use error::{ErrorResponse, PlayerError, Result};
pub use events::{EventHub, EventPayload, EventSubscription, PlayerEvent};
pub use headless::{HeadlessFactory, HeadlessPlayer};
pub use intent::PendingIntent;
pub use registry::{DEFAULT_PROGRESS_INTERVAL, SessionRegistry};
pub use server_ext::PlayerExt;
pub use session::{EngineConfig, EngineSettings, SessionSnapshot};
pub use state::PlaybackState;
