//! # psyoutube - Résolution de flux et recherche YouTube
//!
//! Cette crate fournit :
//!
//! - [`RequestDecorator`] : en-têtes navigateur, cookie de session et jeton
//!   d'origine pour tout le trafic sortant vers YouTube
//! - [`Resolver`] : identifiant de vidéo → meilleur flux lisible (audio seul
//!   de plus haut débit, sinon flux multiplexé)
//! - [`SearchClient`] : proxy de recherche sur l'API YouTube Data v3
//! - l'API REST (`/search`, `/resolve`, `/audio`, `/audio/stream`) branchée
//!   sur `psserver` via [`YoutubeExt`]
//!
//! ## Exemple
//!
//! ```no_run
//! use psyoutube::{InnerTubeExtractor, RequestDecorator, Resolver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> psyoutube::Result<()> {
//!     let resolver = Resolver::new(
//!         Arc::new(InnerTubeExtractor::new()?),
//!         RequestDecorator::new(None),
//!     );
//!     let stream = resolver.resolve("dQw4w9WgXcQ").await?;
//!     println!("{} - {}", stream.title, stream.final_url);
//!     Ok(())
//! }
//! ```

pub mod api_rest;
pub mod config_ext;
pub mod decorator;
pub mod error;
pub mod models;
pub mod provider;
pub mod resolver;
pub mod search;
pub mod server_ext;

pub use config_ext::YoutubeConfigExt;
pub use decorator::{MOBILE_USER_AGENT, RequestDecorator, is_youtube_host};
pub use error::{Error, ErrorBody, Result};
pub use models::{ResolveResponse, ResolvedStream, SearchResult, StreamCandidate, StreamInfo, StreamKind};
pub use provider::{InnerTubeExtractor, StreamExtractor};
pub use resolver::{ResolveOptions, Resolver, append_token, select_best};
pub use search::SearchClient;
pub use server_ext::{YoutubeExt, YoutubeState};
