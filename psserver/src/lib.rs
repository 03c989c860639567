//! # psserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit le serveur HTTP du backend PowerSmart. Les crates
//! métier (`psyoutube`, `psplayer`) s'y branchent via des traits d'extension
//! implémentés sur [`Server`], sans que `psserver` ne dépende d'elles.
//!
//! ## Fonctionnalités
//!
//! - **Routes JSON simples** : `add_route()`
//! - **Handlers avec état** : `add_handler_with_state()`, `add_router()`
//! - **Documentation OpenAPI** : Swagger UI par API avec `add_openapi()`
//! - **Logs SSE** : suivi temps réel des logs (`/log-sse`, `/log-dump`)
//! - **CORS permissif** : l'application Flutter Web appelle le serveur directement
//! - **Arrêt gracieux** : sur Ctrl+C
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use psserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = ServerBuilder::new("MyServer", "localhost", 8080).build();
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await;
//!     server.wait().await;
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
