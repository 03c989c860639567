//! Extension pour intégrer YouTube dans psconfig
//!
//! Ce module fournit le trait `YoutubeConfigExt` qui ajoute à
//! `psconfig::Config` la lecture des clés `youtube.*`.
//!
//! Les secrets (`api_key`, `po_token`, `cookies`) n'ont pas de valeur par
//! défaut et peuvent être stockés chiffrés (`encrypted:...`).
//!
//! # Exemple
//!
//! ```no_run
//! use psconfig::get_config;
//! use psyoutube::YoutubeConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! if config.get_youtube_api_key()?.is_none() {
//!     println!("La recherche est désactivée : youtube.api_key manquant");
//! }
//! # Ok(())
//! # }
//! ```

use crate::provider::{DEFAULT_CLIENT_NAME, DEFAULT_CLIENT_VERSION, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::search::MAX_SEARCH_RESULTS;
use anyhow::Result;
use psconfig::Config;
use serde_yaml::Value;

/// Trait d'extension pour la configuration YouTube
pub trait YoutubeConfigExt {
    /// Clé de l'API YouTube Data v3 (déchiffrée)
    fn get_youtube_api_key(&self) -> Result<Option<String>>;

    /// Enregistre la clé de l'API YouTube Data v3
    fn set_youtube_api_key(&self, key: String) -> Result<()>;

    /// Jeton d'attestation d'origine (`pot`) par défaut
    fn get_youtube_po_token(&self) -> Result<Option<String>>;

    /// Enregistre le jeton d'attestation d'origine
    fn set_youtube_po_token(&self, token: String) -> Result<()>;

    /// Cookie de session initial
    fn get_youtube_cookies(&self) -> Result<Option<String>>;

    /// Nombre maximum de résultats de recherche (1 à 10, défaut 10)
    fn get_youtube_search_max_results(&self) -> Result<u32>;

    /// Timeout des requêtes HTTP en secondes (défaut 30)
    fn get_youtube_request_timeout_secs(&self) -> Result<u64>;

    /// Résolution audio activée (sinon `/audio` répond 501)
    fn get_youtube_audio_enabled(&self) -> Result<bool>;

    fn set_youtube_audio_enabled(&self, enabled: bool) -> Result<()>;

    /// Identité client InnerTube `(clientName, clientVersion)`
    fn get_youtube_innertube_client(&self) -> Result<(String, String)>;
}

impl YoutubeConfigExt for Config {
    fn get_youtube_api_key(&self) -> Result<Option<String>> {
        self.get_secret(&["youtube", "api_key"])
    }

    fn set_youtube_api_key(&self, key: String) -> Result<()> {
        self.set_value(&["youtube", "api_key"], Value::String(key))
    }

    fn get_youtube_po_token(&self) -> Result<Option<String>> {
        self.get_secret(&["youtube", "po_token"])
    }

    fn set_youtube_po_token(&self, token: String) -> Result<()> {
        self.set_value(&["youtube", "po_token"], Value::String(token))
    }

    fn get_youtube_cookies(&self) -> Result<Option<String>> {
        self.get_secret(&["youtube", "cookies"])
    }

    fn get_youtube_search_max_results(&self) -> Result<u32> {
        let max = self.get_u64_or(
            &["youtube", "search_max_results"],
            MAX_SEARCH_RESULTS as u64,
        );
        Ok(max.clamp(1, MAX_SEARCH_RESULTS as u64) as u32)
    }

    fn get_youtube_request_timeout_secs(&self) -> Result<u64> {
        match self.get_u64_or(
            &["youtube", "request_timeout_secs"],
            DEFAULT_REQUEST_TIMEOUT_SECS,
        ) {
            0 => Ok(DEFAULT_REQUEST_TIMEOUT_SECS),
            secs => Ok(secs),
        }
    }

    fn get_youtube_audio_enabled(&self) -> Result<bool> {
        Ok(self.get_bool_or(&["youtube", "audio_enabled"], true))
    }

    fn set_youtube_audio_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(&["youtube", "audio_enabled"], Value::Bool(enabled))
    }

    fn get_youtube_innertube_client(&self) -> Result<(String, String)> {
        let name = self
            .get_string_opt(&["youtube", "innertube", "client_name"])
            .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string());
        let version = self
            .get_string_opt(&["youtube", "innertube", "client_version"])
            .unwrap_or_else(|| DEFAULT_CLIENT_VERSION.to_string());
        Ok((name, version))
    }
}
