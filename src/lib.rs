//! meetbridge: per-transaction Zoom meeting provisioning and message translation.
//!
//! The library holds everything the binary serves; `tests/` drives it through
//! [`api::app`].

use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod meetings;
pub mod middleware;
pub mod translate;
pub mod zoom;

use config::Config;
use errors::ConfigError;
use meetings::{MeetingRegistry, MeetingService};
use translate::TranslationClient;
use zoom::{TokenCache, ZoomClient};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state passed to handlers.
pub struct AppState {
    pub config: Config,
    pub meetings: MeetingService,
    pub translator: TranslationClient,
}

impl AppState {
    pub fn new(config: Config, meetings: MeetingService, translator: TranslationClient) -> Self {
        Self {
            config,
            meetings,
            translator,
        }
    }

    /// Wire the Zoom token cache, Zoom client, meeting registry and translator.
    ///
    /// Fails with [`ConfigError::Missing`] when a Zoom credential is absent;
    /// nothing touches the network here.
    pub fn from_config(config: Config, http: reqwest::Client) -> Result<Self, ConfigError> {
        let tokens = Arc::new(TokenCache::from_config(http.clone(), &config)?);
        let provider = Arc::new(ZoomClient::new(
            http.clone(),
            config.zoom_api_url.clone(),
            tokens,
        ));
        let meetings = MeetingService::new(Arc::new(MeetingRegistry::new()), provider);
        let translator = TranslationClient::from_config(http, &config);

        Ok(Self::new(config, meetings, translator))
    }
}

/// Outbound HTTP client shared by every upstream call.
pub fn http_client(cfg: &Config) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(cfg.upstream_timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(cfg.upstream_timeout))
        .build()
}
