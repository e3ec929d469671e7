use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_PORT: u16 = 3500;
pub const DEFAULT_API_URL: &str = "http://localhost:3500";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Origin of the marketplace web app, allowed by CORS.
    pub marketplace_origin: String,
    pub zoom_account_id: Option<String>,
    pub zoom_client_id: Option<String>,
    pub zoom_client_secret: Option<String>,
    pub zoom_oauth_url: String,
    pub zoom_api_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub translation_model: String,
    pub translation_max_tokens: u32,
    /// Applied to every outbound request.
    pub upstream_timeout: Duration,
    pub token_safety_margin: Duration,
    /// Base URL the CLI uses to reach a running server.
    pub api_base_url: String,
}

/// Client-credentials triple for the Zoom server-to-server app.
/// Only constructible with all three values present and non-blank.
#[derive(Clone)]
pub struct ZoomCredentials {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl ZoomCredentials {
    pub fn new(
        account_id: Option<&str>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> Result<Self, ConfigError> {
        fn required(value: Option<&str>, name: &'static str) -> Result<String, ConfigError> {
            match value.map(str::trim) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(ConfigError::Missing(name)),
            }
        }

        Ok(Self {
            account_id: required(account_id, "ZOOM_ACCOUNT_ID")?,
            client_id: required(client_id, "ZOOM_CLIENT_ID")?,
            client_secret: required(client_secret, "ZOOM_CLIENT_SECRET")?,
        })
    }
}

impl std::fmt::Debug for ZoomCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoomCredentials")
            .field("account_id", &self.account_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Config {
    pub fn zoom_credentials(&self) -> Result<ZoomCredentials, ConfigError> {
        ZoomCredentials::new(
            self.zoom_account_id.as_deref(),
            self.zoom_client_id.as_deref(),
            self.zoom_client_secret.as_deref(),
        )
    }
}

/// Load configuration from `.env` and the process environment.
pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    load_from(|name| std::env::var(name).ok())
}

/// Build the configuration from an arbitrary variable lookup.
pub fn load_from<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    Ok(Config {
        port: parse_or(&var, "PORT", DEFAULT_PORT)?,
        marketplace_origin: var("REACT_APP_MARKETPLACE_ROOT_URL")
            .unwrap_or_else(|| "http://localhost:3000".into()),
        zoom_account_id: var("ZOOM_ACCOUNT_ID"),
        zoom_client_id: var("ZOOM_CLIENT_ID"),
        zoom_client_secret: var("ZOOM_CLIENT_SECRET"),
        zoom_oauth_url: url_or(&var, "ZOOM_OAUTH_URL", "https://zoom.us/oauth/token")?,
        zoom_api_url: url_or(&var, "ZOOM_API_URL", "https://api.zoom.us/v2")?,
        openai_api_key: var("OPENAI_API_KEY"),
        openai_base_url: url_or(&var, "OPENAI_BASE_URL", "https://api.openai.com/v1")?,
        translation_model: var("MEETBRIDGE_TRANSLATION_MODEL")
            .unwrap_or_else(|| "gpt-3.5-turbo".into()),
        translation_max_tokens: parse_or(&var, "MEETBRIDGE_TRANSLATION_MAX_TOKENS", 1000)?,
        upstream_timeout: Duration::from_secs(parse_or(
            &var,
            "MEETBRIDGE_UPSTREAM_TIMEOUT_SECS",
            30,
        )?),
        token_safety_margin: Duration::from_secs(parse_or(
            &var,
            "MEETBRIDGE_TOKEN_SAFETY_MARGIN_SECS",
            300,
        )?),
        api_base_url: url_or(&var, "MEETBRIDGE_API_URL", DEFAULT_API_URL)?,
    })
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Validated URL with any trailing slash removed so paths can be appended.
fn url_or<F>(var: &F, name: &'static str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = var(name).unwrap_or_else(|| default.to_string());
    let parsed = url::Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = load_from(env(&[])).unwrap();
        assert_eq!(cfg.port, 3500);
        assert_eq!(cfg.marketplace_origin, "http://localhost:3000");
        assert_eq!(cfg.zoom_oauth_url, "https://zoom.us/oauth/token");
        assert_eq!(cfg.zoom_api_url, "https://api.zoom.us/v2");
        assert_eq!(cfg.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.translation_model, "gpt-3.5-turbo");
        assert_eq!(cfg.translation_max_tokens, 1000);
        assert_eq!(cfg.upstream_timeout, Duration::from_secs(30));
        assert_eq!(cfg.token_safety_margin, Duration::from_secs(300));
        assert_eq!(cfg.api_base_url, "http://localhost:3500");
        assert!(cfg.openai_api_key.is_none());
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let cfg = load_from(env(&[
            ("PORT", "8080"),
            ("ZOOM_API_URL", "http://127.0.0.1:9000/v2/"),
            ("MEETBRIDGE_UPSTREAM_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.zoom_api_url, "http://127.0.0.1:9000/v2");
        assert_eq!(cfg.upstream_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = load_from(env(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = load_from(env(&[("ZOOM_OAUTH_URL", "ftp://zoom.us/token")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ZOOM_OAUTH_URL", .. }));
    }

    #[test]
    fn test_zoom_credentials_all_present() {
        let cfg = load_from(env(&[
            ("ZOOM_ACCOUNT_ID", "acct"),
            ("ZOOM_CLIENT_ID", "client"),
            ("ZOOM_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();
        let creds = cfg.zoom_credentials().unwrap();
        assert_eq!(creds.account_id, "acct");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("\"secret\""));
    }

    #[test]
    fn test_each_missing_credential_is_named() {
        let cases = [
            (None, Some("c"), Some("s"), "ZOOM_ACCOUNT_ID"),
            (Some("a"), None, Some("s"), "ZOOM_CLIENT_ID"),
            (Some("a"), Some("c"), Some("  "), "ZOOM_CLIENT_SECRET"),
        ];
        for (account, client, secret, expected) in cases {
            match ZoomCredentials::new(account, client, secret) {
                Err(ConfigError::Missing(name)) => assert_eq!(name, expected),
                other => panic!("expected missing {}, got {:?}", expected, other),
            }
        }
    }
}
