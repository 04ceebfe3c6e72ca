use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

/// OAuth client credentials. The exchange itself happens at the provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub site_url: String,
    pub autosave_debounce_ms: u64,
    pub icon_cache_secs: u64,
    pub resend_api_key: Option<String>,
    pub posthog_key: Option<String>,
    pub posthog_host: String,
    pub github: Option<OAuthClient>,
    pub google: Option<OAuthClient>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Only the database, Redis and JWT settings are required. Every third-party
    /// credential is optional and its absence just switches that feature off.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_expiration = optional("JWT_EXPIRATION")
            .and_then(|v| v.trim_end_matches('h').parse::<u64>().ok())
            .unwrap_or(24);

        let oauth = |id_key: &str, secret_key: &str| match (optional(id_key), optional(secret_key)) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            rate_limit_window_secs: optional("RATE_LIMIT_WINDOW")
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            rate_limit_requests: optional("RATE_LIMIT_REQUESTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: optional("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            site_url: optional("SITE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:3000".into()),
            autosave_debounce_ms: optional("AUTOSAVE_DEBOUNCE_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(800),
            icon_cache_secs: optional("ICON_CACHE_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            resend_api_key: optional("RESEND_API_KEY"),
            posthog_key: optional("POSTHOG_KEY"),
            posthog_host: optional("POSTHOG_HOST")
                .unwrap_or_else(|| "https://app.posthog.com".into()),
            github: oauth("GITHUB_ID", "GITHUB_SECRET"),
            google: oauth("GOOGLE_ID", "GOOGLE_SECRET"),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Names of the OAuth providers that have a full credential pair.
    pub fn oauth_providers(&self) -> Vec<&'static str> {
        let mut providers = Vec::new();
        if self.github.is_some() {
            providers.push("github");
        }
        if self.google.is_some() {
            providers.push("google");
        }
        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/superfolio"),
        ("REDIS_URL", "redis://127.0.0.1/"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_optional_keys_are_absent() {
        let config = Config::from_lookup(lookup_from(&BASE)).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.jwt_expiration_secs, 24 * 3600);
        assert_eq!(config.autosave_debounce(), Duration::from_millis(800));
        assert!(config.resend_api_key.is_none());
        assert!(config.oauth_providers().is_empty());
    }

    #[test]
    fn missing_required_key_is_reported() {
        let err = Config::from_lookup(lookup_from(&BASE[..2])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn half_configured_provider_is_not_advertised() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("GITHUB_ID", "id"),
            ("GITHUB_SECRET", "secret"),
            ("GOOGLE_ID", "id-only"),
            ("JWT_EXPIRATION", "2h"),
            ("SITE_URL", "https://superfolio.me/"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.oauth_providers(), vec!["github"]);
        assert_eq!(config.jwt_expiration_secs, 7200);
        assert_eq!(config.site_url, "https://superfolio.me");
    }
}
