//! Client configuration: base URLs, domain profiles, timeouts, and the
//! static fallback candidate list.
//!
//! Loadable from TOML, from environment variables, or built in code. Every
//! field has a sensible default except `base_urls` — a client with no base
//! URL is the one fatal misconfiguration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{default_profiles, DomainProfile};
use crate::error::{DowserError, Result};
use crate::types::{priority, Candidate, HttpMethod, PayloadTemplate};

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_INTROSPECT_TIMEOUT_MS: u64 = 5_000;

/// A fallback route shape, expanded into one [`Candidate`] per configured
/// base URL at discovery time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRoute {
    /// Route path.
    pub path: String,
    /// HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Payload shape.
    pub payload: PayloadTemplate,
    /// Try-order priority.
    #[serde(default)]
    pub priority: i32,
}

impl FallbackRoute {
    /// Pair this route shape with a concrete base URL.
    pub fn expand(&self, base_url: &str) -> Candidate {
        Candidate::new(base_url, &self.path, self.payload.clone())
            .with_method(self.method)
            .with_priority(self.priority)
    }
}

/// The static fallback candidate list: common path/payload combinations
/// covering chat-completion-style, plain-prompt-style, and query-style
/// shapes, in descending try-order.
pub fn default_fallback_routes() -> Vec<FallbackRoute> {
    let route = |path: &str, payload: PayloadTemplate, priority: i32| FallbackRoute {
        path: path.to_string(),
        method: HttpMethod::Post,
        payload,
        priority,
    };

    vec![
        route(
            "/v1/chat/completions",
            PayloadTemplate::chat("default"),
            priority::FALLBACK,
        ),
        route(
            "/api/generate",
            PayloadTemplate::prompt("prompt"),
            priority::FALLBACK - 1,
        ),
        route(
            "/generate",
            PayloadTemplate::prompt("prompt"),
            priority::FALLBACK - 2,
        ),
        route(
            "/api/chat",
            PayloadTemplate::prompt("message"),
            priority::FALLBACK - 3,
        ),
        route(
            "/chat",
            PayloadTemplate::prompt("message"),
            priority::FALLBACK - 4,
        ),
        route(
            "/api/query",
            PayloadTemplate::prompt("query"),
            priority::FALLBACK - 5,
        ),
        route(
            "/ask",
            PayloadTemplate::prompt("question"),
            priority::FALLBACK - 6,
        ),
    ]
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

fn default_introspect_timeout_ms() -> u64 {
    DEFAULT_INTROSPECT_TIMEOUT_MS
}

fn default_description_paths() -> Vec<String> {
    vec!["/openapi.json".to_string()]
}

/// Configuration for the adaptive client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DowserConfig {
    /// Backend base URLs, in preference order.
    #[serde(default)]
    pub base_urls: Vec<String>,

    /// Domain profiles. Must include a fallback profile (empty keyword set).
    #[serde(default = "default_profiles")]
    pub domains: Vec<DomainProfile>,

    /// Per-probe timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Timeout for fetching the API description, in milliseconds.
    #[serde(default = "default_introspect_timeout_ms")]
    pub introspect_timeout_ms: u64,

    /// Paths tried when fetching the API description.
    #[serde(default = "default_description_paths")]
    pub description_paths: Vec<String>,

    /// Static fallback routes, expanded across every base URL.
    #[serde(default = "default_fallback_routes")]
    pub fallback_candidates: Vec<FallbackRoute>,
}

impl Default for DowserConfig {
    fn default() -> Self {
        Self {
            base_urls: Vec::new(),
            domains: default_profiles(),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            introspect_timeout_ms: DEFAULT_INTROSPECT_TIMEOUT_MS,
            description_paths: default_description_paths(),
            fallback_candidates: default_fallback_routes(),
        }
    }
}

impl DowserConfig {
    /// Config with a single base URL and all defaults.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_urls: vec![base_url.into()],
            ..Self::default()
        }
    }

    /// Config pointing at a local backend on the conventional port.
    pub fn localhost() -> Self {
        Self::new("http://127.0.0.1:8000")
    }

    /// Add a base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_urls.push(base_url.into());
        self
    }

    /// Add a domain profile.
    pub fn with_domain(mut self, profile: DomainProfile) -> Self {
        self.domains.push(profile);
        self
    }

    /// Set the per-probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Parse a TOML configuration string.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Build configuration from environment variables.
    ///
    /// Reads `DOWSER_BASE_URL` (comma-separated base URLs) and
    /// `DOWSER_PROBE_TIMEOUT_MS`; everything else keeps its default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(urls) = std::env::var("DOWSER_BASE_URL") {
            config.base_urls = urls
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(raw) = std::env::var("DOWSER_PROBE_TIMEOUT_MS") {
            if let Ok(ms) = raw.parse() {
                config.probe_timeout_ms = ms;
            }
        }

        config
    }

    /// Per-probe timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// API-description fetch timeout.
    pub fn introspect_timeout(&self) -> Duration {
        Duration::from_millis(self.introspect_timeout_ms)
    }

    /// Validate the static configuration. This is the only place a dowser
    /// failure is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.base_urls.is_empty() {
            return Err(DowserError::Config(
                "at least one base URL is required".to_string(),
            ));
        }
        for raw in &self.base_urls {
            Url::parse(raw)?;
        }
        if self.probe_timeout_ms == 0 {
            return Err(DowserError::Config(
                "probe_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GENERAL_DOMAIN;

    #[test]
    fn test_defaults() {
        let config = DowserConfig::default();
        assert!(config.base_urls.is_empty());
        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
        assert_eq!(config.introspect_timeout(), Duration::from_secs(5));
        assert_eq!(config.description_paths, vec!["/openapi.json"]);
        assert!(config.domains.iter().any(|d| d.name == GENERAL_DOMAIN));
        assert!(!config.fallback_candidates.is_empty());
    }

    #[test]
    fn test_validate_requires_base_url() {
        let err = DowserConfig::default().validate().unwrap_err();
        assert!(matches!(err, DowserError::Config(_)));

        assert!(DowserConfig::localhost().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = DowserConfig::new("not a url");
        assert!(matches!(
            config.validate(),
            Err(DowserError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = DowserConfig::localhost().with_probe_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(DowserError::Config(_))));
    }

    #[test]
    fn test_from_toml_str() {
        let config = DowserConfig::from_toml_str(
            r#"
            base_urls = ["http://127.0.0.1:8000", "http://127.0.0.1:8001"]
            probe_timeout_ms = 2500

            [[domains]]
            name = "movie"
            keywords = ["movie", "film"]
            default_path = "/movie/get_movie_info"

            [[domains]]
            name = "general"
            keywords = []
            "#,
        )
        .unwrap();

        assert_eq!(config.base_urls.len(), 2);
        assert_eq!(config.probe_timeout(), Duration::from_millis(2500));
        assert_eq!(config.domains.len(), 2);
        assert_eq!(config.domains[0].name, "movie");
        // Unspecified sections keep their defaults.
        assert_eq!(config.description_paths, vec!["/openapi.json"]);
        assert!(!config.fallback_candidates.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str_with_fallback_routes() {
        let config = DowserConfig::from_toml_str(
            r#"
            base_urls = ["http://127.0.0.1:8000"]

            [[fallback_candidates]]
            path = "/custom/generate"
            priority = 5
            payload = { fields = [{ name = "prompt", role = "prompt" }] }
            "#,
        )
        .unwrap();

        assert_eq!(config.fallback_candidates.len(), 1);
        let candidate = config.fallback_candidates[0].expand("http://127.0.0.1:8000");
        assert_eq!(candidate.url(), "http://127.0.0.1:8000/custom/generate");
        assert_eq!(candidate.method, HttpMethod::Post);
        assert_eq!(candidate.priority, 5);
    }

    #[test]
    fn test_rejects_invalid_toml() {
        assert!(matches!(
            DowserConfig::from_toml_str("base_urls = 12"),
            Err(DowserError::Toml(_))
        ));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var(
            "DOWSER_BASE_URL",
            "http://127.0.0.1:8000, http://127.0.0.1:9000",
        );
        std::env::set_var("DOWSER_PROBE_TIMEOUT_MS", "750");

        let config = DowserConfig::from_env();

        std::env::remove_var("DOWSER_BASE_URL");
        std::env::remove_var("DOWSER_PROBE_TIMEOUT_MS");

        assert_eq!(
            config.base_urls,
            vec!["http://127.0.0.1:8000", "http://127.0.0.1:9000"]
        );
        assert_eq!(config.probe_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn test_default_fallback_routes_cover_known_shapes() {
        let routes = default_fallback_routes();
        let paths: Vec<_> = routes.iter().map(|r| r.path.as_str()).collect();

        assert!(paths.contains(&"/v1/chat/completions"));
        assert!(paths.contains(&"/api/generate"));
        assert!(paths.contains(&"/api/query"));

        // Descending try-order, chat-completion shape first.
        for pair in routes.windows(2) {
            assert!(pair[0].priority > pair[1].priority);
        }
    }
}
