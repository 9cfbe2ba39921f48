//! The adaptive client: memory-first endpoint resolution with discovery
//! fallback.
//!
//! Per call: classify the query into a domain, try the domain's remembered
//! endpoint, and only on a miss (or a stale entry) run a discovery round over
//! introspected and static fallback candidates. Every failure mode degrades;
//! the only fatal condition is invalid configuration at build time.
//!
//! ```rust,ignore
//! use dowser::AdaptiveClient;
//!
//! let client = AdaptiveClient::builder()
//!     .base_url("http://127.0.0.1:8000")
//!     .build()?;
//!
//! let answer = client.ask("What movie did Christopher Nolan direct in 2010?").await;
//! println!("[{:?}] {}", answer.status, answer.answer);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::DowserConfig;
use crate::domain::{DomainClassifier, DomainProfile};
use crate::error::{DowserError, Result};
use crate::extract::Extraction;
use crate::introspect::Introspector;
use crate::memory::{InMemoryEndpointMemory, SharedMemory};
use crate::probe::ProbeEngine;
use crate::types::{priority, Answer, AskStatus, Candidate, PayloadTemplate};

/// Adaptive API client for a backend with an unknown, unstable contract.
///
/// Cheap to clone; all state is shared behind an [`Arc`].
#[derive(Clone)]
pub struct AdaptiveClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: DowserConfig,
    classifier: DomainClassifier,
    probe: ProbeEngine,
    introspector: Introspector,
    memory: SharedMemory,
    /// One discovery lock per domain so concurrent misses on the same domain
    /// run a single probing round instead of a storm.
    discovery_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AdaptiveClient {
    /// Create a client builder.
    pub fn builder() -> AdaptiveClientBuilder {
        AdaptiveClientBuilder::new()
    }

    /// Create a client from a validated configuration with default memory.
    pub fn new(config: DowserConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// The endpoint memory in use.
    pub fn memory(&self) -> &SharedMemory {
        &self.inner.memory
    }

    /// The active configuration.
    pub fn config(&self) -> &DowserConfig {
        &self.inner.config
    }

    /// Answer a free-text query against the backend.
    ///
    /// Total: transport failures, malformed bodies, and exhausted discovery
    /// rounds all fold into the returned [`Answer`]'s status rather than an
    /// error. A remembered endpoint is tried first; discovery runs only on a
    /// memory miss or a stale entry.
    pub async fn ask(&self, query: &str) -> Answer {
        let profile = self.inner.classifier.classify(query).clone();
        let domain = profile.name.clone();
        tracing::debug!(domain = %domain, "classified query");

        if let Some(answer) = self.try_remembered(&domain, query).await {
            return answer;
        }

        let lock = self.discovery_lock(&domain);
        let _guard = lock.lock().await;

        // Another caller may have finished discovery while we waited.
        if let Some(answer) = self.try_remembered(&domain, query).await {
            return answer;
        }

        match self.discover(&profile, query).await {
            Ok((candidate, extraction)) => self.answer_from(&domain, candidate, extraction),
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "discovery round exhausted");
                Answer::unavailable(&domain)
            }
        }
    }

    /// Probe the domain's remembered endpoint, invalidating it on failure.
    async fn try_remembered(&self, domain: &str, query: &str) -> Option<Answer> {
        let entry = self.inner.memory.get(domain)?;
        tracing::debug!(
            domain = %domain,
            path = %entry.candidate.path,
            "trying remembered endpoint"
        );

        let result = self
            .inner
            .probe
            .try_candidate(&entry.candidate, query, entry.response_field_path.as_deref())
            .await;

        if result.failure.is_none() {
            if let Some(extraction) = result.extraction {
                return Some(self.answer_from(domain, result.candidate, extraction));
            }
        }

        tracing::info!(
            domain = %domain,
            path = %entry.candidate.path,
            "remembered endpoint no longer answers, re-discovering"
        );
        self.inner.memory.invalidate(domain);
        None
    }

    /// One pass through the merged candidate list, stopping at the first
    /// success. No candidate is retried within the round.
    async fn discover(
        &self,
        profile: &DomainProfile,
        query: &str,
    ) -> Result<(Candidate, Extraction)> {
        let candidates = self.gather_candidates(profile).await;
        let tried = candidates.len();
        tracing::debug!(
            domain = %profile.name,
            candidates = tried,
            "starting discovery round"
        );

        for candidate in candidates {
            let result = self.inner.probe.try_candidate(&candidate, query, None).await;
            if result.failure.is_none() {
                if let Some(extraction) = result.extraction {
                    tracing::info!(
                        domain = %profile.name,
                        path = %candidate.path,
                        "discovered working endpoint"
                    );
                    return Ok((candidate, extraction));
                }
            }
        }

        Err(DowserError::NoWorkingCandidate { tried })
    }

    /// Merge domain-default, introspected, and static fallback candidates
    /// into a deduplicated priority-ordered list.
    async fn gather_candidates(&self, profile: &DomainProfile) -> Vec<Candidate> {
        let config = &self.inner.config;
        let mut candidates = Vec::new();

        if let Some(path) = &profile.default_path {
            for base in &config.base_urls {
                candidates.push(
                    Candidate::new(base, path, PayloadTemplate::prompt("query"))
                        .with_priority(priority::DOMAIN_DEFAULT),
                );
            }
        }

        for base in &config.base_urls {
            match self.inner.introspector.introspect(base).await {
                Ok(found) => candidates.extend(found),
                Err(e) => {
                    tracing::debug!(
                        base_url = %base,
                        error = %e,
                        "no API description available, relying on fallback candidates"
                    );
                }
            }
        }

        for route in &config.fallback_candidates {
            for base in &config.base_urls {
                candidates.push(route.expand(base));
            }
        }

        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.signature()));
        candidates
    }

    /// Record the success in memory and shape the caller-facing answer.
    fn answer_from(&self, domain: &str, candidate: Candidate, extraction: Extraction) -> Answer {
        self.inner
            .memory
            .put(domain, candidate.clone(), extraction.field_path.clone());

        let status = if extraction.is_low_confidence() {
            AskStatus::Degraded
        } else {
            AskStatus::Success
        };

        Answer {
            answer: extraction.text,
            domain: domain.to_string(),
            status,
            used_candidate: Some(candidate),
        }
    }

    fn discovery_lock(&self, domain: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.discovery_locks.lock();
        Arc::clone(
            locks
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

/// Builder for [`AdaptiveClient`].
#[derive(Default)]
pub struct AdaptiveClientBuilder {
    config: DowserConfig,
    memory: Option<SharedMemory>,
    http: Option<reqwest::Client>,
}

impl AdaptiveClientBuilder {
    /// Create a builder with default configuration and no base URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: DowserConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a backend base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_urls.push(base_url.into());
        self
    }

    /// Add a domain profile on top of the configured set.
    pub fn domain(mut self, profile: DomainProfile) -> Self {
        self.config.domains.push(profile);
        self
    }

    /// Set the per-probe timeout.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Inject an endpoint memory (test double, per-tenant store, ...).
    pub fn memory(mut self, memory: SharedMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Use a pre-built HTTP client instead of the default.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client. Fails only on invalid static configuration.
    pub fn build(self) -> Result<AdaptiveClient> {
        self.config.validate()?;
        let classifier = DomainClassifier::new(self.config.domains.clone())?;

        let http = self.http.unwrap_or_default();
        let probe = ProbeEngine::new(http.clone(), self.config.probe_timeout());
        let introspector = Introspector::new(
            http,
            self.config.introspect_timeout(),
            self.config.description_paths.clone(),
        );
        let memory = self
            .memory
            .unwrap_or_else(|| Arc::new(InMemoryEndpointMemory::new()));

        Ok(AdaptiveClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                classifier,
                probe,
                introspector,
                memory,
                discovery_locks: Mutex::new(HashMap::new()),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::default_profiles;

    fn offline_config() -> DowserConfig {
        // No description paths: gathering runs without any network traffic.
        let mut config = DowserConfig::new("http://127.0.0.1:1");
        config.description_paths = Vec::new();
        config
    }

    #[test]
    fn test_build_requires_base_url() {
        let result = AdaptiveClient::builder().build();
        assert!(matches!(result, Err(DowserError::Config(_))));
    }

    #[test]
    fn test_build_requires_fallback_profile() {
        let mut config = DowserConfig::new("http://127.0.0.1:8000");
        config.domains = vec![DomainProfile::new("movie", ["movie"])];
        let result = AdaptiveClient::new(config);
        assert!(matches!(result, Err(DowserError::Config(_))));
    }

    #[test]
    fn test_build_with_defaults() {
        let client = AdaptiveClient::builder()
            .base_url("http://127.0.0.1:8000")
            .build()
            .unwrap();
        assert_eq!(client.config().base_urls, vec!["http://127.0.0.1:8000"]);
    }

    #[tokio::test]
    async fn test_gather_candidates_ordering() {
        let client = AdaptiveClient::builder()
            .config(offline_config())
            .build()
            .unwrap();

        let profiles = default_profiles();
        let movie = profiles.iter().find(|p| p.name == "movie").unwrap();
        let candidates = client.gather_candidates(movie).await;

        // Domain default first, then the static fallbacks in declared order.
        assert_eq!(candidates[0].path, "/movie/get_movie_info");
        assert_eq!(candidates[0].priority, priority::DOMAIN_DEFAULT);
        assert_eq!(candidates[1].path, "/v1/chat/completions");
        for pair in candidates.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
    }

    #[tokio::test]
    async fn test_gather_candidates_no_default_path_for_general() {
        let client = AdaptiveClient::builder()
            .config(offline_config())
            .build()
            .unwrap();

        let profiles = default_profiles();
        let general = profiles.iter().find(|p| p.name == "general").unwrap();
        let candidates = client.gather_candidates(general).await;

        assert_eq!(candidates[0].path, "/v1/chat/completions");
        assert!(candidates.iter().all(|c| c.priority <= priority::FALLBACK));
    }

    #[tokio::test]
    async fn test_gather_candidates_deduplicates() {
        let mut config = offline_config();
        // A second identical base URL would otherwise double every candidate.
        config.base_urls.push("http://127.0.0.1:1".to_string());

        let client = AdaptiveClient::builder().config(config).build().unwrap();
        let profiles = default_profiles();
        let general = profiles.iter().find(|p| p.name == "general").unwrap();
        let candidates = client.gather_candidates(general).await;

        let mut signatures: Vec<_> = candidates.iter().map(|c| c.signature()).collect();
        signatures.sort();
        signatures.dedup();
        assert_eq!(signatures.len(), candidates.len());
    }

    #[test]
    fn test_discovery_lock_is_per_domain() {
        let client = AdaptiveClient::builder()
            .config(offline_config())
            .build()
            .unwrap();

        let a1 = client.discovery_lock("movie");
        let a2 = client.discovery_lock("movie");
        let b = client.discovery_lock("music");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }
}
