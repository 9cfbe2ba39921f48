//! Per-domain cache of the last known-good endpoint.
//!
//! Memory is an optimization, not a correctness-critical cache: entries are
//! advisory, last-write-wins, and invalidated only when a remembered
//! candidate fails a fresh probe. The store is injectable so tests and
//! multi-tenant embeddings can supply their own implementation instead of a
//! process-wide global.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::types::Candidate;

/// Last known-good endpoint for a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointMemoryEntry {
    /// Domain this entry belongs to.
    pub domain: String,
    /// The candidate that last answered successfully.
    pub candidate: Candidate,
    /// Dot/bracket path of the response field that held the answer, replayed
    /// as the extraction hint. `None` when the answer came from the
    /// whole-body fallback.
    pub response_field_path: Option<String>,
    /// When the candidate last passed a probe.
    pub last_verified_at: DateTime<Utc>,
}

/// Store of last known-good endpoints, one entry per domain.
///
/// Implementations must be safe under concurrent `ask` calls. Lost updates
/// are acceptable: the last successful probe wins.
pub trait EndpointMemory: Send + Sync {
    /// Look up the remembered endpoint for a domain.
    fn get(&self, domain: &str) -> Option<EndpointMemoryEntry>;

    /// Record a successful probe, overwriting any previous entry.
    fn put(&self, domain: &str, candidate: Candidate, response_field_path: Option<String>);

    /// Drop the entry for a domain after its candidate failed a probe.
    fn invalidate(&self, domain: &str);
}

/// Shared handle to an endpoint memory.
pub type SharedMemory = Arc<dyn EndpointMemory>;

/// Default in-memory store. Rebuilt by the first successful discovery per
/// domain each run; nothing persists across restarts.
#[derive(Debug, Default)]
pub struct InMemoryEndpointMemory {
    entries: RwLock<HashMap<String, EndpointMemoryEntry>>,
}

impl InMemoryEndpointMemory {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of domains with a remembered endpoint.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no domain has a remembered endpoint.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl EndpointMemory for InMemoryEndpointMemory {
    fn get(&self, domain: &str) -> Option<EndpointMemoryEntry> {
        self.entries.read().get(domain).cloned()
    }

    fn put(&self, domain: &str, candidate: Candidate, response_field_path: Option<String>) {
        let entry = EndpointMemoryEntry {
            domain: domain.to_string(),
            candidate,
            response_field_path,
            last_verified_at: Utc::now(),
        };
        self.entries.write().insert(domain.to_string(), entry);
    }

    fn invalidate(&self, domain: &str) {
        if self.entries.write().remove(domain).is_some() {
            tracing::debug!(domain = %domain, "invalidated remembered endpoint");
        }
    }
}
