//! Adaptive API client for backends with unknown, unstable contracts.
//!
//! Dowser talks to an HTTP service whose route paths, request-payload shape,
//! and response-field layout must be resolved empirically: it discovers
//! candidate endpoints via introspection or brute-force probing, classifies
//! each query into a service domain to pick the right specialized endpoint,
//! extracts answer text from heterogeneous JSON response shapes, and
//! remembers what worked so later calls skip discovery.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │  AdaptiveClient.ask(query)   │
//!                 └──────────────┬───────────────┘
//!                                │
//!              ┌─────────────────┼──────────────────┐
//!              ▼                 ▼                  ▼
//!       ┌────────────┐   ┌──────────────┐   ┌─────────────┐
//!       │ Classifier │   │ EndpointMem. │   │ Introspector│
//!       └────────────┘   └──────┬───────┘   └──────┬──────┘
//!                               │ miss             │ candidates
//!                               ▼                  ▼
//!                        ┌─────────────────────────────┐
//!                        │ ProbeEngine → Extractor     │
//!                        └─────────────────────────────┘
//! ```
//!
//! Control flow per call: memory hit first, introspection-derived candidates
//! on a miss, static fallback probing last — always returning a best-effort
//! [`Answer`] rather than failing.
//!
//! # Example
//!
//! ```rust,ignore
//! use dowser::{AdaptiveClient, AskStatus};
//!
//! let client = AdaptiveClient::builder()
//!     .base_url("http://127.0.0.1:8000")
//!     .build()?;
//!
//! let answer = client.ask("What movie did Christopher Nolan direct in 2010?").await;
//! if answer.status == AskStatus::Unavailable {
//!     eprintln!("backend still warming up");
//! }
//! ```

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod introspect;
pub mod memory;
pub mod probe;
pub mod types;

pub use client::{AdaptiveClient, AdaptiveClientBuilder};
pub use config::{default_fallback_routes, DowserConfig, FallbackRoute};
pub use domain::{default_profiles, DomainClassifier, DomainProfile, GENERAL_DOMAIN};
pub use error::{DowserError, Result};
pub use extract::{extract, resolve_path, Confidence, Extraction, FLAT_ANSWER_FIELDS};
pub use introspect::{candidates_from_description, Introspector, PROMPT_FIELD_NAMES};
pub use memory::{EndpointMemory, EndpointMemoryEntry, InMemoryEndpointMemory, SharedMemory};
pub use probe::{ProbeEngine, ProbeFailure, ProbeResult};
pub use types::{
    priority, Answer, AskStatus, Candidate, FieldRole, HttpMethod, PayloadField, PayloadTemplate,
    UNAVAILABLE_MESSAGE,
};
