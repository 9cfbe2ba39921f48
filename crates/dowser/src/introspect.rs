//! Schema introspection: derive probe candidates from a machine-readable
//! API description instead of blind brute force.
//!
//! The backend may publish an OpenAPI-style document (`/openapi.json` by
//! default). When it does, every POST-capable route becomes a candidate, with
//! routes that declare a prompt-like request field ranked above the rest.
//! When it doesn't, introspection fails with `Unreachable` and the
//! orchestrator degrades to the static fallback list; absence is never an
//! error for the caller.

use std::time::Duration;

use serde_json::Value;

use crate::error::{DowserError, Result};
use crate::types::{priority, Candidate, PayloadTemplate};

/// Request-field names recognized as carrying the query text.
pub const PROMPT_FIELD_NAMES: [&str; 6] =
    ["prompt", "query", "message", "text", "input", "question"];

/// Fetches and parses the backend's API description.
pub struct Introspector {
    http: reqwest::Client,
    timeout: Duration,
    description_paths: Vec<String>,
}

impl Introspector {
    /// Create an introspector sharing the client-wide HTTP pool.
    pub fn new(http: reqwest::Client, timeout: Duration, description_paths: Vec<String>) -> Self {
        Self {
            http,
            timeout,
            description_paths,
        }
    }

    /// Fetch the API description from a base URL and derive ranked
    /// candidates. Fails with [`DowserError::Unreachable`] when no
    /// description endpoint answers within the bounded timeout.
    pub async fn introspect(&self, base_url: &str) -> Result<Vec<Candidate>> {
        let base = base_url.trim_end_matches('/');
        let mut last_error =
            DowserError::Unreachable(format!("{base}: no description path configured"));

        for path in &self.description_paths {
            let url = format!("{}/{}", base, path.trim_start_matches('/'));
            match self.fetch_description(&url).await {
                Ok(doc) => {
                    let candidates = candidates_from_description(base_url, &doc);
                    tracing::debug!(
                        url = %url,
                        candidates = candidates.len(),
                        "parsed API description"
                    );
                    return Ok(candidates);
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "description endpoint not usable");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn fetch_description(&self, url: &str) -> Result<Value> {
        let response = self.http.get(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DowserError::Unreachable(format!("{url}: HTTP {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| DowserError::MalformedResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Derive ranked candidates from a parsed OpenAPI-style description.
///
/// Pure over the document: one candidate per declared request field (the
/// field becomes the prompt slot), prompt-like fields ranked above
/// unrecognized ones, field-less routes probed with a `prompt` guess at the
/// lowest introspected priority.
pub fn candidates_from_description(base_url: &str, doc: &Value) -> Vec<Candidate> {
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for (route, item) in paths {
        let Some(post) = item.get("post") else {
            continue;
        };
        let fields = declared_request_fields(doc, post);

        let prompt_like: Vec<&String> = fields
            .iter()
            .filter(|f| PROMPT_FIELD_NAMES.contains(&f.as_str()))
            .collect();

        if !prompt_like.is_empty() {
            for field in prompt_like {
                candidates.push(
                    Candidate::new(base_url, route.as_str(), PayloadTemplate::prompt(field.as_str()))
                        .with_priority(priority::INTROSPECTED_PROMPT),
                );
            }
        } else if !fields.is_empty() {
            for field in &fields {
                candidates.push(
                    Candidate::new(base_url, route.as_str(), PayloadTemplate::prompt(field.as_str()))
                        .with_priority(priority::INTROSPECTED_OTHER),
                );
            }
        } else {
            candidates.push(
                Candidate::new(base_url, route.as_str(), PayloadTemplate::prompt("prompt"))
                    .with_priority(priority::INTROSPECTED_BLIND),
            );
        }
    }

    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
    candidates
}

/// Field names declared in a route's JSON request body, following a single
/// `$ref` into `components` when the schema is not inline.
fn declared_request_fields(doc: &Value, post: &Value) -> Vec<String> {
    let Some(schema) = post.pointer("/requestBody/content/application~1json/schema") else {
        return Vec::new();
    };

    let schema = match schema.get("$ref").and_then(Value::as_str) {
        Some(reference) => resolve_ref(doc, reference).unwrap_or(schema),
        None => schema,
    };

    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| properties.keys().cloned().collect())
        .unwrap_or_default()
}

/// Resolve a local `#/...` JSON reference within the description document.
fn resolve_ref<'a>(doc: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    doc.pointer(pointer)
}
