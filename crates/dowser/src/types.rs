//! Core data types: candidates, payload templates, and answers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Try-order priorities. Higher values are probed first within a round.
pub mod priority {
    /// A domain profile's configured default path.
    pub const DOMAIN_DEFAULT: i32 = 90;
    /// Introspected route declaring a prompt-like request field.
    pub const INTROSPECTED_PROMPT: i32 = 80;
    /// Introspected route with declared fields, none of them prompt-like.
    pub const INTROSPECTED_OTHER: i32 = 40;
    /// Introspected route with no declared request fields.
    pub const INTROSPECTED_BLIND: i32 = 30;
    /// Head of the static fallback route list.
    pub const FALLBACK: i32 = 10;
}

// ─────────────────────────────────────────────────────────────────────────────
// Payload Templates
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method used to probe a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Query text is passed as a query-string parameter.
    Get,
    /// Query text is substituted into a JSON body.
    #[default]
    Post,
}

impl HttpMethod {
    /// The method name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Role a field plays when the request payload is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Receives the query text verbatim.
    Prompt,
    /// Sent as-is with every request.
    Static(Value),
    /// Chat-completion style message list; the query text becomes the
    /// content of the trailing user message.
    ChatMessages,
}

/// A named payload field with its role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadField {
    /// Field name in the JSON body (or query string for GET).
    pub name: String,
    /// What goes into the field.
    pub role: FieldRole,
}

/// Ordered payload shape for a candidate request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadTemplate {
    /// Fields in declaration order.
    pub fields: Vec<PayloadField>,
}

impl PayloadTemplate {
    /// A flat template with a single prompt field: `{field: <query>}`.
    pub fn prompt(field: impl Into<String>) -> Self {
        Self {
            fields: vec![PayloadField {
                name: field.into(),
                role: FieldRole::Prompt,
            }],
        }
    }

    /// A chat-completion style template:
    /// `{model: <model>, messages: [{role: "user", content: <query>}]}`.
    pub fn chat(model: impl Into<String>) -> Self {
        Self {
            fields: vec![
                PayloadField {
                    name: "model".to_string(),
                    role: FieldRole::Static(Value::String(model.into())),
                },
                PayloadField {
                    name: "messages".to_string(),
                    role: FieldRole::ChatMessages,
                },
            ],
        }
    }

    /// Append a static field sent with every request.
    pub fn with_static(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.push(PayloadField {
            name: name.into(),
            role: FieldRole::Static(value),
        });
        self
    }

    /// Build the JSON request body, substituting the query text into the
    /// prompt slot (or the trailing user message for chat templates).
    pub fn render(&self, query: &str) -> Value {
        let mut map = serde_json::Map::new();
        for field in &self.fields {
            let value = match &field.role {
                FieldRole::Prompt => Value::String(query.to_string()),
                FieldRole::Static(v) => v.clone(),
                FieldRole::ChatMessages => serde_json::json!([
                    {"role": "user", "content": query}
                ]),
            };
            map.insert(field.name.clone(), value);
        }
        Value::Object(map)
    }

    /// Build query-string parameters for GET candidates. Chat-style fields
    /// have no query-string rendering and are skipped.
    pub fn query_params(&self, query: &str) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter_map(|field| match &field.role {
                FieldRole::Prompt => Some((field.name.clone(), query.to_string())),
                FieldRole::Static(v) => {
                    let rendered = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    Some((field.name.clone(), rendered))
                }
                FieldRole::ChatMessages => None,
            })
            .collect()
    }

    /// Names of the fields this template sends.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Candidates
// ─────────────────────────────────────────────────────────────────────────────

/// A hypothesized (route, payload-shape) pairing to probe against the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Base URL of the backend, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Route path, e.g. `/movie/get_movie_info`.
    pub path: String,
    /// HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Payload shape.
    pub payload: PayloadTemplate,
    /// Deterministic try-order; higher is probed first.
    #[serde(default)]
    pub priority: i32,
}

impl Candidate {
    /// Create a POST candidate with priority 0.
    pub fn new(
        base_url: impl Into<String>,
        path: impl Into<String>,
        payload: PayloadTemplate,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            method: HttpMethod::Post,
            payload,
            priority: 0,
        }
    }

    /// Set the try-order priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Full request URL.
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    /// Deduplication key: two candidates with the same method, URL, and
    /// payload field set would issue indistinguishable probes.
    pub fn signature(&self) -> String {
        format!(
            "{} {} [{}]",
            self.method.as_str(),
            self.url(),
            self.payload.field_names().join(",")
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Answers
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-facing message when every candidate in a round failed.
pub const UNAVAILABLE_MESSAGE: &str =
    "The backend did not answer on any known endpoint. It may still be starting up; \
     please try again shortly.";

/// Outcome classification of an [`Answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AskStatus {
    /// The answer came from a recognized response field.
    Success,
    /// The answer is a low-confidence fallback (whole-body serialization).
    Degraded,
    /// No candidate produced an answer this round.
    Unavailable,
}

/// Result of a single `ask` call.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Best-effort answer text. For `Unavailable` this is a caller-facing
    /// notice that the backend may still be initializing.
    pub answer: String,
    /// Domain the query was classified into.
    pub domain: String,
    /// Outcome classification.
    pub status: AskStatus,
    /// The candidate that produced the answer, when one did.
    pub used_candidate: Option<Candidate>,
}

impl Answer {
    /// Build the unavailable answer for a domain.
    pub fn unavailable(domain: impl Into<String>) -> Self {
        Self {
            answer: UNAVAILABLE_MESSAGE.to_string(),
            domain: domain.into(),
            status: AskStatus::Unavailable,
            used_candidate: None,
        }
    }

    /// Returns true unless the round was exhausted.
    pub fn is_answered(&self) -> bool {
        self.status != AskStatus::Unavailable
    }
}
