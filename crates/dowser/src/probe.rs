//! Probe engine: issue a single bounded test request against a candidate
//! and judge the outcome.
//!
//! A candidate is tried at most once per discovery round; failed candidates
//! are never retried within the round. Retry across calls happens naturally
//! when the next `ask` re-enters discovery.

use std::time::Duration;

use serde_json::Value;

use crate::extract::{extract, Extraction};
use crate::types::{Candidate, HttpMethod};

/// Why a probe failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Transport-level failure (refused, DNS, timeout).
    Unreachable,
    /// The endpoint answered with a non-2xx status.
    Status(u16),
    /// 2xx status but the body was not parsable JSON.
    MalformedResponse,
    /// The body parsed but yielded no answer text.
    EmptyAnswer,
}

/// Outcome of probing one candidate. Immutable once produced.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// The candidate that was probed.
    pub candidate: Candidate,
    /// HTTP status, when the request got that far.
    pub http_status: Option<u16>,
    /// Parsed response body, when there was one.
    pub body: Option<Value>,
    /// Extracted answer on success.
    pub extraction: Option<Extraction>,
    /// Failure classification, `None` on success.
    pub failure: Option<ProbeFailure>,
}

impl ProbeResult {
    /// True when the candidate answered with extractable text.
    pub fn success(&self) -> bool {
        self.failure.is_none() && self.extraction.is_some()
    }

    fn ok(candidate: Candidate, status: u16, body: Value, extraction: Extraction) -> Self {
        Self {
            candidate,
            http_status: Some(status),
            body: Some(body),
            extraction: Some(extraction),
            failure: None,
        }
    }

    fn failed(
        candidate: Candidate,
        http_status: Option<u16>,
        body: Option<Value>,
        failure: ProbeFailure,
    ) -> Self {
        Self {
            candidate,
            http_status,
            body,
            extraction: None,
            failure: Some(failure),
        }
    }
}

/// Issues bounded test requests against candidates.
pub struct ProbeEngine {
    http: reqwest::Client,
    timeout: Duration,
}

impl ProbeEngine {
    /// Create a probe engine sharing the client-wide HTTP pool.
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Probe one candidate with the query text. The optional hint is a
    /// remembered response field path, resolved ahead of the generic
    /// extraction fallbacks.
    pub async fn try_candidate(
        &self,
        candidate: &Candidate,
        query: &str,
        hint: Option<&str>,
    ) -> ProbeResult {
        let url = candidate.url();

        let request = match candidate.method {
            HttpMethod::Get => self
                .http
                .get(&url)
                .query(&candidate.payload.query_params(query)),
            HttpMethod::Post => self.http.post(&url).json(&candidate.payload.render(query)),
        };

        let response = match request.timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "probe transport failure");
                return ProbeResult::failed(candidate.clone(), None, None, ProbeFailure::Unreachable);
            }
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            tracing::debug!(url = %url, status = status, "probe rejected");
            return ProbeResult::failed(
                candidate.clone(),
                Some(status),
                None,
                ProbeFailure::Status(status),
            );
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "probe body not parsable");
                return ProbeResult::failed(
                    candidate.clone(),
                    Some(status),
                    None,
                    ProbeFailure::MalformedResponse,
                );
            }
        };

        let extraction = extract(&body, hint);
        if extraction.text.trim().is_empty() {
            return ProbeResult::failed(
                candidate.clone(),
                Some(status),
                Some(body),
                ProbeFailure::EmptyAnswer,
            );
        }

        tracing::debug!(url = %url, status = status, "probe succeeded");
        ProbeResult::ok(candidate.clone(), status, body, extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Confidence;
    use crate::types::PayloadTemplate;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine() -> ProbeEngine {
        ProbeEngine::new(reqwest::Client::new(), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_successful_flat_probe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/movie/get_movie_info"))
            .and(body_json(json!({"query": "Inception?"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "Inception"})))
            .mount(&server)
            .await;

        let candidate = Candidate::new(
            server.uri(),
            "/movie/get_movie_info",
            PayloadTemplate::prompt("query"),
        );
        let result = engine().try_candidate(&candidate, "Inception?", None).await;

        assert!(result.success());
        assert_eq!(result.http_status, Some(200));
        let extraction = result.extraction.unwrap();
        assert_eq!(extraction.text, "Inception");
        assert_eq!(extraction.field_path.as_deref(), Some("result"));
    }

    #[tokio::test]
    async fn test_chat_template_body_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_json(json!({
                "model": "default",
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"choices": [{"message": {"content": "hello"}}]}),
            ))
            .mount(&server)
            .await;

        let candidate = Candidate::new(
            server.uri(),
            "/v1/chat/completions",
            PayloadTemplate::chat("default"),
        );
        let result = engine().try_candidate(&candidate, "hi", None).await;

        assert!(result.success());
        let extraction = result.extraction.unwrap();
        assert_eq!(extraction.text, "hello");
        assert_eq!(extraction.confidence, Confidence::Chat);
    }

    #[tokio::test]
    async fn test_get_candidate_sends_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "cats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "meow"})))
            .mount(&server)
            .await;

        let candidate = Candidate::new(server.uri(), "/search", PayloadTemplate::prompt("q"))
            .with_method(HttpMethod::Get);
        let result = engine().try_candidate(&candidate, "cats", None).await;

        assert!(result.success());
        assert_eq!(result.extraction.unwrap().text, "meow");
    }

    #[tokio::test]
    async fn test_non_2xx_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let candidate = Candidate::new(server.uri(), "/gone", PayloadTemplate::prompt("q"));
        let result = engine().try_candidate(&candidate, "hi", None).await;

        assert!(!result.success());
        assert_eq!(result.failure, Some(ProbeFailure::Status(404)));
        assert_eq!(result.http_status, Some(404));
    }

    #[tokio::test]
    async fn test_unparsable_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>loading</html>"))
            .mount(&server)
            .await;

        let candidate = Candidate::new(server.uri(), "/html", PayloadTemplate::prompt("q"));
        let result = engine().try_candidate(&candidate, "hi", None).await;

        assert_eq!(result.failure, Some(ProbeFailure::MalformedResponse));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let candidate = Candidate::new("http://127.0.0.1:1", "/chat", PayloadTemplate::prompt("q"));
        let result = engine().try_candidate(&candidate, "hi", None).await;

        assert_eq!(result.failure, Some(ProbeFailure::Unreachable));
        assert_eq!(result.http_status, None);
    }

    #[tokio::test]
    async fn test_null_body_is_empty_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/null"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&server)
            .await;

        let candidate = Candidate::new(server.uri(), "/null", PayloadTemplate::prompt("q"));
        let result = engine().try_candidate(&candidate, "hi", None).await;

        assert_eq!(result.failure, Some(ProbeFailure::EmptyAnswer));
        assert!(!result.success());
    }

    #[tokio::test]
    async fn test_hint_is_forwarded_to_extraction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nested"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"data": {"reply": "from the hint"}, "result": "from the scan"}),
            ))
            .mount(&server)
            .await;

        let candidate = Candidate::new(server.uri(), "/nested", PayloadTemplate::prompt("q"));
        let result = engine()
            .try_candidate(&candidate, "hi", Some("data.reply"))
            .await;

        let extraction = result.extraction.unwrap();
        assert_eq!(extraction.text, "from the hint");
        assert_eq!(extraction.confidence, Confidence::Hinted);
    }
}
