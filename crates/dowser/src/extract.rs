//! Answer extraction from heterogeneous JSON response shapes.
//!
//! The backend's response layout is not controlled by this client and may
//! shift between deployments, so extraction is a layered fallback rather than
//! a schema: a hinted field path from endpoint memory, then a fixed priority
//! list of flat answer fields, then the chat-completion shape, and finally a
//! whole-body serialization. Extraction never fails; ambiguity is reported
//! through [`Confidence`] and handled by the caller.

use serde_json::Value;

/// Flat answer fields, scanned in priority order.
pub const FLAT_ANSWER_FIELDS: [&str; 7] = [
    "response",
    "text",
    "answer",
    "generated_text",
    "content",
    "output",
    "result",
];

/// Which fallback layer produced the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// A hinted field path from endpoint memory resolved.
    Hinted,
    /// A known flat answer field matched.
    Flat,
    /// The chat-completion shape (`choices[0]...`) matched.
    Chat,
    /// Nothing recognizable; the whole body was serialized.
    WholeBody,
}

/// Extracted answer text plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The answer text. Always present, possibly empty.
    pub text: String,
    /// Dot/bracket path of the field that produced the text, when one did.
    /// Stored in endpoint memory and replayed as the hint on later calls.
    pub field_path: Option<String>,
    /// Which layer matched.
    pub confidence: Confidence,
}

impl Extraction {
    /// Whole-body serializations are low confidence and surface as a
    /// degraded answer upstream.
    pub fn is_low_confidence(&self) -> bool {
        self.confidence == Confidence::WholeBody
    }
}

/// Extract answer text from an arbitrary JSON body.
///
/// Resolution order: hinted path, flat answer fields, chat-completion shape,
/// whole-body serialization. Total over all JSON values.
pub fn extract(body: &Value, hint: Option<&str>) -> Extraction {
    if let Some(path) = hint {
        if let Some(text) = resolve_path(body, path).and_then(value_to_text) {
            if !text.is_empty() {
                return Extraction {
                    text,
                    field_path: Some(path.to_string()),
                    confidence: Confidence::Hinted,
                };
            }
        }
    }

    if let Some(object) = body.as_object() {
        for field in FLAT_ANSWER_FIELDS {
            if let Some(text) = object.get(field).and_then(value_to_text) {
                if !text.is_empty() {
                    return Extraction {
                        text,
                        field_path: Some(field.to_string()),
                        confidence: Confidence::Flat,
                    };
                }
            }
        }

        let has_choices = object
            .get("choices")
            .and_then(Value::as_array)
            .is_some_and(|choices| !choices.is_empty());
        if has_choices {
            for path in ["choices[0].text", "choices[0].message.content"] {
                if let Some(text) = resolve_path(body, path).and_then(value_to_text) {
                    if !text.is_empty() {
                        return Extraction {
                            text,
                            field_path: Some(path.to_string()),
                            confidence: Confidence::Chat,
                        };
                    }
                }
            }
        }
    }

    let text = match body {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Extraction {
        text,
        field_path: None,
        confidence: Confidence::WholeBody,
    }
}

/// Resolve a dot/bracket field path like `choices[0].message.content`.
///
/// Each dot-separated segment is a key optionally followed by one or more
/// `[index]` accessors. Returns `None` if the path is malformed or does not
/// exist in the body.
pub fn resolve_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = body;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        let (key, mut rest) = match segment.find('[') {
            Some(i) => (&segment[..i], &segment[i..]),
            None => (segment, ""),
        };
        if !key.is_empty() {
            current = current.get(key)?;
        }
        while let Some(inner) = rest.strip_prefix('[') {
            let end = inner.find(']')?;
            let index: usize = inner[..end].parse().ok()?;
            current = current.get(index)?;
            rest = &inner[end + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    Some(current)
}

/// Render a leaf value as answer text. Containers and null are not usable
/// as a direct answer; they fall through to the next extraction layer.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
