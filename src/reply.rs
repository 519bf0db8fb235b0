//! Backend reply shapes and their display text
//!
//! The backend answers with one of several JSON shapes. They are resolved
//! into a [`BackendReply`] with a fixed precedence:
//!
//! 1. `summaries` array: one `"<sender>: <summary>"` line per item
//! 2. non-empty `summary`: a single `"<sender>: <summary>"`
//! 3. `error`: shown verbatim
//! 4. anything else: [`NO_READABLE_RESPONSE`]

use serde::Deserialize;
use serde_json::Value;

/// Shown when a reply carries nothing displayable
pub const NO_READABLE_RESPONSE: &str = "No readable response received.";

/// Used when a summary arrives without a sender
const UNKNOWN_SENDER: &str = "Unknown sender";

/// One summarized email
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Summary {
    #[serde(default, deserialize_with = "lenient_string")]
    pub sender: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: Option<String>,
}

impl Summary {
    /// Create a summary with both fields present
    #[must_use]
    pub fn new(sender: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            summary: Some(summary.into()),
        }
    }

    /// Render as `"<sender>: <summary>"`
    #[must_use]
    pub fn render(&self) -> String {
        let sender = self
            .sender
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SENDER);
        format!("{sender}: {}", self.summary.as_deref().unwrap_or_default())
    }
}

/// Reply from the backend, resolved by shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    /// Several summaries
    Summaries(Vec<Summary>),
    /// One summary
    Single(Summary),
    /// Backend-reported error message
    Error(String),
    /// No recognized field
    Unrecognized,
}

impl BackendReply {
    /// Resolve a JSON body into a reply
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Unrecognized;
        };

        if let Some(Value::Array(items)) = object.get("summaries") {
            let summaries = items
                .iter()
                .map(|item| {
                    Summary::deserialize(item).unwrap_or(Summary {
                        sender: None,
                        summary: None,
                    })
                })
                .collect();
            return Self::Summaries(summaries);
        }

        if let Some(Value::String(summary)) = object.get("summary") {
            if !summary.is_empty() {
                return Self::Single(Summary {
                    sender: object.get("sender").and_then(value_text),
                    summary: Some(summary.clone()),
                });
            }
        }

        // Falsy error values carry no message
        match object.get("error") {
            Some(Value::Null | Value::Bool(false)) | None => Self::Unrecognized,
            Some(Value::String(message)) if message.is_empty() => Self::Unrecognized,
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Self::Unrecognized,
            Some(Value::String(message)) => Self::Error(message.clone()),
            Some(other) => Self::Error(other.to_string()),
        }
    }

    /// Display text for the transcript
    #[must_use]
    pub fn render(&self) -> String {
        let text = match self {
            Self::Summaries(items) => items
                .iter()
                .map(Summary::render)
                .collect::<Vec<_>>()
                .join("\n\n"),
            Self::Single(summary) => summary.render(),
            Self::Error(message) => message.clone(),
            Self::Unrecognized => String::new(),
        };

        if text.is_empty() {
            NO_READABLE_RESPONSE.to_string()
        } else {
            text
        }
    }
}

/// Text of a JSON scalar; other values are dropped
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(&value))
}
