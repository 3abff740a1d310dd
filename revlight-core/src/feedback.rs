//! Feedback data model and the validated parse step for backend payloads
//!
//! The backend produces feedback from an LLM, so nothing about its shape is
//! trusted. [`parse_feedback`] converts raw JSON into [`FeedbackItem`]s,
//! defaulting malformed fields per entry instead of failing the batch. Only a
//! payload that is not a list at all is rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

use crate::{Error, Result};

/// Backend-assigned handle for one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub u64);

impl SubmissionId {
    /// The raw integer value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SubmissionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How serious a feedback item is
///
/// Ordered from least to most severe so `High > Medium > Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    /// Get all severities, most severe first
    pub fn all() -> &'static [Severity] {
        &[Severity::High, Severity::Medium, Severity::Low]
    }

    /// Get the wire name for this severity
    pub fn name(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Get the label used in hover text
    pub fn label(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// One reviewer comment tied to a line and severity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    /// 1-based line number, if the backend gave a usable one
    pub line: Option<u64>,
    /// Severity, `Medium` when absent or unrecognized
    pub severity: Severity,
    /// Short description of the issue
    pub message: String,
    /// Longer explanation shown below the message
    pub reasoning: Option<String>,
}

impl FeedbackItem {
    /// Create a feedback item with no line and medium severity
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            line: None,
            severity: Severity::default(),
            message: message.into(),
            reasoning: None,
        }
    }

    /// Set the 1-based line number
    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the reasoning paragraph
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Text shown when hovering the highlighted range
    pub fn hover_text(&self) -> String {
        let mut text = format!("{}: {}", self.severity.label(), self.message);
        if let Some(reasoning) = self.reasoning.as_deref().filter(|r| !r.trim().is_empty()) {
            text.push_str("\n\n");
            text.push_str(reasoning);
        }
        text
    }
}

/// Convert a raw backend feedback payload into feedback items
///
/// `null` is treated as "no feedback". Anything other than a list or `null`
/// is a protocol error. Individual entries are parsed best-effort: bad lines
/// become `None`, unknown severities become `Medium`, and entries that carry
/// no usable content are skipped with a warning.
pub fn parse_feedback(payload: &Value) -> Result<Vec<FeedbackItem>> {
    let entries = match payload {
        Value::Null => return Ok(Vec::new()),
        Value::Array(entries) => entries,
        other => {
            return Err(Error::Protocol(format!(
                "feedback payload must be a list, got {}",
                json_kind(other)
            )))
        }
    };

    Ok(entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| parse_entry(index, entry))
        .collect())
}

fn parse_entry(index: usize, entry: &Value) -> Option<FeedbackItem> {
    match entry {
        Value::Object(fields) => {
            let line = fields.get("line").and_then(parse_line);
            let severity = fields
                .get("severity")
                .map(|value| parse_severity(index, value))
                .unwrap_or_default();

            let message = match fields.get("message") {
                Some(Value::String(message)) => message.clone(),
                Some(Value::Null) | None => {
                    warn!(index, "Feedback entry has no message");
                    String::new()
                }
                Some(other) => other.to_string(),
            };

            let reasoning = fields
                .get("reasoning")
                .and_then(Value::as_str)
                .filter(|r| !r.trim().is_empty())
                .map(str::to_string);

            Some(FeedbackItem {
                line,
                severity,
                message,
                reasoning,
            })
        }
        // The backend falls back to raw model output when it cannot parse JSON
        Value::String(message) if !message.trim().is_empty() => {
            Some(FeedbackItem::new(message.clone()))
        }
        other => {
            warn!(index, kind = json_kind(other), "Skipping malformed feedback entry");
            None
        }
    }
}

fn parse_line(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_severity(index: usize, value: &Value) -> Severity {
    match value {
        Value::String(s) => s.parse().unwrap_or_else(|_| {
            warn!(index, severity = %s, "Unknown severity, using medium");
            Severity::Medium
        }),
        Value::Null => Severity::Medium,
        other => {
            warn!(index, kind = json_kind(other), "Non-string severity, using medium");
            Severity::Medium
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
