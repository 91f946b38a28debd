//! Classification enrichment — validation and normalization of taxonomy
//! labels returned by an external labeling capability.
//!
//! The labeling itself is a collaborator concern (`provider`); this module
//! owns the decision of what counts as a well-formed result. A response
//! that cannot be parsed degrades to a canonical fallback instead of
//! propagating an error.

pub mod enrich;
pub mod provider;

pub use enrich::{enrich_batch, EnrichOptions, EnrichReport};
pub use provider::{ChatCompletionsLabeler, Labeler};

use crate::filters::Confidence;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Taxonomy label codes accepted from the labeler.
pub const VALID_LABELS: &[&str] = &[
    "ML01", "ML02", "ML03", "ML04", "ML05", "ML06", "ML07", "ML08", "ML09", "ML10", "NONE",
];

/// Upper bound on labels per paper; surveys may carry several, but excess
/// beyond this is flagged and dropped.
pub const MAX_LABELS: usize = 5;

/// Prefix marking a fallback produced from an unparseable response.
pub const PARSE_FAILURE_MARKER: &str = "unparseable response";

const RAW_PREVIEW_LEN: usize = 200;

/// Paper type tag from a fixed small enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperType {
    Attack,
    Defense,
    Survey,
    Benchmark,
    Tool,
    Theoretical,
    Empirical,
    Unknown,
}

impl PaperType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Defense => "defense",
            Self::Survey => "survey",
            Self::Benchmark => "benchmark",
            Self::Tool => "tool",
            Self::Theoretical => "theoretical",
            Self::Empirical => "empirical",
            Self::Unknown => "unknown",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "attack" => Self::Attack,
            "defense" => Self::Defense,
            "survey" => Self::Survey,
            "benchmark" => Self::Benchmark,
            "tool" => Self::Tool,
            "theoretical" => Self::Theoretical,
            "empirical" => Self::Empirical,
            _ => Self::Unknown,
        }
    }
}

/// A validated, normalized multi-label taxonomy assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Non-empty; `["NONE"]` exactly when no category applies.
    pub labels: Vec<String>,
    pub paper_type: PaperType,
    pub domains: Vec<String>,
    pub model_types: Vec<String>,
    pub tags: Vec<String>,
    pub confidence: Confidence,
    pub reasoning: String,
}

impl Classification {
    /// The canonical result for a response that failed to parse. Kept
    /// distinguishable downstream: confidence LOW and a marked reasoning
    /// prefix carrying a truncated copy of the raw response.
    pub fn fallback(raw: &str) -> Self {
        Self {
            labels: vec!["NONE".to_string()],
            paper_type: PaperType::Unknown,
            domains: Vec::new(),
            model_types: Vec::new(),
            tags: Vec::new(),
            confidence: Confidence::Low,
            reasoning: format!("{PARSE_FAILURE_MARKER}: {}", truncate(raw, RAW_PREVIEW_LEN)),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.reasoning.starts_with(PARSE_FAILURE_MARKER)
    }

    /// Parse and normalize a raw labeler response.
    ///
    /// `has_abstract` only sets the default confidence when the response
    /// does not state one; title-only classifications default to LOW.
    pub fn parse_response(raw: &str, has_abstract: bool) -> Self {
        let Some(json) = extract_json_object(raw) else {
            return Self::fallback(raw);
        };
        let Ok(value) = serde_json::from_str::<Value>(json) else {
            return Self::fallback(raw);
        };

        let mut labels: Vec<String> = string_or_list(value.get("labels").or_else(|| {
            value.get("owasp_labels")
        }))
        .iter()
        .filter_map(|l| validate_label(l))
        .collect();
        let mut seen = std::collections::BTreeSet::new();
        labels.retain(|label| seen.insert(label.clone()));
        if labels.len() > MAX_LABELS {
            tracing::warn!(
                dropped = ?&labels[MAX_LABELS..],
                limit = MAX_LABELS,
                "labeler exceeded the label cap, truncating"
            );
            labels.truncate(MAX_LABELS);
        }
        // NONE is mutually exclusive with real categories.
        if labels.len() > 1 {
            labels.retain(|l| l != "NONE");
        }
        if labels.is_empty() {
            labels.push("NONE".to_string());
        }

        let paper_type = value
            .get("paper_type")
            .and_then(Value::as_str)
            .map(PaperType::parse)
            .unwrap_or(PaperType::Unknown);

        let confidence = value
            .get("confidence")
            .and_then(Value::as_str)
            .and_then(parse_confidence)
            .unwrap_or(if has_abstract {
                Confidence::High
            } else {
                Confidence::Low
            });

        Self {
            labels,
            paper_type,
            domains: lowercase_list(string_or_list(value.get("domains"))),
            model_types: lowercase_list(string_or_list(value.get("model_types"))),
            tags: lowercase_list(string_or_list(value.get("tags"))),
            confidence,
            reasoning: value
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Extract the first brace-delimited JSON object, tolerating leading and
/// trailing prose and nested braces.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in raw[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&raw[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn validate_label(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    if VALID_LABELS.contains(&upper.as_str()) {
        return Some(upper);
    }
    // Salvage a valid code embedded in noise ("label ML05 (model theft)").
    VALID_LABELS
        .iter()
        .find(|code| upper.contains(*code))
        .map(|code| code.to_string())
}

fn parse_confidence(raw: &str) -> Option<Confidence> {
    match raw.trim().to_lowercase().as_str() {
        "high" => Some(Confidence::High),
        "medium" => Some(Confidence::Medium),
        "low" => Some(Confidence::Low),
        _ => None,
    }
}

fn string_or_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn lowercase_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn truncate(s: &str, max: usize) -> &str {
    let mut cut = max.min(s.len());
    while cut < s.len() && !s.is_char_boundary(cut) {
        cut += 1;
    }
    &s[..cut]
}
