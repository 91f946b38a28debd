//! Filter capability contract and shared text-matching helpers.
//!
//! A filter is a pure predicate-with-explanation over one paper and one
//! domain configuration. Implementations never perform I/O and never fail:
//! a paper with a missing abstract is a valid input handled by the filter's
//! own logic, not an error.

pub mod exclusion;
pub mod relevance;
pub mod topic;

pub use exclusion::ExclusionFilter;
pub use relevance::RelevanceFilter;
pub use topic::TopicDominanceFilter;

use crate::config::DomainConfig;
use crate::paper::Paper;
use serde::{Deserialize, Serialize};

/// Confidence level for a filtering decision, ordered LOW < MEDIUM < HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// A single filter's relevance decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_relevant: bool,
    /// Always non-empty, including for acceptance.
    pub reason: String,
    pub confidence: Confidence,
}

impl Verdict {
    pub fn accept(reason: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            is_relevant: true,
            reason: reason.into(),
            confidence,
        }
    }

    pub fn reject(reason: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            is_relevant: false,
            reason: reason.into(),
            confidence,
        }
    }
}

/// A single-responsibility relevance predicate.
pub trait PaperFilter: Send + Sync {
    /// Stage name recorded in pipeline results and statistics.
    fn name(&self) -> &'static str;

    /// Pure function of the paper and the shared read-only configuration.
    fn evaluate(&self, paper: &Paper, config: &DomainConfig) -> Verdict;
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
pub(crate) fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut at = 0;
    while let Some(pos) = haystack[at..].find(needle) {
        count += 1;
        at += pos + needle.len();
    }
    count
}

/// Total non-overlapping occurrences across a term list.
pub(crate) fn count_terms(haystack: &str, terms: &[String]) -> usize {
    terms
        .iter()
        .map(|term| count_occurrences(haystack, term))
        .sum()
}

/// Slice of `text` extending `width` either side of `[start, end)`, clamped
/// to char boundaries.
pub(crate) fn context_window(text: &str, start: usize, end: usize, width: usize) -> &str {
    let mut lo = start.saturating_sub(width);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = end.saturating_add(width).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}

/// Leading slice of `text` up to `len` bytes, clamped to a char boundary.
pub(crate) fn leading_slice(text: &str, len: usize) -> &str {
    let mut cut = len.min(text.len());
    while cut < text.len() && !text.is_char_boundary(cut) {
        cut += 1;
    }
    &text[..cut]
}
