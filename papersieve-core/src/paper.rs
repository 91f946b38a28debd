//! Paper record — one candidate paper's text and metadata.

use serde::{Deserialize, Serialize};

/// A candidate research paper.
///
/// Constructed once per input record at batch load time and never mutated
/// during filtering. Filters read only the identity and text fields; venue,
/// year, and authors are descriptive metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub paper_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub citation_count: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    /// Keywords the discovery stage matched for this paper, including the
    /// `(via citation)` marker for citation-only hits.
    #[serde(default)]
    pub keywords_matched: Vec<String>,
    #[serde(default)]
    pub first_seen: String,
}

impl Paper {
    pub fn new(
        paper_id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: Option<String>,
    ) -> Self {
        Self {
            paper_id: paper_id.into(),
            title: title.into(),
            abstract_text,
            year: None,
            venue: None,
            authors: Vec::new(),
            citation_count: None,
            url: None,
            pdf_url: None,
            publication_date: None,
            keywords_matched: Vec::new(),
            first_seen: String::new(),
        }
    }

    /// A record without a title is invalid input; the pipeline rejects it
    /// with a dedicated verdict rather than evaluating filters.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn has_abstract(&self) -> bool {
        self.abstract_text
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
    }

    /// Lowercase title view for case-insensitive matching.
    pub fn title_lower(&self) -> String {
        self.title.to_lowercase()
    }

    /// Lowercase abstract view; empty when the abstract is absent.
    pub fn abstract_lower(&self) -> String {
        self.abstract_text
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
    }

    /// Lowercase title and abstract joined for combined scans.
    pub fn combined_lower(&self) -> String {
        format!("{}\n{}", self.title_lower(), self.abstract_lower())
    }
}
