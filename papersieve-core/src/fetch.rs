//! OpenAlex metadata client — backfills abstracts and bibliographic fields
//! for papers discovered by title or citation only. A thin collaborator;
//! filtering never performs I/O.

use crate::error::SieveError;
use crate::paper::Paper;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const OPENALEX_API: &str = "https://api.openalex.org";

/// Metadata for one work as returned by the search API.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperMetadata {
    pub openalex_id: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub authors: Vec<String>,
    pub cited_by_count: Option<u64>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub pdf_url: Option<String>,
}

pub struct OpenAlexClient {
    client: reqwest::Client,
    mailto: String,
}

impl OpenAlexClient {
    /// `mailto` enrolls requests in the polite pool.
    pub fn new(mailto: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            mailto: mailto.into(),
        }
    }

    /// Search for a work by title; returns the best match, if any.
    pub async fn search_by_title(&self, title: &str) -> Result<Option<PaperMetadata>, SieveError> {
        let url = format!(
            "{OPENALEX_API}/works?search={}&per_page=1&mailto={}",
            urlencoding::encode(title),
            self.mailto
        );
        tracing::debug!(title, "searching OpenAlex");
        let response = self
            .client
            .get(&url)
            .header(
                reqwest::header::USER_AGENT,
                format!("papersieve/0.1 (mailto:{})", self.mailto),
            )
            .send()
            .await?
            .error_for_status()?;
        let page: WorksPage = response.json().await?;
        Ok(page.results.into_iter().next().map(PaperMetadata::from))
    }
}

#[derive(Debug, Deserialize)]
struct WorksPage {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    id: Option<String>,
    title: Option<String>,
    abstract_inverted_index: Option<BTreeMap<String, Vec<usize>>>,
    publication_year: Option<i32>,
    primary_location: Option<Location>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    cited_by_count: Option<u64>,
    doi: Option<String>,
    open_access: Option<OpenAccess>,
}

#[derive(Debug, Deserialize)]
struct Location {
    source: Option<Source>,
    pdf_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Source {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccess {
    oa_url: Option<String>,
}

impl From<Work> for PaperMetadata {
    fn from(work: Work) -> Self {
        let abstract_text = work
            .abstract_inverted_index
            .as_ref()
            .and_then(reconstruct_abstract);
        let venue = work
            .primary_location
            .as_ref()
            .and_then(|l| l.source.as_ref())
            .and_then(|s| s.display_name.clone());
        let pdf_url = work
            .open_access
            .as_ref()
            .and_then(|oa| oa.oa_url.clone())
            .or_else(|| {
                work.primary_location
                    .as_ref()
                    .and_then(|l| l.pdf_url.clone())
            });
        PaperMetadata {
            url: work.id.clone(),
            openalex_id: work.id,
            title: work.title,
            abstract_text,
            year: work.publication_year,
            venue,
            authors: work
                .authorships
                .into_iter()
                .filter_map(|a| a.author.and_then(|a| a.display_name))
                .collect(),
            cited_by_count: work.cited_by_count,
            doi: work.doi,
            pdf_url,
        }
    }
}

/// Rebuild plain abstract text from the inverted-index format.
pub fn reconstruct_abstract(index: &BTreeMap<String, Vec<usize>>) -> Option<String> {
    let mut words: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |p| (*p, word.as_str())))
        .collect();
    if words.is_empty() {
        return None;
    }
    words.sort_by_key(|(position, _)| *position);
    Some(
        words
            .into_iter()
            .map(|(_, word)| word)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Pull an arXiv identifier out of a paper URL, if present.
pub fn extract_arxiv_id(url: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"arxiv\.org/(?:abs|pdf)/(\d+\.\d+)",
            r"arxiv\.org/(?:abs|pdf)/([a-z-]+/\d+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });
    patterns
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Fill fields the record is missing; existing values are never replaced.
pub fn backfill(paper: &mut Paper, metadata: &PaperMetadata) {
    if paper.abstract_text.as_deref().is_none_or(|a| a.trim().is_empty()) {
        paper.abstract_text = metadata.abstract_text.clone();
    }
    if paper.year.is_none() {
        paper.year = metadata.year;
    }
    if paper.venue.is_none() {
        paper.venue = metadata.venue.clone();
    }
    if paper.authors.is_empty() {
        paper.authors = metadata.authors.clone();
    }
    if paper.citation_count.is_none() {
        paper.citation_count = metadata.cited_by_count;
    }
    if paper.url.is_none() {
        paper.url = metadata.url.clone();
    }
    if paper.pdf_url.is_none() {
        paper.pdf_url = metadata.pdf_url.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct_abstract_orders_by_position() {
        let mut index = BTreeMap::new();
        index.insert("stealing".to_string(), vec![1]);
        index.insert("models".to_string(), vec![2, 4]);
        index.insert("matters".to_string(), vec![3]);
        index.insert("why".to_string(), vec![0]);
        assert_eq!(
            reconstruct_abstract(&index).as_deref(),
            Some("why stealing models matters models")
        );
    }

    #[test]
    fn test_reconstruct_empty_index() {
        assert_eq!(reconstruct_abstract(&BTreeMap::new()), None);
    }

    #[test]
    fn test_extract_arxiv_id() {
        assert_eq!(
            extract_arxiv_id("https://arxiv.org/abs/1609.02943").as_deref(),
            Some("1609.02943")
        );
        assert_eq!(
            extract_arxiv_id("https://arxiv.org/pdf/cs/0112017").as_deref(),
            Some("cs/0112017")
        );
        assert_eq!(extract_arxiv_id("https://openalex.org/W123"), None);
    }

    #[test]
    fn test_backfill_never_overwrites() {
        let mut paper = Paper::new("p1", "T", Some("Existing abstract".into()));
        paper.year = Some(2020);
        let metadata = PaperMetadata {
            openalex_id: None,
            title: None,
            abstract_text: Some("New abstract".into()),
            year: Some(1999),
            venue: Some("Somewhere".into()),
            authors: vec!["A. Author".into()],
            cited_by_count: Some(7),
            doi: None,
            url: None,
            pdf_url: None,
        };
        backfill(&mut paper, &metadata);
        assert_eq!(paper.abstract_text.as_deref(), Some("Existing abstract"));
        assert_eq!(paper.year, Some(2020));
        assert_eq!(paper.venue.as_deref(), Some("Somewhere"));
        assert_eq!(paper.citation_count, Some(7));
    }
}
