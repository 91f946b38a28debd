//! Exclusion filter — cheap rejection of known false-positive patterns
//! before the more expensive matching stages.

use crate::config::DomainConfig;
use crate::filters::{context_window, Confidence, PaperFilter, Verdict};
use crate::paper::Paper;

/// Marker the discovery stage attaches to papers found only through
/// citations of pool papers.
pub const CITATION_MARKER: &str = "(via citation)";

#[derive(Debug, Default)]
pub struct ExclusionFilter;

impl ExclusionFilter {
    pub fn new() -> Self {
        Self
    }

    /// Papers whose only match is the citation marker, or the marker plus a
    /// single keyword the abstract does not actually contain, were swept in
    /// by the citation graph rather than their own content.
    fn citation_only(&self, paper: &Paper) -> Option<Verdict> {
        let matched = &paper.keywords_matched;
        if matched.len() == 1 && matched[0] == CITATION_MARKER {
            return Some(Verdict::reject(
                "only mentioned in citations",
                Confidence::High,
            ));
        }
        if matched.len() == 2 && matched.iter().any(|k| k == CITATION_MARKER) {
            let other = matched.iter().find(|k| *k != CITATION_MARKER)?;
            if paper.has_abstract() && !paper.abstract_lower().contains(&other.to_lowercase()) {
                return Some(Verdict::reject(
                    "only mentioned in citations",
                    Confidence::High,
                ));
            }
        }
        None
    }

    /// An exclusion group fires when one of its terms occurs and no
    /// occurrence has a core or high-quality keyword within the context
    /// window. A single rescued occurrence passes the whole group.
    fn group_fires(
        &self,
        group: &str,
        terms: &[String],
        combined: &str,
        config: &DomainConfig,
    ) -> Option<Verdict> {
        let mut matched = false;
        for term in terms {
            let mut at = 0;
            while let Some(pos) = combined[at..].find(term.as_str()) {
                let start = at + pos;
                let end = start + term.len();
                at = end;
                matched = true;
                let window =
                    context_window(combined, start, end, config.rules.context_window);
                if config
                    .domain_context_terms()
                    .any(|k| window.contains(k.as_str()))
                {
                    tracing::debug!(
                        group = %group,
                        term = %term,
                        "exclusion match rescued by nearby domain keyword"
                    );
                    return None;
                }
            }
        }
        matched.then(|| {
            Verdict::reject(
                format!("matched exclusion group \"{group}\" with no nearby domain context"),
                Confidence::High,
            )
        })
    }

    fn problematic_title_only(&self, paper: &Paper, config: &DomainConfig) -> Option<Verdict> {
        let title = paper.title_lower();
        let abstract_lower = paper.abstract_lower();
        for keyword in &config.problematic_keywords {
            if title.contains(keyword.as_str()) && !abstract_lower.contains(keyword.as_str()) {
                if !paper.has_abstract() {
                    return Some(Verdict::reject(
                        format!(
                            "problematic keyword \"{keyword}\" in title with no abstract to confirm"
                        ),
                        Confidence::High,
                    ));
                }
                return Some(Verdict::reject(
                    format!(
                        "title-only ambiguous match on \"{keyword}\", needs abstract confirmation"
                    ),
                    Confidence::Medium,
                ));
            }
        }
        None
    }
}

impl PaperFilter for ExclusionFilter {
    fn name(&self) -> &'static str {
        "exclusion"
    }

    fn evaluate(&self, paper: &Paper, config: &DomainConfig) -> Verdict {
        if let Some(verdict) = self.citation_only(paper) {
            return verdict;
        }

        let combined = paper.combined_lower();
        for (group, terms) in &config.exclusion_signals {
            if let Some(verdict) = self.group_fires(group, terms, &combined, config) {
                return verdict;
            }
        }

        if let Some(verdict) = self.problematic_title_only(paper, config) {
            return verdict;
        }

        Verdict::accept("no exclusion signal triggered", Confidence::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DomainConfig {
        DomainConfig::from_yaml_str(
            r#"
domain_name: model_extraction
high_quality_keywords: ["model extraction attack"]
core_keywords: ["model extraction", "model stealing"]
problematic_keywords: ["extraction"]
required_abstract_terms: ["model extraction", "model stealing"]
exclusion_signals:
  electromagnetic_side_channel: ["electromagnetic", "power analysis"]
  prompt_stealing: ["prompt stealing"]
other_topics:
  watermarking: ["watermark"]
rules:
  context_window: 40
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_passes_clean_paper() {
        let paper = Paper::new(
            "p1",
            "Stealing Machine Learning Models via Prediction APIs",
            Some("We present a model extraction attack against hosted models.".into()),
        );
        let verdict = ExclusionFilter::new().evaluate(&paper, &config());
        assert!(verdict.is_relevant);
        assert_eq!(verdict.reason, "no exclusion signal triggered");
    }

    #[test]
    fn test_exclusion_group_rejects_and_names_group() {
        let paper = Paper::new(
            "p2",
            "EM Analysis of Neural Network Accelerators",
            Some("We recover weights through electromagnetic emanations.".into()),
        );
        let verdict = ExclusionFilter::new().evaluate(&paper, &config());
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.confidence, Confidence::High);
        assert!(verdict.reason.contains("electromagnetic_side_channel"));
    }

    #[test]
    fn test_domain_keyword_in_window_rescues_match() {
        let paper = Paper::new(
            "p3",
            "Physical Attacks on Deployed Models",
            Some("Using power analysis alongside model extraction, we clone the network.".into()),
        );
        let verdict = ExclusionFilter::new().evaluate(&paper, &config());
        assert!(verdict.is_relevant);
    }

    #[test]
    fn test_problematic_keyword_title_only_is_medium() {
        let paper = Paper::new(
            "p4",
            "Feature Extraction for Image Retrieval",
            Some("We study convolutional descriptors for retrieval.".into()),
        );
        let verdict = ExclusionFilter::new().evaluate(&paper, &config());
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.confidence, Confidence::Medium);
        assert!(verdict.reason.contains("extraction"));
    }

    #[test]
    fn test_problematic_keyword_without_abstract_is_high() {
        let paper = Paper::new("p5", "Feature Extraction for Image Retrieval", None);
        let verdict = ExclusionFilter::new().evaluate(&paper, &config());
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.confidence, Confidence::High);
    }

    #[test]
    fn test_citation_only_marker_rejects() {
        let mut paper = Paper::new("p6", "Some Survey", Some("A broad survey.".into()));
        paper.keywords_matched = vec![CITATION_MARKER.to_string()];
        let verdict = ExclusionFilter::new().evaluate(&paper, &config());
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.reason, "only mentioned in citations");
    }

    #[test]
    fn test_citation_plus_unconfirmed_keyword_rejects() {
        let mut paper = Paper::new("p7", "Some Survey", Some("A broad survey of attacks.".into()));
        paper.keywords_matched =
            vec![CITATION_MARKER.to_string(), "model stealing".to_string()];
        let verdict = ExclusionFilter::new().evaluate(&paper, &config());
        assert!(!verdict.is_relevant);
    }

    #[test]
    fn test_citation_plus_confirmed_keyword_passes() {
        let mut paper = Paper::new(
            "p8",
            "Attack Survey",
            Some("We survey model stealing across deployments, model stealing in depth.".into()),
        );
        paper.keywords_matched =
            vec![CITATION_MARKER.to_string(), "model stealing".to_string()];
        let verdict = ExclusionFilter::new().evaluate(&paper, &config());
        assert!(verdict.is_relevant);
    }
}
