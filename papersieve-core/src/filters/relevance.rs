//! Relevance filter — confirms the paper actually discusses the target
//! domain rather than adjacent vocabulary.

use crate::config::DomainConfig;
use crate::filters::{context_window, count_terms, Confidence, PaperFilter, Verdict};
use crate::paper::Paper;

#[derive(Debug, Default)]
pub struct RelevanceFilter;

impl RelevanceFilter {
    pub fn new() -> Self {
        Self
    }

    /// Action words with the anchor word inside the context window count as
    /// domain mentions ("we extract ... the victim model").
    fn compound_mentions(&self, text: &str, config: &DomainConfig) -> usize {
        let (Some(matcher), Some(anchor)) =
            (config.compound_matcher(), config.compound_anchor.as_deref())
        else {
            return 0;
        };
        matcher
            .find_iter(text)
            .filter(|m| {
                context_window(text, m.start(), m.end(), config.rules.context_window)
                    .contains(anchor)
            })
            .count()
    }
}

impl PaperFilter for RelevanceFilter {
    fn name(&self) -> &'static str {
        "relevance"
    }

    fn evaluate(&self, paper: &Paper, config: &DomainConfig) -> Verdict {
        if !paper.has_abstract() {
            return Verdict::reject("no abstract to verify relevance", Confidence::High);
        }

        let abstract_lower = paper.abstract_lower();

        // High-quality keywords dominate every other signal.
        if count_terms(&abstract_lower, &config.high_quality_keywords) >= 1 {
            return Verdict::accept(
                "high-quality domain keyword present in abstract",
                Confidence::High,
            );
        }

        let total = count_terms(&abstract_lower, &config.core_keywords)
            + count_terms(&abstract_lower, &config.required_abstract_terms)
            + self.compound_mentions(&abstract_lower, config);

        if total < config.rules.min_term_mentions {
            return Verdict::reject(
                "insufficient domain terminology in abstract",
                Confidence::High,
            );
        }

        Verdict::accept(
            "domain terminology present without a high-quality signal",
            Confidence::Medium,
        )
    }
}
