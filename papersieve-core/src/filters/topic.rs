//! Topic-dominance filter — rejects papers where the target topic is
//! mentioned but a competing topic is the primary focus.

use crate::config::DomainConfig;
use crate::filters::{count_terms, leading_slice, Confidence, PaperFilter, Verdict};
use crate::paper::Paper;

#[derive(Debug, Default)]
pub struct TopicDominanceFilter;

impl TopicDominanceFilter {
    pub fn new() -> Self {
        Self
    }

    /// A competing topic dominates on either an absolute mention count or a
    /// ratio against the target-topic count. A target count of zero with
    /// any competing mentions is automatically dominant.
    fn is_dominant(
        &self,
        competing_count: usize,
        target_count: usize,
        config: &DomainConfig,
    ) -> bool {
        if competing_count == 0 {
            return false;
        }
        if competing_count > config.rules.topic_dominance_threshold {
            return true;
        }
        if target_count == 0 {
            return true;
        }
        competing_count as f64 > target_count as f64 * config.rules.topic_dominance_ratio
    }
}

impl PaperFilter for TopicDominanceFilter {
    fn name(&self) -> &'static str {
        "topic"
    }

    fn evaluate(&self, paper: &Paper, config: &DomainConfig) -> Verdict {
        if !paper.has_abstract() {
            // Unreachable under the default order; the relevance filter
            // rejects abstract-less papers first.
            return Verdict::accept(
                "cannot assess topic dominance without an abstract",
                Confidence::Low,
            );
        }

        let abstract_lower = paper.abstract_lower();
        let target_count = count_terms(&abstract_lower, &config.required_abstract_terms);
        let defends_target =
            target_count > 0 && count_terms(&abstract_lower, &config.defense_keywords) > 0;

        for (topic, terms) in &config.other_topics {
            let competing_count = count_terms(&abstract_lower, terms);
            if !self.is_dominant(competing_count, target_count, config) {
                continue;
            }
            if defends_target {
                // A defense against the target attack legitimately spends
                // most of its abstract on the countermeasure topic.
                tracing::debug!(topic = %topic, "dominance waived by defense keyword");
                continue;
            }
            return Verdict::reject(
                format!(
                    "competing topic \"{topic}\" dominates \
                     ({competing_count} mentions vs {target_count} target-topic mentions)"
                ),
                Confidence::Medium,
            );
        }

        let first_paragraph =
            leading_slice(&abstract_lower, config.rules.first_paragraph_length);
        let target_in_first = config
            .required_abstract_terms
            .iter()
            .any(|t| first_paragraph.contains(t.as_str()));
        if !target_in_first {
            for (topic, terms) in &config.other_topics {
                if terms.iter().any(|t| first_paragraph.contains(t.as_str())) {
                    return Verdict::reject(
                        format!("competing topic \"{topic}\" introduced before the target topic"),
                        Confidence::Low,
                    );
                }
            }
        }

        Verdict::accept("target topic is the primary focus", Confidence::High)
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
core_keywords: ["model extraction"]
defense_keywords: ["against model stealing", "prevent model extraction"]
required_abstract_terms: ["model extraction", "model stealing"]
exclusion_signals:
  g: ["electromagnetic"]
other_topics:
  watermarking: ["watermarking", "fingerprinting"]
  membership_inference: ["membership inference"]
rules:
  topic_dominance_threshold: 4
  topic_dominance_ratio: 2.0
  first_paragraph_length: 300
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_primary_topic_accepts_high() {
        let paper = Paper::new(
            "p1",
            "Extraction Study",
            Some("Model extraction is our focus. We study model extraction at scale.".into()),
        );
        let verdict = TopicDominanceFilter::new().evaluate(&paper, &config());
        assert!(verdict.is_relevant);
        assert_eq!(verdict.confidence, Confidence::High);
    }

    #[test]
    fn test_ratio_dominance_rejects_with_counts() {
        let abstract_text = "Watermarking protects models. Watermarking schemes embed marks. \
                             Watermarking is robust. Watermarking survives pruning. \
                             One sentence mentions model extraction."
            .to_string();
        let paper = Paper::new("p2", "Watermarking Models", Some(abstract_text));
        let verdict = TopicDominanceFilter::new().evaluate(&paper, &config());
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.confidence, Confidence::Medium);
        assert!(verdict.reason.contains("watermarking"));
        assert!(verdict.reason.contains("4 mentions vs 1"));
    }

    #[test]
    fn test_zero_target_count_is_always_dominated() {
        let paper = Paper::new(
            "p3",
            "Inference Attacks",
            Some("We study membership inference on tabular data.".into()),
        );
        let verdict = TopicDominanceFilter::new().evaluate(&paper, &config());
        assert!(!verdict.is_relevant);
        assert!(verdict.reason.contains("membership_inference"));
    }

    #[test]
    fn test_defense_keyword_waives_dominance() {
        let abstract_text = "Watermarking, watermarking, watermarking, watermarking, \
                             watermarking defenses against model stealing. We evaluate \
                             how watermarking deters model stealing."
            .to_string();
        let paper = Paper::new("p4", "Defending Models", Some(abstract_text));
        let verdict = TopicDominanceFilter::new().evaluate(&paper, &config());
        assert!(verdict.is_relevant);
    }

    #[test]
    fn test_competing_topic_first_rejects_low() {
        // Counts stay under both dominance conditions, but the first
        // paragraph only talks about the competing topic.
        let mut abstract_text = "Watermarking embeds ownership marks into networks. ".repeat(3);
        abstract_text.push_str(
            "Our evaluation spans many datasets and architectures over several years of study. ",
        );
        abstract_text.push_str(
            "We additionally report ablations and sensitivity analyses across training regimes. ",
        );
        abstract_text.push_str(
            "Later we relate this to model extraction and model stealing and model extraction.",
        );
        let paper = Paper::new("p5", "Marks and Extraction", Some(abstract_text));
        let verdict = TopicDominanceFilter::new().evaluate(&paper, &config());
        assert!(!verdict.is_relevant);
        assert_eq!(verdict.confidence, Confidence::Low);
        assert!(verdict.reason.contains("introduced before"));
    }

    #[test]
    fn test_missing_abstract_is_total() {
        let paper = Paper::new("p6", "No Abstract", None);
        let verdict = TopicDominanceFilter::new().evaluate(&paper, &config());
        assert!(verdict.is_relevant);
        assert_eq!(verdict.confidence, Confidence::Low);
    }
}
