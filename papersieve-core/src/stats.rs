//! Batch statistics over pipeline results, for analysis and audit.

use crate::pipeline::PipelineResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A compact reference to a rejected paper, kept as an audit example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamplePaper {
    pub paper_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub reason: String,
}

/// Read-only summary of a batch of pipeline results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    pub total: usize,
    pub relevant: usize,
    pub excluded: usize,
    /// Accepted counts keyed by confidence level.
    pub relevant_by_confidence: BTreeMap<String, usize>,
    /// Rejected counts keyed by confidence level.
    pub excluded_by_confidence: BTreeMap<String, usize>,
    /// All results keyed by the deciding stage.
    pub by_stage: BTreeMap<String, usize>,
    /// Rejections keyed by deciding stage, then confidence.
    pub rejected_by_stage: BTreeMap<String, BTreeMap<String, usize>>,
    /// Rejections keyed by full reason string.
    pub exclusion_reasons: BTreeMap<String, usize>,
    /// First-N rejected papers per deciding stage, in input order.
    pub examples_by_stage: BTreeMap<String, Vec<ExamplePaper>>,
}

impl FilterStats {
    pub const DEFAULT_SAMPLE_SIZE: usize = 3;

    pub fn from_results(results: &[PipelineResult]) -> Self {
        Self::with_sample_size(results, Self::DEFAULT_SAMPLE_SIZE)
    }

    /// Aggregate a batch, keeping up to `sample_size` example rejects per
    /// stage. Example selection is deterministic: the first N encountered
    /// in input order.
    pub fn with_sample_size(results: &[PipelineResult], sample_size: usize) -> Self {
        let mut stats = Self {
            total: results.len(),
            relevant: 0,
            excluded: 0,
            relevant_by_confidence: BTreeMap::new(),
            excluded_by_confidence: BTreeMap::new(),
            by_stage: BTreeMap::new(),
            rejected_by_stage: BTreeMap::new(),
            exclusion_reasons: BTreeMap::new(),
            examples_by_stage: BTreeMap::new(),
        };

        for result in results {
            let confidence = result.confidence.as_str().to_string();
            *stats.by_stage.entry(result.stage.clone()).or_default() += 1;

            if result.is_relevant {
                stats.relevant += 1;
                *stats.relevant_by_confidence.entry(confidence).or_default() += 1;
                continue;
            }

            stats.excluded += 1;
            *stats
                .excluded_by_confidence
                .entry(confidence.clone())
                .or_default() += 1;
            *stats
                .rejected_by_stage
                .entry(result.stage.clone())
                .or_default()
                .entry(confidence)
                .or_default() += 1;
            *stats
                .exclusion_reasons
                .entry(result.reason.clone())
                .or_default() += 1;

            let examples = stats
                .examples_by_stage
                .entry(result.stage.clone())
                .or_default();
            if examples.len() < sample_size {
                examples.push(ExamplePaper {
                    paper_id: result.paper.paper_id.clone(),
                    title: result.paper.title.clone(),
                    year: result.paper.year,
                    reason: result.reason.clone(),
                });
            }
        }

        stats
    }

    fn confidence_line(counts: &BTreeMap<String, usize>) -> String {
        let get = |k: &str| counts.get(k).copied().unwrap_or(0);
        format!(
            "  - high: {}, medium: {}, low: {}",
            get("high"),
            get("medium"),
            get("low")
        )
    }

    /// Human-readable summary in the style of the CLI report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let percent = |n: usize| {
            if self.total == 0 {
                0.0
            } else {
                n as f64 / self.total as f64 * 100.0
            }
        };

        let _ = writeln!(out, "{}", "=".repeat(72));
        let _ = writeln!(out, "FILTERING STATISTICS");
        let _ = writeln!(out, "{}", "=".repeat(72));
        let _ = writeln!(out, "Total papers: {}", self.total);
        let _ = writeln!(
            out,
            "Relevant (keep): {} ({:.1}%)",
            self.relevant,
            percent(self.relevant)
        );
        let _ = writeln!(out, "{}", Self::confidence_line(&self.relevant_by_confidence));
        let _ = writeln!(
            out,
            "Excluded (drop): {} ({:.1}%)",
            self.excluded,
            percent(self.excluded)
        );
        let _ = writeln!(out, "{}", Self::confidence_line(&self.excluded_by_confidence));

        let _ = writeln!(out, "\nDecisions by stage:");
        for (stage, count) in &self.by_stage {
            let _ = writeln!(out, "  {count:5} - {stage}");
        }

        if !self.exclusion_reasons.is_empty() {
            let _ = writeln!(out, "\nTop exclusion reasons:");
            let mut reasons: Vec<_> = self.exclusion_reasons.iter().collect();
            reasons.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (reason, count) in reasons.into_iter().take(10) {
                let _ = writeln!(out, "  {count:5} - {reason}");
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;
    use crate::paper::Paper;
    use crate::pipeline::Pipeline;

    fn results() -> Vec<PipelineResult> {
        let config = DomainConfig::from_yaml_str(
            r#"
domain_name: model_extraction
high_quality_keywords: ["model extraction attack"]
core_keywords: ["model extraction"]
required_abstract_terms: ["model extraction"]
exclusion_signals:
  electromagnetic_side_channel: ["electromagnetic"]
other_topics:
  watermarking: ["watermark"]
"#,
        )
        .unwrap();
        let papers = vec![
            Paper::new(
                "a",
                "Extraction",
                Some("A model extraction attack on APIs.".into()),
            ),
            Paper::new("b", "EM", Some("Pure electromagnetic leakage study.".into())),
            Paper::new("c", "No Abstract", None),
            Paper::new("d", "Also No Abstract", None),
        ];
        Pipeline::new().process_batch(&papers, &config)
    }

    #[test]
    fn test_counts_by_outcome_and_stage() {
        let stats = FilterStats::from_results(&results());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.relevant, 1);
        assert_eq!(stats.excluded, 3);
        assert_eq!(stats.by_stage["exclusion"], 1);
        assert_eq!(stats.by_stage["relevance"], 2);
        assert_eq!(stats.rejected_by_stage["relevance"]["high"], 2);
    }

    #[test]
    fn test_examples_are_first_n_in_input_order() {
        let stats = FilterStats::with_sample_size(&results(), 1);
        let examples = &stats.examples_by_stage["relevance"];
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].paper_id, "c");
    }

    #[test]
    fn test_render_mentions_totals() {
        let rendered = FilterStats::from_results(&results()).render();
        assert!(rendered.contains("Total papers: 4"));
        assert!(rendered.contains("no abstract to verify relevance"));
    }

    #[test]
    fn test_empty_batch_renders_without_panic() {
        let stats = FilterStats::from_results(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.render().contains("Total papers: 0"));
    }
}
