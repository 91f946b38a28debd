//! Ordered filter execution with short-circuit rejection.

use crate::config::DomainConfig;
use crate::error::SieveError;
use crate::filters::{
    Confidence, ExclusionFilter, PaperFilter, RelevanceFilter, TopicDominanceFilter, Verdict,
};
use crate::paper::Paper;
use serde::{Deserialize, Serialize};

/// Stage name for records rejected before any filter runs.
pub const INPUT_STAGE: &str = "input";

/// One evaluated filter's verdict, tagged with its stage name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageVerdict {
    pub stage: String,
    pub verdict: Verdict,
}

/// The aggregated outcome of running the pipeline over one paper.
///
/// `verdicts` holds only the filters actually evaluated; filters after the
/// first rejection are neither run nor recorded. The deciding verdict's
/// reason, confidence, and stage are flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub paper: Paper,
    pub is_relevant: bool,
    pub reason: String,
    pub confidence: Confidence,
    pub stage: String,
    pub verdicts: Vec<StageVerdict>,
}

/// Runs an ordered list of filters over each paper, stopping at the first
/// rejection. No cross-paper state; batches are trivially parallelizable.
pub struct Pipeline {
    filters: Vec<Box<dyn PaperFilter>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Default order: exclusion is cheapest and handles unambiguous junk,
    /// relevance is the primary gate, topic dominance is the most nuanced
    /// and only runs on papers that passed both.
    pub fn new() -> Self {
        Self {
            filters: vec![
                Box::new(ExclusionFilter::new()),
                Box::new(RelevanceFilter::new()),
                Box::new(TopicDominanceFilter::new()),
            ],
        }
    }

    /// Build a pipeline with a custom filter order. At least one filter is
    /// required.
    pub fn with_filters(filters: Vec<Box<dyn PaperFilter>>) -> Result<Self, SieveError> {
        if filters.is_empty() {
            return Err(SieveError::invalid_input(
                "pipeline requires at least one filter",
            ));
        }
        Ok(Self { filters })
    }

    /// Append a custom filter after the configured ones.
    pub fn add_filter(&mut self, filter: Box<dyn PaperFilter>) {
        self.filters.push(filter);
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Evaluate filters in order over one paper.
    pub fn process(&self, paper: &Paper, config: &DomainConfig) -> PipelineResult {
        if !paper.has_title() {
            let verdict = Verdict::reject("missing required field: title", Confidence::High);
            return PipelineResult {
                paper: paper.clone(),
                is_relevant: false,
                reason: verdict.reason.clone(),
                confidence: verdict.confidence,
                stage: INPUT_STAGE.to_string(),
                verdicts: vec![StageVerdict {
                    stage: INPUT_STAGE.to_string(),
                    verdict,
                }],
            };
        }

        let mut verdicts = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            let verdict = filter.evaluate(paper, config);
            let stage = filter.name().to_string();
            if !verdict.is_relevant {
                let reason = verdict.reason.clone();
                let confidence = verdict.confidence;
                verdicts.push(StageVerdict {
                    stage: stage.clone(),
                    verdict,
                });
                return PipelineResult {
                    paper: paper.clone(),
                    is_relevant: false,
                    reason,
                    confidence,
                    stage,
                    verdicts,
                };
            }
            verdicts.push(StageVerdict { stage, verdict });
        }

        let (reason, confidence, stage) = verdicts
            .last()
            .map(|s| (s.verdict.reason.clone(), s.verdict.confidence, s.stage.clone()))
            .unwrap_or_else(|| {
                (
                    "no filters configured".to_string(),
                    Confidence::Low,
                    INPUT_STAGE.to_string(),
                )
            });
        PipelineResult {
            paper: paper.clone(),
            is_relevant: true,
            reason,
            confidence,
            stage,
            verdicts,
        }
    }

    /// Process papers sequentially, preserving input order.
    pub fn process_batch(&self, papers: &[Paper], config: &DomainConfig) -> Vec<PipelineResult> {
        self.process_batch_with_progress(papers, config, |_, _| {})
    }

    /// Sequential batch processing with a `(done, total)` progress callback.
    pub fn process_batch_with_progress<F>(
        &self,
        papers: &[Paper],
        config: &DomainConfig,
        mut progress: F,
    ) -> Vec<PipelineResult>
    where
        F: FnMut(usize, usize),
    {
        let total = papers.len();
        tracing::info!(total, domain = %config.domain_name, "filtering batch");
        let mut results = Vec::with_capacity(total);
        for (i, paper) in papers.iter().enumerate() {
            results.push(self.process(paper, config));
            progress(i + 1, total);
        }
        results
    }

    /// Fan the batch out across worker threads bounded by available
    /// parallelism. Results are reordered back to input order, so the
    /// output is indistinguishable from `process_batch`.
    pub fn process_batch_parallel(
        &self,
        papers: &[Paper],
        config: &DomainConfig,
    ) -> Vec<PipelineResult> {
        let workers = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
            .min(papers.len().max(1));
        if workers <= 1 {
            return self.process_batch(papers, config);
        }
        tracing::info!(total = papers.len(), workers, "filtering batch in parallel");

        let chunk_size = papers.len().div_ceil(workers);
        let mut collected = Vec::with_capacity(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = papers
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|paper| self.process(paper, config))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                match handle.join() {
                    Ok(batch) => collected.push(batch),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        });
        collected.into_iter().flatten().collect()
    }
}
