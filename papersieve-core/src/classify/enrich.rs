//! Bounded-concurrency enrichment of accepted papers.
//!
//! The labeler performs real external I/O and may hang or fail; every
//! failure mode degrades to the canonical fallback classification so a
//! batch never aborts on a single paper.

use crate::classify::{Classification, Labeler};
use crate::paper::Paper;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Concurrent in-flight labeling calls.
    pub max_concurrency: usize,
    /// Per-call timeout; expiry yields a fallback, not an error.
    pub timeout: Duration,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Classifications in input order, plus how many degraded to the fallback.
#[derive(Debug, Clone)]
pub struct EnrichReport {
    pub classifications: Vec<Classification>,
    pub fallbacks: usize,
}

/// Label a batch of accepted papers through a bounded worker pool.
/// Results are returned in input order regardless of completion order.
pub async fn enrich_batch(
    labeler: Arc<dyn Labeler>,
    papers: &[Paper],
    options: &EnrichOptions,
) -> EnrichReport {
    let semaphore = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let mut set = JoinSet::new();

    for (index, paper) in papers.iter().cloned().enumerate() {
        let labeler = Arc::clone(&labeler);
        let semaphore = Arc::clone(&semaphore);
        let timeout = options.timeout;
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let classification =
                match tokio::time::timeout(timeout, labeler.label(&paper)).await {
                    Ok(Ok(raw)) => Classification::parse_response(&raw, paper.has_abstract()),
                    Ok(Err(error)) => {
                        tracing::warn!(
                            paper_id = %paper.paper_id,
                            %error,
                            "labeling call failed, using fallback"
                        );
                        Classification::fallback(&error.to_string())
                    }
                    Err(_) => {
                        tracing::warn!(
                            paper_id = %paper.paper_id,
                            timeout_secs = timeout.as_secs(),
                            "labeling call timed out, using fallback"
                        );
                        Classification::fallback("labeling call timed out")
                    }
                };
            (index, classification)
        });
    }

    let mut slots: Vec<Option<Classification>> = vec![None; papers.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, classification)) => slots[index] = Some(classification),
            Err(error) => tracing::error!(%error, "enrichment task aborted"),
        }
    }

    let mut fallbacks = 0;
    let classifications: Vec<Classification> = slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Classification::fallback("enrichment task aborted")))
        .inspect(|c| {
            if c.is_fallback() {
                fallbacks += 1;
            }
        })
        .collect();

    tracing::info!(
        total = classifications.len(),
        fallbacks,
        "enrichment batch complete"
    );
    EnrichReport {
        classifications,
        fallbacks,
    }
}
