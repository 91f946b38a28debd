//! Subcommand implementations.

use anyhow::Context;
use papersieve_core::classify::provider::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use papersieve_core::classify::{enrich_batch, ChatCompletionsLabeler, EnrichOptions};
use papersieve_core::export::{load_corpus, save_corpus, save_labeled, save_results};
use papersieve_core::fetch::{backfill, OpenAlexClient};
use papersieve_core::filters::Confidence;
use papersieve_core::{DomainConfig, FilterStats, Pipeline};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Filter papers, partitioning accepted / rejected / needs-review sets
    Filter {
        /// Input papers JSON file
        #[arg(short, long, default_value = "papers.json")]
        input: PathBuf,
        /// Output file for accepted papers; rejected and review sets derive
        /// their names from it
        #[arg(short, long, default_value = "papers_filtered.json")]
        output: PathBuf,
        /// Fan filtering out across worker threads
        #[arg(long)]
        parallel: bool,
        /// Print sample rejected papers per stage
        #[arg(long)]
        show_samples: bool,
    },
    /// Show statistics about a paper collection
    Stats {
        #[arg(short, long, default_value = "papers.json")]
        input: PathBuf,
    },
    /// Analyze rejection reasons with example papers
    Analyze {
        #[arg(short, long, default_value = "papers.json")]
        input: PathBuf,
        /// Example rejected papers kept per stage
        #[arg(long, default_value_t = 3)]
        samples: usize,
    },
    /// Classify papers into taxonomy labels with an LLM
    Classify {
        #[arg(short, long, default_value = "papers_filtered.json")]
        input: PathBuf,
        #[arg(short, long, default_value = "papers_classified.json")]
        output: PathBuf,
        /// OpenAI-compatible chat-completions endpoint
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        endpoint: String,
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
        /// Concurrent in-flight labeling calls
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        /// Per-call timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
        /// Classify at most this many papers (0 = all)
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
    /// Backfill missing metadata from OpenAlex
    Fetch {
        #[arg(short, long, default_value = "papers.json")]
        input: PathBuf,
        #[arg(short, long, default_value = "papers.json")]
        output: PathBuf,
        /// Contact address for the OpenAlex polite pool
        #[arg(long, default_value = "papersieve@example.com")]
        mailto: String,
        /// Fetch at most this many papers (0 = all missing)
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
}

pub async fn run(command: Commands, config: &DomainConfig) -> anyhow::Result<()> {
    match command {
        Commands::Filter {
            input,
            output,
            parallel,
            show_samples,
        } => filter(config, &input, &output, parallel, show_samples),
        Commands::Stats { input } => stats(&input),
        Commands::Analyze { input, samples } => analyze(config, &input, samples),
        Commands::Classify {
            input,
            output,
            endpoint,
            model,
            concurrency,
            timeout_secs,
            limit,
        } => {
            classify(
                &input,
                &output,
                &endpoint,
                &model,
                concurrency,
                timeout_secs,
                limit,
            )
            .await
        }
        Commands::Fetch {
            input,
            output,
            mailto,
            limit,
        } => fetch(&input, &output, &mailto, limit).await,
    }
}

/// Derive a sibling path: `papers_filtered.json` → `papers_filtered_rejected.json`.
fn sibling(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("papers_filtered");
    output.with_file_name(format!("{stem}_{suffix}.json"))
}

fn filter(
    config: &DomainConfig,
    input: &Path,
    output: &Path,
    parallel: bool,
    show_samples: bool,
) -> anyhow::Result<()> {
    let corpus = load_corpus(input).context("loading input papers")?;
    println!("Loaded {} papers from {}", corpus.papers.len(), input.display());

    let pipeline = Pipeline::new();
    let results = if parallel {
        pipeline.process_batch_parallel(&corpus.papers, config)
    } else {
        pipeline.process_batch_with_progress(&corpus.papers, config, |done, total| {
            if done % 100 == 0 || done == total {
                eprint!("  processed {done}/{total} papers\r");
            }
        })
    };
    if !parallel {
        eprintln!();
    }

    let stats = FilterStats::from_results(&results);
    println!("{}", stats.render());

    let accepted: Vec<_> = results.iter().filter(|r| r.is_relevant).cloned().collect();
    let rejected: Vec<_> = results.iter().filter(|r| !r.is_relevant).cloned().collect();
    let review: Vec<_> = accepted
        .iter()
        .filter(|r| r.confidence < Confidence::High)
        .cloned()
        .collect();

    let accepted_papers: Vec<_> = accepted.iter().map(|r| r.paper.clone()).collect();
    save_corpus(
        output,
        &accepted_papers,
        &corpus.keywords,
        Some("filtered to papers primarily about the target domain"),
    )?;
    println!("Saved {} accepted papers to {}", accepted_papers.len(), output.display());

    let rejected_path = sibling(output, "rejected");
    save_results(&rejected_path, &rejected)?;
    println!("Saved {} rejected papers to {}", rejected.len(), rejected_path.display());

    if !review.is_empty() {
        let review_path = sibling(output, "needs_review");
        save_results(&review_path, &review)?;
        println!(
            "Saved {} papers needing review to {}",
            review.len(),
            review_path.display()
        );
    }

    if show_samples {
        for (stage, examples) in &stats.examples_by_stage {
            println!("\nSample rejections at stage {stage}:");
            for example in examples {
                println!(
                    "  - {} ({}): {}",
                    example.title,
                    example.year.map_or("n/a".to_string(), |y| y.to_string()),
                    example.reason
                );
            }
        }
    }

    Ok(())
}

fn stats(input: &Path) -> anyhow::Result<()> {
    let corpus = load_corpus(input).context("loading input papers")?;
    let papers = &corpus.papers;
    println!("Total papers: {}", papers.len());
    if let Some(updated) = &corpus.updated {
        println!("Last updated: {updated}");
    }
    if papers.is_empty() {
        return Ok(());
    }

    let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();
    for paper in papers {
        if let Some(year) = paper.year {
            *by_year.entry(year).or_default() += 1;
        }
    }
    println!("\nPapers by year:");
    for (year, count) in by_year.iter().rev().take(10) {
        println!("  {year}: {count}");
    }

    let with_abstract = papers.iter().filter(|p| p.has_abstract()).count();
    let pct = with_abstract as f64 / papers.len() as f64 * 100.0;
    println!("\nWith abstract: {with_abstract} ({pct:.1}%)");
    println!(
        "Without abstract: {} ({:.1}%)",
        papers.len() - with_abstract,
        100.0 - pct
    );

    let mut by_venue: BTreeMap<&str, usize> = BTreeMap::new();
    for paper in papers {
        if let Some(venue) = paper.venue.as_deref() {
            *by_venue.entry(venue).or_default() += 1;
        }
    }
    let mut venues: Vec<_> = by_venue.into_iter().collect();
    venues.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    println!("\nTop venues:");
    for (venue, count) in venues.into_iter().take(10) {
        println!("  {count:4} - {venue}");
    }

    Ok(())
}

fn analyze(config: &DomainConfig, input: &Path, samples: usize) -> anyhow::Result<()> {
    let corpus = load_corpus(input).context("loading input papers")?;
    println!("Analyzing {} papers...", corpus.papers.len());

    let results = Pipeline::new().process_batch(&corpus.papers, config);
    let stats = FilterStats::with_sample_size(&results, samples);
    println!("{}", stats.render());

    println!("Rejections by stage and confidence:");
    for (stage, by_confidence) in &stats.rejected_by_stage {
        for (confidence, count) in by_confidence {
            println!("  {count:5} - {stage} ({confidence})");
        }
    }

    for (stage, examples) in &stats.examples_by_stage {
        println!("\n{stage} examples:");
        for example in examples {
            println!("  - {}: {}", example.title, example.reason);
        }
    }

    Ok(())
}

async fn classify(
    input: &Path,
    output: &Path,
    endpoint: &str,
    model: &str,
    concurrency: usize,
    timeout_secs: u64,
    limit: usize,
) -> anyhow::Result<()> {
    let api_key = std::env::var("PAPERSIEVE_API_KEY")
        .context("PAPERSIEVE_API_KEY environment variable not set")?;

    let corpus = load_corpus(input).context("loading input papers")?;
    let mut papers = corpus.papers;
    if limit > 0 && papers.len() > limit {
        papers.truncate(limit);
    }
    println!("Classifying {} papers with {model}", papers.len());

    let labeler = Arc::new(ChatCompletionsLabeler::new(endpoint, api_key, model));
    let options = EnrichOptions {
        max_concurrency: concurrency.max(1),
        timeout: Duration::from_secs(timeout_secs),
    };
    let report = enrich_batch(labeler, &papers, &options).await;

    let mut by_type: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut discarded = 0usize;
    for classification in &report.classifications {
        *by_type.entry(classification.paper_type.as_str()).or_default() += 1;
        if classification.labels == ["NONE"] {
            discarded += 1;
        }
    }

    save_labeled(output, &papers, &report.classifications)?;
    println!("Saved {} classified papers to {}", papers.len(), output.display());
    println!(
        "Labeled: {}, discarded (NONE): {discarded}, fallbacks: {}",
        papers.len() - discarded,
        report.fallbacks
    );
    println!("\nBy paper type:");
    for (paper_type, count) in &by_type {
        println!("  {paper_type}: {count}");
    }

    Ok(())
}

async fn fetch(input: &Path, output: &Path, mailto: &str, limit: usize) -> anyhow::Result<()> {
    let corpus = load_corpus(input).context("loading input papers")?;
    let mut papers = corpus.papers;
    let client = OpenAlexClient::new(mailto);
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();

    let mut fetched = 0usize;
    let mut misses = 0usize;
    for paper in papers.iter_mut().filter(|p| !p.has_abstract()) {
        if limit > 0 && fetched + misses >= limit {
            break;
        }
        match client.search_by_title(&paper.title).await {
            Ok(Some(metadata)) => {
                backfill(paper, &metadata);
                if paper.first_seen.is_empty() {
                    paper.first_seen = today.clone();
                }
                fetched += 1;
            }
            Ok(None) => {
                misses += 1;
                tracing::debug!(title = %paper.title, "no OpenAlex match");
            }
            Err(error) => {
                misses += 1;
                tracing::warn!(title = %paper.title, %error, "metadata fetch failed");
            }
        }
    }

    save_corpus(output, &papers, &corpus.keywords, corpus.note.as_deref())?;
    println!("Backfilled {fetched} papers ({misses} without a match); saved to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_paths() {
        let output = PathBuf::from("out/papers_filtered.json");
        assert_eq!(
            sibling(&output, "rejected"),
            PathBuf::from("out/papers_filtered_rejected.json")
        );
        assert_eq!(
            sibling(&output, "needs_review"),
            PathBuf::from("out/papers_filtered_needs_review.json")
        );
    }
}
