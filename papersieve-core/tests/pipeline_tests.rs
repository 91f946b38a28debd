//! End-to-end pipeline scenarios over a realistic domain ruleset.

use papersieve_core::config::DomainConfig;
use papersieve_core::filters::Confidence;
use papersieve_core::paper::Paper;
use papersieve_core::pipeline::Pipeline;
use papersieve_core::stats::FilterStats;
use pretty_assertions::assert_eq;

fn config() -> DomainConfig {
    DomainConfig::from_yaml_str(
        r#"
domain_name: model_extraction
high_quality_keywords:
  - model extraction attack
  - model stealing attack
  - steal the model
core_keywords:
  - model extraction
  - model stealing
  - surrogate model
  - victim model
required_abstract_terms:
  - model extraction
  - model stealing
defense_keywords:
  - against model stealing
  - prevent model extraction
exclusion_signals:
  electromagnetic_side_channel:
    - electromagnetic
    - power analysis
  prompt_stealing:
    - prompt stealing
other_topics:
  watermarking:
    - watermarking
    - fingerprinting
  membership_inference:
    - membership inference
compound_actions: [steal, extract, clone]
compound_anchor: model
rules:
  min_term_mentions: 2
  topic_dominance_threshold: 4
  topic_dominance_ratio: 2.0
  context_window: 100
  first_paragraph_length: 300
"#,
    )
    .unwrap()
}

#[test]
fn accepts_canonical_extraction_paper() {
    let paper = Paper::new(
        "s1",
        "Stealing Machine Learning Models via Prediction APIs",
        Some(
            "We show a model extraction attack against prediction APIs. Our model \
             extraction attack needs few queries, and the model extraction attack \
             transfers across architectures."
                .into(),
        ),
    );
    let result = Pipeline::new().process(&paper, &config());
    assert!(result.is_relevant);
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.verdicts.len(), 3);
    assert!(result.verdicts.iter().all(|v| v.verdict.is_relevant));
}

#[test]
fn rejects_side_channel_paper_at_exclusion() {
    let paper = Paper::new(
        "s2",
        "EM Side-Channel Analysis of Neural Network Weights",
        Some(
            "We recover network weights by measuring electromagnetic emanations \
             from an embedded accelerator during inference."
                .into(),
        ),
    );
    let result = Pipeline::new().process(&paper, &config());
    assert!(!result.is_relevant);
    assert_eq!(result.stage, "exclusion");
    assert_eq!(result.confidence, Confidence::High);
    assert!(result.reason.contains("electromagnetic_side_channel"));
    // Short-circuit: later filters are neither run nor recorded.
    assert_eq!(result.verdicts.len(), 1);
}

#[test]
fn rejects_title_only_paper_at_relevance() {
    let paper = Paper::new("s3", "A Study of Model Stealing", None);
    let result = Pipeline::new().process(&paper, &config());
    assert!(!result.is_relevant);
    assert_eq!(result.stage, "relevance");
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.reason, "no abstract to verify relevance");
    assert_eq!(result.verdicts.len(), 2);
}

#[test]
fn rejects_watermarking_paper_at_topic_dominance() {
    let abstract_text = "Watermarking establishes ownership of neural networks. Our \
                         watermarking scheme embeds signals during training. We prove \
                         the watermarking survives fine-tuning, and compare watermarking \
                         overhead across models. Robust watermarking remains open. \
                         As motivation we note model extraction can strip such marks.";
    let paper = Paper::new("s4", "Robust Neural Watermarking", Some(abstract_text.into()));
    let result = Pipeline::new().process(&paper, &config());
    assert!(!result.is_relevant);
    assert_eq!(result.stage, "topic");
    assert_eq!(result.confidence, Confidence::Medium);
    assert!(result.reason.contains("watermarking"));
    assert!(result.reason.contains("5 mentions vs 1"));
}

#[test]
fn determinism_same_input_same_result() {
    let config = config();
    let pipeline = Pipeline::new();
    let paper = Paper::new(
        "d1",
        "Surrogates",
        Some("We build a surrogate model and study model extraction costs.".into()),
    );
    let first = pipeline.process(&paper, &config);
    let second = pipeline.process(&paper, &config);
    assert_eq!(first, second);
}

#[test]
fn missing_abstract_always_rejected() {
    let config = config();
    let pipeline = Pipeline::new();
    for title in [
        "Model Stealing at Scale",
        "Surrogate Construction",
        "Queries and Budgets",
    ] {
        let result = pipeline.process(&Paper::new("m", title, None), &config);
        assert!(!result.is_relevant);
        assert_eq!(result.stage, "relevance");
        assert_eq!(result.confidence, Confidence::High);
    }
}

#[test]
fn high_quality_keyword_accepts_high_when_not_excluded() {
    let paper = Paper::new(
        "h1",
        "Knockoffs",
        Some("This work shows how to steal the model behind an API.".into()),
    );
    let result = Pipeline::new().process(&paper, &config());
    assert!(result.is_relevant);
    let relevance = result
        .verdicts
        .iter()
        .find(|v| v.stage == "relevance")
        .unwrap();
    assert!(relevance.verdict.is_relevant);
    assert_eq!(relevance.verdict.confidence, Confidence::High);
}

#[test]
fn zero_target_terms_with_competing_topic_always_rejected() {
    // Passes relevance on core terms alone; required-term count is zero, so
    // any competing-topic mention dominates.
    let paper = Paper::new(
        "z1",
        "Inference Risks",
        Some(
            "We attack a victim model using a surrogate model, and relate our \
             findings to membership inference leakage."
                .into(),
        ),
    );
    let result = Pipeline::new().process(&paper, &config());
    assert!(!result.is_relevant);
    assert_eq!(result.stage, "topic");
    assert!(result.reason.contains("membership_inference"));
}

#[test]
fn missing_title_rejected_without_aborting_batch() {
    let papers = vec![
        Paper::new("t1", "", Some("A model extraction attack.".into())),
        Paper::new(
            "t2",
            "Extraction",
            Some("A model extraction attack on APIs. Model extraction scales.".into()),
        ),
    ];
    let results = Pipeline::new().process_batch(&papers, &config());
    assert_eq!(results.len(), 2);
    assert!(!results[0].is_relevant);
    assert_eq!(results[0].reason, "missing required field: title");
    assert!(results[1].is_relevant);
}

#[test]
fn parallel_batch_matches_sequential() {
    let config = config();
    let pipeline = Pipeline::new();
    let papers: Vec<Paper> = (0..10)
        .map(|i| {
            let abstract_text = match i % 4 {
                0 => Some("We present a model extraction attack on APIs.".to_string()),
                1 => Some("Electromagnetic measurements of accelerators.".to_string()),
                2 => None,
                _ => Some(format!(
                    "Watermarking watermarking watermarking watermarking watermarking \
                     study number {i} mentioning model extraction once."
                )),
            };
            Paper::new(format!("p{i}"), format!("Paper {i}"), abstract_text)
        })
        .collect();

    let sequential = pipeline.process_batch(&papers, &config);
    let parallel = pipeline.process_batch_parallel(&papers, &config);
    assert_eq!(sequential, parallel);
}

#[test]
fn stats_examples_are_deterministic() {
    let config = config();
    let pipeline = Pipeline::new();
    let papers: Vec<Paper> = (0..6)
        .map(|i| Paper::new(format!("n{i}"), format!("Untitled {i}"), None))
        .collect();
    let results = pipeline.process_batch(&papers, &config);
    let stats = FilterStats::with_sample_size(&results, 2);
    let examples = &stats.examples_by_stage["relevance"];
    assert_eq!(examples.len(), 2);
    assert_eq!(examples[0].paper_id, "n0");
    assert_eq!(examples[1].paper_id, "n1");
    assert_eq!(stats.excluded, 6);
}
