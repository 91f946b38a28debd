//! JSON corpus import/export — the envelope consumed by the static site
//! and by downstream pipeline stages.

use crate::classify::Classification;
use crate::error::SieveError;
use crate::filters::Confidence;
use crate::paper::Paper;
use crate::pipeline::PipelineResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A paper collection with its envelope metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Corpus {
    pub updated: Option<String>,
    pub total: Option<usize>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub papers: Vec<Paper>,
}

/// A paper with its deciding verdict flattened in, for rejected/review sets.
#[derive(Serialize)]
struct AnnotatedPaper<'a> {
    #[serde(flatten)]
    paper: &'a Paper,
    filter_reason: &'a str,
    filter_confidence: Confidence,
    filter_stage: &'a str,
}

/// An accepted paper with its normalized classification.
#[derive(Serialize)]
struct LabeledPaper<'a> {
    #[serde(flatten)]
    paper: &'a Paper,
    classification: &'a Classification,
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    updated: String,
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    papers: Vec<T>,
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SieveError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

/// Load a paper collection from a JSON file.
pub fn load_corpus(path: impl AsRef<Path>) -> Result<Corpus, SieveError> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| SieveError::invalid_input(format!("cannot open {}: {e}", path.display())))?;
    let corpus: Corpus = serde_json::from_reader(BufReader::new(file))?;
    tracing::info!(path = %path.display(), papers = corpus.papers.len(), "loaded corpus");
    Ok(corpus)
}

/// Save a paper collection with a fresh `updated` stamp.
pub fn save_corpus(
    path: impl AsRef<Path>,
    papers: &[Paper],
    keywords: &[String],
    note: Option<&str>,
) -> Result<(), SieveError> {
    let corpus = Corpus {
        updated: Some(today()),
        total: Some(papers.len()),
        keywords: keywords.to_vec(),
        note: note.map(str::to_string),
        papers: papers.to_vec(),
    };
    write_json(path.as_ref(), &corpus)
}

/// Save pipeline results with their deciding verdict flattened per paper.
pub fn save_results(
    path: impl AsRef<Path>,
    results: &[PipelineResult],
) -> Result<(), SieveError> {
    let annotated: Vec<AnnotatedPaper<'_>> = results
        .iter()
        .map(|r| AnnotatedPaper {
            paper: &r.paper,
            filter_reason: &r.reason,
            filter_confidence: r.confidence,
            filter_stage: &r.stage,
        })
        .collect();
    let envelope = Envelope {
        updated: today(),
        total: annotated.len(),
        note: None,
        papers: annotated,
    };
    write_json(path.as_ref(), &envelope)
}

/// Save accepted papers paired with their classifications.
///
/// The two slices must be parallel; extra entries on either side are an
/// input error.
pub fn save_labeled(
    path: impl AsRef<Path>,
    papers: &[Paper],
    classifications: &[Classification],
) -> Result<(), SieveError> {
    if papers.len() != classifications.len() {
        return Err(SieveError::invalid_input(format!(
            "{} papers but {} classifications",
            papers.len(),
            classifications.len()
        )));
    }
    let labeled: Vec<LabeledPaper<'_>> = papers
        .iter()
        .zip(classifications)
        .map(|(paper, classification)| LabeledPaper {
            paper,
            classification,
        })
        .collect();
    let envelope = Envelope {
        updated: today(),
        total: labeled.len(),
        note: None,
        papers: labeled,
    };
    write_json(path.as_ref(), &envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;
    use crate::pipeline::Pipeline;

    fn config() -> DomainConfig {
        DomainConfig::from_yaml_str(
            r#"
domain_name: model_extraction
high_quality_keywords: ["model extraction attack"]
core_keywords: ["model extraction"]
required_abstract_terms: ["model extraction"]
exclusion_signals:
  g: ["electromagnetic"]
other_topics:
  watermarking: ["watermark"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_corpus_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");
        let papers = vec![
            Paper::new("a", "First", Some("A model extraction attack.".into())),
            Paper::new("b", "Second", None),
        ];
        save_corpus(&path, &papers, &["model extraction".into()], Some("test set")).unwrap();

        let corpus = load_corpus(&path).unwrap();
        assert_eq!(corpus.total, Some(2));
        assert_eq!(corpus.papers, papers);
        assert_eq!(corpus.note.as_deref(), Some("test set"));
    }

    #[test]
    fn test_results_are_flattened_with_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rejected.json");
        let papers = vec![Paper::new("b", "No Abstract", None)];
        let results = Pipeline::new().process_batch(&papers, &config());
        save_results(&path, &results).unwrap();

        let raw: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        let entry = &raw["papers"][0];
        assert_eq!(entry["paper_id"], "b");
        assert_eq!(entry["filter_stage"], "relevance");
        assert_eq!(entry["filter_confidence"], "high");
    }

    #[test]
    fn test_labeled_length_mismatch_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labeled.json");
        let papers = vec![Paper::new("a", "T", None)];
        let err = save_labeled(&path, &papers, &[]).unwrap_err();
        assert!(matches!(err, SieveError::InvalidInput(_)));
    }

    #[test]
    fn test_missing_input_file_is_invalid_input() {
        let err = load_corpus("/nonexistent/papers.json").unwrap_err();
        assert!(matches!(err, SieveError::InvalidInput(_)));
    }
}
