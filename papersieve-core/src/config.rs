//! Domain configuration — the validated ruleset the filters consult.
//!
//! A `DomainConfig` is loaded once per run from a YAML document, validated
//! and normalized at the boundary, then shared read-only with every filter.
//! Swapping the document swaps the domain; nothing is mutated mid-run.

use crate::error::SieveError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_MODEL_EXTRACTION: &str = include_str!("../configs/model_extraction.yaml");

/// Numeric rule parameters shared by the filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Minimum combined core/required-term mentions for a MEDIUM accept.
    #[serde(default = "default_min_term_mentions")]
    pub min_term_mentions: usize,
    /// Absolute mention count above which a competing topic dominates.
    #[serde(default = "default_topic_dominance_threshold")]
    pub topic_dominance_threshold: usize,
    /// Competing-topic count must stay within this multiple of the target count.
    #[serde(default = "default_topic_dominance_ratio")]
    pub topic_dominance_ratio: f64,
    /// Context window width, in characters, around a keyword match.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Leading slice of the abstract treated as the first paragraph.
    #[serde(default = "default_first_paragraph_length")]
    pub first_paragraph_length: usize,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            min_term_mentions: default_min_term_mentions(),
            topic_dominance_threshold: default_topic_dominance_threshold(),
            topic_dominance_ratio: default_topic_dominance_ratio(),
            context_window: default_context_window(),
            first_paragraph_length: default_first_paragraph_length(),
        }
    }
}

fn default_min_term_mentions() -> usize {
    2
}

fn default_topic_dominance_threshold() -> usize {
    4
}

fn default_topic_dominance_ratio() -> f64 {
    2.0
}

fn default_context_window() -> usize {
    100
}

fn default_first_paragraph_length() -> usize {
    300
}

/// The ruleset defining one research topic.
///
/// Named groups use `BTreeMap` so iteration order, and therefore verdict
/// reasons, are deterministic for a fixed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    pub domain_name: String,
    /// Strong signals; presence in an abstract accepts outright.
    pub high_quality_keywords: Vec<String>,
    pub core_keywords: Vec<String>,
    /// Terms marking defenses against the target attack; waives topic
    /// dominance when the target topic is actually discussed.
    #[serde(default)]
    pub defense_keywords: Vec<String>,
    /// Known false-positive triggers needing abstract confirmation.
    #[serde(default)]
    pub problematic_keywords: Vec<String>,
    pub required_abstract_terms: Vec<String>,
    /// Each named group marks a different attack or topic entirely.
    pub exclusion_signals: BTreeMap<String, Vec<String>>,
    /// Each named group marks a different primary focus.
    pub other_topics: BTreeMap<String, Vec<String>>,
    /// Action words that count as a domain mention when the anchor word
    /// appears within the context window.
    #[serde(default)]
    pub compound_actions: Vec<String>,
    #[serde(default)]
    pub compound_anchor: Option<String>,
    #[serde(default)]
    pub rules: FilterRules,
    #[serde(skip)]
    compound_re: Option<Regex>,
}

impl DomainConfig {
    /// Parse, normalize, and validate a YAML ruleset.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SieveError> {
        let mut config: DomainConfig = serde_yaml::from_str(yaml)
            .map_err(|e| SieveError::config(format!("malformed domain configuration: {e}")))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load a ruleset from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SieveError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            SieveError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The built-in model-extraction ruleset.
    pub fn model_extraction() -> Result<Self, SieveError> {
        Self::from_yaml_str(BUILTIN_MODEL_EXTRACTION)
    }

    /// Word-start matcher over the configured action words, if any.
    pub fn compound_matcher(&self) -> Option<&Regex> {
        self.compound_re.as_ref()
    }

    /// Core and high-quality keywords, the terms that rescue an exclusion
    /// match when found nearby.
    pub fn domain_context_terms(&self) -> impl Iterator<Item = &String> {
        self.core_keywords
            .iter()
            .chain(self.high_quality_keywords.iter())
    }

    fn normalize(&mut self) {
        lowercase_all(&mut self.high_quality_keywords);
        lowercase_all(&mut self.core_keywords);
        lowercase_all(&mut self.defense_keywords);
        lowercase_all(&mut self.problematic_keywords);
        lowercase_all(&mut self.required_abstract_terms);
        lowercase_all(&mut self.compound_actions);
        for terms in self.exclusion_signals.values_mut() {
            lowercase_all(terms);
        }
        for terms in self.other_topics.values_mut() {
            lowercase_all(terms);
        }
        if let Some(anchor) = &mut self.compound_anchor {
            *anchor = anchor.trim().to_lowercase();
        }
        self.compound_re = if self.compound_actions.is_empty() {
            None
        } else {
            let alternation = self
                .compound_actions
                .iter()
                .map(|a| regex::escape(a))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"\b(?:{alternation})\w*")).ok()
        };
    }

    /// Fail fast on a missing or empty required section; a configuration
    /// error is fatal before any paper is processed.
    pub fn validate(&self) -> Result<(), SieveError> {
        if self.domain_name.trim().is_empty() {
            return Err(SieveError::config("domain_name must be non-empty"));
        }
        require_terms("high_quality_keywords", &self.high_quality_keywords)?;
        require_terms("core_keywords", &self.core_keywords)?;
        require_terms("required_abstract_terms", &self.required_abstract_terms)?;
        if self.exclusion_signals.is_empty() {
            return Err(SieveError::config(
                "exclusion_signals must define at least one group",
            ));
        }
        for (group, terms) in &self.exclusion_signals {
            require_terms(&format!("exclusion_signals.{group}"), terms)?;
        }
        if self.other_topics.is_empty() {
            return Err(SieveError::config(
                "other_topics must define at least one group",
            ));
        }
        for (topic, terms) in &self.other_topics {
            require_terms(&format!("other_topics.{topic}"), terms)?;
        }
        let rules = &self.rules;
        if rules.min_term_mentions == 0 {
            return Err(SieveError::config("rules.min_term_mentions must be >= 1"));
        }
        if rules.topic_dominance_ratio <= 0.0 {
            return Err(SieveError::config(
                "rules.topic_dominance_ratio must be positive",
            ));
        }
        if rules.context_window == 0 || rules.first_paragraph_length == 0 {
            return Err(SieveError::config(
                "rules.context_window and rules.first_paragraph_length must be positive",
            ));
        }
        Ok(())
    }
}

fn lowercase_all(terms: &mut [String]) {
    for term in terms {
        *term = term.trim().to_lowercase();
    }
}

fn require_terms(section: &str, terms: &[String]) -> Result<(), SieveError> {
    if terms.is_empty() {
        return Err(SieveError::config(format!(
            "required section {section} is missing or empty"
        )));
    }
    if terms.iter().any(|t| t.is_empty()) {
        return Err(SieveError::config(format!(
            "section {section} contains an empty term"
        )));
    }
    Ok(())
}
