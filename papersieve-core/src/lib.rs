//! # papersieve-core — paper curation pipeline
//!
//! Curates academic papers into security-taxonomy categories. The core of
//! the crate is the multi-stage relevance-filtering pipeline: independent,
//! composable filters over a shared decision contract, producing auditable
//! confidence-scored verdicts at corpus scale.
//!
//! Data flow: raw records → [`DomainConfig`] loaded once → each record
//! streamed through the [`Pipeline`] (exclusion → relevance → topic
//! dominance, short-circuiting on first rejection) → accepted records
//! optionally passed through classification enrichment → accepted and
//! labeled records serialized for export.
//!
//! Filters are pure in-memory text computations; only the enrichment stage
//! performs external I/O, behind a bounded worker pool with per-call
//! timeouts and a canonical fallback for unparseable responses.

pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filters;
pub mod paper;
pub mod pipeline;
pub mod stats;

pub use classify::{Classification, PaperType};
pub use config::{DomainConfig, FilterRules};
pub use error::SieveError;
pub use filters::{Confidence, PaperFilter, Verdict};
pub use paper::Paper;
pub use pipeline::{Pipeline, PipelineResult};
pub use stats::FilterStats;
