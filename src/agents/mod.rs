//! Agent System
//!
//! The stages that turn a patient history into PubMed records:
//!
//! - **Prompt**: builds the opening conversation from the history file
//! - **Diagnosis**: asks the LLM for candidate diagnoses
//! - **Literature**: searches PubMed per diagnosis and merges identifiers
//! - **Details**: fetches and renders the chosen field for every identifier
//!
//! ## Pipeline Overview
//!
//! ```text
//! history.md
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Prompt    │  → 4 seed turns
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Diagnosis  │  → free-text reasoning, then forced function call
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Literature  │  → one esearch per diagnosis, 1 s apart, then dedupe
//! └─────────────┘
//!      │
//!      ▼  (field chosen here)
//! ┌─────────────┐
//! │  Details    │  → one bulk efetch
//! └─────────────┘
//! ```

pub mod prompt;
pub mod diagnosis;
pub mod literature;
pub mod details;

// Re-export main components
pub use details::{DetailFetcher, FetchedDetails};
pub use diagnosis::DiagnosisExtractor;
pub use literature::{dedupe, DiagnosisHits, LiteratureSearcher, SearchProgress, SilentProgress};

use std::collections::HashSet;

use tracing::{error, info};

use crate::llm::provider::LLMAdapter;
use crate::models::RecordId;
use crate::search::LiteratureSource;
use crate::types::{AppError, AppResult, LLMMessage};
use crate::utils::pacing::Pacer;

/// Everything produced before the user picks a field
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub diagnoses: Vec<String>,
    pub hits: Vec<DiagnosisHits>,
    pub unique_ids: HashSet<RecordId>,
}

/// Result of the fetch stage. Only `Rendered` carries output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Rendered(FetchedDetails),
    /// The field selector was not recognised
    Rejected(String),
    /// The bulk fetch failed; nothing was rendered
    Failed(String),
}

/// Collaborators shared by all stages
pub struct DiagnosisPipeline<'a> {
    llm: &'a dyn LLMAdapter,
    source: &'a dyn LiteratureSource,
    pacer: &'a dyn Pacer,
    progress: &'a dyn SearchProgress,
    model: String,
    max_results: usize,
}

impl<'a> DiagnosisPipeline<'a> {
    pub fn new(
        llm: &'a dyn LLMAdapter,
        source: &'a dyn LiteratureSource,
        pacer: &'a dyn Pacer,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            source,
            pacer,
            progress: &SilentProgress,
            model: model.into(),
            max_results: literature::DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Report each stage of `search` as it happens
    pub fn with_progress(mut self, progress: &'a dyn SearchProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Extract diagnoses, search each one and merge the identifiers.
    /// LLM and parse failures abort; individual search failures do not.
    pub async fn search(&self, prefix: &[LLMMessage]) -> AppResult<SearchOutcome> {
        let diagnoses = DiagnosisExtractor::new(self.llm, self.model.clone())
            .extract(prefix)
            .await?;
        self.progress.diagnoses_extracted(&diagnoses);

        let hits = LiteratureSearcher::new(self.source, self.pacer)
            .with_max_results(self.max_results)
            .with_progress(self.progress)
            .search_all(&diagnoses)
            .await;

        let unique_ids = dedupe(&hits);
        info!(
            diagnoses = diagnoses.len(),
            unique = unique_ids.len(),
            "Literature searches complete"
        );

        Ok(SearchOutcome {
            diagnoses,
            hits,
            unique_ids,
        })
    }

    /// Fetch `field` for the merged identifiers. Never fails: rejection and
    /// transport problems are reported through the outcome.
    pub async fn fetch(&self, unique_ids: &HashSet<RecordId>, field: &str) -> FetchOutcome {
        match DetailFetcher::new(self.source).fetch(unique_ids, field).await {
            Ok(details) => FetchOutcome::Rendered(details),
            Err(AppError::Validation(message)) => {
                info!(field = %field.trim(), "Rejected field selector");
                FetchOutcome::Rejected(message)
            }
            Err(e) => {
                error!(error = %e, "Fetching details failed");
                FetchOutcome::Failed(e.to_string())
            }
        }
    }
}
