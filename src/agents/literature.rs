//! Literature Searcher
//!
//! Looks up every diagnosis in PubMed, one query at a time, and merges the
//! returned identifiers.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::models::RecordId;
use crate::search::LiteratureSource;
use crate::utils::pacing::Pacer;

pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Identifiers found for one diagnosis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisHits {
    pub diagnosis: String,
    pub ids: Vec<RecordId>,
    /// Cause of a failed query; `ids` is empty when set
    pub error: Option<String>,
}

impl DiagnosisHits {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Receives search progress as it happens
pub trait SearchProgress: Send + Sync {
    fn diagnoses_extracted(&self, _diagnoses: &[String]) {}

    fn searching(&self, _diagnosis: &str) {}

    fn searched(&self, _hits: &DiagnosisHits) {}
}

/// Reports nothing
pub struct SilentProgress;

impl SearchProgress for SilentProgress {}

pub struct LiteratureSearcher<'a> {
    source: &'a dyn LiteratureSource,
    pacer: &'a dyn Pacer,
    progress: &'a dyn SearchProgress,
    max_results: usize,
}

impl<'a> LiteratureSearcher<'a> {
    pub fn new(source: &'a dyn LiteratureSource, pacer: &'a dyn Pacer) -> Self {
        Self {
            source,
            pacer,
            progress: &SilentProgress,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn SearchProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Search each diagnosis in order. A failed query is recorded on its
    /// hits and contributes no identifiers; the pacer is awaited after every
    /// query either way.
    pub async fn search_all(&self, diagnoses: &[String]) -> Vec<DiagnosisHits> {
        let mut hits = Vec::with_capacity(diagnoses.len());

        for diagnosis in diagnoses {
            info!(diagnosis = %diagnosis, "Searching PubMed");
            self.progress.searching(diagnosis);

            let (ids, error) = match self.source.search_ids(diagnosis, self.max_results).await {
                Ok(ids) if ids.is_empty() => {
                    info!(diagnosis = %diagnosis, "No results found");
                    (ids, None)
                }
                Ok(ids) => {
                    info!(diagnosis = %diagnosis, count = ids.len(), "Found results");
                    (ids, None)
                }
                Err(e) => {
                    warn!(diagnosis = %diagnosis, error = %e, "PubMed search failed");
                    (Vec::new(), Some(e.to_string()))
                }
            };
            let result = DiagnosisHits {
                diagnosis: diagnosis.clone(),
                ids,
                error,
            };
            self.progress.searched(&result);
            hits.push(result);

            self.pacer.pause().await;
        }

        hits
    }
}

impl AsRef<[RecordId]> for DiagnosisHits {
    fn as_ref(&self) -> &[RecordId] {
        &self.ids
    }
}

/// Merge identifier lists into a set. Iteration order of the result is
/// unspecified.
pub fn dedupe<S: AsRef<[RecordId]>>(sequences: &[S]) -> HashSet<RecordId> {
    sequences
        .iter()
        .flat_map(|ids| ids.as_ref().iter().cloned())
        .collect()
}
