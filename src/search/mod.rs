//! Search Module
//!
//! Literature lookup against NCBI Entrez E-utilities:
//! - `esearch` turns a free-text query into PubMed identifiers
//! - `efetch` retrieves records for a batch of identifiers, either as a plain
//!   identifier list or as PubMed XML parsed by [`medline`]

pub mod entrez;
pub mod medline;

pub use entrez::EntrezClient;
pub use medline::parse_medline_records;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::RecordId;
use crate::types::AppError;

/// Errors that can occur while talking to the literature database
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse search results: {0}")]
    ParseError(String),
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError::Transport(err.to_string())
    }
}

/// Output shape requested from the bulk fetch endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFormat {
    /// Newline-separated identifiers as plain text
    IdList,
    /// Full PubMed article set as XML
    MedlineXml,
}

impl FetchFormat {
    /// `(rettype, retmode)` pair understood by efetch
    pub fn entrez_params(self) -> (&'static str, &'static str) {
        match self {
            FetchFormat::IdList => ("uilist", "text"),
            FetchFormat::MedlineXml => ("medline", "xml"),
        }
    }
}

#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Identifiers of up to `max_results` records matching `query`.
    /// No matches is an empty vector, not an error.
    async fn search_ids(&self, query: &str, max_results: usize) -> Result<Vec<RecordId>, SearchError>;

    /// Raw response body for all `ids` in one request
    async fn fetch(&self, ids: &[RecordId], format: FetchFormat) -> Result<String, SearchError>;
}
