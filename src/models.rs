use std::str::FromStr;

use crate::types::AppError;

/// PubMed identifier (PMID), kept opaque
pub type RecordId = String;

/// One PubMed article reduced to the fields this tool reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub pmid: String,
    pub title: String,
    pub abstract_text: String,
}

/// Which details to fetch for the deduplicated identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchField {
    Pmid,
    Title,
    Abstract,
}

pub const INVALID_FIELD_MESSAGE: &str =
    "Invalid field. Please choose from 'pmid', 'title', or 'abstract'.";

impl FromStr for FetchField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pmid" => Ok(FetchField::Pmid),
            "title" => Ok(FetchField::Title),
            "abstract" => Ok(FetchField::Abstract),
            _ => Err(AppError::Validation(INVALID_FIELD_MESSAGE.to_string())),
        }
    }
}

impl std::fmt::Display for FetchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchField::Pmid => write!(f, "pmid"),
            FetchField::Title => write!(f, "title"),
            FetchField::Abstract => write!(f, "abstract"),
        }
    }
}
