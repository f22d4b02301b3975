// Oxidized DX - from patient history to candidate diagnoses and PubMed literature

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod llm;
pub mod search;    // NCBI Entrez E-utilities (PubMed)
pub mod utils;

// Re-exports for convenience
pub use agents::{DiagnosisPipeline, FetchOutcome, SearchOutcome};
pub use config::Config;
pub use types::{AppError, AppResult};
