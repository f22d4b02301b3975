//! Prompt Assembler
//!
//! Seeds the diagnosis conversation: a system prompt, one canned
//! user/assistant exchange, and the patient history read from disk.

use std::path::Path;

use tracing::info;

use crate::types::{AppError, AppResult, LLMMessage};

pub const SYSTEM_PROMPT: &str = "You are an expert system trained to analyze patient medical history and provide diagnostic insights. FOLLOW THE INSTRUCTIONS GIVEN EXACTLY";

pub const KEYWORD_INSTRUCTION: &str = "I am going to give you a detailed documentation about a particular patient's medical history. Create a list of keywords that you think are the most important to make a diagnosis. Understand that the patient is facing a chronic disease and therefore current doctors aren't able to diagnose him. This is because they aren't able to think outside the box. These keywords will be used to search medical literature later on for possible diagnoses";

pub const CANNED_ASSISTANT_REPLY: &str = "Please share the detailed documentation of the patient’s medical history. I'll analyze it to extract the most relevant and unique keywords based on symptoms, history, lab findings, and other factors. The focus will be on identifying uncommon or overlooked patterns that might be crucial for diagnosis. Once you provide the information, I'll return a comprehensive list of keywords";

/// Sent only with the second, function-constrained request
pub const REFINEMENT_INSTRUCTION: &str = "Based on all these connections, come up with 15 diagnoses that can explain these issue. Ensure that 5 are realistic and pragmatic. While the other 10 are as out of the box as possible. You MUST make some creative connections and therefore ensure that the diagnoses are wide enough and different enough to be mutually exclusive";

/// Read the patient history at `path` and build the four opening turns.
pub async fn assemble(path: impl AsRef<Path>) -> AppResult<Vec<LLMMessage>> {
    let path = path.as_ref();
    let history = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::FileAccess {
            path: path.display().to_string(),
            source,
        })?;
    let history = history.trim();

    info!(path = %path.display(), history_len = history.len(), "Loaded patient history");

    Ok(conversation_prefix(history))
}

/// The four opening turns around an already loaded history
pub fn conversation_prefix(history: &str) -> Vec<LLMMessage> {
    vec![
        LLMMessage::system(SYSTEM_PROMPT),
        LLMMessage::user(KEYWORD_INSTRUCTION),
        LLMMessage::assistant(CANNED_ASSISTANT_REPLY),
        LLMMessage::user(history),
    ]
}
