//! Diagnosis Extractor
//!
//! Two chat completions over the same conversation:
//!
//! 1. the four prefix turns alone, answered in free text (the model connects
//!    symptoms and findings);
//! 2. the prefix, that answer, and the refinement instruction, with the model
//!    forced to call `process_diagnoses` with an array of strings.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::agents::prompt::REFINEMENT_INSTRUCTION;
use crate::llm::provider::LLMAdapter;
use crate::types::{
    AppError, AppResult, FunctionSchema, LLMMessage, LLMRequest, ResponseContent,
};

pub const PROCESS_DIAGNOSES: &str = "process_diagnoses";
pub const MAX_TOKENS: u32 = 500;
pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Deserialize)]
struct DiagnosesArguments {
    diagnoses: Vec<String>,
}

pub struct DiagnosisExtractor<'a> {
    llm: &'a dyn LLMAdapter,
    model: String,
}

impl<'a> DiagnosisExtractor<'a> {
    pub fn new(llm: &'a dyn LLMAdapter, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Schema of the single function the second request must call
    pub fn diagnoses_schema() -> FunctionSchema {
        FunctionSchema {
            name: PROCESS_DIAGNOSES.to_string(),
            description: "Processes and filters diagnoses".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "diagnoses": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "A list of diagnoses to process."
                    }
                },
                "required": ["diagnoses"]
            }),
        }
    }

    fn request(&self, messages: Vec<LLMMessage>, forced: bool) -> LLMRequest {
        let (functions, forced_function) = if forced {
            (vec![Self::diagnoses_schema()], Some(PROCESS_DIAGNOSES.to_string()))
        } else {
            (Vec::new(), None)
        };

        LLMRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
            functions,
            forced_function,
        }
    }

    /// Run both requests and return the diagnoses in model order.
    pub async fn extract(&self, prefix: &[LLMMessage]) -> AppResult<Vec<String>> {
        info!(turns = prefix.len(), model = %self.model, "Requesting diagnostic reasoning");

        let first = self
            .llm
            .create_chat_completion(&self.request(prefix.to_vec(), false))
            .await?;
        let reasoning = match first.content {
            ResponseContent::FreeText(text) => text.trim().to_string(),
            ResponseContent::StructuredCall { name, .. } => {
                return Err(AppError::Parse(format!(
                    "expected a free-text reply, model called '{}'",
                    name
                )))
            }
        };
        debug!(reasoning_len = reasoning.len(), "Received diagnostic reasoning");

        let mut messages = prefix.to_vec();
        messages.push(LLMMessage::assistant(reasoning));
        messages.push(LLMMessage::user(REFINEMENT_INSTRUCTION));

        let second = self
            .llm
            .create_chat_completion(&self.request(messages, true))
            .await?;
        let arguments = match second.content {
            ResponseContent::StructuredCall { name, arguments } if name == PROCESS_DIAGNOSES => {
                arguments
            }
            ResponseContent::StructuredCall { name, .. } => {
                return Err(AppError::Parse(format!(
                    "model called unexpected function '{}'",
                    name
                )))
            }
            ResponseContent::FreeText(_) => {
                return Err(AppError::Parse(format!(
                    "model answered in free text instead of calling '{}'",
                    PROCESS_DIAGNOSES
                )))
            }
        };

        let diagnoses = parse_diagnoses(&arguments)?;
        info!(count = diagnoses.len(), "Extracted diagnoses");
        Ok(diagnoses)
    }
}

/// Decode `{"diagnoses": [...]}`, trimming entries and dropping blank ones.
pub fn parse_diagnoses(arguments: &str) -> AppResult<Vec<String>> {
    let parsed: DiagnosesArguments = serde_json::from_str(arguments)
        .map_err(|e| AppError::Parse(format!("invalid {} arguments: {}", PROCESS_DIAGNOSES, e)))?;

    Ok(parsed
        .diagnoses
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::prompt::conversation_prefix;
    use crate::types::{LLMResponse, Role, TokenUsage};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request
    struct ScriptedLLM {
        responses: Mutex<VecDeque<ResponseContent>>,
        requests: Mutex<Vec<LLMRequest>>,
    }

    impl ScriptedLLM {
        fn new(responses: Vec<ResponseContent>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMAdapter for ScriptedLLM {
        async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra request");
            Ok(LLMResponse {
                content,
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            })
        }
    }

    fn call(arguments: &str) -> ResponseContent {
        ResponseContent::StructuredCall {
            name: PROCESS_DIAGNOSES.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[tokio::test]
    async fn test_two_call_turn_partitioning() {
        let llm = ScriptedLLM::new(vec![
            ResponseContent::FreeText("  Orthostatic intolerance, neuropathic pain.  ".to_string()),
            call(r#"{"diagnoses": ["Fabry disease", "POTS"]}"#),
        ]);
        let prefix = conversation_prefix("Patient history");

        let diagnoses = DiagnosisExtractor::new(&llm, "gpt-4o-2024-11-20")
            .extract(&prefix)
            .await
            .unwrap();
        assert_eq!(diagnoses, vec!["Fabry disease", "POTS"]);

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);

        let first = &requests[0];
        assert_eq!(first.messages, prefix);
        assert!(first.functions.is_empty());
        assert!(first.forced_function.is_none());
        assert_eq!(first.max_tokens, Some(500));
        assert_eq!(first.temperature, Some(0.7));

        let second = &requests[1];
        assert_eq!(second.messages.len(), 6);
        assert_eq!(&second.messages[..4], &prefix[..]);
        assert_eq!(second.messages[4].role, Role::Assistant);
        assert_eq!(second.messages[4].content, "Orthostatic intolerance, neuropathic pain.");
        assert_eq!(second.messages[5].role, Role::User);
        assert_eq!(second.messages[5].content, REFINEMENT_INSTRUCTION);
        assert_eq!(second.functions, vec![DiagnosisExtractor::diagnoses_schema()]);
        assert_eq!(second.forced_function.as_deref(), Some(PROCESS_DIAGNOSES));
        assert_eq!(second.max_tokens, Some(500));
    }

    #[tokio::test]
    async fn test_output_is_trimmed_and_non_empty() {
        let llm = ScriptedLLM::new(vec![
            ResponseContent::FreeText("reasoning".to_string()),
            call(r#"{"diagnoses": ["  Ehlers-Danlos syndrome ", "", "   ", "\tMCAS\n", "POTS", "POTS"]}"#),
        ]);

        let diagnoses = DiagnosisExtractor::new(&llm, "model")
            .extract(&conversation_prefix("h"))
            .await
            .unwrap();

        assert_eq!(diagnoses, vec!["Ehlers-Danlos syndrome", "MCAS", "POTS", "POTS"]);
        assert!(diagnoses.iter().all(|d| !d.is_empty() && d.trim() == d));
    }

    #[tokio::test]
    async fn test_free_text_second_reply_is_parse_error() {
        let llm = ScriptedLLM::new(vec![
            ResponseContent::FreeText("reasoning".to_string()),
            ResponseContent::FreeText("1. Lupus".to_string()),
        ]);

        let err = DiagnosisExtractor::new(&llm, "model")
            .extract(&conversation_prefix("h"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[tokio::test]
    async fn test_wrong_function_is_parse_error() {
        let llm = ScriptedLLM::new(vec![
            ResponseContent::FreeText("reasoning".to_string()),
            ResponseContent::StructuredCall {
                name: "something_else".to_string(),
                arguments: r#"{"diagnoses": ["Lupus"]}"#.to_string(),
            },
        ]);

        let err = DiagnosisExtractor::new(&llm, "model")
            .extract(&conversation_prefix("h"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Parse(ref msg) if msg.contains("something_else")));
    }

    #[test]
    fn test_malformed_arguments_are_parse_errors() {
        for bad in ["{not json", r#"{"diagnosis": ["x"]}"#, r#"{"diagnoses": "POTS"}"#] {
            assert!(matches!(parse_diagnoses(bad), Err(AppError::Parse(_))), "{bad}");
        }
    }

    #[test]
    fn test_schema_declares_string_array() {
        let schema = DiagnosisExtractor::diagnoses_schema();
        assert_eq!(schema.parameters["properties"]["diagnoses"]["type"], "array");
        assert_eq!(schema.parameters["properties"]["diagnoses"]["items"]["type"], "string");
        assert_eq!(schema.parameters["required"][0], "diagnoses");
    }
}
