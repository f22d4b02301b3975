use async_trait::async_trait;
use crate::config::LLMConfig;
use crate::llm::openai::OpenAIAdapter;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Configuration for an LLM provider
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    pub api_base: Option<String>,
}

impl From<&LLMConfig> for LLMProviderConfig {
    fn from(config: &LLMConfig) -> Self {
        Self {
            name: config.provider.clone(),
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
        }
    }
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider_name: String,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        // Every supported provider speaks the OpenAI chat-completions dialect,
        // including tool calls; they differ only in endpoint.
        let default_base = match provider.name.as_str() {
            "openai" => OPENAI_API_BASE,
            "openrouter" => OPENROUTER_API_BASE,
            "groq" => GROQ_API_BASE,
            other => {
                return Err(AppError::Configuration(format!(
                    "Unsupported provider: {}",
                    other
                )))
            }
        };
        let api_base = provider.api_base.as_deref().unwrap_or(default_base);

        Ok(Self {
            adapter: Box::new(OpenAIAdapter::new_with_api_base(&provider.api_key, api_base)),
            provider_name: provider.name,
        })
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }
}

#[async_trait]
impl LLMAdapter for LLM {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}
