use crate::types::{AppError, AppResult};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_ENTREZ_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub prompt: PromptConfig,
}

#[derive(Clone)]
pub struct LLMConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub api_base: Option<String>,
}

// Keeps the credential out of log lines.
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub email: Option<String>,
    pub tool: String,
    pub api_key: Option<String>,
    pub max_results: usize,
}

#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub history_path: PathBuf,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = get("DIAGNOSIS_LLM_PROVIDER")
            .unwrap_or_else(|| "openai".to_string())
            .to_lowercase();
        let (key_var, default_model) = match provider.as_str() {
            "openai" => ("OPENAI_API_KEY", "gpt-4o-2024-11-20"),
            "openrouter" => ("OPENROUTER_API_KEY", "openai/gpt-4o-2024-11-20"),
            "groq" => ("GROQ_API_KEY", "llama-3.3-70b-versatile"),
            other => {
                return Err(AppError::Configuration(format!(
                    "Unsupported LLM provider '{}' (expected openai, openrouter or groq)",
                    other
                )))
            }
        };
        let api_key = get(key_var)
            .ok_or_else(|| AppError::Configuration(format!("{} must be set", key_var)))?;

        let max_results = match get("SEARCH_MAX_RESULTS") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                AppError::Configuration(format!("SEARCH_MAX_RESULTS '{}' is not a count: {}", raw, e))
            })?,
            None => 10,
        };

        Ok(Self {
            llm: LLMConfig {
                model: get("DIAGNOSIS_LLM_MODEL").unwrap_or_else(|| default_model.to_string()),
                provider,
                api_key,
                api_base: get("LLM_API_BASE"),
            },
            search: SearchConfig {
                base_url: get("ENTREZ_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_ENTREZ_BASE_URL.to_string()),
                email: get("ENTREZ_EMAIL"),
                tool: get("ENTREZ_TOOL").unwrap_or_else(|| "oxidized-dx".to_string()),
                api_key: get("NCBI_API_KEY"),
                max_results,
            },
            prompt: PromptConfig {
                history_path: get("PATIENT_HISTORY_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("history.md")),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_openai_key() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-2024-11-20");
        assert_eq!(config.llm.api_key, "sk-test");
        assert!(config.llm.api_base.is_none());
        assert_eq!(config.search.base_url, DEFAULT_ENTREZ_BASE_URL);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.search.tool, "oxidized-dx");
        assert_eq!(config.prompt.history_path, PathBuf::from("history.md"));
    }

    #[test]
    fn test_missing_credential_is_configuration_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, AppError::Configuration(ref msg) if msg.contains("OPENAI_API_KEY")));

        // Blank counts as missing
        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_provider_selects_credential_variable() {
        let config = Config::from_lookup(lookup(&[
            ("DIAGNOSIS_LLM_PROVIDER", "Groq"),
            ("GROQ_API_KEY", "gsk-test"),
        ]))
        .unwrap();
        assert_eq!(config.llm.provider, "groq");
        assert_eq!(config.llm.api_key, "gsk-test");

        let err = Config::from_lookup(lookup(&[
            ("DIAGNOSIS_LLM_PROVIDER", "openrouter"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(ref msg) if msg.contains("OPENROUTER_API_KEY")));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DIAGNOSIS_LLM_PROVIDER", "carrier-pigeon"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_search_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SEARCH_MAX_RESULTS", "25"),
            ("ENTREZ_EMAIL", "lab@example.org"),
            ("NCBI_API_KEY", "ncbi-key"),
        ]))
        .unwrap();
        assert_eq!(config.search.max_results, 25);
        assert_eq!(config.search.email.as_deref(), Some("lab@example.org"));
        assert_eq!(config.search.api_key.as_deref(), Some("ncbi-key"));

        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SEARCH_MAX_RESULTS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        let rendered = format!("{:?}", config.llm);
        assert!(!rendered.contains("sk-secret"));
    }
}
