//! Centralized model definitions for all LLM providers

use super::anthropic::AnthropicModel;
use super::openai::OpenAIModel;
use super::{AnthropicService, LlmService, OpenAIService, ProviderOptions};
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Factory building a provider service from an API key
pub type ServiceFactory = fn(&str, &ProviderOptions) -> Result<Arc<dyn LlmService>, String>;

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gpt-4o-mini")
    pub id: &'static str,
    pub provider: Provider,
    pub description: &'static str,
    pub factory: ServiceFactory,
}

fn openai(model: OpenAIModel, api_key: &str, options: &ProviderOptions) -> Result<Arc<dyn LlmService>, String> {
    if api_key.is_empty() {
        return Err(format!(
            "{} requires {} or gateway",
            model.model_id(),
            Provider::OpenAI.api_key_env_var()
        ));
    }
    Ok(Arc::new(OpenAIService::new(api_key.to_string(), model, options)?))
}

fn anthropic(
    model: AnthropicModel,
    api_key: &str,
    options: &ProviderOptions,
) -> Result<Arc<dyn LlmService>, String> {
    if api_key.is_empty() {
        return Err(format!(
            "{} requires {} or gateway",
            model.model_id(),
            Provider::Anthropic.api_key_env_var()
        ));
    }
    Ok(Arc::new(AnthropicService::new(api_key.to_string(), model, options)?))
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            description: "GPT-4o Mini (fast, multimodal)",
            factory: |api_key, options| openai(OpenAIModel::GPT4oMini, api_key, options),
        },
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            description: "GPT-4o (balanced, multimodal)",
            factory: |api_key, options| openai(OpenAIModel::GPT4o, api_key, options),
        },
        ModelDef {
            id: "o4-mini",
            provider: Provider::OpenAI,
            description: "O4-Mini (reasoning model)",
            factory: |api_key, options| openai(OpenAIModel::O4Mini, api_key, options),
        },
        ModelDef {
            id: "claude-4.5-haiku",
            provider: Provider::Anthropic,
            description: "Claude Haiku 4.5 (fast, efficient)",
            factory: |api_key, options| anthropic(AnthropicModel::Claude45Haiku, api_key, options),
        },
        ModelDef {
            id: "claude-4.5-sonnet",
            provider: Provider::Anthropic,
            description: "Claude Sonnet 4.5 (balanced performance)",
            factory: |api_key, options| anthropic(AnthropicModel::Claude45Sonnet, api_key, options),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_model_ids_unique() {
        let ids: HashSet<_> = all_models().iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), all_models().len());
    }

    #[test]
    fn test_factory_ids_match_definitions() {
        let options = ProviderOptions::default();
        for def in all_models() {
            let service = (def.factory)("key", &options).unwrap();
            assert_eq!(service.model_id(), def.id);
        }
    }

    #[test]
    fn test_factory_rejects_empty_key() {
        let options = ProviderOptions::default();
        for def in all_models() {
            let err = (def.factory)("", &options).err().unwrap();
            assert!(err.contains(def.provider.api_key_env_var()));
        }
    }
}
