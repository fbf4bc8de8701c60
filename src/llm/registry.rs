//! Model registry for managing available LLM providers

use super::{all_models, LlmService, LoggingService, Provider, ProviderOptions, RetryPolicy, RetryingService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Used when no `DEFAULT_MODEL` is configured and it is available
const PREFERRED_DEFAULT: &str = "gpt-4o-mini";

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Gateway URL that handles provider authentication
    pub gateway: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
    pub options: ProviderOptions,
    pub retry: RetryPolicy,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let defaults = RetryPolicy::default();
        let gateway = std::env::var("LLM_GATEWAY").ok();
        let timeout = env_parse("LLM_TIMEOUT_SECS").map_or(ProviderOptions::default().timeout, Duration::from_secs);
        Self {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            default_model: std::env::var("DEFAULT_MODEL").ok(),
            options: ProviderOptions {
                gateway: gateway.clone(),
                timeout,
            },
            gateway,
            retry: RetryPolicy {
                max_attempts: env_parse("LLM_RETRY_ATTEMPTS")
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(defaults.max_attempts)
                    .max(1),
                base_delay: env_parse("LLM_RETRY_BASE_MS").map_or(defaults.base_delay, Duration::from_millis),
            },
        }
    }
}

fn env_parse(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        for model_def in all_models() {
            if let Some(service) = Self::try_create_model(model_def, config) {
                services.insert(model_def.id.to_string(), service);
            }
        }

        let default_model = config
            .default_model
            .clone()
            .or_else(|| {
                if services.contains_key(PREFERRED_DEFAULT) {
                    Some(PREFERRED_DEFAULT.to_string())
                } else {
                    let mut ids: Vec<_> = services.keys().cloned().collect();
                    ids.sort();
                    ids.into_iter().next()
                }
            })
            .unwrap_or_else(|| PREFERRED_DEFAULT.to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Try to create a model service, validating prerequisites
    fn try_create_model(model_def: &super::ModelDef, config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
        // In gateway mode, use "implicit" as the API key
        // The gateway will handle the actual authentication
        let api_key = if config.gateway.is_some() {
            "implicit".to_string()
        } else {
            match model_def.provider {
                Provider::Anthropic => config.anthropic_api_key.as_ref()?,
                Provider::OpenAI => config.openai_api_key.as_ref()?,
            }
            .clone()
        };

        if config.gateway.is_none() && api_key.is_empty() {
            return None;
        }

        match (model_def.factory)(&api_key, &config.options) {
            Ok(service) => {
                tracing::debug!(
                    model = model_def.id,
                    description = model_def.description,
                    "Registered model"
                );
                // Log every attempt, retry outside of the logging layer
                let logged: Arc<dyn LlmService> = Arc::new(LoggingService::new(service));
                Some(Arc::new(RetryingService::new(logged, config.retry)))
            }
            Err(e) => {
                tracing::warn!(model = model_def.id, error = %e, "Skipping model");
                None
            }
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}
