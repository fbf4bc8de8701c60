//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the tutor flow with mock implementations.

use crate::history::ConversationHistory;
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use crate::state_machine::{FlowState, VerificationSession};
use crate::subject::Subject;
use async_trait::async_trait;
use std::sync::Arc;

/// Storage for each client's step-verification session
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current flow state; `Idle` when the client has no session
    async fn load_session(&self, client_id: &str) -> Result<FlowState, String>;

    /// Create or replace the client's session
    async fn save_session(&self, client_id: &str, session: &VerificationSession) -> Result<(), String>;

    /// Remove the client's session (no-op if absent)
    async fn clear_session(&self, client_id: &str) -> Result<(), String>;
}

/// Storage for rolling chat history, one log per (client, subject)
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Snapshot of the history; empty when unknown
    async fn load_history(&self, client_id: &str, subject: Subject) -> Result<ConversationHistory, String>;

    /// Append one user/assistant exchange, trimming to the store's cap
    async fn record_exchange(
        &self,
        client_id: &str,
        subject: Subject,
        user: &str,
        assistant: &str,
    ) -> Result<(), String>;
}

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Combined storage trait for convenience
pub trait Storage: SessionStore + HistoryStore {}
impl<T: SessionStore + HistoryStore> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn load_session(&self, client_id: &str) -> Result<FlowState, String> {
        (**self).load_session(client_id).await
    }

    async fn save_session(&self, client_id: &str, session: &VerificationSession) -> Result<(), String> {
        (**self).save_session(client_id, session).await
    }

    async fn clear_session(&self, client_id: &str) -> Result<(), String> {
        (**self).clear_session(client_id).await
    }
}

#[async_trait]
impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    async fn load_history(&self, client_id: &str, subject: Subject) -> Result<ConversationHistory, String> {
        (**self).load_history(client_id, subject).await
    }

    async fn record_exchange(
        &self,
        client_id: &str,
        subject: Subject,
        user: &str,
        assistant: &str,
    ) -> Result<(), String> {
        (**self).record_exchange(client_id, subject, user, assistant).await
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::llm::ModelRegistry;

/// Adapter to use ModelRegistry as LlmClient
pub struct RegistryLlmClient {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl RegistryLlmClient {
    pub fn new(registry: Arc<ModelRegistry>, model_id: String) -> Self {
        Self { registry, model_id }
    }
}

#[async_trait]
impl LlmClient for RegistryLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .registry
            .get(&self.model_id)
            .or_else(|| self.registry.default())
            .ok_or_else(|| LlmError::network("No LLM available"))?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
