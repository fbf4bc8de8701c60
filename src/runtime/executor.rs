//! Tutor runtime executor
//!
//! Loads the client's flow state, routes the message, performs at most one
//! backend call, feeds the result through the pure transition function and
//! applies the resulting effects.

use super::locks::ClientLocks;
use super::traits::{LlmClient, Storage};

use crate::llm::{ContentBlock, LlmMessage, LlmRequest, MessageRole, ResponseFormat, SystemContent};
use crate::planner;
use crate::state_machine::{
    off_topic_reply, route, transition, Effect, Event, FlowState, ImageData, Inbound, Route,
    EMPTY_MESSAGE_REPLY,
};
use crate::subject::Subject;
use crate::system_prompt::{image_question_prompt, subject_persona};
use crate::verifier::StepVerifier;
use chrono::Utc;
use serde::Serialize;

const GENERIC_FAILURE_REPLY: &str = "Something went wrong.";
const IMAGE_FAILURE_REPLY: &str = "Something went wrong processing the image.";
const NO_IMAGE_REPLY: &str = "No image uploaded.";
const NO_IMAGE_MATH_REPLY: &str = "No image uploaded. You can also type a math problem and include 'step by step'.";

/// Where a client stands in the step flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub active: bool,
    /// One-based number of the step awaiting work
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<usize>,
}

/// Session/flow manager shared by every request
pub struct TutorRuntime<S, L>
where
    S: Storage,
    L: LlmClient,
{
    storage: S,
    llm: L,
    verifier: StepVerifier,
    locks: ClientLocks,
}

impl<S, L> TutorRuntime<S, L>
where
    S: Storage,
    L: LlmClient,
{
    pub fn new(storage: S, llm: L, verifier: StepVerifier) -> Self {
        Self {
            storage,
            llm,
            verifier,
            locks: ClientLocks::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Handle one chat message and return the reply text
    pub async fn handle_message(
        &self,
        client_id: &str,
        subject: Subject,
        text: &str,
        image: Option<ImageData>,
    ) -> String {
        self.dispatch(client_id, subject, Inbound::text(text).with_image(image))
            .await
    }

    /// Handle the photo upload form, where the image is the main payload
    pub async fn handle_upload(
        &self,
        client_id: &str,
        subject: Subject,
        prompt: &str,
        image: Option<ImageData>,
    ) -> String {
        if image.is_none() {
            if subject != Subject::Math {
                return NO_IMAGE_REPLY.to_string();
            }
            if prompt.trim().is_empty() {
                return NO_IMAGE_MATH_REPLY.to_string();
            }
        }
        self.dispatch(client_id, subject, Inbound::upload(prompt, image))
            .await
    }

    pub async fn has_active_session(&self, client_id: &str) -> bool {
        self.load_state(client_id).await.is_active()
    }

    pub async fn session_status(&self, client_id: &str) -> SessionStatus {
        let state = self.load_state(client_id).await;
        match state.session() {
            Some(session) => SessionStatus {
                active: true,
                step: Some(session.step_number()),
                total_steps: Some(session.total_steps()),
            },
            None => SessionStatus {
                active: false,
                step: None,
                total_steps: None,
            },
        }
    }

    async fn dispatch(&self, client_id: &str, subject: Subject, inbound: Inbound) -> String {
        let _guard = self.locks.acquire(client_id).await;

        let state = self.load_state(client_id).await;
        let route = route(&state, subject, &inbound);
        tracing::debug!(
            client_id,
            %subject,
            state = state.name(),
            ?route,
            in_flight = self.locks.active(),
            "Routing message"
        );

        match route {
            Route::EmptyMessage => EMPTY_MESSAGE_REPLY.to_string(),
            Route::OffTopic => off_topic_reply(subject),
            Route::VerifyStep => self.verify_step(client_id, &state, &inbound).await,
            Route::StartPlan => self.start_plan(client_id, &state, &inbound).await,
            Route::AnswerImage => self.answer_image(subject, &inbound).await,
            Route::Chat => self.chat(client_id, subject, &inbound.text).await,
        }
    }

    async fn load_state(&self, client_id: &str) -> FlowState {
        match self.storage.load_session(client_id).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(client_id, error = %e, "Failed to load session");
                FlowState::Idle
            }
        }
    }

    async fn start_plan(&self, client_id: &str, state: &FlowState, inbound: &Inbound) -> String {
        let source = inbound.source();
        let event = match planner::plan(&self.llm, &inbound.text, inbound.image.as_ref()).await {
            Ok(plan) => Event::PlanReady {
                plan,
                source,
                received_at: Utc::now(),
            },
            Err(e) => {
                tracing::warn!(client_id, error = %e, "Planner failed");
                Event::PlanFailed { source }
            }
        };
        self.apply(client_id, state, event).await
    }

    async fn verify_step(&self, client_id: &str, state: &FlowState, inbound: &Inbound) -> String {
        let Some(session) = state.session() else {
            return GENERIC_FAILURE_REPLY.to_string();
        };

        let result = self
            .verifier
            .verify(
                &self.llm,
                session.expected_step(),
                &inbound.text,
                inbound.image.as_ref(),
            )
            .await;
        let event = match result {
            Ok(outcome) => Event::StepChecked { outcome },
            Err(e) => {
                tracing::warn!(client_id, step = session.step_number(), error = %e, "Verifier failed");
                Event::VerificationFailed
            }
        };
        self.apply(client_id, state, event).await
    }

    /// Run the transition and perform its storage effects
    async fn apply(&self, client_id: &str, state: &FlowState, event: Event) -> String {
        let result = match transition(state, event) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(client_id, error = %e, "Invalid flow transition");
                return GENERIC_FAILURE_REPLY.to_string();
            }
        };

        tracing::debug!(
            client_id,
            from = state.name(),
            to = result.new_state.name(),
            effects = result.effects.len(),
            "Flow transition"
        );

        for effect in result.effects {
            let outcome = match &effect {
                Effect::PersistSession { session } => {
                    tracing::info!(
                        client_id,
                        step = session.step_number(),
                        total_steps = session.total_steps(),
                        "Session at step"
                    );
                    self.storage.save_session(client_id, session).await
                }
                Effect::ClearSession => {
                    if let Some(session) = state.session() {
                        let elapsed = Utc::now().signed_duration_since(session.started_at());
                        tracing::info!(
                            client_id,
                            total_steps = session.total_steps(),
                            elapsed_secs = elapsed.num_seconds(),
                            "Session completed"
                        );
                    }
                    self.storage.clear_session(client_id).await
                }
            };
            if let Err(e) = outcome {
                tracing::error!(client_id, error = %e, ?effect, "Failed to apply effect");
            }
        }

        result.reply
    }

    async fn chat(&self, client_id: &str, subject: Subject, text: &str) -> String {
        let history = match self.storage.load_history(client_id, subject).await {
            Ok(history) => history,
            Err(e) => {
                tracing::error!(client_id, error = %e, "Failed to load history");
                return GENERIC_FAILURE_REPLY.to_string();
            }
        };

        let mut messages = history.to_llm_messages();
        messages.push(LlmMessage {
            role: MessageRole::User,
            content: vec![ContentBlock::text(text)],
        });
        let request = LlmRequest {
            system: vec![SystemContent::new(subject_persona(subject))],
            messages,
            response_format: ResponseFormat::Text,
            max_tokens: None,
        };

        let reply = match self.llm.complete(&request).await {
            Ok(response) => response.text().trim().to_string(),
            Err(e) => {
                tracing::warn!(client_id, %subject, error = %e, "Chat request failed");
                return GENERIC_FAILURE_REPLY.to_string();
            }
        };

        if let Err(e) = self
            .storage
            .record_exchange(client_id, subject, text, &reply)
            .await
        {
            tracing::error!(client_id, error = %e, "Failed to record history");
        }
        reply
    }

    /// One-shot vision answer for non-math pages; not kept in history
    async fn answer_image(&self, subject: Subject, inbound: &Inbound) -> String {
        let Some(image) = inbound.image.as_ref() else {
            return NO_IMAGE_REPLY.to_string();
        };

        let prompt = match inbound.text.trim() {
            "" => image_question_prompt(subject),
            text => text.to_string(),
        };
        let request = LlmRequest::user(vec![
            ContentBlock::text(prompt),
            ContentBlock::Image {
                source: image.to_image_source(),
            },
        ])
        .with_system(subject_persona(subject));

        match self.llm.complete(&request).await {
            Ok(response) => {
                let reply = response.text().trim().to_string();
                if reply.is_empty() {
                    format!(
                        "I couldn't read a clear {} question. Please upload a clearer image.",
                        subject.display_name()
                    )
                } else {
                    reply
                }
            }
            Err(e) => {
                tracing::warn!(%subject, error = %e, "Image question failed");
                IMAGE_FAILURE_REPLY.to_string()
            }
        }
    }
}
