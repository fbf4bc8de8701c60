//! Pure dispatch and state transition functions
//!
//! Neither function performs I/O: the runtime calls the planner or verifier
//! chosen by [`route`], then feeds the result back through [`transition`].

use super::event::{Event, Inbound, InputSource};
use super::state::{FlowState, VerificationSession};
use super::Effect;
use crate::classifier::{classify_relevance, wants_step_by_step};
use crate::subject::Subject;
use thiserror::Error;

pub const EMPTY_MESSAGE_REPLY: &str = "Please type a message.";

/// What the runtime should do with an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Nothing to do; reply without touching the backend
    EmptyMessage,
    /// Message belongs to another subject
    OffTopic,
    /// Treat the message as work for the active session's current step
    VerifyStep,
    /// Ask the planner to decompose the problem
    StartPlan,
    /// Answer a single image question on a non-math page
    AnswerImage,
    /// Plain subject chat with history
    Chat,
}

/// Decide how to handle a message.
///
/// An active session is checked before the topic gate: once a session is
/// open every message from that client, from any subject page, is a step
/// submission and can never be rejected as off-topic. Uploads skip the
/// topic gate altogether.
pub fn route(state: &FlowState, subject: Subject, inbound: &Inbound) -> Route {
    if inbound.is_blank() {
        return Route::EmptyMessage;
    }

    if state.is_active() {
        return Route::VerifyStep;
    }

    if !inbound.from_upload && !classify_relevance(&inbound.text, subject).allow {
        return Route::OffTopic;
    }

    if subject == Subject::Math
        && (inbound.from_upload || inbound.image.is_some() || wants_step_by_step(&inbound.text))
    {
        return Route::StartPlan;
    }

    if inbound.image.is_some() {
        return Route::AnswerImage;
    }

    Route::Chat
}

pub fn off_topic_reply(subject: Subject) -> String {
    let name = subject.display_name();
    let article = if name.starts_with(|c: char| "aeiouAEIOU".contains(c)) {
        "an"
    } else {
        "a"
    };
    format!("I only answer {name}-related questions on this page. Please ask {article} {name} question.")
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: FlowState,
    pub reply: String,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: FlowState, reply: impl Into<String>) -> Self {
        Self {
            new_state: state,
            reply: reply.into(),
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(state: &FlowState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Planning (Idle only)
        // ============================================================
        (FlowState::Idle, Event::PlanReady { plan, source, received_at }) => {
            if !plan.is_math {
                let reply = plan.message.unwrap_or_else(|| not_math_reply(source).to_string());
                return Ok(TransitionResult::new(FlowState::Idle, reply));
            }

            let Some(session) = VerificationSession::start(&plan, received_at) else {
                return Ok(TransitionResult::new(FlowState::Idle, no_steps_reply(source)));
            };

            let reply = format!(
                "Step 1: {}\n{}",
                session.expected_step(),
                match source {
                    InputSource::Text => "Send your work for this step by typing it or uploading a photo.",
                    InputSource::Image => "Do this step, then send your work by typing it or uploading a photo.",
                }
            );
            Ok(TransitionResult::new(
                FlowState::Active {
                    session: session.clone(),
                },
                reply,
            )
            .with_effect(Effect::PersistSession { session }))
        }

        (FlowState::Idle, Event::PlanFailed { source }) => {
            let reply = match source {
                InputSource::Text => "I couldn't start step-by-step mode right now. Please try again.",
                InputSource::Image => "Something went wrong processing the image. Please try again.",
            };
            Ok(TransitionResult::new(FlowState::Idle, reply))
        }

        // ============================================================
        // Step verification (Active only)
        // ============================================================
        (FlowState::Active { session }, Event::StepChecked { outcome }) if !outcome.passed => {
            let hint = non_empty_or(
                &outcome.feedback,
                "Try restating your work a little more clearly, or upload a photo.",
            );
            let reply = format!(
                "You're close, but I can't verify step {} yet.\nExpected idea: {}\n{hint}",
                session.step_number(),
                session.expected_step(),
            );
            Ok(TransitionResult::new(state.clone(), reply))
        }

        (FlowState::Active { session }, Event::StepChecked { outcome }) => {
            match session.advanced() {
                None => {
                    let final_answer = session.final_answer().trim();
                    let reply = if final_answer.is_empty() {
                        "Nice work. All steps are verified.".to_string()
                    } else {
                        format!("Nice work. All steps are verified.\nFinal answer: {final_answer}")
                    };
                    Ok(TransitionResult::new(FlowState::Idle, reply).with_effect(Effect::ClearSession))
                }
                Some(next) => {
                    let reply = format!(
                        "Step {} verified. {}\nStep {}: {}\nYou can type your work or upload a photo for this step.",
                        session.step_number(),
                        non_empty_or(&outcome.feedback, "Good work."),
                        next.step_number(),
                        next.expected_step(),
                    );
                    Ok(TransitionResult::new(
                        FlowState::Active {
                            session: next.clone(),
                        },
                        reply,
                    )
                    .with_effect(Effect::PersistSession { session: next }))
                }
            }
        }

        (FlowState::Active { .. }, Event::VerificationFailed) => Ok(TransitionResult::new(
            state.clone(),
            "I couldn't check that step right now. Please try again.",
        )),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {:?}",
            state.name(),
            event
        ))),
    }
}

fn not_math_reply(source: InputSource) -> &'static str {
    match source {
        InputSource::Text => "Please send a math problem.",
        InputSource::Image => "Please upload a math homework problem.",
    }
}

fn no_steps_reply(source: InputSource) -> &'static str {
    match source {
        InputSource::Text => "I couldn't build clear steps from that. Try typing the math problem more clearly.",
        InputSource::Image => "I couldn't read a clear math problem. Please upload a clearer image.",
    }
}

fn non_empty_or<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}
