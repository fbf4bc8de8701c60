//! Problem planner
//!
//! Asks the reasoning backend, once, to turn a math problem (typed and/or
//! photographed) into short ordered steps plus a final answer.

use crate::llm::{parse_json_object, value_to_text, ContentBlock, LlmError, LlmRequest};
use crate::runtime::LlmClient;
use crate::state_machine::{ImageData, StepPlan};
use crate::subject::Subject;
use crate::system_prompt::{subject_persona, PLANNER_INSTRUCTION};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("planner backend failed: {0}")]
    Backend(#[from] LlmError),
    #[error("planner returned malformed output: {0}")]
    Malformed(String),
}

/// Build the single planning request
pub fn build_plan_request(prompt_text: &str, image: Option<&ImageData>) -> LlmRequest {
    let prompt_text = prompt_text.trim();
    let user_prompt = if prompt_text.is_empty() {
        "User prompt: (none)".to_string()
    } else {
        format!("User prompt: {prompt_text}")
    };

    let mut content = vec![ContentBlock::text(PLANNER_INSTRUCTION), ContentBlock::text(user_prompt)];
    if let Some(image) = image {
        content.push(ContentBlock::Image {
            source: image.to_image_source(),
        });
    }

    LlmRequest::user(content)
        .with_system(subject_persona(Subject::Math))
        .json_object()
}

/// Interpret the planner's structured reply.
///
/// A reply that is not a JSON object is an error. A well-formed object with
/// odd fields degrades instead: a non-list `steps` means no steps, and blank
/// steps are dropped.
pub fn parse_plan(text: &str) -> Result<StepPlan, PlanError> {
    let payload = parse_json_object(text)
        .ok_or_else(|| PlanError::Malformed(format!("expected a JSON object, got {} bytes", text.len())))?;

    let is_math = payload.get("is_math").and_then(Value::as_bool).unwrap_or(false);
    if !is_math {
        let message = payload.get("message").map(value_to_text);
        return Ok(StepPlan::not_math(message));
    }

    let steps: Vec<String> = match payload.get("steps") {
        Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
        _ => vec![],
    };
    let final_answer = payload.get("final_answer").map(value_to_text).unwrap_or_default();

    Ok(StepPlan::math(steps, final_answer))
}

/// Plan a problem from prompt text and/or an image
pub async fn plan<L>(llm: &L, prompt_text: &str, image: Option<&ImageData>) -> Result<StepPlan, PlanError>
where
    L: LlmClient + ?Sized,
{
    let request = build_plan_request(prompt_text, image);
    let response = llm.complete(&request).await?;
    parse_plan(&response.text())
}
