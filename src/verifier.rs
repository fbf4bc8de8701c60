//! Step verifier
//!
//! Judges whether a student's typed work and/or photo completes the expected
//! step of an active plan. The question and answer shape are pluggable; the
//! pass rule is the same for every format.

mod verdict;

pub use verdict::{JsonVerdict, Verdict, VerdictFormat, VerdictFormatKind};

use crate::llm::{ContentBlock, LlmError, LlmRequest, ResponseFormat};
use crate::runtime::LlmClient;
use crate::state_machine::{ImageData, VerificationOutcome};
use crate::subject::Subject;
use crate::system_prompt::subject_persona;
use thiserror::Error;

pub const DEFAULT_PASS_CONFIDENCE: u8 = 60;

/// Placeholder used when the student sent only a photo
const NO_TEXT: &str = "(none)";

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verifier backend failed: {0}")]
    Backend(#[from] LlmError),
    #[error("verifier returned malformed output: {0}")]
    Malformed(String),
}

/// A submission passes when the backend says it matches, or when its
/// confidence reaches the threshold even though it said no
pub fn passes(verdict: &Verdict, pass_confidence: u8) -> bool {
    verdict.is_match || verdict.confidence >= pass_confidence
}

pub struct StepVerifier {
    format: Box<dyn VerdictFormat>,
    pass_confidence: u8,
}

impl StepVerifier {
    pub fn new(format: Box<dyn VerdictFormat>, pass_confidence: u8) -> Self {
        Self {
            format,
            pass_confidence: pass_confidence.min(100),
        }
    }

    pub fn pass_confidence(&self) -> u8 {
        self.pass_confidence
    }

    pub fn build_request(&self, expected_step: &str, submitted_text: &str, image: Option<&ImageData>) -> LlmRequest {
        let submitted = submitted_text.trim();
        let submitted = if submitted.is_empty() { NO_TEXT } else { submitted };

        let mut content = vec![ContentBlock::text(self.format.instruction(expected_step, submitted))];
        if let Some(image) = image {
            content.push(ContentBlock::Image {
                source: image.to_image_source(),
            });
        }

        let request = LlmRequest::user(content).with_system(subject_persona(Subject::Math));
        match self.format.response_format() {
            ResponseFormat::JsonObject => request.json_object(),
            ResponseFormat::Text => request,
        }
    }

    /// Ask the backend to judge one submission against the expected step
    pub async fn verify<L>(
        &self,
        llm: &L,
        expected_step: &str,
        submitted_text: &str,
        image: Option<&ImageData>,
    ) -> Result<VerificationOutcome, VerifyError>
    where
        L: LlmClient + ?Sized,
    {
        let request = self.build_request(expected_step, submitted_text, image);
        let response = llm.complete(&request).await?;
        let verdict = self.format.parse(&response.text())?;

        tracing::debug!(
            is_match = verdict.is_match,
            confidence = verdict.confidence,
            threshold = self.pass_confidence,
            "Step verdict"
        );

        Ok(VerificationOutcome {
            passed: passes(&verdict, self.pass_confidence),
            confidence: verdict.confidence,
            feedback: verdict.feedback,
        })
    }
}

impl Default for StepVerifier {
    fn default() -> Self {
        Self::new(Box::new(JsonVerdict), DEFAULT_PASS_CONFIDENCE)
    }
}
