//! Inbound messages and backend results that drive the flow

use super::state::{StepPlan, VerificationOutcome};
use crate::llm::ImageSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// The planner produced a (possibly non-math or empty) plan
    PlanReady {
        plan: StepPlan,
        source: InputSource,
        received_at: DateTime<Utc>,
    },
    /// The planner call failed or returned something unparsable
    PlanFailed { source: InputSource },
    /// The verifier judged the submitted work
    StepChecked { outcome: VerificationOutcome },
    /// The verifier call failed or returned something unparsable
    VerificationFailed,
}

/// How the problem reached the planner; only affects reply wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Text,
    Image,
}

/// Image data attached to a message, already decoded from the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    /// Base64 payload
    pub data: String,
    pub media_type: String,
}

impl ImageData {
    pub fn to_image_source(&self) -> ImageSource {
        ImageSource::Base64 {
            media_type: self.media_type.clone(),
            data: self.data.clone(),
        }
    }
}

/// A student message as seen by the flow
#[derive(Debug, Clone, Default)]
pub struct Inbound {
    pub text: String,
    pub image: Option<ImageData>,
    /// Sent through the upload form: never topic-gated, and on the math page
    /// it plans without a trigger phrase
    pub from_upload: bool,
}

impl Inbound {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn upload(text: impl Into<String>, image: Option<ImageData>) -> Self {
        Self {
            text: text.into(),
            image,
            from_upload: true,
        }
    }

    pub fn with_image(mut self, image: Option<ImageData>) -> Self {
        self.image = image;
        self
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }

    pub fn source(&self) -> InputSource {
        if self.image.is_some() {
            InputSource::Image
        } else {
            InputSource::Text
        }
    }
}
