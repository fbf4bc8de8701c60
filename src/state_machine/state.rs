//! Step-verification flow state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decomposition of one math problem, produced once by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPlan {
    pub is_math: bool,
    /// Ordered, non-blank step instructions
    pub steps: Vec<String>,
    pub final_answer: String,
    /// Refusal text from the planner when `is_math` is false
    pub message: Option<String>,
}

impl StepPlan {
    /// Build a math plan, dropping steps that are blank after trimming
    pub fn math<I, S>(steps: I, final_answer: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            is_math: true,
            steps: steps
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            final_answer: final_answer.into().trim().to_string(),
            message: None,
        }
    }

    /// The input was not a math problem
    pub fn not_math(message: Option<String>) -> Self {
        Self {
            is_math: false,
            steps: vec![],
            final_answer: String::new(),
            message: message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()),
        }
    }
}

/// Progress of one client through a step plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    steps: Vec<String>,
    current_step: usize,
    final_answer: String,
    started_at: DateTime<Utc>,
}

impl VerificationSession {
    /// Start at the first step; `None` when the plan has nothing to verify
    pub fn start(plan: &StepPlan, started_at: DateTime<Utc>) -> Option<Self> {
        if !plan.is_math || plan.steps.is_empty() {
            return None;
        }
        Some(Self {
            steps: plan.steps.clone(),
            current_step: 0,
            final_answer: plan.final_answer.clone(),
            started_at,
        })
    }

    #[cfg(test)]
    pub fn current_index(&self) -> usize {
        self.current_step
    }

    /// One-based number of the step being verified
    pub fn step_number(&self) -> usize {
        self.current_step + 1
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn expected_step(&self) -> &str {
        &self.steps[self.current_step]
    }

    pub fn final_answer(&self) -> &str {
        &self.final_answer
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Move to the next step, or `None` when the current step was the last one
    pub fn advanced(&self) -> Option<Self> {
        let next = self.current_step + 1;
        if next >= self.steps.len() {
            return None;
        }
        Some(Self {
            current_step: next,
            ..self.clone()
        })
    }
}

/// Per-client flow state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Active { session: VerificationSession },
}

impl FlowState {
    pub fn from_session(session: Option<VerificationSession>) -> Self {
        match session {
            Some(session) => FlowState::Active { session },
            None => FlowState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, FlowState::Active { .. })
    }

    pub fn session(&self) -> Option<&VerificationSession> {
        match self {
            FlowState::Idle => None,
            FlowState::Active { session } => Some(session),
        }
    }

    /// Name for logs
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Active { .. } => "active",
        }
    }
}

/// Judgement of one submitted step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub passed: bool,
    /// 0-100
    pub confidence: u8,
    pub feedback: String,
}
