//! Short-term chat memory for the general Q&A assistant

use crate::llm::{ContentBlock, LlmMessage, MessageRole};
use std::collections::VecDeque;

/// Default number of turns kept per (client, subject)
pub const DEFAULT_HISTORY_CAP: usize = 12;

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn to_llm_message(&self) -> LlmMessage {
        LlmMessage {
            role: self.role,
            content: vec![ContentBlock::text(self.content.clone())],
        }
    }
}

/// Bounded log of turns; the oldest turns are dropped first once the cap is exceeded
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    cap: usize,
}

impl ConversationHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(cap.saturating_add(2)),
            cap,
        }
    }

    /// Append a turn and trim back to the cap
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        self.trim();
    }

    /// Append a completed user/assistant exchange
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.push(ConversationTurn::user(user));
        self.push(ConversationTurn::assistant(assistant));
    }

    fn trim(&mut self) {
        while self.turns.len() > self.cap {
            self.turns.pop_front();
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[cfg(test)]
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn to_llm_messages(&self) -> Vec<LlmMessage> {
        self.turns.iter().map(ConversationTurn::to_llm_message).collect()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
