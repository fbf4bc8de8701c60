//! Verdict formats the verifier can ask for and parse

use super::VerifyError;
use crate::llm::{parse_json_object, value_to_text, ResponseFormat};
use crate::system_prompt::{verifier_json_instruction, verifier_yes_no_instruction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// The backend's judgement of one submission, before the pass rule is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_match: bool,
    /// 0..=100
    pub confidence: u8,
    pub feedback: String,
}

/// How the verifier phrases its question and reads the answer
pub trait VerdictFormat: Send + Sync {
    fn instruction(&self, expected_step: &str, submitted: &str) -> String;

    fn response_format(&self) -> ResponseFormat;

    fn parse(&self, text: &str) -> Result<Verdict, VerifyError>;
}

/// `{"is_match": bool, "confidence": number, "feedback": string}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonVerdict;

impl VerdictFormat for JsonVerdict {
    fn instruction(&self, expected_step: &str, submitted: &str) -> String {
        verifier_json_instruction(expected_step, submitted)
    }

    fn response_format(&self) -> ResponseFormat {
        ResponseFormat::JsonObject
    }

    fn parse(&self, text: &str) -> Result<Verdict, VerifyError> {
        let payload = parse_json_object(text)
            .ok_or_else(|| VerifyError::Malformed("verdict is not a JSON object".to_string()))?;

        Ok(Verdict {
            is_match: payload.get("is_match").and_then(Value::as_bool).unwrap_or(false),
            confidence: payload.get("confidence").map_or(0, parse_confidence),
            feedback: payload
                .get("feedback")
                .map(|v| value_to_text(v).trim().to_string())
                .unwrap_or_default(),
        })
    }
}

/// Reply starts with YES or NO, followed by a sentence of feedback
#[derive(Debug, Clone, Copy, Default)]
pub struct YesNoVerdict;

impl VerdictFormat for YesNoVerdict {
    fn instruction(&self, expected_step: &str, submitted: &str) -> String {
        verifier_yes_no_instruction(expected_step, submitted)
    }

    fn response_format(&self) -> ResponseFormat {
        ResponseFormat::Text
    }

    fn parse(&self, text: &str) -> Result<Verdict, VerifyError> {
        let trimmed = text.trim_start();
        let word_end = trimmed
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        let (word, rest) = trimmed.split_at(word_end);

        let is_match = match word.to_ascii_uppercase().as_str() {
            "YES" => true,
            "NO" => false,
            _ => return Err(VerifyError::Malformed(format!("expected YES or NO, got {word:?}"))),
        };

        Ok(Verdict {
            is_match,
            confidence: if is_match { 100 } else { 0 },
            feedback: rest
                .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ',' | ':' | '-' | '!'))
                .trim_end()
                .to_string(),
        })
    }
}

/// Truncate a JSON number into 0..=100; strings, booleans and the rest are 0
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_confidence(value: &Value) -> u8 {
    match value.as_f64() {
        Some(v) if v.is_finite() => v.clamp(0.0, 100.0).trunc() as u8,
        _ => 0,
    }
}

/// Configurable choice of verdict format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictFormatKind {
    #[default]
    Json,
    YesNo,
}

impl VerdictFormatKind {
    pub fn build(self) -> Box<dyn VerdictFormat> {
        match self {
            VerdictFormatKind::Json => Box::new(JsonVerdict),
            VerdictFormatKind::YesNo => Box::new(YesNoVerdict),
        }
    }
}

impl FromStr for VerdictFormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(VerdictFormatKind::Json),
            "yes_no" | "yesno" => Ok(VerdictFormatKind::YesNo),
            other => Err(format!("unknown verdict format: {other}")),
        }
    }
}
