//! Environment-driven configuration
//!
//! Every value has a default; only values that are present but invalid stop
//! startup.

use crate::history::DEFAULT_HISTORY_CAP;
use crate::llm::LlmConfig;
use crate::runtime::EvictionPolicy;
use crate::verifier::{VerdictFormatKind, DEFAULT_PASS_CONFIDENCE};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub port: u16,
    pub history_cap: usize,
    pub pass_confidence: u8,
    pub verdict_format: VerdictFormatKind,
    pub eviction: EvictionPolicy,
    pub llm: LlmConfig,
}

impl TutorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.llm = LlmConfig::from_env();
        Ok(config)
    }

    /// Build from an arbitrary variable source; backend credentials are left empty
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = EvictionPolicy::default();

        let port = parse_var(&lookup, "TUTOR_PORT")?.unwrap_or(DEFAULT_PORT);
        let history_cap: usize = parse_var(&lookup, "TUTOR_HISTORY_CAP")?.unwrap_or(DEFAULT_HISTORY_CAP);
        if history_cap == 0 {
            return Err(invalid("TUTOR_HISTORY_CAP", "0", "must be at least 1"));
        }

        let pass_confidence: u8 = parse_var(&lookup, "TUTOR_PASS_CONFIDENCE")?.unwrap_or(DEFAULT_PASS_CONFIDENCE);
        if pass_confidence > 100 {
            return Err(invalid(
                "TUTOR_PASS_CONFIDENCE",
                &pass_confidence.to_string(),
                "must be between 0 and 100",
            ));
        }

        let verdict_format = parse_var(&lookup, "TUTOR_VERDICT_FORMAT")?.unwrap_or_default();

        // 0 disables idle expiry
        let ttl = match parse_var::<u64>(&lookup, "TUTOR_SESSION_TTL_SECS")? {
            Some(0) => Duration::MAX,
            Some(secs) => Duration::from_secs(secs),
            None => defaults.ttl,
        };
        let max_entries: usize = parse_var(&lookup, "TUTOR_MAX_CLIENTS")?.unwrap_or(defaults.max_entries);
        if max_entries == 0 {
            return Err(invalid("TUTOR_MAX_CLIENTS", "0", "must be at least 1"));
        }

        Ok(Self {
            port,
            history_cap,
            pass_confidence,
            verdict_format,
            eviction: EvictionPolicy { ttl, max_entries },
            llm: LlmConfig::default(),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|e: T::Err| invalid(var, trimmed, &e.to_string()))
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
