//! Tutoring subjects
//!
//! A subject is chosen per request from the page the student is on and is
//! never stored on its own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four fixed tutoring domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Math,
    Science,
    History,
    English,
}

impl Subject {
    /// All subjects in tie-break order
    pub const ALL: [Subject; 4] = [
        Subject::Math,
        Subject::Science,
        Subject::History,
        Subject::English,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Science => "science",
            Subject::History => "history",
            Subject::English => "english",
        }
    }

    /// Human-facing name used inside replies ("English" is capitalised)
    pub fn display_name(self) -> &'static str {
        match self {
            Subject::English => "English",
            other => other.as_str(),
        }
    }

    /// Resolve the subject from the path of the page that sent the request.
    ///
    /// `/science`, `/history` and `/english` select their subject; every
    /// other page (including `/`) is the math page.
    pub fn from_page_path(path: &str) -> Self {
        let path = path.trim_end_matches('/').to_ascii_lowercase();
        if path.ends_with("/science") {
            Subject::Science
        } else if path.ends_with("/history") {
            Subject::History
        } else if path.ends_with("/english") {
            Subject::English
        } else {
            Subject::Math
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_page_path() {
        assert_eq!(Subject::from_page_path("/science"), Subject::Science);
        assert_eq!(Subject::from_page_path("/History/"), Subject::History);
        assert_eq!(Subject::from_page_path("/app/english"), Subject::English);
        assert_eq!(Subject::from_page_path("/"), Subject::Math);
        assert_eq!(Subject::from_page_path(""), Subject::Math);
        assert_eq!(Subject::from_page_path("/sciences"), Subject::Math);
    }
}
