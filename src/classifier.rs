//! Subject relevance gate
//!
//! A keyword scorer that decides whether a message belongs on the page's
//! subject. The gate is soft: ambiguous input is allowed, and a message is
//! only rejected when another subject clearly explains it better.

use crate::subject::Subject;

/// Minimum score another subject needs before the current page rejects
const REJECT_THRESHOLD: usize = 2;

/// Phrases that switch a math message into step-verification mode
const STEP_BY_STEP_HINTS: &[&str] = &[
    "step by step",
    "step-by-step",
    "show steps",
    "with steps",
    "walk me through",
    "solve this",
];

/// Static keyword configuration for one subject
#[derive(Debug, Clone, Copy)]
pub struct ClassifierProfile {
    /// Lowercase keywords matched as substrings
    pub keywords: &'static [&'static str],
    /// Characters that count as subject evidence on their own
    pub symbols: &'static str,
    /// Whether any numeric character (any script) counts as evidence
    pub digits: bool,
}

const MATH_PROFILE: ClassifierProfile = ClassifierProfile {
    keywords: &[
        "math", "algebra", "geometry", "trigonometry", "trig", "calculus", "derivative",
        "integral", "equation", "solve", "simplify", "factor", "fraction", "decimal",
        "percent", "probability", "statistics", "mean", "median", "mode", "sum",
        "difference", "product", "quotient", "slope", "angle", "area", "volume",
        "perimeter", "ratio", "proportion", "polynomial", "integer", "variable",
    ],
    symbols: "+-*/=^%()[]{}<>",
    digits: true,
};

const SCIENCE_PROFILE: ClassifierProfile = ClassifierProfile {
    keywords: &[
        "science", "biology", "chemistry", "physics", "earth", "cell", "atom", "molecule",
        "energy", "force", "motion", "gravity", "photosynthesis", "ecosystem", "organism",
        "matter", "reaction", "periodic", "experiment", "hypothesis", "lab", "planet",
    ],
    symbols: "",
    digits: false,
};

const HISTORY_PROFILE: ClassifierProfile = ClassifierProfile {
    keywords: &[
        "history", "historical", "ancient", "medieval", "empire", "revolution", "war",
        "civilization", "timeline", "era", "century", "dynasty", "treaty", "president",
        "king", "queen", "world war", "industrial", "colony", "constitution",
    ],
    symbols: "",
    digits: false,
};

const ENGLISH_PROFILE: ClassifierProfile = ClassifierProfile {
    keywords: &[
        "english", "grammar", "essay", "paragraph", "sentence", "verb", "noun", "adjective",
        "adverb", "punctuation", "thesis", "literature", "poem", "poetry", "novel", "author",
        "reading", "comprehension", "vocabulary", "synonym", "antonym", "book",
    ],
    symbols: "",
    digits: false,
};

impl ClassifierProfile {
    pub fn for_subject(subject: Subject) -> &'static ClassifierProfile {
        match subject {
            Subject::Math => &MATH_PROFILE,
            Subject::Science => &SCIENCE_PROFILE,
            Subject::History => &HISTORY_PROFILE,
            Subject::English => &ENGLISH_PROFILE,
        }
    }

    /// Score already-lowercased text against this profile.
    ///
    /// One point per distinct keyword found as a substring, plus one point
    /// when any configured symbol or digit is present.
    pub fn score(&self, lowered: &str) -> usize {
        let keyword_hits = self
            .keywords
            .iter()
            .filter(|keyword| lowered.contains(**keyword))
            .count();

        let has_symbol = lowered
            .chars()
            .any(|c| self.symbols.contains(c) || (self.digits && c.is_numeric()));

        keyword_hits + usize::from(has_symbol)
    }
}

/// Result of the relevance check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relevance {
    pub allow: bool,
}

/// Decide whether `text` may be answered on the `subject` page.
pub fn classify_relevance(text: &str, subject: Subject) -> Relevance {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return Relevance { allow: true };
    }

    let scores = Subject::ALL.map(|s| (s, ClassifierProfile::for_subject(s).score(&lowered)));

    let current = scores
        .iter()
        .find(|(s, _)| *s == subject)
        .map_or(0, |(_, score)| *score);
    if current > 0 {
        return Relevance { allow: true };
    }

    // First strictly greater score wins, so ties resolve in enumeration order
    let (best_subject, best_score) = scores
        .iter()
        .fold(scores[0], |best, &candidate| if candidate.1 > best.1 { candidate } else { best });

    let reject = best_score > 0 && best_subject != subject && best_score >= REJECT_THRESHOLD;
    Relevance { allow: !reject }
}

/// Whether the student asked to be walked through the problem
pub fn wants_step_by_step(text: &str) -> bool {
    let lowered = text.to_lowercase();
    STEP_BY_STEP_HINTS.iter().any(|hint| lowered.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_is_allowed() {
        for subject in Subject::ALL {
            assert!(classify_relevance("", subject).allow);
            assert!(classify_relevance("   \n\t", subject).allow);
        }
    }

    #[test]
    fn test_current_subject_signal_allows() {
        assert!(classify_relevance("Explain photosynthesis", Subject::Science).allow);
        assert!(classify_relevance("Who was the first president?", Subject::History).allow);
        assert!(classify_relevance("Fix the grammar in my essay", Subject::English).allow);
        assert!(classify_relevance("What is the slope here?", Subject::Math).allow);
    }

    #[test]
    fn test_math_symbols_and_digits_score() {
        let profile = ClassifierProfile::for_subject(Subject::Math);
        assert_eq!(profile.score("2x+4=10"), 1);
        assert_eq!(profile.score("what is 7"), 1);
        assert_eq!(profile.score("hello there"), 0);
        // Digits outside ASCII count too
        assert_eq!(profile.score("what is ٣"), 1);
        assert_eq!(profile.score("x²"), 1);
        // Symbols count once, independent of the keyword total
        assert_eq!(profile.score("solve 2x+4=10 for the variable"), 3);
        assert!(classify_relevance("2x+4=10", Subject::Math).allow);
    }

    #[test]
    fn test_no_evidence_is_allowed() {
        assert!(classify_relevance("hello, how are you?", Subject::History).allow);
        assert!(classify_relevance("can you help me", Subject::Science).allow);
    }

    #[test]
    fn test_single_foreign_keyword_is_allowed() {
        // History scores 1 on a science page: not clear enough to reject
        assert!(classify_relevance("tell me about the queen", Subject::Science).allow);
    }

    #[test]
    fn test_dominant_other_subject_rejects() {
        let text = "Explain photosynthesis in a plant cell";
        assert!(!classify_relevance(text, Subject::History).allow);
        assert!(!classify_relevance(text, Subject::English).allow);
        assert!(classify_relevance(text, Subject::Science).allow);

        let text = "causes of the french revolution and the empire";
        assert!(!classify_relevance(text, Subject::Math).allow);
    }

    #[test]
    fn test_keywords_are_case_insensitive_substrings() {
        let profile = ClassifierProfile::for_subject(Subject::Science);
        assert_eq!(profile.score("photosynthesis"), 1);
        assert_eq!(profile.score("PHOTOSYNTHESIS".to_lowercase().as_str()), 1);
        assert!(!classify_relevance("PHOTOSYNTHESIS IN A CELL", Subject::History).allow);
    }

    #[test]
    fn test_wants_step_by_step() {
        assert!(wants_step_by_step("solve this: 2x+4=10"));
        assert!(wants_step_by_step("Can you go Step-By-Step?"));
        assert!(wants_step_by_step("walk me through it"));
        assert!(!wants_step_by_step("what is 2+2"));
    }

    /// Keywords of `subject` that score nothing for any other subject
    fn unique_keywords(subject: Subject) -> Vec<&'static str> {
        ClassifierProfile::for_subject(subject)
            .keywords
            .iter()
            .copied()
            .filter(|keyword| {
                Subject::ALL
                    .iter()
                    .filter(|&&other| other != subject)
                    .all(|&other| ClassifierProfile::for_subject(other).score(keyword) == 0)
            })
            .collect()
    }

    fn subject_with_keyword() -> impl Strategy<Value = (Subject, &'static str)> {
        prop::sample::select(Subject::ALL.to_vec())
            .prop_flat_map(|subject| (Just(subject), prop::sample::select(unique_keywords(subject))))
    }

    /// A dominant subject, a different page subject, and two of the dominant subject's keywords
    fn dominant_and_page() -> impl Strategy<Value = (Subject, Subject, Vec<&'static str>)> {
        (
            prop::sample::select(Subject::ALL.to_vec()),
            prop::sample::select(Subject::ALL.to_vec()),
        )
            .prop_filter("distinct subjects", |(dominant, page)| dominant != page)
            .prop_flat_map(|(dominant, page)| {
                (
                    Just(dominant),
                    Just(page),
                    prop::sample::subsequence(unique_keywords(dominant), 2),
                )
            })
    }

    #[test]
    fn test_every_subject_has_unique_keywords() {
        for subject in Subject::ALL {
            assert!(unique_keywords(subject).len() >= 2, "{subject}");
        }
    }

    proptest! {
        #[test]
        fn prop_unique_keyword_allows_own_subject(
            (subject, keyword) in subject_with_keyword(),
            (_, noise) in subject_with_keyword(),
            filler in "[ ]{0,3}",
        ) {
            let text = format!("{filler}{keyword} {noise}{filler}");
            prop_assert!(classify_relevance(&text, subject).allow);
        }

        #[test]
        fn prop_dominant_other_subject_rejects((dominant, page, keywords) in dominant_and_page()) {
            let text = keywords.join(" ");
            let others_silent = Subject::ALL
                .iter()
                .filter(|&&s| s != dominant)
                .all(|&s| ClassifierProfile::for_subject(s).score(&text) == 0);
            prop_assume!(others_silent);

            prop_assert!(ClassifierProfile::for_subject(dominant).score(&text) >= 2);
            prop_assert!(!classify_relevance(&text, page).allow);
            prop_assert!(classify_relevance(&text, dominant).allow);
        }

        #[test]
        fn prop_plain_words_are_allowed_everywhere(text in "[bjkqxz ]{0,40}") {
            for subject in Subject::ALL {
                prop_assert!(classify_relevance(&text, subject).allow);
            }
        }
    }
}
