//! Prompt text sent to the reasoning backend
//!
//! Subject personas for plain chat plus the fixed instructions used by the
//! problem planner and the step verifier.

use crate::subject::Subject;

const TUTOR_NAME: &str = "Harold";

/// Persona for the subject's general Q&A assistant
pub fn subject_persona(subject: Subject) -> String {
    let (label, scope) = match subject {
        Subject::Math => (
            "a math-only tutor",
            "math (arithmetic, algebra, geometry, trigonometry, calculus, statistics, word problems)",
        ),
        Subject::Science => (
            "a science-only tutor",
            "science (biology, chemistry, physics, earth science)",
        ),
        Subject::History => (
            "a history-only tutor",
            "history (events, eras, people, timelines, causes and effects)",
        ),
        Subject::English => (
            "an English-only tutor",
            "English class (grammar, writing, reading comprehension, vocabulary, literature analysis)",
        ),
    };
    let name = subject.display_name();
    format!(
        "You are {TUTOR_NAME}, {label}. Only answer questions about {scope}. \
         If the student asks about anything else, decline briefly and ask for a {name} question."
    )
}

/// Default prompt for an image sent without any text
pub fn image_question_prompt(subject: Subject) -> String {
    format!(
        "Answer the {} homework question shown in this image.",
        subject.display_name()
    )
}

/// Instruction for the problem planner, including its JSON output schema
pub const PLANNER_INSTRUCTION: &str = r#"Solve only if this is a math homework problem.
Return valid JSON with exactly this schema:
{"is_math": boolean, "steps": ["short step 1", "short step 2"], "final_answer": "text", "message": "used when is_math is false"}
Rules:
- If it is not math, set is_math to false and use message to ask for a math problem.
- If it is math, set is_math to true, list concise steps in order, and give final_answer.
- Keep each step short and actionable for the student to perform."#;

/// Leniency rules shared by every verdict format
const VERIFIER_RULES: &str = "Rules:
- Be flexible: accept equivalent algebraic or numeric forms and minor wording or formatting differences.
- If the student is mostly correct, treat the step as done.";

/// Verifier instruction for the JSON verdict format
pub fn verifier_json_instruction(expected_step: &str, submitted: &str) -> String {
    format!(
        "You are checking whether a student completed a math step.\n\
         Expected step: {expected_step}\n\
         Student typed work: {submitted}\n\n\
         Return valid JSON only with this schema:\n\
         {{\"is_match\": boolean, \"confidence\": number, \"feedback\": \"one short sentence\"}}\n\
         {VERIFIER_RULES}\n\
         - Use confidence from 0 to 100."
    )
}

/// Verifier instruction for the YES/NO verdict format
pub fn verifier_yes_no_instruction(expected_step: &str, submitted: &str) -> String {
    format!(
        "You are checking whether a student completed a math step.\n\
         Expected step: {expected_step}\n\
         Student typed work: {submitted}\n\n\
         Start your answer with YES if the step is done or NO if it is not, \
         then add one short sentence of feedback.\n\
         {VERIFIER_RULES}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_mentions_subject() {
        for subject in Subject::ALL {
            let persona = subject_persona(subject);
            assert!(persona.starts_with("You are Harold"));
            assert!(persona.contains(subject.display_name()));
        }
    }

    #[test]
    fn test_verifier_instruction_embeds_step() {
        let text = verifier_json_instruction("Divide by 2", "(none)");
        assert!(text.contains("Expected step: Divide by 2"));
        assert!(text.contains("Student typed work: (none)"));
        assert!(text.contains("\"is_match\": boolean"));
    }

    #[test]
    fn test_planner_schema_fields() {
        for field in ["is_math", "steps", "final_answer", "message"] {
            assert!(PLANNER_INSTRUCTION.contains(field));
        }
    }
}
