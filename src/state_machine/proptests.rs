//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::event::InputSource;
use super::state::*;
use super::transition::*;
use super::*;
use crate::subject::Subject;
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_step() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 +=]{1,30}".prop_filter("non-blank", |s| !s.trim().is_empty())
}

fn arb_plan() -> impl Strategy<Value = StepPlan> {
    (prop::collection::vec(arb_step(), 1..8), "[a-z0-9=]{0,8}")
        .prop_map(|(steps, answer)| StepPlan::math(steps, answer))
}

fn arb_outcome() -> impl Strategy<Value = VerificationOutcome> {
    (any::<bool>(), 0u8..=100, "[a-z ]{0,20}").prop_map(|(passed, confidence, feedback)| {
        VerificationOutcome {
            passed,
            confidence,
            feedback,
        }
    })
}

fn arb_subject() -> impl Strategy<Value = Subject> {
    prop::sample::select(Subject::ALL.to_vec())
}

fn start(plan: &StepPlan) -> FlowState {
    let result = transition(
        &FlowState::Idle,
        Event::PlanReady {
            plan: plan.clone(),
            source: InputSource::Text,
            received_at: Utc::now(),
        },
    )
    .unwrap();
    result.new_state
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// The step index never moves backwards and the session is removed
    /// exactly when it would run past the last step.
    #[test]
    fn prop_index_monotonic_until_cleared(
        plan in arb_plan(),
        outcomes in prop::collection::vec(arb_outcome(), 0..30),
    ) {
        let mut state = start(&plan);
        let mut last_index = 0;
        let total = plan.steps.len();

        for outcome in outcomes {
            let Some(session) = state.session() else { break };
            let before = session.current_index();
            prop_assert!(before < total);

            let passed = outcome.passed;
            let result = transition(&state, Event::StepChecked { outcome }).unwrap();

            match result.new_state.session() {
                Some(next) => {
                    prop_assert!(next.current_index() >= last_index);
                    prop_assert_eq!(next.current_index(), before + usize::from(passed));
                    last_index = next.current_index();
                }
                None => {
                    prop_assert!(passed);
                    prop_assert_eq!(before + 1, total);
                    prop_assert_eq!(result.effects.clone(), vec![Effect::ClearSession]);
                }
            }
            state = result.new_state;
        }
    }

    /// N successful verifications take Idle -> Active -> ... -> Idle with
    /// one reply each, the last one carrying the final answer.
    #[test]
    fn prop_n_passes_complete_the_plan(plan in arb_plan()) {
        let mut state = start(&plan);
        let mut replies = Vec::new();

        for _ in 0..plan.steps.len() {
            prop_assert!(state.is_active());
            let result = transition(&state, Event::StepChecked {
                outcome: VerificationOutcome { passed: true, confidence: 100, feedback: String::new() },
            }).unwrap();
            replies.push(result.reply);
            state = result.new_state;
        }

        prop_assert_eq!(state, FlowState::Idle);
        prop_assert_eq!(replies.len(), plan.steps.len());
        let last = replies.last().unwrap();
        if plan.final_answer.is_empty() {
            prop_assert!(!last.contains("Final answer"));
        } else {
            let expected = format!("Final answer: {}", plan.final_answer);
            prop_assert!(last.contains(&expected));
        }
    }

    /// Failures and backend errors never change the state.
    #[test]
    fn prop_failures_are_idempotent(plan in arb_plan(), feedback in "[a-z ]{0,20}") {
        let state = start(&plan);
        let failed = transition(&state, Event::StepChecked {
            outcome: VerificationOutcome { passed: false, confidence: 10, feedback },
        }).unwrap();
        prop_assert_eq!(&failed.new_state, &state);
        prop_assert!(failed.effects.is_empty());

        let errored = transition(&state, Event::VerificationFailed).unwrap();
        prop_assert_eq!(&errored.new_state, &state);
    }

    /// An active session always routes to verification, whatever the page.
    #[test]
    fn prop_active_always_verifies(plan in arb_plan(), subject in arb_subject(), text in "[a-z0-9 ]{1,40}") {
        prop_assume!(!text.trim().is_empty());
        let state = start(&plan);
        prop_assert_eq!(route(&state, subject, &Inbound::text(text)), Route::VerifyStep);
    }
}
