//! Step-verification state machine
//!
//! Explicit per-client flow state with a pure routing function and a pure
//! transition function, in the Elm Architecture style.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, ImageData, Inbound};
pub use state::{FlowState, StepPlan, VerificationOutcome, VerificationSession};
pub use transition::{off_topic_reply, route, transition, Route, EMPTY_MESSAGE_REPLY};
