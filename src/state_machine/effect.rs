//! Effects produced by state transitions

use super::state::VerificationSession;

/// Storage work the runtime performs after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Store the session as the client's active session (created or advanced)
    PersistSession { session: VerificationSession },

    /// Remove the client's session after the last step was verified
    ClearSession,
}
