//! Moderation state machine for corpus visibility.
//!
//! Sources start `pending`, become retrievable only when `approved`, and can
//! be re-moderated between `approved` and `rejected`. `pending` is
//! terminal-initial: once a source leaves it there is no way back. The
//! engine enforces legality here; authorization is the caller's decision,
//! checked at the engine boundary.

use crate::error::EngineError;
use crate::models::ModerationStatus;

/// Whether the state machine permits moving `from` → `to`.
///
/// Legal transitions:
/// - `pending → approved`
/// - `pending → rejected`
/// - `approved → rejected` (re-moderation)
/// - `rejected → approved` (re-approval)
pub fn is_legal_transition(from: ModerationStatus, to: ModerationStatus) -> bool {
    use ModerationStatus::*;
    matches!(
        (from, to),
        (Pending, Approved) | (Pending, Rejected) | (Approved, Rejected) | (Rejected, Approved)
    )
}

/// Validate a requested transition, returning [`EngineError::InvalidState`]
/// when the state machine does not permit it.
pub fn check_transition(
    from: ModerationStatus,
    to: ModerationStatus,
) -> Result<(), EngineError> {
    if is_legal_transition(from, to) {
        Ok(())
    } else {
        Err(EngineError::InvalidState { from, to })
    }
}
