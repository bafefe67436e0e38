use thiserror::Error;

use crate::SuspendKind;

/// Contract violations of the single-pending-request discipline.
///
/// None of these are host I/O failures: they indicate that the trap layer or the dispatcher used
/// the registry incorrectly and should be surfaced immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SuspendError {
    #[error("a {pending} request is already pending")]
    AlreadySuspended { pending: SuspendKind },

    #[error("no request is pending")]
    NotSuspended,

    #[error("the resolution of a previous {kind} request has not been claimed")]
    ResolutionUnclaimed { kind: SuspendKind },

    #[error("{payload} payload cannot resume a {kind} request")]
    PayloadMismatch {
        kind: SuspendKind,
        payload: &'static str,
    },
}
