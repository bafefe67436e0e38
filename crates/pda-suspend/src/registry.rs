use tracing::debug;

use crate::{Outcome, Resolution, ResumePayload, SuspendError, SuspendKind, SuspendRequest};

/// Per-session slot holding at most one pending [`SuspendRequest`].
///
/// The registry is plain session state: the driver loop and the trap layer share it by
/// reference, so independent sessions (e.g. in tests) never interfere. It is not synchronized;
/// a multi-threaded host must wrap it in a mutex so that resolution and the transition back to
/// empty stay atomic.
///
/// Lifecycle of one request:
/// 1. The trap layer checks [`is_suspended`](Self::is_suspended) and calls
///    [`install`](Self::install). Guest stepping halts while a request is pending.
/// 2. The dispatcher inspects [`current`](Self::current) and performs the host action.
/// 3. The dispatcher calls [`resume`](Self::resume) or [`cancel`](Self::cancel) exactly once; the
///    request is dropped and the slot is empty again.
/// 4. The trap layer claims the [`Resolution`] via [`take_resolution`](Self::take_resolution).
#[derive(Debug, Default)]
pub struct SuspendRegistry {
    pending: Option<SuspendRequest>,
    resolution: Option<Resolution>,
}

impl SuspendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `request` and suspends guest execution.
    ///
    /// Fails if a request is already pending, or if the previous resolution has not been claimed
    /// yet (installing would otherwise lose a guest result).
    pub fn install(&mut self, request: SuspendRequest) -> Result<(), SuspendError> {
        if let Some(pending) = &self.pending {
            return Err(SuspendError::AlreadySuspended {
                pending: pending.kind(),
            });
        }
        if let Some(resolution) = &self.resolution {
            return Err(SuspendError::ResolutionUnclaimed {
                kind: resolution.kind,
            });
        }

        debug!(kind = %request.kind(), "guest suspended");
        self.pending = Some(request);
        Ok(())
    }

    pub fn is_suspended(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_kind(&self) -> Option<SuspendKind> {
        self.pending.as_ref().map(SuspendRequest::kind)
    }

    /// Borrows the pending request. The borrow must not outlive the current dispatch step.
    pub fn current(&self) -> Result<&SuspendRequest, SuspendError> {
        self.pending.as_ref().ok_or(SuspendError::NotSuspended)
    }

    /// Resolves the pending request successfully with `payload`.
    ///
    /// `payload` must fit the request kind (see [`ResumePayload::fits`]); on a mismatch the
    /// request stays pending.
    pub fn resume(&mut self, payload: ResumePayload) -> Result<SuspendKind, SuspendError> {
        let kind = self.current()?.kind();
        if !payload.fits(kind) {
            return Err(SuspendError::PayloadMismatch {
                kind,
                payload: payload.name(),
            });
        }

        self.resolve(Outcome::Resumed(payload))
    }

    /// Resolves the pending request with a failure outcome.
    pub fn cancel(&mut self) -> Result<SuspendKind, SuspendError> {
        self.resolve(Outcome::Cancelled)
    }

    pub fn has_resolution(&self) -> bool {
        self.resolution.is_some()
    }

    /// Claims the most recent resolution, leaving the registry ready for the next request.
    pub fn take_resolution(&mut self) -> Option<Resolution> {
        self.resolution.take()
    }

    fn resolve(&mut self, outcome: Outcome) -> Result<SuspendKind, SuspendError> {
        let request = self.pending.take().ok_or(SuspendError::NotSuspended)?;
        let kind = request.kind();
        drop(request);

        debug!(
            %kind,
            resumed = matches!(outcome, Outcome::Resumed(_)),
            "guest resumed"
        );
        self.resolution = Some(Resolution { kind, outcome });
        Ok(kind)
    }
}
