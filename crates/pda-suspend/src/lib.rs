//! Suspend/resume bridge between the guest trap layer and the host driver loop.
//!
//! When the guest issues an operation the virtual machine cannot service on its own (host
//! clipboard access, proxied networking), the trap layer describes it as a [`SuspendRequest`] and
//! installs it in the session's [`SuspendRegistry`]. Guest stepping stays halted until the host
//! resolves the request with [`SuspendRegistry::resume`] or [`SuspendRegistry::cancel`]; the trap
//! layer then claims the [`Resolution`] and injects it into the guest call frame.
//!
//! At most one request is outstanding per registry.
#![forbid(unsafe_code)]

mod error;
mod registry;
mod request;

pub use error::SuspendError;
pub use registry::SuspendRegistry;
pub use request::{Outcome, Resolution, ResumePayload, SuspendKind, SuspendRequest};
