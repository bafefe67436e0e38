//! Host side of the suspend/resume bridge.
//!
//! Once per driver iteration, after guest stepping and rendering, the driver calls
//! [`SuspendDispatcher::dispatch`]. If the guest is suspended, the dispatcher performs the host
//! action for the pending request (host clipboard, proxy tunnel) and resolves it, so guest
//! stepping can continue on the next iteration. [`BridgeSession`] packages that loop step.
#![forbid(unsafe_code)]

mod clipboard;
mod dispatcher;
mod session;

pub use clipboard::{HostClipboard, MemoryClipboard};
pub use dispatcher::{DispatchReport, SuspendDispatcher};
pub use session::{BridgeSession, GuestCore};

pub use pda_suspend::{
    Outcome, Resolution, ResumePayload, SuspendError, SuspendKind, SuspendRegistry, SuspendRequest,
};
pub use pda_tunnel::{ProxyConfig, TunnelConnection, TunnelOptions, TunnelState};
