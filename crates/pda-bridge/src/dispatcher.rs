use pda_suspend::{ResumePayload, SuspendKind, SuspendRegistry, SuspendRequest};
use pda_tunnel::TunnelConnection;
use tracing::{debug, error, info, warn};

use crate::HostClipboard;

/// What one [`SuspendDispatcher::dispatch`] call did.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub kind: SuspendKind,
    /// `true` if the request was resumed, `false` if it was cancelled.
    pub resumed: bool,
}

enum Action {
    Resume(ResumePayload),
    Cancel,
}

/// Performs the host side of pending suspend requests.
///
/// Network requests go through the session's [`TunnelConnection`]; a session without a
/// configured proxy cancels them. Clipboard requests go to the [`HostClipboard`].
#[derive(Debug)]
pub struct SuspendDispatcher<C> {
    clipboard: C,
    tunnel: Option<TunnelConnection>,
}

impl<C: HostClipboard> SuspendDispatcher<C> {
    pub fn new(clipboard: C, tunnel: Option<TunnelConnection>) -> Self {
        Self { clipboard, tunnel }
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    pub fn clipboard_mut(&mut self) -> &mut C {
        &mut self.clipboard
    }

    pub fn tunnel(&self) -> Option<&TunnelConnection> {
        self.tunnel.as_ref()
    }

    pub fn tunnel_mut(&mut self) -> Option<&mut TunnelConnection> {
        self.tunnel.as_mut()
    }

    /// Resolves the pending request, if any. Never loops or retries: every path ends in exactly
    /// one resume or cancel, and the registry is empty when this returns `Some`.
    ///
    /// Network requests may block for the duration of one connect or one send/receive exchange.
    pub fn dispatch(&mut self, registry: &mut SuspendRegistry) -> Option<DispatchReport> {
        let request = registry.current().ok()?;
        let kind = request.kind();

        let action = match request {
            SuspendRequest::ClipboardCopy { content } => {
                self.clipboard.set_text(content);
                Action::Resume(ResumePayload::Empty)
            }
            SuspendRequest::ClipboardPaste => {
                // An unreadable clipboard pastes as empty text rather than failing the call.
                let content = self.clipboard.text().unwrap_or_default();
                Action::Resume(ResumePayload::ClipboardText(content))
            }
            SuspendRequest::NetworkConnect => self.connect(),
            SuspendRequest::NetworkDisconnect => self.disconnect(),
            SuspendRequest::NetworkRpc { request } => self.relay(request),
        };

        let resumed = match action {
            Action::Resume(payload) => match registry.resume(payload) {
                Ok(_) => true,
                Err(err) => {
                    error!(%kind, %err, "failed to resume suspended request; cancelling");
                    let _ = registry.cancel();
                    false
                }
            },
            Action::Cancel => {
                let _ = registry.cancel();
                false
            }
        };

        Some(DispatchReport { kind, resumed })
    }

    /// Closes the tunnel, e.g. when the driver loop exits.
    pub fn shutdown(&mut self) {
        if let Some(tunnel) = self.tunnel.as_mut() {
            tunnel.disconnect();
        }
    }

    fn connect(&mut self) -> Action {
        let Some(tunnel) = self.tunnel.as_mut() else {
            warn!("network connect requested, but no network proxy is configured");
            return Action::Cancel;
        };

        match tunnel.connect() {
            Ok(()) => {
                info!(proxy = %tunnel.proxy(), "network proxy connected");
                Action::Resume(ResumePayload::Empty)
            }
            Err(err) => {
                warn!(proxy = %tunnel.proxy(), %err, "failed to connect to network proxy");
                Action::Cancel
            }
        }
    }

    fn disconnect(&mut self) -> Action {
        if let Some(tunnel) = self.tunnel.as_mut() {
            tunnel.disconnect();
            info!("network proxy disconnected");
        }
        Action::Resume(ResumePayload::Empty)
    }

    fn relay(&mut self, request: &[u8]) -> Action {
        let Some(tunnel) = self.tunnel.as_mut() else {
            warn!("network rpc requested, but no network proxy is configured");
            return Action::Cancel;
        };

        if let Err(err) = tunnel.send(request) {
            debug!(%err, "network rpc send failed");
            return Action::Cancel;
        }

        match tunnel.receive() {
            Ok(response) if response.is_empty() => {
                debug!("network rpc returned no data");
                Action::Cancel
            }
            Ok(response) => Action::Resume(ResumePayload::RpcResponse(response)),
            Err(err) => {
                debug!(%err, "network rpc receive failed");
                Action::Cancel
            }
        }
    }
}
