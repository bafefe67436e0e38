use core::fmt;

/// Discriminant of a [`SuspendRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspendKind {
    ClipboardCopy,
    ClipboardPaste,
    NetworkConnect,
    NetworkDisconnect,
    NetworkRpc,
}

impl SuspendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SuspendKind::ClipboardCopy => "clipboard-copy",
            SuspendKind::ClipboardPaste => "clipboard-paste",
            SuspendKind::NetworkConnect => "network-connect",
            SuspendKind::NetworkDisconnect => "network-disconnect",
            SuspendKind::NetworkRpc => "network-rpc",
        }
    }

    pub const fn is_network(self) -> bool {
        matches!(
            self,
            SuspendKind::NetworkConnect | SuspendKind::NetworkDisconnect | SuspendKind::NetworkRpc
        )
    }
}

impl fmt::Display for SuspendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending host-mediated operation, as described by the trap layer.
///
/// Each variant carries only the input its kind needs. The request is owned by the
/// [`SuspendRegistry`](crate::SuspendRegistry) from installation until it is resolved and is
/// dropped as part of resolution.
#[derive(Debug, PartialEq, Eq)]
pub enum SuspendRequest {
    /// Set the host clipboard to `content`.
    ClipboardCopy { content: String },
    /// Read the host clipboard.
    ClipboardPaste,
    /// Open the tunnel to the network proxy.
    NetworkConnect,
    /// Close the tunnel to the network proxy.
    NetworkDisconnect,
    /// Relay one opaque request buffer through the tunnel and wait for the response.
    NetworkRpc { request: Vec<u8> },
}

impl SuspendRequest {
    pub fn clipboard_copy(content: impl Into<String>) -> Self {
        SuspendRequest::ClipboardCopy {
            content: content.into(),
        }
    }

    pub fn network_rpc(request: impl Into<Vec<u8>>) -> Self {
        SuspendRequest::NetworkRpc {
            request: request.into(),
        }
    }

    pub fn kind(&self) -> SuspendKind {
        match self {
            SuspendRequest::ClipboardCopy { .. } => SuspendKind::ClipboardCopy,
            SuspendRequest::ClipboardPaste => SuspendKind::ClipboardPaste,
            SuspendRequest::NetworkConnect => SuspendKind::NetworkConnect,
            SuspendRequest::NetworkDisconnect => SuspendKind::NetworkDisconnect,
            SuspendRequest::NetworkRpc { .. } => SuspendKind::NetworkRpc,
        }
    }
}

/// Result data delivered to the guest when a request is resumed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResumePayload {
    /// Plain success (clipboard copy, connect, disconnect).
    #[default]
    Empty,
    /// Clipboard contents for a paste; may be the empty string.
    ClipboardText(String),
    /// Response bytes for a network RPC.
    RpcResponse(Vec<u8>),
}

impl ResumePayload {
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            ResumePayload::Empty => "empty",
            ResumePayload::ClipboardText(_) => "clipboard text",
            ResumePayload::RpcResponse(_) => "rpc response",
        }
    }

    /// Whether this payload is the resolution shape expected for `kind`.
    pub const fn fits(&self, kind: SuspendKind) -> bool {
        match self {
            ResumePayload::Empty => matches!(
                kind,
                SuspendKind::ClipboardCopy
                    | SuspendKind::NetworkConnect
                    | SuspendKind::NetworkDisconnect
            ),
            ResumePayload::ClipboardText(_) => matches!(kind, SuspendKind::ClipboardPaste),
            ResumePayload::RpcResponse(_) => matches!(kind, SuspendKind::NetworkRpc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Resumed(ResumePayload),
    Cancelled,
}

/// How a request was resolved, held by the registry until the trap layer claims it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub kind: SuspendKind,
    pub outcome: Outcome,
}

impl Resolution {
    pub fn is_resumed(&self) -> bool {
        matches!(self.outcome, Outcome::Resumed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, Outcome::Cancelled)
    }

    /// Pasted clipboard text, if this resolves a successful paste.
    pub fn clipboard_text(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Resumed(ResumePayload::ClipboardText(text)) => Some(text),
            _ => None,
        }
    }

    /// Response bytes, if this resolves a successful RPC.
    pub fn rpc_response(&self) -> Option<&[u8]> {
        match &self.outcome {
            Outcome::Resumed(ResumePayload::RpcResponse(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Moves the payload out; `None` when the request was cancelled.
    pub fn into_payload(self) -> Option<ResumePayload> {
        match self.outcome {
            Outcome::Resumed(payload) => Some(payload),
            Outcome::Cancelled => None,
        }
    }
}
