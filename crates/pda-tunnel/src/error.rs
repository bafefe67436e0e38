use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Host I/O failures while talking to the proxy.
///
/// Every one of these is recoverable from the bridge's point of view: the pending guest call is
/// cancelled and the tunnel drops back to disconnected.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("failed to resolve proxy host {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("proxy host {host} resolved to no addresses")]
    NoAddresses { host: String },

    #[error("failed to connect to proxy at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("proxy handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    #[error("proxy handshake did not complete")]
    HandshakeInterrupted,

    #[error("tunnel is not connected")]
    NotConnected,

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("proxy closed the connection")]
    PeerClosed,

    #[error("proxy sent a text message on a binary tunnel")]
    UnexpectedText,

    #[error("frame too large: {len} > {max}")]
    FrameTooLarge { len: usize, max: usize },
}
