//! Host-side client for the network proxy that performs real networking on the guest's behalf.
//!
//! A [`TunnelConnection`] keeps one long-lived connection to the proxy configured by a
//! [`ProxyConfig`] and relays opaque request/response buffers over it, one request in flight at a
//! time. The bytes are never interpreted here.
//!
//! How buffers are delimited on the wire is a [`Framing`] strategy. The proxy speaks WebSocket
//! ([`WebSocketFraming`], one binary message per buffer); [`LengthPrefixedFraming`] is available
//! for plain TCP peers.
#![forbid(unsafe_code)]

mod config;
mod connection;
mod error;
mod framing;

pub use config::{ConfigError, ProxyConfig, TunnelOptions, DEFAULT_PROXY_PORT};
pub use connection::{TunnelConnection, TunnelState};
pub use error::TunnelError;
pub use framing::{
    FramedLink, Framing, LengthPrefixedFraming, WebSocketFraming, DEFAULT_MAX_FRAME_LEN,
    LENGTH_PREFIX_LEN,
};
