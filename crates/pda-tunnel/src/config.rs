use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::{Host, Url};

pub const DEFAULT_PROXY_PORT: u16 = 80;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid proxy URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    #[error("bad URI scheme {0:?} - must be http")]
    UnsupportedScheme(String),

    #[error("proxy URI has no host")]
    MissingHost,

    #[error("invalid proxy port {0}")]
    InvalidPort(u16),
}

/// Where the proxy lives: `{host, port, path}`, fixed for the whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    host: String,
    port: u16,
    path: String,
}

impl ProxyConfig {
    /// `path` defaults to `/` when empty.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let host = host.into();
        if host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }

        let mut path = path.into();
        if path.is_empty() {
            path.push('/');
        }

        Ok(Self { host, port, path })
    }

    /// Parses a proxy URI such as `http://proxy.example:8080/network-proxy/connect`.
    ///
    /// Only plain `http` is accepted. A missing port means 80, a missing path means `/`, and a
    /// query string stays attached to the path.
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(uri.trim())?;
        if url.scheme() != "http" {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        // IPv6 literals are stored without brackets so they can be handed to the resolver.
        let host = match url.host().ok_or(ConfigError::MissingHost)? {
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };

        let port = url.port().unwrap_or(DEFAULT_PROXY_PORT);

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Self::new(host, port, path)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `host:port` as accepted by the resolver and the WebSocket `Host` header.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The WebSocket endpoint the tunnel upgrades to.
    pub fn websocket_url(&self) -> String {
        format!("ws://{}{}", self.authority(), self.path)
    }
}

impl fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}{}", self.authority(), self.path)
    }
}

impl FromStr for ProxyConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}

/// Socket behaviour of a [`TunnelConnection`](crate::TunnelConnection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelOptions {
    /// Per-address TCP connect timeout. `None` waits for the OS.
    pub connect_timeout: Option<Duration>,
    /// Read/write timeout applied to the socket, including the framing handshake. `None` blocks
    /// indefinitely.
    pub io_timeout: Option<Duration>,
    /// Log every relayed buffer (with a hex preview) at `trace` level.
    pub net_trace: bool,
}

impl Default for TunnelOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
            net_trace: false,
        }
    }
}
