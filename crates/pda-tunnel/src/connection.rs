use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use tracing::{debug, trace};

use crate::{FramedLink, Framing, ProxyConfig, TunnelError, TunnelOptions, WebSocketFraming};

/// Bytes of each relayed buffer shown when net tracing is enabled.
const TRACE_PREVIEW_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Disconnected,
    Connected,
}

/// The single persistent connection to the network proxy.
///
/// All operations block the calling thread. Any send or receive failure force-closes the
/// connection, so a half-written or desynchronized stream is never reused; the next request
/// starts from a fresh [`connect`](Self::connect).
pub struct TunnelConnection {
    proxy: ProxyConfig,
    options: TunnelOptions,
    framing: Box<dyn Framing>,
    link: Option<Box<dyn FramedLink>>,
}

impl TunnelConnection {
    /// Creates a disconnected tunnel using [`WebSocketFraming`].
    pub fn new(proxy: ProxyConfig, options: TunnelOptions) -> Self {
        Self::with_framing(proxy, options, WebSocketFraming)
    }

    pub fn with_framing(
        proxy: ProxyConfig,
        options: TunnelOptions,
        framing: impl Framing + 'static,
    ) -> Self {
        Self {
            proxy,
            options,
            framing: Box::new(framing),
            link: None,
        }
    }

    pub fn proxy(&self) -> &ProxyConfig {
        &self.proxy
    }

    pub fn options(&self) -> &TunnelOptions {
        &self.options
    }

    pub fn state(&self) -> TunnelState {
        if self.link.is_some() {
            TunnelState::Connected
        } else {
            TunnelState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Opens the connection. A no-op returning `Ok` if already connected.
    ///
    /// On failure nothing is retained: a socket that connected but failed the framing handshake is
    /// closed before returning.
    pub fn connect(&mut self) -> Result<(), TunnelError> {
        if self.link.is_some() {
            return Ok(());
        }

        let stream = self.open_stream()?;
        let link = self.framing.establish(stream, &self.proxy)?;
        self.link = Some(link);
        Ok(())
    }

    /// Closes the connection. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
            debug!(proxy = %self.proxy, "tunnel closed");
        }
    }

    /// Transmits one complete request buffer.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), TunnelError> {
        let link = self.link.as_mut().ok_or(TunnelError::NotConnected)?;
        if let Err(err) = link.send_frame(payload) {
            self.force_close(&err);
            return Err(err);
        }

        debug!(len = payload.len(), "tunnel request sent");
        if self.options.net_trace {
            trace!(
                len = payload.len(),
                bytes = %hex_preview(payload),
                "tunnel request"
            );
        }
        Ok(())
    }

    /// Blocks until one complete response buffer has been read. The buffer belongs to the caller.
    pub fn receive(&mut self) -> Result<Vec<u8>, TunnelError> {
        let link = self.link.as_mut().ok_or(TunnelError::NotConnected)?;
        let response = match link.recv_frame() {
            Ok(response) => response,
            Err(err) => {
                self.force_close(&err);
                return Err(err);
            }
        };

        debug!(len = response.len(), "tunnel response received");
        if self.options.net_trace {
            trace!(
                len = response.len(),
                bytes = %hex_preview(&response),
                "tunnel response"
            );
        }
        Ok(response)
    }

    fn force_close(&mut self, err: &TunnelError) {
        debug!(%err, "tunnel failed; closing");
        self.disconnect();
    }

    fn open_stream(&self) -> Result<TcpStream, TunnelError> {
        let host = self.proxy.host();
        let addrs: Vec<SocketAddr> = (host, self.proxy.port())
            .to_socket_addrs()
            .map_err(|source| TunnelError::Resolve {
                host: host.to_string(),
                source,
            })?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            let connected = match self.options.connect_timeout {
                Some(timeout) if !timeout.is_zero() => TcpStream::connect_timeout(&addr, timeout),
                _ => TcpStream::connect(addr),
            };

            match connected {
                Ok(stream) => {
                    let io_timeout = self.options.io_timeout.filter(|timeout| !timeout.is_zero());
                    stream.set_read_timeout(io_timeout)?;
                    stream.set_write_timeout(io_timeout)?;
                    stream.set_nodelay(true)?;
                    debug!(%addr, "tcp connection to proxy established");
                    return Ok(stream);
                }
                Err(source) => {
                    debug!(%addr, %source, "proxy address unreachable");
                    last_err = Some(TunnelError::Connect { addr, source });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| TunnelError::NoAddresses {
            host: host.to_string(),
        }))
    }
}

impl Drop for TunnelConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for TunnelConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelConnection")
            .field("proxy", &self.proxy)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn hex_preview(bytes: &[u8]) -> String {
    let shown = &bytes[..bytes.len().min(TRACE_PREVIEW_LEN)];
    let mut out = hex::encode(shown);
    if bytes.len() > shown.len() {
        out.push_str("...");
    }
    out
}
