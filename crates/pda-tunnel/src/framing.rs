//! Wire framing between the tunnel and the proxy.
//!
//! A [`Framing`] turns a freshly connected TCP stream into a [`FramedLink`] that moves whole
//! buffers: one request buffer out, one response buffer back.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use tracing::debug;
use tungstenite::handshake::HandshakeError;
use tungstenite::{Message, WebSocket};

use crate::{ProxyConfig, TunnelError};

/// Upper bound on a single length-prefixed frame.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Size of the big-endian `u32` length header of [`LengthPrefixedFraming`].
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Establishes a framed link over a connected stream.
pub trait Framing: Send {
    /// Performs any protocol handshake. On error the stream is dropped, which closes it.
    fn establish(
        &self,
        stream: TcpStream,
        proxy: &ProxyConfig,
    ) -> Result<Box<dyn FramedLink>, TunnelError>;
}

/// An open, framed connection to the proxy.
pub trait FramedLink: Send {
    /// Writes one complete buffer.
    fn send_frame(&mut self, payload: &[u8]) -> Result<(), TunnelError>;

    /// Blocks until one complete buffer has been read.
    fn recv_frame(&mut self) -> Result<Vec<u8>, TunnelError>;

    /// Best-effort orderly close.
    fn close(&mut self);
}

impl<T: Framing + ?Sized> Framing for Box<T> {
    fn establish(
        &self,
        stream: TcpStream,
        proxy: &ProxyConfig,
    ) -> Result<Box<dyn FramedLink>, TunnelError> {
        <T as Framing>::establish(&**self, stream, proxy)
    }
}

/// WebSocket framing: upgrade to `ws://{host}:{port}{path}`, then one binary message per buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketFraming;

impl Framing for WebSocketFraming {
    fn establish(
        &self,
        stream: TcpStream,
        proxy: &ProxyConfig,
    ) -> Result<Box<dyn FramedLink>, TunnelError> {
        let url = proxy.websocket_url();
        let (socket, response) =
            tungstenite::client(url.as_str(), stream).map_err(|err| match err {
                HandshakeError::Failure(err) => TunnelError::Handshake(err),
                HandshakeError::Interrupted(_) => TunnelError::HandshakeInterrupted,
            })?;

        debug!(%url, status = %response.status(), "websocket tunnel established");
        Ok(Box::new(WebSocketLink { socket }))
    }
}

struct WebSocketLink {
    socket: WebSocket<TcpStream>,
}

impl FramedLink for WebSocketLink {
    fn send_frame(&mut self, payload: &[u8]) -> Result<(), TunnelError> {
        self.socket.send(Message::binary(payload.to_vec()))?;
        Ok(())
    }

    fn recv_frame(&mut self) -> Result<Vec<u8>, TunnelError> {
        loop {
            match self.socket.read()? {
                Message::Binary(data) => return Ok(data.to_vec()),
                Message::Text(_) => return Err(TunnelError::UnexpectedText),
                Message::Close(_) => return Err(TunnelError::PeerClosed),
                // Pings are answered by tungstenite on the next read/write.
                _ => continue,
            }
        }
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}

/// Raw TCP framing: `len (u32 BE) | payload (len bytes)` in both directions.
#[derive(Debug, Clone, Copy)]
pub struct LengthPrefixedFraming {
    max_frame_len: usize,
}

impl LengthPrefixedFraming {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            max_frame_len: max_frame_len.min(u32::MAX as usize),
        }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for LengthPrefixedFraming {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Framing for LengthPrefixedFraming {
    fn establish(
        &self,
        stream: TcpStream,
        _proxy: &ProxyConfig,
    ) -> Result<Box<dyn FramedLink>, TunnelError> {
        Ok(Box::new(LengthPrefixedLink {
            stream,
            max_frame_len: self.max_frame_len,
        }))
    }
}

struct LengthPrefixedLink {
    stream: TcpStream,
    max_frame_len: usize,
}

impl FramedLink for LengthPrefixedLink {
    fn send_frame(&mut self, payload: &[u8]) -> Result<(), TunnelError> {
        if payload.len() > self.max_frame_len {
            return Err(TunnelError::FrameTooLarge {
                len: payload.len(),
                max: self.max_frame_len,
            });
        }

        // `max_frame_len` is clamped to u32::MAX, so the cast is lossless.
        let header = (payload.len() as u32).to_be_bytes();
        self.stream.write_all(&header)?;
        self.stream.write_all(payload)?;
        self.stream.flush()?;
        Ok(())
    }

    fn recv_frame(&mut self) -> Result<Vec<u8>, TunnelError> {
        let mut header = [0u8; LENGTH_PREFIX_LEN];
        read_exact_or_closed(&mut self.stream, &mut header)?;

        let len = u32::from_be_bytes(header) as usize;
        if len > self.max_frame_len {
            return Err(TunnelError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let mut payload = vec![0u8; len];
        read_exact_or_closed(&mut self.stream, &mut payload)?;
        Ok(payload)
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

fn read_exact_or_closed(stream: &mut TcpStream, buf: &mut [u8]) -> Result<(), TunnelError> {
    stream.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => TunnelError::PeerClosed,
        _ => TunnelError::Io(err),
    })
}
