use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pda_tunnel::{
    LengthPrefixedFraming, ProxyConfig, TunnelConnection, TunnelError, TunnelOptions, TunnelState,
};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::Message;

fn test_options() -> TunnelOptions {
    TunnelOptions {
        connect_timeout: Some(Duration::from_secs(2)),
        io_timeout: Some(Duration::from_secs(5)),
        net_trace: true,
    }
}

/// Serves `connections` WebSocket sessions in turn, answering each binary message with `reply`.
/// Messages equal to `b"close"` make the proxy hang up instead.
fn spawn_ws_proxy(
    connections: usize,
    reply: fn(&[u8]) -> Message,
) -> (ProxyConfig, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let proxy = ProxyConfig::from_uri(&format!("http://127.0.0.1:{port}/network-proxy")).unwrap();

    let handle = thread::spawn(move || {
        let mut paths = Vec::new();
        for _ in 0..connections {
            let (stream, _) = listener.accept().unwrap();
            let mut path = String::new();
            let mut ws = tungstenite::accept_hdr(
                stream,
                |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    path = req.uri().to_string();
                    Ok(resp)
                },
            )
            .unwrap();
            paths.push(path);

            loop {
                match ws.read() {
                    Ok(Message::Binary(data)) if &data[..] == b"close" => break,
                    Ok(Message::Binary(data)) => ws.send(reply(&data)).unwrap(),
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        }
        paths
    });

    (proxy, handle)
}

fn reversed(data: &[u8]) -> Message {
    let mut out = data.to_vec();
    out.reverse();
    Message::binary(out)
}

#[test]
fn websocket_round_trip_preserves_bytes() {
    let (proxy, server) = spawn_ws_proxy(1, reversed);
    let mut tunnel = TunnelConnection::new(proxy, test_options());

    tunnel.connect().unwrap();
    assert_eq!(tunnel.state(), TunnelState::Connected);

    tunnel.send(&[1, 2, 3, 4]).unwrap();
    assert_eq!(tunnel.receive().unwrap(), vec![4, 3, 2, 1]);

    // A larger buffer must come back without truncation.
    let big: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    tunnel.send(&big).unwrap();
    let mut expected = big.clone();
    expected.reverse();
    assert_eq!(tunnel.receive().unwrap(), expected);

    tunnel.disconnect();
    assert_eq!(tunnel.state(), TunnelState::Disconnected);

    let paths = server.join().unwrap();
    assert_eq!(paths, vec!["/network-proxy".to_string()]);
}

#[test]
fn peer_hangup_forces_disconnect_and_allows_reconnect() {
    let (proxy, server) = spawn_ws_proxy(2, reversed);
    let mut tunnel = TunnelConnection::new(proxy, test_options());

    tunnel.connect().unwrap();
    tunnel.send(b"close").unwrap();
    assert!(tunnel.receive().is_err());
    assert_eq!(tunnel.state(), TunnelState::Disconnected);

    tunnel.connect().unwrap();
    tunnel.send(&[9, 8]).unwrap();
    assert_eq!(tunnel.receive().unwrap(), vec![8, 9]);
    tunnel.disconnect();

    assert_eq!(server.join().unwrap().len(), 2);
}

#[test]
fn text_reply_is_a_protocol_error() {
    let (proxy, server) = spawn_ws_proxy(1, |_| Message::text("not binary"));
    let mut tunnel = TunnelConnection::new(proxy, test_options());

    tunnel.connect().unwrap();
    tunnel.send(b"hello").unwrap();
    assert!(matches!(tunnel.receive(), Err(TunnelError::UnexpectedText)));
    assert_eq!(tunnel.state(), TunnelState::Disconnected);

    server.join().unwrap();
}

#[test]
fn unresolvable_host_fails_to_connect() {
    let proxy = ProxyConfig::new("proxy.invalid", 80, "/").unwrap();
    let mut tunnel = TunnelConnection::new(proxy, test_options());

    let err = tunnel.connect().unwrap_err();
    assert!(
        matches!(
            err,
            TunnelError::Resolve { .. } | TunnelError::NoAddresses { .. }
        ),
        "unexpected error: {err}"
    );
    assert_eq!(tunnel.state(), TunnelState::Disconnected);
}

#[test]
fn non_websocket_peer_fails_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf);
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n");
    });

    let proxy = ProxyConfig::new("127.0.0.1", port, "/").unwrap();
    let mut tunnel = TunnelConnection::new(proxy, test_options());
    assert!(matches!(
        tunnel.connect(),
        Err(TunnelError::Handshake(_))
    ));
    assert_eq!(tunnel.state(), TunnelState::Disconnected);

    server.join().unwrap();
}

#[test]
fn length_prefixed_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut stream, _): (TcpStream, _) = listener.accept().unwrap();
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).unwrap();
        let mut payload = vec![0u8; u32::from_be_bytes(header) as usize];
        stream.read_exact(&mut payload).unwrap();

        let mut reply = payload.clone();
        reply.extend_from_slice(b"-ack");
        stream
            .write_all(&(reply.len() as u32).to_be_bytes())
            .unwrap();
        stream.write_all(&reply).unwrap();
    });

    let proxy = ProxyConfig::new("127.0.0.1", port, "/").unwrap();
    let mut tunnel =
        TunnelConnection::with_framing(proxy, test_options(), LengthPrefixedFraming::default());

    tunnel.connect().unwrap();
    tunnel.send(b"req").unwrap();
    assert_eq!(tunnel.receive().unwrap(), b"req-ack".to_vec());

    server.join().unwrap();
}
