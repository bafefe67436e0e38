#![forbid(unsafe_code)]

//! Drives one bridge session against a real network proxy: connect, one RPC per payload, then
//! disconnect. Each call goes through the same suspend/dispatch path the emulator uses.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use pda_bridge::{
    BridgeSession, GuestCore, MemoryClipboard, Outcome, ProxyConfig, Resolution, ResumePayload,
    SuspendDispatcher, SuspendKind, SuspendRegistry, SuspendRequest, TunnelConnection,
    TunnelOptions,
};
use pda_tunnel::{LengthPrefixedFraming, WebSocketFraming};

/// Upper bound on driver iterations; each scripted call settles within two.
const MAX_ITERATIONS_PER_CALL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FramingArg {
    Websocket,
    LengthPrefixed,
}

#[derive(Debug, Parser)]
#[command(about = "Relay request buffers through the network proxy via the suspend bridge")]
struct Args {
    /// Network proxy URI (http only), e.g. `http://localhost:6666/`.
    #[arg(long, short = 'n', env = "PDA_NET_PROXY")]
    net_proxy: ProxyConfig,

    /// Trace every relayed buffer (hex preview) at `trace` level.
    #[arg(long)]
    net_trace: bool,

    /// How request/response buffers are delimited on the wire.
    #[arg(long, value_enum, default_value_t = FramingArg::Websocket)]
    framing: FramingArg,

    /// TCP connect timeout in milliseconds (0 waits for the OS).
    #[arg(long, default_value_t = 5_000)]
    connect_timeout_ms: u64,

    /// Socket read/write timeout in milliseconds (0 blocks indefinitely).
    #[arg(long, default_value_t = 30_000)]
    io_timeout_ms: u64,

    /// Request payload as hex; may be repeated.
    #[arg(long = "payload-hex")]
    payload_hex: Vec<String>,

    /// File whose contents form one request payload; may be repeated.
    #[arg(long = "payload-file")]
    payload_file: Vec<PathBuf>,
}

/// Stand-in for the guest trap layer: issues scripted calls one at a time and records results.
struct ScriptedGuest {
    script: Vec<SuspendRequest>,
    results: Vec<Resolution>,
}

impl ScriptedGuest {
    fn new(payloads: Vec<Vec<u8>>) -> Self {
        let mut script = vec![SuspendRequest::NetworkConnect];
        script.extend(payloads.into_iter().map(SuspendRequest::network_rpc));
        script.push(SuspendRequest::NetworkDisconnect);
        // Issued front to back via `pop`.
        script.reverse();

        Self {
            script,
            results: Vec::new(),
        }
    }

    fn is_done(&self) -> bool {
        self.script.is_empty()
    }
}

impl GuestCore for ScriptedGuest {
    fn run_slice(&mut self, registry: &mut SuspendRegistry) {
        if let Some(resolution) = registry.take_resolution() {
            // Without a tunnel nothing else in the script can succeed.
            if resolution.kind == SuspendKind::NetworkConnect && resolution.is_cancelled() {
                self.script.clear();
            }
            self.results.push(resolution);
        }

        if let Some(request) = self.script.pop() {
            if let Err(err) = registry.install(request) {
                tracing::error!(%err, "failed to install suspend request");
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let payloads = collect_payloads(&args)?;
    let options = TunnelOptions {
        connect_timeout: Some(Duration::from_millis(args.connect_timeout_ms)),
        io_timeout: Some(Duration::from_millis(args.io_timeout_ms)),
        net_trace: args.net_trace,
    };
    let tunnel = match args.framing {
        FramingArg::Websocket => {
            TunnelConnection::with_framing(args.net_proxy.clone(), options, WebSocketFraming)
        }
        FramingArg::LengthPrefixed => TunnelConnection::with_framing(
            args.net_proxy.clone(),
            options,
            LengthPrefixedFraming::default(),
        ),
    };

    let call_count = payloads.len() + 2;
    let mut guest = ScriptedGuest::new(payloads);
    let mut session =
        BridgeSession::new(SuspendDispatcher::new(MemoryClipboard::new(), Some(tunnel)));

    let mut iterations = 0;
    while !guest.is_done() || session.is_suspended() || session.registry().has_resolution() {
        if iterations >= call_count * MAX_ITERATIONS_PER_CALL {
            bail!("bridge session did not settle after {iterations} iterations");
        }
        let _ = session.iterate(&mut guest);
        iterations += 1;
    }
    session.shutdown();

    report(&guest.results, &args.net_proxy)
}

fn collect_payloads(args: &Args) -> Result<Vec<Vec<u8>>> {
    let mut payloads = Vec::with_capacity(args.payload_hex.len() + args.payload_file.len());
    for text in &args.payload_hex {
        let bytes = hex::decode(text.trim())
            .with_context(|| format!("invalid --payload-hex value: {text}"))?;
        payloads.push(bytes);
    }
    for path in &args.payload_file {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read payload file: {}", path.display()))?;
        payloads.push(bytes);
    }
    Ok(payloads)
}

fn report(results: &[Resolution], proxy: &ProxyConfig) -> Result<()> {
    let mut rpc_index = 0;
    for resolution in results {
        match (resolution.kind, &resolution.outcome) {
            (SuspendKind::NetworkConnect, Outcome::Cancelled) => {
                bail!("failed to connect to network proxy at {proxy}");
            }
            (SuspendKind::NetworkRpc, Outcome::Resumed(ResumePayload::RpcResponse(bytes))) => {
                println!("rpc {rpc_index}: {}", hex::encode(bytes));
                rpc_index += 1;
            }
            (SuspendKind::NetworkRpc, _) => {
                println!("rpc {rpc_index}: cancelled");
                rpc_index += 1;
            }
            _ => {}
        }
    }
    Ok(())
}
