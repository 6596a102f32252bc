//! # syncps-demo
//!
//! A demo node on a SyncPS collection over UDP multicast. Every node
//! subscribes to the whole collection and prints what arrives; with
//! `--count` it also publishes a timestamped message per period and
//! reports whether each one provably reached a peer.
//!
//! ## Example
//!
//! ```bash
//! # terminal on host A: publish 10 messages, 1 per second
//! syncps-demo --id alice --count 10
//!
//! # terminal on host B: listen only
//! syncps-demo --id bob
//! ```
//!
//! All nodes must share the group/port and, when `--group-key` is given,
//! the same hex key (content is then AEAD-encrypted on the wire).

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use syncps_core::SyncPs;
use syncps_face::UdpMulticastFace;
use syncps_sigmgrs::{SigMgrAead, SigMgrNull, SigMgrSha256, KEY_SIZE};
use syncps_types::{Name, Prefix, SigMgr};

/// Demo node for the SyncPS collection-sync transport.
#[derive(Parser, Debug)]
#[command(name = "syncps-demo")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Node identity used in published message names
    #[arg(long, default_value = "node")]
    id: String,

    /// Collection name to synchronize
    #[arg(long, default_value = "/demo/chat")]
    collection: String,

    /// IPv4 multicast group
    #[arg(long, default_value = "239.77.7.7")]
    group: Ipv4Addr,

    /// UDP port
    #[arg(long, default_value_t = 56363)]
    port: u16,

    /// Interface address to join on (default: let the kernel pick)
    #[arg(long, default_value = "0.0.0.0")]
    ifaddr: Ipv4Addr,

    /// Number of messages to publish (0 = listen only)
    #[arg(long, short = 'n', default_value_t = 0)]
    count: u32,

    /// Seconds between published messages
    #[arg(long, short = 'w', default_value_t = 1.0)]
    wait: f64,

    /// 64-hex-digit group key; content is AEAD-encrypted when present
    #[arg(long)]
    group_key: Option<String>,
}

fn parse_group_key(hex: &str) -> Result<[u8; KEY_SIZE]> {
    if hex.len() != KEY_SIZE * 2 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("group key must be {} hex digits", KEY_SIZE * 2);
    }
    let mut key = [0u8; KEY_SIZE];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).expect("checked hex");
    }
    Ok(key)
}

/// Publish one message and arm the next tick until `left` runs out; after
/// the last confirmation window the node stops itself.
fn publish_tick(eng: &mut SyncPs, id: String, topic: Name, period: Duration, left: u32) {
    if left == 0 {
        // give the last message its lifetime to be confirmed, then leave
        eng.one_time(Duration::from_secs(3), |e| e.stop());
        return;
    }
    let content = format!("message {left} from {id}");
    match eng.make_publication(topic.clone(), content.into_bytes()) {
        Ok(p) => {
            let shown = p.name().clone();
            eng.publish_confirmed(p, move |_p, arrived| {
                if arrived {
                    info!(name = %shown, "confirmed by a peer");
                } else {
                    info!(name = %shown, "expired unconfirmed");
                }
            });
        }
        Err(e) => tracing::warn!(error = %e, "could not build publication"),
    }
    eng.one_time(period, move |e| publish_tick(e, id, topic, period, left - 1));
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let cli = Cli::parse();

    let coll = Name::parse(&cli.collection);
    if coll.is_empty() {
        bail!("collection name must not be empty");
    }

    let face = UdpMulticastFace::new(cli.group, cli.port, cli.ifaddr)
        .context("opening multicast face")?;

    // packets carry an integrity digest; content protection is optional
    let pub_sigmgr: Box<dyn SigMgr> = match &cli.group_key {
        Some(hex) => Box::new(SigMgrAead::new(parse_group_key(hex)?)),
        None => Box::new(SigMgrNull::new()),
    };
    let mut engine = SyncPs::new(face, coll.clone(), SigMgrSha256::new(), pub_sigmgr);

    engine.subscribe(Prefix::new(coll.clone()), |_eng, p| {
        let text = String::from_utf8_lossy(p.content());
        info!(name = %p.name(), "received: {text}");
    });

    if cli.count > 0 {
        let topic = coll
            .clone()
            .append(syncps_types::Component::generic(cli.id.as_bytes().to_vec()));
        let period = Duration::from_secs_f64(cli.wait.max(0.01));
        let id = cli.id.clone();
        let count = cli.count;
        // first tick goes out once registration completes
        engine.one_time(Duration::from_millis(100), move |e| {
            publish_tick(e, id, topic, period, count)
        });
    }

    info!(
        collection = %coll,
        group = %cli.group,
        port = cli.port,
        "syncps demo node running"
    );
    engine.run();
    Ok(())
}
