use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use pnet::{
    datalink::{self, Channel, DataLinkSender, NetworkInterface},
    packet::{Packet, icmpv6::Icmpv6Packet, ip::IpNextHeaderProtocols, ipv4::Ipv4Packet},
    transport::{self, TransportChannelType, TransportProtocol, TransportReceiver, TransportSender},
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use volley_common::network::interface::Route;
use volley_common::probe::ProbeResponse;
use volley_protocols::flow::{self, ProbeSignature, ReplyFlow};
use volley_protocols::{Layer, ProbePacket, reply};

use super::{ProbeSource, ProbeTransport};

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const REPLY_BACKLOG: usize = 1024;
const LISTENER_MAX_ERRORS: u32 = 8;
const LISTENER_BACKOFF: Duration = Duration::from_millis(5);

const CHANNEL_TYPE_TCP: TransportChannelType = TransportChannelType::Layer3(IpNextHeaderProtocols::Tcp);
const CHANNEL_TYPE_ICMP: TransportChannelType = TransportChannelType::Layer3(IpNextHeaderProtocols::Icmp);
const CHANNEL_TYPE_ICMPV6: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv6(IpNextHeaderProtocols::Icmpv6));

/// A captured reply, the address it came from and the flow it belongs to.
#[derive(Debug, Clone)]
struct Reply {
    source: IpAddr,
    flow: ReplyFlow,
    response: ProbeResponse,
}

type SharedSender = Arc<Mutex<TransportSender>>;
type LinkSenders = Arc<Mutex<HashMap<String, Box<dyn DataLinkSender>>>>;

/// Raw socket transport.
///
/// IPv4 probes are injected with their own header through a layer 3 socket,
/// IPv6 probes through an ICMPv6 socket (the kernel writes the IPv6 header)
/// and link-layer probes through a datalink channel on the outgoing
/// interface. Listener threads capture TCP, ICMP and ICMPv6 replies and fan
/// them out to every in-flight probe, which keeps only those of its own flow.
pub struct RawTransport {
    ipv4_tx: SharedSender,
    icmpv6_tx: Option<SharedSender>,
    link_senders: LinkSenders,
    replies: broadcast::Sender<Reply>,
}

macro_rules! spawn_listener {
    ($tx:expr, $rx:expr, $iter_func:path, $capture:expr) => {
        std::thread::spawn(move || {
            let mut iterator = $iter_func(&mut $rx);
            let next = || iterator.next().map(|(packet, source)| (packet.packet().to_vec(), source));
            let e: std::io::Error = listen(next, $capture, &$tx);
            warn!("Reply listener stopped, probes will see no replies: {e}");
        })
    };
}

/// Publishes captured replies until the socket keeps failing. Backs off a
/// little longer after each consecutive error and returns the last one.
fn listen(
    mut next: impl FnMut() -> std::io::Result<(Vec<u8>, IpAddr)>,
    capture: fn(&[u8], IpAddr) -> Option<Reply>,
    replies: &broadcast::Sender<Reply>,
) -> std::io::Error {
    let mut errors: u32 = 0;
    loop {
        match next() {
            Ok((bytes, source)) => {
                errors = 0;
                if let Some(reply) = capture(&bytes, source) {
                    // no receivers just means no probe is waiting
                    let _ = replies.send(reply);
                }
            }
            Err(e) => {
                errors += 1;
                if errors >= LISTENER_MAX_ERRORS {
                    return e;
                }
                debug!("Reply capture failed ({errors} in a row): {e}");
                std::thread::sleep(LISTENER_BACKOFF * errors);
            }
        }
    }
}

/// Whether `reply` belongs to the probe described by `signature`.
fn answers(signature: &ProbeSignature, reply: &Reply) -> bool {
    signature.answered_by(reply.source, &reply.flow)
}

impl RawTransport {
    /// Opens the raw sockets. Fails without the privileges to do so.
    pub fn open() -> anyhow::Result<Self> {
        let (ipv4_tx, mut tcp_rx) = open_channel(CHANNEL_TYPE_TCP).context("opening raw tcp socket")?;
        let (_, mut icmp_rx) = open_channel(CHANNEL_TYPE_ICMP).context("opening raw icmp socket")?;
        let (replies, _) = broadcast::channel::<Reply>(REPLY_BACKLOG);

        let tcp_replies = replies.clone();
        spawn_listener!(tcp_replies, tcp_rx, transport::ipv4_packet_iter, capture_v4);
        let icmp_replies = replies.clone();
        spawn_listener!(icmp_replies, icmp_rx, transport::ipv4_packet_iter, capture_v4);

        let icmpv6_tx: Option<SharedSender> = match open_channel(CHANNEL_TYPE_ICMPV6) {
            Ok((tx, mut icmpv6_rx)) => {
                let icmpv6_replies = replies.clone();
                spawn_listener!(icmpv6_replies, icmpv6_rx, transport::icmpv6_packet_iter, capture_v6);
                Some(Arc::new(Mutex::new(tx)))
            }
            Err(e) => {
                debug!("ICMPv6 socket unavailable, IPv6 probes will fail: {e}");
                None
            }
        };

        Ok(Self {
            ipv4_tx: Arc::new(Mutex::new(ipv4_tx)),
            icmpv6_tx,
            link_senders: Arc::new(Mutex::new(HashMap::new())),
            replies,
        })
    }

    async fn inject(&self, packet: &ProbePacket) -> anyhow::Result<()> {
        let destination: IpAddr = packet.destination;
        match (packet.layer, destination) {
            (Layer::Link, _) => {
                let interface: NetworkInterface = Route::lookup(destination)?
                    .interface
                    .with_context(|| format!("no interface routes to {destination}"))?;
                let senders: LinkSenders = Arc::clone(&self.link_senders);
                let bytes: Vec<u8> = packet.bytes.clone();
                tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                    let mut senders = senders.lock().map_err(|_| anyhow!("datalink senders poisoned"))?;
                    let sender = match senders.entry(interface.name.clone()) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(entry) => entry.insert(open_link_sender(&interface)?),
                    };
                    sender.send_to(&bytes, None).context("datalink send queue full")??;
                    Ok(())
                })
                .await??;
            }
            (Layer::Network, IpAddr::V4(_)) => {
                let tx: SharedSender = Arc::clone(&self.ipv4_tx);
                let bytes: Vec<u8> = packet.bytes.clone();
                tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                    let ipv4 = Ipv4Packet::new(&bytes).context("creating ipv4 packet")?;
                    let mut sender = tx.lock().map_err(|_| anyhow!("ipv4 sender poisoned"))?;
                    sender.send_to(ipv4, destination)?;
                    Ok(())
                })
                .await??;
            }
            (Layer::Network, IpAddr::V6(_)) => {
                let tx: SharedSender = self.icmpv6_tx.clone().context("no ICMPv6 socket")?;
                let bytes: Vec<u8> = packet.upper_layer().to_vec();
                tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                    let icmpv6 = Icmpv6Packet::new(&bytes).context("creating icmpv6 packet")?;
                    let mut sender = tx.lock().map_err(|_| anyhow!("icmpv6 sender poisoned"))?;
                    sender.send_to(icmpv6, destination)?;
                    Ok(())
                })
                .await??;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProbeTransport for RawTransport {
    async fn send(&self, packet: &ProbePacket, timeout: Duration) -> anyhow::Result<Option<ProbeResponse>> {
        let signature: ProbeSignature = ProbeSignature::of(packet)?;
        // subscribe first so a fast reply cannot slip past
        let mut replies = self.replies.subscribe();
        for _ in 0..packet.copies {
            self.inject(packet).await?;
        }

        let wait_for_reply = async {
            loop {
                match replies.recv().await {
                    Ok(reply) if answers(&signature, &reply) => return Some(reply.response),
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return None,
                }
            }
        };

        Ok(tokio::time::timeout(timeout, wait_for_reply).await.ok().flatten())
    }

    fn source_for(&self, destination: IpAddr) -> ProbeSource {
        route_source(destination)
    }
}

/// Stand-in used when raw sockets cannot be opened: every send fails, so
/// every probe reports no response.
pub struct OfflineTransport {
    reason: String,
}

impl OfflineTransport {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl ProbeTransport for OfflineTransport {
    async fn send(&self, packet: &ProbePacket, _timeout: Duration) -> anyhow::Result<Option<ProbeResponse>> {
        bail!("cannot send to {}: {}", packet.destination, self.reason)
    }

    fn source_for(&self, destination: IpAddr) -> ProbeSource {
        route_source(destination)
    }
}

/// Local address and MAC the kernel would use towards `destination`.
pub fn route_source(destination: IpAddr) -> ProbeSource {
    match Route::lookup(destination) {
        Ok(route) => ProbeSource {
            address: route.source,
            mac: route.mac(),
        },
        Err(e) => {
            debug!("No route to {destination}: {e}");
            let address: IpAddr = match destination {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            };
            ProbeSource { address, mac: None }
        }
    }
}

fn capture_v4(bytes: &[u8], source: IpAddr) -> Option<Reply> {
    Some(Reply {
        source,
        flow: flow::reply_flow_v4(bytes)?,
        response: reply::summarize_ipv4(bytes)?,
    })
}

fn capture_v6(bytes: &[u8], source: IpAddr) -> Option<Reply> {
    let IpAddr::V6(v6_source) = source else {
        return None;
    };
    Some(Reply {
        source,
        flow: flow::reply_flow_v6(bytes)?,
        response: reply::summarize_icmpv6(bytes, v6_source)?,
    })
}

fn open_channel(channel_type: TransportChannelType) -> anyhow::Result<(TransportSender, TransportReceiver)> {
    let (tx, rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, channel_type)?;
    Ok((tx, rx))
}

fn open_link_sender(interface: &NetworkInterface) -> anyhow::Result<Box<dyn DataLinkSender>> {
    match datalink::channel(interface, datalink::Config::default())? {
        Channel::Ethernet(tx, _rx) => Ok(tx),
        _ => bail!("unsupported channel type on {}", interface.name),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
