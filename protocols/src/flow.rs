//! Pairs captured replies with the probe that caused them.
//!
//! Every probe carries a flow id: its TCP source port, or its ICMP echo
//! identifier. A reply answers a probe only when it belongs to the same
//! flow, so probes in flight towards one host never take each other's
//! replies, and neither do the kernel's own connections.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU16, Ordering};

use anyhow::Context;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;

use crate::ProbePacket;
use crate::icmp::{ECHO_REPLY, ECHO_REQUEST, ICMP_HDR_LEN};
use crate::ipv4::IPV4_HDR_LEN;
use crate::ipv6::IPV6_HDR_LEN;

/// Flow ids stay below the Linux ephemeral range (32768 and up), so they
/// never collide with the source port of a kernel connection.
const FLOW_ID_BASE: u16 = 20_000;
const FLOW_ID_SPAN: u16 = 12_000;

const TCP: u8 = IpNextHeaderProtocols::Tcp.0;
const ICMP: u8 = IpNextHeaderProtocols::Icmp.0;
const ICMPV6: u8 = IpNextHeaderProtocols::Icmpv6.0;
const IPV6_ROUTE: u8 = IpNextHeaderProtocols::Ipv6Route.0;

const ICMPV6_ECHO_REQUEST: u8 = 128;
const ICMPV6_ECHO_REPLY: u8 = 129;

/// ICMP types that quote the datagram they complain about.
const ICMP_ERRORS: [u8; 5] = [3, 4, 5, 11, 12];
const ICMPV6_ERRORS: [u8; 4] = [1, 2, 3, 4];

/// Hands out flow ids, one per probe.
#[derive(Debug)]
pub struct FlowIds {
    next: AtomicU16,
}

impl FlowIds {
    pub fn new() -> Self {
        Self {
            next: AtomicU16::new(rand::random_range(0..FLOW_ID_SPAN)),
        }
    }

    pub fn next(&self) -> u16 {
        FLOW_ID_BASE + self.next.fetch_add(1, Ordering::Relaxed) % FLOW_ID_SPAN
    }
}

impl Default for FlowIds {
    fn default() -> Self {
        Self::new()
    }
}

/// One conversation, seen from the prober's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Tcp { local_port: u16, remote_port: u16 },
    /// ICMP or ICMPv6 echo.
    Echo { identifier: u16, sequence: u16 },
    /// Anything else. Only the IP protocol is known.
    Datagram { protocol: u8 },
}

/// What a reply must match to answer a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSignature {
    pub destination: IpAddr,
    /// IPv4 identification. `None` for IPv6, where the kernel writes the header.
    pub ip_id: Option<u16>,
    pub flow: Flow,
}

/// The flow a captured packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFlow {
    /// Traffic inside a flow, addressed back to the prober.
    Direct(Flow),
    /// An ICMP error quoting the start of the datagram that caused it.
    Error {
        destination: IpAddr,
        ip_id: Option<u16>,
        flow: Flow,
    },
}

impl ProbeSignature {
    pub fn of(packet: &ProbePacket) -> anyhow::Result<Self> {
        let upper: &[u8] = packet.upper_layer();
        match packet.destination {
            IpAddr::V4(_) => {
                let (_, ip_id, flow) =
                    ipv4_flow(upper).with_context(|| format!("no IPv4 header in probe to {}", packet.destination))?;
                Ok(Self {
                    destination: packet.destination,
                    ip_id: Some(ip_id),
                    flow,
                })
            }
            IpAddr::V6(_) => Ok(Self {
                destination: packet.destination,
                ip_id: None,
                flow: outbound_flow(ICMPV6, upper, ICMPV6_ECHO_REQUEST),
            }),
        }
    }

    /// Whether a packet from `source` carrying `reply` answers this probe.
    ///
    /// Direct replies must come from the probed address. ICMP errors may come
    /// from any router on the path, the quoted datagram identifies the probe.
    pub fn answered_by(&self, source: IpAddr, reply: &ReplyFlow) -> bool {
        match reply {
            ReplyFlow::Direct(flow) => source == self.destination && *flow == self.flow,
            ReplyFlow::Error { destination, ip_id, flow } => {
                let same_datagram: bool = match (self.ip_id, ip_id) {
                    // zero is rewritten by the kernel, so it cannot be compared
                    (Some(ours), Some(quoted)) if ours != 0 => ours == *quoted,
                    _ => true,
                };
                *destination == self.destination && same_datagram && *flow == self.flow
            }
        }
    }
}

/// Flow of a captured IPv4 packet, header included.
pub fn reply_flow_v4(bytes: &[u8]) -> Option<ReplyFlow> {
    let ip: Ipv4Packet = Ipv4Packet::new(bytes)?;
    let upper: &[u8] = bytes.get(ipv4_header_len(&ip)..)?;
    let protocol: u8 = ip.get_next_level_protocol().0;

    match protocol {
        TCP => Some(ReplyFlow::Direct(Flow::Tcp {
            local_port: be16(upper, 2)?,
            remote_port: be16(upper, 0)?,
        })),
        ICMP => match *upper.first()? {
            ECHO_REPLY => Some(ReplyFlow::Direct(echo_flow(upper)?)),
            kind if ICMP_ERRORS.contains(&kind) => {
                let (destination, ip_id, flow) = ipv4_flow(upper.get(ICMP_HDR_LEN..)?)?;
                Some(ReplyFlow::Error {
                    destination: IpAddr::V4(destination),
                    ip_id: Some(ip_id),
                    flow,
                })
            }
            _ => Some(ReplyFlow::Direct(Flow::Datagram { protocol })),
        },
        other => Some(ReplyFlow::Direct(Flow::Datagram { protocol: other })),
    }
}

/// Flow of a captured ICMPv6 message. Raw sockets strip the IPv6 header.
pub fn reply_flow_v6(bytes: &[u8]) -> Option<ReplyFlow> {
    match *bytes.first()? {
        ICMPV6_ECHO_REPLY => Some(ReplyFlow::Direct(echo_flow(bytes)?)),
        kind if ICMPV6_ERRORS.contains(&kind) => {
            let (destination, flow) = ipv6_flow(bytes.get(ICMP_HDR_LEN..)?)?;
            Some(ReplyFlow::Error {
                destination: IpAddr::V6(destination),
                ip_id: None,
                flow,
            })
        }
        _ => Some(ReplyFlow::Direct(Flow::Datagram { protocol: ICMPV6 })),
    }
}

/// Destination, identification and flow of an outgoing IPv4 datagram.
/// Works on the truncated copy quoted by ICMP errors too.
fn ipv4_flow(bytes: &[u8]) -> Option<(Ipv4Addr, u16, Flow)> {
    let ip: Ipv4Packet = Ipv4Packet::new(bytes)?;
    let upper: &[u8] = bytes.get(ipv4_header_len(&ip)..).unwrap_or_default();
    let flow: Flow = outbound_flow(ip.get_next_level_protocol().0, upper, ECHO_REQUEST);
    Some((ip.get_destination(), ip.get_identification(), flow))
}

/// Destination and flow of an outgoing IPv6 datagram, skipping a routing header.
fn ipv6_flow(bytes: &[u8]) -> Option<(Ipv6Addr, Flow)> {
    let destination: [u8; 16] = bytes.get(24..IPV6_HDR_LEN)?.try_into().ok()?;
    let mut next_header: u8 = *bytes.get(6)?;
    let mut upper: &[u8] = bytes.get(IPV6_HDR_LEN..)?;
    if next_header == IPV6_ROUTE {
        let ext_len: usize = (usize::from(*upper.get(1)?) + 1) * 8;
        next_header = *upper.first()?;
        upper = upper.get(ext_len..).unwrap_or_default();
    }
    Some((Ipv6Addr::from(destination), outbound_flow(next_header, upper, ICMPV6_ECHO_REQUEST)))
}

/// Flow of a packet we sent, given its upper-layer bytes.
fn outbound_flow(protocol: u8, upper: &[u8], echo_request: u8) -> Flow {
    let flow: Option<Flow> = match protocol {
        TCP => be16(upper, 0).zip(be16(upper, 2)).map(|(local_port, remote_port)| Flow::Tcp {
            local_port,
            remote_port,
        }),
        ICMP | ICMPV6 if upper.first() == Some(&echo_request) => echo_flow(upper),
        _ => None,
    };
    flow.unwrap_or(Flow::Datagram { protocol })
}

fn echo_flow(icmp: &[u8]) -> Option<Flow> {
    Some(Flow::Echo {
        identifier: be16(icmp, 4)?,
        sequence: be16(icmp, 6)?,
    })
}

/// Header length, clamped to the fixed header when the field is bogus.
fn ipv4_header_len(ip: &Ipv4Packet) -> usize {
    (usize::from(ip.get_header_length()) * 4).max(IPV4_HDR_LEN)
}

fn be16(bytes: &[u8], at: usize) -> Option<u16> {
    bytes.get(at..at + 2).map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
}
