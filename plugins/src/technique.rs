//! # Probe Techniques
//!
//! The closed set of probe techniques. Each variant knows its name, its
//! one-line description, the address family it speaks and how to craft the
//! packet it sends.

use std::net::IpAddr;

use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use volley_protocols::ethernet::{LinkFrame, LinkTag};
use volley_protocols::icmp::{IcmpMessage, SOURCE_QUENCH};
use volley_protocols::ipv4::{Ipv4Header, MAX_OPTIONS_LEN, MORE_FRAGMENTS};
use volley_protocols::ipv6::{Ipv6Header, echo_request_v6};
use volley_protocols::tcp::{ACK, SYN, TcpSegment, raw_option, timestamp_option};
use volley_protocols::{ProbeContext, ProbePacket, layered_summary, raw_summary};

use crate::registry::AddressFamily;

const OVERSIZED_PAYLOAD_LEN: usize = 60_000;
const COVERT_PAYLOAD_LEN: usize = 20;
const FLOW_LABEL: u32 = 12345;
const FLOW_LABEL_TOS: u8 = 0x28;
const FRAGMENT_OFFSET: u16 = 64;
const OUT_OF_ORDER_SEQ: u32 = 1000;

const INVERSE_MAPPING_OPTION: [u8; 3] = [0x83, 0x03, 0x03];
const SECURITY_OPTION: [u8; 4] = [0x82, 0x04, 0x00, 0x00];
const EXPERIMENTAL_TCP_OPTION: u8 = 0x42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technique {
    InverseMapping,
    BadTcpChecksum,
    AckTunneling,
    Ipv6ExtensionHeader,
    FlowLabelV6,
    FlowLabelV4,
    FragmentedIcmp,
    CovertChannel,
    VlanHopping,
    ApplicationLayer,
    MalformedPacket,
    SynAck,
    TcpTimestamp,
    FragmentationOffset,
    TcpUrgentPointer,
    CustomFragmentedTcp,
    TcpOutOfOrder,
    TcpKeepAlive,
    Gre,
    Ipsec,
    IpOptionPadding,
    RandomizedTtl,
    ReverseIp,
    CustomIpOptions,
    IcmpSourceQuench,
    CustomTcpOption,
    CustomPayloadTcp,
    Mpls,
    EthernetFrame,
    TcpDuplicateAck,
}

impl Technique {
    /// Every technique, in registration order.
    pub const ALL: [Technique; 30] = [
        Technique::InverseMapping,
        Technique::BadTcpChecksum,
        Technique::AckTunneling,
        Technique::Ipv6ExtensionHeader,
        Technique::FlowLabelV6,
        Technique::FlowLabelV4,
        Technique::FragmentedIcmp,
        Technique::CovertChannel,
        Technique::VlanHopping,
        Technique::ApplicationLayer,
        Technique::MalformedPacket,
        Technique::SynAck,
        Technique::TcpTimestamp,
        Technique::FragmentationOffset,
        Technique::TcpUrgentPointer,
        Technique::CustomFragmentedTcp,
        Technique::TcpOutOfOrder,
        Technique::TcpKeepAlive,
        Technique::Gre,
        Technique::Ipsec,
        Technique::IpOptionPadding,
        Technique::RandomizedTtl,
        Technique::ReverseIp,
        Technique::CustomIpOptions,
        Technique::IcmpSourceQuench,
        Technique::CustomTcpOption,
        Technique::CustomPayloadTcp,
        Technique::Mpls,
        Technique::EthernetFrame,
        Technique::TcpDuplicateAck,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Technique::InverseMapping => "Inverse Mapping Scan",
            Technique::BadTcpChecksum => "Bad TCP Checksum Scan",
            Technique::AckTunneling => "ACK Tunneling Scan",
            Technique::Ipv6ExtensionHeader => "IPv6 Extension Header Scanning",
            Technique::FlowLabelV6 => "Flow Label Scanning (IPv6)",
            Technique::FlowLabelV4 => "Flow Label Scanning (IPv4)",
            Technique::FragmentedIcmp => "Fragmented ICMP Scanning",
            Technique::CovertChannel => "Covert Channel Scanning",
            Technique::VlanHopping => "VLAN Hopping Scan",
            Technique::ApplicationLayer => "Application Layer Scanning",
            Technique::MalformedPacket => "Malformed Packet Scan",
            Technique::SynAck => "SYN+ACK Scan",
            Technique::TcpTimestamp => "TCP Timestamp Option Manipulation Scan",
            Technique::FragmentationOffset => "Fragmentation Offset Manipulation Scan",
            Technique::TcpUrgentPointer => "TCP Urgent Pointer Scan",
            Technique::CustomFragmentedTcp => "Custom Fragmented TCP Scan",
            Technique::TcpOutOfOrder => "TCP Out-of-Order Scan",
            Technique::TcpKeepAlive => "TCP Keep-Alive Probe",
            Technique::Gre => "GRE Scan",
            Technique::Ipsec => "IPsec Scan",
            Technique::IpOptionPadding => "IP Option Padding Scan",
            Technique::RandomizedTtl => "Randomized TTL Scan",
            Technique::ReverseIp => "Reverse IP Scan",
            Technique::CustomIpOptions => "Custom IP Options Scan",
            Technique::IcmpSourceQuench => "ICMP Source Quench Scan",
            Technique::CustomTcpOption => "Custom TCP Option Scan",
            Technique::CustomPayloadTcp => "Custom Payload TCP Scan",
            Technique::Mpls => "MPLS Scan",
            Technique::EthernetFrame => "Ethernet Frame Scan",
            Technique::TcpDuplicateAck => "TCP Duplicate ACK Scan",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Technique::InverseMapping => "Uses the IP option to send packets with an invalid IP header.",
            Technique::BadTcpChecksum => "Sends TCP packets with an incorrect checksum.",
            Technique::AckTunneling => "Uses the ACK flag to tunnel data.",
            Technique::Ipv6ExtensionHeader => "Sends packets with IPv6 extension headers.",
            Technique::FlowLabelV6 => "Scans using the IPv6 flow label.",
            Technique::FlowLabelV4 => "Scans using the IPv4 flow label.",
            Technique::FragmentedIcmp => "Sends fragmented ICMP packets.",
            Technique::CovertChannel => "Scans for covert channels.",
            Technique::VlanHopping => "Attempts to hop VLANs.",
            Technique::ApplicationLayer => "Scans at the application layer.",
            Technique::MalformedPacket => "Sends packets with malformed headers.",
            Technique::SynAck => "Sends SYN+ACK packets to scan.",
            Technique::TcpTimestamp => "Manipulates TCP timestamp options.",
            Technique::FragmentationOffset => "Manipulates fragmentation offset.",
            Technique::TcpUrgentPointer => "Uses the TCP urgent pointer.",
            Technique::CustomFragmentedTcp => "Sends custom fragmented TCP packets.",
            Technique::TcpOutOfOrder => "Sends TCP packets out of order.",
            Technique::TcpKeepAlive => "Sends TCP keep-alive probes.",
            Technique::Gre => "Scans using the GRE protocol.",
            Technique::Ipsec => "Scans using the IPsec protocol.",
            Technique::IpOptionPadding => "Sends packets with IP option padding.",
            Technique::RandomizedTtl => "Uses random TTL values for scanning.",
            Technique::ReverseIp => "Sends packets with the source IP set to the destination IP.",
            Technique::CustomIpOptions => "Uses custom IP options for scanning.",
            Technique::IcmpSourceQuench => "Sends ICMP source quench packets.",
            Technique::CustomTcpOption => "Uses custom TCP options for scanning.",
            Technique::CustomPayloadTcp => "Sends TCP packets with custom payloads.",
            Technique::Mpls => "Uses MPLS labels for scanning.",
            Technique::EthernetFrame => "Sends Ethernet frames for scanning.",
            Technique::TcpDuplicateAck => "Sends duplicate TCP ACKs.",
        }
    }

    pub fn family(&self) -> AddressFamily {
        match self {
            Technique::Ipv6ExtensionHeader | Technique::FlowLabelV6 => AddressFamily::V6,
            _ => AddressFamily::V4,
        }
    }

    /// Crafts the packet for `ctx`. Pure apart from the random fields
    /// (IP identification, randomized TTL). TCP source ports and ICMP echo
    /// identifiers come from `ctx.flow_id`.
    pub fn build(&self, ctx: &ProbeContext) -> anyhow::Result<ProbePacket> {
        match self {
            Technique::InverseMapping => icmp_probe(ctx, |ip| ip.with_options(&INVERSE_MAPPING_OPTION)),
            Technique::BadTcpChecksum => tcp_probe(ctx, TcpSegment::to_port(ctx.port).with_checksum(0x1234)),
            Technique::AckTunneling => tcp_probe(ctx, TcpSegment::default().with_flags(ACK).with_acknowledgement(0)),
            Technique::Ipv6ExtensionHeader => icmpv6_probe(ctx, |ip| ip.with_routing_header()),
            Technique::FlowLabelV6 => icmpv6_probe(ctx, |ip| ip.with_flow_label(FLOW_LABEL)),
            Technique::FlowLabelV4 => icmp_probe(ctx, |ip| ip.with_tos(FLOW_LABEL_TOS)),
            Technique::FragmentedIcmp => {
                let (src, dst) = ctx.v4()?;
                let header = Ipv4Header::new(src, dst, IpNextHeaderProtocols::Icmp).with_flags(MORE_FRAGMENTS);
                let message = IcmpMessage::echo_request()
                    .with_identifier(ctx.flow_id)
                    .with_data(b"X".repeat(OVERSIZED_PAYLOAD_LEN));
                let summary = layered_summary([header.describe(), message.describe(), raw_summary(&message.data)]);
                Ok(ProbePacket::network(ctx.destination, header.build(&message.build()?)?, summary))
            }
            Technique::CovertChannel => tcp_probe(
                ctx,
                TcpSegment::to_port(ctx.port).with_payload(b"X".repeat(COVERT_PAYLOAD_LEN)),
            ),
            Technique::VlanHopping => link_probe(ctx, &[LinkTag::Dot1Q { vlan: 1 }, LinkTag::Dot1Q { vlan: 2 }]),
            Technique::ApplicationLayer => {
                let request: String = format!("GET / HTTP/1.1\r\nHost: {}\r\n\r\n", ctx.destination);
                tcp_probe(ctx, TcpSegment::to_port(ctx.port).with_payload(request.into_bytes()))
            }
            Technique::MalformedPacket => icmp_probe(ctx, |ip| ip.malformed(3, 2)),
            Technique::SynAck => tcp_probe(ctx, TcpSegment::to_port(ctx.port).with_flags(SYN | ACK)),
            Technique::TcpTimestamp => tcp_probe(
                ctx,
                TcpSegment::to_port(ctx.port).with_option(&timestamp_option(123, 0)),
            ),
            Technique::FragmentationOffset => icmp_probe(ctx, |ip| ip.with_fragment_offset(FRAGMENT_OFFSET)),
            Technique::TcpUrgentPointer => tcp_probe(ctx, TcpSegment::to_port(ctx.port).with_urgent_ptr(0xFFFF)),
            Technique::CustomFragmentedTcp => tcp_probe(
                ctx,
                TcpSegment::to_port(ctx.port)
                    .with_flags(SYN)
                    .with_payload(b"X".repeat(OVERSIZED_PAYLOAD_LEN)),
            ),
            Technique::TcpOutOfOrder => tcp_probe(ctx, TcpSegment::to_port(ctx.port).with_sequence(OUT_OF_ORDER_SEQ)),
            Technique::TcpKeepAlive => tcp_probe(ctx, TcpSegment::to_port(ctx.port).with_flags(ACK)),
            // flags and protocol type all zero
            Technique::Gre => raw_ip_probe(ctx, IpNextHeaderProtocols::Gre, vec![0u8; 4], "GRE"),
            Technique::Ipsec => raw_ip_probe(
                ctx,
                IpNextHeaderProtocols::Esp,
                b"X".repeat(COVERT_PAYLOAD_LEN),
                "ESP",
            ),
            Technique::IpOptionPadding => {
                let mut options: Vec<u8> = INVERSE_MAPPING_OPTION.to_vec();
                options.resize(MAX_OPTIONS_LEN, 0);
                icmp_probe(ctx, |ip| ip.with_options(&options))
            }
            Technique::RandomizedTtl => {
                let ttl: u8 = rand::random_range(1..=255);
                icmp_probe(ctx, |ip| ip.with_ttl(ttl))
            }
            Technique::ReverseIp => {
                let (_, dst) = ctx.v4()?;
                icmp_probe(ctx, |mut ip| {
                    ip.source = dst;
                    ip
                })
            }
            Technique::CustomIpOptions => icmp_probe(ctx, |ip| ip.with_options(&SECURITY_OPTION)),
            Technique::IcmpSourceQuench => {
                let (src, dst) = ctx.v4()?;
                let header = Ipv4Header::new(src, dst, IpNextHeaderProtocols::Icmp);
                let message = IcmpMessage::of_type(SOURCE_QUENCH).with_identifier(ctx.flow_id);
                let summary = layered_summary([header.describe(), message.describe()]);
                Ok(ProbePacket::network(ctx.destination, header.build(&message.build()?)?, summary))
            }
            Technique::CustomTcpOption => tcp_probe(
                ctx,
                TcpSegment::to_port(ctx.port).with_option(&raw_option(EXPERIMENTAL_TCP_OPTION, &[1, 2, 3, 4])),
            ),
            Technique::CustomPayloadTcp => tcp_probe(ctx, TcpSegment::to_port(ctx.port).with_payload(b"CustomPayload".to_vec())),
            Technique::Mpls => link_probe(
                ctx,
                &[LinkTag::Mpls {
                    label: 3,
                    cos: 5,
                    bottom: true,
                    ttl: 64,
                }],
            ),
            Technique::EthernetFrame => link_probe(ctx, &[]),
            Technique::TcpDuplicateAck => Ok(tcp_probe(
                ctx,
                TcpSegment::to_port(ctx.port).with_flags(ACK).with_acknowledgement(1),
            )?
            .with_copies(2)),
        }
    }
}

/// IPv4 header shaped by `shape`, carrying an ICMP echo request.
fn icmp_probe(ctx: &ProbeContext, shape: impl FnOnce(Ipv4Header) -> Ipv4Header) -> anyhow::Result<ProbePacket> {
    let (src, dst) = ctx.v4()?;
    let header: Ipv4Header = shape(Ipv4Header::new(src, dst, IpNextHeaderProtocols::Icmp));
    let message = IcmpMessage::echo_request().with_identifier(ctx.flow_id);
    let summary: String = layered_summary([header.describe(), message.describe()]);
    Ok(ProbePacket::network(ctx.destination, header.build(&message.build()?)?, summary))
}

fn tcp_probe(ctx: &ProbeContext, segment: TcpSegment) -> anyhow::Result<ProbePacket> {
    let (src, dst) = ctx.v4()?;
    let segment: TcpSegment = segment.with_source_port(ctx.flow_id);
    let header = Ipv4Header::new(src, dst, IpNextHeaderProtocols::Tcp);
    let tcp: Vec<u8> = segment.build(IpAddr::V4(src), IpAddr::V4(dst))?;

    let mut layers: Vec<String> = vec![header.describe(), segment.describe(IpAddr::V4(src), IpAddr::V4(dst))];
    if !segment.payload.is_empty() {
        layers.push(raw_summary(&segment.payload));
    }
    Ok(ProbePacket::network(ctx.destination, header.build(&tcp)?, layered_summary(layers)))
}

fn raw_ip_probe(
    ctx: &ProbeContext,
    protocol: IpNextHeaderProtocol,
    payload: Vec<u8>,
    label: &str,
) -> anyhow::Result<ProbePacket> {
    let (src, dst) = ctx.v4()?;
    let header = Ipv4Header::new(src, dst, protocol);
    let summary: String = layered_summary([header.describe(), label.to_string(), raw_summary(&payload)]);
    Ok(ProbePacket::network(ctx.destination, header.build(&payload)?, summary))
}

fn icmpv6_probe(ctx: &ProbeContext, shape: impl FnOnce(Ipv6Header) -> Ipv6Header) -> anyhow::Result<ProbePacket> {
    let (src, dst) = ctx.v6()?;
    let header: Ipv6Header = shape(Ipv6Header::new(src, dst));
    let echo: Vec<u8> = echo_request_v6(src, dst, ctx.flow_id)?;
    let summary: String = layered_summary([header.describe(), "ICMPv6EchoRequest".to_string()]);
    let bytes: Vec<u8> = header.build(IpNextHeaderProtocols::Icmpv6, &echo)?;
    Ok(ProbePacket::network(ctx.destination, bytes, summary).with_upper_offset(header.upper_offset()))
}

/// Ethernet frame to the broadcast address, tagged with `tags`, carrying
/// IP / ICMP echo request.
fn link_probe(ctx: &ProbeContext, tags: &[LinkTag]) -> anyhow::Result<ProbePacket> {
    let (src, dst) = ctx.v4()?;
    let frame: LinkFrame = tags
        .iter()
        .fold(LinkFrame::broadcast(ctx.source_mac()?), |frame, tag| frame.with_tag(*tag));
    let header = Ipv4Header::new(src, dst, IpNextHeaderProtocols::Icmp);
    let message = IcmpMessage::echo_request().with_identifier(ctx.flow_id);
    let (bytes, ip_offset) = frame.build(&header.build(&message.build()?)?)?;
    let summary: String = layered_summary([frame.describe(), header.describe(), message.describe()]);
    Ok(ProbePacket::link(ctx.destination, bytes, summary).with_upper_offset(ip_offset))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
