//! Turns captured replies into the [`ProbeResponse`] the core works with.

use pnet::packet::Packet;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::icmpv6::Icmpv6Packet;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::TcpPacket;
use volley_common::probe::ProbeResponse;

use crate::icmp::type_name;
use crate::tcp::flags_to_string;

/// Summarises a complete IPv4 packet, header included.
pub fn summarize_ipv4(bytes: &[u8]) -> Option<ProbeResponse> {
    let ipv4: Ipv4Packet = Ipv4Packet::new(bytes)?;
    let src = ipv4.get_source();
    let dst = ipv4.get_destination();
    let ttl: u8 = ipv4.get_ttl();

    let (upper, carries_tcp): (String, bool) = match ipv4.get_next_level_protocol() {
        IpNextHeaderProtocols::Tcp => {
            let tcp: TcpPacket = TcpPacket::new(ipv4.payload())?;
            let flags: u8 = (tcp.get_flags() & 0xff) as u8;
            (
                format!(
                    "TCP {src}:{} > {dst}:{} {}",
                    tcp.get_source(),
                    tcp.get_destination(),
                    flags_to_string(flags)
                ),
                true,
            )
        }
        IpNextHeaderProtocols::Icmp => {
            let icmp: IcmpPacket = IcmpPacket::new(ipv4.payload())?;
            (
                format!(
                    "ICMP {src} > {dst} {} {}",
                    type_name(icmp.get_icmp_type().0),
                    icmp.get_icmp_code().0
                ),
                false,
            )
        }
        other => (format!("{src} > {dst} proto {}", other.0), false),
    };

    Some(ProbeResponse {
        summary: crate::layered_summary(["IP", upper.as_str()]),
        ttl: Some(ttl),
        carries_tcp,
    })
}

/// Summarises an ICMPv6 message. Raw IPv6 sockets never hand over the IPv6
/// header, so the hop limit is unknown.
pub fn summarize_icmpv6(bytes: &[u8], source: std::net::Ipv6Addr) -> Option<ProbeResponse> {
    let icmp: Icmpv6Packet = Icmpv6Packet::new(bytes)?;
    let kind: String = match icmp.get_icmpv6_type().0 {
        129 => "echo-reply".to_string(),
        1 => "dest-unreach".to_string(),
        3 => "time-exceeded".to_string(),
        4 => "parameter-problem".to_string(),
        other => format!("type-{other}"),
    };
    Some(ProbeResponse {
        summary: crate::layered_summary([format!("IPv6 {source}"), format!("ICMPv6 {kind}")]),
        ttl: None,
        carries_tcp: false,
    })
}
