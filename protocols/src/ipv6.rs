use std::net::Ipv6Addr;

use anyhow::{Context, ensure};
use pnet::packet::icmpv6::{self, Icmpv6Code, Icmpv6Types, MutableIcmpv6Packet};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv6::MutableIpv6Packet;

pub const IPV6_HDR_LEN: usize = 40;
pub const ROUTING_HDR_LEN: usize = 8;
const ICMPV6_ECHO_LEN: usize = 8;

/// An IPv6 header, optionally followed by an empty type 0 routing header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Header {
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
    pub traffic_class: u8,
    pub flow_label: u32,
    pub hop_limit: u8,
    pub routing_header: bool,
}

impl Ipv6Header {
    pub fn new(source: Ipv6Addr, destination: Ipv6Addr) -> Self {
        Self {
            source,
            destination,
            traffic_class: 0,
            flow_label: 0,
            hop_limit: 64,
            routing_header: false,
        }
    }

    pub fn with_flow_label(mut self, flow_label: u32) -> Self {
        self.flow_label = flow_label & 0x000f_ffff;
        self
    }

    pub fn with_routing_header(mut self) -> Self {
        self.routing_header = true;
        self
    }

    /// Offset of the upper-layer header inside the built packet.
    pub fn upper_offset(&self) -> usize {
        if self.routing_header {
            IPV6_HDR_LEN + ROUTING_HDR_LEN
        } else {
            IPV6_HDR_LEN
        }
    }

    pub fn build(&self, next_header: IpNextHeaderProtocol, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
        let upper_offset: usize = self.upper_offset();
        let payload_len: usize = upper_offset - IPV6_HDR_LEN + payload.len();
        ensure!(payload_len <= usize::from(u16::MAX), "IPv6 payload of {payload_len} bytes is too large");

        let mut buffer: Vec<u8> = vec![0u8; upper_offset + payload.len()];
        if self.routing_header {
            // next header, length 0, type 0, segments left 0, reserved
            buffer[IPV6_HDR_LEN] = next_header.0;
        }
        buffer[upper_offset..].copy_from_slice(payload);

        {
            let mut ipv6 = MutableIpv6Packet::new(&mut buffer).context("creating ipv6 packet")?;
            ipv6.set_version(6);
            ipv6.set_traffic_class(self.traffic_class);
            ipv6.set_flow_label(self.flow_label);
            ipv6.set_payload_length(payload_len as u16);
            ipv6.set_next_header(if self.routing_header {
                IpNextHeaderProtocols::Ipv6Route
            } else {
                next_header
            });
            ipv6.set_hop_limit(self.hop_limit);
            ipv6.set_source(self.source);
            ipv6.set_destination(self.destination);
        }

        Ok(buffer)
    }

    pub fn describe(&self) -> String {
        let mut summary: String = format!("IPv6 {} > {}", self.source, self.destination);
        if self.flow_label != 0 {
            summary.push_str(&format!(" fl={}", self.flow_label));
        }
        if self.routing_header {
            summary.push_str(" / IPv6ExtHdrRouting");
        }
        summary
    }
}

/// An ICMPv6 echo request with its checksum computed for `src` and `dst`.
pub fn echo_request_v6(src: Ipv6Addr, dst: Ipv6Addr, identifier: u16) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ICMPV6_ECHO_LEN];
    buffer[4..6].copy_from_slice(&identifier.to_be_bytes());

    {
        let mut icmp = MutableIcmpv6Packet::new(&mut buffer).context("creating icmpv6 packet")?;
        icmp.set_icmpv6_type(Icmpv6Types::EchoRequest);
        icmp.set_icmpv6_code(Icmpv6Code(0));
        icmp.set_checksum(0);
        let csm: u16 = icmpv6::checksum(&icmp.to_immutable(), &src, &dst);
        icmp.set_checksum(csm);
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::packet::icmpv6::Icmpv6Packet;
    use pnet::packet::ipv6::Ipv6Packet;

    fn addrs() -> (Ipv6Addr, Ipv6Addr) {
        ("fe80::1".parse().unwrap(), "fe80::2".parse().unwrap())
    }

    #[test]
    fn flow_label_is_written() {
        let (src, dst) = addrs();
        let header = Ipv6Header::new(src, dst).with_flow_label(12345);
        let echo = echo_request_v6(src, dst, 7).unwrap();
        let bytes = header.build(IpNextHeaderProtocols::Icmpv6, &echo).unwrap();
        let packet = Ipv6Packet::new(&bytes).unwrap();

        assert_eq!(packet.get_flow_label(), 12345);
        assert_eq!(packet.get_payload_length(), 8);
        assert_eq!(packet.get_next_header(), IpNextHeaderProtocols::Icmpv6);
        assert_eq!(header.upper_offset(), IPV6_HDR_LEN);
    }

    #[test]
    fn routing_header_chains_to_the_payload() {
        let (src, dst) = addrs();
        let header = Ipv6Header::new(src, dst).with_routing_header();
        let echo = echo_request_v6(src, dst, 7).unwrap();
        let bytes = header.build(IpNextHeaderProtocols::Icmpv6, &echo).unwrap();
        let packet = Ipv6Packet::new(&bytes).unwrap();

        assert_eq!(packet.get_next_header(), IpNextHeaderProtocols::Ipv6Route);
        assert_eq!(bytes[IPV6_HDR_LEN], 58);
        assert_eq!(packet.get_payload_length(), 16);
        assert_eq!(&bytes[header.upper_offset()..], echo.as_slice());
        assert!(header.describe().ends_with("IPv6ExtHdrRouting"));
    }

    #[test]
    fn echo_request_checksum_matches() {
        let (src, dst) = addrs();
        let echo = echo_request_v6(src, dst, 7).unwrap();
        let packet = Icmpv6Packet::new(&echo).unwrap();
        assert_eq!(packet.get_icmpv6_type(), Icmpv6Types::EchoRequest);
        assert_eq!(packet.get_checksum(), icmpv6::checksum(&packet, &src, &dst));
    }
}
