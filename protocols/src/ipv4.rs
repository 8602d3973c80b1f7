use std::net::Ipv4Addr;

use anyhow::{Context, ensure};
use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::packet::ipv4::{MutableIpv4Packet, checksum};

pub const IPV4_HDR_LEN: usize = 20;
pub const MAX_OPTIONS_LEN: usize = 40;

pub const MORE_FRAGMENTS: u8 = 0b001;

/// An IPv4 header with every field a technique may want to bend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: IpNextHeaderProtocol,
    pub version: u8,
    /// Header length in 32-bit words; derived from the options when `None`.
    pub ihl: Option<u8>,
    pub tos: u8,
    pub flags: u8,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub options: Vec<u8>,
}

impl Ipv4Header {
    pub fn new(source: Ipv4Addr, destination: Ipv4Addr, protocol: IpNextHeaderProtocol) -> Self {
        Self {
            source,
            destination,
            protocol,
            version: 4,
            ihl: None,
            tos: 0,
            flags: 0,
            fragment_offset: 0,
            ttl: 64,
            options: Vec::new(),
        }
    }

    pub fn with_tos(mut self, tos: u8) -> Self {
        self.tos = tos;
        self
    }

    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_fragment_offset(mut self, offset: u16) -> Self {
        self.fragment_offset = offset;
        self
    }

    pub fn with_options(mut self, options: &[u8]) -> Self {
        self.options.extend_from_slice(options);
        self
    }

    /// Forces a version and header length, producing a malformed header.
    pub fn malformed(mut self, version: u8, ihl: u8) -> Self {
        self.version = version;
        self.ihl = Some(ihl);
        self
    }

    pub fn build(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
        ensure!(
            self.options.len() <= MAX_OPTIONS_LEN,
            "IPv4 options take {} bytes, at most {MAX_OPTIONS_LEN} fit",
            self.options.len()
        );
        let options_len: usize = self.options.len().div_ceil(4) * 4;
        let header_len: usize = IPV4_HDR_LEN + options_len;
        let total_len: usize = header_len + payload.len();
        ensure!(total_len <= usize::from(u16::MAX), "IPv4 packet of {total_len} bytes is too large");

        let mut buffer: Vec<u8> = vec![0u8; total_len];
        buffer[IPV4_HDR_LEN..IPV4_HDR_LEN + self.options.len()].copy_from_slice(&self.options);
        buffer[header_len..].copy_from_slice(payload);

        {
            let ihl: u8 = self.ihl.unwrap_or((header_len / 4) as u8);
            let mut ipv4 = MutableIpv4Packet::new(&mut buffer).context("creating ipv4 packet")?;
            ipv4.set_version(self.version);
            ipv4.set_header_length(ihl);
            ipv4.set_dscp(self.tos >> 2);
            ipv4.set_ecn(self.tos & 0b11);
            ipv4.set_total_length(total_len as u16);
            ipv4.set_identification(rand::random());
            ipv4.set_flags(self.flags);
            ipv4.set_fragment_offset(self.fragment_offset);
            ipv4.set_ttl(self.ttl);
            ipv4.set_next_level_protocol(self.protocol);
            ipv4.set_source(self.source);
            ipv4.set_destination(self.destination);

            ipv4.set_checksum(0);
            if ihl >= 5 {
                let csm: u16 = checksum(&ipv4.to_immutable());
                ipv4.set_checksum(csm);
            }
        }

        Ok(buffer)
    }

    pub fn describe(&self) -> String {
        let mut summary: String = format!("IP {} > {}", self.source, self.destination);
        if self.ttl != 64 {
            summary.push_str(&format!(" ttl={}", self.ttl));
        }
        if self.tos != 0 {
            summary.push_str(&format!(" tos={:#04x}", self.tos));
        }
        if self.flags & MORE_FRAGMENTS != 0 {
            summary.push_str(" MF");
        }
        if self.fragment_offset != 0 {
            summary.push_str(&format!(" frag={}", self.fragment_offset));
        }
        if !self.options.is_empty() {
            summary.push_str(&format!(" options={}B", self.options.len()));
        }
        if self.version != 4 || self.ihl.is_some() {
            summary.push_str(&format!(" version={} ihl={}", self.version, self.ihl.unwrap_or(5)));
        }
        summary
    }
}
