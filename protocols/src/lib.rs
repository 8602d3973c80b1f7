//! Packet construction for the probe techniques.
//!
//! Every builder returns plain bytes plus a short, human readable summary.
//! Nothing in here touches a socket; sending is the transport's job.

pub mod ethernet;
pub mod flow;
pub mod icmp;
pub mod ipv4;
pub mod ipv6;
pub mod reply;
pub mod tcp;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use anyhow::bail;
use pnet::util::MacAddr;

/// Which layer a probe has to be injected at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Complete Ethernet frame, sent through a datalink channel.
    Link,
    /// Complete IP packet, sent through a raw IP socket.
    Network,
}

/// Addresses a technique needs to craft its packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeContext {
    pub source: IpAddr,
    pub destination: IpAddr,
    pub port: u16,
    pub source_mac: Option<MacAddr>,
    /// TCP source port or ICMP echo identifier that tells this probe's
    /// replies apart.
    pub flow_id: u16,
}

impl ProbeContext {
    pub fn v4(&self) -> anyhow::Result<(Ipv4Addr, Ipv4Addr)> {
        match (self.source, self.destination) {
            (IpAddr::V4(src), IpAddr::V4(dst)) => Ok((src, dst)),
            _ => bail!("{} is not an IPv4 probe", self.destination),
        }
    }

    pub fn v6(&self) -> anyhow::Result<(Ipv6Addr, Ipv6Addr)> {
        match (self.source, self.destination) {
            (IpAddr::V6(src), IpAddr::V6(dst)) => Ok((src, dst)),
            (IpAddr::V4(src), IpAddr::V6(dst)) => Ok((src.to_ipv6_mapped(), dst)),
            _ => bail!("{} is not an IPv6 probe", self.destination),
        }
    }

    pub fn source_mac(&self) -> anyhow::Result<MacAddr> {
        self.source_mac
            .ok_or_else(|| anyhow::anyhow!("no MAC address on the route to {}", self.destination))
    }
}

/// A fully built probe, ready to be handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePacket {
    pub layer: Layer,
    pub destination: IpAddr,
    pub bytes: Vec<u8>,
    /// Start of the upper-layer header inside `bytes`.
    ///
    /// Used by transports that let the kernel write the IP header.
    pub upper_offset: usize,
    /// How many times the packet is sent; only the last send waits for a reply.
    pub copies: usize,
    pub summary: String,
}

impl ProbePacket {
    pub fn network(destination: IpAddr, bytes: Vec<u8>, summary: String) -> Self {
        Self {
            layer: Layer::Network,
            destination,
            bytes,
            upper_offset: 0,
            copies: 1,
            summary,
        }
    }

    pub fn link(destination: IpAddr, bytes: Vec<u8>, summary: String) -> Self {
        Self {
            layer: Layer::Link,
            ..Self::network(destination, bytes, summary)
        }
    }

    pub fn with_upper_offset(mut self, offset: usize) -> Self {
        self.upper_offset = offset;
        self
    }

    pub fn with_copies(mut self, copies: usize) -> Self {
        self.copies = copies.max(1);
        self
    }

    pub fn upper_layer(&self) -> &[u8] {
        &self.bytes[self.upper_offset.min(self.bytes.len())..]
    }
}

/// Joins layer summaries the way packet dissectors print them: `IP / TCP ...`.
pub fn layered_summary<I, S>(layers: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    layers
        .into_iter()
        .map(|layer| layer.as_ref().to_string())
        .collect::<Vec<String>>()
        .join(" / ")
}

/// Summary of an opaque payload.
pub fn raw_summary(payload: &[u8]) -> String {
    format!("Raw {}B", payload.len())
}
