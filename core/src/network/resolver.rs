use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pnet::packet::ip::IpNextHeaderProtocols;
use tracing::debug;
use volley_protocols::icmp::IcmpMessage;
use volley_protocols::ipv4::Ipv4Header;
use volley_protocols::ipv6::{Ipv6Header, echo_request_v6};
use volley_protocols::flow::FlowIds;
use volley_protocols::{ProbeContext, ProbePacket, layered_summary};

use super::tcp::handshake_probe;
use super::{HostIntelligence, ProbeSource, ProbeTransport};

/// Host intelligence backed by the system resolver and the probe transport.
pub struct SystemIntel {
    transport: Arc<dyn ProbeTransport>,
    liveness_timeout: Duration,
    flow_ids: FlowIds,
}

impl SystemIntel {
    pub fn new(transport: Arc<dyn ProbeTransport>, liveness_timeout: Duration) -> Self {
        Self {
            transport,
            liveness_timeout,
            flow_ids: FlowIds::new(),
        }
    }
}

#[async_trait]
impl HostIntelligence for SystemIntel {
    async fn resolve(&self, name: &str) -> Option<IpAddr> {
        if let Ok(ip) = name.parse::<IpAddr>() {
            return Some(ip);
        }
        match tokio::net::lookup_host((name, 0)).await {
            Ok(addrs) => {
                let addrs: Vec<SocketAddr> = addrs.collect();
                addrs
                    .iter()
                    .find(|addr| addr.is_ipv4())
                    .or_else(|| addrs.first())
                    .map(SocketAddr::ip)
            }
            Err(e) => {
                debug!("Lookup of {name} failed: {e}");
                None
            }
        }
    }

    async fn reverse_lookup(&self, addr: IpAddr) -> Option<String> {
        match tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr)).await {
            Ok(Ok(name)) => Some(name),
            Ok(Err(e)) => {
                debug!("No PTR record for {addr}: {e}");
                None
            }
            Err(_join) => None,
        }
    }

    /// ICMP echo through the transport. Without raw sockets the transport
    /// errors and a TCP handshake decides instead.
    async fn is_alive(&self, addr: IpAddr) -> bool {
        let echo: anyhow::Result<ProbePacket> = echo_probe(self.transport.source_for(addr), addr, self.flow_ids.next());
        let sent = match echo {
            Ok(packet) => self.transport.send(&packet, self.liveness_timeout).await,
            Err(e) => Err(e),
        };
        match sent {
            Ok(reply) => reply.is_some(),
            Err(e) => {
                debug!("Echo to {addr} failed ({e}), falling back to a TCP handshake");
                handshake_probe(addr, self.liveness_timeout).await
            }
        }
    }
}

/// Plain ICMP (or ICMPv6) echo request towards `destination`.
pub fn echo_probe(source: ProbeSource, destination: IpAddr, flow_id: u16) -> anyhow::Result<ProbePacket> {
    let ctx = ProbeContext {
        source: source.address,
        destination,
        port: 0,
        source_mac: source.mac,
        flow_id,
    };
    match destination {
        IpAddr::V4(_) => {
            let (src, dst) = ctx.v4()?;
            let header = Ipv4Header::new(src, dst, IpNextHeaderProtocols::Icmp);
            let message = IcmpMessage::echo_request().with_identifier(flow_id);
            let summary: String = layered_summary([header.describe(), message.describe()]);
            Ok(ProbePacket::network(destination, header.build(&message.build()?)?, summary))
        }
        IpAddr::V6(_) => {
            let (src, dst) = ctx.v6()?;
            let header = Ipv6Header::new(src, dst);
            let summary: String = layered_summary([header.describe(), "ICMPv6EchoRequest".to_string()]);
            let bytes: Vec<u8> = header.build(IpNextHeaderProtocols::Icmpv6, &echo_request_v6(src, dst, flow_id)?)?;
            Ok(ProbePacket::network(destination, bytes, summary).with_upper_offset(header.upper_offset()))
        }
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
