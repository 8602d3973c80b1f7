//! # Network Collaborators
//!
//! Everything the scanner needs from the outside world, expressed as traits:
//! sending crafted packets, checking ports, and learning about hosts.
//!
//! The production adapters live in the submodules. Tests swap in scripted
//! fakes, so the orchestration logic never needs raw sockets.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use pnet::util::MacAddr;
use volley_common::network::port::Port;
use volley_common::probe::{OsGuess, PortState, ProbeResponse};
use volley_protocols::ProbePacket;

pub mod resolver;
pub mod tcp;
pub mod transport;

/// Local addressing used to craft a probe towards a given destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSource {
    pub address: IpAddr,
    pub mac: Option<MacAddr>,
}

/// Injects crafted packets and reports the first matching reply.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Sends `packet` and waits up to `timeout` for a reply within its flow.
    /// Other traffic from the destination does not count. `Ok(None)` means
    /// nothing came back in time.
    async fn send(&self, packet: &ProbePacket, timeout: Duration) -> anyhow::Result<Option<ProbeResponse>>;

    fn source_for(&self, destination: IpAddr) -> ProbeSource;
}

/// The reliable port-state check. Never fails: errors mean `Closed`.
#[async_trait]
pub trait PortChecker: Send + Sync {
    async fn check(&self, addr: IpAddr, port: Port) -> PortState;
}

#[async_trait]
pub trait HostIntelligence: Send + Sync {
    async fn resolve(&self, name: &str) -> Option<IpAddr>;

    async fn reverse_lookup(&self, addr: IpAddr) -> Option<String>;

    fn guess_os(&self, response: Option<&ProbeResponse>) -> OsGuess {
        OsGuess::from_response(response)
    }

    async fn is_alive(&self, addr: IpAddr) -> bool;
}
