//! # Probe Outcome Model
//!
//! The normalized record produced by exactly one scan task, plus the small
//! value types it is made of.
//!
//! Two facts are kept apart on purpose:
//! * `success` tells whether the protocol probe got *any* reply.
//! * `port_state` comes from the reliable connect check and nothing else.

use std::fmt;
use std::net::IpAddr;

use crate::network::port::Port;

/// Printed wherever a probe got no reply.
pub const NO_RESPONSE: &str = "No response";
/// Printed wherever enrichment could not produce a value.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortState {
    Open,
    Closed,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortState::Open => f.write_str("Open"),
            PortState::Closed => f.write_str("Closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsGuess {
    Linux,
    Windows,
    Unknown,
}

impl OsGuess {
    /// TTL heuristic. Only replies carrying TCP are classified.
    pub fn from_response(response: Option<&ProbeResponse>) -> Self {
        let Some(response) = response else {
            return OsGuess::Unknown;
        };
        if !response.carries_tcp {
            return OsGuess::Unknown;
        }
        match response.ttl {
            Some(ttl) if ttl <= 64 => OsGuess::Linux,
            Some(ttl) if ttl <= 128 => OsGuess::Windows,
            _ => OsGuess::Unknown,
        }
    }
}

impl fmt::Display for OsGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsGuess::Linux => f.write_str("Linux"),
            OsGuess::Windows => f.write_str("Windows"),
            OsGuess::Unknown => f.write_str(UNKNOWN),
        }
    }
}

/// A reply as seen by the core: a printable summary plus the metadata the
/// OS heuristic needs. Packet internals never leave the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub summary: String,
    pub ttl: Option<u8>,
    pub carries_tcp: bool,
}

/// Everything the three sub-operations of a probe found out.
#[derive(Debug, Clone)]
pub struct ProbeEvidence {
    pub sent_summary: String,
    pub response: Option<ProbeResponse>,
    pub port_state: PortState,
    pub os_guess: OsGuess,
    pub domain_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub plugin_name: String,
    pub sent_summary: String,
    pub received_summary: Option<String>,
    pub os_guess: OsGuess,
    pub target_address: IpAddr,
    pub domain_name: String,
    pub port: Port,
    pub port_state: PortState,
    pub success: bool,
}

impl ProbeOutcome {
    pub fn new(
        plugin_name: impl Into<String>,
        target_address: IpAddr,
        port: Port,
        evidence: ProbeEvidence,
    ) -> Self {
        let success = evidence.response.is_some();
        Self {
            plugin_name: plugin_name.into(),
            sent_summary: evidence.sent_summary,
            received_summary: evidence.response.map(|response| response.summary),
            os_guess: evidence.os_guess,
            target_address,
            domain_name: evidence.domain_name.unwrap_or_else(|| UNKNOWN.to_string()),
            port,
            port_state: evidence.port_state,
            success,
        }
    }

    /// Outcome of a task that never got a reply nor a connect.
    pub fn unanswered(
        plugin_name: impl Into<String>,
        target_address: IpAddr,
        port: Port,
        sent_summary: String,
    ) -> Self {
        let evidence = ProbeEvidence {
            sent_summary,
            response: None,
            port_state: PortState::Closed,
            os_guess: OsGuess::Unknown,
            domain_name: None,
        };
        Self::new(plugin_name, target_address, port, evidence)
    }

    pub fn response_summary(&self) -> &str {
        self.received_summary.as_deref().unwrap_or(NO_RESPONSE)
    }

    pub fn success_label(&self) -> &'static str {
        if self.success { "Yes" } else { "No" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));

    fn tcp_reply(ttl: u8) -> ProbeResponse {
        ProbeResponse {
            summary: format!("IP / TCP 10.0.0.5:80 > 10.0.0.2:20 SA ttl={ttl}"),
            ttl: Some(ttl),
            carries_tcp: true,
        }
    }

    #[test]
    fn os_guess_follows_ttl_thresholds() {
        assert_eq!(OsGuess::from_response(Some(&tcp_reply(64))), OsGuess::Linux);
        assert_eq!(OsGuess::from_response(Some(&tcp_reply(65))), OsGuess::Windows);
        assert_eq!(OsGuess::from_response(Some(&tcp_reply(128))), OsGuess::Windows);
        assert_eq!(OsGuess::from_response(Some(&tcp_reply(255))), OsGuess::Unknown);
        assert_eq!(OsGuess::from_response(None), OsGuess::Unknown);
    }

    #[test]
    fn os_guess_ignores_replies_without_tcp() {
        let icmp = ProbeResponse {
            summary: "IP / ICMP echo-reply".into(),
            ttl: Some(60),
            carries_tcp: false,
        };
        assert_eq!(OsGuess::from_response(Some(&icmp)), OsGuess::Unknown);
    }

    #[test]
    fn success_mirrors_reply_presence() {
        let evidence = ProbeEvidence {
            sent_summary: "IP / TCP".into(),
            response: Some(tcp_reply(64)),
            port_state: PortState::Closed,
            os_guess: OsGuess::Linux,
            domain_name: Some("host.example".into()),
        };
        let answered = ProbeOutcome::new("SYN+ACK Scan", ADDR, 80, evidence);
        assert!(answered.success);
        assert_eq!(answered.success_label(), "Yes");
        assert_eq!(answered.port_state, PortState::Closed);

        let silent = ProbeOutcome::unanswered("SYN+ACK Scan", ADDR, 80, "IP / TCP".into());
        assert!(!silent.success);
        assert_eq!(silent.response_summary(), NO_RESPONSE);
        assert_eq!(silent.domain_name, UNKNOWN);
    }
}
