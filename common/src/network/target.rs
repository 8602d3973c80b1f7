//! # Scan Target Model
//!
//! Defines the possible inputs for a scan.
//!
//! A target is one of:
//! * A host name (e.g., `scanme.example`), resolved later.
//! * A single IP address (e.g., `10.0.0.5` or `2001:db8::1`).
//! * A CIDR block (e.g., `192.168.1.0/24`), expanded into its usable hosts.

use std::net::IpAddr;
use std::str::FromStr;

use pnet::ipnetwork::IpNetwork;

use crate::error::TargetError;
use crate::network::range::{self, MAX_NETWORK_ADDRS};

/// Represents a distinct target to be scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A name that still has to be resolved.
    Host { name: String },
    /// A block of addresses. Single IPs are stored as /32 or /128.
    Network { net: IpNetwork },
}

impl FromStr for Target {
    type Err = TargetError;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Address**: Single IPv4/IPv6 address (e.g., "192.168.1.5").
    /// * **CIDR**: "Network/Prefix" (e.g., "192.168.1.0/24").
    /// * **Name**: anything else without whitespace or slashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(target) = parse_addr(s) {
            return Ok(target);
        }

        if let Some(target) = parse_cidr(s)? {
            return Ok(target);
        }

        parse_name(s)
    }
}

impl Target {
    /// The concrete target strings this entry stands for.
    pub fn hosts(&self) -> Vec<String> {
        match self {
            Target::Host { name } => vec![name.clone()],
            Target::Network { net } => range::usable_hosts(net)
                .into_iter()
                .map(|ip| ip.to_string())
                .collect(),
        }
    }
}

/// Parses a comma-separated list of targets (e.g., "10.0.0.5, 10.0.1.0/30, example.org").
pub fn parse_commas(s: &str) -> Result<Vec<Target>, TargetError> {
    let targets: Vec<Target> = s
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Target::from_str)
        .collect::<Result<_, _>>()?;

    if targets.is_empty() {
        return Err(TargetError::Empty);
    }
    Ok(targets)
}

/// Flattens targets into concrete target strings, keeping order and duplicates.
pub fn expand(targets: &[Target]) -> Vec<String> {
    targets.iter().flat_map(Target::hosts).collect()
}

fn parse_addr(s: &str) -> Option<Target> {
    s.parse::<IpAddr>().ok().map(|ip| Target::Network {
        net: IpNetwork::from(ip),
    })
}

fn parse_cidr(s: &str) -> Result<Option<Target>, TargetError> {
    if !s.contains('/') {
        return Ok(None);
    }

    let net: IpNetwork = s.parse().map_err(|e: pnet::ipnetwork::IpNetworkError| {
        TargetError::InvalidNetwork {
            input: s.to_string(),
            reason: e.to_string(),
        }
    })?;

    let count: u128 = range::address_count(&net);
    if count > MAX_NETWORK_ADDRS {
        return Err(TargetError::NetworkTooLarge {
            network: s.to_string(),
            hosts: count,
            limit: MAX_NETWORK_ADDRS,
        });
    }

    Ok(Some(Target::Network { net }))
}

fn parse_name(s: &str) -> Result<Target, TargetError> {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return Err(TargetError::InvalidHost(s.to_string()));
    }
    Ok(Target::Host {
        name: s.to_string(),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
