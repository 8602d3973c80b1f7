//! # Target Enumeration
//!
//! Turns the parsed target list into hosts: flatten networks, resolve
//! names, then check each resolved address for liveness exactly once.
//!
//! Dead and unresolvable hosts stay in the list so the report can account
//! for them; the scanner skips them.

use std::net::IpAddr;

use tracing::{info, warn};
use volley_common::network::host::{Host, HostAddress};

use crate::network::HostIntelligence;

pub use volley_common::network::target::expand;

/// Resolves and liveness-checks every name, in input order.
pub async fn enumerate(names: &[String], intel: &dyn HostIntelligence) -> Vec<Host> {
    let mut hosts: Vec<Host> = Vec::with_capacity(names.len());

    for name in names {
        let Some(ip) = intel.resolve(name).await else {
            warn!("Failed to resolve {name}");
            hosts.push(Host::new(name.clone(), HostAddress::Unresolved(name.clone()), false));
            continue;
        };
        if ip.to_string() != *name {
            info!("Resolved {name} to {ip}");
        }

        let is_alive: bool = intel.is_alive(ip).await;
        if !is_alive {
            warn!("Target {ip} ({name}) is not alive");
        }
        hosts.push(Host::new(name.clone(), HostAddress::Ip(ip), is_alive));
    }

    hosts
}

/// The address IPv6 techniques use for `ip`: itself, or its IPv4-mapped form.
pub fn ipv6_form(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(v4) => IpAddr::V6(v4.to_ipv6_mapped()),
        IpAddr::V6(_) => ip,
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
