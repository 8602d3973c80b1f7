use std::fmt;
use std::net::IpAddr;

/// Where probes for a host are sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostAddress {
    Ip(IpAddr),
    /// Resolution failed; the literal input is kept verbatim.
    Unresolved(String),
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostAddress::Ip(ip) => write!(f, "{ip}"),
            HostAddress::Unresolved(name) => f.write_str(name),
        }
    }
}

/// A concrete target after resolution and the liveness check.
///
/// Built once by the enumerator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub original: String,
    pub address: HostAddress,
    pub is_alive: bool,
}

impl Host {
    pub fn new(original: impl Into<String>, address: HostAddress, is_alive: bool) -> Self {
        Self {
            original: original.into(),
            address,
            is_alive,
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        match self.address {
            HostAddress::Ip(ip) => Some(ip),
            HostAddress::Unresolved(_) => None,
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.original)
    }
}
