use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};

/// Largest network (in addresses) accepted as a single target.
pub const MAX_NETWORK_ADDRS: u128 = 65_536;

/// Number of addresses covered by `net`, saturating for `::/0`.
pub fn address_count(net: &IpNetwork) -> u128 {
    let bits: u32 = match net {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    let host_bits: u32 = bits - u32::from(net.prefix());
    1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
}

/// Every usable host address of `net`, in ascending order.
///
/// Host bits of the given address are ignored (`10.0.0.7/24` is `10.0.0.0/24`).
pub fn usable_hosts(net: &IpNetwork) -> Vec<IpAddr> {
    match net {
        IpNetwork::V4(v4) => usable_v4(v4),
        IpNetwork::V6(v6) => usable_v6(v6),
    }
}

fn usable_v4(net: &Ipv4Network) -> Vec<IpAddr> {
    let network: u32 = net.network().into();
    let broadcast: u32 = net.broadcast().into();

    // Point-to-point and single-host prefixes have no network/broadcast to strip
    let (start, end) = if net.prefix() >= 31 {
        (network, broadcast)
    } else {
        (network + 1, broadcast - 1)
    };

    (start..=end).map(|ip| IpAddr::V4(Ipv4Addr::from(ip))).collect()
}

fn usable_v6(net: &Ipv6Network) -> Vec<IpAddr> {
    let network: u128 = net.network().into();
    let mask: u128 = net.mask().into();
    let last: u128 = network | !mask;

    // Skip the subnet-router anycast address
    let start: u128 = if net.prefix() >= 127 { network } else { network + 1 };

    (start..=last).map(|ip| IpAddr::V6(Ipv6Addr::from(ip))).collect()
}
