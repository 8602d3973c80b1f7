use std::net::IpAddr;

use crate::terminal::colors;
use colored::*;
use volley_common::network::port::Port;
use volley_common::network::target::Target;

pub fn ip(addr: IpAddr) -> ColoredString {
    match addr {
        IpAddr::V4(v4) => v4.to_string().color(colors::IPV4_ADDR),
        IpAddr::V6(v6) => v6.to_string().color(colors::IPV6_ADDR),
    }
}

/// Single addresses print bare, networks as `address/prefix`.
pub fn target(target: &Target) -> String {
    match target {
        Target::Host { name } => name.color(colors::HOSTNAME).to_string(),
        Target::Network { net } => {
            let full_prefix: u8 = if net.is_ipv4() { 32 } else { 128 };
            if net.prefix() == full_prefix {
                return ip(net.ip()).to_string();
            }
            let prefix: ColoredString = net.prefix().to_string().color(colors::PREFIX);
            format!("{}{}{}", ip(net.ip()), "/".color(colors::SEPARATOR), prefix)
        }
    }
}

pub fn targets(targets: &[Target]) -> String {
    targets.iter().map(target).collect::<Vec<_>>().join(", ")
}

pub fn ports(ports: &[Port]) -> String {
    ports.iter().map(Port::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_common::network::target::parse_commas;

    #[test]
    fn single_addresses_drop_the_prefix() {
        colored::control::set_override(false);
        let parsed = parse_commas("10.0.0.5, 10.0.0.0/30, web.lan").unwrap();
        assert_eq!(targets(&parsed), "10.0.0.5, 10.0.0.0/30, web.lan");
    }

    #[test]
    fn ports_keep_their_order() {
        assert_eq!(ports(&[443, 22, 80]), "443, 22, 80");
    }
}
