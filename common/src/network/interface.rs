use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use pnet::datalink::{self, NetworkInterface};
use pnet::util::MacAddr;

/// Any port works, connecting a UDP socket sends nothing.
const ROUTE_PROBE_PORT: u16 = 9;

/// Asks the kernel which local address it would use to reach `dst`.
pub fn source_addr_for(dst: IpAddr) -> anyhow::Result<IpAddr> {
    let bind_addr: SocketAddr = match dst {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };
    let socket = UdpSocket::bind(bind_addr)?;
    socket.connect(SocketAddr::new(dst, ROUTE_PROBE_PORT))?;
    Ok(socket.local_addr()?.ip())
}

/// Finds the interface carrying `local_addr`.
pub fn interface_with_addr(local_addr: IpAddr) -> Option<NetworkInterface> {
    datalink::interfaces()
        .into_iter()
        .filter(|intf| intf.is_up())
        .find(|intf| intf.ips.iter().any(|net| net.ip() == local_addr))
}

/// The route towards `dst`: local address, outgoing interface and its MAC.
#[derive(Debug, Clone)]
pub struct Route {
    pub source: IpAddr,
    pub interface: Option<NetworkInterface>,
}

impl Route {
    pub fn lookup(dst: IpAddr) -> anyhow::Result<Self> {
        let source: IpAddr = source_addr_for(dst)?;
        Ok(Self {
            source,
            interface: interface_with_addr(source),
        })
    }

    pub fn mac(&self) -> Option<MacAddr> {
        self.interface.as_ref().and_then(|intf| intf.mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_routes_through_loopback() {
        let dst = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let source = source_addr_for(dst).unwrap();
        assert!(source.is_loopback());
    }
}
