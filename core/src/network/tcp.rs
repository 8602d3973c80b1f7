use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;
use volley_common::network::port::Port;
use volley_common::probe::PortState;

use super::PortChecker;

/// Port probed by the handshake liveness fallback.
pub const HANDSHAKE_PORT: Port = 443;

/// Full TCP connect, closed again right away.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnectChecker {
    connect_timeout: Duration,
}

impl TcpConnectChecker {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl PortChecker for TcpConnectChecker {
    async fn check(&self, addr: IpAddr, port: Port) -> PortState {
        let socket_addr: SocketAddr = SocketAddr::new(addr, port);
        match timeout(self.connect_timeout, TcpStream::connect(socket_addr)).await {
            Ok(Ok(_stream)) => PortState::Open,
            Ok(Err(e)) => {
                debug!("connect to {socket_addr} failed: {e}");
                PortState::Closed
            }
            Err(_elapsed) => PortState::Closed,
        }
    }
}

/// Liveness without raw sockets: any answer to a TCP handshake, even a
/// refusal, means something is there.
pub async fn handshake_probe(addr: IpAddr, probe_timeout: Duration) -> bool {
    let socket_addr: SocketAddr = SocketAddr::new(addr, HANDSHAKE_PORT);
    match timeout(probe_timeout, TcpStream::connect(socket_addr)).await {
        Ok(Ok(_)) | Ok(Err(_)) => true,
        Err(_elapsed) => false,
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn listening_port_is_open() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port: Port = listener.local_addr().unwrap().port();

        let checker = TcpConnectChecker::new(Duration::from_secs(1));
        assert_eq!(checker.check(LOCALHOST, port).await, PortState::Open);
    }

    #[tokio::test]
    async fn refused_port_is_closed() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port: Port = listener.local_addr().unwrap().port();
        drop(listener);

        let checker = TcpConnectChecker::new(Duration::from_secs(1));
        assert_eq!(checker.check(LOCALHOST, port).await, PortState::Closed);
    }

    #[tokio::test]
    async fn refusal_still_counts_as_alive() {
        assert!(handshake_probe(LOCALHOST, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    #[ignore]
    async fn handshake_probe_should_timeout_on_unreachable_ip() {
        let ip: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1));
        assert!(!handshake_probe(ip, Duration::from_millis(100)).await);
    }
}
