use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pnet::util::MacAddr;
use volley_common::config::Config;
use volley_common::network::port::Port;
use volley_common::probe::{PortState, ProbeOutcome, ProbeResponse};
use volley_core::audit::AuditSink;
use volley_core::network::{HostIntelligence, PortChecker, ProbeSource, ProbeTransport};
use volley_core::probe::PluginProber;
use volley_core::scanner::Scanner;
use volley_plugins::PluginRegistry;
use volley_protocols::ProbePacket;

pub const TIMEOUT: Duration = Duration::from_millis(50);

/// Transport answering every packet sent to one of `answering`.
///
/// Records every destination it was asked to reach and the peak number of
/// sends in flight.
#[derive(Default)]
pub struct ScriptedTransport {
    pub answering: HashSet<IpAddr>,
    pub delay: Duration,
    pub destinations: Mutex<Vec<IpAddr>>,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn answering(addrs: &[IpAddr]) -> Self {
        Self {
            answering: addrs.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn sent_to(&self) -> Vec<IpAddr> {
        self.destinations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn send(&self, packet: &ProbePacket, _timeout: Duration) -> anyhow::Result<Option<ProbeResponse>> {
        let now: usize = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.destinations.lock().unwrap().push(packet.destination);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(self.answering.contains(&packet.destination).then(|| ProbeResponse {
            summary: format!("IP / TCP {}:80 > 10.0.0.2:20 RA", packet.destination),
            ttl: Some(128),
            carries_tcp: true,
        }))
    }

    fn source_for(&self, destination: IpAddr) -> ProbeSource {
        let address: IpAddr = match destination {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 2)),
        };
        ProbeSource {
            address,
            mac: Some(MacAddr::new(0x02, 0, 0, 0, 0, 0x02)),
        }
    }
}

/// Connect check with a fixed set of open (address, port) pairs.
#[derive(Default)]
pub struct FixedPorts {
    pub open: Vec<(IpAddr, Port)>,
}

#[async_trait]
impl PortChecker for FixedPorts {
    async fn check(&self, addr: IpAddr, port: Port) -> PortState {
        if self.open.contains(&(addr, port)) {
            PortState::Open
        } else {
            PortState::Closed
        }
    }
}

#[derive(Default)]
pub struct ScriptedIntel {
    pub names: HashMap<String, IpAddr>,
    pub alive: Vec<IpAddr>,
    pub pointers: HashMap<IpAddr, String>,
    pub liveness_checks: Mutex<Vec<IpAddr>>,
}

#[async_trait]
impl HostIntelligence for ScriptedIntel {
    async fn resolve(&self, name: &str) -> Option<IpAddr> {
        name.parse().ok().or_else(|| self.names.get(name).copied())
    }

    async fn reverse_lookup(&self, addr: IpAddr) -> Option<String> {
        self.pointers.get(&addr).cloned()
    }

    async fn is_alive(&self, addr: IpAddr) -> bool {
        self.liveness_checks.lock().unwrap().push(addr);
        self.alive.contains(&addr)
    }
}

#[derive(Default)]
pub struct MemoryAudit {
    pub records: Mutex<Vec<ProbeOutcome>>,
}

impl AuditSink for MemoryAudit {
    fn record(&self, outcome: &ProbeOutcome) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(outcome.clone());
        Ok(())
    }
}

/// The collaborators of one pipeline, kept around for inspection.
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub ports: Arc<FixedPorts>,
    pub intel: Arc<ScriptedIntel>,
    pub audit: Arc<MemoryAudit>,
}

impl Harness {
    pub fn new(transport: ScriptedTransport, ports: FixedPorts, intel: ScriptedIntel) -> Self {
        Self {
            transport: Arc::new(transport),
            ports: Arc::new(ports),
            intel: Arc::new(intel),
            audit: Arc::new(MemoryAudit::default()),
        }
    }

    pub fn scanner(&self, ports: Vec<Port>, config: &Config) -> Scanner {
        let prober = PluginProber::new(
            self.transport.clone(),
            self.ports.clone(),
            self.intel.clone(),
            self.audit.clone(),
            TIMEOUT,
        );
        let registry = PluginRegistry::builtin().unwrap();
        Scanner::new(Arc::new(registry), Arc::new(prober), ports, config)
    }

    pub fn audited(&self) -> usize {
        self.audit.records.lock().unwrap().len()
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}
