//! # Probe Execution
//!
//! One scan task is one plugin against one address and port. Executing it
//! runs three independent sub-operations concurrently:
//!
//! 1. the **protocol probe**: the plugin's crafted packet and the wait for a reply,
//! 2. the **port check**: a plain TCP connect, the only source of the port state,
//! 3. the **enrichment**: reverse DNS and the OS guess.
//!
//! Execution never fails. Every failure degrades into the outcome itself.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use volley_common::network::port::Port;
use volley_common::probe::{ProbeEvidence, ProbeOutcome, ProbeResponse};
use volley_plugins::PluginDescriptor;
use volley_protocols::flow::FlowIds;
use volley_protocols::{ProbeContext, ProbePacket};

use crate::audit::AuditSink;
use crate::network::{HostIntelligence, PortChecker, ProbeSource, ProbeTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTask {
    pub plugin: PluginDescriptor,
    pub address: IpAddr,
    pub port: Port,
}

#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    async fn execute(&self, task: &ScanTask) -> ProbeOutcome;
}

/// Runs the plugin's technique through the real collaborators.
pub struct PluginProber {
    transport: Arc<dyn ProbeTransport>,
    ports: Arc<dyn PortChecker>,
    intel: Arc<dyn HostIntelligence>,
    audit: Arc<dyn AuditSink>,
    probe_timeout: Duration,
    flow_ids: FlowIds,
}

impl PluginProber {
    pub fn new(
        transport: Arc<dyn ProbeTransport>,
        ports: Arc<dyn PortChecker>,
        intel: Arc<dyn HostIntelligence>,
        audit: Arc<dyn AuditSink>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            ports,
            intel,
            audit,
            probe_timeout,
            flow_ids: FlowIds::new(),
        }
    }

    /// Builds and sends the packet. Returns the sent summary and the reply.
    async fn probe(&self, task: &ScanTask) -> (String, Option<ProbeResponse>) {
        let source: ProbeSource = self.transport.source_for(task.address);
        let ctx = ProbeContext {
            source: source.address,
            destination: task.address,
            port: task.port,
            source_mac: source.mac,
            flow_id: self.flow_ids.next(),
        };

        let packet: ProbePacket = match task.plugin.technique.build(&ctx) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("{} could not build a packet for {}: {e}", task.plugin.name, task.address);
                return (format!("Not sent ({e})"), None);
            }
        };

        match self.transport.send(&packet, self.probe_timeout).await {
            Ok(response) => (packet.summary, response),
            Err(e) => {
                debug!("{} to {}:{} failed: {e:#}", task.plugin.name, task.address, task.port);
                (packet.summary, None)
            }
        }
    }
}

#[async_trait]
impl ProbeExecutor for PluginProber {
    async fn execute(&self, task: &ScanTask) -> ProbeOutcome {
        debug!("Performing {} on {}:{}", task.plugin.name, task.address, task.port);

        let ((sent_summary, response), port_state, domain_name) = tokio::join!(
            self.probe(task),
            self.ports.check(task.address, task.port),
            self.intel.reverse_lookup(task.address),
        );

        let evidence = ProbeEvidence {
            os_guess: self.intel.guess_os(response.as_ref()),
            sent_summary,
            response,
            port_state,
            domain_name,
        };
        let outcome: ProbeOutcome = ProbeOutcome::new(task.plugin.name.clone(), task.address, task.port, evidence);

        if let Err(e) = self.audit.record(&outcome) {
            warn!("Could not write audit record: {e:#}");
        }
        outcome
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
