use std::sync::Arc;

use anyhow::Context;
use tracing::warn;
use volley_common::config::Config;
use volley_common::network::host::Host;
use volley_common::network::port::{Port, parse_ports};
use volley_common::network::target::{Target, parse_commas};
use volley_core::audit::AuditLog;
use volley_core::discovery::{enumerate, expand};
use volley_core::network::resolver::SystemIntel;
use volley_core::network::tcp::TcpConnectChecker;
use volley_core::network::transport::{OfflineTransport, RawTransport};
use volley_core::network::ProbeTransport;
use volley_core::probe::PluginProber;
use volley_core::scanner::{ScanReport, Scanner};
use volley_plugins::PluginRegistry;

use crate::commands::CommandLine;
use crate::terminal::report::{self, ConsoleObserver};
use crate::terminal::{format, print};

pub async fn scan(cli: &CommandLine) -> anyhow::Result<()> {
    let cfg: Config = cli.config();

    let registry: Arc<PluginRegistry> =
        Arc::new(PluginRegistry::builtin().context("validating the plugin registry")?);
    let targets: Vec<Target> = parse_commas(&cli.target)?;
    let ports: Vec<Port> = parse_ports(&cli.ports)?;

    if !is_root::is_root() {
        warn!("Not running as root, raw probes will most likely go unanswered");
    }

    let transport: Arc<dyn ProbeTransport> = match RawTransport::open() {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            warn!("Raw sockets unavailable: {e:#}");
            Arc::new(OfflineTransport::new(format!("{e:#}")))
        }
    };
    let intel: Arc<SystemIntel> = Arc::new(SystemIntel::new(Arc::clone(&transport), cfg.timeouts.liveness));
    let audit: Arc<AuditLog> = Arc::new(AuditLog::open(&cfg.audit_log)?);
    let prober = PluginProber::new(
        transport,
        Arc::new(TcpConnectChecker::new(cfg.timeouts.connect)),
        intel.clone(),
        audit.clone(),
        cfg.timeouts.probe,
    );

    print::header("scan overview");
    print::timestamped("Number of targets entered", targets.len());
    print::timestamped("Targets", format::targets(&targets));
    print::timestamped("Number of ports entered", ports.len());
    print::timestamped("Enumerating Ports", format::ports(&ports));
    print::timestamped("Plugins loaded", registry.len());

    print::header("enumerating targets");
    let names: Vec<String> = expand(&targets);
    let hosts: Vec<Host> = enumerate(&names, intel.as_ref()).await;

    let scanner = Scanner::new(Arc::clone(&registry), Arc::new(prober), ports, &cfg);
    let report: ScanReport = scanner.run(&hosts, Arc::new(ConsoleObserver::new(cfg.report))).await;

    if !report::found_anything(&report.summary) {
        print::no_results();
    }
    report::render_summary(&report.summary, cfg.report, audit.path());
    if cfg.report.show_plugin_detail {
        report::render_plugin_details(&registry, &report.summary);
    }
    print::end_of_program();

    Ok(())
}
