//! # Scan Orchestration
//!
//! Drives the whole scan: hosts are processed one after the other, and the
//! tasks of one host (ports times applicable plugins) go through the bounded
//! worker pool. Each host moves through [`TargetState`]:
//!
//! ```text
//! Pending -> LivenessChecked -> Skipped  -> Completed
//!                            -> Scanning -> Completed
//! ```
//!
//! Progress is reported to a [`ScanObserver`] so front ends can render
//! results as soon as a host is done.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};
use volley_common::config::Config;
use volley_common::network::host::Host;
use volley_common::network::port::Port;
use volley_common::probe::ProbeOutcome;
use volley_common::success;
use volley_plugins::{AddressFamily, PluginDescriptor, PluginRegistry};

use crate::discovery::ipv6_form;
use crate::filter::eliminate_false_positives;
use crate::pool::run_bounded;
use crate::probe::{ProbeExecutor, ScanTask};
use crate::summary::Summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Pending,
    LivenessChecked,
    Skipped,
    Scanning,
    Completed,
}

impl TargetState {
    pub fn next(self, host: &Host) -> Self {
        match self {
            TargetState::Pending => TargetState::LivenessChecked,
            TargetState::LivenessChecked if host.is_alive => TargetState::Scanning,
            TargetState::LivenessChecked => TargetState::Skipped,
            TargetState::Skipped | TargetState::Scanning | TargetState::Completed => TargetState::Completed,
        }
    }
}

/// Hooks called while the scan runs. Every method defaults to doing nothing.
///
/// `task_finished` is called from the workers, concurrently.
pub trait ScanObserver: Send + Sync {
    fn target_started(&self, _host: &Host, _tasks: usize) {}
    fn task_finished(&self, _outcome: &ProbeOutcome) {}
    fn target_finished(&self, _report: &TargetReport) {}
    fn target_skipped(&self, _host: &Host) {}
}

/// Observer that ignores every event.
pub struct Silent;

impl ScanObserver for Silent {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub host: Host,
    pub skipped: bool,
    /// Number of tasks that ran, answered or not.
    pub attempted: usize,
    /// Outcomes left after false-positive elimination.
    pub outcomes: Vec<ProbeOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub targets: Vec<TargetReport>,
    /// Filtered outcomes of every target, in scan order.
    pub outcomes: Vec<ProbeOutcome>,
    /// Built over every raw outcome, answered or not.
    pub summary: Summary,
}

pub struct Scanner {
    registry: Arc<PluginRegistry>,
    executor: Arc<dyn ProbeExecutor>,
    ports: Vec<Port>,
    workers: usize,
    ipv6: bool,
}

impl Scanner {
    pub fn new(registry: Arc<PluginRegistry>, executor: Arc<dyn ProbeExecutor>, ports: Vec<Port>, config: &Config) -> Self {
        Self {
            registry,
            executor,
            ports,
            workers: config.workers.max(1),
            ipv6: config.ipv6,
        }
    }

    /// Tasks for `host`, grouped by port. Empty for dead or unresolved hosts.
    ///
    /// IPv4 hosts get the IPv4 plugins and, with IPv6 enabled, the IPv6
    /// plugins against their IPv4-mapped address. IPv6 hosts only get the
    /// IPv6 plugins.
    pub fn plan(&self, host: &Host) -> Vec<ScanTask> {
        let Some(ip) = host.ip().filter(|_| host.is_alive) else {
            return Vec::new();
        };

        let mut plugins: Vec<(&PluginDescriptor, IpAddr)> = Vec::new();
        match ip {
            IpAddr::V4(_) => {
                plugins.extend(self.registry.applicable(AddressFamily::V4).into_iter().map(|p| (p, ip)));
                if self.ipv6 {
                    let mapped: IpAddr = ipv6_form(ip);
                    plugins.extend(self.registry.applicable(AddressFamily::V6).into_iter().map(|p| (p, mapped)));
                }
            }
            IpAddr::V6(_) => {
                plugins.extend(self.registry.applicable(AddressFamily::V6).into_iter().map(|p| (p, ip)));
            }
        }

        self.ports
            .iter()
            .flat_map(|&port| {
                plugins.iter().map(move |&(plugin, address)| ScanTask {
                    plugin: plugin.clone(),
                    address,
                    port,
                })
            })
            .collect()
    }

    /// Runs every task of `host`; exactly one outcome per planned task.
    pub async fn scan_host(&self, host: &Host, observer: Arc<dyn ScanObserver>) -> Vec<ProbeOutcome> {
        let tasks: Vec<ScanTask> = self.plan(host);
        observer.target_started(host, tasks.len());

        let executor: Arc<dyn ProbeExecutor> = Arc::clone(&self.executor);
        let slots: Vec<Option<ProbeOutcome>> = run_bounded(tasks.clone(), self.workers, move |task: ScanTask| {
            let executor = Arc::clone(&executor);
            let observer = Arc::clone(&observer);
            async move {
                let outcome: ProbeOutcome = executor.execute(&task).await;
                observer.task_finished(&outcome);
                outcome
            }
        })
        .await;

        slots
            .into_iter()
            .zip(tasks)
            .map(|(slot, task)| {
                slot.unwrap_or_else(|| {
                    warn!("{} on {}:{} did not finish", task.plugin.name, task.address, task.port);
                    ProbeOutcome::unanswered(task.plugin.name, task.address, task.port, "Not sent (worker failed)".into())
                })
            })
            .collect()
    }

    /// Scans `hosts` one after the other and aggregates the results.
    pub async fn run(&self, hosts: &[Host], observer: Arc<dyn ScanObserver>) -> ScanReport {
        let mut targets: Vec<TargetReport> = Vec::with_capacity(hosts.len());
        let mut raw: Vec<ProbeOutcome> = Vec::new();
        let mut kept: Vec<ProbeOutcome> = Vec::new();

        for host in hosts {
            let mut state: TargetState = TargetState::Pending.next(host);
            state = state.next(host);
            debug!("{host} is {state:?}");

            let report: TargetReport = if state == TargetState::Skipped {
                observer.target_skipped(host);
                TargetReport {
                    host: host.clone(),
                    skipped: true,
                    attempted: 0,
                    outcomes: Vec::new(),
                }
            } else {
                info!("Starting scans on {host}");
                let outcomes: Vec<ProbeOutcome> = self.scan_host(host, Arc::clone(&observer)).await;
                let attempted: usize = outcomes.len();
                raw.extend(outcomes.iter().cloned());
                let filtered: Vec<ProbeOutcome> = eliminate_false_positives(outcomes);
                success!("Completed scans on {host}: {} of {attempted} probes answered", filtered.len());
                TargetReport {
                    host: host.clone(),
                    skipped: false,
                    attempted,
                    outcomes: filtered,
                }
            };

            state = state.next(host);
            debug!("{host} is {state:?}");
            observer.target_finished(&report);
            kept.extend(report.outcomes.iter().cloned());
            targets.push(report);
        }

        ScanReport {
            targets,
            outcomes: kept,
            summary: Summary::build(&raw, self.registry.len()),
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
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
    use async_trait::async_trait;
    use volley_common::network::host::HostAddress;
    use volley_common::probe::{OsGuess, PortState, ProbeEvidence, ProbeResponse};

    /// Answers every third task and reports port 80 open.
    struct EveryThird;

    #[async_trait]
    impl ProbeExecutor for EveryThird {
        async fn execute(&self, task: &ScanTask) -> ProbeOutcome {
            let answered: bool = task.plugin.name.len() % 3 == 0;
            let evidence = ProbeEvidence {
                sent_summary: "IP".into(),
                response: answered.then(|| ProbeResponse {
                    summary: "IP / ICMP".into(),
                    ttl: None,
                    carries_tcp: false,
                }),
                port_state: if task.port == 80 { PortState::Open } else { PortState::Closed },
                os_guess: OsGuess::Unknown,
                domain_name: None,
            };
            ProbeOutcome::new(task.plugin.name.clone(), task.address, task.port, evidence)
        }
    }

    fn scanner(ipv6: bool) -> Scanner {
        let config = Config {
            ipv6,
            ..Config::default()
        };
        Scanner::new(
            Arc::new(PluginRegistry::builtin().unwrap()),
            Arc::new(EveryThird),
            vec![80, 443],
            &config,
        )
    }

    fn host(ip: &str, alive: bool) -> Host {
        Host::new(ip, HostAddress::Ip(ip.parse().unwrap()), alive)
    }

    #[test]
    fn states_follow_liveness() {
        let alive = host("10.0.0.5", true);
        let dead = host("10.0.0.6", false);
        let checked = TargetState::Pending.next(&alive);
        assert_eq!(checked, TargetState::LivenessChecked);
        assert_eq!(checked.next(&alive), TargetState::Scanning);
        assert_eq!(checked.next(&dead), TargetState::Skipped);
        assert_eq!(TargetState::Skipped.next(&dead), TargetState::Completed);
    }

    #[test]
    fn plan_is_ports_times_applicable_plugins() {
        let tasks = scanner(false).plan(&host("10.0.0.5", true));
        assert_eq!(tasks.len(), 2 * 28);
        assert!(tasks[..28].iter().all(|task| task.port == 80));
        assert!(tasks.iter().all(|task| task.address.is_ipv4()));
    }

    #[test]
    fn ipv6_flag_adds_mapped_tasks() {
        let tasks = scanner(true).plan(&host("10.0.0.5", true));
        assert_eq!(tasks.len(), 2 * 30);
        let mapped: IpAddr = "::ffff:10.0.0.5".parse().unwrap();
        assert_eq!(tasks.iter().filter(|task| task.address == mapped).count(), 4);
    }

    #[test]
    fn ipv6_hosts_only_get_ipv6_plugins() {
        let tasks = scanner(false).plan(&host("2001:db8::5", true));
        assert_eq!(tasks.len(), 2 * 2);
    }

    #[test]
    fn dead_and_unresolved_hosts_get_no_tasks() {
        assert!(scanner(true).plan(&host("10.0.0.5", false)).is_empty());
        let unresolved = Host::new("nowhere", HostAddress::Unresolved("nowhere".into()), true);
        assert!(scanner(true).plan(&unresolved).is_empty());
    }

    #[tokio::test]
    async fn summary_counts_raw_outcomes_while_rows_are_filtered() {
        let hosts = vec![host("10.0.0.5", true), host("10.0.0.6", false)];
        let report = scanner(false).run(&hosts, Arc::new(Silent)).await;

        assert_eq!(report.targets.len(), 2);
        assert!(report.targets[1].skipped);
        assert_eq!(report.targets[0].attempted, 56);
        assert!(report.outcomes.iter().all(|outcome| outcome.success));

        let summary = &report.summary;
        assert_eq!(summary.successful.len() + summary.failed.len(), 56);
        assert_eq!(summary.successful.len(), report.outcomes.len());
        assert_eq!(summary.total_open_ports(), 1);
        assert_eq!(summary.plugins_loaded(), 30);
    }
}
