use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use volley_common::config::Config;
use volley_common::network::host::{Host, HostAddress};
use volley_common::probe::{OsGuess, PortState, NO_RESPONSE};
use volley_core::audit::NullAudit;
use volley_core::filter::eliminate_false_positives;
use volley_core::network::transport::OfflineTransport;
use volley_core::probe::PluginProber;
use volley_core::scanner::{Scanner, Silent};
use volley_plugins::PluginRegistry;

use crate::support::{ip, FixedPorts, Harness, ScriptedIntel, ScriptedTransport, TIMEOUT};

fn alive(addr: &str) -> Host {
    Host::new(addr, HostAddress::Ip(ip(addr)), true)
}

fn dead(addr: &str) -> Host {
    Host::new(addr, HostAddress::Ip(ip(addr)), false)
}

#[tokio::test]
async fn one_outcome_and_one_audit_record_per_task() {
    let harness = Harness::new(ScriptedTransport::silent(), FixedPorts::default(), ScriptedIntel::default());
    let report = harness
        .scanner(vec![80, 443], &Config::default())
        .run(&[alive("10.0.0.5")], Arc::new(Silent))
        .await;

    assert_eq!(report.targets[0].attempted, 56);
    assert_eq!(harness.audited(), 56);
    assert_eq!(harness.transport.sent_to().len(), 56);

    let summary = &report.summary;
    assert_eq!(summary.failed.len(), 56);
    assert_eq!(summary.distinct_failed().len(), 28);
    assert_eq!(summary.plugins_loaded(), 30);
}

#[tokio::test]
async fn open_port_without_any_reply() {
    let ports = FixedPorts {
        open: vec![(ip("10.0.0.5"), 80)],
    };
    let harness = Harness::new(ScriptedTransport::silent(), ports, ScriptedIntel::default());
    let report = harness
        .scanner(vec![80], &Config::default())
        .run(&[alive("10.0.0.5")], Arc::new(Silent))
        .await;

    assert!(report.outcomes.is_empty());
    assert!(report.targets[0].outcomes.is_empty());

    let summary = &report.summary;
    assert!(summary.successful.is_empty());
    assert_eq!(summary.distinct_failed().len(), 28);
    assert_eq!(summary.total_open_ports(), 1);
    assert_eq!(summary.open_ports[&ip("10.0.0.5")], BTreeSet::from([80]));

    let records = harness.audit.records.lock().unwrap();
    assert!(records.iter().all(|record| record.port_state == PortState::Open));
    assert!(records.iter().all(|record| record.response_summary() == NO_RESPONSE));
}

#[tokio::test]
async fn answered_probes_do_not_open_ports() {
    let harness = Harness::new(
        ScriptedTransport::answering(&[ip("10.0.0.5")]),
        FixedPorts::default(),
        ScriptedIntel::default(),
    );
    let report = harness
        .scanner(vec![22], &Config::default())
        .run(&[alive("10.0.0.5")], Arc::new(Silent))
        .await;

    assert_eq!(report.outcomes.len(), 28);
    assert!(report.outcomes.iter().all(|outcome| outcome.success));
    assert!(report.outcomes.iter().all(|outcome| outcome.port_state == PortState::Closed));
    assert!(report.outcomes.iter().all(|outcome| outcome.os_guess == OsGuess::Windows));
    assert_eq!(report.summary.total_open_ports(), 0);
    assert_eq!(report.summary.distinct_successful().len(), 28);
}

#[tokio::test]
async fn dead_hosts_are_skipped_and_never_probed() {
    let harness = Harness::new(
        ScriptedTransport::answering(&[ip("10.0.0.5")]),
        FixedPorts::default(),
        ScriptedIntel::default(),
    );
    let report = harness
        .scanner(vec![80], &Config::default())
        .run(&[dead("10.0.0.9"), alive("10.0.0.5")], Arc::new(Silent))
        .await;

    assert_eq!(report.targets.len(), 2);
    assert!(report.targets[0].skipped);
    assert_eq!(report.targets[0].attempted, 0);
    assert!(!report.targets[1].skipped);
    assert!(harness.transport.sent_to().iter().all(|addr| *addr == ip("10.0.0.5")));
    assert_eq!(harness.audited(), 28);
}

#[tokio::test]
async fn reverse_names_land_in_the_outcome() {
    let intel = ScriptedIntel {
        pointers: [(ip("10.0.0.5"), "web.lan".to_string())].into(),
        ..Default::default()
    };
    let harness = Harness::new(ScriptedTransport::answering(&[ip("10.0.0.5")]), FixedPorts::default(), intel);
    let report = harness
        .scanner(vec![80], &Config::default())
        .run(&[alive("10.0.0.5")], Arc::new(Silent))
        .await;

    assert!(report.outcomes.iter().all(|outcome| outcome.domain_name == "web.lan"));
}

#[tokio::test]
async fn ipv6_flag_probes_the_mapped_address() {
    let config = Config {
        ipv6: true,
        ..Config::default()
    };
    let harness = Harness::new(ScriptedTransport::silent(), FixedPorts::default(), ScriptedIntel::default());
    let report = harness
        .scanner(vec![80, 443], &config)
        .run(&[alive("10.0.0.5")], Arc::new(Silent))
        .await;

    assert_eq!(report.targets[0].attempted, 60);
    let mapped = ip("::ffff:10.0.0.5");
    assert_eq!(harness.transport.sent_to().iter().filter(|addr| **addr == mapped).count(), 4);
}

#[tokio::test]
async fn workers_bound_the_probes_in_flight() {
    let transport = ScriptedTransport {
        delay: Duration::from_millis(5),
        ..Default::default()
    };
    let config = Config {
        workers: 3,
        ..Config::default()
    };
    let harness = Harness::new(transport, FixedPorts::default(), ScriptedIntel::default());
    let report = harness
        .scanner(vec![80, 443], &config)
        .run(&[alive("10.0.0.5")], Arc::new(Silent))
        .await;

    assert_eq!(report.targets[0].attempted, 56);
    let peak = harness.transport.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak of {peak} probes in flight");
}

#[tokio::test]
async fn filtering_the_report_again_changes_nothing() {
    let harness = Harness::new(
        ScriptedTransport::answering(&[ip("10.0.0.5")]),
        FixedPorts::default(),
        ScriptedIntel::default(),
    );
    let report = harness
        .scanner(vec![80], &Config::default())
        .run(&[alive("10.0.0.5"), alive("10.0.0.6")], Arc::new(Silent))
        .await;

    assert_eq!(report.outcomes.len(), 28);
    assert_eq!(eliminate_false_positives(report.outcomes.clone()), report.outcomes);
    assert_eq!(report.summary.failed.len(), 28);
}

#[tokio::test]
async fn offline_transport_degrades_every_probe() {
    let prober = PluginProber::new(
        Arc::new(OfflineTransport::new("raw sockets unavailable")),
        Arc::new(FixedPorts::default()),
        Arc::new(ScriptedIntel::default()),
        Arc::new(NullAudit),
        TIMEOUT,
    );
    let scanner = Scanner::new(
        Arc::new(PluginRegistry::builtin().unwrap()),
        Arc::new(prober),
        vec![80],
        &Config::default(),
    );
    let outcomes = scanner.scan_host(&alive("10.0.0.5"), Arc::new(Silent)).await;

    assert_eq!(outcomes.len(), 28);
    assert!(outcomes.iter().all(|outcome| !outcome.success));
    assert!(outcomes.iter().all(|outcome| outcome.os_guess == OsGuess::Unknown));
}
