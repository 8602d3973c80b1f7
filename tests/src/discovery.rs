use std::collections::HashMap;
use std::sync::Arc;

use volley_common::config::Config;
use volley_common::network::host::HostAddress;
use volley_common::network::target::parse_commas;
use volley_core::discovery::{enumerate, expand};
use volley_core::scanner::Silent;

use crate::support::{ip, FixedPorts, Harness, ScriptedIntel, ScriptedTransport};

#[tokio::test]
async fn networks_expand_into_checked_hosts() {
    let intel = ScriptedIntel {
        alive: vec![ip("10.0.0.1")],
        ..Default::default()
    };
    let names = expand(&parse_commas("10.0.0.0/30").unwrap());
    let hosts = enumerate(&names, &intel).await;

    assert_eq!(hosts.len(), 2);
    assert_eq!(intel.liveness_checks.lock().unwrap().len(), 2);
    assert!(hosts[0].is_alive);
    assert!(!hosts[1].is_alive);
}

#[tokio::test]
async fn unresolved_names_are_reported_but_not_scanned() {
    let intel = ScriptedIntel {
        names: HashMap::from([("web.lan".to_string(), ip("10.0.0.5"))]),
        alive: vec![ip("10.0.0.5")],
        ..Default::default()
    };
    let harness = Harness::new(ScriptedTransport::answering(&[ip("10.0.0.5")]), FixedPorts::default(), intel);

    let names = expand(&parse_commas("web.lan, nowhere.invalid").unwrap());
    let hosts = enumerate(&names, harness.intel.as_ref()).await;
    assert_eq!(hosts[1].address, HostAddress::Unresolved("nowhere.invalid".into()));

    let report = harness
        .scanner(vec![80], &Config::default())
        .run(&hosts, Arc::new(Silent))
        .await;

    assert_eq!(report.targets.len(), 2);
    assert!(report.targets[1].skipped);
    assert_eq!(report.outcomes.len(), 28);
    assert!(report.outcomes.iter().all(|outcome| outcome.target_address == ip("10.0.0.5")));
}

#[tokio::test]
async fn duplicate_targets_are_scanned_twice() {
    let intel = ScriptedIntel {
        alive: vec![ip("10.0.0.5")],
        ..Default::default()
    };
    let harness = Harness::new(ScriptedTransport::silent(), FixedPorts::default(), intel);

    let names = expand(&parse_commas("10.0.0.5,10.0.0.5").unwrap());
    let hosts = enumerate(&names, harness.intel.as_ref()).await;
    let report = harness
        .scanner(vec![80], &Config::default())
        .run(&hosts, Arc::new(Silent))
        .await;

    assert_eq!(report.targets.len(), 2);
    assert_eq!(harness.audited(), 56);
}
