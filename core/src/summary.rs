//! # Scan Summary
//!
//! Cross-target aggregation: open ports per address and which plugins got
//! replies. Successful and failed names are kept as multisets, one entry per
//! outcome; the report shows their distinct values.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use volley_common::network::port::Port;
use volley_common::probe::{PortState, ProbeOutcome};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub open_ports: BTreeMap<IpAddr, BTreeSet<Port>>,
    pub successful: Vec<String>,
    pub failed: Vec<String>,
    plugins_loaded: usize,
}

impl Summary {
    /// Single pass over `outcomes`. Open ports come from the connect check
    /// only, never from probe replies.
    pub fn build(outcomes: &[ProbeOutcome], plugins_loaded: usize) -> Self {
        let mut summary = Self {
            plugins_loaded,
            ..Self::default()
        };

        for outcome in outcomes {
            if outcome.port_state == PortState::Open {
                summary
                    .open_ports
                    .entry(outcome.target_address)
                    .or_default()
                    .insert(outcome.port);
            }
            if outcome.success {
                summary.successful.push(outcome.plugin_name.clone());
            } else {
                summary.failed.push(outcome.plugin_name.clone());
            }
        }

        summary
    }

    pub fn plugins_loaded(&self) -> usize {
        self.plugins_loaded
    }

    pub fn distinct_successful(&self) -> BTreeSet<&str> {
        self.successful.iter().map(String::as_str).collect()
    }

    pub fn distinct_failed(&self) -> BTreeSet<&str> {
        self.failed.iter().map(String::as_str).collect()
    }

    pub fn total_open_ports(&self) -> usize {
        self.open_ports.values().map(BTreeSet::len).sum()
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
