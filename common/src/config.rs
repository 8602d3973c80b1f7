use std::path::PathBuf;
use std::time::Duration;

use crate::probe::{PortState, ProbeOutcome};

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_AUDIT_LOG: &str = "scan_log.txt";

pub struct Config {
    /// Upper bound on probes running at the same time.
    ///
    /// Only one target is scanned at a time, so this bounds the whole scan.
    pub workers: usize,
    /// Enables the IPv6 techniques.
    ///
    /// IPv4 targets are probed through their IPv4-mapped IPv6 address.
    pub ipv6: bool,
    pub report: ReportFlags,
    /// Append-only file receiving one record per finished probe.
    pub audit_log: PathBuf,
    pub timeouts: Timeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            ipv6: false,
            report: ReportFlags::default(),
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
            timeouts: Timeouts::default(),
        }
    }
}

/// Per-call network timeouts. None of them can be disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// How long a protocol probe waits for any reply.
    pub probe: Duration,
    /// Connect timeout of the reliable port-state check.
    pub connect: Duration,
    /// How long the liveness echo waits for a reply.
    pub liveness: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(1),
            connect: Duration::from_secs(1),
            liveness: Duration::from_secs(1),
        }
    }
}

/// Verbosity switches of the report. They never change what gets scanned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportFlags {
    pub show_detail: bool,
    pub show_open_port: bool,
    pub show_failed: bool,
    pub show_plugin_detail: bool,
}

impl ReportFlags {
    /// Whether an outcome gets its own row in the results table.
    ///
    /// The console only feeds it filtered outcomes, which all got a reply,
    /// so the `show_failed` arm only matters for unfiltered lists.
    pub fn shows(&self, outcome: &ProbeOutcome) -> bool {
        self.show_detail
            || (self.show_open_port && outcome.port_state == PortState::Open)
            || (self.show_failed && !outcome.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeOutcome;
    use std::net::{IpAddr, Ipv4Addr};

    fn outcome(port_state: PortState) -> ProbeOutcome {
        let addr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));
        let mut outcome = ProbeOutcome::unanswered("GRE Scan", addr, 80, "IP / GRE".into());
        outcome.port_state = port_state;
        outcome
    }

    #[test]
    fn default_flags_hide_every_row() {
        let flags = ReportFlags::default();
        assert!(!flags.shows(&outcome(PortState::Open)));
        assert!(!flags.shows(&outcome(PortState::Closed)));
    }

    #[test]
    fn open_port_flag_only_shows_open_rows() {
        let flags = ReportFlags {
            show_open_port: true,
            ..Default::default()
        };
        assert!(flags.shows(&outcome(PortState::Open)));
        assert!(!flags.shows(&outcome(PortState::Closed)));
    }

    #[test]
    fn failed_flag_shows_unanswered_probes() {
        let flags = ReportFlags {
            show_failed: true,
            ..Default::default()
        };
        assert!(flags.shows(&outcome(PortState::Closed)));
    }

    #[test]
    fn defaults_match_the_command_line() {
        let cfg = Config::default();
        assert_eq!(cfg.workers, 10);
        assert!(!cfg.ipv6);
        assert_eq!(cfg.audit_log, PathBuf::from("scan_log.txt"));
        assert_eq!(cfg.timeouts.probe, Duration::from_secs(1));
    }
}
