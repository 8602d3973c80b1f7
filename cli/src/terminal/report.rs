//! # Report Rendering
//!
//! Console output of a scan: one block per answered probe as each host
//! completes, then the summary and, on request, the plugin descriptions.

use std::path::Path;

use colored::*;
use volley_common::config::ReportFlags;
use volley_common::network::host::Host;
use volley_common::probe::{PortState, ProbeOutcome};
use volley_core::scanner::{ScanObserver, TargetReport};
use volley_core::summary::Summary;
use volley_plugins::PluginRegistry;

use crate::terminal::colors;
use crate::terminal::print;
use crate::terminal::progress::ScanProgress;

/// Drives the progress bar and prints each host's rows once it is done.
pub struct ConsoleObserver {
    flags: ReportFlags,
    progress: ScanProgress,
}

impl ConsoleObserver {
    pub fn new(flags: ReportFlags) -> Self {
        Self {
            flags,
            progress: ScanProgress::new(),
        }
    }
}

impl ScanObserver for ConsoleObserver {
    fn target_started(&self, host: &Host, tasks: usize) {
        self.progress.start(&format!("Probing {host}"), tasks);
    }

    fn task_finished(&self, _outcome: &ProbeOutcome) {
        self.progress.advance();
    }

    fn target_finished(&self, report: &TargetReport) {
        self.progress.finish();
        if !report.skipped {
            render_target(report, self.flags);
        }
    }

    fn target_skipped(&self, host: &Host) {
        print::print_status(format!("{} {}", host, "skipped, not alive".color(colors::FAILURE)));
    }
}

pub fn render_target(report: &TargetReport, flags: ReportFlags) {
    print::header(&format!("results for {}", report.host));
    print::print_status(format!(
        "{} of {} probes answered",
        report.outcomes.len().to_string().color(colors::ACCENT),
        report.attempted
    ));

    for (idx, outcome) in shown_rows(report, flags).into_iter().enumerate() {
        print::tree_head(idx + 1, outcome.plugin_name.as_str().color(colors::SUCCESS).bold());
        print::as_tree_one_level(
            outcome_fields(outcome)
                .into_iter()
                .map(|(key, value)| {
                    let color: Color = if key == "State" { port_state_color(outcome.port_state) } else { colors::TEXT_DEFAULT };
                    (key, value.color(color))
                })
                .collect(),
        );
    }
}

/// Rows are drawn from the filtered outcomes, which all got a reply. So
/// `--showfailed` adds no row here; failed plugins only show in the summary.
fn shown_rows(report: &TargetReport, flags: ReportFlags) -> Vec<&ProbeOutcome> {
    report.outcomes.iter().filter(|outcome| flags.shows(outcome)).collect()
}

fn outcome_fields(outcome: &ProbeOutcome) -> Vec<(&'static str, String)> {
    vec![
        ("Sent", outcome.sent_summary.clone()),
        ("Received", outcome.response_summary().to_string()),
        ("OS", outcome.os_guess.to_string()),
        ("IP", outcome.target_address.to_string()),
        ("Domain", outcome.domain_name.clone()),
        ("Port", outcome.port.to_string()),
        ("State", outcome.port_state.to_string()),
        ("Success", outcome.success_label().to_string()),
        ("Time", print::timestamp()),
    ]
}

#[derive(Debug, Clone)]
struct SummaryLine {
    key: String,
    value: String,
    color: Color,
}

impl SummaryLine {
    fn new(key: impl Into<String>, value: impl ToString, color: Color) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
            color,
        }
    }
}

fn summary_lines(summary: &Summary, flags: ReportFlags, audit_log: &Path) -> Vec<SummaryLine> {
    let successful = summary.distinct_successful();
    let mut lines: Vec<SummaryLine> = vec![
        SummaryLine::new("Total plugins loaded", summary.plugins_loaded(), colors::TEXT_DEFAULT),
        SummaryLine::new("Total plugins successful", successful.len(), colors::TEXT_DEFAULT),
    ];
    lines.extend(
        successful
            .into_iter()
            .map(|name| SummaryLine::new("Plugin successful", name, colors::SUCCESS)),
    );

    lines.push(SummaryLine::new("Total open ports found", summary.total_open_ports(), colors::TEXT_DEFAULT));
    for (ip, ports) in &summary.open_ports {
        let ports: String = ports.iter().map(|port| port.to_string()).collect::<Vec<_>>().join(", ");
        lines.push(SummaryLine::new(format!("Open ports on {ip}"), ports, colors::OPEN_PORT));
    }

    if flags.show_failed {
        let failed = summary.distinct_failed();
        lines.push(SummaryLine::new("Total plugins failed", failed.len(), colors::TEXT_DEFAULT));
        lines.extend(
            failed
                .into_iter()
                .map(|name| SummaryLine::new("Plugin failed", name, colors::FAILURE)),
        );
    }

    lines.push(SummaryLine::new("Scan log saved to", audit_log.display(), colors::ACCENT));
    lines
}

pub fn render_summary(summary: &Summary, flags: ReportFlags, audit_log: &Path) {
    print::header("summary");
    let lines: Vec<SummaryLine> = summary_lines(summary, flags, audit_log);
    print::set_key_width(lines.iter().map(|line| line.key.as_str()));
    for line in &lines {
        print::aligned_line(&line.key, line.value.as_str().color(line.color));
    }
}

/// Plugins that ran at least once, in registry order.
fn plugins_that_ran<'a>(registry: &'a PluginRegistry, summary: &Summary) -> Vec<(&'a str, &'a str)> {
    let successful = summary.distinct_successful();
    let failed = summary.distinct_failed();
    registry
        .iter()
        .filter(|plugin| successful.contains(plugin.name.as_str()) || failed.contains(plugin.name.as_str()))
        .map(|plugin| (plugin.name.as_str(), plugin.description.as_str()))
        .collect()
}

pub fn render_plugin_details(registry: &PluginRegistry, summary: &Summary) {
    let rows: Vec<(&str, &str)> = plugins_that_ran(registry, summary);
    if rows.is_empty() {
        return;
    }
    print::header("plugin details");
    print::two_column_table("Plugin", "Description", &rows);
}

/// Whether any open port or answered probe was found at all.
pub fn found_anything(summary: &Summary) -> bool {
    !summary.successful.is_empty() || summary.open_ports.values().any(|ports| !ports.is_empty())
}

fn port_state_color(state: PortState) -> Color {
    match state {
        PortState::Open => colors::OPEN_PORT,
        PortState::Closed => colors::TEXT_DEFAULT,
    }
}
