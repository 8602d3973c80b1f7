pub mod scan;

use std::path::PathBuf;

use clap::Parser;
use volley_common::config::{Config, DEFAULT_AUDIT_LOG, DEFAULT_WORKERS, ReportFlags};

#[derive(Parser, Debug)]
#[command(name = "volley")]
#[command(about = "Probes hosts with a catalogue of crafted-packet techniques.")]
pub struct CommandLine {
    /// Comma-separated host names, addresses or CIDR blocks
    #[arg(long)]
    pub target: String,

    /// Comma-separated list of ports
    #[arg(long)]
    pub ports: String,

    /// Maximum number of probes in flight
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub threads: usize,

    /// Also run the IPv6 techniques
    #[arg(long)]
    pub ipv6: bool,

    /// Show every answered probe
    #[arg(long = "showdetail")]
    pub show_detail: bool,

    /// Show answered probes whose port is open
    #[arg(long = "showopenport")]
    pub show_open_port: bool,

    /// Show failed plugins in the summary
    #[arg(long = "showfailed")]
    pub show_failed: bool,

    /// Describe every plugin that ran
    #[arg(long = "showplugindetail")]
    pub show_plugin_detail: bool,

    /// File receiving one record per probe, appended to
    #[arg(long, default_value = DEFAULT_AUDIT_LOG)]
    pub log_file: PathBuf,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> Config {
        Config {
            workers: self.threads,
            ipv6: self.ipv6,
            report: ReportFlags {
                show_detail: self.show_detail,
                show_open_port: self.show_open_port,
                show_failed: self.show_failed,
                show_plugin_detail: self.show_plugin_detail,
            },
            audit_log: self.log_file.clone(),
            ..Config::default()
        }
    }
}
