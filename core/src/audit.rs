//! # Audit Log
//!
//! Append-only record of every finished probe. Each record is formatted in
//! full and written in one call under the file lock, so records from
//! concurrent workers never interleave.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, anyhow};
use chrono::Local;
use volley_common::probe::ProbeOutcome;

const DELIMITER_LEN: usize = 50;

pub trait AuditSink: Send + Sync {
    fn record(&self, outcome: &ProbeOutcome) -> anyhow::Result<()>;
}

pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    /// Opens `path` for appending, creating it if needed. Never truncates.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening audit log {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for AuditLog {
    fn record(&self, outcome: &ProbeOutcome) -> anyhow::Result<()> {
        let block: String = format_record(outcome)?;
        let mut file = self.file.lock().map_err(|_| anyhow!("audit log lock poisoned"))?;
        file.write_all(block.as_bytes())
            .with_context(|| format!("writing to {}", self.path.display()))?;
        Ok(())
    }
}

/// Discards every record.
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn record(&self, _outcome: &ProbeOutcome) -> anyhow::Result<()> {
        Ok(())
    }
}

fn format_record(outcome: &ProbeOutcome) -> anyhow::Result<String> {
    let timestamp: String = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let response: &str = outcome.response_summary();

    let mut block = String::new();
    let fields: [(&str, String); 10] = [
        ("Scan Type", outcome.plugin_name.clone()),
        ("Response", response.to_string()),
        ("Operating System", outcome.os_guess.to_string()),
        ("IP", outcome.target_address.to_string()),
        ("Domain", outcome.domain_name.clone()),
        ("Port", outcome.port.to_string()),
        ("Port Response", outcome.port_state.to_string()),
        ("Scan Success", outcome.success_label().to_string()),
        ("Packet Sent", outcome.sent_summary.clone()),
        ("Packet Received", response.to_string()),
    ];
    for (label, value) in fields {
        writeln!(block, "{timestamp} - {label}: {value}")?;
    }
    writeln!(block, "{timestamp} - {}", "-".repeat(DELIMITER_LEN))?;
    Ok(block)
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
    use std::net::{IpAddr, Ipv4Addr};

    fn outcome() -> ProbeOutcome {
        ProbeOutcome::unanswered("GRE Scan", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 80, "IP / GRE".into())
    }

    fn temp_log(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("volley-{name}-{}.txt", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn record_has_every_field_and_a_delimiter() {
        let block = format_record(&outcome()).unwrap();
        let lines: Vec<&str> = block.lines().collect();

        assert_eq!(lines.len(), 11);
        assert!(lines[0].ends_with("Scan Type: GRE Scan"));
        assert!(lines[1].ends_with("Response: No response"));
        assert!(lines[4].ends_with("Domain: Unknown"));
        assert!(lines[7].ends_with("Scan Success: No"));
        assert!(lines[10].ends_with(&"-".repeat(50)));
    }

    #[test]
    fn log_appends_and_never_truncates() {
        let path = temp_log("append");
        std::fs::write(&path, "earlier run\n").unwrap();

        let log = AuditLog::open(&path).unwrap();
        log.record(&outcome()).unwrap();
        log.record(&outcome()).unwrap();
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier run\n"));
        assert_eq!(content.matches("Scan Type: GRE Scan").count(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn concurrent_records_stay_whole() {
        let path = temp_log("concurrent");
        let log = std::sync::Arc::new(AuditLog::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = std::sync::Arc::clone(&log);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        log.record(&outcome()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 80 * 11);
        for record in lines.chunks(11) {
            assert!(record[0].contains("Scan Type"));
            assert!(record[10].ends_with(&"-".repeat(50)));
        }
        let _ = std::fs::remove_file(&path);
    }
}
