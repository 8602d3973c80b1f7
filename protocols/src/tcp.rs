use std::net::IpAddr;

use anyhow::{Context, bail, ensure};
use pnet::packet::tcp::{self, MutableTcpPacket};

pub const TCP_HDR_LEN: usize = 20;
const MAX_OPTIONS_LEN: usize = 40;

pub const FIN: u8 = 0x01;
pub const SYN: u8 = 0x02;
pub const RST: u8 = 0x04;
pub const PSH: u8 = 0x08;
pub const ACK: u8 = 0x10;
pub const URG: u8 = 0x20;

const TIMESTAMP_KIND: u8 = 8;

/// A TCP segment with the defaults a packet crafting tool would pick:
/// source port 20, destination port 80, SYN, window 8192.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    pub flags: u8,
    pub window: u16,
    pub urgent_ptr: u16,
    pub options: Vec<u8>,
    pub payload: Vec<u8>,
    /// Written verbatim instead of the computed checksum.
    pub checksum: Option<u16>,
}

impl Default for TcpSegment {
    fn default() -> Self {
        Self {
            source_port: 20,
            destination_port: 80,
            sequence: 0,
            acknowledgement: 0,
            flags: SYN,
            window: 8192,
            urgent_ptr: 0,
            options: Vec::new(),
            payload: Vec::new(),
            checksum: None,
        }
    }
}

impl TcpSegment {
    pub fn to_port(destination_port: u16) -> Self {
        Self {
            destination_port,
            ..Self::default()
        }
    }

    pub fn with_source_port(mut self, source_port: u16) -> Self {
        self.source_port = source_port;
        self
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_acknowledgement(mut self, acknowledgement: u32) -> Self {
        self.acknowledgement = acknowledgement;
        self
    }

    pub fn with_urgent_ptr(mut self, urgent_ptr: u16) -> Self {
        self.urgent_ptr = urgent_ptr;
        self
    }

    pub fn with_option(mut self, option: &[u8]) -> Self {
        self.options.extend_from_slice(option);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_checksum(mut self, checksum: u16) -> Self {
        self.checksum = Some(checksum);
        self
    }

    pub fn build(&self, src: IpAddr, dst: IpAddr) -> anyhow::Result<Vec<u8>> {
        ensure!(
            self.options.len() <= MAX_OPTIONS_LEN,
            "TCP options take {} bytes, at most {MAX_OPTIONS_LEN} fit",
            self.options.len()
        );
        let options_len: usize = self.options.len().div_ceil(4) * 4;
        let header_len: usize = TCP_HDR_LEN + options_len;
        let mut buffer: Vec<u8> = vec![0u8; header_len + self.payload.len()];
        buffer[TCP_HDR_LEN..TCP_HDR_LEN + self.options.len()].copy_from_slice(&self.options);
        buffer[header_len..].copy_from_slice(&self.payload);

        {
            let mut tcp: MutableTcpPacket =
                MutableTcpPacket::new(&mut buffer).context("creating tcp packet")?;
            tcp.set_source(self.source_port);
            tcp.set_destination(self.destination_port);
            tcp.set_sequence(self.sequence);
            tcp.set_acknowledgement(self.acknowledgement);
            tcp.set_data_offset((header_len / 4) as u8);
            tcp.set_flags(self.flags.into());
            tcp.set_window(self.window);
            tcp.set_urgent_ptr(self.urgent_ptr);

            tcp.set_checksum(0);
            let csm: u16 = match (self.checksum, src, dst) {
                (Some(forced), _, _) => forced,
                (None, IpAddr::V4(src), IpAddr::V4(dst)) => {
                    tcp::ipv4_checksum(&tcp.to_immutable(), &src, &dst)
                }
                (None, IpAddr::V6(src), IpAddr::V6(dst)) => {
                    tcp::ipv6_checksum(&tcp.to_immutable(), &src, &dst)
                }
                _ => bail!("mixed address families {src} and {dst}"),
            };
            tcp.set_checksum(csm);
        }

        Ok(buffer)
    }

    pub fn describe(&self, src: IpAddr, dst: IpAddr) -> String {
        let mut summary: String = format!(
            "TCP {src}:{} > {dst}:{} {}",
            self.source_port,
            self.destination_port,
            flags_to_string(self.flags)
        );
        if self.sequence != 0 {
            summary.push_str(&format!(" seq={}", self.sequence));
        }
        if self.urgent_ptr != 0 {
            summary.push_str(&format!(" urg={:#06x}", self.urgent_ptr));
        }
        if !self.options.is_empty() {
            summary.push_str(&format!(" options={}B", self.options.len()));
        }
        if let Some(forced) = self.checksum {
            summary.push_str(&format!(" chksum={forced:#06x}"));
        }
        summary
    }
}

/// Timestamp option (kind 8) carrying `tsval` and `tsecr`.
pub fn timestamp_option(tsval: u32, tsecr: u32) -> Vec<u8> {
    let mut option: Vec<u8> = vec![TIMESTAMP_KIND, 10];
    option.extend_from_slice(&tsval.to_be_bytes());
    option.extend_from_slice(&tsecr.to_be_bytes());
    option
}

/// An arbitrary kind-length-value option.
pub fn raw_option(kind: u8, data: &[u8]) -> Vec<u8> {
    let mut option: Vec<u8> = vec![kind, (data.len() + 2) as u8];
    option.extend_from_slice(data);
    option
}

/// Flag letters in dissector order, e.g. `SA` for SYN+ACK.
pub fn flags_to_string(flags: u8) -> String {
    const LETTERS: [(u8, char); 6] = [
        (FIN, 'F'),
        (SYN, 'S'),
        (RST, 'R'),
        (PSH, 'P'),
        (ACK, 'A'),
        (URG, 'U'),
    ];
    LETTERS
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, letter)| *letter)
        .collect()
}
