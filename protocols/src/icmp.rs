use anyhow::Context;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpType, MutableIcmpPacket};

pub const ICMP_HDR_LEN: usize = 8;

pub const ECHO_REPLY: u8 = 0;
pub const DESTINATION_UNREACHABLE: u8 = 3;
pub const SOURCE_QUENCH: u8 = 4;
pub const ECHO_REQUEST: u8 = 8;

/// An ICMPv4 message. `identifier` and `sequence` fill the second header word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpMessage {
    pub icmp_type: u8,
    pub code: u8,
    pub identifier: u16,
    pub sequence: u16,
    pub data: Vec<u8>,
}

impl IcmpMessage {
    pub fn echo_request() -> Self {
        Self {
            icmp_type: ECHO_REQUEST,
            code: 0,
            identifier: rand::random(),
            sequence: 0,
            data: Vec::new(),
        }
    }

    pub fn of_type(icmp_type: u8) -> Self {
        Self {
            icmp_type,
            ..Self::echo_request()
        }
    }

    pub fn with_identifier(mut self, identifier: u16) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    pub fn build(&self) -> anyhow::Result<Vec<u8>> {
        let mut buffer: Vec<u8> = vec![0u8; ICMP_HDR_LEN + self.data.len()];
        buffer[4..6].copy_from_slice(&self.identifier.to_be_bytes());
        buffer[6..8].copy_from_slice(&self.sequence.to_be_bytes());
        buffer[ICMP_HDR_LEN..].copy_from_slice(&self.data);

        {
            let mut icmp: MutableIcmpPacket =
                MutableIcmpPacket::new(&mut buffer).context("creating icmp packet")?;
            icmp.set_icmp_type(IcmpType(self.icmp_type));
            icmp.set_icmp_code(IcmpCode(self.code));
            icmp.set_checksum(0);
            let csm: u16 = icmp::checksum(&icmp.to_immutable());
            icmp.set_checksum(csm);
        }

        Ok(buffer)
    }

    pub fn describe(&self) -> String {
        format!("ICMP {} {}", type_name(self.icmp_type), self.code)
    }
}

pub fn type_name(icmp_type: u8) -> String {
    match icmp_type {
        ECHO_REPLY => "echo-reply".into(),
        DESTINATION_UNREACHABLE => "dest-unreach".into(),
        SOURCE_QUENCH => "source-quench".into(),
        5 => "redirect".into(),
        ECHO_REQUEST => "echo-request".into(),
        11 => "time-exceeded".into(),
        12 => "parameter-problem".into(),
        other => format!("type-{other}"),
    }
}

/// Whether `bytes` (an ICMP message without IP header) is an echo reply.
pub fn is_echo_reply(bytes: &[u8]) -> bool {
    IcmpPacket::new(bytes).is_some_and(|packet| packet.get_icmp_type() == IcmpType(ECHO_REPLY))
}
