use anyhow::Context;
use pnet::packet::ethernet::{EtherType, EtherTypes, MutableEthernetPacket};
use pnet::util::MacAddr;

pub const ETH_HDR_LEN: usize = 14;
const TAG_LEN: usize = 4;

const ETHERTYPE_MPLS: EtherType = EtherType(0x8847);

/// A tag pushed between the Ethernet header and the IP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTag {
    Dot1Q { vlan: u16 },
    Mpls { label: u32, cos: u8, bottom: bool, ttl: u8 },
}

impl LinkTag {
    fn ethertype(&self) -> EtherType {
        match self {
            LinkTag::Dot1Q { .. } => EtherTypes::Vlan,
            LinkTag::Mpls { .. } => ETHERTYPE_MPLS,
        }
    }

    fn encode(&self, next: EtherType) -> [u8; TAG_LEN] {
        match *self {
            LinkTag::Dot1Q { vlan } => {
                let tci: u16 = vlan & 0x0fff;
                let [t0, t1] = tci.to_be_bytes();
                let [n0, n1] = next.0.to_be_bytes();
                [t0, t1, n0, n1]
            }
            LinkTag::Mpls { label, cos, bottom, ttl } => {
                let entry: u32 =
                    ((label & 0x000f_ffff) << 12) | (u32::from(cos & 0b111) << 9) | (u32::from(bottom) << 8) | u32::from(ttl);
                entry.to_be_bytes()
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            LinkTag::Dot1Q { vlan } => format!("Dot1Q vlan={vlan}"),
            LinkTag::Mpls { label, cos, .. } => format!("MPLS label={label} cos={cos}"),
        }
    }
}

/// An Ethernet II frame carrying an IPv4 packet behind zero or more tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    pub source: MacAddr,
    pub destination: MacAddr,
    pub tags: Vec<LinkTag>,
}

impl LinkFrame {
    pub fn broadcast(source: MacAddr) -> Self {
        Self {
            source,
            destination: MacAddr::broadcast(),
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: LinkTag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Wraps `ip_packet`; returns the frame and the offset of the IP header.
    pub fn build(&self, ip_packet: &[u8]) -> anyhow::Result<(Vec<u8>, usize)> {
        let ip_offset: usize = ETH_HDR_LEN + TAG_LEN * self.tags.len();
        let mut buffer: Vec<u8> = vec![0u8; ip_offset + ip_packet.len()];

        for (i, tag) in self.tags.iter().enumerate() {
            let next: EtherType = self.tags.get(i + 1).map_or(EtherTypes::Ipv4, LinkTag::ethertype);
            let start: usize = ETH_HDR_LEN + TAG_LEN * i;
            buffer[start..start + TAG_LEN].copy_from_slice(&tag.encode(next));
        }
        buffer[ip_offset..].copy_from_slice(ip_packet);

        {
            let outer: EtherType = self.tags.first().map_or(EtherTypes::Ipv4, LinkTag::ethertype);
            let mut eth = MutableEthernetPacket::new(&mut buffer).context("creating ethernet packet")?;
            eth.set_source(self.source);
            eth.set_destination(self.destination);
            eth.set_ethertype(outer);
        }

        Ok((buffer, ip_offset))
    }

    pub fn describe(&self) -> String {
        let mut layers: Vec<String> = vec![format!("Ether {} > {}", self.source, self.destination)];
        layers.extend(self.tags.iter().map(LinkTag::describe));
        crate::layered_summary(layers)
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
    use pnet::packet::ethernet::EthernetPacket;

    const SRC: MacAddr = MacAddr(0x00, 0x11, 0x22, 0x33, 0x44, 0x55);

    #[test]
    fn plain_frame_sets_fields() {
        let (bytes, offset) = LinkFrame::broadcast(SRC).build(&[0x45; 20]).unwrap();
        let eth = EthernetPacket::new(&bytes).unwrap();

        assert_eq!(offset, ETH_HDR_LEN);
        assert_eq!(eth.get_source(), SRC);
        assert_eq!(eth.get_destination(), MacAddr::broadcast());
        assert_eq!(eth.get_ethertype(), EtherTypes::Ipv4);
    }

    #[test]
    fn double_tagged_vlan_chains_ethertypes() {
        let frame = LinkFrame::broadcast(SRC)
            .with_tag(LinkTag::Dot1Q { vlan: 1 })
            .with_tag(LinkTag::Dot1Q { vlan: 2 });
        let (bytes, offset) = frame.build(&[0x45; 20]).unwrap();

        assert_eq!(offset, 22);
        assert_eq!(&bytes[12..14], &[0x81, 0x00]);
        assert_eq!(&bytes[14..18], &[0x00, 0x01, 0x81, 0x00]);
        assert_eq!(&bytes[18..22], &[0x00, 0x02, 0x08, 0x00]);
        assert_eq!(frame.describe(), format!("Ether {SRC} > ff:ff:ff:ff:ff:ff / Dot1Q vlan=1 / Dot1Q vlan=2"));
    }

    #[test]
    fn mpls_label_stack_entry() {
        let frame = LinkFrame::broadcast(SRC).with_tag(LinkTag::Mpls {
            label: 3,
            cos: 5,
            bottom: true,
            ttl: 64,
        });
        let (bytes, _) = frame.build(&[0x45; 20]).unwrap();

        assert_eq!(&bytes[12..14], &[0x88, 0x47]);
        // label 3 << 12 | cos 5 << 9 | s << 8 | ttl 64
        assert_eq!(&bytes[14..18], &[0x00, 0x00, 0x3b, 0x40]);
    }
}
