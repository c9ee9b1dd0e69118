use super::{FrameCursor, LinkHandler};
use crate::anonymizer::Anonymizer;
use libpcap_tools::Error;
use pnet_packet::ethernet::{EtherType, EtherTypes};

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const IPV4_HEADER_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;
/// hardware/protocol types, lengths and opcode
const ARP_FIXED_LEN: usize = 8;

/// Ethernet (DIX) frames, with optional 802.1Q tag
pub struct EthernetHandler;

impl LinkHandler for EthernetHandler {
    fn name(&self) -> &'static str {
        "Ethernet"
    }

    fn handle(&self, data: &mut [u8], anon: &mut dyn Anonymizer) -> Result<usize, Error> {
        let mut cur = FrameCursor::new(data);

        cur.require(ETHERNET_HEADER_LEN)?;
        anon.mac(cur.field::<6>()?);
        anon.mac(cur.field::<6>()?);
        let mut ethertype = EtherType::new(cur.read_u16_be()?);
        if ethertype == EtherTypes::Vlan {
            // TCI, then the real ethertype
            cur.require(VLAN_TAG_LEN)?;
            cur.skip(2)?;
            ethertype = EtherType::new(cur.read_u16_be()?);
        }
        trace!("ethertype: 0x{:04x}", ethertype.0);

        match ethertype {
            EtherTypes::Arp => {
                cur.skip(ARP_FIXED_LEN)?;
                // sender, then target
                for _ in 0..2 {
                    let mac = cur.field::<6>()?;
                    // probes use an all-zero address
                    if mac.iter().any(|&b| b != 0) {
                        anon.mac(mac);
                    }
                    anon.ipv4(cur.field::<4>()?);
                }
            }
            EtherTypes::Ipv4 => {
                cur.require(IPV4_HEADER_LEN)?;
                let ihl = (cur.peek_u8()? & 0x0f) as usize;
                cur.skip(12)?;
                anon.ipv4(cur.field::<4>()?);
                anon.ipv4(cur.field::<4>()?);
                if ihl > 5 {
                    // options
                    cur.skip((ihl - 5) * 4)?;
                }
            }
            EtherTypes::Ipv6 => {
                cur.require(IPV6_HEADER_LEN)?;
                cur.skip(8)?;
                anon.ipv6(cur.field::<16>()?);
                anon.ipv6(cur.field::<16>()?);
            }
            _ => (),
        }

        Ok(cur.offset())
    }
}
