#![allow(dead_code)]

use libpcap_tools::{Endianness, GlobalHeader, PcapRecord, PcapWriter};
use pcap_parser::{
    parse_pcap_frame, parse_pcap_frame_be, parse_pcap_header, LegacyPcapBlock, Linktype,
    PcapHeader,
};

pub const MAC_A: [u8; 6] = [0x00, 0x1b, 0x21, 0x0a, 0x0b, 0x0c];
pub const MAC_B: [u8; 6] = [0xf0, 0x9f, 0xc2, 0x11, 0x22, 0x33];
pub const IP_A: [u8; 4] = [192, 168, 1, 10];
pub const IP_B: [u8; 4] = [93, 184, 216, 34];

/// Build a pcap file holding `frames`, one record each
pub fn capture(e: Endianness, link_type: Linktype, frames: &[Vec<u8>]) -> Vec<u8> {
    let hdr = GlobalHeader::new(e, 65535, link_type);
    let mut w = PcapWriter::new(Vec::new());
    w.write_header(&hdr).unwrap();
    for (i, frame) in frames.iter().enumerate() {
        let rec = PcapRecord {
            ts_sec: 1_600_000_000 + i as u32,
            ts_frac: 123_456,
            caplen: frame.len() as u32,
            origlen: frame.len() as u32,
            data: frame.clone(),
        };
        w.write_record(&rec).unwrap();
    }
    w.into_inner()
}

/// Parse a complete pcap file, in either byte order
pub fn parse_capture(data: &[u8]) -> (PcapHeader, Vec<LegacyPcapBlock<'_>>) {
    let (mut rem, header) = parse_pcap_header(data).expect("invalid pcap header");
    let mut blocks = Vec::new();
    while !rem.is_empty() {
        let res = if header.is_bigendian() {
            parse_pcap_frame_be(rem)
        } else {
            parse_pcap_frame(rem)
        };
        let (r, block) = res.expect("invalid pcap record");
        blocks.push(block);
        rem = r;
    }
    (header, blocks)
}

/// Ethernet + IPv4 (no options) + opaque transport payload
pub fn eth_ipv4(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    payload: &[u8],
) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&dst_mac);
    v.extend_from_slice(&src_mac);
    v.extend_from_slice(&[0x08, 0x00]);
    let total_len = (20 + payload.len()) as u16;
    v.extend_from_slice(&[0x45, 0x00]);
    v.extend_from_slice(&total_len.to_be_bytes());
    v.extend_from_slice(&[0x12, 0x34, 0x40, 0x00, 64, 17, 0x00, 0x00]);
    v.extend_from_slice(&src_ip);
    v.extend_from_slice(&dst_ip);
    v.extend_from_slice(payload);
    v
}

/// Radiotap (declared length `rt_len`) + QoS data frame with four addresses
pub fn radiotap_qos_data(rt_len: u16, addrs: [[u8; 6]; 4], body: &[u8]) -> Vec<u8> {
    let mut v = vec![0, 0];
    v.extend_from_slice(&rt_len.to_le_bytes());
    v.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    v.resize(rt_len as usize, 0);
    // type data, subtype QoS data; toDS and fromDS
    v.extend_from_slice(&[0x88, 0x03, 0x00, 0x00]);
    v.extend_from_slice(&addrs[0]);
    v.extend_from_slice(&addrs[1]);
    v.extend_from_slice(&addrs[2]);
    v.extend_from_slice(&[0x20, 0x00]);
    v.extend_from_slice(&addrs[3]);
    v.extend_from_slice(&[0x00, 0x00]);
    v.extend_from_slice(body);
    v
}
