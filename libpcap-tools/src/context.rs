use crate::pcap::GlobalHeader;
use pcap_parser::Linktype;

/// pcap parsing context
#[derive(Clone, Debug)]
pub struct ParseContext {
    /// The `Linktype` used for data format
    pub link_type: Linktype,
    /// Index of current record in pcap file (first record is 1)
    pub pcap_index: usize,
}

impl ParseContext {
    pub fn new(hdr: &GlobalHeader) -> Self {
        ParseContext {
            link_type: hdr.network,
            pcap_index: 0,
        }
    }
}
