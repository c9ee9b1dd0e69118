//! Link-layer frame handlers
//!
//! A handler parses the headers of one link-layer format, anonymizes every
//! address field it finds in place, and returns the number of bytes it
//! understood (the boundary). Bytes past the boundary are not inspected and
//! may be truncated.

use crate::anonymizer::Anonymizer;
use libpcap_tools::Error;
use pcap_parser::Linktype;

mod ethernet;
mod radiotap;

pub use ethernet::EthernetHandler;
pub use radiotap::Radiotap80211Handler;

/// Anonymizes the addresses of one frame
pub trait LinkHandler {
    fn name(&self) -> &'static str;

    /// Anonymize `data` in place and return the boundary
    fn handle(&self, data: &mut [u8], anon: &mut dyn Anonymizer) -> Result<usize, Error>;
}

/// Radiotap header followed by an 802.11 frame
pub const LINKTYPE_IEEE802_11_RADIOTAP: Linktype = Linktype(127);

static ETHERNET: EthernetHandler = EthernetHandler;
static RADIOTAP_80211: Radiotap80211Handler = Radiotap80211Handler;

/// Get the handler registered for a link type
///
/// See <https://www.tcpdump.org/linktypes.html>
pub fn get_handler(link_type: Linktype) -> Option<&'static dyn LinkHandler> {
    match link_type {
        Linktype::ETHERNET => Some(&ETHERNET),
        LINKTYPE_IEEE802_11_RADIOTAP => Some(&RADIOTAP_80211),
        _ => None,
    }
}

/// Offset-tracking view over a frame
pub(crate) struct FrameCursor<'a> {
    data: &'a mut [u8],
    offset: usize,
}

impl<'a> FrameCursor<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        FrameCursor { data, offset: 0 }
    }

    /// Number of bytes consumed so far
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move to an absolute position. Bounds are checked by the next read.
    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Check that `len` bytes are available at the current position
    pub fn require(&self, len: usize) -> Result<(), Error> {
        match self.offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(Error::ShortPacket {
                offset: self.offset,
                needed: len,
            }),
        }
    }

    /// Consume `len` opaque bytes
    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.require(len)?;
        self.offset += len;
        Ok(())
    }

    pub fn peek_u8(&self) -> Result<u8, Error> {
        self.require(1)?;
        Ok(self.data[self.offset])
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let b = self.peek_u8()?;
        self.offset += 1;
        Ok(b)
    }

    pub fn read_u16_be(&mut self) -> Result<u16, Error> {
        let b = self.field::<2>()?;
        Ok(u16::from_be_bytes(*b))
    }

    pub fn read_u16_le(&mut self) -> Result<u16, Error> {
        let b = self.field::<2>()?;
        Ok(u16::from_le_bytes(*b))
    }

    /// Consume a fixed-size field and return it for in-place modification
    pub fn field<const N: usize>(&mut self) -> Result<&mut [u8; N], Error> {
        self.require(N)?;
        let start = self.offset;
        self.offset += N;
        let field = &mut self.data[start..start + N];
        <&mut [u8; N]>::try_from(field).map_err(|_| Error::ShortPacket {
            offset: start,
            needed: N,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry() {
        assert_eq!(get_handler(Linktype(1)).map(|h| h.name()), Some("Ethernet"));
        assert_eq!(
            get_handler(LINKTYPE_IEEE802_11_RADIOTAP).map(|h| h.name()),
            Some("Radiotap+802.11")
        );
        assert_eq!(LINKTYPE_IEEE802_11_RADIOTAP, Linktype(127));
        assert!(get_handler(Linktype::RAW).is_none());
        assert!(get_handler(Linktype(105)).is_none());
    }

    #[test]
    fn cursor_reads() {
        let mut data = [1u8, 2, 3, 4, 5, 6, 7];
        let mut cur = FrameCursor::new(&mut data);
        assert_eq!(cur.read_u8().unwrap(), 1);
        assert_eq!(cur.read_u16_be().unwrap(), 0x0203);
        assert_eq!(cur.read_u16_le().unwrap(), 0x0504);
        let f = cur.field::<2>().unwrap();
        f[0] = 0xff;
        assert_eq!(cur.offset(), 7);
        assert!(matches!(
            cur.read_u8(),
            Err(Error::ShortPacket {
                offset: 7,
                needed: 1
            })
        ));
        assert_eq!(data[5], 0xff);
    }

    #[test]
    fn cursor_short_read_does_not_advance() {
        let mut data = [0u8; 5];
        let mut cur = FrameCursor::new(&mut data);
        cur.skip(2).unwrap();
        assert!(matches!(
            cur.field::<4>(),
            Err(Error::ShortPacket {
                offset: 2,
                needed: 4
            })
        ));
        assert_eq!(cur.offset(), 2);
        cur.seek(100);
        assert!(cur.skip(1).is_err());
        assert!(cur.skip(0).is_err());
    }
}
