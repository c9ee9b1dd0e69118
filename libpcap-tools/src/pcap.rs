//! Legacy pcap container: magic, global header and record headers
//!
//! See <https://www.tcpdump.org/manpages/pcap-savefile.5.html>
//!
//! Files are read forward-only, one record at a time, and decoded with
//! `pcap-parser`. Records are re-encoded in the byte order announced by the
//! input magic.

use crate::error::Error;
use pcap_parser::{
    parse_pcap_frame, parse_pcap_frame_be, parse_pcap_header, Linktype, PcapHeader,
};
use std::io::{self, Read, Write};

/// Microsecond pcap magic, in the writer's byte order
pub const PCAP_MAGIC: u32 = 0xa1b2_c3d4;

/// Default upper bound for the captured length of a single record (256 KiB)
pub const DEFAULT_MAX_PACKET_LEN: u32 = 256 * 1024;

/// Size of the global header, magic excluded
pub const GLOBAL_HEADER_LEN: usize = 20;
/// Size of a record header
pub const RECORD_HEADER_LEN: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    #[inline]
    fn read_u32(self, b: [u8; 4]) -> u32 {
        match self {
            Endianness::Big => u32::from_be_bytes(b),
            Endianness::Little => u32::from_le_bytes(b),
        }
    }

    #[inline]
    pub fn write_u16(self, v: u16) -> [u8; 2] {
        match self {
            Endianness::Big => v.to_be_bytes(),
            Endianness::Little => v.to_le_bytes(),
        }
    }

    #[inline]
    pub fn write_u32(self, v: u32) -> [u8; 4] {
        match self {
            Endianness::Big => v.to_be_bytes(),
            Endianness::Little => v.to_le_bytes(),
        }
    }
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Endianness::Big => f.write_str("BigEndian"),
            Endianness::Little => f.write_str("LittleEndian"),
        }
    }
}

/// pcap global header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalHeader {
    pub endianness: Endianness,
    pub version_major: u16,
    pub version_minor: u16,
    pub thiszone: i32,
    pub sigfigs: u32,
    pub snaplen: u32,
    pub network: Linktype,
}

impl GlobalHeader {
    /// Build a pcap 2.4 header
    pub fn new(endianness: Endianness, snaplen: u32, network: Linktype) -> Self {
        GlobalHeader {
            endianness,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen,
            network,
        }
    }

    /// Accept only the two microsecond magics (one per byte order)
    fn from_pcap_header(h: &PcapHeader) -> Result<Self, Error> {
        if h.is_nanosecond_precision() || h.is_modified_format() {
            // as it appears in the file
            return Err(Error::BadMagic(h.magic_number.swap_bytes()));
        }
        let endianness = if h.is_bigendian() {
            Endianness::Big
        } else {
            Endianness::Little
        };
        Ok(GlobalHeader {
            endianness,
            version_major: h.version_major,
            version_minor: h.version_minor,
            thiszone: h.thiszone,
            sigfigs: h.sigfigs,
            snaplen: h.snaplen,
            network: h.network,
        })
    }

    /// Serialize the header, magic included
    pub fn to_vec(&self) -> Vec<u8> {
        let e = self.endianness;
        let mut v = Vec::with_capacity(4 + GLOBAL_HEADER_LEN);
        // canonical magic, in the stream order: same bytes as the input magic
        v.extend_from_slice(&e.write_u32(PCAP_MAGIC));
        v.extend_from_slice(&e.write_u16(self.version_major));
        v.extend_from_slice(&e.write_u16(self.version_minor));
        v.extend_from_slice(&e.write_u32(self.thiszone as u32));
        v.extend_from_slice(&e.write_u32(self.sigfigs));
        v.extend_from_slice(&e.write_u32(self.snaplen));
        v.extend_from_slice(&e.write_u32(self.network.0 as u32));
        v
    }
}

/// One captured record: header fields and payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcapRecord {
    pub ts_sec: u32,
    /// Fractional part of the timestamp (micro- or nanoseconds, untouched)
    pub ts_frac: u32,
    pub caplen: u32,
    pub origlen: u32,
    pub data: Vec<u8>,
}

impl PcapRecord {
    /// Cut the payload to `len` bytes, keeping `caplen` equal to the payload length
    ///
    /// `origlen` keeps the on-wire length.
    pub fn truncate(&mut self, len: usize) {
        if len < self.data.len() {
            self.data.truncate(len);
            self.caplen = len as u32;
        }
    }

    fn header_to_bytes(&self, e: Endianness) -> [u8; RECORD_HEADER_LEN] {
        let mut b = [0u8; RECORD_HEADER_LEN];
        b[0..4].copy_from_slice(&e.write_u32(self.ts_sec));
        b[4..8].copy_from_slice(&e.write_u32(self.ts_frac));
        b[8..12].copy_from_slice(&e.write_u32(self.caplen));
        b[12..16].copy_from_slice(&e.write_u32(self.origlen));
        b
    }
}

/// Fill `buf` completely, or return `Ok(false)` if the stream ended before the first byte
fn read_exact_or_eof<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated record header",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Forward-only reader for legacy pcap streams
pub struct PcapReader<R: Read> {
    r: R,
    max_packet_len: u32,
    endianness: Option<Endianness>,
}

impl<R: Read> PcapReader<R> {
    pub fn new(r: R, max_packet_len: u32) -> Self {
        PcapReader {
            r,
            max_packet_len,
            endianness: None,
        }
    }

    /// Read magic and global header. Must be called once, before any record.
    pub fn read_header(&mut self) -> Result<GlobalHeader, Error> {
        let mut b = [0u8; 4 + GLOBAL_HEADER_LEN];
        if !read_exact_or_eof(&mut self.r, &mut b[..4]).map_err(eof_as_format)? {
            return Err(Error::Format("empty input"));
        }
        self.r.read_exact(&mut b[4..]).map_err(eof_as_format)?;
        let header = match parse_pcap_header(&b) {
            Ok((_, h)) => GlobalHeader::from_pcap_header(&h)?,
            Err(_) => {
                let magic = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
                return Err(Error::BadMagic(magic));
            }
        };
        self.endianness = Some(header.endianness);
        Ok(header)
    }

    /// Read the next record
    ///
    /// Returns `Ok(None)` on a clean end of stream. The captured length is
    /// checked against the configured maximum before the payload is allocated.
    pub fn next_record(&mut self) -> Result<Option<PcapRecord>, Error> {
        let e = self
            .endianness
            .ok_or(Error::Generic("pcap header must be read before records"))?;
        let mut h = [0u8; RECORD_HEADER_LEN];
        if !read_exact_or_eof(&mut self.r, &mut h)? {
            return Ok(None);
        }
        let caplen = e.read_u32([h[8], h[9], h[10], h[11]]);
        if caplen > self.max_packet_len {
            return Err(Error::SizeLimit {
                len: caplen,
                max: self.max_packet_len,
            });
        }
        let mut buf = vec![0u8; RECORD_HEADER_LEN + caplen as usize];
        buf[..RECORD_HEADER_LEN].copy_from_slice(&h);
        self.r.read_exact(&mut buf[RECORD_HEADER_LEN..])?;
        let parsed = match e {
            Endianness::Big => parse_pcap_frame_be(&buf),
            Endianness::Little => parse_pcap_frame(&buf),
        };
        let (ts_sec, ts_frac, origlen) = match parsed {
            Ok((_, block)) => (block.ts_sec, block.ts_usec, block.origlen),
            Err(_) => return Err(Error::Format("malformed record")),
        };
        let data = buf.split_off(RECORD_HEADER_LEN);
        Ok(Some(PcapRecord {
            ts_sec,
            ts_frac,
            caplen,
            origlen,
            data,
        }))
    }
}

fn eof_as_format(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Format("truncated global header")
    } else {
        Error::Io(e)
    }
}

/// Writer for legacy pcap streams, mirroring the input byte order
pub struct PcapWriter<W: Write> {
    w: W,
    endianness: Endianness,
}

impl<W: Write> PcapWriter<W> {
    pub fn new(w: W) -> Self {
        PcapWriter {
            w,
            endianness: Endianness::Little,
        }
    }

    /// Write magic and global header; records are then written in the same byte order
    pub fn write_header(&mut self, hdr: &GlobalHeader) -> Result<usize, Error> {
        self.endianness = hdr.endianness;
        let v = hdr.to_vec();
        self.w.write_all(&v)?;
        Ok(v.len())
    }

    /// Write record header and payload. `caplen` must match the payload length.
    pub fn write_record(&mut self, record: &PcapRecord) -> Result<usize, Error> {
        if record.caplen as usize != record.data.len() {
            return Err(Error::Generic("record length does not match payload"));
        }
        self.w.write_all(&record.header_to_bytes(self.endianness))?;
        self.w.write_all(&record.data)?;
        Ok(RECORD_HEADER_LEN + record.data.len())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.w.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}
