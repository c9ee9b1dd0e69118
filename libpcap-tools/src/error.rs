use std::io;
use thiserror::Error;

/// Errors raised while reading, transforming or writing a capture
///
/// Every variant is fatal for the run: there is no per-record recovery.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bad magic: 0x{0:08x}")]
    BadMagic(u32),
    #[error("malformed capture: {0}")]
    Format(&'static str),
    #[error("unsupported link layer: {0} (https://www.tcpdump.org/linktypes.html)")]
    UnsupportedLinkType(i32),
    #[error("short packet trying to read {needed} bytes at pos {offset} (increase snaplen)")]
    ShortPacket { offset: usize, needed: usize },
    #[error("max packet len exceeded: {len} (max {max})")]
    SizeLimit { len: u32, max: u32 },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Generic(&'static str),
}

impl Error {
    /// Returns true if the error is a short read on the underlying stream
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}
