use crate::anonymizer::{AnonCounts, DefaultAnonymizer, PseudonymCounts};
use crate::handlers::{get_handler, LinkHandler};
use libpcap_tools::{Error, GlobalHeader, ParseContext, PcapRecord, PcapWriter, RecordAnalyzer};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Default)]
struct Stats {
    num_packets: u64,
    num_bytes: u64,
    num_truncated: u64,
}

/// Summary of a run, for reporting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Records processed and written
    pub records: u64,
    /// Bytes written, headers included
    pub bytes: u64,
    /// Records shortened to their boundary
    pub truncated: u64,
    pub counts: AnonCounts,
    pub pseudonyms: PseudonymCounts,
}

/// Anonymizes every record and writes it to the output, in input order
pub struct Rewriter<W: Write> {
    writer: PcapWriter<W>,
    anonymizer: DefaultAnonymizer,
    handler: Option<&'static dyn LinkHandler>,
    truncate: bool,
    stats: Stats,
}

impl<W: Write> Rewriter<W> {
    pub fn new(w: W, anonymizer: DefaultAnonymizer, truncate: bool) -> Self {
        Rewriter {
            writer: PcapWriter::new(w),
            anonymizer,
            handler: None,
            truncate,
            stats: Stats::default(),
        }
    }

    pub fn report(&self) -> Report {
        Report {
            records: self.stats.num_packets,
            bytes: self.stats.num_bytes,
            truncated: self.stats.num_truncated,
            counts: self.anonymizer.counts(),
            pseudonyms: self.anonymizer.pseudonyms(),
        }
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> RecordAnalyzer for Rewriter<W> {
    fn init(&mut self, header: &GlobalHeader) -> Result<(), Error> {
        let handler =
            get_handler(header.network).ok_or(Error::UnsupportedLinkType(header.network.0))?;
        info!(
            "detected {}, pcap version {}.{}, snaplen {}, link layer {}",
            header.endianness,
            header.version_major,
            header.version_minor,
            header.snaplen,
            handler.name()
        );
        self.handler = Some(handler);
        self.stats.num_bytes += self.writer.write_header(header)? as u64;
        Ok(())
    }

    fn handle_record(&mut self, record: &mut PcapRecord, ctx: &ParseContext) -> Result<(), Error> {
        let handler = self
            .handler
            .ok_or(Error::Generic("no link handler (init not called)"))?;
        let boundary = handler
            .handle(&mut record.data, &mut self.anonymizer)
            .map_err(|e| {
                warn!("record {} ({}): {}", ctx.pcap_index, ctx.link_type, e);
                e
            })?;
        if self.truncate && boundary < record.data.len() {
            trace!(
                "truncating index {} from {} to {} bytes",
                ctx.pcap_index,
                record.data.len(),
                boundary
            );
            record.truncate(boundary);
            self.stats.num_truncated += 1;
        }
        let written = self.writer.write_record(record)?;
        self.stats.num_packets += 1;
        self.stats.num_bytes += written as u64;
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), Error> {
        self.writer.flush()?;
        debug!("Done.");
        debug!("Stats: {:?}", self.stats);
        Ok(())
    }
}
