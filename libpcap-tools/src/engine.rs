use crate::analyzer::RecordAnalyzer;
use crate::config::Config;
use crate::context::ParseContext;
use crate::error::Error;
use crate::pcap::{PcapReader, DEFAULT_MAX_PACKET_LEN};
use std::io::Read;

/// pcap record engine
///
/// `RecordEngine` reads a pcap stream once, forward-only, and hands every
/// record to the wrapped `RecordAnalyzer`, strictly in stream order.
/// The first error (from the reader or the analyzer) stops the run.
///
/// ## example
///
/// ```
/// use libpcap_tools::{Config, Error, ParseContext, PcapRecord, RecordAnalyzer, RecordEngine};
/// #[derive(Default)]
/// pub struct CountAnalyzer {
///     bytes: usize,
/// }
///
/// impl RecordAnalyzer for CountAnalyzer {
///     fn handle_record(&mut self, record: &mut PcapRecord, _ctx: &ParseContext) -> Result<(), Error> {
///         self.bytes += record.data.len();
///         Ok(())
///     }
/// }
///
/// let config = Config::default();
/// let mut engine = RecordEngine::new(CountAnalyzer::default(), &config)?;
///
/// // not a pcap file
/// let mut input = std::io::Cursor::new(vec![1, 2, 3, 4, 5]);
/// assert!(engine.run(&mut input).is_err());
/// assert_eq!(engine.records(), 0);
/// # Ok::<(), Error>(())
/// ```
pub struct RecordEngine<A: RecordAnalyzer> {
    analyzer: A,
    max_packet_len: u32,
    records: usize,
}

impl<A: RecordAnalyzer> RecordEngine<A> {
    /// Build a new engine, taking ownership of the analyzer
    ///
    /// The maximum record length is read from the `max_packet_len` configuration key.
    pub fn new(analyzer: A, config: &Config) -> Result<Self, Error> {
        let max_packet_len = config
            .get_usize("max_packet_len")?
            .map(|v| v.min(u32::MAX as usize) as u32)
            .unwrap_or(DEFAULT_MAX_PACKET_LEN);
        Ok(RecordEngine {
            analyzer,
            max_packet_len,
            records: 0,
        })
    }

    pub fn into_analyzer(self) -> A {
        self.analyzer
    }

    pub fn max_packet_len(&self) -> u32 {
        self.max_packet_len
    }

    /// Number of records successfully handled so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Main function: given a reader, read all pcap data and call analyzer for each record
    pub fn run(&mut self, reader: &mut dyn Read) -> Result<(), Error> {
        let mut reader = PcapReader::new(reader, self.max_packet_len);
        let header = reader.read_header()?;
        debug!(
            "detected {}, pcap version {}.{}, snaplen {}, link type {}",
            header.endianness,
            header.version_major,
            header.version_minor,
            header.snaplen,
            header.network
        );
        self.analyzer.init(&header)?;
        let mut ctx = ParseContext::new(&header);

        while let Some(mut record) = reader.next_record()? {
            ctx.pcap_index += 1;
            trace!(
                "record {}: caplen {} origlen {}",
                ctx.pcap_index,
                record.caplen,
                record.origlen
            );
            self.analyzer.handle_record(&mut record, &ctx)?;
            self.records += 1;
        }

        self.analyzer.teardown()
    }
}
