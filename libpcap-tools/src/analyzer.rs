use crate::context::ParseContext;
use crate::error::Error;
use crate::pcap::{GlobalHeader, PcapRecord};

/// Common trait for record-by-record pcap processors
pub trait RecordAnalyzer {
    /// Initialization function, called once the global header has been read
    /// and before any record
    fn init(&mut self, _header: &GlobalHeader) -> Result<(), Error> {
        Ok(())
    }

    /// Callback function for every record. The record may be modified in place.
    fn handle_record(&mut self, record: &mut PcapRecord, ctx: &ParseContext)
        -> Result<(), Error>;

    /// Teardown function, called after the last record (optional)
    fn teardown(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
