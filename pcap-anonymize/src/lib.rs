//! Anonymization of MAC and IP addresses in pcap files
//!
//! Each record is parsed up to the end of the headers this crate understands
//! (Ethernet/ARP/IPv4/IPv6, or Radiotap + 802.11 MAC header). Every address
//! found on the way is anonymized in place, and by default everything past
//! these headers is truncated.

#[macro_use]
extern crate log;

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use libpcap_tools::{Config, Error, RecordEngine};
use xz2::read::XzDecoder;

pub mod anonymizer;
pub mod handlers;
pub mod key;
pub mod rewriter;

use anonymizer::{DefaultAnonymizer, Method, Methods};
use rewriter::{Report, Rewriter};

/// Options for one anonymization run
pub struct AnonymizeOptions {
    pub methods: Methods,
    /// Cut every record after the last byte understood by the link handler
    pub truncate: bool,
    /// Key string, hashed to seed the keystream
    pub key: String,
    /// Engine configuration (`max_packet_len`)
    pub config: Config,
}

impl AnonymizeOptions {
    pub fn new<S: Into<String>>(methods: Methods, key: S) -> Self {
        AnonymizeOptions {
            methods,
            truncate: true,
            key: key.into(),
            config: Config::default(),
        }
    }

    /// Build options from configuration keys
    ///
    /// If no `key` is configured, a random key is generated and logged, so the
    /// run can be reproduced. A recognized key holding a value of the wrong type
    /// is an error.
    pub fn from_config(config: Config) -> Result<Self, Error> {
        let method = |name: &str| -> Result<Method, Error> {
            config
                .get(format!("anonymize.{name}"))?
                .map_or(Ok(Method::default()), str::parse::<Method>)
        };
        let methods = Methods {
            mac_oui: method("mac_oui")?,
            mac_nic: method("mac_nic")?,
            ipv4: method("ipv4")?,
            ipv6: method("ipv6")?,
        };
        let truncate = config.get_bool("truncate")?.unwrap_or(true);
        // validated before any output is created
        config.get_usize("max_packet_len")?;
        let key = match config.get("key")? {
            Some(k) => k.to_owned(),
            None => {
                let k = key::generate_key(key::KEY_LEN);
                warn!("auto-generated key: {}", k);
                k
            }
        };
        Ok(AnonymizeOptions {
            methods,
            truncate,
            key,
            config,
        })
    }
}

/// A run that stopped before the end of the input
#[derive(Debug, thiserror::Error)]
#[error("error after {} packets: {}", .report.records, .error)]
pub struct RunError {
    /// What was done before the failure
    pub report: Report,
    #[source]
    pub error: Error,
}

impl RunError {
    fn before_start(error: Error) -> Self {
        RunError {
            report: Report::default(),
            error,
        }
    }
}

/// Anonymize a pcap stream
///
/// Records are read, anonymized and written one at a time. The output is
/// flushed even if the run fails; records written before the failure are kept.
pub fn anonymize<R: Read, W: Write>(
    mut input: R,
    output: W,
    options: &AnonymizeOptions,
) -> Result<Report, RunError> {
    debug!("methods: {:?}, truncate: {}", options.methods, options.truncate);
    let anonymizer = DefaultAnonymizer::new(options.methods, key::derive_key(&options.key));
    let rewriter = Rewriter::new(output, anonymizer, options.truncate);
    let mut engine =
        RecordEngine::new(rewriter, &options.config).map_err(RunError::before_start)?;
    debug!("max packet len: {}", engine.max_packet_len());
    let res = engine.run(&mut input);
    debug!("{} records read", engine.records());
    let mut rewriter = engine.into_analyzer();
    let flushed = rewriter.flush();
    let report = rewriter.report();
    match res.and(flushed) {
        Ok(()) => Ok(report),
        Err(error) => Err(RunError { report, error }),
    }
}

/// Anonymize input file into output file
///
/// - `input_filename` must be a pcap file, possibly compressed (gzip, xz or lz4).
///   If using the special value "-", standard input will be used
/// - `output_filename` will be created, or truncated if the file exists.
///   If using the special value "-", standard output will be used
pub fn pcap_anonymize_file<S1: AsRef<str>, S2: AsRef<str>>(
    input_filename: S1,
    output_filename: S2,
    options: &AnonymizeOptions,
) -> Result<Report, RunError> {
    let input_reader = get_reader(input_filename.as_ref())
        .map_err(|e| RunError::before_start(Error::Io(e)))?;
    let output_writer = get_writer(output_filename.as_ref())
        .map_err(|e| RunError::before_start(Error::Io(e)))?;
    anonymize(input_reader, BufWriter::new(output_writer), options)
}

fn get_writer(output_filename: &str) -> io::Result<Box<dyn Write>> {
    if output_filename == "-" {
        Ok(Box::new(io::stdout().lock()))
    } else {
        let file = File::create(Path::new(output_filename)).map_err(|e| {
            error!("Could not create output file '{}'", output_filename);
            e
        })?;
        Ok(Box::new(file))
    }
}

fn get_reader(input_filename: &str) -> io::Result<Box<dyn Read>> {
    if input_filename == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let mut file = File::open(Path::new(input_filename)).map_err(|e| {
        error!("Could not open input file '{}'", input_filename);
        e
    })?;

    // https://en.wikipedia.org/wiki/LZ4_(compression_algorithm)
    fn lz4_matcher(buf: &[u8]) -> bool {
        buf.len() >= 4 && buf[0] == 0x04 && buf[1] == 0x22 && buf[2] == 0x4d && buf[3] == 0x18
    }
    // https://www.tcpdump.org/manpages/pcap-savefile.5.html
    fn pcap_matcher(buf: &[u8]) -> bool {
        buf.len() >= 4
            && matches!(
                [buf[0], buf[1], buf[2], buf[3]],
                [0xa1, 0xb2, 0xc3, 0xd4] | [0xd4, 0xc3, 0xb2, 0xa1]
            )
    }

    let mut info = infer::Infer::new();
    info.add("custom/lz4", "lz4", lz4_matcher);
    info.add("custom/pcap", "pcap", pcap_matcher);

    let mut buf = Vec::with_capacity(12);
    (&mut file).take(12).read_to_end(&mut buf)?;
    file.seek(SeekFrom::Start(0))?;

    let extension = info.get(&buf).map(|kind| kind.extension());
    let reader: Box<dyn Read> = match extension {
        Some("gz") => Box::new(GzDecoder::new(file)),
        Some("xz") => Box::new(XzDecoder::new(file)),
        Some("lz4") => Box::new(lz4::Decoder::new(file)?),
        Some("pcap") => Box::new(file),
        _ => {
            warn!("Could not infer file type '{}'", input_filename);
            Box::new(file)
        }
    };
    Ok(reader)
}
