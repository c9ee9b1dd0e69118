#![warn(clippy::all)]

use clap::{crate_version, Parser};
use libpcap_tools::Config;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process;
use tracing::{debug, error, info, Level};
use tracing_subscriber::EnvFilter;

use pcap_anonymize::rewriter::Report;
use pcap_anonymize::{pcap_anonymize_file, AnonymizeOptions};

/// Pcap anonymization tool
///
/// Rewrites MAC, IPv4 and IPv6 addresses of Ethernet and Radiotap+802.11
/// captures, and truncates the data following the known headers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Key for anonymization (default: auto-generated, and logged)
    #[arg(short, long)]
    key: Option<String>,

    /// MAC OUI (vendor) anonymization method: encrypt, pseudonym or leave
    #[arg(long, value_name = "METHOD")]
    mac_oui: Option<String>,

    /// MAC NIC (id) anonymization method: encrypt, pseudonym or leave
    #[arg(long, value_name = "METHOD")]
    mac_nic: Option<String>,

    /// IPv4 address anonymization method: encrypt, pseudonym or leave
    #[arg(long, value_name = "METHOD")]
    ipv4: Option<String>,

    /// IPv6 address anonymization method: encrypt, pseudonym or leave
    #[arg(long, value_name = "METHOD")]
    ipv6: Option<String>,

    /// Do not truncate unknown portions of packets (caution: will expose addresses)
    #[arg(long)]
    no_truncate: bool,

    /// Maximum captured length of a packet (default: 262144)
    #[arg(long, value_name = "BYTES")]
    max_packet_len: Option<u32>,

    /// Configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<String>,

    /// Write a JSON report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<String>,

    /// Be verbose
    #[arg(short, long)]
    verbose: bool,

    /// Input file ("-" for stdin)
    #[arg(default_value = "-")]
    input: String,

    /// Output file ("-" for stdout)
    #[arg(default_value = "-")]
    output: String,
}

fn load_config(config: &mut Config, filename: &str) -> Result<(), libpcap_tools::Error> {
    debug!("Loading configuration {filename}");
    let path = Path::new(&filename);
    let file = File::open(path)?;
    config.load_config(file)
}

fn write_report(filename: &str, report: &Report) -> io::Result<()> {
    let file = File::create(Path::new(filename))?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    // stdout may carry the output capture: log to stderr
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let env_filter = EnvFilter::try_from_env("PCAP_ANONYMIZE_LOG")
        .unwrap_or_else(|_| EnvFilter::from_default_env().add_directive(level.into()));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .compact()
        .init();

    debug!("Pcap anonymization tool {}", crate_version!());

    // load config
    let mut config = Config::default();
    if let Some(filename) = args.config.as_deref() {
        if let Err(e) = load_config(&mut config, filename) {
            error!("Could not load config file '{filename}': {e}");
            process::exit(1);
        }
    }
    // override config options from command-line arguments
    if let Some(key) = args.key.as_deref() {
        config.set("key", key);
    }
    for (name, value) in [
        ("anonymize.mac_oui", &args.mac_oui),
        ("anonymize.mac_nic", &args.mac_nic),
        ("anonymize.ipv4", &args.ipv4),
        ("anonymize.ipv6", &args.ipv6),
    ] {
        if let Some(value) = value.as_deref() {
            config.set(name, value);
        }
    }
    if args.no_truncate {
        config.set("truncate", false);
    }
    if let Some(len) = args.max_packet_len {
        config.set("max_packet_len", i64::from(len));
    }

    let options = match AnonymizeOptions::from_config(config) {
        Ok(options) => options,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let (report, rc) = match pcap_anonymize_file(&args.input, &args.output, &options) {
        Ok(report) => (report, 0),
        Err(e) => {
            error!("{e}");
            (e.report, 1)
        }
    };
    info!("processed {} packets", report.records);
    info!(
        "anonymized {} MAC, {} IPv4, {} IPv6 addresses",
        report.counts.mac, report.counts.ipv4, report.counts.ipv6
    );
    if let Some(filename) = args.report.as_deref() {
        if let Err(e) = write_report(filename, &report) {
            error!("Could not write report '{filename}': {e}");
            process::exit(1);
        }
    }
    process::exit(rc);
}
