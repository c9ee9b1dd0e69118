mod common;

use assert_cmd::Command;
use common::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use libpcap_tools::Endianness;
use pcap_parser::Linktype;
use std::io::Write;
use xz2::write::XzEncoder;
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pcap-anonymize-{}-{name}", std::process::id()))
}

fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

fn flow() -> Vec<u8> {
    capture(
        Endianness::Little,
        Linktype::ETHERNET,
        &[
            eth_ipv4(MAC_A, MAC_B, IP_A, IP_B, b"request"),
            eth_ipv4(MAC_B, MAC_A, IP_B, IP_A, b"response"),
        ],
    )
}

#[test]
fn help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn stdin_to_stdout_leave() {
    let input = flow();
    let output = cmd()
        .args([
            "--key", "k", "--mac-oui", "leave", "--mac-nic", "leave", "--ipv4", "leave",
            "--ipv6", "leave", "--no-truncate",
        ])
        .write_stdin(input.clone())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, input);
}

#[test]
fn files_and_report() {
    let input = tmp_path("in.pcap");
    let output = tmp_path("out.pcap");
    let report_file = tmp_path("report.json");
    std::fs::write(&input, flow()).unwrap();

    cmd()
        .arg("--key")
        .arg("secret")
        .arg("--report")
        .arg(&report_file)
        .arg(&input)
        .arg(&output)
        .assert()
        .success();

    let data = std::fs::read(&output).unwrap();
    let (_, blocks) = parse_capture(&data);
    assert_eq!(blocks.len(), 2);
    assert!(blocks.iter().all(|b| b.caplen == 34));

    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&report_file).unwrap()).unwrap();
    assert_eq!(report["records"], 2);
    assert_eq!(report["truncated"], 2);
    assert_eq!(report["counts"]["mac"], 4);
    assert_eq!(report["pseudonyms"]["ipv4"], 2);

    for p in [input, output, report_file] {
        let _ = std::fs::remove_file(p);
    }
}

/// Run on a compressed file (detected from its content, not its name)
fn check_compressed_input(name: &str, compressed: Vec<u8>) {
    let input = tmp_path(name);
    std::fs::write(&input, compressed).unwrap();

    let output = cmd()
        .args(["--key", "k", "--no-truncate", "--ipv4", "leave"])
        .arg(&input)
        .output()
        .unwrap();
    let _ = std::fs::remove_file(&input);
    assert!(output.status.success(), "{name}");
    let (_, blocks) = parse_capture(&output.stdout);
    assert_eq!(blocks.len(), 2, "{name}");
    assert_eq!(blocks[0].data[26..30], IP_A);
    // not truncated
    assert_eq!(blocks[1].data.len(), 34 + b"response".len());
}

#[test]
fn gzip_input() {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&flow()).unwrap();
    check_compressed_input("gz-input", enc.finish().unwrap());
}

#[test]
fn xz_input() {
    let mut enc = XzEncoder::new(Vec::new(), 6);
    enc.write_all(&flow()).unwrap();
    check_compressed_input("xz-input", enc.finish().unwrap());
}

#[test]
fn lz4_input() {
    let mut enc = lz4::EncoderBuilder::new().build(Vec::new()).unwrap();
    enc.write_all(&flow()).unwrap();
    let (data, res) = enc.finish();
    res.unwrap();
    check_compressed_input("lz4-input", data);
}

#[test]
fn config_file() {
    let config = tmp_path("config.toml");
    std::fs::write(
        &config,
        "key = \"from config\"\ntruncate = false\n[anonymize]\nmac_oui = \"leave\"\nmac_nic = \"leave\"\nipv4 = \"leave\"\n",
    )
    .unwrap();
    let input = flow();
    let output = cmd()
        .arg("--config")
        .arg(&config)
        .write_stdin(input.clone())
        .output()
        .unwrap();
    let _ = std::fs::remove_file(&config);
    assert!(output.status.success());
    assert_eq!(output.stdout, input);
}

#[test]
fn invalid_method() {
    cmd()
        .args(["--key", "k", "--ipv4", "scramble"])
        .write_stdin(flow())
        .assert()
        .failure()
        .code(1);
}

#[test]
fn unsupported_link_type() {
    let input = capture(Endianness::Little, Linktype::RAW, &[]);
    cmd()
        .args(["--key", "k"])
        .write_stdin(input)
        .assert()
        .failure()
        .code(1)
        .stdout("");
}
