#[macro_use]
extern crate log;

mod analyzer;
mod config;
mod context;
mod engine;
mod error;
mod pcap;

pub use analyzer::*;
pub use config::Config;
pub use context::*;
pub use engine::*;
pub use error::*;
pub use pcap::*;
