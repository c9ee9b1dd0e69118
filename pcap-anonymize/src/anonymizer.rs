//! Address anonymization: per-class methods, keyed keystream and pseudonym maps

use fnv::FnvHashMap;
use libpcap_tools::Error;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Stream identifier (nonce) of the keystream
///
/// Fixed, so that a key reproduces the same keystream across runs and separate
/// captures anonymized with the same settings stay consistent. Do not reuse a
/// key for unrelated captures.
const KEYSTREAM_ID: u64 = 0x645d_6eb3_afb7_b9e4;

/// Anonymization method, selected independently for each address class
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Method {
    /// XOR the field with the next bytes of the keystream
    Encrypt,
    /// Encrypt the first occurrence of a value, then reuse the same alias for every recurrence
    #[default]
    Pseudonym,
    /// Leave the original data untouched
    Leave,
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "encrypt" => Ok(Method::Encrypt),
            "pseudonym" => Ok(Method::Pseudonym),
            "leave" => Ok(Method::Leave),
            _ => Err(Error::Config(format!(
                "unknown anonymization method: {s} (expected encrypt|pseudonym|leave)"
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Method::Encrypt => "encrypt",
            Method::Pseudonym => "pseudonym",
            Method::Leave => "leave",
        };
        f.write_str(s)
    }
}

/// Method selection for every address class
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Methods {
    /// First three bytes of MAC addresses (vendor)
    pub mac_oui: Method,
    /// Last three bytes of MAC addresses (device)
    pub mac_nic: Method,
    pub ipv4: Method,
    pub ipv6: Method,
}

impl Methods {
    /// Use the same method for all classes
    pub fn all(m: Method) -> Self {
        Methods {
            mac_oui: m,
            mac_nic: m,
            ipv4: m,
            ipv6: m,
        }
    }
}

/// Keyed keystream (ChaCha20 in counter mode), consumed byte by byte
///
/// Every keystream byte is handed out exactly once, in order.
pub struct Keystream {
    rng: ChaCha20Rng,
    block: [u8; 64],
    pos: usize,
}

impl Keystream {
    pub fn new(key: [u8; 32]) -> Self {
        let mut rng = ChaCha20Rng::from_seed(key);
        rng.set_stream(KEYSTREAM_ID);
        Keystream {
            rng,
            block: [0; 64],
            pos: 64,
        }
    }

    /// XOR `data` in place with the next `data.len()` keystream bytes
    pub fn apply(&mut self, data: &mut [u8]) {
        for b in data.iter_mut() {
            if self.pos == self.block.len() {
                self.rng.fill_bytes(&mut self.block);
                self.pos = 0;
            }
            *b ^= self.block[self.pos];
            self.pos += 1;
        }
    }
}

/// Append-only map from original to anonymized values, for one address class
#[derive(Default)]
pub(crate) struct PseudonymMap<const N: usize> {
    map: FnvHashMap<[u8; N], [u8; N]>,
}

impl<const N: usize> PseudonymMap<N> {
    /// Number of distinct original values seen
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Transform `field` in place according to `method`
    fn transform(&mut self, method: Method, field: &mut [u8; N], ks: &mut Keystream) {
        match method {
            Method::Leave => (),
            Method::Encrypt => ks.apply(field),
            Method::Pseudonym => {
                if let Some(alias) = self.map.get(field) {
                    *field = *alias;
                } else {
                    let original = *field;
                    ks.apply(field);
                    self.map.insert(original, *field);
                }
            }
        }
    }
}

/// Number of anonymizer calls, per address class
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnonCounts {
    pub mac: u64,
    pub ipv4: u64,
    pub ipv6: u64,
}

/// Number of distinct values in each pseudonym map
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PseudonymCounts {
    pub mac_oui: usize,
    pub mac_nic: usize,
    pub ipv4: usize,
    pub ipv6: usize,
}

/// Anonymizes MAC and IP addresses, in place
pub trait Anonymizer {
    fn mac(&mut self, mac: &mut [u8; 6]);

    fn ipv4(&mut self, addr: &mut [u8; 4]);

    fn ipv6(&mut self, addr: &mut [u8; 16]);
}

/// Anonymizer state for one run
///
/// All classes share the same keystream: the order of calls determines which
/// keystream bytes are used for which field.
pub struct DefaultAnonymizer {
    methods: Methods,
    keystream: Keystream,

    oui_map: PseudonymMap<3>,
    nic_map: PseudonymMap<3>,
    ipv4_map: PseudonymMap<4>,
    ipv6_map: PseudonymMap<16>,

    counts: AnonCounts,
}

impl DefaultAnonymizer {
    pub fn new(methods: Methods, key: [u8; 32]) -> Self {
        DefaultAnonymizer {
            methods,
            keystream: Keystream::new(key),
            oui_map: PseudonymMap::default(),
            nic_map: PseudonymMap::default(),
            ipv4_map: PseudonymMap::default(),
            ipv6_map: PseudonymMap::default(),
            counts: AnonCounts::default(),
        }
    }

    pub fn counts(&self) -> AnonCounts {
        self.counts
    }

    pub fn pseudonyms(&self) -> PseudonymCounts {
        PseudonymCounts {
            mac_oui: self.oui_map.len(),
            mac_nic: self.nic_map.len(),
            ipv4: self.ipv4_map.len(),
            ipv6: self.ipv6_map.len(),
        }
    }
}

impl Anonymizer for DefaultAnonymizer {
    fn mac(&mut self, mac: &mut [u8; 6]) {
        let mut oui = [mac[0], mac[1], mac[2]];
        let mut nic = [mac[3], mac[4], mac[5]];
        self.oui_map
            .transform(self.methods.mac_oui, &mut oui, &mut self.keystream);
        self.nic_map
            .transform(self.methods.mac_nic, &mut nic, &mut self.keystream);
        mac[..3].copy_from_slice(&oui);
        mac[3..].copy_from_slice(&nic);
        self.counts.mac += 1;
    }

    fn ipv4(&mut self, addr: &mut [u8; 4]) {
        self.ipv4_map
            .transform(self.methods.ipv4, addr, &mut self.keystream);
        self.counts.ipv4 += 1;
    }

    fn ipv6(&mut self, addr: &mut [u8; 16]) {
        self.ipv6_map
            .transform(self.methods.ipv6, addr, &mut self.keystream);
        self.counts.ipv6 += 1;
    }
}
