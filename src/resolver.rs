//! De-anonymization of masked address tokens.
//!
//! CIDDS replaces internal and external hosts with tokens such as `DNS`,
//! `EXT_SERVER` or `13162_92`. The resolver maps each token onto a concrete
//! IPv4 address, always the same one for the same token, so that features
//! derived from addresses are reproducible across runs and workers.
//!
//! Tokens of the form `<prefix>_<suffix>` are resolved by hashing the prefix
//! with SHA-256 into the upper 24 bits and placing the suffix in the low
//! octet. Candidates that are not globally routable are rejected and the
//! prefix is perturbed by appending `0`, up to a configured retry bound.

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use ipnetwork::Ipv4Network;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use tracing::warn;

/// Stateless token resolver. Safe to share between threads.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    placeholders: BTreeMap<String, Ipv4Addr>,
    max_retries: u32,
}

impl Default for AddressResolver {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

impl AddressResolver {
    #[must_use]
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            placeholders: config.placeholders.clone(),
            max_retries: config.max_retries.max(1),
        }
    }

    /// Resolve a raw address column to an IPv4 address.
    ///
    /// # Errors
    /// [`Error::InvalidAddress`] for tokens that are neither placeholders,
    /// anonymized tokens, nor dotted quads; [`Error::AddressResolution`] when
    /// the retry bound is exhausted.
    pub fn resolve(&self, token: &str) -> Result<Ipv4Addr> {
        let token = token.trim();
        if let Some(addr) = self.placeholders.get(token) {
            return Ok(*addr);
        }
        if token.contains('_') {
            return self.resolve_anonymized(token);
        }
        token.parse::<Ipv4Addr>().map_err(|e| Error::InvalidAddress {
            token: token.to_string(),
            reason: e.to_string(),
        })
    }

    fn resolve_anonymized(&self, token: &str) -> Result<Ipv4Addr> {
        let mut parts = token.split('_');
        let (prefix, suffix) = match (parts.next(), parts.next()) {
            (Some(p), Some(s)) if !p.is_empty() => (p, s),
            _ => {
                return Err(Error::InvalidAddress {
                    token: token.to_string(),
                    reason: "empty prefix".to_string(),
                });
            }
        };
        let host: u8 = suffix.parse().map_err(|_| Error::InvalidAddress {
            token: token.to_string(),
            reason: format!("suffix {suffix:?} is not an integer in 0..=255"),
        })?;

        let mut prefix = prefix.to_string();
        for _ in 0..self.max_retries {
            let candidate = Ipv4Addr::from((prefix_hash(&prefix) << 8) | u32::from(host));
            if is_global(candidate) {
                return Ok(candidate);
            }
            prefix.push('0');
        }
        warn!(token, attempts = self.max_retries, "address resolution exhausted retries");
        Err(Error::AddressResolution {
            token: token.to_string(),
            attempts: self.max_retries,
        })
    }
}

/// Stable 24-bit hash of a token prefix.
fn prefix_hash(prefix: &str) -> u32 {
    let digest = Sha256::digest(prefix.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) % (1 << 24)
}

/// Special-purpose blocks excluded from global routing.
const NON_GLOBAL: [(&str, &str); 15] = [
    ("0.0.0.0/8", "this network"),
    ("10.0.0.0/8", "private"),
    ("100.64.0.0/10", "shared address space"),
    ("127.0.0.0/8", "loopback"),
    ("169.254.0.0/16", "link-local"),
    ("172.16.0.0/12", "private"),
    ("192.0.0.0/24", "IETF protocol assignments"),
    ("192.0.2.0/24", "TEST-NET-1"),
    ("192.88.99.0/24", "6to4 relay anycast"),
    ("192.168.0.0/16", "private"),
    ("198.18.0.0/15", "benchmarking"),
    ("198.51.100.0/24", "TEST-NET-2"),
    ("203.0.113.0/24", "TEST-NET-3"),
    ("224.0.0.0/4", "multicast"),
    ("240.0.0.0/4", "reserved, includes broadcast"),
];

static RESERVED: LazyLock<Vec<Ipv4Network>> = LazyLock::new(|| {
    NON_GLOBAL
        .iter()
        .filter_map(|(cidr, _)| cidr.parse::<Ipv4Network>().ok())
        .collect()
});

/// Whether `addr` lies outside every private, reserved, loopback, link-local
/// and multicast block.
#[must_use]
pub fn is_global(addr: Ipv4Addr) -> bool {
    !RESERVED.iter().any(|net| net.contains(addr))
}
