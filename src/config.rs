//! Immutable configuration for resolution and reading.
//!
//! A [`Config`] is built once (defaults, or JSON via `serde_json`) and shared
//! by `Arc` with every reader. Nothing in the crate keeps its own copy of
//! these tables in global state.

use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;

/// Rows at or above which conversion fans out across workers.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 25_000;
/// Retry bound for the anonymized-token resolution loop.
pub const DEFAULT_MAX_RETRIES: u32 = 256;

/// Fixed replacements for the named placeholders used by CIDDS.
#[must_use]
pub fn default_placeholders() -> BTreeMap<String, Ipv4Addr> {
    [
        ("OPENSTACK_NET", Ipv4Addr::new(174, 138, 74, 74)),
        ("DNS", Ipv4Addr::new(9, 9, 9, 9)),
        ("EXT_SERVER", Ipv4Addr::new(220, 175, 38, 139)),
        ("ATTACKER1", Ipv4Addr::new(230, 170, 204, 100)),
        ("ATTACKER2", Ipv4Addr::new(185, 135, 146, 33)),
        ("ATTACKER3", Ipv4Addr::new(201, 95, 169, 48)),
    ]
    .into_iter()
    .map(|(name, addr)| (name.to_string(), addr))
    .collect()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

/// Settings for [`AddressResolver`](crate::resolver::AddressResolver).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// Placeholder name to replacement address.
    #[serde(default = "default_placeholders")]
    pub placeholders: BTreeMap<String, Ipv4Addr>,
    /// Candidate addresses tried per anonymized token before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            placeholders: default_placeholders(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Settings for [`FlowReader`](crate::io::reader::FlowReader).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderConfig {
    /// Rows per batch; `None` reads the whole source as one batch.
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Cap on raw rows read across the whole sequence.
    #[serde(default)]
    pub nrows: Option<usize>,
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    /// Worker partitions for parallel conversion; defaults to the CPU count.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl ReaderConfig {
    /// Effective partition count for parallel conversion.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            nrows: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            workers: None,
        }
    }
}

/// Top-level configuration document.
///
/// ```
/// use cidds_flows::config::Config;
///
/// let cfg = Config::from_json_str(r#"{ "reader": { "batch_size": 1000 } }"#).unwrap();
/// assert_eq!(cfg.reader.batch_size, Some(1000));
/// assert_eq!(cfg.resolver.placeholders.len(), 6);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
