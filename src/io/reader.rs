//! Reading CIDDS flow files into typed [`Batch`]es.
//!
//! Reading happens in two stages:
//!
//! 1. **Schema parse.** Each CSV row is bound positionally to the 16-column
//!    layout. Rows with the wrong column count, invalid UTF-8, or unparseable
//!    scalar columns are skipped, counted, and logged at debug level.
//! 2. **Field conversion.** Protocol, addresses, destination port, bytes and
//!    flags are converted per row. Conversion is pure per row, so batches of at
//!    least [`ReaderConfig::parallel_threshold`] rows are partitioned across
//!    the rayon pool and concatenated back in order. Conversion errors abort
//!    the batch.
//!
//! ```no_run
//! use cidds_flows::io::reader::FlowReader;
//!
//! # fn main() -> cidds_flows::Result<()> {
//! let reader = FlowReader::open("CIDDS-001/traffic/OpenStack/week1.csv").with_batch_size(500_000);
//! for batch in reader.batches() {
//!     let batch = batch?;
//!     println!("{} flows ({} skipped)", batch.len(), batch.skipped_rows());
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::{Config, ReaderConfig};
use crate::convert::{
    parse_byte_count, parse_destination_port, parse_flags, parse_optional, parse_timestamp,
};
use crate::error::{Error, Result};
use crate::io::compression::decompressing_reader;
use crate::parallel::par_map_concat;
use crate::record::{Batch, ClassLabel, FlowRecord, Protocol};
use crate::resolver::AddressResolver;
use chrono::NaiveDateTime;
use csv::StringRecord;
use serde::Deserialize;
use serde::de::{self, Deserializer};
use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of columns in a flow row.
pub const COLUMN_COUNT: usize = 16;

/// Counters for one pass over a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Batches yielded so far.
    pub batches: usize,
    /// Data rows consumed, including skipped ones.
    pub rows_read: usize,
    /// Rows dropped as malformed.
    pub rows_skipped: usize,
}

/// A row after the schema parse, before field conversion. Columns bind by
/// position.
#[derive(Debug, Clone, Deserialize)]
struct RawFlow {
    #[serde(skip)]
    line: u64,
    #[serde(deserialize_with = "de_timestamp")]
    timestamp: NaiveDateTime,
    duration: f64,
    protocol: String,
    source_address: String,
    source_port: u16,
    destination_address: String,
    destination_port: String,
    packets: u64,
    bytes: String,
    flow_count: u8,
    flags: String,
    type_of_service: u8,
    #[serde(deserialize_with = "de_class")]
    class_label: ClassLabel,
    #[serde(deserialize_with = "de_optional")]
    attack_type: Option<String>,
    #[serde(deserialize_with = "de_optional")]
    attack_id: Option<String>,
    #[serde(deserialize_with = "de_optional")]
    attack_description: Option<String>,
}

fn de_timestamp<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<NaiveDateTime, D::Error> {
    let raw = <&str>::deserialize(de)?;
    parse_timestamp(raw).map_err(de::Error::custom)
}

fn de_class<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<ClassLabel, D::Error> {
    let raw = <&str>::deserialize(de)?;
    ClassLabel::parse(raw).ok_or_else(|| de::Error::custom(format!("unknown class label {raw:?}")))
}

fn de_optional<'de, D: Deserializer<'de>>(
    de: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(parse_optional(<&str>::deserialize(de)?))
}

impl RawFlow {
    fn parse(rec: &StringRecord, line: u64) -> Result<Self> {
        if rec.len() != COLUMN_COUNT {
            return Err(Error::row(
                line,
                format!("expected {COLUMN_COUNT} columns, found {}", rec.len()),
            ));
        }
        let mut raw: Self = rec
            .deserialize(None)
            .map_err(|e| Error::row(line, e.to_string()))?;
        if !raw.duration.is_finite() || raw.duration < 0.0 {
            return Err(Error::row(
                line,
                format!("duration: {} is not a valid length", raw.duration),
            ));
        }
        raw.line = line;
        Ok(raw)
    }

    fn convert(&self, resolver: &AddressResolver) -> Result<FlowRecord> {
        Ok(FlowRecord {
            timestamp: self.timestamp,
            duration: self.duration,
            protocol: Protocol::parse(&self.protocol),
            source_address: resolver.resolve(&self.source_address)?,
            source_port: self.source_port,
            destination_address: resolver.resolve(&self.destination_address)?,
            destination_port: parse_destination_port(&self.destination_port)?,
            packets: self.packets,
            bytes: parse_byte_count(&self.bytes)?,
            flow_count: self.flow_count,
            flags: parse_flags(&self.flags),
            type_of_service: self.type_of_service,
            class_label: self.class_label,
            attack_type: self.attack_type.clone(),
            attack_id: self.attack_id.clone(),
            attack_description: self.attack_description.clone(),
        })
    }
}

fn convert_rows(
    rows: &[RawFlow],
    resolver: &AddressResolver,
    config: &ReaderConfig,
) -> Result<Vec<FlowRecord>> {
    let convert_chunk = |chunk: &[RawFlow]| -> Result<Vec<FlowRecord>> {
        chunk
            .iter()
            .map(|raw| {
                raw.convert(resolver)
                    .inspect_err(|e| warn!(line = raw.line, error = %e, "field conversion failed"))
            })
            .collect()
    };
    if rows.len() >= config.parallel_threshold {
        let workers = config.worker_count();
        debug!("Converting {} rows across {workers} partitions", rows.len());
        par_map_concat(rows, workers, convert_chunk)
    } else {
        convert_chunk(rows)
    }
}

fn csv_reader(inner: Box<dyn Read>) -> csv::Reader<Box<dyn Read>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(inner)
}

/// A reusable description of a flow source.
///
/// Every call to [`FlowReader::batches`] or [`FlowReader::read`] reopens the
/// underlying files, so a reader can be iterated more than once.
#[derive(Debug, Clone)]
pub struct FlowReader {
    paths: Vec<PathBuf>,
    resolver: Arc<AddressResolver>,
    config: ReaderConfig,
}

impl FlowReader {
    /// Reader over a single file.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::from_paths([path.as_ref().to_path_buf()])
    }

    /// Reader over several files, consumed in the given order. Each file's
    /// header line is skipped.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            resolver: Arc::new(AddressResolver::default()),
            config: ReaderConfig::default(),
        }
    }

    /// Reader over every file matching `pattern`, in sorted order.
    pub fn from_glob(pattern: &str) -> Result<Self> {
        Ok(Self::from_paths(crate::io::glob::expand_glob(pattern)?))
    }

    /// Apply both resolver and reader settings.
    #[must_use]
    pub fn with_config(self, config: &Config) -> Self {
        self.with_resolver(Arc::new(AddressResolver::new(&config.resolver)))
            .with_reader_config(config.reader.clone())
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<AddressResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_reader_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Chunked mode with `batch_size` rows per batch (clamped to at least 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = Some(batch_size.max(1));
        self
    }

    /// Cap the total number of rows read.
    #[must_use]
    pub fn with_nrows(mut self, nrows: usize) -> Self {
        self.config.nrows = Some(nrows);
        self
    }

    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    #[must_use]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Lazily iterate batches according to the configured batch size. Without
    /// a batch size the whole source arrives as one batch.
    #[must_use]
    pub fn batches(&self) -> FlowBatches {
        FlowBatches {
            pending: self.paths.iter().cloned().collect(),
            current: None,
            resolver: Arc::clone(&self.resolver),
            config: self.config.clone(),
            stats: ReadStats::default(),
            finished: false,
        }
    }

    /// Iterate in chunks of `batch_size` rows regardless of the configured
    /// batch size.
    #[must_use]
    pub fn read_chunks(&self, batch_size: usize) -> FlowBatches {
        self.clone().with_batch_size(batch_size).batches()
    }

    /// Read the whole source (up to `nrows`) into one batch.
    pub fn read(&self) -> Result<Batch> {
        let mut full = self.clone();
        full.config.batch_size = None;
        full.batches().next().unwrap_or_else(|| Ok(Batch::default()))
    }
}

struct OpenSource {
    name: String,
    reader: csv::Reader<Box<dyn Read>>,
}

/// Lazy, finite sequence of batches over one pass of a source.
pub struct FlowBatches {
    pending: VecDeque<PathBuf>,
    current: Option<OpenSource>,
    resolver: Arc<AddressResolver>,
    config: ReaderConfig,
    stats: ReadStats,
    finished: bool,
}

impl FlowBatches {
    /// Batches over an already open stream, e.g. stdin or an in-memory buffer.
    /// The stream's first line is taken as the header.
    pub fn from_reader<R: Read + 'static>(
        reader: R,
        resolver: Arc<AddressResolver>,
        config: ReaderConfig,
    ) -> Self {
        Self {
            pending: VecDeque::new(),
            current: Some(OpenSource {
                name: "<stream>".to_string(),
                reader: csv_reader(Box::new(reader)),
            }),
            resolver,
            config,
            stats: ReadStats::default(),
            finished: false,
        }
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    fn open_next(&mut self) -> Result<bool> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(false);
        };
        debug!("Opening '{}'", path.display());
        let file = File::open(&path)?;
        let inner = decompressing_reader(file, &path)?;
        self.current = Some(OpenSource {
            name: path.display().to_string(),
            reader: csv_reader(inner),
        });
        Ok(true)
    }

    /// Pull up to `limit` raw rows. Returns the parsed rows, the number of raw
    /// rows consumed, and the number skipped.
    fn pull(&mut self, limit: usize) -> Result<(Vec<RawFlow>, usize, usize)> {
        let mut rows = Vec::new();
        let mut consumed = 0usize;
        let mut skipped = 0usize;
        let mut record = StringRecord::new();

        while consumed < limit {
            let Some(source) = self.current.as_mut() else {
                if self.open_next()? {
                    continue;
                }
                break;
            };
            match source.reader.read_record(&mut record) {
                Ok(false) => {
                    self.current = None;
                }
                Ok(true) => {
                    consumed += 1;
                    let line = record.position().map_or(0, csv::Position::line);
                    match RawFlow::parse(&record, line) {
                        Ok(raw) => rows.push(raw),
                        Err(e) => {
                            skipped += 1;
                            debug!("Skipping row in '{}': {e}", source.name);
                        }
                    }
                }
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(e) => {
                    consumed += 1;
                    skipped += 1;
                    debug!("Skipping row in '{}': {e}", source.name);
                }
            }
        }
        Ok((rows, consumed, skipped))
    }

    fn next_batch(&mut self) -> Result<Option<Batch>> {
        let chunked = self.config.batch_size.map(|n| n.max(1));
        let remaining = self
            .config
            .nrows
            .map_or(usize::MAX, |n| n.saturating_sub(self.stats.rows_read));
        let limit = chunked.unwrap_or(usize::MAX).min(remaining);

        if chunked.is_some() && limit == 0 {
            self.finished = true;
            return Ok(None);
        }

        let start = self.stats.rows_read;
        let (rows, consumed, skipped) = self.pull(limit)?;
        self.stats.rows_read += consumed;
        self.stats.rows_skipped += skipped;

        match chunked {
            Some(_) if consumed == 0 => {
                self.finished = true;
                return Ok(None);
            }
            Some(size) if consumed < size => self.finished = true,
            Some(_) => {}
            None => self.finished = true,
        }

        debug!(
            "Read rows {start} through {} ({skipped} skipped)",
            start + consumed
        );
        let records = convert_rows(&rows, &self.resolver, &self.config)?;
        self.stats.batches += 1;
        Ok(Some(Batch::with_skipped(records, skipped)))
    }
}

impl Iterator for FlowBatches {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_batch() {
            Ok(batch) => batch.map(Ok),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for FlowBatches {}
