//! Feature encoding of flow batches for model input.
//!
//! Three encoders share the [`FeatureEncoder`] interface and a common column
//! preamble (weekday indicators, time of day, protocol one-hot, TCP flag
//! indicators). They differ in how addresses, ports and counters are
//! represented:
//!
//! | encoder              | addresses          | ports          | packets / bytes | duration  |
//! |----------------------|--------------------|----------------|-----------------|-----------|
//! | [`BitEncoder`]       | 32 bits each       | 16 bits each   | 32 bits each    | min-max   |
//! | [`NumericEncoder`]   | 4 octets / 255     | value / 65535  | min-max         | min-max   |
//! | [`EmbeddingEncoder`] | dotted-quad text   | raw            | raw             | raw       |
//!
//! Min-max normalization is computed over the batch being encoded. A batch in
//! which a normalized column is constant yields `NaN` for that column.
//!
//! Every encoder emits exactly one row per input record, in input order.

mod bits;
mod embedding;
mod numeric;
pub mod preprocess;

pub use bits::BitEncoder;
pub use embedding::EmbeddingEncoder;
pub use numeric::NumericEncoder;
pub use preprocess::Preprocessor;

use crate::record::{Batch, FlowRecord, Protocol};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;
use std::sync::Arc;

const SECONDS_PER_DAY: f64 = 86_400.0;

const WEEKDAY_COLUMNS: [&str; 7] = [
    "isMonday",
    "isTuesday",
    "isWednesday",
    "isThursday",
    "isFriday",
    "isSaturday",
    "isSunday",
];
const PROTOCOL_COLUMNS: [&str; 3] = ["isTCP", "isUDP", "isICMP"];
const FLAG_COLUMNS: [&str; 6] = ["isURG", "isACK", "isPSH", "isRST", "isSYN", "isFIN"];

/// A single cell of a feature table.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Indicators, bits and raw counters.
    UInt(u64),
    Float(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view of the cell; `None` for text.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

pub type FeatureRow = Vec<FeatureValue>;

/// Encoded rows plus the column names they share.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    columns: Arc<[String]>,
    rows: Vec<FeatureRow>,
}

impl FeatureBatch {
    #[must_use]
    pub fn new(columns: Arc<[String]>, rows: Vec<FeatureRow>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<FeatureRow> {
        self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of column `name`, top to bottom.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&FeatureValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Dense numeric matrix, or `None` if any cell is text.
    #[must_use]
    pub fn to_matrix(&self) -> Option<Vec<Vec<f64>>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(FeatureValue::as_f64).collect::<Option<Vec<f64>>>())
            .collect()
    }
}

/// Transforms a batch of typed records into a feature table.
pub trait FeatureEncoder: Send + Sync {
    /// Short identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Column names, in the order cells appear in each row.
    fn columns(&self) -> Arc<[String]>;

    /// Encode `batch`, one row per record.
    fn encode(&self, batch: &Batch) -> FeatureBatch;
}

impl<E: FeatureEncoder + ?Sized> FeatureEncoder for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn columns(&self) -> Arc<[String]> {
        (**self).columns()
    }

    fn encode(&self, batch: &Batch) -> FeatureBatch {
        (**self).encode(batch)
    }
}

fn indexed(prefix: &str, n: usize) -> impl Iterator<Item = String> + '_ {
    (0..n).map(move |i| format!("{prefix}{i}"))
}

/// Builds the shared column layout around encoder-specific middle columns.
struct ColumnLayout(Vec<String>);

impl ColumnLayout {
    fn new(duration: &str) -> Self {
        let mut cols: Vec<String> = WEEKDAY_COLUMNS.iter().map(|c| c.to_string()).collect();
        cols.push("daytime".to_string());
        cols.push(duration.to_string());
        cols.extend(PROTOCOL_COLUMNS.iter().map(|c| c.to_string()));
        Self(cols)
    }

    fn one(mut self, name: &str) -> Self {
        self.0.push(name.to_string());
        self
    }

    fn many(mut self, prefix: &str, n: usize) -> Self {
        self.0.extend(indexed(prefix, n));
        self
    }

    fn finish(mut self) -> Arc<[String]> {
        self.0.extend(FLAG_COLUMNS.iter().map(|c| c.to_string()));
        self.0.into()
    }
}

/// Weekday indicators followed by the fraction of the day elapsed.
fn push_time(row: &mut FeatureRow, ts: &NaiveDateTime) {
    let weekday = ts.weekday().num_days_from_monday();
    row.extend((0..7).map(|d| FeatureValue::from(d == weekday)));
    row.push(FeatureValue::Float(
        f64::from(ts.num_seconds_from_midnight()) / SECONDS_PER_DAY,
    ));
}

fn push_protocol(row: &mut FeatureRow, protocol: &Protocol) {
    row.push((*protocol == Protocol::Tcp).into());
    row.push((*protocol == Protocol::Udp).into());
    row.push((*protocol == Protocol::Icmp).into());
}

fn push_flags(row: &mut FeatureRow, record: &FlowRecord) {
    row.extend(record.flags.0.iter().map(|&f| FeatureValue::from(f)));
}

/// Batch minimum and maximum of a numeric column.
#[derive(Debug, Clone, Copy)]
struct MinMax {
    min: f64,
    max: f64,
}

impl MinMax {
    fn over<I: IntoIterator<Item = f64>>(values: I) -> Self {
        values.into_iter().fold(
            Self {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |acc, v| Self {
                min: acc.min.min(v),
                max: acc.max.max(v),
            },
        )
    }

    fn scale(self, v: f64) -> f64 {
        (v - self.min) / (self.max - self.min)
    }
}
