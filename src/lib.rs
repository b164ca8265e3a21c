//! # cidds-flows
//!
//! Loading and feature encoding for **CIDDS-001 / CIDDS-002** NetFlow exports.
//!
//! The crate reads the 16-column flow CSV files of the CIDDS data sets into
//! typed [`FlowRecord`]s, optionally in fixed-size chunks, writes them back in
//! the same layout, and turns batches of records into numeric feature tables
//! for machine-learning models.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cidds_flows::*;
//!
//! # fn main() -> cidds_flows::Result<()> {
//! let reader = FlowReader::open("CIDDS-001/traffic/OpenStack/CIDDS-001-internal-week1.csv")
//!     .with_batch_size(100_000);
//!
//! let day = chrono::NaiveDate::from_ymd_opt(2017, 3, 15).unwrap();
//! let batches = reader.batches().filter_by_day(day);
//!
//! let written = Preprocessor::new(BitEncoder::new(), batches).save("wednesday.bits.csv.gz", false)?;
//! println!("{written} feature rows");
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Addresses
//!
//! CIDDS anonymizes most public addresses. A field may hold a literal IPv4
//! address, a named placeholder such as `EXT_SERVER`, or an anonymized token
//! `<prefix>_<suffix>`. [`AddressResolver`] maps all three to an
//! [`Ipv4Addr`](std::net::Ipv4Addr), deterministically and without shared
//! state, so resolution can run on any number of threads.
//!
//! ### Reading
//!
//! [`FlowReader`] describes a source (one file, a list, or a glob pattern).
//! [`FlowReader::read`] loads it as one [`Batch`]; [`FlowReader::batches`]
//! yields a lazy [`FlowBatches`] iterator. Malformed rows are skipped and
//! counted; conversion errors abort the current batch.
//!
//! ### Encoding
//!
//! Three [`FeatureEncoder`]s share a time, protocol and flag prefix and differ
//! in how they represent addresses, ports, and counters:
//!
//! - [`BitEncoder`]: binary expansion, 178 columns
//! - [`NumericEncoder`]: unit-scaled values, 30 columns
//! - [`EmbeddingEncoder`]: raw values with textual addresses, 24 columns
//!
//! [`Preprocessor`] drives an encoder over a batch sequence lazily or saves the
//! result to disk.
//!
//! ## Feature Flags
//!
//! - `compression-gzip`, `compression-zstd`, `compression-bzip2`,
//!   `compression-xz`: transparent (de)compression selected by file extension
//!   or magic bytes. All enabled by default.
//!
//! ## Module Overview
//!
//! - [`config`] - resolver and reader settings, loadable from JSON
//! - [`convert`] - field-level parsers and renderers
//! - [`error`] - the crate's error type
//! - [`features`] - encoders and the preprocessor
//! - [`filter`] - row selection over batches and batch streams
//! - [`io`] - reading, writing, compression, and path helpers
//! - [`record`] - flow records and batches
//! - [`resolver`] - address resolution

pub mod config;
pub mod convert;
pub mod error;
pub mod features;
pub mod filter;
pub mod io;
pub mod parallel;
pub mod record;
pub mod resolver;
pub mod testing;

pub use config::{Config, ReaderConfig, ResolverConfig};
pub use error::{Error, Result};
pub use features::{
    BitEncoder, EmbeddingEncoder, FeatureBatch, FeatureEncoder, FeatureValue, NumericEncoder,
    Preprocessor,
};
pub use filter::{BatchStreamExt, CalendarDay, filter_by_day, filter_rows};
pub use io::reader::{FlowBatches, FlowReader, ReadStats};
pub use io::writer::FlowWriter;
pub use record::{Batch, ClassLabel, FlowRecord, Protocol, TcpFlags};
pub use resolver::AddressResolver;
