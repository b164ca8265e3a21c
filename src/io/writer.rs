//! Writing typed batches back to the CIDDS text format.
//!
//! The destination is created lazily by the first [`FlowWriter::write_batch`]
//! call, which also writes the header; later calls append rows. Addresses are
//! written in dotted-quad form, so anonymized tokens do not survive a round
//! trip; every other field reads back identically.

use crate::convert::{format_timestamp, render_optional};
use crate::error::Result;
use crate::io::compression::compressing_writer;
use crate::io::fs::ensure_file;
use crate::record::{Batch, ClassLabel, FlowRecord, Protocol, TcpFlags};
use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Display names of the 16 columns, in file order.
pub const HEADERS: [&str; 16] = [
    "Date first seen",
    "Duration",
    "Proto",
    "Src IP Addr",
    "Src Pt",
    "Dst IP Addr",
    "Dst Pt",
    "Packets",
    "Bytes",
    "Flows",
    "Flags",
    "Tos",
    "class",
    "attackType",
    "attackID",
    "attackDescription",
];

/// One record in its wire form, serialized positionally.
#[derive(Debug, Serialize)]
pub(crate) struct WireRow<'a> {
    #[serde(serialize_with = "ser_timestamp")]
    timestamp: &'a NaiveDateTime,
    duration: f64,
    #[serde(serialize_with = "ser_display")]
    protocol: &'a Protocol,
    #[serde(serialize_with = "ser_display")]
    source_address: Ipv4Addr,
    source_port: u16,
    #[serde(serialize_with = "ser_display")]
    destination_address: Ipv4Addr,
    destination_port: u16,
    packets: u64,
    bytes: u64,
    flow_count: u8,
    #[serde(serialize_with = "ser_display")]
    flags: TcpFlags,
    type_of_service: u8,
    #[serde(serialize_with = "ser_display")]
    class_label: ClassLabel,
    #[serde(serialize_with = "ser_optional")]
    attack_type: Option<&'a str>,
    #[serde(serialize_with = "ser_optional")]
    attack_id: Option<&'a str>,
    #[serde(serialize_with = "ser_optional")]
    attack_description: Option<&'a str>,
}

impl<'a> From<&'a FlowRecord> for WireRow<'a> {
    fn from(r: &'a FlowRecord) -> Self {
        Self {
            timestamp: &r.timestamp,
            duration: r.duration,
            protocol: &r.protocol,
            source_address: r.source_address,
            source_port: r.source_port,
            destination_address: r.destination_address,
            destination_port: r.destination_port,
            packets: r.packets,
            bytes: r.bytes,
            flow_count: r.flow_count,
            flags: r.flags,
            type_of_service: r.type_of_service,
            class_label: r.class_label,
            attack_type: r.attack_type.as_deref(),
            attack_id: r.attack_id.as_deref(),
            attack_description: r.attack_description.as_deref(),
        }
    }
}

fn ser_timestamp<S: Serializer>(ts: &&NaiveDateTime, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(ts))
}

fn ser_display<T: fmt::Display, S: Serializer>(
    value: &T,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(value)
}

fn ser_optional<S: Serializer>(value: &Option<&str>, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(render_optional(*value))
}

/// Streaming writer owning one destination file from open to close.
pub struct FlowWriter {
    path: PathBuf,
    inner: Option<csv::Writer<Box<dyn Write>>>,
    rows_written: usize,
}

impl FlowWriter {
    /// Prepare a writer for `path`. Nothing touches the filesystem until the
    /// first batch is written.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            inner: None,
            rows_written: 0,
        }
    }

    /// Like [`FlowWriter::open`], but first run [`ensure_file`] so that an
    /// existing destination is reported before any output is produced.
    pub fn create_checked(path: impl AsRef<Path>, force: bool) -> Result<Self> {
        ensure_file(&path, force)?;
        Ok(Self::open(path))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<Box<dyn Write>>> {
        let wtr = match self.inner.take() {
            Some(wtr) => wtr,
            None => {
                debug!("Creating '{}'", self.path.display());
                let file = File::create(&self.path)?;
                let sink = compressing_writer(file, &self.path)?;
                let mut wtr = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(sink);
                wtr.write_record(HEADERS)?;
                wtr
            }
        };
        Ok(self.inner.insert(wtr))
    }

    /// Append every row of `batch`. Returns the number of rows written.
    pub fn write_batch(&mut self, batch: &Batch) -> Result<usize> {
        let path = self.path.display().to_string();
        let wtr = self.writer()?;
        debug!("Write batch of {} rows to '{path}'", batch.len());
        for record in batch {
            wtr.serialize(WireRow::from(record))?;
        }
        self.rows_written += batch.len();
        Ok(batch.len())
    }

    /// Flush and release the destination. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut wtr) = self.inner.take() {
            wtr.flush()?;
            debug!("Closed '{}' after {} rows", self.path.display(), self.rows_written);
        }
        Ok(())
    }
}

impl Drop for FlowWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
