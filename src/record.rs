//! Typed flow records and the batches they travel in.
//!
//! A [`FlowRecord`] is one row of a CIDDS flow file after every column has been
//! parsed and every anonymized address resolved. Records are grouped into
//! [`Batch`]es, the unit of streaming I/O and parallel conversion.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::net::Ipv4Addr;
use std::ops::Deref;

/// Transport protocol of a flow, kept as the short text code used in the files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Igmp,
    Gre,
    /// Any other code, preserved verbatim.
    Other(String),
}

impl Protocol {
    /// Parse a protocol column. Padding is stripped; matching is case-insensitive.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let code = raw.trim();
        match code.to_ascii_uppercase().as_str() {
            "TCP" => Self::Tcp,
            "UDP" => Self::Udp,
            "ICMP" => Self::Icmp,
            "IGMP" => Self::Igmp,
            "GRE" => Self::Gre,
            _ => Self::Other(code.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Icmp => "ICMP",
            Self::Igmp => "IGMP",
            Self::Gre => "GRE",
            Self::Other(code) => code,
        }
    }

    /// Numeric category code: UDP=1, TCP=2, ICMP=3, anything else 0.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::Udp => 1,
            Self::Tcp => 2,
            Self::Icmp => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traffic class assigned by the dataset's labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassLabel {
    Normal,
    Attacker,
    Victim,
    Suspicious,
    Unknown,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 5] = [
        Self::Normal,
        Self::Attacker,
        Self::Victim,
        Self::Suspicious,
        Self::Unknown,
    ];

    /// Accepts the label name (any case) or its numeric code.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(code) = raw.parse::<u8>() {
            return Self::ALL.into_iter().find(|c| c.code() == code);
        }
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Attacker => "attacker",
            Self::Victim => "victim",
            Self::Suspicious => "suspicious",
            Self::Unknown => "unknown",
        }
    }

    /// Numeric category code, starting at 1 for `normal`.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::Attacker => 2,
            Self::Victim => 3,
            Self::Suspicious => 4,
            Self::Unknown => 5,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TCP flags in the fixed order URG, ACK, PSH, RST, SYN, FIN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TcpFlags(pub [bool; 6]);

impl TcpFlags {
    /// Flag letters by position.
    pub const LETTERS: [char; 6] = ['U', 'A', 'P', 'R', 'S', 'F'];
    /// Character used for an inactive flag.
    pub const PLACEHOLDER: char = '.';

    #[must_use]
    pub fn urg(self) -> bool {
        self.0[0]
    }
    #[must_use]
    pub fn ack(self) -> bool {
        self.0[1]
    }
    #[must_use]
    pub fn psh(self) -> bool {
        self.0[2]
    }
    #[must_use]
    pub fn rst(self) -> bool {
        self.0[3]
    }
    #[must_use]
    pub fn syn(self) -> bool {
        self.0[4]
    }
    #[must_use]
    pub fn fin(self) -> bool {
        self.0[5]
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::convert::render_flags(*self))
    }
}

/// One fully typed flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRecord {
    /// First-seen time, millisecond precision.
    pub timestamp: NaiveDateTime,
    /// Seconds.
    pub duration: f64,
    pub protocol: Protocol,
    pub source_address: Ipv4Addr,
    pub source_port: u16,
    pub destination_address: Ipv4Addr,
    pub destination_port: u16,
    pub packets: u64,
    pub bytes: u64,
    /// Number of flows aggregated into this record.
    pub flow_count: u8,
    pub flags: TcpFlags,
    pub type_of_service: u8,
    pub class_label: ClassLabel,
    pub attack_type: Option<String>,
    pub attack_id: Option<String>,
    pub attack_description: Option<String>,
}

impl FlowRecord {
    /// Calendar day of the first-seen timestamp.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// An ordered group of records read from one contiguous slice of a source.
///
/// `skipped_rows` counts rows of that slice that were dropped as malformed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    records: Vec<FlowRecord>,
    skipped_rows: usize,
}

impl Batch {
    #[must_use]
    pub fn new(records: Vec<FlowRecord>) -> Self {
        Self {
            records,
            skipped_rows: 0,
        }
    }

    pub(crate) fn with_skipped(records: Vec<FlowRecord>, skipped_rows: usize) -> Self {
        Self {
            records,
            skipped_rows,
        }
    }

    /// Rows of the source slice that were dropped as malformed.
    #[must_use]
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    #[must_use]
    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<FlowRecord> {
        self.records
    }

    /// Keep the rows matching `keep`, preserving order.
    #[must_use]
    pub fn retain_rows<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&FlowRecord) -> bool,
    {
        let Self {
            mut records,
            skipped_rows,
        } = self;
        records.retain(|r| keep(r));
        Self {
            records,
            skipped_rows,
        }
    }
}

impl Deref for Batch {
    type Target = [FlowRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl From<Vec<FlowRecord>> for Batch {
    fn from(records: Vec<FlowRecord>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<FlowRecord> for Batch {
    fn from_iter<I: IntoIterator<Item = FlowRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for Batch {
    type Item = FlowRecord;
    type IntoIter = std::vec::IntoIter<FlowRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a FlowRecord;
    type IntoIter = std::slice::Iter<'a, FlowRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_strips_padding() {
        assert_eq!(Protocol::parse("TCP  "), Protocol::Tcp);
        assert_eq!(Protocol::parse(" icmp"), Protocol::Icmp);
        assert_eq!(Protocol::parse("IPv6"), Protocol::Other("IPv6".into()));
        assert_eq!(Protocol::Other("IPv6".into()).to_string(), "IPv6");
    }

    #[test]
    fn protocol_codes() {
        assert_eq!(Protocol::Udp.code(), 1);
        assert_eq!(Protocol::Tcp.code(), 2);
        assert_eq!(Protocol::Icmp.code(), 3);
        assert_eq!(Protocol::Gre.code(), 0);
    }

    #[test]
    fn class_label_by_name_or_code() {
        assert_eq!(ClassLabel::parse("normal"), Some(ClassLabel::Normal));
        assert_eq!(ClassLabel::parse("ATTACKER"), Some(ClassLabel::Attacker));
        assert_eq!(ClassLabel::parse("3"), Some(ClassLabel::Victim));
        assert_eq!(ClassLabel::parse("0"), None);
        assert_eq!(ClassLabel::parse("benign"), None);
        for c in ClassLabel::ALL {
            assert_eq!(ClassLabel::parse(c.as_str()), Some(c));
            assert_eq!(ClassLabel::parse(&c.code().to_string()), Some(c));
        }
    }

    #[test]
    fn flag_accessors_follow_letter_order() {
        let flags = TcpFlags([true, false, true, false, false, true]);
        assert_eq!(
            [flags.urg(), flags.ack(), flags.psh(), flags.rst(), flags.syn(), flags.fin()],
            flags.0
        );
        let rst = TcpFlags([false, false, false, true, false, false]);
        assert!(rst.rst() && !rst.urg() && !rst.fin());
        assert_eq!(rst.to_string(), "...R..");
    }

    #[test]
    fn batch_retain_keeps_order_and_skip_count() {
        let records = crate::testing::sample_records();
        let n = records.len();
        let batch = Batch::with_skipped(records, 2);
        let kept = batch.retain_rows(|r| r.protocol == Protocol::Tcp);
        assert!(kept.len() < n);
        assert_eq!(kept.skipped_rows(), 2);
        assert!(kept.iter().all(|r| r.protocol == Protocol::Tcp));
    }
}
