//! Fixtures and assertions for tests of flow pipelines.
//!
//! - [`sample_csv`] / [`sample_records`]: a small hand-written flow file and
//!   the records it parses to.
//! - [`synthetic_csv`]: a larger generated file with anonymized tokens, for
//!   batching and parallelism tests.
//! - [`assert_flows_equal`]: order-sensitive comparison with an index-level
//!   failure message.

use crate::record::{ClassLabel, FlowRecord, Protocol, TcpFlags};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write as _;
use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// The header line of a CIDDS flow file.
pub const HEADER_LINE: &str = "Date first seen,Duration,Proto,Src IP Addr,Src Pt,Dst IP Addr,Dst Pt,Packets,Bytes,Flows,Flags,Tos,class,attackType,attackID,attackDescription";

const SAMPLE_ROWS: [&str; 6] = [
    "2017-03-13 15:45:01.123,0.012,TCP  ,ATTACKER1,48136,EXT_SERVER,80,1,54,1,....S.,0,1,---,---,---",
    "2017-03-13 15:45:02.500,1.25,UDP  ,192.168.220.16,53,DNS,53,2,180,1,......,0,normal,---,---,---",
    "2017-03-13 23:10:00.000,0.0,ICMP ,10.0.0.5,0,8.8.8.8,3.3,1,84,1,......,0,normal,---,---,---",
    "2017-03-14 08:00:00.250,12.5,TCP  ,ATTACKER2,55000,192.168.100.5,22,120,     1.5 M,1,.AP.SF,32,attacker,bruteForce,1,---",
    "2017-03-14 09:30:15.000,3.0,TCP  ,192.168.100.5,22,ATTACKER2,55000,80,9000,1,.AP.S.,0,victim,bruteForce,1,---",
    "2017-03-15 12:00:00.000,0.5,UDP  ,OPENSTACK_NET,123,9.9.9.9,123,4,304,1,......,0,unknown,---,---,---",
];

/// A six-row flow file covering three days, three protocols, placeholder
/// tokens, a scaled ICMP port and a `"<n> M"` byte count.
#[must_use]
pub fn sample_csv() -> String {
    let mut text = String::from(HEADER_LINE);
    for row in SAMPLE_ROWS {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}

/// Write [`sample_csv`] to `dir/name` and return the path.
pub fn write_sample_csv(dir: &Path, name: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, sample_csv())?;
    Ok(path)
}

fn at(day: u32, h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 3, day)
        .and_then(|d| d.and_hms_milli_opt(h, m, s, ms))
        .unwrap_or_default()
}

fn flags(text: &str) -> TcpFlags {
    crate::convert::parse_flags(text)
}

/// The records [`sample_csv`] parses to with the default resolver.
#[must_use]
pub fn sample_records() -> Vec<FlowRecord> {
    let attacker1 = Ipv4Addr::new(230, 170, 204, 100);
    let attacker2 = Ipv4Addr::new(185, 135, 146, 33);
    let base = FlowRecord {
        timestamp: at(13, 15, 45, 1, 123),
        duration: 0.012,
        protocol: Protocol::Tcp,
        source_address: attacker1,
        source_port: 48136,
        destination_address: Ipv4Addr::new(220, 175, 38, 139),
        destination_port: 80,
        packets: 1,
        bytes: 54,
        flow_count: 1,
        flags: flags("....S."),
        type_of_service: 0,
        class_label: ClassLabel::Normal,
        attack_type: None,
        attack_id: None,
        attack_description: None,
    };
    vec![
        base.clone(),
        FlowRecord {
            timestamp: at(13, 15, 45, 2, 500),
            duration: 1.25,
            protocol: Protocol::Udp,
            source_address: Ipv4Addr::new(192, 168, 220, 16),
            source_port: 53,
            destination_address: Ipv4Addr::new(9, 9, 9, 9),
            destination_port: 53,
            packets: 2,
            bytes: 180,
            flags: TcpFlags::default(),
            ..base.clone()
        },
        FlowRecord {
            timestamp: at(13, 23, 10, 0, 0),
            duration: 0.0,
            protocol: Protocol::Icmp,
            source_address: Ipv4Addr::new(10, 0, 0, 5),
            source_port: 0,
            destination_address: Ipv4Addr::new(8, 8, 8, 8),
            destination_port: 33,
            packets: 1,
            bytes: 84,
            flags: TcpFlags::default(),
            ..base.clone()
        },
        FlowRecord {
            timestamp: at(14, 8, 0, 0, 250),
            duration: 12.5,
            source_address: attacker2,
            source_port: 55000,
            destination_address: Ipv4Addr::new(192, 168, 100, 5),
            destination_port: 22,
            packets: 120,
            bytes: 1_500_000,
            flags: flags(".AP.SF"),
            type_of_service: 32,
            class_label: ClassLabel::Attacker,
            attack_type: Some("bruteForce".to_string()),
            attack_id: Some("1".to_string()),
            ..base.clone()
        },
        FlowRecord {
            timestamp: at(14, 9, 30, 15, 0),
            duration: 3.0,
            source_address: Ipv4Addr::new(192, 168, 100, 5),
            source_port: 22,
            destination_address: attacker2,
            destination_port: 55000,
            packets: 80,
            bytes: 9000,
            flags: flags(".AP.S."),
            class_label: ClassLabel::Victim,
            attack_type: Some("bruteForce".to_string()),
            attack_id: Some("1".to_string()),
            ..base.clone()
        },
        FlowRecord {
            timestamp: at(15, 12, 0, 0, 0),
            duration: 0.5,
            protocol: Protocol::Udp,
            source_address: Ipv4Addr::new(174, 138, 74, 74),
            source_port: 123,
            destination_address: Ipv4Addr::new(9, 9, 9, 9),
            destination_port: 123,
            packets: 4,
            bytes: 304,
            flags: TcpFlags::default(),
            class_label: ClassLabel::Unknown,
            ..base
        },
    ]
}

/// A generated flow file of `rows` data rows. Source addresses are
/// anonymized `<prefix>_<host>` tokens, every 10th byte count uses the
/// `"<n> M"` form and every 7th row is ICMP with a scaled port.
#[must_use]
pub fn synthetic_csv(rows: usize) -> String {
    let mut text = String::from(HEADER_LINE);
    text.push('\n');
    for i in 0..rows {
        let minute = (i / 60) % 60;
        let second = i % 60;
        let (proto, dst_port) = if i % 7 == 0 {
            ("ICMP", format!("{}.{}", i % 100, i % 10))
        } else if i % 2 == 0 {
            ("TCP", (i % 1024).to_string())
        } else {
            ("UDP", "53".to_string())
        };
        let bytes = if i % 10 == 0 {
            format!("{}.{} M", i % 5, i % 10)
        } else {
            (40 + i * 3).to_string()
        };
        let _ = writeln!(
            text,
            "2017-03-{:02} {:02}:{minute:02}:{second:02}.{:03},{}.{},{proto},{}_{},{},192.168.{}.{},{dst_port},{},{bytes},1,{},0,normal,---,---,---",
            13 + (i / 3600) % 7,
            (i / 60) % 24,
            i % 1000,
            i % 13,
            i % 1000,
            10_000 + (i % 97),
            i % 256,
            1024 + i % 60_000,
            i % 255,
            i % 254 + 1,
            1 + i % 50,
            if i % 3 == 0 { "....S." } else { ".A...." },
        );
    }
    text
}

/// Assert two record sequences are equal, reporting the first differing index.
///
/// # Panics
/// Panics when lengths or any record differ.
pub fn assert_flows_equal(actual: &[FlowRecord], expected: &[FlowRecord]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "flow count mismatch: expected {}, got {}",
        expected.len(),
        actual.len()
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(a, e, "flow mismatch at index {i}");
    }
}
