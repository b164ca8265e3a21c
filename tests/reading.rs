//! Integration tests for reading flow files: full and chunked modes, row
//! tolerance, multiple sources, and parallel conversion.

use cidds_flows::testing::{
    HEADER_LINE, assert_flows_equal, sample_csv, sample_records, synthetic_csv, write_sample_csv,
};
use cidds_flows::*;
use std::fs;
use std::io::Cursor;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tempfile::TempDir;

fn from_text(text: String, config: ReaderConfig) -> FlowBatches {
    FlowBatches::from_reader(Cursor::new(text), Arc::new(AddressResolver::default()), config)
}

#[test]
fn test_attacker_row_resolves_placeholders() -> anyhow::Result<()> {
    let text = format!(
        "{HEADER_LINE}\n2017-03-13 15:45:01.123,0.012,TCP,ATTACKER1,48136,EXT_SERVER,80,1,54,1,....S.,0,1,---,---,---\n"
    );
    let batch = from_text(text, ReaderConfig::default())
        .next()
        .expect("one batch")?;
    assert_eq!(batch.len(), 1);

    let flow = &batch[0];
    assert_eq!(flow.source_address, Ipv4Addr::new(230, 170, 204, 100));
    assert_eq!(flow.destination_address, Ipv4Addr::new(220, 175, 38, 139));
    assert_eq!(flow.flags.0, [false, false, false, false, true, false]);
    assert_eq!(flow.class_label, ClassLabel::Normal);
    assert_eq!(flow.attack_type, None);
    Ok(())
}

#[test]
fn test_full_read_matches_fixture() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_sample_csv(dir.path(), "week1.csv")?;

    let batch = FlowReader::open(&path).read()?;
    assert_flows_equal(&batch, &sample_records());
    assert_eq!(batch.skipped_rows(), 0);
    Ok(())
}

#[test]
fn test_reader_is_restartable() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_sample_csv(dir.path(), "week1.csv")?;
    let reader = FlowReader::open(&path).with_batch_size(4);

    let first: Vec<Batch> = reader.batches().collect::<Result<_>>()?;
    let second: Vec<Batch> = reader.batches().collect::<Result<_>>()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_chunked_sizes() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_sample_csv(dir.path(), "week1.csv")?;
    let reader = FlowReader::open(&path);

    let sizes = |n: usize| -> anyhow::Result<Vec<usize>> {
        Ok(reader
            .read_chunks(n)
            .map(|b| b.map(|b| b.len()))
            .collect::<Result<_>>()?)
    };
    assert_eq!(sizes(4)?, vec![4, 2]);
    // An exact multiple ends on the empty pull.
    assert_eq!(sizes(3)?, vec![3, 3]);
    assert_eq!(sizes(1)?, vec![1; 6]);
    assert_eq!(sizes(100)?, vec![6]);
    Ok(())
}

#[test]
fn test_chunks_concatenate_to_full_read() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_sample_csv(dir.path(), "week1.csv")?;
    let reader = FlowReader::open(&path);

    let chunked: Vec<FlowRecord> = reader
        .read_chunks(4)
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();
    assert_flows_equal(&chunked, &reader.read()?);
    Ok(())
}

#[test]
fn test_nrows_caps_both_modes() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_sample_csv(dir.path(), "week1.csv")?;
    let reader = FlowReader::open(&path).with_nrows(4);

    assert_flows_equal(&reader.read()?, &sample_records()[..4]);

    let sizes: Vec<usize> = reader
        .read_chunks(3)
        .map(|b| b.map(|b| b.len()))
        .collect::<Result<_>>()?;
    assert_eq!(sizes, vec![3, 1]);
    Ok(())
}

#[test]
fn test_malformed_rows_are_skipped_and_counted() -> anyhow::Result<()> {
    let mut text = sample_csv();
    text.push_str("not a timestamp,0.1,TCP,DNS,1,DNS,2,1,1,1,......,0,normal,---,---,---\n");
    text.push_str("2017-03-13 15:45:01.123,0.1,TCP\n");
    text.push_str("2017-03-13 15:45:01.123,0.1,TCP,DNS,99999,DNS,2,1,1,1,......,0,normal,---,---,---\n");
    text.push_str("2017-03-13 15:45:01.123,0.1,TCP,DNS,1,DNS,2,1,1,1,......,0,hacker,---,---,---\n");

    let mut batches = from_text(text, ReaderConfig::default());
    let batch = batches.next().expect("one batch")?;
    assert_flows_equal(&batch, &sample_records());
    assert_eq!(batch.skipped_rows(), 4);

    let stats = batches.stats();
    assert_eq!(stats.rows_read, 10);
    assert_eq!(stats.rows_skipped, 4);
    assert_eq!(stats.batches, 1);
    Ok(())
}

#[test]
fn test_unresolvable_address_aborts_the_read() {
    let text = format!(
        "{HEADER_LINE}\n2017-03-13 15:45:01.123,0.1,TCP,DNS,1,_42,2,1,1,1,......,0,normal,---,---,---\n"
    );
    let mut batches = from_text(text, ReaderConfig::default());
    match batches.next() {
        Some(Err(Error::InvalidAddress { token, .. })) => assert_eq!(token, "_42"),
        other => panic!("expected an address error, got {other:?}"),
    }
    assert!(batches.next().is_none());
}

#[test]
fn test_malformed_byte_count_aborts_the_read() {
    let text = format!(
        "{HEADER_LINE}\n2017-03-13 15:45:01.123,0.1,TCP,DNS,1,DNS,2,1,1.5 G,1,......,0,normal,---,---,---\n"
    );
    let err = from_text(text, ReaderConfig::default())
        .next()
        .expect("one item")
        .unwrap_err();
    assert!(matches!(err, Error::MalformedField { field: "bytes", .. }));
    assert!(!err.is_row_scoped());
}

#[test]
fn test_glob_reads_files_in_sorted_order() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let records = sample_records();
    let mut w = FlowWriter::open(dir.path().join("b_week.csv"));
    w.write_batch(&Batch::new(records[3..].to_vec()))?;
    w.close()?;
    let mut w = FlowWriter::open(dir.path().join("a_week.csv"));
    w.write_batch(&Batch::new(records[..3].to_vec()))?;
    w.close()?;
    fs::write(dir.path().join("notes.txt"), "ignored")?;

    let pattern = format!("{}/*.csv", dir.path().display());
    let reader = FlowReader::from_glob(&pattern)?;
    assert_eq!(reader.paths().len(), 2);
    assert_flows_equal(&reader.read()?, &records);

    // Chunks span file boundaries.
    let sizes: Vec<usize> = reader
        .read_chunks(4)
        .map(|b| b.map(|b| b.len()))
        .collect::<Result<_>>()?;
    assert_eq!(sizes, vec![4, 2]);
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = FlowReader::open("/definitely/not/here.csv").read().unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_parallel_conversion_matches_sequential() -> anyhow::Result<()> {
    let text = synthetic_csv(3_000);
    let sequential = ReaderConfig {
        parallel_threshold: usize::MAX,
        ..ReaderConfig::default()
    };
    let parallel = ReaderConfig {
        parallel_threshold: 0,
        workers: Some(7),
        ..ReaderConfig::default()
    };

    let a = from_text(text.clone(), sequential).next().expect("batch")?;
    let b = from_text(text, parallel).next().expect("batch")?;
    assert_eq!(a.len(), 3_000);
    assert_flows_equal(&b, &a);
    Ok(())
}

#[test]
fn test_parallel_chunks_match_sequential_chunks() -> anyhow::Result<()> {
    let text = synthetic_csv(1_000);
    let config = |threshold| ReaderConfig {
        batch_size: Some(128),
        parallel_threshold: threshold,
        workers: Some(3),
        ..ReaderConfig::default()
    };
    let a: Vec<Batch> = from_text(text.clone(), config(usize::MAX)).collect::<Result<_>>()?;
    let b: Vec<Batch> = from_text(text, config(1)).collect::<Result<_>>()?;
    assert_eq!(a.len(), 8);
    assert_eq!(a, b);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn test_compressed_source_detected_by_magic() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let gz = dir.path().join("week1.csv.gz");
    let mut w = FlowWriter::open(&gz);
    w.write_batch(&Batch::new(sample_records()))?;
    w.close()?;

    let disguised = dir.path().join("week1.dat");
    fs::rename(&gz, &disguised)?;
    assert_flows_equal(&FlowReader::open(&disguised).read()?, &sample_records());
    Ok(())
}
