//! Integration tests for feature encoding and day filtering over files.

use cidds_flows::testing::{sample_records, synthetic_csv, write_sample_csv};
use cidds_flows::*;
use chrono::NaiveDate;
use std::fs;
use tempfile::TempDir;

fn encoders() -> Vec<Box<dyn FeatureEncoder>> {
    vec![
        Box::new(BitEncoder::new()),
        Box::new(NumericEncoder::new()),
        Box::new(EmbeddingEncoder::new()),
    ]
}

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 3, 14).expect("valid date")
}

#[test]
fn test_encoders_preserve_row_count() {
    let batch = Batch::new(sample_records());
    for encoder in encoders() {
        let features = encoder.encode(&batch);
        assert_eq!(features.len(), batch.len(), "{}", encoder.name());
        assert!(features.rows().iter().all(|r| r.len() == features.columns().len()));
    }
}

#[test]
fn test_column_counts() {
    let widths: Vec<usize> = encoders().iter().map(|e| e.columns().len()).collect();
    assert_eq!(widths, vec![178, 30, 24]);
}

#[test]
fn test_shared_prefix_and_suffix() {
    for encoder in encoders() {
        let cols = encoder.columns();
        assert_eq!(cols[0], "isMonday");
        assert_eq!(cols[7], "daytime");
        assert_eq!(&cols[9..12], ["isTCP", "isUDP", "isICMP"]);
        assert_eq!(cols[cols.len() - 1], "isFIN");
    }
}

#[test]
fn test_weekday_and_protocol_indicators() {
    let records = sample_records();
    let features = BitEncoder::new().encode(&Batch::new(records.clone()));
    let monday = features.column("isMonday").expect("column");
    let tuesday = features.column("isTuesday").expect("column");
    let icmp = features.column("isICMP").expect("column");
    for (i, r) in records.iter().enumerate() {
        let day = r.day();
        assert_eq!(*monday[i], FeatureValue::from(day.format("%a").to_string() == "Mon"));
        assert_eq!(*tuesday[i], FeatureValue::from(day.format("%a").to_string() == "Tue"));
        assert_eq!(*icmp[i], FeatureValue::from(r.protocol == Protocol::Icmp));
    }
}

#[test]
fn test_daytime_uses_whole_seconds() {
    let features = EmbeddingEncoder::new().encode(&Batch::new(sample_records()[..1].to_vec()));
    let daytime = features.column("daytime").expect("column");
    // 15:45:01.123 truncates to 56701 seconds.
    assert_eq!(*daytime[0], FeatureValue::Float(56_701.0 / 86_400.0));
}

#[test]
fn test_filtered_day_through_preprocessor() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_sample_csv(dir.path(), "week1.csv")?;
    let reader = FlowReader::open(&path).with_batch_size(2);

    let features: Vec<FeatureBatch> =
        Preprocessor::new(NumericEncoder::new(), reader.batches().filter_by_day(tuesday()))
            .get()
            .collect::<Result<_>>()?;
    assert_eq!(features.len(), 3);
    let rows: usize = features.iter().map(FeatureBatch::len).sum();
    assert_eq!(rows, 2);
    for batch in &features {
        for row in batch.rows() {
            assert_eq!(row[1], FeatureValue::UInt(1));
        }
    }
    Ok(())
}

#[test]
fn test_filter_never_leaks_other_days() -> anyhow::Result<()> {
    let text = synthetic_csv(5_000);
    let day = NaiveDate::from_ymd_opt(2017, 3, 14).expect("valid date");
    let batches = FlowBatches::from_reader(
        std::io::Cursor::new(text),
        std::sync::Arc::new(AddressResolver::default()),
        ReaderConfig {
            batch_size: Some(700),
            ..ReaderConfig::default()
        },
    );
    let mut kept = 0;
    for batch in batches.filter_by_day(day) {
        let batch = batch?;
        assert!(batch.iter().all(|r| r.day() == day));
        kept += batch.len();
    }
    assert_eq!(kept, 1_400);
    Ok(())
}

#[test]
fn test_save_writes_all_batches() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let source = write_sample_csv(dir.path(), "week1.csv")?;
    let out = dir.path().join("features").join("week1.bits.csv");

    let batches = FlowReader::open(&source).read_chunks(4);
    let written = Preprocessor::new(BitEncoder::new(), batches).save(&out, false)?;
    assert_eq!(written, sample_records().len());

    let mut rdr = csv::Reader::from_path(&out)?;
    assert_eq!(rdr.headers()?.len(), 178);
    let rows: Vec<csv::StringRecord> = rdr.records().collect::<std::result::Result<_, _>>()?;
    assert_eq!(rows.len(), written);
    // First record is a SYN: the last six columns are the flags.
    let flags: Vec<&str> = rows[0].iter().skip(172).collect();
    assert_eq!(flags, vec!["0", "0", "0", "0", "1", "0"]);
    Ok(())
}

#[test]
fn test_save_refuses_to_overwrite() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("features.csv");
    fs::write(&out, "keep")?;
    let batches = vec![Ok(Batch::new(sample_records()))];
    let err = Preprocessor::new(EmbeddingEncoder::new(), batches)
        .save(&out, false)
        .unwrap_err();
    assert!(matches!(err, Error::DestinationExists(_)));

    let batches = vec![Ok(Batch::new(sample_records()))];
    let written = Preprocessor::new(EmbeddingEncoder::new(), batches).save(&out, true)?;
    assert_eq!(written, 6);
    Ok(())
}
