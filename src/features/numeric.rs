use super::{
    ColumnLayout, FeatureBatch, FeatureEncoder, FeatureRow, FeatureValue, MinMax, push_flags,
    push_protocol, push_time,
};
use crate::record::Batch;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Scales every column into `[0, 1]`: address octets by 255, ports by 65535,
/// and duration, packets and bytes by the batch's min-max range.
#[derive(Debug, Clone)]
pub struct NumericEncoder {
    columns: Arc<[String]>,
}

impl Default for NumericEncoder {
    fn default() -> Self {
        Self {
            columns: ColumnLayout::new("norm_dur")
                .many("src_ip_", 4)
                .one("src_pt")
                .many("dst_ip_", 4)
                .one("dst_pt")
                .one("norm_pck")
                .one("norm_byt")
                .finish(),
        }
    }
}

impl NumericEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn push_octets(row: &mut FeatureRow, addr: Ipv4Addr) {
    row.extend(
        addr.octets()
            .iter()
            .map(|&o| FeatureValue::Float(f64::from(o) / 255.0)),
    );
}

fn port(p: u16) -> FeatureValue {
    FeatureValue::Float(f64::from(p) / f64::from(u16::MAX))
}

impl FeatureEncoder for NumericEncoder {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    fn encode(&self, batch: &Batch) -> FeatureBatch {
        let duration = MinMax::over(batch.iter().map(|r| r.duration));
        let packets = MinMax::over(batch.iter().map(|r| r.packets as f64));
        let bytes = MinMax::over(batch.iter().map(|r| r.bytes as f64));
        let rows = batch
            .iter()
            .map(|r| {
                let mut row = FeatureRow::with_capacity(self.columns.len());
                push_time(&mut row, &r.timestamp);
                row.push(FeatureValue::Float(duration.scale(r.duration)));
                push_protocol(&mut row, &r.protocol);
                push_octets(&mut row, r.source_address);
                row.push(port(r.source_port));
                push_octets(&mut row, r.destination_address);
                row.push(port(r.destination_port));
                row.push(FeatureValue::Float(packets.scale(r.packets as f64)));
                row.push(FeatureValue::Float(bytes.scale(r.bytes as f64)));
                push_flags(&mut row, r);
                row
            })
            .collect();
        FeatureBatch::new(self.columns(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_records;

    #[test]
    fn layout_width() {
        assert_eq!(NumericEncoder::new().columns().len(), 30);
    }

    #[test]
    fn values_are_unit_scaled() {
        let batch = NumericEncoder::new().encode(&Batch::new(sample_records()));
        let matrix = batch.to_matrix().unwrap();
        for row in &matrix {
            for v in row {
                assert!((0.0..=1.0).contains(v), "{v}");
            }
        }
        let bytes = batch.column("norm_byt").unwrap();
        assert!(bytes.contains(&&FeatureValue::Float(0.0)));
        assert!(bytes.contains(&&FeatureValue::Float(1.0)));
    }

    #[test]
    fn octets_and_ports() {
        let mut records = sample_records();
        records[0].destination_address = Ipv4Addr::new(255, 0, 51, 102);
        records[0].destination_port = u16::MAX;
        let batch = NumericEncoder::new().encode(&Batch::new(records));
        let start = batch.column_index("dst_ip_0").unwrap();
        let row = &batch.rows()[0];
        assert_eq!(row[start], FeatureValue::Float(1.0));
        assert_eq!(row[start + 1], FeatureValue::Float(0.0));
        assert_eq!(row[start + 2], FeatureValue::Float(0.2));
        assert_eq!(row[start + 3], FeatureValue::Float(0.4));
        assert_eq!(row[start + 4], FeatureValue::Float(1.0));
    }

    #[test]
    fn constant_column_is_nan() {
        let mut records = sample_records();
        for r in &mut records {
            r.packets = 7;
        }
        let batch = NumericEncoder::new().encode(&Batch::new(records));
        assert!(
            batch
                .column("norm_pck")
                .unwrap()
                .iter()
                .all(|v| v.as_f64().unwrap().is_nan())
        );
    }
}
