use super::{
    ColumnLayout, FeatureBatch, FeatureEncoder, FeatureRow, FeatureValue, MinMax, push_flags,
    push_protocol, push_time,
};
use crate::record::Batch;
use std::sync::Arc;

/// Expands addresses, ports and counters into individual bits, most
/// significant bit first. Counters above `u32::MAX` saturate.
#[derive(Debug, Clone)]
pub struct BitEncoder {
    columns: Arc<[String]>,
}

impl Default for BitEncoder {
    fn default() -> Self {
        Self {
            columns: ColumnLayout::new("norm_dur")
                .many("src_ip_", 32)
                .many("src_pt_", 16)
                .many("dst_ip_", 32)
                .many("dst_pt_", 16)
                .many("pck_", 32)
                .many("byt_", 32)
                .finish(),
        }
    }
}

impl BitEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn push_bits(row: &mut FeatureRow, value: u32, width: u32) {
    row.extend(
        (0..width)
            .rev()
            .map(|i| FeatureValue::UInt(u64::from((value >> i) & 1))),
    );
}

fn saturate(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

impl FeatureEncoder for BitEncoder {
    fn name(&self) -> &'static str {
        "bits"
    }

    fn columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    fn encode(&self, batch: &Batch) -> FeatureBatch {
        let duration = MinMax::over(batch.iter().map(|r| r.duration));
        let rows = batch
            .iter()
            .map(|r| {
                let mut row = FeatureRow::with_capacity(self.columns.len());
                push_time(&mut row, &r.timestamp);
                row.push(FeatureValue::Float(duration.scale(r.duration)));
                push_protocol(&mut row, &r.protocol);
                push_bits(&mut row, u32::from(r.source_address), 32);
                push_bits(&mut row, u32::from(r.source_port), 16);
                push_bits(&mut row, u32::from(r.destination_address), 32);
                push_bits(&mut row, u32::from(r.destination_port), 16);
                push_bits(&mut row, saturate(r.packets), 32);
                push_bits(&mut row, saturate(r.bytes), 32);
                push_flags(&mut row, r);
                row
            })
            .collect();
        FeatureBatch::new(self.columns(), rows)
    }
}
