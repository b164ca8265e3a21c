use super::{
    ColumnLayout, FeatureBatch, FeatureEncoder, FeatureRow, FeatureValue, push_flags,
    push_protocol, push_time,
};
use crate::record::Batch;
use std::sync::Arc;

/// Passes addresses through as text and counters unscaled, for models that
/// learn their own embeddings and normalization.
#[derive(Debug, Clone)]
pub struct EmbeddingEncoder {
    columns: Arc<[String]>,
}

impl Default for EmbeddingEncoder {
    fn default() -> Self {
        Self {
            columns: ColumnLayout::new("duration")
                .one("src_ip_addr")
                .one("src_pt")
                .one("dst_ip_addr")
                .one("dst_pt")
                .one("packets")
                .one("bytes")
                .finish(),
        }
    }
}

impl EmbeddingEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureEncoder for EmbeddingEncoder {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    fn encode(&self, batch: &Batch) -> FeatureBatch {
        let rows = batch
            .iter()
            .map(|r| {
                let mut row = FeatureRow::with_capacity(self.columns.len());
                push_time(&mut row, &r.timestamp);
                row.push(FeatureValue::Float(r.duration));
                push_protocol(&mut row, &r.protocol);
                row.push(FeatureValue::Text(r.source_address.to_string()));
                row.push(FeatureValue::UInt(u64::from(r.source_port)));
                row.push(FeatureValue::Text(r.destination_address.to_string()));
                row.push(FeatureValue::UInt(u64::from(r.destination_port)));
                row.push(FeatureValue::UInt(r.packets));
                row.push(FeatureValue::UInt(r.bytes));
                push_flags(&mut row, r);
                row
            })
            .collect();
        FeatureBatch::new(self.columns(), rows)
    }
}
