//! Driving an encoder over a stream of batches.

use super::{FeatureBatch, FeatureEncoder};
use crate::error::Result;
use crate::io::compression::compressing_writer;
use crate::io::fs::ensure_file;
use crate::record::Batch;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Pairs a batch sequence with an encoder.
///
/// ```no_run
/// use cidds_flows::features::{NumericEncoder, Preprocessor};
/// use cidds_flows::io::reader::FlowReader;
///
/// # fn main() -> cidds_flows::Result<()> {
/// let reader = FlowReader::open("week1.csv").with_batch_size(100_000);
/// let rows = Preprocessor::new(NumericEncoder::new(), reader.batches())
///     .save("week1.numeric.csv.gz", false)?;
/// println!("{rows} feature rows written");
/// # Ok(())
/// # }
/// ```
pub struct Preprocessor<E, I> {
    encoder: E,
    batches: I,
}

impl<E, I> Preprocessor<E, I>
where
    E: FeatureEncoder,
    I: Iterator<Item = Result<Batch>>,
{
    pub fn new<B>(encoder: E, batches: B) -> Self
    where
        B: IntoIterator<IntoIter = I>,
    {
        Self {
            encoder,
            batches: batches.into_iter(),
        }
    }

    /// Lazily encode each batch as it is pulled.
    pub fn get(self) -> impl Iterator<Item = Result<FeatureBatch>> {
        let Self { encoder, batches } = self;
        batches.map(move |batch| {
            let batch = batch?;
            debug!("Encoding {} rows with the {} encoder", batch.len(), encoder.name());
            Ok(encoder.encode(&batch))
        })
    }

    /// Encode every batch into one CSV file at `path`, with a single header of
    /// feature column names. The path is checked with [`ensure_file`] before
    /// any batch is pulled. Returns the number of feature rows written.
    pub fn save(self, path: impl AsRef<Path>, force: bool) -> Result<usize> {
        let path = path.as_ref();
        ensure_file(path, force)?;

        let columns = self.encoder.columns();
        let sink = compressing_writer(File::create(path)?, path)?;
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
        wtr.write_record(columns.iter())?;

        let mut written = 0usize;
        for features in self.get() {
            let features = features?;
            for row in features.rows() {
                wtr.write_record(row.iter().map(ToString::to_string))?;
            }
            written += features.len();
            debug!("Wrote {} feature rows to '{}'", features.len(), path.display());
        }
        wtr.flush()?;
        Ok(written)
    }
}
