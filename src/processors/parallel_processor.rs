use crate::error::{IngestError, Result};
use crate::processors::Partition;
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use arrow::datatypes::SchemaRef;
use bytes::Bytes;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// A partition encoded as a complete Parquet file, ready for upload
#[derive(Debug, Clone)]
pub struct EncodedPartition {
    pub index: usize,
    pub rows: usize,
    pub data: Bytes,
}

/// Encodes partitions to Parquet on a dedicated rayon pool
pub struct ParallelProcessor {
    max_workers: usize,
}

impl ParallelProcessor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Encode every partition, returned in partition order
    pub fn encode_partitions(
        &self,
        writer: &ParquetWriter,
        schema: &SchemaRef,
        partitions: Vec<Partition>,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<EncodedPartition>> {
        let total = partitions.len();
        let encoded_count = AtomicUsize::new(0);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| IngestError::Config(e.to_string()))?;

        let mut encoded: Vec<EncodedPartition> = pool.install(|| {
            partitions
                .par_iter()
                .map(|partition| {
                    let data = writer.encode(schema.clone(), &partition.batches)?;

                    let count = encoded_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.set_message(&format!("Encoded {}/{} partitions", count, total));
                    }
                    debug!(
                        partition = partition.index,
                        rows = partition.num_rows(),
                        bytes = data.len(),
                        "Encoded partition"
                    );

                    Ok(EncodedPartition {
                        index: partition.index,
                        rows: partition.num_rows(),
                        data: Bytes::from(data),
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        encoded.sort_by_key(|p| p.index);
        Ok(encoded)
    }
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
