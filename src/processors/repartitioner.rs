use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

/// A contiguous run of rows destined for one part file
#[derive(Debug, Clone)]
pub struct Partition {
    pub index: usize,
    pub batches: Vec<RecordBatch>,
}

impl Partition {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

/// Coalesces batches into at most `max_partitions` partitions of
/// near-equal size without reordering rows or copying column data. Like a
/// coalesce after a split read, the count is also capped by the number of
/// input splits.
pub struct Repartitioner {
    max_partitions: usize,
}

impl Repartitioner {
    pub fn new(max_partitions: usize) -> Self {
        Self {
            max_partitions: max_partitions.max(1),
        }
    }

    /// Cap the partition count at `ceil(input_bytes / split_bytes)`
    pub fn with_input_size(mut self, input_bytes: usize, split_bytes: usize) -> Self {
        let splits = input_bytes.div_ceil(split_bytes.max(1)).max(1);
        self.max_partitions = self.max_partitions.min(splits);
        self
    }

    /// Row counts per partition: `min(max_partitions, rows)` entries, the
    /// first `rows % n` of them one row larger. Always at least one entry.
    pub fn partition_sizes(&self, rows: usize) -> Vec<usize> {
        let count = self.max_partitions.min(rows).max(1);
        let base = rows / count;
        let extra = rows % count;

        (0..count)
            .map(|i| if i < extra { base + 1 } else { base })
            .collect()
    }

    pub fn partition(&self, schema: &SchemaRef, batches: Vec<RecordBatch>) -> Vec<Partition> {
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();

        // An empty input still produces one file so readers see the schema
        if rows == 0 {
            return vec![Partition {
                index: 0,
                batches: vec![RecordBatch::new_empty(schema.clone())],
            }];
        }

        let sizes = self.partition_sizes(rows);
        let mut partitions = Vec::with_capacity(sizes.len());
        let mut current = Vec::new();
        let mut remaining = sizes[0];

        for batch in batches {
            let mut offset = 0;
            while offset < batch.num_rows() {
                let take = remaining.min(batch.num_rows() - offset);
                current.push(batch.slice(offset, take));
                offset += take;
                remaining -= take;

                if remaining == 0 {
                    let index = partitions.len();
                    partitions.push(Partition {
                        index,
                        batches: std::mem::take(&mut current),
                    });
                    if let Some(next) = sizes.get(index + 1) {
                        remaining = *next;
                    }
                }
            }
        }

        partitions
    }
}
