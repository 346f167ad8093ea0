pub mod column_mapper;
pub mod metadata_enricher;
pub mod output_inspector;
pub mod parallel_processor;
pub mod pipeline;
pub mod repartitioner;

pub use column_mapper::ColumnMapper;
pub use metadata_enricher::MetadataEnricher;
pub use output_inspector::{OutputInspector, OutputSummary, PartFileInfo};
pub use parallel_processor::{EncodedPartition, ParallelProcessor};
pub use pipeline::BronzeJob;
pub use repartitioner::{Partition, Repartitioner};
