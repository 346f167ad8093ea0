pub mod config;
pub mod mapping;
pub mod report;

pub use config::{JobConfig, MetadataConfig, SchemaConfig, SourceConfig, TargetConfig, WriteMode};
pub use mapping::{ColumnMapping, ColumnRename, DriftReport, RenamePlan, RenameTable};
pub use report::{ColumnSummary, JobReport, ValidationReport, WrittenFile};
