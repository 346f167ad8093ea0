use crate::error::{IngestError, Result};
use crate::models::{
    ColumnSummary, JobConfig, JobReport, RenamePlan, ValidationReport, WriteMode, WrittenFile,
};
use crate::processors::{
    ColumnMapper, EncodedPartition, MetadataEnricher, ParallelProcessor, Repartitioner,
};
use crate::readers::{CsvSource, CsvSourceReader};
use crate::storage::StorageLocation;
use crate::utils::constants::SUCCESS_MARKER;
use crate::utils::filename::part_file_name;
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

const STAGES: usize = 7;

/// The Bronze ingestion job: CSV in, renamed and enriched Parquet out
pub struct BronzeJob {
    config: JobConfig,
    source: StorageLocation,
    target: StorageLocation,
    max_workers: usize,
}

impl BronzeJob {
    /// Resolve the configured URIs to object stores
    pub fn from_config(config: JobConfig) -> Result<Self> {
        config.check()?;
        let source = StorageLocation::parse(&config.source.uri)?;
        let target = StorageLocation::parse(&config.target.uri)?;
        Ok(Self::with_locations(config, source, target))
    }

    pub fn with_locations(
        config: JobConfig,
        source: StorageLocation,
        target: StorageLocation,
    ) -> Self {
        Self {
            config,
            source,
            target,
            max_workers: num_cpus::get(),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn target(&self) -> &StorageLocation {
        &self.target
    }

    /// Run the job end to end
    pub async fn run(&self, progress: &ProgressReporter) -> Result<JobReport> {
        let started = Instant::now();
        let ingestion_time = Utc::now();
        let mode = self.config.target.mode;

        info!(
            job = %self.config.job_name,
            source = self.source.uri(),
            target = self.target.uri(),
            mode = %mode,
            "Starting Bronze ingestion"
        );

        progress.stage(1, STAGES, "Preparing target");
        let deleted_objects = match self.prepare_target().await? {
            TargetState::Skip => {
                info!(target = self.target.uri(), "Target already has output, skipping");
                return Ok(self.skipped_report(ingestion_time, started));
            }
            TargetState::Ready { deleted } => deleted,
        };

        progress.stage(2, STAGES, "Reading source");
        let source = self.read_source().await?;
        info!(
            rows = source.num_rows(),
            columns = source.schema.fields().len(),
            "Read source"
        );

        progress.stage(3, STAGES, "Renaming columns");
        let mapper = self.column_mapper();
        let plan = mapper.plan(&source.schema)?;
        let (schema, batches) = mapper.apply(&plan, &source.schema, source.batches)?;

        progress.stage(4, STAGES, "Adding metadata columns");
        let enricher = self.metadata_enricher(ingestion_time);
        let (schema, batches) = enricher.enrich_all(&schema, batches)?;

        progress.stage(5, STAGES, "Repartitioning");
        let partitions = Repartitioner::new(self.config.target.output_partitions)
            .with_input_size(source.input_bytes, self.config.source.max_split_bytes)
            .partition(&schema, batches);

        progress.stage(6, STAGES, "Encoding Parquet");
        let writer = self.parquet_writer()?;
        let encoded = ParallelProcessor::new(self.max_workers).encode_partitions(
            &writer,
            &schema,
            partitions,
            Some(progress),
        )?;

        progress.stage(7, STAGES, "Uploading part files");
        let files = self.upload(encoded, &writer).await?;

        if self.config.target.success_marker {
            self.target.put(SUCCESS_MARKER, Bytes::new()).await?;
        }

        let report = JobReport {
            job_name: self.config.job_name.clone(),
            source_uri: self.source.uri().to_string(),
            target_uri: self.target.uri().to_string(),
            mode,
            ingestion_time,
            skipped: false,
            deleted_objects,
            rows: files.iter().map(|f| f.rows).sum(),
            columns: schema.fields().iter().map(|f| f.name().clone()).collect(),
            renamed_columns: plan.renamed_count(),
            drift: plan.drift,
            files,
            elapsed_ms: started.elapsed().as_millis(),
        };

        info!(
            rows = report.rows,
            files = report.files.len(),
            bytes = report.total_bytes(),
            "Bronze ingestion complete"
        );
        progress.finish_with_message(&format!(
            "Wrote {} rows to {} part files",
            report.rows,
            report.files.len()
        ));

        Ok(report)
    }

    /// Dry run: read the source and plan the rename without touching the target
    pub async fn validate(&self, progress: &ProgressReporter) -> Result<ValidationReport> {
        progress.set_message("Reading source");
        let source = self.read_source().await?;

        progress.set_message("Planning column mapping");
        let plan = self.column_mapper().plan(&source.schema)?;

        progress.finish_with_message("Validation complete");
        Ok(self.validation_report(&source, &plan))
    }

    async fn prepare_target(&self) -> Result<TargetState> {
        match self.config.target.mode {
            WriteMode::Overwrite => {
                let deleted = self.target.delete_prefix().await?;
                if deleted > 0 {
                    info!(deleted, prefix = self.target.uri(), "Removed previous output");
                }
                Ok(TargetState::Ready { deleted })
            }
            WriteMode::Append => Ok(TargetState::Ready { deleted: 0 }),
            WriteMode::ErrorIfExists => {
                let existing = self.target.list_prefix().await?;
                if existing.is_empty() {
                    Ok(TargetState::Ready { deleted: 0 })
                } else {
                    Err(IngestError::TargetExists {
                        uri: self.target.uri().to_string(),
                        objects: existing.len(),
                    })
                }
            }
            WriteMode::Ignore => {
                if self.target.list_prefix().await?.is_empty() {
                    Ok(TargetState::Ready { deleted: 0 })
                } else {
                    Ok(TargetState::Skip)
                }
            }
        }
    }

    async fn read_source(&self) -> Result<CsvSource> {
        let reader = CsvSourceReader::from_config(&self.config.source)?;
        let raw = self.source.read_bytes().await?;
        let data = reader.decode(raw);
        reader.read(&data, self.source.uri())
    }

    async fn upload(
        &self,
        encoded: Vec<EncodedPartition>,
        writer: &ParquetWriter,
    ) -> Result<Vec<WrittenFile>> {
        let write_id = Uuid::new_v4();
        let compression = writer.compression();

        let mut files: Vec<(usize, WrittenFile)> = futures::stream::iter(encoded)
            .map(|partition| {
                let name = part_file_name(partition.index, &write_id, compression);
                async move {
                    let file = WrittenFile {
                        name: name.clone(),
                        rows: partition.rows,
                        bytes: partition.data.len(),
                    };
                    self.target.put(&name, partition.data).await?;
                    Ok::<_, IngestError>((partition.index, file))
                }
            })
            .buffer_unordered(self.max_workers)
            .try_collect()
            .await?;

        files.sort_by_key(|(index, _)| *index);
        Ok(files.into_iter().map(|(_, file)| file).collect())
    }

    fn column_mapper(&self) -> ColumnMapper {
        ColumnMapper::new(self.config.schema.rename.clone()).with_strict(self.config.schema.strict)
    }

    fn metadata_enricher(&self, ingestion_time: DateTime<Utc>) -> MetadataEnricher {
        MetadataEnricher::from_config(&self.config.metadata, ingestion_time, self.source.uri())
    }

    fn parquet_writer(&self) -> Result<ParquetWriter> {
        Ok(ParquetWriter::new()
            .with_compression(&self.config.target.compression)?
            .with_row_group_size(self.config.target.row_group_size)
            .with_legacy_format(self.config.target.legacy_format))
    }

    fn validation_report(&self, source: &CsvSource, plan: &RenamePlan) -> ValidationReport {
        let columns = source
            .schema
            .fields()
            .iter()
            .zip(&plan.columns)
            .map(|(field, column)| ColumnSummary {
                source: column.source.clone(),
                target: column.target.clone(),
                data_type: field.data_type().to_string(),
            })
            .collect();

        let metadata = &self.config.metadata;
        let mut metadata_columns = Vec::new();
        if metadata.ingestion_time {
            metadata_columns.push(metadata.ingestion_time_column.clone());
        }
        if metadata.source_file {
            metadata_columns.push(metadata.source_file_column.clone());
        }
        for name in &metadata_columns {
            if plan.columns.iter().any(|c| &c.target == name) {
                warn!(column = %name, "Metadata column will replace a source column");
            }
        }

        ValidationReport {
            job_name: self.config.job_name.clone(),
            source_uri: self.source.uri().to_string(),
            rows: source.num_rows(),
            columns,
            metadata_columns,
            drift: plan.drift.clone(),
        }
    }

    fn skipped_report(&self, ingestion_time: DateTime<Utc>, started: Instant) -> JobReport {
        JobReport {
            job_name: self.config.job_name.clone(),
            source_uri: self.source.uri().to_string(),
            target_uri: self.target.uri().to_string(),
            mode: self.config.target.mode,
            ingestion_time,
            skipped: true,
            deleted_objects: 0,
            rows: 0,
            columns: Vec::new(),
            renamed_columns: 0,
            drift: Default::default(),
            files: Vec::new(),
            elapsed_ms: started.elapsed().as_millis(),
        }
    }
}

enum TargetState {
    Ready { deleted: usize },
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::ObjectStore;
    use std::sync::Arc;
    use url::Url;

    const CSV: &str = "Loan Number,Region,Interest Rate\n\
                       IBRD00010,EUROPE AND CENTRAL ASIA,4.25\n\
                       IBRD00020,AFRICA,3.5\n\
                       IBRD00030,SOUTH ASIA,\n";

    async fn job_with(config: JobConfig) -> (Arc<InMemory>, BronzeJob) {
        job_with_source(config, CSV).await
    }

    async fn job_with_source(config: JobConfig, csv: &str) -> (Arc<InMemory>, BronzeJob) {
        let store = Arc::new(InMemory::new());
        let dyn_store: Arc<dyn ObjectStore> = store.clone();

        let source = StorageLocation::new(
            dyn_store.clone(),
            Url::parse("memory:///raw/loans.csv").unwrap(),
        )
        .unwrap();
        source.store().put(source.path(), csv.as_bytes().to_vec().into()).await.unwrap();

        let target =
            StorageLocation::new(dyn_store, Url::parse("memory:///parquet/loans/").unwrap())
                .unwrap();

        (store, BronzeJob::with_locations(config, source, target).with_max_workers(2))
    }

    /// Small splits so a few rows still spread over several part files
    fn split_config() -> JobConfig {
        let mut config = JobConfig::default();
        config.source.max_split_bytes = 16;
        config
    }

    #[tokio::test]
    async fn test_run_writes_parts_and_marker() -> Result<()> {
        let (_, job) = job_with(split_config()).await;
        let report = job.run(&ProgressReporter::silent()).await?;

        assert_eq!(report.rows, 3);
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.renamed_columns, 3);
        assert_eq!(
            report.columns,
            vec![
                "LOAN_NUMBER",
                "REGION",
                "INTEREST_RATE",
                "INGESTION_DATE",
                "SOURCE_FILE_NAME"
            ]
        );

        let objects = job.target().list_prefix().await?;
        assert_eq!(objects.len(), 4);
        assert!(objects
            .iter()
            .any(|o| o.location.filename() == Some(SUCCESS_MARKER)));
        Ok(())
    }

    #[tokio::test]
    async fn test_small_source_writes_one_part_file() -> Result<()> {
        let (_, job) = job_with(JobConfig::default()).await;
        let report = job.run(&ProgressReporter::silent()).await?;

        assert_eq!(report.rows, 3);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].rows, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_header_only_source_writes_empty_part() -> Result<()> {
        let header_only = "Loan Number,Region,Interest Rate\n";
        let (_, job) = job_with_source(JobConfig::default(), header_only).await;
        let report = job.run(&ProgressReporter::silent()).await?;

        assert_eq!(report.rows, 0);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].rows, 0);

        let objects = job.target().list_prefix().await?;
        assert_eq!(objects.len(), 2);
        assert!(objects
            .iter()
            .any(|o| o.location.filename() == Some(SUCCESS_MARKER)));

        let part = job
            .target()
            .read_object(&job.target().child(&report.files[0].name))
            .await?;
        let writer = ParquetWriter::new();
        assert_eq!(writer.get_file_info(part.clone())?.total_rows, 0);

        let schema = writer.read_schema(part)?;
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec![
                "LOAN_NUMBER",
                "REGION",
                "INTEREST_RATE",
                "INGESTION_DATE",
                "SOURCE_FILE_NAME"
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_overwrite_replaces_previous_output() -> Result<()> {
        let (_, job) = job_with(split_config()).await;
        job.target()
            .put("stale.parquet", Bytes::from_static(b"old"))
            .await?;

        let first = job.run(&ProgressReporter::silent()).await?;
        assert_eq!(first.deleted_objects, 1);

        let second = job.run(&ProgressReporter::silent()).await?;
        assert_eq!(second.deleted_objects, 4);
        assert_eq!(job.target().list_prefix().await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_error_if_exists_and_ignore_modes() -> Result<()> {
        let mut config = JobConfig::default();
        config.target.mode = WriteMode::ErrorIfExists;
        let (_, job) = job_with(config.clone()).await;
        job.target().put("existing", Bytes::new()).await?;

        let result = job.run(&ProgressReporter::silent()).await;
        assert!(matches!(
            result,
            Err(IngestError::TargetExists { objects: 1, .. })
        ));

        config.target.mode = WriteMode::Ignore;
        let (_, job) = job_with(config).await;
        job.target().put("existing", Bytes::new()).await?;

        let report = job.run(&ProgressReporter::silent()).await?;
        assert!(report.skipped);
        assert_eq!(job.target().list_prefix().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_append_keeps_earlier_parts() -> Result<()> {
        let mut config = JobConfig::default();
        config.target.mode = WriteMode::Append;
        config.target.output_partitions = 1;
        config.target.success_marker = false;
        let (_, job) = job_with(config).await;

        job.run(&ProgressReporter::silent()).await?;
        job.run(&ProgressReporter::silent()).await?;

        assert_eq!(job.target().list_prefix().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_writes_nothing() -> Result<()> {
        let (_, job) = job_with(JobConfig::default()).await;
        let report = job.validate(&ProgressReporter::silent()).await?;

        assert_eq!(report.rows, 3);
        assert_eq!(report.columns[2].target, "INTEREST_RATE");
        assert_eq!(report.columns[2].data_type, "Float64");
        assert_eq!(report.drift.missing_sources.len(), 30);
        assert!(job.target().list_prefix().await?.is_empty());
        Ok(())
    }
}
