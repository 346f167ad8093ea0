use crate::error::Result;
use crate::models::MetadataConfig;
use crate::utils::constants::INGESTION_TIMEZONE;
use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use std::sync::Arc;

enum MetadataValue {
    IngestionTime(i64),
    SourceFile(String),
}

struct MetadataColumn {
    name: String,
    value: MetadataValue,
}

impl MetadataColumn {
    fn field(&self) -> Field {
        let data_type = match self.value {
            MetadataValue::IngestionTime(_) => {
                DataType::Timestamp(TimeUnit::Microsecond, Some(INGESTION_TIMEZONE.into()))
            }
            MetadataValue::SourceFile(_) => DataType::Utf8,
        };
        Field::new(&self.name, data_type, false)
    }

    fn array(&self, len: usize) -> ArrayRef {
        match &self.value {
            MetadataValue::IngestionTime(micros) => Arc::new(
                TimestampMicrosecondArray::from_value(*micros, len)
                    .with_timezone(INGESTION_TIMEZONE),
            ),
            MetadataValue::SourceFile(uri) => Arc::new(StringArray::from_iter_values(
                std::iter::repeat(uri.as_str()).take(len),
            )),
        }
    }
}

/// Adds constant lineage columns to every row.
///
/// A metadata column whose name already exists in the input replaces that
/// column in place; otherwise it is appended after the data columns.
pub struct MetadataEnricher {
    columns: Vec<MetadataColumn>,
}

impl MetadataEnricher {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn from_config(
        config: &MetadataConfig,
        ingestion_time: DateTime<Utc>,
        source_uri: &str,
    ) -> Self {
        let mut enricher = Self::new();
        if config.ingestion_time {
            enricher = enricher.with_ingestion_time(&config.ingestion_time_column, ingestion_time);
        }
        if config.source_file {
            enricher = enricher.with_source_file(&config.source_file_column, source_uri);
        }
        enricher
    }

    /// One timestamp for the whole job, captured by the caller at start
    pub fn with_ingestion_time(mut self, column: &str, at: DateTime<Utc>) -> Self {
        self.columns.push(MetadataColumn {
            name: column.to_string(),
            value: MetadataValue::IngestionTime(at.timestamp_micros()),
        });
        self
    }

    pub fn with_source_file(mut self, column: &str, uri: &str) -> Self {
        self.columns.push(MetadataColumn {
            name: column.to_string(),
            value: MetadataValue::SourceFile(uri.to_string()),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn enrich_schema(&self, schema: &Schema) -> SchemaRef {
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();

        for column in &self.columns {
            let field = column.field();
            match fields.iter().position(|f| f.name() == &column.name) {
                Some(index) => fields[index] = field,
                None => fields.push(field),
            }
        }

        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()))
    }

    /// Add metadata columns to one batch; `schema` must come from
    /// [`Self::enrich_schema`] on the batch's own schema.
    pub fn enrich(&self, batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
        let mut names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let mut arrays: Vec<ArrayRef> = batch.columns().to_vec();

        for column in &self.columns {
            let array = column.array(batch.num_rows());
            match names.iter().position(|n| n == &column.name) {
                Some(index) => arrays[index] = array,
                None => {
                    names.push(column.name.clone());
                    arrays.push(array);
                }
            }
        }

        Ok(RecordBatch::try_new(schema.clone(), arrays)?)
    }

    pub fn enrich_all(
        &self,
        schema: &Schema,
        batches: Vec<RecordBatch>,
    ) -> Result<(SchemaRef, Vec<RecordBatch>)> {
        let enriched = self.enrich_schema(schema);
        let batches = batches
            .iter()
            .map(|batch| self.enrich(batch, &enriched))
            .collect::<Result<Vec<_>>>()?;
        Ok((enriched, batches))
    }
}

impl Default for MetadataEnricher {
    fn default() -> Self {
        Self::new()
    }
}
