use crate::error::{IngestError, Result};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::{WriterProperties, WriterVersion};
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde::Serialize;

/// Parse a compression name as accepted on the command line and in config
pub fn parse_compression(compression: &str) -> Result<Compression> {
    match compression.to_lowercase().as_str() {
        COMPRESSION_SNAPPY => Ok(Compression::SNAPPY),
        COMPRESSION_GZIP => Ok(Compression::GZIP(GzipLevel::default())),
        COMPRESSION_LZ4 => Ok(Compression::LZ4),
        COMPRESSION_ZSTD => Ok(Compression::ZSTD(ZstdLevel::default())),
        COMPRESSION_NONE | "uncompressed" => Ok(Compression::UNCOMPRESSED),
        _ => Err(IngestError::Config(format!(
            "Unsupported compression: {}",
            compression
        ))),
    }
}

/// Encodes Arrow batches into complete in-memory Parquet files
#[derive(Debug, Clone)]
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
    legacy_format: bool,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            legacy_format: false,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = parse_compression(compression)?;
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write Parquet 1.0 files, readable by older warehouse loaders
    pub fn with_legacy_format(mut self, legacy_format: bool) -> Self {
        self.legacy_format = legacy_format;
        self
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    fn properties(&self) -> WriterProperties {
        let version = if self.legacy_format {
            WriterVersion::PARQUET_1_0
        } else {
            WriterVersion::PARQUET_2_0
        };

        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .set_writer_version(version)
            .set_created_by(format!("bronze-ingest version {}", env!("CARGO_PKG_VERSION")))
            .build()
    }

    /// Encode `batches` as one Parquet file. An empty slice still yields a
    /// valid file carrying the schema.
    pub fn encode(&self, schema: SchemaRef, batches: &[RecordBatch]) -> Result<Vec<u8>> {
        let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(self.properties()))?;

        for batch in batches {
            writer.write(batch)?;
        }

        Ok(writer.into_inner()?)
    }

    /// Footer statistics of an encoded Parquet file
    pub fn get_file_info(&self, data: Bytes) -> Result<ParquetFileInfo> {
        let file_size = data.len() as u64;
        let reader = SerializedFileReader::new(data)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let row_group_sizes: Vec<i64> = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        let compression = metadata
            .row_groups()
            .first()
            .and_then(|rg| rg.columns().first())
            .map(|c| c.compression())
            .unwrap_or(Compression::UNCOMPRESSED);

        Ok(ParquetFileInfo {
            total_rows: metadata.file_metadata().num_rows(),
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: format!("{:?}", compression),
            created_by: metadata.file_metadata().created_by().map(str::to_string),
        })
    }

    /// Arrow schema stored in an encoded Parquet file
    pub fn read_schema(&self, data: Bytes) -> Result<SchemaRef> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
        Ok(builder.schema().clone())
    }

    /// Read up to `limit` rows from an encoded Parquet file
    pub fn read_sample(&self, data: Bytes, limit: usize) -> Result<Vec<RecordBatch>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let reader = ParquetRecordBatchReaderBuilder::try_new(data)?
            .with_batch_size(limit.min(8192))
            .with_limit(limit)
            .build()?;

        Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: String,
    pub created_by: Option<String>,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} KB\n\
            - Compression: {}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1024.0,
            self.compression,
            avg_rows
        )
    }
}
