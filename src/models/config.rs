use crate::error::{IngestError, Result};
use crate::models::RenameTable;
use crate::utils::constants::*;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use validator::Validate;

/// What to do when the target prefix already holds objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Delete everything under the target prefix before writing
    #[default]
    Overwrite,
    /// Keep existing objects and add new part files next to them
    Append,
    /// Fail if the target prefix is not empty
    ErrorIfExists,
    /// Do nothing if the target prefix is not empty
    Ignore,
}

impl FromStr for WriteMode {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "overwrite" => Ok(WriteMode::Overwrite),
            "append" => Ok(WriteMode::Append),
            "error_if_exists" | "error" | "errorifexists" => Ok(WriteMode::ErrorIfExists),
            "ignore" => Ok(WriteMode::Ignore),
            _ => Err(IngestError::Config(format!("Unsupported write mode: {}", s))),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteMode::Overwrite => "overwrite",
            WriteMode::Append => "append",
            WriteMode::ErrorIfExists => "error_if_exists",
            WriteMode::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourceConfig {
    #[validate(length(min = 1))]
    pub uri: String,

    pub has_header: bool,

    #[validate(length(equal = 1))]
    pub delimiter: String,

    pub quote: Option<String>,

    /// Character encoding of the source, any WHATWG label (`utf-8`, `latin1`, ...)
    pub encoding: String,

    /// Records sampled for type inference; `None` reads the whole file
    pub infer_max_records: Option<usize>,

    #[validate(range(min = 1))]
    pub batch_size: usize,

    /// Input bytes per read split; the part file count never exceeds the
    /// number of splits
    #[validate(range(min = 1))]
    pub max_split_bytes: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_SOURCE_URI.to_string(),
            has_header: true,
            delimiter: DEFAULT_DELIMITER.to_string(),
            quote: None,
            encoding: DEFAULT_ENCODING.to_string(),
            infer_max_records: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_split_bytes: DEFAULT_MAX_SPLIT_BYTES,
        }
    }
}

impl SourceConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        single_ascii_byte("delimiter", &self.delimiter)
    }

    pub fn quote_byte(&self) -> Result<Option<u8>> {
        self.quote
            .as_deref()
            .map(|q| single_ascii_byte("quote", q))
            .transpose()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TargetConfig {
    #[validate(length(min = 1))]
    pub uri: String,

    /// Upper bound on the number of part files
    #[validate(range(min = 1))]
    pub output_partitions: usize,

    pub compression: String,

    /// Write Parquet 1.0 files for older readers
    pub legacy_format: bool,

    #[validate(range(min = 1))]
    pub row_group_size: usize,

    pub mode: WriteMode,

    pub success_marker: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_TARGET_URI.to_string(),
            output_partitions: DEFAULT_OUTPUT_PARTITIONS,
            compression: COMPRESSION_SNAPPY.to_string(),
            legacy_format: true,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            mode: WriteMode::Overwrite,
            success_marker: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub rename: RenameTable,

    /// Fail the job instead of warning when the header drifts from the table
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MetadataConfig {
    pub ingestion_time: bool,

    #[validate(length(min = 1))]
    pub ingestion_time_column: String,

    pub source_file: bool,

    #[validate(length(min = 1))]
    pub source_file_column: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            ingestion_time: true,
            ingestion_time_column: INGESTION_DATE_COLUMN.to_string(),
            source_file: true,
            source_file_column: SOURCE_FILE_NAME_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JobConfig {
    #[validate(length(min = 1))]
    pub job_name: String,

    #[validate(nested)]
    pub source: SourceConfig,

    #[validate(nested)]
    pub target: TargetConfig,

    pub schema: SchemaConfig,

    #[validate(nested)]
    pub metadata: MetadataConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            source: SourceConfig::default(),
            target: TargetConfig::default(),
            schema: SchemaConfig::default(),
            metadata: MetadataConfig::default(),
        }
    }
}

impl JobConfig {
    /// Layer built-in defaults, an optional config file and `BRONZE__*`
    /// environment variables, then validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(IngestError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config: JobConfig = builder.build()?.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Field-level validation plus the cross-field rules derive can't express
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        self.source.delimiter_byte()?;
        self.source.quote_byte()?;
        self.schema.rename.validate()?;

        if encoding_rs::Encoding::for_label(self.source.encoding.as_bytes()).is_none() {
            return Err(IngestError::Config(format!(
                "Unknown source encoding: {}",
                self.source.encoding
            )));
        }

        crate::writers::parse_compression(&self.target.compression)?;

        if self.metadata.ingestion_time
            && self.metadata.source_file
            && self.metadata.ingestion_time_column == self.metadata.source_file_column
        {
            return Err(IngestError::Config(format!(
                "Metadata columns share the name '{}'",
                self.metadata.source_file_column
            )));
        }

        Ok(())
    }
}

fn single_ascii_byte(name: &str, value: &str) -> Result<u8> {
    match value.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(IngestError::Config(format!(
            "{} must be a single ASCII character, got '{}'",
            name, value
        ))),
    }
}
