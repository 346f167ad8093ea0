use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Invalid object path: {0}")]
    ObjectPath(#[from] object_store::path::Error),

    #[error("Invalid URI: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Source object not found: {uri}")]
    SourceNotFound { uri: String },

    #[error("Source {uri} has no header row")]
    EmptySource { uri: String },

    #[error("Column '{column}' appears more than once after renaming")]
    DuplicateColumn { column: String },

    #[error("Schema drift detected: {0}")]
    SchemaDrift(String),

    #[error("Target {uri} already contains {objects} object(s)")]
    TargetExists { uri: String, objects: usize },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
