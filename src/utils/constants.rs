/// Default job
pub const DEFAULT_JOB_NAME: &str = "bronze-ibrd-loans";
pub const DEFAULT_SOURCE_URI: &str = "s3://p2.ibrd/raw/synthetic_ibrd_loans.csv";
pub const DEFAULT_TARGET_URI: &str = "s3://p2.ibrd/parquet/synthetic_data/";

/// Metadata column names
pub const INGESTION_DATE_COLUMN: &str = "INGESTION_DATE";
pub const SOURCE_FILE_NAME_COLUMN: &str = "SOURCE_FILE_NAME";
pub const INGESTION_TIMEZONE: &str = "UTC";

/// Output layout
pub const DEFAULT_OUTPUT_PARTITIONS: usize = 10;
pub const SUCCESS_MARKER: &str = "_SUCCESS";
pub const PART_FILE_PREFIX: &str = "part";
pub const PART_FILE_SUFFIX: &str = "c000";

/// Processing defaults
pub const DEFAULT_BATCH_SIZE: usize = 8192;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 128 * 1024;
pub const DEFAULT_MAX_SPLIT_BYTES: usize = 128 * 1024 * 1024;
pub const DEFAULT_DELIMITER: char = ',';
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Configuration
pub const ENV_PREFIX: &str = "BRONZE";
pub const ENV_SEPARATOR: &str = "__";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
