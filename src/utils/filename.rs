use crate::utils::constants::{PART_FILE_PREFIX, PART_FILE_SUFFIX};
use parquet::basic::Compression;
use uuid::Uuid;

/// Codec infix used in part file names, e.g. `.snappy` in `part-00000-<id>-c000.snappy.parquet`
pub fn compression_extension(compression: Compression) -> &'static str {
    match compression {
        Compression::SNAPPY => ".snappy",
        Compression::GZIP(_) => ".gz",
        Compression::LZ4 | Compression::LZ4_RAW => ".lz4",
        Compression::ZSTD(_) => ".zstd",
        Compression::BROTLI(_) => ".br",
        _ => "",
    }
}

/// Generate a part file name with format: part-{NNNNN}-{write_id}-c000{codec}.parquet
///
/// All part files of one write share `write_id`, so appended writes never
/// collide with earlier output.
pub fn part_file_name(index: usize, write_id: &Uuid, compression: Compression) -> String {
    format!(
        "{}-{:05}-{}-{}{}.parquet",
        PART_FILE_PREFIX,
        index,
        write_id,
        PART_FILE_SUFFIX,
        compression_extension(compression)
    )
}

/// True for object names produced by [`part_file_name`]
pub fn is_part_file(name: &str) -> bool {
    name.starts_with(PART_FILE_PREFIX) && name.ends_with(".parquet")
}
