//! Validation limits and arithmetic helpers guarding against malicious or
//! corrupted disk images.

use crate::Error;

/// Maximum single allocation for a FAT table or directory cluster buffer (256 MB).
pub const MAX_ALLOCATION_SIZE: u64 = 256 * 1024 * 1024;

/// Maximum FAT table size accepted before mount is refused (100 MB).
pub const MAX_FAT_TABLE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum number of dirents read from one directory stream.
pub const MAX_DIRECTORY_ENTRIES: usize = 10_000;

/// Maximum file size the recovery writer will extract in one file (1 GB).
pub const MAX_FILE_EXTRACT_SIZE: u64 = 1024 * 1024 * 1024;

/// Upper bound on cluster chain length, so a cyclic or malicious FAT cannot
/// make the volume engine loop forever.
pub const MAX_CLUSTER_CHAIN_LENGTH: usize = 1_000_000;

/// Largest image this toolkit will memory-map directly (16 GB).
pub const MAX_MMAP_SIZE: u64 = 16 * 1024 * 1024 * 1024;

/// Maximum partitions a drive probe will ever emit.
pub const MAX_PARTITION_COUNT: usize = 16;

/// Validate that a size fits within `limit` and the platform `usize`.
pub fn validate_allocation_size(size: u64, limit: u64, context: &str) -> crate::Result<usize> {
    if size > limit {
        return Err(Error::invalid_header(format!(
            "{context} size {size} exceeds limit {limit}"
        )));
    }
    size.try_into()
        .map_err(|_| Error::invalid_header(format!("{context} size exceeds platform limits")))
}

/// Multiply two `u64`s, failing instead of wrapping on overflow.
pub fn checked_multiply_u64(a: u64, b: u64, context: &str) -> crate::Result<u64> {
    a.checked_mul(b)
        .ok_or_else(|| Error::invalid_header(format!("{context}: multiplication overflow")))
}

/// Multiply two `u32`s into a `u64`, failing instead of wrapping on overflow.
pub fn checked_multiply_u32_to_u64(a: u32, b: u32, context: &str) -> crate::Result<u64> {
    (a as u64)
        .checked_mul(b as u64)
        .ok_or_else(|| Error::invalid_header(format!("{context}: multiplication overflow")))
}

/// Convert a `u64` to `usize`, failing on 32-bit platforms instead of truncating.
pub fn u64_to_usize(value: u64, context: &str) -> crate::Result<usize> {
    value
        .try_into()
        .map_err(|_| Error::invalid_header(format!("{context}: value {value} exceeds usize")))
}

/// Strip characters from a recovered filename that would be unsafe to use as
/// a host path component.
pub fn sanitize_extracted_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|&c| c != '/' && c != '\\')
        .filter(|&c| !c.is_control())
        .take(255)
        .collect::<String>()
        .trim_start_matches(|c| c == '.' || c == ' ')
        .trim_end_matches(|c| c == '.' || c == ' ')
        .to_string()
}

/// Validate a partition index against the number of partitions actually probed.
pub fn validate_partition_index(index: usize, max: usize) -> crate::Result<()> {
    if index >= max {
        return Err(Error::not_found(format!(
            "partition index {index} out of range (0-{})",
            max.saturating_sub(1)
        )));
    }
    Ok(())
}
