//! Shared error type, traits, value types, and validation helpers for the
//! fatx forensic toolkit.
//!
//! Nothing in this crate knows about on-disk FATX structures; it exists so
//! `fatx-pipeline`, `fatx-volume`, and `fatx-recovery` share one error type
//! and one set of anti-corruption guards instead of each inventing their own.

pub mod error;
pub mod security;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use security::{
    checked_multiply_u32_to_u64, checked_multiply_u64, sanitize_extracted_filename,
    u64_to_usize, validate_allocation_size, validate_partition_index, MAX_ALLOCATION_SIZE,
    MAX_CLUSTER_CHAIN_LENGTH, MAX_DIRECTORY_ENTRIES, MAX_FAT_TABLE_SIZE, MAX_FILE_EXTRACT_SIZE,
    MAX_MMAP_SIZE, MAX_PARTITION_COUNT,
};
pub use traits::{NullProgress, ReadSeek, ReadWriteSeek, ScanProgress};
pub use types::{format_size, ByteOrder, EntryInfo, Partition, TimestampEpoch};
