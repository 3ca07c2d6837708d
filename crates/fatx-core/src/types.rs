//! Shared value types for the fatx toolkit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte order a drive's on-disk structures are encoded in.
///
/// Original Xbox images are little-endian; Xbox 360 images are big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Reference year a packed timestamp's 7-bit year field is offset from.
///
/// Both platforms use the identical bit layout; only the epoch differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampEpoch {
    /// Original Xbox: year field is years since 2000.
    Xbox,
    /// Xbox 360: year field is years since 1980.
    Xbox360,
}

impl TimestampEpoch {
    pub fn base_year(self) -> i32 {
        match self {
            TimestampEpoch::Xbox => 2000,
            TimestampEpoch::Xbox360 => 1980,
        }
    }
}

/// One partition identified by the drive probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub index: usize,
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

impl Partition {
    pub fn new(index: usize, name: impl Into<String>, offset: u64, length: u64) -> Self {
        Self {
            index,
            name: name.into(),
            offset,
            length,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ 0x{:010X}, {} bytes",
            self.index, self.name, self.offset, self.length
        )
    }
}

/// Directory-listing view of one live or recovered filesystem entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryInfo {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub attributes: u8,
    pub deleted: bool,
}

impl EntryInfo {
    pub fn file(name: String, size: u64) -> Self {
        Self {
            name,
            is_directory: false,
            size,
            created: None,
            modified: None,
            accessed: None,
            attributes: 0,
            deleted: false,
        }
    }

    pub fn directory(name: String) -> Self {
        Self {
            name,
            is_directory: true,
            size: 0,
            created: None,
            modified: None,
            accessed: None,
            attributes: 0x10,
            deleted: false,
        }
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_accessed(mut self, accessed: DateTime<Utc>) -> Self {
        self.accessed = Some(accessed);
        self
    }

    pub fn with_attributes(mut self, attributes: u8) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }
}

impl fmt::Display for EntryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_char = if self.is_directory { "d" } else { "f" };
        let deleted_mark = if self.deleted { "*" } else { " " };
        write!(
            f,
            "{}{} {:>12} {}",
            type_char,
            deleted_mark,
            if self.is_directory {
                "<DIR>".to_string()
            } else {
                format_size(self.size)
            },
            self.name
        )
    }
}

/// Format a byte count in human-readable units.
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_info_file_defaults() {
        let f = EntryInfo::file("DASH.XBE".to_string(), 1024);
        assert_eq!(f.name, "DASH.XBE");
        assert!(!f.is_directory);
        assert_eq!(f.size, 1024);
        assert!(!f.deleted);
    }

    #[test]
    fn entry_info_directory_defaults() {
        let d = EntryInfo::directory("TDATA".to_string());
        assert!(d.is_directory);
        assert_eq!(d.size, 0);
        assert_eq!(d.attributes, 0x10);
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536 * 1024), "1.50 MB");
    }

    #[test]
    fn partition_display() {
        let p = Partition::new(4, "Partition1", 0xABE80000, 0x1312D6000);
        let s = p.to_string();
        assert!(s.contains("Partition1"));
        assert!(s.contains("ABE80000"));
    }

    #[test]
    fn timestamp_epoch_base_year() {
        assert_eq!(TimestampEpoch::Xbox.base_year(), 2000);
        assert_eq!(TimestampEpoch::Xbox360.base_year(), 1980);
    }
}
