//! The 64-byte FATX directory entry and its codec.

use crate::constants::*;
use crate::timestamp;
use fatx_core::{ByteOrder, TimestampEpoch};

/// One parsed directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirent {
    pub name: String,
    /// The raw on-disk name-length/sentinel byte. For a deleted entry this is
    /// `DIRENT_DELETED` (0xE5), which is unrelated to `name.len()` once the
    /// name has been recovered from the padding-terminated name field.
    pub name_length: u8,
    pub attributes: u8,
    pub first_cluster: u32,
    pub file_size: u32,
    pub creation_time_raw: u32,
    pub last_write_time_raw: u32,
    pub last_access_time_raw: u32,
    pub deleted: bool,
}

/// Outcome of parsing one 64-byte slot.
pub enum DirentSlot {
    /// A real entry, live or deleted.
    Entry(Dirent),
    /// This slot, and the rest of the cluster, was never written.
    EndOfStream,
}

impl Dirent {
    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }

    pub fn decode_created(&self, epoch: TimestampEpoch) -> Option<chrono::NaiveDateTime> {
        timestamp::to_naive_datetime(self.creation_time_raw, epoch)
    }

    pub fn decode_last_write(&self, epoch: TimestampEpoch) -> Option<chrono::NaiveDateTime> {
        timestamp::to_naive_datetime(self.last_write_time_raw, epoch)
    }

    pub fn decode_last_access(&self, epoch: TimestampEpoch) -> Option<chrono::NaiveDateTime> {
        timestamp::to_naive_datetime(self.last_access_time_raw, epoch)
    }
}

/// Parse one 64-byte dirent slot.
///
/// Returns `EndOfStream` for either never-used sentinel; the caller must stop
/// reading this cluster's directory stream at that point (but may still
/// continue with the chain's next cluster).
pub fn parse(bytes: &[u8], order: ByteOrder) -> std::io::Result<DirentSlot> {
    debug_assert_eq!(bytes.len(), DIRENT_SIZE);

    let name_length = bytes[0];
    if name_length == DIRENT_NEVER_USED || name_length == DIRENT_NEVER_USED2 {
        return Ok(DirentSlot::EndOfStream);
    }

    let attributes = bytes[1];
    let name_bytes = &bytes[2..44];
    let deleted = name_length == DIRENT_DELETED;

    let name = if deleted {
        let end = name_bytes.iter().position(|&b| b == 0xFF).unwrap_or(name_bytes.len());
        String::from_utf8_lossy(&name_bytes[..end]).into_owned()
    } else {
        let len = (name_length as usize).min(name_bytes.len());
        String::from_utf8_lossy(&name_bytes[..len]).into_owned()
    };

    let read_u32 = |off: usize| -> u32 {
        let b = [bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]];
        match order {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    };

    Ok(DirentSlot::Entry(Dirent {
        name,
        name_length,
        attributes,
        first_cluster: read_u32(44),
        file_size: read_u32(48),
        creation_time_raw: read_u32(52),
        last_write_time_raw: read_u32(56),
        last_access_time_raw: read_u32(60),
        deleted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(name: &[u8], name_length: u8, attrs: u8, first_cluster: u32, file_size: u32) -> Vec<u8> {
        let mut buf = vec![0u8; DIRENT_SIZE];
        buf[0] = name_length;
        buf[1] = attrs;
        let mut padded = vec![0xFFu8; 42];
        padded[..name.len()].copy_from_slice(name);
        buf[2..44].copy_from_slice(&padded);
        buf[44..48].copy_from_slice(&first_cluster.to_le_bytes());
        buf[48..52].copy_from_slice(&file_size.to_le_bytes());
        buf
    }

    #[test]
    fn parses_live_file_entry() {
        let bytes = slot(b"DASH.XBE", 8, 0x00, 100, 0x1234);
        match parse(&bytes, ByteOrder::Little).unwrap() {
            DirentSlot::Entry(d) => {
                assert_eq!(d.name, "DASH.XBE");
                assert!(!d.is_directory());
                assert!(!d.deleted);
                assert_eq!(d.first_cluster, 100);
                assert_eq!(d.file_size, 0x1234);
            }
            DirentSlot::EndOfStream => panic!("expected entry"),
        }
    }

    #[test]
    fn parses_directory_attribute() {
        let bytes = slot(b"TDATA", 5, ATTR_DIRECTORY, 50, 0);
        match parse(&bytes, ByteOrder::Little).unwrap() {
            DirentSlot::Entry(d) => assert!(d.is_directory()),
            DirentSlot::EndOfStream => panic!("expected entry"),
        }
    }

    #[test]
    fn never_used_sentinels_stop_the_stream() {
        let mut never = vec![0u8; DIRENT_SIZE];
        never[0] = DIRENT_NEVER_USED;
        assert!(matches!(
            parse(&never, ByteOrder::Little).unwrap(),
            DirentSlot::EndOfStream
        ));

        let mut never2 = vec![0u8; DIRENT_SIZE];
        never2[0] = DIRENT_NEVER_USED2;
        assert!(matches!(
            parse(&never2, ByteOrder::Little).unwrap(),
            DirentSlot::EndOfStream
        ));
    }

    #[test]
    fn deleted_entry_recovers_name_up_to_first_padding_byte() {
        let bytes = slot(b"HELLO", DIRENT_DELETED, 0x00, 10, 0);
        match parse(&bytes, ByteOrder::Little).unwrap() {
            DirentSlot::Entry(d) => {
                assert!(d.deleted);
                assert_eq!(d.name, "HELLO");
            }
            DirentSlot::EndOfStream => panic!("expected entry"),
        }
    }

    #[test]
    fn deleted_entry_preserves_raw_name_length_byte() {
        let bytes = slot(b"HELLO", DIRENT_DELETED, 0x00, 10, 0);
        match parse(&bytes, ByteOrder::Little).unwrap() {
            DirentSlot::Entry(d) => {
                assert_eq!(d.name_length, DIRENT_DELETED);
                assert_eq!(d.name.len(), 5);
                assert_ne!(d.name_length as usize, d.name.len());
            }
            DirentSlot::EndOfStream => panic!("expected entry"),
        }
    }

    #[test]
    fn big_endian_fields_decode_correctly() {
        let mut buf = vec![0u8; DIRENT_SIZE];
        buf[0] = 4;
        buf[1] = 0;
        buf[2..6].copy_from_slice(b"GAME");
        buf[6..44].fill(0xFF);
        buf[44..48].copy_from_slice(&100u32.to_be_bytes());
        buf[48..52].copy_from_slice(&0x2000u32.to_be_bytes());

        match parse(&buf, ByteOrder::Big).unwrap() {
            DirentSlot::Entry(d) => {
                assert_eq!(d.first_cluster, 100);
                assert_eq!(d.file_size, 0x2000);
            }
            DirentSlot::EndOfStream => panic!("expected entry"),
        }
    }
}
