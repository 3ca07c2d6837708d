//! On-disk constants for the FATX volume header, allocation table, and
//! directory entry format.

/// Magic value stored at the start of a volume header ("FATX" as little-endian
/// ASCII bytes, read as a 32-bit integer in the volume's own byte order).
pub const FATX_SIGNATURE: u32 = 0x5854_4146;

/// Sector size is fixed regardless of platform.
pub const SECTOR_SIZE: u64 = 512;

/// The FAT table's on-disk size is rounded up to a multiple of this.
pub const FAT_PAGE_SIZE: u64 = 4096;

/// Fixed size of the reserved area preceding the FAT table.
pub const RESERVED_BYTES: u64 = 0x1000;

/// One directory entry is this many bytes on disk.
pub const DIRENT_SIZE: usize = 0x40;

/// Up to this many dirents are packed per cluster before the directory
/// stream must continue into the next cluster in the chain.
pub const DIRENTS_PER_CLUSTER_CAP: usize = 256;

/// `name_length` sentinel marking an entry, and everything after it in the
/// same cluster, as never having been used.
pub const DIRENT_NEVER_USED: u8 = 0x00;

/// Alternate never-used sentinel seen in some tools' freshly-formatted images.
pub const DIRENT_NEVER_USED2: u8 = 0xFF;

/// `name_length` value marking an entry as deleted. The true length is lost;
/// the name is recovered up to the first 0xFF padding byte instead.
pub const DIRENT_DELETED: u8 = 0xE5;

/// Longest name a dirent can hold.
pub const MAX_NAME_LENGTH: u8 = 0x2A;

pub const ATTR_READONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;

/// Mask of all attribute bits FATX actually defines; anything else is
/// evidence of a corrupt or spoofed dirent.
pub const VALID_ATTRIBUTES_MASK: u8 = 0x37;

/// FAT entries at or above this value mean "this is the last cluster in the
/// chain" for a 16-bit-entry FAT.
pub const FAT16X_RESERVED: u32 = 0xFFF0;

/// Same, for a 32-bit-entry FAT.
pub const FAT32X_RESERVED: u32 = 0xFFFF_FFF0;

/// Byte offset of the little-endian Original Xbox signature probe.
pub const XBOX_SIGNATURE_OFFSET: u64 = 0xABE80000;

/// Byte offset of the big-endian Xbox 360 devkit-vs-retail probe word.
pub const X360_PROBE_OFFSET: u64 = 0;

/// Value of the probe word that indicates a devkit image layout table follows.
pub const X360_DEVKIT_MARKER: u32 = 0x0002_0000;
