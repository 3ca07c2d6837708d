//! Detects whether an image is an Original Xbox or Xbox 360 drive and
//! enumerates its fixed partition layout. Never mounts a volume itself.

use crate::constants::*;
use fatx_core::{ByteOrder, Partition, ReadSeek, Result};
use fatx_pipeline::EndianRead;
use std::io::{Seek, SeekFrom};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveKind {
    OriginalXbox,
    Xbox360Devkit,
    Xbox360Retail,
}

impl DriveKind {
    pub fn byte_order(self) -> ByteOrder {
        match self {
            DriveKind::OriginalXbox => ByteOrder::Little,
            DriveKind::Xbox360Devkit | DriveKind::Xbox360Retail => ByteOrder::Big,
        }
    }
}

pub struct Drive {
    pub kind: DriveKind,
    pub partitions: Vec<Partition>,
}

impl Drive {
    pub fn partition(&self, index: usize) -> Option<&Partition> {
        self.partitions.get(index)
    }
}

/// Probe `image` (of total length `image_length`) and build its partition table.
pub fn probe(image: &mut dyn ReadSeek, image_length: u64) -> Result<Drive> {
    image.seek(SeekFrom::Start(XBOX_SIGNATURE_OFFSET))?;
    if let Ok(word) = image.read_u32_val(ByteOrder::Little) {
        if word == FATX_SIGNATURE {
            debug!("drive probe: Original Xbox signature found at 0x{XBOX_SIGNATURE_OFFSET:X}");
            return Ok(Drive {
                kind: DriveKind::OriginalXbox,
                partitions: original_xbox_partitions(),
            });
        }
    }

    image.seek(SeekFrom::Start(X360_PROBE_OFFSET))?;
    let probe_word = image.read_u32_val(ByteOrder::Big)?;

    if probe_word == X360_DEVKIT_MARKER {
        debug!("drive probe: Xbox 360 devkit layout table found");
        let partitions = read_devkit_partitions(image)?;
        return Ok(Drive {
            kind: DriveKind::Xbox360Devkit,
            partitions,
        });
    }

    debug!("drive probe: falling back to Xbox 360 retail layout");
    Ok(Drive {
        kind: DriveKind::Xbox360Retail,
        partitions: retail_360_partitions(image_length),
    })
}

fn original_xbox_partitions() -> Vec<Partition> {
    const LAYOUT: &[(&str, u64, u64)] = &[
        ("Partition5", 0x80000, 0x2EE00000),
        ("Partition4", 0x2EE80000, 0x2EE00000),
        ("Partition3", 0x5DC80000, 0x2EE00000),
        ("Partition2", 0x8CA80000, 0x1F400000),
        ("Partition1", 0xABE80000, 0x1312D6000),
    ];
    LAYOUT
        .iter()
        .enumerate()
        .map(|(i, (name, offset, length))| Partition::new(i, *name, *offset, *length))
        .collect()
}

fn retail_360_partitions(image_length: u64) -> Vec<Partition> {
    const SYSTEM_OFFSET: u64 = 0x120EB0000;
    const DATA_OFFSET: u64 = 0x130EB0000;
    vec![
        Partition::new(0, "SystemPartition", SYSTEM_OFFSET, 0x10000000),
        Partition::new(1, "Partition1", DATA_OFFSET, image_length.saturating_sub(DATA_OFFSET)),
    ]
}

/// Read the devkit's 12-entry `(offset_sectors, length_sectors)` table and
/// assign it to the fixed roster of named partitions. Pairs 2-6 and 10-11
/// are reserved padding in every devkit image seen; only pairs 0, 1, 7, 8,
/// and 9 carry a partition.
fn read_devkit_partitions(image: &mut dyn ReadSeek) -> Result<Vec<Partition>> {
    image.seek(SeekFrom::Start(8))?;

    let mut pairs = Vec::with_capacity(12);
    for _ in 0..12 {
        let offset_sectors = image.read_u32_val(ByteOrder::Big)?;
        let length_sectors = image.read_u32_val(ByteOrder::Big)?;
        pairs.push((
            offset_sectors as u64 * SECTOR_SIZE,
            length_sectors as u64 * SECTOR_SIZE,
        ));
    }

    // pairs[0] = data, pairs[1] = shell, pairs[2..7] = reserved
    // (skip, DumpPartition "RDMP", PixDump, skip, skip),
    // pairs[7] = AltFlash, pairs[8] = Cache0, pairs[9] = Cache1.
    let (data_offset, data_length) = pairs[0];
    let (shell_offset, shell_length) = pairs[1];
    let (altflash_offset, altflash_length) = pairs[7];
    let (cache0_offset, cache0_length) = pairs[8];
    let (cache1_offset, cache1_length) = pairs[9];

    Ok(vec![
        Partition::new(0, "SystemPartition", shell_offset, shell_length),
        Partition::new(1, "Partition1", data_offset, data_length),
        Partition::new(2, "AltFlash", altflash_offset, altflash_length),
        Partition::new(3, "Cache0", cache0_offset, cache0_length),
        Partition::new(4, "Cache1", cache1_offset, cache1_length),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn xbox_image() -> Vec<u8> {
        let mut data = vec![0u8; (XBOX_SIGNATURE_OFFSET + 4) as usize];
        let sig = FATX_SIGNATURE.to_le_bytes();
        data[XBOX_SIGNATURE_OFFSET as usize..XBOX_SIGNATURE_OFFSET as usize + 4]
            .copy_from_slice(&sig);
        data
    }

    #[test]
    fn detects_original_xbox_layout() {
        let mut cursor = Cursor::new(xbox_image());
        let drive = probe(&mut cursor, cursor.get_ref().len() as u64).unwrap();
        assert_eq!(drive.kind, DriveKind::OriginalXbox);
        assert_eq!(drive.partitions.len(), 5);
        let offsets: Vec<u64> = drive.partitions.iter().map(|p| p.offset).collect();
        assert_eq!(
            offsets,
            vec![0x80000, 0x2EE80000, 0x5DC80000, 0x8CA80000, 0xABE80000]
        );
    }

    #[test]
    fn detects_retail_360_fallback() {
        let data = vec![0u8; 0x200];
        let mut cursor = Cursor::new(data);
        let drive = probe(&mut cursor, 0x200000000).unwrap();
        assert_eq!(drive.kind, DriveKind::Xbox360Retail);
        assert_eq!(drive.partitions[0].offset, 0x120EB0000);
        assert_eq!(drive.partitions[1].offset, 0x130EB0000);
        assert_eq!(drive.partitions[1].length, 0x200000000 - 0x130EB0000);
    }

    #[test]
    fn detects_devkit_layout() {
        let mut data = vec![0u8; 8 + 12 * 8];
        data[0..4].copy_from_slice(&X360_DEVKIT_MARKER.to_be_bytes());
        let mut cursor = Cursor::new(&mut data);
        cursor.seek(SeekFrom::Start(8)).unwrap();
        // pair0 data: offset=2 sectors, length=4 sectors
        cursor.write_all(&2u32.to_be_bytes()).unwrap();
        cursor.write_all(&4u32.to_be_bytes()).unwrap();
        // pair1 shell
        cursor.write_all(&1u32.to_be_bytes()).unwrap();
        cursor.write_all(&1u32.to_be_bytes()).unwrap();
        // pairs 2-6 reserved (zeroed already)
        cursor.seek(SeekFrom::Start(8 + 7 * 8)).unwrap();
        // pair7 altflash
        cursor.write_all(&10u32.to_be_bytes()).unwrap();
        cursor.write_all(&1u32.to_be_bytes()).unwrap();
        // pair8 cache0
        cursor.write_all(&20u32.to_be_bytes()).unwrap();
        cursor.write_all(&1u32.to_be_bytes()).unwrap();
        // pair9 cache1
        cursor.write_all(&30u32.to_be_bytes()).unwrap();
        cursor.write_all(&1u32.to_be_bytes()).unwrap();

        let mut cursor = Cursor::new(data);
        let drive = probe(&mut cursor, 1_000_000).unwrap();
        assert_eq!(drive.kind, DriveKind::Xbox360Devkit);
        assert_eq!(drive.partitions.len(), 5);
        assert_eq!(drive.partitions[1].offset, 2 * SECTOR_SIZE); // Partition1 = data
        assert_eq!(drive.partitions[0].offset, 1 * SECTOR_SIZE); // SystemPartition = shell
    }
}
