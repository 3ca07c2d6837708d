//! Mounts a FATX partition: header validation, FAT table, cluster chain
//! walking, and the live directory tree.

use crate::constants::*;
use crate::dirent::{self, Dirent, DirentSlot};
use fatx_core::{
    checked_multiply_u64, u64_to_usize, validate_allocation_size, ByteOrder, EntryInfo, Error,
    Partition, ReadSeek, Result, ScanProgress, TimestampEpoch,
};
use fatx_pipeline::EndianRead;
use std::io::{Read, Seek, SeekFrom};
use tracing::warn;

/// Index into `Volume::nodes`, the live directory tree's arena.
pub type NodeId = usize;

/// One node of the live directory tree: a dirent plus the arena links that
/// make up its position in the tree. Using indices instead of owned
/// parent/child pointers avoids an ownership cycle between a directory and
/// its children.
#[derive(Debug, Clone)]
pub struct DirentNode {
    pub dirent: Dirent,
    pub cluster: u32,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

fn round_up(value: u64, align: u64) -> u64 {
    (value + align - 1) / align * align
}

/// A mounted FATX volume.
pub struct Volume {
    pub byte_order: ByteOrder,
    pub epoch: TimestampEpoch,
    pub partition_offset: u64,
    pub partition_length: u64,
    pub sectors_per_cluster: u32,
    pub bytes_per_cluster: u64,
    pub max_clusters: u32,
    pub fat16x: bool,
    pub fat_byte_offset: u64,
    pub file_area_byte_offset: u64,
    fat: Vec<u32>,
    pub nodes: Vec<DirentNode>,
    pub root: NodeId,
}

impl Volume {
    /// Mount the FATX volume occupying `partition` within `image`.
    ///
    /// Verifying the header signature is the one step in this whole engine
    /// allowed to fail the mount outright; everything downstream treats
    /// corruption as something to log and route around.
    pub fn mount(
        image: &mut dyn ReadSeek,
        partition: &Partition,
        byte_order: ByteOrder,
        epoch: TimestampEpoch,
    ) -> Result<Self> {
        image.seek(SeekFrom::Start(partition.offset))?;
        let signature = image.read_u32_val(byte_order)?;
        if signature != FATX_SIGNATURE {
            return Err(Error::invalid_header(format!(
                "expected FATX signature 0x{FATX_SIGNATURE:08X}, found 0x{signature:08X}"
            )));
        }
        let _serial_number = image.read_u32_val(byte_order)?;
        let sectors_per_cluster = image.read_u32_val(byte_order)?;
        let root_dir_first_cluster = image.read_u32_val(byte_order)?;

        let bytes_per_cluster = checked_multiply_u64(
            sectors_per_cluster as u64,
            SECTOR_SIZE,
            "bytes per cluster",
        )?;
        if bytes_per_cluster == 0 {
            return Err(Error::invalid_header("sectors_per_cluster is zero"));
        }

        let max_clusters = (partition.length / bytes_per_cluster + 1) as u32;
        let fat16x = max_clusters < FAT16X_RESERVED;
        let entry_size: u64 = if fat16x { 2 } else { 4 };
        let bytes_per_fat = round_up(
            checked_multiply_u64(max_clusters as u64, entry_size, "FAT table size")?,
            FAT_PAGE_SIZE,
        );
        let fat_byte_offset = RESERVED_BYTES;
        let file_area_byte_offset = fat_byte_offset + bytes_per_fat;

        let fat_size = validate_allocation_size(
            bytes_per_fat,
            fatx_core::MAX_FAT_TABLE_SIZE,
            "FAT table",
        )?;
        image.seek(SeekFrom::Start(partition.offset + fat_byte_offset))?;
        let mut fat_bytes = vec![0u8; fat_size];
        image.read_exact(&mut fat_bytes)?;
        let fat = decode_fat(&fat_bytes, fat16x, byte_order);

        let mut volume = Volume {
            byte_order,
            epoch,
            partition_offset: partition.offset,
            partition_length: partition.length,
            sectors_per_cluster,
            bytes_per_cluster,
            max_clusters,
            fat16x,
            fat_byte_offset,
            file_area_byte_offset,
            fat,
            nodes: Vec::new(),
            root: 0,
        };

        let root_dirent = Dirent {
            name: String::new(),
            name_length: 0,
            attributes: ATTR_DIRECTORY,
            first_cluster: root_dir_first_cluster,
            file_size: 0,
            creation_time_raw: 0,
            last_write_time_raw: 0,
            last_access_time_raw: 0,
            deleted: false,
        };
        let root = volume.push_node(root_dirent, root_dir_first_cluster, None);
        volume.root = root;
        volume.populate_directory(image, root)?;

        Ok(volume)
    }

    fn push_node(&mut self, dirent: Dirent, cluster: u32, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(DirentNode {
            dirent,
            cluster,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        id
    }

    /// Convert a cluster index to its physical byte offset in the image.
    ///
    /// Treats `cluster` as 1-based into the file area, matching the on-disk
    /// convention this volume format actually uses, even though
    /// `max_clusters` is computed as `length / bytes_per_cluster + 1`.
    pub fn cluster_to_physical_offset(&self, cluster: u32) -> u64 {
        self.partition_offset
            + self.file_area_byte_offset
            + self.bytes_per_cluster * (cluster as u64 - 1)
    }

    pub fn is_valid_cluster(&self, cluster: u32) -> bool {
        cluster >= 1 && cluster <= self.max_clusters
    }

    /// Walk the FAT from `first_cluster`, returning the chain of clusters
    /// belonging to one file or directory.
    ///
    /// A FAT entry of 0 (free) or one that indexes past the end of the table
    /// is treated as corruption: rather than trust a partial chain, only the
    /// starting cluster is returned. A reserved end-of-chain marker ends the
    /// walk normally, keeping everything accumulated so far.
    pub fn cluster_chain(&self, first_cluster: u32) -> Vec<u32> {
        let reserved = if self.fat16x {
            FAT16X_RESERVED
        } else {
            FAT32X_RESERVED
        };

        let mut chain = vec![first_cluster];
        let mut cluster = first_cluster;

        loop {
            if chain.len() >= fatx_core::MAX_CLUSTER_CHAIN_LENGTH {
                warn!("cluster chain from {first_cluster} exceeded the length cap, truncating");
                break;
            }
            let Some(&fat_entry) = self.fat.get(cluster as usize) else {
                warn!("cluster chain from {first_cluster}: FAT entry index {cluster} beyond FAT size, discarding chain");
                return vec![first_cluster];
            };
            if fat_entry == 0 {
                warn!("cluster chain from {first_cluster}: found NULL FAT entry, discarding chain");
                return vec![first_cluster];
            }
            if fat_entry >= reserved {
                break;
            }
            chain.push(fat_entry);
            cluster = fat_entry;
        }

        chain
    }

    /// Read and parse one cluster's worth of dirents starting at `offset`,
    /// stopping at the first never-used sentinel.
    fn read_directory_stream(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<Vec<Dirent>> {
        image.seek(SeekFrom::Start(offset))?;
        let mut cluster_bytes = vec![0u8; u64_to_usize(self.bytes_per_cluster, "cluster buffer")?];
        match image.read_exact(&mut cluster_bytes) {
            Ok(()) => {}
            Err(e) => {
                warn!("short read of directory cluster at 0x{offset:X}: {e}");
                return Ok(Vec::new());
            }
        }

        // sectors_per_cluster comes from the untrusted header: a cluster
        // smaller than DIRENTS_PER_CLUSTER_CAP * DIRENT_SIZE must not let the
        // fixed slot count slice past cluster_bytes.
        let slot_count = (cluster_bytes.len() / DIRENT_SIZE).min(DIRENTS_PER_CLUSTER_CAP);
        let mut entries = Vec::new();
        for slot in 0..slot_count {
            let start = slot * DIRENT_SIZE;
            let bytes = &cluster_bytes[start..start + DIRENT_SIZE];
            match dirent::parse(bytes, self.byte_order)? {
                DirentSlot::Entry(d) => entries.push(d),
                DirentSlot::EndOfStream => break,
            }
            if entries.len() >= fatx_core::MAX_DIRECTORY_ENTRIES {
                warn!("directory stream at 0x{offset:X} exceeded the entry cap");
                break;
            }
        }
        Ok(entries)
    }

    /// Recursively expand `parent`'s cluster chain into live dirent nodes.
    /// Deleted directories are never expanded: the cluster chain backing
    /// their dirent stream is not guaranteed to still belong to them.
    fn populate_directory(&mut self, image: &mut dyn ReadSeek, parent: NodeId) -> Result<()> {
        let first_cluster = self.nodes[parent].dirent.first_cluster;
        let chain = self.cluster_chain(first_cluster);

        let mut child_specs = Vec::new();
        for cluster in chain {
            if !self.is_valid_cluster(cluster) {
                continue;
            }
            let offset = self.cluster_to_physical_offset(cluster);
            let entries = self.read_directory_stream(image, offset)?;
            for entry in entries {
                child_specs.push((entry, cluster));
            }
        }

        for (entry, cluster) in child_specs {
            let is_dir = entry.is_directory();
            let deleted = entry.deleted;
            let id = self.push_node(entry, cluster, Some(parent));
            if is_dir && !deleted {
                self.populate_directory(image, id)?;
            }
        }

        Ok(())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &DirentNode {
        &self.nodes[id]
    }

    /// List the live (non-deleted, unless `include_deleted`) children of `dir`
    /// as display-ready entries.
    pub fn list_directory(&self, dir: NodeId, include_deleted: bool) -> Vec<EntryInfo> {
        self.nodes[dir]
            .children
            .iter()
            .filter(|&&c| include_deleted || !self.nodes[c].dirent.deleted)
            .map(|&c| self.entry_info(c))
            .collect()
    }

    pub fn entry_info(&self, id: NodeId) -> EntryInfo {
        let d = &self.nodes[id].dirent;
        let mut info = if d.is_directory() {
            EntryInfo::directory(d.name.clone())
        } else {
            EntryInfo::file(d.name.clone(), d.file_size as u64)
        };
        info = info.with_attributes(d.attributes).with_deleted(d.deleted);
        if let Some(t) = d.decode_created(self.epoch) {
            info = info.with_created(chrono::DateTime::from_naive_utc_and_offset(t, chrono::Utc));
        }
        if let Some(t) = d.decode_last_write(self.epoch) {
            info = info.with_modified(chrono::DateTime::from_naive_utc_and_offset(t, chrono::Utc));
        }
        if let Some(t) = d.decode_last_access(self.epoch) {
            info = info.with_accessed(chrono::DateTime::from_naive_utc_and_offset(t, chrono::Utc));
        }
        info
    }

    /// Navigate a `/`-separated path from the root, live tree only.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let next = self.nodes[current]
                .children
                .iter()
                .find(|&&c| self.nodes[c].dirent.name.eq_ignore_ascii_case(component))?;
            current = *next;
        }
        Some(current)
    }

    /// Read a file's data by following its cluster chain through the FAT
    /// (the "conventional", trust-the-filesystem path).
    pub fn read_file_data(&self, image: &mut dyn ReadSeek, id: NodeId) -> Result<Vec<u8>> {
        let d = &self.nodes[id].dirent;
        if d.is_directory() {
            return Err(Error::invalid_operation("cannot read data of a directory"));
        }
        let file_size = validate_allocation_size(
            d.file_size as u64,
            fatx_core::MAX_FILE_EXTRACT_SIZE,
            "file extract",
        )?;

        let mut out = Vec::with_capacity(file_size);
        let mut remaining = file_size;
        for cluster in self.cluster_chain(d.first_cluster) {
            if remaining == 0 {
                break;
            }
            if !self.is_valid_cluster(cluster) {
                break;
            }
            let offset = self.cluster_to_physical_offset(cluster);
            image.seek(SeekFrom::Start(offset))?;
            let to_read = remaining.min(self.bytes_per_cluster as usize);
            let mut buf = vec![0u8; to_read];
            image.read_exact(&mut buf)?;
            out.extend_from_slice(&buf);
            remaining -= to_read;
        }
        Ok(out)
    }

    pub fn progress_scan<P: ScanProgress>(&self, progress: &P, cluster: u64) -> bool {
        progress.on_progress(cluster);
        progress.is_cancelled()
    }
}

fn decode_fat(bytes: &[u8], fat16x: bool, order: ByteOrder) -> Vec<u32> {
    if fat16x {
        bytes
            .chunks_exact(2)
            .map(|c| {
                let arr = [c[0], c[1]];
                match order {
                    ByteOrder::Little => u16::from_le_bytes(arr) as u32,
                    ByteOrder::Big => u16::from_be_bytes(arr) as u32,
                }
            })
            .collect()
    } else {
        bytes
            .chunks_exact(4)
            .map(|c| {
                let arr = [c[0], c[1], c[2], c[3]];
                match order {
                    ByteOrder::Little => u32::from_le_bytes(arr),
                    ByteOrder::Big => u32::from_be_bytes(arr),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SPC: u32 = 1; // 1 sector/cluster = 512 bytes/cluster, keeps fixtures small

    fn write_dirent(buf: &mut [u8], name: &[u8], name_len: u8, attrs: u8, first_cluster: u32, size: u32) {
        buf[0] = name_len;
        buf[1] = attrs;
        let mut padded = [0xFFu8; 42];
        padded[..name.len()].copy_from_slice(name);
        buf[2..44].copy_from_slice(&padded);
        buf[44..48].copy_from_slice(&first_cluster.to_le_bytes());
        buf[48..52].copy_from_slice(&size.to_le_bytes());
    }

    /// Build a minimal little-endian FATX image: header, FAT with a two-cluster
    /// chain for root (cluster 2 -> cluster 3 -> end), root directory holding
    /// one file dirent in cluster 2.
    fn build_image() -> (Vec<u8>, Partition) {
        let bytes_per_cluster = SPC as u64 * SECTOR_SIZE;
        let max_clusters = 16u32;
        let bytes_per_fat = round_up(max_clusters as u64 * 2, FAT_PAGE_SIZE);
        let file_area_offset = RESERVED_BYTES + bytes_per_fat;
        let total_len = file_area_offset + bytes_per_cluster * 4;

        let mut data = vec![0u8; total_len as usize];
        data[0..4].copy_from_slice(&FATX_SIGNATURE.to_le_bytes());
        data[4..8].copy_from_slice(&0xCAFEBABEu32.to_le_bytes());
        data[8..12].copy_from_slice(&SPC.to_le_bytes());
        data[12..16].copy_from_slice(&2u32.to_le_bytes()); // root starts at cluster 2

        // FAT: cluster 2 -> 3, cluster 3 -> end-of-chain
        let fat_off = RESERVED_BYTES as usize;
        data[fat_off + 2 * 2..fat_off + 2 * 2 + 2].copy_from_slice(&3u16.to_le_bytes());
        data[fat_off + 3 * 2..fat_off + 3 * 2 + 2].copy_from_slice(&0xFFFFu16.to_le_bytes());

        // Root dirent stream in cluster 2: one file "DASH.XBE"
        let cluster2_off = (file_area_offset + bytes_per_cluster * (2 - 1)) as usize;
        write_dirent(
            &mut data[cluster2_off..cluster2_off + DIRENT_SIZE],
            b"DASH.XBE",
            8,
            0,
            10,
            0x100,
        );

        let partition = Partition::new(0, "Partition1", 0, total_len);
        (data, partition)
    }

    #[test]
    fn mounts_and_lists_root() {
        let (data, partition) = build_image();
        let mut image = Cursor::new(data);
        let volume = Volume::mount(&mut image, &partition, ByteOrder::Little, TimestampEpoch::Xbox360).unwrap();

        assert!(volume.fat16x);
        let listing = volume.list_directory(volume.root(), false);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "DASH.XBE");
    }

    #[test]
    fn rejects_bad_signature() {
        let (mut data, partition) = build_image();
        data[0] = 0;
        let mut image = Cursor::new(data);
        assert!(Volume::mount(&mut image, &partition, ByteOrder::Little, TimestampEpoch::Xbox360).is_err());
    }

    #[test]
    fn cluster_chain_follows_fat_to_end_marker() {
        let (data, partition) = build_image();
        let mut image = Cursor::new(data);
        let volume = Volume::mount(&mut image, &partition, ByteOrder::Little, TimestampEpoch::Xbox360).unwrap();
        assert_eq!(volume.cluster_chain(2), vec![2, 3]);
    }

    #[test]
    fn cluster_chain_bails_to_singleton_on_null_entry() {
        let (data, partition) = build_image();
        let mut image = Cursor::new(data);
        let volume = Volume::mount(&mut image, &partition, ByteOrder::Little, TimestampEpoch::Xbox360).unwrap();
        // cluster 5 was never written to the FAT, so its entry is 0
        assert_eq!(volume.cluster_chain(5), vec![5]);
    }

    #[test]
    fn find_by_path_locates_root_file() {
        let (data, partition) = build_image();
        let mut image = Cursor::new(data);
        let volume = Volume::mount(&mut image, &partition, ByteOrder::Little, TimestampEpoch::Xbox360).unwrap();
        let id = volume.find_by_path("DASH.XBE").unwrap();
        assert_eq!(volume.node(id).dirent.name, "DASH.XBE");
    }

    #[test]
    fn cluster_to_physical_offset_is_one_based() {
        let (data, partition) = build_image();
        let mut image = Cursor::new(data);
        let volume = Volume::mount(&mut image, &partition, ByteOrder::Little, TimestampEpoch::Xbox360).unwrap();
        let off1 = volume.cluster_to_physical_offset(1);
        let off2 = volume.cluster_to_physical_offset(2);
        assert_eq!(off2 - off1, volume.bytes_per_cluster);
        assert_eq!(off1, volume.partition_offset + volume.file_area_byte_offset);
    }
}
