//! Materialises dirents and carved signatures onto the host filesystem.

use crate::orphan::{OrphanForest, OrphanNode};
use crate::signatures::CarveResult;
use fatx_core::{Error, ReadSeek, Result};
use fatx_volume::{NodeId, Volume};
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryOptions {
    /// When false, deleted live entries are skipped rather than written.
    pub undelete: bool,
}

fn set_times(path: &Path, modified: Option<chrono::NaiveDateTime>, accessed: Option<chrono::NaiveDateTime>) {
    let to_filetime = |t: chrono::NaiveDateTime| filetime::FileTime::from_unix_time(t.and_utc().timestamp(), 0);
    let mtime = modified.map(to_filetime).unwrap_or_else(filetime::FileTime::now);
    let atime = accessed.map(to_filetime).unwrap_or(mtime);
    if let Err(e) = filetime::set_file_times(path, atime, mtime) {
        warn!("failed to set timestamps on {}: {e}", path.display());
    }
}

/// Conventional recovery: walk the live directory tree, trusting the FAT for
/// every cluster chain.
pub fn recover_live(
    image: &mut dyn ReadSeek,
    volume: &Volume,
    dir: NodeId,
    output_root: &Path,
    options: RecoveryOptions,
) -> Result<()> {
    fs::create_dir_all(output_root)?;

    for &child in &volume.node(dir).children {
        let node = volume.node(child);
        if node.dirent.deleted && !options.undelete {
            continue;
        }
        let child_path = output_root.join(&node.dirent.name);

        if node.dirent.is_directory() {
            fs::create_dir_all(&child_path)?;
            recover_live(image, volume, child, &child_path, options)?;
        } else {
            write_live_file(image, volume, child, &child_path)?;
        }

        set_times(
            &child_path,
            node.dirent.decode_last_write(volume.epoch),
            node.dirent.decode_last_access(volume.epoch),
        );
    }

    Ok(())
}

fn write_live_file(image: &mut dyn ReadSeek, volume: &Volume, id: NodeId, path: &Path) -> Result<()> {
    let data = volume.read_file_data(image, id)?;
    let mut out = fs::File::create(path)?;
    out.write_all(&data)?;
    Ok(())
}

/// Unconventional recovery: for orphan files, read exactly `file_size` bytes
/// sequentially from the dirent's first cluster, ignoring the FAT entirely.
pub fn recover_orphans(
    image: &mut dyn ReadSeek,
    volume: &Volume,
    forest: &OrphanForest,
    node_idx: usize,
    output_root: &Path,
) -> Result<()> {
    fs::create_dir_all(output_root)?;
    let node = &forest.nodes[node_idx];
    let path = output_root.join(&node.dirent.name);

    if node.dirent.is_directory() {
        fs::create_dir_all(&path)?;
        for &child_idx in &node.children {
            recover_orphans(image, volume, forest, child_idx, &path)?;
        }
    } else {
        write_orphan_file(image, volume, node, &path)?;
    }

    set_times(
        &path,
        node.dirent.decode_last_write(volume.epoch),
        node.dirent.decode_last_access(volume.epoch),
    );
    Ok(())
}

fn write_orphan_file(image: &mut dyn ReadSeek, volume: &Volume, node: &OrphanNode, path: &Path) -> Result<()> {
    let offset = volume.cluster_to_physical_offset(node.dirent.first_cluster);
    image.seek(SeekFrom::Start(offset))?;
    let mut remaining = node.dirent.file_size as usize;
    let mut out = fs::File::create(path)?;
    let mut buf = [0u8; 64 * 1024];
    while remaining > 0 {
        let chunk = remaining.min(buf.len());
        image.read_exact(&mut buf[..chunk])?;
        out.write_all(&buf[..chunk])?;
        remaining -= chunk;
    }
    Ok(())
}

/// Write one carved signature's content. A zero or effectively-unbounded
/// length (`>= 2^32 - 1`, a format that failed to parse sensibly) produces an
/// empty file rather than an attempted multi-gigabyte read.
pub fn write_carved(image: &mut dyn ReadSeek, result: &CarveResult, output_root: &Path) -> Result<()> {
    fs::create_dir_all(output_root)?;
    let name = result
        .name
        .clone()
        .ok_or_else(|| Error::invalid_argument("carved result has no name"))?;
    let path = output_root.join(&name);

    if result.length == 0 || result.length >= (u32::MAX - 1) as u64 {
        fs::File::create(&path)?;
        return Ok(());
    }

    image.seek(SeekFrom::Start(result.offset))?;
    let mut remaining = result.length as usize;
    let mut out = fs::File::create(&path)?;
    let mut buf = [0u8; 64 * 1024];
    while remaining > 0 {
        let chunk = remaining.min(buf.len());
        image.read_exact(&mut buf[..chunk])?;
        out.write_all(&buf[..chunk])?;
        remaining -= chunk;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn write_carved_with_zero_length_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut image = Cursor::new(vec![0u8; 16]);
        let result = CarveResult {
            offset: 0,
            class_name: "livesignature",
            length: 0,
            name: Some("livesignature1".to_string()),
        };
        write_carved(&mut image, &result, dir.path()).unwrap();
        let written = dir.path().join("livesignature1");
        assert!(written.exists());
        assert_eq!(fs::metadata(&written).unwrap().len(), 0);
    }

    #[test]
    fn write_carved_reads_exact_length_from_offset() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = vec![0u8; 0x100];
        data[0x10..0x14].copy_from_slice(b"DATA");
        let mut image = Cursor::new(data);
        let result = CarveResult {
            offset: 0x10,
            class_name: "pdbsignature",
            length: 4,
            name: Some("pdbsignature1".to_string()),
        };
        write_carved(&mut image, &result, dir.path()).unwrap();
        let written = fs::read(dir.path().join("pdbsignature1")).unwrap();
        assert_eq!(written, b"DATA");
    }
}
