//! Metadata (orphan) analysis: finds dirent-shaped byte patterns outside the
//! live directory tree and re-links them into a forest using FAT chain
//! membership.

use fatx_core::{Result, ScanProgress};
use fatx_volume::dirent::{self, Dirent, DirentSlot};
use fatx_volume::Volume;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use tracing::{info, warn};

const DIRENT_SIZE: usize = 0x40;
const SLOTS_PER_CLUSTER: usize = 256;

/// `0x00`/`0x01`/`0xFF` never denote a real name length, whether or not the
/// entry is deleted.
fn fails_cheap_precheck(name_length: u8, attributes: u8) -> bool {
    if attributes != 0x00 && attributes != 0x10 {
        return true;
    }
    if name_length == 0x00 || name_length == 0x01 || name_length == 0xFF {
        return true;
    }
    if name_length != 0xE5 && name_length > 0x2A {
        return true;
    }
    false
}

fn is_valid_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || b == 0xFF
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'-'
                | b'.'
                | b'@'
                | b'['
                | b']'
                | b'^'
                | b'_'
                | b'`'
                | b'{'
                | b'}'
                | b'~'
                | b' '
        )
}

/// Full orphan-candidate validation: first cluster in range, every name byte
/// in the allowed set, no attribute bits outside the valid mask, and every
/// timestamp plausible.
fn is_valid(raw_name_bytes: &[u8], dirent: &Dirent, volume: &Volume, max_year: i32) -> bool {
    if dirent.first_cluster > volume.max_clusters {
        return false;
    }
    if !raw_name_bytes.iter().all(|&b| is_valid_name_byte(b)) {
        return false;
    }
    if dirent.attributes & !fatx_volume::constants::VALID_ATTRIBUTES_MASK != 0 {
        return false;
    }
    let plausible = |raw: u32| fatx_volume::timestamp::is_plausible(raw, volume.epoch, max_year);
    plausible(dirent.creation_time_raw)
        && plausible(dirent.last_write_time_raw)
        && plausible(dirent.last_access_time_raw)
}

/// One recovered orphan candidate, located by where it was found rather than
/// by any directory structure that still points to it.
#[derive(Debug, Clone)]
pub struct OrphanNode {
    pub dirent: Dirent,
    pub cluster: u32,
    pub slot: usize,
    pub offset: u64,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Result of a full orphan analysis: the discovered nodes and the indices of
/// those that never got a parent during re-linking.
pub struct OrphanForest {
    pub nodes: Vec<OrphanNode>,
    pub roots: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct OrphanScanConfig {
    /// Scan clusters `1..max_clusters` unless overridden.
    pub max_clusters: Option<u32>,
    /// Upper bound passed to timestamp plausibility checks; defaults to the
    /// current year if not set by the caller.
    pub max_year: i32,
}

impl Default for OrphanScanConfig {
    fn default() -> Self {
        Self {
            max_clusters: None,
            max_year: 2026,
        }
    }
}

/// Scan every cluster of `volume` for dirent-shaped byte patterns, validate
/// them, and re-link the survivors into a forest by FAT chain membership.
pub fn analyze(
    image: &mut dyn fatx_core::ReadSeek,
    volume: &Volume,
    config: OrphanScanConfig,
    progress: &impl ScanProgress,
) -> Result<OrphanForest> {
    let nodes = recover_orphans(image, volume, config, progress)?;
    let (nodes, roots) = link_orphans(nodes, volume);
    Ok(OrphanForest { nodes, roots })
}

fn recover_orphans(
    image: &mut dyn fatx_core::ReadSeek,
    volume: &Volume,
    config: OrphanScanConfig,
    progress: &impl ScanProgress,
) -> Result<Vec<OrphanNode>> {
    let max_cluster = config.max_clusters.unwrap_or(volume.max_clusters);
    let mut nodes = Vec::new();

    for cluster in 1..max_cluster {
        progress.on_progress(cluster as u64);
        if progress.is_cancelled() {
            info!("orphan scan cancelled at cluster {cluster}");
            break;
        }

        let offset = volume.cluster_to_physical_offset(cluster);
        image.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; volume.bytes_per_cluster as usize];
        if let Err(e) = image.read_exact(&mut buf) {
            warn!("short read at cluster {cluster} (0x{offset:X}): {e}");
            continue;
        }

        // bytes_per_cluster comes from the untrusted header: a cluster
        // smaller than SLOTS_PER_CLUSTER * DIRENT_SIZE must not let the fixed
        // slot count slice past buf.
        let slot_count = (buf.len() / DIRENT_SIZE).min(SLOTS_PER_CLUSTER);
        for slot in 0..slot_count {
            let start = slot * DIRENT_SIZE;
            let raw = &buf[start..start + DIRENT_SIZE];
            let name_length = raw[0];
            let attributes = raw[1];
            if fails_cheap_precheck(name_length, attributes) {
                continue;
            }

            let parsed = match dirent::parse(raw, volume.byte_order)? {
                DirentSlot::Entry(d) => d,
                DirentSlot::EndOfStream => continue,
            };

            if !is_valid(&raw[2..44], &parsed, volume, config.max_year) {
                continue;
            }

            nodes.push(OrphanNode {
                dirent: parsed,
                cluster,
                slot,
                offset: offset + start as u64,
                parent: None,
                children: Vec::new(),
            });
        }
    }

    info!("orphan scan recovered {} candidates", nodes.len());
    Ok(nodes)
}

/// Attach every orphan whose discovery cluster falls within a directory
/// candidate's FAT chain as that directory's child. A candidate attached by
/// more than one directory keeps only the last assignment; this mirrors the
/// chain-membership rule this analysis was built on, which does not try to
/// resolve the conflict any more cleverly than "last directory wins".
fn link_orphans(mut nodes: Vec<OrphanNode>, volume: &Volume) -> (Vec<OrphanNode>, Vec<usize>) {
    let cluster_index: HashMap<u32, Vec<usize>> = {
        let mut map: HashMap<u32, Vec<usize>> = HashMap::new();
        for (i, n) in nodes.iter().enumerate() {
            map.entry(n.cluster).or_default().push(i);
        }
        map
    };

    let directory_indices: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.dirent.is_directory())
        .map(|(i, _)| i)
        .collect();

    for dir_idx in directory_indices {
        let chain = volume.cluster_chain(nodes[dir_idx].dirent.first_cluster);
        let mut child_indices = Vec::new();
        for cluster in chain {
            if let Some(candidates) = cluster_index.get(&cluster) {
                child_indices.extend(candidates.iter().copied());
            }
        }
        for child_idx in child_indices {
            if child_idx == dir_idx {
                continue;
            }
            if let Some(existing) = nodes[child_idx].parent {
                warn!(
                    "orphan at cluster {} slot {} already had a parent (node {existing}); reattaching to node {dir_idx}",
                    nodes[child_idx].cluster, nodes[child_idx].slot
                );
                if let Some(pos) = nodes[existing].children.iter().position(|&c| c == child_idx) {
                    nodes[existing].children.remove(pos);
                }
            }
            nodes[child_idx].parent = Some(dir_idx);
            nodes[dir_idx].children.push(child_idx);
        }
    }

    let roots: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.parent.is_none())
        .map(|(i, _)| i)
        .collect();

    (nodes, roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precheck_rejects_bad_attributes() {
        assert!(fails_cheap_precheck(8, 0x40));
    }

    #[test]
    fn precheck_rejects_sentinel_name_lengths() {
        assert!(fails_cheap_precheck(0x00, 0x00));
        assert!(fails_cheap_precheck(0x01, 0x00));
        assert!(fails_cheap_precheck(0xFF, 0x00));
    }

    #[test]
    fn precheck_rejects_oversized_live_name_length() {
        assert!(fails_cheap_precheck(0x2B, 0x00));
        assert!(!fails_cheap_precheck(0x2A, 0x00));
    }

    #[test]
    fn precheck_allows_deleted_with_any_length_under_0xe5_rule() {
        assert!(!fails_cheap_precheck(0xE5, 0x10));
    }

    #[test]
    fn name_byte_validation_accepts_padding_and_rejects_control_chars() {
        assert!(is_valid_name_byte(0xFF));
        assert!(is_valid_name_byte(b'A'));
        assert!(is_valid_name_byte(b'!'));
        assert!(!is_valid_name_byte(0x01));
        assert!(!is_valid_name_byte(b'/'));
    }
}
