//! JSON export of an orphan forest, for tooling that consumes the recovered
//! tree without linking against this crate.

use crate::orphan::OrphanForest;
use fatx_core::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct DirentExport {
    pub offset: u64,
    pub cluster: u32,
    pub filename: String,
    pub filenamelen: u8,
    pub filesize: u32,
    pub attributes: u8,
    pub firstcluster: u32,
    pub creationtime: u32,
    pub lastwritetime: u32,
    pub lastaccesstime: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DirentExport>>,
}

#[derive(Debug, Serialize)]
pub struct PartitionExport {
    pub offset: u64,
    pub length: u64,
    pub roots: Vec<DirentExport>,
}

pub fn export_forest(forest: &OrphanForest, partition_offset: u64, partition_length: u64) -> PartitionExport {
    PartitionExport {
        offset: partition_offset,
        length: partition_length,
        roots: forest.roots.iter().map(|&i| build_node(forest, i)).collect(),
    }
}

fn build_node(forest: &OrphanForest, idx: usize) -> DirentExport {
    let node = &forest.nodes[idx];
    let children = if node.dirent.is_directory() {
        Some(node.children.iter().map(|&c| build_node(forest, c)).collect())
    } else {
        None
    };

    DirentExport {
        offset: node.offset,
        cluster: node.cluster,
        filename: node.dirent.name.clone(),
        filenamelen: node.dirent.name_length,
        filesize: node.dirent.file_size,
        attributes: node.dirent.attributes,
        firstcluster: node.dirent.first_cluster,
        creationtime: node.dirent.creation_time_raw,
        lastwritetime: node.dirent.last_write_time_raw,
        lastaccesstime: node.dirent.last_access_time_raw,
        children,
    }
}

pub fn write_json(
    forest: &OrphanForest,
    partition_offset: u64,
    partition_length: u64,
    path: &Path,
) -> Result<()> {
    let export = export_forest(forest, partition_offset, partition_length);
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &export).map_err(|e| Error::custom(e.to_string()))?;
    Ok(())
}
