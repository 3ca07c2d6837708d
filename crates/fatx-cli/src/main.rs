//! Command-line front end for the fatx forensic toolkit.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fatx_core::{NullProgress, TimestampEpoch};
use fatx_pipeline::{open_image, ImageConfig};
use fatx_recovery::{
    carve, orphan, recover_live, recover_orphans, write_carved, write_json, CarveConfig,
    OrphanScanConfig, RecoveryOptions,
};
use fatx_volume::{drive, DriveKind, Volume};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fatx")]
#[command(about = "FATX filesystem forensic toolkit for Original Xbox and Xbox 360 images", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the drive and print its partition table.
    Zones { image: PathBuf },

    /// Mount a partition and print its live directory tree.
    Mount {
        image: PathBuf,
        partition_index: usize,
    },

    /// Scan a partition for orphaned metadata not reachable from the root.
    OrphanScan {
        image: PathBuf,
        partition_index: usize,
        #[arg(long)]
        max_clusters: Option<u32>,
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Carve the file area for recognizable content signatures.
    Carve {
        image: PathBuf,
        partition_index: usize,
        #[arg(long, default_value_t = 0x200)]
        interval: u64,
        #[arg(long)]
        length: Option<u64>,
        /// Write each carved find's content to this directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Recover files and directories to the host filesystem.
    Recover {
        image: PathBuf,
        partition_index: usize,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = false)]
        undelete: bool,
        #[arg(long, value_enum, default_value_t = RecoveryMode::Live)]
        mode: RecoveryMode,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum RecoveryMode {
    Live,
    Orphan,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level)
        .with_target(false)
        .init();

    match cli.command {
        Command::Zones { image } => cmd_zones(&image),
        Command::Mount {
            image,
            partition_index,
        } => cmd_mount(&image, partition_index),
        Command::OrphanScan {
            image,
            partition_index,
            max_clusters,
            json,
        } => cmd_orphan_scan(&image, partition_index, max_clusters, json),
        Command::Carve {
            image,
            partition_index,
            interval,
            length,
            output,
        } => cmd_carve(&image, partition_index, interval, length, output),
        Command::Recover {
            image,
            partition_index,
            output,
            undelete,
            mode,
        } => cmd_recover(&image, partition_index, &output, undelete, mode),
    }
}

fn epoch_for(kind: DriveKind) -> TimestampEpoch {
    match kind {
        DriveKind::OriginalXbox => TimestampEpoch::Xbox,
        DriveKind::Xbox360Devkit | DriveKind::Xbox360Retail => TimestampEpoch::Xbox360,
    }
}

fn cmd_zones(image_path: &PathBuf) -> Result<()> {
    let (mut image, length) = open_image(image_path, ImageConfig::default())
        .with_context(|| format!("opening {}", image_path.display()))?;
    let d = drive::probe(&mut *image, length)?;

    println!("=== Partition Table ===");
    println!("{:<5} {:<20} {:<14} {:<14}", "Index", "Name", "Offset", "Length");
    for p in &d.partitions {
        println!("{:<5} {:<20} 0x{:<12X} {}", p.index, p.name, p.offset, p.length);
    }
    Ok(())
}

fn mount(
    image_path: &PathBuf,
    partition_index: usize,
) -> Result<(Box<dyn fatx_core::ReadSeek>, Volume, DriveKind)> {
    let (mut image, length) = open_image(image_path, ImageConfig::default())
        .with_context(|| format!("opening {}", image_path.display()))?;
    let d = drive::probe(&mut *image, length)?;
    let partition = d
        .partition(partition_index)
        .with_context(|| format!("no partition {partition_index}"))?;
    let volume = Volume::mount(&mut *image, partition, d.kind.byte_order(), epoch_for(d.kind))?;
    Ok((image, volume, d.kind))
}

fn cmd_mount(image_path: &PathBuf, partition_index: usize) -> Result<()> {
    let (_image, volume, _kind) = mount(image_path, partition_index)?;
    print_tree(&volume, volume.root(), 0);
    Ok(())
}

fn print_tree(volume: &Volume, dir: fatx_volume::NodeId, depth: usize) {
    for entry in volume.list_directory(dir, true) {
        println!("{}{}", "  ".repeat(depth), entry);
    }
    for &child in &volume.node(dir).children {
        if volume.node(child).dirent.is_directory() && !volume.node(child).dirent.deleted {
            print_tree(volume, child, depth + 1);
        }
    }
}

fn cmd_orphan_scan(
    image_path: &PathBuf,
    partition_index: usize,
    max_clusters: Option<u32>,
    json: Option<PathBuf>,
) -> Result<()> {
    let (mut image, volume, _kind) = mount(image_path, partition_index)?;
    let config = OrphanScanConfig {
        max_clusters,
        ..OrphanScanConfig::default()
    };
    let forest = orphan::analyze(&mut *image, &volume, config, &NullProgress)?;

    println!("Recovered {} orphan candidates, {} root(s).", forest.nodes.len(), forest.roots.len());

    if let Some(path) = json {
        write_json(&forest, volume.partition_offset, volume.partition_length, &path)?;
        println!("Wrote {}", path.display());
    } else {
        for &root in &forest.roots {
            println!("  {}", forest.nodes[root].dirent.name);
        }
    }
    Ok(())
}

fn cmd_carve(
    image_path: &PathBuf,
    partition_index: usize,
    interval: u64,
    length: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let (mut image, volume, kind) = mount(image_path, partition_index)?;
    let signatures = match kind {
        DriveKind::OriginalXbox => fatx_recovery::original_xbox_signatures(),
        DriveKind::Xbox360Devkit | DriveKind::Xbox360Retail => fatx_recovery::xbox360_signatures(),
    };

    let config = CarveConfig {
        interval,
        length: length.unwrap_or(volume.partition_length),
    };
    let found = carve(
        &mut *image,
        volume.partition_offset + volume.file_area_byte_offset,
        &signatures,
        config,
        &NullProgress,
    )?;

    println!("Found {} candidate(s).", found.len());
    for f in &found {
        println!(
            "  0x{:010X} {} length={} name={}",
            f.offset,
            f.class_name,
            f.length,
            f.name.as_deref().unwrap_or("-")
        );
    }
    if let Some(dir) = output {
        for f in &found {
            write_carved(&mut *image, f, &dir)?;
        }
        println!("Wrote {} file(s) to {}", found.len(), dir.display());
    }
    Ok(())
}

fn cmd_recover(
    image_path: &PathBuf,
    partition_index: usize,
    output: &PathBuf,
    undelete: bool,
    mode: RecoveryMode,
) -> Result<()> {
    let (mut image, volume, _kind) = mount(image_path, partition_index)?;

    match mode {
        RecoveryMode::Live => {
            recover_live(
                &mut *image,
                &volume,
                volume.root(),
                output,
                RecoveryOptions { undelete },
            )?;
        }
        RecoveryMode::Orphan => {
            let forest = orphan::analyze(&mut *image, &volume, OrphanScanConfig::default(), &NullProgress)?;
            for &root in &forest.roots {
                recover_orphans(&mut *image, &volume, &forest, root, output)?;
            }
        }
    }

    println!("Recovered to {}", output.display());
    Ok(())
}
