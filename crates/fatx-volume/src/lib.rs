//! # fatx-volume
//!
//! Drive detection, the packed-timestamp and directory-entry codecs, and the
//! volume engine that mounts a partition, walks its FAT, and builds the live
//! directory tree.
//!
//! ```rust,no_run
//! use fatx_pipeline::{open_image, ImageConfig};
//! use fatx_volume::{drive, Volume};
//! use std::path::Path;
//!
//! let (mut image, length) = open_image(Path::new("xbox360.img"), ImageConfig::default()).unwrap();
//! let drive = drive::probe(&mut image, length).unwrap();
//! let partition = drive.partition(1).unwrap();
//! let volume = Volume::mount(&mut image, partition, drive.kind.byte_order(), fatx_core::TimestampEpoch::Xbox360).unwrap();
//! println!("{} entries in root", volume.list_directory(volume.root(), false).len());
//! ```

pub mod constants;
pub mod dirent;
pub mod drive;
pub mod timestamp;
pub mod volume;

pub use dirent::{Dirent, DirentSlot};
pub use drive::{Drive, DriveKind};
pub use volume::{DirentNode, NodeId, Volume};
