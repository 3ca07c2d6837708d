//! # fatx-pipeline
//!
//! Byte-addressable, randomly-seekable access to a disk image, plus the
//! endian-aware primitive reads the volume engine, orphan analyzer, and
//! signature carver build on. A short read is never an error here: callers
//! treat it as an end-of-volume signal.
//!
//! ```rust,no_run
//! use fatx_pipeline::{open_image, ImageConfig};
//! use std::path::Path;
//!
//! let (mut image, length) = open_image(Path::new("xbox.img"), ImageConfig::default()).unwrap();
//! println!("image is {length} bytes");
//! ```

pub mod endian;
pub mod image;
pub mod window;

pub use endian::EndianRead;
pub use image::{open_image, ImageConfig, MappedImage};
pub use window::PartitionWindow;
