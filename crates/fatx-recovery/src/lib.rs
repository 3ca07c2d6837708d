//! # fatx-recovery
//!
//! Everything that works without (or in spite of) live directory metadata:
//! the orphan metadata analyzer, the content-signature carver, the recovery
//! writer, and JSON export of a recovered forest.
//!
//! ```rust,no_run
//! use fatx_core::NullProgress;
//! use fatx_pipeline::{open_image, ImageConfig};
//! use fatx_recovery::orphan::{self, OrphanScanConfig};
//! use fatx_volume::{drive, Volume};
//! use std::path::Path;
//!
//! let (mut image, length) = open_image(Path::new("xbox.img"), ImageConfig::default()).unwrap();
//! let d = drive::probe(&mut image, length).unwrap();
//! let partition = d.partition(0).unwrap();
//! let volume = Volume::mount(&mut image, partition, d.kind.byte_order(), fatx_core::TimestampEpoch::Xbox).unwrap();
//! let forest = orphan::analyze(&mut image, &volume, OrphanScanConfig::default(), &NullProgress).unwrap();
//! println!("{} orphan roots", forest.roots.len());
//! ```

pub mod carver;
pub mod export;
pub mod orphan;
pub mod signatures;
pub mod writer;

pub use carver::{carve, CarveConfig};
pub use export::{export_forest, write_json, DirentExport, PartitionExport};
pub use orphan::{analyze, OrphanForest, OrphanNode, OrphanScanConfig};
pub use signatures::{original_xbox_signatures, xbox360_signatures, CarveResult, Signature};
pub use writer::{recover_live, recover_orphans, write_carved, RecoveryOptions};
