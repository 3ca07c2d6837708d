//! Strided signature scan over the file area: finds file bodies whose
//! directory entry is gone but whose content is still intact.

use crate::signatures::{CarveResult, Signature};
use fatx_core::{Error, ReadSeek, Result, ScanProgress};
use std::collections::HashMap;

const ALLOWED_STRIDES: [u64; 4] = [1, 0x200, 0x1000, 0x4000];

#[derive(Debug, Clone, Copy)]
pub struct CarveConfig {
    pub interval: u64,
    /// Upper bound on the scan, in bytes from the file area's start.
    /// Defaults to the volume/partition length when unset.
    pub length: u64,
}

/// Scan `[0, config.length)` in steps of `config.interval`, testing every
/// registered signature at each offset. Finds come back in ascending
/// `(offset, signature-registration-index)` order: the outer loop advances
/// offset monotonically and the inner loop tries signatures in registration
/// order, so no explicit sort is needed.
pub fn carve(
    image: &mut dyn ReadSeek,
    base_offset: u64,
    signatures: &[Box<dyn Signature>],
    config: CarveConfig,
    progress: &impl ScanProgress,
) -> Result<Vec<CarveResult>> {
    if !ALLOWED_STRIDES.contains(&config.interval) {
        return Err(Error::invalid_argument(format!(
            "carve interval 0x{:X} is not one of {:X?}",
            config.interval, ALLOWED_STRIDES
        )));
    }

    let mut counters: HashMap<&'static str, u32> = HashMap::new();
    let mut found = Vec::new();
    let steps = config.length / config.interval;

    for i in 0..steps {
        progress.on_progress(i);
        if progress.is_cancelled() {
            break;
        }
        let relative_offset = i * config.interval;
        let offset = base_offset + relative_offset;

        for signature in signatures {
            if signature.test(image, offset)? {
                let mut result = signature.parse(image, offset)?;
                if result.name.is_none() {
                    let counter = counters.entry(result.class_name).or_insert(0);
                    *counter += 1;
                    result.name = Some(format!("{}{}", result.class_name, counter));
                }
                found.push(result);
            }
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::LiveSignature;
    use fatx_core::NullProgress;
    use std::io::Cursor;

    #[test]
    fn rejects_invalid_stride() {
        let mut cursor = Cursor::new(vec![0u8; 16]);
        let sigs: Vec<Box<dyn Signature>> = vec![Box::new(LiveSignature)];
        let err = carve(
            &mut cursor,
            0,
            &sigs,
            CarveConfig { interval: 3, length: 16 },
            &NullProgress,
        );
        assert!(err.is_err());
    }

    #[test]
    fn finds_every_occurrence_at_each_stride_step() {
        let mut data = vec![0u8; 0x1000];
        data[0..4].copy_from_slice(b"LIVE");
        data[0x200..0x204].copy_from_slice(b"LIVE");
        let mut cursor = Cursor::new(data);
        let sigs: Vec<Box<dyn Signature>> = vec![Box::new(LiveSignature)];
        let results = carve(
            &mut cursor,
            0,
            &sigs,
            CarveConfig { interval: 0x200, length: 0x1000 },
            &NullProgress,
        )
        .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].offset, 0);
        assert_eq!(results[1].offset, 0x200);
        assert_eq!(results[0].name.as_deref(), Some("livesignature1"));
        assert_eq!(results[1].name.as_deref(), Some("livesignature2"));
    }

    #[test]
    fn auto_generated_names_increment_per_class_not_globally() {
        let mut data = vec![0u8; 0x400];
        data[0..4].copy_from_slice(b"LIVE");
        data[0x200..0x204].copy_from_slice(b"LIVE");
        let mut cursor = Cursor::new(data);
        let sigs: Vec<Box<dyn Signature>> = vec![Box::new(LiveSignature)];
        let results = carve(
            &mut cursor,
            0,
            &sigs,
            CarveConfig { interval: 0x200, length: 0x400 },
            &NullProgress,
        )
        .unwrap();
        assert_eq!(results[0].name.as_deref(), Some("livesignature1"));
        assert_eq!(results[1].name.as_deref(), Some("livesignature2"));
    }
}
