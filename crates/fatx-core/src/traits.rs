//! Marker traits shared across image backends.

use std::io::{Read, Seek, Write};

/// Any stream that can be randomly read from and seeked within.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Any stream that additionally supports writes, used by the recovery writer.
pub trait ReadWriteSeek: Read + Write + Seek + Send {}
impl<T: Read + Write + Seek + Send> ReadWriteSeek for T {}

/// Observer invoked periodically during long scans so a host can report
/// progress and request cancellation.
pub trait ScanProgress {
    /// Called once per unit of work (cluster or carve step) with the index
    /// just completed.
    fn on_progress(&self, _index: u64) {}

    /// Polled between units of work; returning `true` aborts the scan after
    /// the current unit, with whatever has been accumulated so far returned
    /// to the caller.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A no-op progress observer for callers that don't need cancellation.
pub struct NullProgress;
impl ScanProgress for NullProgress {}
