//! Byte-addressable backends for reading a disk image.

use fatx_core::{Result, MAX_MMAP_SIZE};
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// How an on-disk image should be opened.
#[derive(Debug, Clone, Copy)]
pub struct ImageConfig {
    /// Memory-map the file instead of reading through buffered syscalls.
    /// Much faster for the orphan scan and signature carver, which both
    /// walk the whole image.
    pub use_mmap: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { use_mmap: true }
    }
}

/// A memory-mapped, read-only view of a disk image.
pub struct MappedImage {
    mmap: Mmap,
    position: u64,
}

impl MappedImage {
    /// Map an image file.
    ///
    /// # Safety
    ///
    /// Memory-mapping a file is unsafe because another process truncating or
    /// overwriting it underneath us would turn a stale mapping into a
    /// dangling read. We open images read-only, reject anything that isn't a
    /// regular file, and cap the mapping size; the remaining risk (another
    /// process rewriting the image mid-scan) is accepted and is the same
    /// risk a tool calling `mmap()` via any other path would carry.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(&file)
    }

    pub fn from_file(file: &File) -> io::Result<Self> {
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "only regular files can be memory-mapped",
            ));
        }
        if metadata.len() > MAX_MMAP_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "image size {} exceeds memory-mapping limit {}",
                    metadata.len(),
                    MAX_MMAP_SIZE
                ),
            ));
        }

        // SAFETY: see the doc comment on `open`.
        let mmap = unsafe { Mmap::map(file)? };
        Ok(Self { mmap, position: 0 })
    }

    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }
}

impl Read for MappedImage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len().saturating_sub(self.position) as usize;
        if remaining == 0 {
            return Ok(0);
        }
        let to_read = buf.len().min(remaining);
        let start = self.position as usize;
        buf[..to_read].copy_from_slice(&self.mmap[start..start + to_read]);
        self.position += to_read as u64;
        Ok(to_read)
    }
}

impl Seek for MappedImage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.len() as i64 + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of image",
            ));
        }
        self.position = new_pos as u64;
        Ok(self.position)
    }
}

/// Open an image file as a boxed `Read + Seek`, choosing the mmap or
/// buffered-file backend per `config`.
pub fn open_image(path: &Path, config: ImageConfig) -> Result<(Box<dyn fatx_core::ReadSeek>, u64)> {
    let file = File::open(path)?;
    let length = file.metadata()?.len();

    let backend: Box<dyn fatx_core::ReadSeek> = if config.use_mmap {
        Box::new(MappedImage::from_file(&file)?)
    } else {
        Box::new(file)
    };

    Ok((backend, length))
}
