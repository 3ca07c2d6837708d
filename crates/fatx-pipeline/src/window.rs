//! A read/seek window over a sub-range of an image, used to present one
//! partition as an independent stream without copying its bytes.

use std::io::{self, Read, Seek, SeekFrom};

pub struct PartitionWindow<R: Read + Seek> {
    inner: R,
    start: u64,
    length: u64,
    position: u64,
}

impl<R: Read + Seek> PartitionWindow<R> {
    pub fn new(mut inner: R, start: u64, length: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            start,
            length,
            position: 0,
        })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn remaining(&self) -> u64 {
        self.length.saturating_sub(self.position)
    }
}

impl<R: Read + Seek> Read for PartitionWindow<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining() as usize;
        if remaining == 0 {
            return Ok(0);
        }
        let to_read = buf.len().min(remaining);
        let absolute = self.start + self.position;
        self.inner.seek(SeekFrom::Start(absolute))?;
        let n = self.inner.read(&mut buf[..to_read])?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for PartitionWindow<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.length as i64 + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of partition window",
            ));
        }
        let new_pos = new_pos as u64;
        if new_pos > self.length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek beyond end of partition window",
            ));
        }
        self.position = new_pos;
        Ok(self.position)
    }
}
