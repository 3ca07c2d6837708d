//! Endian-parameterised primitive reads, layered over any `Read`.
//!
//! FATX images carry their own byte order (little-endian on the Original
//! Xbox, big-endian on Xbox 360), decided at mount time rather than compile
//! time, so the primitive reads take a `ByteOrder` argument instead of being
//! generic over a `byteorder`-style marker type.

use fatx_core::ByteOrder;
use std::io::{self, Read};

pub trait EndianRead: Read {
    fn read_u8_val(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16_val(&mut self, order: ByteOrder) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(match order {
            ByteOrder::Little => u16::from_le_bytes(buf),
            ByteOrder::Big => u16::from_be_bytes(buf),
        })
    }

    fn read_u32_val(&mut self, order: ByteOrder) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(match order {
            ByteOrder::Little => u32::from_le_bytes(buf),
            ByteOrder::Big => u32::from_be_bytes(buf),
        })
    }

    fn read_u64_val(&mut self, order: ByteOrder) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(match order {
            ByteOrder::Little => u64::from_le_bytes(buf),
            ByteOrder::Big => u64::from_be_bytes(buf),
        })
    }

    fn read_exact_vec(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read bytes up to and including the first NUL, returning the bytes
    /// before it. Stops after `max_len` bytes even without a terminator.
    fn read_cstring(&mut self, max_len: usize) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        while out.len() < max_len {
            self.read_exact(&mut byte)?;
            if byte[0] == 0 {
                break;
            }
            out.push(byte[0]);
        }
        Ok(out)
    }
}

impl<T: Read + ?Sized> EndianRead for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_le_and_be() {
        let mut little = Cursor::new(vec![0x01, 0x00, 0x00, 0x00]);
        assert_eq!(little.read_u32_val(ByteOrder::Little).unwrap(), 1);

        let mut big = Cursor::new(vec![0x00, 0x00, 0x00, 0x01]);
        assert_eq!(big.read_u32_val(ByteOrder::Big).unwrap(), 1);
    }

    #[test]
    fn reads_cstring_stops_at_nul() {
        let mut cursor = Cursor::new(b"game.exe\0trailing-garbage".to_vec());
        let s = cursor.read_cstring(64).unwrap();
        assert_eq!(s, b"game.exe");
    }

    #[test]
    fn reads_cstring_stops_at_max_len_without_terminator() {
        let mut cursor = Cursor::new(vec![b'A'; 10]);
        let s = cursor.read_cstring(5).unwrap();
        assert_eq!(s.len(), 5);
    }
}
