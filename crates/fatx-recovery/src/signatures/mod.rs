//! Content-signature detection for files whose directory entry is gone but
//! whose body is still intact.

use fatx_core::{Error, ReadSeek, Result};
use fatx_pipeline::EndianRead;
use std::io::{Seek, SeekFrom};

/// One completed carve: where it was found, how long it is, and a name if
/// the format carries one.
#[derive(Debug, Clone)]
pub struct CarveResult {
    pub offset: u64,
    pub class_name: &'static str,
    pub length: u64,
    pub name: Option<String>,
}

/// A content signature: a cheap probe plus a parser that fills in length and
/// (when the format carries one) a name.
pub trait Signature {
    fn class_name(&self) -> &'static str;

    /// Cheap magic-byte probe at `offset`. Must not disturb the stream
    /// position for the caller beyond its own seeks.
    fn test(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<bool>;

    /// Only called after `test` returns true. Reads whatever structured
    /// fields this format needs to determine its length and optional name.
    fn parse(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<CarveResult>;
}

fn read_magic(image: &mut dyn ReadSeek, offset: u64, len: usize) -> Result<Vec<u8>> {
    image.seek(SeekFrom::Start(offset))?;
    Ok(image.read_exact_vec(len)?)
}

fn basename_without_extension(path: &[u8], strip_ext: &str) -> String {
    let path = String::from_utf8_lossy(path);
    let base = path.rsplit(['/', '\\']).next().unwrap_or(&path);
    base.strip_suffix(strip_ext).unwrap_or(base).to_string()
}

pub struct XbeSignature;

impl Signature for XbeSignature {
    fn class_name(&self) -> &'static str {
        "xbesignature"
    }

    fn test(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<bool> {
        Ok(read_magic(image, offset, 4)? == b"XBEH")
    }

    fn parse(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<CarveResult> {
        use fatx_core::ByteOrder::Little;

        image.seek(SeekFrom::Start(offset + 0x104))?;
        let base_address = image.read_u32_val(Little)?;

        image.seek(SeekFrom::Start(offset + 0x10C))?;
        let length = image.read_u32_val(Little)? as u64;

        image.seek(SeekFrom::Start(offset + 0x150))?;
        let debug_filename_offset = image.read_u32_val(Little)?;

        let name_offset = offset + (debug_filename_offset as u64).saturating_sub(base_address as u64);
        image.seek(SeekFrom::Start(name_offset))?;
        let raw_name = image.read_cstring(260)?;
        let name = format!("{}.xbe", basename_without_extension(&raw_name, ".exe"));

        Ok(CarveResult {
            offset,
            class_name: self.class_name(),
            length,
            name: Some(name),
        })
    }
}

pub struct PeSignature;

impl Signature for PeSignature {
    fn class_name(&self) -> &'static str {
        "pesignature"
    }

    fn test(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<bool> {
        Ok(read_magic(image, offset, 4)? == [b'M', b'Z', 0x90, 0x00])
    }

    fn parse(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<CarveResult> {
        use fatx_core::ByteOrder::Little;

        image.seek(SeekFrom::Start(offset + 0x3C))?;
        let lfanew = image.read_u32_val(Little)? as u64;

        image.seek(SeekFrom::Start(offset + lfanew))?;
        let pe_magic = image.read_u32_val(Little)?;
        if pe_magic != 0x0000_4550 {
            return Err(Error::invalid_argument("PE signature: section header not found at e_lfanew"));
        }

        image.seek(SeekFrom::Start(offset + lfanew + 6))?;
        let nsec = image.read_u16_val(Little)? as u64;
        if nsec == 0 {
            return Ok(CarveResult {
                offset,
                class_name: self.class_name(),
                length: 0,
                name: None,
            });
        }

        let last_sec = offset + lfanew + 0xF8 + (nsec - 1) * 0x28;
        image.seek(SeekFrom::Start(last_sec + 0x10))?;
        let raw_size = image.read_u32_val(Little)? as u64;
        image.seek(SeekFrom::Start(last_sec + 0x14))?;
        let raw_ptr = image.read_u32_val(Little)? as u64;

        Ok(CarveResult {
            offset,
            class_name: self.class_name(),
            length: raw_size + raw_ptr,
            name: None,
        })
    }
}

pub struct PdbSignature;

const PDB_MAGIC: &[u8] = b"Microsoft C/C++ MSF 7.00\r\n\x1ADS\0\0\0";

impl Signature for PdbSignature {
    fn class_name(&self) -> &'static str {
        "pdbsignature"
    }

    fn test(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<bool> {
        Ok(read_magic(image, offset, PDB_MAGIC.len())? == PDB_MAGIC)
    }

    fn parse(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<CarveResult> {
        use fatx_core::ByteOrder::Little;

        image.seek(SeekFrom::Start(offset + 0x20))?;
        let block_size = image.read_u32_val(Little)? as u64;
        image.seek(SeekFrom::Start(offset + 0x28))?;
        let num_blocks = image.read_u32_val(Little)? as u64;

        Ok(CarveResult {
            offset,
            class_name: self.class_name(),
            length: block_size * num_blocks,
            name: None,
        })
    }
}

pub struct XexSignature;

impl Signature for XexSignature {
    fn class_name(&self) -> &'static str {
        "xexsignature"
    }

    fn test(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<bool> {
        Ok(read_magic(image, offset, 4)? == b"XEX2")
    }

    fn parse(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<CarveResult> {
        use fatx_core::ByteOrder::Big;

        image.seek(SeekFrom::Start(offset + 0x10))?;
        let security_offset = image.read_u32_val(Big)? as u64;
        image.seek(SeekFrom::Start(offset + 0x14))?;
        let header_count = image.read_u32_val(Big)?;

        let mut file_name_offset = None;
        for _ in 0..header_count {
            let id = image.read_u32_val(Big)?;
            let value = image.read_u32_val(Big)?;
            if id == 0x0001_83FF {
                file_name_offset = Some(value as u64);
            }
        }

        image.seek(SeekFrom::Start(offset + security_offset + 4))?;
        let length = image.read_u32_val(Big)? as u64;

        let name = if let Some(name_offset) = file_name_offset {
            image.seek(SeekFrom::Start(offset + name_offset + 4))?;
            let raw = image.read_cstring(260)?;
            Some(String::from_utf8_lossy(&raw).into_owned())
        } else {
            None
        };

        Ok(CarveResult {
            offset,
            class_name: self.class_name(),
            length,
            name,
        })
    }
}

pub struct LiveSignature;

impl Signature for LiveSignature {
    fn class_name(&self) -> &'static str {
        "livesignature"
    }

    fn test(&self, image: &mut dyn ReadSeek, offset: u64) -> Result<bool> {
        Ok(read_magic(image, offset, 4)? == b"LIVE")
    }

    fn parse(&self, _image: &mut dyn ReadSeek, offset: u64) -> Result<CarveResult> {
        Ok(CarveResult {
            offset,
            class_name: self.class_name(),
            length: 0,
            name: None,
        })
    }
}

/// The signature set registered for Original Xbox images, in registration
/// order (this order breaks ties at identical offsets).
pub fn original_xbox_signatures() -> Vec<Box<dyn Signature>> {
    vec![Box::new(XbeSignature), Box::new(PeSignature), Box::new(PdbSignature)]
}

/// The signature set registered for Xbox 360 images, in registration order.
pub fn xbox360_signatures() -> Vec<Box<dyn Signature>> {
    vec![
        Box::new(XexSignature),
        Box::new(PdbSignature),
        Box::new(LiveSignature),
        Box::new(PeSignature),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn xbe_test_matches_magic() {
        let mut data = vec![0u8; 0x200];
        data[0..4].copy_from_slice(b"XBEH");
        let mut cursor = Cursor::new(data);
        assert!(XbeSignature.test(&mut cursor, 0).unwrap());
    }

    #[test]
    fn xbe_test_rejects_wrong_magic() {
        let data = vec![0u8; 0x200];
        let mut cursor = Cursor::new(data);
        assert!(!XbeSignature.test(&mut cursor, 0).unwrap());
    }

    #[test]
    fn pdb_magic_is_exact_32_bytes() {
        assert_eq!(PDB_MAGIC.len(), 32);
    }

    #[test]
    fn live_parse_reports_zero_length() {
        let data = vec![0u8; 16];
        let mut cursor = Cursor::new(data);
        let result = LiveSignature.parse(&mut cursor, 0x1000).unwrap();
        assert_eq!(result.length, 0);
        assert_eq!(result.offset, 0x1000);
    }

    #[test]
    fn xbe_parses_debug_filename_into_xbe_name() {
        let mut data = vec![0u8; 0x400];
        data[0..4].copy_from_slice(b"XBEH");
        let base_address = 0x10000u32;
        data[0x104..0x108].copy_from_slice(&base_address.to_le_bytes());
        data[0x10C..0x110].copy_from_slice(&0x2000u32.to_le_bytes());
        let debug_filename_offset = base_address + 0x200;
        data[0x150..0x154].copy_from_slice(&debug_filename_offset.to_le_bytes());
        data[0x200..0x200 + 9].copy_from_slice(b"dash.exe\0");

        let mut cursor = Cursor::new(data);
        let result = XbeSignature.parse(&mut cursor, 0).unwrap();
        assert_eq!(result.length, 0x2000);
        assert_eq!(result.name.as_deref(), Some("dash.xbe"));
    }

    #[test]
    fn pe_parse_reads_last_section_raw_size_and_pointer() {
        let mut data = vec![0u8; 0x400];
        data[0..4].copy_from_slice(&[b'M', b'Z', 0x90, 0x00]);
        let lfanew = 0x80u32;
        data[0x3C..0x40].copy_from_slice(&lfanew.to_le_bytes());
        data[lfanew as usize..lfanew as usize + 4].copy_from_slice(&0x0000_4550u32.to_le_bytes());
        data[lfanew as usize + 6..lfanew as usize + 8].copy_from_slice(&1u16.to_le_bytes());
        let last_sec = lfanew as usize + 0xF8;
        data[last_sec + 0x10..last_sec + 0x14].copy_from_slice(&0x1000u32.to_le_bytes());
        data[last_sec + 0x14..last_sec + 0x18].copy_from_slice(&0x400u32.to_le_bytes());

        let mut cursor = Cursor::new(data);
        assert!(PeSignature.test(&mut cursor, 0).unwrap());
        let result = PeSignature.parse(&mut cursor, 0).unwrap();
        assert_eq!(result.length, 0x1000 + 0x400);
    }
}
