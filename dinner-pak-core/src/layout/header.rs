use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::FormatError;

pub const RESOURCE_PACK_MAGIC: [u8; 4] = *b"REPA";
pub const STORY_PACK_MAGIC: [u8; 4] = *b"BOOK";

/// Fixed file prefix, followed by `section_count` little-endian `u32` section offsets.
#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct Header {
    pub magic: [u8; 4],
    pub section_count: U32,
}

static_assertions::assert_eq_size!(Header, [u8; 8]);

impl Header {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(magic: [u8; 4], section_count: u32) -> Self {
        Self {
            magic,
            section_count: U32::new(section_count),
        }
    }

    pub fn from_prefix(bytes: &[u8]) -> Result<&Self, FormatError> {
        let (header, _) = Self::ref_from_prefix(bytes)
            .map_err(|_| FormatError::malformed(format!("file too short for header: {} bytes", bytes.len())))?;
        Ok(header)
    }

    pub fn check(&self, magic: [u8; 4], section_count: usize) -> Result<(), FormatError> {
        if self.magic != magic {
            return Err(FormatError::InvalidMagic {
                expected: magic,
                found: self.magic,
            });
        }
        if self.section_count.get() as usize != section_count {
            return Err(FormatError::malformed(format!(
                "expected {} sections, header declares {}",
                section_count,
                self.section_count.get()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write() {
        let bytes = [b'R', b'E', b'P', b'A', 0x02, 0x00, 0x00, 0x00, 0xFF];
        let header = Header::from_prefix(&bytes).unwrap();
        assert_eq!(header.magic, RESOURCE_PACK_MAGIC);
        assert_eq!(header.section_count.get(), 2);
        assert_eq!(header.as_bytes(), &bytes[..Header::SIZE]);
    }

    #[test]
    fn test_check_magic() {
        let header = Header::new(STORY_PACK_MAGIC, 8);
        assert!(header.check(STORY_PACK_MAGIC, 8).is_ok());
        assert!(matches!(
            header.check(RESOURCE_PACK_MAGIC, 8),
            Err(FormatError::InvalidMagic { found, .. }) if found == STORY_PACK_MAGIC
        ));
        assert!(matches!(header.check(STORY_PACK_MAGIC, 2), Err(FormatError::Malformed(_))));
    }

    #[test]
    fn test_short_header() {
        assert!(Header::from_prefix(b"REP").is_err());
    }
}
