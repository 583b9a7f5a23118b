use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::FormatError;

/// Character index stored for narration lines.
pub const NO_SPEAKER: u32 = u32::MAX;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTag {
    /// `index` addresses the text side-table.
    Text = 0,
    /// `index` addresses the image storage directly.
    Image = 1,
    /// `index` addresses the music storage directly.
    Music = 2,
}

impl TryFrom<u8> for ActionTag {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ActionTag::Text),
            1 => Ok(ActionTag::Image),
            2 => Ok(ActionTag::Music),
            _ => Err(FormatError::malformed(format!("unknown action tag {value}"))),
        }
    }
}

/// One action log entry: a tag byte and a table index.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ActionRecord {
    pub tag: u8,
    pub index: U32,
}

static_assertions::assert_eq_size!(ActionRecord, [u8; 5]);

impl ActionRecord {
    pub fn new(tag: ActionTag, index: u32) -> Self {
        Self {
            tag: tag as u8,
            index: U32::new(index),
        }
    }

    pub fn tag(&self) -> Result<ActionTag, FormatError> {
        ActionTag::try_from(self.tag)
    }
}

/// Text side-table entry.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct TextActionRecord {
    pub character: U32,
    pub phrase: U32,
}

static_assertions::assert_eq_size!(TextActionRecord, [u8; 8]);

impl TextActionRecord {
    pub fn new(character: u32, phrase: u32) -> Self {
        Self {
            character: U32::new(character),
            phrase: U32::new(phrase),
        }
    }

    /// `None` for narration.
    pub fn character(&self) -> Option<u32> {
        match self.character.get() {
            NO_SPEAKER => None,
            index => Some(index),
        }
    }

    pub fn phrase(&self) -> u32 {
        self.phrase.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_record_bytes() {
        let record = ActionRecord::new(ActionTag::Music, 0x0102_0304);
        assert_eq!(record.as_bytes(), &[2, 0x04, 0x03, 0x02, 0x01]);

        let parsed = ActionRecord::read_from_bytes(&[1, 7, 0, 0, 0]).unwrap();
        assert_eq!(parsed.tag().unwrap(), ActionTag::Image);
        assert_eq!(parsed.index.get(), 7);
    }

    #[test]
    fn test_unknown_tag() {
        let parsed = ActionRecord::read_from_bytes(&[9, 0, 0, 0, 0]).unwrap();
        assert!(matches!(parsed.tag(), Err(FormatError::Malformed(_))));
    }

    #[test]
    fn test_narration_sentinel() {
        assert_eq!(TextActionRecord::new(NO_SPEAKER, 3).character(), None);
        assert_eq!(TextActionRecord::new(0, 3).character(), Some(0));
        assert_eq!(TextActionRecord::new(0, 3).phrase(), 3);
    }
}
