//! On-disk layout of container files.
//!
//! ```text
//! Header     magic, section_count
//! Directory  section_count x u32 absolute section offsets
//! Sections   4-byte aligned, in the container's fixed order
//! ```
//!
//! A record table section is `count, data_len, offsets[count], data[data_len]`;
//! a fixed-stride section is `count, items[count]`. All integers are little-endian.

mod action;
mod header;

use std::ops::Range;

use byteorder::{ByteOrder, LE};
use zerocopy::FromBytes;

use crate::error::FormatError;

pub use action::*;
pub use header::*;

pub(crate) const SECTION_ALIGN: usize = 4;

/// Validated position of a record table inside a container file.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordSpan {
    pub offsets: Range<usize>,
    pub data: Range<usize>,
}

/// Validated position of a fixed-stride table inside a container file.
#[derive(Debug, Clone, Default)]
pub(crate) struct FixedSpan {
    pub count: usize,
    pub items: Range<usize>,
}

impl FixedSpan {
    /// Copy item `index` out of `bytes`, the file this span was read from.
    pub fn item<T: FromBytes>(&self, bytes: &[u8], index: usize) -> Result<T, FormatError> {
        if index >= self.count {
            return Err(FormatError::IndexOutOfRange { index, len: self.count });
        }
        let size = std::mem::size_of::<T>();
        let start = self.items.start + index * size;
        T::read_from_bytes(&bytes[start..start + size])
            .map_err(|_| FormatError::malformed(format!("item {index} has the wrong size")))
    }
}

fn read_u32_at(bytes: &[u8], pos: usize, what: &str) -> Result<u32, FormatError> {
    pos.checked_add(4)
        .and_then(|end| bytes.get(pos..end))
        .map(LE::read_u32)
        .ok_or_else(|| FormatError::malformed(format!("{what}: truncated at offset {pos}")))
}

fn checked_range(start: usize, len: usize, limit: usize, what: &str) -> Result<Range<usize>, FormatError> {
    match start.checked_add(len) {
        Some(end) if end <= limit => Ok(start..end),
        _ => Err(FormatError::malformed(format!(
            "{what}: {len} bytes at offset {start} overrun section end {limit}"
        ))),
    }
}

/// Check the header and return the byte range of every section.
pub(crate) fn read_sections(
    bytes: &[u8],
    magic: [u8; 4],
    section_count: usize,
) -> Result<Vec<Range<usize>>, FormatError> {
    Header::from_prefix(bytes)?.check(magic, section_count)?;

    let directory_end = Header::SIZE + section_count * 4;
    let mut starts = Vec::with_capacity(section_count);
    for i in 0..section_count {
        let start = read_u32_at(bytes, Header::SIZE + i * 4, "section directory")? as usize;
        let prev = starts.last().copied().unwrap_or(directory_end);
        if start < prev || start > bytes.len() {
            return Err(FormatError::malformed(format!(
                "section {i} offset {start} outside {prev}..={}",
                bytes.len()
            )));
        }
        starts.push(start);
    }

    let mut sections = Vec::with_capacity(section_count);
    for (i, start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(bytes.len());
        sections.push(*start..end);
    }
    Ok(sections)
}

/// Locate a record table and check its offset invariants:
/// `O[0] == 0`, non-decreasing, and no offset past the data buffer.
pub(crate) fn read_record_span(bytes: &[u8], section: Range<usize>, what: &str) -> Result<RecordSpan, FormatError> {
    let bytes = &bytes[..section.end.min(bytes.len())];
    let count = read_u32_at(bytes, section.start, what)? as usize;
    let data_len = read_u32_at(bytes, section.start + 4, what)? as usize;
    let offsets_len = count
        .checked_mul(4)
        .ok_or_else(|| FormatError::malformed(format!("{what}: record count {count} overflows")))?;
    let offsets = checked_range(section.start + 8, offsets_len, section.end, what)?;
    let data = checked_range(offsets.end, data_len, section.end, what)?;

    let mut prev = 0u32;
    for (i, chunk) in bytes[offsets.clone()].chunks_exact(4).enumerate() {
        let offset = LE::read_u32(chunk);
        if (i == 0 && offset != 0) || offset < prev || offset as usize > data_len {
            return Err(FormatError::malformed(format!(
                "{what}: offset {offset} of record {i} breaks monotonicity (previous {prev}, data length {data_len})"
            )));
        }
        prev = offset;
    }

    tracing::debug!(table = what, count, data_len, "record table");
    Ok(RecordSpan { offsets, data })
}

/// Locate a table of `count` fixed-size items of `item_size` bytes each.
pub(crate) fn read_fixed_span(
    bytes: &[u8],
    section: Range<usize>,
    item_size: usize,
    what: &str,
) -> Result<FixedSpan, FormatError> {
    let bytes = &bytes[..section.end.min(bytes.len())];
    let count = read_u32_at(bytes, section.start, what)? as usize;
    let items_len = count
        .checked_mul(item_size)
        .ok_or_else(|| FormatError::malformed(format!("{what}: item count {count} overflows")))?;
    let items = checked_range(section.start + 4, items_len, section.end, what)?;

    tracing::debug!(table = what, count, "fixed table");
    Ok(FixedSpan { count, items })
}

#[cfg(test)]
mod tests {
    use zerocopy::IntoBytes;

    use super::*;

    fn container(sections: &[&[u8]]) -> Vec<u8> {
        let mut out = Header::new(*b"TEST", sections.len() as u32).as_bytes().to_vec();
        let mut pos = Header::SIZE + sections.len() * 4;
        for section in sections {
            out.extend_from_slice(&(pos as u32).to_le_bytes());
            pos += section.len();
        }
        for section in sections {
            out.extend_from_slice(section);
        }
        out
    }

    #[test]
    fn test_read_sections() {
        let bytes = container(&[b"abcd".as_slice(), b"".as_slice(), b"efgh".as_slice()]);
        let sections = read_sections(&bytes, *b"TEST", 3).unwrap();
        assert_eq!(sections, vec![20..24, 24..24, 24..28]);
    }

    #[test]
    fn test_read_sections_rejects_backwards_offset() {
        let mut bytes = container(&[b"abcd".as_slice(), b"efgh".as_slice()]);
        // point the second section before the first
        bytes[12..16].copy_from_slice(&8u32.to_le_bytes());
        assert!(matches!(
            read_sections(&bytes, *b"TEST", 2),
            Err(FormatError::Malformed(_))
        ));
    }

    #[test]
    fn test_record_span() {
        // 2 records "ab", "" over a 2-byte buffer
        let mut section = vec![];
        section.extend_from_slice(&2u32.to_le_bytes());
        section.extend_from_slice(&2u32.to_le_bytes());
        section.extend_from_slice(&0u32.to_le_bytes());
        section.extend_from_slice(&2u32.to_le_bytes());
        section.extend_from_slice(b"ab");
        let bytes = container(&[section.as_slice()]);
        let sections = read_sections(&bytes, *b"TEST", 1).unwrap();

        let span = read_record_span(&bytes, sections[0].clone(), "strings").unwrap();
        assert_eq!(span.offsets.len(), 2 * 4);
        assert_eq!(&bytes[span.data], b"ab");
    }

    #[test]
    fn test_record_span_rejects_bad_offsets() {
        let mut section = vec![];
        section.extend_from_slice(&2u32.to_le_bytes());
        section.extend_from_slice(&2u32.to_le_bytes());
        section.extend_from_slice(&1u32.to_le_bytes());
        section.extend_from_slice(&0u32.to_le_bytes());
        section.extend_from_slice(b"ab");
        assert!(read_record_span(&section, 0..section.len(), "strings").is_err());

        // offset past the data buffer
        section[8..12].copy_from_slice(&0u32.to_le_bytes());
        section[12..16].copy_from_slice(&3u32.to_le_bytes());
        assert!(read_record_span(&section, 0..section.len(), "strings").is_err());
    }

    #[test]
    fn test_record_span_truncated() {
        let mut section = vec![];
        section.extend_from_slice(&100u32.to_le_bytes());
        section.extend_from_slice(&0u32.to_le_bytes());
        assert!(read_record_span(&section, 0..section.len(), "strings").is_err());
        assert!(read_record_span(&section[..3], 0..3, "strings").is_err());
    }

    #[test]
    fn test_fixed_span() {
        let mut section = vec![];
        section.extend_from_slice(&2u32.to_le_bytes());
        section.extend_from_slice(ActionRecord::new(ActionTag::Image, 1).as_bytes());
        section.extend_from_slice(ActionRecord::new(ActionTag::Text, 0).as_bytes());
        let span = read_fixed_span(&section, 0..section.len(), 5, "actions").unwrap();
        assert_eq!(span.count, 2);
        assert_eq!(span.items, 4..14);

        assert!(read_fixed_span(&section[..10], 0..10, 5, "actions").is_err());
    }
}
