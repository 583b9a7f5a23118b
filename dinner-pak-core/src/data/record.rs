use std::ops::Range;

use byteorder::{ByteOrder, LE};

use crate::error::FormatError;
use crate::layout::{self, RecordSpan};

/// Indexed read access shared by every table view.
pub trait Table<'a>: Copy {
    type Item;

    fn len(&self) -> usize;

    /// `None` when `index >= len()`.
    fn get(&self, index: usize) -> Option<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> Iter<'a, Self> {
        Iter::new(*self)
    }
}

/// Offset table plus data buffer, both borrowed from the container bytes.
///
/// Record `i` spans `data[O[i]..O[i + 1]]`, the last one ends at `data.len()`.
#[derive(Clone, Copy)]
pub struct RecordTable<'a> {
    offsets: &'a [u8],
    data: &'a [u8],
}

impl<'a> RecordTable<'a> {
    pub(crate) fn from_span(bytes: &'a [u8], span: &RecordSpan) -> Self {
        Self {
            offsets: &bytes[span.offsets.clone()],
            data: &bytes[span.data.clone()],
        }
    }

    /// Parse a standalone record table section: `count, data_len, offsets, data`.
    pub fn parse(section: &'a [u8]) -> Result<Self, FormatError> {
        let span = layout::read_record_span(section, 0..section.len(), "record table")?;
        Ok(Self::from_span(section, &span))
    }

    pub fn len(&self) -> usize {
        self.offsets.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// The shared data buffer `D`.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The offset sequence `O`.
    pub fn offsets(self) -> impl ExactSizeIterator<Item = u32> + 'a {
        self.offsets.chunks_exact(4).map(LE::read_u32)
    }

    fn offset(&self, index: usize) -> Option<usize> {
        let start = index.checked_mul(4)?;
        let end = start.checked_add(4)?;
        self.offsets.get(start..end).map(|b| LE::read_u32(b) as usize)
    }

    pub fn range(&self, index: usize) -> Option<Range<usize>> {
        let start = self.offset(index)?;
        let end = self.offset(index + 1).unwrap_or(self.data.len());
        (start <= end && end <= self.data.len()).then_some(start..end)
    }

    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        self.range(index).map(|range| &self.data[range])
    }

    pub fn at(&self, index: usize) -> Result<&'a [u8], FormatError> {
        self.get(index).ok_or(FormatError::IndexOutOfRange {
            index,
            len: self.len(),
        })
    }
}

impl std::fmt::Debug for RecordTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordTable")
            .field("len", &self.len())
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Variable-length byte records.
#[derive(Debug, Clone, Copy)]
pub struct BlobStore<'a> {
    table: RecordTable<'a>,
}

impl<'a> BlobStore<'a> {
    pub fn new(table: RecordTable<'a>) -> Self {
        Self { table }
    }

    pub fn parse(section: &'a [u8]) -> Result<Self, FormatError> {
        RecordTable::parse(section).map(Self::new)
    }

    pub fn records(&self) -> RecordTable<'a> {
        self.table
    }

    pub fn at(&self, index: usize) -> Result<&'a [u8], FormatError> {
        self.table.at(index)
    }
}

impl<'a> Table<'a> for BlobStore<'a> {
    type Item = &'a [u8];

    fn len(&self) -> usize {
        self.table.len()
    }

    fn get(&self, index: usize) -> Option<&'a [u8]> {
        self.table.get(index)
    }
}

/// Variable-length UTF-8 records.
///
/// Construction checks every record, so lookups never fail on encoding.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    table: RecordTable<'a>,
}

impl<'a> StringTable<'a> {
    pub fn new(table: RecordTable<'a>) -> Result<Self, FormatError> {
        for index in 0..table.len() {
            let bytes = table.at(index)?;
            if std::str::from_utf8(bytes).is_err() {
                return Err(FormatError::InvalidUtf8 { index });
            }
        }
        Ok(Self { table })
    }

    pub fn parse(section: &'a [u8]) -> Result<Self, FormatError> {
        Self::new(RecordTable::parse(section)?)
    }

    /// Skip the UTF-8 scan for a table already checked through [`StringTable::new`].
    pub(crate) fn from_checked(table: RecordTable<'a>) -> Self {
        Self { table }
    }

    pub fn records(&self) -> RecordTable<'a> {
        self.table
    }

    pub fn at(&self, index: usize) -> Result<&'a str, FormatError> {
        let bytes = self.table.at(index)?;
        std::str::from_utf8(bytes).map_err(|_| FormatError::InvalidUtf8 { index })
    }
}

impl<'a> Table<'a> for StringTable<'a> {
    type Item = &'a str;

    fn len(&self) -> usize {
        self.table.len()
    }

    fn get(&self, index: usize) -> Option<&'a str> {
        self.at(index).ok()
    }
}

/// Locate a string table section and check its encoding.
pub(crate) fn read_string_span(bytes: &[u8], section: Range<usize>, what: &str) -> Result<RecordSpan, FormatError> {
    let span = layout::read_record_span(bytes, section, what)?;
    StringTable::new(RecordTable::from_span(bytes, &span))?;
    Ok(span)
}

/// Forward and backward iteration over a table, in index order.
///
/// The iterator owns a copy of its table view, so a position can only ever
/// refer to records of that table.
#[derive(Debug, Clone)]
pub struct Iter<'a, T: Table<'a>> {
    table: T,
    front: usize,
    back: usize,
    _marker: std::marker::PhantomData<&'a ()>,
}

impl<'a, T: Table<'a>> Iter<'a, T> {
    fn new(table: T) -> Self {
        Self {
            front: 0,
            back: table.len(),
            table,
            _marker: std::marker::PhantomData,
        }
    }

    /// Index of the next record `next()` yields.
    pub fn position(&self) -> usize {
        self.front
    }
}

impl<'a, T: Table<'a>> Iterator for Iter<'a, T> {
    type Item = T::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.table.get(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<'a, T: Table<'a>> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.table.get(self.back)
    }
}

impl<'a, T: Table<'a>> ExactSizeIterator for Iter<'a, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::pack_records;

    fn section<T: AsRef<[u8]>>(records: &[T]) -> Vec<u8> {
        let mut out = vec![];
        pack_records(records).unwrap().write_section(&mut out).unwrap();
        out
    }

    #[test]
    fn test_round_trip_with_empty_records() {
        let records: [&[u8]; 6] = [b"", b"abc", b"", b"", b"de", b""];
        let bytes = section(&records);
        let blobs = BlobStore::parse(&bytes).unwrap();

        assert_eq!(blobs.len(), records.len());
        for (i, record) in records.iter().enumerate() {
            assert_eq!(blobs.at(i).unwrap(), *record);
        }
        assert_eq!(blobs.iter().collect::<Vec<_>>(), records.to_vec());
    }

    #[test]
    fn test_offsets_are_monotonic() {
        let bytes = section(&["one", "", "three", "four"]);
        let table = RecordTable::parse(&bytes).unwrap();
        let offsets: Vec<u32> = table.offsets().collect();

        assert_eq!(offsets, vec![0, 3, 3, 8]);
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        assert!(*offsets.last().unwrap() as usize <= table.data().len());
        assert_eq!(table.data(), b"onethreefour");
    }

    #[test]
    fn test_empty_table() {
        let bytes = section::<&[u8]>(&[]);
        let table = BlobStore::parse(&bytes).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.iter().next(), None);
        assert!(table.at(0).is_err());
    }

    #[test]
    fn test_out_of_range() {
        let bytes = section(&["a", "b"]);
        let strings = StringTable::parse(&bytes).unwrap();
        assert_eq!(strings.get(2), None);
        assert!(matches!(
            strings.at(2),
            Err(FormatError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(strings.at(usize::MAX).is_err());
    }

    #[test]
    fn test_huge_index_is_out_of_range() {
        let bytes = section(&["a", "b"]);
        let blobs = BlobStore::parse(&bytes).unwrap();
        for index in [usize::MAX / 4, usize::MAX / 4 + 1, usize::MAX - 1, usize::MAX] {
            assert_eq!(blobs.get(index), None);
            assert!(matches!(
                blobs.at(index),
                Err(FormatError::IndexOutOfRange { len: 2, .. })
            ));
        }
    }

    #[test]
    fn test_string_table_rejects_invalid_utf8() {
        let bytes = section(&[b"ok".as_slice(), [0xFFu8, 0xFE].as_slice()]);
        assert!(matches!(
            StringTable::parse(&bytes),
            Err(FormatError::InvalidUtf8 { index: 1 })
        ));
        // same bytes are fine as blobs
        assert_eq!(BlobStore::parse(&bytes).unwrap().at(1).unwrap(), &[0xFF, 0xFE]);
    }

    #[test]
    fn test_iterator_is_restartable_and_reversible() {
        let bytes = section(&["x", "y", "z"]);
        let strings = StringTable::parse(&bytes).unwrap();

        let mut iter = strings.iter();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next(), Some("x"));
        assert_eq!(iter.position(), 1);
        assert_eq!(iter.next_back(), Some("z"));
        assert_eq!(iter.collect::<Vec<_>>(), vec!["y"]);

        assert_eq!(strings.iter().rev().collect::<Vec<_>>(), vec!["z", "y", "x"]);
        assert_eq!(strings.iter().count(), 3);
    }

    #[test]
    fn test_unicode_records() {
        let records = ["Где я?", "", "Вы рады?"];
        let bytes = section(&records);
        let strings = StringTable::parse(&bytes).unwrap();
        assert_eq!(strings.iter().collect::<Vec<_>>(), records);
    }
}
