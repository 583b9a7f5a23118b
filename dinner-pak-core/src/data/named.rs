use std::ops::Range;

use crate::error::FormatError;
use crate::layout::{self, RecordSpan};

use super::record::{BlobStore, RecordTable, StringTable, Table};

/// One `(name, data)` pair; both alias the container bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedData<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
}

/// Parallel name and payload tables of equal length.
#[derive(Debug, Clone, Copy)]
pub struct NamedDataStorage<'a> {
    names: StringTable<'a>,
    data: BlobStore<'a>,
}

impl<'a> NamedDataStorage<'a> {
    pub fn new(names: StringTable<'a>, data: BlobStore<'a>) -> Result<Self, FormatError> {
        if names.len() != data.len() {
            return Err(FormatError::CardinalityMismatch {
                names: names.len(),
                data: data.len(),
            });
        }
        Ok(Self { names, data })
    }

    pub(crate) fn from_checked(names: StringTable<'a>, data: BlobStore<'a>) -> Self {
        debug_assert_eq!(names.len(), data.len());
        Self { names, data }
    }

    pub fn names(&self) -> StringTable<'a> {
        self.names
    }

    pub fn data(&self) -> BlobStore<'a> {
        self.data
    }

    pub fn at(&self, index: usize) -> Result<NamedData<'a>, FormatError> {
        Ok(NamedData {
            name: self.names.at(index)?,
            data: self.data.at(index)?,
        })
    }
}

impl<'a> Table<'a> for NamedDataStorage<'a> {
    type Item = NamedData<'a>;

    fn len(&self) -> usize {
        self.names.len()
    }

    fn get(&self, index: usize) -> Option<NamedData<'a>> {
        self.at(index).ok()
    }
}

/// Validated location of a names/data section pair.
#[derive(Debug, Clone, Default)]
pub(crate) struct NamedSpan {
    names: RecordSpan,
    data: RecordSpan,
}

impl NamedSpan {
    pub fn read(bytes: &[u8], names: Range<usize>, data: Range<usize>, what: &str) -> Result<Self, FormatError> {
        let names = layout::read_record_span(bytes, names, &format!("{what} names"))?;
        let data = layout::read_record_span(bytes, data, &format!("{what} data"))?;
        let span = Self { names, data };

        let names = StringTable::new(RecordTable::from_span(bytes, &span.names))?;
        NamedDataStorage::new(names, BlobStore::new(RecordTable::from_span(bytes, &span.data)))?;
        Ok(span)
    }

    pub fn view<'a>(&self, bytes: &'a [u8]) -> NamedDataStorage<'a> {
        NamedDataStorage::from_checked(
            StringTable::from_checked(RecordTable::from_span(bytes, &self.names)),
            BlobStore::new(RecordTable::from_span(bytes, &self.data)),
        )
    }
}
