use std::fs;
use std::io::Write;
use std::path::Path;

use byteorder::{LE, WriteBytesExt};
use zerocopy::{Immutable, IntoBytes};

use crate::error::{FileError, FormatError, Result};
use crate::layout::{Header, SECTION_ALIGN};

/// Accumulates records into one data buffer, recording each start offset.
///
/// This is the only place records are laid out, blob and text tables alike.
#[derive(Debug, Clone, Default)]
pub struct RecordTableBuilder {
    data: Vec<u8>,
    offsets: Vec<u32>,
}

impl RecordTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `TooLarge` if a record of `len` bytes would not fit.
    ///
    /// Builders that keep several tables in step check all of them before
    /// pushing to any.
    pub fn check_room(&self, len: usize) -> std::result::Result<(), FormatError> {
        let fits = u32::try_from(self.offsets.len()).is_ok()
            && self
                .data
                .len()
                .checked_add(len)
                .is_some_and(|end| end <= u32::MAX as usize);
        if fits { Ok(()) } else { Err(FormatError::TooLarge) }
    }

    /// Append a record and return its index.
    pub fn push(&mut self, record: impl AsRef<[u8]>) -> std::result::Result<u32, FormatError> {
        let record = record.as_ref();
        self.check_room(record.len())?;

        let index = self.offsets.len() as u32;
        self.offsets.push(self.data.len() as u32);
        self.data.extend_from_slice(record);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn finish(self) -> PackedTable {
        PackedTable {
            data: self.data,
            offsets: self.offsets,
        }
    }
}

/// Pack records in order into `(data buffer, offset table)`.
pub fn pack_records<I>(records: I) -> std::result::Result<PackedTable, FormatError>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut builder = RecordTableBuilder::new();
    for record in records {
        builder.push(record)?;
    }
    Ok(builder.finish())
}

/// A finished record table, ready to be written as a section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedTable {
    data: Vec<u8>,
    offsets: Vec<u32>,
}

impl PackedTable {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Write `count, data_len, offsets, data`.
    pub fn write_section<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LE>(self.offsets.len() as u32)?;
        writer.write_u32::<LE>(self.data.len() as u32)?;
        for offset in &self.offsets {
            writer.write_u32::<LE>(*offset)?;
        }
        writer.write_all(&self.data)
    }

    fn encode_section(&self) -> Vec<u8> {
        let mut section = Vec::with_capacity(8 + self.offsets.len() * 4 + self.data.len());
        section.extend_from_slice(&(self.offsets.len() as u32).to_le_bytes());
        section.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        for offset in &self.offsets {
            section.extend_from_slice(&offset.to_le_bytes());
        }
        section.extend_from_slice(&self.data);
        section
    }
}

/// Write `count, items`.
pub fn write_fixed_section<T, W>(items: &[T], writer: &mut W) -> std::io::Result<()>
where
    T: IntoBytes + Immutable,
    W: Write,
{
    writer.write_u32::<LE>(items.len() as u32)?;
    writer.write_all(items.as_bytes())
}

fn encode_fixed_section<T: IntoBytes + Immutable>(items: &[T]) -> Vec<u8> {
    let bytes = items.as_bytes();
    let mut section = Vec::with_capacity(4 + bytes.len());
    section.extend_from_slice(&(items.len() as u32).to_le_bytes());
    section.extend_from_slice(bytes);
    section
}

/// Lays sections out behind a header and offset directory.
#[derive(Debug)]
pub struct ContainerWriter {
    magic: [u8; 4],
    sections: Vec<Vec<u8>>,
}

impl ContainerWriter {
    pub fn new(magic: [u8; 4]) -> Self {
        Self {
            magic,
            sections: Vec::new(),
        }
    }

    pub fn add_records(&mut self, table: &PackedTable) -> &mut Self {
        self.sections.push(table.encode_section());
        self
    }

    pub fn add_fixed<T: IntoBytes + Immutable>(&mut self, items: &[T]) -> &mut Self {
        self.sections.push(encode_fixed_section(items));
        self
    }

    pub fn finish(self) -> std::result::Result<Vec<u8>, FormatError> {
        let section_count = self.sections.len();
        let directory_end = Header::SIZE + section_count * 4;

        let mut starts = Vec::with_capacity(section_count);
        let mut pos = directory_end;
        for section in &self.sections {
            pos = pos.next_multiple_of(SECTION_ALIGN);
            starts.push(u32::try_from(pos).map_err(|_| FormatError::TooLarge)?);
            pos += section.len();
        }
        if pos > u32::MAX as usize {
            return Err(FormatError::TooLarge);
        }

        let mut out = Vec::with_capacity(pos);
        out.extend_from_slice(Header::new(self.magic, section_count as u32).as_bytes());
        for start in &starts {
            out.extend_from_slice(&start.to_le_bytes());
        }
        for (section, start) in self.sections.iter().zip(&starts) {
            out.resize(*start as usize, 0);
            out.extend_from_slice(section);
        }

        tracing::debug!(magic = ?String::from_utf8_lossy(&self.magic), sections = section_count, len = out.len(), "container assembled");
        Ok(out)
    }
}

/// Options for writing a container to disk.
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    overwrite: bool,
}

impl PackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an existing output file instead of failing.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Write `bytes` to a temporary file next to `path`, then move it into place.
pub fn write_file(path: impl AsRef<Path>, bytes: &[u8], options: &PackOptions) -> Result<()> {
    let path = path.as_ref();
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| FileError::io(parent, e))?;
    }

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| FileError::io(parent, e))?;
    temp.write_all(bytes).map_err(|e| FileError::io(temp.path(), e))?;
    temp.as_file().sync_all().map_err(|e| FileError::io(temp.path(), e))?;

    let persisted = if options.overwrite {
        temp.persist(path)
    } else {
        temp.persist_noclobber(path)
    };
    persisted.map_err(|e| FileError::IO {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    tracing::info!(path = %path.display(), len = bytes.len(), "container written");
    Ok(())
}
