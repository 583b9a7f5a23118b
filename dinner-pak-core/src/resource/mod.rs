//! Named-resource archive.

mod manifest;

use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};

pub use manifest::*;

use crate::data::{Iter, NamedData, NamedDataStorage, NamedSpan, Table};
use crate::error::{FormatError, LookupError, PakError, Result};
use crate::layout::{self, RESOURCE_PACK_MAGIC};
use crate::mapped::MappedBytes;
use crate::write::{self, ContainerWriter, PackOptions, RecordTableBuilder};

const SECTION_COUNT: usize = 2;

/// Something a resource can be addressed by: its index or its exact name.
pub trait ResourceKey {
    fn resolve(&self, pack: &ResourcePack) -> Result<usize>;
}

impl ResourceKey for usize {
    fn resolve(&self, pack: &ResourcePack) -> Result<usize> {
        if *self < pack.len() {
            Ok(*self)
        } else {
            Err(FormatError::IndexOutOfRange {
                index: *self,
                len: pack.len(),
            }
            .into())
        }
    }
}

impl ResourceKey for u32 {
    fn resolve(&self, pack: &ResourcePack) -> Result<usize> {
        (*self as usize).resolve(pack)
    }
}

impl ResourceKey for str {
    fn resolve(&self, pack: &ResourcePack) -> Result<usize> {
        pack.index_of(self)
            .ok_or_else(|| LookupError::NotFound(self.to_string()).into())
    }
}

impl ResourceKey for &str {
    fn resolve(&self, pack: &ResourcePack) -> Result<usize> {
        (**self).resolve(pack)
    }
}

impl ResourceKey for String {
    fn resolve(&self, pack: &ResourcePack) -> Result<usize> {
        self.as_str().resolve(pack)
    }
}

/// A resource pack opened from disk (or memory).
///
/// Names are unique; the name index is built once at open and never changes.
pub struct ResourcePack {
    bytes: MappedBytes,
    resources: NamedSpan,
    index_by_name: FxHashMap<String, u32>,
}

impl ResourcePack {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pack = Self::from_mapped(MappedBytes::open(path)?)?;
        tracing::info!(path = ?pack.bytes.path(), resources = pack.len(), "opened resource pack");
        Ok(pack)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_mapped(MappedBytes::from_vec(bytes))
    }

    fn from_mapped(bytes: MappedBytes) -> Result<Self> {
        let sections = layout::read_sections(&bytes, RESOURCE_PACK_MAGIC, SECTION_COUNT)?;
        let resources = NamedSpan::read(&bytes, sections[0].clone(), sections[1].clone(), "resource")?;

        let storage = resources.view(&bytes);
        let mut index_by_name = FxHashMap::default();
        index_by_name.reserve(storage.len());
        for (index, name) in storage.names().iter().enumerate() {
            if index_by_name.insert(name.to_string(), index as u32).is_some() {
                return Err(FormatError::DuplicateName(name.to_string()).into());
            }
        }

        Ok(Self {
            bytes,
            resources,
            index_by_name,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.bytes.path()
    }

    pub fn resources(&self) -> NamedDataStorage<'_> {
        self.resources.view(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.index_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_by_name.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).map(|index| *index as usize)
    }

    /// Resource bytes by index (`IndexOutOfRange`) or by name (`LookupError::NotFound`).
    pub fn get<K: ResourceKey + ?Sized>(&self, key: &K) -> Result<&[u8]> {
        let index = key.resolve(self)?;
        Ok(self.resources().data().at(index)?)
    }

    pub fn entry<K: ResourceKey + ?Sized>(&self, key: &K) -> Result<NamedData<'_>> {
        let index = key.resolve(self)?;
        Ok(self.resources().at(index)?)
    }

    pub fn iter(&self) -> Iter<'_, NamedDataStorage<'_>> {
        self.resources().iter()
    }
}

impl std::fmt::Debug for ResourcePack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePack")
            .field("bytes", &self.bytes)
            .field("resources", &self.len())
            .finish()
    }
}

/// Builds a resource pack in one pass over its resources.
#[derive(Debug, Default)]
pub struct ResourcePackBuilder {
    names: RecordTableBuilder,
    data: RecordTableBuilder,
    seen: FxHashSet<String>,
}

impl ResourcePackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every manifest source, in order.
    pub fn from_manifest(manifest: &ResourceManifest) -> Result<Self> {
        let contents = manifest.read_sources()?;
        let mut builder = Self::new();
        for (source, data) in manifest.sources.iter().zip(contents) {
            builder.add(&source.name, data)?;
        }
        Ok(builder)
    }

    /// Append a resource and return its index; names must be unique.
    ///
    /// On error nothing is added, so the builder stays consistent.
    pub fn add(&mut self, name: &str, data: impl AsRef<[u8]>) -> Result<u32> {
        let data = data.as_ref();
        if self.seen.contains(name) {
            return Err(FormatError::DuplicateName(name.to_string()).into());
        }
        self.names.check_room(name.len())?;
        self.data.check_room(data.len())?;

        let index = self.names.push(name)?;
        self.data.push(data)?;
        self.seen.insert(name.to_string());
        tracing::debug!(index, name, "packed resource");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn build(self) -> Result<Vec<u8>> {
        let mut writer = ContainerWriter::new(RESOURCE_PACK_MAGIC);
        writer
            .add_records(&self.names.finish())
            .add_records(&self.data.finish());
        writer.finish().map_err(PakError::from)
    }

    pub fn write(self, path: impl AsRef<Path>, options: &PackOptions) -> Result<()> {
        let count = self.len();
        let bytes = self.build()?;
        write::write_file(path.as_ref(), &bytes, options)?;
        tracing::info!(path = %path.as_ref().display(), resources = count, "resource pack written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileError;

    fn sample() -> ResourcePack {
        let mut builder = ResourcePackBuilder::new();
        builder.add("font", b"TTF-BYTES").unwrap();
        builder.add("music/theme.ogg", b"OGG").unwrap();
        builder.add("empty", b"").unwrap();
        ResourcePack::from_bytes(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_lookup_by_name_and_index() {
        let pack = sample();
        let index = pack.index_of("font").unwrap();
        assert_eq!(pack.get("font").unwrap(), pack.get(&index).unwrap());
        assert_eq!(pack.get("font").unwrap(), b"TTF-BYTES");
        assert_eq!(pack.get(&2usize).unwrap(), b"");
        assert_eq!(pack.entry("music/theme.ogg").unwrap().data, b"OGG");
    }

    #[test]
    fn test_missing_name() {
        let pack = sample();
        assert!(matches!(
            pack.get("missing"),
            Err(PakError::Lookup(LookupError::NotFound(name))) if name == "missing"
        ));
        // lookups are case-sensitive
        assert!(pack.get("FONT").is_err());
    }

    #[test]
    fn test_index_out_of_range() {
        let pack = sample();
        assert!(matches!(
            pack.get(&3usize),
            Err(PakError::Format(FormatError::IndexOutOfRange { index: 3, len: 3 }))
        ));
    }

    #[test]
    fn test_iteration_order() {
        let pack = sample();
        let names: Vec<&str> = pack.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["font", "music/theme.ogg", "empty"]);
    }

    #[test]
    fn test_duplicate_name_rejected_at_build() {
        let mut builder = ResourcePackBuilder::new();
        builder.add("font", b"a").unwrap();
        assert!(matches!(
            builder.add("font", b"b"),
            Err(PakError::Format(FormatError::DuplicateName(name))) if name == "font"
        ));
        assert_eq!(builder.len(), 1);

        // the rejected add leaves names and data in step
        builder.add("theme", b"c").unwrap();
        let pack = ResourcePack::from_bytes(builder.build().unwrap()).unwrap();
        assert_eq!(pack.len(), 2);
        assert_eq!(pack.resources().data().len(), 2);
        assert_eq!(pack.get("font").unwrap(), b"a");
        assert_eq!(pack.get("theme").unwrap(), b"c");
    }

    #[test]
    fn test_duplicate_name_rejected_at_open() {
        // bypass the builder's check to produce a file with a name collision
        let mut writer = ContainerWriter::new(RESOURCE_PACK_MAGIC);
        writer
            .add_records(&write::pack_records(["a", "a"]).unwrap())
            .add_records(&write::pack_records(["1", "2"]).unwrap());
        let bytes = writer.finish().unwrap();
        assert!(matches!(
            ResourcePack::from_bytes(bytes),
            Err(PakError::Format(FormatError::DuplicateName(_)))
        ));
    }

    #[test]
    fn test_cardinality_mismatch_rejected_at_open() {
        let mut writer = ContainerWriter::new(RESOURCE_PACK_MAGIC);
        writer
            .add_records(&write::pack_records(["a", "b"]).unwrap())
            .add_records(&write::pack_records(["1"]).unwrap());
        assert!(matches!(
            ResourcePack::from_bytes(writer.finish().unwrap()),
            Err(PakError::Format(FormatError::CardinalityMismatch { names: 2, data: 1 }))
        ));
    }

    #[test]
    fn test_wrong_magic() {
        let mut builder = crate::story::StoryPackBuilder::new();
        builder.add_narration("hello").unwrap();
        let bytes = builder.build().unwrap();
        assert!(matches!(
            ResourcePack::from_bytes(bytes),
            Err(PakError::Format(FormatError::InvalidMagic { .. }))
        ));
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui.repa");
        let mut builder = ResourcePackBuilder::new();
        builder.add("font", b"TTF").unwrap();
        builder.write(&path, &PackOptions::new()).unwrap();

        let pack = ResourcePack::open(&path).unwrap();
        assert_eq!(pack.path(), Some(path.as_path()));
        assert_eq!(pack.get("font").unwrap(), b"TTF");

        assert!(matches!(
            ResourcePack::open(dir.path().join("nope.repa")),
            Err(PakError::File(FileError::NotFound(_)))
        ));
    }
}
