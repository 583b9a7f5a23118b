use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use crate::error::{FileError, Result};

/// Read-only bytes of a whole container file.
///
/// Every table view handed out by a container borrows from this value, so the
/// mapping outlives all of them and is released exactly once on drop.
pub struct MappedBytes {
    path: Option<PathBuf>,
    inner: MappedBytesInner,
}

enum MappedBytesInner {
    Mmap { mmap: Mmap },
    Memory { bytes: Box<[u8]> },
}

impl MappedBytes {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FileError::NotFound(path.to_path_buf()).into());
        }

        let file = File::open(path).map_err(|e| FileError::io(path, e))?;
        // SAFETY: read-only mapping; containers are immutable once written and the
        // file handle is kept alive by the mapping itself.
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| FileError::io(path, e))?;
        tracing::debug!(path = %path.display(), len = mmap.len(), "mapped container file");

        Ok(Self {
            path: Some(path.to_path_buf()),
            inner: MappedBytesInner::Mmap { mmap },
        })
    }

    /// Wrap bytes already in memory, e.g. a freshly built container.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            path: None,
            inner: MappedBytesInner::Memory {
                bytes: bytes.into_boxed_slice(),
            },
        }
    }

    /// Source path, `None` for in-memory bytes.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.inner {
            MappedBytesInner::Mmap { mmap } => mmap,
            MappedBytesInner::Memory { bytes } => bytes,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.inner, MappedBytesInner::Mmap { .. })
    }
}

impl Deref for MappedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for MappedBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedBytes")
            .field("path", &self.path)
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::PakError;

    #[test]
    fn test_open_maps_whole_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello mapped world").unwrap();
        file.flush().unwrap();

        let bytes = MappedBytes::open(file.path()).unwrap();
        assert!(bytes.is_mapped());
        assert_eq!(&*bytes, b"hello mapped world");
        assert_eq!(bytes.path(), Some(file.path()));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MappedBytes::open(dir.path().join("missing.pak")).unwrap_err();
        assert!(matches!(err, PakError::File(FileError::NotFound(_))));
    }

    #[test]
    fn test_from_vec() {
        let bytes = MappedBytes::from_vec(vec![1, 2, 3]);
        assert!(!bytes.is_mapped());
        assert_eq!(bytes.as_bytes(), &[1, 2, 3]);
        assert!(bytes.path().is_none());
    }
}
