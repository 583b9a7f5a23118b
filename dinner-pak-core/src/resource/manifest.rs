use std::path::{Path, PathBuf};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::error::{FileError, PakError, Result};

/// A named input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub path: PathBuf,
}

/// Ordered list of resources to pack.
///
/// Manifests are JSON only; YAML manifests from older packaging tools must be
/// converted first.
///
/// ```json
/// { "sources": [ { "name": "font", "path": "fonts/main.ttf" } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceManifest {
    pub sources: Vec<Source>,
}

impl ResourceManifest {
    /// Load a JSON manifest. Relative source paths resolve against the manifest's directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| FileError::io(path, e))?;
        let mut manifest: Self = serde_json::from_str(&text)?;

        resolve_relative(&mut manifest.sources, path.parent().unwrap_or(Path::new("")));
        Ok(manifest)
    }

    /// Every file under `dir`, named by its `/`-separated relative path, in sorted order.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(FileError::NotFound(dir.to_path_buf()).into());
        }

        let mut sources = Vec::new();
        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                FileError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            sources.push(Source {
                name,
                path: entry.path().to_path_buf(),
            });
        }
        Ok(Self { sources })
    }

    pub fn push(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.sources.push(Source {
            name: name.into(),
            path: path.into(),
        });
    }

    /// Read every source file; the result is in manifest order.
    pub fn read_sources(&self) -> Result<Vec<Vec<u8>>> {
        read_sources(&self.sources)
    }
}

pub(crate) fn resolve_relative(sources: &mut [Source], base: &Path) {
    for source in sources {
        if source.path.is_relative() {
            source.path = base.join(&source.path);
        }
    }
}

/// Read source files in parallel, keeping their order.
pub fn read_sources(sources: &[Source]) -> Result<Vec<Vec<u8>>> {
    sources
        .par_iter()
        .map(|source| {
            tracing::debug!(name = %source.name, path = %source.path.display(), "reading source");
            std::fs::read(&source.path).map_err(|e| PakError::from(FileError::io(&source.path, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("resources.json");
        std::fs::write(
            &manifest_path,
            r#"{ "sources": [ { "name": "font", "path": "fonts/main.ttf" }, { "name": "abs", "path": "/tmp/x" } ] }"#,
        )
        .unwrap();

        let manifest = ResourceManifest::from_path(&manifest_path).unwrap();
        assert_eq!(manifest.sources[0].name, "font");
        assert_eq!(manifest.sources[0].path, dir.path().join("fonts/main.ttf"));
        assert_eq!(manifest.sources[1].path, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_from_path_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("resources.json");
        std::fs::write(&manifest_path, "{ sources: ").unwrap();
        assert!(matches!(
            ResourceManifest::from_path(&manifest_path),
            Err(PakError::Manifest(_))
        ));
    }

    #[test]
    fn test_yaml_manifest_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("resources.yaml");
        std::fs::write(&manifest_path, "sources:\n  - name: font\n    path: fonts/main.ttf\n").unwrap();
        assert!(matches!(
            ResourceManifest::from_path(&manifest_path),
            Err(PakError::Manifest(_))
        ));
    }

    #[test]
    fn test_from_dir_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("img")).unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("img").join("bg.png"), "png").unwrap();

        let manifest = ResourceManifest::from_dir(dir.path()).unwrap();
        let names: Vec<&str> = manifest.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "img/bg.png"]);

        let data = manifest.read_sources().unwrap();
        assert_eq!(data, vec![b"a".to_vec(), b"b".to_vec(), b"png".to_vec()]);
    }

    #[test]
    fn test_read_missing_source() {
        let mut manifest = ResourceManifest::default();
        manifest.push("ghost", "/definitely/not/here.bin");
        assert!(matches!(
            manifest.read_sources(),
            Err(PakError::File(FileError::NotFound(_)))
        ));
    }
}
