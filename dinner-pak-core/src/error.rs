use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PakError>;

#[derive(Debug, thiserror::Error)]
pub enum PakError {
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("Upstream IO Error: {0}")]
    IO(#[from] std::io::Error),
}

/// Failures while opening or writing a container file.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error on {}: {source}", path.display())]
    IO {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound(path)
        } else {
            FileError::IO { path, source }
        }
    }
}

/// Structural violations of the container format.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Cardinality mismatch: {names} names, {data} data records")]
    CardinalityMismatch { names: usize, data: usize },
    #[error("Index {index} out of range for table of {len} records")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Malformed container: {0}")]
    Malformed(String),
    #[error("Invalid container magic: expected {expected:X?}, found {found:X?}")]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },
    #[error("Duplicate resource name: {0}")]
    DuplicateName(String),
    #[error("Record {index} is not valid UTF-8")]
    InvalidUtf8 { index: usize },
    #[error("Table exceeds the 4 GiB limit of 32-bit offsets")]
    TooLarge,
}

impl FormatError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        FormatError::Malformed(msg.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Resource not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let err = FileError::io("a.pak", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(err, FileError::NotFound(path) if path == PathBuf::from("a.pak")));

        let err = FileError::io("a.pak", std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(err, FileError::IO { .. }));
    }
}
