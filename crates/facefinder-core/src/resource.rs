//! Read-only access to bundled model and label resources.
//!
//! Resource paths are relative to a store root and may carry a scheme prefix
//! (`asset:///labels.txt`, `file:///models/face.onnx`), which is stripped before
//! resolution. Models are memory-mapped rather than read onto the heap.

use std::fs::File;
use std::io;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

/// A read-only source of bundled resources.
pub trait ResourceStore {
    /// Open the byte region backing a resource, for memory mapping.
    fn open_region(&self, path: &str) -> io::Result<ResourceRegion>;

    /// Read a resource as UTF-8 text.
    fn read_to_string(&self, path: &str) -> io::Result<String>;

    /// Best-effort filesystem location of a resource, used in error messages.
    fn locate(&self, path: &str) -> PathBuf {
        PathBuf::from(strip_scheme(path))
    }
}

/// An open file plus the byte range inside it that holds one resource.
///
/// Packed stores can expose a resource as a slice of a larger archive; plain
/// directories use the whole file.
#[derive(Debug)]
pub struct ResourceRegion {
    pub file: File,
    pub offset: u64,
    pub len: usize,
}

impl ResourceRegion {
    /// Memory-map the region read-only.
    pub fn map(&self) -> io::Result<MappedModel> {
        if self.len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "resource region is empty",
            ));
        }
        // SAFETY: The mapping is read-only. Bundled resources must not be
        // modified or truncated while a session holds the map.
        let mmap = unsafe {
            MmapOptions::new()
                .offset(self.offset)
                .len(self.len)
                .map(&self.file)?
        };
        Ok(MappedModel { mmap })
    }
}

/// Read-only memory map of a compiled model.
#[derive(Debug)]
pub struct MappedModel {
    mmap: Mmap,
}

impl Deref for MappedModel {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.mmap
    }
}

impl AsRef<[u8]> for MappedModel {
    fn as_ref(&self) -> &[u8] {
        &self.mmap
    }
}

/// Strip a leading `scheme://` (and the slashes after it) from a resource path.
pub fn strip_scheme(path: &str) -> &str {
    match path.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => rest.trim_start_matches('/'),
        _ => path,
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resource store rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DirResourceStore {
    root: PathBuf,
}

impl DirResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a resource path under the root.
    ///
    /// Rejects empty paths, absolute paths and `..` components so lookups
    /// cannot leave the store.
    pub fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = strip_scheme(path);
        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("resource path escapes the store: {path:?}"),
                    ));
                }
            }
        }
        if depth == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("empty resource path: {path:?}"),
            ));
        }
        Ok(resolved)
    }
}

impl ResourceStore for DirResourceStore {
    fn open_region(&self, path: &str) -> io::Result<ResourceRegion> {
        let file = File::open(self.resolve(path)?)?;
        let len = usize::try_from(file.metadata()?.len())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(ResourceRegion {
            file,
            offset: 0,
            len,
        })
    }

    fn read_to_string(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(path)?)
    }

    fn locate(&self, path: &str) -> PathBuf {
        self.resolve(path)
            .unwrap_or_else(|_| self.root.join(strip_scheme(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("asset:///labelmap.txt"), "labelmap.txt");
        assert_eq!(strip_scheme("file:///models/face.onnx"), "models/face.onnx");
        assert_eq!(strip_scheme("labelmap.txt"), "labelmap.txt");
        assert_eq!(strip_scheme("dir/labels.txt"), "dir/labels.txt");
        // Not a scheme: starts with a digit.
        assert_eq!(strip_scheme("1x://a"), "1x://a");
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let store = DirResourceStore::new("/opt/assets");
        assert_eq!(
            store.resolve("asset:///face.onnx").unwrap(),
            PathBuf::from("/opt/assets/face.onnx")
        );
        assert!(store.resolve("../secret").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("asset://").is_err());
    }

    #[test]
    fn test_read_and_map_resources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("labels.txt"), "a\nb\n").unwrap();
        std::fs::write(dir.path().join("model.bin"), [1u8, 2, 3, 4]).unwrap();
        let store = DirResourceStore::new(dir.path());

        assert_eq!(store.read_to_string("asset:///labels.txt").unwrap(), "a\nb\n");

        let region = store.open_region("model.bin").unwrap();
        assert_eq!(region.len, 4);
        let mapped = region.map().unwrap();
        assert_eq!(&mapped[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_model_region_fails_to_map() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.bin"), b"").unwrap();
        let store = DirResourceStore::new(dir.path());

        let region = store.open_region("empty.bin").unwrap();
        let err = region.map().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_missing_resource_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirResourceStore::new(dir.path());
        let err = store.open_region("missing.onnx").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
