//! Byte region backing a DBN file: either an owned copy of the whole file
//! or a read-only memory mapping of it.
use crate::error::{DbnError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Buffered,
    Mapped,
}

/// Storage for the file bytes. Dropping a `Mapped` source unmaps it.
#[derive(Debug, Default)]
pub enum ByteSource {
    #[default]
    Unloaded,
    Buffered(Vec<u8>),
    Mapped(Mmap),
}

impl ByteSource {
    /// Read the whole file into an owned buffer.
    pub fn read(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| DbnError::io(path, e))?;
        let len = file.metadata().map_err(|e| DbnError::io(path, e))?.len() as usize;
        let mut buf = Vec::with_capacity(len);
        file.read_to_end(&mut buf).map_err(|e| DbnError::io(path, e))?;
        if buf.len() < len {
            let short = std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("short read: {} of {} bytes", buf.len(), len),
            );
            return Err(DbnError::io(path, short));
        }
        Ok(ByteSource::Buffered(buf))
    }

    /// Map the file read-only and advise sequential access.
    ///
    /// The descriptor is closed when this returns; the mapping stays valid
    /// until the source is dropped.
    pub fn map(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DbnError::io(path, e))?;
        // SAFETY: the mapping is read-only. Concurrent truncation of the file by
        // another process is outside what this reader can guard against.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| DbnError::io(path, e))?;
        #[cfg(unix)]
        if let Err(e) = mmap.advise(memmap2::Advice::Sequential) {
            tracing::debug!(path = %path.display(), error = %e, "madvise(SEQUENTIAL) failed");
        }
        Ok(ByteSource::Mapped(mmap))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ByteSource::Unloaded => &[],
            ByteSource::Buffered(buf) => &buf[..],
            ByteSource::Mapped(mmap) => &mmap[..],
        }
    }

    pub fn len(&self) -> usize { self.as_bytes().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn byte_at(&self, offset: usize) -> Option<u8> { self.as_bytes().get(offset).copied() }

    pub fn mode(&self) -> Option<LoadMode> {
        match self {
            ByteSource::Unloaded => None,
            ByteSource::Buffered(_) => Some(LoadMode::Buffered),
            ByteSource::Mapped(_) => Some(LoadMode::Mapped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn buffered_and_mapped_see_same_bytes() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let f = temp_file(&data);
        let a = ByteSource::read(f.path()).unwrap();
        let b = ByteSource::map(f.path()).unwrap();
        assert_eq!(a.as_bytes(), &data[..]);
        assert_eq!(b.as_bytes(), &data[..]);
        assert_eq!(a.mode(), Some(LoadMode::Buffered));
        assert_eq!(b.mode(), Some(LoadMode::Mapped));
        assert_eq!(b.byte_at(999), Some(data[999]));
        assert_eq!(b.byte_at(1000), None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.dbn");
        assert!(matches!(ByteSource::read(&path), Err(DbnError::Io { .. })));
        assert!(matches!(ByteSource::map(&path), Err(DbnError::Io { .. })));
    }

    #[test]
    fn unloaded_is_empty() {
        let s = ByteSource::default();
        assert!(s.is_empty());
        assert_eq!(s.mode(), None);
    }
}
