//! Loading container bytes from disk.
//!
//! With the `mmap` feature (default) read-only opens map the file instead of
//! copying it into a buffer.

use std::fs;
use std::io;
use std::path::Path;

/// File contents: either an owned buffer or a memory-mapped region.
pub(crate) enum FileData {
    Owned(Vec<u8>),
    #[cfg(feature = "mmap")]
    Mmap(MmapReader),
}

impl FileData {
    pub(crate) fn as_bytes(&self) -> &[u8] {
        match self {
            FileData::Owned(v) => v,
            #[cfg(feature = "mmap")]
            FileData::Mmap(r) => r.as_bytes(),
        }
    }

    /// Map the file when possible, otherwise read it.
    pub(crate) fn load(path: &Path, map: bool) -> io::Result<Self> {
        #[cfg(feature = "mmap")]
        if map {
            return MmapReader::open(path).map(FileData::Mmap);
        }
        let _ = map;
        fs::read(path).map(FileData::Owned)
    }
}

/// Read-only memory map of a whole file.
#[cfg(feature = "mmap")]
pub(crate) struct MmapReader {
    _file: fs::File,
    mmap: memmap2::Mmap,
}

#[cfg(feature = "mmap")]
impl MmapReader {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = fs::File::open(path)?;
        // SAFETY: read-only mapping; the container is parsed into owned
        // objects immediately and the map is dropped with this reader.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }
}
