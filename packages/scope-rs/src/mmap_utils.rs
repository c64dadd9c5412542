use crate::error::{ConvertError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Read-only view of a capture file.
pub enum FileBytes {
    Mapped(Mmap),
    /// Zero-length files cannot be mapped on every platform.
    Empty,
}

impl AsRef<[u8]> for FileBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileBytes::Mapped(mmap) => mmap,
            FileBytes::Empty => &[],
        }
    }
}

/// Open a file and map it into memory (read-only)
pub fn mmap_file(path: &Path) -> Result<FileBytes> {
    let file = File::open(path).map_err(ConvertError::IoError)?;
    if file.metadata()?.len() == 0 {
        return Ok(FileBytes::Empty);
    }
    // SAFETY: the mapping is read-only and dropped before the next file is opened.
    let mmap = unsafe { Mmap::map(&file).map_err(ConvertError::IoError)? };
    Ok(FileBytes::Mapped(mmap))
}
