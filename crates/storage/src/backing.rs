//! Read-only view over a table's record file

use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;

use recstore_core::Result;

/// Memory-mapped bytes of a data file, or nothing for an empty file
///
/// Mapping a zero-length file is not portable, so empty files get an
/// empty slice instead.
pub enum BackingView {
    /// Zero-length file
    Empty,
    /// Read-only mapping of the whole file
    Mapped(Mmap),
}

impl BackingView {
    /// Map the current contents of `file`
    pub fn map(file: &File) -> Result<Self> {
        if file.metadata()?.len() == 0 {
            return Ok(BackingView::Empty);
        }
        // SAFETY: the mapping is read-only and the file is treated as
        // immutable for the lifetime of the view.
        let mmap = unsafe { Mmap::map(file)? };
        Ok(BackingView::Mapped(mmap))
    }
}

impl Deref for BackingView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            BackingView::Empty => &[],
            BackingView::Mapped(mmap) => mmap,
        }
    }
}
