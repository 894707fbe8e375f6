//! Named-section storage
//!
//! Indexes are persisted as a handful of named byte sections. A container
//! only has to hand out an immutable byte range per name; whether that range
//! lives in a heap buffer or a memory-mapped file is invisible to readers.

mod dir;
mod memory;

pub use dir::DirContainer;
pub use memory::MemoryContainer;

use memmap2::Mmap;
use std::fmt;
use std::ops::{Deref, Range};
use std::sync::Arc;

use crate::error::Result;

#[derive(Clone)]
enum Backing {
    Owned(Arc<Vec<u8>>),
    Mapped(Arc<Mmap>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Owned(v) => v.as_slice(),
            Backing::Mapped(m) => &m[..],
        }
    }
}

/// Immutable, cheaply clonable byte range of a section
///
/// Clones and sub-slices share the backing buffer or mapping.
#[derive(Clone)]
pub struct SectionBytes {
    backing: Backing,
    range: Range<usize>,
}

impl SectionBytes {
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            backing: Backing::Owned(Arc::new(data)),
            range: 0..len,
        }
    }

    pub fn from_mmap(mmap: Arc<Mmap>) -> Self {
        let len = mmap.len();
        Self {
            backing: Backing::Mapped(mmap),
            range: 0..len,
        }
    }

    pub fn len(&self) -> usize {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.start == self.range.end
    }

    /// True when the bytes live in a memory-mapped file
    pub fn is_mapped(&self) -> bool {
        matches!(self.backing, Backing::Mapped(_))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.backing.bytes()[self.range.clone()]
    }

    /// Sub-range relative to this slice
    ///
    /// Panics if `range` is out of bounds; callers check lengths first.
    pub fn slice(&self, range: Range<usize>) -> Self {
        assert!(
            range.start <= range.end && range.end <= self.len(),
            "section slice {:?} out of bounds (len {})",
            range,
            self.len()
        );
        Self {
            backing: self.backing.clone(),
            range: self.range.start + range.start..self.range.start + range.end,
        }
    }

    /// Copy into a private heap buffer, detaching from any mapping
    pub fn to_owned_copy(&self) -> Self {
        Self::from_vec(self.as_slice().to_vec())
    }
}

impl Deref for SectionBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for SectionBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionBytes")
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

/// Read side of a container: open a named section for random access
pub trait SectionSource {
    /// Open a section; `Error::MissingSection` if absent
    fn open_section(&self, name: &str) -> Result<SectionBytes>;

    fn has_section(&self, name: &str) -> bool;
}

/// Write side of a container
pub trait SectionSink {
    /// Write (or replace) a whole section
    fn write_section(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_shares_backing() {
        let bytes = SectionBytes::from_vec((0u8..16).collect());
        let mid = bytes.slice(4..12);
        assert_eq!(mid.len(), 8);
        assert_eq!(mid[0], 4);
        let inner = mid.slice(2..4);
        assert_eq!(inner.as_slice(), &[6, 7]);
        assert!(!inner.is_mapped());
    }

    #[test]
    #[should_panic]
    fn test_slice_out_of_bounds_panics() {
        let bytes = SectionBytes::from_vec(vec![1, 2, 3]);
        let _ = bytes.slice(1..4);
    }

    #[test]
    fn test_owned_copy_is_detached() {
        let bytes = SectionBytes::from_vec(vec![9, 8, 7, 6]).slice(1..3);
        let copy = bytes.to_owned_copy();
        assert_eq!(copy.as_slice(), &[8, 7]);
        assert_eq!(copy.len(), 2);
    }
}
