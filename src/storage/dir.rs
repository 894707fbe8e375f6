//! Directory container with memory-mapped reads
//!
//! Each section is stored as `<root>/<name>.sec`. Reads map the file; the OS
//! page cache does the caching. Writes go to `<name>.sec.tmp` and are renamed
//! into place once flushed.

use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{SectionBytes, SectionSink, SectionSource};
use crate::error::{Error, Result};

const SECTION_EXT: &str = "sec";

#[derive(Debug, Clone)]
pub struct DirContainer {
    root: PathBuf,
}

impl DirContainer {
    /// Open an existing directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Create the directory (and parents) if needed
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self::new(root))
    }

    /// File backing a section
    pub fn section_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{SECTION_EXT}"))
    }
}

impl SectionSource for DirContainer {
    fn open_section(&self, name: &str) -> Result<SectionBytes> {
        let path = self.section_path(name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::MissingSection(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        // SAFETY: sections are written once through a rename and never
        // modified in place afterwards.
        let mmap = unsafe { Mmap::map(&file)? };
        tracing::trace!(section = name, bytes = mmap.len(), "mapped section");
        Ok(SectionBytes::from_mmap(Arc::new(mmap)))
    }

    fn has_section(&self, name: &str) -> bool {
        self.section_path(name).is_file()
    }
}

impl SectionSink for DirContainer {
    fn write_section(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.section_path(name);
        let tmp = path.with_extension(format!("{SECTION_EXT}.tmp"));

        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&tmp, &path)?;
        tracing::debug!(section = name, bytes = bytes.len(), path = %path.display(), "wrote section");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_mmap() {
        let dir = tempfile::tempdir().unwrap();
        let container = DirContainer::create(dir.path().join("idx")).unwrap();
        container.write_section("ftseg.offsets", &[1, 2, 3, 4]).unwrap();

        assert!(container.has_section("ftseg.offsets"));
        assert!(container.section_path("ftseg.offsets").ends_with("ftseg.offsets.sec"));

        let bytes = container.open_section("ftseg.offsets").unwrap();
        assert!(bytes.is_mapped());
        assert_eq!(bytes.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_file_is_missing_section() {
        let dir = tempfile::tempdir().unwrap();
        let container = DirContainer::new(dir.path());
        assert!(!container.has_section("ftseg.bits"));
        assert!(matches!(
            container.open_section("ftseg.bits"),
            Err(Error::MissingSection(_))
        ));
    }

    #[test]
    fn test_rewrite_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let container = DirContainer::new(dir.path());
        container.write_section("s", b"first").unwrap();
        container.write_section("s", b"second").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["s.sec".to_string()]);
        assert_eq!(container.open_section("s").unwrap().as_slice(), b"second");
    }
}
