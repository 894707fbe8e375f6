//! In-memory container

use parking_lot::RwLock;
use std::collections::HashMap;

use super::{SectionBytes, SectionSink, SectionSource};
use crate::error::{Error, Result};

/// Heap-backed container, mostly for tests and small datasets
#[derive(Default)]
pub struct MemoryContainer {
    sections: RwLock<HashMap<String, SectionBytes>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all sections, sorted
    pub fn section_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sections.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn remove_section(&self, name: &str) -> bool {
        self.sections.write().remove(name).is_some()
    }

    /// Raw copy of a section's bytes
    pub fn section_bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.sections.read().get(name).map(|b| b.as_slice().to_vec())
    }
}

impl SectionSource for MemoryContainer {
    fn open_section(&self, name: &str) -> Result<SectionBytes> {
        self.sections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MissingSection(name.to_string()))
    }

    fn has_section(&self, name: &str) -> bool {
        self.sections.read().contains_key(name)
    }
}

impl SectionSink for MemoryContainer {
    fn write_section(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.sections
            .write()
            .insert(name.to_string(), SectionBytes::from_vec(bytes.to_vec()));
        Ok(())
    }
}
