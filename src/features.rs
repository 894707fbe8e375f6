//! Feature id translation
//!
//! The backward index keeps one bit per feature. When feature ids are sparse
//! (raw file offsets, say) they are first translated into a dense
//! `0..domain_size` index space.

use crate::error::{Error, Result};
use crate::formats::framing::read_u32_le;
use crate::formats::FeaturesOffsetsSection;
use crate::storage::{SectionBytes, SectionSink, SectionSource};

/// Maps raw feature ids into a dense index space
pub trait FeatureIdTranslator: Send + Sync {
    /// Dense index of `raw_fid`; `None` when the feature is unknown
    fn translate(&self, raw_fid: u32) -> Option<u32>;

    /// Size of the dense index space
    fn domain_size(&self) -> u32;
}

/// Feature ids are already dense
#[derive(Debug, Clone, Copy)]
pub struct IdentityTranslator {
    domain_size: u32,
}

impl IdentityTranslator {
    pub fn new(domain_size: u32) -> Self {
        Self { domain_size }
    }
}

impl FeatureIdTranslator for IdentityTranslator {
    fn translate(&self, raw_fid: u32) -> Option<u32> {
        (raw_fid < self.domain_size).then_some(raw_fid)
    }

    fn domain_size(&self) -> u32 {
        self.domain_size
    }
}

/// Sorted table of raw feature offsets; a feature's index is its position
#[derive(Debug, Clone)]
pub struct FeaturesOffsetsTable {
    entries: SectionBytes,
}

impl FeaturesOffsetsTable {
    /// Build from strictly increasing raw offsets
    pub fn from_offsets<I: IntoIterator<Item = u32>>(offsets: I) -> Result<Self> {
        let mut entries = Vec::new();
        let mut prev: Option<u32> = None;
        for offset in offsets {
            if prev.is_some_and(|p| offset <= p) {
                return Err(Error::corrupt(
                    "features_offsets",
                    format!("feature offsets not increasing: {offset} after {}", prev.unwrap_or(0)),
                ));
            }
            prev = Some(offset);
            entries.extend_from_slice(&offset.to_le_bytes());
        }
        Ok(Self {
            entries: SectionBytes::from_vec(entries),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw offset of the feature at dense index `index`
    pub fn offset_at(&self, index: usize) -> Option<u32> {
        (index < self.len()).then(|| read_u32_le(&self.entries, index * 4))
    }

    pub fn save<S: SectionSink + ?Sized>(&self, sink: &S, section: &str) -> Result<()> {
        let raw = FeaturesOffsetsSection::encode(
            self.len(),
            (0..self.len()).map(|i| read_u32_le(&self.entries, i * 4)),
        );
        sink.write_section(section, &raw)
    }

    pub fn load<S: SectionSource + ?Sized>(source: &S, section: &str, verify: bool) -> Result<Self> {
        let bytes = source.open_section(section)?;
        let entries = FeaturesOffsetsSection::decode(section, &bytes, verify)?;
        let table = Self { entries };
        for i in 1..table.len() {
            let (a, b) = (
                read_u32_le(&table.entries, (i - 1) * 4),
                read_u32_le(&table.entries, i * 4),
            );
            if b <= a {
                return Err(Error::corrupt(
                    section,
                    format!("feature offsets not increasing at {i}: {b} after {a}"),
                ));
            }
        }
        tracing::debug!(section, features = table.len(), "loaded feature offsets");
        Ok(table)
    }
}

impl FeatureIdTranslator for FeaturesOffsetsTable {
    fn translate(&self, raw_fid: u32) -> Option<u32> {
        let (mut lo, mut hi) = (0usize, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let value = read_u32_le(&self.entries, mid * 4);
            match value.cmp(&raw_fid) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(mid as u32),
            }
        }
        None
    }

    fn domain_size(&self) -> u32 {
        self.len() as u32
    }
}
