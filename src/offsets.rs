//! Node id to segment-range table
//!
//! One `(node_id, offset)` record per node that owns at least one segment.
//! A node's segments occupy `offset..next_offset` (or up to the end of the
//! segment sequence for the last record).

use std::fmt;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::formats::framing::read_u32_le;
use crate::segment::NodeId;
use crate::storage::SectionBytes;

pub const RECORD_SIZE: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SegOffset {
    pub node_id: NodeId,
    pub offset: u32,
}

impl SegOffset {
    pub fn new(node_id: NodeId, offset: u32) -> Self {
        Self { node_id, offset }
    }
}

impl fmt::Debug for SegOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegOffset(node {} @ {})", self.node_id, self.offset)
    }
}

/// Sorted offset records over little-endian `(u32, u32)` pairs
#[derive(Debug, Clone)]
pub struct OffsetIndex {
    records: SectionBytes,
    /// Length of the segment sequence the offsets point into
    total: usize,
}

impl OffsetIndex {
    pub fn from_records(records: &[SegOffset], total: usize) -> Self {
        let mut bytes = Vec::with_capacity(records.len() * RECORD_SIZE);
        for record in records {
            bytes.extend_from_slice(&record.node_id.to_le_bytes());
            bytes.extend_from_slice(&record.offset.to_le_bytes());
        }
        Self {
            records: SectionBytes::from_vec(bytes),
            total,
        }
    }

    /// Attach raw record bytes and check ordering against the segment count
    pub fn from_bytes(section: &str, records: SectionBytes, total: usize) -> Result<Self> {
        if records.len() % RECORD_SIZE != 0 {
            return Err(Error::corrupt(
                section,
                format!("{} bytes is not a whole number of records", records.len()),
            ));
        }
        let index = Self { records, total };
        index.validate(section)?;
        Ok(index)
    }

    fn validate(&self, section: &str) -> Result<()> {
        let mut prev: Option<SegOffset> = None;
        for i in 0..self.len() {
            let rec = self.get(i);
            if rec.offset as usize > self.total {
                return Err(Error::corrupt(
                    section,
                    format!(
                        "record {i} offset {} exceeds segment count {}",
                        rec.offset, self.total
                    ),
                ));
            }
            if let Some(p) = prev {
                if rec.node_id <= p.node_id {
                    return Err(Error::corrupt(
                        section,
                        format!("node ids not increasing at record {i}: {} after {}", rec.node_id, p.node_id),
                    ));
                }
                if rec.offset <= p.offset {
                    return Err(Error::corrupt(
                        section,
                        format!("offsets not increasing at record {i}: {} after {}", rec.offset, p.offset),
                    ));
                }
            }
            prev = Some(rec);
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len() / RECORD_SIZE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> SegOffset {
        let at = i * RECORD_SIZE;
        SegOffset {
            node_id: read_u32_le(&self.records, at),
            offset: read_u32_le(&self.records, at + 4),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = SegOffset> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.records.as_slice()
    }

    /// End of record `i`'s range
    #[inline]
    fn end_of(&self, i: usize) -> usize {
        if i + 1 < self.len() {
            self.get(i + 1).offset as usize
        } else {
            self.total
        }
    }

    /// Half-open segment range of `node_id`; empty when the node has no record
    pub fn range_for(&self, node_id: NodeId) -> Range<usize> {
        let (mut lo, mut hi) = (0usize, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let rec = self.get(mid);
            if rec.node_id < node_id {
                lo = mid + 1;
            } else if rec.node_id > node_id {
                hi = mid;
            } else {
                return rec.offset as usize..self.end_of(mid);
            }
        }
        0..0
    }

    /// Index of the record whose range contains segment `index`
    pub fn record_at(&self, index: usize) -> Option<usize> {
        if index >= self.total {
            return None;
        }
        // first record with offset > index, minus one
        let (mut lo, mut hi) = (0usize, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get(mid).offset as usize <= index {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo.checked_sub(1)
    }

    /// Node owning segment `index`
    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        self.record_at(index).map(|r| self.get(r).node_id)
    }

    /// Last node id with a record
    pub fn max_node_id(&self) -> Option<NodeId> {
        self.len().checked_sub(1).map(|i| self.get(i).node_id)
    }
}
