//! Forward mapping: routing node id -> feature segments
//!
//! The mapping is two sections: the compressed sequence of packed segment
//! keys and the offset table slicing it per node. Once attached it is
//! immutable, so any number of threads may query it concurrently.
//!
//! `unmap` must not race with in-flight queries. `&mut self` makes that a
//! compile-time guarantee for plain owners; owners that share the mapping
//! behind a lock or `Arc` have to quiesce readers themselves.

use rustc_hash::FxHashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SegmapConfig;
use crate::error::Result;
use crate::formats::{OffsetsSection, SegmentsSection};
use crate::offsets::{OffsetIndex, SegOffset};
use crate::segment::{FtSeg, NodeId, INVALID_NODE_ID};
use crate::storage::SectionSource;
use crate::succinct::CompressedList;

/// Query key -> `(forward_node, backward_node)`; a missing side is `INVALID_NODE_ID`
pub type ResolvedNodes = FxHashMap<u64, (NodeId, NodeId)>;

#[derive(Debug)]
struct Attached {
    segments: CompressedList,
    offsets: OffsetIndex,
}

#[derive(Debug, Default)]
pub struct ForwardMapping {
    config: SegmapConfig,
    attached: Option<Attached>,
}

impl ForwardMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SegmapConfig) -> Self {
        Self {
            config,
            attached: None,
        }
    }

    pub fn config(&self) -> &SegmapConfig {
        &self.config
    }

    /// Attach by copying both sections into private memory
    pub fn load<S: SectionSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        self.attach(source, true)
    }

    /// Attach zero-copy; reads go straight to the container's bytes
    pub fn map<S: SectionSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        self.attach(source, false)
    }

    fn attach<S: SectionSource + ?Sized>(&mut self, source: &S, copy: bool) -> Result<()> {
        let names = &self.config.sections;
        let verify = self.config.verify_checksums;

        let mut segment_bytes = source.open_section(&names.segments)?;
        let mut offset_bytes = source.open_section(&names.offsets)?;
        if copy {
            segment_bytes = segment_bytes.to_owned_copy();
            offset_bytes = offset_bytes.to_owned_copy();
        }

        let segments = SegmentsSection::decode(&names.segments, &segment_bytes, verify)?;
        let offsets = OffsetsSection::decode(&names.offsets, &offset_bytes, verify, segments.len())?;

        tracing::info!(
            segments = segments.len(),
            nodes = offsets.len(),
            payload_bytes = segments.payload_bytes(),
            zero_copy = !copy,
            "attached forward mapping"
        );
        self.attached = Some(Attached { segments, offsets });
        Ok(())
    }

    /// Detach from the backing storage
    pub fn unmap(&mut self) {
        if self.attached.take().is_some() {
            tracing::debug!("detached forward mapping");
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.attached.is_some()
    }

    /// Half-open index range of `node_id`'s segments; empty for unknown nodes
    pub fn segments_for_node(&self, node_id: NodeId) -> Range<usize> {
        match &self.attached {
            Some(a) => a.offsets.range_for(node_id),
            None => 0..0,
        }
    }

    /// Visit `node_id`'s valid segments in sequence order
    pub fn for_each_segment<F: FnMut(FtSeg)>(&self, node_id: NodeId, mut visit: F) {
        let Some(a) = &self.attached else {
            return;
        };
        for i in a.offsets.range_for(node_id) {
            if let Some(key) = a.segments.get(i) {
                let seg = FtSeg::unpack(key);
                if seg.is_valid() {
                    visit(seg);
                }
            }
        }
    }

    /// Valid segments of `node_id`, collected
    pub fn node_segments(&self, node_id: NodeId) -> Vec<FtSeg> {
        let mut segs = Vec::new();
        self.for_each_segment(node_id, |seg| segs.push(seg));
        segs
    }

    /// Map query segments back to the nodes whose segments cover them
    ///
    /// For every forward entry covering a query segment of the same feature,
    /// the owning node fills the forward slot (entry traversed along the
    /// polyline) or the backward slot (against it); the first node wins.
    /// Segments covered by no entry are absent from the result.
    ///
    /// `cancel` is polled every `cancel_poll_interval` entries. Once it is set
    /// the scan stops and whatever was resolved so far is returned.
    pub fn resolve_nodes<I>(&self, query: I, cancel: &AtomicBool) -> ResolvedNodes
    where
        I: IntoIterator<Item = FtSeg>,
    {
        let mut res = ResolvedNodes::default();
        let Some(a) = &self.attached else {
            return res;
        };

        let mut query: Vec<FtSeg> = query.into_iter().filter(FtSeg::is_valid).collect();
        query.sort_unstable();
        query.dedup();
        if query.is_empty() {
            return res;
        }

        let poll = self.config.poll_interval();
        let offsets = &a.offsets;
        let mut record = 0usize;
        let mut next_start = offsets.iter().next().map_or(usize::MAX, |r| r.offset as usize);
        let mut current: Option<NodeId> = None;

        for (i, key) in a.segments.iter().enumerate() {
            if i % poll == 0 && cancel.load(Ordering::Relaxed) {
                tracing::debug!(scanned = i, resolved = res.len(), "resolve_nodes cancelled");
                return res;
            }
            while i >= next_start {
                current = Some(offsets.get(record).node_id);
                record += 1;
                next_start = if record < offsets.len() {
                    offsets.get(record).offset as usize
                } else {
                    usize::MAX
                };
            }
            let Some(node) = current else {
                continue;
            };

            let seg = FtSeg::unpack(key);
            if !seg.is_valid() {
                continue;
            }
            let first = query.partition_point(|q| q.fid < seg.fid);
            for q in query[first..].iter().take_while(|q| q.fid == seg.fid) {
                if !seg.covers(q) {
                    continue;
                }
                let slot = res
                    .entry(q.pack())
                    .or_insert((INVALID_NODE_ID, INVALID_NODE_ID));
                let side = if seg.is_forward() {
                    &mut slot.0
                } else {
                    &mut slot.1
                };
                if *side == INVALID_NODE_ID {
                    *side = node;
                }
            }
        }

        tracing::trace!(queried = query.len(), resolved = res.len(), "resolve_nodes finished");
        res
    }

    /// Number of stored segment slots, sentinels included
    pub fn segment_count(&self) -> usize {
        self.attached.as_ref().map_or(0, |a| a.segments.len())
    }

    /// Segment slot at `index`, sentinel included
    pub fn segment_at(&self, index: usize) -> Option<FtSeg> {
        self.attached
            .as_ref()
            .and_then(|a| a.segments.get(index))
            .map(FtSeg::unpack)
    }

    /// Node owning the segment slot at `index`
    pub fn node_id_at(&self, index: usize) -> Option<NodeId> {
        self.attached.as_ref().and_then(|a| a.offsets.node_at(index))
    }

    /// Offset records in ascending node id order
    pub fn offset_records(&self) -> Vec<SegOffset> {
        self.attached
            .as_ref()
            .map(|a| a.offsets.iter().collect())
            .unwrap_or_default()
    }

    /// Largest node id owning segments
    pub fn max_node_id(&self) -> Option<NodeId> {
        self.attached.as_ref().and_then(|a| a.offsets.max_node_id())
    }

    /// Debug helper: every `(node, segment)` of feature `fid`
    pub fn dump_segments_by_fid(&self, fid: u32) -> Vec<(NodeId, FtSeg)> {
        let mut found = Vec::new();
        let Some(a) = &self.attached else {
            return found;
        };
        for (i, key) in a.segments.iter().enumerate() {
            let seg = FtSeg::unpack(key);
            if seg.is_valid() && seg.fid == fid {
                let node = a.offsets.node_at(i).unwrap_or(INVALID_NODE_ID);
                tracing::debug!(fid, node, index = i, segment = %seg, "segment by fid");
                found.push((node, seg));
            }
        }
        found
    }

    /// Debug helper: segments of `node_id`
    pub fn dump_segment_by_node(&self, node_id: NodeId) -> Vec<FtSeg> {
        let segs = self.node_segments(node_id);
        for seg in &segs {
            tracing::debug!(node = node_id, segment = %seg, "segment by node");
        }
        segs
    }
}
