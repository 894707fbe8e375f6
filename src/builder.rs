//! Write-once builder for the forward mapping
//!
//! Nodes are appended in non-decreasing id order. The builder buffers packed
//! keys and offset records in memory and emits both sections on `save`.

use crate::config::SegmapConfig;
use crate::error::Result;
use crate::formats::{OffsetsSection, SegmentsSection};
use crate::offsets::{OffsetIndex, SegOffset};
use crate::segment::{FtSeg, NodeId, INVALID_NODE_ID};
use crate::storage::SectionSink;
use crate::succinct::CompressedList;

#[derive(Debug, Default)]
pub struct MappingBuilder {
    config: SegmapConfig,
    keys: Vec<u64>,
    offsets: Vec<SegOffset>,
    last_node: Option<NodeId>,
}

impl MappingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SegmapConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Append `segments` for `node_id`
    ///
    /// Repeated calls for the same node extend its run. Empty slices are
    /// accepted and leave no trace.
    ///
    /// Panics when `node_id` is lower than a previously appended id, is the
    /// reserved `INVALID_NODE_ID`, or the buffer outgrows 32-bit offsets.
    pub fn append(&mut self, node_id: NodeId, segments: &[FtSeg]) {
        assert_ne!(node_id, INVALID_NODE_ID, "node id {node_id} is reserved");
        if let Some(last) = self.last_node {
            assert!(
                node_id >= last,
                "node ids must be appended in non-decreasing order: {node_id} after {last}"
            );
        }
        self.last_node = Some(node_id);
        if segments.is_empty() {
            return;
        }

        let opens_run = self.offsets.last().map_or(true, |r| r.node_id != node_id);
        if opens_run {
            let offset = u32::try_from(self.keys.len())
                .unwrap_or_else(|_| panic!("segment buffer exceeds u32 offsets at node {node_id}"));
            self.offsets.push(SegOffset::new(node_id, offset));
        }
        self.keys.extend(segments.iter().map(FtSeg::pack));
    }

    pub fn segment_count(&self) -> usize {
        self.keys.len()
    }

    /// Nodes that own at least one segment
    pub fn node_count(&self) -> usize {
        self.offsets.len()
    }

    /// Emit the segments and offsets sections
    pub fn save<S: SectionSink + ?Sized>(self, sink: &S) -> Result<()> {
        let names = &self.config.sections;
        let list = CompressedList::from_values(&self.keys);
        let index = OffsetIndex::from_records(&self.offsets, self.keys.len());

        let segments = SegmentsSection::encode(&list);
        let offsets = OffsetsSection::encode(&index);
        sink.write_section(&names.segments, &segments)?;
        sink.write_section(&names.offsets, &offsets)?;

        tracing::info!(
            segments = self.keys.len(),
            nodes = self.offsets.len(),
            segments_bytes = segments.len(),
            offsets_bytes = offsets.len(),
            "saved forward mapping"
        );
        Ok(())
    }
}
