//! Backward index: feature id -> routing node ids
//!
//! One bit per (translated) feature id marks presence. Node lists are stored
//! only for present features, addressed by the rank of the feature's bit, so
//! storage grows with the number of referenced features rather than the size
//! of the feature id domain.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::SegmapConfig;
use crate::error::{Error, Result};
use crate::features::FeatureIdTranslator;
use crate::formats::{BitsSection, NodeLists, NodesSection};
use crate::mapping::ForwardMapping;
use crate::segment::NodeId;
use crate::storage::{SectionSink, SectionSource};
use crate::succinct::{BitVectorBuilder, RankBitVector};

struct Loaded {
    bits: RankBitVector,
    lists: NodeLists,
    translator: Arc<dyn FeatureIdTranslator>,
}

#[derive(Default)]
pub struct BackwardIndex {
    config: SegmapConfig,
    state: Option<Loaded>,
}

impl std::fmt::Debug for BackwardIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackwardIndex")
            .field("loaded", &self.is_loaded())
            .field("features", &self.feature_count())
            .finish()
    }
}

impl BackwardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SegmapConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Build from every node in `0..=max_node_id` of `forward`
    ///
    /// Segments whose feature id the translator rejects are skipped.
    pub fn construct(
        &mut self,
        forward: &ForwardMapping,
        max_node_id: NodeId,
        translator: Arc<dyn FeatureIdTranslator>,
    ) {
        let domain = translator.domain_size();
        let mut builder = BitVectorBuilder::new(domain as u64);
        let mut lists: BTreeMap<u32, Vec<NodeId>> = BTreeMap::new();
        let mut untranslated = 0usize;

        for record in forward.offset_records() {
            if record.node_id > max_node_id {
                break;
            }
            let node = record.node_id;
            forward.for_each_segment(node, |seg| {
                let Some(pos) = translator.translate(seg.fid).filter(|&p| p < domain) else {
                    untranslated += 1;
                    return;
                };
                builder.set(pos as u64);
                let nodes = lists.entry(pos).or_default();
                if nodes.last() != Some(&node) {
                    nodes.push(node);
                }
            });
        }

        if untranslated > 0 {
            tracing::warn!(untranslated, "segments with unknown feature ids skipped");
        }

        let bits = builder.finish();
        let lists = NodeLists::from_lists(lists.values().map(Vec::as_slice));
        tracing::info!(
            domain,
            features = bits.count_ones(),
            node_refs = lists.id_count(),
            max_node_id,
            "constructed backward index"
        );
        self.state = Some(Loaded {
            bits,
            lists,
            translator,
        });
    }

    /// Write the bits and nodes sections
    ///
    /// Saving an unloaded index is a no-op.
    pub fn save<S: SectionSink + ?Sized>(&self, sink: &S) -> Result<()> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        let names = &self.config.sections;
        let bits = BitsSection::encode(&state.bits);
        let nodes = NodesSection::encode(&state.lists);
        sink.write_section(&names.bits, &bits)?;
        sink.write_section(&names.nodes, &nodes)?;
        tracing::info!(
            bits_bytes = bits.len(),
            nodes_bytes = nodes.len(),
            "saved backward index"
        );
        Ok(())
    }

    /// Attach persisted sections; both are zero-copy when the source is mapped
    pub fn load<S: SectionSource + ?Sized>(
        &mut self,
        source: &S,
        translator: Arc<dyn FeatureIdTranslator>,
    ) -> Result<()> {
        let names = &self.config.sections;
        let verify = self.config.verify_checksums;

        let bits = BitsSection::decode(&names.bits, &source.open_section(&names.bits)?, verify)?;
        let lists = NodesSection::decode(&names.nodes, &source.open_section(&names.nodes)?, verify)?;

        if bits.len() != translator.domain_size() as u64 {
            return Err(Error::corrupt(
                &names.bits,
                format!(
                    "bit vector covers {} feature ids, translator domain is {}",
                    bits.len(),
                    translator.domain_size()
                ),
            ));
        }
        if lists.len() as u64 != bits.count_ones() {
            return Err(Error::corrupt(
                &names.nodes,
                format!(
                    "{} node lists for {} present features",
                    lists.len(),
                    bits.count_ones()
                ),
            ));
        }

        tracing::info!(
            features = bits.count_ones(),
            node_refs = lists.id_count(),
            zero_copy = lists.is_mapped(),
            "loaded backward index"
        );
        self.state = Some(Loaded {
            bits,
            lists,
            translator,
        });
        Ok(())
    }

    /// Load, or rebuild and save when the persisted index is missing or corrupt
    pub fn load_or_construct<S, W>(
        &mut self,
        source: &S,
        sink: &W,
        forward: &ForwardMapping,
        max_node_id: NodeId,
        translator: Arc<dyn FeatureIdTranslator>,
    ) -> Result<()>
    where
        S: SectionSource + ?Sized,
        W: SectionSink + ?Sized,
    {
        match self.load(source, Arc::clone(&translator)) {
            Ok(()) => Ok(()),
            Err(e) if e.is_rebuildable() => {
                tracing::warn!(error = %e, "rebuilding backward index");
                self.construct(forward, max_node_id, translator);
                self.save(sink)
            }
            Err(e) => Err(e),
        }
    }

    /// Nodes referencing feature `fid`, ascending; empty when absent or unknown
    pub fn nodes_for_feature(&self, fid: u32) -> Vec<NodeId> {
        let Some(state) = &self.state else {
            return Vec::new();
        };
        let Some(pos) = state.translator.translate(fid) else {
            return Vec::new();
        };
        let pos = pos as u64;
        if pos >= state.bits.len() || !state.bits.get(pos) {
            return Vec::new();
        }
        let nodes = state.lists.list((state.bits.rank1(pos) - 1) as usize);
        tracing::trace!(fid, nodes = nodes.len(), "nodes_for_feature");
        nodes
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// Number of features referenced by at least one node
    pub fn feature_count(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.bits.count_ones())
    }

    /// Drop the index and return to the unloaded state
    pub fn clear(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MappingBuilder;
    use crate::features::{FeaturesOffsetsTable, IdentityTranslator};
    use crate::segment::FtSeg;
    use crate::storage::MemoryContainer;

    fn forward(entries: &[(NodeId, Vec<FtSeg>)]) -> ForwardMapping {
        let container = MemoryContainer::new();
        let mut builder = MappingBuilder::new();
        for (node, segs) in entries {
            builder.append(*node, segs);
        }
        builder.save(&container).unwrap();
        let mut mapping = ForwardMapping::new();
        mapping.load(&container).unwrap();
        mapping
    }

    fn identity(domain: u32) -> Arc<dyn FeatureIdTranslator> {
        Arc::new(IdentityTranslator::new(domain))
    }

    #[test]
    fn test_shared_feature_lists_both_nodes() {
        let fwd = forward(&[
            (1, vec![FtSeg::new(10, 0, 5)]),
            (2, vec![FtSeg::new(10, 5, 8)]),
        ]);
        let mut index = BackwardIndex::new();
        index.construct(&fwd, 2, identity(1000));

        assert_eq!(index.nodes_for_feature(10), vec![1, 2]);
        assert!(index.nodes_for_feature(999).is_empty());
        assert!(index.nodes_for_feature(5000).is_empty());
        assert_eq!(index.feature_count(), 1);
    }

    #[test]
    fn test_node_listed_once_per_feature() {
        let fwd = forward(&[(
            3,
            vec![FtSeg::new(4, 0, 1), FtSeg::new(4, 1, 2), FtSeg::new(4, 2, 3)],
        )]);
        let mut index = BackwardIndex::new();
        index.construct(&fwd, 3, identity(8));
        assert_eq!(index.nodes_for_feature(4), vec![3]);
    }

    #[test]
    fn test_max_node_id_is_inclusive_bound() {
        let fwd = forward(&[
            (1, vec![FtSeg::new(0, 0, 1)]),
            (5, vec![FtSeg::new(0, 1, 2), FtSeg::new(1, 0, 1)]),
            (9, vec![FtSeg::new(1, 1, 2)]),
        ]);
        let mut index = BackwardIndex::new();
        index.construct(&fwd, 5, identity(4));
        assert_eq!(index.nodes_for_feature(0), vec![1, 5]);
        assert_eq!(index.nodes_for_feature(1), vec![5]);
    }

    #[test]
    fn test_sentinels_and_unknown_features_are_skipped() {
        let fwd = forward(&[
            (0, vec![FtSeg::invalid()]),
            (1, vec![FtSeg::new(2, 0, 1), FtSeg::new(50, 0, 1)]),
        ]);
        let mut index = BackwardIndex::new();
        index.construct(&fwd, 1, identity(10));
        assert_eq!(index.feature_count(), 1);
        assert_eq!(index.nodes_for_feature(2), vec![1]);
    }

    #[test]
    fn test_translated_feature_ids() {
        let fwd = forward(&[
            (1, vec![FtSeg::new(4096, 0, 1)]),
            (2, vec![FtSeg::new(120, 0, 1), FtSeg::new(4096, 1, 3)]),
        ]);
        let table: Arc<dyn FeatureIdTranslator> =
            Arc::new(FeaturesOffsetsTable::from_offsets([0, 120, 4096]).unwrap());
        let mut index = BackwardIndex::new();
        index.construct(&fwd, 2, table);

        assert_eq!(index.nodes_for_feature(4096), vec![1, 2]);
        assert_eq!(index.nodes_for_feature(120), vec![2]);
        assert!(index.nodes_for_feature(0).is_empty());
        assert!(index.nodes_for_feature(2).is_empty());
    }

    #[test]
    fn test_save_load_and_clear() {
        let fwd = forward(&[
            (1, vec![FtSeg::new(3, 0, 1)]),
            (4, vec![FtSeg::new(7, 0, 1)]),
        ]);
        let container = MemoryContainer::new();
        let mut built = BackwardIndex::new();
        built.construct(&fwd, 4, identity(16));
        built.save(&container).unwrap();

        let mut index = BackwardIndex::new();
        assert!(!index.is_loaded());
        index.load(&container, identity(16)).unwrap();
        assert!(index.is_loaded());
        assert_eq!(index.nodes_for_feature(3), vec![1]);
        assert_eq!(index.nodes_for_feature(7), vec![4]);

        index.clear();
        assert!(!index.is_loaded());
        assert!(index.nodes_for_feature(3).is_empty());
        assert_eq!(index.feature_count(), 0);
    }

    #[test]
    fn test_load_rejects_domain_mismatch() {
        let fwd = forward(&[(1, vec![FtSeg::new(3, 0, 1)])]);
        let container = MemoryContainer::new();
        let mut built = BackwardIndex::new();
        built.construct(&fwd, 1, identity(16));
        built.save(&container).unwrap();

        let mut index = BackwardIndex::new();
        let err = index.load(&container, identity(17)).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex { .. }));
        assert!(!index.is_loaded());
    }

    #[test]
    fn test_load_or_construct_rebuilds_missing_index() {
        let fwd = forward(&[(2, vec![FtSeg::new(1, 0, 1)])]);
        let container = MemoryContainer::new();

        let mut index = BackwardIndex::new();
        index
            .load_or_construct(&container, &container, &fwd, 2, identity(4))
            .unwrap();
        assert_eq!(index.nodes_for_feature(1), vec![2]);
        assert!(container.has_section("ftseg.bits"));
        assert!(container.has_section("ftseg.nodes"));

        // second call loads what the first one saved
        let mut again = BackwardIndex::new();
        again
            .load_or_construct(&container, &container, &ForwardMapping::new(), 0, identity(4))
            .unwrap();
        assert_eq!(again.nodes_for_feature(1), vec![2]);
    }
}
