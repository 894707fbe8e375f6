///! ftseg.nodes format - per-feature node id lists of the backward index
///!
///! Header count: number of lists (one per set bit of ftseg.bits, in rank order)
///!
///! Body:
///!   Elias-Fano list boundaries, count + 1 values starting at 0
///!   id_count: u64
///!   ids:      [id_count]u32, padded to 8 bytes

use crate::error::{Error, Result};
use crate::formats::framing::read_u32_le;
use crate::segment::NodeId;
use crate::storage::SectionBytes;
use crate::succinct::EliasFano;

use super::framing::{open_frame, FramedWriter};

pub const MAGIC: u32 = 0x46544E44; // "FTND"

/// Concatenated node id lists addressed by dense position
#[derive(Debug, Clone)]
pub struct NodeLists {
    bounds: EliasFano,
    ids: SectionBytes,
}

impl NodeLists {
    pub fn from_lists<'a, I>(lists: I) -> Self
    where
        I: IntoIterator<Item = &'a [NodeId]>,
    {
        let mut bounds = vec![0u64];
        let mut ids = Vec::new();
        for list in lists {
            for id in list {
                ids.extend_from_slice(&id.to_le_bytes());
            }
            bounds.push((ids.len() / 4) as u64);
        }
        Self {
            bounds: EliasFano::from_monotone(&bounds),
            ids: SectionBytes::from_vec(ids),
        }
    }

    /// Number of lists
    pub fn len(&self) -> usize {
        self.bounds.len().saturating_sub(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total node ids over all lists
    pub fn id_count(&self) -> usize {
        self.ids.len() / 4
    }

    /// List at dense position `pos`; empty past the end
    pub fn list(&self, pos: usize) -> Vec<NodeId> {
        let (Some(start), Some(end)) = (
            self.bounds.get(pos as u64),
            self.bounds.get(pos as u64 + 1),
        ) else {
            return Vec::new();
        };
        (start as usize..end as usize)
            .map(|i| read_u32_le(&self.ids, i * 4))
            .collect()
    }

    pub fn is_mapped(&self) -> bool {
        self.ids.is_mapped()
    }
}

pub struct NodesSection;

impl NodesSection {
    pub fn encode(lists: &NodeLists) -> Vec<u8> {
        let mut out = FramedWriter::new(MAGIC, lists.len() as u64);
        lists.bounds.write_to(&mut out);
        out.put_u64(lists.id_count() as u64);
        for i in 0..lists.id_count() {
            out.put_u32(read_u32_le(&lists.ids, i * 4));
        }
        out.align8();
        out.finish()
    }

    pub fn decode(section: &str, bytes: &SectionBytes, verify: bool) -> Result<NodeLists> {
        let mut frame = open_frame(section, bytes, MAGIC, verify)?;
        let bounds = EliasFano::read_from(&mut frame.body)?;
        let id_count = frame.body.read_u64()?;

        if frame.count.checked_add(1) != Some(bounds.len()) {
            return Err(Error::corrupt(
                section,
                format!("{} list bounds for {} lists", bounds.len(), frame.count),
            ));
        }
        if bounds.get(0) != Some(0) || bounds.get(frame.count) != Some(id_count) {
            return Err(Error::corrupt(
                section,
                format!("list bounds do not span the {id_count} stored node ids"),
            ));
        }

        let n_bytes = usize::try_from(id_count)
            .ok()
            .and_then(|n| n.checked_mul(4))
            .unwrap_or(usize::MAX);
        let ids = frame.body.take(n_bytes)?;
        frame.body.skip_to_align8()?;
        frame.body.finish()?;

        Ok(NodeLists { bounds, ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_lists_roundtrip() {
        let lists: Vec<Vec<NodeId>> = vec![vec![1, 2], vec![], vec![7], vec![3, 9, 11]];
        let node_lists = NodeLists::from_lists(lists.iter().map(|l| l.as_slice()));
        assert_eq!(node_lists.len(), 4);
        assert_eq!(node_lists.id_count(), 6);

        let raw = NodesSection::encode(&node_lists);
        let loaded = NodesSection::decode("n", &SectionBytes::from_vec(raw), true).unwrap();
        for (pos, expected) in lists.iter().enumerate() {
            assert_eq!(&loaded.list(pos), expected);
        }
        assert!(loaded.list(4).is_empty());
    }

    #[test]
    fn test_truncated_ids_rejected() {
        let node_lists = NodeLists::from_lists([[1u32, 2, 3].as_slice()]);
        let mut raw = NodesSection::encode(&node_lists);
        // drop the padding word holding the last id, leave the footer
        let footer = raw.split_off(raw.len() - 16);
        raw.truncate(raw.len() - 8);
        raw.extend_from_slice(&footer);
        assert!(NodesSection::decode("n", &SectionBytes::from_vec(raw), false).is_err());
    }

    #[test]
    fn test_oversized_list_count_rejected() {
        let node_lists = NodeLists::from_lists([[4u32, 5].as_slice()]);
        let mut raw = NodesSection::encode(&node_lists);
        raw[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
        let err = NodesSection::decode("n", &SectionBytes::from_vec(raw), false).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex { .. }));
    }
}
