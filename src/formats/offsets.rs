///! ftseg.offsets format - node id to segment range table
///!
///! Header count: number of records
///!
///! Body (count × 8 bytes):
///!   node_id: u32
///!   offset:  u32   // first segment index of the node

use crate::error::Result;
use crate::offsets::{OffsetIndex, RECORD_SIZE};
use crate::storage::SectionBytes;

use super::framing::{open_frame, FramedWriter};

pub const MAGIC: u32 = 0x46544F46; // "FTOF"

pub struct OffsetsSection;

impl OffsetsSection {
    pub fn encode(index: &OffsetIndex) -> Vec<u8> {
        let mut out = FramedWriter::new(MAGIC, index.len() as u64);
        for record in index.iter() {
            out.put_u32(record.node_id);
            out.put_u32(record.offset);
        }
        out.finish()
    }

    /// Decode and validate against the length of the segment sequence
    pub fn decode(
        section: &str,
        bytes: &SectionBytes,
        verify: bool,
        segment_count: usize,
    ) -> Result<OffsetIndex> {
        let mut frame = open_frame(section, bytes, MAGIC, verify)?;
        let n_bytes = usize::try_from(frame.count)
            .ok()
            .and_then(|n| n.checked_mul(RECORD_SIZE))
            .unwrap_or(usize::MAX);
        let records = frame.body.take(n_bytes)?;
        frame.body.finish()?;
        OffsetIndex::from_bytes(section, records, segment_count)
    }
}
