///! features_offsets format - raw feature id to compact index table
///!
///! Header count: number of features
///!
///! Body (count × 4 bytes, padded to 8):
///!   raw_offset: u32   // strictly increasing; position = compact index

use crate::error::Result;
use crate::storage::SectionBytes;

use super::framing::{open_frame, FramedWriter};

pub const MAGIC: u32 = 0x4654464F; // "FTFO"

pub struct FeaturesOffsetsSection;

impl FeaturesOffsetsSection {
    pub fn encode<I: IntoIterator<Item = u32>>(count: usize, offsets: I) -> Vec<u8> {
        let mut out = FramedWriter::new(MAGIC, count as u64);
        for offset in offsets {
            out.put_u32(offset);
        }
        out.align8();
        out.finish()
    }

    /// Raw little-endian u32 entries; ordering is checked by the caller
    pub fn decode(section: &str, bytes: &SectionBytes, verify: bool) -> Result<SectionBytes> {
        let mut frame = open_frame(section, bytes, MAGIC, verify)?;
        let n_bytes = usize::try_from(frame.count)
            .ok()
            .and_then(|n| n.checked_mul(4))
            .unwrap_or(usize::MAX);
        let entries = frame.body.take(n_bytes)?;
        frame.body.skip_to_align8()?;
        frame.body.finish()?;
        Ok(entries)
    }
}
