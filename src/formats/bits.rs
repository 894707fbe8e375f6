///! ftseg.bits format - feature presence bit vector of the backward index
///!
///! Header count: number of bits (size of the feature id domain)
///!
///! Body:
///!   len:         u64
///!   word_count:  u64, words [word_count]u64
///!   super_count: u64, superblocks [super_count]u64   // set bits before every 512th bit
///!   block_count: u64, blocks [block_count]u16        // per-word count inside the superblock
///!   pad to 8 bytes
///!
///! The rank directory is recomputed on load and must match the stored one.

use crate::error::{Error, Result};
use crate::storage::SectionBytes;
use crate::succinct::RankBitVector;

use super::framing::{open_frame, FramedWriter};

pub const MAGIC: u32 = 0x46544256; // "FTBV"

pub struct BitsSection;

impl BitsSection {
    pub fn encode(bits: &RankBitVector) -> Vec<u8> {
        let mut out = FramedWriter::new(MAGIC, bits.len());
        bits.write_to(&mut out);
        out.finish()
    }

    pub fn decode(section: &str, bytes: &SectionBytes, verify: bool) -> Result<RankBitVector> {
        let mut frame = open_frame(section, bytes, MAGIC, verify)?;
        let bits = RankBitVector::read_from(&mut frame.body)?;
        if bits.len() != frame.count {
            return Err(Error::corrupt(
                section,
                format!("header claims {} bits, body has {}", frame.count, bits.len()),
            ));
        }
        frame.body.finish()?;
        Ok(bits)
    }
}
