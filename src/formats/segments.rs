///! ftseg.segments format - packed segment keys of the forward mapping
///!
///! Header count: number of segment keys (sentinel slots included)
///!
///! Body:
///!   code_words: u64, code stream [code_words]u64
///!   Elias-Fano code end positions (len, lower_width, lower words, upper words)

use crate::error::{Error, Result};
use crate::storage::SectionBytes;
use crate::succinct::CompressedList;

use super::framing::{open_frame, FramedWriter};

pub const MAGIC: u32 = 0x46545347; // "FTSG"

pub struct SegmentsSection;

impl SegmentsSection {
    pub fn encode(list: &CompressedList) -> Vec<u8> {
        let mut out = FramedWriter::new(MAGIC, list.len() as u64);
        list.write_to(&mut out);
        out.finish()
    }

    pub fn decode(section: &str, bytes: &SectionBytes, verify: bool) -> Result<CompressedList> {
        let mut frame = open_frame(section, bytes, MAGIC, verify)?;
        let list = CompressedList::read_from(&mut frame.body)?;
        if list.len() as u64 != frame.count {
            return Err(Error::corrupt(
                section,
                format!("header claims {} segments, body has {}", frame.count, list.len()),
            ));
        }
        frame.body.finish()?;
        Ok(list)
    }
}
