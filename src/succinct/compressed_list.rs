//! Random-access list of arbitrary u64 values
//!
//! Value `v` is written as the binary digits of `v + 1` minus the leading one,
//! so small values take few bits. Code boundaries form a monotone sequence and
//! are kept in an [`EliasFano`], which gives O(1) access to any element.

use super::{read_bits, BitWriter, EliasFano, WordView};
use crate::error::{Error, Result};
use crate::formats::framing::{BodyCursor, FramedWriter};

#[derive(Debug, Clone)]
pub struct CompressedList {
    bits: WordView,
    /// End bit position of each code
    ends: EliasFano,
}

#[inline]
fn encode(value: u64) -> (u64, u32) {
    let shifted = value as u128 + 1;
    let width = 127 - shifted.leading_zeros();
    ((shifted - (1u128 << width)) as u64, width)
}

#[inline]
fn decode(payload: u64, width: u32) -> u64 {
    (((1u128 << width) | payload as u128) - 1) as u64
}

impl CompressedList {
    pub fn from_values(values: &[u64]) -> Self {
        let mut bits = BitWriter::new();
        let mut ends = Vec::with_capacity(values.len());
        for &value in values {
            let (payload, width) = encode(value);
            bits.push(payload, width);
            ends.push(bits.len());
        }
        Self {
            bits: WordView::from_words(&bits.into_words()),
            ends: EliasFano::from_monotone(&ends),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ends.len() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    fn code_start(&self, i: u64) -> u64 {
        if i == 0 {
            0
        } else {
            self.ends.get(i - 1).unwrap_or(0)
        }
    }

    pub fn get(&self, i: usize) -> Option<u64> {
        let i = i as u64;
        let end = self.ends.get(i)?;
        let start = self.code_start(i);
        let width = (end - start) as u32;
        Some(decode(read_bits(&self.bits, start, width), width))
    }

    /// Sequential decode, one select per element saved
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        let mut start = 0u64;
        self.ends.iter().map(move |end| {
            let width = (end - start) as u32;
            let value = decode(read_bits(&self.bits, start, width), width);
            start = end;
            value
        })
    }

    /// Encoded payload size in bytes, rank/select samples excluded
    pub fn payload_bytes(&self) -> usize {
        self.bits.as_bytes().len()
    }

    pub fn is_mapped(&self) -> bool {
        self.bits.is_mapped()
    }

    pub(crate) fn write_to(&self, out: &mut FramedWriter) {
        out.put_words(&self.bits);
        self.ends.write_to(out);
    }

    pub(crate) fn read_from(body: &mut BodyCursor<'_>) -> Result<Self> {
        let section = body.section();
        let bits = body.read_words()?;
        let ends = EliasFano::read_from(body)?;

        let capacity = bits.len() as u64 * 64;
        let mut prev = 0u64;
        for (i, end) in ends.iter().enumerate() {
            if end < prev || end - prev > 64 || end > capacity {
                return Err(Error::corrupt(
                    section,
                    format!("code {i} spans bits {prev}..{end} (stream has {capacity})"),
                ));
            }
            prev = end;
        }

        Ok(Self { bits, ends })
    }
}
