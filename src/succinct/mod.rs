//! Succinct building blocks
//!
//! All structures keep their payload as little-endian 64-bit words inside a
//! [`SectionBytes`], so the same code serves heap buffers built in memory and
//! memory-mapped sections attached from disk. Small auxiliary directories
//! (rank counts, select samples) are rebuilt on attach.

mod compressed_list;
mod elias_fano;
mod rank_bits;

pub use compressed_list::CompressedList;
pub use elias_fano::EliasFano;
pub use rank_bits::{BitVectorBuilder, RankBitVector};

use crate::formats::framing::read_u64_le;
use crate::storage::SectionBytes;

/// Read-only view of little-endian u64 words
#[derive(Debug, Clone)]
pub struct WordView {
    bytes: SectionBytes,
}

impl WordView {
    pub fn from_words(words: &[u64]) -> Self {
        let mut bytes = Vec::with_capacity(words.len() * 8);
        for word in words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        Self {
            bytes: SectionBytes::from_vec(bytes),
        }
    }

    /// Wrap raw bytes; a trailing partial word is ignored
    pub fn from_bytes(bytes: SectionBytes) -> Self {
        let whole = bytes.len() - bytes.len() % 8;
        Self {
            bytes: bytes.slice(0..whole),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / 8
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Word `i`; panics when out of range
    #[inline]
    pub fn get(&self, i: usize) -> u64 {
        read_u64_le(&self.bytes, i * 8)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn is_mapped(&self) -> bool {
        self.bytes.is_mapped()
    }
}

/// Read `width` (0..=64) bits starting at bit `pos`
#[inline]
pub(crate) fn read_bits(words: &WordView, pos: u64, width: u32) -> u64 {
    if width == 0 {
        return 0;
    }
    let word = (pos / 64) as usize;
    let offset = (pos % 64) as u32;
    let mut value = words.get(word) >> offset;
    if offset + width > 64 {
        value |= words.get(word + 1) << (64 - offset);
    }
    if width == 64 {
        value
    } else {
        value & ((1u64 << width) - 1)
    }
}

/// Position of the `k`-th (0-based) set bit of `word`
#[inline]
pub(crate) fn select_in_word(mut word: u64, k: u32) -> u32 {
    for _ in 0..k {
        word &= word - 1;
    }
    word.trailing_zeros()
}

/// Append-only bit stream
#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    words: Vec<u64>,
    len: u64,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All-zero stream of `len` bits
    pub fn zeroed(len: u64) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(64) as usize],
            len,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    /// Append the low `width` bits of `value`
    pub fn push(&mut self, value: u64, width: u32) {
        if width == 0 {
            return;
        }
        debug_assert!(width == 64 || value >> width == 0, "value wider than {width} bits");
        let offset = (self.len % 64) as u32;
        if offset == 0 {
            self.words.push(0);
        }
        let last = self.words.len() - 1;
        self.words[last] |= value << offset;
        if offset + width > 64 {
            self.words.push(value >> (64 - offset));
        }
        self.len += width as u64;
    }

    pub fn set(&mut self, pos: u64) {
        debug_assert!(pos < self.len);
        self.words[(pos / 64) as usize] |= 1u64 << (pos % 64);
    }

    pub fn into_words(self) -> Vec<u64> {
        self.words
    }
}
