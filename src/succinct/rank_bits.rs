//! Bit vector with constant-time rank
//!
//! Two-level directory: an absolute count every 512 bits (superblock) and a
//! 16-bit count relative to the superblock for every 64-bit word. A rank query
//! is two table lookups and one popcount.

use super::WordView;
use crate::error::{Error, Result};
use crate::formats::framing::{read_u16_le, BodyCursor, FramedWriter};

const WORDS_PER_SUPERBLOCK: usize = 8;

/// Mutable bit vector used during construction
#[derive(Debug, Clone)]
pub struct BitVectorBuilder {
    words: Vec<u64>,
    len: u64,
}

impl BitVectorBuilder {
    pub fn new(len: u64) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(64) as usize],
            len,
        }
    }

    pub fn set(&mut self, pos: u64) {
        assert!(pos < self.len, "bit {pos} out of range (len {})", self.len);
        self.words[(pos / 64) as usize] |= 1u64 << (pos % 64);
    }

    pub fn finish(self) -> RankBitVector {
        let words = WordView::from_words(&self.words);
        let (superblocks, blocks) = build_directory(&words);
        RankBitVector {
            words,
            len: self.len,
            superblocks,
            blocks,
        }
    }
}

/// Immutable bit vector answering `rank1` in O(1)
#[derive(Debug, Clone)]
pub struct RankBitVector {
    words: WordView,
    len: u64,
    /// Set bits before word `8k`, for k in 0..=n_words/8
    superblocks: Vec<u64>,
    /// Set bits from the superblock start up to word `w`, for w in 0..=n_words
    blocks: Vec<u16>,
}

fn build_directory(words: &WordView) -> (Vec<u64>, Vec<u16>) {
    let n_words = words.len();
    let mut superblocks = Vec::with_capacity(n_words / WORDS_PER_SUPERBLOCK + 1);
    let mut blocks = Vec::with_capacity(n_words + 1);
    let mut total = 0u64;
    let mut relative = 0u16;

    for w in 0..=n_words {
        if w % WORDS_PER_SUPERBLOCK == 0 {
            superblocks.push(total);
            relative = 0;
        }
        blocks.push(relative);
        if w < n_words {
            let ones = words.get(w).count_ones();
            total += ones as u64;
            relative += ones as u16;
        }
    }
    (superblocks, blocks)
}

impl RankBitVector {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit at `pos`; false past the end
    pub fn get(&self, pos: u64) -> bool {
        pos < self.len && (self.words.get((pos / 64) as usize) >> (pos % 64)) & 1 == 1
    }

    /// Set bits in `[0, pos)`, `pos <= len`
    pub fn rank1_exclusive(&self, pos: u64) -> u64 {
        let pos = pos.min(self.len);
        let word = (pos / 64) as usize;
        let bit = pos % 64;
        let mut rank =
            self.superblocks[word / WORDS_PER_SUPERBLOCK] + self.blocks[word] as u64;
        if bit > 0 {
            rank += (self.words.get(word) & ((1u64 << bit) - 1)).count_ones() as u64;
        }
        rank
    }

    /// Set bits in `[0, pos]`
    pub fn rank1(&self, pos: u64) -> u64 {
        self.rank1_exclusive(pos.saturating_add(1))
    }

    pub fn count_ones(&self) -> u64 {
        self.rank1_exclusive(self.len)
    }

    pub fn is_mapped(&self) -> bool {
        self.words.is_mapped()
    }

    /// Body layout: len, words, superblocks, blocks (u16, padded to 8)
    pub(crate) fn write_to(&self, out: &mut FramedWriter) {
        out.put_u64(self.len);
        out.put_words(&self.words);
        out.put_u64(self.superblocks.len() as u64);
        for &count in &self.superblocks {
            out.put_u64(count);
        }
        out.put_u64(self.blocks.len() as u64);
        for &count in &self.blocks {
            out.put_u16(count);
        }
        out.align8();
    }

    /// Attach and cross-check the stored rank directory against the words
    pub(crate) fn read_from(body: &mut BodyCursor<'_>) -> Result<Self> {
        let section = body.section();
        let len = body.read_u64()?;
        let words = body.read_words()?;
        if words.len() as u64 != len.div_ceil(64) {
            return Err(Error::corrupt(
                section,
                format!("{} words cannot hold {} bits", words.len(), len),
            ));
        }
        if len % 64 != 0 && words.get(words.len() - 1) >> (len % 64) != 0 {
            return Err(Error::corrupt(section, "bits set past the end of the vector"));
        }

        let (superblocks, blocks) = build_directory(&words);

        let n_super = body.read_u64()?;
        if n_super != superblocks.len() as u64 {
            return Err(Error::corrupt(
                section,
                format!("expected {} rank superblocks, found {}", superblocks.len(), n_super),
            ));
        }
        for (k, &expected) in superblocks.iter().enumerate() {
            let stored = body.read_u64()?;
            if stored != expected {
                return Err(Error::corrupt(
                    section,
                    format!("rank superblock {k} is {stored}, bits say {expected}"),
                ));
            }
        }

        let n_blocks = body.read_u64()?;
        if n_blocks != blocks.len() as u64 {
            return Err(Error::corrupt(
                section,
                format!("expected {} rank blocks, found {}", blocks.len(), n_blocks),
            ));
        }
        let stored_blocks = body.take(blocks.len() * 2)?;
        for (w, &expected) in blocks.iter().enumerate() {
            let stored = read_u16_le(&stored_blocks, w * 2);
            if stored != expected {
                return Err(Error::corrupt(
                    section,
                    format!("rank block {w} is {stored}, bits say {expected}"),
                ));
            }
        }
        body.skip_to_align8()?;

        Ok(Self {
            words,
            len,
            superblocks,
            blocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::framing::open_frame;
    use crate::storage::SectionBytes;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn naive_rank(bits: &[bool], pos: usize) -> u64 {
        bits[..=pos].iter().filter(|&&b| b).count() as u64
    }

    #[test]
    fn test_rank_matches_naive_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let len = 3000u64;
        let mut bits = vec![false; len as usize];
        let mut builder = BitVectorBuilder::new(len);
        for (i, bit) in bits.iter_mut().enumerate() {
            if rng.gen_bool(0.1) {
                *bit = true;
                builder.set(i as u64);
            }
        }
        let rbv = builder.finish();

        for pos in 0..len as usize {
            assert_eq!(rbv.get(pos as u64), bits[pos]);
            assert_eq!(rbv.rank1(pos as u64), naive_rank(&bits, pos), "rank at {pos}");
        }
        assert_eq!(rbv.count_ones(), bits.iter().filter(|&&b| b).count() as u64);
    }

    #[test]
    fn test_boundaries() {
        let mut builder = BitVectorBuilder::new(1024);
        builder.set(0);
        builder.set(63);
        builder.set(64);
        builder.set(511);
        builder.set(512);
        builder.set(1023);
        let rbv = builder.finish();

        assert_eq!(rbv.rank1(0), 1);
        assert_eq!(rbv.rank1_exclusive(0), 0);
        assert_eq!(rbv.rank1(63), 2);
        assert_eq!(rbv.rank1(64), 3);
        assert_eq!(rbv.rank1(511), 4);
        assert_eq!(rbv.rank1(512), 5);
        assert_eq!(rbv.rank1(1023), 6);
        assert_eq!(rbv.rank1_exclusive(1024), 6);
        assert!(!rbv.get(1024));
    }

    #[test]
    fn test_empty_vector() {
        let rbv = BitVectorBuilder::new(0).finish();
        assert!(rbv.is_empty());
        assert_eq!(rbv.count_ones(), 0);
        assert_eq!(rbv.rank1(5), 0);
        assert!(!rbv.get(0));
    }

    fn persist(rbv: &RankBitVector) -> Vec<u8> {
        let mut out = FramedWriter::new(0x42495453, rbv.len());
        rbv.write_to(&mut out);
        out.finish()
    }

    #[test]
    fn test_persisted_directory_is_checked() {
        let mut builder = BitVectorBuilder::new(700);
        for pos in (0..700).step_by(3) {
            builder.set(pos);
        }
        let rbv = builder.finish();
        let raw = persist(&rbv);

        let bytes = SectionBytes::from_vec(raw.clone());
        let mut frame = open_frame("bits", &bytes, 0x42495453, true).unwrap();
        let loaded = RankBitVector::read_from(&mut frame.body).unwrap();
        frame.body.finish().unwrap();
        assert_eq!(loaded.rank1(699), rbv.rank1(699));

        // header, len, word count, 11 words, superblock count, superblock 0
        let mut tampered = raw;
        let second_super = 16 + 8 + 8 + 11 * 8 + 8 + 8;
        tampered[second_super] ^= 1;
        let bytes = SectionBytes::from_vec(tampered);
        let mut frame = open_frame("bits", &bytes, 0x42495453, false).unwrap();
        let err = RankBitVector::read_from(&mut frame.body).unwrap_err();
        assert!(matches!(err, Error::CorruptIndex { .. }));
    }
}
