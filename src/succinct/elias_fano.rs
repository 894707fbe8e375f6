//! Elias-Fano encoding for monotone integer sequences
//!
//! Each value is split into `l` low bits, stored verbatim, and a high part
//! stored in unary inside an upper bit array where the i-th value sets bit
//! `(v >> l) + i`. Random access is a select on the upper array, sped up by
//! remembering the position of every 256th set bit.
//!
//! Space: about `2 + l` bits per value with `l = floor(log2(max / n))`.

use super::{read_bits, select_in_word, BitWriter, WordView};
use crate::error::{Error, Result};
use crate::formats::framing::{BodyCursor, FramedWriter};

const SELECT_SAMPLE_RATE: u64 = 256;

#[derive(Debug, Clone)]
pub struct EliasFano {
    len: u64,
    lower_width: u32,
    lower: WordView,
    upper: WordView,
    /// Position of set bit `k * SELECT_SAMPLE_RATE` in `upper`
    samples: Vec<u64>,
}

/// Sample every 256th set bit; returns the samples and the total popcount
fn build_samples(upper: &WordView) -> (Vec<u64>, u64) {
    let mut samples = Vec::new();
    let mut seen = 0u64;
    let mut next = 0u64;
    for (w, word) in upper.iter().enumerate() {
        let ones = word.count_ones() as u64;
        while next < seen + ones {
            let bit = select_in_word(word, (next - seen) as u32);
            samples.push(w as u64 * 64 + bit as u64);
            next += SELECT_SAMPLE_RATE;
        }
        seen += ones;
    }
    (samples, seen)
}

fn lower_width_for(max: u64, n: u64) -> u32 {
    if n == 0 {
        return 0;
    }
    let ratio = max / n;
    if ratio == 0 {
        0
    } else {
        63 - ratio.leading_zeros()
    }
}

impl EliasFano {
    /// Encode a non-decreasing sequence
    ///
    /// Panics if `values` decreases anywhere.
    pub fn from_monotone(values: &[u64]) -> Self {
        let n = values.len() as u64;
        let max = values.last().copied().unwrap_or(0);
        let lower_width = lower_width_for(max, n);
        let lower_mask = if lower_width == 0 {
            0
        } else {
            (1u64 << lower_width) - 1
        };

        let mut lower = BitWriter::new();
        let upper_len = if n == 0 { 0 } else { n + (max >> lower_width) + 1 };
        let mut upper = BitWriter::zeroed(upper_len);

        let mut prev = 0u64;
        for (i, &value) in values.iter().enumerate() {
            assert!(
                value >= prev,
                "Elias-Fano input must be non-decreasing: {value} after {prev} at {i}"
            );
            prev = value;
            lower.push(value & lower_mask, lower_width);
            upper.set((value >> lower_width) + i as u64);
        }

        let lower = WordView::from_words(&lower.into_words());
        let upper = WordView::from_words(&upper.into_words());
        let (samples, _) = build_samples(&upper);
        Self {
            len: n,
            lower_width,
            lower,
            upper,
            samples,
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value at position `i`
    pub fn get(&self, i: u64) -> Option<u64> {
        if i >= self.len {
            return None;
        }
        let high = self.select1(i) - i;
        let low = read_bits(&self.lower, i * self.lower_width as u64, self.lower_width);
        Some((high << self.lower_width) | low)
    }

    /// Position of the i-th set bit of the upper array, `i < len`
    fn select1(&self, i: u64) -> u64 {
        let k = (i / SELECT_SAMPLE_RATE) as usize;
        let start = self.samples[k];
        let mut remaining = i - k as u64 * SELECT_SAMPLE_RATE;

        let mut word_idx = (start / 64) as usize;
        let mut word = self.upper.get(word_idx) & (u64::MAX << (start % 64));
        loop {
            let ones = word.count_ones() as u64;
            if remaining < ones {
                return word_idx as u64 * 64 + select_in_word(word, remaining as u32) as u64;
            }
            remaining -= ones;
            word_idx += 1;
            word = self.upper.get(word_idx);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    pub(crate) fn write_to(&self, out: &mut FramedWriter) {
        out.put_u64(self.len);
        out.put_u64(self.lower_width as u64);
        out.put_words(&self.lower);
        out.put_words(&self.upper);
    }

    pub(crate) fn read_from(body: &mut BodyCursor<'_>) -> Result<Self> {
        let section = body.section();
        let len = body.read_u64()?;
        let lower_width = body.read_u64()?;
        if lower_width > 63 {
            return Err(Error::corrupt(
                section,
                format!("Elias-Fano lower width {lower_width} out of range"),
            ));
        }
        let lower_width = lower_width as u32;
        let lower = body.read_words()?;
        let upper = body.read_words()?;

        let lower_bits = len.checked_mul(lower_width as u64).ok_or_else(|| {
            Error::corrupt(section, format!("Elias-Fano length {len} too large"))
        })?;
        if lower.len() as u64 != lower_bits.div_ceil(64) {
            return Err(Error::corrupt(
                section,
                format!(
                    "Elias-Fano lower array has {} words, expected {}",
                    lower.len(),
                    lower_bits.div_ceil(64)
                ),
            ));
        }

        let (samples, ones) = build_samples(&upper);
        if ones != len {
            return Err(Error::corrupt(
                section,
                format!("Elias-Fano upper array has {ones} set bits, expected {len}"),
            ));
        }

        Ok(Self {
            len,
            lower_width,
            lower,
            upper,
            samples,
        })
    }
}
