///! Shared section framing: header, body, CRC-64 footer
///!
///! Layout (little-endian):
///!
///! Header (16 bytes):
///!   magic:    u32
///!   version:  u16 = 1
///!   reserved: u16 = 0
///!   count:    u64   // logical record count, meaning is per section
///!
///! Body: section specific
///!
///! Footer (16 bytes):
///!   body_crc64: u64
///!   file_crc64: u64  // header + body

use crc::{Crc, CRC_64_GO_ISO};

use crate::error::{Error, Result};
use crate::storage::SectionBytes;
use crate::succinct::WordView;

/// CRC-64-ISO algorithm
pub const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

pub const VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 16;
pub const FOOTER_SIZE: usize = 16;

pub(crate) fn read_u16_le(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

pub(crate) fn read_u32_le(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

pub(crate) fn read_u64_le(bytes: &[u8], at: usize) -> u64 {
    u64::from_le_bytes([
        bytes[at],
        bytes[at + 1],
        bytes[at + 2],
        bytes[at + 3],
        bytes[at + 4],
        bytes[at + 5],
        bytes[at + 6],
        bytes[at + 7],
    ])
}

/// Builds one framed section in memory
pub struct FramedWriter {
    magic: u32,
    count: u64,
    body: Vec<u8>,
}

impl FramedWriter {
    pub fn new(magic: u32, count: u64) -> Self {
        Self {
            magic,
            count,
            body: Vec::new(),
        }
    }

    pub fn put_u16(&mut self, value: u16) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.body.extend_from_slice(&value.to_le_bytes());
    }

    /// Word count followed by the words
    pub fn put_words(&mut self, words: &WordView) {
        self.put_u64(words.len() as u64);
        self.body.extend_from_slice(words.as_bytes());
    }

    /// Zero-pad the body to a multiple of 8 bytes
    pub fn align8(&mut self) {
        while self.body.len() % 8 != 0 {
            self.body.push(0);
        }
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.body.len() + FOOTER_SIZE);
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.body);

        let body_crc = CRC64.checksum(&self.body);
        let file_crc = CRC64.checksum(&out);
        out.extend_from_slice(&body_crc.to_le_bytes());
        out.extend_from_slice(&file_crc.to_le_bytes());
        out
    }
}

/// A validated section: header count plus a cursor over the body
pub struct Frame<'a> {
    pub count: u64,
    pub body: BodyCursor<'a>,
}

/// Check magic, version, size and (optionally) checksums of a section
pub fn open_frame<'a>(
    section: &'a str,
    bytes: &SectionBytes,
    magic: u32,
    verify_checksums: bool,
) -> Result<Frame<'a>> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(Error::corrupt(
            section,
            format!("truncated: {} bytes", bytes.len()),
        ));
    }

    let found = read_u32_le(bytes, 0);
    if found != magic {
        return Err(Error::corrupt(
            section,
            format!("invalid magic: expected 0x{magic:08x}, got 0x{found:08x}"),
        ));
    }
    let version = read_u16_le(bytes, 4);
    if version != VERSION {
        return Err(Error::corrupt(section, format!("unsupported version {version}")));
    }
    let count = read_u64_le(bytes, 8);

    let body_end = bytes.len() - FOOTER_SIZE;
    if verify_checksums {
        let body_crc = read_u64_le(bytes, body_end);
        let file_crc = read_u64_le(bytes, body_end + 8);
        if CRC64.checksum(&bytes[HEADER_SIZE..body_end]) != body_crc {
            return Err(Error::corrupt(section, "body checksum mismatch"));
        }
        if CRC64.checksum(&bytes[..body_end]) != file_crc {
            return Err(Error::corrupt(section, "file checksum mismatch"));
        }
    }

    Ok(Frame {
        count,
        body: BodyCursor {
            section,
            body: bytes.slice(HEADER_SIZE..body_end),
            pos: 0,
        },
    })
}

/// Sequential reader over a section body; sub-ranges stay zero-copy
pub struct BodyCursor<'a> {
    section: &'a str,
    body: SectionBytes,
    pos: usize,
}

impl<'a> BodyCursor<'a> {
    pub fn section(&self) -> &'a str {
        self.section
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.body.len() - self.pos < n {
            return Err(Error::corrupt(
                self.section,
                format!(
                    "body too short: need {} bytes at offset {}, have {}",
                    n,
                    self.pos,
                    self.body.len() - self.pos
                ),
            ));
        }
        Ok(())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.need(8)?;
        let value = read_u64_le(&self.body, self.pos);
        self.pos += 8;
        Ok(value)
    }

    /// Take `n` raw bytes
    pub fn take(&mut self, n: usize) -> Result<SectionBytes> {
        self.need(n)?;
        let bytes = self.body.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }

    /// Word count followed by the words, as written by `put_words`
    pub fn read_words(&mut self) -> Result<WordView> {
        let n = self.read_u64()?;
        let n_bytes = usize::try_from(n)
            .ok()
            .and_then(|n| n.checked_mul(8))
            .ok_or_else(|| Error::corrupt(self.section, format!("word count {n} too large")))?;
        Ok(WordView::from_bytes(self.take(n_bytes)?))
    }

    pub fn skip_to_align8(&mut self) -> Result<()> {
        let pad = (8 - self.pos % 8) % 8;
        self.take(pad).map(|_| ())
    }

    /// Fail if unread bytes remain
    pub fn finish(self) -> Result<()> {
        if self.pos != self.body.len() {
            return Err(Error::corrupt(
                self.section,
                format!("{} trailing bytes", self.body.len() - self.pos),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: u32 = 0x54455354; // "TEST"

    fn framed() -> Vec<u8> {
        let mut w = FramedWriter::new(MAGIC, 2);
        w.put_u64(7);
        w.put_u64(11);
        w.finish()
    }

    #[test]
    fn test_frame_roundtrip() {
        let bytes = SectionBytes::from_vec(framed());
        assert_eq!(bytes.len(), HEADER_SIZE + 16 + FOOTER_SIZE);

        let Frame { count, mut body } = open_frame("t", &bytes, MAGIC, true).unwrap();
        assert_eq!(count, 2);
        assert_eq!(body.read_u64().unwrap(), 7);
        assert_eq!(body.read_u64().unwrap(), 11);
        body.finish().unwrap();
    }

    #[test]
    fn test_wrong_magic() {
        let bytes = SectionBytes::from_vec(framed());
        let err = open_frame("t", &bytes, 0x4E4F5045, true).err().unwrap();
        assert!(err.to_string().contains("invalid magic"));
    }

    #[test]
    fn test_flipped_body_bit_detected() {
        let mut raw = framed();
        raw[HEADER_SIZE + 3] ^= 0x10;
        let bytes = SectionBytes::from_vec(raw);
        let err = open_frame("t", &bytes, MAGIC, true).err().unwrap();
        assert!(err.to_string().contains("body checksum"));

        // Unverified open still succeeds and reads the damaged value
        let mut frame = open_frame("t", &bytes, MAGIC, false).unwrap();
        assert_ne!(frame.body.read_u64().unwrap(), 7);
    }

    #[test]
    fn test_truncated_section() {
        let bytes = SectionBytes::from_vec(vec![0u8; 20]);
        assert!(matches!(
            open_frame("t", &bytes, MAGIC, false),
            Err(Error::CorruptIndex { .. })
        ));
    }

    #[test]
    fn test_short_body_read() {
        let bytes = SectionBytes::from_vec(framed());
        let mut frame = open_frame("t", &bytes, MAGIC, true).unwrap();
        frame.body.take(12).unwrap();
        assert!(frame.body.read_u64().is_err());
    }
}
