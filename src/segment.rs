//! Feature segment codec
//!
//! A segment is a point range `[start, end)` along one feature's polyline,
//! packed into a single u64:
//!
//! ```text
//!  63            32 31        16 15         0
//! +----------------+------------+------------+
//! |   feature id   |   start    |    end     |
//! +----------------+------------+------------+
//! ```
//!
//! Comparing packed keys as integers orders by feature id, then by range.
//! `start > end` marks a segment traversed against the polyline direction;
//! range predicates use the normalized `[min, max)` range.

use std::cmp::Ordering;
use std::fmt;

/// External routing graph node id
pub type NodeId = u32;

/// Placeholder for "no node"
pub const INVALID_NODE_ID: NodeId = u32::MAX;

/// Reserved feature id of the sentinel segment
pub const INVALID_FID: u32 = u32::MAX;

const FID_SHIFT: u32 = 32;
const START_SHIFT: u32 = 16;
const POINT_MASK: u64 = 0xFFFF;

/// Pack a segment into its 64-bit key
///
/// Panics if a point index does not fit in 16 bits.
pub fn pack(fid: u32, start: u32, end: u32) -> u64 {
    assert!(
        start <= u16::MAX as u32 && end <= u16::MAX as u32,
        "segment points {start}..{end} exceed 16 bits (fid {fid})"
    );
    ((fid as u64) << FID_SHIFT) | ((start as u64) << START_SHIFT) | end as u64
}

/// Split a key into `(fid, start, end)`
pub fn unpack(key: u64) -> (u32, u16, u16) {
    (
        (key >> FID_SHIFT) as u32,
        ((key >> START_SHIFT) & POINT_MASK) as u16,
        (key & POINT_MASK) as u16,
    )
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FtSeg {
    pub fid: u32,
    pub point_start: u16,
    pub point_end: u16,
}

impl FtSeg {
    /// Segment of a real feature
    ///
    /// Panics on the reserved feature id or on point indexes wider than 16 bits.
    pub fn new(fid: u32, point_start: u32, point_end: u32) -> Self {
        assert_ne!(fid, INVALID_FID, "feature id {fid} is reserved for the sentinel segment");
        Self::unpack(pack(fid, point_start, point_end))
    }

    /// The sentinel segment: an occupied slot that never matches
    pub const fn invalid() -> Self {
        Self {
            fid: INVALID_FID,
            point_start: 0,
            point_end: 0,
        }
    }

    #[inline]
    pub fn pack(&self) -> u64 {
        pack(self.fid, self.point_start as u32, self.point_end as u32)
    }

    #[inline]
    pub fn unpack(key: u64) -> Self {
        let (fid, point_start, point_end) = unpack(key);
        Self {
            fid,
            point_start,
            point_end,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.fid != INVALID_FID
    }

    /// Traversal along the polyline direction
    #[inline]
    pub fn is_forward(&self) -> bool {
        self.point_start <= self.point_end
    }

    /// `(min, max)` of the point range
    #[inline]
    pub fn normalized(&self) -> (u16, u16) {
        if self.is_forward() {
            (self.point_start, self.point_end)
        } else {
            (self.point_end, self.point_start)
        }
    }

    pub fn point_count(&self) -> u16 {
        let (lo, hi) = self.normalized();
        hi - lo
    }

    /// Union of two adjacent or overlapping ranges of the same feature and direction
    pub fn merge(&self, other: &FtSeg) -> Option<FtSeg> {
        if self.fid != other.fid || self.is_forward() != other.is_forward() {
            return None;
        }
        let (s1, e1) = self.normalized();
        let (s2, e2) = other.normalized();
        if s2 > e1 || s1 > e2 {
            return None;
        }
        let (lo, hi) = (s1.min(s2), e1.max(e2));
        let (point_start, point_end) = if self.is_forward() { (lo, hi) } else { (hi, lo) };
        Some(FtSeg {
            fid: self.fid,
            point_start,
            point_end,
        })
    }

    /// Same feature and a non-empty common point range
    pub fn intersects(&self, other: &FtSeg) -> bool {
        if self.fid != other.fid {
            return false;
        }
        let (s1, e1) = self.normalized();
        let (s2, e2) = other.normalized();
        s1.max(s2) < e1.min(e2)
    }

    /// `other`'s point range lies inside this one
    pub fn covers(&self, other: &FtSeg) -> bool {
        if self.fid != other.fid {
            return false;
        }
        let (s1, e1) = self.normalized();
        let (s2, e2) = other.normalized();
        s1 <= s2 && e2 <= e1
    }
}

impl Default for FtSeg {
    fn default() -> Self {
        Self::invalid()
    }
}

impl From<u64> for FtSeg {
    fn from(key: u64) -> Self {
        FtSeg::unpack(key)
    }
}

impl From<FtSeg> for u64 {
    fn from(seg: FtSeg) -> Self {
        seg.pack()
    }
}

impl Ord for FtSeg {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pack().cmp(&other.pack())
    }
}

impl PartialOrd for FtSeg {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FtSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}-{}", self.fid, self.point_start, self.point_end)
        } else {
            write!(f, "invalid")
        }
    }
}

impl fmt::Debug for FtSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FtSeg({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        assert_eq!(pack(10, 0, 5), 0x0000_000A_0000_0005);
        assert_eq!(pack(1, 2, 3), (1u64 << 32) | (2 << 16) | 3);
        assert_eq!(unpack(0xDEAD_BEEF_1234_5678), (0xDEAD_BEEF, 0x1234, 0x5678));
        assert_eq!(FtSeg::unpack(pack(7, 65535, 0)), FtSeg::new(7, 65535, 0));
    }

    #[test]
    fn test_key_order_is_fid_then_range() {
        let mut segs = vec![
            FtSeg::new(2, 0, 1),
            FtSeg::new(1, 9, 10),
            FtSeg::new(1, 3, 4),
            FtSeg::new(1, 3, 2),
        ];
        segs.sort();
        assert_eq!(
            segs,
            vec![
                FtSeg::new(1, 3, 2),
                FtSeg::new(1, 3, 4),
                FtSeg::new(1, 9, 10),
                FtSeg::new(2, 0, 1),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "exceed 16 bits")]
    fn test_wide_point_index_panics() {
        pack(1, 70_000, 0);
    }

    #[test]
    #[should_panic(expected = "reserved")]
    fn test_sentinel_fid_rejected_by_new() {
        FtSeg::new(INVALID_FID, 0, 1);
    }

    #[test]
    fn test_sentinel() {
        let seg = FtSeg::invalid();
        assert!(!seg.is_valid());
        assert!(FtSeg::new(0, 0, 0).is_valid());
        assert_eq!(FtSeg::unpack(seg.pack()), seg);
        assert_eq!(seg.to_string(), "invalid");
    }

    #[test]
    fn test_merge_adjacent_and_overlapping() {
        let a = FtSeg::new(10, 0, 5);
        let b = FtSeg::new(10, 5, 8);
        assert_eq!(a.merge(&b), Some(FtSeg::new(10, 0, 8)));
        assert_eq!(b.merge(&a), Some(FtSeg::new(10, 0, 8)));

        let c = FtSeg::new(10, 3, 12);
        assert_eq!(a.merge(&c), Some(FtSeg::new(10, 0, 12)));

        let touching = FtSeg::new(10, 1, 3);
        assert_eq!(c.merge(&touching), Some(FtSeg::new(10, 1, 12)));
        assert_eq!(c.merge(&FtSeg::new(10, 1, 2)), None);
    }

    #[test]
    fn test_merge_rejects_gap_fid_and_direction() {
        let a = FtSeg::new(10, 0, 5);
        assert_eq!(a.merge(&FtSeg::new(10, 6, 8)), None);
        assert_eq!(a.merge(&FtSeg::new(11, 5, 8)), None);
        assert_eq!(a.merge(&FtSeg::new(10, 8, 5)), None);
    }

    #[test]
    fn test_merge_backward_keeps_direction() {
        let a = FtSeg::new(3, 9, 6);
        let b = FtSeg::new(3, 6, 2);
        assert_eq!(a.merge(&b), Some(FtSeg::new(3, 9, 2)));
    }

    #[test]
    fn test_zero_length_segment_is_forward() {
        let point = FtSeg::new(4, 3, 3);
        assert!(point.is_forward());
        assert_eq!(point.point_count(), 0);
        assert_eq!(point.merge(&FtSeg::new(4, 3, 6)), Some(FtSeg::new(4, 3, 6)));
        assert_eq!(point.merge(&FtSeg::new(4, 6, 3)), None);
    }

    #[test]
    fn test_intersects_is_half_open() {
        let a = FtSeg::new(4, 0, 5);
        assert!(a.intersects(&FtSeg::new(4, 4, 9)));
        assert!(!a.intersects(&FtSeg::new(4, 5, 9)));
        assert!(a.intersects(&FtSeg::new(4, 9, 4)));
        assert!(!a.intersects(&FtSeg::new(5, 0, 5)));
        assert!(!a.intersects(&FtSeg::new(4, 2, 2)));
    }

    #[test]
    fn test_covers() {
        let a = FtSeg::new(4, 8, 2);
        assert!(a.covers(&FtSeg::new(4, 3, 5)));
        assert!(a.covers(&FtSeg::new(4, 8, 2)));
        assert!(!a.covers(&FtSeg::new(4, 1, 5)));
        assert_eq!(a.point_count(), 6);
    }
}
