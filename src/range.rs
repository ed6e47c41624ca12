use serde::{Deserialize, Serialize};

/// Number of keys in the 32-bit keyspace.
pub const KEYSPACE: u64 = 1 << 32;

/// An arc of the 32-bit keyspace bounded inclusively on both ends
/// (`start..=end`).
///
/// If `start > end`, the arc is wrapping and is equivalent to covering two
/// ranges: `(start..=u32::MAX)` and `(0..=end)`. An arc is never empty; the
/// whole keyspace is any arc with `start == end.wrapping_add(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    pub start: u32,
    pub end: u32,
}

impl KeyRange {
    /// Creates a `KeyRange`.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns `true` if the arc passes through `u32::MAX` back to `0`.
    #[inline]
    pub fn is_wrapping(&self) -> bool {
        self.start > self.end
    }

    /// Returns `true` if `key` lies on the arc.
    pub fn contains(&self, key: u32) -> bool {
        if self.is_wrapping() {
            key >= self.start || key <= self.end
        } else {
            key >= self.start && key <= self.end
        }
    }

    /// Returns `true` if the arc shares at least one key with `other`.
    pub fn is_overlapping(&self, other: &Self) -> bool {
        self.contains(other.start) || other.contains(self.start)
    }

    /// Number of keys on the arc.
    pub fn size(&self) -> u64 {
        let (start, end) = (u64::from(self.start), u64::from(self.end));
        if self.is_wrapping() {
            KEYSPACE - start + end + 1
        } else {
            end - start + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic() {
        let range = KeyRange::new(10, 5);

        assert!(range.is_wrapping());
        assert!(range.contains(0));
        assert!(range.contains(5));
        assert!(!range.contains(6));
        assert!(!range.contains(9));
        assert!(range.contains(10));
        assert!(range.contains(u32::MAX));

        let range = KeyRange::new(5, 10);

        assert!(!range.is_wrapping());
        assert!(!range.contains(0));
        assert!(!range.contains(4));
        assert!(range.contains(5));
        assert!(range.contains(7));
        assert!(range.contains(10));
        assert!(!range.contains(11));
        assert!(!range.contains(u32::MAX));

        let range = KeyRange::new(7, 7);

        assert!(!range.is_wrapping());
        assert!(range.contains(7));
        assert!(!range.contains(8));
    }

    #[test]
    fn overlap() {
        {
            // =====
            //    =====
            let r1 = KeyRange::new(5, 10);
            let r2 = KeyRange::new(8, 13);

            assert!(r1.is_overlapping(&r2));
            assert!(r2.is_overlapping(&r1));
        }

        {
            // =====
            //      =====
            let r1 = KeyRange::new(5, 10);
            let r2 = KeyRange::new(11, 15);

            assert!(!r1.is_overlapping(&r2));
            assert!(!r2.is_overlapping(&r1));
        }

        {
            //     =====
            // ====     ====
            let r1 = KeyRange::new(5, 10);
            let r2 = KeyRange::new(11, 4);

            assert!(!r1.is_overlapping(&r2));
            assert!(!r2.is_overlapping(&r1));
        }

        {
            //     =====
            // ======   ====
            let r1 = KeyRange::new(5, 10);
            let r2 = KeyRange::new(11, 7);

            assert!(r1.is_overlapping(&r2));
            assert!(r2.is_overlapping(&r1));
        }

        {
            // =====     ====
            // =======  =====
            let r1 = KeyRange::new(10, 5);
            let r2 = KeyRange::new(9, 6);

            assert!(r1.is_overlapping(&r2));
            assert!(r2.is_overlapping(&r1));
        }
    }

    #[test]
    fn size() {
        // Whole keyspace.
        assert_eq!(KeyRange::new(0, u32::MAX).size(), KEYSPACE);
        assert_eq!(KeyRange::new(11, 10).size(), KEYSPACE);

        // Wrapping arcs.
        assert_eq!(KeyRange::new(u32::MAX, 0).size(), 2);
        assert_eq!(KeyRange::new(12, 10).size(), KEYSPACE - 1);

        // Regular arcs.
        assert_eq!(KeyRange::new(5, 10).size(), 6);
        assert_eq!(KeyRange::new(3, 3).size(), 1);
    }

    #[test]
    fn serde() {
        let range = KeyRange::new(4064395129, 106181428);
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"start":4064395129,"end":106181428}"#);
        assert_eq!(serde_json::from_str::<KeyRange>(&json).unwrap(), range);
    }
}
