//! Sequenced document identifiers
//!
//! A `DocumentId` is a 128-bit value `(tsec, tnsec, seq)`: wall-clock
//! seconds and nanoseconds prefix an allocator-issued sequence number.
//! Ordering is lexicographic by timestamp first, then sequence, so ids
//! issued later compare greater and the string form sorts the same way the
//! values do. The sequence component also determines which index shard a
//! document's postings land in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// Internal ordered document identifier `(tsec, tnsec, seq)`
///
/// Two ids are equal iff every component is equal. Within one process ids
/// are structurally unique because `seq` is drawn from a monotonic counter;
/// across processes sharing the metadata store collisions additionally
/// require identical timestamps.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DocumentId {
    /// Seconds since the Unix epoch
    pub tsec: u64,
    /// Nanosecond remainder
    pub tnsec: u32,
    /// Allocator-issued sequence number
    pub seq: u32,
}

impl DocumentId {
    /// The smallest id; used as the "start from the beginning" cursor
    pub const MIN: DocumentId = DocumentId {
        tsec: 0,
        tnsec: 0,
        seq: 0,
    };

    /// The largest id; returned as the cursor of a completed search
    pub const MAX: DocumentId = DocumentId {
        tsec: u64::MAX,
        tnsec: u32::MAX,
        seq: u32::MAX,
    };

    /// Create an id from explicit components
    pub fn new(tsec: u64, tnsec: u32, seq: u32) -> Self {
        DocumentId { tsec, tnsec, seq }
    }

    /// Create an id stamped with the current wall clock
    pub fn now(seq: u32) -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        DocumentId {
            tsec: elapsed.as_secs(),
            tnsec: elapsed.subsec_nanos(),
            seq,
        }
    }

    /// Create an id carrying only a timestamp, for range bounds
    pub fn from_timestamp(tsec: u64, tnsec: u32) -> Self {
        DocumentId {
            tsec,
            tnsec,
            seq: 0,
        }
    }

    /// Index shard this id belongs to: `seq / tokens_shard_size`
    pub fn shard(&self, tokens_shard_size: u64) -> u64 {
        u64::from(self.seq) / tokens_shard_size.max(1)
    }

    /// The next strictly-greater id, used as a pagination cursor
    pub fn successor(&self) -> DocumentId {
        let (seq, carry) = match self.seq.checked_add(1) {
            Some(s) => (s, false),
            None => (0, true),
        };
        if !carry {
            return DocumentId { seq, ..*self };
        }
        let (tnsec, carry) = match self.tnsec.checked_add(1) {
            Some(n) => (n, false),
            None => (0, true),
        };
        DocumentId {
            tsec: self.tsec.saturating_add(u64::from(carry)),
            tnsec,
            seq,
        }
    }
}

/// Fixed-width hex form: big-endian components so that string order equals
/// id order. This is the `documents` column key and the pagination cursor.
impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}.{:08x}.{:08x}", self.tsec, self.tnsec, self.seq)
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::InvalidRequest(format!("malformed document id cursor: '{}'", s));

        let mut parts = s.split('.');
        let tsec = parts.next().ok_or_else(bad)?;
        let tnsec = parts.next().ok_or_else(bad)?;
        let seq = parts.next().ok_or_else(bad)?;
        if parts.next().is_some() || tsec.len() != 16 || tnsec.len() != 8 || seq.len() != 8 {
            return Err(bad());
        }

        Ok(DocumentId {
            tsec: u64::from_str_radix(tsec, 16).map_err(|_| bad())?,
            tnsec: u32::from_str_radix(tnsec, 16).map_err(|_| bad())?,
            seq: u32::from_str_radix(seq, 16).map_err(|_| bad())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_timestamp_first() {
        let a = DocumentId::new(100, 0, 999);
        let b = DocumentId::new(101, 0, 0);
        assert!(a < b);

        let c = DocumentId::new(100, 5, 0);
        let d = DocumentId::new(100, 5, 1);
        assert!(c < d);
    }

    #[test]
    fn test_string_order_matches_value_order() {
        let ids = [
            DocumentId::MIN,
            DocumentId::new(1, 0, 7),
            DocumentId::new(1, 1, 0),
            DocumentId::new(u32::MAX as u64 + 1, 0, 0),
            DocumentId::MAX,
        ];
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].to_string() < pair[1].to_string());
        }
    }

    #[test]
    fn test_roundtrip_string() {
        let id = DocumentId::new(1234567890, 987654321, 42);
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("".parse::<DocumentId>().is_err());
        assert!("zzz".parse::<DocumentId>().is_err());
        assert!("0102.0304.05".parse::<DocumentId>().is_err());
        assert!("0000000000000001.00000002.00000003.04"
            .parse::<DocumentId>()
            .is_err());
    }

    #[test]
    fn test_shard_assignment() {
        assert_eq!(DocumentId::new(0, 0, 0).shard(2), 0);
        assert_eq!(DocumentId::new(0, 0, 1).shard(2), 0);
        assert_eq!(DocumentId::new(0, 0, 2).shard(2), 1);
        assert_eq!(DocumentId::new(0, 0, 7_999_999).shard(4_000_000), 1);
    }

    #[test]
    fn test_successor_is_strictly_greater() {
        let id = DocumentId::new(10, 20, 30);
        assert_eq!(id.successor(), DocumentId::new(10, 20, 31));

        let wrap = DocumentId::new(10, 20, u32::MAX);
        let next = wrap.successor();
        assert!(next > wrap);
        assert_eq!(next, DocumentId::new(10, 21, 0));
    }
}
