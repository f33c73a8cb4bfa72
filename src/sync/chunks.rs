//! Splitting an identifier range into commit-sized chunks.

use crate::jobs::RecordRange;
use crate::store::RecordId;

/// Iterator over consecutive chunks of at most `flush` identifiers.
///
/// Chunks start at `lower`, `lower + flush`, `lower + 2 * flush`, ... and the last one is clipped
/// to `upper`.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    next: u64,
    upper: u64,
    flush: u64,
}

/// Plan the chunks of `[lower, upper]`. A `flush` of zero is treated as one.
pub fn chunk_ranges(lower: RecordId, upper: RecordId, flush: usize) -> ChunkPlan {
    ChunkPlan {
        next: u64::from(lower),
        upper: u64::from(upper),
        flush: (flush as u64).max(1),
    }
}

impl Iterator for ChunkPlan {
    type Item = RecordRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.upper {
            return None;
        }
        let lower = self.next;
        let upper = lower.saturating_add(self.flush - 1).min(self.upper);
        self.next = upper + 1;
        // Both bounds stay within the original `RecordId` range.
        Some(RecordRange {
            lower: lower as RecordId,
            upper: upper as RecordId,
        })
    }
}

impl RecordRange {
    /// Number of identifiers covered by the range.
    pub fn len(&self) -> u64 {
        u64::from(self.upper) - u64::from(self.lower) + 1
    }

    /// Ranges are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Identifiers in increasing order.
    pub fn ids(&self) -> std::ops::RangeInclusive<RecordId> {
        self.lower..=self.upper
    }
}
