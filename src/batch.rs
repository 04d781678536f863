//! Message-sequence ranges for chunked FETCH

use std::fmt;

/// Messages fetched per FETCH command. Bounds the size of a single
/// response; not a protocol limit.
pub const FETCH_BATCH_SIZE: u32 = 50;

/// Inclusive message-sequence range `low:high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchBatch {
    pub low: u32,
    pub high: u32,
}

impl FetchBatch {
    /// Number of messages in the range.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.high - self.low + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for FetchBatch {
    /// IMAP sequence-set syntax, e.g. `51:100`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

/// Consecutive batches covering `1..=count`, each at most `size` long.
///
/// Cloning yields an independent iterator from the current position,
/// so the sequence can be restarted from a saved copy.
///
/// ```
/// use mailusage::FetchBatches;
///
/// let ranges: Vec<String> = FetchBatches::new(120, 50).map(|b| b.to_string()).collect();
/// assert_eq!(ranges, ["1:50", "51:100", "101:120"]);
/// ```
#[derive(Debug, Clone)]
pub struct FetchBatches {
    next: u32,
    count: u32,
    size: u32,
}

impl FetchBatches {
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn new(count: u32, size: u32) -> Self {
        assert!(size > 0, "batch size must be positive");
        Self {
            next: 1,
            count,
            size,
        }
    }
}

impl Iterator for FetchBatches {
    type Item = FetchBatch;

    fn next(&mut self) -> Option<FetchBatch> {
        if self.next == 0 || self.next > self.count {
            return None;
        }
        let low = self.next;
        let high = low.saturating_add(self.size - 1).min(self.count);
        // wraps to 0 once u32::MAX has been emitted
        self.next = high.wrapping_add(1);
        Some(FetchBatch { low, high })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.next == 0 || self.next > self.count {
            0
        } else {
            (self.count - self.next) / self.size + 1
        };
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FetchBatches {}
