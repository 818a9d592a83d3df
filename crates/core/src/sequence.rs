use std::sync::atomic::{AtomicU64, Ordering};

/// Issues CSeq values (RFC 2326 §12.17) for one client session.
///
/// Values start at the configured base and increase by one per call,
/// including for requests that later fail. They are never reused.
#[derive(Debug)]
pub struct SequenceAllocator {
    base: u64,
    next: AtomicU64,
}

impl SequenceAllocator {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            next: AtomicU64::new(base),
        }
    }

    /// Allocate the next CSeq.
    pub fn next(&self) -> u64 {
        let cseq = self.next.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(cseq, "allocated CSeq");
        cseq
    }

    /// The most recently allocated CSeq, if any.
    pub fn last(&self) -> Option<u64> {
        let next = self.next.load(Ordering::SeqCst);
        (next > self.base).then(|| next - 1)
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_base_and_increments() {
        let seq = SequenceAllocator::new(1);
        assert_eq!(seq.last(), None);
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        assert_eq!(seq.next(), 3);
        assert_eq!(seq.last(), Some(3));
    }

    #[test]
    fn default_base_is_zero() {
        let seq = SequenceAllocator::default();
        assert_eq!(seq.next(), 0);
        assert_eq!(seq.last(), Some(0));
    }
}
