//! Fixed-capacity FIFO ring for sensor samples.
//!
//! Overflow is sticky: once the ring fills, further pushes are dropped and
//! the flag stays set until the FIFO is cleared, matching how the hardware
//! part reports FIFO overflow.

/// FIFO capacity in bytes.
pub(crate) const FIFO_CAPACITY: usize = 1024;

pub(crate) struct Fifo {
    buf: Box<[u8; FIFO_CAPACITY]>,
    head: usize,
    tail: usize,
    len: usize,
    pub(crate) enabled: bool,
    pub(crate) overflow: bool,
}

impl Fifo {
    pub(crate) fn new() -> Self {
        Self { buf: Box::new([0; FIFO_CAPACITY]), head: 0, tail: 0, len: 0, enabled: false, overflow: false }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn push(&mut self, byte: u8) -> bool {
        if self.len == FIFO_CAPACITY {
            self.overflow = true;
            return false;
        }
        self.buf[self.head] = byte;
        self.head = (self.head + 1) % FIFO_CAPACITY;
        self.len += 1;
        true
    }

    /// Append a whole sample frame, stopping at the first dropped byte.
    pub(crate) fn push_frame(&mut self, frame: &[u8]) {
        for &byte in frame {
            if !self.push(byte) {
                break;
            }
        }
    }

    pub(crate) fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.buf[self.tail];
        self.tail = (self.tail + 1) % FIFO_CAPACITY;
        self.len -= 1;
        Some(byte)
    }

    /// Drop all buffered bytes and clear the overflow flag.
    pub(crate) fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
        self.overflow = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_preserves_order_across_wraparound() {
        let mut fifo = Fifo::new();
        // Fill and drain most of the ring to move head near the edge.
        for round in 0..3 {
            for i in 0..400u16 {
                assert!(fifo.push((i % 251) as u8), "round {round}");
            }
            for i in 0..400u16 {
                assert_eq!(fifo.pop(), Some((i % 251) as u8));
            }
        }
        assert_eq!(fifo.pop(), None);
        assert!(!fifo.overflow);
    }

    #[test]
    fn overflow_is_sticky_until_clear() {
        let mut fifo = Fifo::new();
        for _ in 0..FIFO_CAPACITY {
            assert!(fifo.push(0xAA));
        }
        assert!(!fifo.push(0xBB));
        assert!(fifo.overflow);
        assert_eq!(fifo.len(), FIFO_CAPACITY);

        fifo.pop();
        assert!(fifo.overflow, "draining does not clear the flag");

        fifo.clear();
        assert!(!fifo.overflow);
        assert_eq!(fifo.len(), 0);
    }

    #[test]
    fn push_frame_stops_at_capacity() {
        let mut fifo = Fifo::new();
        for _ in 0..FIFO_CAPACITY - 4 {
            fifo.push(0);
        }
        fifo.push_frame(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(fifo.len(), FIFO_CAPACITY);
        assert!(fifo.overflow);
    }
}
