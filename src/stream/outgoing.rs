//! Outgoing buffer and flush policy

use bytes::{Bytes, BytesMut};

/// Capacity-bounded accumulator for bytes awaiting transmission.
///
/// Exclusively owned by the stream adapter; `&mut` access on the write
/// path serializes writers at compile time, so no lock is needed here.
/// The buffer never holds more than its capacity: a full buffer forces a
/// transmission before more bytes go in.
pub(crate) struct OutgoingBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl OutgoingBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Copy bytes in, up to the free space. Returns how many were taken.
    pub(crate) fn fill(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.capacity - self.buf.len());
        self.buf.extend_from_slice(&src[..n]);
        n
    }

    pub(crate) fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    /// Take the pending bytes as one payload, leaving the buffer empty.
    pub(crate) fn take(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.split().freeze())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_stops_at_capacity() {
        let mut buf = OutgoingBuffer::new(8);
        assert_eq!(buf.fill(b"0123456789"), 8);
        assert!(buf.is_full());

        // No room until the pending payload is taken
        assert_eq!(buf.fill(b"89"), 0);
        assert_eq!(buf.take().unwrap(), Bytes::from_static(b"01234567"));
        assert!(!buf.is_full());
        assert_eq!(buf.fill(b"89"), 2);
    }

    #[test]
    fn test_take_empty_is_none() {
        let mut buf = OutgoingBuffer::new(8);
        assert!(buf.take().is_none());
    }

    #[test]
    fn test_fill_accumulates_in_order() {
        let mut buf = OutgoingBuffer::new(16);
        assert_eq!(buf.fill(b"one "), 4);
        assert_eq!(buf.fill(b"two"), 3);
        assert_eq!(buf.take().unwrap(), Bytes::from_static(b"one two"));
        assert!(buf.take().is_none());
    }
}
