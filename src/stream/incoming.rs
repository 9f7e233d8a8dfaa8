//! Incoming buffer: asynchronous arrival in, blocking reads out

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Shared FIFO of received bytes.
///
/// The lifecycle pump is the only producer; blocking `read` calls are the
/// only consumers. One mutex guards both the bytes and the disposed flag.
/// Wakes are broadcast: more than one reader may be blocked, and a
/// disposal must reach all of them, so every woken reader re-checks its
/// predicate before draining (another reader may have emptied the buffer,
/// or the wake may carry no data at all).
pub(crate) struct IncomingBuffer {
    inner: Mutex<Inner>,
    data_ready: Condvar,
}

struct Inner {
    buf: VecDeque<u8>,
    disposed: bool,
}

impl IncomingBuffer {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::new(),
                disposed: false,
            }),
            data_ready: Condvar::new(),
        }
    }

    /// Append one arrival batch and wake all blocked readers.
    ///
    /// Returns false if the buffer is already disposed; the batch is
    /// dropped in that case.
    pub(crate) fn push(&self, data: &[u8]) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.disposed {
            return false;
        }
        inner.buf.extend(data);
        drop(inner);
        self.data_ready.notify_all();
        true
    }

    /// Blocking FIFO read.
    ///
    /// Blocks while the buffer is empty and the stream is live. Returns
    /// `min(buf.len(), available)` drained bytes, or 0 at end-of-stream
    /// (disposed with nothing buffered) or for an empty destination.
    pub(crate) fn read_blocking(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        let mut inner = self.inner.lock().unwrap();
        while inner.buf.is_empty() && !inner.disposed {
            inner = self.data_ready.wait(inner).unwrap();
        }
        Self::drain(&mut inner.buf, buf)
    }

    /// Copy up to `buf.len()` bytes out of the FIFO.
    fn drain(fifo: &mut VecDeque<u8>, buf: &mut [u8]) -> usize {
        let (front, back) = fifo.as_slices();
        let n1 = front.len().min(buf.len());
        buf[..n1].copy_from_slice(&front[..n1]);

        let n2 = back.len().min(buf.len() - n1);
        if n2 > 0 {
            buf[n1..n1 + n2].copy_from_slice(&back[..n2]);
        }

        let total = n1 + n2;
        fifo.drain(..total);
        total
    }

    /// Count of buffered, unread bytes
    pub(crate) fn available(&self) -> usize {
        self.inner.lock().unwrap().buf.len()
    }

    /// Mark disposed and wake every blocked reader.
    ///
    /// Returns true on the first transition, false if already disposed.
    pub(crate) fn dispose(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.disposed {
            return false;
        }
        inner.disposed = true;
        drop(inner);
        self.data_ready.notify_all();
        true
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.inner.lock().unwrap().disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order_across_batches() {
        let buf = IncomingBuffer::new();
        assert!(buf.push(b"abc"));
        assert!(buf.push(b"def"));
        assert_eq!(buf.available(), 6);

        let mut out = [0u8; 4];
        assert_eq!(buf.read_blocking(&mut out), 4);
        assert_eq!(&out, b"abcd");
        assert_eq!(buf.available(), 2);

        let mut rest = [0u8; 8];
        assert_eq!(buf.read_blocking(&mut rest), 2);
        assert_eq!(&rest[..2], b"ef");
    }

    #[test]
    fn test_zero_len_read_never_blocks() {
        let buf = IncomingBuffer::new();
        assert_eq!(buf.read_blocking(&mut []), 0);
    }

    #[test]
    fn test_dispose_wakes_blocked_reader() {
        let buf = Arc::new(IncomingBuffer::new());
        let reader = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                let mut out = [0u8; 8];
                buf.read_blocking(&mut out)
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(buf.dispose());
        assert!(!buf.dispose());
        assert_eq!(reader.join().unwrap(), 0);
    }

    #[test]
    fn test_push_wakes_blocked_reader() {
        let buf = Arc::new(IncomingBuffer::new());
        let reader = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                let mut out = [0u8; 8];
                let n = buf.read_blocking(&mut out);
                (n, out)
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(buf.push(b"wake"));
        let (n, out) = reader.join().unwrap();
        assert_eq!(n, 4);
        assert_eq!(&out[..4], b"wake");
    }

    #[test]
    fn test_push_after_dispose_is_dropped() {
        let buf = IncomingBuffer::new();
        assert!(buf.dispose());
        assert!(!buf.push(b"late"));
        assert_eq!(buf.available(), 0);
    }

    #[test]
    fn test_disposed_buffer_drains_remainder_then_eof() {
        let buf = IncomingBuffer::new();
        buf.push(b"tail");
        buf.dispose();

        let mut out = [0u8; 8];
        assert_eq!(buf.read_blocking(&mut out), 4);
        assert_eq!(&out[..4], b"tail");
        assert_eq!(buf.read_blocking(&mut out), 0);
    }
}
