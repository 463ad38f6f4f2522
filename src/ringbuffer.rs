//! Lock-free single-producer/single-consumer byte queue carrying raw MIDI
//! bytes from the producer thread to the audio callback.
//!
//! The producer only ever advances `write`; the consumer only ever
//! advances `read`. Acquire/release pairs on those two atomics are the
//! buffer's entire synchronization story — no lock, no condvar.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct RingBuffer {
    buffer: UnsafeCell<Box<[u8]>>,
    capacity: usize,
    mask: usize,
    write: AtomicUsize,
    read: AtomicUsize,
}

// SAFETY: `write` is only ever mutated by the producer (via `&self` methods
// called from one thread), `read` only by the consumer. The acquire/release
// pairing on those atomics is what makes sharing `&RingBuffer` across the
// two threads sound despite the `UnsafeCell` buffer.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "ring buffer capacity must be a power of two");
        Self {
            buffer: UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
            capacity,
            mask: capacity - 1,
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    pub fn bytes_available(&self) -> usize {
        let w = self.write.load(Ordering::Acquire);
        let r = self.read.load(Ordering::Relaxed);
        w.wrapping_sub(r)
    }

    pub fn write_bytes_available(&self) -> usize {
        self.capacity - self.bytes_available()
    }

    /// Copies all of `bytes` in, or none of it. Returns whether it fit.
    pub fn write(&self, bytes: &[u8]) -> bool {
        if bytes.len() > self.write_bytes_available() {
            return false;
        }

        let w = self.write.load(Ordering::Relaxed);
        // SAFETY: only the producer writes here, and only at offsets at or
        // past `write`, which the consumer never reads past `read`.
        let buf = unsafe { &mut *self.buffer.get() };
        for (i, &b) in bytes.iter().enumerate() {
            buf[(w.wrapping_add(i)) & self.mask] = b;
        }
        self.write.store(w.wrapping_add(bytes.len()), Ordering::Release);
        true
    }

    /// Copies exactly `out.len()` bytes. Caller guarantees
    /// `out.len() <= bytes_available()`.
    pub fn read(&self, out: &mut [u8]) {
        debug_assert!(out.len() <= self.bytes_available());

        let r = self.read.load(Ordering::Relaxed);
        // SAFETY: only the consumer reads here, and only at offsets before
        // `write`, which the acquire load below has already observed.
        let buf = unsafe { &*self.buffer.get() };
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = buf[(r.wrapping_add(i)) & self.mask];
        }
        self.read.store(r.wrapping_add(out.len()), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let rb = RingBuffer::new(16);
        assert!(rb.write(&[0x90, 0x3c, 0x64]));
        assert_eq!(rb.bytes_available(), 3);
        let mut out = [0u8; 3];
        rb.read(&mut out);
        assert_eq!(out, [0x90, 0x3c, 0x64]);
        assert_eq!(rb.bytes_available(), 0);
    }

    #[test]
    fn write_fails_rather_than_partially_writes() {
        let rb = RingBuffer::new(4);
        assert!(rb.write(&[1, 2, 3]));
        assert!(!rb.write(&[4, 5])); // only 1 byte free
        assert_eq!(rb.bytes_available(), 3);
    }

    #[test]
    fn wraps_around_capacity() {
        let rb = RingBuffer::new(4);
        for round in 0u8..20 {
            assert!(rb.write(&[round, round.wrapping_add(1)]));
            let mut out = [0u8; 2];
            rb.read(&mut out);
            assert_eq!(out, [round, round.wrapping_add(1)]);
        }
    }

    #[test]
    fn fifo_order_under_interleaving() {
        let rb = RingBuffer::new(8);
        assert!(rb.write(&[1, 2]));
        let mut out = [0u8; 1];
        rb.read(&mut out);
        assert_eq!(out, [1]);
        assert!(rb.write(&[3, 4, 5]));
        let mut out = [0u8; 4];
        rb.read(&mut out);
        assert_eq!(out, [2, 3, 4, 5]);
    }
}
