//! SPSC-synchronized circular byte buffer.
//!
//! `write_p` (W) is the write index, `read_p` (R) the read index, N the
//! capacity. Possible states:
//!
//! 1. `R == W`       -- empty buffer (nothing to read)
//! 2. `R < W`        -- `W - R` bytes available for reading
//! 3. `R > W+1`      -- W cycled, `N - R + W` bytes available for reading
//! 4. `R == W+1`     -- full buffer (nowhere to write)
//!
//! In states 1 and 2 (`R <= W`) the writer can place `N - W` bytes (one
//! less while `R == 0`, keeping the full and empty states distinct); in
//! states 3 and 4 (`R > W`) it can place `R - W - 1` bytes. Whenever a
//! cursor reaches the end of the array it cycles to 0, never to N.
//!
//! The producer owns W and observes R with acquire ordering; the consumer
//! owns R and observes W with acquire ordering. The single permitted
//! blocking condition is the producer waiting for space: it raises the
//! `full` flag and parks on a binary-semaphore wait-point that the consumer
//! credits from `bytes_read`.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Create a ring of capacity `N` and split it into its two endpoint handles.
///
/// The handles are the sole way to touch the ring; holding exactly one
/// `Producer` and one `Consumer` is what makes the lock-free cursor
/// arithmetic sound, so neither handle is `Clone`.
pub fn ring<const N: usize>() -> (Producer<N>, Consumer<N>) {
    let shared = Arc::new(Ring::new());
    (
        Producer {
            ring: Arc::clone(&shared),
        },
        Consumer { ring: shared },
    )
}

struct Ring<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
    write_p: AtomicUsize,
    read_p: AtomicUsize,
    full: AtomicBool,
    full_sem: BinarySemaphore,
}

// SAFETY: the producer only writes bytes in the writable region [W, ...)
// and the consumer only reads bytes in the readable region [R, ...); the
// cursor arithmetic keeps the two intervals disjoint, and each cursor is
// published with release ordering before the peer loads it with acquire.
unsafe impl<const N: usize> Sync for Ring<N> {}

impl<const N: usize> Ring<N> {
    fn new() -> Self {
        Self {
            buf: UnsafeCell::new([0; N]),
            write_p: AtomicUsize::new(0),
            read_p: AtomicUsize::new(0),
            full: AtomicBool::new(false),
            full_sem: BinarySemaphore::new(),
        }
    }

    /// Largest contiguous writable region as (start, len). Producer side.
    fn writable(&self) -> (usize, usize) {
        // We're the only writer - W can't change under us, R may grow or cycle.
        let r = self.read_p.load(Ordering::Acquire);
        let w = self.write_p.load(Ordering::Relaxed);
        if r <= w {
            // One slot stays reserved while R sits at 0: filling the array
            // to the end would cycle W onto R and turn a full ring into an
            // empty one.
            let len = if r == 0 { N - w - 1 } else { N - w };
            (w, len)
        } else {
            (w, r - w - 1)
        }
    }

    /// Largest contiguous readable region as (start, len). Consumer side.
    fn readable(&self) -> (usize, usize) {
        // We're the only reader - R can't change under us, W may grow or cycle.
        let w = self.write_p.load(Ordering::Acquire);
        let r = self.read_p.load(Ordering::Relaxed);
        if r <= w { (r, w - r) } else { (r, N - r) }
    }
}

/// Write half of the ring. Owned by the PTY reader thread.
pub struct Producer<const N: usize> {
    ring: Arc<Ring<N>>,
}

// SAFETY: moving the sole producer to another thread is fine; all shared
// state behind the Arc is synchronized as described on `Ring`.
unsafe impl<const N: usize> Send for Producer<N> {}

impl<const N: usize> Producer<N> {
    /// The part of the buffer ready for writing. Empty when the ring is full.
    pub fn write_buffer(&mut self) -> &mut [u8] {
        let (w, len) = self.ring.writable();
        // SAFETY: [w, w+len) is the producer-owned region; the consumer
        // never touches it until `bytes_written` publishes the new W, and
        // `&mut self` rules out a second producer-side alias.
        unsafe { std::slice::from_raw_parts_mut((self.ring.buf.get() as *mut u8).add(w), len) }
    }

    /// The part of the buffer ready for writing; blocks while the ring is full.
    ///
    /// Returns a non-empty span. The race with the consumer is benign:
    /// if the consumer drains between our emptiness check and the park,
    /// its `bytes_read` sees the raised flag and credits the semaphore,
    /// so the acquire returns immediately.
    pub fn acquire_write_buffer(&mut self) -> &mut [u8] {
        let (_, len) = self.ring.writable();
        if len == 0 {
            self.ring.full.store(true, Ordering::SeqCst);
            self.ring.full_sem.acquire();
        }
        self.write_buffer()
    }

    /// Publish `written` bytes placed at the start of the last write span.
    pub fn bytes_written(&mut self, written: usize) {
        let w = self.ring.write_p.load(Ordering::Relaxed);
        debug_assert!(written <= self.ring.writable().1);
        if w + written == N {
            self.ring.write_p.store(0, Ordering::Release);
        } else {
            self.ring.write_p.store(w + written, Ordering::Release);
        }
    }
}

/// Read half of the ring. Owned by the render-side consumer.
pub struct Consumer<const N: usize> {
    ring: Arc<Ring<N>>,
}

// SAFETY: as for `Producer`.
unsafe impl<const N: usize> Send for Consumer<N> {}

impl<const N: usize> Consumer<N> {
    /// The part of the buffer ready for reading. Empty when there is no data.
    pub fn read_buffer(&mut self) -> &[u8] {
        let (r, len) = self.ring.readable();
        // SAFETY: [r, r+len) is the consumer-owned region; the producer
        // wrote and release-published it before we acquire-loaded W.
        unsafe { std::slice::from_raw_parts((self.ring.buf.get() as *const u8).add(r), len) }
    }

    /// Consume `read` bytes from the start of the last read span and wake a
    /// producer blocked on a full ring.
    pub fn bytes_read(&mut self, read: usize) {
        let r = self.ring.read_p.load(Ordering::Relaxed);
        debug_assert!(read <= self.ring.readable().1);
        if r + read == N {
            self.ring.read_p.store(0, Ordering::Release);
        } else {
            self.ring.read_p.store(r + read, Ordering::Release);
        }
        let was_full = self.ring.full.swap(false, Ordering::SeqCst);
        if was_full {
            self.ring.full_sem.release();
        }
    }

    /// True when there is nothing to read right now.
    pub fn is_empty(&self) -> bool {
        let (_, len) = self.ring.readable();
        len == 0
    }
}

/// Binary semaphore: `release` leaves at most one credit, `acquire` takes it
/// or parks. The std library offers no semaphore, so the wait-point is a
/// mutex/condvar pair around the credit.
struct BinarySemaphore {
    credit: Mutex<bool>,
    cond: Condvar,
}

impl BinarySemaphore {
    fn new() -> Self {
        Self {
            credit: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut credit = self.credit.lock().unwrap();
        while !*credit {
            credit = self.cond.wait(credit).unwrap();
        }
        *credit = false;
    }

    fn release(&self) {
        let mut credit = self.credit.lock().unwrap();
        *credit = true;
        self.cond.notify_one();
    }
}
