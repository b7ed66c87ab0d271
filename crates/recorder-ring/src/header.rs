use std::sync::atomic::{AtomicU64, Ordering};

/// The four atomics that drive a ring's lock-free protocol.
///
/// This is exactly the `reader, writer, commit, overflow` quartet described
/// in spec.md §6's normative shared-memory layout: whether the bytes behind
/// it came from a `Box` or from a memory-mapped file makes no difference to
/// the algorithm in [`crate::raw::RawRing`].
#[repr(C)]
pub struct RingHeader {
    /// Next position to be read by the default cursor.
    pub reader: AtomicU64,
    /// Next position to be claimed for writing.
    pub writer: AtomicU64,
    /// Highest position whose contents are fully written and visible.
    pub commit: AtomicU64,
    /// Cumulative count of records skipped because a reader fell behind.
    pub overflow: AtomicU64,
}

impl RingHeader {
    pub const fn new() -> Self {
        Self {
            reader: AtomicU64::new(0),
            writer: AtomicU64::new(0),
            commit: AtomicU64::new(0),
            overflow: AtomicU64::new(0),
        }
    }

    /// Initialize an already-allocated (e.g. memory-mapped, possibly
    /// garbage-filled) header in place.
    ///
    /// # Safety
    /// `header` must be valid for writes and not concurrently observed by
    /// any reader or writer yet.
    pub unsafe fn init_in_place(header: *mut RingHeader) {
        unsafe {
            header.write(RingHeader::new());
        }
    }
}

impl Default for RingHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed difference `a - b`, so that ordering survives modular wraparound
/// of the underlying `u64` position counters (spec.md §3).
#[inline(always)]
pub fn diff(a: u64, b: u64) -> i64 {
    a.wrapping_sub(b) as i64
}

/// An independent reader cursor, sharing a ring's single `overflow` counter.
///
/// spec.md §4.1 calls this out explicitly: "A caller-supplied `reader_ptr`
/// points to an independent cursor, allowing many consumers each with their
/// own position."
pub struct ReaderCursor {
    pub(crate) pos: AtomicU64,
}

impl ReaderCursor {
    pub fn new(start: u64) -> Self {
        Self {
            pos: AtomicU64::new(start),
        }
    }

    pub fn position(&self) -> u64 {
        self.pos.load(Ordering::Acquire)
    }

    /// The underlying atomic, for callers driving [`crate::raw::RawRing`]
    /// directly (e.g. over memory-mapped storage) rather than through
    /// [`crate::buffer::RingBuffer`].
    pub fn atomic(&self) -> &AtomicU64 {
        &self.pos
    }
}

impl Default for ReaderCursor {
    fn default() -> Self {
        Self::new(0)
    }
}
