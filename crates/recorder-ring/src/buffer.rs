//! [`RingBuffer`]: a heap-owned ring, the form every `Channel` (spec.md §4.2)
//! stores before it has been mirrored into shared memory.

use crate::block::{BlockPolicy, NonBlocking};
use crate::geometry::RingGeometry;
use crate::header::{ReaderCursor, RingHeader};
use crate::raw::RawRing;
use std::sync::atomic::Ordering;

/// A ring buffer that owns its header and storage on the heap.
///
/// `recorder-export` builds the equivalent view directly over mmap'd bytes
/// instead of through this type — see [`RawRing`], which both share.
pub struct RingBuffer {
    header: Box<RingHeader>,
    data: Box<[u8]>,
    geometry: RingGeometry,
    default_cursor: ReaderCursor,
}

// SAFETY: all access to `data` goes through `RawRing`, whose own Send/Sync
// impls justify concurrent use; `header` and `default_cursor` are atomics.
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Allocate a new ring with the given geometry, starting empty.
    pub fn new(geometry: RingGeometry) -> Self {
        let data = vec![0u8; geometry.data_bytes()].into_boxed_slice();
        Self {
            header: Box::new(RingHeader::new()),
            data,
            geometry,
            default_cursor: ReaderCursor::new(0),
        }
    }

    pub fn geometry(&self) -> RingGeometry {
        self.geometry
    }

    pub fn overflow_count(&self) -> u64 {
        self.header.overflow.load(Ordering::Acquire)
    }

    fn raw(&self) -> RawRing<'_> {
        // SAFETY: `data` is exactly `geometry.data_bytes()` bytes and lives
        // as long as `&self`.
        unsafe { RawRing::new(&self.header, self.data.as_ptr() as *mut u8, self.geometry) }
    }

    /// Create an additional independent reader cursor, starting at the
    /// current write position (spec.md §4.1: "many consumers each with
    /// their own position").
    pub fn new_cursor(&self) -> ReaderCursor {
        ReaderCursor::new(self.header.writer.load(Ordering::Acquire))
    }

    pub fn default_cursor(&self) -> &ReaderCursor {
        &self.default_cursor
    }

    pub fn readable(&self, cursor: &ReaderCursor) -> u64 {
        self.raw().readable(cursor.position())
    }

    pub fn writable(&self) -> u64 {
        self.raw().writable()
    }

    /// Peek the next slot for the default cursor without consuming it.
    /// Only safe to call from a single consumer (spec.md §4.1).
    pub fn peek(&self) -> Option<&[u8]> {
        let ptr = self.raw().peek()?;
        // SAFETY: the slot at `ptr` was fully committed before `peek`
        // observed `commit`, and is `item_size` bytes long.
        Some(unsafe { std::slice::from_raw_parts(ptr, self.geometry.item_size as usize) })
    }

    /// Read up to `dst.len() / item_size` items using the ring's own default
    /// cursor, with the non-blocking policy.
    pub fn read(&self, dst: &mut [u8]) -> u64 {
        self.read_with(dst, &self.default_cursor, &NonBlocking)
    }

    /// Read using an explicit cursor and back-pressure policy.
    pub fn read_with(&self, dst: &mut [u8], cursor: &ReaderCursor, block: &dyn BlockPolicy) -> u64 {
        let item_size = self.geometry.item_size as usize;
        assert_eq!(dst.len() % item_size, 0, "dst must hold whole items");
        let count = (dst.len() / item_size) as u64;
        // SAFETY: `dst` has room for `count * item_size` bytes by assertion.
        unsafe { self.raw().read(dst.as_mut_ptr(), count, &cursor.pos, block) }
    }

    /// Write items from `src`, using the non-blocking policy.
    pub fn write(&self, src: &[u8]) -> u64 {
        self.write_with(src, &NonBlocking)
    }

    /// Write items from `src` using an explicit back-pressure policy.
    /// Returns the number of items actually written.
    pub fn write_with(&self, src: &[u8], block: &dyn BlockPolicy) -> u64 {
        self.write_with_claim(src, block).0
    }

    /// Same as [`Self::write_with`], but also returns the position the
    /// writer claimed for the first item written — the `writer_ptr`
    /// out-parameter original_source/recorder_ring.c's `recorder_ring_write`
    /// reports to its caller, so the channel layer can use the claimed
    /// position itself as an ordering key (spec.md §5).
    pub fn write_with_claim(&self, src: &[u8], block: &dyn BlockPolicy) -> (u64, u64) {
        let item_size = self.geometry.item_size as usize;
        assert_eq!(src.len() % item_size, 0, "src must hold whole items");
        let count = (src.len() / item_size) as u64;
        // SAFETY: `src` holds `count * item_size` readable bytes by assertion.
        unsafe { self.raw().write(src.as_ptr(), count, block) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::SpinWait;

    fn item(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }

    #[test]
    fn exact_fit_spsc_roundtrip() {
        // spec.md §8 scenario 1: N=4 capacity, write 4 items, read 4 back.
        let ring = RingBuffer::new(RingGeometry::new(4, 4));
        for v in 0..4u32 {
            assert_eq!(ring.write(&item(v)), 1);
        }
        assert_eq!(ring.writable(), 0);
        let mut out = [0u8; 16];
        let n = ring.read(&mut out);
        assert_eq!(n, 4);
        for (i, chunk) in out.chunks_exact(4).enumerate() {
            assert_eq!(u32::from_le_bytes(chunk.try_into().unwrap()), i as u32);
        }
        assert_eq!(ring.readable(ring.default_cursor()), 0);
    }

    #[test]
    fn overflow_catch_up_skips_overwritten_slots() {
        // spec.md §8 scenario 2: N=4, write 6 items with no reads, then read.
        let ring = RingBuffer::new(RingGeometry::new(4, 4));
        for v in 0..6u32 {
            ring.write(&item(v));
        }
        assert_eq!(ring.overflow_count(), 0, "overflow only counted on read");

        let mut out = [0u8; 16];
        let n = ring.read(&mut out);
        assert_eq!(n, 4);
        let first: u32 = u32::from_le_bytes(out[0..4].try_into().unwrap());
        assert_eq!(first, 2, "oldest two items (0,1) were overwritten");
        assert_eq!(ring.overflow_count(), 2);
    }

    #[test]
    fn independent_cursors_read_independently() {
        let ring = RingBuffer::new(RingGeometry::new(8, 4));
        for v in 0..3u32 {
            ring.write(&item(v));
        }
        let slow = ring.new_cursor();
        // `new_cursor` starts at the current writer position (3), so it
        // sees nothing yet; rewind it to the start to observe history.
        slow.pos.store(0, Ordering::Release);

        let mut fast_out = [0u8; 8];
        assert_eq!(ring.read(&mut fast_out), 2);

        let mut slow_out = [0u8; 12];
        assert_eq!(ring.read_with(&mut slow_out, &slow, &SpinWait::new(0)), 3);
    }

    #[test]
    fn write_overwrites_unread_data_by_default() {
        // The ring never blocks a writer: with no reader keeping up, each
        // write just overwrites the oldest unread slot.
        let ring = RingBuffer::new(RingGeometry::new(2, 4));
        for v in 0..4u32 {
            assert_eq!(ring.write(&item(v)), 1);
        }

        let mut out = [0u8; 8];
        let n = ring.read(&mut out);
        assert_eq!(n, 2);
        assert_eq!(u32::from_le_bytes(out[0..4].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()), 3);
        assert_eq!(ring.overflow_count(), 2);
    }
}
