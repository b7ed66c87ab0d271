//! Where a Channel's bytes actually live.
//!
//! Most channels are `Heap`-backed: a [`RingBuffer`] owning its own
//! allocation, exactly as spec.md §9's Design Notes describe ("store the
//! buffer as two owned regions... inside one owning value"). A channel
//! registered after shared export is enabled is `Mapped` instead — its
//! header and data live directly inside the export file's memory map, so
//! writes need no separate mirroring step (spec.md §4.4, and Open Question
//! resolution #3 in `DESIGN.md`).

use recorder_ring::{BlockPolicy, NonBlocking, RawRing, ReaderCursor, RingBuffer, RingGeometry, RingHeader};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::Ordering;

pub(crate) enum Storage {
    Heap(RingBuffer),
    Mapped(MappedRing),
}

/// A ring view directly over memory someone else owns (a shared-memory
/// mapping). `_keep_alive` exists only to keep that memory from being
/// unmapped for as long as this value lives.
pub(crate) struct MappedRing {
    header: *const RingHeader,
    data: *mut u8,
    geometry: RingGeometry,
    default_cursor: ReaderCursor,
    _keep_alive: Arc<dyn Any + Send + Sync>,
}

// SAFETY: the same reasoning as `RawRing`'s Send/Sync impls; `header`/`data`
// are accessed only through the claim/commit protocol, and `_keep_alive`
// guarantees the memory outlives every access.
unsafe impl Send for MappedRing {}
unsafe impl Sync for MappedRing {}

impl MappedRing {
    /// # Safety
    /// `header` must point to a valid, already-initialized [`RingHeader`]
    /// and `data` to `geometry.data_bytes()` writable bytes, both kept
    /// alive by `keep_alive` for as long as the returned value lives.
    pub(crate) unsafe fn new(
        header: *const RingHeader,
        data: *mut u8,
        geometry: RingGeometry,
        keep_alive: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            header,
            data,
            geometry,
            default_cursor: ReaderCursor::new(0),
            _keep_alive: keep_alive,
        }
    }

    fn raw(&self) -> RawRing<'_> {
        // SAFETY: upheld by `MappedRing::new`'s contract.
        unsafe { RawRing::new(&*self.header, self.data, self.geometry) }
    }
}

impl Storage {
    pub(crate) fn geometry(&self) -> RingGeometry {
        match self {
            Storage::Heap(r) => r.geometry(),
            Storage::Mapped(m) => m.geometry,
        }
    }

    pub(crate) fn overflow_count(&self) -> u64 {
        match self {
            Storage::Heap(r) => r.overflow_count(),
            Storage::Mapped(m) => m.raw().overflow(),
        }
    }

    pub(crate) fn new_cursor(&self) -> ReaderCursor {
        match self {
            Storage::Heap(r) => r.new_cursor(),
            Storage::Mapped(m) => {
                let writer = unsafe { (*m.header).writer.load(Ordering::Acquire) };
                ReaderCursor::new(writer)
            }
        }
    }

    pub(crate) fn default_cursor(&self) -> &ReaderCursor {
        match self {
            Storage::Heap(r) => r.default_cursor(),
            Storage::Mapped(m) => &m.default_cursor,
        }
    }

    pub(crate) fn readable(&self, cursor: &ReaderCursor) -> u64 {
        match self {
            Storage::Heap(r) => r.readable(cursor),
            Storage::Mapped(m) => m.raw().readable(cursor.position()),
        }
    }

    pub(crate) fn peek(&self) -> Option<&[u8]> {
        match self {
            Storage::Heap(r) => r.peek(),
            Storage::Mapped(m) => {
                let ptr = m.raw().peek()?;
                // SAFETY: `peek` only ever returns pointers into the live,
                // `item_size`-wide slot this storage was built over.
                Some(unsafe {
                    std::slice::from_raw_parts(ptr, m.geometry.item_size as usize)
                })
            }
        }
    }

    pub(crate) fn read_with(&self, dst: &mut [u8], cursor: &ReaderCursor, block: &dyn BlockPolicy) -> u64 {
        match self {
            Storage::Heap(r) => r.read_with(dst, cursor, block),
            Storage::Mapped(m) => {
                let item_size = m.geometry.item_size as usize;
                let count = (dst.len() / item_size) as u64;
                // SAFETY: `dst` holds `count * item_size` writable bytes.
                unsafe { m.raw().read(dst.as_mut_ptr(), count, cursor.atomic(), block) }
            }
        }
    }

    pub(crate) fn read(&self, dst: &mut [u8]) -> u64 {
        self.read_with(dst, self.default_cursor(), &NonBlocking)
    }

    pub(crate) fn write_with(&self, src: &[u8], block: &dyn BlockPolicy) -> u64 {
        self.write_with_claim(src, block).0
    }

    pub(crate) fn write(&self, src: &[u8]) -> u64 {
        self.write_with(src, &NonBlocking)
    }

    /// Same as [`Self::write_with`], but also returns the position claimed
    /// for the first item written (spec.md §5's ordering key; see
    /// `recorder_ring::RingBuffer::write_with_claim`).
    pub(crate) fn write_with_claim(&self, src: &[u8], block: &dyn BlockPolicy) -> (u64, u64) {
        match self {
            Storage::Heap(r) => r.write_with_claim(src, block),
            Storage::Mapped(m) => {
                let item_size = m.geometry.item_size as usize;
                let count = (src.len() / item_size) as u64;
                // SAFETY: `src` holds `count * item_size` readable bytes.
                unsafe { m.raw().write(src.as_ptr(), count, block) }
            }
        }
    }
}

