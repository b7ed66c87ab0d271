//! The lock-free claim/copy/commit protocol (spec.md §4.1), translated
//! directly from `recorder_ring.c`'s `recorder_ring_read`/`recorder_ring_write`
//! into Rust atomics operating over a raw byte region.
//!
//! [`RawRing`] is deliberately unopinionated about where its bytes live: the
//! owning [`crate::buffer::RingBuffer`] backs it with a heap allocation, and
//! `recorder-export` backs an equivalent view directly with bytes inside a
//! memory-mapped file. The algorithm in this module does not change either
//! way — this is the "two owned regions inside one owning value" strategy
//! spec.md §9's Design Notes call for, applied uniformly.

use crate::block::BlockPolicy;
use crate::geometry::RingGeometry;
use crate::header::{RingHeader, diff};
use std::sync::atomic::{AtomicU64, Ordering};

/// A non-owning view over a ring's header and data region.
///
/// `data` must point to at least `geometry.data_bytes()` valid, writable
/// bytes for the full lifetime `'a`. Constructing one is `unsafe` for that
/// reason; once built, every method upholds the invariants from spec.md §3
/// on its own.
#[derive(Clone, Copy)]
pub struct RawRing<'a> {
    header: &'a RingHeader,
    data: *mut u8,
    geometry: RingGeometry,
}

// SAFETY: `data` addresses a plain byte buffer. All mutation through it goes
// through the claim (CAS on `writer`) / commit (CAS on `commit`) protocol
// below, which guarantees disjoint byte ranges for concurrent writers and a
// happens-before edge (via `commit`'s Release/Acquire pair) before any reader
// observes a slot. There is nothing thread-affine about the pointer itself.
unsafe impl Send for RawRing<'_> {}
unsafe impl Sync for RawRing<'_> {}

impl<'a> RawRing<'a> {
    /// # Safety
    /// `data` must be valid for reads and writes for `geometry.data_bytes()`
    /// bytes, for the lifetime `'a`, and must not alias any other live
    /// reference to the same bytes outside of this ring's own protocol.
    pub unsafe fn new(header: &'a RingHeader, data: *mut u8, geometry: RingGeometry) -> Self {
        Self {
            header,
            data,
            geometry,
        }
    }

    pub fn geometry(&self) -> RingGeometry {
        self.geometry
    }

    pub fn overflow(&self) -> u64 {
        self.header.overflow.load(Ordering::Acquire)
    }

    /// Count of committed items past `reader_pos`, clamped to `[0, capacity]`.
    pub fn readable(&self, reader_pos: u64) -> u64 {
        let commit = self.header.commit.load(Ordering::Acquire);
        diff(commit, reader_pos).max(0).min(self.geometry.capacity as i64) as u64
    }

    /// Count of items that could be written without displacing the reader.
    pub fn writable(&self) -> u64 {
        let capacity = self.geometry.capacity as i64;
        let reader = self.header.reader.load(Ordering::Acquire);
        let writer = self.header.writer.load(Ordering::Acquire);
        let written = diff(writer, reader);
        if written >= capacity - 1 {
            0
        } else {
            (capacity - written - 1).max(0) as u64
        }
    }

    fn slot_ptr(&self, seq: u64) -> *mut u8 {
        let idx = self.geometry.slot_index(seq) as usize;
        // SAFETY: idx < capacity by construction of slot_index, and `data`
        // covers `capacity * item_size` bytes per the constructor contract.
        unsafe { self.data.add(idx * self.geometry.item_size as usize) }
    }

    /// Peek the next entry that would be read by the default cursor,
    /// jumping past any overwritten region first. Only safe with a single
    /// consumer (spec.md §4.1, "Tie-breaks and edge cases").
    pub fn peek(&self) -> Option<*const u8> {
        let capacity = self.geometry.capacity as i64;
        let commit = self.header.commit.load(Ordering::Acquire);
        let mut reader = self.header.reader.load(Ordering::Acquire);
        let mut written = diff(commit, reader);

        if written >= capacity {
            let first_valid = commit.wrapping_sub(self.geometry.capacity as u64).wrapping_add(1);
            let skip = diff(first_valid, reader) as u64;
            self.header.overflow.fetch_add(skip, Ordering::Relaxed);
            reader = self
                .header
                .reader
                .fetch_add(skip, Ordering::AcqRel)
                .wrapping_add(skip);
            written = diff(commit, reader);
        }

        if written <= 0 {
            None
        } else {
            Some(self.slot_ptr(reader) as *const u8)
        }
    }

    /// Copy up to `count` items into `dst`, advancing `cursor`. Returns the
    /// number of items actually copied. `dst` must have room for
    /// `count * geometry.item_size()` bytes.
    ///
    /// # Safety
    /// `dst` must be valid for writes of `count * item_size` bytes.
    pub unsafe fn read(
        &self,
        dst: *mut u8,
        count: u64,
        cursor: &AtomicU64,
        block: &dyn BlockPolicy,
    ) -> u64 {
        if count == 0 {
            return 0;
        }
        let item_size = self.geometry.item_size as usize;
        let capacity = self.geometry.capacity as u64;

        loop {
            let reader = cursor.load(Ordering::Acquire);
            let commit = self.header.commit.load(Ordering::Acquire);
            let writer = self.header.writer.load(Ordering::Acquire);

            // Overflow catch-up: spec.md §4.1 step 2 computes this from
            // `writer`, not `commit` (original_source/recorder_ring.c's
            // `recorder_ring_read` uses `writer - reader >= size`). A
            // writer's claim physically overwrites a slot's bytes as soon
            // as its CAS on `writer` lands (`write`'s copy step below),
            // independent of whether that writer's own `commit` CAS has
            // landed yet — so `commit` alone can understate how far
            // already-overwritten data extends, and copying up to `commit`
            // would risk reading a slot a later, uncommitted writer has
            // already clobbered.
            if diff(writer, reader) >= capacity as i64 {
                let first_valid = writer.wrapping_sub(capacity).wrapping_add(1);
                if block.on_overflow(reader, first_valid) {
                    continue;
                }
                let skip = diff(first_valid, reader) as u64;
                self.header.overflow.fetch_add(skip, Ordering::Relaxed);
                // Best-effort: if another reader already moved this cursor
                // past `first_valid`, leave it alone and re-evaluate.
                let _ = cursor.compare_exchange(
                    reader,
                    first_valid,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                continue;
            }

            let available = diff(commit, reader).max(0) as u64;
            let mut to_copy = count.min(capacity);
            if to_copy > available {
                if block.on_read_short(available, to_copy) {
                    continue;
                }
                to_copy = available;
            }
            if to_copy == 0 {
                return 0;
            }

            let next_reader = reader.wrapping_add(to_copy);

            let mut remaining = to_copy;
            let mut cur = reader;
            let mut out_offset = 0usize;
            while remaining > 0 {
                let idx = self.geometry.slot_index(cur);
                let to_end = capacity - idx;
                let this_round = remaining.min(to_end);
                let byte_count = this_round as usize * item_size;
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        self.slot_ptr(cur),
                        dst.add(out_offset),
                        byte_count,
                    );
                }
                out_offset += byte_count;
                remaining -= this_round;
                cur = cur.wrapping_add(this_round);
            }

            if cursor
                .compare_exchange(reader, next_reader, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return to_copy;
            }
            // Another consumer advanced the cursor first; restart.
        }
    }

    /// Claim room for up to `count` items, copy `src` in, and commit.
    /// Returns `(items_written, claimed_start)`.
    ///
    /// # Safety
    /// `src` must be valid for reads of `count * item_size` bytes.
    pub unsafe fn write(&self, src: *const u8, count: u64, block: &dyn BlockPolicy) -> (u64, u64) {
        if count == 0 {
            return (0, self.header.writer.load(Ordering::Acquire));
        }
        let item_size = self.geometry.item_size as usize;
        let capacity = self.geometry.capacity as u64;

        let (to_copy, first_writer) = loop {
            let reader = self.header.reader.load(Ordering::Acquire);
            let writer = self.header.writer.load(Ordering::Acquire);
            let available = (capacity as i64 + diff(reader, writer)).max(0) as u64;
            let to_copy = count.min(capacity);

            if to_copy > available {
                // The claim would overwrite data the default reader hasn't
                // consumed yet. This ring favors the writer (spec.md §4.1:
                // a slow reader is lossy, never blocking): by default we
                // proceed and overwrite, and the reader's own overflow
                // catch-up accounts for what was lost. `on_write_full`
                // returning `true` means the policy waited for room instead,
                // so we re-read the cursors and try again.
                let behind = diff(writer.wrapping_add(to_copy), reader).max(0) as u64;
                if block.on_write_full(behind, capacity) {
                    continue;
                }
            }

            match self.header.writer.compare_exchange(
                writer,
                writer.wrapping_add(to_copy),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break (to_copy, writer),
                Err(_) => continue,
            }
        };

        let mut remaining = to_copy;
        let mut cur = first_writer;
        let mut in_offset = 0usize;
        while remaining > 0 {
            let idx = self.geometry.slot_index(cur);
            let to_end = capacity - idx;
            let this_round = remaining.min(to_end);
            let byte_count = this_round as usize * item_size;
            unsafe {
                std::ptr::copy_nonoverlapping(src.add(in_offset), self.slot_ptr(cur), byte_count);
            }
            in_offset += byte_count;
            remaining -= this_round;
            cur = cur.wrapping_add(this_round);
        }

        let claimed_end = first_writer.wrapping_add(to_copy);
        loop {
            match self.header.commit.compare_exchange(
                first_writer,
                claimed_end,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(_) => {
                    if !block.on_commit_stalled() {
                        // Degraded mode (spec.md §4.1 step 3): advance commit
                        // regardless of whether the stalled writer finished.
                        self.header.commit.fetch_add(to_copy, Ordering::AcqRel);
                        break;
                    }
                }
            }
        }

        (to_copy, first_writer)
    }
}
