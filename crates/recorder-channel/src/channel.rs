//! [`Channel`]: a RingBuffer specialized to a fixed record type, carrying
//! the identity metadata spec.md §4.2 requires.

use crate::clock::Clock;
use crate::name::ChannelName;
use crate::record::Record;
use crate::storage::{MappedRing, Storage};
use crate::value_kind::ValueKind;
use recorder_ring::{BlockPolicy, ReaderCursor, RingBuffer, RingGeometry, RingHeader};
use std::any::Any;
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct Channel<R: Record> {
    name: ChannelName,
    description: String,
    unit: String,
    min: f64,
    max: f64,
    value_kind: ValueKind,
    /// Set/cleared by a Registry configuration clause matching `name`.
    traced: AtomicBool,
    /// Unconditional recorders ignore `traced` and always accept writes.
    always_on: bool,
    clock: Arc<dyn Clock>,
    storage: Storage,
    _record: PhantomData<fn() -> R>,
}

pub struct ChannelSpec {
    pub name: ChannelName,
    pub description: String,
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub value_kind: ValueKind,
    pub capacity: u32,
    pub always_on: bool,
}

impl<R: Record> Channel<R> {
    pub fn new(spec: ChannelSpec, clock: Arc<dyn Clock>) -> Self {
        let geometry = RingGeometry::new(spec.capacity, size_of::<R>() as u32);
        Self {
            name: spec.name,
            description: spec.description,
            unit: spec.unit,
            min: spec.min,
            max: spec.max,
            value_kind: spec.value_kind,
            traced: AtomicBool::new(spec.always_on),
            always_on: spec.always_on,
            clock,
            storage: Storage::Heap(RingBuffer::new(geometry)),
            _record: PhantomData,
        }
    }

    /// Build a channel whose storage lives directly inside a memory
    /// mapping (spec.md §4.4: channels registered after export is enabled
    /// are backed by the mapping from the start, needing no mirror step).
    ///
    /// # Safety
    /// `header` must point to an already-initialized [`RingHeader`] and
    /// `data` to `geometry.data_bytes()` writable bytes, both kept alive by
    /// `keep_alive` for as long as this `Channel` lives.
    pub unsafe fn new_mapped(
        spec: ChannelSpec,
        clock: Arc<dyn Clock>,
        header: *const RingHeader,
        data: *mut u8,
        keep_alive: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        let geometry = RingGeometry::new(spec.capacity, size_of::<R>() as u32);
        Self {
            name: spec.name,
            description: spec.description,
            unit: spec.unit,
            min: spec.min,
            max: spec.max,
            value_kind: spec.value_kind,
            traced: AtomicBool::new(spec.always_on),
            always_on: spec.always_on,
            clock,
            // SAFETY: forwarded from this function's own contract.
            storage: Storage::Mapped(unsafe { MappedRing::new(header, data, geometry, keep_alive) }),
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    pub fn item_size(&self) -> u32 {
        self.storage.geometry().item_size
    }

    pub fn capacity(&self) -> u32 {
        self.storage.geometry().capacity
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.storage, Storage::Mapped(_))
    }

    pub fn overflow_count(&self) -> u64 {
        self.storage.overflow_count()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Whether the tracing bit is set (or this channel ignores it).
    pub fn is_active(&self) -> bool {
        self.always_on || self.traced.load(Ordering::Relaxed)
    }

    /// Set by the Registry when a configuration clause matches this
    /// channel's name (spec.md §4.3's per-channel state machine). A no-op
    /// for always-on channels.
    pub fn set_traced(&self, traced: bool) {
        if !self.always_on {
            self.traced.store(traced, Ordering::Relaxed);
        }
    }

    pub fn new_cursor(&self) -> ReaderCursor {
        self.storage.new_cursor()
    }

    pub fn readable(&self, cursor: &ReaderCursor) -> u64 {
        self.storage.readable(cursor)
    }

    pub fn readable_default(&self) -> u64 {
        self.storage.readable(self.storage.default_cursor())
    }

    /// Peek the next record for the default cursor. Single-consumer only
    /// (spec.md §4.1's "Tie-breaks and edge cases").
    pub fn peek(&self) -> Option<R> {
        let bytes = self.storage.peek()?;
        // SAFETY: `bytes` is exactly `size_of::<R>()` bytes from a slot the
        // ring guarantees is either fully committed or not returned at all;
        // `R: Record` requires validity for any bit pattern of that size.
        Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const R) })
    }

    /// Write one record if this channel is active, returning whether it
    /// was actually written.
    pub fn write(&self, record: R) -> bool {
        if !self.is_active() {
            return false;
        }
        let bytes = unsafe {
            std::slice::from_raw_parts(&record as *const R as *const u8, size_of::<R>())
        };
        self.storage.write(bytes) == 1
    }

    /// Read up to `dst.len()` records using the channel's own default
    /// cursor. Returns the number of records copied.
    pub fn read(&self, dst: &mut [R]) -> usize {
        self.read_with(dst, self.storage.default_cursor(), &recorder_ring::NonBlocking)
    }

    pub fn read_with(&self, dst: &mut [R], cursor: &ReaderCursor, block: &dyn BlockPolicy) -> usize {
        let byte_len = std::mem::size_of_val(dst);
        // SAFETY: `dst` is a valid `&mut [R]`; reinterpreting it as bytes
        // for exactly its own length is sound for a `Record` type.
        let bytes = unsafe { std::slice::from_raw_parts_mut(dst.as_mut_ptr() as *mut u8, byte_len) };
        self.storage.read_with(bytes, cursor, block) as usize
    }
}
