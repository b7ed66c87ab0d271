//! The hook a shared-memory exporter attaches to the Registry so newly
//! registered channels can be born with mapped storage instead of heap
//! storage, without the Registry depending on `recorder-export` (spec.md §2's
//! dependency order puts SharedExport above the Registry, not the reverse).

use recorder_channel::ValueKind;
use recorder_ring::RingHeader;
use std::any::Any;
use std::sync::Arc;

/// Everything a directory writer needs about a channel being created, ahead
/// of the concrete record type the Registry will build it with.
pub struct ChannelDescriptor<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub unit: &'a str,
    pub min: f64,
    pub max: f64,
    pub value_kind: ValueKind,
    pub item_size: u32,
    pub capacity: u32,
}

/// Raw pointers into a live memory mapping, wide enough to build a
/// [`recorder_channel::Channel::new_mapped`] over, plus whatever keeps that
/// mapping alive for as long as the Channel does.
pub struct MappedSlot {
    pub header: *const RingHeader,
    pub data: *mut u8,
    pub keep_alive: Arc<dyn Any + Send + Sync>,
}

// SAFETY: the pointers address a plain mapped byte region; all access to
// them goes through `Channel`'s own claim/commit protocol, same reasoning
// as `recorder_ring::RawRing`'s Send/Sync impls.
unsafe impl Send for MappedSlot {}
unsafe impl Sync for MappedSlot {}

/// Implemented by a shared-memory exporter; attached to a [`crate::Registry`]
/// via [`crate::Registry::attach_export_sink`].
pub trait ExportSink: Send + Sync {
    /// Reserve directory space and storage for a new channel, returning
    /// `None` if the export has no room left (the channel falls back to
    /// heap storage, logged by the caller — not silently dropped).
    fn allocate(&self, desc: &ChannelDescriptor<'_>) -> Option<MappedSlot>;
}
