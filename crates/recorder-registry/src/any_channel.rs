//! A type-erased view over a [`recorder_channel::Channel<R>`], letting the
//! Registry hold channels of different record types in one table
//! (spec.md §4.3: "process-wide set of Channels, addressable by a stable...
//! channel index and by name").

use recorder_channel::{Channel, Record, ValueKind};

/// Everything the Registry, a configuration clause, or a directory writer
/// needs to know about a Channel without knowing its concrete record type.
pub trait AnyChannel: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn unit(&self) -> &str;
    fn min(&self) -> f64;
    fn max(&self) -> f64;
    fn value_kind(&self) -> ValueKind;
    fn item_size(&self) -> u32;
    fn capacity(&self) -> u32;
    fn is_mapped(&self) -> bool;
    fn is_active(&self) -> bool;
    fn set_traced(&self, traced: bool);
    fn overflow_count(&self) -> u64;
}

impl<R: Record> AnyChannel for Channel<R> {
    fn name(&self) -> &str {
        Channel::name(self).as_str()
    }

    fn description(&self) -> &str {
        Channel::description(self)
    }

    fn unit(&self) -> &str {
        Channel::unit(self)
    }

    fn min(&self) -> f64 {
        Channel::min(self)
    }

    fn max(&self) -> f64 {
        Channel::max(self)
    }

    fn value_kind(&self) -> ValueKind {
        Channel::value_kind(self)
    }

    fn item_size(&self) -> u32 {
        Channel::item_size(self)
    }

    fn capacity(&self) -> u32 {
        Channel::capacity(self)
    }

    fn is_mapped(&self) -> bool {
        Channel::is_mapped(self)
    }

    fn is_active(&self) -> bool {
        Channel::is_active(self)
    }

    fn set_traced(&self, traced: bool) {
        Channel::set_traced(self, traced)
    }

    fn overflow_count(&self) -> u64 {
        Channel::overflow_count(self)
    }
}
