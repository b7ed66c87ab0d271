//! The process-wide Registry (L2): a discoverable table of Channels, plus
//! the trace-flag and tweakable configuration that gates them (spec.md §4.3).
//!
//! The Registry knows nothing about `recorder-export` (L3 sits above it in
//! spec.md §2's dependency order). Where a channel's storage ends up — heap
//! or memory-mapped — is decided through the small [`ExportSink`] hook a
//! shared-memory exporter attaches via [`Registry::attach_export_sink`];
//! this is the "capability interface" spec.md §9's Design Notes ask for in
//! place of the source's raw function pointers.

mod any_channel;
mod config;
mod export_sink;
mod pattern;
mod registry;
mod tweakable;

pub use any_channel::AnyChannel;
pub use config::{RecorderConfig, RegistryConfigError};
pub use export_sink::{ChannelDescriptor, ExportSink, MappedSlot};
pub use registry::{ConfigureError, ConfigureReport, Registry};
pub use tweakable::Tweakable;
