//! Shared-memory export (L3): projects a [`recorder_registry::Registry`]'s
//! channels into a file-backed memory mapping a separate process can read
//! without any IPC round-trip (spec.md §4.4, §6).
//!
//! This crate is the only one in the workspace allowed to depend on
//! `recorder-registry` — the dependency runs one way, writer attaches
//! itself to the Registry through the `ExportSink` hook the Registry
//! crate defines, never the reverse.

mod layout;
mod reader;
mod writer;

pub use layout::{DirectoryEntry, ENTRY_LEN, FORMAT_VERSION, HEADER_LEN, MAGIC};
pub use reader::{ExportReader, ExportReaderError, ExportedRing};
pub use writer::{CONFIG_CHANNEL_NAME, ExportConfig, ExportError, SharedExport};
