//! The writer side of shared export: allocates the mapped file, answers
//! the Registry's [`ExportSink`] hook, and owns the reserved configuration
//! channel readers push strings into (spec.md §4.4).

use crate::layout::{
    self, DirectoryEntry, ENTRY_LEN, FORMAT_VERSION, HEADER_LEN, MAGIC, directory_entry_offset,
};
use recorder_channel::{Channel, ChannelName, ChannelSpec, ConfigRecord, ValueKind};
use recorder_mmap::MmapFileMut;
use recorder_registry::{ChannelDescriptor, ExportSink, MappedSlot, Registry};
use recorder_ring::RingHeader;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Name of the directory slot reserved for configuration strings pushed in
/// by an external reader (spec.md §4.4).
pub const CONFIG_CHANNEL_NAME: &str = "__recorder_config__";

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub path: PathBuf,
    /// Directory slots reserved, including the configuration channel.
    pub max_channels: u32,
    /// Ring capacity every mapped channel gets, regardless of what it asks
    /// for, so the file can be sized once up front.
    pub channel_capacity: u32,
    /// Largest record size any mapped channel may carry.
    pub max_item_size: u32,
}

impl ExportConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_channels: 64,
            channel_capacity: 1024,
            max_item_size: 256,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to map export file at '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("export directory has no room for a configuration channel (max_channels={0})")]
    NoRoomForConfigChannel(u32),
}

struct Mapping {
    _mmap: MmapFileMut,
    base: *mut u8,
}

// SAFETY: `base` points into the mmap owned by the same value; all access
// to channel storage through it goes through `RawRing`'s claim/commit
// protocol, same reasoning as `recorder_channel::storage::MappedRing`.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

impl Mapping {
    fn channel_count(&self) -> &AtomicU32 {
        // SAFETY: `AtomicU32` has the same size and alignment as `u32`;
        // this offset is always within the mapping (checked at creation).
        unsafe { &*(self.base.add(layout::channel_count_offset()) as *const AtomicU32) }
    }
}

/// A file-backed shared-memory export of a [`Registry`] (L3, spec.md §4.4).
pub struct SharedExport {
    mapping: Arc<Mapping>,
    config: ExportConfig,
    next_index: Mutex<u32>,
    ring_slot_bytes: usize,
    config_channel: Mutex<Option<Arc<Channel<ConfigRecord>>>>,
}

impl SharedExport {
    /// Create the backing file, attach this export to `registry` so every
    /// channel registered from now on is born mapped, and register the
    /// reserved configuration channel.
    pub fn enable(config: ExportConfig, registry: &Registry) -> Result<Arc<Self>, ExportError> {
        let ring_header_bytes = layout::align_up(std::mem::size_of::<RingHeader>(), 8);
        let ring_slot_bytes =
            ring_header_bytes + config.channel_capacity as usize * config.max_item_size as usize;
        let total_bytes = HEADER_LEN + config.max_channels as usize * ENTRY_LEN
            + config.max_channels as usize * ring_slot_bytes;

        if config.max_channels == 0 {
            return Err(ExportError::NoRoomForConfigChannel(0));
        }

        let mut mmap = MmapFileMut::create_rw(&config.path, total_bytes as u64).map_err(|source| {
            ExportError::Io {
                path: config.path.display().to_string(),
                source,
            }
        })?;
        let base = mmap.as_mut_ptr();

        // SAFETY: `base` addresses the freshly created, exclusively-owned
        // mapping; no reader can observe it until we publish channel_count
        // below.
        unsafe {
            std::ptr::copy_nonoverlapping(MAGIC.as_ptr(), base, MAGIC.len());
            (base.add(layout::version_offset()) as *mut u32).write(FORMAT_VERSION);
        }
        let mapping = Arc::new(Mapping { _mmap: mmap, base });
        mapping.channel_count().store(0, Ordering::Release);

        let export = Arc::new(Self {
            mapping,
            ring_slot_bytes,
            config,
            next_index: Mutex::new(0),
            config_channel: Mutex::new(None),
        });

        registry.attach_export_sink(Arc::clone(&export) as Arc<dyn ExportSink>);

        let config_spec = ChannelSpec {
            name: ChannelName::new(CONFIG_CHANNEL_NAME).expect("literal name is valid"),
            description: "configuration strings pushed in by an external reader".to_string(),
            unit: String::new(),
            min: 0.0,
            max: 0.0,
            value_kind: ValueKind::None,
            capacity: export.config.channel_capacity,
            always_on: true,
        };
        let channel = registry.channel::<ConfigRecord>(config_spec);
        if !channel.is_mapped() {
            return Err(ExportError::NoRoomForConfigChannel(export.config.max_channels));
        }
        *export.config_channel.lock().unwrap() = Some(channel);

        Ok(export)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Drain the configuration channel, feeding every pushed string through
    /// `registry`'s clause parser. Returns how many clauses were applied in
    /// total. Call this at convenient points on the host application's own
    /// schedule (spec.md §4.4: "the application polls this channel").
    pub fn poll_configuration(&self, registry: &Registry) -> u32 {
        let guard = self.config_channel.lock().unwrap();
        let Some(channel) = guard.as_ref() else {
            return 0;
        };
        let mut applied = 0;
        let mut buf = [ConfigRecord::from_str(""); 8];
        loop {
            let n = channel.read(&mut buf);
            if n == 0 {
                break;
            }
            for record in &buf[..n] {
                let report = registry.configure(&record.as_str());
                applied += report.applied;
            }
        }
        applied
    }

    fn write_directory_entry(&self, index: u32, entry: &DirectoryEntry) {
        let offset = directory_entry_offset(index);
        let mut buf = [0u8; ENTRY_LEN];
        entry.encode(&mut buf);
        // SAFETY: `offset..offset+ENTRY_LEN` falls within the directory
        // region sized for `max_channels` entries at creation, and this
        // slot is only ever written once, by the single caller serialized
        // through `next_index`.
        unsafe {
            std::ptr::copy_nonoverlapping(buf.as_ptr(), self.mapping.base.add(offset), ENTRY_LEN);
        }
    }
}

impl ExportSink for SharedExport {
    fn allocate(&self, desc: &ChannelDescriptor<'_>) -> Option<MappedSlot> {
        if desc.capacity > self.config.channel_capacity || desc.item_size > self.config.max_item_size {
            tracing::warn!(
                channel = desc.name,
                capacity = desc.capacity,
                item_size = desc.item_size,
                "channel geometry exceeds export budget, keeping heap storage"
            );
            return None;
        }

        let mut next_index = self.next_index.lock().unwrap();
        if *next_index >= self.config.max_channels {
            tracing::warn!(
                channel = desc.name,
                max_channels = self.config.max_channels,
                "export directory is full, keeping heap storage"
            );
            return None;
        }
        let index = *next_index;
        *next_index += 1;

        let ring_region_offset =
            HEADER_LEN + self.config.max_channels as usize * ENTRY_LEN + index as usize * self.ring_slot_bytes;
        let ring_header_bytes = layout::align_up(std::mem::size_of::<RingHeader>(), 8);

        let entry = DirectoryEntry {
            name: desc.name.to_string(),
            description: desc.description.to_string(),
            unit: desc.unit.to_string(),
            min: desc.min,
            max: desc.max,
            value_kind: desc.value_kind,
            item_size: desc.item_size,
            // The channel's own requested capacity, not the reserved slot
            // budget: `Channel::new_mapped` builds its `RingGeometry` from
            // `desc.capacity`, and an external reader must derive the same
            // slot mask or its overflow/readable accounting diverges from
            // the real ring the moment usage wraps past `desc.capacity`.
            capacity: desc.capacity,
            offset_to_ring: ring_region_offset as u64,
        };
        self.write_directory_entry(index, &entry);

        // SAFETY: `header_ptr` addresses `ring_header_bytes` fresh bytes
        // within this slot's reserved region, not yet observed by any
        // reader (channel_count has not been bumped past `index` yet).
        let header_ptr = unsafe { self.mapping.base.add(ring_region_offset) as *mut RingHeader };
        unsafe { RingHeader::init_in_place(header_ptr) };
        let data_ptr = unsafe { self.mapping.base.add(ring_region_offset + ring_header_bytes) };

        // Release: publish this channel's header and directory entry
        // before any reader can observe it counted.
        self.mapping.channel_count().store(index + 1, Ordering::Release);

        tracing::info!(channel = desc.name, index, "channel mapped into shared export");

        Some(MappedSlot {
            header: header_ptr,
            data: data_ptr,
            keep_alive: Arc::clone(&self.mapping) as Arc<dyn Any + Send + Sync>,
        })
    }
}
