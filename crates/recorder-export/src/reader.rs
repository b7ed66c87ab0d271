//! An out-of-process reader over a [`crate::writer::SharedExport`] file
//! (spec.md §4.4, §6): no IPC round-trip, just a memory map and the same
//! claim/commit protocol every in-process Channel uses.
//!
//! The mapping is opened read-write, not read-only: walking past a lapped
//! writer advances this reader's own cursor and bumps the shared `overflow`
//! counter, the same mutation an in-process consumer performs (see
//! DESIGN.md's note on this Open Question).

use crate::layout::{self, DirectoryEntry, ENTRY_LEN, FORMAT_VERSION, HEADER_LEN, MAGIC};
use crate::writer::CONFIG_CHANNEL_NAME;
use recorder_channel::{ConfigRecord, Record};
use recorder_mmap::MmapFileMut;
use recorder_ring::{BlockPolicy, NonBlocking, RawRing, ReaderCursor, RingGeometry, RingHeader};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, thiserror::Error)]
pub enum ExportReaderError {
    #[error("failed to map export file at '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a recorder export file (bad magic)")]
    BadMagic { path: String },

    #[error("'{path}' has export format version {found}, this reader supports {supported}")]
    VersionMismatch {
        path: String,
        found: u32,
        supported: u32,
    },

    #[error("channel '{0}' is not in the export directory")]
    NoSuchChannel(String),
}

/// An attached view over one mapped export file.
pub struct ExportReader {
    mmap: MmapFileMut,
    path: String,
}

impl ExportReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExportReaderError> {
        let path_str = path.as_ref().display().to_string();
        let mmap = MmapFileMut::open_rw(&path).map_err(|source| ExportReaderError::Io {
            path: path_str.clone(),
            source,
        })?;

        if layout::magic_region(unsafe { std::slice::from_raw_parts(mmap.as_ptr(), HEADER_LEN) }) != MAGIC {
            return Err(ExportReaderError::BadMagic { path: path_str });
        }
        let version = unsafe { *(mmap.as_ptr().add(layout::version_offset()) as *const u32) };
        if version != FORMAT_VERSION {
            return Err(ExportReaderError::VersionMismatch {
                path: path_str,
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        Ok(Self {
            mmap,
            path: path_str,
        })
    }

    fn channel_count_atomic(&self) -> &AtomicU32 {
        // SAFETY: within the mapping, same layout the writer publishes to.
        unsafe { &*(self.mmap.as_ptr().add(layout::channel_count_offset()) as *const AtomicU32) }
    }

    /// Number of channels currently published (spec.md §4.4: "load with
    /// acquire" — every counted channel has a fully-written header).
    pub fn channel_count(&self) -> u32 {
        self.channel_count_atomic().load(Ordering::Acquire)
    }

    /// Directory entries for every currently published channel.
    pub fn directory(&self) -> Vec<DirectoryEntry> {
        let count = self.channel_count();
        (0..count)
            .map(|i| {
                let offset = layout::directory_entry_offset(i);
                // SAFETY: `offset..offset+ENTRY_LEN` is within the region
                // sized for this file's directory, and `i < channel_count`
                // means the writer has published this entry.
                let bytes =
                    unsafe { std::slice::from_raw_parts(self.mmap.as_ptr().add(offset), ENTRY_LEN) };
                DirectoryEntry::decode(bytes)
            })
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<u32> {
        (0..self.channel_count()).find(|&i| {
            let offset = layout::directory_entry_offset(i);
            let bytes = unsafe { std::slice::from_raw_parts(self.mmap.as_ptr().add(offset), ENTRY_LEN) };
            DirectoryEntry::decode(bytes).name == name
        })
    }

    pub fn expect_channel(&self, name: &str) -> Result<u32, ExportReaderError> {
        self.find(name)
            .ok_or_else(|| ExportReaderError::NoSuchChannel(name.to_string()))
    }

    /// Build a raw, read-only view over channel `index`'s ring, specialized
    /// to record type `R`. The caller is responsible for using the `R` that
    /// matches the directory entry's `item_size`.
    pub fn ring_for<R: Record>(&self, index: u32) -> ExportedRing<'_, R> {
        let entry_offset = layout::directory_entry_offset(index);
        let entry_bytes =
            unsafe { std::slice::from_raw_parts(self.mmap.as_ptr().add(entry_offset), ENTRY_LEN) };
        let entry = DirectoryEntry::decode(entry_bytes);
        let geometry = RingGeometry::new(entry.capacity, entry.item_size);

        let header_ptr = unsafe { self.mmap.as_ptr().add(entry.offset_to_ring as usize) as *const RingHeader };
        let ring_header_bytes = layout::align_up(std::mem::size_of::<RingHeader>(), 8);
        let data_ptr =
            unsafe { self.mmap.as_ptr().add(entry.offset_to_ring as usize + ring_header_bytes) as *mut u8 };

        // SAFETY: `header_ptr`/`data_ptr` address this channel's reserved,
        // already-initialized region for as long as `self` (and the
        // underlying mapping) is alive.
        let raw = unsafe { RawRing::new(&*header_ptr, data_ptr, geometry) };
        let writer_pos = unsafe { (*header_ptr).writer.load(Ordering::Acquire) };
        ExportedRing {
            raw,
            cursor: ReaderCursor::new(writer_pos),
            _record: std::marker::PhantomData,
        }
    }

    /// Push a configuration string into the reserved configuration channel
    /// (spec.md §4.4). Returns `false` if the file has no such channel.
    pub fn push_configuration(&self, text: &str) -> bool {
        let Some(index) = self.find(CONFIG_CHANNEL_NAME) else {
            return false;
        };
        let ring: ExportedRing<'_, ConfigRecord> = self.ring_for(index);
        let record = ConfigRecord::from_str(text);
        let src = &record as *const ConfigRecord as *const u8;
        // SAFETY: `src` is valid for `size_of::<ConfigRecord>()` reads.
        let (written, _) = unsafe { ring.raw.write(src, 1, &NonBlocking) };
        written == 1
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A tail-following read-only handle over one exported channel's ring,
/// scoped to the [`ExportReader`] it was built from.
pub struct ExportedRing<'a, R: Record> {
    raw: RawRing<'a>,
    cursor: ReaderCursor,
    _record: std::marker::PhantomData<R>,
}

impl<'a, R: Record> ExportedRing<'a, R> {
    pub fn readable(&self) -> u64 {
        self.raw.readable(self.cursor.position())
    }

    /// Read up to `dst.len()` records, advancing this ring's own cursor.
    pub fn read(&self, dst: &mut [R]) -> usize {
        self.read_with(dst, &NonBlocking)
    }

    pub fn read_with(&self, dst: &mut [R], block: &dyn BlockPolicy) -> usize {
        let byte_len = std::mem::size_of_val(dst);
        // SAFETY: `dst` is a valid `&mut [R]` reinterpreted as its own
        // byte length; `R: Record` permits this for any bit pattern.
        let bytes = unsafe { std::slice::from_raw_parts_mut(dst.as_mut_ptr() as *mut u8, byte_len) };
        // SAFETY: forwarded from this function's own contract above.
        unsafe { self.raw.read(bytes.as_mut_ptr(), dst.len() as u64, self.cursor.atomic(), block) as usize }
    }
}
