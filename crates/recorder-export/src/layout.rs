//! The normative shared-memory layout (spec.md §6): a fixed header, an
//! append-only array of directory entries, and each channel's ring storage
//! following the directory.
//!
//! Directory entries are encoded at explicit byte offsets rather than read
//! through a `#[repr(C)]` cast, the way `lithos-icc`'s `shm_layout` module
//! casts a whole `RingHeader` over mapped bytes — here the per-field types
//! (`f64`, `u32`, `u64`) would need more padding than spec.md's layout
//! allows for if laid out by the compiler, so encode/decode go byte range
//! by byte range instead.

use recorder_channel::ValueKind;

/// `"RECORDER"`, no trailing NUL — spec.md §6 labels the field 8 bytes,
/// which only fits the bare ASCII string (see DESIGN.md).
pub const MAGIC: [u8; 8] = *b"RECORDER";
pub const FORMAT_VERSION: u32 = 1;

pub const NAME_LEN: usize = 64;
pub const DESCRIPTION_LEN: usize = 128;
pub const UNIT_LEN: usize = 32;

const MAGIC_OFFSET: usize = 0;
const VERSION_OFFSET: usize = 8;
const CHANNEL_COUNT_OFFSET: usize = 12;
pub const HEADER_LEN: usize = 16;

const NAME_OFFSET: usize = 0;
const DESCRIPTION_OFFSET: usize = NAME_OFFSET + NAME_LEN;
const UNIT_OFFSET: usize = DESCRIPTION_OFFSET + DESCRIPTION_LEN;
const MIN_OFFSET: usize = UNIT_OFFSET + UNIT_LEN;
const MAX_OFFSET: usize = MIN_OFFSET + 8;
const VALUE_KIND_OFFSET: usize = MAX_OFFSET + 8;
const ITEM_SIZE_OFFSET: usize = VALUE_KIND_OFFSET + 4;
const SIZE_OFFSET: usize = ITEM_SIZE_OFFSET + 4;
const OFFSET_TO_RING_OFFSET: usize = align_up(SIZE_OFFSET + 4, 8);

/// Total bytes per directory entry, padded so `offset_to_ring` — and every
/// entry after the first — starts 8-byte aligned (the ring header behind
/// it holds atomics that need that alignment).
pub const ENTRY_LEN: usize = OFFSET_TO_RING_OFFSET + 8;

pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

/// One parsed directory entry (spec.md §6).
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub value_kind: ValueKind,
    pub item_size: u32,
    pub capacity: u32,
    pub offset_to_ring: u64,
}

fn write_padded(buf: &mut [u8], text: &str) {
    buf.fill(0);
    let bytes = text.as_bytes();
    let n = bytes.len().min(buf.len().saturating_sub(1));
    buf[..n].copy_from_slice(&bytes[..n]);
}

fn read_padded(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl DirectoryEntry {
    /// Encode this entry into `buf`, which must be at least [`ENTRY_LEN`]
    /// bytes.
    pub fn encode(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= ENTRY_LEN);
        write_padded(&mut buf[NAME_OFFSET..NAME_OFFSET + NAME_LEN], &self.name);
        write_padded(
            &mut buf[DESCRIPTION_OFFSET..DESCRIPTION_OFFSET + DESCRIPTION_LEN],
            &self.description,
        );
        write_padded(&mut buf[UNIT_OFFSET..UNIT_OFFSET + UNIT_LEN], &self.unit);
        buf[MIN_OFFSET..MIN_OFFSET + 8].copy_from_slice(&self.min.to_le_bytes());
        buf[MAX_OFFSET..MAX_OFFSET + 8].copy_from_slice(&self.max.to_le_bytes());
        buf[VALUE_KIND_OFFSET..VALUE_KIND_OFFSET + 4]
            .copy_from_slice(&(self.value_kind as u32).to_le_bytes());
        buf[ITEM_SIZE_OFFSET..ITEM_SIZE_OFFSET + 4].copy_from_slice(&self.item_size.to_le_bytes());
        buf[SIZE_OFFSET..SIZE_OFFSET + 4].copy_from_slice(&self.capacity.to_le_bytes());
        buf[OFFSET_TO_RING_OFFSET..OFFSET_TO_RING_OFFSET + 8]
            .copy_from_slice(&self.offset_to_ring.to_le_bytes());
    }

    /// Decode an entry previously written by [`Self::encode`]. `buf` must
    /// be at least [`ENTRY_LEN`] bytes.
    pub fn decode(buf: &[u8]) -> Self {
        debug_assert!(buf.len() >= ENTRY_LEN);
        Self {
            name: read_padded(&buf[NAME_OFFSET..NAME_OFFSET + NAME_LEN]),
            description: read_padded(&buf[DESCRIPTION_OFFSET..DESCRIPTION_OFFSET + DESCRIPTION_LEN]),
            unit: read_padded(&buf[UNIT_OFFSET..UNIT_OFFSET + UNIT_LEN]),
            min: f64::from_le_bytes(buf[MIN_OFFSET..MIN_OFFSET + 8].try_into().unwrap()),
            max: f64::from_le_bytes(buf[MAX_OFFSET..MAX_OFFSET + 8].try_into().unwrap()),
            value_kind: ValueKind::from_u32(u32::from_le_bytes(
                buf[VALUE_KIND_OFFSET..VALUE_KIND_OFFSET + 4].try_into().unwrap(),
            ))
            .unwrap_or(ValueKind::Invalid),
            item_size: u32::from_le_bytes(buf[ITEM_SIZE_OFFSET..ITEM_SIZE_OFFSET + 4].try_into().unwrap()),
            capacity: u32::from_le_bytes(buf[SIZE_OFFSET..SIZE_OFFSET + 4].try_into().unwrap()),
            offset_to_ring: u64::from_le_bytes(
                buf[OFFSET_TO_RING_OFFSET..OFFSET_TO_RING_OFFSET + 8].try_into().unwrap(),
            ),
        }
    }
}

pub fn magic_region(buf: &[u8]) -> &[u8] {
    &buf[MAGIC_OFFSET..MAGIC_OFFSET + 8]
}

pub fn version_offset() -> usize {
    VERSION_OFFSET
}

pub fn channel_count_offset() -> usize {
    CHANNEL_COUNT_OFFSET
}

pub fn directory_entry_offset(index: u32) -> usize {
    HEADER_LEN + index as usize * ENTRY_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips() {
        let entry = DirectoryEntry {
            name: "http_error".to_string(),
            description: "HTTP error rate".to_string(),
            unit: "rps".to_string(),
            min: 0.0,
            max: 1_000_000.0,
            value_kind: ValueKind::Unsigned,
            item_size: 16,
            capacity: 1024,
            offset_to_ring: 4096,
        };
        let mut buf = [0u8; ENTRY_LEN];
        entry.encode(&mut buf);
        assert_eq!(DirectoryEntry::decode(&buf), entry);
    }

    #[test]
    fn offset_to_ring_field_is_eight_byte_aligned() {
        assert_eq!(OFFSET_TO_RING_OFFSET % 8, 0);
        assert_eq!(ENTRY_LEN % 8, 0);
    }

    #[test]
    fn long_strings_are_truncated_not_overrun() {
        let entry = DirectoryEntry {
            name: "a".repeat(200),
            description: String::new(),
            unit: String::new(),
            min: 0.0,
            max: 0.0,
            value_kind: ValueKind::None,
            item_size: 0,
            capacity: 0,
            offset_to_ring: 0,
        };
        let mut buf = [0u8; ENTRY_LEN];
        entry.encode(&mut buf);
        let decoded = DirectoryEntry::decode(&buf);
        assert_eq!(decoded.name.len(), NAME_LEN - 1);
    }
}
