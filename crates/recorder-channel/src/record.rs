//! Record shapes a Channel can be specialized over (spec.md §4.2). The
//! ring below never interprets these bytes; it only ever sees
//! `size_of::<R>()` opaque bytes per slot.

/// Number of extra argument slots a [`TraceRecord`] carries. Fixed at
/// build time, as spec.md §4.2 describes: "K is a build-time constant of
/// the encoder, outside this spec" — this crate picks 4, matching the
/// repository's own encoder.
pub const TRACE_RECORD_ARGS: usize = 4;

/// A marker for record types a [`crate::channel::Channel`] can carry.
/// `Copy` and `'static` so it can be treated as a fixed-size byte blob by
/// the ring underneath, and `#[repr(C)]` at each concrete type so the byte
/// layout is stable across a shared-memory boundary.
///
/// # Safety
/// Implementors must have no padding bytes that vary between otherwise
/// equal values and must be valid for any bit pattern of the right size
/// (a reader may observe a record mid-overwrite cycle on the unsafe raw
/// path; the type itself must never treat that as undefined behavior).
pub unsafe trait Record: Copy + Send + Sync + 'static {}

/// `(timestamp_ticks, value)`, the minimal two-word record spec.md §4.2
/// describes for numeric channels. `value`'s meaning is given by the
/// owning Channel's `value_kind`, not by this type.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericRecord {
    pub timestamp_ticks: u64,
    pub value: u64,
}

impl NumericRecord {
    pub fn new(timestamp_ticks: u64, value: u64) -> Self {
        Self {
            timestamp_ticks,
            value,
        }
    }

    pub fn signed(timestamp_ticks: u64, value: i64) -> Self {
        Self::new(timestamp_ticks, value as u64)
    }

    pub fn real(timestamp_ticks: u64, value: f64) -> Self {
        Self::new(timestamp_ticks, value.to_bits())
    }

    pub fn as_signed(&self) -> i64 {
        self.value as i64
    }

    pub fn as_real(&self) -> f64 {
        f64::from_bits(self.value)
    }
}

// SAFETY: two u64 fields, no padding, valid for any bit pattern.
unsafe impl Record for NumericRecord {}

/// `(timestamp_ticks, caller_address, format_string_pointer, args)`, the
/// record shape a formatted-trace frontend would fill in (the frontend
/// itself, per spec.md §1, is an out-of-scope collaborator — this crate
/// only carries the bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub timestamp_ticks: u64,
    pub caller_address: u64,
    pub format_string_pointer: u64,
    pub args: [u64; TRACE_RECORD_ARGS],
}

impl TraceRecord {
    pub fn new(
        timestamp_ticks: u64,
        caller_address: u64,
        format_string_pointer: u64,
        args: [u64; TRACE_RECORD_ARGS],
    ) -> Self {
        Self {
            timestamp_ticks,
            caller_address,
            format_string_pointer,
            args,
        }
    }
}

// SAFETY: four u64 fields plus a fixed u64 array, no padding.
unsafe impl Record for TraceRecord {}

/// Byte length of a [`ConfigRecord`]'s payload.
pub const CONFIG_RECORD_LEN: usize = 256;

/// A NUL-padded configuration string, the record shape of the Registry's
/// configuration channel (spec.md §4.4): "a specially-named RingBuffer
/// embedded in the directory" that an external reader writes configuration
/// clauses into and the host application polls.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ConfigRecord(pub [u8; CONFIG_RECORD_LEN]);

impl ConfigRecord {
    /// Encode `text` into a record, truncating at `CONFIG_RECORD_LEN - 1`
    /// bytes to leave room for the terminating NUL.
    pub fn from_str(text: &str) -> Self {
        let mut bytes = [0u8; CONFIG_RECORD_LEN];
        let truncated = &text.as_bytes()[..text.len().min(CONFIG_RECORD_LEN - 1)];
        bytes[..truncated.len()].copy_from_slice(truncated);
        Self(bytes)
    }

    /// Decode the record back to a string, stopping at the first NUL.
    /// Invalid UTF-8 (e.g. a record read mid-overwrite) is replaced
    /// lossily rather than treated as an error — nothing in this crate
    /// ever fails a read (spec.md §7).
    pub fn as_str(&self) -> String {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(self.0.len());
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

// SAFETY: a plain byte array, valid for any bit pattern.
unsafe impl Record for ConfigRecord {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_record_round_trips_through_kinds() {
        let r = NumericRecord::signed(10, -42);
        assert_eq!(r.as_signed(), -42);

        let r = NumericRecord::real(10, 3.5);
        assert_eq!(r.as_real(), 3.5);
    }

    #[test]
    fn config_record_round_trips_and_truncates() {
        let r = ConfigRecord::from_str("rate=42");
        assert_eq!(r.as_str(), "rate=42");

        let long = "a".repeat(CONFIG_RECORD_LEN + 10);
        let r = ConfigRecord::from_str(&long);
        assert_eq!(r.as_str().len(), CONFIG_RECORD_LEN - 1);
    }
}
