//! Named, typed channels (L1): a [`RingBuffer`](recorder_ring::RingBuffer)
//! specialized to a fixed record type, carrying the identity metadata a
//! Registry needs to expose it by name and describe it to a reader.

pub mod channel;
pub mod clock;
pub mod name;
pub mod record;
mod storage;
pub mod value_kind;

pub use channel::{Channel, ChannelSpec};
pub use clock::{Clock, RECORDER_HZ, SystemClock};
pub use name::{ChannelName, InvalidChannelName, MAX_NAME_LEN};
pub use record::{
    CONFIG_RECORD_LEN, ConfigRecord, NumericRecord, Record, TRACE_RECORD_ARGS, TraceRecord,
};
pub use value_kind::ValueKind;
