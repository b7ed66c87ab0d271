//! Lock-free, fixed-capacity ring buffers: the bottom layer (L0) of the
//! flight recorder. A ring never blocks a writer by default — a slow
//! reader simply loses the oldest records it hasn't consumed yet, and the
//! ring counts how many.
//!
//! Two things build on top of a ring's byte-oriented core:
//! [`buffer::RingBuffer`] owns its storage on the heap (what every in-process
//! `Channel` starts out as), while [`raw::RawRing`] is the non-owning view
//! that also works directly over memory-mapped bytes, so the same claim/
//! copy/commit protocol serves both in-process channels and shared-memory
//! export without duplication.

pub mod block;
pub mod buffer;
pub mod geometry;
pub mod header;
pub mod raw;

pub use block::{BlockPolicy, NonBlocking, SpinWait};
pub use buffer::RingBuffer;
pub use geometry::RingGeometry;
pub use header::{ReaderCursor, RingHeader, diff};
pub use raw::RawRing;
