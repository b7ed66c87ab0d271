//! Back-pressure hooks.
//!
//! The original C implementation takes raw function pointers for
//! `write_block`, `commit_block`, `read_block` and `read_overflow`
//! (recorder_ring.c). Design Notes in spec.md §9 ask for a small capability
//! interface instead of four independent function pointers, so every hook
//! lives on one `BlockPolicy` trait. Each method returns `true` to mean
//! "I waited, the condition should now hold, proceed at full size" and
//! `false` to mean "give up", matching the original's `!block_fn(...)`
//! short-circuit exactly.

/// Back-pressure policy consulted by [`crate::raw::RawRing`] read/write.
///
/// The default implementations all return `false` ("give up immediately"),
/// which is the non-blocking fast path: short counts and overflow skips
/// happen immediately rather than spinning.
pub trait BlockPolicy {
    /// A writer's claim would overwrite slots the default reader has not
    /// consumed yet. `behind` is how far the claim would put the writer
    /// ahead of the reader. Returning `false` (the default) lets the ring
    /// do what it is for: overwrite and keep going, lossily, while the
    /// reader's own catch-up accounts for what was skipped. Returning
    /// `true` means the policy waited, so the claim is re-evaluated against
    /// fresh cursors instead of being allowed to overwrite.
    fn on_write_full(&self, behind: u64, capacity: u64) -> bool {
        let _ = (behind, capacity);
        false
    }

    /// `commit` is stuck behind another writer still mid-copy.
    fn on_commit_stalled(&self) -> bool {
        false
    }

    /// A reader asked for more than is currently committed.
    fn on_read_short(&self, available: u64, requested: u64) -> bool {
        let _ = (available, requested);
        false
    }

    /// The reader has fallen far enough behind that it is about to skip
    /// forward over unread data (the overflow catch-up of spec.md §4.1
    /// step 2). Returning `true` suppresses the skip for this call.
    fn on_overflow(&self, reader: u64, first_valid: u64) -> bool {
        let _ = (reader, first_valid);
        false
    }
}

/// The default, fully non-blocking policy: every hook declines immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonBlocking;

impl BlockPolicy for NonBlocking {}

/// Spins a bounded number of times before giving up, as spec.md §5
/// describes: "a brief pause (e.g. CPU-relax, short sleep)... may decline,
/// returning control to the degraded fast path."
#[derive(Debug, Clone, Copy)]
pub struct SpinWait {
    pub max_spins: u32,
}

impl SpinWait {
    pub fn new(max_spins: u32) -> Self {
        Self { max_spins }
    }

    fn spin(&self) -> bool {
        for _ in 0..self.max_spins {
            std::hint::spin_loop();
        }
        // A bounded spin cannot itself know whether the condition cleared;
        // the caller re-checks after we return. We report "keep going" only
        // when we actually had spins to offer.
        self.max_spins > 0
    }
}

impl BlockPolicy for SpinWait {
    fn on_write_full(&self, _behind: u64, _capacity: u64) -> bool {
        self.spin()
    }

    fn on_commit_stalled(&self) -> bool {
        self.spin()
    }

    fn on_read_short(&self, _available: u64, _requested: u64) -> bool {
        self.spin()
    }

    fn on_overflow(&self, _reader: u64, _first_valid: u64) -> bool {
        // Spinning never manufactures data the writer already overwrote;
        // suppressing the skip here would just re-read stale slots.
        false
    }
}
