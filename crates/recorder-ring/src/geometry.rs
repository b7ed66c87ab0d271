/// Fixed shape of a ring: slot count and the size in bytes of one slot.
///
/// `capacity` must be a power of two so that `seq % capacity` reduces to a
/// bitwise AND (`ring.c`'s comment block spells out exactly this tradeoff).
/// Both fields are immutable for the lifetime of the ring (spec.md §3:
/// "`size = N`, `item_size = S` (immutable after init)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingGeometry {
    pub capacity: u32,
    pub item_size: u32,
}

impl RingGeometry {
    pub fn new(capacity: u32, item_size: u32) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of 2");
        assert!(item_size > 0, "item_size must be non-zero");
        Self {
            capacity,
            item_size,
        }
    }

    /// `capacity - 1`, used to map a sequence number to a slot index.
    #[inline(always)]
    pub fn mask(&self) -> u64 {
        (self.capacity as u64) - 1
    }

    #[inline(always)]
    pub fn slot_index(&self, seq: u64) -> u64 {
        seq & self.mask()
    }

    /// Bytes needed for the `data[capacity * item_size]` region alone,
    /// excluding the [`crate::header::RingHeader`] that precedes it.
    pub fn data_bytes(&self) -> usize {
        self.capacity as usize * self.item_size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_is_capacity_minus_one() {
        let g = RingGeometry::new(8, 16);
        assert_eq!(g.mask(), 7);
        assert_eq!(g.slot_index(15), 7);
        assert_eq!(g.slot_index(16), 0);
    }

    #[test]
    #[should_panic(expected = "power of 2")]
    fn rejects_non_power_of_two_capacity() {
        RingGeometry::new(3, 16);
    }
}
