//! Many producers hammering one ring concurrently.
//!
//! This is the multi-writer interleaving scenario: several threads racing
//! on the same claim/commit protocol. The ring must still end up in a
//! self-consistent state: every claimed slot fully written, `overflow`
//! accounting for exactly the records that never got read, and every drain
//! returning only values that some producer actually wrote.

use recorder_ring::{RingBuffer, RingGeometry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const PRODUCERS: u64 = 8;
const WRITES_PER_PRODUCER: u64 = 100_000;
const CAPACITY: u32 = 1024;

fn encode(producer: u64, index: u64) -> [u8; 8] {
    ((producer << 48) | index).to_le_bytes()
}

fn decode(bytes: &[u8]) -> (u64, u64) {
    let v = u64::from_le_bytes(bytes.try_into().unwrap());
    (v >> 48, v & ((1 << 48) - 1))
}

#[test]
fn concurrent_writers_leave_a_consistent_ring() {
    // No reader keeps up until every producer is done; the ring is left
    // holding exactly its own capacity's worth of the most recent writes.
    let ring = Arc::new(RingBuffer::new(RingGeometry::new(CAPACITY, 8)));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for index in 0..WRITES_PER_PRODUCER {
                    let written = ring.write(&encode(producer, index));
                    assert_eq!(written, 1);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let total_writes = PRODUCERS * WRITES_PER_PRODUCER;
    let capacity = CAPACITY as u64;

    let mut item = [0u8; 8];
    let mut drained = 0u64;
    loop {
        let n = ring.read(&mut item);
        if n == 0 {
            break;
        }
        let (producer, index) = decode(&item);
        assert!(producer < PRODUCERS, "corrupted producer id {producer}");
        assert!(index < WRITES_PER_PRODUCER, "corrupted index {index}");
        drained += 1;
    }

    assert_eq!(drained, capacity, "ring holds exactly its capacity at most");
    assert_eq!(
        ring.overflow_count(),
        total_writes - capacity,
        "every write that wasn't drained must be accounted for as overflow"
    );
}

#[test]
fn consumer_drains_continuously_while_producers_are_still_writing() {
    // spec.md §8 scenario 3: "A single consumer drains the buffer
    // continuously" while producers race on claim/commit — unlike the test
    // above, the reader here runs concurrently with in-flight claims, the
    // precondition needed to exercise `RawRing::read`'s overflow catch-up
    // (which must key off `writer`, not `commit`: a claim's memcpy starts
    // the instant its CAS on `writer` lands, before that writer's own
    // commit CAS has necessarily landed).
    let ring = Arc::new(RingBuffer::new(RingGeometry::new(CAPACITY, 8)));
    let producers_done = Arc::new(AtomicBool::new(false));

    let producer_handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for index in 0..WRITES_PER_PRODUCER {
                    let written = ring.write(&encode(producer, index));
                    assert_eq!(written, 1);
                }
            })
        })
        .collect();

    let consumer_ring = Arc::clone(&ring);
    let consumer_done = Arc::clone(&producers_done);
    let consumer = thread::spawn(move || {
        // Per-producer sequence property (spec.md §8 scenario 3): "the
        // consumer-observed subsequence for `p` is strictly increasing in
        // per-producer sequence number."
        let mut last_seen: Vec<Option<u64>> = vec![None; PRODUCERS as usize];
        let mut drained = 0u64;
        let mut item = [0u8; 8];
        loop {
            let n = consumer_ring.read(&mut item);
            if n == 1 {
                let (producer, index) = decode(&item);
                assert!(producer < PRODUCERS, "corrupted producer id {producer}");
                assert!(index < WRITES_PER_PRODUCER, "corrupted index {index}");
                let last = &mut last_seen[producer as usize];
                if let Some(prev) = *last {
                    assert!(
                        index > prev,
                        "producer {producer}'s subsequence is not strictly increasing: {prev} -> {index}"
                    );
                }
                *last = Some(index);
                drained += 1;
                continue;
            }
            // Nothing committed right now. Once every producer has joined
            // (synchronized-before this load via the `Release` store
            // below), a `read` returning 0 means the ring is truly empty —
            // no producer can commit anything further.
            if consumer_done.load(Ordering::Acquire) {
                break;
            }
            thread::yield_now();
        }
        drained
    });

    for h in producer_handles {
        h.join().unwrap();
    }
    producers_done.store(true, Ordering::Release);

    let drained = consumer.join().unwrap();

    let total_writes = PRODUCERS * WRITES_PER_PRODUCER;
    assert_eq!(
        drained + ring.overflow_count(),
        total_writes,
        "every write must be either observed by the consumer or accounted for as overflow"
    );
}
