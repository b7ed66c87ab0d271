use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use recorder_ring::{RingBuffer, RingGeometry};

fn single_writer_single_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_spsc");

    for &capacity in &[1024u32, 1 << 16] {
        let ring = RingBuffer::new(RingGeometry::new(capacity, 8));
        let payload = 42u64.to_le_bytes();
        let mut out = [0u8; 8];

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("write_then_read", capacity),
            &capacity,
            |b, _| {
                b.iter(|| {
                    ring.write(black_box(&payload));
                    ring.read(black_box(&mut out));
                });
            },
        );
    }

    group.finish();
}

fn batched_write(c: &mut Criterion) {
    let ring = RingBuffer::new(RingGeometry::new(1 << 16, 8));
    let batch: Vec<u8> = (0..256u64).flat_map(|v| v.to_le_bytes()).collect();

    let mut group = c.benchmark_group("ring_batched_write");
    group.throughput(Throughput::Elements(256));
    group.bench_function("write_256_items", |b| {
        b.iter(|| {
            ring.write(black_box(&batch));
        });
    });
    group.finish();
}

criterion_group!(benches, single_writer_single_reader, batched_write);
criterion_main!(benches);
