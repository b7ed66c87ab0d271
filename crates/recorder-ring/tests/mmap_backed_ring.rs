//! The same claim/copy/commit protocol, run directly over a memory-mapped
//! file instead of a heap allocation — proof that [`RawRing`] really is
//! storage-agnostic, which is what lets `recorder-export` reuse it verbatim.

use recorder_mmap::MmapFileMut;
use recorder_ring::{NonBlocking, RawRing, ReaderCursor, RingGeometry, RingHeader};
use std::mem::size_of;

fn temp_path(name: &str) -> std::path::PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "recorder-ring-test-{name}-{}-{}",
        std::process::id(),
        name.len()
    ));
    p
}

#[test]
fn ring_over_mmap_bytes_roundtrips() {
    let geometry = RingGeometry::new(8, 8);
    let header_bytes = size_of::<RingHeader>();
    let total = header_bytes + geometry.data_bytes();

    let path = temp_path("ring-over-mmap");
    let mut file = MmapFileMut::create_rw(&path, total as u64).expect("create mmap file");

    // SAFETY: `total` bytes were just allocated and zero-filled by the OS;
    // the header's all-zero representation is a valid `RingHeader`.
    let header_ptr = file.as_mut_ptr() as *mut RingHeader;
    unsafe {
        RingHeader::init_in_place(header_ptr);
    }
    let header: &RingHeader = unsafe { &*header_ptr };
    let data_ptr = unsafe { file.as_mut_ptr().add(header_bytes) };

    // SAFETY: `data_ptr` addresses exactly `geometry.data_bytes()` live bytes
    // for the remainder of this test.
    let ring = unsafe { RawRing::new(header, data_ptr, geometry) };
    let cursor = ReaderCursor::new(0);

    for v in 0..5u64 {
        let (written, _) = unsafe { ring.write(v.to_le_bytes().as_ptr(), 1, &NonBlocking) };
        assert_eq!(written, 1);
    }

    let mut out = [0u8; 8 * 5];
    let n = unsafe { ring.read(out.as_mut_ptr(), 5, cursor.atomic(), &NonBlocking) };
    assert_eq!(n, 5);
    for (i, chunk) in out.chunks_exact(8).enumerate() {
        assert_eq!(u64::from_le_bytes(chunk.try_into().unwrap()), i as u64);
    }

    let _ = std::fs::remove_file(&path);
}
