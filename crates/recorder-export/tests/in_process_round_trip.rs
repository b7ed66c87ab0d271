//! Single-process exercise of the full L0-L3 stack: a Registry with export
//! enabled, a channel born mapped, and an `ExportReader` attached to the
//! same file reading what the host application wrote.

use recorder_channel::{ChannelName, ChannelSpec, NumericRecord, ValueKind};
use recorder_export::{ExportConfig, ExportReader, SharedExport};
use recorder_registry::Registry;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_path(tag: &str) -> std::path::PathBuf {
    let ts = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("recorder_export_test_{tag}_{ts}"))
}

#[test]
fn channel_registered_after_export_is_visible_to_an_external_reader() {
    let path = unique_path("round_trip");
    let registry = Registry::new();
    let export = SharedExport::enable(ExportConfig::new(&path), &registry).unwrap();

    let spec = ChannelSpec {
        name: ChannelName::new("queue_depth").unwrap(),
        description: "pending jobs".to_string(),
        unit: "jobs".to_string(),
        min: 0.0,
        max: 100_000.0,
        value_kind: ValueKind::Unsigned,
        capacity: 64,
        always_on: true,
    };
    let channel = registry.channel::<NumericRecord>(spec);
    assert!(channel.is_mapped(), "channel registered after enable() must be mapped");

    // Writes before the external reader attaches are not part of its
    // tail-follow view (the same convention `RingBuffer::new_cursor` uses
    // for any independent cursor opened after a channel already has data).
    assert!(channel.write(NumericRecord::new(999, 999)));

    let reader = ExportReader::open(&path).unwrap();
    // +1 for the reserved configuration channel.
    assert_eq!(reader.channel_count(), 2);
    let index = reader.expect_channel("queue_depth").unwrap();
    let ring = reader.ring_for::<NumericRecord>(index);
    assert_eq!(ring.readable(), 0);

    for i in 0..10u64 {
        assert!(channel.write(NumericRecord::new(i, i * 7)));
    }
    assert_eq!(ring.readable(), 10);

    let mut out = [NumericRecord::new(0, 0); 10];
    assert_eq!(ring.read(&mut out), 10);
    assert_eq!(out[3].value, 21);

    drop(export);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn pushed_configuration_reaches_the_registry() {
    let path = unique_path("config_push");
    let registry = Registry::new();
    let _export = SharedExport::enable(ExportConfig::new(&path), &registry).unwrap();

    let spec = ChannelSpec {
        name: ChannelName::new("http_error").unwrap(),
        description: "errored requests".to_string(),
        unit: "".to_string(),
        min: 0.0,
        max: 0.0,
        value_kind: ValueKind::Unsigned,
        capacity: 16,
        always_on: false,
    };
    let channel = registry.channel::<NumericRecord>(spec);
    assert!(!channel.write(NumericRecord::new(0, 1)));

    let reader = ExportReader::open(&path).unwrap();
    assert!(reader.push_configuration("http_error=1"));

    let applied = _export.poll_configuration(&registry);
    assert_eq!(applied, 1);
    assert!(channel.write(NumericRecord::new(1, 1)));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn channel_exceeding_the_export_budget_falls_back_to_heap_storage() {
    let path = unique_path("oversize_fallback");
    let registry = Registry::new();
    let mut config = ExportConfig::new(&path);
    config.channel_capacity = 8;
    let _export = SharedExport::enable(config, &registry).unwrap();

    let spec = ChannelSpec {
        name: ChannelName::new("oversize").unwrap(),
        description: "bigger capacity than the export budget allows".to_string(),
        unit: "".to_string(),
        min: 0.0,
        max: 0.0,
        value_kind: ValueKind::Unsigned,
        capacity: 16,
        always_on: true,
    };
    let channel = registry.channel::<NumericRecord>(spec);
    assert!(!channel.is_mapped(), "oversize channel must fall back to heap storage, not be dropped");
    assert!(channel.write(NumericRecord::new(0, 1)));

    let _ = std::fs::remove_file(&path);
}
