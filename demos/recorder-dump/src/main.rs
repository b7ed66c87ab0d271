//! A headless reader-client for a shared-export file: the out-of-process
//! collaborator spec.md §1 names as out of scope for the core itself
//! ("a viewer, a slider-driven replay tool"). This one prints the channel
//! directory, optionally tails one channel's raw numeric values, and can
//! push a configuration clause back into the running application.
//!
//! ```text
//! recorder-dump <path>
//! recorder-dump <path> --tail <channel>
//! recorder-dump <path> --push '<clause>'
//! ```

use recorder_channel::NumericRecord;
use recorder_export::ExportReader;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_directory(reader: &ExportReader) {
    println!("{:<24} {:>10} {:>10} {:>12}", "name", "capacity", "item_size", "value_kind");
    for entry in reader.directory() {
        println!(
            "{:<24} {:>10} {:>10} {:>12?}",
            entry.name, entry.capacity, entry.item_size, entry.value_kind
        );
    }
}

fn tail_channel(reader: &ExportReader, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let index = reader.expect_channel(name)?;
    let ring = reader.ring_for::<NumericRecord>(index);
    info!(channel = name, "tailing, press Ctrl-C to stop");
    let mut buf = [NumericRecord::new(0, 0); 64];
    loop {
        let n = ring.read(&mut buf);
        if n == 0 {
            std::thread::sleep(Duration::from_millis(20));
            continue;
        }
        for record in &buf[..n] {
            println!("{}\t{}", record.timestamp_ticks, record.as_signed());
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        error!("usage: recorder-dump <path> [--tail <channel> | --push <clause>]");
        std::process::exit(2);
    };

    let reader = ExportReader::open(path)?;
    info!(path = reader.path(), channels = reader.channel_count(), "opened export file");

    match (args.get(2).map(String::as_str), args.get(3)) {
        (Some("--tail"), Some(channel)) => tail_channel(&reader, channel)?,
        (Some("--push"), Some(clause)) => {
            if reader.push_configuration(clause) {
                info!(clause = %clause, "configuration pushed");
            } else {
                error!("no configuration channel in this export file");
                std::process::exit(1);
            }
        }
        _ => print_directory(&reader),
    }

    Ok(())
}
