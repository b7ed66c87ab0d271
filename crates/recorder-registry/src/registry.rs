//! The Registry (L2): spec.md §4.3's "process-wide set of Channels,
//! addressable by a stable, monotonically-assigned channel index and by
//! name," plus trace flags and tweakables.

use crate::any_channel::AnyChannel;
use crate::export_sink::{ChannelDescriptor, ExportSink};
use crate::pattern::TracePattern;
use crate::tweakable::Tweakable;
use recorder_channel::{Channel, ChannelName, ChannelSpec, Clock, Record, SystemClock};
use std::mem::size_of;
use std::sync::{Arc, Mutex};

/// One registered channel plus the stable index spec.md §4.3 promises it.
struct Entry {
    id: u32,
    channel: Arc<dyn AnyChannel>,
}

struct Inner {
    channels: Vec<Entry>,
    tweakables: Vec<Tweakable>,
    /// Every trace clause ever applied, in application order, so a channel
    /// registered after the clause still starts in the state the clause
    /// describes.
    patterns: Vec<TracePattern>,
    next_id: u32,
}

/// A configuration clause that failed to apply (spec.md §7:
/// `InvalidConfiguration`). The clause is dropped and parsing continues —
/// this type exists to let the caller inspect what was dropped and why,
/// beyond the `tracing::warn!` the Registry also emits for each one.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigureError {
    #[error("clause '{clause}' names tweakable '{name}' with a non-integer value '{value}'")]
    BadInteger {
        clause: String,
        name: String,
        value: String,
    },

    #[error("clause '{clause}' is not a valid pattern: {reason}")]
    BadPattern { clause: String, reason: String },
}

/// The result of parsing a `RECORDER_TRACES`-style configuration string
/// (spec.md §4.3, §6).
#[derive(Debug, Default)]
pub struct ConfigureReport {
    pub applied: u32,
    pub errors: Vec<ConfigureError>,
}

/// Process-wide table of Channels and their configuration (spec.md §4.3).
///
/// Concurrent channel creation is serialized by a single lock held only for
/// the duration of the append (spec.md §5); reads of an individual
/// channel's data never touch this lock at all — they go straight through
/// the `Arc<dyn AnyChannel>` to the channel's own lock-free ring.
pub struct Registry {
    inner: Mutex<Inner>,
    export_sink: Mutex<Option<Arc<dyn ExportSink>>>,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                channels: Vec::new(),
                tweakables: Vec::new(),
                patterns: Vec::new(),
                next_id: 0,
            }),
            export_sink: Mutex::new(None),
            clock,
        }
    }

    /// Attach a shared-memory exporter so channels registered from now on
    /// are born with mapped storage when the exporter has room for them
    /// (spec.md §4.4). Channels registered before this call stay heap-backed
    /// — the export directory only ever grows at its tail.
    pub fn attach_export_sink(&self, sink: Arc<dyn ExportSink>) {
        *self.export_sink.lock().unwrap() = Some(sink);
    }

    /// Register a new channel. Panics if `spec.name` is already registered
    /// — spec.md §3 treats Channels as created once at startup or on first
    /// use, never re-created, so a collision is a programming error in the
    /// host application rather than a condition to degrade gracefully from.
    pub fn channel<R: Record>(&self, spec: ChannelSpec) -> Arc<Channel<R>> {
        let mut inner = self.inner.lock().unwrap();
        assert!(
            !inner
                .channels
                .iter()
                .any(|e| e.channel.name() == spec.name.as_str()),
            "channel '{}' is already registered",
            spec.name
        );

        let descriptor = ChannelDescriptor {
            name: spec.name.as_str(),
            description: &spec.description,
            unit: &spec.unit,
            min: spec.min,
            max: spec.max,
            value_kind: spec.value_kind,
            item_size: size_of::<R>() as u32,
            capacity: spec.capacity,
        };
        let sink = self.export_sink.lock().unwrap().clone();
        let mapped = sink.as_ref().and_then(|s| s.allocate(&descriptor));

        let name = spec.name.as_str().to_string();
        let always_on = spec.always_on;
        let channel = Arc::new(match mapped {
            // SAFETY: `ExportSink::allocate` hands back pointers into a live
            // mapping, kept alive for as long as `keep_alive` is held, which
            // this `Channel` now holds onto.
            Some(slot) => unsafe {
                Channel::new_mapped(spec, Arc::clone(&self.clock), slot.header, slot.data, slot.keep_alive)
            },
            None => Channel::new(spec, Arc::clone(&self.clock)),
        });

        if !always_on {
            let traced = inner
                .patterns
                .iter()
                .filter(|p| p.matches(&name))
                .last()
                .map(|p| p.traced);
            if let Some(traced) = traced {
                channel.set_traced(traced);
            }
        }

        let id = inner.next_id;
        inner.next_id += 1;
        inner.channels.push(Entry {
            id,
            channel: Arc::clone(&channel) as Arc<dyn AnyChannel>,
        });
        tracing::info!(channel = %name, id, mapped = channel.is_mapped(), "channel registered");

        channel
    }

    /// Register a tweakable, or return the existing handle if one by this
    /// name already exists — the first registration's default wins.
    pub fn tweakable(&self, name: &str, default: i64) -> Tweakable {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.tweakables.iter().find(|t| t.name() == name) {
            return existing.clone();
        }
        let t = Tweakable::new(name, default);
        inner.tweakables.push(t.clone());
        t
    }

    /// Look up a channel by its exact, literal name.
    pub fn find(&self, name: &str) -> Option<Arc<dyn AnyChannel>> {
        let inner = self.inner.lock().unwrap();
        inner
            .channels
            .iter()
            .find(|e| e.channel.name() == name)
            .map(|e| Arc::clone(&e.channel))
    }

    pub fn channel_id(&self, name: &str) -> Option<u32> {
        let inner = self.inner.lock().unwrap();
        inner.channels.iter().find(|e| e.channel.name() == name).map(|e| e.id)
    }

    /// All channels whose name matches `pattern` (a regular expression,
    /// implicitly anchored to the whole name — see `pattern.rs`).
    pub fn matching(&self, pattern: &str) -> Result<Vec<Arc<dyn AnyChannel>>, regex::Error> {
        let compiled = TracePattern::compile(pattern, true)?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .channels
            .iter()
            .filter(|e| compiled.matches(e.channel.name()))
            .map(|e| Arc::clone(&e.channel))
            .collect())
    }

    pub fn channels(&self) -> Vec<Arc<dyn AnyChannel>> {
        let inner = self.inner.lock().unwrap();
        inner.channels.iter().map(|e| Arc::clone(&e.channel)).collect()
    }

    /// Parse and apply a `"pattern1[=value1],pattern2[=value2],..."`
    /// configuration string (spec.md §4.3, §6). Each clause is applied
    /// independently; a clause that fails to parse is dropped (logged) and
    /// the rest still run.
    pub fn configure(&self, input: &str) -> ConfigureReport {
        let mut report = ConfigureReport::default();
        for clause in input.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            match self.apply_clause(clause) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    tracing::warn!(clause, error = %e, "dropping invalid configuration clause");
                    report.errors.push(e);
                }
            }
        }
        report
    }

    fn apply_clause(&self, clause: &str) -> Result<(), ConfigureError> {
        let (name, value) = match clause.split_once('=') {
            Some((n, v)) => (n.trim(), Some(v.trim())),
            None => (clause.trim(), None),
        };

        let mut inner = self.inner.lock().unwrap();
        if let Some(tweak) = inner.tweakables.iter().find(|t| t.name() == name) {
            let raw = value.unwrap_or("1");
            let parsed: i64 = raw.parse().map_err(|_| ConfigureError::BadInteger {
                clause: clause.to_string(),
                name: name.to_string(),
                value: raw.to_string(),
            })?;
            tweak.set(parsed);
            tracing::debug!(name, value = parsed, "tweakable updated");
            return Ok(());
        }

        let raw = value.unwrap_or("1");
        let as_int: i64 = raw.parse().unwrap_or(1);
        let traced = as_int != 0;
        let compiled = TracePattern::compile(name, traced).map_err(|e| ConfigureError::BadPattern {
            clause: clause.to_string(),
            reason: e.to_string(),
        })?;

        for entry in inner.channels.iter() {
            if compiled.matches(entry.channel.name()) {
                entry.channel.set_traced(traced);
                tracing::debug!(channel = entry.channel.name(), traced, "trace flag updated");
            }
        }
        inner.patterns.push(compiled);
        Ok(())
    }

    /// Emit the current configuration as a string that, re-parsed against
    /// this same Registry, leaves its state unchanged (spec.md §8's
    /// round-trip property). Channels that are inactive need no clause —
    /// `Inactive` is every tracing channel's starting state.
    pub fn emit_configuration(&self) -> String {
        let inner = self.inner.lock().unwrap();
        let mut clauses = Vec::new();
        for t in &inner.tweakables {
            clauses.push(format!("{}={}", t.name(), t.get()));
        }
        for entry in &inner.channels {
            if entry.channel.is_active() {
                clauses.push(format!("{}=1", regex::escape(entry.channel.name())));
            }
        }
        clauses.join(",")
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recorder_channel::{NumericRecord, ValueKind};

    fn spec(name: &str, always_on: bool) -> ChannelSpec {
        ChannelSpec {
            name: ChannelName::new(name).unwrap(),
            description: "test channel".to_string(),
            unit: "".to_string(),
            min: 0.0,
            max: 0.0,
            value_kind: ValueKind::Signed,
            capacity: 8,
            always_on,
        }
    }

    #[test]
    fn channels_start_inactive_unless_always_on() {
        let reg = Registry::new();
        let c = reg.channel::<NumericRecord>(spec("http_error", false));
        assert!(!c.is_active());
        let always = reg.channel::<NumericRecord>(spec("heartbeat", true));
        assert!(always.is_active());
    }

    #[test]
    fn trace_pattern_toggles_matching_channels_only() {
        // spec.md §8 scenario 6.
        let reg = Registry::new();
        let http_error = reg.channel::<NumericRecord>(spec("http_error", false));
        let http_warning = reg.channel::<NumericRecord>(spec("http_warning", false));
        let db_error = reg.channel::<NumericRecord>(spec("db_error", false));

        let report = reg.configure(".*_error=1");
        assert_eq!(report.applied, 1);
        assert!(report.errors.is_empty());

        assert!(http_error.is_active());
        assert!(db_error.is_active());
        assert!(!http_warning.is_active());
    }

    #[test]
    fn tweakable_clause_sets_value_and_leaves_clauses_after_it_alone() {
        // spec.md §8 scenario 5 / invariant 5.
        let reg = Registry::new();
        let rate = reg.tweakable("rate", 10);
        assert_eq!(rate.get(), 10);

        reg.configure("rate=42");
        assert_eq!(rate.get(), 42);
    }

    #[test]
    fn bad_clause_is_dropped_and_does_not_stop_the_rest() {
        let reg = Registry::new();
        let rate = reg.tweakable("rate", 1);
        let http_error = reg.channel::<NumericRecord>(spec("http_error", false));

        let report = reg.configure("rate=oops,http_error=1");
        assert_eq!(report.applied, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(rate.get(), 1, "bad clause must not have touched the tweakable");
        assert!(http_error.is_active(), "later clauses still run");
    }

    #[test]
    fn patterns_apply_retroactively_to_channels_registered_later() {
        let reg = Registry::new();
        reg.configure(".*_error=1");
        let late = reg.channel::<NumericRecord>(spec("late_error", false));
        assert!(late.is_active());
    }

    #[test]
    fn configuration_round_trips() {
        // spec.md §8: "Parsing... emitting... and re-parsing... yields
        // identical Registry state."
        let reg = Registry::new();
        reg.tweakable("rate", 10);
        reg.channel::<NumericRecord>(spec("http_error", false));
        reg.configure("rate=42,http_error=1");

        let emitted = reg.emit_configuration();
        let report = reg.configure(&emitted);
        assert!(report.errors.is_empty());

        assert_eq!(reg.find("http_error").unwrap().is_active(), true);
        assert_eq!(emitted, reg.emit_configuration());
    }

    #[test]
    fn literal_channel_name_pattern_does_not_match_a_longer_name() {
        let reg = Registry::new();
        let a = reg.channel::<NumericRecord>(spec("http_error", false));
        let b = reg.channel::<NumericRecord>(spec("http_error_rate", false));
        reg.configure("http_error=1");
        assert!(a.is_active());
        assert!(!b.is_active());
    }
}
