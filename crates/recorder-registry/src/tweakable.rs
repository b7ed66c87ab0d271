//! Named signed integers the Registry holds for the application to read
//! on its hot path and an external tool to write (spec.md §4.3, §6).

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// A cheap-to-clone handle to one tweakable. The application is expected to
/// keep this around and call [`Tweakable::get`] from a hot path; writes are
/// rare and come from configuration clauses, so a single atomic is enough —
/// spec.md §4.3: "read by the application's hot path via a single atomic
/// load; writes are rare and unordered with respect to each other."
#[derive(Clone)]
pub struct Tweakable {
    name: Arc<str>,
    value: Arc<AtomicI64>,
}

impl Tweakable {
    pub(crate) fn new(name: impl Into<Arc<str>>, default: i64) -> Self {
        Self {
            name: name.into(),
            value: Arc::new(AtomicI64::new(default)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }
}
