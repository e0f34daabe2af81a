use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide allocation counters for runtime entities.
///
/// Counts only go up. Function objects and loaded units are never freed
/// while their session lives, so the totals approximate what a session
/// retains.
#[derive(Debug, Clone, Copy)]
pub struct LeakStats {
    pub objects: usize,
    pub functions: usize,
    pub layouts: usize,
    pub units: usize,
}

static OBJECTS: AtomicUsize = AtomicUsize::new(0);
static FUNCTIONS: AtomicUsize = AtomicUsize::new(0);
static LAYOUTS: AtomicUsize = AtomicUsize::new(0);
static UNITS: AtomicUsize = AtomicUsize::new(0);

pub fn record_object() {
    OBJECTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_function() {
    FUNCTIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_layout() {
    LAYOUTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_unit() {
    UNITS.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> LeakStats {
    LeakStats {
        objects: OBJECTS.load(Ordering::Relaxed),
        functions: FUNCTIONS.load(Ordering::Relaxed),
        layouts: LAYOUTS.load(Ordering::Relaxed),
        units: UNITS.load(Ordering::Relaxed),
    }
}
