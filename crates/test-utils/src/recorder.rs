use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded task run: a global sequence number at start and at end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub begin: u64,
    pub end: u64,
}

/// Thread-safe log of task runs, shared between tasks and the test body.
///
/// Each run takes two ticks from a shared counter, so "A finished before
/// B started" can be checked exactly, without relying on wall-clock time.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<Entry>>>,
    clock: Arc<AtomicU64>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run of `name` with no work in between.
    pub fn record(&self, name: &str) {
        self.record_with(name, || ());
    }

    /// Record a run of `name` around `work`.
    pub fn record_with<T>(&self, name: &str, work: impl FnOnce() -> T) -> T {
        let begin = self.clock.fetch_add(1, Ordering::SeqCst);
        let out = work();
        let end = self.clock.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().push(Entry {
            name: name.to_string(),
            begin,
            end,
        });
        out
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Names in completion order.
    pub fn names(&self) -> Vec<String> {
        let mut entries = self.entries();
        entries.sort_by_key(|e| e.end);
        entries.into_iter().map(|e| e.name).collect()
    }

    pub fn runs_of(&self, name: &str) -> usize {
        self.entries.lock().unwrap().iter().filter(|e| e.name == name).count()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Panics unless every run of `first` ended before every run of `second`
    /// began.
    pub fn assert_before(&self, first: &str, second: &str) {
        let entries = self.entries();
        let last_end = entries
            .iter()
            .filter(|e| e.name == first)
            .map(|e| e.end)
            .max()
            .unwrap_or_else(|| panic!("`{first}` never ran"));
        let first_begin = entries
            .iter()
            .filter(|e| e.name == second)
            .map(|e| e.begin)
            .min()
            .unwrap_or_else(|| panic!("`{second}` never ran"));
        assert!(
            last_end < first_begin,
            "`{first}` (end {last_end}) did not finish before `{second}` (begin {first_begin})"
        );
    }
}
