//! Windowed scalar statistics logger.
//!
//! Scalars are pushed into the current accumulation window; `log()` prints
//! the per-key window means as an aligned table, appends them to a history,
//! and resets the window. The history is what callers inspect after a
//! training run.

use std::collections::BTreeMap;
use std::time::Instant;

/// Accumulates and reports scalar training/evaluation statistics.
pub struct StatsLogger {
    window: BTreeMap<String, Vec<f64>>,
    history: Vec<BTreeMap<String, f64>>,
    start: Instant,
}

impl StatsLogger {
    /// Create a logger; the wall-clock timer starts now.
    pub fn new() -> Self {
        Self {
            window: BTreeMap::new(),
            history: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Push a set of scalars into the current window.
    pub fn push(&mut self, stats: &[(&str, f64)]) {
        for &(key, value) in stats {
            self.window.entry(key.to_string()).or_default().push(value);
        }
    }

    /// Flush the current window: print per-key means, append them to the
    /// history, and reset the window.
    pub fn log(&mut self) {
        if self.window.is_empty() {
            return;
        }

        let mut means = BTreeMap::new();
        for (key, values) in &self.window {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            means.insert(key.clone(), mean);
        }

        println!("{:-<44}", "");
        for (key, value) in &means {
            println!("{key:>24} {value:>18.6}");
        }

        self.history.push(means);
        self.window.clear();
    }

    /// All flushed windows, oldest first.
    pub fn history(&self) -> &[BTreeMap<String, f64>] {
        &self.history
    }

    /// The most recently flushed window.
    pub fn latest(&self) -> Option<&BTreeMap<String, f64>> {
        self.history.last()
    }

    /// Whether any flushed window contains the given key.
    pub fn has_logged(&self, key: &str) -> bool {
        self.history.iter().any(|entry| entry.contains_key(key))
    }

    /// Seconds elapsed since the logger was created.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for StatsLogger {
    fn default() -> Self {
        Self::new()
    }
}
