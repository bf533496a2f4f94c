// Labelled execution time measurements

use knit_core::logging::trace;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

static DEFAULT_MEASUREMENTS: Lazy<Measurements> = Lazy::new(Measurements::new);

/// The process-wide measurement registry used by [`track`] and
/// [`track_async`]
pub fn default_measurements() -> &'static Measurements {
    &DEFAULT_MEASUREMENTS
}

/// One timed execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub label: String,
    pub start: SystemTime,
    pub end: SystemTime,
    pub elapsed: Duration,
}

/// Recorded measurements in insertion order
#[derive(Debug, Default)]
pub struct Measurements {
    entries: Mutex<Vec<Entry>>,
}

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, entry: Entry) {
        trace!(label = %entry.label, elapsed_ms = entry.elapsed.as_millis() as u64, "Measurement recorded");
        self.entries.lock().push(entry);
    }

    pub fn all(&self) -> Vec<Entry> {
        self.entries.lock().clone()
    }

    pub fn by_label(&self, label: &str) -> Vec<Entry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.label == label)
            .cloned()
            .collect()
    }

    /// Total elapsed time of every entry recorded under `label`
    pub fn sum(&self, label: &str) -> Duration {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.label == label)
            .map(|entry| entry.elapsed)
            .sum()
    }

    /// Mean elapsed time of the entries recorded under `label`, `None` when
    /// there are none
    pub fn avg(&self, label: &str) -> Option<Duration> {
        let entries = self.entries.lock();
        let (count, total) = entries
            .iter()
            .filter(|entry| entry.label == label)
            .fold((0u32, Duration::ZERO), |(count, total), entry| {
                (count + 1, total + entry.elapsed)
            });
        (count > 0).then(|| total / count)
    }

    /// Remove the entries recorded under `label`, or every entry when no
    /// label is given
    pub fn clear(&self, label: Option<&str>) {
        let mut entries = self.entries.lock();
        match label {
            Some(label) => entries.retain(|entry| entry.label != label),
            None => entries.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Time `f` under `label`
    pub fn track<T>(&self, label: &str, f: impl FnOnce() -> T) -> T {
        Tracker::new(label).with_measurements(self).run(f)
    }

    /// Time `future` under `label`, from first poll to completion
    pub async fn track_async<F: Future>(&self, label: &str, future: F) -> F::Output {
        Tracker::new(label)
            .with_measurements(self)
            .run_async(future)
            .await
    }
}

/// Time `f` under `label` in the default registry
pub fn track<T>(label: &str, f: impl FnOnce() -> T) -> T {
    default_measurements().track(label, f)
}

/// Time `future` under `label` in the default registry
pub async fn track_async<F: Future>(label: &str, future: F) -> F::Output {
    default_measurements().track_async(label, future).await
}

/// Configurable timing wrapper.
///
/// A disabled tracker runs the work without recording anything.
#[derive(Debug, Clone)]
pub struct Tracker<'m> {
    label: String,
    enabled: bool,
    measurements: &'m Measurements,
}

impl Tracker<'static> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            measurements: default_measurements(),
        }
    }
}

impl<'m> Tracker<'m> {
    /// Record into another registry
    pub fn with_measurements<'n>(self, measurements: &'n Measurements) -> Tracker<'n> {
        Tracker {
            label: self.label,
            enabled: self.enabled,
            measurements,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn run<T>(self, f: impl FnOnce() -> T) -> T {
        if !self.enabled {
            return f();
        }
        let (wall, start) = (SystemTime::now(), Instant::now());
        let value = f();
        self.record(wall, start.elapsed());
        value
    }

    pub async fn run_async<F: Future>(self, future: F) -> F::Output {
        if !self.enabled {
            return future.await;
        }
        let (wall, start) = (SystemTime::now(), Instant::now());
        let value = future.await;
        self.record(wall, start.elapsed());
        value
    }

    fn record(&self, start: SystemTime, elapsed: Duration) {
        self.measurements.add(Entry {
            label: self.label.clone(),
            start,
            end: start + elapsed,
            elapsed,
        });
    }
}
