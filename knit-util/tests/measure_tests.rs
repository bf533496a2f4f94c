// Tests for labelled execution time measurements

use knit_util::*;
use std::time::Duration;

const RUNS: usize = 10_000;

fn repeat(c: char) -> String {
    let mut acc = String::new();
    for _ in 0..RUNS {
        acc.push(c);
    }
    acc
}

#[test]
fn test_sync_executions_are_recorded() {
    let measurements = Measurements::new();
    let label = "perf:repeat:sync";

    for c in ['x', 'y', 'z'] {
        let value = measurements.track(label, || repeat(c));
        assert_eq!(value, c.to_string().repeat(RUNS));
    }

    let entries = measurements.by_label(label);
    assert_eq!(entries.len(), 3);
    let total: Duration = entries.iter().map(|entry| entry.elapsed).sum();
    assert_eq!(measurements.sum(label), total);
}

#[tokio::test(start_paused = true)]
async fn test_async_execution_is_recorded() {
    let measurements = Measurements::new();
    let label = "perf:repeat:async";

    let value = measurements
        .track_async(label, async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            "x"
        })
        .await;

    assert_eq!(value, "x");
    assert_eq!(measurements.by_label(label).len(), 1);
    assert!(measurements.sum(label) >= Duration::from_millis(150));
}

#[test]
fn test_disabled_tracker_skips_recording() {
    let measurements = Measurements::new();

    let value = Tracker::new("perf:repeat:skip")
        .with_measurements(&measurements)
        .enabled(false)
        .run(|| repeat('x'));

    assert_eq!(value, "x".repeat(RUNS));
    assert!(measurements.all().is_empty());
}

#[tokio::test]
async fn test_default_registry_records_free_functions() {
    let label = "perf:default:free-functions";

    assert_eq!(track(label, || 1 + 1), 2);
    assert_eq!(track_async(label, async { 3 }).await, 3);

    assert_eq!(default_measurements().by_label(label).len(), 2);
    default_measurements().clear(Some(label));
    assert!(default_measurements().by_label(label).is_empty());
}
