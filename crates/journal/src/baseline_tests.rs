// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_tracker_normalizes_to_zero() {
    let tracker = BaselineTracker::new(100);
    assert_eq!(tracker.normalized(Intent::DispatchJob, 500.0, 1.0), (0.0, 0.0));
}

#[test]
fn window_is_bounded() {
    let tracker = BaselineTracker::new(10);
    for i in 0..100 {
        tracker.observe(Intent::DispatchJob, i as f64, 0.0);
    }
    // Window holds 90..=99; p50 is near the middle of that range.
    let (p50, p95) = tracker.latency_percentiles(Intent::DispatchJob).unwrap();
    assert!(p50 >= 90.0);
    assert!(p95 <= 99.0);
}

#[test]
fn normalization_tracks_the_window() {
    let tracker = BaselineTracker::new(100);
    for latency in [100.0, 110.0, 120.0, 130.0, 140.0, 150.0, 160.0, 170.0, 180.0, 200.0] {
        tracker.observe(Intent::DispatchJob, latency, 0.5);
    }

    let (fast, _) = tracker.normalized(Intent::DispatchJob, 100.0, 0.5);
    let (slow, _) = tracker.normalized(Intent::DispatchJob, 1_000.0, 0.5);
    assert_eq!(fast, 0.0);
    assert_eq!(slow, 1.0);

    let (mid, _) = tracker.normalized(Intent::DispatchJob, 175.0, 0.5);
    assert!(mid > 0.0 && mid < 1.0);
}

#[test]
fn intents_have_independent_windows() {
    let tracker = BaselineTracker::new(100);
    tracker.observe(Intent::DispatchJob, 100.0, 0.0);
    assert!(tracker.latency_percentiles(Intent::DispatchJob).is_some());
    assert!(tracker.latency_percentiles(Intent::RouteLlmCall).is_none());
}

#[test]
fn percentile_nearest_rank() {
    let buf: VecDeque<f64> = vec![10.0, 20.0, 30.0, 40.0].into();
    assert_eq!(percentile(&buf, 0.50), 20.0);
    assert_eq!(percentile(&buf, 0.95), 40.0);
    let single: VecDeque<f64> = vec![7.0].into();
    assert_eq!(percentile(&single, 0.95), 7.0);
}
