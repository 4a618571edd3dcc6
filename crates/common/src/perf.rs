use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Rolling counter sampled once per frame or per monitored phase.
///
/// `current` accumulates within a frame; `fetch_new_frame` opens the next
/// one. Min, max and average cover every fetched value since creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfCounter {
    current: f64,
    min: f64,
    max: f64,
    average: f64,
    total: f64,
    count: u64,
    #[serde(skip)]
    started: Option<Instant>,
}

impl PerfCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Number of values folded into the statistics.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn fetch_new_frame(&mut self) {
        self.current = 0.0;
    }

    /// Add to the current value; `fetch_result` folds it into the statistics.
    pub fn add_count(&mut self, value: f64, fetch_result: bool) {
        self.current += value;
        if fetch_result {
            self.fetch_result();
        }
    }

    pub fn begin_monitoring(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Record the milliseconds elapsed since `begin_monitoring`.
    pub fn end_monitoring(&mut self, new_frame: bool) {
        let Some(start) = self.started.take() else {
            return;
        };
        self.record_duration(start.elapsed(), new_frame);
    }

    /// Record an externally measured duration.
    pub fn record_duration(&mut self, elapsed: Duration, new_frame: bool) {
        if new_frame {
            self.fetch_new_frame();
        }
        self.current += elapsed.as_secs_f64() * 1000.0;
        self.fetch_result();
    }

    fn fetch_result(&mut self) {
        self.count += 1;
        self.total += self.current;
        if self.count == 1 {
            self.min = self.current;
            self.max = self.current;
        } else {
            self.min = self.min.min(self.current);
            self.max = self.max.max(self.current);
        }
        self.average = self.total / self.count as f64;
    }
}

/// Ring buffer of recent frame durations.
#[derive(Debug, Clone)]
pub struct FrameHistory {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl FrameHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn samples(&self) -> &[Duration] {
        let count = if self.filled { self.capacity } else { self.index };
        &self.history[..count]
    }

    pub fn average(&self) -> Duration {
        let samples = self.samples();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        samples.iter().sum::<Duration>() / samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.samples().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        self.samples().len()
    }

    /// Frames per second over the recorded window, zero when empty.
    pub fn fps(&self) -> f64 {
        let avg = self.average().as_secs_f64();
        if avg <= 0.0 { 0.0 } else { 1.0 / avg }
    }
}

impl Default for FrameHistory {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_tracks_min_max_average() {
        let mut c = PerfCounter::new();
        for v in [10.0, 30.0, 20.0] {
            c.fetch_new_frame();
            c.add_count(v, true);
        }
        assert_eq!(c.count(), 3);
        assert_eq!(c.min(), 10.0);
        assert_eq!(c.max(), 30.0);
        assert_eq!(c.average(), 20.0);
        assert_eq!(c.current(), 20.0);
    }

    #[test]
    fn counter_accumulates_within_frame() {
        let mut c = PerfCounter::new();
        c.fetch_new_frame();
        c.add_count(4.0, false);
        c.add_count(6.0, false);
        assert_eq!(c.current(), 10.0);
        assert_eq!(c.count(), 0);
        c.add_count(0.0, true);
        assert_eq!(c.average(), 10.0);
    }

    #[test]
    fn end_without_begin_is_ignored() {
        let mut c = PerfCounter::new();
        c.end_monitoring(true);
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn record_duration_in_millis() {
        let mut c = PerfCounter::new();
        c.record_duration(Duration::from_millis(16), true);
        assert!((c.current() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn frame_history_tracks_window() {
        let mut h = FrameHistory::new(3);
        h.record(Duration::from_millis(10));
        h.record(Duration::from_millis(20));
        h.record(Duration::from_millis(30));
        assert_eq!(h.count(), 3);
        assert_eq!(h.average(), Duration::from_millis(20));
        assert_eq!(h.max(), Duration::from_millis(30));
        assert_eq!(h.min(), Duration::from_millis(10));
    }

    #[test]
    fn frame_history_wraps_around() {
        let mut h = FrameHistory::new(2);
        h.record(Duration::from_millis(10));
        h.record(Duration::from_millis(20));
        h.record(Duration::from_millis(30));
        assert_eq!(h.count(), 2);
        assert_eq!(h.average(), Duration::from_millis(25));
    }

    #[test]
    fn fps_from_average() {
        let mut h = FrameHistory::new(4);
        assert_eq!(h.fps(), 0.0);
        h.record(Duration::from_millis(20));
        assert!((h.fps() - 50.0).abs() < 1e-6);
    }
}
