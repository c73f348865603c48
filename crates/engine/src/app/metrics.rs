use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub frame_time_ms: f32,
    pub inputs_per_sec: f32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    inputs: u32,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            frames: 0,
            inputs: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_input(&mut self) {
        self.inputs = self.inputs.saturating_add(1);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            frame_time_ms,
            inputs_per_sec: self.inputs as f32 / elapsed_seconds,
        };

        self.interval_start = now;
        self.frames = 0;
        self.inputs = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_expected_values() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();

        accumulator.record_frame(Duration::from_millis(16));
        accumulator.record_frame(Duration::from_millis(16));
        for _ in 0..4 {
            accumulator.record_input();
        }

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.inputs_per_sec - 4.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.001);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();
        accumulator.record_frame(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn counters_reset_after_snapshot() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_millis(10));
        let base = Instant::now();
        accumulator.record_frame(Duration::from_millis(5));
        accumulator.record_input();
        accumulator
            .maybe_snapshot(base + Duration::from_millis(20))
            .expect("first");

        let second = accumulator
            .maybe_snapshot(base + Duration::from_millis(40))
            .expect("second");
        assert_eq!(second.fps, 0.0);
        assert_eq!(second.frame_time_ms, 0.0);
        assert_eq!(second.inputs_per_sec, 0.0);
    }
}
