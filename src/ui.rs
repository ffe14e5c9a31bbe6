// UI overlay hooks
//
// The overlay brackets the layers' UI hooks each rendered frame. It owns its
// own state and never sees the renderer's command buffers.

use std::time::{Duration, Instant};

use crate::window::Window;

pub trait UiOverlay {
    fn begin(&mut self);
    fn end(&mut self, window: &mut dyn Window);
}

/// Frame-rate figures for one reporting interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub fps: f32,
    pub frame_time_ms: f32,
}

/// Counts frames and produces stats once per interval
#[derive(Debug)]
pub struct FrameStatsCounter {
    interval: Duration,
    frame_count: u32,
    last_frame: Instant,
    last_report: Instant,
}

impl FrameStatsCounter {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            frame_count: 0,
            last_frame: now,
            last_report: now,
        }
    }

    /// Record a frame finished at `now`. Returns stats when the interval elapsed.
    pub fn record(&mut self, now: Instant) -> Option<FrameStats> {
        let frame_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;

        let elapsed = now.duration_since(self.last_report);
        if elapsed < self.interval {
            return None;
        }

        let stats = FrameStats {
            fps: self.frame_count as f32 / elapsed.as_secs_f32(),
            frame_time_ms: frame_time * 1000.0,
        };
        self.frame_count = 0;
        self.last_report = now;
        Some(stats)
    }
}

/// Shows FPS and frame time in the window title, refreshed every second
pub struct FrameStatsOverlay {
    base_title: String,
    counter: FrameStatsCounter,
}

impl FrameStatsOverlay {
    pub fn new(base_title: impl Into<String>) -> Self {
        Self {
            base_title: base_title.into(),
            counter: FrameStatsCounter::new(Duration::from_secs(1), Instant::now()),
        }
    }
}

impl UiOverlay for FrameStatsOverlay {
    fn begin(&mut self) {}

    fn end(&mut self, window: &mut dyn Window) {
        if let Some(stats) = self.counter.record(Instant::now()) {
            window.set_title(&format!(
                "{} - {:.0} FPS ({:.2}ms)",
                self.base_title, stats.fps, stats.frame_time_ms
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_interval() {
        let start = Instant::now();
        let mut counter = FrameStatsCounter::new(Duration::from_secs(1), start);

        for i in 1..10 {
            let now = start + Duration::from_millis(100 * i);
            assert_eq!(counter.record(now), None);
        }

        let stats = counter.record(start + Duration::from_secs(1)).unwrap();
        assert!((stats.fps - 10.0).abs() < 1e-3);
        assert!((stats.frame_time_ms - 100.0).abs() < 1e-3);

        // Counting restarts after a report
        assert_eq!(counter.record(start + Duration::from_millis(1500)), None);
    }
}
