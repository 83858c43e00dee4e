//! Sliding-window maximum of interframe packet arrival gaps.

use std::time::{Duration, Instant};

use tracing::trace;

/// Tracks the worst-case gap between packet arrivals over a sliding window.
///
/// Gaps are accumulated into coarse intervals of `gap_interval_samples` gaps
/// each; the window maximum is the max over the last
/// `gap_window_intervals` completed intervals. Coarse intervals damp
/// transient spikes and yield a stable worst-case figure for jitter-buffer
/// sizing.
///
/// The measurement clock is monotonic (microseconds since the tracker was
/// created), so wall-clock jumps cannot skew reported gaps. The window
/// maximum is telemetry: the mixer surfaces it once per completed interval
/// and takes no action on it.
#[derive(Debug)]
pub struct InterframeGapHistory {
    epoch: Instant,
    last_arrival_us: Option<u64>,
    current_interval_max_us: u64,
    gaps_in_current_interval: u32,
    interval_max_us: Vec<u64>,
    newest_interval: usize,
    window_max_us: u64,
    new_window_available: bool,
    gaps_per_interval: u32,
}

impl InterframeGapHistory {
    /// Creates a tracker accumulating `gaps_per_interval` gaps per interval
    /// over a window of `window_intervals` intervals.
    pub fn new(gaps_per_interval: u32, window_intervals: usize) -> Self {
        Self {
            epoch: Instant::now(),
            last_arrival_us: None,
            current_interval_max_us: 0,
            gaps_in_current_interval: 0,
            interval_max_us: vec![0; window_intervals],
            newest_interval: 0,
            window_max_us: 0,
            new_window_available: false,
            gaps_per_interval,
        }
    }

    /// Records a packet arrival at the current monotonic time.
    pub fn frame_received(&mut self) {
        let now_us = self.epoch.elapsed().as_micros() as u64;
        self.record_arrival(now_us);
    }

    /// Records an arrival at an explicit microsecond timestamp.
    ///
    /// Timestamps must be non-decreasing. This is the deterministic entry
    /// point used when replaying captured arrival times.
    pub fn record_arrival(&mut self, now_us: u64) {
        // The first arrival only anchors the clock; there is no gap yet.
        if let Some(last_us) = self.last_arrival_us {
            let gap = now_us.saturating_sub(last_us);
            trace!(gap_us = gap, "interframe gap");

            if gap > self.current_interval_max_us {
                self.current_interval_max_us = gap;
            }
            self.gaps_in_current_interval += 1;

            if self.gaps_in_current_interval == self.gaps_per_interval {
                self.newest_interval = (self.newest_interval + 1) % self.interval_max_us.len();
                self.interval_max_us[self.newest_interval] = self.current_interval_max_us;

                self.window_max_us = self.interval_max_us.iter().copied().max().unwrap_or(0);
                self.new_window_available = true;

                self.gaps_in_current_interval = 0;
                self.current_interval_max_us = 0;
            }
        }
        self.last_arrival_us = Some(now_us);
    }

    /// True when a new window maximum has been computed since the last
    /// [`drain_window_max`](Self::drain_window_max).
    pub fn has_new_window_max(&self) -> bool {
        self.new_window_available
    }

    /// Returns the last fully-computed window maximum and clears the
    /// new-result flag.
    pub fn drain_window_max(&mut self) -> Duration {
        self.new_window_available = false;
        Duration::from_micros(self.window_max_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_arrival_records_no_gap() {
        let mut history = InterframeGapHistory::new(1, 4);
        history.record_arrival(1000);
        assert!(!history.has_new_window_max());
    }

    #[test]
    fn test_interval_completion() {
        let mut history = InterframeGapHistory::new(2, 4);

        history.record_arrival(0);
        history.record_arrival(100); // gap 100
        assert!(!history.has_new_window_max());

        history.record_arrival(400); // gap 300 - interval of 2 complete
        assert!(history.has_new_window_max());
        assert_eq!(history.drain_window_max(), Duration::from_micros(300));
        assert!(!history.has_new_window_max());
    }

    #[test]
    fn test_growing_gap_sequence() {
        // Gaps 100, 200, ..., 600us with two gaps per interval and a
        // three-interval window: interval maxes are 200, 400, 600.
        let mut history = InterframeGapHistory::new(2, 3);

        let mut now = 0u64;
        history.record_arrival(now);
        for gap in [100u64, 200, 300, 400, 500, 600] {
            now += gap;
            history.record_arrival(now);
        }

        assert!(history.has_new_window_max());
        assert_eq!(history.drain_window_max(), Duration::from_micros(600));
    }

    #[test]
    fn test_window_max_spans_stored_intervals() {
        let mut history = InterframeGapHistory::new(1, 3);

        history.record_arrival(0);
        history.record_arrival(500); // interval max 500
        history.record_arrival(600); // interval max 100
        history.record_arrival(700); // interval max 100

        assert_eq!(history.drain_window_max(), Duration::from_micros(500));

        // A fourth interval overwrites the oldest slot, pushing the 500us
        // gap out of the window.
        history.record_arrival(800);
        assert_eq!(history.drain_window_max(), Duration::from_micros(100));
    }

    #[test]
    fn test_drain_clears_flag_but_keeps_value() {
        let mut history = InterframeGapHistory::new(1, 4);
        history.record_arrival(0);
        history.record_arrival(250);

        assert_eq!(history.drain_window_max(), Duration::from_micros(250));
        // Draining again returns the same maximum without a fresh flag.
        assert!(!history.has_new_window_max());
        assert_eq!(history.drain_window_max(), Duration::from_micros(250));
    }
}
