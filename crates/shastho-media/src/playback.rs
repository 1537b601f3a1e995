//! Gapless playback scheduling for inbound audio.

use std::time::Instant;

use crate::pcm::PcmBuffer;

/// Monotonic output clock, in seconds.
///
/// Abstracted so the scheduler can be driven by a fake clock in tests.
pub trait OutputClock: Send {
    fn now(&self) -> f64;
}

/// Wall clock measured from construction.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputClock for SystemClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// A decoded chunk with its committed start time on the output clock.
#[derive(Debug, Clone)]
pub struct ScheduledChunk {
    pub buffer: PcmBuffer,
    pub start_at: f64,
}

/// Assigns start times to inbound chunks so they play back-to-back.
///
/// Invariant: each chunk starts at `max(clock.now(), cursor)` and the cursor
/// advances by the chunk's duration, so in-order arrivals are gapless and
/// non-overlapping regardless of network jitter. An interruption resets the
/// cursor to the current clock time; chunks already handed out keep their
/// committed start times.
pub struct PlaybackScheduler {
    clock: Box<dyn OutputClock>,
    cursor: f64,
}

impl PlaybackScheduler {
    /// Create a scheduler whose cursor starts at the current clock time
    /// (session-open time).
    pub fn new(clock: Box<dyn OutputClock>) -> Self {
        let cursor = clock.now();
        Self { clock, cursor }
    }

    /// Commit a start time for the next chunk and advance the cursor.
    pub fn schedule(&mut self, buffer: PcmBuffer) -> ScheduledChunk {
        let now = self.clock.now();
        if self.cursor < now {
            self.cursor = now;
        }
        let start_at = self.cursor;
        self.cursor += buffer.duration();
        ScheduledChunk { buffer, start_at }
    }

    /// Discard the remaining schedule after a user interruption. New audio
    /// starts at the current clock time instead of waiting out stale output.
    pub fn interrupt(&mut self) {
        self.cursor = self.clock.now();
    }

    /// Next scheduled start time.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<f64>>);

    impl ManualClock {
        fn new(t: f64) -> Self {
            Self(Arc::new(Mutex::new(t)))
        }

        fn set(&self, t: f64) {
            *self.0.lock().unwrap() = t;
        }
    }

    impl OutputClock for ManualClock {
        fn now(&self) -> f64 {
            *self.0.lock().unwrap()
        }
    }

    fn chunk(duration_secs: f64) -> PcmBuffer {
        let samples = (duration_secs * 24_000.0).round() as usize;
        PcmBuffer {
            samples: vec![0.0; samples],
            sample_rate: 24_000,
        }
    }

    #[test]
    fn test_in_order_chunks_are_gapless() {
        let clock = ManualClock::new(10.0);
        let mut scheduler = PlaybackScheduler::new(Box::new(clock.clone()));

        let c1 = scheduler.schedule(chunk(0.5));
        let c2 = scheduler.schedule(chunk(0.25));
        let c3 = scheduler.schedule(chunk(1.0));

        assert!(c1.start_at >= 10.0);
        assert!((c2.start_at - (c1.start_at + 0.5)).abs() < 1e-9);
        assert!((c3.start_at - (c1.start_at + 0.75)).abs() < 1e-9);
    }

    #[test]
    fn test_late_arrival_never_schedules_in_the_past() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = PlaybackScheduler::new(Box::new(clock.clone()));

        let c1 = scheduler.schedule(chunk(0.1));
        assert!((c1.start_at - 0.0).abs() < 1e-9);

        // Network stall: clock runs past the cursor before the next chunk.
        clock.set(5.0);
        let c2 = scheduler.schedule(chunk(0.1));
        assert!((c2.start_at - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_interrupt_resets_cursor_to_clock() {
        let clock = ManualClock::new(0.0);
        let mut scheduler = PlaybackScheduler::new(Box::new(clock.clone()));

        scheduler.schedule(chunk(1.0));
        scheduler.schedule(chunk(1.0));
        assert!((scheduler.cursor() - 2.0).abs() < 1e-9);

        clock.set(0.5);
        scheduler.interrupt();

        let c3 = scheduler.schedule(chunk(1.0));
        assert!((c3.start_at - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cursor_starts_at_open_time() {
        let clock = ManualClock::new(42.0);
        let scheduler = PlaybackScheduler::new(Box::new(clock));
        assert!((scheduler.cursor() - 42.0).abs() < 1e-9);
    }
}
