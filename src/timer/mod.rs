//! Elapsed-time stopwatch
//!
//! Wall-clock stopwatch with minute:second presentation semantics,
//! decoupled from the transfer engine. While running, a periodic tick task
//! recomputes the elapsed whole seconds from the start origin and pushes
//! zero-padded display values to the caller's channel.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Cadence of display refreshes while the timer is running
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Zero-padded two-digit minute/second display values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerTick {
    pub minutes: String,
    pub seconds: String,
}

impl TimerTick {
    fn from_elapsed(elapsed: Duration) -> Self {
        let total_secs = elapsed.as_secs();
        let (minutes, seconds) = (total_secs / 60, total_secs % 60);

        Self {
            minutes: format!("{:02}", minutes),
            seconds: format!("{:02}", seconds),
        }
    }

    fn zero() -> Self {
        Self::from_elapsed(Duration::ZERO)
    }
}

/// Stopwatch pushing display ticks into a caller-owned channel
///
/// The start origin is set at most once per run cycle: `start()` while
/// already started continues from the existing origin, and only `reset()`
/// clears it. `pause()` stops the ticks but preserves the origin, so a
/// later `start()` resumes against full wall time.
pub struct ElapsedTimer {
    started_at: Option<Instant>,
    tick_task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<TimerTick>,
}

impl ElapsedTimer {
    pub fn new(tx: mpsc::UnboundedSender<TimerTick>) -> Self {
        Self {
            started_at: None,
            tick_task: None,
            tx,
        }
    }

    /// Begin (or resume) pushing ticks; never rebases an existing origin
    pub fn start(&mut self) {
        let origin = *self.started_at.get_or_insert_with(Instant::now);

        if self.tick_task.is_some() {
            return;
        }

        let tx = self.tx.clone();
        self.tick_task = Some(tokio::spawn(async move {
            let mut ticker = interval(TICK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if tx.send(TimerTick::from_elapsed(origin.elapsed())).is_err() {
                    // Receiver dropped; nobody is displaying anymore
                    break;
                }
            }
        }));
    }

    /// Stop the ticks, preserving the start origin
    pub fn pause(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
    }

    /// Stop the ticks, clear the origin, and push the zero display
    pub fn reset(&mut self) {
        self.pause();
        self.started_at = None;
        let _ = self.tx.send(TimerTick::zero());
    }

    /// Whether the tick task is live
    pub fn is_running(&self) -> bool {
        self.tick_task.is_some()
    }

    /// Wall time since the start origin, zero when unset
    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|s| s.elapsed()).unwrap_or_default()
    }
}

impl Drop for ElapsedTimer {
    fn drop(&mut self) {
        self.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_formats_divmod_sixty() {
        let tick = TimerTick::from_elapsed(Duration::from_secs(90));
        assert_eq!(tick.minutes, "01");
        assert_eq!(tick.seconds, "30");

        let tick = TimerTick::from_elapsed(Duration::from_secs(7));
        assert_eq!(tick.minutes, "00");
        assert_eq!(tick.seconds, "07");

        // Minutes keep growing past the hour; there is no hour field
        let tick = TimerTick::from_elapsed(Duration::from_secs(3600));
        assert_eq!(tick.minutes, "60");
        assert_eq!(tick.seconds, "00");
    }

    #[test]
    fn test_subsecond_elapsed_floors_to_zero() {
        let tick = TimerTick::from_elapsed(Duration::from_millis(999));
        assert_eq!(tick.minutes, "00");
        assert_eq!(tick.seconds, "00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_then_start_counts_from_zero_non_decreasing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = ElapsedTimer::new(tx);

        timer.reset();
        assert_eq!(rx.recv().await.unwrap(), TimerTick::zero());

        timer.start();

        let mut last_secs = 0u64;
        for i in 0..30 {
            let tick = rx.recv().await.unwrap();
            let secs: u64 = tick.seconds.parse().unwrap();

            if i == 0 {
                assert_eq!(secs, 0);
            }
            assert!(secs >= last_secs);
            last_secs = secs;
        }

        // 30 ticks at 50ms cadence crossed the one-second boundary
        assert_eq!(last_secs, 1);

        timer.pause();
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent_for_origin() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timer = ElapsedTimer::new(tx);

        timer.start();
        tokio::time::advance(Duration::from_millis(120)).await;
        timer.start();

        assert!(timer.elapsed() >= Duration::from_millis(120));
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_preserves_origin_for_resume() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timer = ElapsedTimer::new(tx);

        timer.start();
        tokio::time::advance(Duration::from_millis(300)).await;
        timer.pause();

        // The gap while paused still counts against the preserved origin
        tokio::time::advance(Duration::from_millis(500)).await;
        timer.start();

        assert!(timer.elapsed() >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_origin() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = ElapsedTimer::new(tx);

        timer.start();
        tokio::time::advance(Duration::from_secs(5)).await;
        timer.reset();

        assert_eq!(timer.elapsed(), Duration::ZERO);
        assert!(!timer.is_running());

        // Drain to the reset push; it must be the zero display
        let mut last = None;
        while let Ok(tick) = rx.try_recv() {
            last = Some(tick);
        }
        assert_eq!(last.unwrap(), TimerTick::zero());
    }
}
