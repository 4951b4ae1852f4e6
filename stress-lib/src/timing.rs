use std::{sync::OnceLock, time::Duration};

use parking_lot::Mutex;
use tokio::time::Instant;

/// Start and stop instants of a single benchmark operation.
///
/// Each instant can be set only once; later marks return the
/// instant that was recorded first.
#[derive(Debug)]
pub struct BenchmarkRun {
    node_count: usize,
    start: OnceLock<Instant>,
    end: OnceLock<Instant>,
}

impl BenchmarkRun {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            start: OnceLock::new(),
            end: OnceLock::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn mark_start(&self) -> Instant {
        *self.start.get_or_init(Instant::now)
    }

    pub fn mark_end(&self) -> Instant {
        *self.end.get_or_init(Instant::now)
    }

    /// `None` until both instants are recorded.
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.start.get()?;
        let end = self.end.get()?;
        Some(end.saturating_duration_since(*start))
    }
}

/// Keeps the elapsed time of the most recently completed operation.
#[derive(Debug, Default)]
pub struct TimingRecorder {
    last: Mutex<Option<Duration>>,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the elapsed time of a finished run; unfinished runs are ignored.
    pub fn record(&self, run: &BenchmarkRun) -> Option<Duration> {
        let elapsed = run.elapsed()?;
        *self.last.lock() = Some(elapsed);
        Some(elapsed)
    }

    /// Elapsed time of the last completed operation, if any completed yet.
    pub fn elapsed(&self) -> Option<Duration> {
        *self.last.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elapsed_requires_both_marks() {
        tokio::time::pause();

        let run = BenchmarkRun::new(1);
        assert!(run.elapsed().is_none());

        run.mark_start();
        assert!(run.elapsed().is_none());

        tokio::time::advance(Duration::from_millis(250)).await;
        run.mark_end();
        assert_eq!(run.elapsed(), Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn marks_are_set_once() {
        tokio::time::pause();

        let run = BenchmarkRun::new(2);
        let first = run.mark_start();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(run.mark_start(), first);

        run.mark_end();
        let elapsed = run.elapsed().unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        run.mark_end();
        assert_eq!(run.elapsed().unwrap(), elapsed);
    }

    #[tokio::test]
    async fn recorder_keeps_last_completed_run() {
        tokio::time::pause();

        let recorder = TimingRecorder::new();
        assert!(recorder.elapsed().is_none());

        let unfinished = BenchmarkRun::new(1);
        unfinished.mark_start();
        assert!(recorder.record(&unfinished).is_none());
        assert!(recorder.elapsed().is_none());

        let run = BenchmarkRun::new(1);
        run.mark_start();
        tokio::time::advance(Duration::from_millis(10)).await;
        run.mark_end();
        assert_eq!(recorder.record(&run), Some(Duration::from_millis(10)));
        assert_eq!(recorder.elapsed(), Some(Duration::from_millis(10)));
    }
}
