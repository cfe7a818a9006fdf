//! Progress reporters for the crawl stages.
//!
//! Reporting is cosmetic: ticks cannot fail and never feed back into the
//! pipeline.

use crate::traits::{ProgressReporter, ProgressTick};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _label: &str, _total: usize) -> Box<dyn ProgressTick> {
        Box::new(NoProgress)
    }
}

impl ProgressTick for NoProgress {
    fn tick(&self) {}
}

/// Reports progress through `tracing`: every tick at `debug`, a summary at
/// `info` when the stage finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn start(&self, label: &str, total: usize) -> Box<dyn ProgressTick> {
        info!(stage = label, total, "{}..", label);
        Box::new(LogTick {
            label: label.to_string(),
            total,
            current: AtomicUsize::new(0),
            started: Instant::now(),
        })
    }
}

struct LogTick {
    label: String,
    total: usize,
    current: AtomicUsize,
    started: Instant,
}

impl ProgressTick for LogTick {
    fn tick(&self) {
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        let percent = if self.total == 0 {
            100
        } else {
            current * 100 / self.total
        };
        debug!(
            stage = %self.label,
            current,
            total = self.total,
            percent,
            "progress"
        );
    }

    fn finish(&self) {
        info!(
            stage = %self.label,
            completed = self.current.load(Ordering::Relaxed),
            total = self.total,
            duration_ms = self.started.elapsed().as_millis() as u64,
            "Stage progress complete"
        );
    }
}

/// Counts ticks per stage label. Handy for asserting on progress in tests and
/// for callers that want totals without any output.
#[derive(Debug, Clone, Default)]
pub struct CountingProgress {
    counts: Arc<std::sync::Mutex<Vec<(String, Arc<AtomicUsize>)>>>,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks recorded for `label`, summed over every stage started with it.
    pub fn ticks(&self, label: &str) -> usize {
        match self.counts.lock() {
            Ok(counts) => counts
                .iter()
                .filter(|(l, _)| l == label)
                .map(|(_, c)| c.load(Ordering::SeqCst))
                .sum(),
            Err(_) => 0,
        }
    }
}

impl ProgressReporter for CountingProgress {
    fn start(&self, label: &str, _total: usize) -> Box<dyn ProgressTick> {
        let counter = Arc::new(AtomicUsize::new(0));
        if let Ok(mut counts) = self.counts.lock() {
            counts.push((label.to_string(), counter.clone()));
        }
        Box::new(CountingTick(counter))
    }
}

struct CountingTick(Arc<AtomicUsize>);

impl ProgressTick for CountingTick {
    fn tick(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
