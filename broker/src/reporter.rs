use log::info;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Cumulative counters of a broker since it started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BrokerStats {
    pub requests: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub min_batch_size: usize,
    pub max_batch_size: usize,
}

pub struct Reporter {
    requests: AtomicUsize,
    batches: AtomicUsize,
    failed_batches: AtomicUsize,
    min_batch_size: AtomicUsize,
    max_batch_size: AtomicUsize,
    window: ReporterWindow,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            requests: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
            failed_batches: AtomicUsize::new(0),
            min_batch_size: AtomicUsize::new(usize::MAX),
            max_batch_size: AtomicUsize::new(0),
            window: ReporterWindow::new(),
        }
    }

    pub fn set_batch(&self, batch_size: usize, failed: bool) {
        self.requests.fetch_add(batch_size, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.min_batch_size.fetch_min(batch_size, Ordering::Relaxed);
        self.max_batch_size.fetch_max(batch_size, Ordering::Relaxed);

        if failed {
            self.failed_batches.fetch_add(1, Ordering::Relaxed);
        }

        self.window.set_batch(batch_size);
    }

    pub fn stats(&self) -> BrokerStats {
        let batches = self.batches.load(Ordering::Relaxed);

        BrokerStats {
            requests: self.requests.load(Ordering::Relaxed),
            batches,
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            min_batch_size: if batches == 0 {
                0
            } else {
                self.min_batch_size.load(Ordering::Relaxed)
            },
            max_batch_size: self.max_batch_size.load(Ordering::Relaxed),
        }
    }

    /// Logs throughput if the reporting interval has elapsed since the previous report.
    pub fn maybe_report(&self) {
        self.window.maybe_report();
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

struct ReporterWindow {
    started: Mutex<Instant>,
    num_nodes_analysed: AtomicUsize,
    min_batch_size: AtomicUsize,
    max_batch_size: AtomicUsize,
}

impl ReporterWindow {
    fn new() -> Self {
        Self {
            started: Mutex::new(Instant::now()),
            num_nodes_analysed: AtomicUsize::new(0),
            min_batch_size: AtomicUsize::new(usize::MAX),
            max_batch_size: AtomicUsize::new(0),
        }
    }

    fn set_batch(&self, batch_size: usize) {
        self.num_nodes_analysed
            .fetch_add(batch_size, Ordering::Relaxed);
        self.min_batch_size.fetch_min(batch_size, Ordering::Relaxed);
        self.max_batch_size.fetch_max(batch_size, Ordering::Relaxed);
    }

    fn maybe_report(&self) {
        let elapsed = {
            let mut started = self.started.lock();
            let elapsed = started.elapsed();
            if elapsed < REPORT_INTERVAL {
                return;
            }
            *started = Instant::now();
            elapsed
        };

        let num_nodes = self.num_nodes_analysed.swap(0, Ordering::Relaxed);
        let min_batch_size = self.min_batch_size.swap(usize::MAX, Ordering::Relaxed);
        let max_batch_size = self.max_batch_size.swap(0, Ordering::Relaxed);
        let nps = num_nodes as f32 / elapsed.as_secs_f32();

        if num_nodes > 0 {
            info!(
                "Evaluated NPS: {nps:.2}, Min Batch Size: {min_batch_size}, Max Batch Size: {max_batch_size}",
                nps = nps,
                min_batch_size = min_batch_size,
                max_batch_size = max_batch_size
            );
        }
    }
}
