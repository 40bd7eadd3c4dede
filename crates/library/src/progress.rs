//! Shared run counters.

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use trawl_extract::models::Status;

/// Which counter a finished task lands in.
///
/// A partial result is a failure to extract everything, and is counted
/// with the errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
    Skipped,
}

impl From<Status> for Outcome {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => Outcome::Succeeded,
            Status::Partial | Status::Error => Outcome::Failed,
            Status::Skipped => Outcome::Skipped,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    processed: u64,
    succeeded: u64,
    failed: u64,
    skipped: u64,
    current_file: String,
}

/// Mutex-guarded counters, safe to update from any worker.
///
/// Every update changes `processed` and exactly one outcome counter under
/// the same lock, so `processed == succeeded + failed + skipped` holds in
/// every snapshot.
#[derive(Debug)]
pub struct ProgressTracker {
    counters: Mutex<Counters>,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self { counters: Mutex::new(Counters { total, ..Counters::default() }), started: Instant::now() }
    }

    /// Grow the expected total, e.g. when an archive adds members.
    pub fn add_total(&self, count: u64) {
        self.with(|counters| counters.total += count);
    }

    pub fn update(&self, outcome: Outcome, file_name: impl Into<String>) -> ProgressSnapshot {
        let file_name = file_name.into();
        let elapsed = self.started.elapsed();
        self.with(|counters| {
            counters.processed += 1;
            match outcome {
                Outcome::Succeeded => counters.succeeded += 1,
                Outcome::Failed => counters.failed += 1,
                Outcome::Skipped => counters.skipped += 1,
            }
            counters.current_file = file_name;
            ProgressSnapshot::new(counters, elapsed)
        })
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let elapsed = self.started.elapsed();
        self.with(|counters| ProgressSnapshot::new(counters, elapsed))
    }

    fn with<T>(&self, f: impl FnOnce(&mut Counters) -> T) -> T {
        // A panic while holding the lock cannot leave the counters half
        // updated, so a poisoned lock is still usable.
        let mut guard = self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

/// A consistent, immutable copy of the counters at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    /// 0 to 100; 0 when nothing is expected yet.
    pub percent: f64,
    pub elapsed: Duration,
    /// Files per second.
    pub throughput: f64,
    /// `None` until throughput is known.
    pub eta: Option<Duration>,
    pub current_file: String,
}

impl ProgressSnapshot {
    fn new(counters: &Counters, elapsed: Duration) -> Self {
        let percent = match counters.total {
            0 => 0.0,
            total => counters.processed as f64 / total as f64 * 100.0,
        };
        let seconds = elapsed.as_secs_f64();
        let throughput = match seconds > 0.0 {
            true => counters.processed as f64 / seconds,
            false => 0.0,
        };
        let eta = match throughput > 0.0 {
            true => {
                let remaining = counters.total.saturating_sub(counters.processed) as f64;
                Some(Duration::from_secs_f64(remaining / throughput))
            },
            false => None,
        };
        Self {
            total: counters.total,
            processed: counters.processed,
            succeeded: counters.succeeded,
            failed: counters.failed,
            skipped: counters.skipped,
            percent,
            elapsed,
            throughput,
            eta,
            current_file: counters.current_file.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

fn clock(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{}:{:02}:{:02}", seconds / 3600, seconds / 60 % 60, seconds % 60)
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.1}%) ok {} failed {} skipped {} | {:.2} files/s | elapsed {} | eta {}",
            self.processed,
            self.total,
            self.percent,
            self.succeeded,
            self.failed,
            self.skipped,
            self.throughput,
            clock(self.elapsed),
            self.eta.map(clock).unwrap_or_else(|| "unknown".to_string()),
        )
    }
}
