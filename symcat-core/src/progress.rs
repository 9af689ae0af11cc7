//! Progress callbacks for multi-file runs.
//!
//! Counters live in the run's summary value; sinks only display them.

/// Progress callback for per-symbol or per-file batches.
pub trait ProgressSink {
    /// Called after item `index` (zero-based) of `total` finishes.
    fn on_complete(&self, label: &str, index: usize, total: usize, result: &Result<(), String>);

    /// Called once when the whole batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Completion percentage after `index` of `total` items.
pub fn percent_done(index: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        100.0 * (index + 1) as f64 / total as f64
    }
}

/// Prints progress to stdout and failures to stderr.
pub struct StdoutProgress;

impl ProgressSink for StdoutProgress {
    fn on_complete(&self, label: &str, index: usize, total: usize, result: &Result<(), String>) {
        if let Err(reason) = result {
            eprintln!("Error reading data files for {label}: {reason}");
        }
        println!("  Progress - {:5.1}%", percent_done(index, total));
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("Done: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Discards all progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_complete(&self, _: &str, _: usize, _: usize, _: &Result<(), String>) {}

    fn on_batch_complete(&self, _: usize, _: usize, _: usize) {}
}
