//! Single-pass range scan with outlier rejection.
//!
//! One forward pass over a delimited file yields the first and last valid
//! timestamps. Rows that fail to parse are skipped. A single price step
//! larger than the garbage threshold (in either direction) rejects the whole
//! file.
//!
//! `end` is the timestamp of the last row that parsed, not the maximum.

use crate::cancel::CancelToken;
use crate::data::schema::{cell, HeaderIndex};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Largest allowed single-step price ratio.
pub const GARBAGE_THRESHOLD: f64 = 5.0;

/// Timestamps above this are milliseconds.
pub const MILLIS_CUTOFF: i64 = 10_000_000_000;

pub const DEFAULT_TIME_COLUMN: &str = "Unix Timestamp";
pub const DEFAULT_PRICE_COLUMN: &str = "Close";

/// Column names and limits for a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub time_column: String,
    /// Without a price column the outlier rule is skipped.
    pub price_column: Option<String>,
    pub garbage_threshold: f64,
    pub millis_cutoff: i64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            price_column: Some(DEFAULT_PRICE_COLUMN.to_string()),
            garbage_threshold: GARBAGE_THRESHOLD,
            millis_cutoff: MILLIS_CUTOFF,
        }
    }
}

/// Downscale a millisecond timestamp to seconds; seconds pass through.
pub fn normalize_timestamp(raw: i64, millis_cutoff: i64) -> i64 {
    if raw > millis_cutoff {
        raw / 1000
    } else {
        raw
    }
}

/// First and last valid timestamps of a file, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

/// Why a file produced no usable range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("unreadable: {0}")]
    Unreadable(String),

    #[error("empty file")]
    EmptyFile,

    #[error("missing time column '{column}' (header: {header})")]
    MissingTimeColumn { column: String, header: String },

    #[error("no row with a valid timestamp")]
    NoValidTimestamp,

    #[error("no valid timestamp after the start row at {start}")]
    NoEndTimestamp { start: i64 },

    #[error("price jump at line {line}: {previous} -> {price}")]
    Outlier {
        line: usize,
        previous: f64,
        price: f64,
    },
}

/// Result of scanning one file.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Valid(TimeRange),
    Rejected(Rejection),
}

impl ScanOutcome {
    pub fn range(&self) -> Option<TimeRange> {
        match self {
            ScanOutcome::Valid(range) => Some(*range),
            ScanOutcome::Rejected(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ScanOutcome::Valid(_))
    }
}

/// Scan failures that are not a property of the data.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan cancelled")]
    Cancelled,
}

/// Consecutive-price check. Holds the last admitted price.
#[derive(Debug, Clone)]
pub struct OutlierGuard {
    threshold: f64,
    last: Option<f64>,
}

impl OutlierGuard {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last: None,
        }
    }

    /// Admit `price`, or return the previous price it jumped away from.
    pub fn admit(&mut self, price: f64) -> Result<(), f64> {
        if let Some(last) = self.last {
            if price > self.threshold * last || price * self.threshold < last {
                return Err(last);
            }
        }
        self.last = Some(price);
        Ok(())
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

/// Start/end bookkeeping for the time column.
#[derive(Debug, Clone, Default)]
pub struct RangeTracker {
    start: Option<i64>,
    end: Option<i64>,
}

impl RangeTracker {
    /// Record a normalized timestamp. The first sets `start`; every later
    /// one overwrites `end`.
    pub fn observe(&mut self, seconds: i64) {
        if self.start.is_none() {
            self.start = Some(seconds);
        } else {
            self.end = Some(seconds);
        }
    }

    pub fn start(&self) -> Option<i64> {
        self.start
    }

    /// `None` until both a start row and a later end row were seen.
    pub fn range(&self) -> Option<TimeRange> {
        Some(TimeRange {
            start: self.start?,
            end: self.end?,
        })
    }
}

/// Streams a file once and reports its valid range.
pub struct StreamScanner<'a> {
    settings: &'a ScanSettings,
    cancel: &'a CancelToken,
}

impl<'a> StreamScanner<'a> {
    pub fn new(settings: &'a ScanSettings, cancel: &'a CancelToken) -> Self {
        Self { settings, cancel }
    }

    pub fn settings(&self) -> &ScanSettings {
        self.settings
    }

    /// Scan a file by path. A file that cannot be opened is a rejection,
    /// not an error: the caller moves on to the next candidate.
    pub fn scan_path(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
        match File::open(path) {
            Ok(file) => self.scan_reader(BufReader::new(file)),
            Err(e) => Ok(ScanOutcome::Rejected(Rejection::Unreadable(format!(
                "open {}: {e}",
                path.display()
            )))),
        }
    }

    pub fn scan_reader<R: BufRead>(&self, reader: R) -> Result<ScanOutcome, ScanError> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            None => return Ok(ScanOutcome::Rejected(Rejection::EmptyFile)),
            Some(Err(e)) => return Ok(ScanOutcome::Rejected(Rejection::Unreadable(e.to_string()))),
            Some(Ok(line)) => HeaderIndex::parse(&line),
        };

        let Some(time_col) = header.position(&self.settings.time_column) else {
            return Ok(ScanOutcome::Rejected(Rejection::MissingTimeColumn {
                column: self.settings.time_column.clone(),
                header: header.columns().join(","),
            }));
        };
        let price_col = self
            .settings
            .price_column
            .as_deref()
            .and_then(|name| header.position(name));

        let mut range = RangeTracker::default();
        let mut guard = OutlierGuard::new(self.settings.garbage_threshold);

        for (offset, line) in lines.enumerate() {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Ok(ScanOutcome::Rejected(Rejection::Unreadable(e.to_string())))
                }
            };

            if let Some(raw) = cell(&line, time_col).and_then(parse_timestamp) {
                range.observe(normalize_timestamp(raw, self.settings.millis_cutoff));
            }

            if let Some(price) = price_col.and_then(|c| cell(&line, c)).and_then(parse_price) {
                if let Err(previous) = guard.admit(price) {
                    return Ok(ScanOutcome::Rejected(Rejection::Outlier {
                        // header is line 1
                        line: offset + 2,
                        previous,
                        price,
                    }));
                }
            }
        }

        Ok(match (range.range(), range.start()) {
            (Some(r), _) => ScanOutcome::Valid(r),
            (None, Some(start)) => ScanOutcome::Rejected(Rejection::NoEndTimestamp { start }),
            (None, None) => ScanOutcome::Rejected(Rejection::NoValidTimestamp),
        })
    }
}

fn parse_timestamp(cell: &str) -> Option<i64> {
    cell.trim().parse().ok()
}

fn parse_price(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}
