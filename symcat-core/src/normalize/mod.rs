//! In-place column normalization.
//!
//! Each file is streamed into a sibling `<name><temp_suffix>` file which is
//! renamed over the original only once fully written. An interrupted run
//! leaves the original intact.

pub mod rewrite;

pub use rewrite::{coerce_float, coerce_int, format_float, RewrittenRow, RowRewriter};

use crate::cancel::CancelToken;
use crate::data::schema::HeaderIndex;
use crate::progress::ProgressSink;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_TEMP_SUFFIX: &str = ".in-progress";

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("normalization cancelled")]
    Cancelled,
}

/// Which columns to coerce and how to name the temporary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeSettings {
    pub int_columns: Vec<String>,
    pub float_columns: Vec<String>,
    pub temp_suffix: String,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            int_columns: vec!["Unix Timestamp".into()],
            float_columns: ["Open", "High", "Low", "Close", "Volume"]
                .into_iter()
                .map(String::from)
                .collect(),
            temp_suffix: DEFAULT_TEMP_SUFFIX.into(),
        }
    }
}

/// Outcome of normalizing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Data rows, excluding the header.
    pub rows: usize,
    pub cells_rewritten: usize,
    /// The file had no header line and was left alone.
    pub skipped_empty: bool,
}

/// Totals for a batch of files.
#[derive(Debug, Default)]
pub struct NormalizeSummary {
    pub total: usize,
    pub reports: Vec<FileReport>,
    pub failures: Vec<(PathBuf, NormalizeError)>,
}

impl NormalizeSummary {
    pub fn cells_rewritten(&self) -> usize {
        self.reports.iter().map(|r| r.cells_rewritten).sum()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// `path` with `suffix` appended to its file name.
pub fn temp_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

pub struct Normalizer<'a> {
    settings: &'a NormalizeSettings,
    cancel: &'a CancelToken,
}

impl<'a> Normalizer<'a> {
    pub fn new(settings: &'a NormalizeSettings, cancel: &'a CancelToken) -> Self {
        Self { settings, cancel }
    }

    /// Normalize every file in order. Per-file I/O failures are collected
    /// and the batch continues; cancellation stops it.
    pub fn normalize_all<'p, I>(
        &self,
        files: I,
        progress: &dyn ProgressSink,
    ) -> Result<NormalizeSummary, NormalizeError>
    where
        I: IntoIterator<Item = &'p Path>,
    {
        let files: Vec<&Path> = files.into_iter().collect();
        let total = files.len();
        info!(files = total, "normalizing");

        let mut summary = NormalizeSummary {
            total,
            ..Default::default()
        };

        for (i, path) in files.into_iter().enumerate() {
            let label = path.display().to_string();
            match self.normalize_file(path) {
                Ok(report) => {
                    progress.on_complete(&label, i, total, &Ok(()));
                    summary.reports.push(report);
                }
                Err(NormalizeError::Cancelled) => return Err(NormalizeError::Cancelled),
                Err(e) => {
                    warn!(path = %label, error = %e, "normalization failed");
                    progress.on_complete(&label, i, total, &Err(e.to_string()));
                    summary.failures.push((path.to_path_buf(), e));
                }
            }
        }

        progress.on_batch_complete(summary.reports.len(), summary.failures.len(), total);
        Ok(summary)
    }

    /// Rewrite `path` in place through a temporary sibling and a rename.
    pub fn normalize_file(&self, path: &Path) -> Result<FileReport, NormalizeError> {
        let io_err = |action: &'static str, source: io::Error| NormalizeError::Io {
            action,
            path: path.to_path_buf(),
            source,
        };

        let input = File::open(path).map_err(|e| io_err("open", e))?;
        let tmp = temp_path(path, &self.settings.temp_suffix);
        let output = File::create(&tmp).map_err(|e| io_err("create temp file for", e))?;

        let written = self
            .rewrite_stream(BufReader::new(input), BufWriter::new(output))
            .map_err(|e| match e {
                StreamError::Cancelled => NormalizeError::Cancelled,
                StreamError::Read(source) => io_err("read", source),
                StreamError::Write(source) => io_err("write temp file for", source),
            });

        let report = match written {
            Ok(stats) if stats.header_seen => FileReport {
                path: path.to_path_buf(),
                rows: stats.rows,
                cells_rewritten: stats.cells_rewritten,
                skipped_empty: false,
            },
            Ok(_) => {
                let _ = fs::remove_file(&tmp);
                debug!(path = %path.display(), "empty file left untouched");
                return Ok(FileReport {
                    path: path.to_path_buf(),
                    rows: 0,
                    cells_rewritten: 0,
                    skipped_empty: true,
                });
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };

        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            io_err("replace", e)
        })?;

        debug!(
            path = %path.display(),
            rows = report.rows,
            cells = report.cells_rewritten,
            "normalized"
        );
        Ok(report)
    }

    /// Copy the header verbatim and rewrite every data row.
    pub fn rewrite_stream<R: BufRead, W: Write>(
        &self,
        reader: R,
        mut writer: W,
    ) -> Result<StreamStats, StreamError> {
        let mut lines = reader.lines();
        let mut stats = StreamStats::default();

        let header_line = match lines.next() {
            None => return Ok(stats),
            Some(line) => line.map_err(StreamError::Read)?,
        };
        stats.header_seen = true;
        writeln!(writer, "{header_line}").map_err(StreamError::Write)?;

        let header = HeaderIndex::parse(&header_line);
        let rewriter = RowRewriter::from_header(
            &header,
            &self.settings.int_columns,
            &self.settings.float_columns,
        );

        for line in lines {
            if self.cancel.is_cancelled() {
                return Err(StreamError::Cancelled);
            }
            let line = line.map_err(StreamError::Read)?;
            let row = rewriter.rewrite(&line);
            stats.rows += 1;
            stats.cells_rewritten += row.changed;
            writeln!(writer, "{}", row.text).map_err(StreamError::Write)?;
        }

        writer.flush().map_err(StreamError::Write)?;
        Ok(stats)
    }
}

/// Counters from [`Normalizer::rewrite_stream`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub header_seen: bool,
    pub rows: usize,
    pub cells_rewritten: usize,
}

/// Failures inside [`Normalizer::rewrite_stream`], split by side.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("read: {0}")]
    Read(#[source] io::Error),

    #[error("write: {0}")]
    Write(#[source] io::Error),

    #[error("cancelled")]
    Cancelled,
}
