//! Symbol catalog: assembly from templates and the CSV artifact.
//!
//! For each discovered symbol not on the exclusion list, templates are tried
//! in precedence order and the first file that scans clean supplies the
//! symbol's range. Symbols with no clean file are reported and left out.
//!
//! Artifact layout:
//!
//! ```text
//! Symbol,Start Time,End Time
//! BTC,1546300800,1577836740
//! ```

use crate::data::exclusion::{ExclusionError, ExclusionSet};
use crate::data::scan::{Rejection, ScanError, ScanOutcome, StreamScanner, TimeRange};
use crate::data::template::{TemplateError, TemplateSet};
use crate::progress::ProgressSink;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Header row of the catalog artifact.
pub const CATALOG_HEADER: [&str; 3] = ["Symbol", "Start Time", "End Time"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Exclusion(#[from] ExclusionError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("catalog CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unexpected catalog header '{found}' (expected 'Symbol,Start Time,End Time')")]
    Header { found: String },
}

/// One catalog row. Timestamps are seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Start Time")]
    pub start: i64,
    #[serde(rename = "End Time")]
    pub end: i64,
}

impl CatalogEntry {
    pub fn new(symbol: impl Into<String>, range: TimeRange) -> Self {
        Self {
            symbol: symbol.into(),
            start: range.start,
            end: range.end,
        }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Resolved symbols in output order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.symbol == symbol)
    }

    /// Start and end of the data available for `symbol`.
    pub fn time_period(&self, symbol: &str) -> Option<TimeRange> {
        self.get(symbol).map(CatalogEntry::range)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.symbol.as_str())
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), CatalogError> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(CATALOG_HEADER)?;
        for entry in &self.entries {
            wtr.serialize(entry)?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn write_path(&self, path: &Path) -> Result<(), CatalogError> {
        let file = File::create(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_to(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?;
        if headers.iter().ne(CATALOG_HEADER) {
            return Err(CatalogError::Header {
                found: headers.iter().collect::<Vec<_>>().join(","),
            });
        }

        let entries = rdr
            .deserialize()
            .collect::<Result<Vec<CatalogEntry>, _>>()?;
        Ok(Self { entries })
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }
}

/// A rejected file for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub path: PathBuf,
    pub rejection: Rejection,
}

/// How a single symbol fared across the templates.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { entry: CatalogEntry, path: PathBuf },
    Unresolved { attempts: Vec<Attempt> },
}

/// A symbol that no template could supply.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFailure {
    pub symbol: String,
    pub attempts: Vec<Attempt>,
}

impl SymbolFailure {
    /// One-line description of every rejected attempt.
    pub fn reason(&self) -> String {
        self.attempts
            .iter()
            .map(|a| format!("{}: {}", a.path.display(), a.rejection))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Counts for one catalog run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSummary {
    /// Symbols scanned, after exclusions.
    pub total: usize,
    pub excluded: usize,
    pub resolved: usize,
    pub failures: Vec<SymbolFailure>,
}

impl CatalogSummary {
    pub fn all_resolved(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builds a [`Catalog`] from templates, an exclusion list and a scanner.
pub struct CatalogBuilder<'a> {
    templates: &'a TemplateSet,
    exclusions: &'a ExclusionSet,
    scanner: StreamScanner<'a>,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(
        templates: &'a TemplateSet,
        exclusions: &'a ExclusionSet,
        scanner: StreamScanner<'a>,
    ) -> Self {
        Self {
            templates,
            exclusions,
            scanner,
        }
    }

    /// Discovered symbols minus exclusions, and how many were excluded.
    pub fn symbols(&self) -> Result<(BTreeSet<String>, usize), CatalogError> {
        let mut symbols = self.templates.discover_symbols()?;
        let excluded = self.exclusions.apply(&mut symbols);
        let settings = self.scanner.settings();
        info!(
            symbols = symbols.len(),
            excluded,
            time_column = %settings.time_column,
            price_column = settings.price_column.as_deref().unwrap_or("-"),
            "discovered symbols"
        );
        Ok((symbols, excluded))
    }

    /// Try each template in order; the first clean scan wins.
    pub fn resolve(&self, symbol: &str) -> Result<Resolution, ScanError> {
        let mut attempts = Vec::new();
        for (template, path) in self.templates.candidates(symbol) {
            match self.scanner.scan_path(&path)? {
                ScanOutcome::Valid(range) => {
                    debug!(symbol, template = %template, start = range.start, end = range.end, "scan ok");
                    return Ok(Resolution::Resolved {
                        entry: CatalogEntry::new(symbol, range),
                        path,
                    });
                }
                ScanOutcome::Rejected(rejection) => {
                    debug!(symbol, path = %path.display(), %rejection, "rejected");
                    attempts.push(Attempt { path, rejection });
                }
            }
        }
        Ok(Resolution::Unresolved { attempts })
    }

    /// Resolve every symbol. Unresolved symbols are reported, not fatal;
    /// only cancellation and discovery failures abort.
    pub fn build(
        &self,
        progress: &dyn ProgressSink,
    ) -> Result<(Catalog, CatalogSummary), CatalogError> {
        let (symbols, excluded) = self.symbols()?;
        let total = symbols.len();
        let mut summary = CatalogSummary {
            total,
            excluded,
            ..Default::default()
        };
        let mut entries = Vec::with_capacity(total);

        for (i, symbol) in symbols.iter().enumerate() {
            match self.resolve(symbol)? {
                Resolution::Resolved { entry, path } => {
                    debug!(symbol = %symbol, source = %path.display(), "catalogued");
                    entries.push(entry);
                    summary.resolved += 1;
                    progress.on_complete(symbol, i, total, &Ok(()));
                }
                Resolution::Unresolved { attempts } => {
                    let failure = SymbolFailure {
                        symbol: symbol.clone(),
                        attempts,
                    };
                    let reason = failure.reason();
                    warn!(symbol = %symbol, %reason, "no valid data");
                    progress.on_complete(symbol, i, total, &Err(reason));
                    summary.failures.push(failure);
                }
            }
        }

        progress.on_batch_complete(summary.resolved, summary.failures.len(), total);
        Ok((Catalog::new(entries), summary))
    }
}
