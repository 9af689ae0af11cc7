//! Known-corrupted symbols, skipped regardless of file availability.
//!
//! File format: one symbol per line, surrounding whitespace trimmed, blank
//! lines ignored.

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExclusionError {
    #[error("read exclusion list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    symbols: HashSet<String>,
}

impl ExclusionSet {
    pub fn from_path(path: &Path) -> Result<Self, ExclusionError> {
        let io_err = |source| ExclusionError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        Self::from_reader(BufReader::new(file)).map_err(io_err)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut symbols = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            let symbol = line.trim();
            if !symbol.is_empty() {
                symbols.insert(symbol.to_string());
            }
        }
        Ok(Self { symbols })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Remove every excluded symbol from `symbols`; returns how many went.
    pub fn apply(&self, symbols: &mut BTreeSet<String>) -> usize {
        let before = symbols.len();
        symbols.retain(|s| !self.symbols.contains(s));
        before - symbols.len()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn lines_are_trimmed_and_blanks_skipped() {
        let set = ExclusionSet::from_reader(Cursor::new("BTC\n  ETH \r\n\n\t\nLTC")).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains("ETH"));
        assert!(set.contains("LTC"));
        assert!(!set.contains(""));
    }

    #[test]
    fn apply_removes_only_listed_symbols() {
        let set: ExclusionSet = ["ETH", "XRP"].into_iter().collect();
        let mut symbols: BTreeSet<String> =
            ["BTC", "ETH", "LTC"].into_iter().map(String::from).collect();
        assert_eq!(set.apply(&mut symbols), 1);
        assert_eq!(
            symbols.into_iter().collect::<Vec<_>>(),
            vec!["BTC".to_string(), "LTC".to_string()]
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ExclusionSet::from_path(Path::new("/nonexistent/corrupted_files.txt"));
        assert!(matches!(err, Err(ExclusionError::Io { .. })));
    }
}
