//! Header-row column lookup.
//!
//! Column order differs between files, so every column of interest is found
//! by exact name in the first line. The first occurrence of a name wins;
//! duplicates and unknown columns are ignored.

/// Cell delimiter for every file this crate reads or writes.
pub const DELIMITER: char = ',';

/// Column names parsed from a header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderIndex {
    columns: Vec<String>,
}

impl HeaderIndex {
    pub fn parse(header_line: &str) -> Self {
        Self {
            columns: header_line
                .trim()
                .split(DELIMITER)
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Zero-based position of the first column named exactly `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Positions of every name in `names` that is present, in `names` order.
    /// Absent names are left out.
    pub fn positions<S: AsRef<str>>(&self, names: &[S]) -> Vec<usize> {
        names
            .iter()
            .filter_map(|n| self.position(n.as_ref()))
            .collect()
    }
}

/// The `index`-th cell of a data row, if the row is long enough.
pub fn cell(line: &str, index: usize) -> Option<&str> {
    line.split(DELIMITER).nth(index)
}
