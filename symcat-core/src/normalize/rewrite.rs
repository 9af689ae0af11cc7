//! Per-cell numeric re-encoding of designated columns.
//!
//! Integer columns become `int(float(cell))`, so `"3.0"` turns into `"3"`.
//! Float columns become the shortest decimal that round-trips, always with a
//! fractional part (`"3"` turns into `"3.0"`). A cell that does not coerce,
//! or a row too short to have it, stays as it was. Nothing else in the row
//! is touched.

use crate::data::schema::{HeaderIndex, DELIMITER};

/// Column positions to rewrite, resolved from one file's header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRewriter {
    int_positions: Vec<usize>,
    float_positions: Vec<usize>,
}

/// A rewritten data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenRow {
    pub text: String,
    /// Cells whose text actually changed.
    pub changed: usize,
}

impl RowRewriter {
    pub fn new(int_positions: Vec<usize>, float_positions: Vec<usize>) -> Self {
        Self {
            int_positions,
            float_positions,
        }
    }

    /// Resolve the named columns against `header`; absent names are ignored.
    pub fn from_header<S: AsRef<str>>(
        header: &HeaderIndex,
        int_columns: &[S],
        float_columns: &[S],
    ) -> Self {
        Self::new(header.positions(int_columns), header.positions(float_columns))
    }

    /// True when the header had none of the designated columns.
    pub fn is_noop(&self) -> bool {
        self.int_positions.is_empty() && self.float_positions.is_empty()
    }

    pub fn rewrite(&self, line: &str) -> RewrittenRow {
        if self.is_noop() {
            return RewrittenRow {
                text: line.to_string(),
                changed: 0,
            };
        }

        let mut cells: Vec<String> = line.split(DELIMITER).map(str::to_string).collect();
        let mut changed = 0;

        let passes: [(&[usize], fn(&str) -> Option<String>); 2] = [
            (&self.int_positions, coerce_int),
            (&self.float_positions, coerce_float),
        ];
        for (positions, coerce) in passes {
            for &pos in positions {
                let Some(cell) = cells.get_mut(pos) else {
                    continue;
                };
                if let Some(value) = coerce(cell.as_str()) {
                    if value != *cell {
                        *cell = value;
                        changed += 1;
                    }
                }
            }
        }

        RewrittenRow {
            text: cells.join(&DELIMITER.to_string()),
            changed,
        }
    }
}

/// `int(float(cell))`, truncating toward zero. `None` for non-numeric,
/// non-finite or out-of-range values.
pub fn coerce_int(cell: &str) -> Option<String> {
    let value: f64 = cell.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return None;
    }
    Some((truncated as i64).to_string())
}

/// `float(cell)` re-rendered by [`format_float`]. `None` for non-numeric.
pub fn coerce_float(cell: &str) -> Option<String> {
    let value: f64 = cell.trim().parse().ok()?;
    Some(format_float(value))
}

/// Shortest round-trip decimal, with `.0` appended to integral values.
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}
