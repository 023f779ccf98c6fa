use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single scalar cell value. The worksheet model is deliberately flat: no
/// formulas, no formatting, no nested structures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Integer literal. Key columns must hold values castable to this variant.
    Int(i64),
    /// Floating point literal.
    Number(f64),
    /// Plain text literal.
    Text(String),
    /// Absent or blank cell.
    Empty,
}

/// One logical entity to be persisted, keyed by column name. Records are not
/// required to cover every column; uncovered columns are left untouched.
pub type Record = BTreeMap<String, CellValue>;

/// The rectangular grid of a worksheet. Row 0 is the header row.
pub type Grid = Vec<Vec<CellValue>>;

/// A pending cell mutation queued in a write batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    pub row: usize,
    pub col: usize,
    pub value: CellValue,
}

impl CellValue {
    /// Returns true for absent cells and for blank text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(value) => value.is_empty(),
            _ => false,
        }
    }

    /// Canonical string form used for conditional matching and logging.
    /// Integral floats render without a fractional part so that a value
    /// written as `3` and read back as `3.0` still compares equal.
    pub fn to_cell_string(&self) -> String {
        match self {
            CellValue::Int(value) => value.to_string(),
            CellValue::Number(value) => {
                if value.fract() == 0.0 {
                    format!("{}", *value as i64)
                } else {
                    value.to_string()
                }
            }
            CellValue::Text(value) => value.clone(),
            CellValue::Empty => String::new(),
        }
    }

    /// Equality on the canonical string representation, matching how values
    /// survive a round trip through the stored document.
    pub fn matches(&self, other: &CellValue) -> bool {
        self.to_cell_string() == other.to_cell_string()
    }

    /// Lossless cast to an integer key, if possible.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(value) => Some(*value),
            CellValue::Number(value) if value.fract() == 0.0 => Some(*value as i64),
            CellValue::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_cell_string())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}
