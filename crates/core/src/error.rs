use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Input was empty or whitespace only.
    Empty,
    /// Column letters missing, too long, or past the last column.
    InvalidColumn(String),
    /// Row number missing, zero, or past the last row.
    InvalidRow(String),
    /// Text is not a cell reference like `B7`.
    InvalidCell(String),
    /// Text is not a range like `A1:C3`, `A:C` or `1:3`.
    InvalidRange(String),
    /// Label name breaks the naming rules.
    InvalidLabel { name: String, reason: String },
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "reference is empty"),
            Self::InvalidColumn(text) => write!(f, "invalid column '{text}'"),
            Self::InvalidRow(text) => write!(f, "invalid row '{text}'"),
            Self::InvalidCell(text) => write!(f, "invalid cell reference '{text}'"),
            Self::InvalidRange(text) => write!(f, "invalid range '{text}'"),
            Self::InvalidLabel { name, reason } => write!(f, "invalid label '{name}': {reason}"),
        }
    }
}

impl std::error::Error for ReferenceError {}
