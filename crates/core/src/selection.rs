//! Selections and expression references.
//!
//! An [`ExpressionReference`] is anything a label may point at or a formula
//! may mention: a cell, a range, or another label. A [`Selection`] adds whole
//! columns and rows on top, since the user can select those.

use std::fmt;
use std::str::FromStr;

use crate::error::ReferenceError;
use crate::reference::{text_serde, CellRange, CellRef, ColumnRange, ColumnRef, LabelName, RowRange, RowRef};

/// Target of a label mapping, or a key in the cell-references index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExpressionReference {
    Cell(CellRef),
    Range(CellRange),
    Label(LabelName),
}

impl ExpressionReference {
    pub fn as_label(&self) -> Option<&LabelName> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }

    /// Cells covered, or `None` for a label.
    pub fn to_cell_range(&self) -> Option<CellRange> {
        match self {
            Self::Cell(cell) => Some(cell.to_range()),
            Self::Range(range) => Some(*range),
            Self::Label(_) => None,
        }
    }
}

impl fmt::Display for ExpressionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(cell) => write!(f, "{cell}"),
            Self::Range(range) => write!(f, "{range}"),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}

impl FromStr for ExpressionReference {
    type Err = ReferenceError;

    /// `A1` is a cell, `A1:B2` a range, anything else must be a valid label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if text.contains(':') {
            return text.parse().map(Self::Range);
        }
        if let Ok(cell) = text.parse::<CellRef>() {
            return Ok(Self::Cell(cell));
        }
        LabelName::new(text).map(Self::Label)
    }
}

text_serde!(ExpressionReference);

impl From<CellRef> for ExpressionReference {
    fn from(cell: CellRef) -> Self {
        Self::Cell(cell)
    }
}

impl From<CellRange> for ExpressionReference {
    fn from(range: CellRange) -> Self {
        if range.is_single_cell() {
            Self::Cell(range.begin())
        } else {
            Self::Range(range)
        }
    }
}

impl From<LabelName> for ExpressionReference {
    fn from(label: LabelName) -> Self {
        Self::Label(label)
    }
}

/// What the user has selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    Cell(CellRef),
    CellRange(CellRange),
    Column(ColumnRef),
    ColumnRange(ColumnRange),
    Row(RowRef),
    RowRange(RowRange),
    Label(LabelName),
}

impl Selection {
    pub fn is_label(&self) -> bool {
        matches!(self, Self::Label(_))
    }

    pub fn as_label(&self) -> Option<&LabelName> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }

    /// True if the cell lies inside this selection. Labels contain nothing
    /// until resolved.
    pub fn test_cell(&self, cell: CellRef) -> bool {
        match self {
            Self::Cell(c) => *c == cell,
            Self::CellRange(range) => range.contains(cell),
            Self::Column(column) => *column == cell.column,
            Self::ColumnRange(columns) => columns.contains(cell.column),
            Self::Row(row) => *row == cell.row,
            Self::RowRange(rows) => rows.contains(cell.row),
            Self::Label(_) => false,
        }
    }

    /// True if any cell of `range` lies inside this selection.
    pub fn test_range(&self, range: &CellRange) -> bool {
        match self {
            Self::Cell(c) => range.contains(*c),
            Self::CellRange(r) => r.intersects(range),
            Self::Column(column) => range.columns().contains(*column),
            Self::ColumnRange(columns) => columns.intersects(&range.columns()),
            Self::Row(row) => range.rows().contains(*row),
            Self::RowRange(rows) => rows.intersects(&range.rows()),
            Self::Label(_) => false,
        }
    }

    /// One-hop intersection used for listing label mappings. A label target
    /// only matches the same label.
    pub fn intersects(&self, target: &ExpressionReference) -> bool {
        match target {
            ExpressionReference::Cell(cell) => self.test_cell(*cell),
            ExpressionReference::Range(range) => self.test_range(range),
            ExpressionReference::Label(label) => self.as_label() == Some(label),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(cell) => write!(f, "{cell}"),
            Self::CellRange(range) => write!(f, "{range}"),
            Self::Column(column) => write!(f, "{column}"),
            Self::ColumnRange(columns) => write!(f, "{columns}"),
            Self::Row(row) => write!(f, "{row}"),
            Self::RowRange(rows) => write!(f, "{rows}"),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}

impl FromStr for Selection {
    type Err = ReferenceError;

    /// Tries, in order: cell, cell range, column (range), row (range), label.
    /// Letter-only text that is a valid column parses as a column.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if let Some((a, b)) = text.split_once(':') {
            if let (Ok(a), Ok(b)) = (a.parse::<CellRef>(), b.parse::<CellRef>()) {
                return Ok(Self::CellRange(CellRange::new(a, b)));
            }
            if let (Ok(a), Ok(b)) = (a.parse::<ColumnRef>(), b.parse::<ColumnRef>()) {
                return Ok(Self::ColumnRange(ColumnRange::new(a, b)));
            }
            if let (Ok(a), Ok(b)) = (a.parse::<RowRef>(), b.parse::<RowRef>()) {
                return Ok(Self::RowRange(RowRange::new(a, b)));
            }
            return Err(ReferenceError::InvalidRange(s.to_string()));
        }
        if let Ok(cell) = text.parse::<CellRef>() {
            return Ok(Self::Cell(cell));
        }
        if let Ok(column) = text.parse::<ColumnRef>() {
            return Ok(Self::Column(column));
        }
        if let Ok(row) = text.parse::<RowRef>() {
            return Ok(Self::Row(row));
        }
        LabelName::new(text).map(Self::Label)
    }
}

text_serde!(Selection);

impl From<ExpressionReference> for Selection {
    fn from(reference: ExpressionReference) -> Self {
        match reference {
            ExpressionReference::Cell(cell) => Self::Cell(cell),
            ExpressionReference::Range(range) => Self::CellRange(range),
            ExpressionReference::Label(label) => Self::Label(label),
        }
    }
}

impl From<CellRef> for Selection {
    fn from(cell: CellRef) -> Self {
        Self::Cell(cell)
    }
}

impl From<CellRange> for Selection {
    fn from(range: CellRange) -> Self {
        Self::CellRange(range)
    }
}

impl From<LabelName> for Selection {
    fn from(label: LabelName) -> Self {
        Self::Label(label)
    }
}
