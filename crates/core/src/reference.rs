//! A1-style references: columns, rows, cells, ranges and label names.
//!
//! Coordinates are 0-based internally (`A` = 0, row `1` = 0) and print the
//! way a user types them. Parsing ignores `$` absolute markers and letter case.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ReferenceError;

/// Last addressable column (`XFD`), 0-based.
pub const MAX_COLUMN: u32 = 16_383;

/// Last addressable row (`1048576`), 0-based.
pub const MAX_ROW: u32 = 1_048_575;

/// Serialize through `Display`, deserialize through `FromStr`.
///
/// References travel as plain strings, including as JSON object keys.
macro_rules! text_serde {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = <String as serde::Deserialize>::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use text_serde;

/// Convert 0-based column index to letter(s): 0=A, 25=Z, 26=AA.
fn col_to_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

// =============================================================================
// Columns and rows
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef(u32);

impl ColumnRef {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    pub fn letters(self) -> String {
        col_to_letters(self.0)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&col_to_letters(self.0))
    }
}

impl FromStr for ColumnRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ReferenceError::Empty);
        }
        let letters = text.strip_prefix('$').unwrap_or(text);
        if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ReferenceError::InvalidColumn(s.to_string()));
        }
        let number = letters
            .to_ascii_uppercase()
            .bytes()
            .fold(0u32, |acc, b| acc * 26 + u32::from(b - b'A' + 1));
        if number == 0 || number - 1 > MAX_COLUMN {
            return Err(ReferenceError::InvalidColumn(s.to_string()));
        }
        Ok(Self(number - 1))
    }
}

text_serde!(ColumnRef);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowRef(u32);

impl RowRef {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u64::from(self.0) + 1)
    }
}

impl FromStr for RowRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ReferenceError::Empty);
        }
        let digits = text.strip_prefix('$').unwrap_or(text);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ReferenceError::InvalidRow(s.to_string()));
        }
        match digits.parse::<u32>() {
            Ok(n) if n >= 1 && n - 1 <= MAX_ROW => Ok(Self(n - 1)),
            _ => Err(ReferenceError::InvalidRow(s.to_string())),
        }
    }
}

text_serde!(RowRef);

// =============================================================================
// Cells
// =============================================================================

/// A single cell. Orders row-major, which is also the order cells print in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: RowRef,
    pub column: ColumnRef,
}

impl CellRef {
    #[inline]
    pub const fn new(column: ColumnRef, row: RowRef) -> Self {
        Self { row, column }
    }

    /// Build from 0-based column and row indices.
    #[inline]
    pub const fn at(column: u32, row: u32) -> Self {
        Self::new(ColumnRef::new(column), RowRef::new(row))
    }

    pub fn to_range(self) -> CellRange {
        CellRange::new(self, self)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl FromStr for CellRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ReferenceError::Empty);
        }
        let Some(split) = text.find(|c: char| c.is_ascii_digit()) else {
            return Err(ReferenceError::InvalidCell(s.to_string()));
        };
        let (column, row) = text.split_at(split);
        let column = column.strip_suffix('$').unwrap_or(column);
        let column = column
            .parse::<ColumnRef>()
            .map_err(|_| ReferenceError::InvalidCell(s.to_string()))?;
        let row = row
            .parse::<RowRef>()
            .map_err(|_| ReferenceError::InvalidCell(s.to_string()))?;
        Ok(Self::new(column, row))
    }
}

text_serde!(CellRef);

// =============================================================================
// Ranges
// =============================================================================

/// Rectangular block of cells. Always normalized: `begin` is top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    begin: CellRef,
    end: CellRef,
}

impl CellRange {
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            begin: CellRef::new(a.column.min(b.column), a.row.min(b.row)),
            end: CellRef::new(a.column.max(b.column), a.row.max(b.row)),
        }
    }

    #[inline]
    pub fn begin(&self) -> CellRef {
        self.begin
    }

    #[inline]
    pub fn end(&self) -> CellRef {
        self.end
    }

    pub fn is_single_cell(&self) -> bool {
        self.begin == self.end
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        self.columns().contains(cell.column) && self.rows().contains(cell.row)
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.columns().intersects(&other.columns()) && self.rows().intersects(&other.rows())
    }

    pub fn columns(&self) -> ColumnRange {
        ColumnRange::new(self.begin.column, self.end.column)
    }

    pub fn rows(&self) -> RowRange {
        RowRange::new(self.begin.row, self.end.row)
    }

    /// Number of cells covered.
    pub fn cell_count(&self) -> u64 {
        self.columns().len() * self.rows().len()
    }

    /// Every cell in the range, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> {
        let columns = self.columns();
        self.rows()
            .iter()
            .flat_map(move |row| columns.iter().map(move |column| CellRef::new(column, row)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.begin)
        } else {
            write!(f, "{}:{}", self.begin, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = ReferenceError;

    /// Accepts `A1:B2` or a lone cell `A1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ReferenceError::Empty);
        }
        let invalid = |_| ReferenceError::InvalidRange(s.to_string());
        match text.split_once(':') {
            Some((a, b)) => Ok(Self::new(a.parse().map_err(invalid)?, b.parse().map_err(invalid)?)),
            None => Ok(text.parse::<CellRef>().map_err(invalid)?.to_range()),
        }
    }
}

text_serde!(CellRange);

impl From<CellRef> for CellRange {
    fn from(cell: CellRef) -> Self {
        cell.to_range()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRange {
    begin: ColumnRef,
    end: ColumnRef,
}

impl ColumnRange {
    pub fn new(a: ColumnRef, b: ColumnRef) -> Self {
        Self { begin: a.min(b), end: a.max(b) }
    }

    pub fn begin(&self) -> ColumnRef {
        self.begin
    }

    pub fn end(&self) -> ColumnRef {
        self.end
    }

    pub fn contains(&self, column: ColumnRef) -> bool {
        self.begin <= column && column <= self.end
    }

    pub fn intersects(&self, other: &ColumnRange) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    pub fn len(&self) -> u64 {
        u64::from(self.end.index() - self.begin.index()) + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = ColumnRef> {
        (self.begin.index()..=self.end.index()).map(ColumnRef::new)
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.begin, self.end)
    }
}

impl FromStr for ColumnRange {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |_| ReferenceError::InvalidRange(s.to_string());
        match s.trim().split_once(':') {
            Some((a, b)) => Ok(Self::new(a.parse().map_err(invalid)?, b.parse().map_err(invalid)?)),
            None => {
                let column = s.parse::<ColumnRef>().map_err(invalid)?;
                Ok(Self::new(column, column))
            }
        }
    }
}

text_serde!(ColumnRange);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowRange {
    begin: RowRef,
    end: RowRef,
}

impl RowRange {
    pub fn new(a: RowRef, b: RowRef) -> Self {
        Self { begin: a.min(b), end: a.max(b) }
    }

    pub fn begin(&self) -> RowRef {
        self.begin
    }

    pub fn end(&self) -> RowRef {
        self.end
    }

    pub fn contains(&self, row: RowRef) -> bool {
        self.begin <= row && row <= self.end
    }

    pub fn intersects(&self, other: &RowRange) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    pub fn len(&self) -> u64 {
        u64::from(self.end.index() - self.begin.index()) + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = RowRef> {
        (self.begin.index()..=self.end.index()).map(RowRef::new)
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.begin, self.end)
    }
}

impl FromStr for RowRange {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |_| ReferenceError::InvalidRange(s.to_string());
        match s.trim().split_once(':') {
            Some((a, b)) => Ok(Self::new(a.parse().map_err(invalid)?, b.parse().map_err(invalid)?)),
            None => {
                let row = s.parse::<RowRef>().map_err(invalid)?;
                Ok(Self::new(row, row))
            }
        }
    }
}

text_serde!(RowRange);

// =============================================================================
// Labels
// =============================================================================

/// A label name. Compares, hashes and orders case-insensitively but keeps the
/// spelling it was created with.
#[derive(Debug, Clone)]
pub struct LabelName(String);

impl LabelName {
    /// Validate a label identifier.
    ///
    /// Rules:
    /// - Must start with a letter or underscore
    /// - Letters, digits, underscores and dots only
    /// - Cannot end with a dot or contain `..`
    /// - Cannot look like a cell reference (`A1`, `BC23`)
    pub fn new(name: impl Into<String>) -> Result<Self, ReferenceError> {
        let name = name.into();
        let trimmed = name.trim();
        let reject = |reason: &str| ReferenceError::InvalidLabel {
            name: name.clone(),
            reason: reason.to_string(),
        };

        let Some(first) = trimmed.chars().next() else {
            return Err(ReferenceError::Empty);
        };
        if !first.is_alphabetic() && first != '_' {
            return Err(reject("must start with a letter or underscore"));
        }
        if !trimmed.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            return Err(reject("only letters, digits, underscores and dots are allowed"));
        }
        if trimmed.ends_with('.') || trimmed.contains("..") {
            return Err(reject("dots must separate name parts"));
        }
        if trimmed.len() > 255 {
            return Err(reject("longer than 255 characters"));
        }
        if trimmed.parse::<CellRef>().is_ok() {
            return Err(reject("looks like a cell reference"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().flat_map(char::to_lowercase)
    }
}

impl PartialEq for LabelName {
    fn eq(&self, other: &Self) -> bool {
        self.folded().eq(other.folded())
    }
}

impl Eq for LabelName {}

impl Hash for LabelName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.folded() {
            c.hash(state);
        }
    }
}

impl PartialOrd for LabelName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LabelName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl fmt::Display for LabelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LabelName {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for LabelName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LabelName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::new(text).map_err(de::Error::custom)
    }
}
