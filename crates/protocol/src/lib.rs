//! viewgrid delta protocol: wire types exchanged with the spreadsheet backend.
//!
//! The backend answers every request with a JSON `Delta`: the cells, columns,
//! rows, labels and dimensions that changed, plus what was deleted and which
//! rectangles the client is looking at. Metadata updates arrive separately.
//!
//! Keys are camelCase. References (`A1`, `A1:B2`, `C`, `7`, label names)
//! travel as strings, including as object keys.
//!
//! # Usage
//!
//! ```ignore
//! use viewgrid_protocol::{Delta, CacheEvent};
//!
//! let delta: Delta = serde_json::from_str(&body)?;
//! let event: CacheEvent = serde_json::from_str(&line)?;
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use viewgrid_core::{
    CellRange, CellRef, ColumnRef, ExpressionReference, LabelName, ReferenceError, RowRef,
    Selection, TextStyle,
};

// =============================================================================
// Cells, columns, rows
// =============================================================================

/// Names the formatter the backend applied. Opaque to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatterSelector(pub String);

/// Names the parser the backend uses for input. Opaque to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParserSelector(pub String);

impl fmt::Display for FormatterSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ParserSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Evaluation error reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetError {
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formula {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SpreadsheetError>,
}

/// A cell as the backend last sent it. Keyed by reference in the delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    #[serde(default)]
    pub formula: Formula,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<FormatterSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<ParserSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
    /// Rendered text, already formatted by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_value: Option<String>,
}

impl Cell {
    pub fn formula(text: impl Into<String>) -> Self {
        Self {
            formula: Formula {
                text: text.into(),
                ..Formula::default()
            },
            ..Self::default()
        }
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(FormatterSelector(formatter.into()));
        self
    }

    pub fn with_parser(mut self, parser: impl Into<String>) -> Self {
        self.parser = Some(ParserSelector(parser.into()));
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub hidden: bool,
}

// =============================================================================
// Labels and window
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMapping {
    pub label: LabelName,
    pub target: ExpressionReference,
}

impl LabelMapping {
    pub fn new(label: LabelName, target: impl Into<ExpressionReference>) -> Self {
        Self {
            label,
            target: target.into(),
        }
    }
}

/// Rectangles currently in view, e.g. a frozen pane plus the scrolling pane.
///
/// Travels as `"A1:B2,C3:D4"`; an array of range strings is accepted too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window(Vec<CellRange>);

impl Window {
    pub fn new(ranges: Vec<CellRange>) -> Self {
        Self(ranges)
    }

    pub fn ranges(&self) -> &[CellRange] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        self.0.iter().any(|range| range.contains(cell))
    }

    /// Distinct columns across all fragments.
    pub fn columns(&self) -> BTreeSet<ColumnRef> {
        self.0.iter().flat_map(|range| range.columns().iter()).collect()
    }

    /// Distinct rows across all fragments.
    pub fn rows(&self) -> BTreeSet<RowRef> {
        self.0.iter().flat_map(|range| range.rows().iter()).collect()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

impl FromStr for Window {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse::<CellRange>)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl Serialize for Window {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Window {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Ranges(Vec<CellRange>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Ranges(ranges) => Ok(Self(ranges)),
        }
    }
}

// =============================================================================
// Delta
// =============================================================================

/// Partial update from the backend. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Delta {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cells: BTreeMap<CellRef, Cell>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<ColumnRef, Column>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rows: BTreeMap<RowRef, Row>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelMapping>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub column_widths: BTreeMap<ColumnRef, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub row_heights: BTreeMap<RowRef, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u32>,
    /// `None` leaves the current matches alone; `Some(empty)` clears them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_cells: Option<BTreeSet<CellRef>>,
    /// Referenced thing → things referring to it.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<ExpressionReference, BTreeSet<ExpressionReference>>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub deleted_cells: BTreeSet<CellRef>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub deleted_columns: BTreeSet<ColumnRef>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub deleted_rows: BTreeSet<RowRef>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub deleted_labels: BTreeSet<LabelName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<Window>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, reference: CellRef, cell: Cell) -> Self {
        self.cells.insert(reference, cell);
        self
    }

    pub fn column(mut self, reference: ColumnRef, column: Column) -> Self {
        self.columns.insert(reference, column);
        self
    }

    pub fn row(mut self, reference: RowRef, row: Row) -> Self {
        self.rows.insert(reference, row);
        self
    }

    pub fn label(mut self, mapping: LabelMapping) -> Self {
        self.labels.push(mapping);
        self
    }

    pub fn column_width(mut self, reference: ColumnRef, width: f64) -> Self {
        self.column_widths.insert(reference, width);
        self
    }

    pub fn row_height(mut self, reference: RowRef, height: f64) -> Self {
        self.row_heights.insert(reference, height);
        self
    }

    pub fn delete_cell(mut self, reference: CellRef) -> Self {
        self.deleted_cells.insert(reference);
        self
    }

    pub fn delete_label(mut self, label: LabelName) -> Self {
        self.deleted_labels.insert(label);
        self
    }

    pub fn matched(mut self, cells: impl IntoIterator<Item = CellRef>) -> Self {
        self.matched_cells = Some(cells.into_iter().collect());
        self
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    /// True if applying this delta could change nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Backend identifier of a spreadsheet, as it appears in request URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpreadsheetId(pub String);

impl fmt::Display for SpreadsheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpreadsheetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub id: SpreadsheetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_column_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_row_height: Option<f64>,
}

impl Metadata {
    pub fn new(id: impl Into<SpreadsheetId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            default_column_width: None,
            default_row_height: None,
        }
    }
}

// =============================================================================
// Requests and events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unknown HTTP method '{other}'")),
        }
    }
}

/// Everything the cache reacts to, in one ordered stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheEvent {
    /// A decoded network response.
    Delta {
        method: HttpMethod,
        url: String,
        delta: Delta,
    },
    /// Spreadsheet metadata loaded or changed.
    Metadata(Metadata),
    /// History state moved to a new selection (or none).
    Selection {
        #[serde(default)]
        selection: Option<Selection>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cell(s: &str) -> CellRef {
        s.parse().unwrap()
    }

    #[test]
    fn test_window_text_form() {
        let window: Window = serde_json::from_value(json!("A1:B2, C3:D4")).unwrap();
        assert_eq!(window.ranges().len(), 2);
        assert_eq!(serde_json::to_value(&window).unwrap(), json!("A1:B2,C3:D4"));
    }

    #[test]
    fn test_window_array_form() {
        let window: Window = serde_json::from_value(json!(["A1:B2", "B1:C9"])).unwrap();
        assert_eq!(window.ranges().len(), 2);
        assert_eq!(window.columns().len(), 3);
        assert_eq!(window.rows().len(), 9);
        assert!(window.contains(cell("C9")));
        assert!(!window.contains(cell("D1")));
    }

    #[test]
    fn test_empty_window_text() {
        let window: Window = "".parse().unwrap();
        assert!(window.is_empty());
    }

    #[test]
    fn test_delta_defaults_when_fields_missing() {
        let delta: Delta = serde_json::from_value(json!({})).unwrap();
        assert!(delta.is_empty());
        assert!(delta.window.is_none());
        assert!(delta.matched_cells.is_none());
    }

    #[test]
    fn test_delta_skips_empty_fields() {
        let delta = Delta::new().cell(cell("A1"), Cell::formula("=1"));
        let value = serde_json::to_value(&delta).unwrap();
        assert_eq!(value, json!({"cells": {"A1": {"formula": {"text": "=1"}}}}));
    }

    #[test]
    fn test_method_parse_and_display() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert!("BREW".parse::<HttpMethod>().is_err());
        assert_eq!(serde_json::to_value(HttpMethod::Delete).unwrap(), json!("DELETE"));
    }

    #[test]
    fn test_cache_event_tagging() {
        let event: CacheEvent = serde_json::from_value(json!({
            "event": "selection",
            "selection": "A1:B2"
        }))
        .unwrap();
        assert_eq!(
            event,
            CacheEvent::Selection {
                selection: Some("A1:B2".parse().unwrap())
            }
        );

        let event: CacheEvent = serde_json::from_value(json!({
            "event": "metadata",
            "id": "1f",
            "defaultColumnWidth": 80.0
        }))
        .unwrap();
        match event {
            CacheEvent::Metadata(metadata) => {
                assert_eq!(metadata.id, SpreadsheetId::from("1f"));
                assert_eq!(metadata.default_column_width, Some(80.0));
                assert_eq!(metadata.default_row_height, None);
            }
            other => panic!("expected metadata, got {other:?}"),
        }
    }
}
