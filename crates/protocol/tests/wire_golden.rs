//! Golden vector compatibility test for the delta wire format.
//!
//! Golden vectors live in: crates/protocol/tests/golden/*.jsonl
//! These files are the source of truth for what the backend sends.
//!
//! **Rule**: The golden vectors MUST NOT change. If the test fails, fix the types, not the vectors.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use viewgrid_core::{CellRef, ColumnRef, ExpressionReference, LabelName, RowRef, Selection};
use viewgrid_protocol::{CacheEvent, Delta, HttpMethod};

fn golden_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/golden")
}

fn load_golden_lines(filename: &str) -> Vec<String> {
    let path = golden_dir().join(filename);
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

fn deltas() -> Vec<Delta> {
    load_golden_lines("deltas.jsonl")
        .iter()
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line).unwrap_or_else(|e| panic!("deltas.jsonl line {}: {} - {}", i + 1, e, line))
        })
        .collect()
}

fn events() -> Vec<CacheEvent> {
    load_golden_lines("events.jsonl")
        .iter()
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line).unwrap_or_else(|e| panic!("events.jsonl line {}: {} - {}", i + 1, e, line))
        })
        .collect()
}

fn cell(s: &str) -> CellRef {
    s.parse().unwrap()
}

// =============================================================================
// Deltas
// =============================================================================

#[test]
fn test_all_deltas_parse() {
    let deltas = deltas();
    assert_eq!(deltas.len(), 8);
    assert!(deltas[0].is_empty());
}

#[test]
fn test_cell_payload() {
    let deltas = deltas();
    let delta = &deltas[1];
    let b1 = &delta.cells[&cell("B1")];
    assert_eq!(b1.formula.text, "2");
    assert_eq!(b1.formatter.as_ref().map(|f| f.0.as_str()), Some("number"));
    assert_eq!(b1.formatted_value.as_deref(), Some("2.00"));

    let a1 = &delta.cells[&cell("A1")];
    assert_eq!(a1.formula.value, Some(serde_json::json!(3)));
    assert!(a1.style.is_none());
}

#[test]
fn test_error_and_style() {
    let deltas = deltas();
    let delta = &deltas[2];
    let c3 = &delta.cells[&cell("C3")];
    let error = c3.formula.error.as_ref().unwrap();
    assert_eq!(error.kind, "div0");
    assert_eq!(c3.style.as_ref().map(|s| s.len()), Some(2));
    assert_eq!(delta.window.as_ref().map(|w| w.to_string()).as_deref(), Some("A1:D10"));
}

#[test]
fn test_dimensions_and_counts() {
    let deltas = deltas();
    let delta = &deltas[3];
    assert!(delta.columns[&ColumnRef::new(1)].hidden);
    assert!(delta.rows[&RowRef::new(3)].hidden);
    assert_eq!(delta.column_widths[&ColumnRef::new(0)], 120.5);
    assert_eq!(delta.column_widths[&ColumnRef::new(26)], 80.0);
    assert_eq!(delta.row_heights[&RowRef::new(0)], 24.0);
    assert_eq!((delta.column_count, delta.row_count), (Some(30), Some(200)));
}

#[test]
fn test_label_targets() {
    let deltas = deltas();
    let delta = &deltas[4];
    let targets: Vec<&ExpressionReference> = delta.labels.iter().map(|m| &m.target).collect();
    assert!(matches!(targets[0], ExpressionReference::Range(_)));
    assert_eq!(targets[1], &ExpressionReference::Label(LabelName::new("revenue").unwrap()));
    assert_eq!(targets[2], &ExpressionReference::Cell(cell("C1")));
}

#[test]
fn test_deletions() {
    let deltas = deltas();
    let delta = &deltas[5];
    assert_eq!(delta.deleted_cells.len(), 2);
    assert!(delta.deleted_columns.contains(&ColumnRef::new(1)));
    assert!(delta.deleted_rows.contains(&RowRef::new(3)));
    assert!(delta.deleted_labels.contains(&LabelName::new("TOTAL").unwrap()));
}

#[test]
fn test_matched_and_references() {
    let deltas = deltas();
    let delta = &deltas[6];
    assert_eq!(delta.matched_cells.as_ref().map(|m| m.len()), Some(2));
    let referrers = &delta.references[&ExpressionReference::Cell(cell("A1"))];
    assert_eq!(referrers.len(), 2);
    assert_eq!(delta.window.as_ref().map(|w| w.ranges().len()), Some(2));

    // An explicit empty list clears matches; absence leaves them alone.
    assert_eq!(deltas[7].matched_cells.as_ref().map(|m| m.len()), Some(0));
    assert!(deltas[0].matched_cells.is_none());
}

#[test]
fn test_delta_reserialization_is_stable() {
    for delta in deltas() {
        let value = serde_json::to_value(&delta).unwrap();
        let again: Delta = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(again, delta);
        assert_eq!(serde_json::to_value(&again).unwrap(), value);
    }
}

// =============================================================================
// Events
// =============================================================================

#[test]
fn test_events() {
    let events = events();
    assert_eq!(events.len(), 8);

    match &events[0] {
        CacheEvent::Metadata(metadata) => {
            assert_eq!(metadata.id.0, "sheet-1");
            assert_eq!(metadata.name.as_deref(), Some("Budget"));
            assert_eq!(metadata.default_row_height, Some(30.0));
        }
        other => panic!("expected metadata, got {other:?}"),
    }
    assert!(matches!(&events[1], CacheEvent::Metadata(m) if m.default_column_width.is_none()));
    assert!(matches!(&events[2], CacheEvent::Delta { method: HttpMethod::Get, url, .. } if url.ends_with("/*")));
    assert!(matches!(&events[3], CacheEvent::Delta { method: HttpMethod::Patch, .. }));
    assert!(matches!(&events[4], CacheEvent::Selection { selection: Some(Selection::CellRange(_)) }));
    assert!(matches!(&events[5], CacheEvent::Selection { selection: Some(Selection::Label(_)) }));
    assert_eq!(events[6], CacheEvent::Selection { selection: None });
    assert_eq!(events[7], CacheEvent::Selection { selection: None });
}

#[test]
fn test_unknown_event_is_rejected() {
    let line = r#"{"event":"teleport","to":"A1"}"#;
    assert!(serde_json::from_str::<CacheEvent>(line).is_err());
    assert!(serde_json::from_str::<Value>(line).is_ok());
}

#[test]
fn test_bad_reference_key_is_rejected() {
    let line = r#"{"cells":{"not a cell":{}}}"#;
    assert!(serde_json::from_str::<Delta>(line).is_err());
}
