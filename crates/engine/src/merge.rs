//! Delta merge engine.
//!
//! Applies one [`Delta`] to the [`EntityStore`]. Steps run in a fixed order,
//! so applying the same delta twice leaves the store as applying it once:
//!
//! 1. reset on spreadsheet id change, clear the fetched collection on a full response
//! 2. upsert cells, columns, rows
//! 3. set then delete labels, rebuild the label index
//! 4. replace reference sets, overwrite widths and heights
//! 5. delete cells, columns, rows
//! 6. matched cells, window, counts

use serde::Serialize;

use viewgrid_protocol::{Delta, SpreadsheetId};

use crate::request::{Collection, MergeScope, RequestTarget};
use crate::store::EntityStore;

/// What a merge did. Logged at debug level and checked by tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub scope: MergeScope,
    /// Spreadsheet the store was reset to before merging, if any.
    pub reset_to: Option<SpreadsheetId>,
    pub cells_upserted: usize,
    pub columns_upserted: usize,
    pub rows_upserted: usize,
    pub labels_set: usize,
    pub labels_deleted: usize,
    pub cells_deleted: usize,
    pub columns_deleted: usize,
    pub rows_deleted: usize,
    pub window_replaced: bool,
}

impl MergeReport {
    fn new(scope: MergeScope) -> Self {
        Self {
            scope,
            reset_to: None,
            cells_upserted: 0,
            columns_upserted: 0,
            rows_upserted: 0,
            labels_set: 0,
            labels_deleted: 0,
            cells_deleted: 0,
            columns_deleted: 0,
            rows_deleted: 0,
            window_replaced: false,
        }
    }
}

pub fn apply_delta(store: &mut EntityStore, target: &RequestTarget, delta: Delta) -> MergeReport {
    let mut report = MergeReport::new(target.scope);

    if let Some(id) = &target.spreadsheet_id {
        if store.spreadsheet_id() != Some(id) {
            log::info!(
                "spreadsheet changed from {} to {id}; resetting cache",
                store.spreadsheet_id().map_or("<none>", |current| current.0.as_str())
            );
            store.reset(id.clone());
            report.reset_to = Some(id.clone());
        }
    }
    match target.scope {
        MergeScope::Full(Collection::Cells) => store.clear_cells(),
        MergeScope::Full(Collection::Labels) => store.clear_labels(),
        MergeScope::Partial => {}
    }

    let Delta {
        cells,
        columns,
        rows,
        labels,
        column_widths,
        row_heights,
        column_count,
        row_count,
        matched_cells,
        references,
        deleted_cells,
        deleted_columns,
        deleted_rows,
        deleted_labels,
        window,
    } = delta;

    report.cells_upserted = cells.len();
    for (reference, cell) in cells {
        store.upsert_cell(reference, cell);
    }
    report.columns_upserted = columns.len();
    for (reference, column) in columns {
        store.upsert_column(reference, column);
    }
    report.rows_upserted = rows.len();
    for (reference, row) in rows {
        store.upsert_row(reference, row);
    }

    report.labels_set = labels.len();
    for mapping in labels {
        store.set_label(mapping);
    }
    for label in &deleted_labels {
        if store.remove_label(label) {
            report.labels_deleted += 1;
        }
    }
    if report.labels_set > 0 || report.labels_deleted > 0 || target.scope == MergeScope::Full(Collection::Labels) {
        store.rebuild_label_index();
    }

    for (referenced, referrers) in references {
        store.set_references(referenced, referrers);
    }
    for (column, width) in column_widths {
        store.set_column_width(column, width);
    }
    for (row, height) in row_heights {
        store.set_row_height(row, height);
    }

    for reference in deleted_cells {
        if store.remove_cell(reference) {
            report.cells_deleted += 1;
        }
    }
    for reference in deleted_columns {
        if store.remove_column(reference) {
            report.columns_deleted += 1;
        }
    }
    for reference in deleted_rows {
        if store.remove_row(reference) {
            report.rows_deleted += 1;
        }
    }

    if let Some(matched) = matched_cells {
        store.set_matched(matched);
    }
    if let Some(window) = window {
        store.set_window(window);
        report.window_replaced = true;
    }
    store.set_counts(column_count, row_count);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use viewgrid_core::{CellRef, LabelName};
    use viewgrid_protocol::{Cell, LabelMapping};

    fn cell(s: &str) -> CellRef {
        s.parse().unwrap()
    }

    fn label(s: &str) -> LabelName {
        LabelName::new(s).unwrap()
    }

    #[test]
    fn test_partial_merge_keeps_untouched_cells() {
        let mut store = EntityStore::default();
        apply_delta(&mut store, &RequestTarget::partial(), Delta::new().cell(cell("A1"), Cell::formula("1")));
        let report = apply_delta(&mut store, &RequestTarget::partial(), Delta::new().cell(cell("B1"), Cell::formula("2")));

        assert_eq!(report.cells_upserted, 1);
        assert!(store.cell(cell("A1")).is_some());
        assert!(store.cell(cell("B1")).is_some());
    }

    #[test]
    fn test_full_cell_merge_replaces_cells_but_not_widths_or_labels() {
        let mut store = EntityStore::default();
        let first = Delta::new()
            .cell(cell("A1"), Cell::formula("1"))
            .column_width(cell("A1").column, 55.0)
            .label(LabelMapping::new(label("Old"), cell("A1")))
            .matched([cell("A1")]);
        apply_delta(&mut store, &RequestTarget::partial(), first);

        let report = apply_delta(
            &mut store,
            &RequestTarget::full(Collection::Cells),
            Delta::new().cell(cell("C3"), Cell::formula("3")),
        );

        assert_eq!(report.scope, MergeScope::Full(Collection::Cells));
        assert!(store.cell(cell("A1")).is_none());
        assert!(store.cell(cell("C3")).is_some());
        assert!(store.matched_cells().is_empty());
        assert_eq!(store.column_width(cell("A1").column), 55.0);
        assert!(store.label_mapping(&label("Old")).is_some());
        assert!(store.labels_for_cell(cell("A1")).contains(&label("Old")));
    }

    #[test]
    fn test_full_label_merge_keeps_cells() {
        let mut store = EntityStore::default();
        let first = Delta::new()
            .cell(cell("A1"), Cell::formula("1"))
            .label(LabelMapping::new(label("Old"), cell("A1")));
        apply_delta(&mut store, &RequestTarget::partial(), first);

        apply_delta(
            &mut store,
            &RequestTarget::full(Collection::Labels),
            Delta::new().label(LabelMapping::new(label("New"), cell("B1"))),
        );

        assert!(store.cell(cell("A1")).is_some());
        assert!(store.label_mapping(&label("Old")).is_none());
        assert!(store.labels_for_cell(cell("A1")).is_empty());
        assert!(store.labels_for_cell(cell("B1")).contains(&label("New")));
    }

    #[test]
    fn test_empty_label_listing_clears_index() {
        let mut store = EntityStore::default();
        let setup = Delta::new().label(LabelMapping::new(label("Old"), cell("A1")));
        apply_delta(&mut store, &RequestTarget::partial(), setup);

        apply_delta(&mut store, &RequestTarget::full(Collection::Labels), Delta::new());
        assert!(store.labels_for_cell(cell("A1")).is_empty());
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_id_change_resets_store() {
        let mut store = EntityStore::default();
        let first = RequestTarget {
            scope: MergeScope::Partial,
            spreadsheet_id: Some(SpreadsheetId::from("1")),
        };
        let report = apply_delta(&mut store, &first, Delta::new().cell(cell("A1"), Cell::formula("1")));
        assert_eq!(report.reset_to, Some(SpreadsheetId::from("1")));

        let same = apply_delta(&mut store, &first, Delta::new());
        assert_eq!(same.reset_to, None);
        assert!(store.cell(cell("A1")).is_some());

        let second = RequestTarget {
            scope: MergeScope::Partial,
            spreadsheet_id: Some(SpreadsheetId::from("2")),
        };
        apply_delta(&mut store, &second, Delta::new().cell(cell("B2"), Cell::formula("2")));
        assert!(store.cell(cell("A1")).is_none());
        assert!(store.cell(cell("B2")).is_some());
        assert_eq!(store.spreadsheet_id(), Some(&SpreadsheetId::from("2")));
    }

    #[test]
    fn test_deletion_drops_matched_but_not_label_index() {
        let mut store = EntityStore::default();
        let setup = Delta::new()
            .cell(cell("A1"), Cell::formula("1"))
            .cell(cell("A2"), Cell::formula("2"))
            .label(LabelMapping::new(label("Top"), cell("A1")))
            .matched([cell("A1"), cell("A2")]);
        apply_delta(&mut store, &RequestTarget::partial(), setup);
        assert_eq!(store.matched_cells().len(), 2);

        let report = apply_delta(&mut store, &RequestTarget::partial(), Delta::new().delete_cell(cell("A1")));
        assert_eq!(report.cells_deleted, 1);
        assert!(!store.is_matched(cell("A1")));
        assert!(store.is_matched(cell("A2")));
        // The mapping survives, so the index still names the cell.
        assert!(store.label_mapping(&label("Top")).is_some());
        assert_eq!(store.labels_for_cell(cell("A1")), BTreeSet::from([label("Top")]));
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_readded_cell_keeps_its_labels() {
        let mut store = EntityStore::default();
        let setup = Delta::new()
            .cell(cell("A1"), Cell::formula("1"))
            .label(LabelMapping::new(label("Top"), cell("A1")));
        apply_delta(&mut store, &RequestTarget::partial(), setup);
        apply_delta(&mut store, &RequestTarget::partial(), Delta::new().delete_cell(cell("A1")));
        apply_delta(&mut store, &RequestTarget::partial(), Delta::new().cell(cell("A1"), Cell::formula("2")));

        assert_eq!(store.labels_for_cell(cell("A1")), BTreeSet::from([label("Top")]));
    }

    #[test]
    fn test_cell_deletion_and_label_change_commute() {
        let delete = Delta::new().delete_cell(cell("A1"));
        let relabel = Delta::new().label(LabelMapping::new(label("Other"), cell("E5")));
        let setup = Delta::new()
            .cell(cell("A1"), Cell::formula("1"))
            .label(LabelMapping::new(label("Top"), cell("A1")));

        let run = |order: [&Delta; 2]| {
            let mut store = EntityStore::default();
            apply_delta(&mut store, &RequestTarget::partial(), setup.clone());
            for delta in order {
                apply_delta(&mut store, &RequestTarget::partial(), delta.clone());
            }
            (store.labels_for_cell(cell("A1")), store.labels_for_cell(cell("E5")))
        };

        assert_eq!(run([&delete, &relabel]), run([&relabel, &delete]));
    }

    #[test]
    fn test_deleted_label_leaves_index() {
        let mut store = EntityStore::default();
        apply_delta(
            &mut store,
            &RequestTarget::partial(),
            Delta::new().label(LabelMapping::new(label("Top"), cell("A1"))),
        );
        let report = apply_delta(&mut store, &RequestTarget::partial(), Delta::new().delete_label(label("top")));
        assert_eq!(report.labels_deleted, 1);
        assert!(store.labels_for_cell(cell("A1")).is_empty());
    }

    #[test]
    fn test_matched_cells_filtered_to_present() {
        let mut store = EntityStore::default();
        let delta = Delta::new().cell(cell("A1"), Cell::default()).matched([cell("A1"), cell("Q7")]);
        apply_delta(&mut store, &RequestTarget::partial(), delta);
        assert_eq!(store.matched_cells().len(), 1);
    }

    #[test]
    fn test_counts_only_overwrite_when_present() {
        let mut store = EntityStore::default();
        let mut delta = Delta::new();
        delta.column_count = Some(26);
        delta.row_count = Some(100);
        apply_delta(&mut store, &RequestTarget::partial(), delta);

        let mut delta = Delta::new();
        delta.row_count = Some(200);
        apply_delta(&mut store, &RequestTarget::partial(), delta);

        assert_eq!(store.column_count(), Some(26));
        assert_eq!(store.row_count(), Some(200));
    }
}
