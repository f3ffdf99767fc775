//! Entity store: everything the client currently knows about the spreadsheet.
//!
//! Only the merge engine mutates the store. Queries go through
//! [`ViewportCache`](crate::cache::ViewportCache).
//!
//! # Invariants
//!
//! 1. **Matched ⊆ cells:** every matched cell is a key of `cells`.
//! 2. **Label index follows mappings:** `cell_labels` and `range_labels` are
//!    a function of `label_mappings` alone, rebuilt whenever a mapping
//!    changes. Adding or deleting cells never touches them.
//! 3. **No empty sets:** index entries with no members are removed.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use viewgrid_core::{CellRange, CellRef, ColumnRef, ExpressionReference, LabelName, RowRef, Selection};
use viewgrid_protocol::{Cell, Column, LabelMapping, Row, SpreadsheetId, Window};

use crate::resolver::{self, LabelLookup};

/// Lazily filtered `(reference, cell)` pairs.
pub type CellsIter<'a> = Box<dyn Iterator<Item = (CellRef, &'a Cell)> + 'a>;

/// Lengths used when neither the delta nor metadata supplied one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub column_width: f64,
    pub row_height: f64,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            column_width: 100.0,
            row_height: 30.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    spreadsheet_id: Option<SpreadsheetId>,
    fallback: Dimensions,
    default_column_width: Option<f64>,
    default_row_height: Option<f64>,

    cells: FxHashMap<CellRef, Cell>,
    columns: FxHashMap<ColumnRef, Column>,
    rows: FxHashMap<RowRef, Row>,

    label_mappings: FxHashMap<LabelName, ExpressionReference>,
    /// Derived: cell → labels resolving onto exactly that cell.
    cell_labels: FxHashMap<CellRef, FxHashSet<LabelName>>,
    /// Derived: labels resolving onto a multi-cell range. Answered by
    /// containment so a whole-sheet range costs one entry.
    range_labels: Vec<(CellRange, LabelName)>,
    /// Referenced thing → things referring to it. Each key replaced wholesale.
    cell_references: FxHashMap<ExpressionReference, BTreeSet<ExpressionReference>>,

    column_widths: FxHashMap<ColumnRef, f64>,
    row_heights: FxHashMap<RowRef, f64>,

    matched_cells: FxHashSet<CellRef>,
    window: Window,
    column_count: Option<u32>,
    row_count: Option<u32>,
}

impl LabelLookup for EntityStore {
    fn label_target(&self, label: &LabelName) -> Option<&ExpressionReference> {
        self.label_mappings.get(label)
    }
}

impl EntityStore {
    pub fn new(fallback: Dimensions) -> Self {
        Self {
            fallback,
            ..Self::default()
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn spreadsheet_id(&self) -> Option<&SpreadsheetId> {
        self.spreadsheet_id.as_ref()
    }

    /// Wipe everything and adopt a new spreadsheet id. Nothing survives.
    pub fn reset(&mut self, id: SpreadsheetId) {
        self.clear();
        self.default_column_width = None;
        self.default_row_height = None;
        self.spreadsheet_id = Some(id);
    }

    /// Drop all cached state except the spreadsheet id and metadata defaults.
    pub fn clear(&mut self) {
        self.clear_entities();
        self.column_widths.clear();
        self.row_heights.clear();
        self.window = Window::default();
        self.column_count = None;
        self.row_count = None;
    }

    /// Drop entities and their derived indices. Dimensions, window and
    /// counts are kept.
    fn clear_entities(&mut self) {
        self.clear_cells();
        self.clear_labels();
    }

    /// Drop the cell collection: cells, columns, rows and what derives from
    /// them. Labels are a separate collection and survive.
    pub(crate) fn clear_cells(&mut self) {
        self.cells.clear();
        self.columns.clear();
        self.rows.clear();
        self.cell_references.clear();
        self.matched_cells.clear();
    }

    pub(crate) fn clear_labels(&mut self) {
        self.label_mappings.clear();
        self.cell_labels.clear();
        self.range_labels.clear();
    }

    pub(crate) fn set_default_dimensions(&mut self, column_width: Option<f64>, row_height: Option<f64>) {
        if column_width.is_some() {
            self.default_column_width = column_width;
        }
        if row_height.is_some() {
            self.default_row_height = row_height;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
            && self.columns.is_empty()
            && self.rows.is_empty()
            && self.label_mappings.is_empty()
            && self.column_widths.is_empty()
            && self.row_heights.is_empty()
    }

    // =========================================================================
    // Cells
    // =========================================================================

    pub fn cell(&self, reference: CellRef) -> Option<&Cell> {
        self.cells.get(&reference)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn all_cells(&self) -> CellsIter<'_> {
        Box::new(self.cells.iter().map(|(r, c)| (*r, c)))
    }

    /// Cells present in the store that fall inside `selection`.
    ///
    /// Small ranges are looked up cell by cell; anything else scans the store.
    /// Labels must be resolved by the caller; an unresolved label yields nothing.
    pub fn cells_in(&self, selection: Selection) -> CellsIter<'_> {
        match selection {
            Selection::Cell(cell) => Box::new(self.cells.get_key_value(&cell).map(|(r, c)| (*r, c)).into_iter()),
            Selection::CellRange(range) if range.cell_count() <= self.cells.len() as u64 => Box::new(
                range
                    .cells()
                    .filter_map(move |cell| self.cells.get_key_value(&cell).map(|(r, c)| (*r, c))),
            ),
            Selection::Label(_) => Box::new(std::iter::empty()),
            selection => Box::new(
                self.cells
                    .iter()
                    .filter(move |(reference, _)| selection.test_cell(**reference))
                    .map(|(r, c)| (*r, c)),
            ),
        }
    }

    pub(crate) fn upsert_cell(&mut self, reference: CellRef, cell: Cell) {
        self.cells.insert(reference, cell);
    }

    /// Remove a cell with its matched flag and reference set. Labels
    /// pointing at it stay indexed; they follow the mappings.
    pub(crate) fn remove_cell(&mut self, reference: CellRef) -> bool {
        self.matched_cells.remove(&reference);
        self.cell_references.remove(&ExpressionReference::Cell(reference));
        self.cells.remove(&reference).is_some()
    }

    // =========================================================================
    // Columns and rows
    // =========================================================================

    pub fn column(&self, reference: ColumnRef) -> Option<&Column> {
        self.columns.get(&reference)
    }

    pub fn row(&self, reference: RowRef) -> Option<&Row> {
        self.rows.get(&reference)
    }

    pub fn is_column_hidden(&self, reference: ColumnRef) -> bool {
        self.columns.get(&reference).is_some_and(|c| c.hidden)
    }

    pub fn is_row_hidden(&self, reference: RowRef) -> bool {
        self.rows.get(&reference).is_some_and(|r| r.hidden)
    }

    pub(crate) fn upsert_column(&mut self, reference: ColumnRef, column: Column) {
        self.columns.insert(reference, column);
    }

    pub(crate) fn remove_column(&mut self, reference: ColumnRef) -> bool {
        self.columns.remove(&reference).is_some()
    }

    pub(crate) fn upsert_row(&mut self, reference: RowRef, row: Row) {
        self.rows.insert(reference, row);
    }

    pub(crate) fn remove_row(&mut self, reference: RowRef) -> bool {
        self.rows.remove(&reference).is_some()
    }

    // =========================================================================
    // Dimensions
    // =========================================================================

    pub fn default_column_width(&self) -> f64 {
        self.default_column_width.unwrap_or(self.fallback.column_width)
    }

    pub fn default_row_height(&self) -> f64 {
        self.default_row_height.unwrap_or(self.fallback.row_height)
    }

    pub fn column_width(&self, reference: ColumnRef) -> f64 {
        self.column_widths
            .get(&reference)
            .copied()
            .unwrap_or_else(|| self.default_column_width())
    }

    pub fn row_height(&self, reference: RowRef) -> f64 {
        self.row_heights
            .get(&reference)
            .copied()
            .unwrap_or_else(|| self.default_row_height())
    }

    pub(crate) fn set_column_width(&mut self, reference: ColumnRef, width: f64) {
        self.column_widths.insert(reference, width);
    }

    pub(crate) fn set_row_height(&mut self, reference: RowRef, height: f64) {
        self.row_heights.insert(reference, height);
    }

    // =========================================================================
    // Labels
    // =========================================================================

    pub fn label_mapping(&self, label: &LabelName) -> Option<LabelMapping> {
        self.label_mappings
            .get_key_value(label)
            .map(|(name, target)| LabelMapping::new(name.clone(), target.clone()))
    }

    /// All mappings, sorted by label.
    pub fn label_mappings(&self) -> Vec<LabelMapping> {
        let mut mappings: Vec<LabelMapping> = self
            .label_mappings
            .iter()
            .map(|(name, target)| LabelMapping::new(name.clone(), target.clone()))
            .collect();
        mappings.sort_by(|a, b| a.label.cmp(&b.label));
        mappings
    }

    /// Labels resolving onto `cell`, directly or through a range holding it.
    pub fn labels_for_cell(&self, cell: CellRef) -> BTreeSet<LabelName> {
        self.labels_in(&cell.to_range())
    }

    /// Labels resolving onto any cell inside `range`.
    pub fn labels_in(&self, range: &CellRange) -> BTreeSet<LabelName> {
        let mut found: BTreeSet<LabelName> = if range.is_single_cell() {
            self.cell_labels
                .get(&range.begin())
                .map(|labels| labels.iter().cloned().collect())
                .unwrap_or_default()
        } else {
            self.cell_labels
                .iter()
                .filter(|(cell, _)| range.contains(**cell))
                .flat_map(|(_, labels)| labels.iter().cloned())
                .collect()
        };
        found.extend(
            self.range_labels
                .iter()
                .filter(|(target, _)| target.intersects(range))
                .map(|(_, label)| label.clone()),
        );
        found
    }

    pub(crate) fn set_label(&mut self, mapping: LabelMapping) {
        // Re-insert the key so a respelled label keeps the newest spelling.
        self.label_mappings.remove(&mapping.label);
        self.label_mappings.insert(mapping.label, mapping.target);
    }

    pub(crate) fn remove_label(&mut self, label: &LabelName) -> bool {
        self.label_mappings.remove(label).is_some()
    }

    /// Recompute the label index from the mappings alone. Range targets
    /// cover every cell in the range, in or out of the window.
    pub(crate) fn rebuild_label_index(&mut self) {
        let mut cells: FxHashMap<CellRef, FxHashSet<LabelName>> = FxHashMap::default();
        let mut ranges = Vec::new();
        for label in self.label_mappings.keys() {
            let resolution = resolver::resolve_label(self, label);
            match resolution.target.to_cell_range() {
                Some(range) if range.is_single_cell() => {
                    cells.entry(range.begin()).or_default().insert(label.clone());
                }
                Some(range) => ranges.push((range, label.clone())),
                None => {}
            }
        }
        ranges.sort();
        self.cell_labels = cells;
        self.range_labels = ranges;
    }

    // =========================================================================
    // References
    // =========================================================================

    pub fn references_to(&self, target: &ExpressionReference) -> Option<&BTreeSet<ExpressionReference>> {
        self.cell_references.get(target)
    }

    pub(crate) fn set_references(&mut self, target: ExpressionReference, referrers: BTreeSet<ExpressionReference>) {
        if referrers.is_empty() {
            self.cell_references.remove(&target);
        } else {
            self.cell_references.insert(target, referrers);
        }
    }

    // =========================================================================
    // Matches, window, counts
    // =========================================================================

    pub fn matched_cells(&self) -> &FxHashSet<CellRef> {
        &self.matched_cells
    }

    pub fn is_matched(&self, cell: CellRef) -> bool {
        self.matched_cells.contains(&cell)
    }

    /// Replace the matched set, keeping only cells the store holds.
    pub(crate) fn set_matched(&mut self, cells: impl IntoIterator<Item = CellRef>) {
        let matched = cells.into_iter().filter(|cell| self.cells.contains_key(cell)).collect();
        self.matched_cells = matched;
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub(crate) fn set_window(&mut self, window: Window) {
        self.window = window;
    }

    pub fn column_count(&self) -> Option<u32> {
        self.column_count
    }

    pub fn row_count(&self) -> Option<u32> {
        self.row_count
    }

    pub(crate) fn set_counts(&mut self, column_count: Option<u32>, row_count: Option<u32>) {
        if column_count.is_some() {
            self.column_count = column_count;
        }
        if row_count.is_some() {
            self.row_count = row_count;
        }
    }

    /// Debug check of the invariants above. Used by tests.
    pub fn check_invariants(&self) -> Result<(), String> {
        if let Some(stray) = self.matched_cells.iter().find(|c| !self.cells.contains_key(c)) {
            return Err(format!("matched cell {stray} is not cached"));
        }
        if let Some((cell, _)) = self.cell_labels.iter().find(|(_, labels)| labels.is_empty()) {
            return Err(format!("empty label set stored for {cell}"));
        }
        if let Some((cell, label)) = self
            .cell_labels
            .iter()
            .flat_map(|(cell, labels)| labels.iter().map(move |l| (cell.to_range(), l)))
            .chain(self.range_labels.iter().map(|(range, label)| (*range, label)))
            .find(|(_, label)| !self.label_mappings.contains_key(*label))
        {
            return Err(format!("index maps {cell} to unknown label {label}"));
        }
        Ok(())
    }
}
