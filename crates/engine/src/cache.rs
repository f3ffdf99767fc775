//! The viewport cache: one per open spreadsheet.
//!
//! Owns the [`EntityStore`], feeds it deltas and metadata, tracks the current
//! selection, and answers every query the rendering layer asks. Everything
//! runs on the caller's thread; events are applied in arrival order.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use viewgrid_core::{CellRange, CellRef, ColumnRef, ExpressionReference, LabelName, RowRef, Selection};
use viewgrid_protocol::{Cell, CacheEvent, Column, Delta, HttpMethod, LabelMapping, Metadata, Row, SpreadsheetId, Window};

use crate::events::Subscription;
use crate::geometry::{self, Thumbnail};
use crate::merge::{self, MergeReport};
use crate::request::UrlRules;
use crate::resolver::{self, LabelResolution};
use crate::store::{CellsIter, Dimensions, EntityStore};
use crate::summary::{self, SelectionSummary};

/// Construction-time settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheOptions {
    /// Used until metadata supplies spreadsheet defaults.
    pub dimensions: Dimensions,
    pub url_rules: UrlRules,
}

#[derive(Debug, Default)]
pub struct ViewportCache {
    store: EntityStore,
    rules: UrlRules,
    selection: Option<Selection>,
    summary: OnceCell<Option<SelectionSummary>>,
}

impl ViewportCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            store: EntityStore::new(options.dimensions),
            rules: options.url_rules,
            selection: None,
            summary: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    fn invalidate(&mut self) {
        self.summary = OnceCell::new();
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Merge a decoded response for `method url`.
    pub fn on_delta(&mut self, method: HttpMethod, url: &str, delta: Delta) -> MergeReport {
        let target = self.rules.classify(method, url);
        let report = merge::apply_delta(&mut self.store, &target, delta);
        log::debug!("{method} {url}: {report:?}");
        self.invalidate();
        report
    }

    /// Adopt spreadsheet metadata. A different id wipes the cache first.
    pub fn on_metadata(&mut self, metadata: Metadata) {
        if self.store.spreadsheet_id() != Some(&metadata.id) {
            log::info!("opening spreadsheet {}", metadata.id);
            self.store.reset(metadata.id.clone());
        }
        self.store
            .set_default_dimensions(metadata.default_column_width, metadata.default_row_height);
        self.invalidate();
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
        self.invalidate();
    }

    pub fn handle(&mut self, event: CacheEvent) {
        match event {
            CacheEvent::Delta { method, url, delta } => {
                self.on_delta(method, &url, delta);
            }
            CacheEvent::Metadata(metadata) => self.on_metadata(metadata),
            CacheEvent::Selection { selection } => self.set_selection(selection),
        }
    }

    /// Apply every event pending on `subscription`. Returns how many were applied.
    pub fn pump(&mut self, subscription: &Subscription) -> usize {
        let mut applied = 0;
        for event in subscription.drain() {
            log::trace!("subscription {}: {event:?}", subscription.id());
            self.handle(event);
            applied += 1;
        }
        applied
    }

    /// Forget everything except the spreadsheet id and its default dimensions.
    pub fn clear(&mut self) {
        self.store.clear();
        self.invalidate();
    }

    // =========================================================================
    // Entities
    // =========================================================================

    pub fn spreadsheet_id(&self) -> Option<&SpreadsheetId> {
        self.store.spreadsheet_id()
    }

    pub fn cell(&self, reference: CellRef) -> Option<&Cell> {
        self.store.cell(reference)
    }

    pub fn formula_text(&self, reference: CellRef) -> Option<&str> {
        self.store.cell(reference).map(|cell| cell.formula.text.as_str())
    }

    /// Cached cells inside `selection`, in no particular order. A label is
    /// resolved first.
    pub fn cells(&self, selection: impl Into<Selection>) -> CellsIter<'_> {
        self.store.cells_in(self.resolve_if_label(selection.into()))
    }

    pub fn all_cells(&self) -> CellsIter<'_> {
        self.store.all_cells()
    }

    /// The rectangle `selection` covers. Whole columns or rows need the
    /// sheet's row or column count; an unresolvable label has none.
    pub fn cell_range(&self, selection: impl Into<Selection>) -> Option<CellRange> {
        let last_row = || self.store.row_count().filter(|n| *n > 0).map(|n| RowRef::new(n - 1));
        let last_column = || self.store.column_count().filter(|n| *n > 0).map(|n| ColumnRef::new(n - 1));

        match self.resolve_if_label(selection.into()) {
            Selection::Cell(cell) => Some(cell.to_range()),
            Selection::CellRange(range) => Some(range),
            Selection::Column(column) => {
                let last = last_row()?;
                Some(CellRange::new(CellRef::new(column, RowRef::new(0)), CellRef::new(column, last)))
            }
            Selection::ColumnRange(columns) => {
                let last = last_row()?;
                Some(CellRange::new(
                    CellRef::new(columns.begin(), RowRef::new(0)),
                    CellRef::new(columns.end(), last),
                ))
            }
            Selection::Row(row) => {
                let last = last_column()?;
                Some(CellRange::new(CellRef::new(ColumnRef::new(0), row), CellRef::new(last, row)))
            }
            Selection::RowRange(rows) => {
                let last = last_column()?;
                Some(CellRange::new(
                    CellRef::new(ColumnRef::new(0), rows.begin()),
                    CellRef::new(last, rows.end()),
                ))
            }
            Selection::Label(_) => None,
        }
    }

    pub fn column(&self, reference: ColumnRef) -> Option<&Column> {
        self.store.column(reference)
    }

    pub fn row(&self, reference: RowRef) -> Option<&Row> {
        self.store.row(reference)
    }

    pub fn column_width(&self, reference: ColumnRef) -> f64 {
        self.store.column_width(reference)
    }

    pub fn row_height(&self, reference: RowRef) -> f64 {
        self.store.row_height(reference)
    }

    pub fn is_column_hidden(&self, reference: ColumnRef) -> bool {
        self.store.is_column_hidden(reference)
    }

    pub fn is_row_hidden(&self, reference: RowRef) -> bool {
        self.store.is_row_hidden(reference)
    }

    pub fn column_count(&self) -> Option<u32> {
        self.store.column_count()
    }

    pub fn row_count(&self) -> Option<u32> {
        self.store.row_count()
    }

    pub fn window(&self) -> &Window {
        self.store.window()
    }

    pub fn matched_cells(&self) -> BTreeSet<CellRef> {
        self.store.matched_cells().iter().copied().collect()
    }

    pub fn is_matched(&self, reference: CellRef) -> bool {
        self.store.is_matched(reference)
    }

    // =========================================================================
    // Labels and references
    // =========================================================================

    /// Labels resolving onto `cells` (or any cell of it), sorted.
    pub fn cell_labels(&self, cells: impl Into<CellRange>) -> Vec<LabelName> {
        self.store.labels_in(&cells.into()).into_iter().collect()
    }

    /// References pointing at `target`, sorted.
    pub fn cell_references(&self, target: &ExpressionReference) -> Vec<ExpressionReference> {
        self.store
            .references_to(target)
            .map(|referrers| referrers.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Mappings whose own target touches `selection`. Chains are not followed.
    pub fn label_mappings(&self, selection: &Selection) -> Vec<LabelMapping> {
        self.store
            .label_mappings()
            .into_iter()
            .filter(|mapping| selection.intersects(&mapping.target))
            .collect()
    }

    pub fn resolve_if_label(&self, selection: Selection) -> Selection {
        resolver::resolve_if_label(&self.store, selection)
    }

    pub fn resolve_label(&self, label: &LabelName) -> LabelResolution {
        resolver::resolve_label(&self.store, label)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Formatting shared by the selected cells. Computed once per selection
    /// and store state.
    pub fn selection_summary(&self) -> Option<&SelectionSummary> {
        self.summary
            .get_or_init(|| {
                let selection = self.selection.clone()?;
                summary::summarize(self.cells(selection).map(|(_, cell)| cell))
            })
            .as_ref()
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    pub fn last_window_width(&self) -> f64 {
        geometry::window_width(
            self.store.window(),
            |c| self.store.column_width(c),
            |c| self.store.is_column_hidden(c),
        )
    }

    pub fn last_window_height(&self) -> f64 {
        geometry::window_height(
            self.store.window(),
            |r| self.store.row_height(r),
            |r| self.store.is_row_hidden(r),
        )
    }

    /// Minimap placement of `range`. Missing counts fall back to the totals
    /// the backend last sent.
    pub fn compute_thumbnail(&self, range: &CellRange, column_count: Option<u32>, row_count: Option<u32>) -> Thumbnail {
        geometry::compute_thumbnail(
            range,
            column_count.or(self.store.column_count()).unwrap_or(0),
            row_count.or(self.store.row_count()).unwrap_or(0),
        )
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            spreadsheet_id: self.store.spreadsheet_id().cloned(),
            window: self.store.window().clone(),
            window_width: self.last_window_width(),
            window_height: self.last_window_height(),
            column_count: self.store.column_count(),
            row_count: self.store.row_count(),
            cells: self.all_cells().map(|(reference, cell)| (reference, cell.clone())).collect(),
            labels: self.store.label_mappings(),
            matched_cells: self.matched_cells(),
            selection: self.selection.clone(),
            selection_summary: self.selection_summary().cloned(),
        }
    }
}

/// Serializable view of the whole cache, in stable order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub spreadsheet_id: Option<SpreadsheetId>,
    pub window: Window,
    pub window_width: f64,
    pub window_height: f64,
    pub column_count: Option<u32>,
    pub row_count: Option<u32>,
    pub cells: BTreeMap<CellRef, Cell>,
    pub labels: Vec<LabelMapping>,
    pub matched_cells: BTreeSet<CellRef>,
    pub selection: Option<Selection>,
    pub selection_summary: Option<SelectionSummary>,
}
