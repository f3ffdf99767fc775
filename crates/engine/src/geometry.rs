//! Window geometry: pixel extents of the visible window and minimap placement.

use serde::Serialize;

use viewgrid_core::{CellRange, ColumnRef, RowRef};
use viewgrid_protocol::Window;

/// Total width of the distinct columns across all window ranges. A column
/// shared by two ranges counts once; hidden columns count zero.
pub fn window_width(window: &Window, width: impl Fn(ColumnRef) -> f64, hidden: impl Fn(ColumnRef) -> bool) -> f64 {
    window
        .columns()
        .into_iter()
        .filter(|column| !hidden(*column))
        .map(width)
        .sum()
}

pub fn window_height(window: &Window, height: impl Fn(RowRef) -> f64, hidden: impl Fn(RowRef) -> bool) -> f64 {
    window
        .rows()
        .into_iter()
        .filter(|row| !hidden(*row))
        .map(height)
        .sum()
}

/// Placement of a range inside the whole sheet, as fractions in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thumbnail {
    pub left: f64,
    pub width: f64,
    pub top: f64,
    pub height: f64,
}

impl Thumbnail {
    pub const FULL: Self = Self {
        left: 0.0,
        width: 1.0,
        top: 0.0,
        height: 1.0,
    };
}

/// Place `range` in a sheet of `column_count` x `row_count` cells.
///
/// An axis with a zero count spans the whole thumbnail. Parts of the range
/// past the end of the sheet are clamped away.
pub fn compute_thumbnail(range: &CellRange, column_count: u32, row_count: u32) -> Thumbnail {
    let (left, width) = span(range.begin().column.index(), range.end().column.index(), column_count);
    let (top, height) = span(range.begin().row.index(), range.end().row.index(), row_count);
    Thumbnail { left, width, top, height }
}

fn span(begin: u32, end: u32, count: u32) -> (f64, f64) {
    if count == 0 {
        return (0.0, 1.0);
    }
    let count = f64::from(count);
    let start = f64::from(begin).min(count);
    let stop = (f64::from(end) + 1.0).min(count);
    (start / count, (stop - start).max(0.0) / count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(text: &str) -> Window {
        text.parse().unwrap()
    }

    fn range(text: &str) -> CellRange {
        text.parse().unwrap()
    }

    #[test]
    fn test_overlapping_fragments_count_once() {
        let w = window("A1:B2,B1:C2");
        assert_eq!(window_width(&w, |_| 10.0, |_| false), 30.0);
        assert_eq!(window_height(&w, |_| 5.0, |_| false), 10.0);
    }

    #[test]
    fn test_hidden_columns_are_zero() {
        let w = window("A1:C1");
        let width = window_width(&w, |_| 10.0, |c| c.index() == 1);
        assert_eq!(width, 20.0);
    }

    #[test]
    fn test_empty_window() {
        assert_eq!(window_width(&Window::default(), |_| 10.0, |_| false), 0.0);
    }

    #[test]
    fn test_thumbnail_fractions() {
        let t = compute_thumbnail(&range("B3:C4"), 10, 20);
        assert_eq!(t.left, 0.1);
        assert_eq!(t.width, 0.2);
        assert_eq!(t.top, 0.1);
        assert_eq!(t.height, 0.1);
    }

    #[test]
    fn test_thumbnail_zero_counts() {
        assert_eq!(compute_thumbnail(&range("B3:C4"), 0, 0), Thumbnail::FULL);
        let t = compute_thumbnail(&range("A1:A1"), 0, 4);
        assert_eq!((t.left, t.width), (0.0, 1.0));
        assert_eq!((t.top, t.height), (0.0, 0.25));
    }

    #[test]
    fn test_thumbnail_clamps_overflow() {
        let t = compute_thumbnail(&range("C1:Z1"), 4, 1);
        assert_eq!(t.left, 0.5);
        assert_eq!(t.width, 0.5);

        let past = compute_thumbnail(&range("J1:K1"), 4, 1);
        assert_eq!(past.left, 1.0);
        assert_eq!(past.width, 0.0);
    }
}
