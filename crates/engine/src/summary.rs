//! Selection summary: the formatting state every selected cell shares.

use serde::Serialize;

use viewgrid_core::TextStyle;
use viewgrid_protocol::{Cell, FormatterSelector, ParserSelector};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<FormatterSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser: Option<ParserSelector>,
    /// Style properties no two cells disagree on.
    pub style: TextStyle,
}

/// Summarize a set of cells. `None` when there are no cells.
///
/// Formatter and parser are kept only when every cell has the same one
/// (absent on all cells counts as agreement on nothing). Style is merged
/// property by property.
pub fn summarize<'a, I>(cells: I) -> Option<SelectionSummary>
where
    I: IntoIterator<Item = &'a Cell>,
{
    let cells: Vec<&Cell> = cells.into_iter().collect();
    if cells.is_empty() {
        return None;
    }

    Some(SelectionSummary {
        formatter: common(cells.iter().map(|c| c.formatter.as_ref())),
        parser: common(cells.iter().map(|c| c.parser.as_ref())),
        style: TextStyle::agreement(cells.iter().filter_map(|c| c.style.as_ref())),
    })
}

/// The single value every item carries, or `None` on any difference.
fn common<'a, T, I>(mut values: I) -> Option<T>
where
    T: PartialEq + Clone + 'a,
    I: Iterator<Item = Option<&'a T>>,
{
    let first = values.next()??;
    values.all(|v| v == Some(first)).then(|| first.clone())
}
