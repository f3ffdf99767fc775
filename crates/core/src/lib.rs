//! Reference and selection types shared by the viewport cache.
//!
//! Pure value types: no store, no IO. Everything here parses from and prints
//! to the A1-style text the backend speaks on the wire.

pub mod error;
pub mod reference;
pub mod selection;
pub mod style;

pub use error::ReferenceError;
pub use reference::{CellRange, CellRef, ColumnRange, ColumnRef, LabelName, RowRange, RowRef};
pub use selection::{ExpressionReference, Selection};
pub use style::{PropertyAgreement, PropertyBag, TextStyle};
