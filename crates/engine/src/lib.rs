//! Viewport reconciliation cache.
//!
//! Merges backend deltas into a client-side entity store and answers the
//! rendering layer's queries: cells, labels, selection summaries and window
//! geometry. Start with [`ViewportCache`].

pub mod cache;
pub mod events;
pub mod geometry;
pub mod merge;
pub mod request;
pub mod resolver;
pub mod store;
pub mod summary;

pub use cache::{CacheOptions, CacheSnapshot, ViewportCache};
pub use events::{EventBus, Subscription};
pub use geometry::Thumbnail;
pub use merge::MergeReport;
pub use request::{Collection, MergeScope, RequestTarget, UrlRules};
pub use resolver::{LabelLookup, LabelResolution, ResolutionOutcome};
pub use store::{Dimensions, EntityStore};
pub use summary::SelectionSummary;
