//! Label resolution.
//!
//! Labels may point at other labels. Chains are walked iteratively with a
//! visited set local to each call, so a malformed cycle stops after at most
//! (distinct labels + 1) steps instead of hanging.

use rustc_hash::FxHashSet;

use viewgrid_core::{ExpressionReference, LabelName, Selection};

/// Read access to stored label mappings.
pub trait LabelLookup {
    fn label_target(&self, label: &LabelName) -> Option<&ExpressionReference>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Ended on a cell or range.
    Resolved,
    /// Ended on a label with no mapping.
    Unmapped,
    /// Revisited a label; `target` is the last label reached.
    Cycle,
}

/// Result of walking a label chain.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LabelResolution {
    pub target: ExpressionReference,
    /// Labels visited, starting with the one asked for.
    pub chain: Vec<LabelName>,
    pub outcome: ResolutionOutcome,
}

impl LabelResolution {
    pub fn is_resolved(&self) -> bool {
        self.outcome == ResolutionOutcome::Resolved
    }
}

pub fn resolve_label<L: LabelLookup + ?Sized>(lookup: &L, label: &LabelName) -> LabelResolution {
    let mut visited: FxHashSet<&LabelName> = FxHashSet::default();
    let mut chain = Vec::new();
    let mut current = label;

    loop {
        visited.insert(current);
        chain.push(current.clone());

        let Some(target) = lookup.label_target(current) else {
            return LabelResolution {
                target: ExpressionReference::Label(current.clone()),
                chain,
                outcome: ResolutionOutcome::Unmapped,
            };
        };

        match target {
            ExpressionReference::Label(next) if visited.contains(next) => {
                log::warn!("label cycle at {current} -> {next} (started from {label})");
                return LabelResolution {
                    target: ExpressionReference::Label(current.clone()),
                    chain,
                    outcome: ResolutionOutcome::Cycle,
                };
            }
            ExpressionReference::Label(next) => current = next,
            terminal => {
                return LabelResolution {
                    target: terminal.clone(),
                    chain,
                    outcome: ResolutionOutcome::Resolved,
                };
            }
        }
    }
}

/// Resolve a label selection to its final target. Anything else, an unmapped
/// label, or a cycle comes back as a (possibly different) label selection.
pub fn resolve_if_label<L: LabelLookup + ?Sized>(lookup: &L, selection: Selection) -> Selection {
    match selection {
        Selection::Label(label) => resolve_label(lookup, &label).target.into(),
        other => other,
    }
}
