//! Event log replay.
//!
//! A log is JSONL: one tagged [`CacheEvent`] per line. Blank lines and lines
//! starting with `#` are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use viewgrid_core::{CellRef, LabelName, Selection};
use viewgrid_engine::{CacheOptions, CacheSnapshot, EventBus, LabelResolution, Thumbnail, ViewportCache};
use viewgrid_protocol::{CacheEvent, Cell, LabelMapping};

use crate::CliError;

pub fn read_events(path: &Path) -> Result<Vec<CacheEvent>, CliError> {
    let contents = fs::read_to_string(path).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
    parse_events(&contents).map_err(|(line, e)| {
        CliError::parse(format!("{}:{}: {}", path.display(), line, e))
            .with_hint("each line must be one JSON event, e.g. {\"event\":\"selection\",\"selection\":\"A1\"}")
    })
}

/// Parse a JSONL log. Errors carry the 1-based line number.
pub fn parse_events(contents: &str) -> Result<Vec<CacheEvent>, (usize, serde_json::Error)> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| serde_json::from_str(line).map_err(|e| (i + 1, e)))
        .collect()
}

/// Feed `events` through a bus into a fresh cache, in order.
pub fn replay(events: Vec<CacheEvent>, options: CacheOptions) -> ViewportCache {
    let bus = EventBus::new();
    let subscription = bus.subscribe();
    let mut cache = ViewportCache::new(options);

    let total = events.len();
    for event in events {
        bus.publish(event);
    }
    let applied = cache.pump(&subscription);
    log::debug!("replayed {applied}/{total} events");
    cache
}

/// What the cache knows about one reference.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    pub query: String,
    pub resolved: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    pub labels: Vec<LabelName>,
    pub mappings: Vec<LabelMapping>,
    pub cells: BTreeMap<CellRef, Cell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
}

pub fn query(cache: &ViewportCache, text: &str) -> Result<QueryReport, CliError> {
    let selection: Selection = text
        .parse()
        .map_err(|e| CliError::args(format!("--query {text:?}: {e}")))?;
    let resolved = cache.resolve_if_label(selection.clone());
    let range = cache.cell_range(resolved.clone());

    Ok(QueryReport {
        query: text.to_string(),
        resolved: resolved.to_string(),
        range: range.map(|r| r.to_string()),
        labels: range.map(|r| cache.cell_labels(r)).unwrap_or_default(),
        mappings: cache.label_mappings(&selection),
        cells: cache
            .cells(resolved)
            .map(|(reference, cell)| (reference, cell.clone()))
            .collect(),
        thumbnail: range.map(|r| cache.compute_thumbnail(&r, None, None)),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub events: usize,
    #[serde(flatten)]
    pub snapshot: CacheSnapshot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<QueryReport>,
}

pub fn resolve(cache: &ViewportCache, text: &str) -> Result<LabelResolution, CliError> {
    let label = LabelName::new(text).map_err(|e| CliError::args(format!("{text:?}: {e}")))?;
    Ok(cache.resolve_label(&label))
}
