//! Request URL classification.
//!
//! The merge engine only needs two facts from a request: whether the response
//! resynchronizes a whole collection, and which spreadsheet it belongs to.

use percent_encoding::percent_decode_str;
use url::Url;

use viewgrid_protocol::{HttpMethod, SpreadsheetId};

/// Relative request paths are joined onto this before parsing.
const RELATIVE_BASE: &str = "http://localhost/";

/// Entity kinds a wildcard fetch can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Cells, columns and rows.
    Cells,
    /// Label mappings.
    Labels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeScope {
    /// Response replaces everything cached for one collection.
    Full(Collection),
    /// Response patches what is already cached.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub scope: MergeScope,
    pub spreadsheet_id: Option<SpreadsheetId>,
}

impl RequestTarget {
    pub fn partial() -> Self {
        Self {
            scope: MergeScope::Partial,
            spreadsheet_id: None,
        }
    }

    pub fn full(collection: Collection) -> Self {
        Self {
            scope: MergeScope::Full(collection),
            spreadsheet_id: None,
        }
    }
}

/// Path segments that carry meaning for the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRules {
    pub wildcard_segment: String,
    pub spreadsheet_segment: String,
    pub cell_segment: String,
    pub label_segment: String,
}

impl Default for UrlRules {
    fn default() -> Self {
        Self {
            wildcard_segment: "*".to_string(),
            spreadsheet_segment: "spreadsheet".to_string(),
            cell_segment: "cell".to_string(),
            label_segment: "label".to_string(),
        }
    }
}

impl UrlRules {
    /// Classify a request. Only a GET whose path ends in
    /// `<collection>/<wildcard>` is a full fetch; everything else, including
    /// unparseable URLs, merges as a partial response.
    pub fn classify(&self, method: HttpMethod, url: &str) -> RequestTarget {
        let parsed = Url::parse(url).or_else(|_| Url::parse(RELATIVE_BASE).and_then(|base| base.join(url)));
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!("unparseable request url {url:?}: {e}");
                return RequestTarget::partial();
            }
        };

        let segments: Vec<String> = parsed
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        let scope = match (method, segments.as_slice()) {
            (HttpMethod::Get, [.., collection, last]) if *last == self.wildcard_segment => {
                self.collection(collection).map_or(MergeScope::Partial, MergeScope::Full)
            }
            _ => MergeScope::Partial,
        };

        let spreadsheet_id = segments
            .windows(2)
            .find(|pair| pair[0] == self.spreadsheet_segment)
            .map(|pair| SpreadsheetId(pair[1].clone()));

        RequestTarget { scope, spreadsheet_id }
    }

    fn collection(&self, segment: &str) -> Option<Collection> {
        if segment == self.cell_segment {
            Some(Collection::Cells)
        } else if segment == self.label_segment {
            Some(Collection::Labels)
        } else {
            log::debug!("wildcard over unknown collection {segment:?}; merging as partial");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(url: &str) -> RequestTarget {
        UrlRules::default().classify(HttpMethod::Get, url)
    }

    #[test]
    fn test_wildcard_after_collection_is_full() {
        assert_eq!(classify("/api/spreadsheet/42/cell/*").scope, MergeScope::Full(Collection::Cells));
        assert_eq!(
            classify("https://host/api/spreadsheet/42/label/*?window=A1:B2").scope,
            MergeScope::Full(Collection::Labels)
        );
        assert_eq!(classify("/api/spreadsheet/42/cell/%2A").scope, MergeScope::Full(Collection::Cells));
        assert_eq!(classify("/api/spreadsheet/42/cell/*/").scope, MergeScope::Full(Collection::Cells));
    }

    #[test]
    fn test_only_get_resyncs() {
        let rules = UrlRules::default();
        for method in [HttpMethod::Delete, HttpMethod::Patch, HttpMethod::Post, HttpMethod::Put] {
            assert_eq!(rules.classify(method, "/api/spreadsheet/42/cell/*").scope, MergeScope::Partial);
        }
    }

    #[test]
    fn test_wildcard_elsewhere_is_partial() {
        assert_eq!(classify("/api/spreadsheet/42/history/*").scope, MergeScope::Partial);
        assert_eq!(classify("/api/*/cell/A1").scope, MergeScope::Partial);
        assert_eq!(classify("/*").scope, MergeScope::Partial);
    }

    #[test]
    fn test_plain_path_is_partial() {
        let target = classify("/api/spreadsheet/42/cell/A1:B2");
        assert_eq!(target.scope, MergeScope::Partial);
        assert_eq!(target.spreadsheet_id, Some(SpreadsheetId::from("42")));
    }

    #[test]
    fn test_star_inside_segment_is_not_wildcard() {
        assert_eq!(classify("/api/spreadsheet/42/cell/A*").scope, MergeScope::Partial);
        assert_eq!(classify("/api/spreadsheet/42/cell/A%2A").scope, MergeScope::Partial);
    }

    #[test]
    fn test_id_is_percent_decoded() {
        assert_eq!(
            classify("/api/spreadsheet/q3%20budget/cell/A1").spreadsheet_id,
            Some(SpreadsheetId::from("q3 budget"))
        );
        // A stray percent sign is kept as typed.
        assert_eq!(classify("/api/spreadsheet/50%/cell/A1").spreadsheet_id, Some(SpreadsheetId::from("50%")));
    }

    #[test]
    fn test_missing_id() {
        assert_eq!(classify("/api/cell/A1").spreadsheet_id, None);
        assert_eq!(classify("/api/spreadsheet/").spreadsheet_id, None);
    }

    #[test]
    fn test_custom_segments() {
        let rules = UrlRules {
            wildcard_segment: "all".to_string(),
            spreadsheet_segment: "sheets".to_string(),
            cell_segment: "cells".to_string(),
            label_segment: "names".to_string(),
        };
        let target = rules.classify(HttpMethod::Get, "/sheets/abc/cells/all");
        assert_eq!(target.scope, MergeScope::Full(Collection::Cells));
        assert_eq!(target.spreadsheet_id, Some(SpreadsheetId::from("abc")));
        assert_eq!(
            rules.classify(HttpMethod::Get, "/sheets/abc/names/all").scope,
            MergeScope::Full(Collection::Labels)
        );
        assert_eq!(rules.classify(HttpMethod::Get, "/sheets/abc/cell/all").scope, MergeScope::Partial);
    }
}
