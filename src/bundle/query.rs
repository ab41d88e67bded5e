//! Position lookup over a materialized bundle.
//!
//! This is a convenience reader for the CLI and for tests, not part of the
//! compilation pipeline. It resolves definition/reference locations through
//! the result chunks with the same stable-id hash the grouper used to assign
//! them, so it exercises the storage contract end to end.

use crate::bundle::{GroupedBundleMaps, MonikerData, RangeData};
use crate::correlate::result_chunk_index;
use crate::types::{Location, Position};
use serde::Serialize;
use std::cmp::Reverse;

/// One range enclosing the queried position, with its results resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeQueryResult {
    pub start: Position,
    pub end: Position,
    pub definitions: Vec<Location>,
    pub references: Vec<Location>,
    pub hover: Option<String>,
    pub monikers: Vec<MonikerData>,
}

/// All ranges in `path` that enclose the zero-based position, outermost
/// first. Unknown paths and uncovered positions yield an empty list.
pub fn query(
    maps: &GroupedBundleMaps,
    path: &str,
    line: u32,
    character: u32,
) -> Vec<RangeQueryResult> {
    let Some(document) = maps.documents.get(path) else {
        return Vec::new();
    };

    let mut enclosing: Vec<&RangeData> = document
        .ranges
        .values()
        .filter(|range| contains(range, line, character))
        .collect();
    enclosing.sort_by_key(|range| {
        (
            range.start_line,
            range.start_character,
            Reverse(range.end_line),
            Reverse(range.end_character),
        )
    });

    enclosing
        .into_iter()
        .map(|range| RangeQueryResult {
            start: Position::new(range.start_line, range.start_character),
            end: Position::new(range.end_line, range.end_character),
            definitions: resolve_result(maps, range.definition_result_id.as_deref()),
            references: resolve_result(maps, range.reference_result_id.as_deref()),
            hover: range
                .hover_result_id
                .as_deref()
                .and_then(|id| document.hover_results.get(id))
                .cloned(),
            monikers: range
                .moniker_ids
                .iter()
                .filter_map(|id| document.monikers.get(id))
                .cloned()
                .collect(),
        })
        .collect()
}

/// Look a result id up in its shard and turn the stored (document, range)
/// pairs back into locations. The pairs were persisted pre-sorted, so the
/// output order is already by (path, start line, start character).
fn resolve_result(maps: &GroupedBundleMaps, result_id: Option<&str>) -> Vec<Location> {
    let Some(result_id) = result_id else {
        return Vec::new();
    };
    let index = result_chunk_index(result_id, maps.meta.num_result_chunks);
    let Some(chunk) = maps.result_chunks.get(&index) else {
        return Vec::new();
    };
    let Some(pairs) = chunk.document_id_range_ids.get(result_id) else {
        return Vec::new();
    };

    let mut locations = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let Some(path) = chunk.document_paths.get(&pair.document_id) else {
            continue;
        };
        let Some(range) = maps
            .documents
            .get(path)
            .and_then(|document| document.ranges.get(&pair.range_id))
        else {
            continue;
        };
        locations.push(Location::new(
            path.clone(),
            Position::new(range.start_line, range.start_character),
            Position::new(range.end_line, range.end_character),
        ));
    }
    locations
}

fn contains(range: &RangeData, line: u32, character: u32) -> bool {
    if line < range.start_line || line > range.end_line {
        return false;
    }
    if line == range.start_line && character < range.start_character {
        return false;
    }
    if line == range.end_line && character > range.end_character {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{
        BundleMeta, DocumentData, DocumentIdRangeId, GroupedBundleMaps, ResultChunkData,
    };
    use crate::types::MonikerKind;
    use indexmap::IndexMap;

    fn range(
        start: (u32, u32),
        end: (u32, u32),
        definition: Option<&str>,
        hover: Option<&str>,
        monikers: &[&str],
    ) -> RangeData {
        RangeData {
            start_line: start.0,
            start_character: start.1,
            end_line: end.0,
            end_character: end.1,
            definition_result_id: definition.map(str::to_string),
            reference_result_id: None,
            hover_result_id: hover.map(str::to_string),
            moniker_ids: monikers.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn sample_maps() -> GroupedBundleMaps {
        let mut document = DocumentData::default();
        // An enclosing function range and a nested identifier range.
        document
            .ranges
            .insert("10".to_string(), range((1, 0), (8, 1), None, None, &[]));
        document.ranges.insert(
            "11".to_string(),
            range((3, 4), (3, 9), Some("20"), Some("22"), &["30"]),
        );
        document
            .hover_results
            .insert("22".to_string(), "docs".to_string());
        document.monikers.insert(
            "30".to_string(),
            MonikerData {
                kind: MonikerKind::Export,
                scheme: "gomod".to_string(),
                identifier: "pkg.F".to_string(),
                package_information_id: None,
            },
        );

        let mut documents = IndexMap::new();
        documents.insert("a.go".to_string(), document);

        let mut chunk = ResultChunkData::default();
        chunk
            .document_paths
            .insert("2".to_string(), "a.go".to_string());
        chunk.document_id_range_ids.insert(
            "20".to_string(),
            vec![DocumentIdRangeId {
                document_id: "2".to_string(),
                range_id: "11".to_string(),
            }],
        );
        let mut result_chunks = IndexMap::new();
        result_chunks.insert(0, chunk);

        GroupedBundleMaps {
            meta: BundleMeta {
                num_result_chunks: 1,
            },
            documents,
            result_chunks,
            definitions: Vec::new(),
            references: Vec::new(),
            packages: Vec::new(),
            package_references: Vec::new(),
        }
    }

    #[test]
    fn test_query_returns_enclosing_ranges_outermost_first() {
        let maps = sample_maps();
        let results = query(&maps, "a.go", 3, 5);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].start, Position::new(1, 0));
        assert_eq!(results[1].start, Position::new(3, 4));
    }

    #[test]
    fn test_query_resolves_through_result_chunks() {
        let maps = sample_maps();
        let results = query(&maps, "a.go", 3, 5);

        let inner = &results[1];
        assert_eq!(inner.definitions.len(), 1);
        assert_eq!(inner.definitions[0].path, "a.go");
        assert_eq!(inner.definitions[0].start, Position::new(3, 4));
        assert_eq!(inner.hover.as_deref(), Some("docs"));
        assert_eq!(inner.monikers.len(), 1);
        assert_eq!(inner.monikers[0].identifier, "pkg.F");
    }

    #[test]
    fn test_query_unknown_path_and_uncovered_position() {
        let maps = sample_maps();
        assert!(query(&maps, "missing.go", 3, 5).is_empty());
        assert!(query(&maps, "a.go", 20, 0).is_empty());
    }
}
