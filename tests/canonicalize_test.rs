//! Canonicalization properties checked over correlated dumps.

use crossbeam_channel::bounded;
use lsifpack::correlate::{canonicalize, correlate_state, State};
use lsifpack::reader::read_elements;
use lsifpack::Id;
use std::io::Cursor;
use std::thread;

fn correlated(lines: &[&str]) -> State {
    let dump = lines.join("\n");
    let (tx, rx) = bounded(64);
    let handle = thread::spawn(move || read_elements(Cursor::new(dump), tx));
    let state = correlate_state(rx, "").unwrap();
    handle.join().unwrap();
    state
}

#[test]
fn test_canonicalization_is_idempotent_over_a_full_dump() {
    let mut state = correlated(&[
        r#"{"id": 1, "type": "vertex", "label": "metaData", "version": "0.4.3", "projectRoot": "file:///repo"}"#,
        r#"{"id": 2, "type": "vertex", "label": "document", "uri": "file:///repo/a.go"}"#,
        r#"{"id": 3, "type": "vertex", "label": "document", "uri": "file:///repo/a.go"}"#,
        r#"{"id": 4, "type": "vertex", "label": "resultSet"}"#,
        r#"{"id": 5, "type": "vertex", "label": "range", "start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 3}}"#,
        r#"{"id": 6, "type": "vertex", "label": "range", "start": {"line": 4, "character": 0}, "end": {"line": 4, "character": 3}}"#,
        r#"{"id": 100, "type": "edge", "label": "next", "outV": 5, "inV": 4}"#,
        r#"{"id": 101, "type": "edge", "label": "next", "outV": 6, "inV": 4}"#,
        r#"{"id": 7, "type": "vertex", "label": "referenceResult"}"#,
        r#"{"id": 8, "type": "vertex", "label": "referenceResult"}"#,
        r#"{"id": 102, "type": "edge", "label": "textDocument/references", "outV": 4, "inV": 7}"#,
        r#"{"id": 103, "type": "edge", "label": "item", "outV": 7, "inVs": [5], "document": 2}"#,
        r#"{"id": 104, "type": "edge", "label": "item", "outV": 8, "inVs": [6], "document": 3}"#,
        r#"{"id": 105, "type": "edge", "label": "item", "outV": 7, "inVs": [8], "document": 2}"#,
        r#"{"id": 9, "type": "vertex", "label": "moniker", "kind": "export", "scheme": "gomod", "identifier": "pkg.F"}"#,
        r#"{"id": 106, "type": "edge", "label": "moniker", "outV": 4, "inV": 9}"#,
        r#"{"id": 107, "type": "edge", "label": "contains", "outV": 2, "inVs": [5]}"#,
        r#"{"id": 108, "type": "edge", "label": "contains", "outV": 3, "inVs": [6]}"#,
    ]);

    canonicalize(&mut state);
    let once = state.clone();
    canonicalize(&mut state);
    assert_eq!(state, once);
}

#[test]
fn test_document_dedup_keeps_minimum_id() {
    let mut state = correlated(&[
        r#"{"id": 1, "type": "vertex", "label": "metaData", "version": "0.4.3", "projectRoot": "file:///repo"}"#,
        r#"{"id": 9, "type": "vertex", "label": "document", "uri": "file:///repo/a.go"}"#,
        r#"{"id": 2, "type": "vertex", "label": "document", "uri": "file:///repo/a.go"}"#,
        r#"{"id": 5, "type": "vertex", "label": "range", "start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 3}}"#,
        r#"{"id": 100, "type": "edge", "label": "contains", "outV": 9, "inVs": [5]}"#,
    ]);

    canonicalize(&mut state);

    assert_eq!(state.document_data.len(), 1);
    assert_eq!(state.document_data[&Id::new(2)], "a.go");
    // The contains set moved from the dropped duplicate onto the canonical id.
    assert!(state.contains.get(Id::new(2)).unwrap().contains(Id::new(5)));
    assert!(state.contains.get(Id::new(9)).is_none());
}

#[test]
fn test_next_chains_collapse_transitively() {
    let mut state = correlated(&[
        r#"{"id": 1, "type": "vertex", "label": "metaData", "version": "0.4.3", "projectRoot": "file:///repo"}"#,
        r#"{"id": 2, "type": "vertex", "label": "document", "uri": "file:///repo/a.go"}"#,
        r#"{"id": 3, "type": "vertex", "label": "range", "start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 3}}"#,
        r#"{"id": 4, "type": "vertex", "label": "resultSet"}"#,
        r#"{"id": 5, "type": "vertex", "label": "resultSet"}"#,
        r#"{"id": 100, "type": "edge", "label": "next", "outV": 3, "inV": 4}"#,
        r#"{"id": 101, "type": "edge", "label": "next", "outV": 4, "inV": 5}"#,
        r#"{"id": 6, "type": "vertex", "label": "definitionResult"}"#,
        r#"{"id": 7, "type": "vertex", "label": "hoverResult", "result": {"contents": "docs"}}"#,
        r#"{"id": 102, "type": "edge", "label": "textDocument/definition", "outV": 4, "inV": 6}"#,
        r#"{"id": 103, "type": "edge", "label": "textDocument/hover", "outV": 5, "inV": 7}"#,
        r#"{"id": 104, "type": "edge", "label": "contains", "outV": 2, "inVs": [3]}"#,
        r#"{"id": 105, "type": "edge", "label": "item", "outV": 6, "inVs": [3], "document": 2}"#,
    ]);

    canonicalize(&mut state);

    let range = &state.range_data[&Id::new(3)];
    assert_eq!(range.definition_result_id, Some(Id::new(6)));
    assert_eq!(range.hover_result_id, Some(Id::new(7)));
    assert!(state.next_data.is_empty());
}

#[test]
fn test_moniker_closure_excludes_local_monikers() {
    let mut state = correlated(&[
        r#"{"id": 1, "type": "vertex", "label": "metaData", "version": "0.4.3", "projectRoot": "file:///repo"}"#,
        r#"{"id": 2, "type": "vertex", "label": "document", "uri": "file:///repo/a.go"}"#,
        r#"{"id": 3, "type": "vertex", "label": "range", "start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 3}}"#,
        r#"{"id": 10, "type": "vertex", "label": "moniker", "kind": "local", "scheme": "gomod", "identifier": "local:1"}"#,
        r#"{"id": 11, "type": "vertex", "label": "moniker", "kind": "export", "scheme": "gomod", "identifier": "pkg.F"}"#,
        r#"{"id": 100, "type": "edge", "label": "moniker", "outV": 3, "inV": 10}"#,
        r#"{"id": 101, "type": "edge", "label": "nextMoniker", "outV": 10, "inV": 11}"#,
        r#"{"id": 102, "type": "edge", "label": "contains", "outV": 2, "inVs": [3]}"#,
    ]);

    canonicalize(&mut state);

    let attached = state.monikers.get(Id::new(3)).unwrap();
    assert!(attached.contains(Id::new(11)));
    assert!(!attached.contains(Id::new(10)));
}

#[test]
fn test_reference_result_merge_unions_location_sets() {
    let mut state = correlated(&[
        r#"{"id": 1, "type": "vertex", "label": "metaData", "version": "0.4.3", "projectRoot": "file:///repo"}"#,
        r#"{"id": 2, "type": "vertex", "label": "document", "uri": "file:///repo/a.go"}"#,
        r#"{"id": 3, "type": "vertex", "label": "range", "start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 3}}"#,
        r#"{"id": 4, "type": "vertex", "label": "range", "start": {"line": 2, "character": 0}, "end": {"line": 2, "character": 3}}"#,
        r#"{"id": 30, "type": "vertex", "label": "referenceResult"}"#,
        r#"{"id": 31, "type": "vertex", "label": "referenceResult"}"#,
        r#"{"id": 100, "type": "edge", "label": "textDocument/references", "outV": 3, "inV": 30}"#,
        r#"{"id": 101, "type": "edge", "label": "textDocument/references", "outV": 4, "inV": 31}"#,
        r#"{"id": 102, "type": "edge", "label": "item", "outV": 30, "inVs": [3], "document": 2}"#,
        r#"{"id": 103, "type": "edge", "label": "item", "outV": 31, "inVs": [4], "document": 2}"#,
        r#"{"id": 104, "type": "edge", "label": "item", "outV": 31, "inVs": [30], "document": 2}"#,
        r#"{"id": 105, "type": "edge", "label": "contains", "outV": 2, "inVs": [3, 4]}"#,
    ]);

    canonicalize(&mut state);

    assert!(state.reference_data.contains_key(&Id::new(30)));
    assert!(!state.reference_data.contains_key(&Id::new(31)));
    let merged = state.reference_data[&Id::new(30)].get(Id::new(2)).unwrap();
    assert!(merged.contains(Id::new(3)));
    assert!(merged.contains(Id::new(4)));
    assert_eq!(state.range_data[&Id::new(3)].reference_result_id, Some(Id::new(30)));
    assert_eq!(state.range_data[&Id::new(4)].reference_result_id, Some(Id::new(30)));
}
