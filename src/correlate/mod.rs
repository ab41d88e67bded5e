//! The compilation pipeline: Reader -> Correlator -> Canonicalizer ->
//! Pruner -> Grouper.
//!
//! Each stage exclusively owns the [`State`] it mutates. The reader runs on
//! its own thread behind a bounded channel; every later stage runs on the
//! caller's thread until grouping fans out into producer threads of its own.

pub mod canonicalize;
pub mod correlator;
pub mod error;
pub mod group;
pub mod prune;
pub mod state;

use crate::bundle::GroupedBundleChans;
use crate::reader::read_elements;
use crossbeam_channel::bounded;
use std::io::BufRead;
use std::thread;

pub use canonicalize::canonicalize;
pub use correlator::correlate_state;
pub use error::{CorrelateError, CorrelateResult};
pub use group::{group_bundle_data, num_result_chunks, result_chunk_index};
pub use prune::{fs_directory_children, prune, DirectoryChildren};
pub use state::State;

/// Default bound on the reader channel. Keeps the reader from racing far
/// ahead of correlation on large dumps while still amortizing thread
/// wakeups.
pub const READER_CHANNEL_CAPACITY: usize = 512;

/// Run the full pipeline over an LSIF dump and return the streaming bundle.
///
/// `root` is the dump-relative root the document paths are resolved against;
/// `checker` supplies path existence (see [`prune`]). Any stage failure
/// cancels the reader thread by dropping the channel receiver.
pub fn correlate<R, F>(
    reader: R,
    dump_id: u64,
    root: &str,
    checker: F,
) -> CorrelateResult<GroupedBundleChans>
where
    R: BufRead + Send + 'static,
    F: FnOnce(&std::collections::BTreeSet<String>) -> std::io::Result<DirectoryChildren>,
{
    correlate_with_capacity(reader, dump_id, root, checker, READER_CHANNEL_CAPACITY)
}

/// [`correlate`] with an explicit reader channel bound, for callers that
/// tune it through configuration.
pub fn correlate_with_capacity<R, F>(
    reader: R,
    dump_id: u64,
    root: &str,
    checker: F,
    capacity: usize,
) -> CorrelateResult<GroupedBundleChans>
where
    R: BufRead + Send + 'static,
    F: FnOnce(&std::collections::BTreeSet<String>) -> std::io::Result<DirectoryChildren>,
{
    let (tx, rx) = bounded(capacity.max(1));
    thread::spawn(move || read_elements(reader, tx));

    let mut state = correlate_state(rx, root)?;
    canonicalize(&mut state);
    prune(&mut state, checker)?;
    group_bundle_data(state, dump_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap, HashSet};
    use std::io::Cursor;

    fn everything_exists(
        directories: &BTreeSet<String>,
    ) -> std::io::Result<DirectoryChildren> {
        let mut children = HashMap::new();
        for directory in directories {
            children.insert(
                directory.clone(),
                HashSet::from([if directory.is_empty() {
                    "main.go".to_string()
                } else {
                    format!("{directory}/main.go")
                }]),
            );
        }
        Ok(children)
    }

    fn dump() -> String {
        [
            r#"{"id": 1, "type": "vertex", "label": "metaData", "version": "0.4.3", "projectRoot": "file:///repo"}"#,
            r#"{"id": 2, "type": "vertex", "label": "document", "uri": "file:///repo/main.go"}"#,
            r#"{"id": 3, "type": "vertex", "label": "range", "start": {"line": 1, "character": 2}, "end": {"line": 1, "character": 5}}"#,
            r#"{"id": 4, "type": "vertex", "label": "definitionResult"}"#,
            r#"{"id": 5, "type": "edge", "label": "textDocument/definition", "outV": 3, "inV": 4}"#,
            r#"{"id": 6, "type": "edge", "label": "item", "outV": 4, "inVs": [3], "document": 2}"#,
            r#"{"id": 7, "type": "edge", "label": "contains", "outV": 2, "inVs": [3]}"#,
        ]
        .join("\n")
    }

    #[test]
    fn test_pipeline_produces_bundle() {
        let bundle = correlate(Cursor::new(dump()), 1, "", everything_exists)
            .unwrap()
            .into_maps();

        assert_eq!(bundle.meta.num_result_chunks, 1);
        let document = &bundle.documents["main.go"];
        assert_eq!(document.ranges["3"].definition_result_id.as_deref(), Some("4"));
        let chunk = &bundle.result_chunks[&0];
        assert_eq!(chunk.document_id_range_ids["4"][0].range_id, "3");
    }

    #[test]
    fn test_pipeline_surfaces_reader_errors() {
        let result = correlate(Cursor::new("{not json"), 1, "", everything_exists);
        assert!(matches!(result, Err(CorrelateError::Read(_))));
    }

    #[test]
    fn test_pipeline_surfaces_checker_errors() {
        let result = correlate(Cursor::new(dump()), 1, "", |_: &BTreeSet<String>| {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            ))
        });
        assert!(matches!(result, Err(CorrelateError::Prune(_))));
    }
}
