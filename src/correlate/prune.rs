//! Removal of graph entries for documents no longer present on disk.
//!
//! The index may be older than the tree being uploaded (renames, deletions
//! between indexing and upload), so paths are re-checked through an
//! externally supplied existence callback before grouping.

use crate::correlate::error::CorrelateResult;
use crate::correlate::state::State;
use crate::types::Id;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Existence callback contract: candidate directories in, the surviving file
/// paths under each directory out. Paths are relative to the project root on
/// both sides.
pub type DirectoryChildren = HashMap<String, HashSet<String>>;

/// Drop every document whose path no longer exists, along with its contains
/// set, diagnostics, and per-document location sets.
///
/// `../`-prefixed paths point outside the project and cannot be checked; they
/// are exempt here and dropped later during grouping.
pub fn prune<F>(state: &mut State, checker: F) -> CorrelateResult<()>
where
    F: FnOnce(&BTreeSet<String>) -> io::Result<DirectoryChildren>,
{
    let mut directories = BTreeSet::new();
    for path in state.document_data.values() {
        if !path.starts_with("..") {
            directories.insert(dirname(path));
        }
    }
    if directories.is_empty() {
        return Ok(());
    }
    let children = checker(&directories)?;

    let doomed: Vec<Id> = state
        .document_data
        .iter()
        .filter(|(_, path)| {
            !path.starts_with("..")
                && !children
                    .get(&dirname(path))
                    .is_some_and(|files| files.contains(*path))
        })
        .map(|(&id, _)| id)
        .collect();

    for id in doomed {
        if let Some(path) = state.document_data.remove(&id) {
            debug!(%path, "pruning document missing from disk");
        }
        state.contains.delete(id);
        state.diagnostics.delete(id);
        for map in state.definition_data.values_mut() {
            map.delete(id);
        }
        for map in state.reference_data.values_mut() {
            map.delete(id);
        }
    }
    Ok(())
}

/// An existence callback over the local filesystem rooted at `root`, used by
/// the CLI. Missing directories yield empty child sets rather than errors.
pub fn fs_directory_children(
    root: PathBuf,
) -> impl FnOnce(&BTreeSet<String>) -> io::Result<DirectoryChildren> {
    move |directories| {
        let mut children = DirectoryChildren::new();
        for directory in directories {
            let absolute = if directory.is_empty() {
                root.clone()
            } else {
                root.join(directory)
            };
            let mut files = HashSet::new();
            match std::fs::read_dir(&absolute) {
                Ok(entries) => {
                    for entry in entries {
                        let entry = entry?;
                        if entry.file_type()?.is_file() {
                            let name = entry.file_name().to_string_lossy().into_owned();
                            files.insert(if directory.is_empty() {
                                name
                            } else {
                                format!("{directory}/{name}")
                            });
                        }
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
            children.insert(directory.clone(), files);
        }
        Ok(children)
    }
}

fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(index) => path[..index].to_string(),
        None => String::new(),
    }
}
