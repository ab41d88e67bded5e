use crate::collections::{DisjointIdSet, IdSet, IdSetMap};
use crate::types::{Diagnostic, Id, Moniker, PackageInformation, Range, ResultSet};
use std::collections::HashMap;

/// The mutable working graph for one dump.
///
/// Built up by the correlator, rewritten in place by the canonicalizer and
/// pruner, then read (never written) by the grouper. Exactly one pipeline
/// invocation owns a `State`; nothing here is shared across compilations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct State {
    pub lsif_version: String,
    /// Normalized project root: trailing slash, suffixed with the
    /// dump-relative root supplied by the caller.
    pub project_root: String,

    /// Document id to path relative to the project root.
    pub document_data: HashMap<Id, String>,
    pub range_data: HashMap<Id, Range>,
    pub result_set_data: HashMap<Id, ResultSet>,

    /// Definition/reference result id to per-document range sets.
    pub definition_data: HashMap<Id, IdSetMap>,
    pub reference_data: HashMap<Id, IdSetMap>,

    /// Hover result id to normalized markdown.
    pub hover_data: HashMap<Id, String>,
    pub moniker_data: HashMap<Id, Moniker>,
    pub package_information_data: HashMap<Id, PackageInformation>,
    pub diagnostic_data: HashMap<Id, Vec<Diagnostic>>,

    /// Range/result-set id to the result set its `next` edge points at.
    /// Emptied by canonicalization.
    pub next_data: HashMap<Id, Id>,

    pub imported_monikers: IdSet,
    pub exported_monikers: IdSet,
    pub linked_monikers: DisjointIdSet,
    pub linked_reference_results: DisjointIdSet,

    /// Range/result-set id to attached moniker ids.
    pub monikers: IdSetMap,
    /// Document id to contained range ids.
    pub contains: IdSetMap,
    /// Document id to attached diagnostic-result ids.
    pub diagnostics: IdSetMap,

    /// Vertex ids whose label the correlator does not model. Edges into these
    /// are dropped instead of failing the import.
    pub unsupported_vertices: IdSet,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of definition plus reference results, which sizes the result
    /// chunk table during grouping.
    pub fn result_count(&self) -> usize {
        self.definition_data.len() + self.reference_data.len()
    }
}
