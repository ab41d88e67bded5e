//! In-place normalization of a correlated [`State`].
//!
//! Four passes run in a fixed order, each assuming the previous one has
//! completed: document dedup, reference-result merge, result-set collapse,
//! range collapse. Afterwards every range carries fully resolved result ids,
//! every reference-result id in the state is union-find-canonical, and the
//! `next` map is empty. The whole procedure is idempotent.

use crate::collections::{IdSet, IdSetMap};
use crate::correlate::state::State;
use crate::types::{Id, MonikerKind};
use std::collections::{BTreeMap, HashMap};

pub fn canonicalize(state: &mut State) {
    canonicalize_documents(state);
    canonicalize_reference_results(state);
    canonicalize_result_sets(state);
    canonicalize_ranges(state);
}

/// Collapse documents sharing a path onto the numerically smallest id.
/// Contains sets, diagnostics, and per-document location sets all move onto
/// the canonical id.
fn canonicalize_documents(state: &mut State) {
    let mut by_path: BTreeMap<String, Vec<Id>> = BTreeMap::new();
    for (&id, path) in &state.document_data {
        by_path.entry(path.clone()).or_default().push(id);
    }

    for mut ids in by_path.into_values() {
        ids.sort();
        let canonical = ids[0];
        for &duplicate in &ids[1..] {
            if let Some(set) = state.contains.take(duplicate) {
                state.contains.union_into(canonical, &set);
            }
            if let Some(set) = state.diagnostics.take(duplicate) {
                state.diagnostics.union_into(canonical, &set);
            }
            for map in state.definition_data.values_mut() {
                move_document_set(map, duplicate, canonical);
            }
            for map in state.reference_data.values_mut() {
                move_document_set(map, duplicate, canonical);
            }
            state.document_data.remove(&duplicate);
        }
    }
}

fn move_document_set(map: &mut IdSetMap, from: Id, to: Id) {
    if let Some(set) = map.take(from) {
        map.union_into(to, &set);
    }
}

/// Merge each equivalence class of linked reference results onto its smallest
/// member and rewrite every pointer at a non-canonical member.
fn canonicalize_reference_results(state: &mut State) {
    let mut ids: Vec<Id> = state.reference_data.keys().copied().collect();
    ids.sort();

    let mut canonical_of: HashMap<Id, Id> = HashMap::new();
    for id in ids {
        let class = state.linked_reference_results.extract_set(id);
        let canonical = class.min().unwrap_or(id);
        if canonical == id {
            continue;
        }
        canonical_of.insert(id, canonical);
        if let Some(map) = state.reference_data.remove(&id) {
            let target = state.reference_data.entry(canonical).or_default();
            map.each(|document, set| target.union_into(document, set));
        }
    }
    if canonical_of.is_empty() {
        return;
    }

    for range in state.range_data.values_mut() {
        if let Some(id) = range.reference_result_id {
            if let Some(&canonical) = canonical_of.get(&id) {
                range.reference_result_id = Some(canonical);
            }
        }
    }
    for result_set in state.result_set_data.values_mut() {
        if let Some(id) = result_set.reference_result_id {
            if let Some(&canonical) = canonical_of.get(&id) {
                result_set.reference_result_id = Some(canonical);
            }
        }
    }
}

/// Flatten `next` chains between result sets, then replace every result set's
/// moniker set with the closure of linked monikers.
fn canonicalize_result_sets(state: &mut State) {
    let ids: Vec<Id> = state.result_set_data.keys().copied().collect();
    for &id in &ids {
        collapse_result_set(state, id);
    }
    for &id in &ids {
        replace_with_moniker_closure(state, id);
    }
}

/// Inherit from the `next` target recursively. Results are written back to
/// the state, so a chain shared by many sources is resolved once.
fn collapse_result_set(state: &mut State, id: Id) {
    let Some(next_id) = state.next_data.get(&id).copied() else {
        return;
    };
    collapse_result_set(state, next_id);

    if let Some(next) = state.result_set_data.get(&next_id).copied() {
        if let Some(result_set) = state.result_set_data.get_mut(&id) {
            if result_set.definition_result_id.is_none() {
                result_set.definition_result_id = next.definition_result_id;
            }
            if result_set.reference_result_id.is_none() {
                result_set.reference_result_id = next.reference_result_id;
            }
            if result_set.hover_result_id.is_none() {
                result_set.hover_result_id = next.hover_result_id;
            }
        }
        inherit_monikers(state, id, next_id);
    }
    state.next_data.remove(&id);
}

/// Inherit from each range's `next` result set (already collapsed), then
/// apply the same moniker-closure replacement to ranges.
fn canonicalize_ranges(state: &mut State) {
    let ids: Vec<Id> = state.range_data.keys().copied().collect();
    for &id in &ids {
        let Some(next_id) = state.next_data.get(&id).copied() else {
            continue;
        };
        if let Some(next) = state.result_set_data.get(&next_id).copied() {
            if let Some(range) = state.range_data.get_mut(&id) {
                if range.definition_result_id.is_none() {
                    range.definition_result_id = next.definition_result_id;
                }
                if range.reference_result_id.is_none() {
                    range.reference_result_id = next.reference_result_id;
                }
                if range.hover_result_id.is_none() {
                    range.hover_result_id = next.hover_result_id;
                }
            }
            inherit_monikers(state, id, next_id);
        }
        state.next_data.remove(&id);
    }
    for &id in &ids {
        replace_with_moniker_closure(state, id);
    }
}

fn inherit_monikers(state: &mut State, id: Id, from: Id) {
    if let Some(set) = state.monikers.get(from).cloned() {
        state.monikers.union_into(id, &set);
    }
}

fn replace_with_moniker_closure(state: &mut State, id: Id) {
    let Some(source) = state.monikers.get(id).cloned() else {
        return;
    };
    let gathered = gather_monikers(state, &source);
    *state.monikers.get_or_init(id) = gathered;
}

/// The transitive closure of linked monikers over `source`. Local monikers
/// carry no cross-index meaning and never propagate, so they are filtered
/// out of the closure entirely.
fn gather_monikers(state: &State, source: &IdSet) -> IdSet {
    let mut gathered = IdSet::new();
    for id in source.iter() {
        for member in state.linked_monikers.extract_set(id).iter() {
            let kind = state.moniker_data.get(&member).map(|moniker| moniker.kind);
            if kind.is_some_and(|kind| kind != MonikerKind::Local) {
                gathered.add(member);
            }
        }
    }
    gathered
}
