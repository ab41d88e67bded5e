//! Conversion of a canonical, pruned [`State`] into the grouped bundle.
//!
//! Four producer threads share the state read-only behind an `Arc`, each
//! writing to its own unbounded channel: documents, result chunks, definition
//! monikers, reference monikers. Every producer closes its channel by
//! dropping the sender when it finishes, including when the consumer hangs
//! up early. Package summaries are derived synchronously before the threads
//! start so filter encoding failures surface as errors rather than dying
//! inside a producer.

use crate::bundle::{
    BundleMeta, DocumentData, DocumentIdRangeId, GroupedBundleChans, IndexedResultChunk,
    KeyedDocumentData, MonikerData, MonikerLocations, Package, PackageInformationData,
    PackageReference, RangeData, ResultChunkData,
};
use crate::collections::{IdSet, IdSetMap, IdentifierFilter};
use crate::correlate::error::CorrelateResult;
use crate::correlate::state::State;
use crate::types::{Id, Location, Range};
use crossbeam_channel::unbounded;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Target number of results per chunk; the chunk count scales with index
/// size up to [`MAX_NUM_RESULT_CHUNKS`].
pub const RESULTS_PER_RESULT_CHUNK: usize = 500;
pub const MAX_NUM_RESULT_CHUNKS: usize = 1000;

/// Group the canonical state into the streaming bundle shape.
pub fn group_bundle_data(state: State, dump_id: u64) -> CorrelateResult<GroupedBundleChans> {
    let meta = BundleMeta {
        num_result_chunks: num_result_chunks(&state),
    };
    let packages = derive_packages(&state, dump_id);
    let package_references = derive_package_references(&state, dump_id)?;
    debug!(
        documents = state.document_data.len(),
        results = state.result_count(),
        chunks = meta.num_result_chunks,
        "grouping bundle"
    );

    let state = Arc::new(state);
    let (documents_tx, documents) = unbounded();
    let (result_chunks_tx, result_chunks) = unbounded();
    let (definitions_tx, definitions) = unbounded();
    let (references_tx, references) = unbounded();

    let documents_state = Arc::clone(&state);
    thread::spawn(move || {
        let mut ids: Vec<Id> = documents_state.document_data.keys().copied().collect();
        ids.sort();
        for id in ids {
            let Some(path) = documents_state.document_data.get(&id) else {
                continue;
            };
            if path.starts_with("..") {
                continue;
            }
            let document = serialize_document(&documents_state, id);
            let keyed = KeyedDocumentData {
                path: path.clone(),
                document,
            };
            if documents_tx.send(keyed).is_err() {
                return;
            }
        }
    });

    let chunks_state = Arc::clone(&state);
    let chunk_count = meta.num_result_chunks;
    thread::spawn(move || {
        for indexed in serialize_result_chunks(&chunks_state, chunk_count) {
            if result_chunks_tx.send(indexed).is_err() {
                return;
            }
        }
    });

    let definitions_state = Arc::clone(&state);
    thread::spawn(move || {
        let entries = moniker_locations(&definitions_state, &definitions_state.definition_data, |range| {
            range.definition_result_id
        });
        for entry in entries {
            if definitions_tx.send(entry).is_err() {
                return;
            }
        }
    });

    let references_state = Arc::clone(&state);
    thread::spawn(move || {
        let entries = moniker_locations(&references_state, &references_state.reference_data, |range| {
            range.reference_result_id
        });
        for entry in entries {
            if references_tx.send(entry).is_err() {
                return;
            }
        }
    });

    Ok(GroupedBundleChans {
        meta,
        documents,
        result_chunks,
        definitions,
        references,
        packages,
        package_references,
    })
}

/// Chunk count scaled to the number of results, always within
/// `[1, MAX_NUM_RESULT_CHUNKS]`.
pub fn num_result_chunks(state: &State) -> usize {
    (state.result_count() / RESULTS_PER_RESULT_CHUNK).clamp(1, MAX_NUM_RESULT_CHUNKS)
}

/// Shard index for a result's stable string id.
///
/// FNV-1a is bit-stable across platforms and releases, which the storage
/// contract requires: a reader compiled years later must hash a result id to
/// the same chunk the writer did.
pub fn result_chunk_index(stable_id: &str, num_result_chunks: usize) -> usize {
    (fnv1a(stable_id) % num_result_chunks as u64) as usize
}

fn fnv1a(value: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in value.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    hash
}

/// Build the persisted record for one document: range table, hover table,
/// moniker and package-information tables gathered from the ranges, and the
/// document's diagnostics. All keys are stable string ids.
fn serialize_document(state: &State, document_id: Id) -> DocumentData {
    let mut document = DocumentData::default();
    let mut hover_ids = BTreeSet::new();
    let mut moniker_ids = BTreeSet::new();

    if let Some(range_ids) = state.contains.get(document_id) {
        for range_id in range_ids.iter() {
            let Some(range) = state.range_data.get(&range_id) else {
                continue;
            };
            let attached: Vec<Id> = state
                .monikers
                .get(range_id)
                .map(IdSet::to_vec)
                .unwrap_or_default();
            moniker_ids.extend(attached.iter().copied());
            if let Some(hover_id) = range.hover_result_id {
                hover_ids.insert(hover_id);
            }
            document.ranges.insert(
                range_id.stable(),
                RangeData {
                    start_line: range.start.line,
                    start_character: range.start.character,
                    end_line: range.end.line,
                    end_character: range.end.character,
                    definition_result_id: range.definition_result_id.map(|id| id.stable()),
                    reference_result_id: range.reference_result_id.map(|id| id.stable()),
                    hover_result_id: range.hover_result_id.map(|id| id.stable()),
                    moniker_ids: attached.iter().map(Id::stable).collect(),
                },
            );
        }
    }

    for hover_id in hover_ids {
        if let Some(text) = state.hover_data.get(&hover_id) {
            document
                .hover_results
                .insert(hover_id.stable(), text.clone());
        }
    }

    let mut package_ids = BTreeSet::new();
    for moniker_id in moniker_ids {
        let Some(moniker) = state.moniker_data.get(&moniker_id) else {
            continue;
        };
        if let Some(package_id) = moniker.package_information_id {
            package_ids.insert(package_id);
        }
        document.monikers.insert(
            moniker_id.stable(),
            MonikerData {
                kind: moniker.kind,
                scheme: moniker.scheme.clone(),
                identifier: moniker.identifier.clone(),
                package_information_id: moniker.package_information_id.map(|id| id.stable()),
            },
        );
    }
    for package_id in package_ids {
        if let Some(info) = state.package_information_data.get(&package_id) {
            document.package_information.insert(
                package_id.stable(),
                PackageInformationData {
                    name: info.name.clone(),
                    version: info.version.clone(),
                },
            );
        }
    }

    if let Some(diagnostic_ids) = state.diagnostics.get(document_id) {
        for diagnostic_id in diagnostic_ids.iter() {
            if let Some(entries) = state.diagnostic_data.get(&diagnostic_id) {
                document.diagnostics.extend(entries.iter().cloned());
            }
        }
    }
    document
}

/// Assign every definition/reference result to its shard and build each
/// shard's document-path table and ordered location pairs.
fn serialize_result_chunks(state: &State, chunk_count: usize) -> Vec<IndexedResultChunk> {
    let mut chunks: BTreeMap<usize, ResultChunkData> = BTreeMap::new();
    for data in [&state.definition_data, &state.reference_data] {
        let mut ids: Vec<Id> = data.keys().copied().collect();
        ids.sort();
        for id in ids {
            let Some(map) = data.get(&id) else {
                continue;
            };
            let chunk = chunks
                .entry(result_chunk_index(&id.stable(), chunk_count))
                .or_default();

            let mut pairs: Vec<((String, u32, u32), DocumentIdRangeId)> = Vec::new();
            for document_id in map.sorted_keys() {
                let Some(path) = state.document_data.get(&document_id) else {
                    continue;
                };
                chunk
                    .document_paths
                    .entry(document_id.stable())
                    .or_insert_with(|| path.clone());
                let Some(range_ids) = map.get(document_id) else {
                    continue;
                };
                for range_id in range_ids.iter() {
                    let Some(range) = state.range_data.get(&range_id) else {
                        continue;
                    };
                    pairs.push((
                        (path.clone(), range.start.line, range.start.character),
                        DocumentIdRangeId {
                            document_id: document_id.stable(),
                            range_id: range_id.stable(),
                        },
                    ));
                }
            }
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            chunk.document_id_range_ids.insert(
                id.stable(),
                pairs.into_iter().map(|(_, pair)| pair).collect(),
            );
        }
    }
    chunks
        .into_iter()
        .map(|(index, result_chunk)| IndexedResultChunk {
            index,
            result_chunk,
        })
        .collect()
}

/// Associate each result with the monikers attached to its ranges, then
/// merge location lists per (scheme, identifier) pair.
fn moniker_locations(
    state: &State,
    data: &HashMap<Id, IdSetMap>,
    select: fn(&Range) -> Option<Id>,
) -> Vec<MonikerLocations> {
    let mut monikers_by_result: BTreeMap<Id, IdSet> = BTreeMap::new();
    for (&range_id, range) in &state.range_data {
        let Some(result_id) = select(range) else {
            continue;
        };
        if !data.contains_key(&result_id) {
            continue;
        }
        if let Some(attached) = state.monikers.get(range_id) {
            monikers_by_result
                .entry(result_id)
                .or_default()
                .union(attached);
        }
    }

    let mut grouped: BTreeMap<(String, String), Vec<Location>> = BTreeMap::new();
    for (result_id, moniker_ids) in monikers_by_result {
        let Some(map) = data.get(&result_id) else {
            continue;
        };
        let locations = resolve_locations(state, map);
        for moniker_id in moniker_ids.iter() {
            let Some(moniker) = state.moniker_data.get(&moniker_id) else {
                continue;
            };
            grouped
                .entry((moniker.scheme.clone(), moniker.identifier.clone()))
                .or_default()
                .extend(locations.iter().cloned());
        }
    }

    grouped
        .into_iter()
        .map(|((scheme, identifier), mut locations)| {
            locations.sort();
            locations.dedup();
            MonikerLocations {
                scheme,
                identifier,
                locations,
            }
        })
        .collect()
}

fn resolve_locations(state: &State, map: &IdSetMap) -> Vec<Location> {
    let mut locations = Vec::new();
    for document_id in map.sorted_keys() {
        let Some(path) = state.document_data.get(&document_id) else {
            continue;
        };
        let Some(range_ids) = map.get(document_id) else {
            continue;
        };
        for range_id in range_ids.iter() {
            if let Some(range) = state.range_data.get(&range_id) {
                locations.push(Location::new(path.clone(), range.start, range.end));
            }
        }
    }
    locations
}

/// One package entry per unique (scheme, name, version) among exported
/// monikers.
fn derive_packages(state: &State, dump_id: u64) -> Vec<Package> {
    let mut tuples = BTreeSet::new();
    for moniker_id in state.exported_monikers.iter() {
        if let Some((scheme, name, version)) = package_tuple(state, moniker_id) {
            tuples.insert((scheme, name, version));
        }
    }
    tuples
        .into_iter()
        .map(|(scheme, name, version)| Package {
            dump_id,
            scheme,
            name,
            version,
        })
        .collect()
}

/// One package-reference entry per unique tuple among imported monikers,
/// carrying a filter over every identifier imported under it.
fn derive_package_references(
    state: &State,
    dump_id: u64,
) -> CorrelateResult<Vec<PackageReference>> {
    let mut identifiers: BTreeMap<(String, String, Option<String>), Vec<String>> = BTreeMap::new();
    for moniker_id in state.imported_monikers.iter() {
        let Some(tuple) = package_tuple(state, moniker_id) else {
            continue;
        };
        let Some(moniker) = state.moniker_data.get(&moniker_id) else {
            continue;
        };
        identifiers
            .entry(tuple)
            .or_default()
            .push(moniker.identifier.clone());
    }

    let mut references = Vec::new();
    for ((scheme, name, version), identifiers) in identifiers {
        let filter = IdentifierFilter::from_identifiers(&identifiers).encode()?;
        references.push(PackageReference {
            package: Package {
                dump_id,
                scheme,
                name,
                version,
            },
            filter,
        });
    }
    Ok(references)
}

fn package_tuple(state: &State, moniker_id: Id) -> Option<(String, String, Option<String>)> {
    let moniker = state.moniker_data.get(&moniker_id)?;
    let info = state
        .package_information_data
        .get(&moniker.package_information_id?)?;
    Some((
        moniker.scheme.clone(),
        info.name.clone(),
        info.version.clone(),
    ))
}
