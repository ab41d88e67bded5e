//! The grouped bundle: the storage-ready output of the pipeline.
//!
//! The bundle exists in two interconvertible shapes. The channel form streams
//! elements to a persistence layer as the grouper produces them; the map form
//! is fully materialized for random access (querying, patching, JSON
//! persistence from the CLI). Conversion in either direction moves element
//! values and never deep-copies.

pub mod query;

use crate::types::{Diagnostic, Location, MonikerKind};
use crossbeam_channel::{unbounded, Receiver};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::thread;

pub use query::{query, RangeQueryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMeta {
    pub num_result_chunks: usize,
}

/// Everything persisted for one document. All keys are the externally-stable
/// string forms of the source ids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentData {
    pub ranges: IndexMap<String, RangeData>,
    pub hover_results: IndexMap<String, String>,
    pub monikers: IndexMap<String, MonikerData>,
    pub package_information: IndexMap<String, PackageInformationData>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeData {
    pub start_line: u32,
    pub start_character: u32,
    pub end_line: u32,
    pub end_character: u32,
    pub definition_result_id: Option<String>,
    pub reference_result_id: Option<String>,
    pub hover_result_id: Option<String>,
    pub moniker_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonikerData {
    pub kind: MonikerKind,
    pub scheme: String,
    pub identifier: String,
    pub package_information_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInformationData {
    pub name: String,
    pub version: Option<String>,
}

/// One hash shard of definition/reference location data. Queries for a
/// result id load only the shard its stable id hashes to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultChunkData {
    /// Document id to path, covering every document referenced by the shard.
    pub document_paths: IndexMap<String, String>,
    /// Result id to its ordered (document, range) pairs.
    pub document_id_range_ids: IndexMap<String, Vec<DocumentIdRangeId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIdRangeId {
    pub document_id: String,
    pub range_id: String,
}

/// All locations attached to one (scheme, identifier) moniker pair, sorted
/// by (path, start line, start character).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonikerLocations {
    pub scheme: String,
    pub identifier: String,
    pub locations: Vec<Location>,
}

/// A package this dump provides symbols for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub dump_id: u64,
    pub scheme: String,
    pub name: String,
    pub version: Option<String>,
}

/// A package this dump imports symbols from, with a serialized
/// [`crate::collections::IdentifierFilter`] over every imported identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReference {
    #[serde(flatten)]
    pub package: Package,
    pub filter: Vec<u8>,
}

/// A document paired with its path, as sent over the documents channel.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedDocumentData {
    pub path: String,
    pub document: DocumentData,
}

/// A result chunk paired with its shard index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedResultChunk {
    pub index: usize,
    pub result_chunk: ResultChunkData,
}

/// The streaming shape of the bundle. Each receiver's channel is closed
/// exactly once, by its producer dropping the sender; a consumer must drain
/// each receiver exactly once.
pub struct GroupedBundleChans {
    pub meta: BundleMeta,
    pub documents: Receiver<KeyedDocumentData>,
    pub result_chunks: Receiver<IndexedResultChunk>,
    pub definitions: Receiver<MonikerLocations>,
    pub references: Receiver<MonikerLocations>,
    pub packages: Vec<Package>,
    pub package_references: Vec<PackageReference>,
}

/// The materialized shape of the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedBundleMaps {
    pub meta: BundleMeta,
    pub documents: IndexMap<String, DocumentData>,
    pub result_chunks: IndexMap<usize, ResultChunkData>,
    pub definitions: Vec<MonikerLocations>,
    pub references: Vec<MonikerLocations>,
    pub packages: Vec<Package>,
    pub package_references: Vec<PackageReference>,
}

impl GroupedBundleChans {
    /// Drain every receiver into the materialized form. Element values move;
    /// nothing is copied.
    pub fn into_maps(self) -> GroupedBundleMaps {
        let mut documents = IndexMap::new();
        for keyed in self.documents.iter() {
            documents.insert(keyed.path, keyed.document);
        }
        let mut result_chunks = IndexMap::new();
        for indexed in self.result_chunks.iter() {
            result_chunks.insert(indexed.index, indexed.result_chunk);
        }
        GroupedBundleMaps {
            meta: self.meta,
            documents,
            result_chunks,
            definitions: self.definitions.iter().collect(),
            references: self.references.iter().collect(),
            packages: self.packages,
            package_references: self.package_references,
        }
    }
}

impl GroupedBundleMaps {
    /// Replay the materialized collections through channels fed by detached
    /// producer threads, restoring the streaming shape.
    pub fn into_chans(self) -> GroupedBundleChans {
        let (documents_tx, documents) = unbounded();
        let (result_chunks_tx, result_chunks) = unbounded();
        let (definitions_tx, definitions) = unbounded();
        let (references_tx, references) = unbounded();

        let document_entries = self.documents;
        thread::spawn(move || {
            for (path, document) in document_entries {
                if documents_tx
                    .send(KeyedDocumentData { path, document })
                    .is_err()
                {
                    return;
                }
            }
        });
        let chunk_entries = self.result_chunks;
        thread::spawn(move || {
            for (index, result_chunk) in chunk_entries {
                if result_chunks_tx
                    .send(IndexedResultChunk {
                        index,
                        result_chunk,
                    })
                    .is_err()
                {
                    return;
                }
            }
        });
        let definition_entries = self.definitions;
        thread::spawn(move || {
            for entry in definition_entries {
                if definitions_tx.send(entry).is_err() {
                    return;
                }
            }
        });
        let reference_entries = self.references;
        thread::spawn(move || {
            for entry in reference_entries {
                if references_tx.send(entry).is_err() {
                    return;
                }
            }
        });

        GroupedBundleChans {
            meta: self.meta,
            documents,
            result_chunks,
            definitions,
            references,
            packages: self.packages,
            package_references: self.package_references,
        }
    }
}
