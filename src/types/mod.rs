use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to a vertex or edge by the source format.
///
/// The format hands out small dense integers, so identifiers double as keys
/// into the compact set structures in [`crate::collections`]. Bundle payloads
/// key entries by the string form (see [`Id::stable`]), which stays valid
/// across merges of independently numbered bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(u32);

impl Id {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// The externally-stable string form used in persisted bundles.
    pub fn stable(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A zero-based line/character position within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A range vertex: source geometry plus the result ids attached to it,
/// directly or inherited through `next` indirection during canonicalization.
/// Attached moniker ids live in the correlation state's moniker map, keyed by
/// the range id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
    pub definition_result_id: Option<Id>,
    pub reference_result_id: Option<Id>,
    pub hover_result_id: Option<Id>,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self {
            start,
            end,
            definition_result_id: None,
            reference_result_id: None,
            hover_result_id: None,
        }
    }
}

/// A result set vertex: the same result-id triple as [`Range`], used as a
/// shared indirection target for ranges of the same symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultSet {
    pub definition_result_id: Option<Id>,
    pub reference_result_id: Option<Id>,
    pub hover_result_id: Option<Id>,
}

/// Moniker kinds as declared by the source format.
///
/// Kinds other than `import`/`export` carry no cross-index meaning, so any
/// unrecognized kind folds into `Local`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonikerKind {
    Local,
    Import,
    Export,
}

impl MonikerKind {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("import") => Self::Import,
            Some("export") => Self::Export,
            _ => Self::Local,
        }
    }
}

/// A scheme-qualified symbol name usable to match symbols across
/// independently compiled indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moniker {
    pub kind: MonikerKind,
    pub scheme: String,
    pub identifier: String,
    pub package_information_id: Option<Id>,
}

/// Name and version of the package a moniker belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInformation {
    pub name: String,
    pub version: Option<String>,
}

/// A single diagnostic attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Option<u32>,
    pub code: Option<String>,
    pub message: String,
    pub source: Option<String>,
    pub start: Position,
    pub end: Position,
}

/// A resolved location in the output bundle: document path plus range
/// geometry. The derived ordering sorts by path, then start, then end, which
/// makes the (path, start line, start character) output contract fall out of
/// a plain sort.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(path: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            path: path.into(),
            start,
            end,
        }
    }

    /// Sort key for the deterministic (path, start line, start character)
    /// ordering contract on location lists.
    pub fn sort_key(&self) -> (&str, u32, u32) {
        (&self.path, self.start.line, self.start.character)
    }

    pub fn contains(&self, line: u32, character: u32) -> bool {
        if line < self.start.line || line > self.end.line {
            return false;
        }
        if line == self.start.line && character < self.start.character {
            return false;
        }
        if line == self.end.line && character > self.end.character {
            return false;
        }
        true
    }
}
