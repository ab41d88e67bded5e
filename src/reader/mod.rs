//! Line-oriented reader for LSIF dumps.
//!
//! A dump is a stream of JSON records, one per line, each a vertex or an edge.
//! The serde model here mirrors the wire format exactly; translation into the
//! working graph happens in [`crate::correlate`]. The reader runs on its own
//! thread and feeds a bounded channel, so parsing overlaps correlation and a
//! dropped receiver cancels the whole read.

use crate::types::{Diagnostic, Id, Position};
use crossbeam_channel::Sender;
use serde::Deserialize;
use std::io::BufRead;
use thiserror::Error;

/// A parse failure, carrying the 1-based line ordinal of the offending record.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("invalid JSON on line {line}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed element on line {line}")]
    Payload {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read line {line}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// A value paired with the 1-based line it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Indexed<T> {
    pub line: usize,
    pub value: T,
}

/// One record of the dump.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Vertex {
        id: Id,
        #[serde(flatten)]
        payload: VertexPayload,
    },
    Edge {
        id: Id,
        #[serde(flatten)]
        payload: EdgePayload,
    },
}

/// Vertex payloads, tagged by the record's `label` field.
///
/// Labels the correlator does not model decode to [`VertexPayload::Unknown`]
/// rather than failing, since indexers routinely emit extension vertices.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "label")]
pub enum VertexPayload {
    #[serde(rename = "metaData")]
    MetaData {
        version: String,
        #[serde(rename = "projectRoot")]
        project_root: String,
    },
    #[serde(rename = "document")]
    Document { uri: String },
    #[serde(rename = "range")]
    Range { start: Position, end: Position },
    #[serde(rename = "resultSet")]
    ResultSet,
    #[serde(rename = "definitionResult")]
    DefinitionResult,
    #[serde(rename = "referenceResult")]
    ReferenceResult,
    #[serde(rename = "hoverResult")]
    HoverResult { result: HoverPayload },
    #[serde(rename = "moniker")]
    Moniker {
        kind: Option<String>,
        scheme: String,
        identifier: String,
    },
    #[serde(rename = "packageInformation")]
    PackageInformation {
        name: String,
        version: Option<String>,
    },
    #[serde(rename = "diagnosticResult")]
    DiagnosticResult { result: Vec<DiagnosticPayload> },
    #[serde(other)]
    Unknown,
}

/// Edge payloads, tagged by `label`. Unknown edge labels are ignored by the
/// correlator, so they decode to [`EdgePayload::Unknown`] too.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "label")]
pub enum EdgePayload {
    #[serde(rename = "contains")]
    Contains(FanOutEdge),
    #[serde(rename = "item")]
    Item(ItemEdge),
    #[serde(rename = "next")]
    Next(SingleEdge),
    #[serde(rename = "moniker")]
    Moniker(SingleEdge),
    #[serde(rename = "nextMoniker")]
    NextMoniker(SingleEdge),
    #[serde(rename = "packageInformation")]
    PackageInformation(SingleEdge),
    #[serde(rename = "textDocument/definition")]
    Definition(SingleEdge),
    #[serde(rename = "textDocument/references")]
    References(SingleEdge),
    #[serde(rename = "textDocument/hover")]
    Hover(SingleEdge),
    #[serde(rename = "textDocument/diagnostic")]
    Diagnostic(SingleEdge),
    #[serde(other)]
    Unknown,
}

/// An edge with a single target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SingleEdge {
    #[serde(rename = "outV")]
    pub out_v: Id,
    #[serde(rename = "inV")]
    pub in_v: Id,
}

/// An edge fanning out to multiple targets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FanOutEdge {
    #[serde(rename = "outV")]
    pub out_v: Id,
    #[serde(rename = "inVs")]
    pub in_vs: Vec<Id>,
}

/// An `item` edge: fan-out plus the document the items occur in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemEdge {
    #[serde(rename = "outV")]
    pub out_v: Id,
    #[serde(rename = "inVs")]
    pub in_vs: Vec<Id>,
    pub document: Id,
}

/// Hover contents as emitted on the wire: a single part or a list of parts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HoverPayload {
    pub contents: HoverContents,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HoverContents {
    Many(Vec<HoverPart>),
    One(HoverPart),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HoverPart {
    Plain(String),
    Marked { language: String, value: String },
}

impl HoverPayload {
    /// Flatten the contents into normalized markdown: code parts become
    /// fenced blocks, parts are joined with a horizontal rule, trailing
    /// whitespace is trimmed.
    pub fn text(&self) -> String {
        let parts: Vec<String> = match &self.contents {
            HoverContents::One(part) => vec![part.text()],
            HoverContents::Many(parts) => parts.iter().map(HoverPart::text).collect(),
        };
        parts
            .iter()
            .map(|part| part.trim_end())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
            .trim_end()
            .to_string()
    }
}

impl HoverPart {
    fn text(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Marked { language, value } => format!("```{language}\n{value}\n```"),
        }
    }
}

/// One diagnostic entry inside a `diagnosticResult` vertex.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagnosticPayload {
    pub severity: Option<u32>,
    #[serde(default)]
    pub code: Option<DiagnosticCode>,
    pub message: String,
    pub source: Option<String>,
    pub range: RangePayload,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RangePayload {
    pub start: Position,
    pub end: Position,
}

/// Diagnostic codes appear as strings or numbers depending on the indexer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticCode {
    Text(String),
    Number(i64),
}

impl DiagnosticCode {
    fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(value) => value.to_string(),
        }
    }
}

impl DiagnosticPayload {
    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic {
            severity: self.severity,
            code: self.code.as_ref().map(DiagnosticCode::text),
            message: self.message,
            source: self.source,
            start: self.range.start,
            end: self.range.end,
        }
    }
}

/// Parse a single line into an element, classifying failures as JSON syntax
/// versus label/payload mismatch.
fn parse_line(line: usize, text: &str) -> Result<Element, ReadError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|source| ReadError::Json { line, source })?;
    serde_json::from_value(value).map_err(|source| ReadError::Payload { line, source })
}

/// Read the dump line by line, sending each parsed element (or the first
/// error) over `tx`. Intended to run on a dedicated thread.
///
/// Stops after the first error. Also stops when the receiving side hangs up,
/// which is how correlation failure cancels an in-flight read without leaking
/// the thread.
pub fn read_elements<R: BufRead>(reader: R, tx: Sender<Result<Indexed<Element>, ReadError>>) {
    for (ordinal, line) in reader.lines().enumerate() {
        let line_no = ordinal + 1;
        let item = match line {
            Ok(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                parse_line(line_no, &text).map(|value| Indexed {
                    line: line_no,
                    value,
                })
            }
            Err(source) => Err(ReadError::Io {
                line: line_no,
                source,
            }),
        };
        let stop = item.is_err();
        if tx.send(item).is_err() {
            return;
        }
        if stop {
            return;
        }
    }
}
