//! Translation of the raw element stream into a [`State`].
//!
//! Each vertex label has a handler that inserts an entry into the matching
//! state map; each edge label has a handler that mutates both endpoints,
//! validating that every referenced id already exists with the right kind.

use crate::correlate::error::{CorrelateError, CorrelateResult};
use crate::correlate::state::State;
use crate::reader::{
    EdgePayload, Element, FanOutEdge, Indexed, ItemEdge, ReadError, SingleEdge, VertexPayload,
};
use crate::types::{Id, Moniker, MonikerKind, PackageInformation, Range, ResultSet};
use crossbeam_channel::Receiver;
use tracing::debug;

/// Consume the element stream and build the raw (non-canonical) graph.
///
/// `root` is the dump-relative directory the index was produced under; it is
/// appended to the metadata project root before document URIs are rewritten.
///
/// Takes ownership of the receiver: returning early on error drops it, which
/// disconnects the channel and stops the reader thread.
pub fn correlate_state(
    rx: Receiver<Result<Indexed<Element>, ReadError>>,
    root: &str,
) -> CorrelateResult<State> {
    let mut state = State::new();
    let mut seen_metadata = false;

    for item in rx.iter() {
        let Indexed { line, value } = item?;
        match value {
            Element::Vertex { id, payload } => {
                correlate_vertex(&mut state, &mut seen_metadata, line, id, payload, root)?;
            }
            Element::Edge { id, payload } => {
                if !seen_metadata {
                    return Err(CorrelateError::MissingMetadata);
                }
                correlate_edge(&mut state, line, id, payload)?;
            }
        }
    }

    if !seen_metadata {
        return Err(CorrelateError::MissingMetadata);
    }
    Ok(state)
}

fn correlate_vertex(
    state: &mut State,
    seen_metadata: &mut bool,
    line: usize,
    id: Id,
    payload: VertexPayload,
    root: &str,
) -> CorrelateResult<()> {
    if let VertexPayload::MetaData {
        version,
        project_root,
    } = payload
    {
        if *seen_metadata {
            return Err(CorrelateError::DuplicateMetadata { line });
        }
        *seen_metadata = true;
        state.lsif_version = version;
        state.project_root = normalize_root(&project_root, root);
        return Ok(());
    }
    if !*seen_metadata {
        return Err(CorrelateError::MissingMetadata);
    }

    match payload {
        VertexPayload::MetaData { .. } => unreachable!("handled above"),
        VertexPayload::Document { uri } => {
            let path = relative_path(&state.project_root, &uri);
            state.document_data.insert(id, path);
        }
        VertexPayload::Range { start, end } => {
            state.range_data.insert(id, Range::new(start, end));
        }
        VertexPayload::ResultSet => {
            state.result_set_data.insert(id, ResultSet::default());
        }
        VertexPayload::DefinitionResult => {
            state.definition_data.insert(id, Default::default());
        }
        VertexPayload::ReferenceResult => {
            state.reference_data.insert(id, Default::default());
        }
        VertexPayload::HoverResult { result } => {
            state.hover_data.insert(id, result.text());
        }
        VertexPayload::Moniker {
            kind,
            scheme,
            identifier,
        } => {
            state.moniker_data.insert(
                id,
                Moniker {
                    kind: MonikerKind::parse(kind.as_deref()),
                    scheme,
                    identifier,
                    package_information_id: None,
                },
            );
        }
        VertexPayload::PackageInformation { name, version } => {
            state
                .package_information_data
                .insert(id, PackageInformation { name, version });
        }
        VertexPayload::DiagnosticResult { result } => {
            let diagnostics = result
                .into_iter()
                .map(|payload| payload.into_diagnostic())
                .collect();
            state.diagnostic_data.insert(id, diagnostics);
        }
        VertexPayload::Unknown => {
            state.unsupported_vertices.add(id);
        }
    }
    Ok(())
}

fn correlate_edge(
    state: &mut State,
    line: usize,
    id: Id,
    payload: EdgePayload,
) -> CorrelateResult<()> {
    match payload {
        EdgePayload::Contains(edge) => correlate_contains(state, line, id, edge),
        EdgePayload::Item(edge) => correlate_item(state, line, id, edge),
        EdgePayload::Next(edge) => correlate_next(state, line, id, edge),
        EdgePayload::Moniker(edge) => correlate_moniker(state, line, id, edge),
        EdgePayload::NextMoniker(edge) => correlate_next_moniker(state, line, id, edge),
        EdgePayload::PackageInformation(edge) => {
            correlate_package_information(state, line, id, edge)
        }
        EdgePayload::Definition(edge) => correlate_result_edge(
            state,
            line,
            id,
            edge,
            ResultKind::Definition,
        ),
        EdgePayload::References(edge) => correlate_result_edge(
            state,
            line,
            id,
            edge,
            ResultKind::Reference,
        ),
        EdgePayload::Hover(edge) => correlate_result_edge(state, line, id, edge, ResultKind::Hover),
        EdgePayload::Diagnostic(edge) => correlate_diagnostic(state, line, id, edge),
        EdgePayload::Unknown => Ok(()),
    }
}

fn malformed(line: usize, id: Id, references: Id, expected: &'static str) -> CorrelateError {
    CorrelateError::MalformedReference {
        line,
        id,
        references,
        expected,
    }
}

/// Bind ranges to their containing document. The project vertex also emits
/// `contains` edges, so a non-document source is skipped rather than rejected.
fn correlate_contains(
    state: &mut State,
    line: usize,
    id: Id,
    edge: FanOutEdge,
) -> CorrelateResult<()> {
    if !state.document_data.contains_key(&edge.out_v) {
        return Ok(());
    }
    for in_v in edge.in_vs {
        if !state.range_data.contains_key(&in_v) {
            return Err(malformed(line, id, in_v, "range"));
        }
        state.contains.add(edge.out_v, in_v);
    }
    Ok(())
}

/// Attach result locations. Definition results take ranges only; reference
/// results additionally accept other reference results, which links the two
/// for merging during canonicalization.
fn correlate_item(state: &mut State, line: usize, id: Id, edge: ItemEdge) -> CorrelateResult<()> {
    if !state.document_data.contains_key(&edge.document) {
        return Err(malformed(line, id, edge.document, "document"));
    }

    if state.definition_data.contains_key(&edge.out_v) {
        for in_v in edge.in_vs {
            if state.range_data.contains_key(&in_v) {
                if let Some(map) = state.definition_data.get_mut(&edge.out_v) {
                    map.add(edge.document, in_v);
                }
            } else if state.unsupported_vertices.contains(in_v) {
                debug!(vertex = %in_v, "dropping item edge into unsupported vertex");
            } else {
                return Err(malformed(line, id, in_v, "range"));
            }
        }
        return Ok(());
    }

    if state.reference_data.contains_key(&edge.out_v) {
        for in_v in edge.in_vs {
            if state.range_data.contains_key(&in_v) {
                if let Some(map) = state.reference_data.get_mut(&edge.out_v) {
                    map.add(edge.document, in_v);
                }
            } else if state.reference_data.contains_key(&in_v) {
                state.linked_reference_results.link(edge.out_v, in_v);
            } else if state.unsupported_vertices.contains(in_v) {
                debug!(vertex = %in_v, "dropping item edge into unsupported vertex");
            } else {
                return Err(malformed(line, id, in_v, "range or reference result"));
            }
        }
        return Ok(());
    }

    Err(malformed(
        line,
        id,
        edge.out_v,
        "definition or reference result",
    ))
}

fn correlate_next(state: &mut State, line: usize, id: Id, edge: SingleEdge) -> CorrelateResult<()> {
    if !state.range_data.contains_key(&edge.out_v)
        && !state.result_set_data.contains_key(&edge.out_v)
    {
        return Err(malformed(line, id, edge.out_v, "range or result set"));
    }
    if !state.result_set_data.contains_key(&edge.in_v) {
        return Err(malformed(line, id, edge.in_v, "result set"));
    }
    state.next_data.insert(edge.out_v, edge.in_v);
    Ok(())
}

fn correlate_moniker(
    state: &mut State,
    line: usize,
    id: Id,
    edge: SingleEdge,
) -> CorrelateResult<()> {
    if !state.range_data.contains_key(&edge.out_v)
        && !state.result_set_data.contains_key(&edge.out_v)
    {
        return Err(malformed(line, id, edge.out_v, "range or result set"));
    }
    if !state.moniker_data.contains_key(&edge.in_v) {
        return Err(malformed(line, id, edge.in_v, "moniker"));
    }
    state.monikers.add(edge.out_v, edge.in_v);
    Ok(())
}

fn correlate_next_moniker(
    state: &mut State,
    line: usize,
    id: Id,
    edge: SingleEdge,
) -> CorrelateResult<()> {
    for endpoint in [edge.out_v, edge.in_v] {
        if !state.moniker_data.contains_key(&endpoint) {
            return Err(malformed(line, id, endpoint, "moniker"));
        }
    }
    state.linked_monikers.link(edge.out_v, edge.in_v);
    Ok(())
}

fn correlate_package_information(
    state: &mut State,
    line: usize,
    id: Id,
    edge: SingleEdge,
) -> CorrelateResult<()> {
    if !state.package_information_data.contains_key(&edge.in_v) {
        return Err(malformed(line, id, edge.in_v, "package information"));
    }
    let Some(moniker) = state.moniker_data.get_mut(&edge.out_v) else {
        return Err(malformed(line, id, edge.out_v, "moniker"));
    };
    moniker.package_information_id = Some(edge.in_v);
    match moniker.kind {
        MonikerKind::Import => {
            state.imported_monikers.add(edge.out_v);
        }
        MonikerKind::Export => {
            state.exported_monikers.add(edge.out_v);
        }
        MonikerKind::Local => {}
    }
    Ok(())
}

enum ResultKind {
    Definition,
    Reference,
    Hover,
}

/// Attach a definition/reference/hover result id to a range or result set.
fn correlate_result_edge(
    state: &mut State,
    line: usize,
    id: Id,
    edge: SingleEdge,
    kind: ResultKind,
) -> CorrelateResult<()> {
    let (present, expected) = match kind {
        ResultKind::Definition => (
            state.definition_data.contains_key(&edge.in_v),
            "definition result",
        ),
        ResultKind::Reference => (
            state.reference_data.contains_key(&edge.in_v),
            "reference result",
        ),
        ResultKind::Hover => (state.hover_data.contains_key(&edge.in_v), "hover result"),
    };
    if !present {
        return Err(malformed(line, id, edge.in_v, expected));
    }

    if let Some(range) = state.range_data.get_mut(&edge.out_v) {
        match kind {
            ResultKind::Definition => range.definition_result_id = Some(edge.in_v),
            ResultKind::Reference => range.reference_result_id = Some(edge.in_v),
            ResultKind::Hover => range.hover_result_id = Some(edge.in_v),
        }
        return Ok(());
    }
    if let Some(result_set) = state.result_set_data.get_mut(&edge.out_v) {
        match kind {
            ResultKind::Definition => result_set.definition_result_id = Some(edge.in_v),
            ResultKind::Reference => result_set.reference_result_id = Some(edge.in_v),
            ResultKind::Hover => result_set.hover_result_id = Some(edge.in_v),
        }
        return Ok(());
    }
    Err(malformed(line, id, edge.out_v, "range or result set"))
}

fn correlate_diagnostic(
    state: &mut State,
    line: usize,
    id: Id,
    edge: SingleEdge,
) -> CorrelateResult<()> {
    if !state.document_data.contains_key(&edge.out_v) {
        return Err(malformed(line, id, edge.out_v, "document"));
    }
    if !state.diagnostic_data.contains_key(&edge.in_v) {
        return Err(malformed(line, id, edge.in_v, "diagnostic result"));
    }
    state.diagnostics.add(edge.out_v, edge.in_v);
    Ok(())
}

/// Normalize the metadata project root: trailing slash, then the
/// dump-relative root appended (also slash-terminated).
fn normalize_root(project_root: &str, dump_root: &str) -> String {
    let mut normalized = project_root.trim_end_matches('/').to_string();
    normalized.push('/');
    let dump_root = dump_root.trim_matches('/');
    if !dump_root.is_empty() {
        normalized.push_str(dump_root);
        normalized.push('/');
    }
    normalized
}

/// Rewrite a document URI relative to the project root. URIs outside the
/// root produce `../`-prefixed paths, which survive correlation but are
/// dropped at grouping.
fn relative_path(root: &str, uri: &str) -> String {
    if let Some(stripped) = uri.strip_prefix(root) {
        return stripped.to_string();
    }
    let root_parts: Vec<&str> = root.trim_end_matches('/').split('/').collect();
    let uri_parts: Vec<&str> = uri.split('/').collect();
    let common = root_parts
        .iter()
        .zip(uri_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<&str> = vec![".."; root_parts.len() - common];
    parts.extend(&uri_parts[common..]);
    parts.join("/")
}
