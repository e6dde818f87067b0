//! Flattener: a document back into rows whose headers use the column grammar.
//!
//! This is the inverse of schema building plus assembly. Every leaf becomes
//! one column; the header is rendered so that classifying it reproduces the
//! leaf's path and format. Structures deeper than the grammar can address are
//! rejected rather than silently dropped.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::{
    assemble::{Rows, TableResult},
    error::{Error, Result},
    header::{ColumnKind, KeyType, ScalarType, ValueFormat, is_identifier, render_header},
    schema::TableSchema,
    tree::{Node, PathSegment, ScalarFormat, display_path},
};

/// Flattens `result` into a header row plus one row per entry.
///
/// The first column is a synthesized key named after `key_name`: numeric
/// positions for sequences, the mapping keys for keyed tables. When a record
/// already uses that name, `K` is appended until the name is free.
///
/// Every field must keep one shape across rows, otherwise the header row
/// could not be read back. An empty string leaf becomes an empty cell and so
/// reads back as absent.
pub fn flatten(result: &TableResult, key_name: &str) -> Result<Rows> {
    if !is_identifier(key_name) {
        return Err(Error::value(format!(
            "key name '{key_name}' is not a valid column identifier"
        )));
    }

    let entries = result.entries();
    let mut used_names = HashSet::new();
    for (address, row) in &entries {
        let fields = row.as_record().ok_or_else(|| {
            Error::value(format!(
                "row {address} is a {}, expected a record",
                row.kind_name()
            ))
        })?;
        used_names.extend(fields.keys().map(String::as_str));
    }
    let mut key_field = key_name.to_string();
    while used_names.contains(key_field.as_str()) {
        key_field.push('K');
    }
    let key_kind = match result {
        TableResult::Sequence(_) => KeyType::Number,
        TableResult::Keyed(_) => KeyType::String,
    };

    let mut headers: IndexMap<String, usize> = IndexMap::new();
    headers.insert(render_header(&key_field, ColumnKind::Key(key_kind), &[], None), 0);

    let mut placed = Vec::with_capacity(entries.len());
    for (address, row) in &entries {
        let mut cells = Vec::new();
        if let Some(fields) = row.as_record() {
            for (name, node) in fields {
                flatten_field(name, node, &mut cells)?;
            }
        }
        let mut positioned = vec![(0, address.clone())];
        for (header, value) in cells {
            let next = headers.len();
            let column = *headers.entry(header).or_insert(next);
            positioned.push((column, value));
        }
        placed.push(positioned);
    }

    let header_row = headers.keys().collect::<Vec<_>>();
    TableSchema::build(&header_row).map_err(|err| match err {
        Error::Schema(message) => {
            Error::value(format!("rows disagree on the shape of a field: {message}"))
        }
        other => other,
    })?;

    let width = headers.len();
    let mut rows = Vec::with_capacity(placed.len() + 1);
    rows.push(headers.into_keys().collect::<Vec<_>>());
    for positioned in placed {
        let mut row = vec![String::new(); width];
        for (column, value) in positioned {
            row[column] = value;
        }
        rows.push(row);
    }
    Ok(rows)
}

fn flatten_field(name: &str, node: &Node, cells: &mut Vec<(String, String)>) -> Result<()> {
    if !is_identifier(name) {
        return Err(Error::value(format!(
            "field '{name}' cannot be written as a column header"
        )));
    }
    match node {
        Node::Scalar(scalar) => {
            let kind = match scalar.format {
                ScalarFormat::Number => ColumnKind::Scalar(ScalarType::Number),
                ScalarFormat::String => ColumnKind::Scalar(ScalarType::String),
                ScalarFormat::Bool => ColumnKind::Scalar(ScalarType::Bool),
                ScalarFormat::Raw => ColumnKind::List,
            };
            cells.push((render_header(name, kind, &[], None), scalar.raw.clone()));
            Ok(())
        }
        Node::Array(_) | Node::Record(_) => {
            let mut path = Vec::new();
            flatten_nested(name, &mut path, node, cells)
        }
    }
}

fn flatten_nested(
    name: &str,
    path: &mut Vec<PathSegment>,
    node: &Node,
    cells: &mut Vec<(String, String)>,
) -> Result<()> {
    match node {
        Node::Scalar(scalar) => {
            let kind = ColumnKind::for_path(path).ok_or_else(|| {
                Error::value(format!(
                    "{name}{} is nested too deeply to be expressed as a column header",
                    display_path(path)
                ))
            })?;
            let annotation = (ScalarFormat::infer(&scalar.raw) != scalar.format)
                .then(|| ValueFormat::from_scalar_format(scalar.format));
            cells.push((
                render_header(name, kind, path, annotation.as_ref()),
                scalar.raw.clone(),
            ));
        }
        Node::Array(slots) => {
            for (idx, child) in slots {
                path.push(PathSegment::Index(*idx));
                flatten_nested(name, path, child, cells)?;
                path.pop();
            }
        }
        Node::Record(fields) => {
            for (field, child) in fields {
                if !is_identifier(field) {
                    return Err(Error::value(format!(
                        "field '{field}' under '{name}' cannot be written as a column header"
                    )));
                }
                path.push(PathSegment::Field(field.clone()));
                flatten_nested(name, path, child, cells)?;
                path.pop();
            }
        }
    }
    Ok(())
}
