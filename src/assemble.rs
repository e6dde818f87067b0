//! Table assembler: per-row trees into a table-level document.

use indexmap::IndexMap;
use log::{debug, warn};

use crate::{
    error::{Error, Result},
    header::KeyType,
    schema::TableSchema,
    transcode::key_cell,
    tree::Node,
};

/// Rows-of-strings as exchanged with the delimited-text and spreadsheet
/// adapters. Row 0 is the header row.
pub type Rows = Vec<Vec<String>>;

/// A whole table in document form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableResult {
    /// Rows in input order; used for numeric keys and keyless tables.
    Sequence(Vec<Node>),
    /// Rows addressed by their string key.
    Keyed(IndexMap<String, Node>),
}

impl TableResult {
    pub fn len(&self) -> usize {
        match self {
            TableResult::Sequence(rows) => rows.len(),
            TableResult::Keyed(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row trees paired with their address: 1-based position or key.
    pub fn entries(&self) -> Vec<(String, &Node)> {
        match self {
            TableResult::Sequence(rows) => rows
                .iter()
                .enumerate()
                .map(|(idx, row)| ((idx + 1).to_string(), row))
                .collect(),
            TableResult::Keyed(rows) => rows.iter().map(|(key, row)| (key.clone(), row)).collect(),
        }
    }
}

/// Builds the schema from row 0 and assembles the remaining rows.
pub fn parse_table<S: AsRef<str>>(rows: &[Vec<S>]) -> Result<TableResult> {
    let Some((header_row, data_rows)) = rows.split_first() else {
        return Err(Error::schema("table has no header row"));
    };
    let schema = TableSchema::build(header_row)?;
    assemble(&schema, data_rows)
}

/// Assembles data rows (header excluded) according to `schema`.
///
/// A string key produces a mapping from key to row; a numeric key or no key
/// produces a sequence in row order. Blank rows are skipped. Duplicate string
/// keys keep the last row.
pub fn assemble<S: AsRef<str>>(schema: &TableSchema, data_rows: &[Vec<S>]) -> Result<TableResult> {
    let keyed = schema.key_type() == Some(KeyType::String);
    let mut sequence = Vec::new();
    let mut mapping = IndexMap::new();

    for (idx, row) in data_rows.iter().enumerate() {
        // Row numbers in messages count the header as row 1.
        let row_number = idx + 2;
        if row.iter().all(|cell| cell.as_ref().is_empty()) {
            debug!("Skipping blank row {row_number}");
            continue;
        }
        let tree = schema
            .transcode(row)
            .map_err(|err| annotate_row(err, row_number))?;

        if !keyed {
            sequence.push(tree);
            continue;
        }
        let key = key_cell(schema, row).unwrap_or("");
        if key.is_empty() {
            return Err(Error::value(format!("row {row_number} has an empty key")));
        }
        if mapping.insert(key.to_string(), tree).is_some() {
            warn!("Duplicate key '{key}' at row {row_number}; keeping the later row");
        }
    }

    Ok(if keyed {
        TableResult::Keyed(mapping)
    } else {
        TableResult::Sequence(sequence)
    })
}

fn annotate_row(err: Error, row_number: usize) -> Error {
    match err {
        Error::Value(message) => Error::Value(format!("row {row_number}: {message}")),
        other => other,
    }
}
