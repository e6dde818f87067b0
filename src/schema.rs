//! Per-table schema built from the header row.
//!
//! The schema holds at most one key column and an insertion-ordered map from
//! field name to every column that contributes to that field. Simple kinds
//! (key, scalar, list) own their field outright; nested kinds may share a
//! field as long as they agree on its root container and never write the
//! same slot.

use indexmap::{IndexMap, map::Entry};
use log::debug;
use serde::Serialize;

use crate::{
    error::{Error, Result},
    header::{self, ColumnDescriptor, ColumnKind, KeyType},
    tree::display_path,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct TableSchema {
    pub key: Option<ColumnDescriptor>,
    pub fields: IndexMap<String, Vec<ColumnDescriptor>>,
    /// Header cells that matched no pattern, as `(column index, text)`.
    pub ignored: Vec<(usize, String)>,
}

impl TableSchema {
    pub fn build<S: AsRef<str>>(header_row: &[S]) -> Result<Self> {
        let mut schema = TableSchema::default();
        for (idx, cell) in header_row.iter().enumerate() {
            let text = cell.as_ref();
            match header::classify(idx, text)? {
                Some(column) => schema.add_column(column)?,
                None => {
                    debug!("Ignoring column {} '{}': no header pattern matches", idx + 1, text);
                    schema.ignored.push((idx, text.to_string()));
                }
            }
        }
        Ok(schema)
    }

    pub fn key_type(&self) -> Option<KeyType> {
        self.key.as_ref().and_then(|key| match key.kind {
            ColumnKind::Key(ty) => Some(ty),
            _ => None,
        })
    }

    pub fn key_field(&self) -> Option<&str> {
        self.key.as_ref().map(|key| key.field_name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every classified column, in header order.
    pub fn columns(&self) -> Vec<&ColumnDescriptor> {
        let mut columns = self.fields.values().flatten().collect::<Vec<_>>();
        columns.sort_by_key(|column| column.source_index);
        columns
    }

    fn add_column(&mut self, column: ColumnDescriptor) -> Result<()> {
        if let ColumnKind::Key(_) = column.kind {
            if let Some(existing) = &self.key {
                return Err(Error::schema(format!(
                    "multiple key not supported: '{}' and '{}'",
                    existing.header, column.header
                )));
            }
            self.key = Some(column.clone());
        }

        let existing = match self.fields.entry(column.field_name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(vec![column]);
                return Ok(());
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        let first = &existing[0];
        if first.kind.family() != column.kind.family() || column.kind.is_simple() {
            return Err(Error::schema(format!(
                "duplicate column '{}' with incompatible type: '{}' is {}, '{}' is {}",
                column.field_name, first.header, first.kind, column.header, column.kind
            )));
        }

        for other in existing.iter() {
            let shared = other
                .path
                .iter()
                .zip(&column.path)
                .take_while(|(a, b)| a == b)
                .count();
            if shared == other.path.len().min(column.path.len()) {
                return Err(Error::schema(format!(
                    "columns '{}' and '{}' both write {}{}",
                    other.header,
                    column.header,
                    column.field_name,
                    display_path(&column.path[..shared])
                )));
            }
        }
        existing.push(column);
        Ok(())
    }
}
