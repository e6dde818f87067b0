//! Format adapters: where tables come from and where documents go.
//!
//! Tabular formats (delimited text, spreadsheets) exchange [`Rows`]; document
//! formats (JSON, Lua) exchange a [`TableResult`]. [`Table`] carries either
//! and converts on demand, so any reader can feed any writer.

mod delimited;
mod json;
mod lua;
mod xlsx;

use std::path::Path;

use clap::ValueEnum;
use encoding_rs::{Encoding, UTF_8};

use crate::{
    assemble::{Rows, TableResult, parse_table},
    error::Result,
    flatten::flatten,
};

pub use delimited::DelimitedAdapter;
pub use json::{JsonAdapter, document_from_json, document_to_json};
#[cfg(feature = "lua")]
pub use lua::evaluate_document;
pub use lua::{LuaAdapter, render_document};
pub use xlsx::XlsxAdapter;

pub const DEFAULT_SHEET: &str = "Sheet1";
pub const DEFAULT_KEY: &str = "ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Xlsx,
    Json,
    Lua,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Xlsx => "xlsx",
            Format::Json => "json",
            Format::Lua => "lua",
        }
    }

    /// Whether `path` looks like a file of this format. Delimited text also
    /// accepts `.tsv`.
    pub fn matches(self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        ext.eq_ignore_ascii_case(self.extension())
            || (self == Format::Csv && ext.eq_ignore_ascii_case("tsv"))
    }

    pub fn from_path(path: &Path) -> Option<Format> {
        [Format::Csv, Format::Xlsx, Format::Json, Format::Lua]
            .into_iter()
            .find(|format| format.matches(path))
    }

    pub fn adapter(self, options: &AdapterOptions) -> Box<dyn TableAdapter> {
        match self {
            Format::Csv => Box::new(DelimitedAdapter::new(options)),
            Format::Xlsx => Box::new(XlsxAdapter::new(options)),
            Format::Json => Box::new(JsonAdapter),
            Format::Lua => Box::new(LuaAdapter),
        }
    }
}

/// Settings handed to every adapter; nothing here is process-wide.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// Worksheet read from and written to.
    pub sheet: String,
    /// Name of the key column synthesized when a document is flattened.
    pub key: String,
    /// Delimiter override for delimited text.
    pub delimiter: Option<u8>,
    /// Encoding of delimited input.
    pub encoding: &'static Encoding,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            sheet: DEFAULT_SHEET.to_string(),
            key: DEFAULT_KEY.to_string(),
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

/// A table as produced by a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Table {
    /// Header row followed by data rows.
    Rows(Rows),
    Document(TableResult),
}

impl Table {
    pub fn into_document(self) -> Result<TableResult> {
        match self {
            Table::Rows(rows) => parse_table(&rows),
            Table::Document(document) => Ok(document),
        }
    }

    pub fn into_rows(self, key_name: &str) -> Result<Rows> {
        match self {
            Table::Rows(rows) => Ok(rows),
            Table::Document(document) => flatten(&document, key_name),
        }
    }

    /// Number of data rows or document entries.
    pub fn len(&self) -> usize {
        match self {
            Table::Rows(rows) => rows.len().saturating_sub(1),
            Table::Document(document) => document.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait TableAdapter {
    fn read(&self, path: &Path) -> Result<Table>;

    /// Writes `table` to `path`. The output is rendered completely before the
    /// file is touched.
    fn write(&self, path: &Path, table: Table) -> Result<()>;
}
