use std::{fs::File, io::BufReader, iter, path::Path};

use encoding_rs::Encoding;
use log::debug;

use super::{AdapterOptions, Table, TableAdapter};
use crate::{
    error::{AdapterError, Error, Result},
    io_utils,
};

/// Comma/tab separated text.
#[derive(Debug, Clone)]
pub struct DelimitedAdapter {
    delimiter: Option<u8>,
    encoding: &'static Encoding,
    key: String,
}

impl DelimitedAdapter {
    pub fn new(options: &AdapterOptions) -> Self {
        Self {
            delimiter: options.delimiter,
            encoding: options.encoding,
            key: options.key.clone(),
        }
    }
}

impl TableAdapter for DelimitedAdapter {
    fn read(&self, path: &Path) -> Result<Table> {
        let delimiter = io_utils::resolve_delimiter(path, self.delimiter);
        let file = File::open(path).map_err(|err| Error::adapter(path, err))?;
        let mut reader = io_utils::open_csv_reader(BufReader::new(file), delimiter);

        let mut rows = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record.map_err(|err| Error::adapter(path, err))?;
            let decoded = io_utils::decode_record(&record, self.encoding).map_err(|err| {
                Error::adapter(path, AdapterError::Format(format!("row {}: {err}", idx + 1)))
            })?;
            rows.push(decoded);
        }
        debug!("Read {} record(s) from {:?}", rows.len(), path);
        Ok(Table::Rows(rows))
    }

    fn write(&self, path: &Path, table: Table) -> Result<()> {
        let rows = table.into_rows(&self.key)?;
        let delimiter = io_utils::resolve_delimiter(path, self.delimiter);
        let width = rows.first().map_or(0, Vec::len);

        let mut writer = io_utils::open_csv_writer(Vec::new(), delimiter);
        for row in &rows {
            let padding = iter::repeat_n("", width.saturating_sub(row.len()));
            writer
                .write_record(row.iter().map(String::as_str).chain(padding))
                .map_err(|err| Error::adapter(path, err))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| Error::adapter(path, err.into_error()))?;
        io_utils::write_file(path, &bytes)
    }
}
