use std::path::Path;

use super::{AdapterOptions, Table, TableAdapter};
use crate::error::{AdapterError, Error, Result};

/// One worksheet of an Excel workbook.
#[derive(Debug, Clone)]
pub struct XlsxAdapter {
    sheet: String,
    key: String,
}

impl XlsxAdapter {
    pub fn new(options: &AdapterOptions) -> Self {
        Self {
            sheet: options.sheet.clone(),
            key: options.key.clone(),
        }
    }
}

fn xlsx_error(path: &Path, err: impl ToString) -> Error {
    Error::adapter(path, AdapterError::Xlsx(err.to_string()))
}

#[cfg(feature = "xlsx")]
impl TableAdapter for XlsxAdapter {
    fn read(&self, path: &Path) -> Result<Table> {
        use calamine::{Reader, open_workbook_auto};

        let mut workbook = open_workbook_auto(path).map_err(|err| xlsx_error(path, err))?;
        if !workbook.sheet_names().iter().any(|name| name == &self.sheet) {
            return Err(xlsx_error(
                path,
                format!("sheet '{}' not found", self.sheet),
            ));
        }
        let range = workbook
            .worksheet_range(&self.sheet)
            .map_err(|err| xlsx_error(path, err))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        Ok(Table::Rows(rows))
    }

    fn write(&self, path: &Path, table: Table) -> Result<()> {
        use rust_xlsxwriter::Workbook;

        let rows = table.into_rows(&self.key)?;
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&self.sheet)
            .map_err(|err| xlsx_error(path, err))?;
        for (row_idx, row) in rows.iter().enumerate() {
            let row_num = u32::try_from(row_idx)
                .map_err(|_| xlsx_error(path, format!("row {row_idx} is out of range")))?;
            for (col_idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let col_num = u16::try_from(col_idx)
                    .map_err(|_| xlsx_error(path, format!("column {col_idx} is out of range")))?;
                worksheet
                    .write_string(row_num, col_num, cell)
                    .map_err(|err| xlsx_error(path, err))?;
            }
        }
        let bytes = workbook
            .save_to_buffer()
            .map_err(|err| xlsx_error(path, err))?;
        crate::io_utils::write_file(path, &bytes)
    }
}

#[cfg(not(feature = "xlsx"))]
impl TableAdapter for XlsxAdapter {
    fn read(&self, path: &Path) -> Result<Table> {
        Err(xlsx_error(path, "XLSX support requires the `xlsx` feature"))
    }

    fn write(&self, path: &Path, _table: Table) -> Result<()> {
        Err(xlsx_error(path, "XLSX support requires the `xlsx` feature"))
    }
}

#[cfg(all(test, feature = "xlsx"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn written_sheet_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.xlsx");
        let adapter = XlsxAdapter::new(&AdapterOptions::default());
        let table = rows(&[&["ID_KN", "x_N", "y_S"], &["1", "10", "a"], &["2", "20", "b"]]);

        adapter.write(&path, Table::Rows(table.clone())).unwrap();
        assert_eq!(adapter.read(&path).unwrap(), Table::Rows(table));
    }

    #[test]
    fn missing_sheet_is_named_in_the_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.xlsx");
        XlsxAdapter::new(&AdapterOptions::default())
            .write(&path, Table::Rows(rows(&[&["x_N"], &["1"]])))
            .unwrap();

        let options = AdapterOptions {
            sheet: "Monsters".to_string(),
            ..AdapterOptions::default()
        };
        let err = XlsxAdapter::new(&options).read(&path).unwrap_err();
        assert!(err.to_string().contains("sheet 'Monsters' not found"), "{err}");
    }
}
