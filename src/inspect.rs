use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    adapters::{AdapterOptions, Format},
    cli::InspectArgs,
    io_utils,
    schema::TableSchema,
    table,
    tree::display_path,
};

const HEADERS: [&str; 6] = ["#", "header", "kind", "field", "path", "format"];

pub fn execute(args: &InspectArgs) -> Result<()> {
    let format = match args.from {
        Some(format) => format,
        None => Format::from_path(&args.input).ok_or_else(|| {
            anyhow!(
                "Cannot tell the format of {:?}; pass --from",
                args.input
            )
        })?,
    };
    let options = AdapterOptions {
        sheet: args.sheet.clone(),
        key: args.key.clone(),
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
    };
    let rows = format
        .adapter(&options)
        .read(&args.input)
        .and_then(|table| table.into_rows(&options.key))
        .with_context(|| format!("Reading {:?}", args.input))?;
    let header_row = rows.first().map(Vec::as_slice).unwrap_or_default();
    let schema = TableSchema::build(header_row)
        .with_context(|| format!("Classifying the header row of {:?}", args.input))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        table::print_table(&HEADERS, &describe(&schema));
    }
    info!(
        "{} classified column(s), {} ignored, {} data row(s)",
        schema.columns().len(),
        schema.ignored.len(),
        rows.len().saturating_sub(1)
    );
    Ok(())
}

/// One listing row per header cell, classified or not, in column order.
pub fn describe(schema: &TableSchema) -> Vec<Vec<String>> {
    let mut listing = schema
        .columns()
        .into_iter()
        .map(|column| {
            let format = match (&column.value_format, column.kind.default_format()) {
                (Some(annotated), _) => annotated.to_string(),
                (None, Some(fixed)) => fixed.to_string(),
                (None, None) => "inferred".to_string(),
            };
            (
                column.source_index,
                vec![
                    (column.source_index + 1).to_string(),
                    column.header.clone(),
                    column.kind.to_string(),
                    column.field_name.clone(),
                    display_path(&column.path),
                    format,
                ],
            )
        })
        .collect::<Vec<_>>();
    listing.extend(schema.ignored.iter().map(|(idx, header)| {
        (
            *idx,
            vec![
                (idx + 1).to_string(),
                header.clone(),
                "ignored".to_string(),
                String::new(),
                String::new(),
                String::new(),
            ],
        )
    }));
    listing.sort_by_key(|(idx, _)| *idx);
    listing.into_iter().map(|(_, row)| row).collect()
}
