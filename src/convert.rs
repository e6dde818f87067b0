//! Batch driver: every matching table under the input, one output per table.
//!
//! A table that fails is logged and skipped; the rest still convert. The run
//! as a whole fails afterwards if anything was skipped.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use log::{error, info, warn};
use walkdir::WalkDir;

use crate::{
    adapters::{AdapterOptions, Format, TableAdapter},
    cli::ConvertArgs,
    error::Error,
    io_utils,
};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub from: Format,
    pub to: Format,
    pub adapter: AdapterOptions,
}

#[derive(Debug, Default)]
pub struct ConvertSummary {
    /// Written output files.
    pub converted: Vec<PathBuf>,
    /// Input files that were skipped, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl ConvertSummary {
    pub fn attempted(&self) -> usize {
        self.converted.len() + self.failed.len()
    }
}

pub fn execute(args: &ConvertArgs) -> Result<()> {
    let options = ConvertOptions {
        input: args.input.clone(),
        output_dir: args.output.clone(),
        from: args.from,
        to: args.to,
        adapter: AdapterOptions {
            sheet: args.sheet.clone(),
            key: args.key.clone(),
            delimiter: args.delimiter,
            encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        },
    };
    info!(
        "Converting {} tables under {:?} into {} at {:?}",
        options.from.extension(),
        options.input,
        options.to.extension(),
        options.output_dir
    );

    let summary = convert_all(&options)?;
    if summary.attempted() == 0 {
        warn!(
            "No .{} files found under {:?}",
            options.from.extension(),
            options.input
        );
    }
    if !summary.failed.is_empty() {
        bail!(
            "{} of {} table(s) failed to convert",
            summary.failed.len(),
            summary.attempted()
        );
    }
    info!("Converted {} table(s)", summary.converted.len());
    Ok(())
}

/// Walks `options.input` in file-name order and converts every table whose
/// extension matches the input format.
pub fn convert_all(options: &ConvertOptions) -> Result<ConvertSummary> {
    if !options.input.exists() {
        bail!("Input {:?} does not exist", options.input);
    }
    let reader = options.from.adapter(&options.adapter);
    let writer = options.to.adapter(&options.adapter);

    let mut summary = ConvertSummary::default();
    for entry in WalkDir::new(&options.input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Walking {:?}", options.input))?;
        if !entry.file_type().is_file() || !options.from.matches(entry.path()) {
            continue;
        }
        let source = entry.path();
        let target = output_path(&options.input, source, &options.output_dir, options.to);
        match convert_file(reader.as_ref(), writer.as_ref(), source, &target) {
            Ok(rows) => {
                info!("Wrote {} row(s) from {:?} to {:?}", rows, source, target);
                summary.converted.push(target);
            }
            Err(err) => {
                error!("Skipping {:?}: {err}", source);
                summary.failed.push((source.to_path_buf(), err.to_string()));
            }
        }
    }
    Ok(summary)
}

/// Reads one table and writes it in the output format. Returns the number of
/// rows read.
pub fn convert_file(
    reader: &dyn TableAdapter,
    writer: &dyn TableAdapter,
    source: &Path,
    target: &Path,
) -> crate::error::Result<usize> {
    let table = reader.read(source)?;
    let rows = table.len();
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::adapter(parent, err))?;
    }
    writer.write(target, table)?;
    Ok(rows)
}

/// `source`'s path relative to `input`, re-rooted at `output_dir` with the
/// output extension. A single input file lands directly in `output_dir`.
pub fn output_path(input: &Path, source: &Path, output_dir: &Path, to: Format) -> PathBuf {
    let relative = match source.strip_prefix(input) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
        _ => source
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default(),
    };
    output_dir.join(relative).with_extension(to.extension())
}
