use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::adapters::{DEFAULT_KEY, DEFAULT_SHEET, Format};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Convert spreadsheet tables into nested Lua and JSON documents",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert every table under an input directory (or a single file)
    Convert(ConvertArgs),
    /// Show how the header row of one table is classified
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input directory or file
    #[arg(short, long)]
    pub input: PathBuf,
    /// Output directory; relative paths under the input are mirrored here
    #[arg(short, long)]
    pub output: PathBuf,
    /// Format of the input tables
    #[arg(long, value_enum)]
    pub from: Format,
    /// Format to write
    #[arg(long, value_enum)]
    pub to: Format,
    /// Name of the key column synthesized when documents are flattened into rows
    #[arg(short = 'k', long = "key", default_value = DEFAULT_KEY)]
    pub key: String,
    /// Worksheet to read from and write to
    #[arg(short = 's', long = "sheet", default_value = DEFAULT_SHEET)]
    pub sheet: String,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of delimited input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Table to inspect
    #[arg(short, long)]
    pub input: PathBuf,
    /// Input format (defaults to the file extension)
    #[arg(long, value_enum)]
    pub from: Option<Format>,
    /// Worksheet to read
    #[arg(short = 's', long = "sheet", default_value = DEFAULT_SHEET)]
    pub sheet: String,
    /// Key column name used when a document has to be flattened first
    #[arg(short = 'k', long = "key", default_value = DEFAULT_KEY)]
    pub key: String,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of delimited input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Print the column descriptors as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
