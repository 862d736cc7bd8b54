//! I/O helpers for dataset input and rendered output.
//!
//! All file access in record-lens flows through this module:
//!
//! - **stdin/stdout**: the `-` path convention routes through standard streams,
//!   and an omitted output path means stdout.
//! - **Datasets**: JSON documents, either a bare array of records or an API
//!   envelope, decoded via [`crate::ingest`].
//! - **Output**: pretty JSON, CSV (`QuoteStyle::Necessary`), or elastic tables.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{data::Record, ingest, table};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn read_input(path: &Path) -> Result<String> {
    let mut buf = String::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_string(&mut buf)
            .context("Reading dataset from stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening dataset {path:?}"))?
            .read_to_string(&mut buf)
            .with_context(|| format!("Reading dataset {path:?}"))?;
    }
    Ok(buf)
}

/// Reads and decodes a dataset without normalizing it.
pub fn load_dataset(path: &Path) -> Result<Vec<Record>> {
    let raw = read_input(path)?;
    let records = ingest::parse_dataset(&raw)
        .with_context(|| format!("Decoding dataset {}", describe(path)))?;
    Ok(records)
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) if !is_dash(path) => {
            let file =
                File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        _ => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

pub fn write_json<T: Serialize + ?Sized>(writer: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).context("Writing JSON output")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn write_csv(writer: &mut dyn Write, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(&mut *writer);
    csv_writer
        .write_record(headers)
        .context("Writing CSV header")?;
    for row in rows {
        csv_writer.write_record(row).context("Writing CSV row")?;
    }
    csv_writer.flush()?;
    drop(csv_writer);
    writer.flush()?;
    Ok(())
}

pub fn write_table(writer: &mut dyn Write, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    writer.write_all(table::render_table(headers, rows).as_bytes())?;
    writer.flush()?;
    Ok(())
}

pub fn describe(path: &Path) -> String {
    if is_dash(path) {
        "stdin".to_string()
    } else {
        format!("{path:?}")
    }
}
