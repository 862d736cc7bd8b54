use std::fmt::Write as _;

use indexmap::IndexSet;

use crate::data::{DECODED_FIELD, PAYLOAD_FIELD, Record, Value, resolve_field};

/// Columns to show for `records`: the preferred list when given, otherwise every
/// top-level field in first-seen order, minus the raw and decoded property bags.
pub fn record_columns(records: &[Record], preferred: &[String]) -> Vec<String> {
    if !preferred.is_empty() {
        return preferred.iter().cloned().collect::<IndexSet<_>>().into_iter().collect();
    }
    records
        .iter()
        .flat_map(|record| record.fields.keys())
        .filter(|key| key.as_str() != PAYLOAD_FIELD && key.as_str() != DECODED_FIELD)
        .cloned()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

pub fn record_rows(records: &[Record], columns: &[String]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| display_cell(resolve_field(record, column)))
                .collect()
        })
        .collect()
}

pub fn display_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(other) => other.as_display(),
    }
}

/// Renders left-aligned columns separated by two spaces, with a dashed rule under
/// the header. Cells beyond the header width are dropped; line breaks and tabs in
/// cells become spaces.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let flatten = |cells: &[String]| {
        cells
            .iter()
            .take(headers.len())
            .map(|cell| cell.replace(['\n', '\r', '\t'], " "))
            .collect::<Vec<_>>()
    };
    let header = flatten(headers);
    let body = rows.iter().map(|row| flatten(row)).collect::<Vec<_>>();

    let mut widths = header.iter().map(|h| h.chars().count().max(3)).collect::<Vec<_>>();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();

    let mut output = String::new();
    for line in std::iter::once(&header).chain(std::iter::once(&rule)).chain(&body) {
        let padded = line
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(output, "{}", padded.trim_end());
    }
    output
}
