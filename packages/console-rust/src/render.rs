//! Plain-text rendering of records for the terminal front end.

use std::fmt::Write as _;

use serde_json::Value;

use autodrive_core::schema::display_scalar;
use autodrive_core::{Catalog, EntityRecord, FieldKind, ResourceDescriptor};

/// Placeholder for empty cells and unset references.
pub const EMPTY_CELL: &str = "N/A";

/// Display text of one field of `record`.
///
/// References show the label of the nested record when the catalog knows
/// its kind and the backend sent more than an id.
#[must_use]
pub fn cell(
    catalog: &Catalog,
    descriptor: &ResourceDescriptor,
    record: &EntityRecord,
    column: &str,
) -> String {
    if column == "id" {
        return record
            .id()
            .map_or_else(|| EMPTY_CELL.to_string(), |id| id.to_string());
    }
    let Some(value) = record.get(column) else {
        return EMPTY_CELL.to_string();
    };
    let kind = descriptor.field(column).map(|f| f.kind);
    match (kind, value) {
        (Some(FieldKind::Reference { resource }), Value::Object(_)) => {
            reference_label(catalog, resource, value)
        }
        _ => display_scalar(value)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| EMPTY_CELL.to_string()),
    }
}

fn reference_label(catalog: &Catalog, resource: &str, value: &Value) -> String {
    let Some(target) = catalog.get(resource) else {
        return EMPTY_CELL.to_string();
    };
    match serde_json::from_value::<EntityRecord>(value.clone()) {
        Ok(nested) => target.option_label(&nested),
        Err(_) => EMPTY_CELL.to_string(),
    }
}

/// Aligned table of `records` over the descriptor's list columns.
#[must_use]
pub fn table(catalog: &Catalog, descriptor: &ResourceDescriptor, records: &[EntityRecord]) -> String {
    let columns = descriptor.list_columns();
    let headers: Vec<&str> = columns
        .iter()
        .map(|c| descriptor.field(c).map_or(*c, |f| f.label))
        .map(|label| if label == "id" { "ID" } else { label })
        .collect();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| columns.iter().map(|c| cell(catalog, descriptor, r, c)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    push_row(&mut out, &header_cells, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

/// One `Label: value` line per declared field, preceded by the id.
#[must_use]
pub fn detail(catalog: &Catalog, descriptor: &ResourceDescriptor, record: &EntityRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID: {}", cell(catalog, descriptor, record, "id"));
    for field in descriptor.fields() {
        let _ = writeln!(
            out,
            "{}: {}",
            field.label,
            cell(catalog, descriptor, record, field.name)
        );
    }
    out
}
