//! Table output for document records and cache introspection using comfy-table.

use std::collections::BTreeSet;
use std::env;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use serde_json::Value;

use super::truncate;
use crate::services::CacheStats;

const MAX_CELL_WIDTH: usize = 48;

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<u16>,
}

impl TableFormatter {
    /// Formatter honouring `NO_COLOR`, without a width limit.
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Formatter with explicit color and width settings.
    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// One row per record; `id` first, then every other field in name order.
    pub fn format_records(&self, records: &[Value]) -> String {
        let columns = record_columns(records);
        let mut table = self.create_base_table();
        table.set_header(columns.iter().map(|column| self.header(column)));

        for record in records {
            table.add_row(columns.iter().map(|column| {
                let cell = record.get(column).map_or_else(|| Cell::new("-"), |v| Cell::new(render_value(v)));
                if column == "id" && self.use_colors {
                    cell.fg(Color::Cyan)
                } else {
                    cell
                }
            }));
        }

        table.to_string()
    }

    /// Two-column field/value table for a single record.
    pub fn format_record(&self, record: &Value) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![self.header("Field"), self.header("Value")]);

        if let Some(fields) = record.as_object() {
            if let Some(id) = fields.get("id") {
                table.add_row(vec![Cell::new("id"), Cell::new(render_value(id))]);
            }
            for (field, value) in fields.iter().filter(|(field, _)| field.as_str() != "id") {
                table.add_row(vec![Cell::new(field), Cell::new(render_value(value))]);
            }
        }

        table.to_string()
    }

    /// Render cache counters followed by per-key listener counts.
    pub fn format_stats(&self, stats: &CacheStats, keys: &[(String, Option<usize>)]) -> String {
        let mut summary = self.create_base_table();
        summary.set_header(vec![self.header("Metric"), self.header("Value")]);
        summary.add_row(vec![
            Cell::new("Collection entries"),
            Cell::new(stats.collection_entries),
        ]);
        summary.add_row(vec![
            Cell::new("Document entries"),
            Cell::new(stats.document_entries),
        ]);
        summary.add_row(vec![Cell::new("Listeners"), Cell::new(stats.listeners)]);
        summary.add_row(vec![
            Cell::new("Open upstreams"),
            Cell::new(stats.open_upstreams),
        ]);

        let mut entries = self.create_base_table();
        entries.set_header(vec![self.header("Key"), self.header("Listeners")]);
        for (key, listeners) in keys {
            entries.add_row(vec![
                Cell::new(key),
                Cell::new(listeners.map_or_else(|| "-".to_string(), |count| count.to_string())),
            ]);
        }

        format!("{summary}\n{entries}")
    }

    fn header(&self, title: &str) -> Cell {
        Cell::new(title).add_attribute(Attribute::Bold)
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn record_columns(records: &[Value]) -> Vec<String> {
    let fields: BTreeSet<&str> = records
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|record| record.keys().map(String::as_str))
        .filter(|field| *field != "id")
        .collect();

    std::iter::once("id")
        .chain(fields)
        .map(str::to_string)
        .collect()
}

fn render_value(value: &Value) -> String {
    let rendered = match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    };
    truncate(&rendered, MAX_CELL_WIDTH)
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}
