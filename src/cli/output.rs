//! Output formatting helpers for CLI commands

use crate::changes::{ChangeBatch, ConnectionStatus, DetectionStrategy, EntityCategory};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// Maximum row ids listed in a human-readable batch line
const MAX_LISTED_IDS: usize = 5;

/// View model for category display
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryView {
    pub category: EntityCategory,
    pub table: &'static str,
    pub strategy: DetectionStrategy,
}

impl From<EntityCategory> for CategoryView {
    fn from(category: EntityCategory) -> Self {
        Self {
            category,
            table: category.table(),
            strategy: category.strategy(),
        }
    }
}

/// Format categories as a table
pub fn format_categories_table(categories: &[CategoryView]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Category", "Table", "Detection", "Watermark"]);

    for (i, c) in categories.iter().enumerate() {
        let watermark = match c.strategy {
            DetectionStrategy::Timestamp => "created_at / updated_at",
            DetectionStrategy::Identifier => "id",
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(c.category.to_string().cyan().to_string()),
            Cell::new(c.table),
            Cell::new(c.strategy),
            Cell::new(watermark),
        ]);
    }

    table.to_string()
}

/// Format categories as JSON
pub fn format_categories_json(categories: &[CategoryView]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({ "categories": categories }))
}

/// One-line human summary of a batch
pub fn format_batch_line(batch: &ChangeBatch) -> String {
    let ids: Vec<String> = batch
        .rows
        .iter()
        .filter_map(|row| row.get("id"))
        .map(|id| match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    let mut listed = ids
        .iter()
        .take(MAX_LISTED_IDS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if ids.len() > MAX_LISTED_IDS {
        listed.push_str(&format!(", … (+{})", ids.len() - MAX_LISTED_IDS));
    }

    let noun = if batch.len() == 1 { "row" } else { "rows" };
    format!(
        "{} {:<16} {} {} [{}]",
        batch.observed_at.format("%H:%M:%S%.3f"),
        batch.category.to_string().cyan(),
        batch.len(),
        noun,
        listed
    )
}

/// Batch as a single JSON line
pub fn format_batch_json(batch: &ChangeBatch) -> Result<String, serde_json::Error> {
    serde_json::to_string(batch)
}

/// Colored connectivity indicator
pub fn format_status(status: ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Connected => format!("{} connected", "●".green()),
        ConnectionStatus::Disconnected => format!("{} disconnected", "○".red()),
    }
}
