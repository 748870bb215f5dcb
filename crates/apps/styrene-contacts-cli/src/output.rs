use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::view::RowView;

#[derive(Debug, Clone)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    pub fn emit_rows(&self, rows: &[RowView]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        if self.json {
            println!("{}", serde_json::to_string_pretty(rows)?);
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["#", "Name", "Presence", "Capabilities", "Rosters"]);
        for row in rows {
            let presence = match &row.message {
                Some(message) => format!("{} ({message})", row.presence),
                None => row.presence.clone(),
            };
            table.add_row(vec![
                Cell::new(row.index),
                Cell::new(&row.name),
                Cell::new(presence),
                Cell::new(&row.capabilities),
                Cell::new(row.rosters.join(", ")),
            ]);
        }
        println!("{table}");
        Ok(())
    }
}
