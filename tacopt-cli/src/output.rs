use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use tacopt::compiler::EventLog;

use crate::app::GlobalOptions;

/// Print `data` as JSON (if `--json`) or call `display_fn` for human-readable output.
pub fn print_output<T: Serialize>(
    data: &T,
    opts: &GlobalOptions,
    display_fn: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if opts.json {
        let json = serde_json::to_string_pretty(data)?;
        println!("{json}");
    } else {
        display_fn(data);
    }
    Ok(())
}

/// Column alignment for tabular output.
#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Right,
}

/// Whitespace-aligned table backed by `comfy-table`.
pub struct TabWriter {
    table: Table,
    indent: String,
}

impl TabWriter {
    /// Create a new `TabWriter` from `(header, alignment)` column pairs.
    pub fn new(columns: Vec<(&str, Align)>) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let headers: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        table.set_header(headers);

        // 2-space gap between columns, none at the edges.
        let last = columns.len().saturating_sub(1);
        for (i, (_, align)) in columns.iter().enumerate() {
            let cell_align = match align {
                Align::Left => CellAlignment::Left,
                Align::Right => CellAlignment::Right,
            };
            if let Some(col) = table.column_mut(i) {
                col.set_cell_alignment(cell_align);
                let pad_left = if i == 0 { 0 } else { 1 };
                let pad_right = if i == last { 0 } else { 1 };
                col.set_padding((pad_left, pad_right));
            }
        }

        Self {
            table,
            indent: String::new(),
        }
    }

    /// Set the indent prefix for every line.
    pub fn indent(mut self, prefix: &str) -> Self {
        self.indent = prefix.to_string();
        self
    }

    /// Add a row. Values are given in column order.
    pub fn row(&mut self, values: Vec<String>) {
        self.table.add_row(values);
    }

    /// Render the table, one trimmed line per row.
    pub fn lines(&self) -> Vec<String> {
        self.table
            .to_string()
            .lines()
            .map(|line| format!("{}{}", self.indent, line.trim_end()))
            .collect()
    }

    /// Print the table to stderr.
    pub fn eprint(&self) {
        for line in self.lines() {
            eprintln!("{line}");
        }
    }
}

/// Builds the per-pass, per-kind event summary table.
pub fn event_table(events: &EventLog) -> TabWriter {
    let mut rows: Vec<(String, String, usize)> = Vec::new();
    for event in events.iter().filter(|e| e.kind.is_transformation()) {
        let pass = event.pass.unwrap_or("-").to_string();
        let kind = event.kind.description().to_string();
        match rows.iter_mut().find(|(p, k, _)| *p == pass && *k == kind) {
            Some((_, _, count)) => *count += 1,
            None => rows.push((pass, kind, 1)),
        }
    }
    rows.sort();

    let mut table = TabWriter::new(vec![
        ("PASS", Align::Left),
        ("EVENT", Align::Left),
        ("COUNT", Align::Right),
    ])
    .indent("  ");
    for (pass, kind, count) in rows {
        table.row(vec![pass, kind, count.to_string()]);
    }
    table
}

#[cfg(test)]
mod tests {
    use tacopt::compiler::EventKind;

    use super::*;

    #[test]
    fn test_event_table_groups_by_pass_and_kind() {
        let events = EventLog::new();
        events.record(EventKind::ConstantFolded).pass("sccp");
        events.record(EventKind::ConstantFolded).pass("sccp");
        events.record(EventKind::PhiSimplified).pass("ssa-minimization");
        events.record(EventKind::PassStarted).pass("sccp");

        let lines: Vec<String> = event_table(&events)
            .lines()
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("PASS"));
        assert!(lines[1].contains("sccp") && lines[1].ends_with('2'));
        assert!(lines[2].contains("phi simplified"));
    }
}
