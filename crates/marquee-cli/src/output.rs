use clap::ValueEnum;
use comfy_table::{modifiers, presets, Attribute, Cell, Color, Table};
use marquee_models::{RowData, RowItem};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }

        match self.format {
            OutputFormat::Human => {
                println!("{} {}", "✓".green(), msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "success", "message": msg.as_ref() }));
            }
        }
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        // Errors are shown even in quiet mode
        match self.format {
            OutputFormat::Human => {
                eprintln!("{} {}", "✗".red(), msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "error", "message": msg.as_ref() }));
            }
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }

        match self.format {
            OutputFormat::Human => {
                println!("{}", msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "info", "message": msg.as_ref() }));
            }
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }

        match self.format {
            OutputFormat::Human => {
                println!("{} {}", "⚠".yellow(), msg.as_ref());
            }
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "warning", "message": msg.as_ref() }));
            }
        }
    }

    /// Emit a serializable value in JSON modes; no-op for human output
    pub fn data<T: Serialize>(&self, value: &T) {
        if self.quiet || self.is_human() {
            return;
        }
        match serde_json::to_value(value) {
            Ok(data) => self.print_json(&data),
            Err(e) => self.error(format!("Failed to serialize output: {}", e)),
        }
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(data).unwrap_or_default());
            }
            OutputFormat::JsonPretty => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
            OutputFormat::Human => {
                println!("{}", data);
            }
        }
    }

    /// Render a loaded row as a table, or as the raw `RowData` in JSON modes
    pub fn row(&self, heading: &str, data: &RowData) {
        if !self.is_human() {
            self.data(data);
            return;
        }
        if self.quiet {
            return;
        }

        println!("\n{}", heading.bright_cyan().bold());
        if let Some(error) = &data.error {
            eprintln!("{} {}", "✗".red(), error);
            return;
        }
        if data.items.is_empty() {
            println!("{}", "Nothing here yet".bright_black());
            return;
        }
        println!("{}", row_table(&data.items));
    }

    /// Two-column table of labels and values
    pub fn key_values(&self, heading: &str, rows: &[(&str, String)]) {
        if self.quiet {
            return;
        }
        let mut table = Table::new();
        table.set_header(vec![
            Cell::new(heading).fg(Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new(""),
        ]);
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label), Cell::new(value)]);
        }
        table.load_preset(presets::UTF8_FULL);
        table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
        println!("{}", table);
    }
}

fn row_table(items: &[RowItem]) -> Table {
    let mut table = Table::new();
    let with_progress = items.iter().any(|item| item.progress.is_some());

    let mut header = vec![
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Type").add_attribute(Attribute::Bold),
        Cell::new("Year").add_attribute(Attribute::Bold),
        Cell::new("Genres").add_attribute(Attribute::Bold),
        Cell::new("Id").add_attribute(Attribute::Bold),
    ];
    if with_progress {
        header.push(Cell::new("Episode").add_attribute(Attribute::Bold));
        header.push(Cell::new("Progress").add_attribute(Attribute::Bold));
    }
    table.set_header(header);

    for item in items {
        let info = item.title.info();
        let mut genres = info.genres.clone();
        if genres.is_empty() {
            genres.extend(info.genre.clone());
        }

        let mut cells = vec![
            Cell::new(item.title.name()),
            Cell::new(item.kind()),
            Cell::new(info.year.map(|y| y.to_string()).unwrap_or_default()),
            Cell::new(genres.join(", ")),
            Cell::new(item.title.id()).fg(Color::DarkGrey),
        ];
        if with_progress {
            cells.push(Cell::new(item.episode.map(|e| e.to_string()).unwrap_or_default()));
            cells.push(Cell::new(progress_bar(item.progress.unwrap_or(0.0))));
        }
        table.add_row(cells);
    }

    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table
}

/// Ten-cell bar with a percentage, e.g. `████░░░░░░ 40%`
pub fn progress_bar(fraction: f64) -> String {
    let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    let filled = (fraction * 10.0).round() as usize;
    format!("{}{} {:>3.0}%", "█".repeat(filled), "░".repeat(10 - filled), fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0), "░░░░░░░░░░   0%");
        assert_eq!(progress_bar(0.42), "████░░░░░░  42%");
        assert_eq!(progress_bar(0.99), "██████████  99%");
        assert_eq!(progress_bar(f64::NAN), "░░░░░░░░░░   0%");
    }
}
