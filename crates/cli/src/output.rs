//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use shellform_provider::{Diagnostic, Severity};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table<T: TableDisplay>(items: &[T]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(T::headers());
    for item in items {
        table.add_row(item.row());
    }
    table
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        return;
    }

    if items.is_empty() {
        println!("No resources.");
        return;
    }

    match format {
        OutputFormat::Table => println!("{}", table(items)),
        _ => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                for (header, value) in T::headers().iter().zip(item.row()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print diagnostics for one resource, errors to stderr
pub fn print_diagnostics(address: &str, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let location = match &diagnostic.attribute {
            Some(attribute) => format!("{}.{}", address, attribute),
            None => address.to_string(),
        };
        let message = format!("{}: {}: {}", location, diagnostic.summary, diagnostic.detail);
        match diagnostic.severity {
            Severity::Error => print_error(&message),
            Severity::Warning => print_warning(&message),
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✔".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✖".red(), message.red());
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "!".yellow(), message.yellow());
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "·".blue(), message);
}
