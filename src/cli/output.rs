//! Rendering of result sets for the terminal
//!
//! `table` draws a bordered grid, `csv` writes NULL as an empty field and
//! `json` writes one object per row.

use crate::result::{OrderedFetchResult, NULL_TEXT};
use crate::value::Value;
use clap::ValueEnum;
use std::fmt;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl OutputFormat {
    /// Case-insensitive lookup by name
    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }

    /// Names accepted by [`Self::parse`], comma separated
    pub fn choices() -> String {
        Self::value_variants()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}

type Rows = OrderedFetchResult<Value>;

/// Writes result sets in the selected [`OutputFormat`]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    pub fn print(&self, rows: &Rows) -> io::Result<()> {
        self.write(&mut io::stdout().lock(), rows)
    }

    pub fn write<W: Write>(&self, out: &mut W, rows: &Rows) -> io::Result<()> {
        match self.format {
            OutputFormat::Table => grid(out, rows),
            OutputFormat::Csv => csv(out, rows),
            OutputFormat::Json => json(out, rows),
        }
    }

    pub fn format_to_string(&self, rows: &Rows) -> String {
        let mut buffer = Vec::new();
        // Writes into a Vec cannot fail
        let _ = self.write(&mut buffer, rows);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Column widths come from the result set, which tracks them as rows arrive
fn grid<W: Write>(out: &mut W, rows: &Rows) -> io::Result<()> {
    let widths = rows.widths();
    let mut rule = String::from("+");
    for width in widths {
        rule.push_str(&"-".repeat(width + 2));
        rule.push('+');
    }
    let line = |out: &mut W, cells: Vec<String>| -> io::Result<()> {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, &width)| format!(" {:<width$} ", cell))
            .collect();
        writeln!(out, "|{}|", padded.join("|"))
    };

    writeln!(out, "{}", rule)?;
    line(out, rows.columns().to_vec())?;
    writeln!(out, "{}", rule)?;
    for row in rows.iter() {
        let cells = row
            .iter()
            .map(|cell| cell.as_ref().map_or_else(|| NULL_TEXT.to_string(), Value::to_string))
            .collect();
        line(out, cells)?;
    }
    writeln!(out, "{}", rule)
}

fn csv<W: Write>(out: &mut W, rows: &Rows) -> io::Result<()> {
    writeln!(out, "{}", rows.columns().join(","))?;
    for row in rows.iter() {
        let fields: Vec<String> = row.iter().map(csv_field).collect();
        writeln!(out, "{}", fields.join(","))?;
    }
    Ok(())
}

fn csv_field(cell: &Option<Value>) -> String {
    let Some(value) = cell else {
        return String::new();
    };
    let text = value.to_string();
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

fn json<W: Write>(out: &mut W, rows: &Rows) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "[]");
    }
    let objects: Vec<String> = rows
        .iter()
        .map(|row| {
            let members: Vec<String> = rows
                .columns()
                .iter()
                .zip(row)
                .map(|(name, cell)| format!("{}: {}", quoted(name), json_value(cell)))
                .collect();
            format!("  {{{}}}", members.join(", "))
        })
        .collect();
    writeln!(out, "[\n{}\n]", objects.join(",\n"))
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Integers, finite floats and booleans stay bare; dates and text are quoted
fn json_value(cell: &Option<Value>) -> String {
    match cell {
        None => "null".to_string(),
        Some(Value::Integer(n)) => n.to_string(),
        Some(Value::Float(f)) if f.is_finite() => f.to_string(),
        Some(Value::Boolean(b)) => b.to_string(),
        Some(other) => quoted(&other.to_string()),
    }
}
