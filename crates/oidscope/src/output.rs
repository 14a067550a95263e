//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders results in the format selected by `--output`. Table uses
//! `tabled`, structured formats use serde, plain emits `name = value`
//! lines for scripting.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::{Table, Tabled, settings::Style};

use oidscope_core::{ResultTree, SnmpResult, TableData};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Table rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    type_name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&SnmpResult> for ResultRow {
    fn from(r: &SnmpResult) -> Self {
        Self {
            name: r.name.clone(),
            type_name: r.type_name.clone(),
            value: r.value.clone(),
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a flat result list.
pub fn render_results(format: OutputFormat, results: &[SnmpResult]) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<ResultRow> = results.iter().map(ResultRow::from).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Plain => Ok(results
            .iter()
            .map(|r| format!("{} = {}", r.name, r.value))
            .collect::<Vec<_>>()
            .join("\n")),
        other => render_structured(other, results),
    }
}

/// Render any row type: `Tabled` for the table format, serde for the
/// structured ones, `plain` per row otherwise.
pub fn render_list<R: Tabled + Serialize>(
    format: OutputFormat,
    rows: &[R],
    plain: impl Fn(&R) -> String,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(render_table(rows)),
        OutputFormat::Plain => Ok(rows.iter().map(plain).collect::<Vec<_>>().join("\n")),
        other => render_structured(other, rows),
    }
}

/// Render a reconstructed table. Plain output is tab-separated with a
/// header line.
pub fn render_table_data(format: OutputFormat, data: &TableData) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(data.columns.iter().cloned());
            for row in &data.rows {
                builder.push_record(row.cells.iter().cloned());
            }
            Ok(builder.build().with(Style::rounded()).to_string())
        }
        OutputFormat::Plain => {
            let mut lines = vec![data.columns.join("\t")];
            lines.extend(data.rows.iter().map(|row| row.cells.join("\t")));
            Ok(lines.join("\n"))
        }
        other => render_structured(other, data),
    }
}

/// Render a walk tree as indented text. Structured formats get the flat
/// results instead.
pub fn render_tree(
    format: OutputFormat,
    tree: &ResultTree,
    results: &[SnmpResult],
    color: bool,
) -> Result<String, CliError> {
    if !matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        return render_structured(format, results);
    }

    let mut out = Vec::new();
    if let Some(root) = tree.walk_root() {
        out.push(root.to_string());
    }
    for row in tree.rows() {
        let indent = "  ".repeat(row.depth + 1);
        let node = row.node;
        let line = match &node.result {
            Some(result) if color => format!(
                "{indent}{} = {} {}",
                node.name,
                result.value,
                format!("({})", result.type_name).dimmed()
            ),
            Some(result) => format!("{indent}{} = {}", node.name, result.value),
            None if color => format!(
                "{indent}{} {}",
                node.name.bold(),
                format!("[{}]", node.result_count()).dimmed()
            ),
            None => format!("{indent}{} [{}]", node.name, node.result_count()),
        };
        out.push(line);
    }
    Ok(out.join("\n"))
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Status line on stderr, respecting quiet mode.
pub fn print_status(status: &str, quiet: bool) {
    if !quiet {
        eprintln!("{status}");
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_structured<T: Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        _ => serde_json::to_string_pretty(data)?,
    })
}
