//! Plain-text tables for terminal reports.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::distribution::HistogramBin;

/// Widest bar drawn for a 100% bin.
const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

pub struct Column<'a> {
    pub title: &'a str,
    pub align: Align,
}

impl<'a> Column<'a> {
    pub fn left(title: &'a str) -> Self {
        Self {
            title,
            align: Align::Left,
        }
    }

    pub fn right(title: &'a str) -> Self {
        Self {
            title,
            align: Align::Right,
        }
    }
}

pub fn render_table(columns: &[Column<'_>], rows: &[Vec<String>]) -> String {
    let mut widths = columns
        .iter()
        .map(|c| display_width(c.title).max(1))
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(columns.len()) {
            widths[idx] = widths[idx].max(display_width(&sanitize_cell(cell)));
        }
    }

    let mut output = String::new();
    let titles = columns.iter().map(|c| c.title.to_string()).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&titles, columns, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, columns, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, columns, &widths));
    }
    output
}

fn format_row(values: &[String], columns: &[Column<'_>], widths: &[usize]) -> String {
    let cells = values
        .iter()
        .zip(columns.iter().zip(widths))
        .map(|(value, (column, width))| {
            let text = sanitize_cell(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&text)));
            match column.align {
                Align::Left => format!("{text}{padding}"),
                Align::Right => format!("{padding}{text}"),
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}

/// Renders histogram bins with a proportional bar per row.
pub fn render_distribution(column: &str, bins: &[HistogramBin]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Distribution of '{column}'");
    if bins.is_empty() {
        let _ = writeln!(output, "(no numeric values)");
        return output;
    }
    let columns = [
        Column::left("range"),
        Column::right("count"),
        Column::right("percent"),
        Column::left("share"),
    ];
    let rows = bins
        .iter()
        .map(|bin| {
            vec![
                bin.label.clone(),
                bin.count.to_string(),
                format!("{:.1}%", bin.percentage),
                bar(bin.percentage),
            ]
        })
        .collect::<Vec<_>>();
    output.push_str(&render_table(&columns, &rows));
    output
}

fn bar(percentage: f64) -> String {
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled)
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
