//! Text table renderers for query results.

use super::cell_to_text;
use crate::models::{Cell, QueryResult};
use unicode_width::UnicodeWidthStr;

fn format_cell(cell: &Cell) -> String {
    cell_to_text(cell).unwrap_or_else(|| "NULL".to_string())
}

fn is_numeric(cell: &Cell) -> bool {
    matches!(cell, Cell::Int(_) | Cell::UInt(_) | Cell::Float(_))
}

/// Pad to a display width; `format!` width counts chars, not terminal columns.
fn pad(s: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(s.width()));
    if right_align {
        format!("{}{}", fill, s)
    } else {
        format!("{}{}", s, fill)
    }
}

fn center(s: &str, width: usize) -> String {
    let total = width.saturating_sub(s.width());
    let left = total / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(total - left))
}

/// ASCII table, in the style of the MySQL CLI.
pub fn format_as_table(result: &QueryResult) -> String {
    let columns = &result.columns;
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let rendered: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(format_cell).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in &rendered {
        for (i, value) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(value.width());
            }
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("| {} ", center(col, *w)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for (row, cells) in rendered.iter().zip(&result.rows) {
        let row_str: String = row
            .iter()
            .zip(cells)
            .zip(&widths)
            .map(|((value, cell), w)| format!("| {} ", pad(value, *w, is_numeric(cell))))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_count = result.row_count();
    let row_text = if row_count == 1 { "row" } else { "rows" };
    output.push_str(&format!("{} {} in set\n", row_count, row_text));

    output
}

pub fn format_as_markdown(result: &QueryResult) -> String {
    let columns = &result.columns;
    if columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();

    let header: String = columns
        .iter()
        .map(|c| format!("| {} ", escape_markdown(c)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in &result.rows {
        let row_str: String = row
            .iter()
            .map(|cell| format!("| {} ", escape_markdown(&format_cell(cell))))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&format!("\n*{} rows*", result.row_count()));

    output
}

/// Pipes and newlines would break the table layout.
fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace(['\r', '\n'], " ")
}
