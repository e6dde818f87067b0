//! Plain-text column layout for terminal listings.

use std::fmt::Write as _;

/// Lays `rows` out under `headers` with two spaces between columns and a
/// dashed rule below the header. Cells beyond the header width are dropped.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| display_width(header).max(3))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut output = String::new();
    write_line(&mut output, headers.iter().copied(), &widths);
    let rule = widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>();
    write_line(&mut output, rule.iter().map(String::as_str), &widths);
    for row in rows {
        write_line(&mut output, row.iter().map(String::as_str), &widths);
    }
    output
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn write_line<'a>(output: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let mut line = String::new();
    for (idx, (cell, &width)) in cells.zip(widths).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cell.replace(['\n', '\r', '\t'], " ");
        let _ = write!(line, "{cell:<width$}");
    }
    let _ = writeln!(output, "{}", line.trim_end());
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_table_aligns_columns() {
        let rendered = render_table(
            &["#", "header"],
            &[
                vec!["1".to_string(), "ID_KN".to_string()],
                vec!["12".to_string(), "x_N".to_string()],
            ],
        );
        assert_eq!(
            rendered,
            "#    header\n---  ------\n1    ID_KN\n12   x_N\n"
        );
    }

    #[test]
    fn render_table_flattens_control_whitespace() {
        let rendered = render_table(&["note"], &[vec!["a\nb".to_string()]]);
        assert!(rendered.ends_with("a b\n"));
    }
}
