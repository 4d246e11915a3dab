//! Plain-text screen rendering of a report document.
//!
//! The fixed-width counterpart of the on-screen report view: banners become
//! ruled headings, tables become padded column grids. Used by the CLI when no
//! file export is requested.

use crate::document::{sanitize_currency, Cell, ReportDocument, Section};

const MIN_COL_WIDTH: usize = 4;
const COL_GAP: &str = "  ";

fn cell_text(cell: &Cell) -> String {
    sanitize_currency(&cell.text)
}

fn column_widths(headers: &[String], rows: &[Vec<Cell>], total: Option<&Vec<Cell>>) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len().max(MIN_COL_WIDTH)).collect();
    let mut consider = |row: &Vec<Cell>| {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell_text(cell).len());
            }
        }
    };
    for row in rows {
        consider(row);
    }
    if let Some(row) = total {
        consider(row);
    }
    widths
}

fn pad_row(cells: &[String], widths: &[usize]) -> String {
    let mut out = String::new();
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            out.push_str(COL_GAP);
        }
        let text = cells.get(i).map(String::as_str).unwrap_or("");
        out.push_str(&format!("{text:<width$}"));
    }
    out.trim_end().to_string()
}

/// Render the document as a fixed-width text listing.
pub fn render_text(doc: &ReportDocument) -> String {
    let mut out = String::new();

    for section in &doc.sections {
        match section {
            Section::Banner { title, .. } => {
                let title = sanitize_currency(title);
                out.push('\n');
                out.push_str(&title);
                out.push('\n');
                out.push_str(&"=".repeat(title.len()));
                out.push('\n');
            }
            Section::KeyValues(pairs) => {
                let label_width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
                for (label, value) in pairs {
                    out.push_str(&format!(
                        "{label:<label_width$} : {}\n",
                        sanitize_currency(value)
                    ));
                }
            }
            Section::Table {
                headers,
                rows,
                total_row,
            } => {
                let widths = column_widths(headers, rows, total_row.as_ref());
                out.push_str(&pad_row(headers, &widths));
                out.push('\n');
                let rule_len: usize =
                    widths.iter().sum::<usize>() + COL_GAP.len() * widths.len().saturating_sub(1);
                out.push_str(&"-".repeat(rule_len));
                out.push('\n');
                for row in rows {
                    let cells: Vec<String> = row.iter().map(cell_text).collect();
                    out.push_str(&pad_row(&cells, &widths));
                    out.push('\n');
                }
                if let Some(total) = total_row {
                    out.push_str(&"-".repeat(rule_len));
                    out.push('\n');
                    let cells: Vec<String> = total.iter().map(cell_text).collect();
                    out.push_str(&pad_row(&cells, &widths));
                    out.push('\n');
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{build_report_document, Rgb};
    use crate::report::{OrderInfo, OrderReport};

    #[test]
    fn test_text_render_contains_all_sections_in_order() {
        let report = OrderReport {
            order: OrderInfo {
                id: "ORD-001".into(),
                customer_name: "Chennai Fresh Exports".into(),
                ..OrderInfo::default()
            },
            ..OrderReport::default()
        };
        let doc = build_report_document(&report);
        let text = render_text(&doc);

        let s1 = text.find("Stage 1 - Collection").unwrap();
        let s2 = text.find("Stage 2 - Packaging").unwrap();
        let s3 = text.find("Stage 3 - Delivery").unwrap();
        let s4 = text.find("Stage 4 - Final Pricing").unwrap();
        assert!(s1 < s2 && s2 < s3 && s3 < s4);
        assert!(text.contains("Chennai Fresh Exports"));
        assert!(text.contains("No data available"));
    }

    #[test]
    fn test_table_columns_align() {
        let doc = ReportDocument {
            title: "t".into(),
            file_stem: "t".into(),
            sections: vec![Section::Banner {
                title: "Totals".into(),
                color: Rgb(0, 0, 0),
            }],
        };
        let text = render_text(&doc);
        assert!(text.contains("Totals\n======"));
    }
}
