//! Styled spreadsheet export.
//!
//! Renders the report document onto a single "Order Report" worksheet with
//! the same color semantics as the PDF: green fills for banners and table
//! headers, amber for total rows. Numeric cells are written as real numbers
//! so downstream spreadsheets can keep computing on them.

use std::path::{Path, PathBuf};

use xlsxwriter::prelude::*;

use crate::document::{
    sanitize_currency, Cell, ReportDocument, Section, HEADER_FILL_GREEN, SECTION_GREEN,
    TOTAL_AMBER,
};
use crate::export::{output_path, ExportError};

const SHEET_NAME: &str = "Order Report";
/// Width of the merged banner band; matches the widest table in the layout.
const BAND_COLS: u16 = 9;

fn banner_format() -> Format {
    Format::new()
        .set_bold()
        .set_bg_color(FormatColor::Custom(SECTION_GREEN.packed()))
        .set_font_color(FormatColor::White)
        .set_align(FormatAlignment::Center)
        .clone()
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_bg_color(FormatColor::Custom(HEADER_FILL_GREEN.packed()))
        .set_border(FormatBorder::Thin)
        .clone()
}

fn total_format() -> Format {
    Format::new()
        .set_bold()
        .set_bg_color(FormatColor::Custom(TOTAL_AMBER.packed()))
        .set_border(FormatBorder::Thin)
        .clone()
}

fn body_format() -> Format {
    Format::new().set_border(FormatBorder::Thin).clone()
}

fn label_format() -> Format {
    Format::new().set_bold().clone()
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    format: &Format,
) -> Result<(), XlsxError> {
    match cell.number {
        Some(n) => sheet.write_number(row, col, n, Some(format)),
        None => sheet.write_string(row, col, &sanitize_currency(&cell.text), Some(format)),
    }
}

/// Write `{dir}/{file_stem}.xlsx` and return its path.
pub fn export_xlsx(doc: &ReportDocument, dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = output_path(dir, &doc.file_stem, "xlsx");
    let path_str = path
        .to_str()
        .ok_or_else(|| ExportError::Path(path.display().to_string()))?;

    let workbook = Workbook::new(path_str)?;
    let mut sheet = workbook.add_worksheet(Some(SHEET_NAME))?;
    sheet.set_column(0, BAND_COLS, 16.0, None)?;

    let banner = banner_format();
    let header = header_format();
    let total = total_format();
    let body = body_format();
    let label = label_format();

    let mut row: u32 = 0;
    for section in &doc.sections {
        match section {
            Section::Banner { title, .. } => {
                sheet.merge_range(
                    row,
                    0,
                    row,
                    BAND_COLS - 1,
                    &sanitize_currency(title),
                    Some(&banner),
                )?;
                row += 2;
            }
            Section::KeyValues(pairs) => {
                for (key, value) in pairs {
                    sheet.write_string(row, 0, key, Some(&label))?;
                    sheet.write_string(row, 1, &sanitize_currency(value), None)?;
                    row += 1;
                }
                row += 1;
            }
            Section::Table {
                headers,
                rows,
                total_row,
            } => {
                for (col, text) in headers.iter().enumerate() {
                    sheet.write_string(row, col as u16, text, Some(&header))?;
                }
                row += 1;
                for cells in rows {
                    for (col, cell) in cells.iter().enumerate() {
                        write_cell(&mut sheet, row, col as u16, cell, &body)?;
                    }
                    row += 1;
                }
                if let Some(cells) = total_row {
                    for (col, cell) in cells.iter().enumerate() {
                        write_cell(&mut sheet, row, col as u16, cell, &total)?;
                    }
                    row += 1;
                }
                row += 1;
            }
        }
    }

    workbook.close()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::build_report_document;
    use crate::report::{OrderInfo, OrderReport};

    #[test]
    fn test_export_xlsx_writes_workbook() {
        let report = OrderReport {
            order: OrderInfo {
                id: "T-XLSX-1".into(),
                ..OrderInfo::default()
            },
            ..OrderReport::default()
        };
        let doc = build_report_document(&report);
        let dir = std::env::temp_dir().join("freshroute-xlsx-test");
        let path = export_xlsx(&doc, &dir).expect("export xlsx");
        assert_eq!(path.file_name().unwrap(), "Order_Report_T-XLSX-1.xlsx");
        let meta = std::fs::metadata(&path).expect("exported file exists");
        assert!(meta.len() > 0);
        let _ = std::fs::remove_file(path);
    }
}
