//! PDF export.
//!
//! Builds the report as raw PDF content streams: colored banner bands, ruled
//! table grids, and Helvetica text on A4 pages. Only ASCII ever reaches the
//! content stream - currency strings are sanitized to the `Rs.` prefix first.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::document::{
    sanitize_currency, Cell, ReportDocument, Rgb, Section, HEADER_FILL_GREEN, SECTION_GREEN,
    TOTAL_AMBER,
};
use crate::export::{output_path, ExportError};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 40.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const BANNER_HEIGHT: f32 = 20.0;
const ROW_HEIGHT: f32 = 14.0;
const BODY_SIZE: f32 = 9.0;
const BANNER_SIZE: f32 = 11.0;

const BLACK: Rgb = Rgb(0, 0, 0);
const WHITE: Rgb = Rgb(255, 255, 255);
const RULE_GRAY: Rgb = Rgb(189, 189, 189);

/// Accumulates page content streams while tracking a vertical cursor.
struct PdfBuilder {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl PdfBuilder {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn break_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(ops);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Start a new page when fewer than `needed` points remain.
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < MARGIN && !self.ops.is_empty() {
            self.break_page();
        }
    }

    fn set_fill(&mut self, color: Rgb) {
        self.ops.push(Operation::new(
            "rg",
            vec![
                (color.0 as f32 / 255.0).into(),
                (color.1 as f32 / 255.0).into(),
                (color.2 as f32 / 255.0).into(),
            ],
        ));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.set_fill(color);
        self.ops
            .push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        self.ops.push(Operation::new("f", vec![]));
    }

    fn text_at(&mut self, x: f32, y: f32, size: f32, bold: bool, color: Rgb, text: &str) {
        if text.is_empty() {
            return;
        }
        let font = if bold { "F2" } else { "F1" };
        self.set_fill(color);
        self.ops.push(Operation::new("BT", vec![]));
        self.ops
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops
            .push(Operation::new("Tj", vec![Object::string_literal(text)]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn banner(&mut self, title: &str) {
        self.ensure_room(BANNER_HEIGHT + ROW_HEIGHT);
        self.y -= BANNER_HEIGHT;
        self.fill_rect(MARGIN, self.y, CONTENT_WIDTH, BANNER_HEIGHT, SECTION_GREEN);
        self.text_at(
            MARGIN + 4.0,
            self.y + 6.0,
            BANNER_SIZE,
            true,
            WHITE,
            &fit(title, CONTENT_WIDTH, BANNER_SIZE),
        );
        self.y -= 6.0;
    }

    fn key_values(&mut self, pairs: &[(String, String)]) {
        for (label, value) in pairs {
            self.ensure_room(ROW_HEIGHT);
            self.y -= ROW_HEIGHT;
            self.text_at(MARGIN + 4.0, self.y, BODY_SIZE, true, BLACK, label);
            self.text_at(
                MARGIN + 110.0,
                self.y,
                BODY_SIZE,
                false,
                BLACK,
                &fit(&sanitize_currency(value), CONTENT_WIDTH - 110.0, BODY_SIZE),
            );
        }
        self.y -= 4.0;
    }

    fn table_row(&mut self, cells: &[String], widths: &[f32], bold: bool, fill: Option<Rgb>) {
        self.ensure_room(ROW_HEIGHT);
        self.y -= ROW_HEIGHT;
        if let Some(color) = fill {
            self.fill_rect(MARGIN, self.y - 2.0, CONTENT_WIDTH, ROW_HEIGHT, color);
        }
        let mut x = MARGIN;
        for (i, width) in widths.iter().enumerate() {
            if let Some(text) = cells.get(i) {
                self.text_at(
                    x + 2.0,
                    self.y,
                    BODY_SIZE,
                    bold,
                    BLACK,
                    &fit(text, *width - 4.0, BODY_SIZE),
                );
            }
            x += width;
        }
        // Hairline rule under every table row.
        self.fill_rect(MARGIN, self.y - 3.0, CONTENT_WIDTH, 0.5, RULE_GRAY);
    }

    fn table(&mut self, headers: &[String], rows: &[Vec<Cell>], total_row: Option<&Vec<Cell>>) {
        let cols = headers.len().max(1);
        let widths = vec![CONTENT_WIDTH / cols as f32; cols];

        self.table_row(headers, &widths, true, Some(HEADER_FILL_GREEN));
        for row in rows {
            let cells: Vec<String> = row.iter().map(|c| sanitize_currency(&c.text)).collect();
            self.table_row(&cells, &widths, false, None);
        }
        if let Some(row) = total_row {
            let cells: Vec<String> = row.iter().map(|c| sanitize_currency(&c.text)).collect();
            self.table_row(&cells, &widths, true, Some(TOTAL_AMBER));
        }
        self.y -= 6.0;
    }
}

/// Truncate to the number of characters that fit in `width` points at `size`.
fn fit(text: &str, width: f32, size: f32) -> String {
    let max_chars = (width / (size * 0.55)).max(1.0) as usize;
    if text.len() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('.');
    out
}

/// Write `{dir}/{file_stem}.pdf` and return its path.
pub fn export_pdf(doc_model: &ReportDocument, dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = output_path(dir, &doc_model.file_stem, "pdf");

    let mut builder = PdfBuilder::new();
    for section in &doc_model.sections {
        match section {
            Section::Banner { title, .. } => builder.banner(&sanitize_currency(title)),
            Section::KeyValues(pairs) => builder.key_values(pairs),
            Section::Table {
                headers,
                rows,
                total_row,
            } => builder.table(headers, rows, total_row.as_ref()),
        }
    }
    builder.break_page();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let font_bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_regular,
            "F2" => font_bold,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    let page_count = builder.pages.len() as i64;
    for ops in builder.pages {
        let content = Content { operations: ops };
        let stream = Stream::new(dictionary! {}, content.encode()?);
        let content_id = doc.add_object(stream);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(&path)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::build_report_document;
    use crate::report::{build_order_report, OrderInfo, ReportInputs};

    #[test]
    fn test_export_pdf_writes_document() {
        let inputs = ReportInputs {
            order: OrderInfo {
                id: "T-PDF-1".into(),
                customer_name: "Chennai Fresh Exports".into(),
                received_date: "2026-08-20".into(),
            },
            ..ReportInputs::default()
        };
        let report = build_order_report(&inputs);
        let doc = build_report_document(&report);
        let dir = std::env::temp_dir().join("freshroute-pdf-test");
        let path = export_pdf(&doc, &dir).expect("export pdf");
        assert_eq!(path.file_name().unwrap(), "Order_Report_T-PDF-1.pdf");
        let bytes = std::fs::read(&path).expect("exported file exists");
        assert!(bytes.starts_with(b"%PDF-"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_table_rows_are_ruled() {
        let mut builder = PdfBuilder::new();
        builder.table(
            &["Product".to_string(), "Amount".to_string()],
            &[
                vec![Cell::text("Tomato"), Cell::money(960.0)],
                vec![Cell::text("Okra"), Cell::money(150.0)],
            ],
            None,
        );
        // One fill rect for the header band plus one hairline per row.
        let rects = builder
            .ops
            .iter()
            .filter(|op| op.operator == "re")
            .count();
        assert_eq!(rects, 1 + 3);
    }

    #[test]
    fn test_fit_truncates_long_text() {
        let fitted = fit("A very long product description", 30.0, 9.0);
        assert!(fitted.len() <= 6 + 1);
        assert!(fitted.ends_with('.'));
        assert_eq!(fit("short", 300.0, 9.0), "short");
    }
}
