//! Renderer-agnostic report document.
//!
//! The derivation pipeline produces an [`OrderReport`]; this module flattens
//! it into a linear list of layout sections (banners, key/value blocks,
//! tables) that the PDF, spreadsheet, and text renderers all walk the same
//! way. Renderers own layout primitives only - they never touch derived data.

use serde::Serialize;

use crate::report::OrderReport;
use crate::UNASSIGNED_DRIVER;

// Section banner / accent colors shared by the PDF and XLSX exporters.
// Green family marks section headers, amber marks totals.
pub const SECTION_GREEN: Rgb = Rgb(46, 125, 50);
pub const HEADER_FILL_GREEN: Rgb = Rgb(200, 230, 201);
pub const TOTAL_AMBER: Rgb = Rgb(255, 193, 7);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Packed 0xRRGGBB form, as the spreadsheet library expects.
    pub fn packed(self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }
}

/// One table cell. Numeric cells carry the raw value so the spreadsheet
/// exporter can emit real numbers; the display text is authoritative for the
/// PDF and text renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Cell {
    pub text: String,
    pub number: Option<f64>,
    pub emphasize: bool,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell {
            text: s.into(),
            ..Cell::default()
        }
    }

    pub fn num(v: f64) -> Self {
        Cell {
            text: qty(v),
            number: Some(v),
            ..Cell::default()
        }
    }

    /// Currency cell with the ASCII `Rs.` prefix.
    pub fn money(v: f64) -> Self {
        Cell {
            text: rupees(v),
            number: Some(v),
            ..Cell::default()
        }
    }

    pub fn emphasized(mut self) -> Self {
        self.emphasize = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Section {
    /// Colored full-width section header.
    Banner { title: String, color: Rgb },
    /// Label/value pairs (order header, driver info).
    KeyValues(Vec<(String, String)>),
    /// Column-headed grid with an optional highlighted total row.
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
        total_row: Option<Vec<Cell>>,
    },
}

/// The flattened report all renderers consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    /// Export file name without extension, e.g. `Order_Report_1042`.
    pub file_stem: String,
    pub sections: Vec<Section>,
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// The document libraries mis-render the rupee glyph, so every exported
/// string is forced to the ASCII `Rs. ` prefix.
pub fn sanitize_currency(input: &str) -> String {
    if !input.contains('\u{20B9}') {
        return input.to_string();
    }
    input.replace('\u{20B9}', "Rs. ").replace("Rs.  ", "Rs. ")
}

pub fn rupees(value: f64) -> String {
    format!("Rs. {value:.2}")
}

pub fn qty(value: f64) -> String {
    if (value.round() - value).abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn dash(s: &str) -> String {
    if s.trim().is_empty() {
        "-".to_string()
    } else {
        s.trim().to_string()
    }
}

fn empty_table(headers: Vec<String>) -> Section {
    let width = headers.len();
    let mut row = vec![Cell::text("No data available")];
    row.resize(width.max(1), Cell::default());
    Section::Table {
        headers,
        rows: vec![row],
        total_row: None,
    }
}

// ---------------------------------------------------------------------------
// Document assembly
// ---------------------------------------------------------------------------

/// Flatten an [`OrderReport`] into renderer sections. Section order is fixed:
/// Order Info, Stage 1, Stage 2, per-route Stage 3 breakdowns, Stage 4.
pub fn build_report_document(report: &OrderReport) -> ReportDocument {
    let mut sections = Vec::new();

    // Order info
    sections.push(Section::Banner {
        title: format!("Order Report - {}", dash(&report.order.id)),
        color: SECTION_GREEN,
    });
    sections.push(Section::KeyValues(vec![
        ("Order ID".into(), dash(&report.order.id)),
        ("Customer".into(), dash(&report.order.customer_name)),
        ("Received".into(), dash(&report.order.received_date)),
        ("Generated".into(), dash(&report.generated_at)),
    ]));

    // Stage 1 - collection
    sections.push(Section::Banner {
        title: "Stage 1 - Collection".into(),
        color: SECTION_GREEN,
    });
    let headers: Vec<String> = ["Product", "Entity Type", "Entity Name", "Qty", "Boxes", "Place"]
        .map(String::from)
        .to_vec();
    if report.collection.items.is_empty() {
        sections.push(empty_table(headers));
    } else {
        let rows = report
            .collection
            .items
            .iter()
            .map(|item| {
                vec![
                    Cell::text(dash(&item.product)),
                    Cell::text(dash(&item.entity_type)),
                    Cell::text(dash(&item.entity_name)),
                    Cell::num(item.assigned_qty),
                    Cell::num(item.assigned_boxes as f64),
                    Cell::text(dash(&item.place)),
                ]
            })
            .collect();
        sections.push(Section::Table {
            headers,
            rows,
            total_row: None,
        });
    }
    if !report.collection.assignments.is_empty() {
        let rows = report
            .collection
            .assignments
            .iter()
            .map(|a| {
                vec![
                    Cell::text(dash(&a.driver)),
                    Cell::text(dash(&a.product)),
                    Cell::text(dash(&a.entity_name)),
                    Cell::text(dash(&a.entity_type)),
                    Cell::text(dash(&a.labour)),
                ]
            })
            .collect();
        sections.push(Section::Table {
            headers: ["Driver", "Product", "Entity Name", "Entity Type", "Labour"]
                .map(String::from)
                .to_vec(),
            rows,
            total_row: None,
        });
    }

    // Stage 2 - packaging
    sections.push(Section::Banner {
        title: "Stage 2 - Packaging".into(),
        color: SECTION_GREEN,
    });
    let headers: Vec<String> = ["Product", "Wastage", "Reuse", "Tape Color", "Tape Qty", "Labour"]
        .map(String::from)
        .to_vec();
    if report.packaging.items.is_empty() {
        sections.push(empty_table(headers));
    } else {
        let rows = report
            .packaging
            .items
            .iter()
            .map(|item| {
                vec![
                    Cell::text(dash(&item.product)),
                    Cell::num(item.wastage),
                    Cell::num(item.reuse),
                    Cell::text(dash(&item.tape_color)),
                    Cell::num(item.tape_quantity),
                    Cell::text(dash(&item.labour_name)),
                ]
            })
            .collect();
        sections.push(Section::Table {
            headers,
            rows,
            total_row: None,
        });
    }

    // Stage 3 - per-route breakdown
    if report.routes.is_empty() {
        sections.push(Section::Banner {
            title: "Stage 3 - Delivery".into(),
            color: SECTION_GREEN,
        });
        sections.push(empty_table(
            ["Product", "Boxes", "Gross Wt", "Net Wt", "Rate", "Amount"]
                .map(String::from)
                .to_vec(),
        ));
    }
    for priced in &report.routes {
        let route = &priced.route;
        let costs = &priced.costs;

        let mut title = format!("Route - {}", route.driver);
        if !route.airport_name.is_empty() {
            title.push_str(&format!(" ({})", route.airport_name));
        }
        sections.push(Section::Banner {
            title,
            color: SECTION_GREEN,
        });

        if let Some(info) = &route.driver_info {
            sections.push(Section::KeyValues(vec![
                ("Vehicle".into(), dash(&info.vehicle_number)),
                ("Mobile".into(), dash(&info.mobile_number)),
            ]));
        } else if route.driver == UNASSIGNED_DRIVER {
            sections.push(Section::KeyValues(vec![(
                "Driver".into(),
                "Not assigned".into(),
            )]));
        }

        let rows = route
            .products
            .iter()
            .map(|line| {
                vec![
                    Cell::num(line.s_no as f64),
                    Cell::text(dash(&line.product)),
                    Cell::text(dash(&line.packing_type)),
                    Cell::num(line.boxes),
                    Cell::num(line.gross_weight),
                    Cell::num(line.net_weight),
                    Cell::money(line.rate),
                    Cell::money(line.amount),
                    Cell::text(dash(&line.labour)),
                ]
            })
            .collect();
        sections.push(Section::Table {
            headers: [
                "S.No", "Product", "Packing", "Boxes", "Gross Wt", "Net Wt", "Rate", "Amount",
                "Labour",
            ]
            .map(String::from)
            .to_vec(),
            rows,
            total_row: Some(vec![
                Cell::text("Total"),
                Cell::default(),
                Cell::default(),
                Cell::num(route.total_boxes).emphasized(),
                Cell::num(route.total_weight).emphasized(),
                Cell::default(),
                Cell::default(),
                Cell::money(route.total_amount).emphasized(),
                Cell::default(),
            ]),
        });

        // Cost breakdown grid for the route.
        let counts = &costs.counts;
        let mut rows = Vec::new();
        let mut push_bucket = |label: &str, count: f64, price: f64| {
            if count > 0.0 {
                rows.push(vec![
                    Cell::text(label),
                    Cell::num(count),
                    Cell::money(price),
                    Cell::money(count * price),
                ]);
            }
        };
        push_bucket("10kg Boxes", counts.ten_kg_boxes, costs.price_10kg);
        push_bucket("5kg Boxes", counts.five_kg_boxes, costs.price_5kg);
        push_bucket("Thermo Boxes", counts.thermo_boxes, costs.price_thermo);
        push_bucket("Net Bags", counts.net_bags, costs.price_net_bag);
        rows.push(vec![
            Cell::text("Labour"),
            Cell::num(costs.labour_count as f64),
            Cell::money(costs.avg_labour_rate),
            Cell::money(costs.labour_cost),
        ]);
        rows.push(vec![
            Cell::text("Pickup"),
            Cell::default(),
            Cell::default(),
            Cell::money(costs.pickup_cost),
        ]);
        rows.push(vec![
            Cell::text("Tape & Paper"),
            Cell::default(),
            Cell::default(),
            Cell::money(costs.tape_paper_cost),
        ]);
        rows.push(vec![
            Cell::text("Driver Wage"),
            Cell::default(),
            Cell::default(),
            Cell::money(costs.driver_wage),
        ]);
        rows.push(vec![
            Cell::text("Total Expenses"),
            Cell::default(),
            Cell::default(),
            Cell::money(costs.total_expenses).emphasized(),
        ]);
        rows.push(vec![
            Cell::text("Vegetable Total"),
            Cell::default(),
            Cell::default(),
            Cell::money(costs.veg_total).emphasized(),
        ]);
        sections.push(Section::Table {
            headers: ["Cost Item", "Count", "Rate", "Amount"].map(String::from).to_vec(),
            rows,
            total_row: Some(vec![
                Cell::text("Grand Total"),
                Cell::default(),
                Cell::money(costs.grand_total_per_kg).emphasized(),
                Cell::money(costs.grand_total).emphasized(),
            ]),
        });
    }

    // Stage 4 - final pricing
    sections.push(Section::Banner {
        title: "Stage 4 - Final Pricing".into(),
        color: SECTION_GREEN,
    });
    let headers: Vec<String> = ["Product", "Net Weight", "Price", "Amount"]
        .map(String::from)
        .to_vec();
    if report.pricing.is_empty() {
        sections.push(empty_table(headers));
    } else {
        let rows = report
            .pricing
            .iter()
            .map(|row| {
                vec![
                    Cell::text(dash(&row.product)),
                    Cell::num(row.net_weight),
                    Cell::money(row.price),
                    Cell::money(row.price * row.net_weight),
                ]
            })
            .collect();
        sections.push(Section::Table {
            headers,
            rows,
            total_row: Some(vec![
                Cell::text("Grand Total"),
                Cell::default(),
                Cell::default(),
                Cell::money(report.pricing_total).emphasized(),
            ]),
        });
    }

    ReportDocument {
        title: format!("Order Report {}", dash(&report.order.id)),
        file_stem: format!("Order_Report_{}", dash(&report.order.id)),
        sections,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{OrderInfo, OrderReport};

    fn banners(doc: &ReportDocument) -> Vec<String> {
        doc.sections
            .iter()
            .filter_map(|s| match s {
                Section::Banner { title, .. } => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_section_ordering_on_empty_report() {
        let report = OrderReport {
            order: OrderInfo {
                id: "1042".into(),
                ..OrderInfo::default()
            },
            ..OrderReport::default()
        };
        let doc = build_report_document(&report);
        let titles = banners(&doc);
        assert_eq!(
            titles,
            vec![
                "Order Report - 1042",
                "Stage 1 - Collection",
                "Stage 2 - Packaging",
                "Stage 3 - Delivery",
                "Stage 4 - Final Pricing",
            ]
        );
        assert_eq!(doc.file_stem, "Order_Report_1042");

        // Empty stages degrade to a "No data available" row, never vanish.
        let has_placeholder = doc.sections.iter().any(|s| match s {
            Section::Table { rows, .. } => rows
                .iter()
                .any(|r| r.first().map(|c| c.text.as_str()) == Some("No data available")),
            _ => false,
        });
        assert!(has_placeholder);
    }

    #[test]
    fn test_sanitize_currency_replaces_rupee_glyph() {
        assert_eq!(sanitize_currency("\u{20B9}150.00"), "Rs. 150.00");
        assert_eq!(sanitize_currency("\u{20B9} 150"), "Rs. 150");
        assert_eq!(sanitize_currency("Rs. 150.00"), "Rs. 150.00");
        assert!(!sanitize_currency("total \u{20B9}99").contains('\u{20B9}'));
    }

    #[test]
    fn test_money_cells_carry_numbers_for_spreadsheet() {
        let cell = Cell::money(960.0);
        assert_eq!(cell.text, "Rs. 960.00");
        assert_eq!(cell.number, Some(960.0));
        let cell = Cell::num(48.5);
        assert_eq!(cell.text, "48.50");
    }
}
