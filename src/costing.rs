//! Per-route cost breakdown.
//!
//! Derives packaging-material counts from free-text packing descriptions,
//! prices them against the inventory stock master data, and layers labour,
//! pickup, tape/paper, and driver-wage overhead on top of the produce value.
//! Missing price data never fails a report: every lookup carries a documented
//! fallback constant.

use serde::Serialize;
use serde_json::Value;

use crate::labour::LabourResolution;
use crate::routes::RouteGroup;
use crate::{value_f64, value_str};

// Fallback unit prices (Rs.) when inventory stock has no matching item.
pub const FALLBACK_10KG_BOX: f64 = 80.0;
pub const FALLBACK_5KG_BOX: f64 = 45.0;
pub const FALLBACK_THERMO: f64 = 145.0;
pub const FALLBACK_NET_BAG: f64 = 0.0;
pub const FALLBACK_TAPE: f64 = 40.0;
pub const FALLBACK_PAPER: f64 = 390.0;
/// Flat tape+paper charge used when both lookups price out at zero.
pub const FALLBACK_TAPE_PAPER_FLAT: f64 = 430.0;

/// Master-data driver rate row (`GET driver-rate/list`).
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DriverRate {
    pub delivery_type: String,
    pub amount: f64,
    pub status: String,
}

impl DriverRate {
    pub fn from_value(v: &Value) -> Self {
        Self {
            delivery_type: value_str(v, &["deliveryType", "delivery_type", "type"])
                .unwrap_or_default(),
            amount: value_f64(v, &["amount", "rate"]).unwrap_or(0.0),
            status: value_str(v, &["status"]).unwrap_or_default(),
        }
    }
}

/// Master-data inventory stock row (`GET inventory-stock`), reduced to the
/// name and unit price the calculator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct StockItem {
    pub name: String,
    pub unit_price: f64,
}

impl StockItem {
    pub fn from_value(v: &Value) -> Self {
        Self {
            name: value_str(v, &["product_name", "item_name", "name"]).unwrap_or_default(),
            unit_price: value_f64(v, &["average_price", "unit_price", "price"]).unwrap_or(0.0),
        }
    }
}

/// Case-insensitive substring lookup into the stock list.
fn stock_price(stock: &[StockItem], query: &str) -> Option<f64> {
    let query = query.to_lowercase();
    stock
        .iter()
        .find(|item| item.name.to_lowercase().contains(&query))
        .map(|item| item.unit_price)
}

/// Packaging-material buckets derived per route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct PackagingCounts {
    pub ten_kg_boxes: f64,
    pub five_kg_boxes: f64,
    pub thermo_boxes: f64,
    pub net_bags: f64,
}

/// Classification priority over the lower-cased packing description. The
/// packing type wins when present; the product name stands in otherwise.
/// 10kg box is the default bucket.
fn classify(packing_type: &str, product: &str) -> Bucket {
    let source = if packing_type.trim().is_empty() {
        product
    } else {
        packing_type
    };
    let text = source.to_lowercase();
    if text.contains("5kg") || text.contains("5 kg") {
        Bucket::FiveKg
    } else if text.contains("thermo") {
        Bucket::Thermo
    } else if text.contains("bag") {
        Bucket::NetBag
    } else {
        Bucket::TenKg
    }
}

enum Bucket {
    TenKg,
    FiveKg,
    Thermo,
    NetBag,
}

/// Full cost breakdown for one route.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CostBreakdown {
    pub counts: PackagingCounts,
    pub price_10kg: f64,
    pub price_5kg: f64,
    pub price_thermo: f64,
    pub price_net_bag: f64,
    pub total_box_cost: f64,

    /// Sum of actual per-person wages for the route's unique labour names.
    pub labour_cost: f64,
    pub labour_count: usize,
    /// Presentation-only averaged rate; the stored total stays the wage sum.
    pub avg_labour_rate: f64,

    pub pickup_cost: f64,
    pub tape_paper_cost: f64,
    pub driver_wage: f64,
    pub total_overhead: f64,
    pub total_expenses: f64,

    /// Produce sale value carried over from the route aggregation.
    pub veg_total: f64,
    pub grand_total: f64,
    /// `grand_total / max(weight, 1)`, rounded; zero weight clamps to 1.
    pub grand_total_per_kg: f64,
}

/// Unique trimmed labour names across a route's product lines, in first-seen
/// order. Comma-joined cells are split apart.
fn unique_labour_names(route: &RouteGroup) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in &route.products {
        for part in line.labour.split(',') {
            let part = part.trim();
            if !part.is_empty() && !names.iter().any(|n| n == part) {
                names.push(part.to_string());
            }
        }
    }
    names
}

/// Compute the cost breakdown for one route. Pure: identical inputs always
/// yield an identical breakdown.
pub fn cost_breakdown(
    route: &RouteGroup,
    labour: &LabourResolution,
    stock: &[StockItem],
    driver_rates: &[DriverRate],
) -> CostBreakdown {
    let mut counts = PackagingCounts::default();
    for line in &route.products {
        match classify(&line.packing_type, &line.product) {
            Bucket::FiveKg => counts.five_kg_boxes += line.boxes,
            Bucket::Thermo => counts.thermo_boxes += line.boxes,
            Bucket::NetBag => counts.net_bags += line.boxes,
            Bucket::TenKg => counts.ten_kg_boxes += line.boxes,
        }
    }

    let price_10kg = stock_price(stock, "10 kg box").unwrap_or(FALLBACK_10KG_BOX);
    let price_5kg = stock_price(stock, "5 kg box").unwrap_or(FALLBACK_5KG_BOX);
    let price_thermo = stock_price(stock, "thermo").unwrap_or(FALLBACK_THERMO);
    let price_net_bag = stock_price(stock, "net bag").unwrap_or(FALLBACK_NET_BAG);

    let total_box_cost = counts.ten_kg_boxes * price_10kg
        + counts.five_kg_boxes * price_5kg
        + counts.thermo_boxes * price_thermo
        + counts.net_bags * price_net_bag;

    let names = unique_labour_names(route);
    let labour_cost: f64 = names.iter().map(|name| labour.wage_for(name)).sum();
    let labour_count = names.len();
    let avg_labour_rate = if labour_count > 0 {
        labour_cost / labour_count as f64
    } else {
        0.0
    };

    let pickup_cost = stock_price(stock, "pickup").unwrap_or(0.0);

    let tape = stock_price(stock, "tape").unwrap_or(FALLBACK_TAPE);
    let paper = stock_price(stock, "paper").unwrap_or(FALLBACK_PAPER);
    let tape_paper_cost = if tape + paper == 0.0 {
        FALLBACK_TAPE_PAPER_FLAT
    } else {
        tape + paper
    };

    let driver_wage = driver_rates
        .iter()
        .find(|r| r.status == "Active" && r.delivery_type.to_lowercase().contains("airport"))
        .or_else(|| driver_rates.iter().find(|r| r.status == "Active"))
        .map(|r| r.amount)
        .unwrap_or(0.0);

    let total_overhead = labour_cost + pickup_cost + tape_paper_cost + driver_wage;
    let total_expenses = total_box_cost + total_overhead;
    let veg_total = route.total_amount;
    let grand_total = veg_total + total_expenses;
    let grand_total_per_kg = (grand_total / route.total_weight.max(1.0)).round();

    CostBreakdown {
        counts,
        price_10kg,
        price_5kg,
        price_thermo,
        price_net_bag,
        total_box_cost,
        labour_cost,
        labour_count,
        avg_labour_rate,
        pickup_cost,
        tape_paper_cost,
        driver_wage,
        total_overhead,
        total_expenses,
        veg_total,
        grand_total,
        grand_total_per_kg,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
