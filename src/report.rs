//! Order report assembly.
//!
//! `build_order_report` is the single entry point of the derivation pipeline:
//! it splits the assignment into stage blobs, resolves labour, groups routes,
//! prices every route, and returns one immutable snapshot for the renderers.
//! The pipeline is synchronous, allocation-only, and total - missing or
//! malformed inputs produce empty sections, never an error.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::costing::{cost_breakdown, CostBreakdown, DriverRate, StockItem};
use crate::labour::{resolve_labour, LabourRate, LabourResolution};
use crate::routes::{group_routes, Driver, RouteGroup};
use crate::stage::{
    collection_stage, packaging_stage, delivery_stage, pricing_rows, split_assignment,
    CollectionStage, PackagingStage, PricingRow,
};
use crate::{value_id, value_str};

/// Order header fields the report displays.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct OrderInfo {
    pub id: String,
    pub customer_name: String,
    pub received_date: String,
}

impl OrderInfo {
    pub fn from_value(v: &Value) -> Self {
        Self {
            id: value_id(v, &["oid", "order_auto_id", "id"]).unwrap_or_default(),
            customer_name: value_str(v, &["customer_name", "customerName"]).unwrap_or_default(),
            received_date: value_str(v, &["order_received_date", "orderReceivedDate"])
                .unwrap_or_default(),
        }
    }
}

/// Everything the pipeline consumes for one report: the order header, the
/// raw assignment record, and the master-data lookups fetched alongside it.
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    pub order: OrderInfo,
    pub assignment: Value,
    pub drivers: Vec<Driver>,
    pub labour_rates: Vec<LabourRate>,
    pub driver_rates: Vec<DriverRate>,
    pub stock: Vec<StockItem>,
}

/// One route with its cost breakdown attached.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PricedRoute {
    pub route: RouteGroup,
    pub costs: CostBreakdown,
}

/// The fully derived report structure all three renderers consume.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct OrderReport {
    pub order: OrderInfo,
    pub generated_at: String,
    pub collection: CollectionStage,
    pub packaging: PackagingStage,
    pub labour: LabourResolution,
    pub routes: Vec<PricedRoute>,
    pub pricing: Vec<PricingRow>,
    /// Sum of `price * net_weight` over the stage-4 rows.
    pub pricing_total: f64,
    /// Sum of route gross weights (conserves the stage-3 line weights).
    pub total_weight: f64,
    /// Sum of route grand totals (produce value plus expenses).
    pub grand_total: f64,
}

/// Run the full derivation pipeline. Pure aside from the timestamp; rerunning
/// on identical inputs yields an identical structure.
pub fn build_order_report(inputs: &ReportInputs) -> OrderReport {
    let blobs = split_assignment(&inputs.assignment);

    let collection = collection_stage(&blobs.collection, &blobs.collection_summary);
    let packaging = packaging_stage(&blobs.packaging, &blobs.packaging_summary);
    let delivery = delivery_stage(&blobs.delivery);
    let pricing = pricing_rows(&blobs.pricing);

    let labour = resolve_labour(&packaging, &inputs.labour_rates);
    let route_groups = group_routes(&delivery, &pricing, &inputs.drivers, &labour);

    let routes: Vec<PricedRoute> = route_groups
        .into_iter()
        .map(|route| {
            let costs = cost_breakdown(&route, &labour, &inputs.stock, &inputs.driver_rates);
            PricedRoute { route, costs }
        })
        .collect();

    let pricing_total = pricing.iter().map(|row| row.price * row.net_weight).sum();
    let total_weight = routes.iter().map(|r| r.route.total_weight).sum();
    let grand_total = routes.iter().map(|r| r.costs.grand_total).sum();

    OrderReport {
        order: inputs.order.clone(),
        generated_at: Utc::now().to_rfc3339(),
        collection,
        packaging,
        labour,
        routes,
        pricing,
        pricing_total,
        total_weight,
        grand_total,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs() -> ReportInputs {
        ReportInputs {
            order: OrderInfo {
                id: "ORD-001".into(),
                customer_name: "Chennai Fresh Exports".into(),
                received_date: "2026-08-20".into(),
            },
            assignment: json!({
                "stage1_data": "[{\"product\":\"Tomato\",\"entityType\":\"Farmer\",\"entityName\":\"Murugan\",\"assignedQty\":50,\"assignedBoxes\":5,\"place\":\"Oddanchatram\"}]",
                "stage2_data": [{ "product": "Tomato", "labourName": "Mani", "wastage": 2, "tapeColor": "Red", "tapeQuantity": 1 }],
                "stage2_summary_data": { "labourPrices": [{ "labourName": "Mani", "totalAmount": 150 }] },
                "stage3_data": { "products": [{
                    "product": "Tomato",
                    "grossWeight": "50kg",
                    "noOfPkgs": 5,
                    "packingType": "10kg Box",
                    "selectedDriver": 7,
                    "airportName": "MAA"
                }]},
                "stage4_data": { "reviewData": { "productRows": [
                    { "product_name": "Tomato", "net_weight": 48, "price": 20 }
                ]}},
            }),
            drivers: vec![Driver {
                did: "7".into(),
                driver_name: "Ravi".into(),
                ..Driver::default()
            }],
            labour_rates: vec![LabourRate {
                labour_type: "Normal".into(),
                amount: 100.0,
                status: "Active".into(),
            }],
            driver_rates: vec![DriverRate {
                delivery_type: "Airport".into(),
                amount: 500.0,
                status: "Active".into(),
            }],
            stock: vec![],
        }
    }

    #[test]
    fn test_end_to_end_derivation() {
        let report = build_order_report(&inputs());
        assert_eq!(report.collection.items.len(), 1);
        assert_eq!(report.packaging.items.len(), 1);
        assert_eq!(report.routes.len(), 1);

        let priced = &report.routes[0];
        assert_eq!(priced.route.driver, "Ravi");
        assert_eq!(priced.route.airport_name, "MAA");
        assert_eq!(priced.route.total_amount, 960.0);
        assert_eq!(priced.route.total_weight, 50.0);
        assert_eq!(priced.route.products[0].labour, "Mani");

        // 5 boxes x 80 fallback + labour 150 + tape/paper 430 + driver 500
        assert_eq!(priced.costs.total_box_cost, 400.0);
        assert_eq!(priced.costs.labour_cost, 150.0);
        assert_eq!(priced.costs.driver_wage, 500.0);
        assert_eq!(priced.costs.total_expenses, 400.0 + 150.0 + 430.0 + 500.0);
        assert_eq!(priced.costs.grand_total, 960.0 + 1480.0);
        assert_eq!(priced.costs.grand_total_per_kg, (2440.0_f64 / 50.0).round());

        assert_eq!(report.pricing_total, 960.0);
        assert_eq!(report.total_weight, 50.0);
        assert_eq!(report.grand_total, 2440.0);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let inputs = inputs();
        let mut a = build_order_report(&inputs);
        let mut b = build_order_report(&inputs);
        // Timestamps differ by construction; everything derived must not.
        a.generated_at.clear();
        b.generated_at.clear();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_assignment_still_produces_report() {
        let mut inputs = inputs();
        inputs.assignment = Value::Null;
        let report = build_order_report(&inputs);
        assert!(report.collection.items.is_empty());
        assert!(report.packaging.items.is_empty());
        assert!(report.routes.is_empty());
        assert!(report.pricing.is_empty());
        assert_eq!(report.grand_total, 0.0);
    }
}
