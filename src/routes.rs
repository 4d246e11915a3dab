//! Delivery-route aggregation.
//!
//! Partitions stage-3 delivery lines into per-driver route groups and prices
//! each line against the authoritative stage-4 net weights. Grouping order is
//! first-seen so repeated derivations produce identical structures.

use serde::Serialize;
use serde_json::Value;

use crate::labour::LabourResolution;
use crate::stage::{DeliveryStage, PricingRow};
use crate::{ids_match, value_id, value_str, UNASSIGNED_DRIVER};

/// Master-data driver row (`GET drivers`).
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Driver {
    pub did: String,
    pub driver_name: String,
    pub vehicle_number: String,
    pub mobile_number: String,
}

impl Driver {
    pub fn from_value(v: &Value) -> Self {
        Self {
            did: value_id(v, &["did", "driver_id", "id"]).unwrap_or_default(),
            driver_name: value_str(v, &["driver_name", "driverName", "name"]).unwrap_or_default(),
            vehicle_number: value_str(v, &["vehicle_number", "vehicleNumber"]).unwrap_or_default(),
            mobile_number: value_str(v, &["mobile_number", "mobileNumber", "phone"])
                .unwrap_or_default(),
        }
    }
}

/// One priced product line inside a route.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ProductLine {
    pub s_no: usize,
    pub product: String,
    pub gross_weight: f64,
    /// Stage-4 net weight when a pricing row matched, else the gross weight.
    pub net_weight: f64,
    /// Stage-4 unit price; 0 when no pricing row matched.
    pub rate: f64,
    /// `rate * net_weight`; 0 on a pricing miss.
    pub amount: f64,
    pub boxes: f64,
    pub ct: String,
    pub labour: String,
    pub packing_type: String,
}

/// One driver's consolidated delivery manifest for the order.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct RouteGroup {
    /// Resolved driver name, or [`UNASSIGNED_DRIVER`].
    pub driver: String,
    /// Master-data record when the driver resolved through an id match.
    pub driver_info: Option<Driver>,
    /// First non-empty airport seen on the route's lines.
    pub airport_name: String,
    pub products: Vec<ProductLine>,
    pub total_amount: f64,
    pub total_weight: f64,
    pub total_boxes: f64,
}

/// Resolve the driver for one delivery line. First match wins:
/// id reference, line text, airport-group lookup, then the sentinel.
fn resolve_driver<'a>(
    line_product: &str,
    selected_driver: &str,
    driver_name: &str,
    stage: &DeliveryStage,
    drivers: &'a [Driver],
) -> (String, Option<&'a Driver>) {
    if !selected_driver.is_empty() {
        if let Some(d) = drivers.iter().find(|d| ids_match(&d.did, selected_driver)) {
            return (d.driver_name.clone(), Some(d));
        }
    }
    if !driver_name.trim().is_empty() {
        return (driver_name.trim().to_string(), None);
    }
    if let Some(entry) = stage
        .airport_entries
        .iter()
        .find(|e| !e.driver.trim().is_empty() && e.product.trim() == line_product.trim())
    {
        return (entry.driver.trim().to_string(), None);
    }
    (UNASSIGNED_DRIVER.to_string(), None)
}

/// Group stage-3 lines into routes and accumulate running totals.
///
/// Weight and box totals always count the line; a stage-4 pricing miss only
/// zeroes its amount contribution, so the sum of route weights conserves the
/// stage-3 gross weights regardless of driver resolution.
pub fn group_routes(
    stage: &DeliveryStage,
    pricing: &[PricingRow],
    drivers: &[Driver],
    labour: &LabourResolution,
) -> Vec<RouteGroup> {
    let mut groups: Vec<RouteGroup> = Vec::new();

    for line in &stage.lines {
        let (driver, driver_info) = resolve_driver(
            &line.product,
            &line.selected_driver,
            &line.driver_name,
            stage,
            drivers,
        );

        let matched = pricing
            .iter()
            .find(|row| row.product.trim() == line.product.trim());
        let (net_weight, rate, amount) = match matched {
            Some(row) => (row.net_weight, row.price, row.price * row.net_weight),
            None => (line.gross_weight, 0.0, 0.0),
        };

        let labour_names = match line.labour.trim() {
            "" => labour
                .labour_for(&line.ct, &line.product)
                .unwrap_or_default()
                .to_string(),
            explicit => explicit.to_string(),
        };

        let pos = match groups.iter().position(|g| g.driver == driver) {
            Some(p) => p,
            None => {
                groups.push(RouteGroup {
                    driver: driver.clone(),
                    driver_info: driver_info.cloned(),
                    ..RouteGroup::default()
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[pos];

        if group.airport_name.is_empty() && !line.airport.trim().is_empty() {
            group.airport_name = line.airport.trim().to_string();
        }

        group.products.push(ProductLine {
            // Serials restart per route, not per stage-3 line.
            s_no: group.products.len() + 1,
            product: line.product.clone(),
            gross_weight: line.gross_weight,
            net_weight,
            rate,
            amount,
            boxes: line.packages,
            ct: line.ct.clone(),
            labour: labour_names,
            packing_type: line.packing_type.clone(),
        });
        group.total_amount += amount;
        group.total_weight += line.gross_weight;
        group.total_boxes += line.packages;
    }

    groups
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::delivery_stage;
    use serde_json::json;

    fn drivers() -> Vec<Driver> {
        vec![Driver {
            did: "7".into(),
            driver_name: "Ravi".into(),
            vehicle_number: "TN-09-1234".into(),
            mobile_number: "9876500000".into(),
        }]
    }

    fn pricing() -> Vec<PricingRow> {
        vec![PricingRow {
            product: "Tomato".into(),
            net_weight: 48.0,
            price: 20.0,
        }]
    }

    #[test]
    fn test_scenario_priced_route_for_resolved_driver() {
        let stage = delivery_stage(&json!({ "products": [{
            "product": "Tomato",
            "grossWeight": "50kg",
            "noOfPkgs": 5,
            "packingType": "10kg Box",
            "selectedDriver": 7,
        }]}));
        let groups = group_routes(&stage, &pricing(), &drivers(), &LabourResolution::default());
        assert_eq!(groups.len(), 1);
        let ravi = &groups[0];
        assert_eq!(ravi.driver, "Ravi");
        assert_eq!(ravi.total_weight, 50.0);
        assert_eq!(ravi.total_amount, 960.0); // 48 x 20
        assert_eq!(ravi.total_boxes, 5.0);
        assert_eq!(ravi.products[0].net_weight, 48.0);
        assert!(ravi.driver_info.is_some());
    }

    #[test]
    fn test_scenario_unresolvable_driver_lands_in_unassigned() {
        let stage = delivery_stage(&json!({ "products": [{
            "product": "Tomato",
            "grossWeight": "50kg",
            "noOfPkgs": 5,
        }]}));
        let groups = group_routes(&stage, &pricing(), &drivers(), &LabourResolution::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].driver, UNASSIGNED_DRIVER);
        assert!(groups[0].driver_info.is_none());
    }

    #[test]
    fn test_airport_group_fallback_resolves_driver() {
        let stage = delivery_stage(&json!({
            "products": [{ "product": "Okra", "grossWeight": 20 }],
            "summaryData": { "airportGroups": {
                "BLR": { "products": [{ "product": "Okra", "driver": "Kumar" }] }
            }}
        }));
        let groups = group_routes(&stage, &[], &drivers(), &LabourResolution::default());
        assert_eq!(groups[0].driver, "Kumar");
    }

    #[test]
    fn test_weight_conservation_across_routes() {
        let stage = delivery_stage(&json!({ "products": [
            { "product": "Tomato", "grossWeight": "50kg", "selectedDriver": "7" },
            { "product": "Okra", "grossWeight": 20, "driver": "Kumar" },
            { "product": "Beans", "grossWeight": "12.5" },
        ]}));
        let groups = group_routes(&stage, &pricing(), &drivers(), &LabourResolution::default());
        let total: f64 = groups.iter().map(|g| g.total_weight).sum();
        assert_eq!(total, 82.5);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_pricing_miss_contributes_weight_but_no_amount() {
        let stage = delivery_stage(&json!({ "products": [
            { "product": "Cabbage", "grossWeight": 30, "noOfPkgs": 3, "selectedDriver": 7 },
        ]}));
        let groups = group_routes(&stage, &pricing(), &drivers(), &LabourResolution::default());
        let g = &groups[0];
        assert_eq!(g.total_amount, 0.0);
        assert_eq!(g.total_weight, 30.0);
        assert_eq!(g.total_boxes, 3.0);
        assert_eq!(g.products[0].net_weight, 30.0);
        assert_eq!(g.products[0].rate, 0.0);
    }

    #[test]
    fn test_serial_numbers_restart_per_route() {
        let stage = delivery_stage(&json!({ "products": [
            { "product": "Tomato", "grossWeight": 10, "selectedDriver": 7 },
            { "product": "Okra", "grossWeight": 10, "driver": "Kumar" },
            { "product": "Beans", "grossWeight": 10, "selectedDriver": 7 },
            { "product": "Carrot", "grossWeight": 10, "driver": "Kumar" },
        ]}));
        let groups = group_routes(&stage, &[], &drivers(), &LabourResolution::default());
        for group in &groups {
            let serials: Vec<usize> = group.products.iter().map(|p| p.s_no).collect();
            assert_eq!(serials, vec![1, 2]);
        }
    }

    #[test]
    fn test_airport_name_first_line_wins() {
        let stage = delivery_stage(&json!({ "products": [
            { "product": "Tomato", "grossWeight": 10, "selectedDriver": 7, "airportName": "" },
            { "product": "Okra", "grossWeight": 10, "selectedDriver": 7, "airportName": "MAA" },
            { "product": "Beans", "grossWeight": 10, "selectedDriver": 7, "airportName": "BLR" },
        ]}));
        let groups = group_routes(&stage, &[], &drivers(), &LabourResolution::default());
        assert_eq!(groups[0].airport_name, "MAA");
    }
}
