//! Stage payload parsing for order-fulfillment assignments.
//!
//! Each order carries four stage blobs (collection, packaging, delivery
//! routing, final pricing) persisted by the admin frontend. A blob may arrive
//! as a JSON string (sometimes double-encoded), an already-parsed object, or
//! be missing entirely; field names drift between camelCase and snake_case
//! across producer versions. Everything here normalizes that mess into typed
//! records and never fails: a malformed stage yields an empty section so the
//! rest of the report still renders.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::{numeric_part, value_f64, value_i64, value_id, value_str};

// ---------------------------------------------------------------------------
// Blob-level parsing
// ---------------------------------------------------------------------------

/// Resolve a stage payload that may be a JSON string or an already-parsed
/// value. Invalid JSON logs a warning and yields `Value::Null` so callers
/// degrade to an empty section instead of aborting the report.
pub fn parse_stage_blob(raw: Option<&Value>) -> Value {
    match raw {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(s)) => {
            if s.trim().is_empty() {
                return Value::Null;
            }
            match serde_json::from_str::<Value>(s) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "stage blob is not valid JSON, treating as empty");
                    Value::Null
                }
            }
        }
        Some(v) => v.clone(),
    }
}

/// The six raw blobs attached to one order assignment, each resolved to a
/// parsed `Value` (or `Null`).
#[derive(Debug, Clone, Default)]
pub struct StageBlobs {
    pub collection: Value,
    pub collection_summary: Value,
    pub packaging: Value,
    pub packaging_summary: Value,
    pub delivery: Value,
    pub pricing: Value,
}

/// Split a `GET order-assignment/{id}` response into its stage blobs,
/// honoring the field-name aliases the backend has used over time.
pub fn split_assignment(assignment: &Value) -> StageBlobs {
    let pick = |keys: &[&str]| -> Value {
        for key in keys {
            match assignment.get(*key) {
                Some(Value::Null) | None => continue,
                Some(v) => return parse_stage_blob(Some(v)),
            }
        }
        Value::Null
    };
    StageBlobs {
        collection: pick(&["stage1_data", "product_assignments"]),
        collection_summary: pick(&["stage1_summary_data", "summary_data"]),
        packaging: pick(&["stage2_data"]),
        packaging_summary: pick(&["stage2_summary_data"]),
        delivery: pick(&["stage3_data"]),
        pricing: pick(&["stage4_data"]),
    }
}

/// Fetch a list that may sit at the top level or under one of `keys`.
fn as_array_loose<'a>(v: &'a Value, keys: &[&str]) -> Vec<&'a Value> {
    if let Some(arr) = v.as_array() {
        return arr.iter().collect();
    }
    for key in keys {
        if let Some(arr) = v.get(*key).and_then(Value::as_array) {
            return arr.iter().collect();
        }
    }
    Vec::new()
}

/// Weight-style field: numeric, or a unit-suffixed string like `"120kg"`.
fn weight_value(v: &Value, keys: &[&str]) -> f64 {
    for key in keys {
        match v.get(*key) {
            Some(x) if x.is_number() => return x.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) if !s.trim().is_empty() => return numeric_part(s),
            _ => {}
        }
    }
    0.0
}

// ---------------------------------------------------------------------------
// Stage 1 - collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CollectionItem {
    pub product: String,
    pub entity_type: String,
    pub entity_name: String,
    pub assigned_qty: f64,
    pub assigned_boxes: i64,
    pub place: String,
}

/// One entry of the stage-1 summary's `driverAssignments[].assignments[]`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CollectionAssignment {
    pub driver: String,
    pub product: String,
    pub entity_name: String,
    pub entity_type: String,
    pub labour: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CollectionStage {
    pub items: Vec<CollectionItem>,
    pub assignments: Vec<CollectionAssignment>,
}

pub fn collection_stage(data: &Value, summary: &Value) -> CollectionStage {
    let items = as_array_loose(data, &["items", "productAssignments", "products"])
        .into_iter()
        .map(|item| CollectionItem {
            product: value_str(item, &["product", "productName", "product_name"])
                .unwrap_or_default(),
            entity_type: value_str(item, &["entityType", "entity_type"]).unwrap_or_default(),
            entity_name: value_str(item, &["entityName", "entity_name"]).unwrap_or_default(),
            assigned_qty: value_f64(item, &["assignedQty", "assigned_qty", "quantity"])
                .unwrap_or(0.0),
            assigned_boxes: value_i64(item, &["assignedBoxes", "assigned_boxes", "boxes"])
                .unwrap_or(0),
            place: value_str(item, &["place", "location"]).unwrap_or_default(),
        })
        .collect();

    let mut assignments = Vec::new();
    for group in as_array_loose(summary, &["driverAssignments", "driver_assignments"]) {
        let driver = value_str(group, &["driver", "driverName", "driver_name"]).unwrap_or_default();
        for entry in as_array_loose(group, &["assignments"]) {
            assignments.push(CollectionAssignment {
                driver: driver.clone(),
                product: value_str(entry, &["product", "productName", "product_name"])
                    .unwrap_or_default(),
                entity_name: value_str(entry, &["entityName", "entity_name"]).unwrap_or_default(),
                entity_type: value_str(entry, &["entityType", "entity_type"]).unwrap_or_default(),
                labour: value_str(entry, &["labour", "labourName", "labour_name"])
                    .unwrap_or_default(),
            });
        }
    }

    CollectionStage { items, assignments }
}

// ---------------------------------------------------------------------------
// Stage 2 - packaging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PackagingItem {
    pub product: String,
    pub wastage: f64,
    pub reuse: f64,
    pub tape_color: String,
    pub tape_quantity: f64,
    /// Raw per-item labour field; takes priority over summary assignments.
    pub labour_name: String,
}

/// One labourer group from the stage-2 summary (`labourAssignments[]`).
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LabourAssignmentGroup {
    pub labour_name: String,
    pub assignments: Vec<LabourAssignmentRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LabourAssignmentRef {
    /// Order-item id the labourer worked on.
    pub oiid: String,
    pub product: String,
}

/// Authoritative per-labour wage log entry (`labourPrices[]`).
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LabourPrice {
    pub labour_name: String,
    pub total_amount: Option<f64>,
    pub labour_wage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PackagingStage {
    pub items: Vec<PackagingItem>,
    pub assignments: Vec<LabourAssignmentGroup>,
    pub prices: Vec<LabourPrice>,
}

pub fn packaging_stage(data: &Value, summary: &Value) -> PackagingStage {
    let items = as_array_loose(data, &["items", "products"])
        .into_iter()
        .map(|item| PackagingItem {
            product: value_str(item, &["product", "productName", "product_name"])
                .unwrap_or_default(),
            wastage: value_f64(item, &["wastage"]).unwrap_or(0.0),
            reuse: value_f64(item, &["reuse"]).unwrap_or(0.0),
            tape_color: value_str(item, &["tapeColor", "tape_color"]).unwrap_or_default(),
            tape_quantity: value_f64(item, &["tapeQuantity", "tape_quantity"]).unwrap_or(0.0),
            labour_name: value_str(item, &["labourName", "labourNames", "labour"])
                .unwrap_or_default(),
        })
        .collect();

    let assignments = as_array_loose(summary, &["labourAssignments", "labour_assignments"])
        .into_iter()
        .map(|group| LabourAssignmentGroup {
            labour_name: value_str(group, &["labourName", "labour_name", "labour", "name"])
                .unwrap_or_default(),
            assignments: as_array_loose(group, &["assignments"])
                .into_iter()
                .map(|entry| LabourAssignmentRef {
                    oiid: value_id(entry, &["oiid", "orderItemId", "order_item_id"])
                        .unwrap_or_default(),
                    product: value_str(entry, &["product", "productName", "product_name"])
                        .unwrap_or_default(),
                })
                .collect(),
        })
        .collect();

    let prices = as_array_loose(summary, &["labourPrices", "labour_prices"])
        .into_iter()
        .map(|entry| LabourPrice {
            labour_name: value_str(entry, &["labourName", "labour_name", "labour"])
                .unwrap_or_default(),
            total_amount: value_f64(entry, &["totalAmount", "total_amount"]),
            labour_wage: value_f64(entry, &["labourWage", "labour_wage"]),
        })
        .collect();

    PackagingStage {
        items,
        assignments,
        prices,
    }
}

// ---------------------------------------------------------------------------
// Stage 3 - delivery routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DeliveryLine {
    pub product: String,
    /// Gross weight in kg, unit suffix already stripped.
    pub gross_weight: f64,
    pub packages: f64,
    /// Driver id reference (`selectedDriver`), kept as a string for loose
    /// matching against master-data ids.
    pub selected_driver: String,
    /// Free-text driver name on the line itself.
    pub driver_name: String,
    pub packing_type: String,
    pub labour: String,
    pub airport: String,
    pub ct: String,
}

/// Flattened `summaryData.airportGroups[code].products[]` entry, used as the
/// last driver-resolution fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AirportGroupEntry {
    pub airport_code: String,
    pub product: String,
    pub driver: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DeliveryStage {
    pub lines: Vec<DeliveryLine>,
    pub airport_entries: Vec<AirportGroupEntry>,
}

pub fn delivery_stage(data: &Value) -> DeliveryStage {
    let lines = as_array_loose(data, &["products", "items"])
        .into_iter()
        .map(|line| DeliveryLine {
            product: value_str(line, &["product", "productName", "product_name"])
                .unwrap_or_default(),
            gross_weight: weight_value(line, &["grossWeight", "gross_weight", "weight"]),
            packages: value_f64(line, &["noOfPkgs", "no_of_pkgs", "packages", "boxes"])
                .unwrap_or(0.0),
            selected_driver: value_id(line, &["selectedDriver", "selected_driver"])
                .unwrap_or_default(),
            driver_name: value_str(line, &["driver", "driverName", "driver_name"])
                .unwrap_or_default(),
            packing_type: value_str(line, &["packingType", "packing_type", "packing"])
                .unwrap_or_default(),
            labour: value_str(line, &["labour", "labourName", "labour_name"]).unwrap_or_default(),
            airport: value_str(line, &["airportName", "airport_name", "airport"])
                .unwrap_or_default(),
            ct: value_id(line, &["ct", "oiid"]).unwrap_or_default(),
        })
        .collect();

    let mut airport_entries = Vec::new();
    if let Some(groups) = data
        .get("summaryData")
        .or_else(|| data.get("summary_data"))
        .and_then(|s| s.get("airportGroups").or_else(|| s.get("airport_groups")))
        .and_then(Value::as_object)
    {
        for (code, group) in groups {
            for entry in as_array_loose(group, &["products", "items"]) {
                airport_entries.push(AirportGroupEntry {
                    airport_code: code.clone(),
                    product: value_str(entry, &["product", "productName", "product_name"])
                        .unwrap_or_default(),
                    driver: value_str(entry, &["driver", "driverName", "driver_name"])
                        .unwrap_or_default(),
                });
            }
        }
    }

    DeliveryStage {
        lines,
        airport_entries,
    }
}

// ---------------------------------------------------------------------------
// Stage 4 - final pricing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PricingRow {
    pub product: String,
    pub net_weight: f64,
    pub price: f64,
}

pub fn pricing_rows(data: &Value) -> Vec<PricingRow> {
    let rows = data
        .get("reviewData")
        .or_else(|| data.get("review_data"))
        .unwrap_or(data);
    as_array_loose(rows, &["productRows", "product_rows"])
        .into_iter()
        .map(|row| PricingRow {
            product: value_str(row, &["product_name", "productName", "product"])
                .unwrap_or_default(),
            net_weight: value_f64(row, &["net_weight", "netWeight", "quantity"]).unwrap_or(0.0),
            price: value_f64(row, &["price", "final_price", "finalPrice"]).unwrap_or(0.0),
        })
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_stage_blob_handles_string_object_and_garbage() {
        let obj = json!({ "products": [] });
        assert_eq!(parse_stage_blob(Some(&obj)), obj);

        let encoded = Value::String("{\"products\":[{\"product\":\"Okra\"}]}".to_string());
        let parsed = parse_stage_blob(Some(&encoded));
        assert_eq!(parsed["products"][0]["product"], "Okra");

        let garbage = Value::String("{not valid json".to_string());
        assert_eq!(parse_stage_blob(Some(&garbage)), Value::Null);
        assert_eq!(parse_stage_blob(None), Value::Null);
    }

    #[test]
    fn test_malformed_stage2_leaves_other_stages_intact() {
        let assignment = json!({
            "stage2_data": "{not valid json",
            "stage3_data": { "products": [{ "product": "Tomato", "grossWeight": "50kg" }] },
        });
        let blobs = split_assignment(&assignment);
        let packaging = packaging_stage(&blobs.packaging, &blobs.packaging_summary);
        assert!(packaging.items.is_empty());
        let delivery = delivery_stage(&blobs.delivery);
        assert_eq!(delivery.lines.len(), 1);
        assert_eq!(delivery.lines[0].gross_weight, 50.0);
    }

    #[test]
    fn test_split_assignment_honors_legacy_aliases() {
        let assignment = json!({
            "product_assignments": [{ "product": "Beans", "assignedQty": "12", "assignedBoxes": 3 }],
            "summary_data": { "driverAssignments": [] },
        });
        let blobs = split_assignment(&assignment);
        let collection = collection_stage(&blobs.collection, &blobs.collection_summary);
        assert_eq!(collection.items.len(), 1);
        assert_eq!(collection.items[0].assigned_qty, 12.0);
        assert_eq!(collection.items[0].assigned_boxes, 3);
    }

    #[test]
    fn test_delivery_stage_flattens_airport_groups() {
        let data = json!({
            "products": [
                { "product": "Tomato", "grossWeight": 40, "noOfPkgs": "4", "packingType": "10kg Box" }
            ],
            "summaryData": {
                "airportGroups": {
                    "MAA": { "products": [{ "product": "Tomato", "driver": "Kumar" }] }
                }
            }
        });
        let stage = delivery_stage(&data);
        assert_eq!(stage.lines[0].packages, 4.0);
        assert_eq!(stage.airport_entries.len(), 1);
        assert_eq!(stage.airport_entries[0].airport_code, "MAA");
        assert_eq!(stage.airport_entries[0].driver, "Kumar");
    }

    #[test]
    fn test_pricing_rows_from_review_data_or_top_level() {
        let nested = json!({ "reviewData": { "productRows": [
            { "product_name": "Tomato", "net_weight": 48, "price": 20 }
        ]}});
        let rows = pricing_rows(&nested);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].net_weight, 48.0);

        let flat = json!({ "productRows": [
            { "product": "Okra", "quantity": "10", "final_price": "15.5" }
        ]});
        let rows = pricing_rows(&flat);
        assert_eq!(rows[0].product, "Okra");
        assert_eq!(rows[0].net_weight, 10.0);
        assert_eq!(rows[0].price, 15.5);
    }

    #[test]
    fn test_packaging_stage_summary_groups() {
        let summary = json!({
            "labourAssignments": [
                { "labourName": "Mani", "assignments": [{ "oiid": 11, "product": "Tomato" }] }
            ],
            "labourPrices": [
                { "labourName": "Mani", "totalAmount": "150" },
                { "labourName": "Velu", "labourWage": 120 }
            ]
        });
        let stage = packaging_stage(&Value::Null, &summary);
        assert_eq!(stage.assignments[0].assignments[0].oiid, "11");
        assert_eq!(stage.prices[0].total_amount, Some(150.0));
        assert_eq!(stage.prices[1].total_amount, None);
        assert_eq!(stage.prices[1].labour_wage, Some(120.0));
    }
}
