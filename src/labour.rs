//! Labour assignment and wage resolution.
//!
//! Packing labour is recorded twice in stage 2: a raw per-product field typed
//! by the operator, and a structured summary written when the packaging stage
//! is closed out. The raw field wins; the summary fills the gaps. Wages come
//! from the summary's per-labour wage log, falling back to the configured
//! "Normal" labour rate for anyone missing from it.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::stage::PackagingStage;
use crate::{value_f64, value_str};

/// Master-data labour rate row (`GET labour-rate/list`).
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LabourRate {
    pub labour_type: String,
    pub amount: f64,
    pub status: String,
}

impl LabourRate {
    pub fn from_value(v: &Value) -> Self {
        Self {
            labour_type: value_str(v, &["labourType", "labour_type", "type"]).unwrap_or_default(),
            amount: value_f64(v, &["amount", "rate"]).unwrap_or(0.0),
            status: value_str(v, &["status"]).unwrap_or_default(),
        }
    }
}

/// Resolver output consumed by the cost calculator and renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LabourResolution {
    /// Product (display name or order-item id) -> comma-joined labour names.
    pub product_labour: HashMap<String, String>,
    /// Labour display name -> actual wage paid. Last parsed entry wins.
    pub wages: HashMap<String, f64>,
    /// Fallback wage for labourers missing from the wage log: the Active
    /// "Normal" rate, or 0 when none is configured.
    pub default_rate: f64,
}

impl LabourResolution {
    /// Wage for one labourer, falling back to the default rate.
    pub fn wage_for(&self, name: &str) -> f64 {
        self.wages
            .get(name.trim())
            .copied()
            .unwrap_or(self.default_rate)
    }

    /// Labour names for a product line, trying the order-item id first.
    pub fn labour_for(&self, oiid: &str, product: &str) -> Option<&str> {
        if !oiid.trim().is_empty() {
            if let Some(names) = self.product_labour.get(oiid.trim()) {
                return Some(names.as_str());
            }
        }
        self.product_labour
            .get(product.trim())
            .map(String::as_str)
    }
}

/// Append `name` to the comma-joined set under `key`, skipping duplicates.
/// Comma-split inputs are trimmed first so names differing only in spacing
/// collapse to one.
fn accumulate(map: &mut HashMap<String, String>, key: &str, name: &str) {
    let key = key.trim();
    if key.is_empty() {
        return;
    }
    for part in name.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let entry = map.entry(key.to_string()).or_default();
        let already = entry.split(',').any(|existing| existing.trim() == part);
        if already {
            continue;
        }
        if !entry.is_empty() {
            entry.push_str(", ");
        }
        entry.push_str(part);
    }
}

/// Build the product->labour and labour->wage mappings for one order.
pub fn resolve_labour(packaging: &PackagingStage, rates: &[LabourRate]) -> LabourResolution {
    let mut product_labour: HashMap<String, String> = HashMap::new();

    // Raw per-product field first.
    for item in &packaging.items {
        if !item.labour_name.trim().is_empty() {
            accumulate(&mut product_labour, &item.product, &item.labour_name);
        }
    }

    // Summary assignments fill products the raw pass left empty, keyed by
    // order-item id as well so ct-bearing delivery lines can match. Multiple
    // labourer groups naming the same product accumulate.
    let raw_keys: Vec<String> = product_labour.keys().cloned().collect();
    for group in &packaging.assignments {
        let name = group.labour_name.trim();
        if name.is_empty() {
            continue;
        }
        for entry in &group.assignments {
            // An entry whose product already got raw labour contributes
            // nothing, not even under its order-item id: the id key would
            // otherwise shadow the raw name for ct-bearing delivery lines.
            let product = entry.product.trim();
            if raw_keys.iter().any(|k| k == product) {
                continue;
            }
            if !entry.oiid.is_empty() {
                accumulate(&mut product_labour, &entry.oiid, name);
            }
            if !product.is_empty() {
                accumulate(&mut product_labour, product, name);
            }
        }
    }

    // Wage log: totalAmount preferred, then labourWage, else 0. Duplicate
    // names keep the last parsed value.
    let mut wages: HashMap<String, f64> = HashMap::new();
    for price in &packaging.prices {
        let name = price.labour_name.trim();
        if name.is_empty() {
            continue;
        }
        let wage = price.total_amount.or(price.labour_wage).unwrap_or(0.0);
        wages.insert(name.to_string(), wage);
    }

    let default_rate = rates
        .iter()
        .find(|r| r.labour_type.trim().eq_ignore_ascii_case("normal") && r.status == "Active")
        .map(|r| r.amount)
        .unwrap_or(0.0);

    LabourResolution {
        product_labour,
        wages,
        default_rate,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::packaging_stage;
    use serde_json::{json, Value};

    fn rates() -> Vec<LabourRate> {
        vec![
            LabourRate {
                labour_type: "Normal".into(),
                amount: 100.0,
                status: "Active".into(),
            },
            LabourRate {
                labour_type: "Overtime".into(),
                amount: 180.0,
                status: "Active".into(),
            },
        ]
    }

    #[test]
    fn test_raw_labour_field_beats_summary() {
        let data = json!([{ "product": "Tomato", "labourName": "Raju" }]);
        let summary = json!({
            "labourAssignments": [
                { "labourName": "Mani", "assignments": [{ "product": "Tomato" }] }
            ]
        });
        let stage = packaging_stage(&data, &summary);
        let resolved = resolve_labour(&stage, &rates());
        assert_eq!(resolved.labour_for("", "Tomato"), Some("Raju"));
    }

    #[test]
    fn test_raw_labour_field_beats_summary_via_order_item_id() {
        let data = json!([{ "product": "Tomato", "labourName": "Raju" }]);
        let summary = json!({
            "labourAssignments": [
                { "labourName": "Mani", "assignments": [{ "oiid": 41, "product": "Tomato" }] }
            ]
        });
        let stage = packaging_stage(&data, &summary);
        let resolved = resolve_labour(&stage, &rates());
        // A delivery line carrying ct=41 must still see the raw name.
        assert_eq!(resolved.labour_for("41", "Tomato"), Some("Raju"));
    }

    #[test]
    fn test_summary_fallback_matches_oiid_then_name() {
        let summary = json!({
            "labourAssignments": [
                { "labourName": "Mani", "assignments": [{ "oiid": 41, "product": "Okra" }] },
                { "labourName": "Velu", "assignments": [{ "oiid": 41, "product": "Okra" }] }
            ]
        });
        let stage = packaging_stage(&Value::Null, &summary);
        let resolved = resolve_labour(&stage, &rates());
        assert_eq!(resolved.labour_for("41", "unknown"), Some("Mani, Velu"));
        assert_eq!(resolved.labour_for("", "Okra"), Some("Mani, Velu"));
    }

    #[test]
    fn test_duplicate_names_collapse_by_trimmed_spelling() {
        let data = json!([{ "product": "Beans", "labourNames": "Raju, Raju ,  Mani" }]);
        let stage = packaging_stage(&data, &Value::Null);
        let resolved = resolve_labour(&stage, &rates());
        assert_eq!(resolved.labour_for("", "Beans"), Some("Raju, Mani"));
    }

    #[test]
    fn test_wage_prefers_total_amount_and_last_entry_wins() {
        let summary = json!({
            "labourPrices": [
                { "labourName": "Mani", "totalAmount": 150, "labourWage": 90 },
                { "labourName": "Velu", "labourWage": 120 },
                { "labourName": "Mani", "totalAmount": 175 }
            ]
        });
        let stage = packaging_stage(&Value::Null, &summary);
        let resolved = resolve_labour(&stage, &rates());
        assert_eq!(resolved.wage_for("Mani"), 175.0);
        assert_eq!(resolved.wage_for("Velu"), 120.0);
    }

    #[test]
    fn test_unknown_labour_falls_back_to_active_normal_rate() {
        let stage = packaging_stage(&Value::Null, &Value::Null);
        let resolved = resolve_labour(&stage, &rates());
        assert_eq!(resolved.wage_for("Somebody"), 100.0);

        // No Active "Normal" row -> default rate is 0.
        let inactive = vec![LabourRate {
            labour_type: "Normal".into(),
            amount: 100.0,
            status: "Inactive".into(),
        }];
        let resolved = resolve_labour(&stage, &inactive);
        assert_eq!(resolved.wage_for("Somebody"), 0.0);
    }
}
