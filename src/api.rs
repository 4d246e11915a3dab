//! Backend API client.
//!
//! Authenticated HTTP access to the order-fulfillment backend: order list,
//! per-order stage assignments, and the master-data lookups (drivers, labour
//! rates, driver rates, inventory stock) the costing pipeline needs.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::costing::{DriverRate, StockItem};
use crate::labour::LabourRate;
use crate::report::{OrderInfo, ReportInputs};
use crate::routes::Driver;

/// Default timeout for API requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend location and credential, resolved by the CLI from env/flags.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
}

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the backend URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /api
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    // Strip trailing slashes again (in case "/api/" was present)
    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach backend at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid backend URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "API key is invalid or expired".to_string(),
        403 => "API key is not authorized for this endpoint".to_string(),
        404 => "Backend endpoint not found".to_string(),
        s if s >= 500 => format!("Backend server error (HTTP {s})"),
        s => format!("Unexpected response from backend (HTTP {s})"),
    }
}

// ---------------------------------------------------------------------------
// Generic authenticated fetch
// ---------------------------------------------------------------------------

/// Perform an authenticated GET against the backend.
///
/// `path` is relative to `/api`, without a leading slash, e.g. `"orders"`.
pub async fn fetch_json(cfg: &ApiConfig, path: &str) -> Result<Value, String> {
    let base = normalize_base_url(&cfg.base_url);
    let full_url = format!("{base}/api/{path}");

    let client = Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {e}"))?;

    debug!(url = %full_url, "fetching");
    let resp = client
        .get(&full_url)
        .header("X-Api-Key", cfg.api_key.trim())
        .send()
        .await
        .map_err(|e| friendly_error(&base, &e))?;

    let status = resp.status();
    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        // Surface the backend's own message when it sends one.
        let detail = serde_json::from_str::<Value>(&body_text)
            .ok()
            .and_then(|json| {
                json.get("error")
                    .or_else(|| json.get("message"))
                    .and_then(Value::as_str)
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| status_error(status));
        return Err(format!("{detail} (HTTP {})", status.as_u16()));
    }

    let body_text = resp.text().await.unwrap_or_default();
    if body_text.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body_text).map_err(|e| format!("Invalid JSON from backend: {e}"))
}

/// Unwrap a list response: either a bare array or `{"data": [...]}`.
fn rows(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Typed fetchers
// ---------------------------------------------------------------------------

pub async fn fetch_orders(cfg: &ApiConfig) -> Result<Vec<OrderInfo>, String> {
    let value = fetch_json(cfg, "orders").await?;
    Ok(rows(value).iter().map(OrderInfo::from_value).collect())
}

/// The raw stage-assignment record for one order. Objects come back as-is;
/// a `{"data": {...}}` envelope is unwrapped.
pub async fn fetch_order_assignment(cfg: &ApiConfig, order_id: &str) -> Result<Value, String> {
    let mut value = fetch_json(cfg, &format!("order-assignment/{order_id}")).await?;
    if let Value::Object(ref mut map) = value {
        if let Some(inner) = map.remove("data") {
            return Ok(inner);
        }
    }
    Ok(value)
}

pub async fn fetch_drivers(cfg: &ApiConfig) -> Result<Vec<Driver>, String> {
    let value = fetch_json(cfg, "drivers").await?;
    Ok(rows(value).iter().map(Driver::from_value).collect())
}

pub async fn fetch_labour_rates(cfg: &ApiConfig) -> Result<Vec<LabourRate>, String> {
    let value = fetch_json(cfg, "labour-rate/list").await?;
    Ok(rows(value).iter().map(LabourRate::from_value).collect())
}

pub async fn fetch_driver_rates(cfg: &ApiConfig) -> Result<Vec<DriverRate>, String> {
    let value = fetch_json(cfg, "driver-rate/list").await?;
    Ok(rows(value).iter().map(DriverRate::from_value).collect())
}

pub async fn fetch_inventory_stock(cfg: &ApiConfig) -> Result<Vec<StockItem>, String> {
    let value = fetch_json(cfg, "inventory-stock").await?;
    Ok(rows(value).iter().map(StockItem::from_value).collect())
}

// ---------------------------------------------------------------------------
// Report input fan-out
// ---------------------------------------------------------------------------

/// Fetch everything one report needs, concurrently. A failed lookup is
/// logged and degrades to an empty section; the report still builds.
pub async fn fetch_report_inputs(cfg: &ApiConfig, order_id: &str) -> ReportInputs {
    let (orders, assignment, drivers, labour_rates, driver_rates, stock) = tokio::join!(
        fetch_orders(cfg),
        fetch_order_assignment(cfg, order_id),
        fetch_drivers(cfg),
        fetch_labour_rates(cfg),
        fetch_driver_rates(cfg),
        fetch_inventory_stock(cfg),
    );

    let order = match orders {
        Ok(list) => list
            .into_iter()
            .find(|o| crate::ids_match(&o.id, order_id))
            .unwrap_or_else(|| OrderInfo {
                id: order_id.to_string(),
                ..OrderInfo::default()
            }),
        Err(e) => {
            warn!(order_id, error = %e, "order list fetch failed");
            OrderInfo {
                id: order_id.to_string(),
                ..OrderInfo::default()
            }
        }
    };

    ReportInputs {
        order,
        assignment: assignment.unwrap_or_else(|e| {
            warn!(order_id, error = %e, "assignment fetch failed");
            Value::Null
        }),
        drivers: drivers.unwrap_or_else(|e| {
            warn!(error = %e, "driver list fetch failed");
            Vec::new()
        }),
        labour_rates: labour_rates.unwrap_or_else(|e| {
            warn!(error = %e, "labour rate fetch failed");
            Vec::new()
        }),
        driver_rates: driver_rates.unwrap_or_else(|e| {
            warn!(error = %e, "driver rate fetch failed");
            Vec::new()
        }),
        stock: stock.unwrap_or_else(|e| {
            warn!(error = %e, "inventory stock fetch failed");
            Vec::new()
        }),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("example.com"),
            "https://example.com"
        );
        assert_eq!(
            normalize_base_url("localhost:3000"),
            "http://localhost:3000"
        );
        assert_eq!(
            normalize_base_url("https://example.com/api/"),
            "https://example.com"
        );
        assert_eq!(
            normalize_base_url("  https://example.com///  "),
            "https://example.com"
        );
    }

    #[test]
    fn test_status_error_messages() {
        assert_eq!(status_error(StatusCode::UNAUTHORIZED), "API key is invalid or expired");
        assert_eq!(status_error(StatusCode::NOT_FOUND), "Backend endpoint not found");
        assert!(status_error(StatusCode::BAD_GATEWAY).contains("502"));
    }

    #[test]
    fn test_rows_unwraps_data_envelope() {
        assert_eq!(rows(json!([1, 2])).len(), 2);
        assert_eq!(rows(json!({"data": [1]})).len(), 1);
        assert!(rows(json!({"data": "nope"})).is_empty());
        assert!(rows(json!(null)).is_empty());
    }
}
