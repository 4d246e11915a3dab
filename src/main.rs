//! freshroute CLI.
//!
//! Fetches order stage data from the fulfillment backend, derives the cost
//! report, and renders it to screen, PDF, or XLSX. Also keeps a small local
//! price-history notebook.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use freshroute::api::{self, ApiConfig};
use freshroute::document::build_report_document;
use freshroute::export::{pdf::export_pdf, text::render_text, xlsx::export_xlsx};
use freshroute::history::HistoryStore;
use freshroute::logging;
use freshroute::report::build_order_report;

const USAGE: &str = "\
freshroute - order cost reports for produce logistics

USAGE:
    freshroute report <order-id> [--pdf] [--xlsx] [--text] [--out <dir>]
    freshroute orders
    freshroute price note <product> <price>
    freshroute price show <product>

ENVIRONMENT:
    FRESHROUTE_API_URL    backend base URL (required for report/orders)
    FRESHROUTE_API_KEY    backend API key
    RUST_LOG              log filter override
";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("report") => cmd_report(&args[1..]).await,
        Some("orders") => cmd_orders().await,
        Some("price") => cmd_price(&args[1..]),
        None | Some("help") | Some("--help") | Some("-h") => {
            print!("{USAGE}");
            Ok(())
        }
        Some(other) => bail!("Unknown command: {other}\n\n{USAGE}"),
    }
}

/// Backend config from the environment.
fn api_config() -> Result<ApiConfig> {
    let base_url = std::env::var("FRESHROUTE_API_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .context("FRESHROUTE_API_URL is not set")?;
    let api_key = std::env::var("FRESHROUTE_API_KEY").unwrap_or_default();
    Ok(ApiConfig { base_url, api_key })
}

async fn cmd_report(args: &[String]) -> Result<()> {
    let mut order_id: Option<&str> = None;
    let mut want_pdf = false;
    let mut want_xlsx = false;
    let mut want_text = false;
    let mut out_dir = PathBuf::from(".");

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--pdf" => want_pdf = true,
            "--xlsx" => want_xlsx = true,
            "--text" => want_text = true,
            "--out" => {
                let dir = iter.next().context("--out requires a directory")?;
                out_dir = PathBuf::from(dir);
            }
            flag if flag.starts_with("--") => bail!("Unknown flag: {flag}"),
            id => {
                if order_id.is_some() {
                    bail!("Only one order id may be given");
                }
                order_id = Some(id);
            }
        }
    }
    let order_id = order_id.context("Usage: freshroute report <order-id> [flags]")?;

    let cfg = api_config()?;
    let inputs = api::fetch_report_inputs(&cfg, order_id).await;
    let report = build_order_report(&inputs);
    let doc = build_report_document(&report);

    if want_pdf {
        let path = export_pdf(&doc, &out_dir).context("PDF export failed")?;
        info!(path = %path.display(), "wrote PDF report");
        println!("Wrote {}", path.display());
    }
    if want_xlsx {
        let path = export_xlsx(&doc, &out_dir).context("XLSX export failed")?;
        info!(path = %path.display(), "wrote XLSX report");
        println!("Wrote {}", path.display());
    }
    // Screen output is the default when no file export was requested.
    if want_text || (!want_pdf && !want_xlsx) {
        print!("{}", render_text(&doc));
    }

    Ok(())
}

async fn cmd_orders() -> Result<()> {
    let cfg = api_config()?;
    let orders = match api::fetch_orders(&cfg).await {
        Ok(orders) => orders,
        Err(e) => bail!("{e}"),
    };

    if orders.is_empty() {
        println!("No orders found");
        return Ok(());
    }
    println!("{:<16}  {:<30}  {}", "ORDER", "CUSTOMER", "RECEIVED");
    for order in orders {
        println!(
            "{:<16}  {:<30}  {}",
            order.id, order.customer_name, order.received_date
        );
    }
    Ok(())
}

fn cmd_price(args: &[String]) -> Result<()> {
    let store = HistoryStore::init(&logging::get_data_dir())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    match args.first().map(String::as_str) {
        Some("note") => {
            let product = args.get(1).context("Usage: freshroute price note <product> <price>")?;
            let price: f64 = args
                .get(2)
                .context("Usage: freshroute price note <product> <price>")?
                .parse()
                .context("Price must be a number")?;
            store
                .append(product, price)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Noted {product} at {price:.2}");
            Ok(())
        }
        Some("show") => {
            let product = args.get(1).context("Usage: freshroute price show <product>")?;
            let notes = store
                .list_for_product(product)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            if notes.is_empty() {
                println!("No prices noted for {product}");
                return Ok(());
            }
            for note in notes {
                println!("{}  {:>10.2}  {}", note.noted_at, note.price, note.product);
            }
            Ok(())
        }
        _ => bail!("Usage: freshroute price note|show ..."),
    }
}
