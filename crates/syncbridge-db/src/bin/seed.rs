//! # Seed Data Generator
//!
//! Populates a development Source store with pending sales invoices.
//!
//! ## Usage
//! ```bash
//! # Generate 50 invoices (default)
//! cargo run -p syncbridge-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p syncbridge-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p syncbridge-db --bin seed -- --db ./data/source.db
//! ```
//!
//! ## Generated Invoices
//! Each invoice has:
//! - Chrono reference: `FV-{YEAR}-{INDEX:05}`
//! - A customer from a small fixed list (every seventh one has none)
//! - 1 to 4 lines with product codes from a fixed catalog
//! - Tax rates of 0%, 5.5%, 10% or 20%
//! - Totals consistent with the lines

use chrono::{Days, NaiveDate, Utc};
use std::env;
use syncbridge_core::{InvoiceTotals, Money, SourceInvoice, SourceInvoiceLine, TaxRate};
use syncbridge_db::{Database, DbConfig};

/// Customer accounts used for generated invoices
const CUSTOMERS: &[&str] = &["C0001", "C0002", "C0107", "C0210", "C0333", "C0404"];

/// Product catalog: (code, description, unit price in cents)
const PRODUCTS: &[(&str, &str, i64)] = &[
    ("SRV-INSTALL", "Installation service", 45_000),
    ("SRV-HOUR", "Consulting hour", 9_500),
    ("LIC-STD", "Standard license", 12_000),
    ("LIC-PRO", "Professional license", 29_900),
    ("HW-ROUTER", "Edge router", 18_990),
    ("HW-CABLE", "Network cable 5m", 790),
    ("SUP-YEAR", "Annual support", 60_000),
];

/// Tax rates in basis points
const TAX_RATES: &[u32] = &[0, 550, 1000, 2000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./syncbridge_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("SyncBridge Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of sales invoices to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./syncbridge_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("SyncBridge Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Invoices: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.invoices().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} sales invoices", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating invoices...");

    let today = Utc::now().date_naive();
    let start = std::time::Instant::now();
    let mut generated = 0;

    for seed in 0..count {
        let invoice = generate_invoice(today, seed);

        if let Err(e) = db.invoices().insert(&invoice).await {
            eprintln!("Failed to insert {}: {}", invoice.chrono_ref, e);
            continue;
        }

        generated += 1;
        if generated % 100 == 0 {
            println!("  Generated {} invoices...", generated);
        }
    }

    let pending = db.invoices().list_pending_ids().await?;

    println!();
    println!("✓ Generated {} invoices in {:?}", generated, start.elapsed());
    println!("  Pending export: {}", pending.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates one pending sales invoice dated within the last 60 days.
fn generate_invoice(today: NaiveDate, seed: usize) -> SourceInvoice {
    let issue_date = today
        .checked_sub_days(Days::new((seed % 60) as u64))
        .unwrap_or(today);
    let due_date = issue_date.checked_add_days(Days::new(30));

    let customer_code = if seed % 7 == 6 {
        None
    } else {
        Some(CUSTOMERS[seed % CUSTOMERS.len()].to_string())
    };

    let line_count = 1 + seed % 4;
    let lines: Vec<SourceInvoiceLine> = (0..line_count)
        .map(|idx| {
            let (code, description, price) = PRODUCTS[(seed * 3 + idx) % PRODUCTS.len()];
            let quantity = (1 + (seed + idx) % 5) as f64;
            let unit_price = Money::from_cents(price);
            let total = Money::from_cents(price * quantity as i64);

            SourceInvoiceLine {
                line_no: idx as i64 + 1,
                line_type: Some("Product".to_string()),
                product_code: Some(code.to_string()),
                description: Some(description.to_string()),
                tax_rate: TaxRate::from_bps(TAX_RATES[(seed + idx) % TAX_RATES.len()]),
                quantity,
                unit_price_gross: unit_price,
                unit_price_net: unit_price,
                total_net: total,
                total_ht: total,
            }
        })
        .collect();

    let ht: Money = lines.iter().map(|l| l.total_ht).sum();
    let tax: Money = lines.iter().map(|l| l.total_ht.calculate_tax(l.tax_rate)).sum();

    SourceInvoice {
        id: 0,
        chrono_ref: format!("FV-{}-{:05}", issue_date.format("%Y"), seed + 1),
        status: "VALID".to_string(),
        customer_code,
        issue_date,
        due_date,
        totals: InvoiceTotals {
            ht,
            ttc: ht + tax,
            net_to_pay: ht + tax,
        },
        subject: Some(format!("Order {:05}", seed + 1)),
        lines,
    }
}
