//! # Seed Data Generator
//!
//! Populates a ledger database with a small catalog, sellers and customers
//! for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p pdv-db --bin seed
//!
//! # Specify database path
//! cargo run -p pdv-db --bin seed -- --db ./data/dev.db
//! ```
//!
//! ## Generated Catalog
//! - Shelf goods that track stock (unit sales)
//! - Goods sold by weight (stock in kg)
//! - Services that never track stock
//! - A few legacy rows without a `tracks_stock` flag, classified on open

use chrono::Utc;
use pdv_core::Product;
use pdv_db::{Database, DbConfig, PartyKind, PartyRepository, ProductRepository};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (code, name, price, cost, tax rate %, stock, tracks_stock, sold_by_weight, category)
type SeedProduct = (
    &'static str,
    &'static str,
    f64,
    f64,
    f64,
    f64,
    Option<bool>,
    bool,
    Option<i64>,
);

const PRODUCTS: &[SeedProduct] = &[
    ("7891000100103", "Arroz Tipo 1 5kg", 27.90, 19.50, 0.0, 40.0, Some(true), false, Some(1)),
    ("7891000200207", "Feijão Carioca 1kg", 8.49, 5.90, 0.0, 60.0, Some(true), false, Some(1)),
    ("7891000300301", "Óleo de Soja 900ml", 7.99, 5.20, 0.0, 36.0, Some(true), false, Some(1)),
    ("7891000400405", "Café Torrado 500g", 18.90, 12.40, 0.0, 24.0, Some(true), false, Some(2)),
    ("7891000500509", "Refrigerante 2L", 9.50, 5.80, 15.0, 48.0, Some(true), false, Some(3)),
    ("2000000000015", "Queijo Minas (kg)", 42.00, 28.00, 0.0, 12.5, Some(true), true, Some(4)),
    ("2000000000022", "Presunto Fatiado (kg)", 36.00, 22.00, 0.0, 8.0, Some(true), true, Some(4)),
    ("SRV-001", "Serviço de Entrega", 10.00, 0.0, 15.0, 0.0, Some(false), false, Some(10)),
    ("SRV-002", "Impressão A4", 1.50, 0.20, 15.0, 0.0, Some(false), false, Some(14)),
    // Legacy rows: classified by code/name/category when the database opens
    ("SERV-010", "Recarga de Celular", 20.00, 19.00, 0.0, 0.0, None, false, None),
    ("7891000600603", "Açúcar Cristal 1kg", 4.99, 3.10, 0.0, 50.0, None, false, Some(1)),
];

const USERS: &[&str] = &["Ana Caixa", "Bruno Gerente"];
const CUSTOMERS: &[&str] = &["Maria da Silva", "João Pereira", "Padaria Central"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./data/pdv-ledger.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("PDV Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./data/pdv-ledger.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    info!(path = %db_path, "Seeding ledger database");

    // Migrations run on open; legacy classification runs after we insert
    let db = Database::new(DbConfig::new(&db_path)).await?;
    let mut conn = db.acquire().await?;

    let existing = ProductRepository::count(&mut conn).await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    for name in USERS {
        let id = Uuid::new_v4().to_string();
        PartyRepository::upsert(&mut conn, PartyKind::User, &id, name).await?;
        info!(id = %id, name, "Seeded user");
    }
    for name in CUSTOMERS {
        let id = Uuid::new_v4().to_string();
        PartyRepository::upsert(&mut conn, PartyKind::Customer, &id, name).await?;
        info!(id = %id, name, "Seeded customer");
    }

    let mut generated = 0;
    for seed in PRODUCTS {
        let product = build_product(seed);
        if let Err(e) = ProductRepository::insert(&mut conn, &product).await {
            warn!(name = %product.name, error = %e, "Failed to insert product");
            continue;
        }
        generated += 1;
    }
    drop(conn);

    let classified = db.classify_legacy_products().await?;
    info!(generated, classified, "Seed complete");

    db.close().await;
    Ok(())
}

fn build_product(seed: &SeedProduct) -> Product {
    let (code, name, price, cost, tax_rate, stock, tracks_stock, sold_by_weight, category_id) =
        *seed;
    let now = Utc::now();

    Product {
        id: Uuid::new_v4().to_string(),
        code: Some(code.to_string()),
        name: name.to_string(),
        unit_price: price,
        unit_cost: cost,
        tax_rate,
        stock,
        tracks_stock,
        sold_by_weight,
        category_id,
        created_at: now,
        updated_at: now,
    }
}
