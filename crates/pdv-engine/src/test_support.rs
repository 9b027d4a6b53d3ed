//! Shared fixtures for engine tests.

use std::path::PathBuf;
use std::sync::Once;

use chrono::Utc;
use pdv_core::Product;
use pdv_db::{Database, DbConfig, PartyKind, PartyRepository, ProductRepository};
use pdv_realtime::Broadcaster;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::Ledger;

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary.
/// `RUST_LOG=pdv_engine=debug cargo test` shows engine logs.
pub(crate) fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
            .with_test_writer()
            .try_init();
    });
}

/// A ledger over a fresh in-memory store.
pub(crate) async fn ledger() -> Ledger {
    init_tracing();
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Ledger::new(db, Broadcaster::new(16), 8)
}

/// A ledger over a temporary SQLite file with a real connection pool, for
/// tests that run writers in parallel. The file is removed on drop.
pub(crate) struct FileLedger {
    pub(crate) ledger: Ledger,
    path: PathBuf,
}

impl FileLedger {
    pub(crate) async fn open(max_connections: u32) -> Self {
        init_tracing();
        let path = std::env::temp_dir().join(format!("pdv-engine-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(max_connections))
            .await
            .unwrap();
        FileLedger {
            ledger: Ledger::new(db, Broadcaster::new(256), 8),
            path,
        }
    }
}

impl Drop for FileLedger {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

/// Catalog entry builder for tests.
pub(crate) struct ProductFixture {
    product: Product,
}

impl ProductFixture {
    pub(crate) fn new(name: &str) -> Self {
        let now = Utc::now();
        ProductFixture {
            product: Product {
                id: Uuid::new_v4().to_string(),
                code: None,
                name: name.to_string(),
                unit_price: 10.0,
                unit_cost: 5.0,
                tax_rate: 0.0,
                stock: 0.0,
                tracks_stock: Some(true),
                sold_by_weight: false,
                category_id: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub(crate) fn stock(mut self, stock: f64) -> Self {
        self.product.stock = stock;
        self
    }

    pub(crate) fn cost(mut self, cost: f64) -> Self {
        self.product.unit_cost = cost;
        self
    }

    pub(crate) fn tax_rate(mut self, rate: f64) -> Self {
        self.product.tax_rate = rate;
        self
    }

    pub(crate) fn tracks_stock(mut self, tracks: Option<bool>) -> Self {
        self.product.tracks_stock = tracks;
        self
    }

    pub(crate) fn by_weight(mut self) -> Self {
        self.product.sold_by_weight = true;
        self
    }

    pub(crate) fn code(mut self, code: &str) -> Self {
        self.product.code = Some(code.to_string());
        self
    }

    /// Inserts the product and returns its id.
    pub(crate) async fn insert(self, ledger: &Ledger) -> String {
        let mut conn = ledger.db.acquire().await.unwrap();
        ProductRepository::insert(&mut conn, &self.product).await.unwrap();
        self.product.id
    }
}

/// Current stock of a product.
pub(crate) async fn stock_of(ledger: &Ledger, product_id: &str) -> f64 {
    let mut conn = ledger.db.acquire().await.unwrap();
    ProductRepository::get(&mut conn, product_id).await.unwrap().stock
}

/// Inserts a user or customer and returns its id.
pub(crate) async fn party(ledger: &Ledger, kind: PartyKind, name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let mut conn = ledger.db.acquire().await.unwrap();
    PartyRepository::upsert(&mut conn, kind, &id, name).await.unwrap();
    id
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
